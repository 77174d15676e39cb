//! Human-readable summary of a scan tree.

use crate::data::Node;
use crate::report::{top_directories, top_files};
use crate::size::format_size;
use anyhow::Result;
use std::io::{self, Write};
use std::path::Path;

fn relative<'a>(root: &Path, path: &'a Path) -> &'a Path {
    match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel,
        _ => path,
    }
}

/// Writes the summary for `tree` to `out`.
///
/// # Arguments
/// * `tree` - Completed scan tree
/// * `top` - Rows in each of the directory and file sections
pub fn write_summary<W: Write>(out: &mut W, tree: &Node, top: usize) -> Result<()> {
    writeln!(
        out,
        "{}  {} ({} files, {} directories)",
        tree.name,
        format_size(tree.size),
        tree.file_count,
        tree.dir_count
    )?;

    let dirs = top_directories(tree, top);
    if !dirs.is_empty() {
        writeln!(out, "\nLargest directories")?;
        for dir in &dirs {
            writeln!(
                out,
                "[DIR]  {:<12} {:>8} {}",
                format_size(dir.size),
                dir.file_count,
                relative(&tree.path, &dir.path).display()
            )?;
        }
    }

    let files = top_files(tree, top);
    if !files.is_empty() {
        writeln!(out, "\nLargest files")?;
        for file in &files {
            writeln!(
                out,
                "[FILE] {:<12} {}",
                format_size(file.size),
                relative(&tree.path, &file.path).display()
            )?;
        }
    }

    Ok(())
}

/// Prints the summary for `tree` to stdout.
pub fn render(tree: &Node, top: usize) -> Result<()> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    write_summary(&mut lock, tree, top)?;
    lock.flush()?;
    Ok(())
}

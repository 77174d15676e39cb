//! CSV export of the largest directories and files.

use crate::data::{Node, NodeKind};
use crate::report::{top_directories, top_files};
use crate::size::format_size;
use anyhow::{Context, Result};
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One CSV record.
///
/// # Fields
/// * `entry_type` - "DIR" or "FILE"
/// * `size_bytes` - Size in bytes
/// * `size_human` - Human-readable size
/// * `path` - Full path
/// * `file_count` / `dir_count` - Transitive counts, empty for files
#[derive(Debug, Serialize)]
pub struct CsvRow {
    pub entry_type: &'static str,
    pub size_bytes: u64,
    pub size_human: String,
    pub path: String,
    pub file_count: Option<u64>,
    pub dir_count: Option<u64>,
}

/// Builds the rows for `tree`: the top directories followed by the top files.
pub fn rows(tree: &Node, top: usize) -> Vec<CsvRow> {
    let dirs = top_directories(tree, top).into_iter().map(|d| CsvRow {
        entry_type: NodeKind::Directory.as_str(),
        size_bytes: d.size,
        size_human: format_size(d.size),
        path: d.path.display().to_string(),
        file_count: Some(d.file_count),
        dir_count: Some(d.dir_count),
    });
    let files = top_files(tree, top).into_iter().map(|f| CsvRow {
        entry_type: NodeKind::File.as_str(),
        size_bytes: f.size,
        size_human: format_size(f.size),
        path: f.path.display().to_string(),
        file_count: None,
        dir_count: None,
    });
    dirs.chain(files).collect()
}

pub fn write_rows<W: Write>(out: W, tree: &Node, top: usize) -> Result<()> {
    let mut writer = Writer::from_writer(out);
    for row in rows(tree, top) {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the top-N CSV for `tree` to `path`.
pub fn render(tree: &Node, top: usize, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_rows(file, tree, top)?;
    println!("CSV output written to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_directories_then_files() {
        let mut root = Node::directory("/r", "/r");
        root.children.push(Node::file("a.bin", "/r/a.bin", 2048));
        root.size = 2048;
        root.file_count = 1;

        let mut buf = Vec::new();
        write_rows(&mut buf, &root, 5).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(
            lines[0],
            "entry_type,size_bytes,size_human,path,file_count,dir_count"
        );
        assert!(lines[1].starts_with("DIR,2048,"));
        assert!(lines[1].ends_with(",/r,1,0"));
        assert!(lines[2].starts_with("FILE,2048,"));
        assert!(lines[2].ends_with(",/r/a.bin,,"));
    }
}

//! JSON output of the scan tree or the treemap arrays.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Pretty-prints `value` to `out` followed by a newline.
pub fn write_json<W: Write, T: Serialize + ?Sized>(mut out: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, value).context("Failed to encode JSON")?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Writes `value` to `output`, or to stdout when no file is given.
pub fn render<T: Serialize + ?Sized>(value: &T, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_json(BufWriter::new(file), value)?;
            eprintln!("JSON output written to: {}", path.display());
        }
        None => write_json(io::stdout().lock(), value)?,
    }
    Ok(())
}

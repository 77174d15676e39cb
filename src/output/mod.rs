//! Renderers for a completed scan.
//!
//! # Available Formatters
//!
//! - **Terminal**: Total size plus the largest directories and files
//! - **CSV**: The same top-N rows for spreadsheets and scripts
//! - **JSON**: The full tree or the treemap arrays
//!
//! Each renderer has a writer-generic core (`write_*`) used by the tests and
//! a `render` wrapper that picks stdout or a file.

pub mod csv;
pub mod json;
pub mod terminal;

/// See [`csv::render`].
pub use csv::render as render_csv;

/// See [`json::render`].
pub use json::render as render_json;

/// See [`terminal::render`].
pub use terminal::render as render_terminal;

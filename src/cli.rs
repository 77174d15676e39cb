//! CLI interface definitions for the `dirmap` binary.
//!
//! This module defines command-line arguments using [`clap`] and exposes:
//!
//! - [`Args`]: the main struct parsed from CLI inputs
//! - [`OutputFormat`]: what the run prints or writes
//!
//! Every option can also be supplied through a `DIRMAP_*` environment
//! variable; flags on the command line win.
//!
//! # Example
//!
//! ```bash
//! dirmap ~/projects --exclude-name node_modules --format treemap --output map.json
//! ```

use crate::report::DEFAULT_TOP;
use crate::session::ScanRequest;
use crate::treemap::DEFAULT_MAX_NODES;
use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments for `dirmap`.
#[derive(Parser, Debug)]
#[command(name = "dirmap", author = "Sam Green", version, about)]
pub struct Args {
    /// Directory to scan (defaults to current directory)
    #[arg(default_value = ".", env = "DIRMAP_PATH")]
    pub path: PathBuf,

    /// Skip these absolute paths and everything below them
    #[arg(long, value_name = "PATH", num_args = 1.., action = ArgAction::Append, env = "DIRMAP_EXCLUDE", value_delimiter = ',')]
    pub exclude: Vec<PathBuf>,

    /// Skip entries whose name matches (e.g. 'node_modules', '*.iso')
    #[arg(long, value_name = "PATTERN", num_args = 1.., action = ArgAction::Append, env = "DIRMAP_EXCLUDE_NAME", value_delimiter = ',')]
    pub exclude_name: Vec<String>,

    /// Stop descending below N levels (scanning / defaults to 6)
    #[arg(long, value_name = "N", env = "DIRMAP_DEPTH")]
    pub depth: Option<usize>,

    /// What to produce
    #[arg(long, value_enum, default_value_t = OutputFormat::Summary, env = "DIRMAP_FORMAT")]
    pub format: OutputFormat,

    /// Write JSON (tree or treemap) to FILE instead of stdout
    #[arg(long, value_name = "FILE", env = "DIRMAP_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Also write the largest directories and files to a CSV file
    #[arg(long, value_name = "FILE", env = "DIRMAP_CSV")]
    pub csv: Option<PathBuf>,

    /// Rows in the summary and CSV
    #[arg(long, value_name = "N", default_value_t = DEFAULT_TOP, env = "DIRMAP_TOP")]
    pub top: usize,

    /// Node budget for treemap output
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_NODES, env = "DIRMAP_MAX_NODES")]
    pub max_nodes: usize,

    /// Hide the progress bar
    #[arg(long, default_value_t = false, env = "DIRMAP_NO_PROGRESS")]
    pub no_progress: bool,

    /// Show phase timings and write stats.json next to the output
    #[arg(long, default_value_t = false, env = "DIRMAP_PROFILE")]
    pub profile: bool,

    /// More diagnostics on stderr (repeat for more)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only report errors
    #[arg(short, long, default_value_t = false, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Output selected with `--format`.
///
/// # Variants
/// * `Summary` - Total size plus the largest directories and files
/// * `Tree` - The scanned tree as JSON
/// * `Treemap` - Pruned, flattened treemap arrays as JSON
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum OutputFormat {
    Summary,
    Tree,
    Treemap,
}

impl Args {
    /// The scan request described by these arguments.
    pub fn scan_request(&self) -> ScanRequest {
        ScanRequest {
            root: self.path.clone(),
            exclude_paths: self.exclude.clone(),
            exclude_names: self.exclude_name.clone(),
            max_depth: self.depth,
        }
    }
}

//! Library crate for `dirmap`.
//!
//! Scans a directory into a size-annotated tree suitable for treemap
//! visualisation, with progress reporting and cooperative cancellation.
//!
//! # Features
//!
//! - **Single-pass scanning**: one sequential lstat walk that stays on the
//!   root's filesystem, skips symlinks and counts hardlinks once
//! - **Bounded trees**: small files fold into their directory, small
//!   cache-like directories are dropped, wide directories are capped
//! - **Treemap output**: pruning plus flattening into parallel arrays
//! - **Sessions**: background scans with polling, cancellation and results
//!
//! # Modules
//!
//! - [`scan`]: The tree builder and its options
//! - [`classify`]: Exclusions, cache heuristics, entry kinds, hardlink tracking
//! - [`size`]: Size formatting and the quick directory probe
//! - [`estimate`]: Progress estimates
//! - [`treemap`]: `prune` and `flatten`
//! - [`report`]: Top-N directories and files
//! - [`session`]: The scan state machine
//! - [`output`]: Terminal, CSV and JSON renderers
//! - [`metrics`]: `--profile` timings
//!
//! # Example
//!
//! ```no_run
//! use dirmap::{CancelToken, ScanOptions, ScanTick, scan};
//! use std::path::Path;
//!
//! let outcome = scan(
//!     Path::new("/home"),
//!     &ScanOptions::default(),
//!     &CancelToken::new(),
//!     &mut |_tick: &ScanTick<'_>| {},
//! )?;
//! if let Some(tree) = outcome.into_node() {
//!     println!("{} bytes", tree.size);
//! }
//! # Ok::<(), dirmap::ScanError>(())
//! ```

pub mod classify;
pub mod cli;
pub mod data;
pub mod error;
pub mod estimate;
pub mod logging;
pub mod metrics;
pub mod output;
pub mod report;
pub mod scan;
pub mod session;
pub mod size;
pub mod treemap;

pub use cli::Args;
pub use data::{Node, NodeKind};
pub use error::{ScanError, SessionError};
pub use estimate::estimate_items;
pub use report::{DirSummary, FileSummary, top_directories, top_files};
pub use scan::{CancelToken, ScanOptions, ScanOutcome, ScanTick, scan};
pub use session::{ProgressRecord, ScanRequest, ScanSession, ScanStatus};
pub use treemap::{PruneBudget, TreemapData, flatten, prune};

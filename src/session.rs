//! Scan orchestration: one live scan, its progress record, and its result.
//!
//! A [`ScanSession`] is a small state machine:
//!
//! ```text
//! idle ──start──▶ scanning ──▶ completed
//!                     │   └──▶ error
//!                     └─cancel─▶ cancelled
//! ```
//!
//! Any terminal state may be followed by another `start`, which discards the
//! previous result. Starting while a scan is running is rejected. The scan
//! itself runs on a background thread so callers can poll [`ScanSession::progress`].

use crate::data::Node;
use crate::error::SessionError;
use crate::estimate::{estimate_items, progress_percent};
use crate::scan::{CancelToken, ScanOptions, ScanOutcome, ScanTick, scan};
use crate::treemap::{PruneBudget, TreemapData, flatten, prune};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{error, info};

/// Depth limit applied to scans of `/` when the request gives none.
pub const ROOT_SCAN_DEPTH: usize = 6;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Idle,
    Scanning,
    Completed,
    Cancelled,
    Error,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Idle => "idle",
            ScanStatus::Scanning => "scanning",
            ScanStatus::Completed => "completed",
            ScanStatus::Cancelled => "cancelled",
            ScanStatus::Error => "error",
        }
    }

    /// True once a scan has stopped for good.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanStatus::Completed | ScanStatus::Cancelled | ScanStatus::Error
        )
    }
}

/// Snapshot of a session's progress, suitable for polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressRecord {
    pub status: ScanStatus,
    /// 0 to 100
    pub percent: u8,
    pub current_path: String,
    pub total_bytes: u64,
    pub processed_items: u64,
    pub estimated_items: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Default for ProgressRecord {
    fn default() -> Self {
        Self {
            status: ScanStatus::Idle,
            percent: 0,
            current_path: String::new(),
            total_bytes: 0,
            processed_items: 0,
            estimated_items: 0,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }
}

impl ProgressRecord {
    fn started() -> Self {
        Self {
            status: ScanStatus::Scanning,
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    fn finish(&mut self, status: ScanStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }
}

/// What to scan and what to leave out.
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    pub root: PathBuf,
    /// Absolute paths excluded in addition to the built-in system paths
    pub exclude_paths: Vec<PathBuf>,
    /// Name patterns such as `node_modules` or `*.tmp`
    pub exclude_names: Vec<String>,
    pub max_depth: Option<usize>,
}

impl ScanRequest {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Merges this request into `base`.
    ///
    /// A scan of `/` without an explicit depth (in the request or in `base`)
    /// is limited to [`ROOT_SCAN_DEPTH`].
    pub fn options(&self, base: &ScanOptions) -> Result<ScanOptions, SessionError> {
        let mut options = base.clone();
        for path in &self.exclude_paths {
            options.exclusions.add_path(path.clone());
        }
        if !self.exclude_names.is_empty() {
            options.exclusions = options
                .exclusions
                .with_names(&self.exclude_names)
                .map_err(|e| SessionError::InvalidPattern(format!("{:#}", e)))?;
        }
        options.max_depth = self
            .max_depth
            .or(base.max_depth)
            .or_else(|| (self.root == Path::new("/")).then_some(ROOT_SCAN_DEPTH));
        Ok(options)
    }
}

struct State {
    generation: u64,
    progress: ProgressRecord,
    result: Option<Arc<Node>>,
    cancel: CancelToken,
}

/// Owner of the single live scan and its result.
pub struct ScanSession {
    base: ScanOptions,
    state: Arc<Mutex<State>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanSession {
    pub fn new() -> Self {
        Self::with_options(ScanOptions::default())
    }

    /// A session whose scans start from `base` instead of the defaults.
    pub fn with_options(base: ScanOptions) -> Self {
        Self {
            base,
            state: Arc::new(Mutex::new(State {
                generation: 0,
                progress: ProgressRecord::default(),
                result: None,
                cancel: CancelToken::new(),
            })),
            worker: Mutex::new(None),
        }
    }

    /// Starts scanning `request.root` on a background thread.
    ///
    /// Any previous result is discarded immediately. A cancelled worker that
    /// is still unwinding is joined first, so two walks never overlap.
    ///
    /// # Errors
    /// * [`SessionError::ScanInProgress`] - A scan is still running
    /// * [`SessionError::InvalidPattern`] - An exclude name is not a valid glob
    /// * [`SessionError::Spawn`] - The worker thread could not be started
    pub fn start(&self, request: ScanRequest) -> Result<(), SessionError> {
        let options = request.options(&self.base)?;

        // Held until the new handle is stored so concurrent starts serialize.
        let mut worker = self.worker.lock();
        if self.state.lock().progress.status == ScanStatus::Scanning {
            return Err(SessionError::ScanInProgress);
        }
        if let Some(previous) = worker.take() {
            let _ = previous.join();
        }

        let (generation, cancel) = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.progress = ProgressRecord::started();
            state.result = None;
            state.cancel = CancelToken::new();
            (state.generation, state.cancel.clone())
        };

        info!(root = %request.root.display(), generation, "scan requested");

        let shared = Arc::clone(&self.state);
        let root = request.root;
        let spawned = std::thread::Builder::new()
            .name("dirmap-scan".to_string())
            .spawn(move || run_scan(shared, generation, root, options, cancel));

        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                Ok(())
            }
            Err(err) => {
                let mut state = self.state.lock();
                if state.generation == generation {
                    state.progress.error = Some(err.to_string());
                    state.progress.finish(ScanStatus::Error);
                }
                Err(SessionError::Spawn(err))
            }
        }
    }

    /// Requests cancellation of the running scan.
    ///
    /// The status turns `cancelled` at once; the worker stops at its next
    /// entry. Returns false if no scan was running.
    pub fn cancel(&self) -> bool {
        let mut state = self.state.lock();
        if state.progress.status != ScanStatus::Scanning {
            return false;
        }
        state.cancel.cancel();
        state.progress.finish(ScanStatus::Cancelled);
        info!(generation = state.generation, "scan cancelled");
        true
    }

    pub fn progress(&self) -> ProgressRecord {
        self.state.lock().progress.clone()
    }

    /// The completed tree, if the last scan completed.
    pub fn result(&self) -> Option<Arc<Node>> {
        self.state.lock().result.clone()
    }

    /// Pruned and flattened treemap arrays for the completed tree.
    ///
    /// # Errors
    /// Returns [`SessionError::NoResult`] unless a scan has completed.
    pub fn treemap(&self, max_nodes: usize) -> Result<TreemapData, SessionError> {
        let tree = self.result().ok_or(SessionError::NoResult)?;
        let pruned = prune(&tree, &PruneBudget::default());
        Ok(flatten(&pruned, max_nodes))
    }

    /// Blocks until the most recently started worker exits and returns the
    /// final progress record.
    pub fn wait(&self) -> ProgressRecord {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            // Worker panics are caught inside the worker.
            let _ = handle.join();
        }
        self.progress()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "scan worker panicked".to_string()
    }
}

fn run_scan(
    state: Arc<Mutex<State>>,
    generation: u64,
    root: PathBuf,
    options: ScanOptions,
    cancel: CancelToken,
) {
    let estimate = estimate_items(&root);
    {
        let mut guard = state.lock();
        if guard.generation != generation {
            return;
        }
        guard.progress.estimated_items = estimate;
    }

    let mut on_progress = |tick: &ScanTick<'_>| {
        let mut guard = state.lock();
        if guard.generation != generation || guard.progress.status != ScanStatus::Scanning {
            return;
        }
        let progress = &mut guard.progress;
        progress.current_path = tick.path.display().to_string();
        progress.processed_items = tick.processed;
        progress.total_bytes = tick.counted_bytes;
        progress.percent = progress_percent(tick.processed, estimate);
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        scan(&root, &options, &cancel, &mut on_progress)
    }));

    let mut guard = state.lock();
    if guard.generation != generation {
        return;
    }
    let state = &mut *guard;

    match outcome {
        Ok(Ok(ScanOutcome::Completed(node))) if !cancel.is_cancelled() => {
            state.progress.total_bytes = node.size;
            state.progress.percent = 100;
            state.progress.finish(ScanStatus::Completed);
            info!(root = %root.display(), bytes = node.size, "scan completed");
            state.result = Some(Arc::new(node));
        }
        Ok(Ok(_)) => {
            if state.progress.status != ScanStatus::Cancelled {
                state.progress.finish(ScanStatus::Cancelled);
            }
        }
        Ok(Err(err)) => {
            error!(root = %root.display(), error = %err, "scan failed");
            state.progress.error = Some(err.to_string());
            state.progress.finish(ScanStatus::Error);
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(root = %root.display(), error = %message, "scan worker panicked");
            state.progress.error = Some(message);
            state.progress.finish(ScanStatus::Error);
        }
    }
}

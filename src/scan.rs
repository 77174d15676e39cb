//! File system scanning module for `dirmap`.
//!
//! This module handles:
//! - A single sequential, depth-first walk of a directory subtree
//! - Bottom-up size aggregation using `lstat` (symlinks are never followed)
//! - Mount-boundary, exclusion, and hardlink rules via [`crate::classify`]
//! - Skipping small cache/temp directories via [`crate::size::quick_size`]
//! - Per-directory child capping with a summary placeholder
//! - Progress reporting and cooperative cancellation
//!
//! The main entry point is [`scan`]. It returns [`ScanOutcome::Completed`]
//! with the root [`Node`], or [`ScanOutcome::Cancelled`] if the
//! [`CancelToken`] fired mid-walk. Unreadable entries are skipped; only an
//! invalid root is an error.

use crate::classify::{
    DEFAULT_CACHE_PATTERNS, EntryKind, Exclusions, InodeTracker, is_same_device,
    looks_like_cache_or_temp,
};
use crate::data::{Node, sort_by_size_desc};
use crate::error::ScanError;
use crate::size::{PROBE_SAMPLE, format_size, quick_size};
use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Files above this size are reported as suspicious.
const HUGE_FILE: u64 = 10 * GIB;
/// Totals above this size are reported as suspicious. Advisory only.
const SANITY_TOTAL: u64 = 2000 * GIB;

/// Tunables for one scan.
///
/// `Default` gives the standard behaviour: built-in system exclusions, the
/// standard cache/temp patterns with a 10 MiB keep threshold, 1 MiB file
/// visibility, 50 children per directory and a 10 ms pause every 100 entries.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Paths (and name patterns) that are never entered or counted
    pub exclusions: Exclusions,
    /// Deepest directory level to descend into; the root is level 0
    pub max_depth: Option<usize>,
    /// Locations probed with [`quick_size`] before being scanned
    pub cache_patterns: Vec<String>,
    /// Cache-like directories estimated below this many bytes are skipped
    pub cache_threshold: u64,
    /// Entries sampled by the cache probe
    pub probe_sample: usize,
    /// Files strictly larger than this become visible leaf nodes
    pub visible_file_threshold: u64,
    /// Children kept per directory before the rest fold into a summary node
    pub max_children: usize,
    /// Pause after this many processed entries; `0` disables the pause
    pub throttle_every: u64,
    /// Length of the cooperative pause
    pub throttle_pause: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            exclusions: Exclusions::default(),
            max_depth: None,
            cache_patterns: DEFAULT_CACHE_PATTERNS.iter().map(|p| p.to_string()).collect(),
            cache_threshold: 10 * MIB,
            probe_sample: PROBE_SAMPLE,
            visible_file_threshold: MIB,
            max_children: 50,
            throttle_every: 100,
            throttle_pause: Duration::from_millis(10),
        }
    }
}

/// Shared cancellation flag checked before every entry is processed.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Terminal result of a scan that got past root validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed(Node),
    Cancelled,
}

impl ScanOutcome {
    /// The root node, if the scan ran to completion.
    pub fn into_node(self) -> Option<Node> {
        match self {
            ScanOutcome::Completed(node) => Some(node),
            ScanOutcome::Cancelled => None,
        }
    }
}

/// Progress snapshot passed to the scan callback for every processed entry.
#[derive(Debug, Clone, Copy)]
pub struct ScanTick<'a> {
    /// Entry (or unreadable directory) just reached
    pub path: &'a Path,
    /// Entries processed so far, this one included
    pub processed: u64,
    /// Bytes counted so far
    pub counted_bytes: u64,
}

/// Result of visiting one directory.
enum Visit {
    Node(Node),
    Skip,
    Cancelled,
}

struct Walker<'a> {
    options: &'a ScanOptions,
    cancel: &'a CancelToken,
    on_progress: &'a mut dyn FnMut(&ScanTick<'_>),
    root_dev: Option<u64>,
    inodes: InodeTracker,
    processed: u64,
    counted_bytes: u64,
}

impl Walker<'_> {
    fn tick(&mut self, path: &Path) {
        self.processed += 1;
        (self.on_progress)(&ScanTick {
            path,
            processed: self.processed,
            counted_bytes: self.counted_bytes,
        });

        let every = self.options.throttle_every;
        if every > 0 && self.processed % every == 0 && !self.options.throttle_pause.is_zero() {
            std::thread::sleep(self.options.throttle_pause);
        }
    }

    fn crosses_boundary(&self, dev: u64) -> bool {
        self.root_dev.is_some_and(|root_dev| !is_same_device(root_dev, dev))
    }

    fn visit_dir(&mut self, path: &Path, depth: usize) -> Visit {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return Visit::Skip;
        }

        if self.options.exclusions.is_excluded(path) {
            debug!(path = %path.display(), "skipping excluded directory");
            return Visit::Skip;
        }

        // The root was asked for explicitly, so the heuristic never drops it.
        if depth > 0 && looks_like_cache_or_temp(path, &self.options.cache_patterns) {
            match quick_size(path, self.options.probe_sample) {
                Some(estimate) if estimate < self.options.cache_threshold => {
                    debug!(
                        path = %path.display(),
                        estimate = %format_size(estimate),
                        "skipping small cache/temp directory"
                    );
                    return Visit::Skip;
                }
                Some(estimate) => {
                    debug!(
                        path = %path.display(),
                        estimate = %format_size(estimate),
                        "including large cache/temp directory"
                    );
                }
                None => {}
            }
        }

        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(err) => {
                trace!(path = %path.display(), error = %err, "cannot stat directory");
                self.tick(path);
                return Visit::Skip;
            }
        };
        if EntryKind::of(&meta) != EntryKind::Directory {
            return Visit::Skip;
        }
        if self.crosses_boundary(meta.dev()) {
            debug!(path = %path.display(), "skipping different filesystem");
            return Visit::Skip;
        }

        let name = if depth == 0 {
            path.display().to_string()
        } else {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string())
        };
        let mut node = Node::directory(name, path);

        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(err) => {
                trace!(path = %path.display(), error = %err, "cannot list directory");
                self.tick(path);
                return Visit::Node(node);
            }
        };

        let mut children: Vec<Node> = Vec::new();
        for entry in entries {
            if self.cancel.is_cancelled() {
                return Visit::Cancelled;
            }
            let Ok(entry) = entry else {
                continue;
            };
            let entry_path = entry.path();
            self.tick(&entry_path);

            if self.options.exclusions.is_excluded(&entry_path) {
                debug!(path = %entry_path.display(), "skipping excluded entry");
                continue;
            }

            let meta = match fs::symlink_metadata(&entry_path) {
                Ok(meta) => meta,
                Err(err) => {
                    trace!(path = %entry_path.display(), error = %err, "cannot stat entry");
                    continue;
                }
            };

            let kind = EntryKind::of(&meta);
            if kind == EntryKind::Symlink || self.crosses_boundary(meta.dev()) {
                continue;
            }

            match kind {
                EntryKind::Directory => match self.visit_dir(&entry_path, depth + 1) {
                    Visit::Node(child) => {
                        node.size += child.size;
                        node.file_count += child.file_count;
                        node.dir_count += 1 + child.dir_count;
                        children.push(child);
                    }
                    Visit::Skip => {}
                    Visit::Cancelled => return Visit::Cancelled,
                },
                EntryKind::File => {
                    if !self.inodes.observe(&meta) {
                        continue;
                    }
                    let size = meta.len();
                    if size > HUGE_FILE {
                        warn!(
                            path = %entry_path.display(),
                            size = %format_size(size),
                            "very large file detected"
                        );
                    }
                    self.counted_bytes += size;
                    node.size += size;
                    node.file_count += 1;
                    if size > self.options.visible_file_threshold {
                        let name = entry.file_name().to_string_lossy().into_owned();
                        children.push(Node::file(name, &entry_path, size));
                    }
                }
                EntryKind::Symlink | EntryKind::Other => {}
            }
        }

        sort_by_size_desc(&mut children);
        if children.len() > self.options.max_children {
            let dropped = children.split_off(self.options.max_children);
            let dropped_size = dropped.iter().map(|c| c.size).sum();
            children.push(Node::summary(path, dropped.len(), dropped_size));
        }
        node.children = children;

        Visit::Node(node)
    }
}

/// Validates `root`.
///
/// Returns the absolute path as requested and the directory to walk, which
/// differ only when `root` is a symlink.
fn resolve_root(root: &Path) -> Result<(PathBuf, PathBuf), ScanError> {
    let absolute = std::path::absolute(root).map_err(|e| ScanError::io(root, e))?;
    let absolute: PathBuf = absolute.components().collect();

    let meta = match fs::metadata(&absolute) {
        Ok(meta) => meta,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(ScanError::NotFound(absolute));
        }
        Err(err) => return Err(ScanError::io(absolute, err)),
    };
    if !meta.is_dir() {
        return Err(ScanError::NotADirectory(absolute));
    }

    let is_link = fs::symlink_metadata(&absolute)
        .map_err(|e| ScanError::io(&absolute, e))?
        .file_type()
        .is_symlink();
    if is_link {
        let resolved = fs::canonicalize(&absolute).map_err(|e| ScanError::io(&absolute, e))?;
        Ok((absolute, resolved))
    } else {
        Ok((absolute.clone(), absolute))
    }
}

/// Recursively scans `root` and returns its size-annotated tree.
///
/// `on_progress` is called with a [`ScanTick`] for each entry. `cancel` is
/// checked before every entry; once it fires the walk stops making filesystem
/// calls and returns [`ScanOutcome::Cancelled`], discarding the partial tree.
///
/// A symlinked root is walked at its target, and excluded paths given under
/// the link are applied to the target as well.
///
/// # Errors
/// * [`ScanError::NotFound`] - `root` does not exist
/// * [`ScanError::NotADirectory`] - `root` is not a directory
/// * [`ScanError::RootExcluded`] - `root` lies under an excluded path
/// * [`ScanError::Io`] - `root` could not be inspected
pub fn scan(
    root: &Path,
    options: &ScanOptions,
    cancel: &CancelToken,
    on_progress: &mut dyn FnMut(&ScanTick<'_>),
) -> Result<ScanOutcome, ScanError> {
    let (requested, root) = resolve_root(root)?;
    let rebased;
    let options = if requested != root {
        rebased = ScanOptions {
            exclusions: options.exclusions.rebased(&requested, &root),
            ..options.clone()
        };
        &rebased
    } else {
        options
    };
    if options.exclusions.is_excluded(&root) {
        return Err(ScanError::RootExcluded(root));
    }

    let root_dev = fs::symlink_metadata(&root).ok().map(|m| m.dev());
    info!(
        root = %root.display(),
        device = ?root_dev,
        exclusions = options.exclusions.paths().len(),
        max_depth = ?options.max_depth,
        "starting scan"
    );

    let mut walker = Walker {
        options,
        cancel,
        on_progress,
        root_dev,
        inodes: InodeTracker::new(),
        processed: 0,
        counted_bytes: 0,
    };

    let node = match walker.visit_dir(&root, 0) {
        Visit::Node(node) => node,
        Visit::Cancelled => {
            info!(root = %root.display(), processed = walker.processed, "scan cancelled");
            return Ok(ScanOutcome::Cancelled);
        }
        Visit::Skip => return Err(ScanError::NotADirectory(root)),
    };

    info!(
        root = %root.display(),
        total = %format_size(node.size),
        files = node.file_count,
        dirs = node.dir_count,
        hardlinked_inodes = walker.inodes.len(),
        processed = walker.processed,
        "scan complete"
    );
    if node.size > SANITY_TOTAL {
        warn!(
            total = %format_size(node.size),
            "calculated size seems unusually large; check for network mounts or hardlinks"
        );
    }

    Ok(ScanOutcome::Completed(node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn quiet() -> ScanOptions {
        ScanOptions {
            cache_patterns: Vec::new(),
            throttle_every: 0,
            ..ScanOptions::default()
        }
    }

    fn no_progress(_: &ScanTick<'_>) {}

    fn sparse(path: &Path, len: u64) {
        File::create(path).unwrap().set_len(len).unwrap();
    }

    #[test]
    fn test_root_validation() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, b"x").unwrap();
        let cancel = CancelToken::new();

        let err = scan(&dir.path().join("nope"), &quiet(), &cancel, &mut no_progress).unwrap_err();
        assert!(matches!(err, ScanError::NotFound(_)));

        let err = scan(&file, &quiet(), &cancel, &mut no_progress).unwrap_err();
        assert!(matches!(err, ScanError::NotADirectory(_)));

        let options = ScanOptions {
            exclusions: Exclusions::with_paths([dir.path()]),
            ..quiet()
        };
        let err = scan(dir.path(), &options, &cancel, &mut no_progress).unwrap_err();
        assert!(matches!(err, ScanError::RootExcluded(_)));
    }

    #[test]
    fn test_root_name_is_full_path() {
        let dir = tempfile::tempdir().unwrap();
        let root = scan(dir.path(), &quiet(), &CancelToken::new(), &mut no_progress)
            .unwrap()
            .into_node()
            .unwrap();
        assert_eq!(root.name, root.path.display().to_string());
        assert!(root.path.is_absolute());
    }

    #[test]
    fn test_progress_reports_every_entry() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("a"), b"a").unwrap();
        fs::write(dir.path().join("b"), b"b").unwrap();

        let mut seen = Vec::new();
        let mut record = |tick: &ScanTick<'_>| {
            seen.push((tick.path.to_path_buf(), tick.processed, tick.counted_bytes));
        };
        scan(dir.path(), &quiet(), &CancelToken::new(), &mut record).unwrap();

        assert_eq!(seen.len(), 3);
        let (_, processed, counted) = seen.last().unwrap();
        assert_eq!(*processed, 3);
        assert!(*counted <= 2);
    }

    #[test]
    fn test_cancel_before_first_entry() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a"), b"a").unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let outcome = scan(dir.path(), &quiet(), &cancel, &mut no_progress).unwrap();
        assert_eq!(outcome, ScanOutcome::Cancelled);
    }

    #[test]
    fn test_counts_are_transitive() {
        let dir = tempfile::tempdir().unwrap();
        let deep = dir.path().join("a").join("b");
        fs::create_dir_all(&deep).unwrap();
        fs::write(deep.join("x"), b"12345").unwrap();
        fs::write(dir.path().join("a").join("y"), b"123").unwrap();
        sparse(&dir.path().join("z"), 2 * MIB);

        let root = scan(dir.path(), &quiet(), &CancelToken::new(), &mut no_progress)
            .unwrap()
            .into_node()
            .unwrap();

        assert_eq!(root.size, 2 * MIB + 8);
        assert_eq!(root.file_count, 3);
        assert_eq!(root.dir_count, 2);
        assert_eq!(root.children[0].name, "z");
        assert!(root.children[0].is_file());
        assert_eq!(root.children[1].name, "a");
        assert_eq!(root.children[1].dir_count, 1);
    }

    #[test]
    fn test_other_device_contributes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::create_dir(sub.join("nested")).unwrap();
        fs::write(sub.join("a"), vec![0u8; 100]).unwrap();
        sparse(&sub.join("big"), 3 * MIB);
        let real_dev = fs::symlink_metadata(dir.path()).unwrap().dev();

        let options = quiet();
        let cancel = CancelToken::new();
        let mut progress = no_progress;
        let mut walker = Walker {
            options: &options,
            cancel: &cancel,
            on_progress: &mut progress,
            root_dev: Some(real_dev.wrapping_add(1)),
            inodes: InodeTracker::new(),
            processed: 0,
            counted_bytes: 0,
        };

        assert!(walker.crosses_boundary(real_dev));
        assert!(matches!(walker.visit_dir(&sub, 1), Visit::Skip));
        assert!(matches!(walker.visit_dir(dir.path(), 0), Visit::Skip));
        assert_eq!(walker.counted_bytes, 0);
        assert_eq!(walker.processed, 0);

        walker.root_dev = Some(real_dev);
        match walker.visit_dir(&sub, 1) {
            Visit::Node(node) => assert_eq!(node.size, 3 * MIB + 100),
            _ => panic!("same-device directory should be scanned"),
        }
    }

    #[test]
    fn test_cache_heuristic_skips_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cache");
        fs::create_dir_all(root.join("cache")).unwrap();
        fs::write(root.join("a"), vec![0u8; 10]).unwrap();
        fs::write(root.join("cache").join("b"), vec![0u8; 20]).unwrap();
        let options = ScanOptions {
            cache_patterns: vec!["cache".to_string()],
            ..quiet()
        };

        let tree = scan(&root, &options, &CancelToken::new(), &mut no_progress)
            .unwrap()
            .into_node()
            .unwrap();

        // The small nested cache directory is dropped, the requested root is not.
        assert_eq!(tree.size, 10);
        assert_eq!(tree.dir_count, 0);
    }

    #[test]
    fn test_exclusions_under_symlinked_root() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        fs::create_dir_all(real.join("sub")).unwrap();
        fs::write(real.join("keep"), vec![0u8; 7]).unwrap();
        fs::write(real.join("sub").join("skip"), vec![0u8; 500]).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let options = ScanOptions {
            exclusions: Exclusions::with_paths([link.join("sub")]),
            ..quiet()
        };
        let tree = scan(&link, &options, &CancelToken::new(), &mut no_progress)
            .unwrap()
            .into_node()
            .unwrap();
        assert_eq!(tree.size, 7);
        assert_eq!(tree.dir_count, 0);

        let options = ScanOptions {
            exclusions: Exclusions::with_paths([&link]),
            ..quiet()
        };
        let err = scan(&link, &options, &CancelToken::new(), &mut no_progress).unwrap_err();
        assert!(matches!(err, ScanError::RootExcluded(_)));
    }
}

//! Pure predicates deciding what a scan counts.
//!
//! This module provides:
//! - [`Exclusions`]: path-prefix and name-glob exclusion rules
//! - [`looks_like_cache_or_temp`]: the advisory cache/temp location heuristic
//! - [`is_same_device`]: the mount-boundary check
//! - [`EntryKind`]: symlink / directory / regular-file classification from lstat
//! - [`InodeTracker`]: hardlink deduplication across one scan

use anyhow::{Context, Result};
use fnv::FnvHashSet;
use globset::{Glob, GlobSet, GlobSetBuilder};
use once_cell::sync::Lazy;
use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;
use std::path::{Component, Path, PathBuf};

/// Virtual filesystems and OS metadata stores that are never scanned.
pub static SYSTEM_EXCLUSIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    [
        "/dev",
        "/proc",
        "/sys",
        "/.Spotlight-V100",
        "/.fseventsd",
        "/.Trashes",
        "/.DocumentRevisions-V100",
        "/.PKInstallSandboxManager",
        "/cores",
        "/var/vm",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
});

/// Well-known cache, log and temp locations probed before being scanned.
pub const DEFAULT_CACHE_PATTERNS: &[&str] = &[
    "/var/folders",
    "/var/db",
    "/var/cache",
    "/tmp",
    "/Library/Caches",
    "/System/Library/Caches",
    "/Library/Logs",
    "/usr/share",
    "/usr/lib",
    "/System/Volumes",
    "/System/Library/Extensions",
];

/// The set of paths a scan must not enter.
///
/// Holds the built-in [`SYSTEM_EXCLUSIONS`], caller-supplied paths, and an
/// optional glob matcher built from bare names such as `node_modules`.
#[derive(Debug, Clone)]
pub struct Exclusions {
    paths: Vec<PathBuf>,
    names: Option<GlobSet>,
}

impl Default for Exclusions {
    fn default() -> Self {
        Self {
            paths: SYSTEM_EXCLUSIONS.clone(),
            names: None,
        }
    }
}

impl Exclusions {
    /// Built-in exclusions plus the given absolute paths.
    pub fn with_paths<I, P>(extra: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut exclusions = Self::default();
        for path in extra {
            exclusions.add_path(path);
        }
        exclusions
    }

    /// Adds one path. Trailing separators are ignored.
    pub fn add_path(&mut self, path: impl Into<PathBuf>) {
        let path: PathBuf = path.into().components().collect();
        if !path.as_os_str().is_empty() && !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    /// Compiles name patterns (see [`expand_exclude_patterns`]) into the matcher.
    ///
    /// # Errors
    /// Returns an error if any pattern is not a valid glob.
    pub fn with_names(mut self, patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            self.names = None;
        } else {
            let expanded = expand_exclude_patterns(patterns);
            self.names = Some(build_exclude_matcher(&expanded)?);
        }
        Ok(self)
    }

    /// Copy of these exclusions where every path under `from` is also
    /// excluded at the same place under `to`.
    pub fn rebased(&self, from: &Path, to: &Path) -> Self {
        let mut rebased = self.clone();
        for path in &self.paths {
            if let Ok(rest) = path.strip_prefix(from) {
                rebased.add_path(to.join(rest));
            }
        }
        rebased
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// True if `path` equals, or lies beneath, any excluded path, or matches a
    /// name pattern.
    ///
    /// Matching is component-wise, so `/devices` is not excluded by `/dev`.
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.paths.iter().any(|excluded| path.starts_with(excluded)) {
            return true;
        }
        self.names
            .as_ref()
            .is_some_and(|matcher| matcher.is_match(path))
    }
}

/// Expands bare names into globs that match the name anywhere in a path:
/// `node_modules` becomes `**/node_modules` and `**/node_modules/**`.
/// A trailing slash is dropped first. Patterns containing glob syntax or an
/// inner `/` are kept as they are.
pub fn expand_exclude_patterns(patterns: &[String]) -> Vec<String> {
    let mut expanded = Vec::new();

    for pat in patterns {
        let pat = pat.trim().trim_end_matches('/');
        if pat.is_empty() {
            continue;
        }
        if pat.contains(['*', '?', '[', '{', '/']) {
            expanded.push(pat.to_string());
        } else {
            expanded.push(format!("**/{}", pat));
            expanded.push(format!("**/{}/**", pat));
        }
    }

    expanded
}

/// Compiles glob patterns into a single matcher.
pub fn build_exclude_matcher(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).with_context(|| format!("Invalid glob pattern: '{}'", pattern))?;
        builder.add(glob);
    }
    builder.build().context("Failed to build glob set")
}

fn normal_components(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_lowercase()),
            _ => None,
        })
        .collect()
}

/// True if `path` starts with, or contains as a run of whole segments, any of
/// `patterns`. Comparison ignores ASCII and Unicode case.
///
/// `/tmp` therefore matches `/tmp/x` and `/home/me/tmp/x` but not `/tmpfiles`.
pub fn looks_like_cache_or_temp<S: AsRef<str>>(path: &Path, patterns: &[S]) -> bool {
    let segments = normal_components(path);
    patterns.iter().any(|pattern| {
        let needle = normal_components(Path::new(pattern.as_ref()));
        !needle.is_empty()
            && needle.len() <= segments.len()
            && segments
                .windows(needle.len())
                .any(|window| window == needle.as_slice())
    })
}

/// True if an entry on `entry_dev` belongs to the filesystem the scan started on.
pub fn is_same_device(root_dev: u64, entry_dev: u64) -> bool {
    root_dev == entry_dev
}

/// Classification of an lstat result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Symlink,
    Directory,
    File,
    /// Sockets, FIFOs, device nodes.
    Other,
}

impl EntryKind {
    /// Classifies metadata obtained without following symlinks.
    pub fn of(meta: &Metadata) -> Self {
        let ft = meta.file_type();
        if ft.is_symlink() {
            EntryKind::Symlink
        } else if ft.is_dir() {
            EntryKind::Directory
        } else if ft.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }
}

/// Remembers multiply-linked files so each (device, inode) is counted once.
#[derive(Debug, Default)]
pub struct InodeTracker {
    seen: FnvHashSet<(u64, u64)>,
}

impl InodeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the file should be counted.
    ///
    /// Files with a single link are always counted and never recorded.
    pub fn first_sighting(&mut self, dev: u64, ino: u64, nlink: u64) -> bool {
        if nlink <= 1 {
            return true;
        }
        self.seen.insert((dev, ino))
    }

    /// Convenience wrapper over [`Self::first_sighting`] for lstat metadata.
    pub fn observe(&mut self, meta: &Metadata) -> bool {
        self.first_sighting(meta.dev(), meta.ino(), meta.nlink())
    }

    /// Number of multiply-linked inodes recorded so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

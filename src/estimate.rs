//! Rough work estimates for progress reporting.
//!
//! The estimate only normalises a progress percentage. It is allowed to be
//! wildly off in either direction, so the percentage saturates at 100.

use std::path::Path;
use walkdir::WalkDir;

/// Estimate used for a scan of the filesystem root, which is never enumerated.
pub const ROOT_ESTIMATE: u64 = 10_000;
/// Estimate used when the root's immediate children cannot be listed.
pub const FALLBACK_ESTIMATE: u64 = 1_000;
/// Assumed number of items beneath each immediate child.
pub const FAN_OUT: u64 = 20;

/// Returns a fast, non-recursive estimate (always ≥ 1) of the number of
/// entries a scan of `root` will visit.
pub fn estimate_items(root: &Path) -> u64 {
    if root == Path::new("/") {
        return ROOT_ESTIMATE;
    }

    let mut children: u64 = 0;
    for entry in WalkDir::new(root).min_depth(1).max_depth(1).into_iter() {
        match entry {
            Ok(_) => children += 1,
            Err(err) if err.depth() == 0 => return FALLBACK_ESTIMATE,
            Err(_) => {}
        }
    }

    (children * FAN_OUT).max(1)
}

/// `processed / max(estimate, 1)` as a percentage clamped to `0..=100`.
pub fn progress_percent(processed: u64, estimate: u64) -> u8 {
    let ratio = processed as f64 / estimate.max(1) as f64;
    (ratio * 100.0).clamp(0.0, 100.0) as u8
}

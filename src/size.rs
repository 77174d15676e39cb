//! Cheap, bounded-cost size helpers.
//!
//! - [`format_size`] renders byte counts the way the summary output shows them
//! - [`quick_size`] samples the first entries of a directory and extrapolates

use humansize::{FormatSizeOptions, WINDOWS};
use std::path::Path;
use walkdir::WalkDir;

/// Number of entries [`quick_size`] inspects before extrapolating.
pub const PROBE_SAMPLE: usize = 50;

/// Formats `bytes` with base-1024 units and a single decimal, e.g. `1.5 MB`.
pub fn format_size(bytes: u64) -> String {
    let options = FormatSizeOptions::from(WINDOWS).decimal_places(1);
    humansize::format_size(bytes, options)
}

/// Estimates the byte size of the regular files directly inside `path`.
///
/// At most `sample` entries are stat'd (without following symlinks). When the
/// sample fills up and the directory holds more entries than that, the sampled
/// total is scaled linearly by `total_entries / sample`. Subdirectories are
/// not descended into.
///
/// # Returns
/// * `Some(bytes)` - The estimate
/// * `None` - The directory could not be listed
pub fn quick_size(path: &Path, sample: usize) -> Option<u64> {
    let sample = sample.max(1);
    let mut entries = WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .into_iter();

    let mut total: u64 = 0;
    let mut inspected = 0usize;
    while inspected < sample {
        let Some(entry) = entries.next() else {
            break;
        };
        let entry = match entry {
            Ok(entry) => entry,
            // The directory itself could not be opened or listed.
            Err(err) if err.depth() == 0 => return None,
            Err(_) => continue,
        };
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if meta.file_type().is_file() {
            total += meta.len();
        }
        inspected += 1;
    }

    if inspected >= sample {
        let remaining = entries.count();
        if remaining > 0 {
            let total_entries = (inspected + remaining) as f64;
            total = (total as f64 * (total_entries / sample as f64)) as u64;
        }
    }

    Some(total)
}

//! Phase timings and memory figures for `--profile` runs.
//!
//! This module provides:
//! - [`PhaseTimer`] - Times one phase (scan, prune, flatten, output)
//! - [`ScanProfile`] - Collected phases plus scan counters
//! - [`rss_after_phase`] - Current resident set size via `sysinfo`
//! - [`print_profile_summary`] - Human-readable summary on stdout
//! - [`save_stats_json`] - Machine-readable `stats.json` next to the output
//!
//! # Usage
//!
//! ```rust
//! use dirmap::metrics::{PhaseTimer, ScanProfile, rss_after_phase};
//!
//! let mut profile = ScanProfile::new();
//! let timer = PhaseTimer::new("scan");
//! // ... scan ...
//! profile.add_phase(timer.finish());
//! profile.observe_memory(rss_after_phase());
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use sysinfo::System;

use crate::size::format_size;

/// Measures one named phase.
#[derive(Debug, Clone)]
pub struct PhaseTimer {
    pub name: String,
    pub start: Instant,
}

impl PhaseTimer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }

    /// Stops the timer.
    ///
    /// # Returns
    /// A `PhaseResult` holding the phase name and elapsed time.
    pub fn finish(self) -> PhaseResult {
        PhaseResult {
            name: self.name,
            duration: self.start.elapsed(),
        }
    }
}

/// A finished phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseResult {
    pub name: String,
    /// Serialized as whole milliseconds
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// Everything `--profile` reports about one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanProfile {
    pub phases: Vec<PhaseResult>,
    /// Highest RSS seen after any phase, in bytes
    pub memory_peak: Option<u64>,
    pub root: Option<PathBuf>,
    pub total_bytes: u64,
    pub processed_items: u64,
    pub node_count: usize,
    pub metadata: BTreeMap<String, String>,
}

impl ScanProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_phase(&mut self, phase: PhaseResult) {
        self.phases.push(phase);
    }

    /// Keeps the larger of the stored peak and `rss`.
    pub fn observe_memory(&mut self, rss: Option<u64>) {
        if let Some(bytes) = rss {
            self.memory_peak = Some(self.memory_peak.map_or(bytes, |peak| peak.max(bytes)));
        }
    }

    pub fn add_metadata(&mut self, key: &str, value: impl ToString) {
        self.metadata.insert(key.to_string(), value.to_string());
    }

    pub fn total_duration(&self) -> Duration {
        self.phases.iter().map(|p| p.duration).sum()
    }

    /// Entries processed per second over the scan phase, if one was recorded.
    pub fn items_per_second(&self) -> Option<f64> {
        let scan = self.phases.iter().find(|p| p.name == "scan")?;
        let secs = scan.duration.as_secs_f64();
        (secs > 0.0).then(|| self.processed_items as f64 / secs)
    }
}

/// Resident set size of this process in bytes, or `None` when `sysinfo`
/// cannot see it (restricted containers, unsupported targets).
pub fn rss_after_phase() -> Option<u64> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = System::new();
    if !system.refresh_process(pid) {
        return None;
    }
    system.process(pid).map(|process| process.memory())
}

/// Prints phase timings and counters.
///
/// # Example Output
/// ```text
/// Scan phase timings
///   scan                412 ms
///   prune                 3 ms
///   flatten               1 ms
/// Items scanned:    18234 (44257/s)
/// Memory peak:      21.4 MB
/// ```
pub fn print_profile_summary(profile: &ScanProfile) {
    println!("\nScan phase timings");
    for phase in &profile.phases {
        println!("  {:<15} {:>7} ms", phase.name, phase.duration.as_millis());
    }
    println!("  {:<15} {:>7} ms", "total", profile.total_duration().as_millis());

    match profile.items_per_second() {
        Some(rate) => println!(
            "Items scanned:    {} ({:.0}/s)",
            profile.processed_items, rate
        ),
        None => println!("Items scanned:    {}", profile.processed_items),
    }
    println!("Bytes counted:    {}", format_size(profile.total_bytes));
    if profile.node_count > 0 {
        println!("Tree nodes:       {}", profile.node_count);
    }
    if let Some(peak) = profile.memory_peak {
        println!("Memory peak:      {:.1} MB", peak as f64 / (1024.0 * 1024.0));
    }

    if !profile.metadata.is_empty() {
        println!("\nAdditional metrics:");
        for (key, value) in &profile.metadata {
            println!("  {:<15} {}", key, value);
        }
    }
    println!();
}

/// Writes `stats.json` into the directory of `output_path`.
///
/// # Returns
/// The path of the written file.
pub fn save_stats_json(output_path: &Path, profile: &ScanProfile) -> Result<PathBuf> {
    let stats_path = output_path.with_file_name("stats.json");

    let stats = serde_json::json!({
        "root": profile.root,
        "scan_phases": profile.phases,
        "total_duration_ms": profile.total_duration().as_millis() as u64,
        "total_bytes": profile.total_bytes,
        "processed_items": profile.processed_items,
        "items_per_second": profile.items_per_second(),
        "node_count": profile.node_count,
        "memory_peak_bytes": profile.memory_peak,
        "metadata": profile.metadata,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    let body = serde_json::to_string_pretty(&stats).context("Failed to encode stats")?;
    std::fs::write(&stats_path, body)
        .with_context(|| format!("Failed to write {}", stats_path.display()))?;
    Ok(stats_path)
}

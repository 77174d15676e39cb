//! Main entry point for the `dirmap` CLI application.
//!
//! `dirmap` scans a directory into a size-annotated tree and prints a summary,
//! the tree as JSON, or flattened treemap arrays for a renderer.
//!
//! # Responsibilities
//! - Parses CLI arguments via [`clap`] using the [`Args`] struct
//! - Runs the scan on a [`ScanSession`] while drawing a progress bar
//! - Hands the finished tree to the selected renderer
//!
//! # Flags of Interest
//! - `--format summary|tree|treemap`: What to produce
//! - `--exclude PATH`, `--exclude-name PATTERN`: Skip parts of the tree
//! - `--csv FILE`: Top-N export alongside any format
//! - `--profile`: Phase timings and `stats.json`

use anyhow::{Context, Result, bail};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::thread;
use std::time::Duration;

use dirmap::cli::{Args, OutputFormat};
use dirmap::metrics::{
    PhaseTimer, ScanProfile, print_profile_summary, rss_after_phase, save_stats_json,
};
use dirmap::output::{render_csv, render_json, render_terminal};
use dirmap::session::{ScanSession, ScanStatus};
use dirmap::treemap::{PruneBudget, flatten, prune};
use dirmap::{Node, ProgressRecord, logging};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn progress_bar(args: &Args) -> Result<ProgressBar> {
    if args.no_progress || args.quiet {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed}] {bar:30} {pos:>3}% {msg}")
            .context("Failed to set progress template")?
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"]),
    );
    pb.enable_steady_tick(POLL_INTERVAL);
    Ok(pb)
}

fn short_path(path: &str) -> String {
    const MAX: usize = 60;
    let count = path.chars().count();
    if count <= MAX {
        path.to_string()
    } else {
        let tail: String = path.chars().skip(count - (MAX - 3)).collect();
        format!("...{}", tail)
    }
}

/// Polls the session until its worker exits.
fn wait_with_progress(session: &ScanSession, pb: &ProgressBar) -> ProgressRecord {
    loop {
        let progress = session.progress();
        if progress.status != ScanStatus::Scanning {
            break;
        }
        pb.set_position(progress.percent as u64);
        pb.set_message(short_path(&progress.current_path));
        thread::sleep(POLL_INTERVAL);
    }
    session.wait()
}

fn write_outputs(args: &Args, tree: &Node, profile: &mut ScanProfile) -> Result<()> {
    match args.format {
        OutputFormat::Summary => render_terminal(tree, args.top)?,
        OutputFormat::Tree => render_json(tree, args.output.as_deref())?,
        OutputFormat::Treemap => {
            let timer = PhaseTimer::new("prune");
            let pruned = prune(tree, &PruneBudget::default());
            profile.add_phase(timer.finish());

            let timer = PhaseTimer::new("flatten");
            let data = flatten(&pruned, args.max_nodes);
            profile.add_phase(timer.finish());
            profile.node_count = data.node_count;

            render_json(&data, args.output.as_deref())?;
        }
    }

    if let Some(csv_path) = &args.csv {
        render_csv(tree, args.top, csv_path)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose, args.quiet);

    let mut profile = ScanProfile::new();
    profile.root = Some(args.path.clone());

    let session = ScanSession::new();
    let pb = progress_bar(&args)?;

    let timer = PhaseTimer::new("scan");
    session
        .start(args.scan_request())
        .with_context(|| format!("Failed to start scan of {}", args.path.display()))?;
    let finished = wait_with_progress(&session, &pb);
    profile.add_phase(timer.finish());
    profile.observe_memory(rss_after_phase());
    pb.finish_and_clear();

    profile.processed_items = finished.processed_items;
    profile.total_bytes = finished.total_bytes;
    profile.add_metadata("estimated_items", finished.estimated_items);
    profile.add_metadata("format", format!("{:?}", args.format).to_lowercase());

    let tree = match (finished.status, session.result()) {
        (ScanStatus::Completed, Some(tree)) => tree,
        (ScanStatus::Error, _) => bail!(
            "Scan of {} failed: {}",
            args.path.display(),
            finished.error.unwrap_or_else(|| "unknown error".to_string())
        ),
        (status, _) => bail!("Scan of {} ended as {}", args.path.display(), status.as_str()),
    };

    let timer = PhaseTimer::new("output");
    write_outputs(&args, &tree, &mut profile)?;
    profile.add_phase(timer.finish());
    profile.observe_memory(rss_after_phase());

    if args.profile {
        print_profile_summary(&profile);
        let anchor = args
            .output
            .as_deref()
            .or(args.csv.as_deref())
            .unwrap_or(Path::new("dirmap.json"));
        let stats = save_stats_json(anchor, &profile)?;
        println!("Performance stats saved to: {}", stats.display());
    }

    Ok(())
}

//! Diagnostic logging for the `dirmap` binary.
//!
//! Logs go to stderr so JSON written to stdout stays machine-readable.
//! `RUST_LOG` wins over the verbosity flags when it is set.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Maps `-v`/`-q` to a level. The default shows warnings only.
pub fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn filter_for(level: LevelFilter) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::WARN.into())
            .parse_lossy(format!("dirmap={}", level))
    })
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init(verbose: u8, quiet: bool) {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose > 1);

    let _ = tracing_subscriber::registry()
        .with(filter_for(level_for(verbose, quiet)))
        .with(layer)
        .try_init();
}

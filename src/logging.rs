//! Logging setup for radar_love
//!
//! Structured logging via tracing. Compact format by default; `--verbose`
//! switches the default filter to debug. `RUST_LOG` overrides both.

use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

/// Check if colored output should be used.
///
/// Returns true only if stdout is a terminal and `NO_COLOR` is not set.
fn use_color() -> bool {
    std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Initialize the tracing subscriber.
///
/// Safe to call once per process; a second call is a no-op because the
/// global default is already installed.
pub fn init(verbose: bool) {
    let default_filter = if verbose {
        "radar_love=debug,info"
    } else {
        "radar_love=info,warn"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(use_color())
        .with_target(verbose)
        .compact()
        .with_writer(std::io::stderr)
        .try_init();
}

//! Console logging for CLI commands

use tracing_subscriber::EnvFilter;

/// Initialize console logging. `RUST_LOG` still takes precedence
/// over the level derived from `--verbose`.
pub fn init_cli_logging(verbose: bool) {
  let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::builder().with_default_directive(level.into()).from_env_lossy())
    .with_target(false)
    .init();
}

/// Log output for the `veilmood` binary.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` applies (the CLI
/// passes `info`, or `debug` with `-v`). Logs go to stderr so JSON results on
/// stdout stay machine-readable.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Returns false if one was already set.
pub fn init(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise warnings are shown and each `-v`
/// raises the level one step.
pub fn init(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

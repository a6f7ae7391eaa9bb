use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

static INIT: Once = Once::new();

/// Install the global subscriber. Progress and debug dumps go to stdout, warnings and errors
/// to stderr. `ENACT_LOG` wins over the level implied by the run options.
pub fn init(debug: bool, verbose: bool) {
    INIT.call_once(|| {
        let default_level = if debug {
            "debug"
        } else if verbose {
            "info"
        } else {
            "warn"
        };
        let filter =
            EnvFilter::try_from_env("ENACT_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr.with_max_level(Level::WARN).or_else(std::io::stdout))
            .with_target(debug)
            .without_time()
            .with_ansi(false)
            .init();
    });
}

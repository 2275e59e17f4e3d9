//! Logging setup for the `sheet-loader` binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is left to the binary.
use crate::error::SheetLoaderError;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Maps the command-line flags to a maximum level.
///
/// `quiet` wins over any verbosity: ERROR. Otherwise 0 is INFO, 1 is DEBUG and 2+ is TRACE.
pub fn level_for(verbose: u8, quiet: bool) -> Level {
    match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    }
}

/// Installs a stderr subscriber at the level chosen by the flags.
/// A `RUST_LOG` directive, when set, takes precedence.
pub fn init_logging(verbose: u8, quiet: bool) -> Result<(), SheetLoaderError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbose, quiet).as_str().to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| SheetLoaderError::WithContextError(format!("Failed to initialize logging: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    // A subscriber can only be installed once per process, so only the mapping is tested.
    #[test]
    fn verbosity_levels() {
        let cases = [
            ((true, 0), Level::ERROR),
            ((true, 5), Level::ERROR),
            ((false, 0), Level::INFO),
            ((false, 1), Level::DEBUG),
            ((false, 2), Level::TRACE),
            ((false, 10), Level::TRACE),
        ];
        for ((quiet, verbose), expected) in cases {
            assert_eq!(level_for(verbose, quiet), expected, "quiet={}, verbose={}", quiet, verbose);
        }
    }
}

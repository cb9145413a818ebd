//! Tracing subscriber setup.

use tracing::Level;

/// Install the global fmt subscriber writing to stderr, keeping stdout free for command output.
///
/// `quiet` limits output to errors; otherwise warnings and above are shown, or debug when
/// `verbose` is set.
pub fn init(quiet: bool, verbose: bool) {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

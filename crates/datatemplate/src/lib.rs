pub mod app;
pub mod domain;
pub mod infra;

/// Install logging for the command line front end.
pub fn init(quiet: bool, verbose: bool) {
    infra::logging::init(quiet, verbose);
}

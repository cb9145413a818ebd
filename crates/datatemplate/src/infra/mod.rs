//! Infrastructure adapters for files, clipboard, config, and logging.

pub mod clipboard;
pub mod config;
pub mod logging;
pub mod memory;
pub mod workspace;

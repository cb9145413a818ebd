//! Domain types shared by every channel.

pub mod errors;
pub mod model;

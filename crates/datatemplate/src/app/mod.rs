//! Application layer: bundle formats, transport, and the session lifecycle.

pub mod codec;
pub mod detect;
pub mod export;
pub mod normalize;
pub mod session;
pub mod status;
pub mod transport;

pub mod compiler;
pub mod device;
pub mod fileio;
pub mod runtime;

/// Marker implemented by every error this crate returns.
pub trait PulseError: std::error::Error {}

use thiserror::Error;

use super::{fileio::FileIOError, PulseError};

#[derive(Debug, Error)]
pub enum DeviceError {
	#[error("script \"{0}\" is not cached; load it before spawning")]
	NotCached(String),
	#[error("maximum objects were exceeded for this device ({0})")]
	Full(usize),
	#[error(transparent)]
	Load(#[from] FileIOError),
}

impl PulseError for DeviceError {}

pub type DeviceResult<O = ()> = Result<O, DeviceError>;

use std::io;

use thiserror::Error;

use super::{compiler::CompileError, PulseError};

#[derive(Debug, Error)]
pub enum FileIOError {
	#[error(transparent)]
	Io(#[from] io::Error),
	#[error("bytecode load failed: magic number did not match (found 0x{0:08X})")]
	BadMagic(u32),
	#[error("bytecode load failed: unexpected end of data")]
	Truncated,
	#[error("bytecode load failed: negative {0} length")]
	NegativeLength(&'static str),
	#[error("bytecode load failed: {0}")]
	Encoding(String),
	#[error("unsupported script format: {0}")]
	UnsupportedFormat(String),
	#[error(transparent)]
	Compile(#[from] CompileError),
}

impl From<bincode::Error> for FileIOError {
	fn from(e: bincode::Error) -> Self {
		match *e {
			bincode::ErrorKind::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
				FileIOError::Truncated
			}
			bincode::ErrorKind::Io(e) => FileIOError::Io(e),
			other => FileIOError::Encoding(other.to_string()),
		}
	}
}

impl PulseError for FileIOError {}

pub type FileIOResult<O = ()> = Result<O, FileIOError>;

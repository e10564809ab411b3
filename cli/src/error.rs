use std::io;

use pulse::{CompileError, FileIOError, RuntimeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CLIError {
	#[error("unknown argument \"{0}\" (expected build, run or dump)")]
	UnknownArgument(String),
	#[error("insufficient arguments\nusage: pulse build <file.cog> | run <file> [ticks] [period] | dump <file>")]
	InsufficientArguments,
	#[error("file not found: {0}")]
	NotFound(String),
	#[error("expected a non-negative integer, got \"{0}\"")]
	BadNumber(String),
	#[error(transparent)]
	Compile(#[from] CompileError),
	#[error(transparent)]
	FileIO(#[from] FileIOError),
	#[error(transparent)]
	Runtime(#[from] RuntimeError),
	#[error(transparent)]
	Io(#[from] io::Error),
}

pub type CLIResult<O = ()> = Result<O, CLIError>;

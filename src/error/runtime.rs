use thiserror::Error;

use super::PulseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StackError {
	#[error("stack size exceeded ({0})")]
	Overflow(usize),
	#[error("tried to pop from an empty stack")]
	Underflow,
}

/// A fault raised while a runtime executes one tick.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("script \"{script}\" faulted at offset {offset}: {kind}")]
pub struct RuntimeError {
	pub script: String,
	pub offset: usize,
	pub kind: RuntimeErrorKind,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeErrorKind {
	#[error("invalid operation id (0x{0:02X})")]
	UnknownOpcode(u8),
	#[error(transparent)]
	Stack(#[from] StackError),
	#[error("invalid register {0}")]
	InvalidRegister(i32),
	#[error("invalid timer {0}")]
	InvalidTimer(u32),
	#[error("invalid jump target {0}")]
	InvalidJumpTarget(i32),
	#[error("operand runs past the end of the code")]
	Truncated,
}

impl PulseError for RuntimeError {}
impl PulseError for StackError {}

pub type RuntimeResult<T = ()> = Result<T, RuntimeError>;

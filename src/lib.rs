mod bytecode;
mod compiler;
mod config;
mod device;
mod instruction;
mod register;
mod runtime;
mod scanner;
mod stack;
mod timer;

pub mod error;
pub mod fileio;

pub use bytecode::{Bytecode, CodeBuffer};
pub use compiler::Compiler;
pub use config::{Config, MAX_OBJECTS, STACK_SIZE, TIMER_COUNT};
pub use device::{Device, TickReport};
pub use error::{
	compiler::{CompileError, CompileErrorKind, CompileResult},
	device::{DeviceError, DeviceResult},
	fileio::{FileIOError, FileIOResult},
	runtime::{RuntimeError, RuntimeErrorKind, RuntimeResult, StackError},
	PulseError,
};
pub use instruction::{Instruction, OperandKind};
pub use register::{Register, RegisterFile, REGISTER_COUNT};
pub use runtime::{FireEvent, Host, Runtime};
pub use stack::Stack;
pub use timer::{Timer, TimerBank, TimerStatus};

/// Assemble `source` with the default timer bank size.
pub fn compile(source: &str) -> CompileResult<Bytecode> {
	Compiler::new().compile(source)
}

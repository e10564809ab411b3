/*
	# Virtual Machine
	A runtime executes its script once per tick. The loop consumes the next byte, decodes it
	into an instruction (a byte outside the instruction set faults), reads every immediate that
	instruction declares and then, unless the cyclic position `x` of the tick falls outside
	the active window, performs its effect.

	## Window
	`range lo hi` and `end` are the only instructions that run regardless of the window. Every
	other instruction still consumes its operands when skipped, so the stream stays aligned.

	## Call and Return
	`call` pushes the byte offset following it onto the numeric stack as the raw bits of an
	f64 and `ret` reinterprets those bits back into an offset. Arithmetic on a return
	address produces garbage, which is the script's problem.
*/

use std::sync::Arc;

use num_traits::FromPrimitive;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
	bytecode::{Bytecode, Cursor},
	config::TIMER_COUNT,
	error::runtime::*,
	instruction::Instruction,
	register::{Register, RegisterFile},
	stack::Stack,
	timer::TimerBank,
};

mod host;
pub use host::*;

type StepResult<T = ()> = Result<T, RuntimeErrorKind>;

macro_rules! operation {
	($stack:ident, |$a:ident, $b:ident| $body:expr) => {{
		// b was pushed last
		let $b = $stack.pop()?;
		let $a = $stack.pop()?;
		$stack.push($body)?;
	}};

	($stack:ident, |$a:ident| $body:expr) => {{
		let $a = $stack.pop()?;
		$stack.push($body)?;
	}};
}

fn truth(value: bool) -> f64 {
	if value {
		1.0
	} else {
		0.0
	}
}

/// Inclusive bounds on `x` outside of which gated instructions are skipped.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Window {
	low: f64,
	high: f64,
}

impl Default for Window {
	fn default() -> Self {
		Self { low: 0.0, high: 1.0 }
	}
}

impl Window {
	fn new(low: f64, high: f64) -> Self {
		if high < low {
			Self::default()
		} else {
			Self { low, high }
		}
	}

	fn contains(&self, x: f64) -> bool {
		self.low <= x && x <= self.high
	}
}

/// One scheduled instance of a script.
#[derive(Clone, Debug)]
pub struct Runtime {
	name: String,
	bytecode: Arc<Bytecode>,
	period: u32,
	registers: RegisterFile,
	timers: TimerBank,
	rng: StdRng,
	output: f64,
	pub enabled: bool,
}

impl Runtime {
	/// A `period` of zero is treated as one.
	pub fn new(name: impl Into<String>, bytecode: Arc<Bytecode>, period: u32) -> Self {
		Self {
			name: name.into(),
			bytecode,
			period: period.max(1),
			registers: RegisterFile::new(),
			timers: TimerBank::new(TIMER_COUNT),
			rng: StdRng::from_entropy(),
			output: 0.0,
			enabled: true,
		}
	}

	pub fn with_rng(mut self, rng: StdRng) -> Self {
		self.rng = rng;
		self
	}

	pub fn with_timers(mut self, count: usize) -> Self {
		self.timers = TimerBank::new(count);
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn bytecode(&self) -> &Arc<Bytecode> {
		&self.bytecode
	}

	pub fn period(&self) -> u32 {
		self.period
	}

	/// Result of the last tick that completed.
	pub fn output(&self) -> f64 {
		self.output
	}

	pub fn register(&self, register: Register) -> f64 {
		self.registers.get(register)
	}

	pub fn set_register(&mut self, register: Register, value: f64) {
		self.registers.set(register, value);
	}

	pub fn registers(&self) -> &RegisterFile {
		&self.registers
	}

	pub fn timers(&self) -> &TimerBank {
		&self.timers
	}

	pub fn timers_mut(&mut self) -> &mut TimerBank {
		&mut self.timers
	}

	/// Run the script once for `tick` against the shared `stack`.
	///
	/// On a fault the rest of the tick is abandoned and [`Runtime::output`]
	/// keeps its previous value. The stack may be left holding partial results.
	pub fn iterate(&mut self, stack: &mut Stack, tick: u64, host: &mut dyn Host) -> RuntimeResult<f64> {
		self.timers.advance();

		let bytecode = Arc::clone(&self.bytecode);
		let mut cursor = Cursor::new(bytecode.code());
		let period = u64::from(self.period);
		let x = (tick % period) as f64 / period as f64;
		let mut window = Window::default();

		while !cursor.at_end() {
			let offset = cursor.position();
			self.step(&bytecode, &mut cursor, &mut window, x, stack, host)
				.map_err(|kind| self.fault(offset, kind))?;
		}

		if self.registers.get(Register::Reset) > 0.0 {
			self.registers.clear();
		}
		let end = bytecode.code().len();
		let value = stack.pop().map_err(|e| self.fault(end, e.into()))?;
		self.output = value + self.registers.get(Register::Offset);

		host.tick_completed(&self.name);
		tracing::trace!(script = %self.name, tick, output = self.output, "tick completed");
		Ok(self.output)
	}

	fn fault(&self, offset: usize, kind: RuntimeErrorKind) -> RuntimeError {
		RuntimeError {
			script: self.name.clone(),
			offset,
			kind,
		}
	}

	fn step(
		&mut self,
		bytecode: &Bytecode,
		cursor: &mut Cursor,
		window: &mut Window,
		x: f64,
		stack: &mut Stack,
		host: &mut dyn Host,
	) -> StepResult {
		let byte = cursor.next_byte().ok_or(RuntimeErrorKind::Truncated)?;
		let instruction = Instruction::from_u8(byte).ok_or(RuntimeErrorKind::UnknownOpcode(byte))?;
		let imm = cursor.immediates(instruction).ok_or(RuntimeErrorKind::Truncated)?;
		if instruction.is_gated() && !window.contains(x) {
			return Ok(());
		}

		use Instruction::*;
		match instruction {
			PushC => stack.push(imm.float(0))?,
			PushX => stack.push(x)?,
			Add => operation!(stack, |a, b| a + b),
			Sub => operation!(stack, |a, b| a - b),
			Mul => operation!(stack, |a, b| a * b),
			Div => operation!(stack, |a, b| if b == 0.0 { 0.0 } else { a / b }),
			Mod => operation!(stack, |a, b| if b == 0.0 { 0.0 } else { a % b }),
			Pow => operation!(stack, |a, b| a.powf(b)),
			Lerp => {
				let high = stack.pop()?;
				let low = stack.pop()?;
				let f = stack.pop()?;
				stack.push(low + (high - low) * f)?;
			}
			// Bounds are tested in order, so an inverted range favours `low` and NaN passes through.
			Clamp => {
				let high = stack.pop()?;
				let low = stack.pop()?;
				let n = stack.pop()?;
				stack.push(if n < low {
					low
				} else if n > high {
					high
				} else {
					n
				})?;
			}
			InvLerp => {
				let value = stack.pop()?;
				let high = stack.pop()?;
				let low = stack.pop()?;
				stack.push(if high == low { 0.0 } else { (value - low) / (high - low) })?;
			}
			Sqrt => operation!(stack, |a| a.sqrt()),
			Ceil => operation!(stack, |a| a.ceil()),
			Floor => operation!(stack, |a| a.floor()),
			Sin => operation!(stack, |a| a.sin()),
			Cos => operation!(stack, |a| a.cos()),
			Tan => operation!(stack, |a| a.tan()),
			Atan => operation!(stack, |a| a.atan()),
			Abs => operation!(stack, |a| a.abs()),
			Not => operation!(stack, |a| truth(a == 0.0)),
			Le => operation!(stack, |a, b| truth(a <= b)),
			Ge => operation!(stack, |a, b| truth(a >= b)),
			Lt => operation!(stack, |a, b| truth(a < b)),
			Gt => operation!(stack, |a, b| truth(a > b)),
			Eq => operation!(stack, |a, b| truth(a == b)),
			Ne => operation!(stack, |a, b| truth(a != b)),
			RangeStart => *window = Window::new(imm.float(0), imm.float(1)),
			RangeEnd => *window = Window::default(),
			Rand => {
				let max = stack.pop()?;
				let min = stack.pop()?;
				let value = self.rng.gen::<f64>() * (max - min) + min;
				stack.push(value)?;
			}
			Copy => {
				let a = stack.pop()?;
				stack.push(a)?;
				stack.push(a)?;
			}
			Sum | Product => {
				let count = stack.pop()? as i64;
				if count > 0 {
					let mut acc = if instruction == Sum { 0.0 } else { 1.0 };
					for _ in 0..count {
						let value = stack.pop()?;
						if instruction == Sum {
							acc += value;
						} else {
							acc *= value;
						}
					}
					stack.push(acc)?;
				}
			}
			PushReg => stack.push(self.slot(imm.int(0))?)?,
			Pop => {
				let slot = self.slot_mut(imm.int(0))?;
				*slot = stack.pop()?;
			}
			Zero => *self.slot_mut(imm.int(0))? = 0.0,
			Fire => {
				if stack.pop()? != 0.0 {
					let mut event = FireEvent::from_registers(&self.registers);
					tracing::debug!(script = %self.name, ?event, "fire");
					host.fire(&self.name, &mut event);
					event.store(&mut self.registers);
				}
			}
			Jump => cursor.jump(Self::entry_point(bytecode, imm.int(0))?),
			JumpNotZero => {
				if stack.pop()? != 0.0 {
					cursor.jump(Self::entry_point(bytecode, imm.int(0))?);
				}
			}
			JumpEither => {
				let label = if stack.pop()? != 0.0 { imm.int(0) } else { imm.int(1) };
				cursor.jump(Self::entry_point(bytecode, label)?);
			}
			Call => {
				let target = Self::entry_point(bytecode, imm.int(0))?;
				stack.push(f64::from_bits(cursor.position() as u64))?;
				cursor.jump(target);
			}
			Return => {
				let address = stack.pop()?.to_bits();
				cursor.jump(usize::try_from(address).unwrap_or(usize::MAX));
			}
			Stop => cursor.finish(),
			OutPop => {
				let value = stack.pop()?;
				host.sink(&self.name, value);
			}
			OutReg => {
				let value = self.slot(imm.int(0))?;
				host.sink(&self.name, value);
			}
			OutConst => host.sink(&self.name, imm.float(0)),
			TimerStart => Self::timer(self.timers.start(imm.uint(0) as usize), imm.uint(0))?,
			TimerStop => Self::timer(self.timers.stop(imm.uint(0) as usize), imm.uint(0))?,
			TimerSet => Self::timer(
				self.timers.set_limit(imm.uint(0) as usize, imm.uint(1)),
				imm.uint(0),
			)?,
			TimerReset => Self::timer(self.timers.reset(imm.uint(0) as usize), imm.uint(0))?,
			TimerStatus => {
				let status = Self::timer(self.timers.status(imm.uint(0) as usize), imm.uint(0))?;
				stack.push(status.into())?;
			}
			TimerElapsed => {
				let elapsed = Self::timer(self.timers.elapsed(imm.uint(0) as usize), imm.uint(0))?;
				stack.push(f64::from(elapsed))?;
			}
			TimerLimit => {
				let limit = Self::timer(self.timers.limit(imm.uint(0) as usize), imm.uint(0))?;
				stack.push(f64::from(limit))?;
			}
		}
		Ok(())
	}

	fn slot(&self, index: i32) -> StepResult<f64> {
		self.registers.slot(index).ok_or(RuntimeErrorKind::InvalidRegister(index))
	}

	fn slot_mut(&mut self, index: i32) -> StepResult<&mut f64> {
		self.registers.slot_mut(index).ok_or(RuntimeErrorKind::InvalidRegister(index))
	}

	fn timer<T>(found: Option<T>, index: u32) -> StepResult<T> {
		found.ok_or(RuntimeErrorKind::InvalidTimer(index))
	}

	fn entry_point(bytecode: &Bytecode, label: i32) -> StepResult<usize> {
		bytecode.entry_point(label).ok_or(RuntimeErrorKind::InvalidJumpTarget(label))
	}
}

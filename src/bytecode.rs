use std::fmt;

use num_traits::FromPrimitive;

use crate::{
	instruction::{Instruction, OperandKind},
	Register,
};

/// A compiled program: the instruction stream plus the label entry points its
/// jumps and calls index into. Immutable once built.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Bytecode {
	code: Vec<u8>,
	labels: Vec<i32>,
}

impl Bytecode {
	pub fn new(code: Vec<u8>, labels: Vec<i32>) -> Self {
		Self { code, labels }
	}

	pub fn code(&self) -> &[u8] {
		&self.code
	}

	pub fn labels(&self) -> &[i32] {
		&self.labels
	}

	/// Resolve a label reference to a byte offset in `code`.
	pub fn entry_point(&self, index: i32) -> Option<usize> {
		let index = usize::try_from(index).ok()?;
		usize::try_from(*self.labels.get(index)?).ok()
	}
}

/// Growable code stream the compiler emits into.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CodeBuffer {
	bytecode: Vec<u8>,
}

impl CodeBuffer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.bytecode.len()
	}

	pub fn is_empty(&self) -> bool {
		self.bytecode.is_empty()
	}

	pub fn emit_byte(&mut self, instruction: Instruction) {
		self.bytecode.push(instruction as u8);
	}

	pub fn emit_int(&mut self, value: i32) {
		self.bytecode.extend(value.to_le_bytes());
	}

	pub fn emit_uint(&mut self, value: u32) {
		self.bytecode.extend(value.to_le_bytes());
	}

	pub fn emit_float(&mut self, value: f64) {
		self.bytecode.extend(value.to_le_bytes());
	}

	pub fn seal(self, labels: Vec<i32>) -> Bytecode {
		Bytecode::new(self.bytecode, labels)
	}
}

/// One decoded immediate operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Immediate {
	Int(i32),
	Uint(u32),
	Float(f64),
}

/// The immediates of one instruction, in stream order.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Immediates {
	values: [Option<Immediate>; 2],
	len: usize,
}

// The operand layout is fixed per instruction, so a slot always holds the kind
// its instruction declares; a mismatched read yields zero.
impl Immediates {
	pub fn int(&self, slot: usize) -> i32 {
		match self.values[slot] {
			Some(Immediate::Int(v)) => v,
			_ => 0,
		}
	}

	pub fn uint(&self, slot: usize) -> u32 {
		match self.values[slot] {
			Some(Immediate::Uint(v)) => v,
			_ => 0,
		}
	}

	pub fn float(&self, slot: usize) -> f64 {
		match self.values[slot] {
			Some(Immediate::Float(v)) => v,
			_ => 0.0,
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = Immediate> + '_ {
		self.values[..self.len].iter().flatten().copied()
	}
}

/// Read position over a code stream.
#[derive(Debug, Clone)]
pub struct Cursor<'code> {
	code: &'code [u8],
	ic: usize,
}

impl<'code> Cursor<'code> {
	pub fn new(code: &'code [u8]) -> Self {
		Self { code, ic: 0 }
	}

	pub fn position(&self) -> usize {
		self.ic
	}

	pub fn at_end(&self) -> bool {
		self.ic >= self.code.len()
	}

	/// Move to `position`; anything past the end finishes the stream.
	pub fn jump(&mut self, position: usize) {
		self.ic = position;
	}

	pub fn finish(&mut self) {
		self.ic = self.code.len();
	}

	pub fn next_byte(&mut self) -> Option<u8> {
		let byte = *self.code.get(self.ic)?;
		self.ic += 1;
		Some(byte)
	}

	fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
		let bytes = self.code.get(self.ic..self.ic.checked_add(N)?)?;
		self.ic += N;
		bytes.try_into().ok()
	}

	pub fn immediate(&mut self, kind: OperandKind) -> Option<Immediate> {
		Some(match kind {
			OperandKind::Int => Immediate::Int(i32::from_le_bytes(self.take()?)),
			OperandKind::Uint => Immediate::Uint(u32::from_le_bytes(self.take()?)),
			OperandKind::Float => Immediate::Float(f64::from_le_bytes(self.take()?)),
		})
	}

	/// Consume every immediate `instruction` declares; `None` if the stream
	/// ends first.
	pub fn immediates(&mut self, instruction: Instruction) -> Option<Immediates> {
		let mut immediates = Immediates::default();
		for (slot, kind) in instruction.operands().iter().enumerate() {
			immediates.values[slot] = Some(self.immediate(*kind)?);
			immediates.len += 1;
		}
		Some(immediates)
	}
}

impl fmt::Display for Immediate {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Immediate::Int(v) => write!(f, "{}", v),
			Immediate::Uint(v) => write!(f, "{}", v),
			Immediate::Float(v) => write!(f, "{}", v),
		}
	}
}

fn register_name(index: i32) -> String {
	u8::try_from(index)
		.ok()
		.and_then(Register::from_u8)
		.map(|r| r.to_string())
		.unwrap_or_else(|| format!("r{}", index))
}

/// Disassembly listing. Labels carry no names once compiled and are shown by
/// reference index.
impl fmt::Display for Bytecode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut cursor = Cursor::new(&self.code);
		while !cursor.at_end() {
			let offset = cursor.position();
			for (index, _) in self.labels.iter().enumerate().filter(|(_, entry)| {
				usize::try_from(**entry).map_or(false, |entry| entry == offset)
			}) {
				writeln!(f, "#L{}", index)?;
			}
			let byte = cursor.next_byte().ok_or(fmt::Error)?;
			let instruction = match Instruction::from_u8(byte) {
				Some(i) => i,
				None => {
					writeln!(f, "{:04X}  ?? 0x{:02X}", offset, byte)?;
					continue;
				}
			};
			let imm = match cursor.immediates(instruction) {
				Some(imm) => imm,
				None => {
					writeln!(f, "{:04X}  {} <truncated>", offset, instruction.mnemonic())?;
					break;
				}
			};
			write!(f, "{:04X}  {}", offset, instruction.mnemonic())?;
			use Instruction::*;
			match instruction {
				PushX => write!(f, " x")?,
				OutPop => write!(f, " out")?,
				PushReg | Pop | Zero | OutReg => write!(f, " {}", register_name(imm.int(0)))?,
				Jump | JumpNotZero | Call | JumpEither => {
					for label in imm.iter() {
						write!(f, " L{}", label)?;
					}
				}
				TimerStart | TimerStop | TimerSet | TimerStatus | TimerElapsed | TimerLimit
				| TimerReset => {
					write!(f, " t{}", imm.uint(0))?;
					if instruction == TimerSet {
						write!(f, " {}", imm.uint(1))?;
					}
				}
				_ => {
					for value in imm.iter() {
						write!(f, " {}", value)?;
					}
				}
			}
			writeln!(f)?;
		}
		Ok(())
	}
}

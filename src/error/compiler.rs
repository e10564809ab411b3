use thiserror::Error;

use super::PulseError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
	#[error("compile error on line {line}: {kind}")]
	Line { line: usize, kind: CompileErrorKind },
	#[error("compile error: label definitions missing for the following references: {}", .0.join(", "))]
	UnresolvedLabels(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileErrorKind {
	#[error("unknown mnemonic \"{0}\"")]
	UnknownMnemonic(String),
	#[error("\"{mnemonic}\" takes {expected} argument(s), got {found}")]
	ArgumentCount {
		mnemonic: String,
		expected: usize,
		found: usize,
	},
	#[error("bad numeric value \"{0}\"")]
	BadNumber(String),
	#[error("unknown register \"{0}\"")]
	UnknownRegister(String),
	#[error("unknown timer \"{name}\" (bank holds {count})")]
	UnknownTimer { name: String, count: usize },
	#[error("label \"{0}\" was defined more than once")]
	DuplicateLabel(String),
	#[error("malformed label definition \"{0}\"")]
	MalformedLabel(String),
	#[error("label marker \"{0}\" is only valid at the start of a line")]
	UnexpectedLabel(String),
	#[error("unrecognized input \"{0}\"")]
	BadToken(String),
	#[error("program is too large to address")]
	TooLarge,
}

impl CompileError {
	pub fn line(&self) -> Option<usize> {
		match self {
			CompileError::Line { line, .. } => Some(*line),
			CompileError::UnresolvedLabels(_) => None,
		}
	}
}

impl PulseError for CompileError {}

pub type CompileResult<O = ()> = Result<O, CompileError>;

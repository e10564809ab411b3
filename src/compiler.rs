use std::collections::HashMap;

use lazy_static::lazy_static;
use maplit::hashmap;

use crate::{
    bytecode::{Bytecode, CodeBuffer},
    config::TIMER_COUNT,
    error::compiler::*,
    instruction::Instruction,
    scanner::{scan, Line, TokenKind},
    Register,
};

type LineResult<T = ()> = Result<T, CompileErrorKind>;

macro_rules! fail {
    ($kind:expr) => {{
        let kind = $kind;
        tracing::debug!(error = %kind, "compile failed");
        return Err(kind);
    }};
}

/// How a mnemonic's arguments are parsed and what it emits.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Form {
    /// No arguments, one opcode.
    Bare(Instruction),
    /// `push x | pi | <register> | <number>`
    Push,
    /// `pop out | <register>`
    Pop,
    /// `out <register> | <number>`
    Out,
    /// One register argument.
    Register(Instruction),
    /// `range <lo> <hi>`
    Range,
    /// One label reference.
    Label(Instruction),
    /// `jmpx <nonzero> <zero>`
    Either,
    /// One timer argument.
    Timer(Instruction),
    /// `tset t<N> <limit>`
    TimerSet,
    /// `clock t<N> <limit | register>`, expands to primitives.
    Clock,
}

lazy_static! {
    static ref MNEMONICS: HashMap<&'static str, Form> = {
        use Form::*;
        use Instruction as I;
        hashmap! {
            "push" => Push,
            "add" => Bare(I::Add),
            "+" => Bare(I::Add),
            "subtract" => Bare(I::Sub),
            "sub" => Bare(I::Sub),
            "-" => Bare(I::Sub),
            "divide" => Bare(I::Div),
            "div" => Bare(I::Div),
            "/" => Bare(I::Div),
            "multiply" => Bare(I::Mul),
            "mul" => Bare(I::Mul),
            "*" => Bare(I::Mul),
            "lerp" => Bare(I::Lerp),
            "clamp" => Bare(I::Clamp),
            "|" => Bare(I::Clamp),
            "mod" => Bare(I::Mod),
            "sqrt" => Bare(I::Sqrt),
            "power" => Bare(I::Pow),
            "pow" => Bare(I::Pow),
            "ceil" => Bare(I::Ceil),
            "floor" => Bare(I::Floor),
            "range" => Range,
            "end" => Bare(I::RangeEnd),
            "sin" => Bare(I::Sin),
            "cos" => Bare(I::Cos),
            "tan" => Bare(I::Tan),
            "atan" => Bare(I::Atan),
            "abs" => Bare(I::Abs),
            "rand" => Bare(I::Rand),
            "random" => Bare(I::Rand),
            "copy" => Bare(I::Copy),
            "clone" => Bare(I::Copy),
            "dup" => Bare(I::Copy),
            "<" => Bare(I::Lt),
            "lt" => Bare(I::Lt),
            ">" => Bare(I::Gt),
            "gt" => Bare(I::Gt),
            "<=" => Bare(I::Le),
            "le" => Bare(I::Le),
            ">=" => Bare(I::Ge),
            "ge" => Bare(I::Ge),
            "pop" => Pop,
            "zero" => Register(I::Zero),
            "fire" => Bare(I::Fire),
            "jnz" => Label(I::JumpNotZero),
            "jmp" => Label(I::Jump),
            "not" => Bare(I::Not),
            "jmpx" => Either,
            "call" => Label(I::Call),
            "ret" => Bare(I::Return),
            "eq" => Bare(I::Eq),
            "ne" => Bare(I::Ne),
            "sum" => Bare(I::Sum),
            "prd" => Bare(I::Product),
            "product" => Bare(I::Product),
            "ilerp" => Bare(I::InvLerp),
            "stop" => Bare(I::Stop),
            "halt" => Bare(I::Stop),
            "out" => Out,
            "tstart" => Timer(I::TimerStart),
            "tstop" => Timer(I::TimerStop),
            "tset" => TimerSet,
            "tstat" => Timer(I::TimerStatus),
            "telapsed" => Timer(I::TimerElapsed),
            "tlimit" => Timer(I::TimerLimit),
            "treset" => Timer(I::TimerReset),
            "clock" => Clock,
        }
    };
}

/// Line-oriented assembler producing [`Bytecode`].
#[derive(Clone, Debug)]
pub struct Compiler {
    buffer: CodeBuffer,
    /// label name -> entry point
    definitions: HashMap<String, i32>,
    /// reference index -> label name
    references: Vec<String>,
    timer_count: usize,
}

impl Default for Compiler {
    fn default() -> Self {
        Self {
            buffer: CodeBuffer::new(),
            definitions: HashMap::new(),
            references: vec![],
            timer_count: TIMER_COUNT,
        }
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size of the timer bank `t<N>` operands are checked against.
    pub fn with_timer_count(mut self, timer_count: usize) -> Self {
        self.timer_count = timer_count;
        self
    }

    /// Assemble `source`. Nothing is returned unless every line compiles and
    /// every referenced label is defined.
    pub fn compile(mut self, source: &str) -> CompileResult<Bytecode> {
        for line in scan(source) {
            self.line(&line).map_err(|kind| CompileError::Line {
                line: line.number,
                kind,
            })?;
        }
        self.link()
    }

    /// Build the label table: one slot per referenced name, in first-reference order.
    fn link(self) -> CompileResult<Bytecode> {
        let missing: Vec<String> = self
            .references
            .iter()
            .filter(|name| !self.definitions.contains_key(*name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            tracing::debug!(?missing, "unresolved labels");
            return Err(CompileError::UnresolvedLabels(missing));
        }
        let labels = self
            .references
            .iter()
            .map(|name| self.definitions[name])
            .collect::<Vec<_>>();
        tracing::trace!(labels = labels.len(), bytes = self.buffer.len(), "linked");
        Ok(self.buffer.seal(labels))
    }

    fn line(&mut self, line: &Line) -> LineResult {
        let (first_kind, first) = line.tokens[0];
        match first_kind {
            TokenKind::Label => return self.define_label(line),
            TokenKind::Error => fail!(CompileErrorKind::BadToken(first.to_string())),
            _ => {}
        }

        let mut args = Vec::with_capacity(line.tokens.len() - 1);
        for (kind, slice) in &line.tokens[1..] {
            match kind {
                TokenKind::Word => args.push(*slice),
                TokenKind::Label => fail!(CompileErrorKind::UnexpectedLabel(slice.to_string())),
                _ => fail!(CompileErrorKind::BadToken(slice.to_string())),
            }
        }

        let mnemonic = first.to_ascii_lowercase();
        let form = match MNEMONICS.get(mnemonic.as_str()) {
            Some(form) => *form,
            None => fail!(CompileErrorKind::UnknownMnemonic(first.to_string())),
        };
        self.emit(form, &mnemonic, &args)
    }

    fn define_label(&mut self, line: &Line) -> LineResult {
        let (_, marker) = line.tokens[0];
        let name = &marker[1..];
        if name.is_empty() || line.tokens.len() > 1 {
            let text = line
                .tokens
                .iter()
                .map(|(_, s)| *s)
                .collect::<Vec<_>>()
                .join(" ");
            fail!(CompileErrorKind::MalformedLabel(text))
        }
        if self.definitions.contains_key(name) {
            fail!(CompileErrorKind::DuplicateLabel(name.to_string()))
        }
        let entry = match i32::try_from(self.buffer.len()) {
            Ok(entry) => entry,
            Err(_) => fail!(CompileErrorKind::TooLarge),
        };
        self.definitions.insert(name.to_string(), entry);
        Ok(())
    }

    fn emit(&mut self, form: Form, mnemonic: &str, args: &[&str]) -> LineResult {
        let expected = match form {
            Form::Bare(_) => 0,
            Form::Range | Form::Either | Form::TimerSet | Form::Clock => 2,
            _ => 1,
        };
        if args.len() != expected {
            fail!(CompileErrorKind::ArgumentCount {
                mnemonic: mnemonic.to_string(),
                expected,
                found: args.len(),
            })
        }

        match form {
            Form::Bare(instruction) => self.buffer.emit_byte(instruction),
            Form::Push => self.push(args[0])?,
            Form::Pop => {
                if args[0].eq_ignore_ascii_case("out") {
                    self.buffer.emit_byte(Instruction::OutPop);
                } else {
                    let register = Self::register(args[0])?;
                    self.buffer.emit_byte(Instruction::Pop);
                    self.buffer.emit_int(register as i32);
                }
            }
            Form::Out => {
                if let Some(register) = Register::from_name(args[0]) {
                    self.buffer.emit_byte(Instruction::OutReg);
                    self.buffer.emit_int(register as i32);
                } else {
                    let value = Self::number(args[0])?;
                    self.buffer.emit_byte(Instruction::OutConst);
                    self.buffer.emit_float(value);
                }
            }
            Form::Register(instruction) => {
                let register = Self::register(args[0])?;
                self.buffer.emit_byte(instruction);
                self.buffer.emit_int(register as i32);
            }
            Form::Range => {
                let low = Self::number(args[0])?;
                let high = Self::number(args[1])?;
                self.buffer.emit_byte(Instruction::RangeStart);
                self.buffer.emit_float(low);
                self.buffer.emit_float(high);
            }
            Form::Label(instruction) => {
                let label = self.reference(args[0]);
                self.buffer.emit_byte(instruction);
                self.buffer.emit_int(label);
            }
            Form::Either => {
                let nonzero = self.reference(args[0]);
                let zero = self.reference(args[1]);
                self.buffer.emit_byte(Instruction::JumpEither);
                self.buffer.emit_int(nonzero);
                self.buffer.emit_int(zero);
            }
            Form::Timer(instruction) => {
                let timer = self.timer(args[0])?;
                self.buffer.emit_byte(instruction);
                self.buffer.emit_uint(timer);
            }
            Form::TimerSet => {
                let timer = self.timer(args[0])?;
                let limit = match args[1].parse::<u32>() {
                    Ok(limit) => limit,
                    Err(_) => fail!(CompileErrorKind::BadNumber(args[1].to_string())),
                };
                self.buffer.emit_byte(Instruction::TimerSet);
                self.buffer.emit_uint(timer);
                self.buffer.emit_uint(limit);
            }
            Form::Clock => self.clock(args[0], args[1])?,
        }
        Ok(())
    }

    fn push(&mut self, arg: &str) -> LineResult {
        if arg.eq_ignore_ascii_case("x") {
            self.buffer.emit_byte(Instruction::PushX);
        } else if arg.eq_ignore_ascii_case("pi") {
            self.buffer.emit_byte(Instruction::PushC);
            self.buffer.emit_float(std::f64::consts::PI);
        } else if let Some(register) = Register::from_name(arg) {
            self.buffer.emit_byte(Instruction::PushReg);
            self.buffer.emit_int(register as i32);
        } else {
            let value = Self::number(arg)?;
            self.buffer.emit_byte(Instruction::PushC);
            self.buffer.emit_float(value);
        }
        Ok(())
    }

    /// Square wave over a timer's elapsed ticks: 1 for the first `limit` ticks
    /// of every `2 * limit`, else 0.
    fn clock(&mut self, timer: &str, limit: &str) -> LineResult {
        let timer = self.timer(timer)?;
        // Validate before emitting so a bad limit leaves nothing behind.
        if Register::from_name(limit).is_none() {
            Self::number(limit)?;
        }
        self.buffer.emit_byte(Instruction::TimerElapsed);
        self.buffer.emit_uint(timer);
        self.push(limit)?;
        self.buffer.emit_byte(Instruction::PushC);
        self.buffer.emit_float(2.0);
        self.buffer.emit_byte(Instruction::Mul);
        self.buffer.emit_byte(Instruction::Mod);
        self.push(limit)?;
        self.buffer.emit_byte(Instruction::Lt);
        Ok(())
    }

    /// Index of `name` in the reference table, allocating the next one on first use.
    fn reference(&mut self, name: &str) -> i32 {
        match self.references.iter().position(|r| r == name) {
            Some(index) => index as i32,
            None => {
                self.references.push(name.to_string());
                (self.references.len() - 1) as i32
            }
        }
    }

    fn register(name: &str) -> LineResult<Register> {
        match Register::from_name(name) {
            Some(register) => Ok(register),
            None => fail!(CompileErrorKind::UnknownRegister(name.to_string())),
        }
    }

    fn timer(&self, name: &str) -> LineResult<u32> {
        let index = name
            .strip_prefix('t')
            .or_else(|| name.strip_prefix('T'))
            .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse::<u32>().ok())
            .filter(|index| (*index as usize) < self.timer_count);
        match index {
            Some(index) => Ok(index),
            None => fail!(CompileErrorKind::UnknownTimer {
                name: name.to_string(),
                count: self.timer_count,
            }),
        }
    }

    fn number(token: &str) -> LineResult<f64> {
        match token.parse::<f64>() {
            Ok(value) => Ok(value),
            Err(_) => fail!(CompileErrorKind::BadNumber(token.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Instruction as I;

    pub mod utils {
        use super::*;

        /// Compile and unwrap.
        pub(super) fn compile(source: &str) -> Bytecode {
            Compiler::new().compile(source).unwrap()
        }

        pub(super) fn line_error(source: &str) -> (usize, CompileErrorKind) {
            match Compiler::new().compile(source) {
                Err(CompileError::Line { line, kind }) => (line, kind),
                other => panic!("expected a line error, got {:?}", other),
            }
        }

        /// Expected bytes for a run of instructions and their raw immediates.
        pub(super) fn bytes(parts: &[(I, &[u8])]) -> Vec<u8> {
            let mut out = vec![];
            for (instruction, immediates) in parts {
                out.push(*instruction as u8);
                out.extend(*immediates);
            }
            out
        }
    }

    use utils::*;

    #[test]
    fn bare_mnemonics() {
        let bytecode = compile("add\n+\nSUB\nmul\n/\nmod\npow\nsqrt\nceil\nfloor\nsin\ncos\ntan\natan\nabs\nnot\neq\nne\nsum\nprd\nret\nfire\nend\nstop");
        assert_eq!(
            bytecode.code(),
            &[
                I::Add as u8, I::Add as u8, I::Sub as u8, I::Mul as u8, I::Div as u8,
                I::Mod as u8, I::Pow as u8, I::Sqrt as u8, I::Ceil as u8, I::Floor as u8,
                I::Sin as u8, I::Cos as u8, I::Tan as u8, I::Atan as u8, I::Abs as u8,
                I::Not as u8, I::Eq as u8, I::Ne as u8, I::Sum as u8, I::Product as u8,
                I::Return as u8, I::Fire as u8, I::RangeEnd as u8, I::Stop as u8,
            ][..]
        );
        assert!(bytecode.labels().is_empty());
    }

    #[test]
    fn push_forms() {
        let bytecode = compile("push x\npush pi\npush offset\npush -2.5");
        let expected = bytes(&[
            (I::PushX, &[]),
            (I::PushC, &std::f64::consts::PI.to_le_bytes()),
            (I::PushReg, &12i32.to_le_bytes()),
            (I::PushC, &(-2.5f64).to_le_bytes()),
        ]);
        assert_eq!(bytecode.code(), &expected[..]);
    }

    #[test]
    fn pop_out_and_zero() {
        let bytecode = compile("pop out\npop EvA\nout b\nout 4\nzero reset");
        let expected = bytes(&[
            (I::OutPop, &[]),
            (I::Pop, &14i32.to_le_bytes()),
            (I::OutReg, &1i32.to_le_bytes()),
            (I::OutConst, &4f64.to_le_bytes()),
            (I::Zero, &13i32.to_le_bytes()),
        ]);
        assert_eq!(bytecode.code(), &expected[..]);
    }

    #[test]
    fn comments_and_whitespace() {
        let bytecode = compile("' a whole line\n   push 1 ' trailing\n\n\tadd");
        let expected = bytes(&[(I::PushC, &1f64.to_le_bytes()), (I::Add, &[])]);
        assert_eq!(bytecode.code(), &expected[..]);
    }

    #[test]
    fn labels_forward_and_backward() {
        // `b` is referenced first, so it takes slot 0.
        let source = "#a\npush 1\njnz b\njmp a\n#b\n#unused\npush 2";
        let bytecode = compile(source);
        assert_eq!(bytecode.labels(), &[19, 0]);
        let expected = bytes(&[
            (I::PushC, &1f64.to_le_bytes()),
            (I::JumpNotZero, &0i32.to_le_bytes()),
            (I::Jump, &1i32.to_le_bytes()),
            (I::PushC, &2f64.to_le_bytes()),
        ]);
        assert_eq!(bytecode.code(), &expected[..]);
    }

    #[test]
    fn jmpx_and_call() {
        let bytecode = compile("jmpx yes no\n#no\ncall yes\n#yes\nret");
        assert_eq!(bytecode.labels(), &[14, 9]);
        let expected = bytes(&[
            (I::JumpEither, &[0, 0, 0, 0, 1, 0, 0, 0]),
            (I::Call, &0i32.to_le_bytes()),
            (I::Return, &[]),
        ]);
        assert_eq!(bytecode.code(), &expected[..]);
    }

    #[test]
    fn unresolved_labels_listed_together() {
        assert_eq!(
            Compiler::new().compile("jmp one\n#two\njnz three\ncall two"),
            Err(CompileError::UnresolvedLabels(vec![
                "one".to_string(),
                "three".to_string()
            ]))
        );
        let e = Compiler::new().compile("jmp one\njmp three").unwrap_err();
        assert!(e.to_string().ends_with("one, three"));
    }

    #[test]
    fn label_errors() {
        assert_eq!(
            line_error("#dup\npush 1\n#dup"),
            (3, CompileErrorKind::DuplicateLabel("dup".into()))
        );
        assert_eq!(line_error("#\n"), (1, CompileErrorKind::MalformedLabel("#".into())));
        assert_eq!(
            line_error("push 1\n#two words"),
            (2, CompileErrorKind::MalformedLabel("#two words".into()))
        );
        assert_eq!(
            line_error("jmp #here"),
            (1, CompileErrorKind::UnexpectedLabel("#here".into()))
        );
    }

    #[test]
    fn argument_errors() {
        assert_eq!(
            line_error("push"),
            (
                1,
                CompileErrorKind::ArgumentCount {
                    mnemonic: "push".into(),
                    expected: 1,
                    found: 0
                }
            )
        );
        assert_eq!(
            line_error("add 1"),
            (
                1,
                CompileErrorKind::ArgumentCount {
                    mnemonic: "add".into(),
                    expected: 0,
                    found: 1
                }
            )
        );
        assert_eq!(line_error("range 0 one"), (1, CompileErrorKind::BadNumber("one".into())));
        assert_eq!(line_error("push banana"), (1, CompileErrorKind::BadNumber("banana".into())));
        assert_eq!(line_error("\n\nfrobnicate"), (3, CompileErrorKind::UnknownMnemonic("frobnicate".into())));
    }

    #[test]
    fn register_names_are_exact() {
        assert_eq!(line_error("pop 3"), (1, CompileErrorKind::UnknownRegister("3".into())));
        assert_eq!(line_error("zero off"), (1, CompileErrorKind::UnknownRegister("off".into())));
        assert_eq!(line_error("pop x"), (1, CompileErrorKind::UnknownRegister("x".into())));
        assert!(Compiler::new().compile("pop eVb\nzero L").is_ok());
    }

    #[test]
    fn timers() {
        let bytecode = compile("tset t7 40\ntstart T0\ntstat t1");
        let expected = bytes(&[
            (I::TimerSet, &[7, 0, 0, 0, 40, 0, 0, 0]),
            (I::TimerStart, &0u32.to_le_bytes()),
            (I::TimerStatus, &1u32.to_le_bytes()),
        ]);
        assert_eq!(bytecode.code(), &expected[..]);

        let unknown = |name: &str| CompileErrorKind::UnknownTimer { name: name.into(), count: 8 };
        assert_eq!(line_error("tstart t8"), (1, unknown("t8")));
        assert_eq!(line_error("tstart t"), (1, unknown("t")));
        assert_eq!(line_error("tstart t+1"), (1, unknown("t+1")));
        assert_eq!(line_error("tstart 0"), (1, unknown("0")));
        assert_eq!(line_error("tset t0 -1"), (1, CompileErrorKind::BadNumber("-1".into())));

        let small = Compiler::new().with_timer_count(2).compile("treset t2");
        assert!(matches!(
            small,
            Err(CompileError::Line { kind: CompileErrorKind::UnknownTimer { count: 2, .. }, .. })
        ));
    }

    #[test]
    fn clock_expands_to_primitives() {
        let bytecode = compile("clock t1 5");
        let expected = bytes(&[
            (I::TimerElapsed, &1u32.to_le_bytes()),
            (I::PushC, &5f64.to_le_bytes()),
            (I::PushC, &2f64.to_le_bytes()),
            (I::Mul, &[]),
            (I::Mod, &[]),
            (I::PushC, &5f64.to_le_bytes()),
            (I::Lt, &[]),
        ]);
        assert_eq!(bytecode.code(), &expected[..]);
        let by_register = compile("clock t0 a");
        assert_eq!(by_register.code()[5], I::PushReg as u8);
        assert_eq!(line_error("clock t0 soon"), (1, CompileErrorKind::BadNumber("soon".into())));
    }

    #[test]
    fn widths_match_layout() {
        let source = "push 1\npush x\npush a\nrange 0 1\nend\njmpx l l\n#l\ntset t0 3\ntstat t0\nout 2\nout a\npop out\ncall l\nadd";
        let bytecode = compile(source);
        let code = bytecode.code();
        let mut at = 0;
        let mut count = 0;
        while at < code.len() {
            let instruction = <I as num_traits::FromPrimitive>::from_u8(code[at]).unwrap();
            at += instruction.width();
            count += 1;
        }
        assert_eq!(at, code.len());
        assert_eq!(count, 13);
    }

    #[test]
    fn empty_program() {
        assert_eq!(compile(""), Bytecode::default());
        assert_eq!(compile("' nothing\n#only_a_label"), Bytecode::default());
    }
}

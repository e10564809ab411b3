/*
    x   : cyclic position of the current tick, in [0, 1)
    R(r): value at register `r`
    T(t): timer `t`
    L(l): entry point of label reference `l`
    IC  : instruction cursor
    `b, a -> ...` lists operands in pop order: `b` was pushed last.
*/
use num_derive::FromPrimitive;

/// Kind of an immediate operand following an opcode byte. All little-endian.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandKind {
    Int,   // i32: register index or label reference
    Uint,  // u32: timer index or timer limit
    Float, // f64: constant
}

impl OperandKind {
    pub const fn size(self) -> usize {
        match self {
            OperandKind::Int | OperandKind::Uint => 4,
            OperandKind::Float => 8,
        }
    }
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum Instruction {
    PushC = 0x00,        // PUSHC    [c]        -> c
    PushX,               // PUSHX               -> x
    Add,                 // ADD                 b, a -> a + b
    Sub,                 // SUB                 b, a -> a - b
    Mul,                 // MUL                 b, a -> a * b
    Div,                 // DIV                 b, a -> a / b, 0 when b == 0
    Lerp,                // LERP                hi, lo, f -> lo + (hi - lo) * f
    Clamp,               // CLAMP               hi, lo, n -> n clamped to [lo, hi]
    Mod,                 // MOD                 b, a -> a % b, 0 when b == 0
    Sqrt,                // SQRT                a -> sqrt(a)
    Pow,                 // POW                 b, a -> a ^ b
    Ceil,                // CEIL                a -> ceil(a)
    Floor,               // FLOOR               a -> floor(a)
    RangeStart,          // RANGE    [lo] [hi]  window = [lo, hi] (never gated)
    RangeEnd,            // END                 window = [0, 1] (never gated)
    Sin,                 // SIN                 a -> sin(a)
    Cos,                 // COS                 a -> cos(a)
    Tan,                 // TAN                 a -> tan(a)
    Atan,                // ATAN                a -> atan(a)
    Abs,                 // ABS                 a -> |a|
    Rand,                // RAND                max, min -> uniform in [min, max)
    Copy,                // COPY                a -> a, a
    Le,                  // LE                  b, a -> a <= b
    Ge,                  // GE                  b, a -> a >= b
    Lt,                  // LT                  b, a -> a < b
    Gt,                  // GT                  b, a -> a > b
    PushReg,             // PUSHREG  [r]        -> R(r)
    Pop,                 // POP      [r]        a -> ; R(r) = a
    Fire,                // FIRE                t -> ; fire event when t != 0
    Zero,                // ZERO     [r]        R(r) = 0
    JumpNotZero,         // JNZ      [l]        c -> ; IC = L(l) when c != 0
    Jump,                // JMP      [l]        IC = L(l)
    Not,                 // NOT                 a -> a == 0
    JumpEither,          // JMPX     [n] [z]    c -> ; IC = L(n) when c != 0, else L(z)
    Return,              // RET                 addr -> ; IC = addr
    Call,                // CALL     [l]        -> addr ; IC = L(l)
    Eq,                  // EQ                  b, a -> a == b
    Ne,                  // NE                  b, a -> a != b
    Sum,                 // SUM                 n, v1 .. vn -> v1 + .. + vn
    Product,             // PRD                 n, v1 .. vn -> v1 * .. * vn
    InvLerp,             // ILERP               v, hi, lo -> (v - lo) / (hi - lo)
    Stop,                // STOP                IC = end of code
    OutPop,              // OUTPOP              a -> ; sink(a)
    OutReg,              // OUTREG   [r]        sink(R(r))
    OutConst,            // OUTC     [c]        sink(c)
    TimerStart,          // TSTART   [t]        T(t) active
    TimerStop,           // TSTOP    [t]        T(t) inactive
    TimerSet,            // TSET     [t] [n]    T(t).limit = n
    TimerStatus,         // TSTAT    [t]        -> -1 inactive, 0 running, 1 expired
    TimerElapsed,        // TELAPSED [t]        -> T(t).elapsed
    TimerLimit,          // TLIMIT   [t]        -> T(t).limit
    TimerReset,          // TRESET   [t]        T(t).elapsed = 0, inactive
}

impl Instruction {
    /// Immediate operands that always follow the opcode byte, executed or not.
    pub fn operands(self) -> &'static [OperandKind] {
        use Instruction::*;
        use OperandKind::*;
        match self {
            PushC | OutConst => &[Float],
            RangeStart => &[Float, Float],
            PushReg | Pop | Zero | OutReg | JumpNotZero | Jump | Call => &[Int],
            JumpEither => &[Int, Int],
            TimerStart | TimerStop | TimerStatus | TimerElapsed | TimerLimit | TimerReset => {
                &[Uint]
            }
            TimerSet => &[Uint, Uint],
            _ => &[],
        }
    }

    /// Encoded size in bytes, opcode included.
    pub fn width(self) -> usize {
        1 + self.operands().iter().map(|kind| kind.size()).sum::<usize>()
    }

    /// Whether the instruction only takes effect inside the active window.
    pub fn is_gated(self) -> bool {
        !matches!(self, Instruction::RangeStart | Instruction::RangeEnd)
    }

    /// Canonical assembly mnemonic, used by the disassembler.
    pub fn mnemonic(self) -> &'static str {
        use Instruction::*;
        match self {
            PushC | PushX | PushReg => "push",
            Add => "add",
            Sub => "sub",
            Mul => "mul",
            Div => "div",
            Lerp => "lerp",
            Clamp => "clamp",
            Mod => "mod",
            Sqrt => "sqrt",
            Pow => "pow",
            Ceil => "ceil",
            Floor => "floor",
            RangeStart => "range",
            RangeEnd => "end",
            Sin => "sin",
            Cos => "cos",
            Tan => "tan",
            Atan => "atan",
            Abs => "abs",
            Rand => "rand",
            Copy => "copy",
            Le => "le",
            Ge => "ge",
            Lt => "lt",
            Gt => "gt",
            Pop | OutPop => "pop",
            Fire => "fire",
            Zero => "zero",
            JumpNotZero => "jnz",
            Jump => "jmp",
            Not => "not",
            JumpEither => "jmpx",
            Return => "ret",
            Call => "call",
            Eq => "eq",
            Ne => "ne",
            Sum => "sum",
            Product => "prd",
            InvLerp => "ilerp",
            Stop => "stop",
            OutReg | OutConst => "out",
            TimerStart => "tstart",
            TimerStop => "tstop",
            TimerSet => "tset",
            TimerStatus => "tstat",
            TimerElapsed => "telapsed",
            TimerLimit => "tlimit",
            TimerReset => "treset",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn byte_assignment() {
        assert_eq!(Instruction::PushC as u8, 0x00);
        assert_eq!(Instruction::RangeStart as u8, 0x0D);
        assert_eq!(Instruction::Call as u8, 0x23);
        assert_eq!(Instruction::OutConst as u8, 0x2C);
        assert_eq!(Instruction::TimerStart as u8, 0x2D);
        assert_eq!(Instruction::TimerReset as u8, 0x33);
    }

    #[test]
    fn decode() {
        for byte in 0x00..=0x33u8 {
            let instruction = Instruction::from_u8(byte).unwrap();
            assert_eq!(instruction as u8, byte);
        }
        assert_eq!(Instruction::from_u8(0x34), None);
        assert_eq!(Instruction::from_u8(0xFF), None);
    }

    #[test]
    fn widths() {
        assert_eq!(Instruction::Add.width(), 1);
        assert_eq!(Instruction::PushC.width(), 9);
        assert_eq!(Instruction::RangeStart.width(), 17);
        assert_eq!(Instruction::JumpEither.width(), 9);
        assert_eq!(Instruction::TimerSet.width(), 9);
        assert!(!Instruction::RangeEnd.is_gated());
        assert!(Instruction::Jump.is_gated());
    }
}

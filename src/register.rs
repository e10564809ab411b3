use std::{collections::HashMap, fmt};

use lazy_static::lazy_static;
use maplit::hashmap;
use num_derive::FromPrimitive;

pub const REGISTER_COUNT: usize = 20;

/// Named register slots of a runtime.
///
/// `A` through `L` persist between ticks. `Offset` is added to every output,
/// a positive `Reset` clears the whole file at the end of a tick, and
/// `EvA` through `EvF` carry the fire event payload.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum Register {
    A = 0,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    Offset,
    Reset,
    EvA,
    EvB,
    EvC,
    EvD,
    EvE,
    EvF,
}

lazy_static! {
    static ref NAMES: HashMap<&'static str, Register> = hashmap! {
        "a" => Register::A,
        "b" => Register::B,
        "c" => Register::C,
        "d" => Register::D,
        "e" => Register::E,
        "f" => Register::F,
        "g" => Register::G,
        "h" => Register::H,
        "i" => Register::I,
        "j" => Register::J,
        "k" => Register::K,
        "l" => Register::L,
        "offset" => Register::Offset,
        "reset" => Register::Reset,
        "eva" => Register::EvA,
        "evb" => Register::EvB,
        "evc" => Register::EvC,
        "evd" => Register::EvD,
        "eve" => Register::EvE,
        "evf" => Register::EvF,
    };
}

impl Register {
    pub const EVENTS: [Register; 6] = [
        Register::EvA,
        Register::EvB,
        Register::EvC,
        Register::EvD,
        Register::EvE,
        Register::EvF,
    ];

    /// Resolve a register by its whole name, ignoring case.
    /// Numeric spellings such as `"3"` never match.
    pub fn from_name(name: &str) -> Option<Self> {
        NAMES.get(name.to_ascii_lowercase().as_str()).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Storage for the twenty registers of one runtime.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RegisterFile {
    values: [f64; REGISTER_COUNT],
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, register: Register) -> f64 {
        self.values[register.index()]
    }

    pub fn set(&mut self, register: Register, value: f64) {
        self.values[register.index()] = value;
    }

    /// Mutable access by raw bytecode operand; `None` when out of bounds.
    pub fn slot_mut(&mut self, index: i32) -> Option<&mut f64> {
        usize::try_from(index).ok().and_then(move |i| self.values.get_mut(i))
    }

    pub fn slot(&self, index: i32) -> Option<f64> {
        usize::try_from(index).ok().and_then(|i| self.values.get(i).copied())
    }

    pub fn clear(&mut self) {
        self.values = [0.0; REGISTER_COUNT];
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(Register::from_name("a"), Some(Register::A));
        assert_eq!(Register::from_name("OFFSET"), Some(Register::Offset));
        assert_eq!(Register::from_name("evF"), Some(Register::EvF));
        assert_eq!(Register::from_name("Reset"), Some(Register::Reset));
        // Partial and numeric spellings are not names.
        assert_eq!(Register::from_name("ev"), None);
        assert_eq!(Register::from_name("offs"), None);
        assert_eq!(Register::from_name("3"), None);
        assert_eq!(Register::from_name("x"), None);
        assert_eq!(NAMES.len(), REGISTER_COUNT);
    }

    #[test]
    fn slots() {
        let mut file = RegisterFile::new();
        *file.slot_mut(13).unwrap() = 2.5;
        assert_eq!(file.get(Register::Reset), 2.5);
        assert_eq!(file.slot(13), Some(2.5));
        assert!(file.slot_mut(-1).is_none());
        assert!(file.slot(20).is_none());
        file.clear();
        assert_eq!(file.as_slice(), &[0.0; REGISTER_COUNT]);
    }
}

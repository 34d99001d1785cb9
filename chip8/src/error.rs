//! Result and errors.
use std::fmt::{self, Display, Formatter};

use crate::constants::{Address, MAX_PROGRAM_SIZE};

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

#[derive(Debug)]
pub enum Chip8Error {
    /// Attempt to load a bytecode program that can't fit in memory.
    LargeProgram { size: usize },
    /// Program file could not be read.
    Io(std::io::Error),
    /// Instruction word matches no known opcode.
    UnknownOpcode { opcode: u16, address: Address },
    /// `CALL` with all stack slots in use.
    StackOverflow { address: Address },
    /// `RET` with an empty call stack.
    StackUnderflow { address: Address },
    /// Register value used as a key or glyph index is outside 0x0-0xF.
    InvalidKey { key: u8, address: Address },
    /// Instruction would read or write `len` bytes starting past the end of memory.
    MemoryOutOfBounds { address: usize, len: usize },
    Fmt(fmt::Error),
}

impl Chip8Error {
    /// Whether the machine can not continue executing after this error.
    ///
    /// Decode errors are reported but leave the machine in a defined
    /// state; the configured [`UnknownOpcodePolicy`](crate::conf::UnknownOpcodePolicy)
    /// decides whether the VM halts on them.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::UnknownOpcode { .. } | Self::Fmt(_))
    }
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::LargeProgram { size } => write!(
                f,
                "program too large for VM memory: {size} bytes, maximum is {MAX_PROGRAM_SIZE}"
            ),
            Self::Io(err) => write!(f, "{}", err),
            Self::UnknownOpcode { opcode, address } => {
                write!(f, "unknown opcode {opcode:04X} at 0x{address:03X}")
            }
            Self::StackOverflow { address } => {
                write!(f, "call stack overflow at 0x{address:03X}")
            }
            Self::StackUnderflow { address } => {
                write!(f, "call stack underflow at 0x{address:03X}")
            }
            Self::InvalidKey { key, address } => {
                write!(f, "key value 0x{key:02X} out of range at 0x{address:03X}")
            }
            Self::MemoryOutOfBounds { address, len } => {
                write!(f, "memory access of {len} bytes at 0x{address:04X} is out of bounds")
            }
            Self::Fmt(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Chip8Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Fmt(err) => Some(err),
            _ => None,
        }
    }
}

impl From<fmt::Error> for Chip8Error {
    fn from(err: fmt::Error) -> Self {
        Chip8Error::Fmt(err)
    }
}

impl From<std::io::Error> for Chip8Error {
    fn from(err: std::io::Error) -> Self {
        Chip8Error::Io(err)
    }
}

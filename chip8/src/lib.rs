mod bytecode;
mod clock;
mod conf;
pub mod constants;
mod cpu;
mod disasm;
mod display;
mod error;
mod ir;
mod keys;
mod vm;

pub use self::{
    conf::Hz,
    error::{Chip8Error, Chip8Result},
    keys::{InvalidKeyCode, KeyCode, KeyMap},
};

/// Version of this implementation, as reported by the command line tools.
pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        clock::Clock,
        conf::{
            BorrowFlag, Chip8Conf, Hz, Quirks, ShiftSource, SpriteOverflow, TimerMode,
            UnknownOpcodePolicy,
        },
        cpu::Chip8Cpu,
        disasm::Disassembler,
        display::Chip8DisplayBuffer,
        error::{Chip8Error, Chip8Result},
        ir::{Instr, Op},
        keys::{KeyCode, KeyMap},
        vm::{Chip8Vm, Flow},
    };
}

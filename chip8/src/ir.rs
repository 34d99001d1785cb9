//! Decoded instruction representation.
//!
//! Decoding is a pure function of the instruction word, so the same
//! representation serves the interpreter and the disassembler.
use std::fmt::{self, Formatter};

use crate::{bytecode::*, constants::Address};

/// Instruction read from memory, together with where it was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instr {
    /// Address in memory where the instruction is located.
    pub addr: Address,
    /// Original instruction word.
    pub word: u16,
    /// Decoded operation, or `None` if the word matches no known opcode.
    pub op: Option<Op>,
}

impl Instr {
    pub fn new(addr: Address, word: u16) -> Self {
        Self {
            addr,
            word,
            op: Op::decode(word),
        }
    }

    /// Original bytes of the instruction.
    #[inline(always)]
    pub fn bytes(&self) -> [u8; 2] {
        self.word.to_be_bytes()
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match &self.op {
            Some(op) => write!(f, "{op}"),
            None => {
                let [a, b] = self.bytes();
                write!(f, "0b{a:08b} 0b{b:08b}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum Op {
    /// 00E0 (CLS)
    ///
    /// Clear the screen.
    ClearScreen,
    /// 00EE (RET)
    ///
    /// Return from the sub-routine.
    Return,
    /// 0nnn (SYS addr)
    ///
    /// Machine code routine on the original hardware. Treated as a jump to `nnn`.
    System {
        address: Address,
    },
    /// 1nnn (JP addr)
    ///
    /// Jump to the address in `nnn`.
    JumpAddress {
        address: Address,
    },
    /// 2nnn (CALL addr)
    ///
    /// Call the sub-routine at address `nnn`.
    Call {
        address: Address,
    },
    /// 3xnn (SE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` equals value `nn`
    Skip_Eq_Byte {
        vx: u8,
        nn: u8,
    },
    /// 4xnn (SNE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` does not equal value `nn`.
    Skip_NotEq_Byte {
        vx: u8,
        nn: u8,
    },
    /// 5xy0 (SE Vx, Vy)
    ///
    /// Skip the next instruction if register `Vx` equals register `Vy`.
    Skip_Eq {
        vx: u8,
        vy: u8,
    },
    /// 6xnn (LD Vx, byte)
    Load_Byte {
        vx: u8,
        nn: u8,
    },
    /// 7xnn (ADD Vx, byte)
    ///
    /// Add byte to the value in register `Vx`, store the result in `Vx`.
    /// Carry flag is not set.
    Add_Byte {
        vx: u8,
        nn: u8,
    },

    // ------------------------------------------------------------------------
    // Math
    /// 8xy0 (LD Vx, Vy)
    ///
    /// Store the value of register VY in register VX.
    Load_Vx_Vy {
        vx: u8,
        vy: u8,
    },
    /// 8xy1 (OR Vx, Vy)
    Or_Vx_Vy {
        vx: u8,
        vy: u8,
    },
    /// 8xy2 (AND Vx, Vy)
    And_Vx_Vy {
        vx: u8,
        vy: u8,
    },
    /// 8xy3 (XOR Vx, Vy)
    Xor_Vx_Vy {
        vx: u8,
        vy: u8,
    },
    /// 8xy4 (ADD Vx, Vy)
    ///
    /// ADDs VX to VY, and stores the result in VX.
    /// Overflow is wrapped. If overflowed, set VF to 1, else 0.
    Add_Vx_Vy {
        vx: u8,
        vy: u8,
    },
    /// 8xy5 (SUB Vx, Vy)
    ///
    /// Subtracts VY from VX, and stores the result in VX.
    /// VF is set to 0 when there is a borrow, set to 1 when there isn't.
    Sub_Vx_Vy {
        vx: u8,
        vy: u8,
    },
    /// 8xy6 (SHR Vx {, Vy})
    ///
    /// Shift right by 1, the bit shifted out is stored in VF.
    /// Whether VY is the source depends on the shift quirk.
    ShiftRight {
        vx: u8,
        vy: u8,
    },
    /// 8xy7 (SUBN Vx, Vy)
    ///
    /// Subtracts VX from VY, and stores the result in VX.
    /// VF is set to 0 when there is a borrow, set to 1 when there isn't.
    SubReverse_Vx_Vy {
        vx: u8,
        vy: u8,
    },
    /// 8xyE (SHL Vx {, Vy})
    ///
    /// Shift left by 1, the bit shifted out is stored in VF.
    ShiftLeft {
        vx: u8,
        vy: u8,
    },
    /// 9xy0 (SNE Vx, Vy)
    ///
    /// Skip the next instruction if register `Vx` does not equal register `Vy`.
    Skip_NotEq {
        vx: u8,
        vy: u8,
    },

    /// Annn (LD I, addr)
    ///
    /// Load address into register `I`.
    Load_Address {
        address: Address,
    },
    /// Bnnn (JP V0, addr)
    ///
    /// Jump to location nnn + V0.
    Jump_V0 {
        address: Address,
    },
    /// Cxnn (RND Vx, byte)
    ///
    /// Generate random number, masked by `nn`.
    Random {
        vx: u8,
        nn: u8,
    },
    /// Dxyn (DRW Vx, Vy, nibble)
    ///
    /// Draw sprite to the display buffer.
    Draw {
        vx: u8,
        vy: u8,
        n: u8,
    },

    // ------------------------------------------------------------------------
    // Keyboard
    /// Ex9E (SKP Vx)
    Skip_Key {
        vx: u8,
    },
    /// ExA1 (SKNP Vx)
    Skip_NotKey {
        vx: u8,
    },

    // ------------------------------------------------------------------------
    // Misc
    /// Fx07 (LD Vx, DT)
    Load_Vx_Delay {
        vx: u8,
    },
    /// Fx0A (LD Vx, K)
    ///
    /// Wait for a key press, store the key in `Vx`.
    Wait_Key {
        vx: u8,
    },
    /// Fx15 (LD DT, Vx)
    Load_Delay_Vx {
        vx: u8,
    },
    /// Fx18 (LD ST, Vx)
    Load_Sound_Vx {
        vx: u8,
    },
    /// Fx1E (ADD I, Vx)
    Add_Address_Vx {
        vx: u8,
    },
    /// Fx29 (LD F, Vx)
    ///
    /// Point `I` at the font glyph for the digit in `Vx`.
    Load_Glyph {
        vx: u8,
    },
    /// Fx33 (LD B, Vx)
    Store_Bcd {
        vx: u8,
    },
    /// Fx55 (LD [I], Vx)
    Store_Registers {
        vx: u8,
    },
    /// Fx65 (LD Vx, [I])
    Load_Registers {
        vx: u8,
    },
}

impl Op {
    /// Decode an instruction word.
    ///
    /// Returns `None` if the word matches no opcode pattern.
    pub fn decode(word: u16) -> Option<Self> {
        let vx = op_x(word);
        let vy = op_y(word);
        let n = op_n(word);
        let nn = op_nn(word);
        let address = op_nnn(word);

        let op = match op_code(word) {
            0x0 => match word {
                0x00E0 => Self::ClearScreen,
                0x00EE => Self::Return,
                _ => Self::System { address },
            },
            0x1 => Self::JumpAddress { address },
            0x2 => Self::Call { address },
            0x3 => Self::Skip_Eq_Byte { vx, nn },
            0x4 => Self::Skip_NotEq_Byte { vx, nn },
            0x5 if n == 0 => Self::Skip_Eq { vx, vy },
            0x6 => Self::Load_Byte { vx, nn },
            0x7 => Self::Add_Byte { vx, nn },
            0x8 => match n {
                0x0 => Self::Load_Vx_Vy { vx, vy },
                0x1 => Self::Or_Vx_Vy { vx, vy },
                0x2 => Self::And_Vx_Vy { vx, vy },
                0x3 => Self::Xor_Vx_Vy { vx, vy },
                0x4 => Self::Add_Vx_Vy { vx, vy },
                0x5 => Self::Sub_Vx_Vy { vx, vy },
                0x6 => Self::ShiftRight { vx, vy },
                0x7 => Self::SubReverse_Vx_Vy { vx, vy },
                0xE => Self::ShiftLeft { vx, vy },
                _ => return None,
            },
            0x9 if n == 0 => Self::Skip_NotEq { vx, vy },
            0xA => Self::Load_Address { address },
            0xB => Self::Jump_V0 { address },
            0xC => Self::Random { vx, nn },
            0xD => Self::Draw { vx, vy, n },
            0xE => match nn {
                0x9E => Self::Skip_Key { vx },
                0xA1 => Self::Skip_NotKey { vx },
                _ => return None,
            },
            0xF => match nn {
                0x07 => Self::Load_Vx_Delay { vx },
                0x0A => Self::Wait_Key { vx },
                0x15 => Self::Load_Delay_Vx { vx },
                0x18 => Self::Load_Sound_Vx { vx },
                0x1E => Self::Add_Address_Vx { vx },
                0x29 => Self::Load_Glyph { vx },
                0x33 => Self::Store_Bcd { vx },
                0x55 => Self::Store_Registers { vx },
                0x65 => Self::Load_Registers { vx },
                _ => return None,
            },
            _ => return None,
        };

        Some(op)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Op::ClearScreen => write!(f, "CLS"),
            Op::Return => write!(f, "RET"),
            Op::System { address } => write!(f, "SYS 0x{address:03X}"),
            Op::JumpAddress { address } => write!(f, "JP 0x{address:03X}"),
            Op::Call { address } => write!(f, "CALL 0x{address:03X}"),
            Op::Skip_Eq_Byte { vx, nn } => write!(f, "SE v{vx:x}, 0x{nn:02X}"),
            Op::Skip_NotEq_Byte { vx, nn } => write!(f, "SNE v{vx:x}, 0x{nn:02X}"),
            Op::Skip_Eq { vx, vy } => write!(f, "SE v{vx:x}, v{vy:x}"),
            Op::Load_Byte { vx, nn } => write!(f, "LD v{vx:x}, 0x{nn:02X}"),
            Op::Add_Byte { vx, nn } => write!(f, "ADD v{vx:x}, 0x{nn:02X}"),
            // ------
            Op::Load_Vx_Vy { vx, vy } => write!(f, "LD v{vx:x}, v{vy:x}"),
            Op::Or_Vx_Vy { vx, vy } => write!(f, "OR v{vx:x}, v{vy:x}"),
            Op::And_Vx_Vy { vx, vy } => write!(f, "AND v{vx:x}, v{vy:x}"),
            Op::Xor_Vx_Vy { vx, vy } => write!(f, "XOR v{vx:x}, v{vy:x}"),
            Op::Add_Vx_Vy { vx, vy } => write!(f, "ADD v{vx:x}, v{vy:x}"),
            Op::Sub_Vx_Vy { vx, vy } => write!(f, "SUB v{vx:x}, v{vy:x}"),
            Op::ShiftRight { vx, vy } => write!(f, "SHR v{vx:x}, v{vy:x}"),
            Op::SubReverse_Vx_Vy { vx, vy } => write!(f, "SUBN v{vx:x}, v{vy:x}"),
            Op::ShiftLeft { vx, vy } => write!(f, "SHL v{vx:x}, v{vy:x}"),
            Op::Skip_NotEq { vx, vy } => write!(f, "SNE v{vx:x}, v{vy:x}"),
            // ------
            Op::Load_Address { address } => write!(f, "LD I, 0x{address:03X}"),
            Op::Jump_V0 { address } => write!(f, "JP v0, 0x{address:03X}"),
            Op::Random { vx, nn } => write!(f, "RND v{vx:x}, 0x{nn:02X}"),
            Op::Draw { vx, vy, n } => write!(f, "DRW v{vx:x}, v{vy:x}, {n}"),
            // ------
            Op::Skip_Key { vx } => write!(f, "SKP v{vx:x}"),
            Op::Skip_NotKey { vx } => write!(f, "SKNP v{vx:x}"),
            // ------
            Op::Load_Vx_Delay { vx } => write!(f, "LD v{vx:x}, DT"),
            Op::Wait_Key { vx } => write!(f, "LD v{vx:x}, K"),
            Op::Load_Delay_Vx { vx } => write!(f, "LD DT, v{vx:x}"),
            Op::Load_Sound_Vx { vx } => write!(f, "LD ST, v{vx:x}"),
            Op::Add_Address_Vx { vx } => write!(f, "ADD I, v{vx:x}"),
            Op::Load_Glyph { vx } => write!(f, "LD F, v{vx:x}"),
            Op::Store_Bcd { vx } => write!(f, "LD B, v{vx:x}"),
            Op::Store_Registers { vx } => write!(f, "LD [I], v{vx:x}"),
            Op::Load_Registers { vx } => write!(f, "LD v{vx:x}, [I]"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_families() {
        assert_eq!(Op::decode(0x00E0), Some(Op::ClearScreen));
        assert_eq!(Op::decode(0x00EE), Some(Op::Return));
        assert_eq!(Op::decode(0x0123), Some(Op::System { address: 0x123 }));
        assert_eq!(Op::decode(0x2ABC), Some(Op::Call { address: 0xABC }));
        assert_eq!(
            Op::decode(0x8AB6),
            Some(Op::ShiftRight { vx: 0xA, vy: 0xB })
        );
        assert_eq!(
            Op::decode(0xD015),
            Some(Op::Draw {
                vx: 0,
                vy: 1,
                n: 5
            })
        );
        assert_eq!(Op::decode(0xF30A), Some(Op::Wait_Key { vx: 3 }));
    }

    #[test]
    fn test_decode_unknown() {
        assert_eq!(Op::decode(0x5121), None);
        assert_eq!(Op::decode(0x9AB1), None);
        assert_eq!(Op::decode(0x8008), None);
        assert_eq!(Op::decode(0xE0FF), None);
        assert_eq!(Op::decode(0xF0FF), None);
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(Instr::new(0x200, 0x6A2F).to_string(), "LD va, 0x2F");
        assert_eq!(Instr::new(0x200, 0xD015).to_string(), "DRW v0, v1, 5");
        assert_eq!(Instr::new(0x200, 0xFFFF).to_string(), "0b11111111 0b11111111");
    }
}

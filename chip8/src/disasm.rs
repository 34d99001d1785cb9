//! Disassembler.
use std::fmt::{self, Write as FmtWrite};

use crate::{
    bytecode::fetch,
    constants::{Address, MEM_START},
    ir::Instr,
};

/// Linear listing of a ROM image, one instruction word at a time.
///
/// No control flow analysis is done, so sprite data in the program
/// is listed as whatever opcode it happens to look like.
pub struct Disassembler<'a> {
    bytecode: &'a [u8],
    cursor: usize,
}

impl<'a> Disassembler<'a> {
    pub fn new(bytecode: &'a [u8]) -> Self {
        Self {
            bytecode,
            cursor: 0,
        }
    }

    /// Write the whole listing to the given writer.
    pub fn disassemble<W: FmtWrite>(&mut self, w: &mut W) -> fmt::Result {
        self.cursor = 0;

        for instr in self.by_ref() {
            writeln!(w, "0x{:04X} {:04X} {}", instr.addr, instr.word, instr)?;
        }

        // Odd trailing byte can't form an instruction word.
        if let Some(byte) = self.bytecode.get(self.cursor) {
            writeln!(w, "0x{:04X} {byte:02X}", MEM_START + self.cursor)?;
        }

        Ok(())
    }
}

impl<'a> Iterator for Disassembler<'a> {
    type Item = Instr;

    fn next(&mut self) -> Option<Self::Item> {
        let word = fetch(self.bytecode, self.cursor)?;
        let addr = (MEM_START + self.cursor) as Address;
        self.cursor += 2;
        Some(Instr::new(addr, word))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::Op;

    #[test]
    fn test_iter_addresses() {
        let instrs: Vec<_> = Disassembler::new(&[0x00, 0xE0, 0x12, 0x00]).collect();
        assert_eq!(instrs.len(), 2);
        assert_eq!(instrs[0].addr, 0x200);
        assert_eq!(instrs[0].op, Some(Op::ClearScreen));
        assert_eq!(instrs[1].addr, 0x202);
        assert_eq!(instrs[1].op, Some(Op::JumpAddress { address: 0x200 }));
    }

    #[test]
    fn test_trailing_byte() {
        let mut buf = String::new();
        Disassembler::new(&[0x00, 0xE0, 0xAB])
            .disassemble(&mut buf)
            .unwrap();
        assert_eq!(buf.lines().last(), Some("0x0202 AB"));
    }
}

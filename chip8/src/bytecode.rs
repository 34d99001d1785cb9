//! Helpers for extracting data from opcodes.
//!
//! Instructions are two bytes, stored big-endian. The nibbles are named
//! after the operands they usually hold:
//!
//! ```text
//! 0xF000 op   0x0F00 x   0x00F0 y   0x000F n
//! 0x00FF nn   0x0FFF nnn
//! ```

/// Read the big-endian instruction word at the cursor.
///
/// Returns `None` when the word would extend past the end of the buffer.
#[inline(always)]
pub fn fetch(bytecode: &[u8], cursor: usize) -> Option<u16> {
    match (bytecode.get(cursor), bytecode.get(cursor + 1)) {
        (Some(&a), Some(&b)) => Some(u16::from_be_bytes([a, b])),
        _ => None,
    }
}

/// Extract opcode identity from the upper nibble.
#[inline(always)]
pub fn op_code(word: u16) -> u8 {
    (word >> 12) as u8
}

/// Extract operand NNN.
#[inline(always)]
pub fn op_nnn(word: u16) -> u16 {
    word & 0x0FFF
}

/// Extract operand NN.
#[inline(always)]
pub fn op_nn(word: u16) -> u8 {
    (word & 0x00FF) as u8
}

/// Extract operand X.
#[inline(always)]
pub fn op_x(word: u16) -> u8 {
    ((word & 0x0F00) >> 8) as u8
}

/// Extract operand Y.
#[inline(always)]
pub fn op_y(word: u16) -> u8 {
    ((word & 0x00F0) >> 4) as u8
}

/// Extract operand N.
#[inline(always)]
pub fn op_n(word: u16) -> u8 {
    (word & 0x000F) as u8
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_operands() {
        let word = 0xD12F;
        assert_eq!(op_code(word), 0xD);
        assert_eq!(op_x(word), 0x1);
        assert_eq!(op_y(word), 0x2);
        assert_eq!(op_n(word), 0xF);
        assert_eq!(op_nn(word), 0x2F);
        assert_eq!(op_nnn(word), 0x12F);
    }

    #[test]
    fn test_fetch_big_endian() {
        let bytecode = [0x12, 0x34, 0x56];
        assert_eq!(fetch(&bytecode, 0), Some(0x1234));
        assert_eq!(fetch(&bytecode, 1), Some(0x3456));
        assert_eq!(fetch(&bytecode, 2), None);
    }
}

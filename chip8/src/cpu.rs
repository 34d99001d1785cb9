//! CPU and memory state.
use crate::{
    constants::*,
    error::{Chip8Error, Chip8Result},
};

/// Core state for a chip8 interpreter.
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the next instruction to decode.
    pub(crate) pc: Address,
    /// Stack pointer, indicating the number of return addresses on the stack.
    pub(crate) sp: usize,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) is used for either the carry flag or borrow switch depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// Pointer register used for temporarily storing an address.
    ///
    /// Can be pushed past the 12-bit address space by `ADD I, Vx`, so every
    /// memory access through it is bounds checked.
    pub(crate) address: u16,
    /// (DT) Delay timer that counts down to 0.
    pub(crate) delay_timer: u8,
    /// (ST) Sound timer that counts down to 0. When it has a non-zero value, a beep is played.
    pub(crate) sound_timer: u8,
    /// Indicates that the machine is waiting for a keypress.
    pub(crate) key_wait: bool,
    /// Keyboard input state. Pressed is a 1 bit, released is a 0 bit.
    pub(crate) key_state: u16,
    /// Keys that went from released to pressed since the key wait was armed.
    pub(crate) key_presses: u16,

    // ------------------------------------------------------------------------
    // Memory
    /// Main memory storage space.
    pub(crate) ram: Box<[u8; MEM_SIZE]>,
    /// Stack of return pointers used for jumping when a routine call finishes.
    pub(crate) stack: [Address; STACK_SIZE],
    /// Screen buffer that is drawn too.
    pub(crate) display: Box<[bool; DISPLAY_BUFFER_SIZE]>,

    // ------------------------------------------------------------------------
    // Control
    /// Display was changed by the last executed instruction.
    pub(crate) dirty: bool,
    /// Interrupt for VM loop. Set when the machine has halted.
    pub(crate) trap: bool,
    /// Steps executed since the timers were last decremented by cycle accounting.
    pub(crate) cycles: u32,
}

impl Default for Chip8Cpu {
    fn default() -> Self {
        let mut cpu = Self {
            pc: MEM_START as Address,
            sp: 0,
            registers: [0; REGISTER_COUNT],
            address: 0,
            delay_timer: 0,
            sound_timer: 0,
            key_wait: false,
            key_state: 0,
            key_presses: 0,

            ram: Box::new([0; MEM_SIZE]),
            stack: [0; STACK_SIZE],
            display: Box::new([false; DISPLAY_BUFFER_SIZE]),

            // Presenter must draw the initial blank screen.
            dirty: true,
            trap: false,
            cycles: 0,
        };
        cpu.load_font();
        cpu
    }
}

impl Chip8Cpu {
    pub fn new() -> Self {
        Default::default()
    }

    /// Copy the builtin font glyphs into low memory.
    pub(crate) fn load_font(&mut self) {
        let start = FONTSET_START as usize;
        self.ram[start..start + FONTSET_DATA_LENGTH].copy_from_slice(&FONTSET);
    }

    /// Erase the contents of the memory buffers `ram`, `stack` and `display`.
    pub(crate) fn clear_memory(&mut self) {
        self.ram.fill(0);
        self.stack.fill(0);
        self.display.fill(false);
    }

    /// Return registers, timers and control state to their power-on values.
    ///
    /// Memory contents are left alone.
    pub(crate) fn reset_registers(&mut self) {
        self.pc = MEM_START as Address;
        self.sp = 0;
        self.registers.fill(0);
        self.address = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.key_wait = false;
        self.key_presses = 0;
        self.dirty = true;
        self.trap = false;
        self.cycles = 0;
    }

    pub fn interrupt(&mut self) {
        self.trap = true;
    }

    pub fn clear_display(&mut self) {
        self.display.fill(false);
        self.dirty = true;
    }

    // ------------------------------------------------------------------------
    // Stack

    /// Push a return address onto the call stack.
    ///
    /// `at` is the address of the calling instruction, for error reporting.
    pub(crate) fn push_return(&mut self, return_address: Address, at: Address) -> Chip8Result<()> {
        if self.sp >= STACK_SIZE {
            return Err(Chip8Error::StackOverflow { address: at });
        }
        self.stack[self.sp] = return_address;
        self.sp += 1;
        Ok(())
    }

    /// Pop the most recent return address off the call stack.
    pub(crate) fn pop_return(&mut self, at: Address) -> Chip8Result<Address> {
        if self.sp == 0 {
            return Err(Chip8Error::StackUnderflow { address: at });
        }
        self.sp -= 1;
        Ok(self.stack[self.sp])
    }

    /// Return addresses currently on the stack, oldest first.
    pub fn stack(&self) -> &[Address] {
        &self.stack[..self.sp]
    }

    // ------------------------------------------------------------------------
    // Memory

    /// Borrow `len` bytes of memory starting at `address`.
    pub(crate) fn mem(&self, address: usize, len: usize) -> Chip8Result<&[u8]> {
        match address.checked_add(len) {
            Some(end) if end <= MEM_SIZE => Ok(&self.ram[address..end]),
            _ => Err(Chip8Error::MemoryOutOfBounds { address, len }),
        }
    }

    /// Mutably borrow `len` bytes of memory starting at `address`.
    pub(crate) fn mem_mut(&mut self, address: usize, len: usize) -> Chip8Result<&mut [u8]> {
        match address.checked_add(len) {
            Some(end) if end <= MEM_SIZE => Ok(&mut self.ram[address..end]),
            _ => Err(Chip8Error::MemoryOutOfBounds { address, len }),
        }
    }

    /// Extract the instruction word at the current program counter.
    #[inline(always)]
    pub(crate) fn instr(&self) -> Chip8Result<u16> {
        let bytes = self.mem(self.pc as usize, 2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    // ------------------------------------------------------------------------
    // Keyboard

    pub fn set_key_state(&mut self, key_id: u8, state: bool) {
        if key_id < KEY_COUNT {
            let mask = 1 << key_id;
            if state {
                if self.key_state & mask == 0 {
                    self.key_presses |= mask;
                }
                self.key_state |= mask;
            } else {
                self.key_state &= !mask;
            }
        }
    }

    pub fn key_state(&self, key_id: u8) -> bool {
        if key_id < KEY_COUNT {
            self.key_state & (1 << key_id) > 0
        } else {
            false
        }
    }

    /// Check whether any key is pressed down.
    #[inline(always)]
    pub fn any_key(&self) -> bool {
        self.key_state > 0
    }

    /// Arm the key wait, forgetting presses that happened before it.
    pub(crate) fn arm_key_wait(&mut self) {
        self.key_wait = true;
        self.key_presses = 0;
    }

    /// Take the lowest key that was pressed down since the key wait was armed.
    #[inline]
    pub(crate) fn take_key_press(&mut self) -> Option<u8> {
        if self.key_presses == 0 {
            return None;
        }
        let key = self.key_presses.trailing_zeros() as u8;
        self.key_wait = false;
        self.key_presses = 0;
        Some(key)
    }

    /// Clear the keyboard input state, setting all keys to up.
    #[inline(always)]
    pub fn clear_keys(&mut self) {
        self.key_state = 0;
    }

    // ------------------------------------------------------------------------
    // Timers

    /// Count down the delay timer.
    #[inline]
    pub fn tick_delay(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
    }

    /// Count down the sound timer.
    #[inline]
    pub fn tick_sound(&mut self) {
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_key_state() {
        let mut cpu = Chip8Cpu::default();

        cpu.set_key_state(0, true);
        assert_eq!(cpu.key_state, 0b00000000_00000001);
        assert!(cpu.key_state(0));
        assert!(!cpu.key_state(1));
        assert!(!cpu.key_state(7));

        cpu.set_key_state(7, true);
        assert_eq!(cpu.key_state, 0b00000000_10000001);
        assert!(cpu.key_state(0));
        assert!(!cpu.key_state(1));
        assert!(cpu.key_state(7));

        cpu.set_key_state(0, false);
        assert_eq!(cpu.key_state, 0b00000000_10000000);
        assert!(!cpu.key_state(0));
        assert!(!cpu.key_state(1));
        assert!(cpu.key_state(7));

        cpu.set_key_state(15, true);
        assert_eq!(cpu.key_state, 0b10000000_10000000);
        assert!(!cpu.key_state(0));
        assert!(!cpu.key_state(1));
        assert!(cpu.key_state(7));
        assert!(cpu.key_state(15));

        // Out of range keys are ignored.
        cpu.set_key_state(16, true);
        assert_eq!(cpu.key_state, 0b10000000_10000000);
        assert!(!cpu.key_state(16));
    }

    #[test]
    fn test_key_press_edges() {
        let mut cpu = Chip8Cpu::default();

        // Held before arming does not count.
        cpu.set_key_state(3, true);
        cpu.arm_key_wait();
        assert_eq!(cpu.take_key_press(), None);

        // Repeated press of a held key is not a transition.
        cpu.set_key_state(3, true);
        assert_eq!(cpu.take_key_press(), None);

        cpu.set_key_state(9, true);
        cpu.set_key_state(3, false);
        cpu.set_key_state(3, true);
        assert_eq!(cpu.take_key_press(), Some(3));
        assert!(!cpu.key_wait);
    }

    #[test]
    fn test_stack_bounds() {
        let mut cpu = Chip8Cpu::default();
        assert!(matches!(
            cpu.pop_return(0x200),
            Err(Chip8Error::StackUnderflow { address: 0x200 })
        ));

        for i in 0..STACK_SIZE {
            cpu.push_return(0x202 + i as u16 * 2, 0x200).unwrap();
        }
        assert!(matches!(
            cpu.push_return(0x300, 0x2FE),
            Err(Chip8Error::StackOverflow { address: 0x2FE })
        ));
        assert_eq!(cpu.stack().len(), STACK_SIZE);
        assert_eq!(cpu.pop_return(0x400).unwrap(), 0x220);
    }

    #[test]
    fn test_font_loaded() {
        let cpu = Chip8Cpu::new();
        assert_eq!(&cpu.ram[0..5], &[0xF0, 0x90, 0x90, 0x90, 0xF0]);
        assert_eq!(cpu.ram[FONTSET_DATA_LENGTH - 1], 0x80);
        assert_eq!(cpu.pc, 0x200);
    }

    #[test]
    fn test_memory_bounds() {
        let cpu = Chip8Cpu::new();
        assert!(cpu.mem(MEM_SIZE - 3, 3).is_ok());
        assert!(matches!(
            cpu.mem(MEM_SIZE - 2, 3),
            Err(Chip8Error::MemoryOutOfBounds {
                address: 0xFFE,
                len: 3
            })
        ));
    }

    #[test]
    fn test_timers_saturate() {
        let mut cpu = Chip8Cpu::new();
        cpu.delay_timer = 1;
        cpu.tick_delay();
        cpu.tick_delay();
        cpu.tick_sound();
        assert_eq!(cpu.delay_timer, 0);
        assert_eq!(cpu.sound_timer, 0);
    }
}

//! Virtual machine.
use std::{
    fmt::{self, Write},
    fs,
    path::Path,
};

use log::{debug, error, trace, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    conf::{Chip8Conf, ShiftSource, SpriteOverflow, TimerMode, UnknownOpcodePolicy},
    constants::*,
    cpu::Chip8Cpu,
    display::{self, Chip8DisplayBuffer},
    error::{Chip8Error, Chip8Result},
    ir::Op,
    keys::KeyCode,
};

pub struct Chip8Vm {
    cpu: Chip8Cpu,
    rng: StdRng,
    /// Program image as it was loaded, kept for resets.
    program: Vec<u8>,
    conf: Chip8Conf,
}

impl Chip8Vm {
    pub fn new(conf: Chip8Conf) -> Self {
        let rng = match conf.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Chip8Vm {
            cpu: Chip8Cpu::new(),
            rng,
            program: Vec::new(),
            conf,
        }
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    /// Load a program image into memory at [`MEM_START`] and reset the machine.
    ///
    /// An image larger than [`MAX_PROGRAM_SIZE`] is rejected, and the VM
    /// is left untouched.
    pub fn load_bytecode(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if bytecode.len() > MAX_PROGRAM_SIZE {
            return Err(Chip8Error::LargeProgram {
                size: bytecode.len(),
            });
        }

        self.program.clear();
        self.program.extend_from_slice(bytecode);
        self.reset();

        debug!("loaded program of {} bytes", bytecode.len());

        Ok(())
    }

    /// Read a ROM file from disk and load it.
    ///
    /// An unreadable file is reported as [`Chip8Error::Io`] and, like an
    /// oversized image, leaves the VM untouched.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Chip8Result<()> {
        let bytecode = fs::read(path.as_ref())?;
        debug!("read {}", path.as_ref().display());
        self.load_bytecode(&bytecode)
    }

    /// Return the machine to its power-on state with the loaded program.
    pub fn reset(&mut self) {
        // Start with clean memory to avoid leaking previous program.
        self.cpu.clear_memory();
        self.cpu.load_font();
        self.cpu.ram[MEM_START..MEM_START + self.program.len()].copy_from_slice(&self.program);
        self.cpu.reset_registers();
    }

    pub fn display_buffer(&self) -> Chip8DisplayBuffer {
        &self.cpu.display
    }

    /// Expand the display into 32-bit ARGB pixels for texture upload.
    pub fn write_argb(&self, out: &mut [u32]) {
        display::write_argb(&self.cpu.display, out)
    }

    /// Whether the display changed during the last step.
    pub fn is_dirty(&self) -> bool {
        self.cpu.dirty
    }

    /// Whether the machine has stopped executing after a fault or interrupt.
    pub fn is_halted(&self) -> bool {
        self.cpu.trap
    }

    /// Whether the buzzer should be sounding.
    pub fn is_buzzing(&self) -> bool {
        self.cpu.sound_timer > 0
    }

    /// Whether the machine is stalled on `LD Vx, K`.
    pub fn is_waiting_for_key(&self) -> bool {
        self.cpu.key_wait
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.cpu.registers
    }

    pub fn pc(&self) -> Address {
        self.cpu.pc
    }

    /// Value of the index register `I`.
    pub fn index(&self) -> u16 {
        self.cpu.address
    }

    pub fn delay_timer(&self) -> u8 {
        self.cpu.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.cpu.sound_timer
    }

    /// Return addresses on the call stack, oldest first.
    pub fn stack(&self) -> &[Address] {
        self.cpu.stack()
    }

    pub fn memory(&self) -> &[u8; MEM_SIZE] {
        &self.cpu.ram
    }
}

/// Control flow signal returned to the host after each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Flow {
    Ok,
    /// Program counter has jumped to a new address.
    ///
    /// This is useful for the caller to avoid being
    /// blocked on infinite or long running loops.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 0nnn (`SYS addr`)
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - 00EE (`RET`)
    /// - Bnnn (`JP V0, addr`)
    Jump,
    /// The display buffer changed and should be presented.
    Draw,
    /// The sound timer was set.
    Sound,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stops
    /// execution until a key is pressed, and loads the key value into `Vx`.
    /// The host must keep stepping; the instruction is retried each step.
    KeyWait,
    /// Machine is halted and did not execute anything.
    Halted,
}

/// Interpreter
impl Chip8Vm {
    /// Sets the keyboard key input state.
    ///
    /// A key going down while the VM waits for input will be picked up
    /// by the next step.
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        self.cpu.set_key_state(key.as_u8(), pressed);
    }

    /// Clear the keyboard input state, setting all keys to up.
    pub fn clear_keys(&mut self) {
        self.cpu.clear_keys()
    }

    /// Stop the machine. Following steps return [`Flow::Halted`].
    pub fn interrupt(&mut self) {
        self.cpu.interrupt()
    }

    /// Count down the delay and sound timers by one.
    ///
    /// With [`TimerMode::External`] the host calls this at 60 Hz,
    /// independently of how often it calls [`Chip8Vm::step`].
    pub fn tick_timers(&mut self) {
        self.cpu.tick_delay();
        self.cpu.tick_sound();
    }

    /// Execute up to `step_count` instructions.
    ///
    /// Stops early when the machine halts. Returns the flow of the last step.
    pub fn run_steps(&mut self, step_count: usize) -> Chip8Result<Flow> {
        let mut flow = Flow::Ok;

        for _ in 0..step_count {
            flow = self.step()?;
            if flow == Flow::Halted {
                break;
            }
        }

        Ok(flow)
    }

    /// Fetch, decode and execute the instruction at the program counter.
    pub fn step(&mut self) -> Chip8Result<Flow> {
        if self.cpu.trap {
            // Interrupt signal is set.
            return Ok(Flow::Halted);
        }

        self.cpu.dirty = false;

        let address = self.cpu.pc;
        let result = self.exec(address);

        // Faulted instructions did not execute, and don't consume the budget.
        if let (Ok(_), TimerMode::CycleBudget { cycles_per_frame }) =
            (&result, self.conf.timer_mode)
        {
            self.cpu.cycles += 1;
            if self.cpu.cycles >= cycles_per_frame.max(1) {
                self.cpu.cycles = 0;
                self.tick_timers();
            }
        }

        result.map_err(|err| self.fault(address, err))
    }

    /// Apply the error policy to a failed instruction.
    fn fault(&mut self, address: Address, err: Chip8Error) -> Chip8Error {
        // Leave the machine where the failing instruction started.
        self.cpu.pc = address;

        match err {
            Chip8Error::UnknownOpcode { .. }
                if self.conf.quirks.unknown_opcode == UnknownOpcodePolicy::Skip =>
            {
                warn!("{err}, skipping");
                self.cpu.pc = address.wrapping_add(2);
            }
            _ => {
                error!("{err}, halting");
                self.cpu.trap = true;
            }
        }

        err
    }

    fn exec(&mut self, address: Address) -> Chip8Result<Flow> {
        let word = self.cpu.instr()?;
        let op = Op::decode(word).ok_or(Chip8Error::UnknownOpcode {
            opcode: word,
            address,
        })?;

        trace!("{address:04X}: {word:04X} {op}");

        self.cpu.pc = address.wrapping_add(2);

        match op {
            Op::ClearScreen
            | Op::Return
            | Op::System { .. }
            | Op::Skip_Key { .. }
            | Op::Skip_NotKey { .. }
            | Op::Load_Vx_Delay { .. }
            | Op::Wait_Key { .. }
            | Op::Load_Delay_Vx { .. }
            | Op::Load_Sound_Vx { .. }
            | Op::Add_Address_Vx { .. }
            | Op::Load_Glyph { .. }
            | Op::Store_Bcd { .. }
            | Op::Store_Registers { .. }
            | Op::Load_Registers { .. } => self.exec_misc(op, address),
            Op::Load_Vx_Vy { .. }
            | Op::Or_Vx_Vy { .. }
            | Op::And_Vx_Vy { .. }
            | Op::Xor_Vx_Vy { .. }
            | Op::Add_Vx_Vy { .. }
            | Op::Sub_Vx_Vy { .. }
            | Op::ShiftRight { .. }
            | Op::SubReverse_Vx_Vy { .. }
            | Op::ShiftLeft { .. } => {
                self.exec_math(op);
                Ok(Flow::Ok)
            }
            // 1nnn (JP addr)
            //
            // Jump to address.
            Op::JumpAddress { address } => {
                self.cpu.pc = address;
                Ok(Flow::Jump)
            }
            // 2nnn (CALL addr)
            //
            // Call subroutine at NNN.
            // The return address is the instruction following the call.
            Op::Call { address: target } => {
                self.cpu.push_return(self.cpu.pc, address)?;
                self.cpu.pc = target;
                Ok(Flow::Jump)
            }
            // 3xnn (SE Vx, byte)
            //
            // Skip the next instruction if register VX equals value NN.
            Op::Skip_Eq_Byte { vx, nn } => {
                self.skip_if(self.cpu.registers[vx as usize] == nn);
                Ok(Flow::Ok)
            }
            // 4xnn (SNE Vx, byte)
            Op::Skip_NotEq_Byte { vx, nn } => {
                self.skip_if(self.cpu.registers[vx as usize] != nn);
                Ok(Flow::Ok)
            }
            // 5xy0 (SE Vx, Vy)
            Op::Skip_Eq { vx, vy } => {
                let (x, y) = self.xy(vx, vy);
                self.skip_if(x == y);
                Ok(Flow::Ok)
            }
            // 9xy0 (SNE Vx, Vy)
            Op::Skip_NotEq { vx, vy } => {
                let (x, y) = self.xy(vx, vy);
                self.skip_if(x != y);
                Ok(Flow::Ok)
            }
            // 6xnn (LD Vx, byte)
            Op::Load_Byte { vx, nn } => {
                self.cpu.registers[vx as usize] = nn;
                Ok(Flow::Ok)
            }
            // 7xnn (ADD Vx, byte)
            //
            // Add value NN to register VX. Carry flag is not set.
            Op::Add_Byte { vx, nn } => {
                let x = self.cpu.registers[vx as usize];
                self.cpu.registers[vx as usize] = x.wrapping_add(nn);
                Ok(Flow::Ok)
            }
            // Annn (LD I, addr)
            Op::Load_Address { address } => {
                self.cpu.address = address;
                Ok(Flow::Ok)
            }
            // Bnnn (JP V0, addr)
            Op::Jump_V0 { address } => {
                self.cpu.pc = address + self.cpu.registers[0] as u16;
                Ok(Flow::Jump)
            }
            // Cxnn (RND Vx, byte)
            //
            // Set register VX to the result of bitwise AND between a random number and NN.
            Op::Random { vx, nn } => {
                self.cpu.registers[vx as usize] = nn & self.rng.gen::<u8>();
                Ok(Flow::Ok)
            }
            Op::Draw { vx, vy, n } => self.exec_draw(vx, vy, n),
        }
    }

    #[inline(always)]
    fn xy(&self, vx: u8, vy: u8) -> (u8, u8) {
        (
            self.cpu.registers[vx as usize],
            self.cpu.registers[vy as usize],
        )
    }

    /// Skip over the next instruction when the condition holds.
    #[inline(always)]
    fn skip_if(&mut self, cond: bool) {
        if cond {
            self.cpu.pc = self.cpu.pc.wrapping_add(2);
        }
    }

    /// Dxyn (DRW Vx, Vy, nibble)
    ///
    /// Draw sprite to the display buffer, at coordinate as per registers Vx and Vy.
    /// Sprite is encoded as 8 pixels wide, N pixels high, stored in bits located in
    /// memory pointed to by address register I.
    ///
    /// If the sprite is drawn outside of the display area, it is wrapped around to the other side.
    ///
    /// If the drawing operation erases existing pixels in the display buffer, register VF is set to
    /// 1, and set to 0 if no display bits are unset. This is used for collision detection.
    fn exec_draw(&mut self, vx: u8, vy: u8, n: u8) -> Chip8Result<Flow> {
        let (x, y) = self.xy(vx, vy);
        let start = self.cpu.address as usize;
        let rows = match self.conf.quirks.sprite_overflow {
            SpriteOverflow::Fault => n as usize,
            SpriteOverflow::Clamp => (n as usize).min(MEM_SIZE.saturating_sub(start)),
        };

        // Sprite rows are copied out so the display can be borrowed mutably.
        let mut sprite = [0; 0xF];
        if rows > 0 {
            sprite[..rows].copy_from_slice(self.cpu.mem(start, rows)?);
        }

        let is_erased = display::draw_sprite(&mut self.cpu.display, x, y, &sprite[..rows]);

        // If a pixel was erased, then a collision occurred.
        self.cpu.registers[FLAG_REGISTER] = is_erased as u8;
        self.cpu.dirty = true;

        Ok(Flow::Draw)
    }

    /// Execute an arithmetic instruction
    ///
    /// The flag is computed from the operands before either register is
    /// written, then VF is written before Vx.
    #[inline]
    fn exec_math(&mut self, op: Op) {
        let borrow = self.conf.quirks.borrow;
        let regs = &mut self.cpu.registers;

        match op {
            // 8xy0 (LD Vx, Vy)
            Op::Load_Vx_Vy { vx, vy } => {
                regs[vx as usize] = regs[vy as usize];
            }
            // 8xy1 (OR Vx, Vy)
            Op::Or_Vx_Vy { vx, vy } => {
                regs[vx as usize] |= regs[vy as usize];
            }
            // 8xy2 (AND Vx, Vy)
            Op::And_Vx_Vy { vx, vy } => {
                regs[vx as usize] &= regs[vy as usize];
            }
            // 8xy3 (XOR Vx, Vy)
            Op::Xor_Vx_Vy { vx, vy } => {
                regs[vx as usize] ^= regs[vy as usize];
            }
            // 8xy4 (ADD Vx, Vy)
            //
            // If overflow, set VF to 1, else 0.
            Op::Add_Vx_Vy { vx, vy } => {
                let (result, overflow) = regs[vx as usize].overflowing_add(regs[vy as usize]);
                regs[FLAG_REGISTER] = overflow as u8;
                regs[vx as usize] = result;
            }
            // 8xy5 (SUB Vx, Vy)
            //
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            Op::Sub_Vx_Vy { vx, vy } => {
                let (x, y) = (regs[vx as usize], regs[vy as usize]);
                regs[FLAG_REGISTER] = borrow.flag(x, y);
                regs[vx as usize] = x.wrapping_sub(y);
            }
            // 8xy7 (SUBN Vx, Vy)
            Op::SubReverse_Vx_Vy { vx, vy } => {
                let (x, y) = (regs[vx as usize], regs[vy as usize]);
                regs[FLAG_REGISTER] = borrow.flag(y, x);
                regs[vx as usize] = y.wrapping_sub(x);
            }
            // 8xy6 (SHR Vx)
            //
            // Least-significant bit is shifted out into VF.
            Op::ShiftRight { vx, vy } => {
                let src = match self.conf.quirks.shift_source {
                    ShiftSource::Vx => regs[vx as usize],
                    ShiftSource::Vy => regs[vy as usize],
                };
                regs[FLAG_REGISTER] = src & 1;
                regs[vx as usize] = src >> 1;
            }
            // 8xyE (SHL Vx)
            //
            // Most-significant bit is shifted out into VF.
            Op::ShiftLeft { vx, vy } => {
                let src = match self.conf.quirks.shift_source {
                    ShiftSource::Vx => regs[vx as usize],
                    ShiftSource::Vy => regs[vy as usize],
                };
                regs[FLAG_REGISTER] = (src >> 7) & 1;
                regs[vx as usize] = src << 1;
            }
            _ => unreachable!("not an arithmetic instruction: {op:?}"),
        }
    }

    /// Check that a register value can be used as a key or glyph index.
    #[inline]
    fn key_operand(&self, vx: u8, address: Address) -> Chip8Result<u8> {
        let key = self.cpu.registers[vx as usize];
        if key < KEY_COUNT {
            Ok(key)
        } else {
            Err(Chip8Error::InvalidKey { key, address })
        }
    }

    /// Execute a miscellaneous instruction
    fn exec_misc(&mut self, op: Op, address: Address) -> Chip8Result<Flow> {
        let mut control_flow = Flow::Ok;

        match op {
            // ----------------------------------------------------------------
            // 00E0 (CLS)
            Op::ClearScreen => {
                self.cpu.clear_display();
                control_flow = Flow::Draw;
            }
            // 00EE (RET)
            //
            // Return from a subroutine.
            // Set the program counter to the value at the top of the stack.
            Op::Return => {
                self.cpu.pc = self.cpu.pop_return(address)?;
                control_flow = Flow::Jump;
            }
            // 0nnn (SYS addr)
            //
            // Machine code routines can't be run, so this is a plain jump.
            Op::System { address } => {
                self.cpu.pc = address;
                control_flow = Flow::Jump;
            }
            // ----------------------------------------------------------------
            // Ex9E (SKP Vx)
            Op::Skip_Key { vx } => {
                let key = self.key_operand(vx, address)?;
                self.skip_if(self.cpu.key_state(key));
            }
            // ExA1 (SKNP Vx)
            Op::Skip_NotKey { vx } => {
                let key = self.key_operand(vx, address)?;
                self.skip_if(!self.cpu.key_state(key));
            }
            // ----------------------------------------------------------------
            // Fx07 (LD Vx, DT)
            Op::Load_Vx_Delay { vx } => {
                self.cpu.registers[vx as usize] = self.cpu.delay_timer;
            }
            // Fx0A (LD Vx, K)
            //
            // Wait for a key press, store the value of the key in Vx.
            // Execution stalls on this instruction until a key goes down.
            Op::Wait_Key { vx } => {
                if !self.cpu.key_wait {
                    debug!("waiting for key press into v{vx:x}");
                    self.cpu.arm_key_wait();
                }

                if let Some(k) = self.cpu.take_key_press() {
                    self.cpu.registers[vx as usize] = k;
                } else {
                    // rewind the program counter to stall the machine
                    self.cpu.pc = address;
                    control_flow = Flow::KeyWait;
                }
            }
            // Fx15 (LD DT, Vx)
            Op::Load_Delay_Vx { vx } => {
                self.cpu.delay_timer = self.cpu.registers[vx as usize];
            }
            // Fx18 (LD ST, Vx)
            Op::Load_Sound_Vx { vx } => {
                self.cpu.sound_timer = self.cpu.registers[vx as usize];
                control_flow = Flow::Sound;
            }
            // Fx1E (ADD I, Vx)
            //
            // VF is set when the result leaves the 12-bit address space.
            // I saturates instead of wrapping back into low memory, so
            // later accesses through it fault.
            Op::Add_Address_Vx { vx } => {
                let x = self.cpu.registers[vx as usize] as u16;
                let sum = self.cpu.address as u32 + x as u32;
                self.cpu.registers[FLAG_REGISTER] = (sum > ADDRESS_MASK as u32) as u8;
                self.cpu.address = self.cpu.address.saturating_add(x);
            }
            // Fx29 (LD F, Vx)
            //
            // Set I = location of sprite for digit Vx.
            Op::Load_Glyph { vx } => {
                let digit = self.key_operand(vx, address)?;
                self.cpu.address = FONTSET_START + digit as u16 * FONTSET_HEIGHT as u16;
            }
            // Fx33 (LD B, Vx)
            //
            // Store the binary-coded decimal representation of Vx
            // in the memory locations I, I+1, and I+2.
            #[rustfmt::skip]
            Op::Store_Bcd { vx } => {
                let x = self.cpu.registers[vx as usize];
                let bcd = self.cpu.mem_mut(self.cpu.address as usize, 3)?;
                bcd[0] = x / 100;
                bcd[1] = x / 10  % 10;
                bcd[2] = x       % 10;
            }
            // Fx55 (LD [I], Vx)
            //
            // Store registers V0 through Vx in memory starting at location I.
            Op::Store_Registers { vx } => {
                let count = vx as usize + 1;
                let registers = self.cpu.registers;
                self.cpu
                    .mem_mut(self.cpu.address as usize, count)?
                    .copy_from_slice(&registers[..count]);
                self.increment_after_load_store(count);
            }
            // Fx65 (LD Vx, [I])
            //
            // Read registers V0 through Vx from memory starting at location I.
            Op::Load_Registers { vx } => {
                let count = vx as usize + 1;
                let mut values = [0; REGISTER_COUNT];
                values[..count].copy_from_slice(self.cpu.mem(self.cpu.address as usize, count)?);
                self.cpu.registers[..count].copy_from_slice(&values[..count]);
                self.increment_after_load_store(count);
            }
            _ => unreachable!("not a miscellaneous instruction: {op:?}"),
        }

        Ok(control_flow)
    }

    #[inline]
    fn increment_after_load_store(&mut self, count: usize) {
        if self.conf.quirks.load_store_increment {
            self.cpu.address = self.cpu.address.wrapping_add(count as u16);
        }
    }
}

/// Troubleshooting
#[doc(hidden)]
impl Chip8Vm {
    /// Returns the contents of the program memory as a human readable string.
    pub fn dump_ram(&self, count: usize) -> Result<String, fmt::Error> {
        let iter = self
            .cpu
            .ram
            .chunks_exact(2)
            .enumerate()
            .skip(MEM_START / 2)
            .take(count / 2);
        let mut buf = String::new();

        for (i, op) in iter {
            writeln!(buf, "{:04X}: {:02X}{:02X}", i * 2, op[0], op[1])?;
        }

        Ok(buf)
    }

    pub fn dump_display(&self) -> Result<String, fmt::Error> {
        display::dump(&self.cpu.display)
    }

    pub fn dump_keys(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        if self.cpu.any_key() {
            write!(buf, "keys: ")?;
            for i in 0..KEY_COUNT {
                if self.cpu.key_state(i) {
                    write!(buf, "k{i:x}")?;
                }
            }
        }

        Ok(buf)
    }

    pub fn dump_registers(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        for (i, v) in self.cpu.registers.iter().enumerate() {
            write!(buf, "v{i:x}={v:02X} ")?;
        }
        write!(
            buf,
            "I={:03X} PC={:03X} SP={} DT={} ST={}",
            self.cpu.address, self.cpu.pc, self.cpu.sp, self.cpu.delay_timer, self.cpu.sound_timer
        )?;

        Ok(buf)
    }
}

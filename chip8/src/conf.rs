//! VM configuration and compatibility quirks.
//!
//! Interpreters of the Chip-8 lineage disagree on the exact behaviour of
//! a handful of opcodes. Rather than picking one silently, each point of
//! divergence is an explicit switch in [`Quirks`].
use std::time::Duration;

use crate::constants::*;

/// VM Configuration Parameters.
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Chip8Conf {
    /// Rate at which the host should step the interpreter.
    ///
    /// Defaults to [`DEFAULT_CLOCK_FREQUENCY`] when unset.
    pub clock_frequency: Option<Hz>,
    pub quirks: Quirks,
    pub timer_mode: TimerMode,
    /// Seed for the `RND` instruction. Seeded from entropy when unset.
    pub rng_seed: Option<u64>,
}

impl Chip8Conf {
    pub fn clock_frequency(&self) -> Hz {
        self.clock_frequency
            .unwrap_or(Hz(DEFAULT_CLOCK_FREQUENCY))
    }
}

/// Compatibility switches for opcodes with contested semantics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Quirks {
    /// Flag polarity of `8xy5` (SUB) and `8xy7` (SUBN).
    pub borrow: BorrowFlag,
    /// Source register of `8xy6` (SHR) and `8xyE` (SHL).
    pub shift_source: ShiftSource,
    /// Increment `I` by `x + 1` after `Fx55` and `Fx65`.
    pub load_store_increment: bool,
    /// What to do when an instruction word matches no opcode.
    pub unknown_opcode: UnknownOpcodePolicy,
    /// What to do when `Dxyn` reads sprite rows past the end of memory.
    pub sprite_overflow: SpriteOverflow,
}

impl Quirks {
    /// Behaviour of the COSMAC VIP interpreter.
    pub fn legacy() -> Self {
        Self {
            shift_source: ShiftSource::Vy,
            load_store_increment: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BorrowFlag {
    /// VF is 1 when the minuend is greater than or equal to the subtrahend.
    #[default]
    NoBorrow,
    /// VF is 1 only when the minuend is strictly greater than the subtrahend.
    StrictGreater,
}

impl BorrowFlag {
    /// Value of VF for `minuend - subtrahend`.
    #[inline]
    pub fn flag(self, minuend: u8, subtrahend: u8) -> u8 {
        match self {
            Self::NoBorrow => (minuend >= subtrahend) as u8,
            Self::StrictGreater => (minuend > subtrahend) as u8,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ShiftSource {
    /// Shift `Vx` in place. `Vy` is ignored.
    #[default]
    Vx,
    /// Shift `Vy` and store the result in `Vx`.
    Vy,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum UnknownOpcodePolicy {
    /// Report the error and halt the machine.
    #[default]
    Halt,
    /// Report the error, step over the instruction and remain runnable.
    Skip,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SpriteOverflow {
    /// Reading sprite data past the end of memory is a fatal error.
    #[default]
    Fault,
    /// Rows past the end of memory are not drawn.
    Clamp,
}

/// How the delay and sound timers are counted down.
///
/// In configuration files the variant is named by a `mode` field:
///
/// ```yaml
/// timer_mode:
///   mode: cycle_budget
///   cycles_per_frame: 9
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "mode", rename_all = "snake_case"))]
pub enum TimerMode {
    /// The host calls [`Chip8Vm::tick_timers`](crate::prelude::Chip8Vm::tick_timers) at 60 Hz.
    #[default]
    External,
    /// Timers are decremented once every `cycles_per_frame` executed steps.
    CycleBudget { cycles_per_frame: u32 },
}

impl TimerMode {
    /// Cycle accounting at the reference clock rate.
    pub fn cycle_budget() -> Self {
        Self::CycleBudget {
            cycles_per_frame: CYCLES_PER_FRAME,
        }
    }
}

/// CPU clock frequency, in hertz (per second)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Hz(pub u64);

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(NANOS_IN_SECOND / freq.0)
        }
    }
}

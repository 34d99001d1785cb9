//! Command line configuration file.
use std::{fs, path::Path};

use chip8::{prelude::Chip8Conf, KeyMap};
use serde::Deserialize;

use crate::error::CliError;

/// Number of steps to run when neither the config nor the arguments say.
pub const DEFAULT_STEPS: usize = 5_000;

/// Settings read from a YAML file.
///
/// ```yaml
/// steps: 10000
/// vm:
///   clock_frequency: 700
///   quirks:
///     shift_source: vy
///   timer_mode:
///     mode: cycle_budget
///     cycles_per_frame: 9
/// keymap:
///   x: 0
///   '1': 1
/// ```
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub vm: Chip8Conf,
    /// Replaces the default key layout when given.
    pub keymap: Option<KeyMap>,
    pub steps: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            vm: Chip8Conf::default(),
            keymap: None,
            steps: DEFAULT_STEPS,
        }
    }
}

impl CliConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CliError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, CliError> {
        Ok(serde_yaml::from_str(text)?)
    }
}

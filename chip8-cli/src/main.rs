//! Entrypoint for CLI
mod config;
mod error;

use std::{env, fs};

use chip8::{constants::*, prelude::*, IMPL_VERSION};
use log::{debug, error, info, warn};

use crate::{config::CliConfig, error::CliError};

static USAGE: &str = r#"
usage: chip8 CMD FILE [OPTIONS]

commands:
    run     Run the target ROM file
    dis     Disassemble the the target ROM into readable assembly

options (run):
    --config FILE   YAML file with VM, quirk and key map settings
    --steps N       Number of instructions to execute
    --keys CHARS    Host keys to hold down, translated through the key map
    --fast          Don't throttle to the clock frequency

examples:
    chip8 run breakout.rom
    chip8 run breakout.rom --keys qe --steps 20000
    chip8 dis breakout.rom
"#;

fn run_bytecode(args: RunArgs) -> Result<(), CliError> {
    let config = match &args.config {
        Some(path) => CliConfig::from_file(path)?,
        None => CliConfig::default(),
    };
    let steps = args.steps.unwrap_or(config.steps);
    let keymap = config.keymap.clone().unwrap_or_default();
    let timer_mode = config.vm.timer_mode;

    let mut vm = Chip8Vm::new(config.vm.clone());
    vm.load_file(&args.filepath)?;

    for c in args.keys.chars() {
        match keymap.map_key(c) {
            Some(key) => {
                debug!("holding {c:?} as {key}");
                vm.set_key(key, true);
            }
            None => warn!("no chip8 key mapped to {c:?}"),
        }
    }

    let mut cpu_clock = Clock::new(config.vm.clock_frequency());
    let mut timer_clock = Clock::new(Hz(DELAY_FREQUENCY));
    let mut frame_cycles = 0;

    info!("running {} for {steps} steps", args.filepath);

    for _ in 0..steps {
        if timer_mode == TimerMode::External {
            if args.fast {
                // Keep the reference ratio of steps to timer ticks.
                frame_cycles += 1;
                if frame_cycles >= CYCLES_PER_FRAME {
                    frame_cycles = 0;
                    vm.tick_timers();
                }
            } else if timer_clock.tick() {
                vm.tick_timers();
            }
        }

        if !args.fast {
            cpu_clock.wait();
        }

        match vm.step() {
            Ok(Flow::Halted) => break,
            Ok(_) => {}
            // Skipped opcode, already reported.
            Err(_) if !vm.is_halted() => {}
            Err(err) => {
                println!("{}", vm.dump_registers()?);
                return Err(err.into());
            }
        }
    }

    println!("{}", vm.dump_display()?);
    println!("{}", vm.dump_registers()?);
    if vm.is_waiting_for_key() {
        info!("program is waiting for a key press");
    }

    Ok(())
}

fn run_disassembler(filepath: &str) -> Result<(), CliError> {
    let bytecode = fs::read(filepath)?;

    let mut buf = String::new();
    Disassembler::new(bytecode.as_slice()).disassemble(&mut buf)?;
    print!("{buf}");

    Ok(())
}

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()
        .unwrap();

    let result = match parse_args(env::args().skip(1)) {
        Some(Cmd::Run(args)) => run_bytecode(args),
        Some(Cmd::Dis { filepath }) => run_disassembler(&filepath),
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    };

    if let Err(err) = result {
        error!("{err}");
        std::process::exit(1);
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Option<Cmd> {
    let cmd = args.next()?;
    let filepath = args.next()?;

    match cmd.as_str() {
        "run" => {
            let mut run = RunArgs {
                filepath,
                config: None,
                steps: None,
                keys: String::new(),
                fast: false,
            };

            while let Some(flag) = args.next() {
                match flag.as_str() {
                    "--config" => run.config = Some(args.next()?),
                    "--steps" => run.steps = Some(args.next()?.parse().ok()?),
                    "--keys" => run.keys = args.next()?,
                    "--fast" => run.fast = true,
                    _ => return None,
                }
            }

            Some(Cmd::Run(run))
        }
        "dis" => match args.next() {
            Some(_) => None,
            None => Some(Cmd::Dis { filepath }),
        },
        _ => None,
    }
}

fn print_usage() {
    println!("Chip8 v{IMPL_VERSION}");
    println!("{USAGE}");
}

enum Cmd {
    /// Run file
    Run(RunArgs),
    /// Disassemble
    Dis { filepath: String },
}

struct RunArgs {
    filepath: String,
    config: Option<String>,
    steps: Option<usize>,
    keys: String,
    fast: bool,
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(args: &[&str]) -> Option<Cmd> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_run() {
        let cmd = parse(&["run", "maze.rom", "--steps", "100", "--keys", "qe", "--fast"]);
        match cmd {
            Some(Cmd::Run(args)) => {
                assert_eq!(args.filepath, "maze.rom");
                assert_eq!(args.steps, Some(100));
                assert_eq!(args.keys, "qe");
                assert!(args.fast);
                assert!(args.config.is_none());
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_parse_usage_errors() {
        assert!(parse(&[]).is_none());
        assert!(parse(&["run"]).is_none());
        assert!(parse(&["run", "maze.rom", "--steps", "many"]).is_none());
        assert!(parse(&["run", "maze.rom", "--config"]).is_none());
        assert!(parse(&["run", "maze.rom", "--bogus"]).is_none());
        assert!(parse(&["dis", "maze.rom", "extra"]).is_none());
        assert!(parse(&["asm", "maze.asm"]).is_none());
    }

    #[test]
    fn test_parse_dis() {
        assert!(matches!(
            parse(&["dis", "maze.rom"]),
            Some(Cmd::Dis { filepath }) if filepath == "maze.rom"
        ));
    }
}

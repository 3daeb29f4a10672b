//! Z80 program runner.
//!
//! Usage: z80-runner <image> [--load ADDR] [--entry ADDR] [--sp ADDR]
//!        [--budget T] [--cpm] [--step] [--frequency HZ]
//!
//! Set `RUST_LOG=trace` to log every instruction.

use std::io::{self, BufRead, Stdout};
use std::process;

use clap::Parser;
use emu_core::MasterClock;
use z80_runner::{describe_registers, Boundary, RunnerConfig, Session, StepController};

fn main() {
    env_logger::init();
    let config = RunnerConfig::parse();

    let session = match Session::from_config(&config, io::stdout()) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Load error: {e}");
            process::exit(1);
        }
    };

    if config.step {
        run_interactive(session, &config);
    } else {
        run_to_completion(session, &config);
    }
}

fn run_to_completion(mut session: Session<Stdout>, config: &RunnerConfig) {
    let clock = MasterClock::new(config.frequency);
    match session.run(config.budget()) {
        Ok(outcome) => {
            eprintln!(
                "\n{} after {} ({:.3?} at {} Hz)",
                outcome.stop,
                outcome.ticks,
                clock.duration_of(outcome.ticks),
                config.frequency,
            );
        }
        Err(e) => {
            eprintln!("\nRun error: {e}");
            eprintln!("{}", describe_registers(session.machine().cpu().regs()));
            process::exit(1);
        }
    }
}

fn run_interactive(session: Session<Stdout>, config: &RunnerConfig) {
    let controller = StepController::spawn(session, config.budget());
    let show_registers = || {
        let line = controller.inspect(|s| describe_registers(s.machine().cpu().regs()));
        eprintln!("{line}");
    };
    show_registers();

    for line in io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        let report = match line.trim() {
            "s" | "" => controller.step(),
            "c" => controller.resume(),
            "r" => {
                show_registers();
                continue;
            }
            "q" => break,
            other => {
                eprintln!("unknown command {other:?} (s, c, r, q)");
                continue;
            }
        };
        match report {
            Ok(Boundary { pc, ticks, stop }) => {
                eprintln!("{pc:04X}  {ticks}");
                if let Some(stop) = stop {
                    eprintln!("{stop}");
                }
            }
            Err(e) => eprintln!("{e}"),
        }
    }
}

//! A loaded program and the machine running it.

use std::fmt;
use std::fs;
use std::io::Write;

use emu_core::{Cpu, SimpleBus, Ticks};
use zilog_z80::{Machine, Registers, CF, HF, NF, PF, SF, ZF};

use crate::config::RunnerConfig;
use crate::cpm::{self, Bdos};
use crate::error::RunnerError;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// A HALT instruction completed.
    Halted,
    /// The program called BDOS function 0.
    Exited,
}

impl fmt::Display for Stop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Halted => f.write_str("HALT"),
            Self::Exited => f.write_str("CP/M exit"),
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub stop: Stop,
    pub ticks: Ticks,
}

/// Where an instruction boundary left the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub pc: u16,
    pub ticks: Ticks,
    pub stop: Option<Stop>,
}

/// A program image on a [`Machine`], with its console.
pub struct Session<W> {
    machine: Machine<SimpleBus>,
    cpm: bool,
    console: W,
    ticks: Ticks,
}

impl<W: Write> Session<W> {
    #[must_use]
    pub fn new(machine: Machine<SimpleBus>, cpm: bool, console: W) -> Self {
        Self {
            machine,
            cpm,
            console,
            ticks: Ticks::ZERO,
        }
    }

    /// Read the configured image from disk and load it.
    pub fn from_config(config: &RunnerConfig, console: W) -> Result<Self, RunnerError> {
        let image = fs::read(&config.image).map_err(|source| RunnerError::Image {
            path: config.image.clone(),
            source,
        })?;
        Self::from_image(config, &image, console)
    }

    /// Load `image` as `config` describes.
    pub fn from_image(config: &RunnerConfig, image: &[u8], console: W) -> Result<Self, RunnerError> {
        let load = config.load_address();
        if image.len() > 0x1_0000 - usize::from(load) {
            return Err(RunnerError::ImageTooLarge {
                len: image.len(),
                load,
            });
        }

        let mut bus = SimpleBus::new();
        if config.cpm {
            cpm::install(&mut bus);
        }
        bus.load(load, image);

        let mut machine = Machine::new(bus);
        let regs = machine.cpu_mut().regs_mut();
        regs.pc = config.entry_point();
        if config.cpm {
            regs.sp = cpm::STACK;
        } else if let Some(sp) = config.sp {
            regs.sp = sp;
        }
        log::info!(
            "loaded {} bytes at {load:04X}, entry {:04X}",
            image.len(),
            config.entry_point()
        );
        Ok(Self::new(machine, config.cpm, console))
    }

    #[must_use]
    pub const fn machine(&self) -> &Machine<SimpleBus> {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine<SimpleBus> {
        &mut self.machine
    }

    #[must_use]
    pub const fn console(&self) -> &W {
        &self.console
    }

    /// T-states run so far.
    #[must_use]
    pub const fn ticks(&self) -> Ticks {
        self.ticks
    }

    #[must_use]
    pub fn boundary(&self, stop: Option<Stop>) -> Boundary {
        Boundary {
            pc: self.machine.cpu().pc(),
            ticks: self.ticks,
            stop,
        }
    }

    /// Run one instruction, answering a BDOS call first if one is due.
    /// Returns the reason the program stopped, if it did.
    pub fn step(&mut self) -> Result<Option<Stop>, RunnerError> {
        let cpu = self.machine.cpu();
        if cpu.is_halted() {
            return Ok(Some(Stop::Halted));
        }
        if self.cpm && cpu.pc() == cpm::BDOS {
            let bdos = cpm::call(cpu.regs(), self.machine.bus(), &mut self.console)?;
            if bdos == Bdos::Exit {
                return Ok(Some(Stop::Exited));
            }
        }
        self.ticks += self.machine.step();
        Ok(self.machine.cpu().is_halted().then_some(Stop::Halted))
    }

    /// Run until the program stops or `budget` T-states have gone by.
    pub fn run(&mut self, budget: Ticks) -> Result<Outcome, RunnerError> {
        let start = self.ticks;
        loop {
            if let Some(stop) = self.step()? {
                let ticks = self.ticks - start;
                log::info!("{stop} at {:04X} after {ticks}", self.machine.cpu().pc());
                return Ok(Outcome { stop, ticks });
            }
            if self.ticks - start >= budget {
                return Err(RunnerError::BudgetExhausted {
                    budget,
                    pc: self.machine.cpu().pc(),
                });
            }
        }
    }
}

/// One-line register dump.
#[must_use]
pub fn describe_registers(regs: &Registers) -> String {
    let flags: String = [(SF, 'S'), (ZF, 'Z'), (HF, 'H'), (PF, 'P'), (NF, 'N'), (CF, 'C')]
        .iter()
        .map(|&(mask, name)| if regs.flag(mask) { name } else { '-' })
        .collect();
    format!(
        "PC={:04X} SP={:04X} AF={:04X} BC={:04X} DE={:04X} HL={:04X} IX={:04X} IY={:04X} I={:02X} R={:02X} [{flags}]{}",
        regs.pc,
        regs.sp,
        regs.af(),
        regs.bc(),
        regs.de(),
        regs.hl(),
        regs.ix,
        regs.iy,
        regs.i,
        regs.r,
        if regs.halted { " HALT" } else { "" },
    )
}

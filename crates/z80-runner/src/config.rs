//! Command-line configuration.

use std::path::PathBuf;

use clap::Parser;
use emu_core::Ticks;

use crate::cpm;

/// Run a raw Z80 program image until it halts.
#[derive(Debug, Clone, Parser)]
#[command(name = "z80-runner", version, about)]
pub struct RunnerConfig {
    /// Raw binary image.
    pub image: PathBuf,

    /// Address the image is loaded at. Ignored in CP/M mode.
    #[arg(long, default_value = "0", value_parser = parse_address)]
    pub load: u16,

    /// First instruction executed. Defaults to the load address.
    #[arg(long, value_parser = parse_address)]
    pub entry: Option<u16>,

    /// Initial stack pointer.
    #[arg(long, value_parser = parse_address)]
    pub sp: Option<u16>,

    /// T-states to run before giving up.
    #[arg(long, default_value_t = 10_000_000_000)]
    pub budget: u64,

    /// Load at 0x0100 and answer BDOS console calls at 0x0005.
    #[arg(long)]
    pub cpm: bool,

    /// Interactive stepping: s = step, c = continue, r = registers, q = quit.
    #[arg(long)]
    pub step: bool,

    /// Clock frequency in Hz, for reporting elapsed machine time.
    #[arg(long, default_value_t = 3_500_000)]
    pub frequency: u64,
}

impl RunnerConfig {
    /// Where the image goes in memory.
    #[must_use]
    pub const fn load_address(&self) -> u16 {
        if self.cpm { cpm::TPA } else { self.load }
    }

    #[must_use]
    pub fn entry_point(&self) -> u16 {
        if self.cpm {
            cpm::TPA
        } else {
            self.entry.unwrap_or(self.load)
        }
    }

    #[must_use]
    pub const fn budget(&self) -> Ticks {
        Ticks::new(self.budget)
    }
}

/// Accepts `0x1234`, `$1234` or decimal.
fn parse_address(text: &str) -> Result<u16, String> {
    let hex = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix('$'));
    let parsed = match hex {
        Some(digits) => u16::from_str_radix(digits, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("invalid address {text:?}: {e}"))
}

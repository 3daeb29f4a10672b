//! Master clock configuration.

use std::time::Duration;

use crate::Ticks;

/// The crystal driving a CPU, for turning T-state counts into real time.
#[derive(Debug, Clone, Copy)]
pub struct MasterClock {
    /// Crystal frequency in Hz (e.g., `4_000_000` for a 4 MHz Z80).
    pub frequency_hz: u64,
}

impl MasterClock {
    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// Real time that `ticks` pulses of this clock would take.
    #[must_use]
    pub fn duration_of(&self, ticks: Ticks) -> Duration {
        if self.frequency_hz == 0 {
            return Duration::ZERO;
        }
        let nanos = u128::from(ticks.get()) * 1_000_000_000 / u128::from(self.frequency_hz);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

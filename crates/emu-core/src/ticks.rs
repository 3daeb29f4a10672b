//! The fundamental unit of time in the emulator.

use std::fmt;

/// A count of clock pulses (T-states for a Z80).
///
/// Monotonic: nothing in the emulator ever winds it backwards, so the
/// difference of two readings is the exact cost of whatever ran between
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ticks(pub u64);

impl Ticks {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self(count)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Count one more pulse.
    pub fn increment(&mut self) {
        self.0 += 1;
    }
}

impl fmt::Display for Ticks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}T", self.0)
    }
}

impl core::ops::Add for Ticks {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl core::ops::AddAssign for Ticks {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl core::ops::Sub for Ticks {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtraction_saturates() {
        assert_eq!(Ticks::new(3) - Ticks::new(10), Ticks::ZERO);
        assert_eq!(Ticks::new(10) - Ticks::new(3), Ticks::new(7));
    }

    #[test]
    fn displays_with_unit() {
        let mut t = Ticks::new(16);
        t.increment();
        assert_eq!(t.to_string(), "17T");
    }
}

//! Register exchanges: EX AF,AF', EX DE,HL and EXX.

use std::fmt;

use crate::state::State;

use super::immediate;

/// Which registers trade places.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    /// `EX AF,AF'`
    AfAlternate,
    /// `EX DE,HL`
    DeHl,
    /// `EXX`: BC, DE and HL with their alternates.
    All,
}

/// A zero-cycle register swap.
#[derive(Debug, Clone)]
pub struct Exchange {
    kind: ExchangeKind,
    done: bool,
}

impl Exchange {
    #[must_use]
    pub fn new(kind: ExchangeKind) -> Self {
        Self { kind, done: false }
    }

    fn apply(&self, state: &mut State) {
        match self.kind {
            ExchangeKind::AfAlternate => state.regs.exchange_af(),
            ExchangeKind::DeHl => state.regs.exchange_de_hl(),
            ExchangeKind::All => state.regs.exchange_all(),
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self.kind {
            ExchangeKind::AfAlternate => "EX AF,AF'",
            ExchangeKind::DeHl => "EX DE,HL",
            ExchangeKind::All => "EXX",
        })
    }
}

immediate!(Exchange);

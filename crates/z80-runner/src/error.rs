//! Runner errors.

use std::fmt;
use std::io;
use std::path::PathBuf;

use emu_core::Ticks;

#[derive(Debug)]
pub enum RunnerError {
    /// The image file could not be read.
    Image { path: PathBuf, source: io::Error },
    /// Writing program output failed.
    Console(io::Error),
    /// The image runs past the top of memory.
    ImageTooLarge { len: usize, load: u16 },
    /// The program neither halted nor exited within its budget.
    BudgetExhausted { budget: Ticks, pc: u16 },
    /// The execution thread is gone.
    Stopped,
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image { path, source } => {
                write!(f, "cannot read {}: {source}", path.display())
            }
            Self::Console(source) => write!(f, "console output failed: {source}"),
            Self::ImageTooLarge { len, load } => write!(
                f,
                "image of {len} bytes does not fit at {load:04X} ({} bytes free)",
                0x1_0000 - usize::from(*load),
            ),
            Self::BudgetExhausted { budget, pc } => {
                write!(f, "still running after {budget} (PC={pc:04X})")
            }
            Self::Stopped => f.write_str("execution thread has stopped"),
        }
    }
}

impl std::error::Error for RunnerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Image { source, .. } | Self::Console(source) => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for RunnerError {
    fn from(source: io::Error) -> Self {
        Self::Console(source)
    }
}

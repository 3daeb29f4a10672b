//! Host for running Z80 programs: image loading, a budgeted run loop, a
//! CP/M console trap and a threaded step controller.

mod config;
pub mod cpm;
mod error;
mod session;
mod step;

pub use config::RunnerConfig;
pub use error::RunnerError;
pub use session::{describe_registers, Boundary, Outcome, Session, Stop};
pub use step::StepController;

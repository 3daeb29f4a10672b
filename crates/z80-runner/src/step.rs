//! Interactive stepping with the machine on its own execution thread.
//!
//! The session sits behind one mutex. The execution thread holds it while
//! clocking; the front end takes it only to read state. Two channels carry
//! the handshake: one permits the next instruction (or a run), the other
//! reports the instruction boundary reached.

use std::io::Write;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use emu_core::Ticks;

use crate::error::RunnerError;
use crate::session::{Boundary, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Permit {
    Step,
    Continue,
}

type Report = Result<Boundary, RunnerError>;

pub struct StepController<W> {
    session: Arc<Mutex<Session<W>>>,
    permits: Option<Sender<Permit>>,
    boundaries: Receiver<Report>,
    worker: Option<JoinHandle<()>>,
}

impl<W: Write + Send + 'static> StepController<W> {
    /// Start the execution thread. It waits for the first permit.
    #[must_use]
    pub fn spawn(session: Session<W>, budget: Ticks) -> Self {
        let session = Arc::new(Mutex::new(session));
        let (permit_tx, permit_rx) = mpsc::channel();
        let (boundary_tx, boundary_rx) = mpsc::channel();
        let shared = Arc::clone(&session);
        let worker = thread::spawn(move || execute(&shared, &permit_rx, &boundary_tx, budget));
        Self {
            session,
            permits: Some(permit_tx),
            boundaries: boundary_rx,
            worker: Some(worker),
        }
    }

    /// Run one instruction.
    pub fn step(&self) -> Result<Boundary, RunnerError> {
        self.request(Permit::Step)
    }

    /// Run until the program stops or the budget runs out.
    pub fn resume(&self) -> Result<Boundary, RunnerError> {
        self.request(Permit::Continue)
    }

    /// Look at the session between instructions.
    pub fn inspect<T>(&self, view: impl FnOnce(&Session<W>) -> T) -> T {
        view(&lock(&self.session))
    }

    fn request(&self, permit: Permit) -> Result<Boundary, RunnerError> {
        let permits = self.permits.as_ref().ok_or(RunnerError::Stopped)?;
        permits.send(permit).map_err(|_| RunnerError::Stopped)?;
        self.boundaries.recv().map_err(|_| RunnerError::Stopped)?
    }
}

impl<W> Drop for StepController<W> {
    fn drop(&mut self) {
        // Closing the permit channel ends the execution thread.
        self.permits = None;
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            log::error!("execution thread panicked");
        }
    }
}

fn lock<W>(session: &Mutex<Session<W>>) -> MutexGuard<'_, Session<W>> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

fn execute<W: Write>(
    session: &Mutex<Session<W>>,
    permits: &Receiver<Permit>,
    boundaries: &Sender<Report>,
    budget: Ticks,
) {
    for permit in permits {
        let report = match permit {
            Permit::Step => {
                let mut session = lock(session);
                session.step().map(|stop| session.boundary(stop))
            }
            Permit::Continue => run(session, budget),
        };
        if boundaries.send(report).is_err() {
            break;
        }
    }
    log::debug!("execution thread finished");
}

/// Like [`Session::run`], but releases the lock between instructions.
fn run<W: Write>(session: &Mutex<Session<W>>, budget: Ticks) -> Report {
    let start = lock(session).ticks();
    loop {
        let mut session = lock(session);
        if let Some(stop) = session.step()? {
            return Ok(session.boundary(Some(stop)));
        }
        if session.ticks() - start >= budget {
            let boundary = session.boundary(None);
            return Err(RunnerError::BudgetExhausted {
                budget,
                pc: boundary.pc,
            });
        }
    }
}

//! Instruction behaviours.
//!
//! Every instruction is a small state machine that runs after its opcode
//! fetch. The machines share one shape: a family-specific `stage` that says
//! what to do next, and a [`Step`] holding whichever sub-sequencer (machine
//! cycle, addressing-mode resolver, operand reader or writer) is currently
//! on the bus. Each pulse clocks the step, then `advance` makes every bit of
//! progress that needs no further pulse. Stages whose operands are already
//! available (registers, constants) therefore cost nothing, and an
//! instruction that needs no bus cycles at all completes inside
//! [`Behavior::start_execution`].

use std::fmt;

use crate::addressing::{Operand, Reader, Resolver, Writer};
use crate::cycle::MachineCycle;
use crate::state::State;

mod arithmetic;
mod bit;
mod block;
mod branch;
mod control;
mod exchange;
mod indexed;
mod io;
mod load;
mod stack;

pub use arithmetic::{AccumulatorOp, Add16, Adjust, Alu8, AluOp, IncDec16, IncDec8, WideOp};
pub use bit::{Bit, BitOp, Fill, Rotate, RotateDigit, Shift, ShiftDirection};
pub use block::{BlockCompare, BlockInput, BlockOutput, BlockTransfer, Direction};
pub use branch::{Call, Jump, JumpCondition, Return, ReturnKind};
pub(crate) use branch::push;
pub use control::{Control, ControlOp};
pub use exchange::{Exchange, ExchangeKind};
pub use indexed::IndexedBitGroup;
pub use io::{Input, Output, PortSource};
pub use load::{Load, LoadFlags};
pub use stack::{ExchangeStack, Pop, Push};

/// The lifecycle every instruction follows.
pub trait Behavior {
    /// Rearm for another execution.
    fn reset(&mut self);

    /// Called once, directly after the opcode fetch completes. Performs all
    /// work possible without another pulse.
    fn start_execution(&mut self, state: &mut State);

    /// Advance one T-state.
    ///
    /// # Panics
    ///
    /// Panics if the instruction has already completed.
    fn clock(&mut self, state: &mut State);

    fn is_complete(&self) -> bool;

    /// Assembler text, for tracing and debuggers.
    fn mnemonic(&self) -> String;
}

/// The sub-sequencer an instruction is currently waiting on.
#[derive(Debug, Clone, Default)]
pub enum Step {
    #[default]
    Idle,
    Cycle(MachineCycle),
    Resolve(Resolver),
    Read(Reader),
    Write(Writer),
}

impl Step {
    /// True while the step still needs pulses.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        match self {
            Self::Idle => false,
            Self::Cycle(c) => !c.is_complete(),
            Self::Resolve(r) => !r.is_complete(),
            Self::Read(r) => !r.is_complete(),
            Self::Write(w) => !w.is_complete(),
        }
    }

    /// Clock whichever sequencer is active. Idle and finished steps ignore
    /// the pulse, which happens when an instruction completes on the same
    /// pulse as its final sub-sequencer.
    pub fn clock(&mut self, state: &mut State) {
        if !self.is_busy() {
            return;
        }
        match self {
            Self::Idle => {}
            Self::Cycle(c) => c.clock(state),
            Self::Resolve(r) => r.clock(state),
            Self::Read(r) => r.clock(state),
            Self::Write(w) => w.clock(state),
        }
    }

    /// Zero-cycle progress: lets register and constant operands finish
    /// without a pulse.
    pub fn settle(&mut self, state: &mut State) {
        match self {
            Self::Idle | Self::Cycle(_) => {}
            Self::Resolve(r) => r.advance(state),
            Self::Read(r) => r.advance(state),
            Self::Write(w) => w.advance(state),
        }
    }

    /// Start `step` and make its zero-cycle progress.
    pub fn begin(&mut self, step: Step, state: &mut State) {
        *self = step;
        self.settle(state);
    }

    /// The operand produced by a finished resolver.
    ///
    /// # Panics
    ///
    /// Panics if the step is not a finished resolver.
    #[must_use]
    pub fn operand(&self) -> Operand {
        match self {
            Self::Resolve(r) => r.operand(),
            other => panic!("no resolved operand in {other:?}"),
        }
    }

    /// The value produced by a finished reader or read cycle.
    ///
    /// # Panics
    ///
    /// Panics if the step produced no value.
    #[must_use]
    pub fn value(&self) -> u16 {
        match self {
            Self::Read(r) => r.value(),
            Self::Cycle(c) => c.value().into(),
            other => panic!("no value in {other:?}"),
        }
    }
}

/// Implements [`Behavior`] for a family struct with `stage` and `step`
/// fields, a `Start`/`Done` stage enum, an `advance` method and a
/// `Display` impl.
macro_rules! sequenced {
    ($family:ty, $stage:ident) => {
        impl $crate::instruction::Behavior for $family {
            fn reset(&mut self) {
                self.stage = $stage::Start;
                self.step = $crate::instruction::Step::Idle;
            }

            fn start_execution(&mut self, state: &mut $crate::state::State) {
                self.advance(state);
            }

            fn clock(&mut self, state: &mut $crate::state::State) {
                assert!(
                    !$crate::instruction::Behavior::is_complete(self),
                    "{self} clocked after completion"
                );
                self.step.clock(state);
                self.advance(state);
            }

            fn is_complete(&self) -> bool {
                self.stage == $stage::Done
            }

            fn mnemonic(&self) -> String {
                self.to_string()
            }
        }
    };
}

/// Implements [`Behavior`] for an instruction that does all its work in
/// `start_execution`. The family provides `fn apply(&self, &mut State)` and
/// a `done` flag.
macro_rules! immediate {
    ($family:ty) => {
        impl $crate::instruction::Behavior for $family {
            fn reset(&mut self) {
                self.done = false;
            }

            fn start_execution(&mut self, state: &mut $crate::state::State) {
                self.apply(state);
                self.done = true;
            }

            fn clock(&mut self, _state: &mut $crate::state::State) {
                panic!("{self} clocked after completion");
            }

            fn is_complete(&self) -> bool {
                self.done
            }

            fn mnemonic(&self) -> String {
                self.to_string()
            }
        }
    };
}

pub(crate) use immediate;
pub(crate) use sequenced;

/// A decoded instruction, ready to execute.
#[derive(Debug, Clone)]
pub enum Instruction {
    Load(Load),
    Alu8(Alu8),
    IncDec8(IncDec8),
    IncDec16(IncDec16),
    Add16(Add16),
    Accumulator(AccumulatorOp),
    Rotate(Rotate),
    Bit(Bit),
    RotateDigit(RotateDigit),
    BlockTransfer(BlockTransfer),
    BlockCompare(BlockCompare),
    BlockInput(BlockInput),
    BlockOutput(BlockOutput),
    Jump(Jump),
    Call(Call),
    Return(Return),
    Push(Push),
    Pop(Pop),
    ExchangeStack(ExchangeStack),
    Exchange(Exchange),
    Control(Control),
    Input(Input),
    Output(Output),
    IndexedBitGroup(IndexedBitGroup),
}

macro_rules! dispatch {
    ($self:ident, $inner:ident => $body:expr) => {
        match $self {
            Instruction::Load($inner) => $body,
            Instruction::Alu8($inner) => $body,
            Instruction::IncDec8($inner) => $body,
            Instruction::IncDec16($inner) => $body,
            Instruction::Add16($inner) => $body,
            Instruction::Accumulator($inner) => $body,
            Instruction::Rotate($inner) => $body,
            Instruction::Bit($inner) => $body,
            Instruction::RotateDigit($inner) => $body,
            Instruction::BlockTransfer($inner) => $body,
            Instruction::BlockCompare($inner) => $body,
            Instruction::BlockInput($inner) => $body,
            Instruction::BlockOutput($inner) => $body,
            Instruction::Jump($inner) => $body,
            Instruction::Call($inner) => $body,
            Instruction::Return($inner) => $body,
            Instruction::Push($inner) => $body,
            Instruction::Pop($inner) => $body,
            Instruction::ExchangeStack($inner) => $body,
            Instruction::Exchange($inner) => $body,
            Instruction::Control($inner) => $body,
            Instruction::Input($inner) => $body,
            Instruction::Output($inner) => $body,
            Instruction::IndexedBitGroup($inner) => $body,
        }
    };
}

impl Behavior for Instruction {
    fn reset(&mut self) {
        dispatch!(self, i => i.reset());
    }

    fn start_execution(&mut self, state: &mut State) {
        dispatch!(self, i => i.start_execution(state));
    }

    fn clock(&mut self, state: &mut State) {
        dispatch!(self, i => i.clock(state));
    }

    fn is_complete(&self) -> bool {
        dispatch!(self, i => i.is_complete())
    }

    fn mnemonic(&self) -> String {
        dispatch!(self, i => i.mnemonic())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, i => fmt::Display::fmt(i, f))
    }
}

macro_rules! instruction_from {
    ($($family:ident),* $(,)?) => {
        $(
            impl From<$family> for Instruction {
                fn from(inner: $family) -> Self {
                    Self::$family(inner)
                }
            }
        )*
    };
}

instruction_from!(
    Load,
    Alu8,
    IncDec8,
    IncDec16,
    Add16,
    Rotate,
    Bit,
    RotateDigit,
    BlockTransfer,
    BlockCompare,
    BlockInput,
    BlockOutput,
    Jump,
    Call,
    Return,
    Push,
    Pop,
    ExchangeStack,
    Exchange,
    Control,
    Input,
    Output,
    IndexedBitGroup,
);

impl From<AccumulatorOp> for Instruction {
    fn from(inner: AccumulatorOp) -> Self {
        Self::Accumulator(inner)
    }
}

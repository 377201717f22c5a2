//! Vehicle adapter boundary.
//!
//! Adapters receive fire-and-forget [`AdapterCommand`]s through a
//! [`CommandSink`]. Instead of inspecting the concrete adapter type, each
//! adapter registers handlers for the command kinds it understands in a
//! [`CommandRegistry`]; other kinds are ignored.
//!
//! [`LoopbackVehicle`] is a simulated adapter that executes orders
//! against the in-memory fleet and claim ledger.

mod command;
mod loopback;

pub use command::{AdapterCommand, CommandHandler, CommandKind, CommandRegistry, CommandSink};
pub use loopback::{AdapterError, LoopbackVehicle, StepOutcome, DIRECTION_ATTRIBUTE};

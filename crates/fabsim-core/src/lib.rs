//! A compact single-threaded discrete-event simulation engine.
//!
//! The engine owns the simulated clock and a time-ordered event queue.
//! Simulation components register an [`EventHandler`] and interact with the
//! engine through a [`SimulationContext`], which provides access to the
//! current time, the simulation-wide seeded random number generator and
//! event emission. Two events scheduled at the same simulated time are
//! executed in submission order, so runs are fully deterministic under a
//! fixed random seed.

#![warn(missing_docs)]

pub mod component;
pub mod context;
pub mod event;
pub mod handler;
pub mod log;
pub mod simulation;
mod state;

pub use colored;
pub use component::Id;
pub use context::SimulationContext;
pub use event::{Event, EventData, EventId};
pub use handler::EventHandler;
pub use simulation::Simulation;
pub use state::EPSILON;

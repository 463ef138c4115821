//! clipsgen - interactive CLIPS expert system generator
//!
//! The binary wires these modules together; they are public so the session
//! can be driven from integration tests with fake collaborators.

pub mod cli;
pub mod commands;
pub mod display;
pub mod interrupt;
pub mod logging;
pub mod progress;
pub mod session;
pub mod setup;

pub use session::{Session, SessionOptions, Stages, TurnOutcome, TurnState};

//! Core components for the QKD link simulation.
//!
//! This module contains the fundamental building blocks: the BB84 engine,
//! the session state machine, the signals exchanged with the scene,
//! configuration and error handling.

// BB84 protocol engine
pub mod quantum;

// Session management
pub mod session;

// Signals to and from the rendering side
pub mod signals;

// Simulation configuration
pub mod config;

// Simulation constants
pub mod constants;

// Error handling
pub mod error;

// Re-exports for convenience
pub use self::config::SimulationConfig;
pub use self::constants::VERSION;
pub use self::error::{Error, NarrativeError, Result};
pub use self::session::{ConnectionPhase, SessionController, SessionState};

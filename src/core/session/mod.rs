/*!
Session management for the QKD link.

This module provides the connection state machine, the renewal bookkeeping
and the state record they share.
*/

// State record and phases
pub mod state;

// Renewal counters
pub mod renewal;

// Lifecycle state machine
pub mod controller;

// Re-export main session types
pub use self::controller::{Operation, PendingRound, SessionController, Transition};
pub use self::renewal::{RenewalTracker, RenewalTrigger};
pub use self::state::{ConnectionPhase, EventKind, LastEvent, SessionState};

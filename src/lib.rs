/*!
# QKD Link

A BB84 quantum key distribution simulation for a vehicle-to-vehicle link,
with the connection lifecycle that wraps it.

## Overview

This library provides:

- A BB84 protocol engine: random bits and bases, an optional intercept-resend
  eavesdropper, basis sifting and an error-rate verdict
- Protected (QKD) and unprotected channel modes
- A session controller that establishes, monitors and renews the link, one
  round at a time, and reports visual side effects instead of drawing them
- A paced asynchronous driver for animated front ends
- Optional narrative analysis of the last event through an external text service
- Serializable snapshots and WebAssembly bindings for browser front ends

## Example

```
use qkd_link::{SessionBuilder, ConnectionPhase};

let mut session = SessionBuilder::new().instant().with_seed(7).build()?;
session.start_secure(true);
assert!(session.state().is_secure);
assert_eq!(session.state().connection_phase, ConnectionPhase::Monitoring);

session.auto_renew();
assert_eq!(session.state().key_renewal_count, 1);
# Ok::<(), qkd_link::Error>(())
```
*/

// Core simulation components
pub mod core;

// Session assembly and drivers
pub mod protocol;

// Narrative analysis of session events
pub mod narrative;

// Language bindings
pub mod bindings;

// Serialization support (optional)
#[cfg(feature = "serde-support")]
pub mod serde;

// Module aliases so paths such as `qkd_link::session` resolve
pub use crate::core::{config, constants, error, quantum, session, signals};

// Re-export commonly used types for convenience
pub use crate::core::config::SimulationConfig;
pub use crate::core::constants::{PHOTON_COUNT, SECURITY_THRESHOLD_PERCENT, VERSION};
pub use crate::core::error::{Error, NarrativeError, Result};
pub use crate::core::quantum::{
    run_round, Basis, PhotonSample, ProtectionMode, RandomSource, RngSource, RoundOutcome,
    RoundRequest,
};
pub use crate::core::session::{
    ConnectionPhase, EventKind, LastEvent, Operation, SessionController, SessionState, Transition,
};
pub use crate::core::signals::{BeamColor, IntersectionGate, VisualCommand, VisualSink};

// Re-export protocol builder
pub use crate::protocol::builder::SessionBuilder;
#[cfg(feature = "async")]
pub use crate::protocol::async_session::SharedSession;

// Re-export narrative entry points
pub use crate::narrative::{summarize, Narrator};
#[cfg(feature = "gemini")]
pub use crate::narrative::GeminiNarrator;

/*!
Session assembly and drivers.

The builder wires configuration and randomness into a controller; the async
session replays rounds with pacing for animated front ends.
*/

// Builder for session controllers
pub mod builder;

// Paced async driver
#[cfg(feature = "async")]
pub mod async_session;

pub use builder::SessionBuilder;

#[cfg(feature = "async")]
pub use async_session::SharedSession;

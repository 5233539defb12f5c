//! BB84 protocol engine.
//!
//! Photon types, the randomness seam and the round simulation itself.

pub mod engine;
pub mod photon;
pub mod random;

pub use engine::{
    run_round, run_round_observed, sift, PhotonStep, ProtectionMode, RoundOutcome, RoundRequest,
};
pub use photon::{Basis, ComparisonResult, PhotonSample};
pub use random::{RandomSource, RngSource};

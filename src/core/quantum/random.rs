/*!
Randomness seam for the protocol engine.

The engine never reaches for a global generator. Every draw goes through a
[`RandomSource`], so a seeded generator (or a scripted source in tests)
reproduces a round exactly.
*/

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::photon::Basis;

/// Source of the random draws a BB84 round needs
pub trait RandomSource {
    /// Uniform bit, 0 or 1
    fn random_bit(&mut self) -> u8;

    /// Uniform basis
    fn random_basis(&mut self) -> Basis;

    /// `true` with probability `p`.
    ///
    /// `p` is clamped to `[0, 1]`: anything above always hits, anything
    /// below (or NaN) never does.
    fn chance(&mut self, p: f64) -> bool;
}

/// [`RandomSource`] backed by any `rand` generator
#[derive(Debug, Clone)]
pub struct RngSource<R> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    /// Wrap an existing generator
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSource<StdRng> {
    /// Deterministic source for reproducible rounds
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Source seeded from the operating system
    pub fn from_os() -> Self {
        Self::new(StdRng::from_os_rng())
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn random_bit(&mut self) -> u8 {
        u8::from(self.rng.random_bool(0.5))
    }

    fn random_basis(&mut self) -> Basis {
        if self.rng.random_bool(0.5) {
            Basis::Diagonal
        } else {
            Basis::Rectilinear
        }
    }

    fn chance(&mut self, p: f64) -> bool {
        if p.is_nan() {
            return false;
        }
        self.rng.random_bool(p.clamp(0.0, 1.0))
    }
}

impl<S: RandomSource + ?Sized> RandomSource for &mut S {
    fn random_bit(&mut self) -> u8 {
        (**self).random_bit()
    }

    fn random_basis(&mut self) -> Basis {
        (**self).random_basis()
    }

    fn chance(&mut self, p: f64) -> bool {
        (**self).chance(p)
    }
}

impl<S: RandomSource + ?Sized> RandomSource for Box<S> {
    fn random_bit(&mut self) -> u8 {
        (**self).random_bit()
    }

    fn random_basis(&mut self) -> Basis {
        (**self).random_basis()
    }

    fn chance(&mut self, p: f64) -> bool {
        (**self).chance(p)
    }
}

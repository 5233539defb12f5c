/*!
Session builder for the QKD link.

This module provides a builder pattern for creating session controllers
with specific configurations and random sources.
*/

use std::time::Duration;

use rand::rngs::StdRng;

use crate::core::{
    config::SimulationConfig,
    error::Result,
    quantum::{RandomSource, RngSource},
    session::SessionController,
};

#[cfg(feature = "async")]
use crate::core::signals::VisualSink;
#[cfg(feature = "async")]
use crate::protocol::async_session::SharedSession;

/// Builder for session controllers
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder {
    /// Simulation configuration
    config: SimulationConfig,

    /// Seed for a reproducible random source
    seed: Option<u64>,
}

impl SessionBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a complete configuration
    pub fn with_config(mut self, config: SimulationConfig) -> Self {
        self.config = config;
        self
    }

    /// Exchange a different number of photons per round
    pub fn with_photon_count(mut self, photon_count: usize) -> Self {
        self.config.photon_count = photon_count;
        self
    }

    /// Use a different intersection cooldown
    pub fn with_intersection_cooldown(mut self, cooldown: Duration) -> Self {
        self.config.intersection_cooldown = cooldown;
        self
    }

    /// Drop all pacing
    pub fn instant(mut self) -> Self {
        let photon_count = self.config.photon_count;
        self.config = SimulationConfig::instant().with_photon_count(photon_count);
        self
    }

    /// Make every round reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build a controller backed by the standard generator
    pub fn build(self) -> Result<SessionController<RngSource<StdRng>>> {
        let source = match self.seed {
            Some(seed) => RngSource::seeded(seed),
            None => RngSource::from_os(),
        };
        SessionController::new(self.config, source)
    }

    /// Build a controller drawing from a custom random source
    pub fn build_with_source<S: RandomSource>(self, source: S) -> Result<SessionController<S>> {
        SessionController::new(self.config, source)
    }

    /// Build a shared, paced session driving `sink`
    #[cfg(feature = "async")]
    pub fn build_shared<V: VisualSink>(self, sink: V) -> Result<SharedSession<V>> {
        Ok(SharedSession::new(self.build()?, sink))
    }
}

/*!
Simulation configuration.

Pacing values only matter to the animated driver; the protocol outcome of a
round depends on nothing here except the photon count.
*/

use std::time::Duration;

use crate::core::constants::{defaults, MAX_PHOTON_COUNT, PHOTON_COUNT};
use crate::core::error::{ArgumentKind, Result};
use crate::{config_err, invalid_argument_err};

/// Longest pacing a single round may take
pub const MAX_ROUND_PACING: Duration = Duration::from_secs(3600);

/// Configuration for a simulated QKD link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Photons exchanged per round
    pub photon_count: usize,
    /// Delay between two transmitted photons
    pub photon_interval: Duration,
    /// Delay between the protocol stages of one round
    pub stage_interval: Duration,
    /// Green flash duration after a manual renewal
    pub renewal_flash: Duration,
    /// Green flash duration after an automatic renewal
    pub auto_renewal_flash: Duration,
    /// Minimum spacing between accepted beam-intersection signals
    pub intersection_cooldown: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::cinematic()
    }
}

impl SimulationConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Pacing used by the interactive scene
    pub fn cinematic() -> Self {
        Self {
            photon_count: PHOTON_COUNT,
            photon_interval: defaults::PHOTON_INTERVAL,
            stage_interval: defaults::STAGE_INTERVAL,
            renewal_flash: defaults::RENEWAL_FLASH,
            auto_renewal_flash: defaults::AUTO_RENEWAL_FLASH,
            intersection_cooldown: defaults::INTERSECTION_COOLDOWN,
        }
    }

    /// No pacing at all; rounds complete as fast as they can be computed
    pub fn instant() -> Self {
        Self {
            photon_count: PHOTON_COUNT,
            photon_interval: Duration::ZERO,
            stage_interval: Duration::ZERO,
            renewal_flash: Duration::ZERO,
            auto_renewal_flash: Duration::ZERO,
            intersection_cooldown: Duration::ZERO,
        }
    }

    /// Use a different photon count
    pub fn with_photon_count(mut self, photon_count: usize) -> Self {
        self.photon_count = photon_count;
        self
    }

    /// Use a different intersection cooldown
    pub fn with_intersection_cooldown(mut self, cooldown: Duration) -> Self {
        self.intersection_cooldown = cooldown;
        self
    }

    /// Total pacing spent on one round, flashes excluded
    pub fn round_pacing(&self) -> Duration {
        let photons = u32::try_from(self.photon_count).unwrap_or(u32::MAX);
        self.photon_interval
            .saturating_mul(photons)
            .saturating_add(self.stage_interval.saturating_mul(2))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.photon_count > MAX_PHOTON_COUNT {
            return invalid_argument_err!(
                "{} {} exceeds the maximum of {}",
                ArgumentKind::PhotonCount,
                self.photon_count,
                MAX_PHOTON_COUNT
            );
        }

        // Overflowing pacing saturates, so it fails here too.
        if self.round_pacing() > MAX_ROUND_PACING {
            return config_err!("{} of a round exceeds one hour", ArgumentKind::Duration);
        }

        Ok(())
    }
}

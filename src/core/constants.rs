/*!
Constants for the QKD link simulation.

This module contains the fixed policy values of the BB84 round, the pacing
defaults used by the animated driver, and the colour tokens sent to the
rendering side.
*/

/// Simulation version
pub const VERSION: u8 = 0x01;

/// Number of photons exchanged in a single round
pub const PHOTON_COUNT: usize = 40;

/// Upper bound accepted for a single round's photon count
pub const MAX_PHOTON_COUNT: usize = 1_000_000;

/// Probability that an active eavesdropper intercepts a given photon
pub const EAVESDROPPER_INTERCEPT_PROBABILITY: f64 = 0.7;

/// Highest error rate (percent) an unprotected channel may show and still be secure
pub const SECURITY_THRESHOLD_PERCENT: f64 = 10.0;

/// Raw error rate (percent) above which protected mode reports active correction
pub const RAW_INTERFERENCE_NOTICE_PERCENT: f64 = 5.0;

/// Pacing defaults for the animated driver
pub mod defaults {
    use std::time::Duration;

    /// Delay between two transmitted photons
    pub const PHOTON_INTERVAL: Duration = Duration::from_millis(20);

    /// Delay between the transmission, sifting and verification stages
    pub const STAGE_INTERVAL: Duration = Duration::from_millis(200);

    /// How long the renewal flash stays green after a manual renewal
    pub const RENEWAL_FLASH: Duration = Duration::from_millis(300);

    /// How long the renewal flash stays green after an automatic renewal
    pub const AUTO_RENEWAL_FLASH: Duration = Duration::from_millis(200);

    /// Minimum spacing between two accepted beam-intersection signals
    pub const INTERSECTION_COOLDOWN: Duration = Duration::from_secs(2);
}

/// Colour tokens understood by the rendering side
pub mod colors {
    /// Secure link
    pub const CYAN: &str = "#06b6d4";

    /// Unprotected link
    pub const ORANGE: &str = "#ff6600";

    /// Key renewal flash
    pub const GREEN: &str = "#00ff00";
}

/// Line written to the event log after a reset
pub const READY_MESSAGE: &str = "🎯 TACTICAL SYSTEMS READY - Awaiting orders.";

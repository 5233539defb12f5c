/*!
Session state for the QKD link.

This module defines the connection phases, the event descriptor handed to the
narrative service, and the flat state record the controller mutates.
*/

use std::fmt;

use crate::core::quantum::{ComparisonResult, PhotonSample, RoundOutcome};

/// Connection lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionPhase {
    /// No round in flight and no interference watch
    Idle,
    /// First key exchange in progress
    Establishing,
    /// Secure link under interference watch; intersections trigger renewal
    Monitoring,
    /// Key renewal in progress
    Renewing,
}

impl ConnectionPhase {
    /// Whether the phase only exists while a round is in flight
    pub fn is_transitional(&self) -> bool {
        matches!(self, ConnectionPhase::Establishing | ConnectionPhase::Renewing)
    }
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionPhase::Idle => write!(f, "idle"),
            ConnectionPhase::Establishing => write!(f, "establishing"),
            ConnectionPhase::Monitoring => write!(f, "monitoring"),
            ConnectionPhase::Renewing => write!(f, "renewing"),
        }
    }
}

/// Coarse classification of the last thing that happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Photons are being transmitted
    SendPhotons,
    /// Bases compared and key sifted
    Sifting,
    /// Interference found on the channel
    EavesdropperDetected,
    /// A usable key was established
    SecureKey,
}

impl EventKind {
    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::SendPhotons => "send_photons",
            EventKind::Sifting => "sifting",
            EventKind::EavesdropperDetected => "eavesdropper_detected",
            EventKind::SecureKey => "secure_key",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last event, as handed to the narrative service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastEvent {
    /// Classification
    pub kind: EventKind,
    /// Human-readable details
    pub details: String,
}

impl LastEvent {
    /// Create an event descriptor
    pub fn new(kind: EventKind, details: impl Into<String>) -> Self {
        Self {
            kind,
            details: details.into(),
        }
    }
}

/// Everything the controller knows about the link.
///
/// The round fields mirror the most recent [`RoundOutcome`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// Sender samples of the last round
    pub sender: Vec<PhotonSample>,
    /// Receiver samples of the last round
    pub receiver: Vec<PhotonSample>,
    /// Sifted sender samples of the last round
    pub sifted_sender: Vec<PhotonSample>,
    /// Sifted receiver samples of the last round
    pub sifted_receiver: Vec<PhotonSample>,
    /// Comparison results of the last round
    pub comparison: Vec<ComparisonResult>,
    /// Reported error rate of the last round, in percent
    pub error_rate: f64,
    /// Security verdict of the last round
    pub is_secure: bool,
    /// A round is in flight; every other operation is refused
    pub is_simulating: bool,
    /// A link has been established
    pub is_connected: bool,
    /// Current lifecycle phase
    pub connection_phase: ConnectionPhase,
    /// Renewals since the link was established
    pub key_renewal_count: u32,
    /// Last event for the narrative service
    pub last_event: Option<LastEvent>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Neutral snapshot: disconnected, idle, no round data
    pub fn new() -> Self {
        Self {
            sender: Vec::new(),
            receiver: Vec::new(),
            sifted_sender: Vec::new(),
            sifted_receiver: Vec::new(),
            comparison: Vec::new(),
            error_rate: 0.0,
            is_secure: false,
            is_simulating: false,
            is_connected: false,
            connection_phase: ConnectionPhase::Idle,
            key_renewal_count: 0,
            last_event: None,
        }
    }

    /// Check if a new link may be started
    pub fn can_start(&self) -> bool {
        !self.is_simulating
    }

    /// Check if a manual renewal is allowed
    pub fn can_renew(&self) -> bool {
        !self.is_simulating && self.is_connected
    }

    /// Check if an intersection-triggered renewal is allowed
    pub fn can_auto_renew(&self) -> bool {
        self.can_renew() && self.connection_phase != ConnectionPhase::Idle
    }

    /// Mark a round as in flight
    pub fn enter(&mut self, phase: ConnectionPhase) {
        debug_assert!(phase.is_transitional(), "{} is not a round phase", phase);
        self.is_simulating = true;
        self.connection_phase = phase;
    }

    /// Copy a round's results into the state
    pub fn merge_outcome(&mut self, outcome: RoundOutcome) {
        self.sender = outcome.sender;
        self.receiver = outcome.receiver;
        self.sifted_sender = outcome.sifted_sender;
        self.sifted_receiver = outcome.sifted_receiver;
        self.comparison = outcome.comparison;
        self.error_rate = outcome.error_rate;
        self.is_secure = outcome.is_secure;
    }

    /// Leave the in-flight state and settle into `phase`
    pub fn settle(&mut self, phase: ConnectionPhase) {
        debug_assert!(!phase.is_transitional(), "cannot settle in {}", phase);
        self.is_simulating = false;
        self.connection_phase = phase;
    }

    /// The receiver's sifted key bits
    pub fn sifted_key(&self) -> Vec<u8> {
        self.sifted_receiver.iter().map(|s| s.bit).collect()
    }
}

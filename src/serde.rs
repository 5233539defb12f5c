/*!
Serialization support for the QKD link.

This module provides serializable mirrors of the session types for external
consumers such as a browser front end. Field names follow the camelCase
convention those consumers expect. It's only built when the `serde-support`
feature is enabled.
*/

use serde::{Deserialize, Serialize};

use crate::core::{
    error::{Error, Result},
    quantum::{Basis, ComparisonResult, PhotonSample, RandomSource},
    session::{ConnectionPhase, EventKind, LastEvent, SessionController, SessionState, Transition},
    signals::{BeamColor, VisualCommand},
};

/// Serializable version of Basis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SerdeBasis {
    /// `+` basis
    #[serde(rename = "+")]
    Rectilinear,
    /// `x` basis
    #[serde(rename = "x")]
    Diagonal,
}

impl From<Basis> for SerdeBasis {
    fn from(basis: Basis) -> Self {
        match basis {
            Basis::Rectilinear => SerdeBasis::Rectilinear,
            Basis::Diagonal => SerdeBasis::Diagonal,
        }
    }
}

impl From<SerdeBasis> for Basis {
    fn from(basis: SerdeBasis) -> Self {
        match basis {
            SerdeBasis::Rectilinear => Basis::Rectilinear,
            SerdeBasis::Diagonal => Basis::Diagonal,
        }
    }
}

/// Serializable version of PhotonSample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerdePhotonSample {
    /// Bit value
    pub bit: u8,
    /// Basis used
    pub basis: SerdeBasis,
    /// Bit as first recorded
    pub original_bit: u8,
    /// Basis as first recorded
    pub original_basis: SerdeBasis,
    /// Basis agreement, once sifted
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub basis_match: Option<bool>,
}

impl From<PhotonSample> for SerdePhotonSample {
    fn from(sample: PhotonSample) -> Self {
        Self {
            bit: sample.bit,
            basis: sample.basis.into(),
            original_bit: sample.original_bit,
            original_basis: sample.original_basis.into(),
            basis_match: sample.basis_match,
        }
    }
}

impl From<SerdePhotonSample> for PhotonSample {
    fn from(sample: SerdePhotonSample) -> Self {
        Self {
            bit: sample.bit,
            basis: sample.basis.into(),
            original_bit: sample.original_bit,
            original_basis: sample.original_basis.into(),
            basis_match: sample.basis_match,
        }
    }
}

/// Serializable version of ConnectionPhase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerdeConnectionPhase {
    /// No round in flight
    Idle,
    /// Initial round in flight
    Establishing,
    /// Connected with interference present
    Monitoring,
    /// Renewal round in flight
    Renewing,
}

impl From<ConnectionPhase> for SerdeConnectionPhase {
    fn from(phase: ConnectionPhase) -> Self {
        match phase {
            ConnectionPhase::Idle => SerdeConnectionPhase::Idle,
            ConnectionPhase::Establishing => SerdeConnectionPhase::Establishing,
            ConnectionPhase::Monitoring => SerdeConnectionPhase::Monitoring,
            ConnectionPhase::Renewing => SerdeConnectionPhase::Renewing,
        }
    }
}

impl From<SerdeConnectionPhase> for ConnectionPhase {
    fn from(phase: SerdeConnectionPhase) -> Self {
        match phase {
            SerdeConnectionPhase::Idle => ConnectionPhase::Idle,
            SerdeConnectionPhase::Establishing => ConnectionPhase::Establishing,
            SerdeConnectionPhase::Monitoring => ConnectionPhase::Monitoring,
            SerdeConnectionPhase::Renewing => ConnectionPhase::Renewing,
        }
    }
}

/// Serializable version of EventKind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerdeEventKind {
    /// Round accepted, photons in flight
    SendPhotons,
    /// Unprotected round sifted without exceeding the threshold
    Sifting,
    /// Interference observed
    EavesdropperDetected,
    /// Clean protected key
    SecureKey,
}

impl From<EventKind> for SerdeEventKind {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::SendPhotons => SerdeEventKind::SendPhotons,
            EventKind::Sifting => SerdeEventKind::Sifting,
            EventKind::EavesdropperDetected => SerdeEventKind::EavesdropperDetected,
            EventKind::SecureKey => SerdeEventKind::SecureKey,
        }
    }
}

impl From<SerdeEventKind> for EventKind {
    fn from(kind: SerdeEventKind) -> Self {
        match kind {
            SerdeEventKind::SendPhotons => EventKind::SendPhotons,
            SerdeEventKind::Sifting => EventKind::Sifting,
            SerdeEventKind::EavesdropperDetected => EventKind::EavesdropperDetected,
            SerdeEventKind::SecureKey => EventKind::SecureKey,
        }
    }
}

/// Serializable version of LastEvent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerdeLastEvent {
    /// Classification
    #[serde(rename = "type")]
    pub kind: SerdeEventKind,
    /// Description
    pub details: String,
}

impl From<&LastEvent> for SerdeLastEvent {
    fn from(event: &LastEvent) -> Self {
        Self {
            kind: event.kind.into(),
            details: event.details.clone(),
        }
    }
}

impl From<SerdeLastEvent> for LastEvent {
    fn from(event: SerdeLastEvent) -> Self {
        LastEvent::new(event.kind.into(), event.details)
    }
}

/// Serializable version of SessionState
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerdeSessionState {
    /// Sender's photons from the last round
    pub sender: Vec<SerdePhotonSample>,
    /// Receiver's photons from the last round
    pub receiver: Vec<SerdePhotonSample>,
    /// Sender's sifted photons
    pub sifted_sender: Vec<SerdePhotonSample>,
    /// Receiver's sifted photons
    pub sifted_receiver: Vec<SerdePhotonSample>,
    /// Per-position agreement of the sifted keys
    pub comparison: Vec<bool>,
    /// Error rate in percent
    pub error_rate: f64,
    /// Security verdict
    pub is_secure: bool,
    /// Round in flight
    pub is_simulating: bool,
    /// Link established
    pub is_connected: bool,
    /// Lifecycle phase
    pub connection_phase: SerdeConnectionPhase,
    /// Completed renewals
    pub key_renewal_count: u32,
    /// Latest event for narration
    pub last_event: Option<SerdeLastEvent>,
}

fn samples(samples: &[PhotonSample]) -> Vec<SerdePhotonSample> {
    samples.iter().copied().map(Into::into).collect()
}

fn restore(samples: Vec<SerdePhotonSample>) -> Vec<PhotonSample> {
    samples.into_iter().map(Into::into).collect()
}

impl From<&SessionState> for SerdeSessionState {
    fn from(state: &SessionState) -> Self {
        Self {
            sender: samples(&state.sender),
            receiver: samples(&state.receiver),
            sifted_sender: samples(&state.sifted_sender),
            sifted_receiver: samples(&state.sifted_receiver),
            comparison: state.comparison.iter().map(|c| c.matched).collect(),
            error_rate: state.error_rate,
            is_secure: state.is_secure,
            is_simulating: state.is_simulating,
            is_connected: state.is_connected,
            connection_phase: state.connection_phase.into(),
            key_renewal_count: state.key_renewal_count,
            last_event: state.last_event.as_ref().map(Into::into),
        }
    }
}

impl From<SerdeSessionState> for SessionState {
    fn from(state: SerdeSessionState) -> Self {
        Self {
            sender: restore(state.sender),
            receiver: restore(state.receiver),
            sifted_sender: restore(state.sifted_sender),
            sifted_receiver: restore(state.sifted_receiver),
            comparison: state.comparison.into_iter().map(ComparisonResult::new).collect(),
            error_rate: state.error_rate,
            is_secure: state.is_secure,
            is_simulating: state.is_simulating,
            is_connected: state.is_connected,
            connection_phase: state.connection_phase.into(),
            key_renewal_count: state.key_renewal_count,
            last_event: state.last_event.map(Into::into),
        }
    }
}

/// Serializable version of VisualCommand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum SerdeVisualCommand {
    /// Show or hide the beam; colour token when recoloured
    Beam {
        /// Visibility
        visible: bool,
        /// Colour token such as `#06b6d4`
        #[serde(skip_serializing_if = "Option::is_none", default)]
        color: Option<String>,
    },
    /// Show or hide the hostile actor
    HostileActor {
        /// Visibility
        visible: bool,
    },
    /// Keep the current visuals for a while
    Hold {
        /// Milliseconds
        millis: u64,
    },
}

impl From<VisualCommand> for SerdeVisualCommand {
    fn from(command: VisualCommand) -> Self {
        match command {
            VisualCommand::Beam { visible, color } => SerdeVisualCommand::Beam {
                visible,
                color: color.map(|c: BeamColor| c.token().to_string()),
            },
            VisualCommand::HostileActor { visible } => SerdeVisualCommand::HostileActor { visible },
            VisualCommand::Hold(duration) => SerdeVisualCommand::Hold {
                millis: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            },
        }
    }
}

/// Serializable version of Transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerdeTransition {
    /// Whether the request was accepted
    pub accepted: bool,
    /// Visual commands in order
    pub effects: Vec<SerdeVisualCommand>,
}

impl From<&Transition> for SerdeTransition {
    fn from(transition: &Transition) -> Self {
        Self {
            accepted: transition.accepted,
            effects: transition.effects.iter().copied().map(Into::into).collect(),
        }
    }
}

/// Everything a front end needs to redraw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerdeSessionSnapshot {
    /// Session state
    pub state: SerdeSessionState,
    /// Event log, oldest first
    pub log: Vec<String>,
    /// Receiver's sifted key bits
    pub sifted_key: Vec<u8>,
    /// Manual renewals on the current link
    pub manual_renewals: u32,
    /// Intersection-triggered renewals on the current link
    pub automatic_renewals: u32,
}

impl SerdeSessionSnapshot {
    /// Capture a controller's current state
    pub fn capture<S: RandomSource>(controller: &SessionController<S>) -> Self {
        let state = controller.state();
        Self {
            state: state.into(),
            log: controller.log().to_vec(),
            sifted_key: state.sifted_key(),
            manual_renewals: controller.renewals().manual(),
            automatic_renewals: controller.renewals().automatic(),
        }
    }
}

/// Serializes a value to JSON
pub fn serialize_to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| Error::Internal(format!("JSON serialization error: {}", e)))
}

/// Deserializes a value from JSON
pub fn deserialize_from_json<T: for<'de> Deserialize<'de>>(json: &str) -> Result<T> {
    serde_json::from_str(json)
        .map_err(|e| Error::Internal(format!("JSON deserialization error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;

    #[test]
    fn test_state_json_uses_front_end_names() {
        let mut controller = SessionController::with_seed(SimulationConfig::instant(), 3).unwrap();
        controller.start_secure(true);

        let json = serialize_to_json(&SerdeSessionState::from(controller.state())).unwrap();
        assert!(json.contains("\"connectionPhase\":\"monitoring\""));
        assert!(json.contains("\"isConnected\":true"));
        assert!(json.contains("\"keyRenewalCount\":0"));
        assert!(json.contains("\"lastEvent\":{\"type\":"));
    }

    #[test]
    fn test_state_survives_json() {
        let mut controller = SessionController::with_seed(SimulationConfig::instant(), 8).unwrap();
        controller.start_unsafe(true);

        let json = serialize_to_json(&SerdeSessionState::from(controller.state())).unwrap();
        let restored: SerdeSessionState = deserialize_from_json(&json).unwrap();
        let mut restored = SessionState::from(restored);
        assert!((restored.error_rate - controller.state().error_rate).abs() < 1e-9);
        restored.error_rate = controller.state().error_rate;
        assert_eq!(&restored, controller.state());
    }

    #[test]
    fn test_effects_json() {
        let mut controller = SessionController::with_seed(SimulationConfig::default(), 1).unwrap();
        controller.start_secure(false);
        let transition = controller.renew(false);

        let json = serialize_to_json(&SerdeTransition::from(&transition)).unwrap();
        assert_eq!(
            json,
            r##"{"accepted":true,"effects":[{"command":"beam","visible":true,"color":"#00ff00"},{"command":"hold","millis":300},{"command":"beam","visible":true,"color":"#06b6d4"}]}"##
        );
    }

    #[test]
    fn test_snapshot_counts_renewals() {
        let mut controller = SessionController::with_seed(SimulationConfig::instant(), 4).unwrap();
        controller.start_secure(true);
        controller.renew(true);
        controller.auto_renew();

        let snapshot = SerdeSessionSnapshot::capture(&controller);
        assert_eq!(snapshot.manual_renewals, 1);
        assert_eq!(snapshot.automatic_renewals, 1);
        assert_eq!(snapshot.state.key_renewal_count, 2);
        assert_eq!(snapshot.sifted_key.len(), snapshot.state.sifted_receiver.len());
    }
}

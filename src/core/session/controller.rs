/*!
Session controller for the QKD link.

The controller owns the connection lifecycle and is the only writer of
[`SessionState`]. Every state-mutating operation is one round of the protocol
engine wrapped in three steps:

1. [`SessionController::begin`] checks the guard, marks the round in flight
   and enters the transitional phase;
2. [`SessionController::execute`] runs the engine exactly once and keeps the
   outcome inside the pending round;
3. [`SessionController::complete`] merges that outcome and settles the phase.

The synchronous operations (`start_secure`, `renew`, ...) run all three at
once. A paced driver may suspend between them; while a round is in flight
every other request is refused, so two rounds can never interleave. Starting
a round or resetting supersedes every round handed out before it.

Refused requests are not errors. They return a [`Transition`] with
`accepted == false` and leave state and log untouched.
*/

use std::fmt;

use rand::rngs::StdRng;

use crate::core::config::SimulationConfig;
use crate::core::constants::{RAW_INTERFERENCE_NOTICE_PERCENT, READY_MESSAGE, SECURITY_THRESHOLD_PERCENT};
use crate::core::error::Result;
use crate::invalid_state_err;
use crate::core::quantum::{
    run_round_observed, PhotonStep, ProtectionMode, RandomSource, RngSource, RoundOutcome,
    RoundRequest,
};
use crate::core::signals::{BeamColor, VisualCommand};

use super::renewal::{RenewalTracker, RenewalTrigger};
use super::state::{ConnectionPhase, EventKind, LastEvent, SessionState};

/// Requests the controller accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Establish a QKD-protected link
    StartSecure {
        /// Whether the eavesdropper is on the channel
        eavesdropper_active: bool,
    },
    /// Establish an unprotected link
    StartUnsafe {
        /// Whether the eavesdropper is on the channel
        eavesdropper_active: bool,
    },
    /// Operator-requested key renewal
    Renew {
        /// Whether the eavesdropper is on the channel
        eavesdropper_active: bool,
    },
    /// Renewal triggered by a beam intersection
    AutoRenew,
}

impl Operation {
    /// Phase held while the round is in flight
    pub fn transitional_phase(&self) -> ConnectionPhase {
        match self {
            Operation::StartSecure { .. } | Operation::StartUnsafe { .. } => {
                ConnectionPhase::Establishing
            }
            Operation::Renew { .. } | Operation::AutoRenew => ConnectionPhase::Renewing,
        }
    }

    /// Engine mode used for the round
    pub fn mode(&self) -> ProtectionMode {
        match self {
            Operation::StartUnsafe { .. } => ProtectionMode::Unprotected,
            _ => ProtectionMode::Protected,
        }
    }

    /// Whether the eavesdropper takes part in the round
    pub fn eavesdropper_active(&self) -> bool {
        match *self {
            Operation::StartSecure { eavesdropper_active }
            | Operation::StartUnsafe { eavesdropper_active }
            | Operation::Renew { eavesdropper_active } => eavesdropper_active,
            // An intersection means interference is present.
            Operation::AutoRenew => true,
        }
    }

    /// Renewal trigger, if this operation re-keys an existing link
    pub fn renewal_trigger(&self) -> Option<RenewalTrigger> {
        match self {
            Operation::Renew { .. } => Some(RenewalTrigger::Manual),
            Operation::AutoRenew => Some(RenewalTrigger::Intersection),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::StartSecure { .. } => write!(f, "start-secure"),
            Operation::StartUnsafe { .. } => write!(f, "start-unsafe"),
            Operation::Renew { .. } => write!(f, "renew"),
            Operation::AutoRenew => write!(f, "auto-renew"),
        }
    }
}

/// A round that has been accepted but not yet completed
#[derive(Debug)]
pub struct PendingRound {
    operation: Operation,
    request: RoundRequest,
    resume_phase: ConnectionPhase,
    epoch: u64,
    effects: Vec<VisualCommand>,
    outcome: Option<RoundOutcome>,
}

impl PendingRound {
    /// Operation being performed
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Engine request for the round
    pub fn request(&self) -> &RoundRequest {
        &self.request
    }

    /// Visual commands to apply when the round starts
    pub fn effects(&self) -> &[VisualCommand] {
        &self.effects
    }

    /// Controller epoch the round was accepted in
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether the engine has already run for this round
    pub fn is_executed(&self) -> bool {
        self.outcome.is_some()
    }

    /// Whether an outcome was produced for exactly this round's request
    fn fits(&self, outcome: &RoundOutcome) -> bool {
        outcome.mode == self.request.mode
            && outcome.eavesdropper_active == self.request.eavesdropper_active
            && outcome.photon_count() == self.request.photon_count
    }
}

/// What an operation did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// Whether the request was accepted
    pub accepted: bool,
    /// Visual commands for the rendering side, in order
    pub effects: Vec<VisualCommand>,
}

impl Transition {
    /// Request accepted with these side effects
    pub fn accepted(effects: Vec<VisualCommand>) -> Self {
        Self {
            accepted: true,
            effects,
        }
    }

    /// Request ignored
    pub fn rejected() -> Self {
        Self::default()
    }
}

/// Connection lifecycle state machine
#[derive(Debug)]
pub struct SessionController<S = RngSource<StdRng>> {
    /// Current session state
    state: SessionState,
    /// Human-readable event log, cleared only by reset
    log: Vec<String>,
    /// Renewal counters for the current link
    renewals: RenewalTracker,
    /// Simulation configuration
    config: SimulationConfig,
    /// Randomness for the engine
    source: S,
    /// Bumped on every round start and on reset; only the newest round may complete
    epoch: u64,
}

impl SessionController<RngSource<StdRng>> {
    /// Controller with a reproducible random source
    pub fn with_seed(config: SimulationConfig, seed: u64) -> Result<Self> {
        Self::new(config, RngSource::seeded(seed))
    }

    /// Controller seeded from the operating system
    pub fn from_os(config: SimulationConfig) -> Result<Self> {
        Self::new(config, RngSource::from_os())
    }
}

impl<S: RandomSource> SessionController<S> {
    /// Create a controller in the neutral idle state
    pub fn new(config: SimulationConfig, source: S) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            state: SessionState::new(),
            log: Vec::new(),
            renewals: RenewalTracker::new(),
            config,
            source,
            epoch: 0,
        })
    }

    /// Current state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Event log, oldest first
    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Renewal counters
    pub fn renewals(&self) -> &RenewalTracker {
        &self.renewals
    }

    /// Simulation configuration
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Whether a round is in flight
    pub fn is_busy(&self) -> bool {
        self.state.is_simulating
    }

    /// Whether nothing has superseded the round accepted in `epoch`
    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch
    }

    /// Establish a QKD-protected link
    pub fn start_secure(&mut self, eavesdropper_active: bool) -> Transition {
        self.perform(Operation::StartSecure {
            eavesdropper_active,
        })
    }

    /// Establish an unprotected link
    pub fn start_unsafe(&mut self, eavesdropper_active: bool) -> Transition {
        self.perform(Operation::StartUnsafe {
            eavesdropper_active,
        })
    }

    /// Renew the key of an established link
    pub fn renew(&mut self, eavesdropper_active: bool) -> Transition {
        self.perform(Operation::Renew {
            eavesdropper_active,
        })
    }

    /// React to a beam intersection by renewing under interference
    pub fn auto_renew(&mut self) -> Transition {
        self.perform(Operation::AutoRenew)
    }

    /// Run an operation to completion
    pub fn perform(&mut self, operation: Operation) -> Transition {
        let Some(mut pending) = self.begin(operation) else {
            return Transition::rejected();
        };

        if let Err(err) = self.execute(&mut pending, |_| {}) {
            log::warn!("{} round failed: {}", operation, err);
            self.abort(pending);
            return Transition::rejected();
        }

        let mut effects = std::mem::take(&mut pending.effects);
        let settled = self.complete(pending);
        if !settled.accepted {
            return settled;
        }
        effects.extend(settled.effects);
        Transition::accepted(effects)
    }

    /// Drop every trace of the current link
    pub fn reset(&mut self) -> Transition {
        self.epoch = self.epoch.wrapping_add(1);
        self.state = SessionState::new();
        self.renewals.reset();
        self.log.clear();
        self.record(READY_MESSAGE);

        log::info!("Session reset");
        Transition::accepted(vec![
            VisualCommand::beam_off(),
            VisualCommand::HostileActor { visible: false },
        ])
    }

    /// Accept an operation and mark its round as in flight.
    ///
    /// Returns `None` when the guard refuses the request.
    pub fn begin(&mut self, operation: Operation) -> Option<PendingRound> {
        let allowed = match operation {
            Operation::StartSecure { .. } | Operation::StartUnsafe { .. } => {
                self.state.can_start()
            }
            Operation::Renew { .. } => self.state.can_renew(),
            Operation::AutoRenew => self.state.can_auto_renew(),
        };
        if !allowed {
            log::debug!(
                "Ignoring {} (simulating: {}, connected: {}, phase: {})",
                operation,
                self.state.is_simulating,
                self.state.is_connected,
                self.state.connection_phase
            );
            return None;
        }

        self.epoch = self.epoch.wrapping_add(1);
        let resume_phase = self.state.connection_phase;
        let request = RoundRequest::new(
            operation.eavesdropper_active(),
            operation.mode(),
            self.config.photon_count,
        );

        self.state.enter(operation.transitional_phase());
        if let Some(trigger) = operation.renewal_trigger() {
            self.renewals.begin(trigger);
        }
        log::info!("{} accepted, entering {}", operation, self.state.connection_phase);

        let mut effects = Vec::new();
        match operation {
            Operation::StartSecure {
                eavesdropper_active,
            } => {
                effects.push(VisualCommand::Beam {
                    visible: true,
                    color: None,
                });
                effects.push(VisualCommand::HostileActor {
                    visible: eavesdropper_active,
                });
            }
            Operation::StartUnsafe {
                eavesdropper_active,
            } => {
                effects.push(VisualCommand::beam(BeamColor::Orange));
                effects.push(VisualCommand::HostileActor {
                    visible: eavesdropper_active,
                });
                self.record("⚠️ ESTABLISHING UNPROTECTED COMMUNICATION...");
                self.record("🚨 WARNING: NO QUANTUM PROTECTION ACTIVE!");
            }
            Operation::Renew { .. } => self.record("🔄 MANUAL KEY RENEWAL INITIATED..."),
            Operation::AutoRenew => {
                self.record("⚠️ BEAM INTERSECTION DETECTED! Auto-renewing keys...")
            }
        }

        let renewal_marker = if operation.renewal_trigger().is_some() {
            " [KEY RENEWAL]"
        } else {
            ""
        };
        self.record(format!(
            "🎯 INITIATING {} PROTOCOL{}...",
            request.mode, renewal_marker
        ));
        self.record("📡 TANK Alpha transmitting quantum photons...");
        if request.eavesdropper_active {
            self.record("🚨 WARNING: HOSTILE DRONE INTERCEPTING CHANNEL!");
        }

        let interference = if request.eavesdropper_active {
            ", eavesdropper on the channel"
        } else {
            ""
        };
        let transmission = format!(
            "{} photons in {} mode{}",
            request.photon_count, request.mode, interference
        );
        let detail = match operation.renewal_trigger() {
            Some(trigger) => format!(
                "Key renewal #{} ({}): transmitting {}.",
                self.renewals.next_number(),
                trigger,
                transmission
            ),
            None => format!("Transmitting {}.", transmission),
        };
        self.state.last_event = Some(LastEvent::new(EventKind::SendPhotons, detail));

        Some(PendingRound {
            operation,
            request,
            resume_phase,
            epoch: self.epoch,
            effects,
            outcome: None,
        })
    }

    /// Run the engine for an accepted round.
    ///
    /// The outcome stays in `pending` until [`SessionController::complete`]
    /// merges it. A round runs at most once; superseded rounds do not run.
    pub fn execute<F>(&mut self, pending: &mut PendingRound, observer: F) -> Result<()>
    where
        F: FnMut(PhotonStep),
    {
        if pending.is_executed() {
            return invalid_state_err!("unexecuted round", "executed round");
        }
        if !self.is_current(pending.epoch) {
            return invalid_state_err!("current round", "superseded round");
        }

        let outcome = run_round_observed(&mut self.source, &pending.request, observer)?;
        pending.outcome = Some(outcome);
        Ok(())
    }

    /// Merge a round's outcome and settle into the resulting phase.
    ///
    /// A superseded round is discarded. A round without a matching outcome
    /// from [`SessionController::execute`] is released like
    /// [`SessionController::abort`] and merges nothing.
    pub fn complete(&mut self, mut pending: PendingRound) -> Transition {
        if !self.is_current(pending.epoch) || !self.state.is_simulating {
            log::debug!("Discarding stale {} round", pending.operation);
            return Transition::rejected();
        }

        let outcome = match pending.outcome.take() {
            Some(outcome) if pending.fits(&outcome) => outcome,
            Some(outcome) => {
                log::warn!(
                    "{} round got a {} outcome (eavesdropper: {}), releasing it",
                    pending.operation,
                    outcome.mode,
                    outcome.eavesdropper_active
                );
                self.abort(pending);
                return Transition::rejected();
            }
            None => {
                log::warn!("{} round completed before it ran, releasing it", pending.operation);
                self.abort(pending);
                return Transition::rejected();
            }
        };

        self.record_verification(&outcome);

        let sifted = outcome.sifted_len();
        let mut effects = Vec::new();
        let (settled, event) = match pending.operation {
            Operation::StartSecure {
                eavesdropper_active,
            } => {
                self.renewals.reset();
                self.state.is_connected = true;

                self.record("✅ QKD PROTECTION ACTIVE - Secure channel established!");
                if eavesdropper_active {
                    self.record("🛡️ Drone interference detected and neutralized by QKD!");
                    self.record("🟢 ALL KEYS REMAIN SECURE despite hostile intercept!");
                    self.record(
                        "👁️ Auto-renewal will trigger when red beam intersects green beam...",
                    );
                } else {
                    self.record("🔒 Secure communication established - Ready for operations!");
                }
                effects.push(VisualCommand::beam(BeamColor::Cyan));

                let phase = if eavesdropper_active {
                    ConnectionPhase::Monitoring
                } else {
                    ConnectionPhase::Idle
                };
                (phase, protected_event(&outcome, None))
            }
            Operation::StartUnsafe {
                eavesdropper_active,
            } => {
                self.renewals.reset();
                self.state.is_connected = true;

                if eavesdropper_active {
                    self.record("🚨 DRONE SUCCESSFULLY INTERCEPTED COMMUNICATIONS!");
                    self.record("🔴 Many keys corrupted - Communication compromised!");
                    self.record("❌ No protection against eavesdropping!");
                    self.record("🔄 Try QKD protection to secure communications!");
                } else {
                    self.record("✅ Communication established (but vulnerable)");
                    self.record("⚠️ No protection if attacker appears!");
                    self.record("💡 Consider using QKD protection for security!");
                }
                effects.push(VisualCommand::beam(BeamColor::Orange));

                let event = if outcome.is_secure {
                    LastEvent::new(
                        EventKind::Sifting,
                        format!(
                            "Unprotected channel: {} of {} bits retained after sifting, {:.1}% error rate.",
                            sifted,
                            outcome.photon_count(),
                            outcome.error_rate
                        ),
                    )
                } else {
                    LastEvent::new(
                        EventKind::EavesdropperDetected,
                        format!(
                            "Unprotected channel: {} of {} sifted bits corrupted ({:.1}% error rate), above the {:.0}% threshold.",
                            outcome.raw_errors, sifted, outcome.error_rate, SECURITY_THRESHOLD_PERCENT
                        ),
                    )
                };
                (ConnectionPhase::Idle, event)
            }
            Operation::Renew { .. } => {
                let number = self.renewals.complete();
                self.record(format!("✅ KEY RENEWAL #{} COMPLETE!", number));
                self.record("🟢 All keys remain secure - QKD protection maintained!");
                effects.push(VisualCommand::beam(BeamColor::Green));
                effects.push(VisualCommand::Hold(self.config.renewal_flash));
                effects.push(VisualCommand::beam(BeamColor::Cyan));

                // Manual renewal returns to the phase it interrupted.
                (pending.resume_phase, protected_event(&outcome, Some(number)))
            }
            Operation::AutoRenew => {
                let number = self.renewals.complete();
                self.record(format!(
                    "✅ AUTO-RENEWAL #{} COMPLETE - Keys refreshed!",
                    number
                ));
                self.record("🟢 All keys remain secure - QKD adapted to interference!");
                effects.push(VisualCommand::beam(BeamColor::Green));
                effects.push(VisualCommand::Hold(self.config.auto_renewal_flash));
                effects.push(VisualCommand::beam(BeamColor::Cyan));

                let event = LastEvent::new(
                    EventKind::EavesdropperDetected,
                    format!(
                        "Beam intersection detected; key renewal #{} completed with {:.1}% raw interference corrected by QKD ({} sifted bits).",
                        number, outcome.raw_error_rate, sifted
                    ),
                );
                (ConnectionPhase::Monitoring, event)
            }
        };

        self.state.key_renewal_count = self.renewals.total();
        self.state.merge_outcome(outcome);
        self.state.last_event = Some(event);
        self.state.settle(settled);

        log::info!(
            "{} complete, settled in {} (renewals: {})",
            pending.operation,
            settled,
            self.state.key_renewal_count
        );
        Transition::accepted(effects)
    }

    /// Give up an accepted round without merging anything
    pub fn abort(&mut self, pending: PendingRound) {
        if !self.is_current(pending.epoch) || !self.state.is_simulating {
            return;
        }
        self.renewals.abandon();
        self.state.settle(pending.resume_phase);
        log::warn!("{} round aborted, back to {}", pending.operation, pending.resume_phase);
    }

    /// Log the post-transmission stages of a round
    fn record_verification(&mut self, outcome: &RoundOutcome) {
        self.record("✅ APC Bravo received all transmissions.");
        self.record("🔄 Units coordinating basis verification...");
        self.record(format!(
            "🔐 Key sifting complete. {} bits retained.",
            outcome.sifted_len()
        ));
        self.record("🔍 Executing security verification...");

        log::debug!(
            "Round sifted {} of {} photons, {} raw errors, {} interceptions",
            outcome.sifted_len(),
            outcome.photon_count(),
            outcome.raw_errors,
            outcome.interceptions
        );

        match outcome.mode {
            ProtectionMode::Protected => {
                self.record(format!(
                    "📊 Raw interference detected: {:.1}%",
                    outcome.raw_error_rate
                ));
                if outcome.eavesdropper_active
                    && outcome.raw_error_rate > RAW_INTERFERENCE_NOTICE_PERCENT
                {
                    self.record("🛡️ QKD error correction activated - All keys secured!");
                    self.record("✅ Interference detected and compensated automatically!");
                }
            }
            ProtectionMode::Unprotected => {
                self.record(format!(
                    "📊 Communication compromised: {:.1}% corruption!",
                    outcome.error_rate
                ));
            }
        }
    }

    /// Append a line to the event log
    fn record(&mut self, line: impl Into<String>) {
        let line = line.into();
        log::info!(target: "qkd_link::events", "{}", line);
        self.log.push(line);
    }
}

/// Event descriptor for a protected round
fn protected_event(outcome: &RoundOutcome, renewal: Option<u32>) -> LastEvent {
    let prefix = match renewal {
        Some(number) => format!("Key renewal #{}: ", number),
        None => String::new(),
    };
    let sifted = outcome.sifted_len();

    if outcome.eavesdropper_active && outcome.raw_errors > 0 {
        LastEvent::new(
            EventKind::EavesdropperDetected,
            format!(
                "{}eavesdropper disturbed {} of {} sifted bits ({:.1}% raw error rate); error correction restored a secure {}-bit key.",
                prefix, outcome.raw_errors, sifted, outcome.raw_error_rate, sifted
            ),
        )
    } else {
        LastEvent::new(
            EventKind::SecureKey,
            format!(
                "{}secure {}-bit key established from {} photons with {:.1}% error rate.",
                prefix,
                sifted,
                outcome.photon_count(),
                outcome.error_rate
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Error;

    fn controller(seed: u64) -> SessionController {
        SessionController::with_seed(SimulationConfig::instant(), seed).unwrap()
    }

    #[test]
    fn test_start_secure_without_eavesdropper() {
        let mut session = controller(1);
        let transition = session.start_secure(false);

        assert!(transition.accepted);
        let state = session.state();
        assert!(state.is_connected);
        assert!(!state.is_simulating);
        assert!(state.is_secure);
        assert_eq!(state.connection_phase, ConnectionPhase::Idle);
        assert_eq!(state.key_renewal_count, 0);
        assert_eq!(state.error_rate, 0.0);
        assert_eq!(
            transition.effects,
            vec![
                VisualCommand::Beam {
                    visible: true,
                    color: None
                },
                VisualCommand::HostileActor { visible: false },
                VisualCommand::beam(BeamColor::Cyan),
            ]
        );
    }

    #[test]
    fn test_start_secure_with_eavesdropper_monitors() {
        let mut session = controller(2);
        session.start_secure(true);

        assert_eq!(session.state().connection_phase, ConnectionPhase::Monitoring);
        assert!(session.state().is_secure);
        assert!(session
            .log()
            .iter()
            .any(|line| line.contains("HOSTILE DRONE INTERCEPTING")));
    }

    #[test]
    fn test_begin_sets_guard_before_round() {
        let mut session = controller(3);
        let pending = session.begin(Operation::StartSecure {
            eavesdropper_active: true,
        });
        let mut pending = pending.expect("idle session accepts start");

        assert!(session.is_busy());
        assert_eq!(session.state().connection_phase, ConnectionPhase::Establishing);
        assert_eq!(
            session.state().last_event.as_ref().map(|e| e.kind),
            Some(EventKind::SendPhotons)
        );

        let snapshot = session.state().clone();
        let log_len = session.log().len();
        assert!(!session.start_unsafe(false).accepted);
        assert!(!session.renew(false).accepted);
        assert!(!session.auto_renew().accepted);
        assert_eq!(session.state(), &snapshot);
        assert_eq!(session.log().len(), log_len);

        session.execute(&mut pending, |_| {}).unwrap();
        assert!(session.complete(pending).accepted);
        assert!(!session.is_busy());
    }

    #[test]
    fn test_stale_round_is_discarded_after_reset() {
        let mut session = controller(4);
        let pending = session.begin(Operation::StartSecure {
            eavesdropper_active: false,
        });
        let mut pending = pending.unwrap();
        session.execute(&mut pending, |_| {}).unwrap();

        session.reset();
        let transition = session.complete(pending);

        assert!(!transition.accepted);
        assert_eq!(session.state(), &SessionState::new());
        assert_eq!(session.log(), &[READY_MESSAGE.to_string()]);
    }

    #[test]
    fn test_round_runs_only_once() {
        let mut session = controller(7);
        let mut pending = session
            .begin(Operation::StartSecure {
                eavesdropper_active: true,
            })
            .unwrap();

        let mut photons = 0;
        session.execute(&mut pending, |_| photons += 1).unwrap();
        let again = session.execute(&mut pending, |_| photons += 1);

        assert!(matches!(again, Err(Error::InvalidState { .. })));
        assert_eq!(photons, 40);
        assert!(session.complete(pending).accepted);
        assert_eq!(session.state().sender.len(), 40);
    }

    #[test]
    fn test_complete_without_execute_releases_round() {
        let mut session = controller(8);
        session.start_secure(true);
        let before = session.state().key_renewal_count;

        let pending = session
            .begin(Operation::Renew {
                eavesdropper_active: false,
            })
            .unwrap();
        let transition = session.complete(pending);

        assert!(!transition.accepted);
        assert!(transition.effects.is_empty());
        assert!(!session.is_busy());
        assert_eq!(session.state().connection_phase, ConnectionPhase::Monitoring);
        assert_eq!(session.state().key_renewal_count, before);
        assert!(session.renewals().in_progress().is_none());
        assert!(session.auto_renew().accepted);
    }

    #[test]
    fn test_complete_rejects_foreign_outcome() {
        let mut session = controller(9);
        let mut pending = session
            .begin(Operation::StartSecure {
                eavesdropper_active: false,
            })
            .unwrap();

        // An unprotected, intercepted outcome must not settle a secure start.
        let foreign = RoundRequest::new(true, ProtectionMode::Unprotected, 40);
        let outcome = run_round_observed(&mut RngSource::seeded(9), &foreign, |_| {}).unwrap();
        pending.outcome = Some(outcome);

        let log_len = session.log().len();
        assert!(!session.complete(pending).accepted);
        assert!(!session.is_busy());
        assert!(!session.state().is_connected);
        assert!(session.state().sender.is_empty());
        assert_eq!(session.log().len(), log_len);
    }

    #[test]
    fn test_newer_round_supersedes_older() {
        let mut session = controller(10);
        let mut first = session
            .begin(Operation::StartSecure {
                eavesdropper_active: false,
            })
            .unwrap();
        let first_epoch = first.epoch();
        session.execute(&mut first, |_| {}).unwrap();
        assert!(session.is_current(first_epoch));
        assert!(session.complete(first).accepted);

        let second = session
            .begin(Operation::Renew {
                eavesdropper_active: false,
            })
            .unwrap();
        assert!(!session.is_current(first_epoch));
        assert!(session.is_current(second.epoch()));
        session.abort(second);
    }

    #[test]
    fn test_renewal_send_event_is_numbered() {
        let mut session = controller(11);
        session.start_secure(false);
        session.renew(false);

        let pending = session
            .begin(Operation::Renew {
                eavesdropper_active: true,
            })
            .unwrap();
        let detail = &session.state().last_event.as_ref().unwrap().details;
        assert!(detail.starts_with("Key renewal #2 (manual): transmitting 40 photons"));
        session.abort(pending);
    }

    #[test]
    fn test_abort_restores_phase() {
        let mut session = controller(5);
        session.start_secure(true);
        let pending = session.begin(Operation::Renew {
            eavesdropper_active: false,
        });
        session.abort(pending.unwrap());

        assert!(!session.is_busy());
        assert_eq!(session.state().connection_phase, ConnectionPhase::Monitoring);
        assert_eq!(session.renewals().total(), 0);
    }

    #[test]
    fn test_renewal_effects_flash_green() {
        let mut session = controller(6);
        session.start_secure(false);
        let transition = session.renew(false);

        assert_eq!(
            transition.effects,
            vec![
                VisualCommand::beam(BeamColor::Green),
                VisualCommand::Hold(session.config().renewal_flash),
                VisualCommand::beam(BeamColor::Cyan),
            ]
        );
        assert_eq!(session.log().last().map(String::as_str), Some("🟢 All keys remain secure - QKD protection maintained!"));
    }

    #[test]
    fn test_operation_properties() {
        assert!(Operation::AutoRenew.eavesdropper_active());
        assert_eq!(Operation::AutoRenew.mode(), ProtectionMode::Protected);
        assert_eq!(
            Operation::StartUnsafe {
                eavesdropper_active: false
            }
            .mode(),
            ProtectionMode::Unprotected
        );
        assert_eq!(
            Operation::Renew {
                eavesdropper_active: false
            }
            .transitional_phase(),
            ConnectionPhase::Renewing
        );
        assert_eq!(Operation::AutoRenew.to_string(), "auto-renew");
    }
}

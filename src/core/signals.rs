/*!
Signals exchanged with the rendering side.

The session controller never touches the scene. It returns [`VisualCommand`]s
describing what the beam and the hostile drone should look like, and the
driver replays them into a [`VisualSink`]. In the other direction the scene
reports beam intersections, which an [`IntersectionGate`] may throttle before
they reach the controller.
*/

use std::fmt;
use std::time::Duration;

use crate::core::constants::colors;
use crate::core::quantum::PhotonStep;

/// Colour of the key-exchange beam
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeamColor {
    /// Secure link
    Cyan,
    /// Unprotected link
    Orange,
    /// Renewal flash
    Green,
}

impl BeamColor {
    /// Colour token understood by the scene
    pub fn token(&self) -> &'static str {
        match self {
            BeamColor::Cyan => colors::CYAN,
            BeamColor::Orange => colors::ORANGE,
            BeamColor::Green => colors::GREEN,
        }
    }
}

impl fmt::Display for BeamColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Side effect requested by the session controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualCommand {
    /// Show or hide the beam; `None` keeps the scene's current colour
    Beam {
        /// Whether the beam is drawn
        visible: bool,
        /// Colour to switch to
        color: Option<BeamColor>,
    },
    /// Show or hide the hostile drone
    HostileActor {
        /// Whether the drone is drawn
        visible: bool,
    },
    /// Keep the current look for a while before the next command
    Hold(Duration),
}

impl VisualCommand {
    /// Visible beam in the given colour
    pub fn beam(color: BeamColor) -> Self {
        VisualCommand::Beam {
            visible: true,
            color: Some(color),
        }
    }

    /// Hidden beam
    pub fn beam_off() -> Self {
        VisualCommand::Beam {
            visible: false,
            color: None,
        }
    }
}

/// Receiver of visual commands, implemented by the rendering side
pub trait VisualSink {
    /// Show or hide the beam
    fn set_beam_visible(&mut self, visible: bool, color: Option<BeamColor>);

    /// Show or hide the hostile drone
    fn set_hostile_actor_visible(&mut self, visible: bool);

    /// A photon crossed the channel during a paced round
    fn photon_in_flight(&mut self, _step: &PhotonStep) {}
}

/// Records commands instead of drawing them
impl VisualSink for Vec<VisualCommand> {
    fn set_beam_visible(&mut self, visible: bool, color: Option<BeamColor>) {
        self.push(VisualCommand::Beam { visible, color });
    }

    fn set_hostile_actor_visible(&mut self, visible: bool) {
        self.push(VisualCommand::HostileActor { visible });
    }
}

/// Replay commands into a sink without waiting on holds
pub fn apply_effects(effects: &[VisualCommand], sink: &mut dyn VisualSink) {
    for effect in effects {
        match *effect {
            VisualCommand::Beam { visible, color } => sink.set_beam_visible(visible, color),
            VisualCommand::HostileActor { visible } => sink.set_hostile_actor_visible(visible),
            VisualCommand::Hold(_) => {}
        }
    }
}

/// Throttle for beam-intersection signals.
///
/// The scene reports an intersection on every frame the beams overlap; the
/// gate lets one through per cooldown window. Timestamps are offsets from any
/// fixed origin of the caller's monotonic clock.
#[derive(Debug, Clone)]
pub struct IntersectionGate {
    cooldown: Duration,
    last_admitted: Option<Duration>,
}

impl IntersectionGate {
    /// Create a gate with the given cooldown
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_admitted: None,
        }
    }

    /// Whether a signal arriving at `now` should be forwarded
    pub fn admit(&mut self, now: Duration) -> bool {
        let open = match self.last_admitted {
            Some(last) => now.saturating_sub(last) > self.cooldown,
            None => true,
        };
        if open {
            self.last_admitted = Some(now);
        }
        open
    }

    /// Forget the last admitted signal
    pub fn reset(&mut self) {
        self.last_admitted = None;
    }

    /// Configured cooldown
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_effects_skips_holds() {
        let effects = [
            VisualCommand::beam(BeamColor::Green),
            VisualCommand::Hold(Duration::from_millis(300)),
            VisualCommand::beam(BeamColor::Cyan),
            VisualCommand::HostileActor { visible: false },
        ];
        let mut recorded: Vec<VisualCommand> = Vec::new();
        apply_effects(&effects, &mut recorded);

        assert_eq!(
            recorded,
            vec![
                VisualCommand::beam(BeamColor::Green),
                VisualCommand::beam(BeamColor::Cyan),
                VisualCommand::HostileActor { visible: false },
            ]
        );
    }

    #[test]
    fn test_color_tokens() {
        assert_eq!(BeamColor::Cyan.token(), "#06b6d4");
        assert_eq!(BeamColor::Orange.to_string(), "#ff6600");
        assert_eq!(BeamColor::Green.token(), "#00ff00");
    }

    #[test]
    fn test_gate_cooldown() {
        let start = Duration::from_secs(100);
        let mut gate = IntersectionGate::new(Duration::from_secs(2));

        assert!(gate.admit(start));
        assert!(!gate.admit(start + Duration::from_millis(500)));
        assert!(!gate.admit(start + Duration::from_secs(2)));
        assert!(gate.admit(start + Duration::from_millis(2001)));
        assert!(!gate.admit(start + Duration::from_millis(2500)));

        gate.reset();
        assert!(gate.admit(start + Duration::from_millis(2600)));
    }
}

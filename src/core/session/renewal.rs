/*!
Key renewal bookkeeping.

Tracks how often the current link has been re-keyed and why, so the
controller can number renewals in its log and reset the count whenever a new
link is established.
*/

use std::fmt;

/// What caused a renewal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalTrigger {
    /// Requested by the operator
    Manual,
    /// Beam intersection reported by the scene
    Intersection,
}

impl fmt::Display for RenewalTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenewalTrigger::Manual => write!(f, "manual"),
            RenewalTrigger::Intersection => write!(f, "intersection"),
        }
    }
}

/// Renewal counters for the current link
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenewalTracker {
    /// Completed manual renewals
    manual: u32,
    /// Completed intersection-triggered renewals
    automatic: u32,
    /// Renewal currently in flight
    in_progress: Option<RenewalTrigger>,
}

impl RenewalTracker {
    /// Create a tracker with no renewals
    pub fn new() -> Self {
        Self::default()
    }

    /// Total completed renewals
    pub fn total(&self) -> u32 {
        self.manual + self.automatic
    }

    /// Completed manual renewals
    pub fn manual(&self) -> u32 {
        self.manual
    }

    /// Completed intersection-triggered renewals
    pub fn automatic(&self) -> u32 {
        self.automatic
    }

    /// Renewal currently in flight
    pub fn in_progress(&self) -> Option<RenewalTrigger> {
        self.in_progress
    }

    /// Number the next renewal will carry
    pub fn next_number(&self) -> u32 {
        self.total() + 1
    }

    /// Mark a renewal as in progress
    pub fn begin(&mut self, trigger: RenewalTrigger) {
        self.in_progress = Some(trigger);
    }

    /// Mark the in-flight renewal as complete and return its number
    pub fn complete(&mut self) -> u32 {
        match self.in_progress.take() {
            Some(RenewalTrigger::Manual) => self.manual += 1,
            Some(RenewalTrigger::Intersection) => self.automatic += 1,
            None => {}
        }
        self.total()
    }

    /// Drop an in-flight renewal without counting it
    pub fn abandon(&mut self) {
        self.in_progress = None;
    }

    /// Start counting from zero for a new link
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/*!
BB84 protocol engine.

One call to [`run_round`] simulates a complete exchange: the sender prepares
random bits in random bases, an optional eavesdropper measures a share of the
photons in a basis of its own, the receiver measures every photon in a random
basis, both sides sift on basis agreement and the sifted keys are compared.

The engine is pure. All randomness comes from the supplied [`RandomSource`]
and nothing is logged or slept; pacing is the driver's business.
*/

use std::fmt;

use crate::core::constants::{
    EAVESDROPPER_INTERCEPT_PROBABILITY, MAX_PHOTON_COUNT, SECURITY_THRESHOLD_PERCENT,
};
use crate::core::error::{ArgumentKind, Result};
use crate::invalid_argument_err;

use super::photon::{ComparisonResult, PhotonSample};
use super::random::RandomSource;

/// Whether the round models full QKD post-processing or a bare channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionMode {
    /// Error correction and privacy amplification repair every sifted bit
    Protected,
    /// Raw transmission; interference shows up as key corruption
    Unprotected,
}

impl ProtectionMode {
    /// Map the protected/unprotected toggle to a mode
    pub fn from_protected(protected: bool) -> Self {
        if protected {
            ProtectionMode::Protected
        } else {
            ProtectionMode::Unprotected
        }
    }

    /// Whether this is the protected mode
    pub fn is_protected(&self) -> bool {
        matches!(self, ProtectionMode::Protected)
    }
}

impl fmt::Display for ProtectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtectionMode::Protected => write!(f, "QKD PROTECTED"),
            ProtectionMode::Unprotected => write!(f, "UNPROTECTED"),
        }
    }
}

/// Parameters of one round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundRequest {
    /// Whether the eavesdropper is on the channel
    pub eavesdropper_active: bool,
    /// Post-processing mode
    pub mode: ProtectionMode,
    /// Photons to exchange
    pub photon_count: usize,
}

impl RoundRequest {
    /// Create a round request
    pub fn new(eavesdropper_active: bool, mode: ProtectionMode, photon_count: usize) -> Self {
        Self {
            eavesdropper_active,
            mode,
            photon_count,
        }
    }
}

/// One photon as it crossed the channel, reported to round observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotonStep {
    /// Position in the round
    pub index: usize,
    /// What the sender prepared
    pub sender: PhotonSample,
    /// What the receiver measured
    pub receiver: PhotonSample,
    /// Whether the eavesdropper measured this photon
    pub intercepted: bool,
}

/// Result of one round. Immutable once returned.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundOutcome {
    /// Sender's samples, annotated with basis agreement
    pub sender: Vec<PhotonSample>,
    /// Receiver's samples, annotated with basis agreement
    pub receiver: Vec<PhotonSample>,
    /// Sender samples whose basis matched, in original order
    pub sifted_sender: Vec<PhotonSample>,
    /// Receiver samples whose basis matched, in original order
    pub sifted_receiver: Vec<PhotonSample>,
    /// Reported agreement per sifted pair
    pub comparison: Vec<ComparisonResult>,
    /// Reported error rate in percent
    pub error_rate: f64,
    /// Security verdict
    pub is_secure: bool,
    /// Sifted pairs that disagreed before any correction
    pub raw_errors: usize,
    /// Error rate in percent before any correction
    pub raw_error_rate: f64,
    /// Photons the eavesdropper measured
    pub interceptions: usize,
    /// Mode the round ran in
    pub mode: ProtectionMode,
    /// Whether the eavesdropper was active
    pub eavesdropper_active: bool,
}

impl RoundOutcome {
    /// Number of photons exchanged
    pub fn photon_count(&self) -> usize {
        self.sender.len()
    }

    /// Number of bits that survived sifting
    pub fn sifted_len(&self) -> usize {
        self.sifted_sender.len()
    }

    /// The receiver's sifted key bits
    pub fn sifted_key(&self) -> Vec<u8> {
        self.sifted_receiver.iter().map(|s| s.bit).collect()
    }
}

/// Run one BB84 round
pub fn run_round<S: RandomSource + ?Sized>(
    source: &mut S,
    request: &RoundRequest,
) -> Result<RoundOutcome> {
    run_round_observed(source, request, |_| {})
}

/// Run one BB84 round, reporting every photon to `observer` as it is measured
pub fn run_round_observed<S, F>(
    source: &mut S,
    request: &RoundRequest,
    mut observer: F,
) -> Result<RoundOutcome>
where
    S: RandomSource + ?Sized,
    F: FnMut(PhotonStep),
{
    if request.photon_count > MAX_PHOTON_COUNT {
        return invalid_argument_err!(
            "{} {} exceeds the maximum of {}",
            ArgumentKind::PhotonCount,
            request.photon_count,
            MAX_PHOTON_COUNT
        );
    }

    let mut sender = Vec::with_capacity(request.photon_count);
    let mut receiver = Vec::with_capacity(request.photon_count);
    let mut interceptions = 0;

    for index in 0..request.photon_count {
        let prepared = PhotonSample::new(source.random_bit(), source.random_basis());

        // The eavesdropper measures in its own basis; a wrong guess randomizes the bit.
        let mut in_flight = prepared.bit;
        let mut intercepted = false;
        if request.eavesdropper_active && source.chance(EAVESDROPPER_INTERCEPT_PROBABILITY) {
            intercepted = true;
            interceptions += 1;
            if source.random_basis() != prepared.basis {
                in_flight = source.random_bit();
            }
        }

        let receiver_basis = source.random_basis();
        let measured = if receiver_basis != prepared.basis {
            source.random_bit()
        } else {
            in_flight
        };
        let measured = PhotonSample::new(measured, receiver_basis);

        observer(PhotonStep {
            index,
            sender: prepared,
            receiver: measured,
            intercepted,
        });

        sender.push(prepared);
        receiver.push(measured);
    }

    let (sifted_sender, sifted_receiver) = sift(&mut sender, &mut receiver);
    let raw_errors = count_disagreements(&sifted_sender, &sifted_receiver);
    let raw_error_rate = percentage(raw_errors, sifted_sender.len());

    let (comparison, error_rate, is_secure) = match request.mode {
        ProtectionMode::Protected => (
            vec![ComparisonResult::new(true); sifted_sender.len()],
            0.0,
            true,
        ),
        ProtectionMode::Unprotected => (
            sifted_sender
                .iter()
                .zip(&sifted_receiver)
                .map(|(s, r)| ComparisonResult::new(s.original_bit == r.bit))
                .collect(),
            raw_error_rate,
            raw_error_rate <= SECURITY_THRESHOLD_PERCENT,
        ),
    };

    Ok(RoundOutcome {
        sender,
        receiver,
        sifted_sender,
        sifted_receiver,
        comparison,
        error_rate,
        is_secure,
        raw_errors,
        raw_error_rate,
        interceptions,
        mode: request.mode,
        eavesdropper_active: request.eavesdropper_active,
    })
}

/// Annotate both sequences with basis agreement and return the retained samples.
///
/// Both sequences must be index-aligned.
pub fn sift(
    sender: &mut [PhotonSample],
    receiver: &mut [PhotonSample],
) -> (Vec<PhotonSample>, Vec<PhotonSample>) {
    debug_assert_eq!(sender.len(), receiver.len());

    let mut sifted_sender = Vec::with_capacity(sender.len() / 2 + 1);
    let mut sifted_receiver = Vec::with_capacity(receiver.len() / 2 + 1);

    for (s, r) in sender.iter_mut().zip(receiver.iter_mut()) {
        let matched = s.original_basis == r.original_basis;
        s.basis_match = Some(matched);
        r.basis_match = Some(matched);
        if matched {
            sifted_sender.push(*s);
            sifted_receiver.push(*r);
        }
    }

    (sifted_sender, sifted_receiver)
}

fn count_disagreements(sender: &[PhotonSample], receiver: &[PhotonSample]) -> usize {
    sender
        .iter()
        .zip(receiver)
        .filter(|(s, r)| s.original_bit != r.bit)
        .count()
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        // Scale first so exact fractions such as 1/10 land exactly on the threshold.
        part as f64 * 100.0 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Error;
    use crate::core::quantum::photon::Basis;
    use crate::core::quantum::random::RngSource;

    /// Replays fixed draws; panics if the engine asks for more than scripted.
    struct Scripted {
        bits: Vec<u8>,
        bases: Vec<Basis>,
        chances: Vec<bool>,
    }

    impl Scripted {
        fn new(bits: &[u8], bases: &[Basis], chances: &[bool]) -> Self {
            Self {
                bits: bits.iter().rev().copied().collect(),
                bases: bases.iter().rev().copied().collect(),
                chances: chances.iter().rev().copied().collect(),
            }
        }
    }

    impl RandomSource for Scripted {
        fn random_bit(&mut self) -> u8 {
            self.bits.pop().expect("bit draws exhausted")
        }

        fn random_basis(&mut self) -> Basis {
            self.bases.pop().expect("basis draws exhausted")
        }

        fn chance(&mut self, _p: f64) -> bool {
            self.chances.pop().expect("chance draws exhausted")
        }
    }

    use Basis::{Diagonal as X, Rectilinear as P};

    #[test]
    fn test_zero_photons() {
        let mut source = RngSource::seeded(3);
        for mode in [ProtectionMode::Protected, ProtectionMode::Unprotected] {
            let outcome = run_round(&mut source, &RoundRequest::new(true, mode, 0)).unwrap();
            assert!(outcome.sender.is_empty());
            assert!(outcome.sifted_sender.is_empty());
            assert!(outcome.sifted_receiver.is_empty());
            assert_eq!(outcome.error_rate, 0.0);
            assert!(outcome.is_secure);
        }
    }

    #[test]
    fn test_rejects_oversized_round() {
        let mut source = RngSource::seeded(3);
        let request = RoundRequest::new(false, ProtectionMode::Protected, MAX_PHOTON_COUNT + 1);
        assert!(matches!(
            run_round(&mut source, &request),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_matching_bases_without_eavesdropper_agree() {
        // photon 0: bit 1 in +, receiver +  -> kept
        // photon 1: bit 0 in x, receiver +  -> dropped, receiver draws bit 1
        // photon 2: bit 0 in x, receiver x  -> kept
        let mut source = Scripted::new(&[1, 0, 1, 0], &[P, P, X, P, X, X], &[]);
        let request = RoundRequest::new(false, ProtectionMode::Unprotected, 3);
        let outcome = run_round(&mut source, &request).unwrap();

        assert_eq!(outcome.sifted_len(), 2);
        assert_eq!(outcome.sifted_key(), vec![1, 0]);
        assert_eq!(outcome.raw_errors, 0);
        assert_eq!(outcome.error_rate, 0.0);
        assert!(outcome.is_secure);
        assert_eq!(outcome.sender[1].basis_match, Some(false));
        assert_eq!(outcome.receiver[1].bit, 1);
    }

    #[test]
    fn test_wrong_basis_interception_corrupts_unprotected_key() {
        // Sender 1 in +, eavesdropper intercepts in x and reads 0, receiver measures in +.
        let mut source = Scripted::new(&[1, 0], &[P, X, P], &[true]);
        let request = RoundRequest::new(true, ProtectionMode::Unprotected, 1);
        let outcome = run_round(&mut source, &request).unwrap();

        assert_eq!(outcome.interceptions, 1);
        assert_eq!(outcome.raw_errors, 1);
        assert_eq!(outcome.error_rate, 100.0);
        assert!(!outcome.is_secure);
        assert_eq!(outcome.comparison, vec![ComparisonResult::new(false)]);
    }

    #[test]
    fn test_right_basis_interception_passes_through() {
        let mut source = Scripted::new(&[1], &[P, P, P], &[true]);
        let request = RoundRequest::new(true, ProtectionMode::Unprotected, 1);
        let outcome = run_round(&mut source, &request).unwrap();

        assert_eq!(outcome.interceptions, 1);
        assert_eq!(outcome.raw_errors, 0);
        assert!(outcome.is_secure);
    }

    #[test]
    fn test_protected_mode_hides_raw_errors() {
        let mut source = Scripted::new(&[1, 0], &[P, X, P], &[true]);
        let request = RoundRequest::new(true, ProtectionMode::Protected, 1);
        let outcome = run_round(&mut source, &request).unwrap();

        assert_eq!(outcome.raw_errors, 1);
        assert_eq!(outcome.raw_error_rate, 100.0);
        assert_eq!(outcome.error_rate, 0.0);
        assert!(outcome.is_secure);
        assert_eq!(outcome.comparison, vec![ComparisonResult::new(true)]);
    }

    #[test]
    fn test_observer_sees_every_photon_in_order() {
        let mut source = RngSource::seeded(11);
        let request = RoundRequest::new(true, ProtectionMode::Protected, 25);
        let mut seen = Vec::new();
        let outcome = run_round_observed(&mut source, &request, |step| seen.push(step)).unwrap();

        assert_eq!(seen.len(), 25);
        for (i, step) in seen.iter().enumerate() {
            assert_eq!(step.index, i);
            assert_eq!(step.sender.bit, outcome.sender[i].bit);
            assert_eq!(step.receiver.basis, outcome.receiver[i].basis);
        }
        assert_eq!(seen.iter().filter(|s| s.intercepted).count(), outcome.interceptions);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        // Ten kept photons, exactly one corrupted by a wrong-basis interception.
        let mut bits = Vec::new();
        let mut bases = Vec::new();
        let mut chances = Vec::new();
        for i in 0..10 {
            bits.push(1);
            bases.push(P);
            if i == 0 {
                chances.push(true);
                bases.push(X);
                bits.push(0);
            } else {
                chances.push(false);
            }
            bases.push(P);
        }
        let mut source = Scripted::new(&bits, &bases, &chances);
        let request = RoundRequest::new(true, ProtectionMode::Unprotected, 10);
        let outcome = run_round(&mut source, &request).unwrap();

        assert_eq!(outcome.raw_errors, 1);
        assert!((outcome.error_rate - 10.0).abs() < 1e-9);
        assert!(outcome.is_secure);
    }
}

/*!
Photon samples exchanged during a BB84 round.
*/

use std::fmt;

/// Encoding/measurement basis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Basis {
    /// Rectilinear basis (`+`)
    Rectilinear,
    /// Diagonal basis (`x`)
    Diagonal,
}

impl Basis {
    /// Symbol used on the key display
    pub fn symbol(&self) -> char {
        match self {
            Basis::Rectilinear => '+',
            Basis::Diagonal => 'x',
        }
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// One photon as recorded by either party.
///
/// Sender samples keep the value they prepared in `original_bit`. Receiver
/// samples record their measured bit and chosen basis in both fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotonSample {
    /// Bit value, 0 or 1
    pub bit: u8,
    /// Basis the bit is expressed in
    pub basis: Basis,
    /// Value before any tampering
    pub original_bit: u8,
    /// Basis before any tampering
    pub original_basis: Basis,
    /// Whether both parties used the same basis at this index, once sifted
    pub basis_match: Option<bool>,
}

impl PhotonSample {
    /// Create an untampered sample
    pub fn new(bit: u8, basis: Basis) -> Self {
        Self {
            bit,
            basis,
            original_bit: bit,
            original_basis: basis,
            basis_match: None,
        }
    }

    /// Whether sifting kept this sample
    pub fn is_sifted(&self) -> bool {
        self.basis_match == Some(true)
    }
}

/// Per-bit outcome of comparing the sifted keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonResult {
    /// Whether sender and receiver agree on this sifted bit
    pub matched: bool,
}

impl ComparisonResult {
    /// Comparison outcome for one sifted pair
    pub fn new(matched: bool) -> Self {
        Self { matched }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basis_symbols() {
        assert_eq!(Basis::Rectilinear.to_string(), "+");
        assert_eq!(Basis::Diagonal.to_string(), "x");
        assert_eq!(Basis::Diagonal.symbol(), 'x');
    }

    #[test]
    fn test_new_sample_is_untampered() {
        let sample = PhotonSample::new(1, Basis::Diagonal);
        assert_eq!(sample.bit, sample.original_bit);
        assert_eq!(sample.basis, sample.original_basis);
        assert_eq!(sample.basis_match, None);
        assert!(!sample.is_sifted());
    }
}

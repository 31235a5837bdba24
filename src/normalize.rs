//! Value normalisation: signal quality to estimated power, and raw BSSIDs
//! to salted fingerprints.

use sha2::{Digest, Sha256};

/// Number of hex characters kept from the digest (64 bits).
pub const FINGERPRINT_LEN: usize = 16;

/// Salt used when none is configured. Keeps fingerprints comparable with
/// files written by earlier collection runs.
pub const DEFAULT_SALT: &str = "fjierbvbg03ur90485h0943uf8j4";

/// Estimate received power (dBm) from a signal-quality percentage.
///
/// Linear mapping: 0 % → −100 dBm, 100 % → −50 dBm. Inputs outside 0–100
/// are not rejected; the parser only ever hands over in-range values.
pub fn estimated_power(quality: u8) -> f64 {
    f64::from(quality) / 2.0 - 100.0
}

/// Produces irreversible, truncated fingerprints of access-point
/// identifiers.
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    salt: String,
}

impl Fingerprinter {
    pub fn new(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }

    /// `sha256(raw ‖ salt)` as lowercase hex, truncated to
    /// [`FINGERPRINT_LEN`] characters.
    pub fn fingerprint(&self, raw: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(raw.as_bytes());
        hasher.update(self.salt.as_bytes());
        let mut hex = format!("{:x}", hasher.finalize());
        hex.truncate(FINGERPRINT_LEN);
        hex
    }
}

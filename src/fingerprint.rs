use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

/// A one-way SHA-256 digest of a national ID number, as lowercase hex.
///
/// This is what gets stored and compared for uniqueness; the number
/// itself never leaves the request that carried it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hashes the given ID number.
    ///
    /// ```
    /// use secrecy::SecretString;
    /// use voter_registry::fingerprint::Fingerprint;
    ///
    /// let fingerprint = Fingerprint::of(&SecretString::new("111122223333".to_owned()));
    /// assert_eq!(fingerprint.as_str().len(), 64);
    /// ```
    pub fn of(id_number: &SecretString) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(id_number.expose_secret().as_bytes());

        Fingerprint(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A short prefix, enough to correlate log lines.
    pub fn abbreviated(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

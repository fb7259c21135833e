use crate::config::ConfigurationError;
use crate::error::IssuanceError;
use crate::profile::IssuanceProfile;

use ring::rand::{SecureRandom, SystemRandom};
use time::{Duration, OffsetDateTime};

/// Random bytes drawn for every serial, after the prefix byte
pub const SERIAL_RANDOM_BYTES: usize = 15;

/// A certificate serial: one prefix byte identifying the CA instance
/// followed by 120 random bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SerialNumber([u8; SERIAL_RANDOM_BYTES + 1]);

impl SerialNumber {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn prefix(&self) -> u8 {
        self.0[0]
    }

    /// The canonical form, used as the storage key and the subject
    /// serialNumber attribute
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// The serial and validity window a certificate will be signed with
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuanceWindow {
    pub serial: SerialNumber,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

pub struct SerialGenerator {
    prefix: u8,
    rng: SystemRandom,
}

impl SerialGenerator {
    pub fn new(prefix: u8) -> Result<Self, ConfigurationError> {
        if prefix == 0 {
            return Err(ConfigurationError::NoSerialPrefix);
        }

        Ok(Self {
            prefix,
            rng: SystemRandom::new(),
        })
    }

    pub fn generate(&self) -> Result<SerialNumber, IssuanceError> {
        let mut serial = [0u8; SERIAL_RANDOM_BYTES + 1];
        serial[0] = self.prefix;
        self.rng.fill(&mut serial[1..]).map_err(|_| {
            IssuanceError::internal("Could not draw randomness for the serial number")
        })?;
        Ok(SerialNumber(serial))
    }

    /// Work out the validity window for a certificate under `profile` and
    /// draw its serial. The window is checked against the issuer first so a
    /// refused request never consumes entropy.
    pub fn compute(
        &self,
        issuer_not_after: OffsetDateTime,
        profile: &IssuanceProfile,
        now: OffsetDateTime,
    ) -> Result<IssuanceWindow, IssuanceError> {
        // Certificates only carry whole seconds
        let now = now - Duration::nanoseconds(now.nanosecond() as i64);

        let not_before = now
            .checked_sub(profile.backdate())
            .ok_or_else(|| IssuanceError::internal("Profile backdate is out of range"))?;
        let not_after = not_before
            .checked_add(profile.expiry())
            .ok_or_else(|| IssuanceError::internal("Profile expiry is out of range"))?;

        if not_after > issuer_not_after {
            return Err(IssuanceError::internal(format!(
                "Cannot issue a certificate that expires after the issuer certificate ({} > {})",
                not_after, issuer_not_after
            )));
        }

        Ok(IssuanceWindow {
            serial: self.generate()?,
            not_before,
            not_after,
        })
    }
}

use crate::csr::{PublicKeyDetails, SubjectPublicKey};
use crate::error::IssuanceError;
use crate::oid;

use serde::Deserialize;

fn enabled() -> bool {
    true
}

fn default_min_rsa_bits() -> usize {
    2048
}

fn default_max_rsa_bits() -> usize {
    4096
}

/// Which subscriber keys the CA is willing to certify. Checking a key has
/// no side effects so a single policy is shared by every request.
#[derive(Clone, Debug, Deserialize)]
pub struct KeyPolicy {
    #[serde(default = "enabled")]
    pub allow_rsa: bool,
    #[serde(default = "default_min_rsa_bits")]
    pub min_rsa_bits: usize,
    #[serde(default = "default_max_rsa_bits")]
    pub max_rsa_bits: usize,
    #[serde(default = "enabled")]
    pub allow_ecdsa_p256: bool,
    #[serde(default = "enabled")]
    pub allow_ecdsa_p384: bool,
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self {
            allow_rsa: true,
            min_rsa_bits: default_min_rsa_bits(),
            max_rsa_bits: default_max_rsa_bits(),
            allow_ecdsa_p256: true,
            allow_ecdsa_p384: true,
        }
    }
}

impl KeyPolicy {
    pub fn check(&self, key: &SubjectPublicKey) -> Result<(), IssuanceError> {
        match &key.details {
            PublicKeyDetails::Rsa { modulus_bits, exponent } => {
                self.check_rsa(*modulus_bits, *exponent)
            }
            PublicKeyDetails::Ecdsa { curve, point } => self.check_ecdsa(curve.as_ref(), point),
            PublicKeyDetails::Unsupported(alg) => Err(IssuanceError::malformed(format!(
                "Unsupported key algorithm: {}",
                alg
            ))),
        }
    }

    fn check_rsa(&self, modulus_bits: usize, exponent: Option<u64>) -> Result<(), IssuanceError> {
        if !self.allow_rsa {
            return Err(IssuanceError::malformed("RSA keys are not allowed"));
        }

        if modulus_bits < self.min_rsa_bits || modulus_bits > self.max_rsa_bits {
            return Err(IssuanceError::malformed(format!(
                "RSA key size {} is outside the allowed range [{}, {}]",
                modulus_bits, self.min_rsa_bits, self.max_rsa_bits
            )));
        }

        if modulus_bits % 8 != 0 {
            return Err(IssuanceError::malformed(format!(
                "RSA key size {} is not a multiple of 8",
                modulus_bits
            )));
        }

        // Exponents too large for a u64 are refused along with the small ones
        match exponent {
            Some(e) if e >= 65537 && e % 2 == 1 => Ok(()),
            _ => Err(IssuanceError::malformed(
                "RSA public exponent must be odd and at least 65537",
            )),
        }
    }

    fn check_ecdsa(
        &self,
        curve: Option<&oid::ObjectIdentifier>,
        point: &[u8],
    ) -> Result<(), IssuanceError> {
        let curve =
            curve.ok_or_else(|| IssuanceError::malformed("ECDSA key does not name its curve"))?;

        // Only uncompressed points: 0x04 || X || Y
        let (allowed, field_len) = if curve.is(oid::EC_CURVE_P256) {
            (self.allow_ecdsa_p256, 32)
        } else if curve.is(oid::EC_CURVE_P384) {
            (self.allow_ecdsa_p384, 48)
        } else {
            return Err(IssuanceError::malformed(format!("Unsupported ECDSA curve: {}", curve)));
        };

        if !allowed {
            return Err(IssuanceError::malformed(format!("ECDSA curve {} is not allowed", curve)));
        }

        if point.len() != 1 + 2 * field_len || point[0] != 0x04 {
            return Err(IssuanceError::malformed(
                "ECDSA public key is not a valid uncompressed point",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsa(bits: usize, exponent: Option<u64>) -> SubjectPublicKey {
        SubjectPublicKey {
            spki_der: vec![],
            details: PublicKeyDetails::Rsa { modulus_bits: bits, exponent },
        }
    }

    fn ecdsa(curve: &[u64], point_len: usize) -> SubjectPublicKey {
        let mut point = vec![0x04];
        point.resize(point_len, 0x01);
        SubjectPublicKey {
            spki_der: vec![],
            details: PublicKeyDetails::Ecdsa {
                curve: Some(oid::ObjectIdentifier::from_arcs(curve)),
                point,
            },
        }
    }

    #[test]
    fn rsa_sizes() {
        let policy = KeyPolicy::default();
        assert!(policy.check(&rsa(2048, Some(65537))).is_ok());
        assert!(policy.check(&rsa(4096, Some(65537))).is_ok());
        assert!(policy.check(&rsa(512, Some(65537))).unwrap_err().is_malformed());
        assert!(policy.check(&rsa(8192, Some(65537))).unwrap_err().is_malformed());
        assert!(policy.check(&rsa(2047, Some(65537))).unwrap_err().is_malformed());
    }

    #[test]
    fn rsa_exponents() {
        let policy = KeyPolicy::default();
        assert!(policy.check(&rsa(2048, Some(3))).is_err());
        assert!(policy.check(&rsa(2048, Some(65538))).is_err());
        assert!(policy.check(&rsa(2048, None)).is_err());
    }

    #[test]
    fn rsa_disabled() {
        let policy = KeyPolicy {
            allow_rsa: false,
            ..KeyPolicy::default()
        };
        assert!(policy.check(&rsa(2048, Some(65537))).is_err());
    }

    #[test]
    fn ecdsa_curves() {
        let policy = KeyPolicy {
            allow_ecdsa_p384: false,
            ..KeyPolicy::default()
        };
        assert!(policy.check(&ecdsa(oid::EC_CURVE_P256, 65)).is_ok());
        assert!(policy.check(&ecdsa(oid::EC_CURVE_P256, 33)).is_err());
        assert!(policy.check(&ecdsa(oid::EC_CURVE_P384, 97)).is_err());
        assert!(policy.check(&ecdsa(&[1, 3, 132, 0, 35], 133)).is_err());
    }

    #[test]
    fn unknown_algorithm() {
        let key = SubjectPublicKey {
            spki_der: vec![],
            details: PublicKeyDetails::Unsupported(String::from("1.3.101.112")),
        };
        assert!(KeyPolicy::default().check(&key).unwrap_err().is_malformed());
    }
}

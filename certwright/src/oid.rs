use serde::Deserialize;

use std::fmt;
use std::str::FromStr;

/// id-pe-tlsfeature, RFC 7633
pub const TLS_FEATURE: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 1, 24];

/// id-pe-authorityInfoAccess
pub const AUTHORITY_INFO_ACCESS: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 1, 1];
/// id-ad-ocsp
pub const AD_OCSP: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 48, 1];
/// id-ad-caIssuers
pub const AD_CA_ISSUERS: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 48, 2];

pub const SUBJECT_KEY_IDENTIFIER: &[u64] = &[2, 5, 29, 14];
pub const KEY_USAGE: &[u64] = &[2, 5, 29, 15];
pub const SUBJECT_ALT_NAME: &[u64] = &[2, 5, 29, 17];
pub const BASIC_CONSTRAINTS: &[u64] = &[2, 5, 29, 19];
pub const CRL_DISTRIBUTION_POINTS: &[u64] = &[2, 5, 29, 31];
pub const CERTIFICATE_POLICIES: &[u64] = &[2, 5, 29, 32];
pub const AUTHORITY_KEY_IDENTIFIER: &[u64] = &[2, 5, 29, 35];
pub const EXT_KEY_USAGE: &[u64] = &[2, 5, 29, 37];

/// id-qt-cps
pub const QT_CPS: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 2, 1];
/// id-qt-unotice
pub const QT_UNOTICE: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 2, 2];

/// Subject attribute holding the hex form of the certificate serial
pub const DN_SERIAL_NUMBER: &[u64] = &[2, 5, 4, 5];

pub const RSA_ENCRYPTION: &[u64] = &[1, 2, 840, 113549, 1, 1, 1];
pub const EC_PUBLIC_KEY: &[u64] = &[1, 2, 840, 10045, 2, 1];
pub const EC_CURVE_P256: &[u64] = &[1, 2, 840, 10045, 3, 1, 7];
pub const EC_CURVE_P384: &[u64] = &[1, 3, 132, 0, 34];

pub const MD5_WITH_RSA: &[u64] = &[1, 2, 840, 113549, 1, 1, 4];
pub const SHA1_WITH_RSA: &[u64] = &[1, 2, 840, 113549, 1, 1, 5];
pub const SHA256_WITH_RSA: &[u64] = &[1, 2, 840, 113549, 1, 1, 11];
pub const SHA384_WITH_RSA: &[u64] = &[1, 2, 840, 113549, 1, 1, 12];
pub const SHA512_WITH_RSA: &[u64] = &[1, 2, 840, 113549, 1, 1, 13];
pub const ECDSA_WITH_SHA256: &[u64] = &[1, 2, 840, 10045, 4, 3, 2];
pub const ECDSA_WITH_SHA384: &[u64] = &[1, 2, 840, 10045, 4, 3, 3];
pub const ECDSA_WITH_SHA512: &[u64] = &[1, 2, 840, 10045, 4, 3, 4];

/// An object identifier kept as its arcs. Configuration files carry them in
/// dotted notation, e.g. `"1.3.6.1.5.5.7.1.24"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectIdentifier(Vec<u64>);

impl ObjectIdentifier {
    pub fn from_arcs(arcs: &[u64]) -> Self {
        ObjectIdentifier(arcs.to_vec())
    }

    pub fn arcs(&self) -> &[u64] {
        &self.0
    }

    /// Convert from the representation used by x509-parser. Returns None
    /// for identifiers with arcs that do not fit into a u64.
    pub fn from_parsed(oid: &x509_parser::der_parser::oid::Oid<'_>) -> Option<Self> {
        oid.iter().map(|arcs| ObjectIdentifier(arcs.collect()))
    }

    pub fn is(&self, arcs: &[u64]) -> bool {
        self.0.as_slice() == arcs
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dotted = self
            .0
            .iter()
            .map(|x| x.to_string())
            .collect::<Vec<String>>()
            .join(".");
        write!(f, "{}", dotted)
    }
}

impl FromStr for ObjectIdentifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arcs = s
            .split('.')
            .map(|arc| arc.parse::<u64>())
            .collect::<Result<Vec<u64>, _>>()
            .map_err(|_| format!("Invalid object identifier: {}", s))?;

        // X.660 requires at least two arcs with the first in 0..=2
        if arcs.len() < 2 || arcs[0] > 2 {
            return Err(format!("Invalid object identifier: {}", s));
        }

        Ok(ObjectIdentifier(arcs))
    }
}

impl<'de> Deserialize<'de> for ObjectIdentifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let dotted = String::deserialize(deserializer)?;
        dotted.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dotted_notation() {
        let oid: ObjectIdentifier = "1.3.6.1.5.5.7.1.24".parse().unwrap();
        assert!(oid.is(TLS_FEATURE));
        assert_eq!(oid.to_string(), "1.3.6.1.5.5.7.1.24");
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<ObjectIdentifier>().is_err());
        assert!("1".parse::<ObjectIdentifier>().is_err());
        assert!("3.1".parse::<ObjectIdentifier>().is_err());
        assert!("1.2.x".parse::<ObjectIdentifier>().is_err());
    }
}

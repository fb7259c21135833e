use crate::csr::RequestedExtension;
use crate::error::IssuanceError;
use crate::oid::{self, ObjectIdentifier};
use crate::profile::IssuanceProfile;
use crate::stats::{Counter, StatsSink};

use std::collections::BTreeSet;

/// TLS feature code for status_request, RFC 6066
pub const STATUS_REQUEST: i64 = 5;

/// DER of a TLS Feature value holding only status_request
pub const MUST_STAPLE_VALUE: &[u8] = &[0x30, 0x03, 0x02, 0x01, 0x05];

/// An extension that will be written into the certificate as is
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateExtension {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    pub value: Vec<u8>,
}

impl CertificateExtension {
    pub fn must_staple() -> Self {
        Self {
            oid: ObjectIdentifier::from_arcs(oid::TLS_FEATURE),
            critical: false,
            value: MUST_STAPLE_VALUE.to_vec(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ExtensionRule {
    /// Validated and turned into the canonical must-staple extension
    TlsFeature,
    /// Written by the CA from its own decisions, never copied from a request
    CaControlled,
}

/// How requested extensions are treated. OIDs not in this table are
/// carried only when the profile whitelists them.
const EXTENSION_RULES: &[(&[u64], ExtensionRule)] = &[
    (oid::TLS_FEATURE, ExtensionRule::TlsFeature),
    (oid::AUTHORITY_INFO_ACCESS, ExtensionRule::CaControlled),
    (oid::AUTHORITY_KEY_IDENTIFIER, ExtensionRule::CaControlled),
    (oid::BASIC_CONSTRAINTS, ExtensionRule::CaControlled),
    (oid::CERTIFICATE_POLICIES, ExtensionRule::CaControlled),
    (oid::CRL_DISTRIBUTION_POINTS, ExtensionRule::CaControlled),
    (oid::EXT_KEY_USAGE, ExtensionRule::CaControlled),
    (oid::KEY_USAGE, ExtensionRule::CaControlled),
    (oid::SUBJECT_ALT_NAME, ExtensionRule::CaControlled),
    (oid::SUBJECT_KEY_IDENTIFIER, ExtensionRule::CaControlled),
];

fn rule_for(oid: &ObjectIdentifier) -> Option<ExtensionRule> {
    EXTENSION_RULES
        .iter()
        .find(|(arcs, _)| oid.is(arcs))
        .map(|(_, rule)| *rule)
}

/// Decode a TLS Feature value (SEQUENCE OF INTEGER) into its distinct codes
fn parse_tls_features(value: &[u8]) -> Option<BTreeSet<i64>> {
    yasna::parse_der(value, |reader| reader.collect_sequence_of(|r| r.read_i64()))
        .ok()
        .map(|codes| codes.into_iter().collect())
}

/// Decide which of the requested extensions end up in the certificate.
///
/// Every counter is bumped at most once per request, however many
/// extensions of that kind the request carries.
pub fn select_extensions(
    requested: &[RequestedExtension],
    profile: &IssuanceProfile,
    must_staple_enabled: bool,
    stats: &(dyn StatsSink + Send + Sync),
) -> Result<Vec<CertificateExtension>, IssuanceError> {
    let mut seen_basic = false;
    let mut seen_tls_feature = false;
    let mut seen_other = false;
    let mut must_staple = false;
    let mut carried: Vec<CertificateExtension> = vec![];

    for ext in requested {
        match rule_for(&ext.oid) {
            Some(ExtensionRule::TlsFeature) => {
                seen_tls_feature = true;
                if !must_staple_enabled {
                    continue;
                }

                let only_status_request = BTreeSet::from([STATUS_REQUEST]);
                match parse_tls_features(&ext.value) {
                    Some(features) if features == only_status_request => must_staple = true,
                    _ => {
                        stats.inc(Counter::ExtensionTlsFeature, 1);
                        stats.inc(Counter::ExtensionTlsFeatureInvalid, 1);
                        return Err(IssuanceError::malformed(format!(
                            "Unsupported value for extension with OID {}",
                            ext.oid
                        )));
                    }
                }
            }
            Some(ExtensionRule::CaControlled) => seen_basic = true,
            None if profile.allows_extension(&ext.oid) => {
                // A certificate may not carry the same extension twice
                if !carried.iter().any(|c| c.oid == ext.oid) {
                    carried.push(CertificateExtension {
                        oid: ext.oid.clone(),
                        critical: ext.critical,
                        value: ext.value.clone(),
                    });
                }
            }
            None => seen_other = true,
        }
    }

    if seen_basic {
        stats.inc(Counter::ExtensionBasic, 1);
    }
    if seen_tls_feature {
        stats.inc(Counter::ExtensionTlsFeature, 1);
    }
    if seen_other {
        stats.inc(Counter::ExtensionOther, 1);
    }

    if must_staple {
        carried.push(CertificateExtension::must_staple());
    }

    Ok(carried)
}

use crate::config::ConfigurationError;
use crate::csr::KeyAlgorithm;
use crate::error::IssuanceError;
use crate::oid::ObjectIdentifier;

use serde::Deserialize;

use std::collections::{HashMap, HashSet};

/// No profile may describe a certificate living longer than 100 years
pub const MAX_PROFILE_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

/// Key usages and extended key usages a profile can grant. The names match
/// the ones operators already know from other CA software.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Hash)]
pub enum Usage {
    #[serde(rename = "digital signature")]
    DigitalSignature,
    #[serde(rename = "key encipherment")]
    KeyEncipherment,
    #[serde(rename = "key agreement")]
    KeyAgreement,
    #[serde(rename = "server auth")]
    ServerAuth,
    #[serde(rename = "client auth")]
    ClientAuth,
}

/// A certificate policy to embed, optionally with a CPS pointer and a
/// user notice.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct CertificatePolicy {
    pub id: ObjectIdentifier,
    pub cps_uri: Option<String>,
    pub user_notice: Option<String>,
}

/// Everything that decides the shape of a certificate apart from the names
/// and key, which come from the request.
#[derive(Clone, Debug, Deserialize)]
pub struct IssuanceProfile {
    #[serde(skip)]
    pub name: String,
    /// The name of the issuer that signs certificates under this profile
    pub issuer: String,
    pub usages: Vec<Usage>,
    pub expiry_seconds: u64,
    #[serde(default)]
    pub backdate_seconds: u64,
    #[serde(default)]
    pub policies: Vec<CertificatePolicy>,
    /// Requested extensions outside this list are dropped
    #[serde(default)]
    pub allowed_extensions: HashSet<ObjectIdentifier>,
    pub ocsp_url: Option<String>,
    pub issuer_url: Option<String>,
    pub crl_url: Option<String>,
    /// Overrides the CA wide limit when set
    pub max_names: Option<usize>,
    /// Recorded for compatibility with existing profile files. Serials are
    /// always generated by the CA.
    #[serde(default)]
    pub client_provides_serial_numbers: bool,
}

impl IssuanceProfile {
    pub fn expiry(&self) -> time::Duration {
        time::Duration::seconds(i64::try_from(self.expiry_seconds).unwrap_or(i64::MAX))
    }

    pub fn backdate(&self) -> time::Duration {
        time::Duration::seconds(i64::try_from(self.backdate_seconds).unwrap_or(i64::MAX))
    }

    pub fn allows_extension(&self, oid: &ObjectIdentifier) -> bool {
        self.allowed_extensions.contains(oid)
    }

    pub fn check_name_count(&self, count: usize) -> Result<(), IssuanceError> {
        match self.max_names {
            Some(max) if count > max => Err(IssuanceError::malformed(format!(
                "Certificate request has {} names, profile {} allows {}",
                count, self.name, max
            ))),
            _ => Ok(()),
        }
    }
}

/// Maps the algorithm of the subscriber key to the profile that is used for
/// it.
pub struct ProfileSelector {
    by_algorithm: HashMap<KeyAlgorithm, String>,
    profiles: HashMap<String, IssuanceProfile>,
}

impl ProfileSelector {
    pub fn new(
        mut profiles: HashMap<String, IssuanceProfile>,
        rsa_profile: Option<String>,
        ecdsa_profile: Option<String>,
    ) -> Result<Self, ConfigurationError> {
        for (name, profile) in profiles.iter_mut() {
            profile.name = name.clone();
            let invalid =
                |reason: &str| ConfigurationError::InvalidProfile(format!("{} {}", name, reason));

            if profile.expiry_seconds == 0 {
                return Err(invalid("has a zero expiry"));
            }
            if profile.expiry_seconds > MAX_PROFILE_SECONDS
                || profile.backdate_seconds > MAX_PROFILE_SECONDS
            {
                return Err(invalid("has an expiry or backdate above 100 years"));
            }
            if profile.usages.is_empty() {
                return Err(invalid("grants no usages"));
            }
        }

        let mut by_algorithm = HashMap::new();
        let selected = [(KeyAlgorithm::Rsa, rsa_profile), (KeyAlgorithm::Ecdsa, ecdsa_profile)];
        for (algorithm, name) in selected {
            if let Some(name) = name {
                if !profiles.contains_key(&name) {
                    return Err(ConfigurationError::ProfileNotDefined(name));
                }
                by_algorithm.insert(algorithm, name);
            }
        }

        if by_algorithm.is_empty() {
            return Err(ConfigurationError::InvalidProfile(String::from(
                "no profile is selected for any key algorithm",
            )));
        }

        Ok(Self { by_algorithm, profiles })
    }

    pub fn select(&self, algorithm: KeyAlgorithm) -> Result<&IssuanceProfile, IssuanceError> {
        self.by_algorithm
            .get(&algorithm)
            .and_then(|name| self.profiles.get(name))
            .ok_or_else(|| {
                IssuanceError::malformed(format!("No profile configured for {} keys", algorithm))
            })
    }

    pub fn profiles(&self) -> impl Iterator<Item = &IssuanceProfile> {
        self.profiles.values()
    }
}

use crate::config::ConfigurationError;
use crate::csr::CertificateRequest;
use crate::error::IssuanceError;
use crate::extensions::select_extensions;
use crate::key_policy::KeyPolicy;
use crate::logging::{CertificateIssued, InternalMessage, Log, Severity};
use crate::names;
use crate::policy::{PolicyAuthority, PolicyError};
use crate::profile::{IssuanceProfile, ProfileSelector};
use crate::serial::SerialGenerator;
use crate::signing::{CertificateTemplate, Issuer};
use crate::stats::StatsSink;
use crate::storage::{IssuedCertificate, StorageAuthority};

use crossbeam_channel::Sender;
use serde::Deserialize;
use time::OffsetDateTime;

use std::collections::HashMap;
use std::sync::Arc;

/// Macro for simplifying sending error logs to the certwright logging system.
macro_rules! ca_error {
    ($self:ident, $message:expr) => {
        let _ = $self.log_sender.send(Log::InternalMessage(InternalMessage {
            severity: Severity::Error,
            message: $message,
        }));
    };
}

/// Macro for simplifying sending warning logs to the certwright logging system.
macro_rules! ca_warning {
    ($self:ident, $message:expr) => {
        let _ = $self.log_sender.send(Log::InternalMessage(InternalMessage {
            severity: Severity::Warning,
            message: $message,
        }));
    };
}

fn default_max_names() -> usize {
    100
}

/// The `[authority]` section of the configuration
#[derive(Clone, Debug, Deserialize)]
pub struct AuthorityConfiguration {
    /// First byte of every serial. Must not be zero.
    pub serial_prefix: u8,
    #[serde(default = "default_max_names")]
    pub max_names: usize,
    /// Leave the subject CN empty when the request has none
    #[serde(default)]
    pub do_not_force_cn: bool,
    #[serde(default)]
    pub enable_must_staple: bool,
    pub rsa_profile: Option<String>,
    pub ecdsa_profile: Option<String>,
}

pub trait Clock {
    fn now(&self) -> OffsetDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Always reports the same instant
pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

/// The services the authority talks to but does not own
pub struct Collaborators {
    pub policy: Arc<dyn PolicyAuthority + Send + Sync>,
    pub storage: Arc<dyn StorageAuthority + Send + Sync>,
    pub stats: Arc<dyn StatsSink + Send + Sync>,
    pub clock: Arc<dyn Clock + Send + Sync>,
    pub log_sender: Sender<Log>,
}

/// Turns certificate requests into stored certificates. Holds no per
/// request state, so one instance is shared by every caller.
pub struct CertificateAuthority {
    serials: SerialGenerator,
    max_names: usize,
    do_not_force_cn: bool,
    enable_must_staple: bool,
    key_policy: KeyPolicy,
    profiles: ProfileSelector,
    issuers: HashMap<String, Issuer>,
    policy: Arc<dyn PolicyAuthority + Send + Sync>,
    storage: Arc<dyn StorageAuthority + Send + Sync>,
    stats: Arc<dyn StatsSink + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
    log_sender: Sender<Log>,
}

impl CertificateAuthority {
    pub fn new(
        config: AuthorityConfiguration,
        key_policy: KeyPolicy,
        profiles: HashMap<String, IssuanceProfile>,
        issuers: Vec<Issuer>,
        collaborators: Collaborators,
    ) -> Result<Self, ConfigurationError> {
        let serials = SerialGenerator::new(config.serial_prefix)?;

        if config.max_names == 0 {
            return Err(ConfigurationError::InvalidAuthority(String::from(
                "max_names must allow at least one name",
            )));
        }

        let profiles = ProfileSelector::new(profiles, config.rsa_profile, config.ecdsa_profile)?;

        let mut issuer_table = HashMap::new();
        for issuer in issuers {
            let name = issuer.name().to_string();
            if issuer_table.insert(name.clone(), issuer).is_some() {
                return Err(ConfigurationError::InvalidAuthority(format!(
                    "issuer {} is defined twice",
                    name
                )));
            }
        }

        for profile in profiles.profiles() {
            if !issuer_table.contains_key(&profile.issuer) {
                return Err(ConfigurationError::IssuerNotDefined(profile.issuer.clone()));
            }
        }

        Ok(Self {
            serials,
            max_names: config.max_names,
            do_not_force_cn: config.do_not_force_cn,
            enable_must_staple: config.enable_must_staple,
            key_policy,
            profiles,
            issuers: issuer_table,
            policy: collaborators.policy,
            storage: collaborators.storage,
            stats: collaborators.stats,
            clock: collaborators.clock,
            log_sender: collaborators.log_sender,
        })
    }

    pub fn issuers(&self) -> impl Iterator<Item = &Issuer> {
        self.issuers.values()
    }

    /// Validate a DER encoded CSR, sign a certificate for it and store the
    /// result. Nothing is stored unless a certificate was signed, and no
    /// certificate is returned unless it was stored.
    pub async fn issue_certificate(
        &self,
        csr_der: &[u8],
        registration_id: i64,
    ) -> Result<IssuedCertificate, IssuanceError> {
        let csr = CertificateRequest::from_der(csr_der)?;

        let names = names::normalize(
            csr.common_name.as_deref(),
            &csr.dns_names,
            self.max_names,
            self.do_not_force_cn,
        )?;

        if let Err(e) = names::approve_names(self.policy.as_ref(), &names).await {
            if let PolicyError::Unavailable(_) = e {
                ca_warning!(
                    self,
                    format!("Could not check names for registration [{}]: {}", registration_id, e)
                );
            }
            return Err(e.into());
        }

        self.key_policy.check(&csr.public_key)?;

        let algorithm = csr
            .public_key
            .algorithm()
            .ok_or_else(|| IssuanceError::malformed("Unsupported key algorithm"))?;
        let profile = self.profiles.select(algorithm)?;
        profile.check_name_count(names.names.len())?;

        let extensions = select_extensions(
            &csr.extensions,
            profile,
            self.enable_must_staple,
            self.stats.as_ref(),
        )?;

        let issuer = match self.issuers.get(&profile.issuer) {
            Some(issuer) => issuer,
            None => {
                ca_error!(
                    self,
                    format!("Profile {} names unknown issuer {}", profile.name, profile.issuer)
                );
                return Err(IssuanceError::internal("Issuer not available"));
            }
        };

        let window = self.serials.compute(issuer.not_after(), profile, self.clock.now())?;

        let template = CertificateTemplate {
            serial: &window.serial,
            not_before: window.not_before,
            not_after: window.not_after,
            common_name: &names.common_name,
            dns_names: &names.names,
            subject_public_key: &csr.public_key.spki_der,
            profile,
            extensions: &extensions,
        };

        let der = match issuer.sign(&template).await {
            Ok(der) => der,
            Err(e) => {
                ca_error!(
                    self,
                    format!(
                        "Issuer [{}] could not sign serial [{}]: {}",
                        issuer.name(),
                        window.serial,
                        e
                    )
                );
                return Err(e.into());
            }
        };

        let certificate = IssuedCertificate::new(
            der,
            window.serial.to_hex(),
            registration_id,
            issuer.name(),
            window.not_before,
            window.not_after,
        );

        // The certificate exists from here on. If it cannot be stored it must
        // at least be possible to find it again.
        if let Err(e) = self.storage.add_certificate(&certificate).await {
            ca_error!(
                self,
                format!(
                    "Failed to store certificate: serial=[{}] issuer=[{}] sha256=[{}] registration=[{}]: {}",
                    certificate.serial, certificate.issuer, certificate.digest, registration_id, e
                )
            );
            return Err(e.into());
        }

        let _ = self.log_sender.send(Log::CertificateIssued(CertificateIssued {
            serial: certificate.serial.clone(),
            issuer: certificate.issuer.clone(),
            registration_id,
            common_name: names.common_name.clone(),
            names: names.names.clone(),
            digest: certificate.digest.clone(),
            not_before: certificate.not_before.unix_timestamp(),
            not_after: certificate.not_after.unix_timestamp(),
        }));

        Ok(certificate)
    }
}

use crate::authority::{AuthorityConfiguration, CertificateAuthority, Collaborators, SystemClock};
use crate::key_policy::KeyPolicy;
use crate::logging::{Log, LoggingConfiguration};
use crate::policy::{hostname, HostnamePolicy};
use crate::profile::IssuanceProfile;
use crate::signing::{Issuer, IssuerConfiguration, SigningError};
use crate::stats::CounterStats;
use crate::storage::{StorageConfiguration, StorageError};

use clap::{Arg, Command};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::Deserialize;

use std::collections::HashMap;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct Configuration {
    pub authority: AuthorityConfiguration,
    #[serde(default)]
    pub key_policy: KeyPolicy,
    #[serde(default)]
    pub policy: hostname::Config,
    pub profiles: HashMap<String, IssuanceProfile>,
    pub issuers: HashMap<String, IssuerConfiguration>,
    #[serde(default)]
    pub storage: StorageConfiguration,
    #[serde(default)]
    pub logging: LoggingConfiguration,
}

/// A ready to use authority and the pieces the binary still needs to wire up
pub struct Authority {
    pub authority: CertificateAuthority,
    pub stats: Arc<CounterStats>,
    pub logging_configuration: LoggingConfiguration,
}

pub struct CertwrightSettings {
    pub authority: CertificateAuthority,
    pub stats: Arc<CounterStats>,
    pub log_receiver: Receiver<Log>,
    pub logging_configuration: LoggingConfiguration,
    /// Path to a PEM or DER certificate request
    pub csr_path: String,
    pub registration_id: i64,
    /// Where to write the PEM certificate, stdout if None
    pub output: Option<String>,
}

pub enum ConfigurationError {
    FileError,
    ParsingError,
    NoSerialPrefix,
    InvalidAuthority(String),
    ProfileNotDefined(String),
    InvalidProfile(String),
    IssuerNotDefined(String),
    SigningMechanismError(String, SigningError),
    StorageError(StorageError),
    InvalidArgument(String),
    ValidateOnly,
}

impl From<StorageError> for ConfigurationError {
    fn from(e: StorageError) -> ConfigurationError {
        ConfigurationError::StorageError(e)
    }
}

impl std::error::Error for ConfigurationError {}

impl std::fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileError => write!(f, "Could not read configuration file"),
            Self::ParsingError => write!(f, "Could not parse the configuration file"),
            Self::NoSerialPrefix => write!(f, "The serial prefix must be a non-zero byte"),
            Self::InvalidAuthority(e) => write!(f, "Invalid authority configuration: {}", e),
            Self::ProfileNotDefined(name) => {
                write!(f, "The profile {} did not have a matching configuration", name)
            }
            Self::InvalidProfile(e) => write!(f, "Invalid profile: {}", e),
            Self::IssuerNotDefined(name) => {
                write!(f, "The issuer {} did not have a matching configuration", name)
            }
            Self::SigningMechanismError(name, e) => write!(f, "Issuer {}: {}", name, e),
            Self::StorageError(e) => write!(f, "{}", e),
            Self::InvalidArgument(e) => write!(f, "Invalid argument: {}", e),
            Self::ValidateOnly => write!(f, "Configuration was validated"),
        }
    }
}

impl std::fmt::Debug for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl Configuration {
    pub fn from_toml(config: &[u8]) -> Result<Self, ConfigurationError> {
        toml::from_slice(config).map_err(|e| {
            error!("Failed to parse config: {}", e);
            ConfigurationError::ParsingError
        })
    }

    /// Load every issuer, open storage and assemble the authority
    pub async fn into_authority(
        self,
        log_sender: Sender<Log>,
    ) -> Result<Authority, ConfigurationError> {
        let mut issuers = vec![];
        for (name, issuer_config) in self.issuers {
            let issuer = Issuer::from_config(&name, issuer_config)
                .await
                .map_err(|e| ConfigurationError::SigningMechanismError(name.clone(), e))?;
            issuers.push(issuer);
        }

        let stats = Arc::new(CounterStats::new());
        let collaborators = Collaborators {
            policy: Arc::new(HostnamePolicy::new(self.policy)),
            storage: self.storage.into_storage()?,
            stats: stats.clone(),
            clock: Arc::new(SystemClock),
            log_sender,
        };

        let authority = CertificateAuthority::new(
            self.authority,
            self.key_policy,
            self.profiles,
            issuers,
            collaborators,
        )?;

        Ok(Authority {
            authority,
            stats,
            logging_configuration: self.logging,
        })
    }
}

pub async fn configure() -> Result<CertwrightSettings, ConfigurationError> {
    let matches = Command::new("certwright")
        .version(env!("CARGO_PKG_VERSION"))
        .about("certwright issues X509 certificates for validated certificate requests")
        .arg(
            Arg::new("config")
                .help("Path to certwright configuration toml file")
                .long("config")
                .default_value("/etc/certwright/certwright.toml")
                .takes_value(true),
        )
        .arg(
            Arg::new("validate")
                .help(
                    "Only validate the configuration and then quit. \
                     Useful for testing configuration changes.",
                )
                .long("validate-config")
                .short('v')
                .takes_value(false),
        )
        .arg(
            Arg::new("csr")
                .help("Path to the certificate request to issue for, PEM or DER")
                .long("csr")
                .required_unless_present("validate")
                .takes_value(true),
        )
        .arg(
            Arg::new("registration-id")
                .help("The account the certificate is issued to")
                .long("registration-id")
                .default_value("0")
                .takes_value(true),
        )
        .arg(
            Arg::new("output")
                .help("Where to write the PEM certificate. Defaults to stdout.")
                .long("output")
                .short('o')
                .takes_value(true),
        )
        .get_matches();

    // Read the configuration file
    let config_path = matches.value_of("config").unwrap_or("/etc/certwright/certwright.toml");
    let config = match tokio::fs::read(config_path).await {
        Ok(config) => config,
        Err(_) => return Err(ConfigurationError::FileError),
    };

    // Parse the TOML into our configuration structures
    let config = Configuration::from_toml(&config)?;

    let registration_id = matches
        .value_of("registration-id")
        .unwrap_or("0")
        .parse::<i64>()
        .map_err(|e| ConfigurationError::InvalidArgument(format!("registration-id: {}", e)))?;

    let (log_sender, log_receiver) = unbounded();
    let authority = config.into_authority(log_sender).await?;

    if matches.is_present("validate") {
        return Err(ConfigurationError::ValidateOnly);
    }

    let csr_path = matches
        .value_of("csr")
        .ok_or_else(|| ConfigurationError::InvalidArgument(String::from("--csr is required")))?
        .to_string();

    Ok(CertwrightSettings {
        authority: authority.authority,
        stats: authority.stats,
        log_receiver,
        logging_configuration: authority.logging_configuration,
        csr_path,
        registration_id,
        output: matches.value_of("output").map(String::from),
    })
}

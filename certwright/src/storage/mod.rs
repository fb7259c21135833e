#[cfg(feature = "local-db")]
pub mod database;
pub mod memory;

pub use memory::MemoryStorage;

use async_trait::async_trait;
use ring::digest;
use serde::Deserialize;
use time::OffsetDateTime;

use std::sync::Arc;

/// A certificate that has been signed and is waiting to be, or has been,
/// persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedCertificate {
    pub der: Vec<u8>,
    /// Lower-case hex of the serial, the storage key
    pub serial: String,
    pub registration_id: i64,
    /// Name of the issuer that signed the certificate
    pub issuer: String,
    /// Lower-case hex SHA-256 of `der`
    pub digest: String,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl IssuedCertificate {
    pub fn new(
        der: Vec<u8>,
        serial: String,
        registration_id: i64,
        issuer: &str,
        not_before: OffsetDateTime,
        not_after: OffsetDateTime,
    ) -> Self {
        let digest = hex::encode(digest::digest(&digest::SHA256, &der));
        Self {
            der,
            serial,
            registration_id,
            issuer: issuer.to_string(),
            digest,
            not_before,
            not_after,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OcspStatus {
    Good,
    Revoked,
}

impl OcspStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcspStatus::Good => "good",
            OcspStatus::Revoked => "revoked",
        }
    }
}

impl std::str::FromStr for OcspStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "good" => Ok(OcspStatus::Good),
            "revoked" => Ok(OcspStatus::Revoked),
            other => Err(StorageError::Unavailable(format!(
                "unknown certificate status: {}",
                other
            ))),
        }
    }
}

/// Revocation bookkeeping for a certificate. Every stored certificate has
/// exactly one of these.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateStatus {
    pub serial: String,
    pub status: OcspStatus,
    pub subscriber_approved: bool,
    pub last_updated: OffsetDateTime,
}

impl CertificateStatus {
    /// The status written alongside a freshly issued certificate
    pub fn initial(serial: &str, now: OffsetDateTime) -> Self {
        Self {
            serial: serial.to_string(),
            status: OcspStatus::Good,
            subscriber_approved: false,
            last_updated: now,
        }
    }
}

#[derive(Debug)]
pub enum StorageError {
    DuplicateSerial(String),
    NotFound(String),
    Unavailable(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::DuplicateSerial(s) => {
                write!(f, "A certificate with serial {} is already stored", s)
            }
            StorageError::NotFound(s) => write!(f, "No certificate with serial {}", s),
            StorageError::Unavailable(e) => write!(f, "Certificate storage is unavailable: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

/// Where issued certificates are recorded. `add_certificate` must write the
/// certificate and its initial status together or not at all.
#[async_trait]
pub trait StorageAuthority {
    async fn add_certificate(&self, certificate: &IssuedCertificate) -> Result<(), StorageError>;
    async fn get_certificate(&self, serial: &str) -> Result<IssuedCertificate, StorageError>;
    async fn get_certificate_status(&self, serial: &str) -> Result<CertificateStatus, StorageError>;
}

#[derive(Default, Deserialize)]
pub struct StorageConfiguration {
    #[cfg(feature = "local-db")]
    pub database: Option<database::Config>,
}

impl StorageConfiguration {
    pub fn into_storage(self) -> Result<Arc<dyn StorageAuthority + Send + Sync>, StorageError> {
        #[cfg(feature = "local-db")]
        if let Some(config) = self.database {
            println!("Certificates stored in local database at: {}", &config.path);
            return Ok(Arc::new(database::DatabaseStorage::new(config)?));
        }

        println!("Certificates stored in memory only");
        Ok(Arc::new(MemoryStorage::new()))
    }
}

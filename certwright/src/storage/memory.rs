use super::{CertificateStatus, IssuedCertificate, StorageAuthority, StorageError};

use async_trait::async_trait;
use time::OffsetDateTime;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Tables {
    certificates: HashMap<String, IssuedCertificate>,
    statuses: HashMap<String, CertificateStatus>,
}

/// Keeps everything in process. Both tables sit behind one lock so a
/// certificate and its status are always written together.
#[derive(Default)]
pub struct MemoryStorage {
    tables: Mutex<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables
            .lock()
            .map_err(|_| StorageError::Unavailable(String::from("storage lock poisoned")))
    }

    pub fn len(&self) -> usize {
        self.tables().map(|t| t.certificates.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StorageAuthority for MemoryStorage {
    async fn add_certificate(&self, certificate: &IssuedCertificate) -> Result<(), StorageError> {
        let mut tables = self.tables()?;
        if tables.certificates.contains_key(&certificate.serial) {
            return Err(StorageError::DuplicateSerial(certificate.serial.clone()));
        }

        let now = OffsetDateTime::now_utc();
        let status = CertificateStatus::initial(&certificate.serial, now);
        tables.statuses.insert(certificate.serial.clone(), status);
        tables.certificates.insert(certificate.serial.clone(), certificate.clone());
        Ok(())
    }

    async fn get_certificate(&self, serial: &str) -> Result<IssuedCertificate, StorageError> {
        self.tables()?
            .certificates
            .get(serial)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(serial.to_string()))
    }

    async fn get_certificate_status(
        &self,
        serial: &str,
    ) -> Result<CertificateStatus, StorageError> {
        self.tables()?
            .statuses
            .get(serial)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(serial.to_string()))
    }
}

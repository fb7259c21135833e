pub mod models;
pub mod schema;

use super::{CertificateStatus, IssuedCertificate, OcspStatus, StorageAuthority, StorageError};

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sqlite::SqliteConnection;
use serde::Deserialize;
use time::OffsetDateTime;

use std::sync::{Mutex, MutexGuard};

const CREATE_TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS certificates (
        serial TEXT PRIMARY KEY NOT NULL,
        registration_id BIGINT NOT NULL,
        issuer TEXT NOT NULL,
        digest TEXT NOT NULL,
        der BLOB NOT NULL,
        not_before BIGINT NOT NULL,
        not_after BIGINT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS certificate_status (
        serial TEXT PRIMARY KEY NOT NULL,
        status TEXT NOT NULL,
        subscriber_approved BOOLEAN NOT NULL,
        last_updated BIGINT NOT NULL
    )",
];

#[derive(Deserialize)]
pub struct Config {
    /// Path of the SQLite database, created if it does not exist
    pub path: String,
}

/// Stores certificates in a local SQLite database
pub struct DatabaseStorage {
    connection: Mutex<SqliteConnection>,
}

fn unavailable<E: ToString>(e: E) -> StorageError {
    StorageError::Unavailable(e.to_string())
}

fn timestamp(seconds: i64) -> Result<OffsetDateTime, StorageError> {
    OffsetDateTime::from_unix_timestamp(seconds).map_err(unavailable)
}

impl DatabaseStorage {
    pub fn new(config: Config) -> Result<Self, StorageError> {
        let mut connection = SqliteConnection::establish(&config.path)
            .map_err(|e| unavailable(format!("could not open {}: {}", config.path, e)))?;

        for statement in CREATE_TABLES {
            diesel::sql_query(*statement).execute(&mut connection).map_err(unavailable)?;
        }

        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn connection(&self) -> Result<MutexGuard<'_, SqliteConnection>, StorageError> {
        self.connection
            .lock()
            .map_err(|_| StorageError::Unavailable(String::from("database lock poisoned")))
    }
}

#[async_trait]
impl StorageAuthority for DatabaseStorage {
    async fn add_certificate(&self, certificate: &IssuedCertificate) -> Result<(), StorageError> {
        let row = models::Certificate {
            serial: certificate.serial.clone(),
            registration_id: certificate.registration_id,
            issuer: certificate.issuer.clone(),
            digest: certificate.digest.clone(),
            der: certificate.der.clone(),
            not_before: certificate.not_before.unix_timestamp(),
            not_after: certificate.not_after.unix_timestamp(),
        };

        let status = models::CertificateStatus {
            serial: certificate.serial.clone(),
            status: OcspStatus::Good.as_str().to_string(),
            subscriber_approved: false,
            last_updated: OffsetDateTime::now_utc().unix_timestamp(),
        };

        let mut conn = self.connection()?;
        let result = conn.transaction::<_, DieselError, _>(|conn| {
            diesel::insert_into(schema::certificates::table).values(&row).execute(conn)?;
            diesel::insert_into(schema::certificate_status::table).values(&status).execute(conn)?;
            Ok(())
        });

        match result {
            Ok(()) => Ok(()),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Err(StorageError::DuplicateSerial(certificate.serial.clone()))
            }
            Err(e) => Err(unavailable(e)),
        }
    }

    async fn get_certificate(&self, serial: &str) -> Result<IssuedCertificate, StorageError> {
        use schema::certificates::dsl;

        let mut conn = self.connection()?;
        let row = dsl::certificates
            .filter(dsl::serial.eq(serial))
            .first::<models::Certificate>(&mut *conn)
            .optional()
            .map_err(unavailable)?
            .ok_or_else(|| StorageError::NotFound(serial.to_string()))?;

        Ok(IssuedCertificate {
            der: row.der,
            serial: row.serial,
            registration_id: row.registration_id,
            issuer: row.issuer,
            digest: row.digest,
            not_before: timestamp(row.not_before)?,
            not_after: timestamp(row.not_after)?,
        })
    }

    async fn get_certificate_status(
        &self,
        serial: &str,
    ) -> Result<CertificateStatus, StorageError> {
        use schema::certificate_status::dsl;

        let mut conn = self.connection()?;
        let row = dsl::certificate_status
            .filter(dsl::serial.eq(serial))
            .first::<models::CertificateStatus>(&mut *conn)
            .optional()
            .map_err(unavailable)?
            .ok_or_else(|| StorageError::NotFound(serial.to_string()))?;

        Ok(CertificateStatus {
            serial: row.serial,
            status: row.status.parse()?,
            subscriber_approved: row.subscriber_approved,
            last_updated: timestamp(row.last_updated)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> DatabaseStorage {
        DatabaseStorage::new(Config {
            path: String::from(":memory:"),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn round_trips_through_sqlite() {
        let storage = storage();
        let now = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let certificate =
            IssuedCertificate::new(vec![0x30, 0x00], String::from("11ff"), 7, "primary", now, now);

        storage.add_certificate(&certificate).await.unwrap();
        assert_eq!(storage.get_certificate("11ff").await.unwrap(), certificate);

        let status = storage.get_certificate_status("11ff").await.unwrap();
        assert_eq!(status.status, OcspStatus::Good);
        assert!(!status.subscriber_approved);

        assert!(matches!(
            storage.add_certificate(&certificate).await,
            Err(StorageError::DuplicateSerial(_))
        ));
        assert!(matches!(storage.get_certificate("00").await, Err(StorageError::NotFound(_))));
    }
}

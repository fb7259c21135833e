use super::schema::{certificate_status, certificates};

use diesel::prelude::*;

#[derive(Queryable, Insertable)]
#[diesel(table_name = certificates)]
pub struct Certificate {
    pub serial: String,
    pub registration_id: i64,
    pub issuer: String,
    pub digest: String,
    pub der: Vec<u8>,
    /// Unix seconds
    pub not_before: i64,
    /// Unix seconds
    pub not_after: i64,
}

#[derive(Queryable, Insertable)]
#[diesel(table_name = certificate_status)]
pub struct CertificateStatus {
    pub serial: String,
    pub status: String,
    pub subscriber_approved: bool,
    pub last_updated: i64,
}

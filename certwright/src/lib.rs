#[macro_use]
extern crate log;

pub mod authority;
pub mod config;
pub mod csr;
pub mod error;
pub mod extensions;
pub mod key_policy;
pub mod logging;
pub mod names;
pub mod oid;
pub mod policy;
pub mod profile;
pub mod serial;
pub mod signing;
pub mod stats;
pub mod storage;

pub use authority::{CertificateAuthority, Collaborators};
pub use error::IssuanceError;

pub mod file;
mod template;

pub use template::CertificateTemplate;

use async_trait::async_trait;
use rcgen::{CertificateParams, SubjectPublicKeyInfo};
use serde::Deserialize;
use time::OffsetDateTime;
use tokio::sync::Mutex;

#[derive(Debug)]
pub enum SigningError {
    AccessError(String),
    ParsingError(String),
    KeyMismatch,
    InvalidTemplate(String),
    SigningFailure(String),
}

impl std::fmt::Display for SigningError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SigningError::AccessError(e) => {
                write!(f, "Could not access the private key material: {}", e)
            }
            SigningError::ParsingError(e) => {
                write!(f, "Could not parse the issuer key material: {}", e)
            }
            SigningError::KeyMismatch => {
                write!(f, "The issuer private key does not match the issuer certificate")
            }
            SigningError::InvalidTemplate(e) => {
                write!(f, "Could not build the certificate template: {}", e)
            }
            SigningError::SigningFailure(e) => {
                write!(f, "The signing operation on the provided certificate failed: {}", e)
            }
        }
    }
}

impl std::error::Error for SigningError {}

/// A signing backend. Any code that wants to hold issuer key material
/// (files, hardware tokens, remote services) implements this.
#[async_trait]
pub trait Signer {
    /// Sign the fully decided parameters for `subject_key` and return the
    /// DER of the new certificate
    async fn sign(
        &self,
        params: CertificateParams,
        subject_key: &SubjectPublicKeyInfo,
    ) -> Result<Vec<u8>, SigningError>;

    /// The end of the signing certificate's validity
    fn not_after(&self) -> OffsetDateTime;
}

/// Turns a configuration block into a usable signer
#[async_trait]
pub trait SignerConfig {
    async fn into_signer(self) -> Result<Box<dyn Signer + Send + Sync>, SigningError>;
}

#[derive(Deserialize)]
pub struct IssuerConfiguration {
    /// Set for backends that cannot sign more than one certificate at a
    /// time
    #[serde(default)]
    pub serialize_signing: bool,
    pub file: file::Config,
}

/// A signing key together with its certificate, addressed by name from
/// issuance profiles.
pub struct Issuer {
    name: String,
    signer: Box<dyn Signer + Send + Sync>,
    signing_lock: Option<Mutex<()>>,
}

impl Issuer {
    pub fn new(name: &str, signer: Box<dyn Signer + Send + Sync>, serialize_signing: bool) -> Self {
        Self {
            name: name.to_string(),
            signer,
            signing_lock: if serialize_signing { Some(Mutex::new(())) } else { None },
        }
    }

    pub async fn from_config(
        name: &str,
        config: IssuerConfiguration,
    ) -> Result<Self, SigningError> {
        let signer = config.file.into_signer().await?;
        Ok(Self::new(name, signer, config.serialize_signing))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn not_after(&self) -> OffsetDateTime {
        self.signer.not_after()
    }

    /// Sign a certificate. Failures are returned as is; nothing here is
    /// retried.
    pub async fn sign(&self, template: &CertificateTemplate<'_>) -> Result<Vec<u8>, SigningError> {
        let (params, subject_key) = template.to_params()?;

        let _guard = match &self.signing_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        self.signer.sign(params, &subject_key).await
    }

    pub fn print_signing_info(&self) {
        println!(
            "Issuer {} valid until {}{}",
            self.name,
            self.not_after(),
            if self.signing_lock.is_some() { " (serialized signing)" } else { "" }
        );
    }
}

//! The file signer uses a private key stored inside the certwright
//! configuration, next to the PEM certificate it belongs to. It supports
//! whatever key types rcgen can sign with: ECDSA P-256/P-384, Ed25519 and
//! RSA.

use super::{Signer, SignerConfig, SigningError};

use async_trait::async_trait;
use pki_types::CertificateDer;
use rcgen::{Certificate, CertificateParams, KeyPair, SubjectPublicKeyInfo};
use serde::Deserialize;
use time::OffsetDateTime;
use x509_parser::prelude::{FromDer, X509Certificate};

#[derive(Deserialize)]
pub struct Config {
    /// Base64 encoded PKCS#8 DER private key of the issuer
    key: String,
    /// PEM encoded certificate of the issuer
    certificate: String,
}

pub struct FileSigner {
    key_pair: KeyPair,
    /// The issuer certificate as rcgen needs it to sign. Only its subject
    /// and key identifier end up in issued certificates.
    issuer: Certificate,
    not_after: OffsetDateTime,
}

fn parsing_error<E: ToString>(e: E) -> SigningError {
    SigningError::ParsingError(e.to_string())
}

impl FileSigner {
    pub fn new(key_der: &[u8], certificate_pem: &str) -> Result<Self, SigningError> {
        let key_pair = KeyPair::try_from(key_der).map_err(parsing_error)?;

        let certificate = ::pem::parse(certificate_pem).map_err(parsing_error)?;
        if certificate.tag() != "CERTIFICATE" {
            return Err(parsing_error(format!("unexpected PEM block: {}", certificate.tag())));
        }
        let certificate_der = certificate.contents().to_vec();

        let (_, parsed) = X509Certificate::from_der(&certificate_der).map_err(parsing_error)?;

        if parsed.public_key().subject_public_key.data.as_ref() != key_pair.public_key_raw() {
            return Err(SigningError::KeyMismatch);
        }

        let not_after = parsed.validity().not_after.to_datetime();

        let issuer_der = CertificateDer::from(certificate_der.as_slice());
        let issuer = CertificateParams::from_ca_cert_der(&issuer_der)
            .and_then(|params| params.self_signed(&key_pair))
            .map_err(parsing_error)?;

        Ok(Self {
            key_pair,
            issuer,
            not_after,
        })
    }
}

#[async_trait]
impl Signer for FileSigner {
    async fn sign(
        &self,
        params: CertificateParams,
        subject_key: &SubjectPublicKeyInfo,
    ) -> Result<Vec<u8>, SigningError> {
        params
            .signed_by(subject_key, &self.issuer, &self.key_pair)
            .map(|certificate| certificate.der().to_vec())
            .map_err(|e| SigningError::SigningFailure(e.to_string()))
    }

    fn not_after(&self) -> OffsetDateTime {
        self.not_after
    }
}

#[async_trait]
impl SignerConfig for Config {
    async fn into_signer(self) -> Result<Box<dyn Signer + Send + Sync>, SigningError> {
        let key_bytes = base64::decode(&self.key).map_err(parsing_error)?;
        Ok(Box::new(FileSigner::new(&key_bytes, &self.certificate)?))
    }
}

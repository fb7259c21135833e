use crate::oid::{self, ObjectIdentifier};

use x509_parser::prelude::{
    FromDer, GeneralName, ParsedCriAttribute, ParsedExtension, SubjectPublicKeyInfo,
    X509CertificationRequest,
};
use x509_parser::public_key::PublicKey;

// Real world CSRs for a handful of names and a 4096 bit key sit well
// under 4 KiB. Anything past this is not a request we want to parse.
const CSR_MAX_SIZE: usize = 1024 * 16; // 16 KiB

/// Request signature algorithms we are willing to verify. SHA-1 and MD5
/// based signatures are refused outright.
const ACCEPTED_SIGNATURE_ALGORITHMS: &[&[u64]] = &[
    oid::SHA256_WITH_RSA,
    oid::SHA384_WITH_RSA,
    oid::SHA512_WITH_RSA,
    oid::ECDSA_WITH_SHA256,
    oid::ECDSA_WITH_SHA384,
    oid::ECDSA_WITH_SHA512,
];

#[derive(Debug)]
pub enum CsrError {
    TooLarge(usize),
    Decode(String),
    UnsupportedSignatureAlgorithm(String),
    InvalidSignature,
    BadSubject(String),
    UnsupportedIdentifier(String),
}

impl std::fmt::Display for CsrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CsrError::TooLarge(size) => {
                write!(f, "CSR of {} bytes exceeds the maximum of {} bytes", size, CSR_MAX_SIZE)
            }
            CsrError::Decode(e) => write!(f, "Could not decode CSR: {}", e),
            CsrError::UnsupportedSignatureAlgorithm(alg) => {
                write!(f, "Invalid signature algorithm in CSR: {}", alg)
            }
            CsrError::InvalidSignature => write!(f, "Invalid signature on CSR"),
            CsrError::BadSubject(e) => write!(f, "Could not read CSR subject: {}", e),
            CsrError::UnsupportedIdentifier(e) => {
                write!(f, "CSR requested an unsupported identifier: {}", e)
            }
        }
    }
}

impl std::error::Error for CsrError {}

/// Key algorithms that can be mapped to an issuance profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    Rsa,
    Ecdsa,
}

impl std::fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyAlgorithm::Rsa => write!(f, "RSA"),
            KeyAlgorithm::Ecdsa => write!(f, "ECDSA"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicKeyDetails {
    Rsa {
        modulus_bits: usize,
        /// None when the exponent does not fit into 64 bits
        exponent: Option<u64>,
    },
    Ecdsa {
        /// None when the curve is not given as a named curve
        curve: Option<ObjectIdentifier>,
        point: Vec<u8>,
    },
    Unsupported(String),
}

/// The subject public key of a request, both as the raw SubjectPublicKeyInfo
/// that ends up in the certificate and in the decoded form policy checks
/// operate on.
#[derive(Clone, Debug)]
pub struct SubjectPublicKey {
    pub spki_der: Vec<u8>,
    pub details: PublicKeyDetails,
}

impl SubjectPublicKey {
    pub fn from_spki(spki: &SubjectPublicKeyInfo<'_>) -> Self {
        let algorithm = ObjectIdentifier::from_parsed(&spki.algorithm.algorithm);
        let details = match (algorithm, spki.parsed()) {
            (Some(alg), Ok(PublicKey::RSA(rsa))) if alg.is(oid::RSA_ENCRYPTION) => {
                PublicKeyDetails::Rsa {
                    modulus_bits: rsa.key_size(),
                    exponent: rsa.try_exponent().ok(),
                }
            }
            (Some(alg), Ok(PublicKey::EC(point))) if alg.is(oid::EC_PUBLIC_KEY) => {
                let curve = spki
                    .algorithm
                    .parameters
                    .as_ref()
                    .and_then(|p| p.as_oid().ok())
                    .and_then(|c| ObjectIdentifier::from_parsed(&c));
                PublicKeyDetails::Ecdsa {
                    curve,
                    point: point.data().to_vec(),
                }
            }
            (Some(alg), _) => PublicKeyDetails::Unsupported(alg.to_string()),
            (None, _) => PublicKeyDetails::Unsupported(spki.algorithm.algorithm.to_id_string()),
        };

        SubjectPublicKey {
            spki_der: spki.raw.to_vec(),
            details,
        }
    }

    pub fn algorithm(&self) -> Option<KeyAlgorithm> {
        match self.details {
            PublicKeyDetails::Rsa { .. } => Some(KeyAlgorithm::Rsa),
            PublicKeyDetails::Ecdsa { .. } => Some(KeyAlgorithm::Ecdsa),
            PublicKeyDetails::Unsupported(_) => None,
        }
    }
}

/// A single extension taken from an extensionRequest attribute
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestedExtension {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    pub value: Vec<u8>,
}

/// A decoded PKCS#10 request whose self-signature has been verified.
#[derive(Clone, Debug)]
pub struct CertificateRequest {
    pub common_name: Option<String>,
    pub dns_names: Vec<String>,
    pub public_key: SubjectPublicKey,
    pub signature_algorithm: ObjectIdentifier,
    pub extensions: Vec<RequestedExtension>,
}

impl CertificateRequest {
    /// Decode a DER request. The order of checks matters: the signature
    /// algorithm is vetted before we spend any time verifying with it.
    pub fn from_der(der: &[u8]) -> Result<Self, CsrError> {
        if der.len() > CSR_MAX_SIZE {
            return Err(CsrError::TooLarge(der.len()));
        }

        let (rest, csr) = X509CertificationRequest::from_der(der).map_err(decode_error)?;
        if !rest.is_empty() {
            return Err(CsrError::Decode(String::from("trailing data after CSR")));
        }

        let algorithm = &csr.signature_algorithm.algorithm;
        let signature_algorithm = ObjectIdentifier::from_parsed(algorithm)
            .ok_or_else(|| CsrError::UnsupportedSignatureAlgorithm(algorithm.to_id_string()))?;

        if !ACCEPTED_SIGNATURE_ALGORITHMS.iter().any(|alg| signature_algorithm.is(alg)) {
            return Err(CsrError::UnsupportedSignatureAlgorithm(signature_algorithm.to_string()));
        }

        csr.verify_signature().map_err(|_| CsrError::InvalidSignature)?;

        let info = &csr.certification_request_info;

        let common_name = match info.subject.iter_common_name().next() {
            Some(cn) => {
                let cn = cn.as_str().map_err(|e| CsrError::BadSubject(e.to_string()))?;
                Some(cn.to_string())
            }
            None => None,
        };

        let mut extensions = vec![];
        for attribute in info.iter_attributes() {
            if let ParsedCriAttribute::ExtensionRequest(requested) = attribute.parsed_attribute() {
                for ext in requested.extensions.iter() {
                    let oid = ObjectIdentifier::from_parsed(&ext.oid).ok_or_else(|| {
                        let id = ext.oid.to_id_string();
                        decode_error(format!("unrepresentable extension OID {}", id))
                    })?;
                    extensions.push((oid, ext));
                }
            }
        }

        let mut dns_names = vec![];
        for (ext_oid, ext) in extensions.iter() {
            if !ext_oid.is(oid::SUBJECT_ALT_NAME) {
                continue;
            }
            let san = match ext.parsed_extension() {
                ParsedExtension::SubjectAlternativeName(san) => san,
                _ => return Err(decode_error("could not parse subjectAltName")),
            };
            for name in san.general_names.iter() {
                match name {
                    GeneralName::DNSName(dns) => dns_names.push(dns.to_string()),
                    other => return Err(CsrError::UnsupportedIdentifier(format!("{:?}", other))),
                }
            }
        }

        Ok(CertificateRequest {
            common_name,
            dns_names,
            public_key: SubjectPublicKey::from_spki(&info.subject_pki),
            signature_algorithm,
            extensions: extensions
                .into_iter()
                .map(|(oid, ext)| RequestedExtension {
                    oid,
                    critical: ext.critical,
                    value: ext.value.to_vec(),
                })
                .collect(),
        })
    }
}

fn decode_error<E: ToString>(e: E) -> CsrError {
    CsrError::Decode(e.to_string())
}

#![allow(dead_code)]

use certwright::authority::{
    AuthorityConfiguration, CertificateAuthority, Collaborators, FixedClock,
};
use certwright::config::ConfigurationError;
use certwright::key_policy::KeyPolicy;
use certwright::logging::Log;
use certwright::policy::hostname::{Config as HostnameConfig, HostnamePolicy};
use certwright::profile::IssuanceProfile;
use certwright::signing::file::FileSigner;
use certwright::signing::Issuer;
use certwright::stats::CounterStats;
use certwright::storage::{MemoryStorage, StorageAuthority};

use crossbeam_channel::{unbounded, Receiver, Sender};
use rcgen::{
    BasicConstraints, CertificateParams, CustomExtension, DistinguishedName, DnType, IsCa, KeyPair,
    KeyUsagePurpose, PKCS_ECDSA_P256_SHA256, PKCS_ECDSA_P384_SHA384,
};
use rsa::pkcs8::EncodePrivateKey;
use time::{Duration, OffsetDateTime};

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

pub const SERIAL_PREFIX: u8 = 17;
pub const ISSUER_NAME: &str = "intermediate";
pub const TLS_FEATURE: &[u64] = &[1, 3, 6, 1, 5, 5, 7, 1, 24];
pub const MUST_STAPLE: &[u8] = &[0x30, 0x03, 0x02, 0x01, 0x05];

pub const PROFILES: &str = r#"
[rsaEE]
issuer = "intermediate"
usages = ["digital signature", "key encipherment", "server auth"]
expiry_seconds = 31536000
backdate_seconds = 3600
ocsp_url = "http://ocsp.certwright.test"
issuer_url = "http://certwright.test/intermediate.der"
crl_url = "http://certwright.test/intermediate.crl"

[[rsaEE.policies]]
id = "2.23.140.1.2.1"

[ecdsaEE]
issuer = "intermediate"
usages = ["digital signature", "server auth"]
expiry_seconds = 31536000
backdate_seconds = 3600
ocsp_url = "http://ocsp.certwright.test"
allowed_extensions = ["1.2.3.4"]

[[ecdsaEE.policies]]
id = "2.23.140.1.2.1"
"#;

/// Knobs the integration tests turn on the authority
pub struct Options {
    pub serial_prefix: u8,
    pub max_names: usize,
    pub do_not_force_cn: bool,
    pub enable_must_staple: bool,
    pub issuer_lifetime: Duration,
    pub blocked_names: Vec<String>,
    pub key_policy: KeyPolicy,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            serial_prefix: SERIAL_PREFIX,
            max_names: 2,
            do_not_force_cn: true,
            enable_must_staple: false,
            issuer_lifetime: Duration::days(3650),
            blocked_names: vec![],
            key_policy: KeyPolicy::default(),
        }
    }
}

pub struct Harness {
    pub authority: Arc<CertificateAuthority>,
    pub storage: Arc<MemoryStorage>,
    pub stats: Arc<CounterStats>,
    pub logs: Receiver<Log>,
    /// DER of the issuer certificate
    pub issuer_der: Vec<u8>,
    pub now: OffsetDateTime,
}

/// A PKCS#8 DER key and PEM certificate for an intermediate that expires at
/// `not_after`
pub fn issuer_material(not_after: OffsetDateTime) -> (Vec<u8>, String) {
    let key_pair = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).unwrap();

    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name = DistinguishedName::new();
    params.distinguished_name.push(DnType::CommonName, "certwright test intermediate");
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
    ];
    params.not_before = OffsetDateTime::now_utc() - Duration::days(1);
    params.not_after = not_after;

    let certificate = params.self_signed(&key_pair).unwrap();
    (key_pair.serialize_der(), certificate.pem())
}

pub fn issuer(not_after: OffsetDateTime) -> (Issuer, Vec<u8>) {
    let (key, certificate) = issuer_material(not_after);
    let signer = FileSigner::new(&key, &certificate).unwrap();
    let issuer_der = pem::parse(&certificate).unwrap().contents().to_vec();
    (Issuer::new(ISSUER_NAME, Box::new(signer), false), issuer_der)
}

pub fn profiles() -> HashMap<String, IssuanceProfile> {
    toml::from_str(PROFILES).unwrap()
}

pub fn authority_configuration(options: &Options) -> AuthorityConfiguration {
    AuthorityConfiguration {
        serial_prefix: options.serial_prefix,
        max_names: options.max_names,
        do_not_force_cn: options.do_not_force_cn,
        enable_must_staple: options.enable_must_staple,
        rsa_profile: Some(String::from("rsaEE")),
        ecdsa_profile: Some(String::from("ecdsaEE")),
    }
}

pub fn authority(
    options: &Options,
    issuers: Vec<Issuer>,
    storage: Arc<dyn StorageAuthority + Send + Sync>,
    stats: Arc<CounterStats>,
    log_sender: Sender<Log>,
    now: OffsetDateTime,
) -> Result<CertificateAuthority, ConfigurationError> {
    let collaborators = Collaborators {
        policy: Arc::new(HostnamePolicy::new(HostnameConfig {
            blocked_names: options.blocked_names.clone(),
        })),
        storage,
        stats,
        clock: Arc::new(FixedClock(now)),
        log_sender,
    };

    CertificateAuthority::new(
        authority_configuration(options),
        options.key_policy.clone(),
        profiles(),
        issuers,
        collaborators,
    )
}

pub fn harness(options: Options) -> Harness {
    let now = OffsetDateTime::now_utc();
    let (issuer, issuer_der) = issuer(now + options.issuer_lifetime);
    let storage = Arc::new(MemoryStorage::new());
    let stats = Arc::new(CounterStats::new());
    let (log_sender, logs) = unbounded();

    let authority = authority(
        &options,
        vec![issuer],
        storage.clone(),
        stats.clone(),
        log_sender,
        now,
    )
    .unwrap();

    Harness {
        authority: Arc::new(authority),
        storage,
        stats,
        logs,
        issuer_der,
        now,
    }
}

fn rsa_key_der() -> &'static [u8] {
    static RSA_KEY: OnceLock<Vec<u8>> = OnceLock::new();
    RSA_KEY.get_or_init(|| {
        let mut rng = rand::thread_rng();
        let key = rsa::RsaPrivateKey::new(&mut rng, 2048).unwrap();
        key.to_pkcs8_der().unwrap().as_bytes().to_vec()
    })
}

pub fn ecdsa_key() -> KeyPair {
    KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).unwrap()
}

pub fn ecdsa_p384_key() -> KeyPair {
    KeyPair::generate_for(&PKCS_ECDSA_P384_SHA384).unwrap()
}

pub fn rsa_key() -> KeyPair {
    KeyPair::try_from(rsa_key_der()).unwrap()
}

/// Build and sign a CSR. Names go into the subjectAltName extension,
/// `extensions` into the extensionRequest next to it.
pub fn csr_with_key(
    key_pair: &KeyPair,
    common_name: Option<&str>,
    sans: &[&str],
    extensions: Vec<CustomExtension>,
) -> Vec<u8> {
    let sans: Vec<String> = sans.iter().map(|s| s.to_string()).collect();
    let mut params = CertificateParams::new(sans).unwrap();
    params.distinguished_name = DistinguishedName::new();
    if let Some(cn) = common_name {
        params.distinguished_name.push(DnType::CommonName, cn);
    }
    params.custom_extensions = extensions;
    params.serialize_request(key_pair).unwrap().der().to_vec()
}

pub fn csr(common_name: Option<&str>, sans: &[&str]) -> Vec<u8> {
    csr_with_key(&ecdsa_key(), common_name, sans, vec![])
}

pub fn csr_with_extensions(sans: &[&str], extensions: Vec<CustomExtension>) -> Vec<u8> {
    csr_with_key(&ecdsa_key(), None, sans, extensions)
}

pub fn tls_feature(value: &[u8]) -> CustomExtension {
    CustomExtension::from_oid_content(TLS_FEATURE, value.to_vec())
}

mod util;

use util::*;

use certwright::config::{Configuration, ConfigurationError};

use crossbeam_channel::unbounded;
use time::{Duration, OffsetDateTime};

fn configuration(serial_prefix: u8, key: &str, certificate: &str) -> String {
    format!(
        r#"
[authority]
serial_prefix = {}
max_names = 10
enable_must_staple = true
rsa_profile = "rsaEE"
ecdsa_profile = "ecdsaEE"

[key_policy]
min_rsa_bits = 2048

[policy]
blocked_names = ["blocked.test"]

{}

[issuers.intermediate]
serialize_signing = true

[issuers.intermediate.file]
key = "{}"
certificate = """
{}"""

[logging.stdout]
"#,
        serial_prefix,
        PROFILES.replace("[rsaEE", "[profiles.rsaEE").replace("[ecdsaEE", "[profiles.ecdsaEE"),
        key,
        certificate
    )
}

#[tokio::test]
async fn authority_from_toml_issues() {
    let (key, certificate) = issuer_material(OffsetDateTime::now_utc() + Duration::days(3650));
    let config = configuration(17, &base64::encode(key), &certificate);

    let config = Configuration::from_toml(config.as_bytes()).unwrap();
    let (log_sender, _logs) = unbounded();
    let built = config.into_authority(log_sender).await.unwrap();

    let issued = built
        .authority
        .issue_certificate(
            &csr_with_extensions(&["not-example.com"], vec![tls_feature(MUST_STAPLE)]),
            5,
        )
        .await
        .unwrap();
    assert!(issued.serial.starts_with("11"));
    assert_eq!(built.stats.get(certwright::stats::Counter::ExtensionTlsFeature), 1);

    let err = built
        .authority
        .issue_certificate(&csr(None, &["blocked.test"]), 5)
        .await
        .unwrap_err();
    assert!(err.is_malformed());
}

#[tokio::test]
async fn zero_prefix_in_toml_is_refused() {
    let (key, certificate) = issuer_material(OffsetDateTime::now_utc() + Duration::days(3650));
    let config = configuration(0, &base64::encode(key), &certificate);
    let config = Configuration::from_toml(config.as_bytes()).unwrap();
    let (log_sender, _logs) = unbounded();

    assert!(matches!(
        config.into_authority(log_sender).await,
        Err(ConfigurationError::NoSerialPrefix)
    ));
}

#[tokio::test]
async fn bad_issuer_key_is_refused() {
    let (_, certificate) = issuer_material(OffsetDateTime::now_utc() + Duration::days(3650));
    let (other_key, _) = issuer_material(OffsetDateTime::now_utc() + Duration::days(3650));
    let config = configuration(17, &base64::encode(other_key), &certificate);
    let config = Configuration::from_toml(config.as_bytes()).unwrap();
    let (log_sender, _logs) = unbounded();

    assert!(matches!(
        config.into_authority(log_sender).await,
        Err(ConfigurationError::SigningMechanismError(_, _))
    ));
}

#[test]
fn garbage_is_a_parsing_error() {
    assert!(matches!(
        Configuration::from_toml(b"[authority"),
        Err(ConfigurationError::ParsingError)
    ));
}

use super::SigningError;

use crate::extensions::CertificateExtension;
use crate::oid;
use crate::profile::{CertificatePolicy, IssuanceProfile, Usage};
use crate::serial::SerialNumber;

use rcgen::{
    CertificateParams, CrlDistributionPoint, CustomExtension, DistinguishedName, DnType, DnValue,
    ExtendedKeyUsagePurpose, Ia5String, IsCa, KeyUsagePurpose, PrintableString, SanType,
    SubjectPublicKeyInfo,
};
use time::OffsetDateTime;
use yasna::models::ObjectIdentifier as Asn1Oid;
use yasna::Tag;

/// Every decision about a certificate, taken before it is handed to an
/// issuer. Nothing in here is read from the request unchecked.
pub struct CertificateTemplate<'a> {
    pub serial: &'a SerialNumber,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
    /// Left out of the subject when empty
    pub common_name: &'a str,
    pub dns_names: &'a [String],
    /// DER SubjectPublicKeyInfo of the subscriber
    pub subject_public_key: &'a [u8],
    pub profile: &'a IssuanceProfile,
    pub extensions: &'a [CertificateExtension],
}

impl CertificateTemplate<'_> {
    pub fn to_params(&self) -> Result<(CertificateParams, SubjectPublicKeyInfo), SigningError> {
        let invalid = |e: rcgen::Error| SigningError::InvalidTemplate(e.to_string());

        let mut params = CertificateParams::default();
        params.serial_number = Some(self.serial.as_bytes().to_vec().into());
        params.not_before = self.not_before;
        params.not_after = self.not_after;

        let mut subject = DistinguishedName::new();
        if !self.common_name.is_empty() {
            subject.push(DnType::CommonName, self.common_name);
        }
        let serial_number = PrintableString::try_from(self.serial.to_hex()).map_err(invalid)?;
        subject.push(
            DnType::CustomDnType(oid::DN_SERIAL_NUMBER.to_vec()),
            DnValue::PrintableString(serial_number),
        );
        params.distinguished_name = subject;

        params.subject_alt_names = self
            .dns_names
            .iter()
            .map(|name| Ia5String::try_from(name.as_str()).map(SanType::DnsName))
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)?;

        params.is_ca = IsCa::ExplicitNoCa;
        params.use_authority_key_identifier_extension = true;

        for usage in self.profile.usages.iter() {
            match usage {
                Usage::DigitalSignature => {
                    params.key_usages.push(KeyUsagePurpose::DigitalSignature)
                }
                Usage::KeyEncipherment => params.key_usages.push(KeyUsagePurpose::KeyEncipherment),
                Usage::KeyAgreement => params.key_usages.push(KeyUsagePurpose::KeyAgreement),
                Usage::ServerAuth => {
                    params.extended_key_usages.push(ExtendedKeyUsagePurpose::ServerAuth)
                }
                Usage::ClientAuth => {
                    params.extended_key_usages.push(ExtendedKeyUsagePurpose::ClientAuth)
                }
            }
        }

        if let Some(crl_url) = &self.profile.crl_url {
            params.crl_distribution_points = vec![CrlDistributionPoint {
                uris: vec![crl_url.clone()],
            }];
        }

        if !self.profile.policies.is_empty() {
            params.custom_extensions.push(CustomExtension::from_oid_content(
                oid::CERTIFICATE_POLICIES,
                encode_certificate_policies(&self.profile.policies),
            ));
        }

        if let Some(aia) = encode_authority_info_access(
            self.profile.ocsp_url.as_deref(),
            self.profile.issuer_url.as_deref(),
        ) {
            params
                .custom_extensions
                .push(CustomExtension::from_oid_content(oid::AUTHORITY_INFO_ACCESS, aia));
        }

        for ext in self.extensions.iter() {
            let mut custom = CustomExtension::from_oid_content(ext.oid.arcs(), ext.value.clone());
            custom.set_criticality(ext.critical);
            params.custom_extensions.push(custom);
        }

        let subject_key = SubjectPublicKeyInfo::from_der(self.subject_public_key).map_err(invalid)?;

        Ok((params, subject_key))
    }
}

/// certificatePolicies, RFC 5280 4.2.1.4
fn encode_certificate_policies(policies: &[CertificatePolicy]) -> Vec<u8> {
    yasna::construct_der(|writer| {
        writer.write_sequence(|writer| {
            for policy in policies {
                writer.next().write_sequence(|writer| {
                    writer.next().write_oid(&Asn1Oid::from_slice(policy.id.arcs()));

                    if policy.cps_uri.is_none() && policy.user_notice.is_none() {
                        return;
                    }

                    writer.next().write_sequence(|writer| {
                        if let Some(uri) = &policy.cps_uri {
                            writer.next().write_sequence(|writer| {
                                writer.next().write_oid(&Asn1Oid::from_slice(oid::QT_CPS));
                                writer.next().write_ia5_string(uri);
                            });
                        }
                        if let Some(text) = &policy.user_notice {
                            writer.next().write_sequence(|writer| {
                                writer.next().write_oid(&Asn1Oid::from_slice(oid::QT_UNOTICE));
                                writer.next().write_sequence(|writer| {
                                    writer.next().write_utf8_string(text);
                                });
                            });
                        }
                    });
                });
            }
        });
    })
}

/// authorityInfoAccess, RFC 5280 4.2.2.1. None when there is nothing to
/// point at.
fn encode_authority_info_access(
    ocsp_url: Option<&str>,
    issuer_url: Option<&str>,
) -> Option<Vec<u8>> {
    let methods = [(oid::AD_OCSP, ocsp_url), (oid::AD_CA_ISSUERS, issuer_url)];
    let descriptions: Vec<(&[u64], &str)> = methods
        .into_iter()
        .filter_map(|(method, url)| url.map(|url| (method, url)))
        .collect();

    if descriptions.is_empty() {
        return None;
    }

    Some(yasna::construct_der(|writer| {
        writer.write_sequence(|writer| {
            for (method, url) in descriptions.iter() {
                writer.next().write_sequence(|writer| {
                    writer.next().write_oid(&Asn1Oid::from_slice(method));
                    // uniformResourceIdentifier [6] IA5String
                    writer.next().write_tagged_implicit(Tag::context(6), |writer| {
                        writer.write_ia5_string(url)
                    });
                });
            }
        });
    }))
}

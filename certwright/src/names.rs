use crate::error::IssuanceError;
use crate::policy::{PolicyAuthority, PolicyError};

/// RFC 5280 upper bound for the commonName attribute
pub const MAX_COMMON_NAME_LENGTH: usize = 64;

/// The identity a certificate will be issued for, after normalization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedNames {
    /// Empty when the request had no CN and the CA does not force one
    pub common_name: String,
    /// Lower-cased and deduplicated, in the order first seen
    pub names: Vec<String>,
}

/// Lower-case and deduplicate the requested identifiers and enforce the
/// count and length limits. The CN, when present, is part of the name set
/// and is seen before any SAN.
pub fn normalize(
    requested_cn: Option<&str>,
    requested_sans: &[String],
    max_names: usize,
    do_not_force_cn: bool,
) -> Result<NormalizedNames, IssuanceError> {
    let mut common_name = requested_cn.map(str::to_lowercase).unwrap_or_default();

    // Names reach the policy authority as requested, apart from case
    let mut names: Vec<String> = vec![];
    let candidates = std::iter::once(common_name.clone())
        .chain(requested_sans.iter().map(|name| name.to_lowercase()));
    for name in candidates {
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }

    if names.is_empty() {
        return Err(IssuanceError::malformed("Cannot issue a certificate without a domain name"));
    }

    if common_name.is_empty() && !do_not_force_cn {
        common_name = names[0].clone();
    }

    if common_name.len() > MAX_COMMON_NAME_LENGTH {
        return Err(IssuanceError::malformed(format!(
            "Common name is {} bytes, the maximum is {}",
            common_name.len(),
            MAX_COMMON_NAME_LENGTH
        )));
    }

    if names.len() > max_names {
        return Err(IssuanceError::malformed(format!(
            "Certificate request has {} names, the maximum is {}",
            names.len(),
            max_names
        )));
    }

    Ok(NormalizedNames { common_name, names })
}

/// Ask the policy authority about every name. The first rejection wins.
pub async fn approve_names(
    policy: &(dyn PolicyAuthority + Send + Sync),
    names: &NormalizedNames,
) -> Result<(), PolicyError> {
    for name in names.names.iter() {
        policy.approve(name).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;


    use async_trait::async_trait;

    fn sans(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn cn_and_sans() {
        let normalized = normalize(
            Some("not-example.com"),
            &sans(&["not-example.com", "www.not-example.com"]),
            2,
            true,
        )
        .unwrap();
        assert_eq!(normalized.common_name, "not-example.com");
        assert_eq!(normalized.names, vec!["not-example.com", "www.not-example.com"]);
    }

    #[test]
    fn cn_only_becomes_a_name() {
        let normalized = normalize(Some("not-example.com"), &[], 2, true).unwrap();
        assert_eq!(normalized.names, vec!["not-example.com"]);
    }

    #[test]
    fn duplicates_collapse() {
        let requested = sans(&["a.example.com", "a.example.com"]);
        let normalized = normalize(None, &requested, 2, true).unwrap();
        assert_eq!(normalized.names, vec!["a.example.com"]);
        assert_eq!(normalized.common_name, "");
    }

    #[test]
    fn case_insensitive() {
        let normalized = normalize(
            Some("CapiTalizedLetters.com"),
            &sans(&["moreCAPs.com", "morecaps.com", "evenMOREcaps.com", "Capitalizedletters.COM"]),
            3,
            true,
        )
        .unwrap();
        assert_eq!(normalized.common_name, "capitalizedletters.com");
        assert_eq!(
            normalized.names,
            vec!["capitalizedletters.com", "morecaps.com", "evenmorecaps.com"]
        );
    }

    #[test]
    fn forced_cn_uses_first_name() {
        let requested = sans(&["b.example.com", "a.example.com"]);
        let normalized = normalize(None, &requested, 2, false).unwrap();
        assert_eq!(normalized.common_name, "b.example.com");

        let normalized = normalize(None, &sans(&["b.example.com"]), 2, true).unwrap();
        assert_eq!(normalized.common_name, "");
    }

    #[test]
    fn no_names() {
        assert!(normalize(None, &[], 2, true).unwrap_err().is_malformed());
        assert!(normalize(Some(""), &sans(&[""]), 2, false).unwrap_err().is_malformed());
    }

    #[test]
    fn too_many_names() {
        let err = normalize(
            None,
            &sans(&["not-example.com", "www.not-example.com", "mail.example.com"]),
            2,
            true,
        )
        .unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn long_common_name() {
        let cn = format!("{}.com", "a".repeat(61));
        assert_eq!(cn.len(), 65);
        assert!(normalize(Some(&cn), &[], 2, true).unwrap_err().is_malformed());

        let cn = format!("{}.com", "a".repeat(60));
        assert!(normalize(Some(&cn), &[], 2, true).is_ok());
    }

    #[test]
    fn long_san_forced_into_cn() {
        let name = format!("{}.com", "a".repeat(61));
        assert!(normalize(None, &sans(&[&name]), 2, false).unwrap_err().is_malformed());
        assert!(normalize(None, &sans(&[&name]), 2, true).is_ok());
    }

    #[test]
    fn surrounding_whitespace_is_kept() {
        let requested = sans(&["not-example.com "]);
        let normalized = normalize(Some(" Not-Example.com"), &requested, 3, true).unwrap();
        assert_eq!(normalized.common_name, " not-example.com");
        assert_eq!(normalized.names, vec![" not-example.com", "not-example.com "]);
    }

    struct DenyList(Vec<&'static str>);

    #[async_trait]
    impl PolicyAuthority for DenyList {
        async fn approve(&self, identifier: &str) -> Result<(), PolicyError> {
            if self.0.contains(&identifier) {
                return Err(PolicyError::Rejected(identifier.to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn policy_rejection_is_malformed() {
        let policy = DenyList(vec!["www.not-example.com"]);
        let requested = sans(&["not-example.com", "www.not-example.com"]);
        let names = normalize(None, &requested, 2, true).unwrap();
        let err = approve_names(&policy, &names).await.unwrap_err();
        assert_eq!(err, PolicyError::Rejected(String::from("www.not-example.com")));
        assert!(IssuanceError::from(err).is_malformed());

        let names = normalize(None, &sans(&["not-example.com"]), 2, true).unwrap();
        assert!(approve_names(&policy, &names).await.is_ok());
    }
}

use super::{PolicyAuthority, PolicyError};

use async_trait::async_trait;
use serde::Deserialize;

use std::net::IpAddr;

const MAX_DNS_LENGTH: usize = 253;
const MAX_LABEL_LENGTH: usize = 63;

/// The configuration of the built in hostname policy
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Names the CA will never issue for. A name is blocked if it is equal
    /// to an entry or is a subdomain of one.
    #[serde(default)]
    pub blocked_names: Vec<String>,
}

/// A policy authority that only looks at the shape of a name and a static
/// blocklist. Deployments with a real policy service implement
/// `PolicyAuthority` on their own client instead.
pub struct HostnamePolicy {
    blocked_names: Vec<String>,
}

impl HostnamePolicy {
    pub fn new(config: Config) -> Self {
        Self {
            blocked_names: config
                .blocked_names
                .into_iter()
                .map(|name| name.trim_end_matches('.').to_lowercase())
                .collect(),
        }
    }

    fn check_syntax(identifier: &str) -> Result<(), PolicyError> {
        let reject =
            |reason: &str| Err(PolicyError::Rejected(format!("{} ({})", identifier, reason)));

        if identifier.is_empty() {
            return reject("empty name");
        }

        if identifier.len() > MAX_DNS_LENGTH {
            return reject("name too long");
        }

        if identifier.parse::<IpAddr>().is_ok() {
            return reject("IP addresses are not supported");
        }

        if identifier.starts_with("*.") {
            return reject("wildcard names are not supported");
        }

        let labels: Vec<&str> = identifier.split('.').collect();
        if labels.len() < 2 {
            return reject("name must have at least two labels");
        }

        for label in labels.iter() {
            if label.is_empty() || label.len() > MAX_LABEL_LENGTH {
                return reject("invalid label length");
            }

            if !label.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-') {
                return reject("invalid character in name");
            }

            if label.starts_with('-') || label.ends_with('-') {
                return reject("label starts or ends with a hyphen");
            }
        }

        // Guaranteed to exist by the label count check
        if let Some(tld) = labels.last() {
            if tld.bytes().all(|b| b.is_ascii_digit()) {
                return reject("top level domain is numeric");
            }
        }

        Ok(())
    }

    fn is_blocked(&self, identifier: &str) -> bool {
        self.blocked_names.iter().any(|blocked| {
            identifier == blocked || identifier.ends_with(&format!(".{}", blocked))
        })
    }
}

#[async_trait]
impl PolicyAuthority for HostnamePolicy {
    async fn approve(&self, identifier: &str) -> Result<(), PolicyError> {
        Self::check_syntax(identifier)?;

        if self.is_blocked(identifier) {
            return Err(PolicyError::Rejected(format!("{} (blocked)", identifier)));
        }

        Ok(())
    }
}

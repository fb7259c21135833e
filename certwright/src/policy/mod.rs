pub mod hostname;

pub use hostname::HostnamePolicy;

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The identifier is not one the CA is willing to issue for
    Rejected(String),
    /// The policy backend could not give an answer
    Unavailable(String),
}

impl std::fmt::Display for PolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyError::Rejected(e) => write!(f, "Policy forbids issuing for name: {}", e),
            PolicyError::Unavailable(e) => write!(f, "Policy authority unavailable: {}", e),
        }
    }
}

impl std::error::Error for PolicyError {}

/// Any code that decides whether the CA may issue for an identifier must
/// implement this trait. It is called once per normalized name.
#[async_trait]
pub trait PolicyAuthority {
    async fn approve(&self, identifier: &str) -> Result<(), PolicyError>;
}

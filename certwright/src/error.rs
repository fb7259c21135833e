use crate::csr::CsrError;
use crate::policy::PolicyError;
use crate::signing::SigningError;
use crate::storage::StorageError;

/// The two ways a single issuance can fail. Anything the requester could
/// fix by sending a different CSR is a `MalformedRequest`, anything caused
/// by the state or configuration of the CA is an `InternalServerError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssuanceError {
    MalformedRequest(String),
    InternalServerError(String),
}

impl IssuanceError {
    pub fn malformed<S: Into<String>>(detail: S) -> Self {
        IssuanceError::MalformedRequest(detail.into())
    }

    pub fn internal<S: Into<String>>(detail: S) -> Self {
        IssuanceError::InternalServerError(detail.into())
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, IssuanceError::MalformedRequest(_))
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, IssuanceError::InternalServerError(_))
    }
}

impl std::fmt::Display for IssuanceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssuanceError::MalformedRequest(e) => write!(f, "Malformed request: {}", e),
            IssuanceError::InternalServerError(e) => write!(f, "Internal server error: {}", e),
        }
    }
}

impl std::error::Error for IssuanceError {}

impl From<CsrError> for IssuanceError {
    fn from(e: CsrError) -> IssuanceError {
        IssuanceError::MalformedRequest(e.to_string())
    }
}

impl From<PolicyError> for IssuanceError {
    fn from(e: PolicyError) -> IssuanceError {
        match e {
            PolicyError::Rejected(_) => IssuanceError::MalformedRequest(e.to_string()),
            PolicyError::Unavailable(_) => {
                IssuanceError::internal("Could not check names against policy")
            }
        }
    }
}

// Backend detail is logged where the failure happens. Callers only learn
// which stage failed.
impl From<SigningError> for IssuanceError {
    fn from(_: SigningError) -> IssuanceError {
        IssuanceError::internal("Could not sign certificate")
    }
}

impl From<StorageError> for IssuanceError {
    fn from(_: StorageError) -> IssuanceError {
        IssuanceError::internal("Could not store certificate")
    }
}

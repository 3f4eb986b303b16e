use thiserror::Error;

use crate::validation::FieldError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("sign-in failed: your email domain is not on the allowlist")]
    DomainNotAllowed,
    #[error("identity error: {0}")]
    Identity(String),
    #[error("not authorized: {0}")]
    Unauthorized(String),
    #[error("{0}")]
    Validation(FieldError),
    #[error("{0}")]
    Mutation(String),
}

impl CoreError {
    /// Next action offered to the operator for this failure.
    pub fn next_action(&self) -> &'static str {
        match self {
            Self::DependencyUnavailable(_) => "retry",
            Self::Configuration(_) => "fix the configuration and retry",
            Self::DomainNotAllowed => "try a different account",
            Self::Identity(_) => "sign in again",
            Self::Unauthorized(_) => "sign out or contact support",
            Self::Validation(_) => "correct the highlighted field",
            Self::Mutation(_) => "correct the form and submit again",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DependencyUnavailable(_))
    }
}

impl From<FieldError> for CoreError {
    fn from(value: FieldError) -> Self {
        Self::Validation(value)
    }
}

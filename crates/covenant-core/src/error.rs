use thiserror::Error;

#[derive(Debug, Error)]
pub enum CovenantError {
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Upstream unavailable: {service} - {reason}")]
    UpstreamUnavailable { service: String, reason: String },

    #[error("Unknown loan: {0}")]
    UnknownLoan(String),

    #[error("Rate limit exceeded for '{key}'")]
    RateLimited { key: String },

    #[error("Audit chain broken at sequence {sequence}: {reason}")]
    AuditChainBroken { sequence: u64, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl CovenantError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CovenantError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True when the caller supplied something the engine cannot accept,
    /// as opposed to a collaborator or integrity failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CovenantError::InvalidInput { .. }
                | CovenantError::UnknownLoan(_)
                | CovenantError::RateLimited { .. }
                | CovenantError::SerializationError(_)
        )
    }
}

impl From<serde_json::Error> for CovenantError {
    fn from(e: serde_json::Error) -> Self {
        CovenantError::SerializationError(e.to_string())
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TxError {
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Persistence service is not started")]
    NotStarted,

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Transaction error: {0}")]
    TransactionError(String),

    #[error("Transaction required: {0}")]
    TransactionRequired(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("No interceptor registered for marker '{0}'")]
    UnknownMarker(String),

    #[error("Operation '{0}' returned without its target being invoked")]
    NotInvoked(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

impl TxError {
    /// True for failures raised by the persistence resource itself
    /// (session, transaction), as opposed to misuse of this crate.
    pub fn is_resource_error(&self) -> bool {
        matches!(
            self,
            TxError::SessionError(_)
                | TxError::TransactionError(_)
                | TxError::TransactionRequired(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TxError>;

impl<T> From<std::sync::PoisonError<T>> for TxError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<serde_json::Error> for TxError {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_errors_are_distinguished_from_misuse() {
        assert!(TxError::SessionError("closed".into()).is_resource_error());
        assert!(TxError::TransactionError("commit failed".into()).is_resource_error());
        assert!(TxError::TransactionRequired("none active".into()).is_resource_error());

        assert!(!TxError::NotStarted.is_resource_error());
        assert!(!TxError::LockError("poisoned".into()).is_resource_error());
        assert!(!TxError::UnknownMarker("audited".into()).is_resource_error());
    }
}

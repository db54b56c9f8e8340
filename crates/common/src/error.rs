//! Errors shared by the Volx crates

use thiserror::Error;

use crate::math::MathError;

#[derive(Error, Debug)]
pub enum Error {
    /// Account identity failed validation
    #[error("Invalid account: {0}")]
    InvalidAccount(String),

    #[error("Fixed-point arithmetic failed: {0}")]
    Math(#[from] MathError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_account(msg: impl Into<String>) -> Self {
        Self::InvalidAccount(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_math_error_converts() {
        let err: Error = MathError::Overflow.into();
        assert!(matches!(err, Error::Math(MathError::Overflow)));
        assert!(err.to_string().starts_with("Fixed-point arithmetic failed"));
    }

    #[test]
    fn test_invalid_account_message() {
        let err = Error::invalid_account("account name must not be empty");
        assert_eq!(err.to_string(), "Invalid account: account name must not be empty");
    }
}

use common::{Account, MathError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeeError {
    #[error("Account {0} may not update the turbulence indicator")]
    UnauthorizedUpdater(Account),

    #[error("Invalid fee parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Math(#[from] MathError),
}

pub type Result<T> = std::result::Result<T, FeeError>;

//! Errors the ledger can report to its callers.
//!
//! Validation problems (a malformed amount, a blank name) are reported as
//! [`InvalidAmount`] / [`InvalidInput`]; lookups of missing entities as
//! [`NotFound`]; duplicate creation as [`ExistingKey`].
//!
//! [`InvalidAmount`]: LedgerError::InvalidAmount
//! [`InvalidInput`]: LedgerError::InvalidInput
//! [`NotFound`]: LedgerError::NotFound
//! [`ExistingKey`]: LedgerError::ExistingKey
use thiserror::Error;

/// Ledger custom errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LedgerError {
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

//! Error types for the pawn ledger
//!
//! Errors are layered: [`ProtocolError`] is the closed set of domain
//! conditions the state machine rejects, each with a stable numeric code
//! for cross-boundary reporting. [`Error`] wraps those plus everything the
//! surrounding infrastructure (storage, serialization, actor) can fail with.

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Closed set of domain errors checked before any mutation.
///
/// Every precondition of the four protocol operations maps to exactly one of
/// these variants. All checks run before the first write is staged, so a
/// returned `ProtocolError` guarantees zero observable side effects.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ProtocolError {
    /// The loan already has an active lending entry
    #[error("loan already has an active lender")]
    LoanIsActive = 100,

    /// Caller identity does not match the loan's stored borrower
    #[error("caller is not the borrower of this loan")]
    BorrowerNotFound = 101,

    /// The loan is not in a state that permits this transition
    #[error("loan is not active")]
    LoanIsNotActive = 102,

    /// Checked arithmetic overflowed
    #[error("arithmetic overflow")]
    MathOverflow = 103,

    /// A loan record already exists for this (borrower, collateral) pair
    #[error("a loan for this borrower and collateral already exists")]
    DuplicateLoan = 104,

    /// Borrower does not hold the collateral unit
    #[error("borrower does not hold the collateral asset")]
    InsufficientCollateral = 105,

    /// Native currency balance is below the required amount
    #[error("insufficient native currency balance")]
    InsufficientFunds = 106,

    /// A config record already exists for this admin
    #[error("config is already initialized for this admin")]
    AlreadyInitialized = 107,
}

impl ProtocolError {
    /// Stable numeric code reported across the operation boundary.
    ///
    /// Codes are part of the external interface and never reassigned.
    pub fn code(&self) -> u32 {
        *self as u32
    }
}

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Domain precondition violation (stable-coded, no side effects)
    #[error("protocol error {}: {}", .0.code(), .0)]
    Protocol(#[from] ProtocolError),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// A record required by the operation does not exist
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// The request is malformed with respect to the records it names
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Domain error code, if this is a protocol rejection.
    pub fn protocol_code(&self) -> Option<u32> {
        match self {
            Error::Protocol(e) => Some(e.code()),
            _ => None,
        }
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ProtocolError::LoanIsActive.code(), 100);
        assert_eq!(ProtocolError::BorrowerNotFound.code(), 101);
        assert_eq!(ProtocolError::LoanIsNotActive.code(), 102);
        assert_eq!(ProtocolError::MathOverflow.code(), 103);
        assert_eq!(ProtocolError::DuplicateLoan.code(), 104);
        assert_eq!(ProtocolError::InsufficientCollateral.code(), 105);
        assert_eq!(ProtocolError::InsufficientFunds.code(), 106);
        assert_eq!(ProtocolError::AlreadyInitialized.code(), 107);
    }

    #[test]
    fn test_protocol_code_through_error() {
        let err = Error::from(ProtocolError::DuplicateLoan);
        assert_eq!(err.protocol_code(), Some(104));

        let err = Error::Storage("disk".to_string());
        assert_eq!(err.protocol_code(), None);
    }
}

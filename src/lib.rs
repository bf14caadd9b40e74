//! Pawn Ledger
//!
//! Collateralized lending over a keyed, durable ledger: a borrower deposits
//! one non-fungible collateral unit into a custodial escrow and opens a loan;
//! a lender funds the principal; the borrower repays principal plus fee to
//! recover the collateral.
//!
//! # Architecture
//!
//! - **Ledger Store**: every entity is a record at a deterministic address
//!   derived from stable seeds; commits are atomic batches
//! - **Escrow Custody**: collateral sits under a derived, off-curve address
//!   that provably has no signing key
//! - **Loan State Machine**: check every precondition, then stage and commit
//!   every write in one batch; no partially-applied state is ever observable
//! - **Single Writer**: one actor task owns all mutations and serializes
//!   conflicting operations
//!
//! # Invariants
//!
//! - A loan is `active` iff its collateral sits in escrow and no repayment
//!   was recorded
//! - At most one history entry per loan is Active at a time
//! - Principal never changes after deposit; history only grows
//! - An escrow holds the full collateral unit or nothing
//! - Fees are computed with checked arithmetic; overflow aborts the operation

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod address;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod protocol;
pub mod store;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, ProtocolError, Result};
pub use ledger::PawnLedger;
pub use types::{
    Address, AssetId, ConfigAccount, Escrow, Loan, LoanDetails, LoanStatus, Receipt,
};

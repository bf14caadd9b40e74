//! Core types for the pawn ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (u64 smallest-currency-unit amounts, checked everywhere)

use crate::error::{ProtocolError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Fee rate denominator: one basis point is 1/10_000.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Fee rate applied to every loan at config creation (30 bps = 0.30%).
pub const DEFAULT_FEE_BPS: u64 = 30;

/// 32-byte ledger address.
///
/// Either an identity (ed25519 public key held by an external signer) or a
/// derived record address (structurally off-curve, no signing key exists).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address([u8; 32]);

impl Address {
    /// Create from raw bytes
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Identity of one non-fungible collateral unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId([u8; 32]);

impl AssetId {
    /// Create from raw bytes
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Generate a fresh random asset identity
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl AsRef<[u8]> for AssetId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Global protocol parameters, one record per admin.
///
/// Created once by `initialize`; read-only input to the loan state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigAccount {
    /// Admin identity that owns this config
    pub admin: Address,

    /// Principal assigned to every new loan (smallest currency unit)
    pub default_loan_amount: u64,

    /// Fee rate in basis points (0..=10_000)
    pub fee_bps: u64,

    /// Derivation bump for this record's address
    pub bump: u8,
}

impl ConfigAccount {
    /// Fee owed on `principal` at this config's rate.
    ///
    /// Checked arithmetic; overflow aborts the caller's operation.
    pub fn fee_for(&self, principal: u64) -> Result<u64> {
        let fee = principal
            .checked_mul(self.fee_bps)
            .ok_or(ProtocolError::MathOverflow)?
            .checked_div(BPS_DENOMINATOR)
            .ok_or(ProtocolError::MathOverflow)?;
        Ok(fee)
    }
}

/// Lifecycle status of a single lending event, not of the loan record itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum LoanStatus {
    /// Lender has funded; repayment outstanding
    Active = 1,
    /// Repaid and settled
    Closed = 2,
}

/// One historical lending event within a loan's append-only history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanDetails {
    /// Monotonically assigned identifier (previous max + 1)
    pub loan_id: u64,

    /// Borrower identity at the time of lending
    pub borrower: Address,

    /// Lender identity that funded this event
    pub lender: Address,

    /// Amount lent (equals the loan's principal)
    pub amount: u64,

    /// Active until repaid, then Closed
    pub status: LoanStatus,

    /// Unix timestamp (seconds) of the lending event
    pub timestamp: i64,
}

/// One borrow/lend relationship, keyed by (borrower, collateral asset).
///
/// The record is retained after closure as history; it is never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    /// Identity of the deposited collateral unit
    pub asset: AssetId,

    /// Borrower identity
    pub borrower: Address,

    /// Address of the governing config record
    pub config: Address,

    /// Loan amount fixed at deposit time; never changes afterwards
    pub principal: u64,

    /// True iff the collateral sits in escrow and no repayment was recorded
    pub active: bool,

    /// Append-only sequence of lending events; never reordered or removed
    pub history: Vec<LoanDetails>,

    /// Derivation bump for this record's address
    pub bump: u8,
}

impl Loan {
    /// Next monotonic lending-event id (first is 1).
    pub fn next_loan_id(&self) -> u64 {
        self.history
            .iter()
            .map(|d| d.loan_id)
            .max()
            .unwrap_or(0)
            .saturating_add(1)
    }

    /// Index of the single Active history entry, if exactly one exists.
    pub fn active_detail_index(&self) -> Option<usize> {
        let mut found = None;
        for (i, detail) in self.history.iter().enumerate() {
            if detail.status == LoanStatus::Active {
                if found.is_some() {
                    // Invariant breach: at most one Active entry may exist.
                    return None;
                }
                found = Some(i);
            }
        }
        found
    }

    /// True if any history entry is currently Active.
    pub fn has_active_detail(&self) -> bool {
        self.history
            .iter()
            .any(|d| d.status == LoanStatus::Active)
    }
}

/// Custodial authority over one loan's collateral.
///
/// Derived from the loan's address. It has no signing key; control is
/// proven structurally via its derivation seeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    /// Address of the loan this escrow serves
    pub owner: Address,

    /// Derivation bump for this record's address
    pub bump: u8,
}

/// Receipt returned by the mutating operations `lend` and `repay`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Unique receipt ID (UUIDv7 for time-ordering)
    pub receipt_id: Uuid,

    /// Loan the operation acted on
    pub loan: Address,

    /// Unix timestamp (seconds) at commit
    pub timestamp: i64,
}

impl Receipt {
    /// Create a receipt for an operation on `loan` stamped with now.
    pub fn now(loan: Address) -> Self {
        Self {
            receipt_id: Uuid::now_v7(),
            loan,
            timestamp: Utc::now().timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn test_config(fee_bps: u64) -> ConfigAccount {
        ConfigAccount {
            admin: Address::new([1u8; 32]),
            default_loan_amount: 1_000_000_000,
            fee_bps,
            bump: 255,
        }
    }

    #[test]
    fn test_fee_for_default_rate() {
        let config = test_config(DEFAULT_FEE_BPS);
        assert_eq!(config.fee_for(1_000_000_000).unwrap(), 3_000_000);
    }

    #[test]
    fn test_fee_for_zero_rate() {
        let config = test_config(0);
        assert_eq!(config.fee_for(u64::MAX).unwrap(), 0);
    }

    #[test]
    fn test_fee_for_overflow() {
        let config = test_config(BPS_DENOMINATOR);
        let err = config.fee_for(u64::MAX).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::MathOverflow)
        ));
    }

    #[test]
    fn test_next_loan_id_monotonic() {
        let mut loan = Loan {
            asset: AssetId::new([2u8; 32]),
            borrower: Address::new([3u8; 32]),
            config: Address::new([4u8; 32]),
            principal: 100,
            active: true,
            history: vec![],
            bump: 254,
        };
        assert_eq!(loan.next_loan_id(), 1);

        loan.history.push(LoanDetails {
            loan_id: 1,
            borrower: loan.borrower,
            lender: Address::new([5u8; 32]),
            amount: 100,
            status: LoanStatus::Closed,
            timestamp: 0,
        });
        assert_eq!(loan.next_loan_id(), 2);
    }

    #[test]
    fn test_active_detail_index() {
        let borrower = Address::new([3u8; 32]);
        let lender = Address::new([5u8; 32]);
        let detail = |id, status| LoanDetails {
            loan_id: id,
            borrower,
            lender,
            amount: 100,
            status,
            timestamp: 0,
        };

        let mut loan = Loan {
            asset: AssetId::new([2u8; 32]),
            borrower,
            config: Address::new([4u8; 32]),
            principal: 100,
            active: true,
            history: vec![detail(1, LoanStatus::Closed), detail(2, LoanStatus::Active)],
            bump: 254,
        };
        assert_eq!(loan.active_detail_index(), Some(1));
        assert!(loan.has_active_detail());

        loan.history[1].status = LoanStatus::Closed;
        assert_eq!(loan.active_detail_index(), None);
        assert!(!loan.has_active_detail());
    }

    #[test]
    fn test_address_display_hex() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xab;
        bytes[31] = 0x01;
        let addr = Address::new(bytes);
        let hex = addr.to_string();
        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("ab"));
        assert!(hex.ends_with("01"));
    }

    #[test]
    fn test_record_roundtrip_bincode() {
        let loan = Loan {
            asset: AssetId::random(),
            borrower: Address::new([3u8; 32]),
            config: Address::new([4u8; 32]),
            principal: 42,
            active: true,
            history: vec![LoanDetails {
                loan_id: 1,
                borrower: Address::new([3u8; 32]),
                lender: Address::new([5u8; 32]),
                amount: 42,
                status: LoanStatus::Active,
                timestamp: 1_700_000_000,
            }],
            bump: 253,
        };

        let bytes = bincode::serialize(&loan).unwrap();
        let decoded: Loan = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, loan);
    }
}

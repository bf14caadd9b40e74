//! Loan State Machine
//!
//! Owns the lifecycle of a loan from creation through active-with-lender
//! through closed:
//!
//! ```text
//! Uninitialized → Active (awaiting lender) → Active (lent) → Closed
//! ```
//!
//! Every operation follows the same discipline: read current records, check
//! **every** precondition, stage every write into one [`WriteSet`], then
//! commit the set atomically. No write is staged before the last check has
//! passed, so a rejected operation leaves the ledger byte-identical.
//!
//! These functions are only ever invoked from the single-writer actor, which
//! serializes conflicting operations (see [`crate::actor`]).

use crate::{
    address,
    error::{Error, ProtocolError, Result},
    store::{Store, WriteSet},
    types::{
        Address, AssetId, ConfigAccount, Escrow, Loan, LoanDetails, LoanStatus, Receipt,
        DEFAULT_FEE_BPS,
    },
};
use chrono::Utc;

/// Create the config record for `admin`.
///
/// Returns the derived config address. Fails with `AlreadyInitialized` if the
/// address is occupied.
pub fn initialize(store: &Store, admin: Address, default_loan_amount: u64) -> Result<Address> {
    let (config_addr, bump) = address::config_address(admin)?;

    if store.get_config(config_addr)?.is_some() {
        return Err(ProtocolError::AlreadyInitialized.into());
    }

    let config = ConfigAccount {
        admin,
        default_loan_amount,
        fee_bps: DEFAULT_FEE_BPS,
        bump,
    };

    let mut writes = WriteSet::new();
    writes.put_config(config_addr, &config)?;
    store.commit(writes)?;

    tracing::info!(
        config = %config_addr,
        admin = %admin,
        default_loan_amount,
        "Config initialized"
    );

    Ok(config_addr)
}

/// Deposit one unit of `asset` as collateral and open a loan governed by
/// `admin`'s config.
///
/// Returns the derived loan address. The loan record is keyed by
/// `(borrower, asset)`, so a second deposit against the same collateral fails
/// with `DuplicateLoan`, including after a full repay cycle, since closed
/// records are retained.
pub fn deposit(store: &Store, borrower: Address, asset: AssetId, admin: Address) -> Result<Address> {
    let (config_addr, _) = address::config_address(admin)?;
    let config = store
        .get_config(config_addr)?
        .ok_or_else(|| Error::RecordNotFound(format!("config for admin {}", admin)))?;

    let (loan_addr, loan_bump) = address::loan_address(borrower, asset)?;
    if store.get_loan(loan_addr)?.is_some() {
        return Err(ProtocolError::DuplicateLoan.into());
    }

    let borrower_holding = store.collateral_balance(borrower, asset)?;
    if borrower_holding < 1 {
        return Err(ProtocolError::InsufficientCollateral.into());
    }

    let (escrow_addr, escrow_bump) = address::escrow_address(loan_addr)?;
    let escrow_holding = store
        .collateral_balance(escrow_addr, asset)?
        .checked_add(1)
        .ok_or(ProtocolError::MathOverflow)?;

    let loan = Loan {
        asset,
        borrower,
        config: config_addr,
        principal: config.default_loan_amount,
        active: true,
        history: Vec::new(),
        bump: loan_bump,
    };
    let escrow = Escrow {
        owner: loan_addr,
        bump: escrow_bump,
    };

    let mut writes = WriteSet::new();
    writes.set_collateral_balance(borrower, asset, borrower_holding - 1)?;
    writes.set_collateral_balance(escrow_addr, asset, escrow_holding)?;
    writes.put_loan(loan_addr, &loan)?;
    writes.put_escrow(escrow_addr, &escrow)?;
    store.commit(writes)?;

    tracing::info!(
        loan = %loan_addr,
        borrower = %borrower,
        asset = %asset,
        principal = loan.principal,
        "Collateral deposited, loan opened"
    );

    Ok(loan_addr)
}

/// Fund the loan at `loan_addr`: move `principal` from `lender` directly to
/// the borrower and append an Active history entry.
///
/// Currency bypasses escrow; only collateral is ever held in custody.
/// The lender must be distinct from the borrower.
/// The second of two racing lenders observes the first one's Active
/// entry and fails with `LoanIsActive`, with no side effects.
pub fn lend(store: &Store, lender: Address, loan_addr: Address) -> Result<Receipt> {
    let mut loan = store
        .get_loan(loan_addr)?
        .ok_or_else(|| Error::RecordNotFound(format!("loan {}", loan_addr)))?;

    if !loan.active {
        return Err(ProtocolError::LoanIsNotActive.into());
    }
    if loan.has_active_detail() {
        return Err(ProtocolError::LoanIsActive.into());
    }
    // Staged balance writes assume distinct debit and credit cells; a
    // self-lend would collapse them into one key and mint the principal.
    if lender == loan.borrower {
        return Err(Error::InvalidOperation(
            "lender and borrower must be distinct".to_string(),
        ));
    }

    let lender_balance = store.native_balance(lender)?;
    if lender_balance < loan.principal {
        return Err(ProtocolError::InsufficientFunds.into());
    }
    let borrower_balance = store
        .native_balance(loan.borrower)?
        .checked_add(loan.principal)
        .ok_or(ProtocolError::MathOverflow)?;

    let now = Utc::now().timestamp();
    let detail = LoanDetails {
        loan_id: loan.next_loan_id(),
        borrower: loan.borrower,
        lender,
        amount: loan.principal,
        status: LoanStatus::Active,
        timestamp: now,
    };
    loan.history.push(detail);

    let mut writes = WriteSet::new();
    writes.set_native_balance(lender, lender_balance - loan.principal)?;
    writes.set_native_balance(loan.borrower, borrower_balance)?;
    writes.put_loan(loan_addr, &loan)?;
    store.commit(writes)?;

    tracing::info!(
        loan = %loan_addr,
        lender = %lender,
        amount = loan.principal,
        "Loan funded"
    );

    Ok(Receipt::now(loan_addr))
}

/// Repay principal plus fee to the recorded lender and recover the
/// collateral from escrow.
///
/// The caller must be the loan's stored borrower. Flips the single Active
/// history entry to Closed and the loan to inactive.
pub fn repay(
    store: &Store,
    borrower: Address,
    loan_addr: Address,
    asset: AssetId,
) -> Result<Receipt> {
    let mut loan = store
        .get_loan(loan_addr)?
        .ok_or_else(|| Error::RecordNotFound(format!("loan {}", loan_addr)))?;

    if loan.asset != asset {
        return Err(Error::InvalidOperation(format!(
            "asset {} does not match loan collateral {}",
            asset, loan.asset
        )));
    }
    if !loan.active {
        return Err(ProtocolError::LoanIsNotActive.into());
    }
    if loan.borrower != borrower {
        return Err(ProtocolError::BorrowerNotFound.into());
    }
    let active_idx = loan
        .active_detail_index()
        .ok_or(ProtocolError::LoanIsNotActive)?;
    let lender = loan.history[active_idx].lender;

    let config = store
        .get_config(loan.config)?
        .ok_or_else(|| Error::RecordNotFound(format!("config {}", loan.config)))?;

    let fee = config.fee_for(loan.principal)?;
    let total = loan
        .principal
        .checked_add(fee)
        .ok_or(ProtocolError::MathOverflow)?;

    let borrower_balance = store.native_balance(borrower)?;
    if borrower_balance < total {
        return Err(ProtocolError::InsufficientFunds.into());
    }
    let lender_balance = store
        .native_balance(lender)?
        .checked_add(total)
        .ok_or(ProtocolError::MathOverflow)?;

    let (escrow_addr, _) = address::escrow_address(loan_addr)?;
    let escrow_holding = store.collateral_balance(escrow_addr, asset)?;
    if escrow_holding < 1 {
        // The active flag said the collateral is in custody; a missing unit
        // is a broken invariant, not a caller mistake.
        return Err(Error::InvalidOperation(format!(
            "collateral missing from escrow {}",
            escrow_addr
        )));
    }
    let borrower_holding = store
        .collateral_balance(borrower, asset)?
        .checked_add(1)
        .ok_or(ProtocolError::MathOverflow)?;

    loan.history[active_idx].status = LoanStatus::Closed;
    loan.active = false;

    let mut writes = WriteSet::new();
    writes.set_native_balance(borrower, borrower_balance - total)?;
    writes.set_native_balance(lender, lender_balance)?;
    writes.set_collateral_balance(escrow_addr, asset, escrow_holding - 1)?;
    writes.set_collateral_balance(borrower, asset, borrower_holding)?;
    writes.put_loan(loan_addr, &loan)?;
    store.commit(writes)?;

    tracing::info!(
        loan = %loan_addr,
        borrower = %borrower,
        lender = %lender,
        principal = loan.principal,
        fee,
        "Loan repaid, collateral released"
    );

    Ok(Receipt::now(loan_addr))
}

/// Credit `amount` of native currency to `address`.
///
/// A ledger-store deposit from outside the protocol, not a loan transition;
/// used to bring externally held funds onto the ledger.
pub fn fund(store: &Store, address: Address, amount: u64) -> Result<u64> {
    let balance = store
        .native_balance(address)?
        .checked_add(amount)
        .ok_or(ProtocolError::MathOverflow)?;

    let mut writes = WriteSet::new();
    writes.set_native_balance(address, balance)?;
    store.commit(writes)?;

    Ok(balance)
}

/// Credit one unit of `asset` to `owner`.
///
/// Rejects a second unit for the same holder: collateral is non-fungible and
/// held at most once.
pub fn mint_asset(store: &Store, owner: Address, asset: AssetId) -> Result<()> {
    if store.collateral_balance(owner, asset)? >= 1 {
        return Err(Error::InvalidOperation(format!(
            "{} already holds asset {}",
            owner, asset
        )));
    }

    let mut writes = WriteSet::new();
    writes.set_collateral_balance(owner, asset, 1)?;
    store.commit(writes)?;

    Ok(())
}

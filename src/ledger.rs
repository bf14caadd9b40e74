//! Main ledger orchestration layer
//!
//! This module ties together storage, derivation, and actor components into
//! the caller-facing API for the four protocol operations.
//!
//! # Example
//!
//! ```no_run
//! use pawn_ledger::{Config, PawnLedger};
//!
//! #[tokio::main]
//! async fn main() -> pawn_ledger::Result<()> {
//!     let config = Config::default();
//!     let ledger = PawnLedger::open(config).await?;
//!
//!     // let config_addr = ledger.initialize(admin, 1_000_000_000).await?;
//!     // let loan_addr = ledger.deposit(borrower, asset, admin).await?;
//!
//!     ledger.shutdown().await
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    error::Error,
    metrics::Metrics,
    store::{Store, StoreStats},
    types::{Address, AssetId, ConfigAccount, Escrow, Loan, Receipt},
    Config, Result,
};
use std::sync::Arc;

/// Main ledger interface
pub struct PawnLedger {
    /// Actor handle for all operations
    handle: LedgerHandle,

    /// Metrics collector
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl PawnLedger {
    /// Open ledger with configuration
    pub async fn open(config: Config) -> Result<Self> {
        // Open storage
        let store = Arc::new(Store::open(&config)?);

        // Metrics and actor
        let metrics = Metrics::new()?;
        let handle = spawn_ledger_actor(store, metrics.clone(), config.mailbox_capacity);

        Ok(Self {
            handle,
            metrics,
            config,
        })
    }

    /// Caller-facing configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Metrics collector (registry included, for scraping)
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Clone-able handle for concurrent callers
    pub fn handle(&self) -> LedgerHandle {
        self.handle.clone()
    }

    // Protocol operations

    /// Create the config record for `admin`; returns its address.
    pub async fn initialize(&self, admin: Address, default_loan_amount: u64) -> Result<Address> {
        self.handle.initialize(admin, default_loan_amount).await
    }

    /// Deposit one unit of `asset` as collateral and open a loan governed by
    /// `admin`'s config; returns the loan address.
    pub async fn deposit(
        &self,
        borrower: Address,
        asset: AssetId,
        admin: Address,
    ) -> Result<Address> {
        self.handle.deposit(borrower, asset, admin).await
    }

    /// Fund the loan at `loan`; principal moves lender → borrower directly.
    pub async fn lend(&self, lender: Address, loan: Address) -> Result<Receipt> {
        self.handle.lend(lender, loan).await
    }

    /// Repay principal plus fee and recover the collateral from escrow.
    pub async fn repay(
        &self,
        borrower: Address,
        loan: Address,
        asset: AssetId,
    ) -> Result<Receipt> {
        self.handle.repay(borrower, loan, asset).await
    }

    // Ledger-store deposits (bring external holdings onto the ledger)

    /// Credit `amount` of native currency to `address`; returns the balance.
    pub async fn fund(&self, address: Address, amount: u64) -> Result<u64> {
        self.handle.fund(address, amount).await
    }

    /// Credit one unit of `asset` to `owner`.
    pub async fn mint_asset(&self, owner: Address, asset: AssetId) -> Result<()> {
        self.handle.mint_asset(owner, asset).await
    }

    // Record reads

    /// Fetch the config record at `address`.
    pub async fn get_config(&self, address: Address) -> Result<ConfigAccount> {
        self.handle
            .get_config(address)
            .await?
            .ok_or_else(|| Error::RecordNotFound(format!("config {}", address)))
    }

    /// Fetch the loan record at `address`.
    pub async fn get_loan(&self, address: Address) -> Result<Loan> {
        self.handle
            .get_loan(address)
            .await?
            .ok_or_else(|| Error::RecordNotFound(format!("loan {}", address)))
    }

    /// Fetch the escrow record at `address`.
    pub async fn get_escrow(&self, address: Address) -> Result<Escrow> {
        self.handle
            .get_escrow(address)
            .await?
            .ok_or_else(|| Error::RecordNotFound(format!("escrow {}", address)))
    }

    /// Native currency balance of `address`.
    pub async fn native_balance(&self, address: Address) -> Result<u64> {
        self.handle.native_balance(address).await
    }

    /// Collateral units of `asset` held by `holder`.
    pub async fn collateral_balance(&self, holder: Address, asset: AssetId) -> Result<u64> {
        self.handle.collateral_balance(holder, asset).await
    }

    /// Store statistics.
    pub async fn stats(&self) -> Result<StoreStats> {
        self.handle.stats().await
    }

    /// Shutdown ledger
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    async fn create_test_ledger() -> (PawnLedger, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();

        (PawnLedger::open(config).await.unwrap(), temp_dir)
    }

    #[tokio::test]
    async fn test_ledger_open_and_shutdown() {
        let (ledger, _temp) = create_test_ledger().await;
        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_initialize_and_fetch_config() {
        let (ledger, _temp) = create_test_ledger().await;
        let admin = KeyPair::generate().address();

        let config_addr = ledger.initialize(admin, 1_000_000_000).await.unwrap();
        let config = ledger.get_config(config_addr).await.unwrap();
        assert_eq!(config.admin, admin);
        assert_eq!(config.default_loan_amount, 1_000_000_000);

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_get_loan_not_found() {
        let (ledger, _temp) = create_test_ledger().await;

        let missing = Address::new([42u8; 32]);
        let err = ledger.get_loan(missing).await.unwrap_err();
        assert!(matches!(err, Error::RecordNotFound(_)));

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_stats_after_deposit() {
        let (ledger, _temp) = create_test_ledger().await;
        let admin = KeyPair::generate().address();
        let borrower = KeyPair::generate().address();
        let asset = AssetId::random();

        ledger.initialize(admin, 500).await.unwrap();
        ledger.mint_asset(borrower, asset).await.unwrap();
        ledger.deposit(borrower, asset, admin).await.unwrap();

        let stats = ledger.stats().await.unwrap();
        assert_eq!(stats.total_configs, 1);
        assert_eq!(stats.total_loans, 1);
        assert_eq!(stats.active_loans, 1);

        ledger.shutdown().await.unwrap();
    }
}

//! Actor-based concurrency for the ledger
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One logical writer task owns every mutation, so conflicting operations
//!   on the same records are serialized by arrival order
//! - The critical race (two `lend` calls against one loan) is decided here:
//!   whichever message is processed first commits, the second observes the
//!   Active entry and is rejected with no side effects
//! - Async message passing with backpressure (bounded mailbox)
//!
//! Reads go through the same mailbox so callers always observe a state that
//! lies between two committed operations, never inside one.

use crate::{
    error::{Error, Result},
    metrics::Metrics,
    protocol,
    store::{Store, StoreStats},
    types::{Address, AssetId, ConfigAccount, Escrow, Loan, Receipt},
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
pub enum LedgerMessage {
    /// Create a config record
    Initialize {
        /// Admin identity (implicit signer)
        admin: Address,
        /// Principal assigned to every new loan
        default_loan_amount: u64,
        /// Response channel
        response: oneshot::Sender<Result<Address>>,
    },

    /// Deposit collateral and open a loan
    Deposit {
        /// Borrower identity (implicit signer)
        borrower: Address,
        /// Collateral asset
        asset: AssetId,
        /// Admin whose config governs the loan
        admin: Address,
        /// Response channel
        response: oneshot::Sender<Result<Address>>,
    },

    /// Fund a loan
    Lend {
        /// Lender identity (implicit signer)
        lender: Address,
        /// Loan record address
        loan: Address,
        /// Response channel
        response: oneshot::Sender<Result<Receipt>>,
    },

    /// Repay a loan and recover collateral
    Repay {
        /// Borrower identity (implicit signer)
        borrower: Address,
        /// Loan record address
        loan: Address,
        /// Collateral asset
        asset: AssetId,
        /// Response channel
        response: oneshot::Sender<Result<Receipt>>,
    },

    /// Credit native currency onto the ledger
    Fund {
        /// Credited address
        address: Address,
        /// Amount in smallest currency units
        amount: u64,
        /// Response channel (new balance)
        response: oneshot::Sender<Result<u64>>,
    },

    /// Credit one collateral unit onto the ledger
    MintAsset {
        /// Receiving holder
        owner: Address,
        /// Asset identity
        asset: AssetId,
        /// Response channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Get a config record
    GetConfig {
        /// Record address
        address: Address,
        /// Response channel
        response: oneshot::Sender<Result<Option<ConfigAccount>>>,
    },

    /// Get a loan record
    GetLoan {
        /// Record address
        address: Address,
        /// Response channel
        response: oneshot::Sender<Result<Option<Loan>>>,
    },

    /// Get an escrow record
    GetEscrow {
        /// Record address
        address: Address,
        /// Response channel
        response: oneshot::Sender<Result<Option<Escrow>>>,
    },

    /// Get a native currency balance
    NativeBalance {
        /// Queried address
        address: Address,
        /// Response channel
        response: oneshot::Sender<Result<u64>>,
    },

    /// Get a collateral holding
    CollateralBalance {
        /// Holder address
        holder: Address,
        /// Asset identity
        asset: AssetId,
        /// Response channel
        response: oneshot::Sender<Result<u64>>,
    },

    /// Get store statistics
    Stats {
        /// Response channel
        response: oneshot::Sender<Result<StoreStats>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes ledger messages
pub struct LedgerActor {
    /// Storage backend
    store: Arc<Store>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,

    /// Metrics collector
    metrics: Metrics,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        store: Arc<Store>,
        mailbox: mpsc::Receiver<LedgerMessage>,
        metrics: Metrics,
    ) -> Self {
        Self {
            store,
            mailbox,
            metrics,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Shutdown => break,
                _ => self.handle_message(msg),
            }
        }
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: LedgerMessage) {
        match msg {
            LedgerMessage::Initialize {
                admin,
                default_loan_amount,
                response,
            } => {
                let started = Instant::now();
                let result = protocol::initialize(&self.store, admin, default_loan_amount);
                self.metrics
                    .observe("initialize", result.is_ok(), started.elapsed().as_secs_f64());
                let _ = response.send(result);
            }

            LedgerMessage::Deposit {
                borrower,
                asset,
                admin,
                response,
            } => {
                let started = Instant::now();
                let result = protocol::deposit(&self.store, borrower, asset, admin);
                if result.is_ok() {
                    self.metrics.loans_opened_total.inc();
                }
                self.metrics
                    .observe("deposit", result.is_ok(), started.elapsed().as_secs_f64());
                let _ = response.send(result);
            }

            LedgerMessage::Lend {
                lender,
                loan,
                response,
            } => {
                let started = Instant::now();
                let result = protocol::lend(&self.store, lender, loan);
                self.metrics
                    .observe("lend", result.is_ok(), started.elapsed().as_secs_f64());
                let _ = response.send(result);
            }

            LedgerMessage::Repay {
                borrower,
                loan,
                asset,
                response,
            } => {
                let started = Instant::now();
                let result = protocol::repay(&self.store, borrower, loan, asset);
                if result.is_ok() {
                    self.metrics.loans_repaid_total.inc();
                }
                self.metrics
                    .observe("repay", result.is_ok(), started.elapsed().as_secs_f64());
                let _ = response.send(result);
            }

            LedgerMessage::Fund {
                address,
                amount,
                response,
            } => {
                let _ = response.send(protocol::fund(&self.store, address, amount));
            }

            LedgerMessage::MintAsset {
                owner,
                asset,
                response,
            } => {
                let _ = response.send(protocol::mint_asset(&self.store, owner, asset));
            }

            LedgerMessage::GetConfig { address, response } => {
                let _ = response.send(self.store.get_config(address));
            }

            LedgerMessage::GetLoan { address, response } => {
                let _ = response.send(self.store.get_loan(address));
            }

            LedgerMessage::GetEscrow { address, response } => {
                let _ = response.send(self.store.get_escrow(address));
            }

            LedgerMessage::NativeBalance { address, response } => {
                let _ = response.send(self.store.native_balance(address));
            }

            LedgerMessage::CollateralBalance {
                holder,
                asset,
                response,
            } => {
                let _ = response.send(self.store.collateral_balance(holder, asset));
            }

            LedgerMessage::Stats { response } => {
                let _ = response.send(self.store.stats());
            }

            LedgerMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T>>) -> LedgerMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(make(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Create a config record
    pub async fn initialize(&self, admin: Address, default_loan_amount: u64) -> Result<Address> {
        self.request(|response| LedgerMessage::Initialize {
            admin,
            default_loan_amount,
            response,
        })
        .await
    }

    /// Deposit collateral and open a loan
    pub async fn deposit(
        &self,
        borrower: Address,
        asset: AssetId,
        admin: Address,
    ) -> Result<Address> {
        self.request(|response| LedgerMessage::Deposit {
            borrower,
            asset,
            admin,
            response,
        })
        .await
    }

    /// Fund a loan
    pub async fn lend(&self, lender: Address, loan: Address) -> Result<Receipt> {
        self.request(|response| LedgerMessage::Lend {
            lender,
            loan,
            response,
        })
        .await
    }

    /// Repay a loan and recover collateral
    pub async fn repay(
        &self,
        borrower: Address,
        loan: Address,
        asset: AssetId,
    ) -> Result<Receipt> {
        self.request(|response| LedgerMessage::Repay {
            borrower,
            loan,
            asset,
            response,
        })
        .await
    }

    /// Credit native currency onto the ledger
    pub async fn fund(&self, address: Address, amount: u64) -> Result<u64> {
        self.request(|response| LedgerMessage::Fund {
            address,
            amount,
            response,
        })
        .await
    }

    /// Credit one collateral unit onto the ledger
    pub async fn mint_asset(&self, owner: Address, asset: AssetId) -> Result<()> {
        self.request(|response| LedgerMessage::MintAsset {
            owner,
            asset,
            response,
        })
        .await
    }

    /// Get a config record
    pub async fn get_config(&self, address: Address) -> Result<Option<ConfigAccount>> {
        self.request(|response| LedgerMessage::GetConfig { address, response })
            .await
    }

    /// Get a loan record
    pub async fn get_loan(&self, address: Address) -> Result<Option<Loan>> {
        self.request(|response| LedgerMessage::GetLoan { address, response })
            .await
    }

    /// Get an escrow record
    pub async fn get_escrow(&self, address: Address) -> Result<Option<Escrow>> {
        self.request(|response| LedgerMessage::GetEscrow { address, response })
            .await
    }

    /// Get a native currency balance
    pub async fn native_balance(&self, address: Address) -> Result<u64> {
        self.request(|response| LedgerMessage::NativeBalance { address, response })
            .await
    }

    /// Get a collateral holding
    pub async fn collateral_balance(&self, holder: Address, asset: AssetId) -> Result<u64> {
        self.request(|response| LedgerMessage::CollateralBalance {
            holder,
            asset,
            response,
        })
        .await
    }

    /// Get store statistics
    pub async fn stats(&self) -> Result<StoreStats> {
        self.request(|response| LedgerMessage::Stats { response })
            .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(
    store: Arc<Store>,
    metrics: Metrics,
    mailbox_capacity: usize,
) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity); // Bounded channel for backpressure
    let actor = LedgerActor::new(store, rx, metrics);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::Config;

    fn spawn_test_actor() -> (LedgerHandle, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();

        let store = Arc::new(Store::open(&config).unwrap());
        let handle = spawn_ledger_actor(store, Metrics::new().unwrap(), 100);
        (handle, temp_dir)
    }

    #[tokio::test]
    async fn test_actor_spawn_and_shutdown() {
        let (handle, _temp) = spawn_test_actor();
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_fund_and_balance() {
        let (handle, _temp) = spawn_test_actor();
        let address = KeyPair::generate().address();

        handle.fund(address, 1_000).await.unwrap();
        assert_eq!(handle.native_balance(address).await.unwrap(), 1_000);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_serializes_operations() {
        let (handle, _temp) = spawn_test_actor();
        let address = KeyPair::generate().address();

        // Interleaved funds from cloned handles land in arrival order; the
        // final balance is the sum regardless of interleaving.
        let h2 = handle.clone();
        let a = tokio::spawn({
            let handle = handle.clone();
            async move {
                for _ in 0..10 {
                    handle.fund(address, 1).await.unwrap();
                }
            }
        });
        let b = tokio::spawn(async move {
            for _ in 0..10 {
                h2.fund(address, 2).await.unwrap();
            }
        });
        a.await.unwrap();
        b.await.unwrap();

        assert_eq!(handle.native_balance(address).await.unwrap(), 30);

        handle.shutdown().await.unwrap();
    }
}

//! Ledger Store backed by RocksDB
//!
//! # Column Families
//!
//! - `configs` - Config records (key: derived config address)
//! - `loans` - Loan records (key: derived loan address)
//! - `escrows` - Escrow records (key: derived escrow address)
//! - `native` - Native currency balances (key: address)
//! - `collateral` - Collateral holdings (key: holder address || asset id)
//!
//! Every mutating protocol operation stages its writes into a [`WriteSet`]
//! and commits them through a single RocksDB `WriteBatch`: either every
//! account change lands or none does.

use crate::{
    error::{Error, Result},
    types::{Address, AssetId, ConfigAccount, Escrow, Loan},
    Config,
};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};

/// Column family names
const CF_CONFIGS: &str = "configs";
const CF_LOANS: &str = "loans";
const CF_ESCROWS: &str = "escrows";
const CF_NATIVE: &str = "native";
const CF_COLLATERAL: &str = "collateral";

/// Column family selector for staged writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cf {
    Configs,
    Loans,
    Escrows,
    Native,
    Collateral,
}

impl Cf {
    fn name(self) -> &'static str {
        match self {
            Cf::Configs => CF_CONFIGS,
            Cf::Loans => CF_LOANS,
            Cf::Escrows => CF_ESCROWS,
            Cf::Native => CF_NATIVE,
            Cf::Collateral => CF_COLLATERAL,
        }
    }
}

/// Writes staged by one operation, committed atomically.
///
/// Building a `WriteSet` has no observable effect; state changes only when
/// [`Store::commit`] writes the whole set in one batch.
#[derive(Debug, Default)]
pub struct WriteSet {
    puts: Vec<(Cf, Vec<u8>, Vec<u8>)>,
}

impl WriteSet {
    /// Create an empty write set
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of staged writes
    pub fn len(&self) -> usize {
        self.puts.len()
    }

    /// True if nothing is staged
    pub fn is_empty(&self) -> bool {
        self.puts.is_empty()
    }

    /// Stage a config record
    pub fn put_config(&mut self, address: Address, config: &ConfigAccount) -> Result<()> {
        let value = bincode::serialize(config)?;
        self.puts
            .push((Cf::Configs, address.as_bytes().to_vec(), value));
        Ok(())
    }

    /// Stage a loan record
    pub fn put_loan(&mut self, address: Address, loan: &Loan) -> Result<()> {
        let value = bincode::serialize(loan)?;
        self.puts
            .push((Cf::Loans, address.as_bytes().to_vec(), value));
        Ok(())
    }

    /// Stage an escrow record
    pub fn put_escrow(&mut self, address: Address, escrow: &Escrow) -> Result<()> {
        let value = bincode::serialize(escrow)?;
        self.puts
            .push((Cf::Escrows, address.as_bytes().to_vec(), value));
        Ok(())
    }

    /// Stage a native currency balance
    pub fn set_native_balance(&mut self, address: Address, amount: u64) -> Result<()> {
        let value = bincode::serialize(&amount)?;
        self.puts
            .push((Cf::Native, address.as_bytes().to_vec(), value));
        Ok(())
    }

    /// Stage a collateral holding
    pub fn set_collateral_balance(
        &mut self,
        holder: Address,
        asset: AssetId,
        amount: u64,
    ) -> Result<()> {
        let value = bincode::serialize(&amount)?;
        self.puts
            .push((Cf::Collateral, collateral_key(holder, asset), value));
        Ok(())
    }
}

fn collateral_key(holder: Address, asset: AssetId) -> Vec<u8> {
    let mut key = holder.as_bytes().to_vec();
    key.extend_from_slice(asset.as_bytes());
    key
}

/// Storage wrapper for RocksDB
pub struct Store {
    db: DB,
}

impl Store {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        // Database options
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        // Column family descriptors
        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_CONFIGS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_LOANS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_ESCROWS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_NATIVE, Self::cf_options_balances()),
            ColumnFamilyDescriptor::new(CF_COLLATERAL, Self::cf_options_balances()),
        ];

        // Open database
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened RocksDB ledger store");

        Ok(Self { db })
    }

    fn cf_options_records() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_balances() -> Options {
        let mut opts = Options::default();
        // Balances are small and hot, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Record reads

    /// Get config record at `address`, if present
    pub fn get_config(&self, address: Address) -> Result<Option<ConfigAccount>> {
        let cf = self.cf_handle(CF_CONFIGS)?;
        match self.db.get_cf(cf, address.as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Get loan record at `address`, if present
    pub fn get_loan(&self, address: Address) -> Result<Option<Loan>> {
        let cf = self.cf_handle(CF_LOANS)?;
        match self.db.get_cf(cf, address.as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Get escrow record at `address`, if present
    pub fn get_escrow(&self, address: Address) -> Result<Option<Escrow>> {
        let cf = self.cf_handle(CF_ESCROWS)?;
        match self.db.get_cf(cf, address.as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    // Balance reads

    /// Native currency balance of `address` (missing cell reads as 0)
    pub fn native_balance(&self, address: Address) -> Result<u64> {
        let cf = self.cf_handle(CF_NATIVE)?;
        match self.db.get_cf(cf, address.as_bytes())? {
            Some(value) => Ok(bincode::deserialize(&value)?),
            None => Ok(0),
        }
    }

    /// Collateral units of `asset` held by `holder` (missing cell reads as 0)
    pub fn collateral_balance(&self, holder: Address, asset: AssetId) -> Result<u64> {
        let cf = self.cf_handle(CF_COLLATERAL)?;
        match self.db.get_cf(cf, collateral_key(holder, asset))? {
            Some(value) => Ok(bincode::deserialize(&value)?),
            None => Ok(0),
        }
    }

    // Atomic commit

    /// Commit every staged write in one batch.
    ///
    /// This is the only mutation path in the store; partial application is
    /// impossible by construction.
    pub fn commit(&self, writes: WriteSet) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }

        let count = writes.len();
        let mut batch = WriteBatch::default();
        for (cf, key, value) in writes.puts {
            let handle = self.cf_handle(cf.name())?;
            batch.put_cf(handle, &key, &value);
        }

        self.db.write(batch)?;

        tracing::debug!(writes = count, "Committed write set");

        Ok(())
    }

    // Statistics

    /// Get storage statistics
    pub fn stats(&self) -> Result<StoreStats> {
        let mut config_count = 0u64;
        let cf = self.cf_handle(CF_CONFIGS)?;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item?;
            config_count += 1;
        }

        let mut loan_count = 0u64;
        let mut active_loan_count = 0u64;
        let cf = self.cf_handle(CF_LOANS)?;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            let loan: Loan = bincode::deserialize(&value)?;
            loan_count += 1;
            if loan.active {
                active_loan_count += 1;
            }
        }

        Ok(StoreStats {
            total_configs: config_count,
            total_loans: loan_count,
            active_loans: active_loan_count,
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of config records
    pub total_configs: u64,
    /// Number of loan records, closed ones included
    pub total_loans: u64,
    /// Number of loans with `active = true`
    pub active_loans: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (Store, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Store::open(&config).unwrap(), temp_dir)
    }

    fn test_loan(borrower: Address, asset: AssetId) -> Loan {
        Loan {
            asset,
            borrower,
            config: Address::new([9u8; 32]),
            principal: 1_000,
            active: true,
            history: vec![],
            bump: 255,
        }
    }

    #[test]
    fn test_store_open() {
        let (store, _temp) = test_store();
        assert!(store.db.cf_handle(CF_CONFIGS).is_some());
        assert!(store.db.cf_handle(CF_LOANS).is_some());
        assert!(store.db.cf_handle(CF_COLLATERAL).is_some());
    }

    #[test]
    fn test_missing_records_read_as_none() {
        let (store, _temp) = test_store();
        let addr = Address::new([1u8; 32]);

        assert!(store.get_config(addr).unwrap().is_none());
        assert!(store.get_loan(addr).unwrap().is_none());
        assert!(store.get_escrow(addr).unwrap().is_none());
        assert_eq!(store.native_balance(addr).unwrap(), 0);
        assert_eq!(
            store
                .collateral_balance(addr, AssetId::new([2u8; 32]))
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_record_roundtrip() {
        let (store, _temp) = test_store();

        let addr = Address::new([3u8; 32]);
        let config = ConfigAccount {
            admin: Address::new([4u8; 32]),
            default_loan_amount: 500,
            fee_bps: 30,
            bump: 254,
        };

        let mut writes = WriteSet::new();
        writes.put_config(addr, &config).unwrap();
        store.commit(writes).unwrap();

        assert_eq!(store.get_config(addr).unwrap(), Some(config));
    }

    #[test]
    fn test_commit_is_all_or_nothing_per_batch() {
        let (store, _temp) = test_store();

        let borrower = Address::new([5u8; 32]);
        let asset = AssetId::new([6u8; 32]);
        let loan_addr = Address::new([7u8; 32]);
        let escrow_addr = Address::new([8u8; 32]);

        // One staged set touching three column families.
        let mut writes = WriteSet::new();
        writes.put_loan(loan_addr, &test_loan(borrower, asset)).unwrap();
        writes
            .put_escrow(escrow_addr, &Escrow { owner: loan_addr, bump: 253 })
            .unwrap();
        writes.set_collateral_balance(escrow_addr, asset, 1).unwrap();
        writes.set_collateral_balance(borrower, asset, 0).unwrap();
        store.commit(writes).unwrap();

        assert!(store.get_loan(loan_addr).unwrap().is_some());
        assert!(store.get_escrow(escrow_addr).unwrap().is_some());
        assert_eq!(store.collateral_balance(escrow_addr, asset).unwrap(), 1);
        assert_eq!(store.collateral_balance(borrower, asset).unwrap(), 0);
    }

    #[test]
    fn test_unstaged_writes_have_no_effect() {
        let (store, _temp) = test_store();
        let addr = Address::new([10u8; 32]);

        let mut writes = WriteSet::new();
        writes.set_native_balance(addr, 42).unwrap();
        assert_eq!(writes.len(), 1);
        drop(writes); // never committed

        assert_eq!(store.native_balance(addr).unwrap(), 0);
    }

    #[test]
    fn test_stats() {
        let (store, _temp) = test_store();

        let borrower = Address::new([11u8; 32]);
        let open_loan = test_loan(borrower, AssetId::new([12u8; 32]));
        let mut closed = test_loan(borrower, AssetId::new([13u8; 32]));
        closed.active = false;

        let mut writes = WriteSet::new();
        writes.put_loan(Address::new([14u8; 32]), &open_loan).unwrap();
        writes.put_loan(Address::new([15u8; 32]), &closed).unwrap();
        store.commit(writes).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_loans, 2);
        assert_eq!(stats.active_loans, 1);
        assert_eq!(stats.total_configs, 0);
    }
}

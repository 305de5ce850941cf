// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded balance ledger backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `balances`: JSON-encoded `[user_id, chain_id, chain_kind, token_address]`
//!   → serialized `BalanceRecord`
//!
//! redb admits a single write transaction at a time, so the existence check in
//! `create` and the read-add-write in `increment` each run as one atomic unit.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::balances::{BalanceFilter, BalanceKey, BalanceRecord, BalancesQ, LedgerError, LedgerResult};

/// Primary table: composite key → serialized BalanceRecord (JSON bytes).
const BALANCES: TableDefinition<&str, &[u8]> = TableDefinition::new("balances");

macro_rules! storage_error_from {
    ($($err:ty),* $(,)?) => {
        $(
            impl From<$err> for LedgerError {
                fn from(e: $err) -> Self {
                    LedgerError::Storage(e.to_string())
                }
            }
        )*
    };
}

storage_error_from!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// Encode the unique key; a JSON array keeps components unambiguous.
fn encode_key(key: &BalanceKey) -> LedgerResult<String> {
    Ok(serde_json::to_string(&(
        &key.user_id,
        &key.chain_id,
        key.chain_kind.as_str(),
        &key.token_address,
    ))?)
}

/// redb-backed [`BalancesQ`].
#[derive(Clone)]
pub struct BalanceDb {
    db: Arc<Database>,
}

impl BalanceDb {
    /// Open (or create) the ledger at the given path.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| LedgerError::Storage(format!("{}: {e}", parent.display())))?;
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(BALANCES)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Run a blocking ledger operation off the async runtime.
    async fn blocking<T, F>(&self, op: F) -> LedgerResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> LedgerResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| LedgerError::Storage(format!("ledger task failed: {e}")))?
    }

    fn get_by_key(db: &Database, key: &BalanceKey) -> LedgerResult<Option<BalanceRecord>> {
        let encoded = encode_key(key)?;
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(BALANCES)?;
        match table.get(encoded.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn scan(db: &Database, filter: &BalanceFilter, limit: Option<usize>) -> LedgerResult<Vec<BalanceRecord>> {
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(BALANCES)?;

        let mut out = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let record: BalanceRecord = serde_json::from_slice(value.value())?;
            if filter.matches(&record) {
                out.push(record);
                if limit.is_some_and(|l| out.len() >= l) {
                    break;
                }
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl BalancesQ for BalanceDb {
    async fn get(&self, filter: &BalanceFilter) -> LedgerResult<Option<BalanceRecord>> {
        let filter = filter.clone();
        self.blocking(move |db| match filter.as_key() {
            Some(key) => Self::get_by_key(db, &key),
            None => Ok(Self::scan(db, &filter, Some(1))?.into_iter().next()),
        })
        .await
    }

    async fn list(&self, filter: &BalanceFilter) -> LedgerResult<Vec<BalanceRecord>> {
        let filter = filter.clone();
        self.blocking(move |db| Self::scan(db, &filter, None)).await
    }

    async fn create(&self, record: BalanceRecord) -> LedgerResult<()> {
        self.blocking(move |db| {
            let encoded = encode_key(&record.key())?;
            let json = serde_json::to_vec(&record)?;

            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(BALANCES)?;
                if table.get(encoded.as_str())?.is_some() {
                    return Err(LedgerError::Duplicate);
                }
                table.insert(encoded.as_str(), json.as_slice())?;
            }
            write_txn.commit()?;
            Ok(())
        })
        .await
    }

    async fn increment(&self, key: &BalanceKey, delta: f64) -> LedgerResult<BalanceRecord> {
        let key = key.clone();
        self.blocking(move |db| {
            let encoded = encode_key(&key)?;

            let write_txn = db.begin_write()?;
            let record = {
                let mut table = write_txn.open_table(BALANCES)?;
                let mut record: BalanceRecord = match table.get(encoded.as_str())? {
                    Some(value) => serde_json::from_slice(value.value())?,
                    None => return Err(LedgerError::NotFound),
                };
                record.amount += delta;
                record.updated_at = Utc::now();

                let json = serde_json::to_vec(&record)?;
                table.insert(encoded.as_str(), json.as_slice())?;
                record
            };
            write_txn.commit()?;
            Ok(record)
        })
        .await
    }
}

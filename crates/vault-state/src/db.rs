use std::path::Path;

use sled::transaction::{ConflictableTransactionError, TransactionError, TransactionalTree};
use vault_core::{Contribution, ContributionId, Timestamp, TreasuryAggregate, TxHash, VaultError};

pub(crate) const TREASURY_KEY: &[u8] = b"treasury";

/// Persistent state database backed by sled (pure-Rust, no C dependencies).
///
/// Named trees:
///   contributions ContributionId BE bytes → bincode(Contribution)
///   tx_index      deposit TxHash bytes    → ContributionId BE bytes
///   treasury      "treasury"              → bincode(TreasuryAggregate)
///
/// `tx_index` is the uniqueness constraint on deposit hashes: an entry is
/// only ever created inside the same transaction that inserts the row.
pub struct StateDb {
    db: sled::Db,
    pub(crate) contributions: sled::Tree,
    pub(crate) tx_index: sled::Tree,
    pub(crate) treasury: sled::Tree,
}

impl StateDb {
    /// Open or create the state database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VaultError> {
        let db = sled::open(path).map_err(|e| VaultError::Storage(e.to_string()))?;
        let contributions = db.open_tree("contributions").map_err(|e| VaultError::Storage(e.to_string()))?;
        let tx_index      = db.open_tree("tx_index").map_err(|e| VaultError::Storage(e.to_string()))?;
        let treasury      = db.open_tree("treasury").map_err(|e| VaultError::Storage(e.to_string()))?;
        Ok(Self { db, contributions, tx_index, treasury })
    }

    /// Allocate a fresh, never-reused contribution id.
    pub fn next_contribution_id(&self) -> Result<ContributionId, VaultError> {
        self.db.generate_id().map_err(|e| VaultError::Storage(e.to_string()))
    }

    // ── Contributions ────────────────────────────────────────────────────────

    pub fn get_contribution(&self, id: ContributionId) -> Result<Option<Contribution>, VaultError> {
        match self.contributions.get(id.to_be_bytes()).map_err(|e| VaultError::Storage(e.to_string()))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn contribution_by_tx(&self, tx_hash: &TxHash) -> Result<Option<Contribution>, VaultError> {
        match self.tx_index.get(tx_hash.as_bytes()).map_err(|e| VaultError::Storage(e.to_string()))? {
            Some(id_bytes) => self.get_contribution(id_from_bytes(&id_bytes)?),
            None => Ok(None),
        }
    }

    pub fn tx_recorded(&self, tx_hash: &TxHash) -> Result<bool, VaultError> {
        self.tx_index
            .contains_key(tx_hash.as_bytes())
            .map_err(|e| VaultError::Storage(e.to_string()))
    }

    /// All contributions in insertion order.
    pub fn iter_contributions(&self) -> impl DoubleEndedIterator<Item = Result<Contribution, VaultError>> + '_ {
        self.contributions.iter().map(|item| {
            let (_, bytes) = item.map_err(|e| VaultError::Storage(e.to_string()))?;
            decode(&bytes)
        })
    }

    // ── Treasury ─────────────────────────────────────────────────────────────

    pub fn get_treasury(&self) -> Result<Option<TreasuryAggregate>, VaultError> {
        match self.treasury.get(TREASURY_KEY).map_err(|e| VaultError::Storage(e.to_string()))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), VaultError> {
        self.db.flush().map_err(|e| VaultError::Storage(e.to_string()))?;
        Ok(())
    }
}

// ── Encoding helpers ─────────────────────────────────────────────────────────

pub(crate) type TxResult<T> = Result<T, ConflictableTransactionError<VaultError>>;

pub(crate) fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, VaultError> {
    bincode::serialize(value).map_err(|e| VaultError::Serialization(e.to_string()))
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, VaultError> {
    bincode::deserialize(bytes).map_err(|e| VaultError::Serialization(e.to_string()))
}

pub(crate) fn id_from_bytes(bytes: &[u8]) -> Result<ContributionId, VaultError> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| VaultError::Serialization(format!("bad contribution id length {}", bytes.len())))?;
    Ok(ContributionId::from_be_bytes(arr))
}

/// Abort the surrounding transaction with a domain error.
pub(crate) fn abort<T>(e: VaultError) -> TxResult<T> {
    Err(ConflictableTransactionError::Abort(e))
}

pub(crate) fn tx_encode<T: serde::Serialize>(value: &T) -> TxResult<Vec<u8>> {
    encode(value).map_err(ConflictableTransactionError::Abort)
}

pub(crate) fn tx_decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> TxResult<T> {
    decode(bytes).map_err(ConflictableTransactionError::Abort)
}

/// Load the treasury row inside a transaction; an unseeded store starts
/// from an empty row.
pub(crate) fn tx_load_treasury(tree: &TransactionalTree, now: Timestamp) -> TxResult<TreasuryAggregate> {
    match tree.get(TREASURY_KEY)? {
        Some(bytes) => tx_decode(&bytes),
        None => Ok(TreasuryAggregate::seed(0.0, 0.0, now)),
    }
}

pub(crate) fn tx_store_treasury(tree: &TransactionalTree, row: &TreasuryAggregate) -> TxResult<()> {
    tree.insert(TREASURY_KEY, tx_encode(row)?)?;
    Ok(())
}

pub(crate) fn map_tx_error(e: TransactionError<VaultError>) -> VaultError {
    match e {
        TransactionError::Abort(inner) => inner,
        TransactionError::Storage(se) => VaultError::Storage(se.to_string()),
    }
}

#[cfg(test)]
pub(crate) fn temp_db(name: &str) -> StateDb {
    let dir = std::env::temp_dir().join(format!("stakevault_state_test_{}", name));
    let _ = std::fs::remove_dir_all(&dir);
    StateDb::open(&dir).expect("open temp db")
}

use crate::error::{LedgerError, Result};
use crate::merkle::{self, MerkleProof};
use crate::{Hash, Key, Store};
use std::collections::BTreeMap;

/// In-memory ledger. Keys iterate in ascending order, which is the leaf
/// order of the state root.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemLedger {
    entries: BTreeMap<Key, Vec<u8>>,
}

impl MemLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Vec<u8>)> {
        self.entries.iter()
    }

    fn leaves(&self) -> Vec<Hash> {
        self.entries
            .iter()
            .map(|(k, v)| merkle::leaf_hash(k, v))
            .collect()
    }
}

impl Store for MemLedger {
    fn get(&self, key: &Key) -> Result<Vec<u8>> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(hex::encode(key)))
    }

    fn put(&mut self, key: Key, value: Vec<u8>) -> Result<()> {
        self.entries.insert(key, value);
        Ok(())
    }

    fn write_batch(&mut self, batch: Vec<(Key, Vec<u8>)>) -> Result<()> {
        // Inserting into a map cannot fail part-way.
        self.entries.extend(batch);
        Ok(())
    }

    fn root(&self) -> Hash {
        merkle::root_of(&self.leaves())
    }

    fn prove(&self, key: &Key) -> Result<MerkleProof> {
        let index = self
            .entries
            .keys()
            .position(|k| k == key)
            .ok_or_else(|| LedgerError::NotFound(hex::encode(key)))?;
        MerkleProof::build(*key, &self.leaves(), index)
            .ok_or_else(|| LedgerError::Corrupt("proof index out of range".into()))
    }
}

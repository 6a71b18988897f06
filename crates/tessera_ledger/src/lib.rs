//! Record store consumed by the tessera execution core.
//!
//! The core only ever talks to a [`Store`]: fetch the bytes stored under a
//! chain identifier, write a block's worth of records in one batch, and
//! report the accumulated state root. Two backends live here:
//!
//! - [`MemLedger`]: ordered in-memory map, used by tests and simulations.
//! - [`FsLedger`]: sharded file layout (`store/aa/bb/<hex>.rec`) with a batch
//!   journal so a block is either fully applied or replayed on reopen.
//!
//! The state root is a binary Merkle tree over the records in key order
//! (see [`merkle`]).

pub mod error;
pub mod fs;
pub mod memory;
pub mod merkle;

pub use error::{LedgerError, Result};
pub use fs::FsLedger;
pub use memory::MemLedger;
pub use merkle::MerkleProof;

/// Chain identifier: SHA-256 of a canonical chain URL.
pub type Key = [u8; 32];

/// 32-byte digest (state roots, tree nodes).
pub type Hash = [u8; 32];

pub trait Store {
    /// Bytes stored under `key`, or [`LedgerError::NotFound`].
    fn get(&self, key: &Key) -> Result<Vec<u8>>;

    fn put(&mut self, key: Key, value: Vec<u8>) -> Result<()>;

    /// Apply every write or none of them. The default applies writes one by
    /// one; backends with a real atomicity story override it.
    fn write_batch(&mut self, batch: Vec<(Key, Vec<u8>)>) -> Result<()> {
        for (key, value) in batch {
            self.put(key, value)?;
        }
        Ok(())
    }

    /// Current Merkle root over all records. The empty store has the zero hash.
    fn root(&self) -> Hash;

    /// Inclusion proof for `key` against [`Store::root`].
    fn prove(&self, key: &Key) -> Result<MerkleProof>;

    fn contains(&self, key: &Key) -> Result<bool> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

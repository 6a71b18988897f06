//! File-backed ledger.
//!
//! Layout under the ledger directory:
//!
//! ```text
//! store/<aa>/<bb>/<hex key>.rec   one file per record
//! batch.journal                   present only while a batch is being applied
//! ```
//!
//! A batch is first written to `batch.journal.tmp` and renamed into place, so
//! the journal either exists completely or not at all. Records are then
//! written one by one and the journal removed. Opening a ledger that still has
//! a journal replays it before anything else.

use crate::error::{LedgerError, Result};
use crate::memory::MemLedger;
use crate::merkle::MerkleProof;
use crate::{Hash, Key, Store};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const STORE_DIR: &str = "store";
const JOURNAL: &str = "batch.journal";
const JOURNAL_TMP: &str = "batch.journal.tmp";
const RECORD_EXT: &str = "rec";

#[derive(Debug)]
pub struct FsLedger {
    dir: PathBuf,
    // Mirror of what is on disk; serves reads and root computation.
    index: MemLedger,
}

impl FsLedger {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(dir.join(STORE_DIR))?;
        let mut ledger = Self {
            dir,
            index: MemLedger::new(),
        };
        if ledger.journal_path().exists() {
            warn!(dir = %ledger.dir.display(), "replaying unfinished batch journal");
            let bytes = fs::read(ledger.journal_path())?;
            let batch = decode_journal(&bytes)?;
            ledger.apply_files(&batch)?;
            fs::remove_file(ledger.journal_path())?;
        }
        ledger.load_index()?;
        Ok(ledger)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn journal_path(&self) -> PathBuf {
        self.dir.join(JOURNAL)
    }

    fn record_path(&self, key: &Key) -> PathBuf {
        let s = hex::encode(key);
        let (p1, p2) = (&s[0..2], &s[2..4]);
        self.dir
            .join(STORE_DIR)
            .join(p1)
            .join(p2)
            .join(format!("{}.{}", s, RECORD_EXT))
    }

    fn write_record(&self, key: &Key, value: &[u8]) -> Result<()> {
        let path = self.record_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value)?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    fn apply_files(&self, batch: &[(Key, Vec<u8>)]) -> Result<()> {
        for (key, value) in batch {
            self.write_record(key, value)?;
        }
        Ok(())
    }

    fn load_index(&mut self) -> Result<()> {
        let root = self.dir.join(STORE_DIR);
        for shard1 in fs::read_dir(&root)? {
            let shard1 = shard1?.path();
            if !shard1.is_dir() {
                continue;
            }
            for shard2 in fs::read_dir(&shard1)? {
                let shard2 = shard2?.path();
                if !shard2.is_dir() {
                    continue;
                }
                for entry in fs::read_dir(&shard2)? {
                    let path = entry?.path();
                    if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                        continue;
                    }
                    let key = key_from_path(&path)?;
                    let value = fs::read(&path)?;
                    self.index.put(key, value)?;
                }
            }
        }
        debug!(records = self.index.len(), "ledger index loaded");
        Ok(())
    }
}

fn key_from_path(path: &Path) -> Result<Key> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| LedgerError::Corrupt(format!("bad record name {}", path.display())))?;
    let bytes = hex::decode(stem)
        .map_err(|_| LedgerError::Corrupt(format!("bad record name {}", path.display())))?;
    bytes
        .try_into()
        .map_err(|_| LedgerError::Corrupt(format!("bad key length in {}", path.display())))
}

fn encode_journal(batch: &[(Key, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(batch.len() as u64).to_be_bytes());
    for (key, value) in batch {
        out.extend_from_slice(key);
        out.extend_from_slice(&(value.len() as u64).to_be_bytes());
        out.extend_from_slice(value);
    }
    out
}

fn decode_journal(mut data: &[u8]) -> Result<Vec<(Key, Vec<u8>)>> {
    fn take<'a>(data: &mut &'a [u8], n: usize) -> Result<&'a [u8]> {
        if data.len() < n {
            return Err(LedgerError::Corrupt("truncated batch journal".into()));
        }
        let (head, tail) = data.split_at(n);
        *data = tail;
        Ok(head)
    }
    fn take_u64(data: &mut &[u8]) -> Result<u64> {
        let mut b = [0u8; 8];
        b.copy_from_slice(take(data, 8)?);
        Ok(u64::from_be_bytes(b))
    }

    let count = take_u64(&mut data)?;
    let mut batch = Vec::new();
    for _ in 0..count {
        let mut key = [0u8; 32];
        key.copy_from_slice(take(&mut data, 32)?);
        let len = usize::try_from(take_u64(&mut data)?)
            .map_err(|_| LedgerError::Corrupt("journal entry too large".into()))?;
        batch.push((key, take(&mut data, len)?.to_vec()));
    }
    if !data.is_empty() {
        return Err(LedgerError::Corrupt("trailing bytes in batch journal".into()));
    }
    Ok(batch)
}

impl Store for FsLedger {
    fn get(&self, key: &Key) -> Result<Vec<u8>> {
        self.index.get(key)
    }

    fn put(&mut self, key: Key, value: Vec<u8>) -> Result<()> {
        self.write_batch(vec![(key, value)])
    }

    fn write_batch(&mut self, batch: Vec<(Key, Vec<u8>)>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let tmp = self.dir.join(JOURNAL_TMP);
        fs::write(&tmp, encode_journal(&batch))?;
        fs::rename(&tmp, self.journal_path())?;
        self.apply_files(&batch)?;
        fs::remove_file(self.journal_path())?;
        debug!(records = batch.len(), "batch applied");
        self.index.write_batch(batch)
    }

    fn root(&self) -> Hash {
        self.index.root()
    }

    fn prove(&self, key: &Key) -> Result<MerkleProof> {
        self.index.prove(key)
    }
}

//! Per-transaction execution context.
//!
//! A [`StateManager`] reads through a [`StateView`] (committed store plus the
//! current block's staged writes) and collects everything a validator wants
//! to change. Nothing reaches the view until [`StateManager::commit`] hands
//! the staged writes and submissions back to the executor; dropping the
//! manager or calling [`StateManager::abort`] discards them.

use crate::envelope::Envelope;
use crate::error::{ExecError, Result};
use crate::hash::Hash32;
use crate::record::{decode_record, Record, RecordKind};
use crate::txn::TxBody;
use crate::url::{ChainId, ChainUrl};
use std::collections::BTreeMap;
use tessera_ledger::Store;

/// Writes staged by earlier transactions of the block that is being built.
pub type Overlay = BTreeMap<ChainId, Vec<u8>>;

/// Read-only view: the block overlay first, then the committed store.
#[derive(Clone, Copy)]
pub struct StateView<'a> {
    store: &'a dyn Store,
    overlay: &'a Overlay,
}

impl<'a> StateView<'a> {
    pub fn new(store: &'a dyn Store, overlay: &'a Overlay) -> Self {
        Self { store, overlay }
    }

    /// `Ok(None)` when the chain does not exist; other storage failures are
    /// errors.
    pub fn get(&self, id: &ChainId) -> Result<Option<Vec<u8>>> {
        if let Some(v) = self.overlay.get(id) {
            return Ok(Some(v.clone()));
        }
        match self.store.get(id.as_bytes()) {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// A synthetic transaction body waiting for its envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub url: ChainUrl,
    pub body: TxBody,
}

/// Output of a successful execution.
#[derive(Debug)]
pub struct Staged {
    /// Chain the transaction was applied to.
    pub origin_url: ChainUrl,
    pub writes: Vec<(ChainId, Vec<u8>)>,
    pub submissions: Vec<Submission>,
}

pub struct StateManager<'a> {
    view: StateView<'a>,
    tx_hash: Hash32,
    origin: Option<Record>,
    origin_url: ChainUrl,
    origin_chain_id: ChainId,
    writes: BTreeMap<ChainId, Record>,
    submissions: Vec<Submission>,
}

impl<'a> StateManager<'a> {
    /// Resolve the origin chain named by the envelope.
    ///
    /// A missing origin is not an error here: the context comes back with no
    /// origin record and the URL the body declares. Whether that is
    /// acceptable is the validator's call. Fails with not-found only when the
    /// chain is absent and the body names no matching URL.
    pub fn open(view: StateView<'a>, env: &Envelope, body: &TxBody) -> Result<Self> {
        let origin_chain_id = env.chain_id;
        let (origin, origin_url) = match view.get(&origin_chain_id)? {
            Some(bytes) => {
                let record = decode_record(&bytes)?;
                let url = record.url().clone();
                if url.chain_id() != origin_chain_id {
                    return Err(ExecError::Encoding(format!(
                        "record {} is stored under chain {}",
                        url, origin_chain_id
                    )));
                }
                (Some(record), url)
            }
            None => {
                let url = body
                    .target_url()
                    .filter(|u| u.chain_id() == origin_chain_id)
                    .cloned()
                    .ok_or_else(|| {
                        ExecError::NotFound(format!("origin chain {}", origin_chain_id))
                    })?;
                (None, url)
            }
        };
        if env.routing != origin_url.routing() {
            return Err(ExecError::Validation(format!(
                "routing number {:#018x} does not match {}",
                env.routing, origin_url
            )));
        }
        Ok(Self {
            view,
            tx_hash: env.transaction_hash(),
            origin,
            origin_url,
            origin_chain_id,
            writes: BTreeMap::new(),
            submissions: Vec::new(),
        })
    }

    pub fn tx_hash(&self) -> Hash32 {
        self.tx_hash
    }

    pub fn origin(&self) -> Option<&Record> {
        self.origin.as_ref()
    }

    pub fn origin_url(&self) -> &ChainUrl {
        &self.origin_url
    }

    pub fn origin_chain_id(&self) -> ChainId {
        self.origin_chain_id
    }

    /// This transaction's own staged write wins over the view.
    pub fn load_optional(&self, id: &ChainId) -> Result<Option<Record>> {
        if let Some(r) = self.writes.get(id) {
            return Ok(Some(r.clone()));
        }
        self.view.get(id)?.map(|b| decode_record(&b)).transpose()
    }

    pub fn load(&self, id: &ChainId) -> Result<Record> {
        self.load_optional(id)?
            .ok_or_else(|| ExecError::NotFound(format!("chain {}", id)))
    }

    pub fn load_as<T: RecordKind>(&self, id: &ChainId) -> Result<T> {
        self.load(id)?.try_into()
    }

    pub fn load_by_url_as<T: RecordKind>(&self, url: &ChainUrl) -> Result<T> {
        self.load_as(&url.chain_id())
    }

    pub fn exists(&self, url: &ChainUrl) -> Result<bool> {
        Ok(self.load_optional(&url.chain_id())?.is_some())
    }

    /// Stage a record for write-back. A later update of the same chain
    /// replaces an earlier one.
    pub fn update(&mut self, record: impl Into<Record>) {
        let record = record.into();
        self.writes.insert(record.url().chain_id(), record);
    }

    /// Stage a synthetic transaction. Its cause is this transaction's hash
    /// and its index is the number of submissions made before it.
    pub fn submit(&mut self, url: ChainUrl, mut body: TxBody) {
        body.set_cause(self.tx_hash, self.submissions.len() as u64);
        self.submissions.push(Submission { url, body });
    }

    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    pub fn commit(self) -> Staged {
        Staged {
            origin_url: self.origin_url,
            writes: self
                .writes
                .into_iter()
                .map(|(id, r)| (id, r.encode()))
                .collect(),
            submissions: self.submissions,
        }
    }

    pub fn abort(self) {}
}

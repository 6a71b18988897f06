//! Fixtures shared by unit tests.

use crate::envelope::Envelope;
use crate::error::Result;
use crate::record::Record;
use crate::signature::KeyRing;
use crate::state::{Overlay, Staged, StateView};
use crate::txn::TxBody;
use crate::url::ChainUrl;
use crate::validator;
use tessera_config::ExecConfig;
use tessera_ledger::{MemLedger, Store};

pub fn u(s: &str) -> ChainUrl {
    ChainUrl::parse(s).unwrap()
}

pub fn signed(url: &ChainUrl, body: &TxBody) -> Envelope {
    let mut env = Envelope::new(url, body.encode());
    env.sign(&KeyRing::dev());
    env
}

#[derive(Default)]
pub struct Fixture {
    pub store: MemLedger,
    pub overlay: Overlay,
    pub config: ExecConfig,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, record: impl Into<Record>) -> Self {
        let record = record.into();
        self.store
            .put(record.url().chain_id().0, record.encode())
            .unwrap();
        self
    }

    /// Run `body` against `url` and return what was staged.
    pub fn run(&self, url: &ChainUrl, body: TxBody) -> Result<Staged> {
        let env = signed(url, &body);
        validator::apply(StateView::new(&self.store, &self.overlay), &env, &body, &self.config)
    }

    pub fn run_hash(&self, url: &ChainUrl, body: &TxBody) -> [u8; 32] {
        signed(url, body).transaction_hash()
    }
}

/// Decode the record staged for `url`.
pub fn staged_record(staged: &Staged, url: &ChainUrl) -> Option<Record> {
    let id = url.chain_id();
    staged
        .writes
        .iter()
        .find(|(k, _)| *k == id)
        .map(|(_, v)| crate::record::decode_record(v).unwrap())
}

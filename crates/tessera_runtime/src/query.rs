//! Read-only lookups against committed state.

use crate::error::{ExecError, Result};
use crate::hash::Hash32;
use crate::record::{decode_record, Record};
use crate::synthetic::transaction_key;
use crate::url::{ChainId, ChainUrl};
use tessera_ledger::{MerkleProof, Store};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryRequest {
    /// Record stored under a chain id.
    Chain(ChainId),
    /// Record of the chain a URL names.
    Url(ChainUrl),
    /// Committed transaction by hash.
    Transaction(Hash32),
    /// Record plus an inclusion proof against the current root.
    Proof(ChainUrl),
}

#[derive(Debug, Clone)]
pub struct QueryResponse {
    pub chain_id: ChainId,
    pub record: Record,
    pub bytes: Vec<u8>,
    pub proof: Option<MerkleProof>,
    pub root: Hash32,
}

impl QueryResponse {
    pub fn record_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(&self.record).map_err(|e| ExecError::Encoding(e.to_string()))
    }
}

pub fn query(store: &dyn Store, req: &QueryRequest) -> Result<QueryResponse> {
    let (chain_id, with_proof) = match req {
        QueryRequest::Chain(id) => (*id, false),
        QueryRequest::Url(url) => (url.chain_id(), false),
        QueryRequest::Transaction(hash) => (transaction_key(hash), false),
        QueryRequest::Proof(url) => (url.chain_id(), true),
    };
    let bytes = store.get(chain_id.as_bytes())?;
    let record = decode_record(&bytes)?;
    if let QueryRequest::Transaction(_) = req {
        if !matches!(record, Record::Transaction(_)) {
            return Err(ExecError::wrong_type("Transaction", record.record_type().name()));
        }
    }
    let proof = if with_proof {
        Some(store.prove(chain_id.as_bytes())?)
    } else {
        None
    };
    Ok(QueryResponse {
        chain_id,
        record,
        bytes,
        proof,
        root: store.root(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Identity, TokenAccount, Transaction};
    use crate::testing::u;
    use tessera_ledger::MemLedger;

    fn seeded() -> MemLedger {
        let mut store = MemLedger::new();
        for r in [
            Record::from(Identity { url: u("alice"), key_book: None }),
            Record::from(TokenAccount::new(u("alice/tokens"), u("acme"))),
        ] {
            store.put(r.url().chain_id().0, r.encode()).unwrap();
        }
        store
    }

    #[test]
    fn url_and_chain_lookups_agree() {
        let store = seeded();
        let by_url = query(&store, &QueryRequest::Url(u("alice/tokens"))).unwrap();
        let by_id = query(&store, &QueryRequest::Chain(u("alice/tokens").chain_id())).unwrap();
        assert_eq!(by_url.record, by_id.record);
        assert_eq!(by_url.bytes, by_id.bytes);
        assert!(by_url.proof.is_none());
        assert_eq!(by_url.root, store.root());
    }

    #[test]
    fn proof_verifies_against_root() {
        let store = seeded();
        let resp = query(&store, &QueryRequest::Proof(u("alice"))).unwrap();
        let proof = resp.proof.unwrap();
        assert!(proof.verify());
        assert!(proof.verify_value(&resp.bytes));
        assert_eq!(proof.root, resp.root);
    }

    #[test]
    fn missing_chain_is_not_found() {
        let err = query(&seeded(), &QueryRequest::Url(u("bob"))).unwrap_err();
        assert!(matches!(err, ExecError::NotFound(_)));
    }

    #[test]
    fn transaction_lookup_requires_transaction_record() {
        let mut store = seeded();
        let hash = [4u8; 32];
        store
            .put(hash, Record::from(Transaction { url: u("alice"), envelope: vec![1, 2] }).encode())
            .unwrap();
        let resp = query(&store, &QueryRequest::Transaction(hash)).unwrap();
        assert!(matches!(resp.record, Record::Transaction(_)));

        let err = query(&store, &QueryRequest::Transaction(u("alice").chain_id().0)).unwrap_err();
        assert!(matches!(err, ExecError::WrongType { .. }));
    }

    #[test]
    fn json_view_names_the_type() {
        let resp = query(&seeded(), &QueryRequest::Url(u("alice/tokens"))).unwrap();
        let json = resp.record_json().unwrap();
        assert_eq!(json["type"], "TokenAccount");
    }
}

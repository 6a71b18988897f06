//! Synthetic dispatch: turning staged submissions into signed envelopes,
//! refusing a second application of the same synthetic transaction, and
//! keeping the node's tally of what it produced.

use crate::envelope::Envelope;
use crate::error::{ExecError, Result};
use crate::hash::Hash32;
use crate::record::{decode_record, Record, SyntheticTransactionChain};
use crate::signature::KeyRing;
use crate::state::{StateView, Submission};
use crate::url::{ChainId, ChainUrl};

/// Envelope for a staged submission, routed to its destination and signed
/// by the node.
pub fn build_envelope(sub: &Submission, keys: &KeyRing) -> Envelope {
    let mut env = Envelope::new(&sub.url, sub.body.encode());
    env.sign(keys);
    env
}

/// Key under which a committed transaction is stored.
pub fn transaction_key(hash: &Hash32) -> ChainId {
    ChainId(*hash)
}

/// Whether a transaction with this hash was already committed, or staged
/// earlier in the current block.
pub fn already_applied(view: &StateView<'_>, hash: &Hash32) -> Result<bool> {
    Ok(view.get(&transaction_key(hash))?.is_some())
}

/// Advance the synthetic tally by the envelopes a block produced. Returns
/// `None` when the block produced nothing.
pub fn advance_ledger(
    view: &StateView<'_>,
    url: &ChainUrl,
    height: u64,
    produced: &[Envelope],
) -> Result<Option<SyntheticTransactionChain>> {
    let Some(last) = produced.last() else {
        return Ok(None);
    };
    let mut ledger = match view.get(&url.chain_id())? {
        Some(bytes) => match decode_record(&bytes)? {
            Record::SyntheticTransactionChain(l) => l,
            other => {
                return Err(ExecError::wrong_type(
                    "SyntheticTransactionChain",
                    other.record_type().name(),
                ))
            }
        },
        None => SyntheticTransactionChain {
            url: url.clone(),
            count: 0,
            height: 0,
            tip: [0; 32],
        },
    };
    ledger.count += produced.len() as u64;
    ledger.height = height;
    ledger.tip = last.transaction_hash();
    Ok(Some(ledger))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Identity, RecordKind, Transaction};
    use crate::state::Overlay;
    use crate::testing::u;
    use crate::txn::{SyntheticDepositTokens, SyntheticHeader, TxBody};
    use num_bigint::BigUint;
    use tessera_ledger::{MemLedger, Store};

    fn deposit(to: &str, index: u64) -> Submission {
        Submission {
            url: u(to),
            body: TxBody::SyntheticDepositTokens(SyntheticDepositTokens {
                header: SyntheticHeader { cause: [9; 32], index },
                to: u(to),
                token: u("acme"),
                amount: BigUint::from(5u32),
            }),
        }
    }

    #[test]
    fn envelope_is_routed_and_verifies() {
        let env = build_envelope(&deposit("bob/tokens", 0), &KeyRing::dev());
        assert_eq!(env.chain_id, u("bob/tokens").chain_id());
        assert_eq!(env.routing, u("bob/tokens").routing());
        env.verify_signatures(1).unwrap();
    }

    #[test]
    fn index_separates_identical_outputs() {
        let keys = KeyRing::dev();
        let a = build_envelope(&deposit("bob/tokens", 0), &keys);
        let b = build_envelope(&deposit("bob/tokens", 1), &keys);
        assert_ne!(a.transaction_hash(), b.transaction_hash());
    }

    #[test]
    fn applied_transactions_are_seen_in_store_and_overlay() {
        let env = build_envelope(&deposit("bob/tokens", 0), &KeyRing::dev());
        let hash = env.transaction_hash();
        let record = Transaction { url: u("bob/tokens"), envelope: env.to_wire() }.encode();

        let empty = MemLedger::new();
        let mut overlay = Overlay::new();
        assert!(!already_applied(&StateView::new(&empty, &overlay), &hash).unwrap());

        overlay.insert(transaction_key(&hash), record.clone());
        assert!(already_applied(&StateView::new(&empty, &overlay), &hash).unwrap());

        let mut store = MemLedger::new();
        store.put(hash, record).unwrap();
        assert!(already_applied(&StateView::new(&store, &Overlay::new()), &hash).unwrap());
    }

    #[test]
    fn ledger_counts_and_tracks_tip() {
        let keys = KeyRing::dev();
        let url = u("node/synthetic");
        let store = MemLedger::new();
        let overlay = Overlay::new();
        let view = StateView::new(&store, &overlay);
        assert_eq!(advance_ledger(&view, &url, 1, &[]).unwrap(), None);

        let produced = vec![
            build_envelope(&deposit("a/tokens", 0), &keys),
            build_envelope(&deposit("b/tokens", 1), &keys),
        ];
        let ledger = advance_ledger(&view, &url, 4, &produced).unwrap().unwrap();
        assert_eq!((ledger.count, ledger.height), (2, 4));
        assert_eq!(ledger.tip, produced[1].transaction_hash());

        let mut store = MemLedger::new();
        store.put(url.chain_id().0, Record::from(ledger).encode()).unwrap();
        let view = StateView::new(&store, &overlay);
        let next = advance_ledger(&view, &url, 5, &produced[..1]).unwrap().unwrap();
        assert_eq!((next.count, next.height), (3, 5));
    }

    #[test]
    fn ledger_slot_holding_another_record_is_rejected() {
        let url = u("node/synthetic");
        let mut store = MemLedger::new();
        store
            .put(url.chain_id().0, Record::from(Identity { url: url.clone(), key_book: None }).encode())
            .unwrap();
        let overlay = Overlay::new();
        let produced = vec![build_envelope(&deposit("a/tokens", 0), &KeyRing::dev())];
        let err = advance_ledger(&StateView::new(&store, &overlay), &url, 1, &produced).unwrap_err();
        assert!(matches!(err, ExecError::WrongType { .. }));
    }
}

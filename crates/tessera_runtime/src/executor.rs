//! Block executor: the surface the consensus engine drives.
//!
//! Transactions are applied strictly in delivery order. Each successful
//! delivery folds its writes into the block batch, so later transactions of
//! the same block read what earlier ones staged. Nothing reaches the store
//! before [`Executor::commit`], which writes the whole batch in one call.
//! Synthetic envelopes produced by the block are released to the outbox only
//! after that write succeeds.
//!
//! Synthetic transactions are only accepted when signed by this node's key
//! or one of the configured validator keys.

use crate::envelope::Envelope;
use crate::error::{ErrorKind, ExecError, Result};
use crate::hash::{short, Hash32};
use crate::query::{self, QueryRequest, QueryResponse};
use crate::record::{Record, Transaction};
use crate::signature::{KeyRing, PUBLIC_KEY_LEN};
use crate::state::{Overlay, Staged, StateView};
use crate::synthetic;
use crate::txn::{TxBody, TxType};
use crate::url::ChainUrl;
use crate::validator;
use tessera_config::ExecConfig;
use tessera_ledger::{FsLedger, Store};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockHeader {
    /// Only the leader hands synthetic transactions to the delivery system.
    pub is_leader: bool,
    pub height: u64,
    /// Block time in seconds, as supplied by consensus.
    pub time: u64,
}

struct Block {
    header: BlockHeader,
    batch: Overlay,
    synthetic: Vec<Envelope>,
    delivered: usize,
    poisoned: Option<String>,
}

/// Outcome of running one transaction against a view.
struct Executed {
    hash: Hash32,
    tx_type: TxType,
    staged: Staged,
}

pub struct Executor<S: Store> {
    store: S,
    config: ExecConfig,
    keys: KeyRing,
    validators: Vec<[u8; PUBLIC_KEY_LEN]>,
    synthetic_url: ChainUrl,
    block: Option<Block>,
    outbox: Vec<Envelope>,
}

impl<S: Store> Executor<S> {
    pub fn new(store: S, config: ExecConfig, keys: KeyRing) -> Result<Self> {
        let synthetic_url = ChainUrl::parse(&config.synthetic_ledger_url)?;
        let mut validators = vec![keys.public_key()];
        for k in &config.validator_keys {
            let pk = hex::decode(k)
                .ok()
                .and_then(|b| <[u8; PUBLIC_KEY_LEN]>::try_from(b).ok())
                .ok_or_else(|| ExecError::Signature(format!("invalid validator key {:?}", k)))?;
            if !validators.contains(&pk) {
                validators.push(pk);
            }
        }
        Ok(Self {
            store,
            config,
            keys,
            validators,
            synthetic_url,
            block: None,
            outbox: Vec::new(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Direct store access, for seeding genesis records outside a block.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    pub fn in_block(&self) -> bool {
        self.block.is_some()
    }

    /// Dry run against committed state. Nothing is staged.
    pub fn check(&self, bytes: &[u8]) -> Result<()> {
        let empty = Overlay::new();
        let ex = execute(
            StateView::new(&self.store, &empty),
            &self.config,
            &self.validators,
            bytes,
        )?;
        debug!(tx = %short(&ex.hash), kind = %ex.tx_type, "check passed");
        Ok(())
    }

    pub fn begin_block(&mut self, header: BlockHeader) -> Result<()> {
        if let Some(open) = &self.block {
            return Err(ExecError::Lifecycle(format!(
                "block {} is still open",
                open.header.height
            )));
        }
        info!(height = header.height, leader = header.is_leader, "begin block");
        self.block = Some(Block {
            header,
            batch: Overlay::new(),
            synthetic: Vec::new(),
            delivered: 0,
            poisoned: None,
        });
        Ok(())
    }

    /// Execute one transaction and stage its effects. Returns its hash.
    pub fn deliver(&mut self, bytes: &[u8]) -> Result<Hash32> {
        let block = self
            .block
            .as_mut()
            .ok_or_else(|| ExecError::Lifecycle("deliver outside a block".into()))?;
        if let Some(reason) = &block.poisoned {
            return Err(ExecError::Storage(format!(
                "block {} aborted: {}",
                block.header.height, reason
            )));
        }

        let view = StateView::new(&self.store, &block.batch);
        let ex = match execute(view, &self.config, &self.validators, bytes) {
            Ok(ex) => ex,
            Err(e) if e.kind() == ErrorKind::Storage => {
                warn!(height = block.header.height, error = %e, "storage failure, dropping block batch");
                block.batch.clear();
                block.synthetic.clear();
                block.poisoned = Some(e.to_string());
                return Err(e);
            }
            Err(e) => {
                debug!(height = block.header.height, code = e.code(), error = %e, "transaction rejected");
                return Err(e);
            }
        };

        let Executed { hash, tx_type, staged } = ex;
        block.batch.extend(staged.writes);
        block.batch.insert(
            synthetic::transaction_key(&hash),
            Record::from(Transaction {
                url: staged.origin_url.clone(),
                envelope: bytes.to_vec(),
            })
            .encode(),
        );
        for sub in &staged.submissions {
            block.synthetic.push(synthetic::build_envelope(sub, &self.keys));
        }
        block.delivered += 1;
        info!(
            tx = %short(&hash),
            kind = %tx_type,
            origin = %staged.origin_url,
            synthetic = staged.submissions.len(),
            "transaction applied"
        );
        Ok(hash)
    }

    /// Write the block batch and return the new state root.
    pub fn commit(&mut self) -> Result<Hash32> {
        let block = self
            .block
            .take()
            .ok_or_else(|| ExecError::Lifecycle("commit outside a block".into()))?;
        if let Some(reason) = block.poisoned {
            warn!(height = block.header.height, "refusing to commit aborted block");
            return Err(ExecError::Storage(format!(
                "block {} aborted: {}",
                block.header.height, reason
            )));
        }
        let Block {
            header,
            mut batch,
            synthetic,
            delivered,
            ..
        } = block;

        let dropped = |e: ExecError| {
            warn!(height = header.height, error = %e, "commit failed, dropping block");
            e
        };
        let ledger = synthetic::advance_ledger(
            &StateView::new(&self.store, &batch),
            &self.synthetic_url,
            header.height,
            &synthetic,
        )
        .map_err(dropped)?;
        if let Some(ledger) = ledger {
            batch.insert(self.synthetic_url.chain_id(), Record::from(ledger).encode());
        }

        let writes = batch.len();
        self.store
            .write_batch(batch.into_iter().map(|(id, v)| (id.0, v)).collect())
            .map_err(|e| dropped(e.into()))?;
        let root = self.store.root();

        let produced = synthetic.len();
        if header.is_leader {
            self.outbox.extend(synthetic);
        }
        info!(
            height = header.height,
            delivered,
            writes,
            synthetic = produced,
            root = %hex::encode(root),
            "block committed"
        );
        Ok(root)
    }

    pub fn query(&self, req: &QueryRequest) -> Result<QueryResponse> {
        query::query(&self.store, req)
    }

    /// Drain the synthetic envelopes released by committed blocks, in the
    /// order they were produced.
    pub fn take_outbox(&mut self) -> Vec<Envelope> {
        std::mem::take(&mut self.outbox)
    }
}

impl Executor<FsLedger> {
    /// Open (or create) the file ledger at `config.ledger_dir`.
    pub fn open(config: ExecConfig, keys: KeyRing) -> Result<Self> {
        let store = FsLedger::open(&config.ledger_dir)?;
        info!(dir = %config.ledger_dir, root = %hex::encode(store.root()), "ledger opened");
        Self::new(store, config, keys)
    }
}

/// Decode, authenticate and validate one wire transaction against `view`.
fn execute(
    view: StateView<'_>,
    config: &ExecConfig,
    validators: &[[u8; PUBLIC_KEY_LEN]],
    bytes: &[u8],
) -> Result<Executed> {
    if bytes.len() > config.max_tx_bytes {
        return Err(ExecError::Encoding(format!(
            "transaction of {} bytes exceeds {}",
            bytes.len(),
            config.max_tx_bytes
        )));
    }
    let (env, rest) = Envelope::from_wire(bytes)?;
    if !rest.is_empty() {
        return Err(ExecError::Encoding(format!("{} trailing bytes", rest.len())));
    }
    env.verify_signatures(config.max_signatures)?;
    let body = TxBody::decode(&env.body)?;
    // One body, one hash: anything that re-encodes differently is refused.
    if body.encode() != env.body {
        return Err(ExecError::Encoding("body is not in canonical form".into()));
    }
    let tx_type = body.tx_type();
    if tx_type.is_synthetic() && !env.signed_by_any(validators) {
        return Err(ExecError::Signature(format!(
            "{} is not signed by a validator",
            tx_type
        )));
    }
    let hash = env.transaction_hash();
    if tx_type.is_synthetic() && synthetic::already_applied(&view, &hash)? {
        return Err(ExecError::Validation(format!(
            "synthetic transaction {} already applied",
            short(&hash)
        )));
    }
    let staged = validator::apply(view, &env, &body, config)?;
    Ok(Executed {
        hash,
        tx_type,
        staged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encoder;
    use crate::record::{Identity, TokenAccount};
    use crate::testing::{signed, u};
    use crate::txn::{ChainEntry, CreateToken, SendTokens, SyntheticCreateChain, TokenRecipient};
    use ed25519_dalek::SigningKey;
    use num_bigint::BigUint;
    use tessera_ledger::MemLedger;

    fn executor() -> Executor<MemLedger> {
        executor_with(ExecConfig::default())
    }

    fn executor_with(config: ExecConfig) -> Executor<MemLedger> {
        let mut store = MemLedger::new();
        let mut account = TokenAccount::new(u("alice/tokens"), u("acme"));
        account.balance = BigUint::from(100u32);
        for r in [
            Record::from(Identity { url: u("alice"), key_book: None }),
            Record::from(account),
        ] {
            store.put(r.url().chain_id().0, r.encode()).unwrap();
        }
        Executor::new(store, config, KeyRing::dev()).unwrap()
    }

    fn outsider() -> KeyRing {
        KeyRing::new(SigningKey::from_bytes(&[42u8; 32]), "outsider#k1")
    }

    /// A synthetic overwrite of alice's account, signed by `keys`.
    fn balance_overwrite(keys: &KeyRing) -> Vec<u8> {
        let mut account = TokenAccount::new(u("alice/tokens"), u("acme"));
        account.balance = BigUint::from(1_000_000_000u64);
        let body = TxBody::SyntheticCreateChain(SyntheticCreateChain {
            header: Default::default(),
            chains: vec![ChainEntry::update(&Record::from(account))],
        });
        let mut env = Envelope::new(&u("alice"), body.encode());
        env.sign(keys);
        env.to_wire()
    }

    fn balance(ex: &Executor<MemLedger>) -> BigUint {
        match ex.query(&QueryRequest::Url(u("alice/tokens"))).unwrap().record {
            Record::TokenAccount(a) => a.balance,
            other => panic!("alice/tokens holds {other:?}"),
        }
    }

    fn send(amount: u64) -> Vec<u8> {
        let body = TxBody::SendTokens(SendTokens {
            to: vec![TokenRecipient { url: u("bob/tokens"), amount }],
        });
        signed(&u("alice/tokens"), &body).to_wire()
    }

    fn leader(height: u64) -> BlockHeader {
        BlockHeader { is_leader: true, height, time: 0 }
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    #[test]
    fn deliver_and_commit_need_an_open_block() {
        let mut ex = executor();
        assert!(matches!(ex.deliver(&send(1)).unwrap_err(), ExecError::Lifecycle(_)));
        assert!(matches!(ex.commit().unwrap_err(), ExecError::Lifecycle(_)));
        ex.begin_block(leader(1)).unwrap();
        assert!(matches!(ex.begin_block(leader(2)).unwrap_err(), ExecError::Lifecycle(_)));
    }

    #[test]
    fn empty_block_keeps_root() {
        let mut ex = executor();
        let before = ex.store().root();
        ex.begin_block(leader(1)).unwrap();
        assert_eq!(ex.commit().unwrap(), before);
        assert!(!ex.in_block());
    }

    // ── Delivery ────────────────────────────────────────────────────

    #[test]
    fn nothing_is_written_before_commit() {
        let mut ex = executor();
        let before = ex.store().root();
        ex.begin_block(leader(1)).unwrap();
        let hash = ex.deliver(&send(40)).unwrap();
        assert_eq!(ex.store().root(), before);
        assert!(ex.store().get(&hash).is_err());

        let root = ex.commit().unwrap();
        assert_ne!(root, before);
        assert!(ex.store().get(&hash).is_ok());
        assert_eq!(ex.take_outbox().len(), 1);
        assert!(ex.take_outbox().is_empty());
    }

    #[test]
    fn later_delivery_sees_earlier_one() {
        let mut ex = executor();
        ex.begin_block(leader(1)).unwrap();
        ex.deliver(&send(60)).unwrap();
        let err = ex.deliver(&send(60)).unwrap_err();
        assert!(matches!(err, ExecError::InsufficientBalance(_)));
    }

    #[test]
    fn check_leaves_block_untouched() {
        let mut ex = executor();
        ex.check(&send(60)).unwrap();
        assert!(matches!(ex.check(&send(600)).unwrap_err(), ExecError::InsufficientBalance(_)));
        ex.begin_block(leader(1)).unwrap();
        ex.deliver(&send(60)).unwrap();
        // check reads committed state only
        ex.check(&send(60)).unwrap();
    }

    #[test]
    fn wire_framing_is_enforced() {
        let mut ex = executor();
        ex.begin_block(leader(1)).unwrap();
        let mut bytes = send(1);
        bytes.push(0);
        assert!(matches!(ex.deliver(&bytes).unwrap_err(), ExecError::Encoding(_)));

        let mut small = executor();
        small.config.max_tx_bytes = 16;
        assert!(matches!(small.check(&send(1)).unwrap_err(), ExecError::Encoding(_)));
    }

    #[test]
    fn body_must_be_in_canonical_form() {
        let mut e = Encoder::new();
        e.uvarint(TxType::SendTokens.tag());
        e.uvarint(1);
        e.string("bob/tokens");
        e.u64(1);
        let mut env = Envelope::new(&u("alice/tokens"), e.finish());
        env.sign(&KeyRing::dev());

        let ex = executor();
        assert!(TxBody::decode(&env.body).is_ok());
        let err = ex.check(&env.to_wire()).unwrap_err();
        assert!(matches!(err, ExecError::Encoding(_)), "{err}");
        ex.check(&send(1)).unwrap();
    }

    // ── Synthetic trust ─────────────────────────────────────────────

    #[test]
    fn synthetic_from_outside_key_is_refused() {
        let mut ex = executor();
        ex.begin_block(leader(1)).unwrap();
        let err = ex.deliver(&balance_overwrite(&outsider())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Signature, "{err}");
        ex.commit().unwrap();
        assert_eq!(balance(&ex), BigUint::from(100u32));
    }

    #[test]
    fn configured_validator_may_sign_synthetic() {
        let mut config = ExecConfig::default();
        config.validator_keys = vec![hex::encode(outsider().public_key())];
        let mut ex = executor_with(config);
        ex.begin_block(leader(1)).unwrap();
        ex.deliver(&balance_overwrite(&outsider())).unwrap();
        ex.commit().unwrap();
        assert_eq!(balance(&ex), BigUint::from(1_000_000_000u64));
    }

    #[test]
    fn malformed_validator_key_fails_construction() {
        let mut config = ExecConfig::default();
        config.validator_keys = vec!["abcd".into()];
        let err = Executor::new(MemLedger::new(), config, KeyRing::dev()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Signature);
    }

    #[test]
    fn issuance_is_committed_with_its_transaction() {
        let mut ex = executor();
        let body = TxBody::CreateToken(CreateToken {
            url: u("alice/gold"),
            symbol: "GOLD".into(),
            precision: 2,
        });
        ex.begin_block(leader(1)).unwrap();
        let hash = ex.deliver(&signed(&u("alice"), &body).to_wire()).unwrap();
        ex.commit().unwrap();

        let resp = ex.query(&QueryRequest::Url(u("alice/gold"))).unwrap();
        assert!(matches!(resp.record, Record::TokenIssuer(_)));
        let tx = ex.query(&QueryRequest::Transaction(hash)).unwrap();
        let Record::Transaction(tx) = tx.record else {
            panic!("expected a transaction record");
        };
        assert_eq!(tx.url, u("alice"));
        assert!(ex.take_outbox().is_empty());
    }

    #[test]
    fn follower_keeps_outbox_empty() {
        let mut ex = executor();
        ex.begin_block(BlockHeader { is_leader: false, height: 1, time: 0 }).unwrap();
        ex.deliver(&send(10)).unwrap();
        ex.commit().unwrap();
        assert!(ex.take_outbox().is_empty());
    }
}

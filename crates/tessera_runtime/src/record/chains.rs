use super::{RecordKind, RecordType};
use crate::codec::{Decoder, Encoder};
use crate::error::Result;
use crate::hash::Hash32;
use crate::url::{ChainId, ChainUrl};
use serde::{Deserialize, Serialize};

fn read_ids(d: &mut Decoder<'_>) -> Result<Vec<ChainId>> {
    let n = d.uvarint()?;
    let mut ids = Vec::new();
    for _ in 0..n {
        ids.push(ChainId(d.hash()?));
    }
    Ok(ids)
}

fn write_ids(e: &mut Encoder, ids: &[ChainId]) {
    e.uvarint(ids.len() as u64);
    for id in ids {
        e.hash(id.as_bytes());
    }
}

fn read_opt_id(d: &mut Decoder<'_>) -> Result<Option<ChainId>> {
    Ok(d.opt_hash()?.map(ChainId))
}

/// Named account holder (ADI); owns sub-chains under its authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub url: ChainUrl,
    pub key_book: Option<ChainId>,
}

impl RecordKind for Identity {
    const TYPE: RecordType = RecordType::Identity;

    fn url(&self) -> &ChainUrl {
        &self.url
    }

    fn empty(url: ChainUrl) -> Self {
        Self {
            url,
            key_book: None,
        }
    }

    fn encode_fields(&self, e: &mut Encoder) {
        e.opt_hash(self.key_book.as_ref().map(ChainId::as_bytes));
    }

    fn decode_fields(url: ChainUrl, d: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self {
            url,
            key_book: read_opt_id(d)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenIssuer {
    pub url: ChainUrl,
    pub symbol: String,
    pub precision: u64,
}

impl RecordKind for TokenIssuer {
    const TYPE: RecordType = RecordType::TokenIssuer;

    fn url(&self) -> &ChainUrl {
        &self.url
    }

    fn empty(url: ChainUrl) -> Self {
        Self {
            url,
            symbol: String::new(),
            precision: 0,
        }
    }

    fn encode_fields(&self, e: &mut Encoder) {
        e.string(&self.symbol);
        e.uvarint(self.precision);
    }

    fn decode_fields(url: ChainUrl, d: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self {
            url,
            symbol: d.string()?,
            precision: d.uvarint()?,
        })
    }
}

/// One slot of an account's transaction history: `account/<n>` holds the
/// hash of the n-th transaction applied to the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReference {
    pub url: ChainUrl,
    pub tx_id: Hash32,
}

impl RecordKind for TransactionReference {
    const TYPE: RecordType = RecordType::TransactionReference;

    fn url(&self) -> &ChainUrl {
        &self.url
    }

    fn empty(url: ChainUrl) -> Self {
        Self {
            url,
            tx_id: [0; 32],
        }
    }

    fn encode_fields(&self, e: &mut Encoder) {
        e.hash(&self.tx_id);
    }

    fn decode_fields(url: ChainUrl, d: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self {
            url,
            tx_id: d.hash()?,
        })
    }
}

/// A committed transaction in wire form, stored under its hash. `url` is the
/// chain it was applied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub url: ChainUrl,
    pub envelope: Vec<u8>,
}

impl RecordKind for Transaction {
    const TYPE: RecordType = RecordType::Transaction;

    fn url(&self) -> &ChainUrl {
        &self.url
    }

    fn empty(url: ChainUrl) -> Self {
        Self {
            url,
            envelope: Vec::new(),
        }
    }

    fn encode_fields(&self, e: &mut Encoder) {
        e.bytes(&self.envelope);
    }

    fn decode_fields(url: ChainUrl, d: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self {
            url,
            envelope: d.bytes()?.to_vec(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub url: ChainUrl,
    pub tx_id: Hash32,
    pub envelope: Vec<u8>,
}

impl RecordKind for PendingTransaction {
    const TYPE: RecordType = RecordType::PendingTransaction;

    fn url(&self) -> &ChainUrl {
        &self.url
    }

    fn empty(url: ChainUrl) -> Self {
        Self {
            url,
            tx_id: [0; 32],
            envelope: Vec::new(),
        }
    }

    fn encode_fields(&self, e: &mut Encoder) {
        e.hash(&self.tx_id);
        e.bytes(&self.envelope);
    }

    fn decode_fields(url: ChainUrl, d: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self {
            url,
            tx_id: d.hash()?,
            envelope: d.bytes()?.to_vec(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySpec {
    pub public_key: [u8; 32],
    pub nonce: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPage {
    pub url: ChainUrl,
    /// Book the page is attached to; `None` for an unbound page.
    pub key_book: Option<ChainId>,
    pub keys: Vec<KeySpec>,
}

impl RecordKind for KeyPage {
    const TYPE: RecordType = RecordType::KeyPage;

    fn url(&self) -> &ChainUrl {
        &self.url
    }

    fn empty(url: ChainUrl) -> Self {
        Self {
            url,
            key_book: None,
            keys: Vec::new(),
        }
    }

    fn encode_fields(&self, e: &mut Encoder) {
        e.opt_hash(self.key_book.as_ref().map(ChainId::as_bytes));
        e.uvarint(self.keys.len() as u64);
        for k in &self.keys {
            e.hash(&k.public_key);
            e.u64(k.nonce);
        }
    }

    fn decode_fields(url: ChainUrl, d: &mut Decoder<'_>) -> Result<Self> {
        let key_book = read_opt_id(d)?;
        let n = d.uvarint()?;
        let mut keys = Vec::new();
        for _ in 0..n {
            keys.push(KeySpec {
                public_key: d.hash()?,
                nonce: d.u64()?,
            });
        }
        Ok(Self {
            url,
            key_book,
            keys,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBook {
    pub url: ChainUrl,
    pub pages: Vec<ChainId>,
}

impl RecordKind for KeyBook {
    const TYPE: RecordType = RecordType::KeyBook;

    fn url(&self) -> &ChainUrl {
        &self.url
    }

    fn empty(url: ChainUrl) -> Self {
        Self {
            url,
            pages: Vec::new(),
        }
    }

    fn encode_fields(&self, e: &mut Encoder) {
        write_ids(e, &self.pages);
    }

    fn decode_fields(url: ChainUrl, d: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self {
            url,
            pages: read_ids(d)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAccount {
    pub url: ChainUrl,
    pub key_book: Option<ChainId>,
    pub entry_count: u64,
}

impl RecordKind for DataAccount {
    const TYPE: RecordType = RecordType::DataAccount;

    fn url(&self) -> &ChainUrl {
        &self.url
    }

    fn empty(url: ChainUrl) -> Self {
        Self {
            url,
            key_book: None,
            entry_count: 0,
        }
    }

    fn encode_fields(&self, e: &mut Encoder) {
        e.opt_hash(self.key_book.as_ref().map(ChainId::as_bytes));
        e.u64(self.entry_count);
    }

    fn decode_fields(url: ChainUrl, d: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self {
            url,
            key_book: read_opt_id(d)?,
            entry_count: d.u64()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteDataAccount {
    pub url: ChainUrl,
    pub entry_count: u64,
    pub tail: Hash32,
}

impl RecordKind for LiteDataAccount {
    const TYPE: RecordType = RecordType::LiteDataAccount;

    fn url(&self) -> &ChainUrl {
        &self.url
    }

    fn empty(url: ChainUrl) -> Self {
        Self {
            url,
            entry_count: 0,
            tail: [0; 32],
        }
    }

    fn encode_fields(&self, e: &mut Encoder) {
        e.u64(self.entry_count);
        e.hash(&self.tail);
    }

    fn decode_fields(url: ChainUrl, d: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self {
            url,
            entry_count: d.u64()?,
            tail: d.hash()?,
        })
    }
}

/// Running tally of the synthetic transactions this node has produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticTransactionChain {
    pub url: ChainUrl,
    pub count: u64,
    /// Height of the last block that produced synthetic transactions.
    pub height: u64,
    /// Hash of the most recent synthetic transaction.
    pub tip: Hash32,
}

impl RecordKind for SyntheticTransactionChain {
    const TYPE: RecordType = RecordType::SyntheticTransactionChain;

    fn url(&self) -> &ChainUrl {
        &self.url
    }

    fn empty(url: ChainUrl) -> Self {
        Self {
            url,
            count: 0,
            height: 0,
            tip: [0; 32],
        }
    }

    fn encode_fields(&self, e: &mut Encoder) {
        e.u64(self.count);
        e.u64(self.height);
        e.hash(&self.tip);
    }

    fn decode_fields(url: ChainUrl, d: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self {
            url,
            count: d.u64()?,
            height: d.u64()?,
            tip: d.hash()?,
        })
    }
}

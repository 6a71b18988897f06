use super::{read_url, write_url, RecordKind, RecordType};
use crate::codec::{Decoder, Encoder};
use crate::error::{ExecError, Result};
use crate::url::ChainUrl;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Records that hold a token balance.
///
/// Balances never go negative: a debit larger than the balance fails and
/// leaves the record untouched. Every successful credit or debit advances the
/// transaction counter by exactly one.
pub trait TokenHolder {
    fn token_url(&self) -> &ChainUrl;

    fn balance(&self) -> &BigUint;

    fn tx_count(&self) -> u64;

    /// Mutable balance and counter, for the provided methods.
    fn ledger_mut(&mut self) -> (&mut BigUint, &mut u64);

    /// Slot the next applied transaction takes in the reference chain.
    fn next_sequence(&self) -> u64 {
        self.tx_count()
    }

    fn can_debit(&self, amount: &BigUint) -> bool {
        self.balance() >= amount
    }

    fn credit(&mut self, amount: &BigUint) {
        let (balance, count) = self.ledger_mut();
        *balance += amount;
        *count += 1;
    }

    fn debit(&mut self, amount: &BigUint) -> Result<()> {
        if !self.can_debit(amount) {
            return Err(ExecError::InsufficientBalance(format!(
                "balance {} cannot cover {}",
                self.balance(),
                amount
            )));
        }
        let (balance, count) = self.ledger_mut();
        *balance -= amount;
        *count += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccount {
    pub url: ChainUrl,
    pub token_url: ChainUrl,
    pub balance: BigUint,
    pub tx_count: u64,
}

impl TokenAccount {
    pub fn new(url: ChainUrl, token_url: ChainUrl) -> Self {
        Self {
            url,
            token_url,
            balance: BigUint::default(),
            tx_count: 0,
        }
    }
}

impl RecordKind for TokenAccount {
    const TYPE: RecordType = RecordType::TokenAccount;

    fn url(&self) -> &ChainUrl {
        &self.url
    }

    fn empty(url: ChainUrl) -> Self {
        Self::new(url, ChainUrl::native_token())
    }

    fn encode_fields(&self, e: &mut Encoder) {
        write_url(e, &self.token_url);
        e.bigint(&self.balance);
        e.u64(self.tx_count);
    }

    fn decode_fields(url: ChainUrl, d: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self {
            url,
            token_url: read_url(d)?,
            balance: d.bigint()?,
            tx_count: d.u64()?,
        })
    }
}

impl TokenHolder for TokenAccount {
    fn token_url(&self) -> &ChainUrl {
        &self.token_url
    }

    fn balance(&self) -> &BigUint {
        &self.balance
    }

    fn tx_count(&self) -> u64 {
        self.tx_count
    }

    fn ledger_mut(&mut self) -> (&mut BigUint, &mut u64) {
        (&mut self.balance, &mut self.tx_count)
    }
}

/// Token account whose URL encodes its owner's key hash and token; created
/// implicitly by the first deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteTokenAccount {
    pub url: ChainUrl,
    pub token_url: ChainUrl,
    pub balance: BigUint,
    pub tx_count: u64,
    pub nonce: u64,
}

impl LiteTokenAccount {
    pub fn new(url: ChainUrl, token_url: ChainUrl) -> Self {
        Self {
            url,
            token_url,
            balance: BigUint::default(),
            tx_count: 0,
            nonce: 0,
        }
    }
}

impl RecordKind for LiteTokenAccount {
    const TYPE: RecordType = RecordType::LiteTokenAccount;

    fn url(&self) -> &ChainUrl {
        &self.url
    }

    fn empty(url: ChainUrl) -> Self {
        Self::new(url, ChainUrl::native_token())
    }

    fn encode_fields(&self, e: &mut Encoder) {
        write_url(e, &self.token_url);
        e.bigint(&self.balance);
        e.u64(self.tx_count);
        e.u64(self.nonce);
    }

    fn decode_fields(url: ChainUrl, d: &mut Decoder<'_>) -> Result<Self> {
        Ok(Self {
            url,
            token_url: read_url(d)?,
            balance: d.bigint()?,
            tx_count: d.u64()?,
            nonce: d.u64()?,
        })
    }
}

impl TokenHolder for LiteTokenAccount {
    fn token_url(&self) -> &ChainUrl {
        &self.token_url
    }

    fn balance(&self) -> &BigUint {
        &self.balance
    }

    fn tx_count(&self) -> u64 {
        self.tx_count
    }

    fn ledger_mut(&mut self) -> (&mut BigUint, &mut u64) {
        (&mut self.balance, &mut self.tx_count)
    }
}

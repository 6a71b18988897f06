//! Transaction types and their bodies.
//!
//! A body is a varint type tag followed by the type's fields. Synthetic
//! bodies start with a [`SyntheticHeader`] naming the transaction that caused
//! them.

use crate::codec::{Decoder, Encoder};
use crate::error::{ExecError, Result};
use crate::hash::Hash32;
use crate::record::Record;
use crate::url::ChainUrl;
use num_bigint::BigUint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TxType {
    CreateTokenAccount,
    SendTokens,
    CreateToken,
    CreateKeyPage,
    SyntheticCreateChain,
    SyntheticDepositTokens,
}

impl TxType {
    pub const ALL: [TxType; 6] = [
        TxType::CreateTokenAccount,
        TxType::SendTokens,
        TxType::CreateToken,
        TxType::CreateKeyPage,
        TxType::SyntheticCreateChain,
        TxType::SyntheticDepositTokens,
    ];

    pub fn tag(self) -> u64 {
        match self {
            TxType::CreateTokenAccount => 0x02,
            TxType::SendTokens => 0x03,
            TxType::CreateToken => 0x08,
            TxType::CreateKeyPage => 0x0c,
            TxType::SyntheticCreateChain => 0x31,
            TxType::SyntheticDepositTokens => 0x33,
        }
    }

    pub fn from_u64(tag: u64) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.tag() == tag)
            .ok_or(ExecError::UnknownType(tag))
    }

    pub fn is_synthetic(self) -> bool {
        self.tag() >= 0x30
    }

    pub fn name(self) -> &'static str {
        match self {
            TxType::CreateTokenAccount => "createTokenAccount",
            TxType::SendTokens => "sendTokens",
            TxType::CreateToken => "createToken",
            TxType::CreateKeyPage => "createKeyPage",
            TxType::SyntheticCreateChain => "syntheticCreateChain",
            TxType::SyntheticDepositTokens => "syntheticDepositTokens",
        }
    }
}

impl std::fmt::Display for TxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Causal link carried by every synthetic body. `index` is the position of
/// the body among everything its cause submitted, so two identical outputs of
/// one transaction still hash differently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntheticHeader {
    pub cause: Hash32,
    pub index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecipient {
    pub url: ChainUrl,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendTokens {
    pub to: Vec<TokenRecipient>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateKeyPage {
    pub url: ChainUrl,
    pub keys: Vec<[u8; 32]>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateToken {
    pub url: ChainUrl,
    pub symbol: String,
    pub precision: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTokenAccount {
    pub url: ChainUrl,
    pub token_url: ChainUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticDepositTokens {
    pub header: SyntheticHeader,
    /// Recipient account; also the envelope's destination.
    pub to: ChainUrl,
    pub token: ChainUrl,
    pub amount: BigUint,
}

/// An encoded record to create, or to overwrite when `update` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEntry {
    pub update: bool,
    pub data: Vec<u8>,
}

impl ChainEntry {
    pub fn create(record: &Record) -> Self {
        Self {
            update: false,
            data: record.encode(),
        }
    }

    pub fn update(record: &Record) -> Self {
        Self {
            update: true,
            data: record.encode(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntheticCreateChain {
    pub header: SyntheticHeader,
    pub chains: Vec<ChainEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxBody {
    CreateTokenAccount(CreateTokenAccount),
    SendTokens(SendTokens),
    CreateToken(CreateToken),
    CreateKeyPage(CreateKeyPage),
    SyntheticCreateChain(SyntheticCreateChain),
    SyntheticDepositTokens(SyntheticDepositTokens),
}

fn url(d: &mut Decoder<'_>) -> Result<ChainUrl> {
    ChainUrl::parse(&d.string()?)
}

fn put_url(e: &mut Encoder, u: &ChainUrl) {
    e.string(&u.to_string());
}

impl TxBody {
    pub fn tx_type(&self) -> TxType {
        match self {
            TxBody::CreateTokenAccount(_) => TxType::CreateTokenAccount,
            TxBody::SendTokens(_) => TxType::SendTokens,
            TxBody::CreateToken(_) => TxType::CreateToken,
            TxBody::CreateKeyPage(_) => TxType::CreateKeyPage,
            TxBody::SyntheticCreateChain(_) => TxType::SyntheticCreateChain,
            TxBody::SyntheticDepositTokens(_) => TxType::SyntheticDepositTokens,
        }
    }

    /// URL the body itself declares as its destination, if any. Used to name
    /// an origin chain that does not exist yet.
    pub fn target_url(&self) -> Option<&ChainUrl> {
        match self {
            TxBody::SyntheticDepositTokens(b) => Some(&b.to),
            _ => None,
        }
    }

    pub fn synthetic_header(&self) -> Option<&SyntheticHeader> {
        match self {
            TxBody::SyntheticCreateChain(b) => Some(&b.header),
            TxBody::SyntheticDepositTokens(b) => Some(&b.header),
            _ => None,
        }
    }

    pub(crate) fn set_cause(&mut self, cause: Hash32, index: u64) {
        let header = match self {
            TxBody::SyntheticCreateChain(b) => &mut b.header,
            TxBody::SyntheticDepositTokens(b) => &mut b.header,
            _ => return,
        };
        header.cause = cause;
        header.index = index;
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut e = Encoder::new();
        e.uvarint(self.tx_type().tag());
        match self {
            TxBody::CreateTokenAccount(b) => {
                put_url(&mut e, &b.url);
                put_url(&mut e, &b.token_url);
            }
            TxBody::SendTokens(b) => {
                e.uvarint(b.to.len() as u64);
                for r in &b.to {
                    put_url(&mut e, &r.url);
                    e.u64(r.amount);
                }
            }
            TxBody::CreateToken(b) => {
                put_url(&mut e, &b.url);
                e.string(&b.symbol);
                e.uvarint(b.precision);
            }
            TxBody::CreateKeyPage(b) => {
                put_url(&mut e, &b.url);
                e.uvarint(b.keys.len() as u64);
                for k in &b.keys {
                    e.hash(k);
                }
            }
            TxBody::SyntheticCreateChain(b) => {
                e.hash(&b.header.cause);
                e.uvarint(b.header.index);
                e.uvarint(b.chains.len() as u64);
                for c in &b.chains {
                    e.bool(c.update);
                    e.bytes(&c.data);
                }
            }
            TxBody::SyntheticDepositTokens(b) => {
                e.hash(&b.header.cause);
                e.uvarint(b.header.index);
                put_url(&mut e, &b.to);
                put_url(&mut e, &b.token);
                e.bigint(&b.amount);
            }
        }
        e.finish()
    }

    /// Decode a whole body; trailing bytes are an error.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut d = Decoder::new(data);
        let tx_type = TxType::from_u64(d.uvarint()?)?;
        let body = match tx_type {
            TxType::CreateTokenAccount => TxBody::CreateTokenAccount(CreateTokenAccount {
                url: url(&mut d)?,
                token_url: url(&mut d)?,
            }),
            TxType::SendTokens => {
                let n = d.uvarint()?;
                let mut to = Vec::new();
                for _ in 0..n {
                    to.push(TokenRecipient {
                        url: url(&mut d)?,
                        amount: d.u64()?,
                    });
                }
                TxBody::SendTokens(SendTokens { to })
            }
            TxType::CreateToken => TxBody::CreateToken(CreateToken {
                url: url(&mut d)?,
                symbol: d.string()?,
                precision: d.uvarint()?,
            }),
            TxType::CreateKeyPage => {
                let url = url(&mut d)?;
                let n = d.uvarint()?;
                let mut keys = Vec::new();
                for _ in 0..n {
                    keys.push(d.hash()?);
                }
                TxBody::CreateKeyPage(CreateKeyPage { url, keys })
            }
            TxType::SyntheticCreateChain => {
                let header = SyntheticHeader {
                    cause: d.hash()?,
                    index: d.uvarint()?,
                };
                let n = d.uvarint()?;
                let mut chains = Vec::new();
                for _ in 0..n {
                    chains.push(ChainEntry {
                        update: d.bool()?,
                        data: d.bytes()?.to_vec(),
                    });
                }
                TxBody::SyntheticCreateChain(SyntheticCreateChain { header, chains })
            }
            TxType::SyntheticDepositTokens => {
                TxBody::SyntheticDepositTokens(SyntheticDepositTokens {
                    header: SyntheticHeader {
                        cause: d.hash()?,
                        index: d.uvarint()?,
                    },
                    to: url(&mut d)?,
                    token: url(&mut d)?,
                    amount: d.bigint()?,
                })
            }
        };
        d.finish()?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(s: &str) -> ChainUrl {
        ChainUrl::parse(s).unwrap()
    }

    fn samples() -> Vec<TxBody> {
        vec![
            TxBody::CreateTokenAccount(CreateTokenAccount {
                url: u("foo/tokens"),
                token_url: u("acme"),
            }),
            TxBody::SendTokens(SendTokens {
                to: vec![
                    TokenRecipient { url: u("bar/tokens"), amount: 70 },
                    TokenRecipient { url: u("baz/tokens"), amount: 80 },
                ],
            }),
            TxBody::CreateToken(CreateToken {
                url: u("foo/gold"),
                symbol: "GOLD".into(),
                precision: 8,
            }),
            TxBody::CreateKeyPage(CreateKeyPage {
                url: u("foo/page1"),
                keys: vec![[1; 32], [2; 32]],
            }),
            TxBody::SyntheticCreateChain(SyntheticCreateChain {
                header: SyntheticHeader { cause: [9; 32], index: 1 },
                chains: vec![ChainEntry { update: true, data: vec![1, 2, 3] }],
            }),
            TxBody::SyntheticDepositTokens(SyntheticDepositTokens {
                header: SyntheticHeader { cause: [9; 32], index: 0 },
                to: u("bar/tokens"),
                token: u("acme"),
                amount: BigUint::from(12_345u32),
            }),
        ]
    }

    #[test]
    fn tags_are_stable() {
        assert_eq!(TxType::SendTokens.tag(), 3);
        assert_eq!(TxType::CreateKeyPage.tag(), 12);
        assert_eq!(TxType::from_u64(0x33).unwrap(), TxType::SyntheticDepositTokens);
        assert!(TxType::SyntheticCreateChain.is_synthetic());
        assert!(!TxType::CreateToken.is_synthetic());
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!(matches!(TxBody::decode(&[0x7f]), Err(ExecError::UnknownType(0x7f))));
    }

    #[test]
    fn bodies_decode_to_themselves() {
        for body in samples() {
            let bytes = body.encode();
            assert_eq!(TxBody::decode(&bytes).unwrap(), body, "{}", body.tx_type());
        }
    }

    #[test]
    fn truncated_or_padded_bodies_fail() {
        for body in samples() {
            let bytes = body.encode();
            for n in 0..bytes.len() {
                assert!(TxBody::decode(&bytes[..n]).is_err(), "{} prefix {n}", body.tx_type());
            }
            let mut padded = bytes.clone();
            padded.push(0);
            assert!(TxBody::decode(&padded).is_err());
        }
    }

    #[test]
    fn set_cause_touches_only_synthetic_bodies() {
        let mut bodies = samples();
        for b in &mut bodies {
            b.set_cause([5; 32], 7);
        }
        let with_header: Vec<_> = bodies.iter().filter_map(|b| b.synthetic_header()).collect();
        assert_eq!(with_header.len(), 2);
        assert!(with_header.iter().all(|h| h.cause == [5; 32] && h.index == 7));
    }

    #[test]
    fn target_url_only_for_deposits() {
        let bodies = samples();
        let targets: Vec<_> = bodies.iter().filter_map(|b| b.target_url()).collect();
        assert_eq!(targets, vec![&u("bar/tokens")]);
    }
}

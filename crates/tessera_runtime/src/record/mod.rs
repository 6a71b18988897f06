//! Chain record registry.
//!
//! Every stored record starts with the same header:
//!
//! ```text
//! u64 BE   type tag
//! string   owning chain URL
//! ...      type-specific fields
//! ```
//!
//! [`decode_record`] reads the header, builds the matching variant and lets
//! it decode the rest. The set of variants is closed; adding one means adding
//! a line to the `records!` table below and a [`RecordKind`] impl.

mod account;
mod chains;

pub use account::{LiteTokenAccount, TokenAccount, TokenHolder};
pub use chains::{
    DataAccount, Identity, KeyBook, KeyPage, KeySpec, LiteDataAccount, PendingTransaction,
    SyntheticTransactionChain, TokenIssuer, Transaction, TransactionReference,
};

use crate::codec::{Decoder, Encoder};
use crate::error::{ExecError, Result};
use crate::url::ChainUrl;
use serde::{Deserialize, Serialize};

/// A concrete record variant.
pub trait RecordKind: Sized + Into<Record> + TryFrom<Record, Error = ExecError> {
    const TYPE: RecordType;

    fn url(&self) -> &ChainUrl;

    /// Zero-valued record owned by `url`.
    fn empty(url: ChainUrl) -> Self;

    fn encode_fields(&self, e: &mut Encoder);

    fn decode_fields(url: ChainUrl, d: &mut Decoder<'_>) -> Result<Self>;

    fn encode(&self) -> Vec<u8> {
        let mut e = Encoder::new();
        write_header(&mut e, Self::TYPE, self.url());
        self.encode_fields(&mut e);
        e.finish()
    }

    /// Decode, failing with a type error if the stored tag names another
    /// variant.
    fn decode(data: &[u8]) -> Result<Self> {
        decode_record(data)?.try_into()
    }
}

pub(crate) fn write_url(e: &mut Encoder, url: &ChainUrl) {
    e.string(&url.to_string());
}

pub(crate) fn read_url(d: &mut Decoder<'_>) -> Result<ChainUrl> {
    let s = d.string()?;
    ChainUrl::parse(&s).map_err(|_| ExecError::Encoding(format!("invalid stored url {:?}", s)))
}

fn write_header(e: &mut Encoder, t: RecordType, url: &ChainUrl) {
    e.u64(t.tag());
    write_url(e, url);
}

macro_rules! records {
    ($($variant:ident = $tag:literal),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum RecordType {
            $($variant),*
        }

        impl RecordType {
            pub const ALL: &'static [RecordType] = &[$(RecordType::$variant),*];

            pub fn tag(self) -> u64 {
                match self {
                    $(RecordType::$variant => $tag),*
                }
            }

            pub fn from_u64(tag: u64) -> Result<Self> {
                match tag {
                    $($tag => Ok(RecordType::$variant),)*
                    other => Err(ExecError::UnknownType(other)),
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(RecordType::$variant => stringify!($variant)),*
                }
            }
        }

        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(tag = "type")]
        pub enum Record {
            $($variant($variant)),*
        }

        impl Record {
            pub fn record_type(&self) -> RecordType {
                match self {
                    $(Record::$variant(_) => RecordType::$variant),*
                }
            }

            pub fn url(&self) -> &ChainUrl {
                match self {
                    $(Record::$variant(r) => r.url()),*
                }
            }

            pub fn encode(&self) -> Vec<u8> {
                match self {
                    $(Record::$variant(r) => r.encode()),*
                }
            }
        }

        /// Zero-valued record of the variant named by `tag`.
        pub fn new_record(tag: u64, url: ChainUrl) -> Result<Record> {
            Ok(match RecordType::from_u64(tag)? {
                $(RecordType::$variant => Record::$variant($variant::empty(url))),*
            })
        }

        /// Read the header, then let the named variant decode the rest.
        /// Trailing bytes are an error.
        pub fn decode_record(data: &[u8]) -> Result<Record> {
            let mut d = Decoder::new(data);
            let record_type = RecordType::from_u64(d.u64()?)?;
            let url = read_url(&mut d)?;
            let record = match record_type {
                $(RecordType::$variant => Record::$variant($variant::decode_fields(url, &mut d)?)),*
            };
            d.finish()?;
            Ok(record)
        }

        $(
            impl From<$variant> for Record {
                fn from(r: $variant) -> Self {
                    Record::$variant(r)
                }
            }

            impl TryFrom<Record> for $variant {
                type Error = ExecError;

                fn try_from(r: Record) -> Result<Self> {
                    match r {
                        Record::$variant(inner) => Ok(inner),
                        other => Err(ExecError::wrong_type(
                            stringify!($variant),
                            other.record_type().name(),
                        )),
                    }
                }
            }
        )*
    };
}

records! {
    Identity = 1,
    TokenIssuer = 2,
    TokenAccount = 3,
    LiteTokenAccount = 4,
    TransactionReference = 5,
    Transaction = 6,
    PendingTransaction = 7,
    KeyPage = 8,
    KeyBook = 9,
    DataAccount = 10,
    LiteDataAccount = 11,
    SyntheticTransactionChain = 12,
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Record {
    /// Token-bearing view of the record, for the variants that hold a balance.
    pub fn token_holder(&self) -> Option<&dyn TokenHolder> {
        match self {
            Record::TokenAccount(a) => Some(a),
            Record::LiteTokenAccount(a) => Some(a),
            _ => None,
        }
    }

    pub fn token_holder_mut(&mut self) -> Option<&mut dyn TokenHolder> {
        match self {
            Record::TokenAccount(a) => Some(a),
            Record::LiteTokenAccount(a) => Some(a),
            _ => None,
        }
    }
}

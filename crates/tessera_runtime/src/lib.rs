//! Deterministic transaction-execution core.
//!
//! A signed [`Envelope`] is decoded, authenticated and handed to the
//! [`validator`] for its type, which reads chain records through a
//! [`StateManager`] and stages record updates and synthetic transactions.
//! The [`Executor`] drives this per block on behalf of the consensus engine
//! and writes each block's effects to a [`tessera_ledger::Store`] in one
//! batch.

pub mod codec;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod hash;
pub mod lite;
pub mod query;
pub mod record;
pub mod signature;
pub mod state;
pub mod synthetic;
pub mod txn;
pub mod url;
pub mod validator;

#[cfg(test)]
pub(crate) mod testing;

pub use envelope::Envelope;
pub use error::{ErrorKind, ExecError, Result};
pub use executor::{BlockHeader, Executor};
pub use query::{QueryRequest, QueryResponse};
pub use record::{decode_record, new_record, Record, RecordKind, RecordType};
pub use signature::KeyRing;
pub use state::{StateManager, StateView};
pub use txn::{TxBody, TxType};
pub use url::{ChainId, ChainUrl};

pub use tessera_config::ExecConfig;
pub use tessera_ledger::{FsLedger, MemLedger, Store};

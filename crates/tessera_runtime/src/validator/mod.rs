//! Business rules, one handler per transaction type.
//!
//! A handler only ever reads through the [`StateManager`] and changes state
//! through `update`/`submit`, so a rejected transaction leaves nothing behind.

mod create_key_page;
mod create_token;
mod create_token_account;
mod send_tokens;
mod synthetic_create_chain;
mod synthetic_deposit;

pub use create_key_page::CreateKeyPage;
pub use create_token::CreateToken;
pub use create_token_account::CreateTokenAccount;
pub use send_tokens::SendTokens;
pub use synthetic_create_chain::SyntheticCreateChain;
pub use synthetic_deposit::SyntheticDepositTokens;

use crate::envelope::Envelope;
use crate::error::{ExecError, Result};
use crate::record::Record;
use crate::state::{Staged, StateManager, StateView};
use crate::txn::{TxBody, TxType};
use tessera_config::ExecConfig;

pub trait Validator: Sync {
    fn tx_type(&self) -> TxType;

    /// Whether the transaction may run against a chain that does not exist
    /// yet. Every other handler sees a missing origin as not-found.
    fn allows_missing_origin(&self) -> bool {
        false
    }

    fn validate(&self, st: &mut StateManager<'_>, body: &TxBody, config: &ExecConfig) -> Result<()>;
}

pub fn validator_for(tx_type: TxType) -> &'static dyn Validator {
    match tx_type {
        TxType::CreateTokenAccount => &CreateTokenAccount,
        TxType::SendTokens => &SendTokens,
        TxType::CreateToken => &CreateToken,
        TxType::CreateKeyPage => &CreateKeyPage,
        TxType::SyntheticCreateChain => &SyntheticCreateChain,
        TxType::SyntheticDepositTokens => &SyntheticDepositTokens,
    }
}

/// Open a context, run the matching handler and return what it staged.
pub fn apply(
    view: StateView<'_>,
    env: &Envelope,
    body: &TxBody,
    config: &ExecConfig,
) -> Result<Staged> {
    let validator = validator_for(body.tx_type());
    let mut st = StateManager::open(view, env, body)?;
    if st.origin().is_none() && !validator.allows_missing_origin() {
        return Err(ExecError::NotFound(format!(
            "origin {} does not exist",
            st.origin_url()
        )));
    }
    match validator.validate(&mut st, body, config) {
        Ok(()) => Ok(st.commit()),
        Err(e) => {
            st.abort();
            Err(e)
        }
    }
}

fn invalid_payload(want: TxType, body: &TxBody) -> ExecError {
    ExecError::Validation(format!(
        "invalid payload: want {}, got {}",
        want,
        body.tx_type()
    ))
}

fn require_origin<'s>(st: &'s StateManager<'_>) -> Result<&'s Record> {
    st.origin().ok_or_else(|| {
        ExecError::NotFound(format!("origin {} does not exist", st.origin_url()))
    })
}

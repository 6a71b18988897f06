use super::{invalid_payload, require_origin, Validator};
use crate::error::{ExecError, Result};
use crate::record::{Record, TokenAccount};
use crate::state::StateManager;
use crate::txn::{ChainEntry, SyntheticCreateChain, TxBody, TxType};
use tessera_config::ExecConfig;

pub struct CreateTokenAccount;

impl Validator for CreateTokenAccount {
    fn tx_type(&self) -> TxType {
        TxType::CreateTokenAccount
    }

    fn validate(&self, st: &mut StateManager<'_>, body: &TxBody, _: &ExecConfig) -> Result<()> {
        let TxBody::CreateTokenAccount(body) = body else {
            return Err(invalid_payload(TxType::CreateTokenAccount, body));
        };
        match require_origin(st)? {
            Record::Identity(_) => {}
            other => return Err(ExecError::wrong_type("Identity", other.record_type().name())),
        }
        if body.url.identity() != st.origin_url().identity() || body.url.is_identity() {
            return Err(ExecError::Validation(format!(
                "{} is not a chain under {}",
                body.url,
                st.origin_url()
            )));
        }

        let account = TokenAccount::new(body.url.clone(), body.token_url.clone());
        let scc = SyntheticCreateChain {
            chains: vec![ChainEntry::create(&Record::TokenAccount(account))],
            ..Default::default()
        };
        let origin = st.origin_url().clone();
        st.submit(origin, TxBody::SyntheticCreateChain(scc));
        Ok(())
    }
}

use super::{invalid_payload, require_origin, Validator};
use crate::error::{ExecError, Result};
use crate::record::{Record, TokenIssuer};
use crate::state::StateManager;
use crate::txn::{TxBody, TxType};
use tessera_config::ExecConfig;

/// Token issuance: a new issuer chain under the origin identity. The issuer
/// record is the only effect; no synthetic transaction is emitted.
pub struct CreateToken;

impl Validator for CreateToken {
    fn tx_type(&self) -> TxType {
        TxType::CreateToken
    }

    fn validate(&self, st: &mut StateManager<'_>, body: &TxBody, config: &ExecConfig) -> Result<()> {
        let TxBody::CreateToken(body) = body else {
            return Err(invalid_payload(TxType::CreateToken, body));
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
        if body.symbol.is_empty() || !body.symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ExecError::Validation(format!(
                "invalid token symbol {:?}",
                body.symbol
            )));
        }
        if body.precision > config.max_token_precision {
            return Err(ExecError::Validation(format!(
                "precision {} exceeds {}",
                body.precision, config.max_token_precision
            )));
        }
        if st.exists(&body.url)? {
            return Err(ExecError::Validation(format!("{} already exists", body.url)));
        }

        st.update(TokenIssuer {
            url: body.url.clone(),
            symbol: body.symbol.clone(),
            precision: body.precision,
        });
        Ok(())
    }
}

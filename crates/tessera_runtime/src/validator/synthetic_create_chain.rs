use super::{invalid_payload, require_origin, Validator};
use crate::error::{ExecError, Result};
use crate::record::decode_record;
use crate::state::StateManager;
use crate::txn::{TxBody, TxType};
use tessera_config::ExecConfig;

/// Apply the records carried by a synthetic create-chain. Every record must
/// belong to the origin's identity; creations must be new and updates must
/// replace a record of the same type.
pub struct SyntheticCreateChain;

impl Validator for SyntheticCreateChain {
    fn tx_type(&self) -> TxType {
        TxType::SyntheticCreateChain
    }

    fn validate(&self, st: &mut StateManager<'_>, body: &TxBody, _: &ExecConfig) -> Result<()> {
        let TxBody::SyntheticCreateChain(body) = body else {
            return Err(invalid_payload(TxType::SyntheticCreateChain, body));
        };
        require_origin(st)?;
        if body.chains.is_empty() {
            return Err(ExecError::Validation("no chains to create".into()));
        }

        for entry in &body.chains {
            let record = decode_record(&entry.data)?;
            let url = record.url();
            if url.identity() != st.origin_url().identity() {
                return Err(ExecError::Validation(format!(
                    "{} does not belong to {}",
                    url,
                    st.origin_url()
                )));
            }
            match (entry.update, st.load_optional(&url.chain_id())?) {
                (false, Some(_)) => {
                    return Err(ExecError::Validation(format!("{} already exists", url)));
                }
                (true, None) => {
                    return Err(ExecError::Validation(format!(
                        "cannot update {}: it does not exist",
                        url
                    )));
                }
                (true, Some(existing)) if existing.record_type() != record.record_type() => {
                    return Err(ExecError::wrong_type(
                        existing.record_type().name(),
                        record.record_type().name(),
                    ));
                }
                _ => {}
            }
            st.update(record);
        }
        Ok(())
    }
}

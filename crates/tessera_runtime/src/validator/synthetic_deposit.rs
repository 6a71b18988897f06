use super::{invalid_payload, Validator};
use crate::error::{ExecError, Result};
use crate::lite::parse_lite_address;
use crate::record::{LiteTokenAccount, Record, TransactionReference};
use crate::state::StateManager;
use crate::txn::{TxBody, TxType};
use tessera_config::ExecConfig;

/// Credit a deposit to an existing token account, or open a lite token
/// account when the recipient is a lite address nobody has used yet.
pub struct SyntheticDepositTokens;

impl Validator for SyntheticDepositTokens {
    fn tx_type(&self) -> TxType {
        TxType::SyntheticDepositTokens
    }

    fn allows_missing_origin(&self) -> bool {
        true
    }

    fn validate(&self, st: &mut StateManager<'_>, body: &TxBody, _: &ExecConfig) -> Result<()> {
        let TxBody::SyntheticDepositTokens(body) = body else {
            return Err(invalid_payload(TxType::SyntheticDepositTokens, body));
        };
        if &body.to != st.origin_url() {
            return Err(ExecError::Validation(format!(
                "deposit names {} but was routed to {}",
                body.to,
                st.origin_url()
            )));
        }

        let mut account = match st.origin() {
            Some(record) => {
                let holder = record.token_holder().ok_or_else(|| {
                    ExecError::wrong_type(
                        "TokenAccount or LiteTokenAccount",
                        record.record_type().name(),
                    )
                })?;
                if holder.token_url() != &body.token {
                    return Err(ExecError::Validation(format!(
                        "{} holds {}, cannot accept {}",
                        st.origin_url(),
                        holder.token_url(),
                        body.token
                    )));
                }
                record.clone()
            }
            None => match parse_lite_address(st.origin_url())? {
                None => {
                    return Err(ExecError::NotFound(format!(
                        "could not find token account {}",
                        st.origin_url()
                    )))
                }
                Some((_, token)) if token != body.token => {
                    return Err(ExecError::Validation(format!(
                        "lite address {} is for {}, not {}",
                        st.origin_url(),
                        token,
                        body.token
                    )))
                }
                Some((_, token)) => {
                    Record::from(LiteTokenAccount::new(st.origin_url().clone(), token))
                }
            },
        };

        let slot = match account.token_holder_mut() {
            Some(holder) => {
                let slot = holder.next_sequence();
                holder.credit(&body.amount);
                slot
            }
            None => return Err(ExecError::Validation("deposit target holds no tokens".into())),
        };
        st.update(account);
        st.update(TransactionReference {
            url: st.origin_url().join_path(&slot.to_string()),
            tx_id: st.tx_hash(),
        });
        Ok(())
    }
}

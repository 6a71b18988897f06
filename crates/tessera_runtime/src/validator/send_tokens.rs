use super::{invalid_payload, require_origin, Validator};
use crate::error::{ExecError, Result};
use crate::record::TransactionReference;
use crate::state::StateManager;
use crate::txn::{self, SyntheticHeader, TxBody, TxType};
use num_bigint::BigUint;
use tessera_config::ExecConfig;

/// Debit the origin token account by the sum of all outputs and send each
/// recipient a synthetic deposit for its exact amount.
pub struct SendTokens;

impl Validator for SendTokens {
    fn tx_type(&self) -> TxType {
        TxType::SendTokens
    }

    fn validate(&self, st: &mut StateManager<'_>, body: &TxBody, _: &ExecConfig) -> Result<()> {
        let TxBody::SendTokens(body) = body else {
            return Err(invalid_payload(TxType::SendTokens, body));
        };
        if body.to.is_empty() {
            return Err(ExecError::Validation("no recipients".into()));
        }

        let mut account = require_origin(st)?.clone();
        let origin_type = account.record_type();
        let holder = account.token_holder_mut().ok_or_else(|| {
            ExecError::wrong_type("TokenAccount or LiteTokenAccount", origin_type.name())
        })?;

        let total: BigUint = body.to.iter().map(|r| BigUint::from(r.amount)).sum();
        if !holder.can_debit(&total) {
            return Err(ExecError::InsufficientBalance(format!(
                "{} holds {} but outputs total {}",
                st.origin_url(),
                holder.balance(),
                total
            )));
        }

        let token = holder.token_url().clone();
        let slot = holder.next_sequence();
        for r in &body.to {
            st.submit(
                r.url.clone(),
                TxBody::SyntheticDepositTokens(txn::SyntheticDepositTokens {
                    header: SyntheticHeader::default(),
                    to: r.url.clone(),
                    token: token.clone(),
                    amount: BigUint::from(r.amount),
                }),
            );
        }

        holder.debit(&total)?;
        st.update(account);
        st.update(TransactionReference {
            url: st.origin_url().join_path(&slot.to_string()),
            tx_id: st.tx_hash(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ExecError;
    use crate::record::{Identity, Record, TokenAccount, TransactionReference};
    use crate::testing::{staged_record, u, Fixture};
    use crate::txn::{SendTokens, TokenRecipient, TxBody};
    use num_bigint::BigUint;

    fn funded(balance: u64) -> Fixture {
        let mut a = TokenAccount::new(u("alice/tokens"), u("acme"));
        a.balance = BigUint::from(balance);
        a.tx_count = 4;
        Fixture::new().with(a)
    }

    fn send(outputs: &[(&str, u64)]) -> TxBody {
        TxBody::SendTokens(SendTokens {
            to: outputs
                .iter()
                .map(|(url, amount)| TokenRecipient {
                    url: u(url),
                    amount: *amount,
                })
                .collect(),
        })
    }

    #[test]
    fn debits_total_and_emits_one_deposit_per_output() {
        let fx = funded(1_000);
        let body = send(&[("bob/tokens", 300), ("carol/tokens", 200)]);
        let hash = fx.run_hash(&u("alice/tokens"), &body);
        let staged = fx.run(&u("alice/tokens"), body).unwrap();

        let Some(Record::TokenAccount(a)) = staged_record(&staged, &u("alice/tokens")) else {
            panic!("origin account not staged");
        };
        assert_eq!(a.balance, BigUint::from(500u32));
        assert_eq!(a.tx_count, 5);

        let Some(Record::TransactionReference(r)) = staged_record(&staged, &u("alice/tokens/4"))
        else {
            panic!("reference not staged at slot 4");
        };
        assert_eq!(r, TransactionReference { url: u("alice/tokens/4"), tx_id: hash });

        assert_eq!(staged.submissions.len(), 2);
        let amounts: Vec<(String, BigUint, u64)> = staged
            .submissions
            .iter()
            .map(|s| match &s.body {
                TxBody::SyntheticDepositTokens(d) => {
                    assert_eq!(d.header.cause, hash);
                    assert_eq!(d.token, u("acme"));
                    assert_eq!(d.to, s.url);
                    (s.url.to_string(), d.amount.clone(), d.header.index)
                }
                other => panic!("unexpected submission {other:?}"),
            })
            .collect();
        assert_eq!(
            amounts,
            vec![
                ("acc://bob/tokens".to_string(), BigUint::from(300u32), 0),
                ("acc://carol/tokens".to_string(), BigUint::from(200u32), 1),
            ]
        );
    }

    #[test]
    fn overspend_stages_nothing() {
        let fx = funded(100);
        let err = fx
            .run(&u("alice/tokens"), send(&[("bob/tokens", 70), ("carol/tokens", 80)]))
            .unwrap_err();
        assert!(matches!(err, ExecError::InsufficientBalance(_)), "{err:?}");
    }

    #[test]
    fn exact_balance_can_be_spent() {
        let fx = funded(150);
        let staged = fx
            .run(&u("alice/tokens"), send(&[("bob/tokens", 70), ("carol/tokens", 80)]))
            .unwrap();
        let Some(Record::TokenAccount(a)) = staged_record(&staged, &u("alice/tokens")) else {
            panic!("origin account not staged");
        };
        assert_eq!(a.balance, BigUint::from(0u32));
    }

    #[test]
    fn empty_output_list_is_rejected() {
        let err = funded(100).run(&u("alice/tokens"), send(&[])).unwrap_err();
        assert!(matches!(err, ExecError::Validation(_)));
    }

    #[test]
    fn origin_must_hold_tokens() {
        let fx = Fixture::new().with(Identity { url: u("alice"), key_book: None });
        let err = fx.run(&u("alice"), send(&[("bob/tokens", 1)])).unwrap_err();
        assert!(matches!(err, ExecError::WrongType { .. }), "{err:?}");
    }

    #[test]
    fn missing_origin_is_not_found() {
        let err = Fixture::new()
            .run(&u("alice/tokens"), send(&[("bob/tokens", 1)]))
            .unwrap_err();
        assert!(matches!(err, ExecError::NotFound(_)));
    }
}

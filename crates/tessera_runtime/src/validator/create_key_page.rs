use super::{invalid_payload, require_origin, Validator};
use crate::error::{ExecError, Result};
use crate::record::{KeyPage, KeySpec, Record};
use crate::state::StateManager;
use crate::txn::{ChainEntry, SyntheticCreateChain, TxBody, TxType};
use tessera_config::ExecConfig;

/// Create a key page under the origin identity, either unbound (origin is an
/// identity) or appended to the origin key book.
///
/// The page, and the book update when there is one, travel together in a
/// single synthetic create-chain sent back to the origin.
pub struct CreateKeyPage;

impl Validator for CreateKeyPage {
    fn tx_type(&self) -> TxType {
        TxType::CreateKeyPage
    }

    fn validate(&self, st: &mut StateManager<'_>, body: &TxBody, _: &ExecConfig) -> Result<()> {
        let TxBody::CreateKeyPage(body) = body else {
            return Err(invalid_payload(TxType::CreateKeyPage, body));
        };
        let book = match require_origin(st)? {
            Record::Identity(_) => None,
            Record::KeyBook(book) => Some(book.clone()),
            other => {
                return Err(ExecError::wrong_type(
                    "Identity or KeyBook",
                    other.record_type().name(),
                ))
            }
        };

        if body.keys.is_empty() {
            return Err(ExecError::Validation("cannot create an empty key page".into()));
        }
        if body.url.identity() != st.origin_url().identity() {
            return Err(ExecError::Validation(format!(
                "{} does not belong to {}",
                body.url,
                st.origin_url()
            )));
        }

        let mut page = KeyPage {
            url: body.url.clone(),
            key_book: None,
            keys: body
                .keys
                .iter()
                .map(|k| KeySpec {
                    public_key: *k,
                    nonce: 0,
                })
                .collect(),
        };

        let mut scc = SyntheticCreateChain::default();
        if let Some(mut book) = book {
            book.pages.push(body.url.chain_id());
            page.key_book = Some(book.url.chain_id());
            scc.chains.push(ChainEntry::update(&Record::KeyBook(book)));
        }
        scc.chains.push(ChainEntry::create(&Record::KeyPage(page)));

        let origin = st.origin_url().clone();
        st.submit(origin, TxBody::SyntheticCreateChain(scc));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ExecError;
    use crate::record::{decode_record, Identity, KeyBook, Record, TokenAccount};
    use crate::testing::{u, Fixture};
    use crate::txn::{CreateKeyPage, TxBody};

    fn create_page(url: &str, keys: Vec<[u8; 32]>) -> TxBody {
        TxBody::CreateKeyPage(CreateKeyPage { url: u(url), keys })
    }

    fn scc_records(body: &TxBody) -> Vec<(bool, Record)> {
        let TxBody::SyntheticCreateChain(scc) = body else {
            panic!("expected a synthetic create-chain, got {body:?}");
        };
        scc.chains
            .iter()
            .map(|c| (c.update, decode_record(&c.data).unwrap()))
            .collect()
    }

    #[test]
    fn identity_origin_creates_unbound_page() {
        let fx = Fixture::new().with(Identity { url: u("alice"), key_book: None });
        let staged = fx.run(&u("alice"), create_page("alice/page1", vec![[1; 32]])).unwrap();

        assert!(staged.writes.is_empty(), "nothing is written directly");
        assert_eq!(staged.submissions.len(), 1);
        assert_eq!(staged.submissions[0].url, u("alice"));
        let records = scc_records(&staged.submissions[0].body);
        assert_eq!(records.len(), 1);
        let (update, Record::KeyPage(page)) = &records[0] else {
            panic!("expected a key page");
        };
        assert!(!update);
        assert_eq!(page.url, u("alice/page1"));
        assert_eq!(page.key_book, None);
        assert_eq!(page.keys[0].public_key, [1; 32]);
    }

    #[test]
    fn book_origin_appends_page_to_book() {
        let fx = Fixture::new().with(KeyBook { url: u("alice/book"), pages: vec![] });
        let staged = fx
            .run(&u("alice/book"), create_page("alice/page2", vec![[2; 32], [3; 32]]))
            .unwrap();

        let records = scc_records(&staged.submissions[0].body);
        assert_eq!(records.len(), 2);
        let (true, Record::KeyBook(book)) = &records[0] else {
            panic!("expected a book update first");
        };
        assert_eq!(book.pages, vec![u("alice/page2").chain_id()]);
        let (false, Record::KeyPage(page)) = &records[1] else {
            panic!("expected a page creation second");
        };
        assert_eq!(page.key_book, Some(u("alice/book").chain_id()));
        assert_eq!(page.keys.len(), 2);
    }

    #[test]
    fn empty_key_list_is_rejected() {
        let fx = Fixture::new().with(Identity { url: u("alice"), key_book: None });
        let err = fx.run(&u("alice"), create_page("alice/page1", vec![])).unwrap_err();
        assert!(matches!(err, ExecError::Validation(_)));
    }

    #[test]
    fn other_identity_is_rejected() {
        let fx = Fixture::new().with(Identity { url: u("alice"), key_book: None });
        let err = fx.run(&u("alice"), create_page("mallory/page1", vec![[1; 32]])).unwrap_err();
        assert!(matches!(err, ExecError::Validation(_)));
        let err = fx.run(&u("alice"), create_page("mallory/page1", vec![])).unwrap_err();
        assert!(matches!(err, ExecError::Validation(_)));
    }

    #[test]
    fn token_account_origin_is_rejected() {
        let fx = Fixture::new().with(TokenAccount::new(u("alice/tokens"), u("acme")));
        let err = fx.run(&u("alice/tokens"), create_page("alice/page1", vec![[1; 32]])).unwrap_err();
        assert!(matches!(err, ExecError::WrongType { .. }));
    }
}

//! Lite addresses: token account URLs that encode their owner's key hash and
//! token, so the account can come into existence on first deposit.
//!
//! ```text
//! acc://<hex(keyhash[0..20])><hex(checksum[28..32])>/<token authority><token path>
//! ```
//!
//! where `checksum = SHA-256(hex(keyhash[0..20]))`.

use crate::error::{ExecError, Result};
use crate::hash::sha256;
use crate::url::ChainUrl;

const KEY_PART: usize = 20;
const AUTHORITY_LEN: usize = (KEY_PART + 4) * 2;

fn checksum(key_hex: &str) -> [u8; 4] {
    let h = sha256(key_hex.as_bytes());
    let mut c = [0u8; 4];
    c.copy_from_slice(&h[28..32]);
    c
}

pub fn lite_token_address(public_key: &[u8], token: &ChainUrl) -> Result<ChainUrl> {
    let key_hash = sha256(public_key);
    let key_hex = hex::encode(&key_hash[..KEY_PART]);
    let authority = format!("{}{}", key_hex, hex::encode(checksum(&key_hex)));
    ChainUrl::parse(&format!(
        "acc://{}/{}{}",
        authority,
        token.authority(),
        token.path()
    ))
}

/// `Ok(None)` when `url` is not a lite address at all; an error when it looks
/// like one but the checksum or embedded token is bad.
pub fn parse_lite_address(url: &ChainUrl) -> Result<Option<([u8; KEY_PART], ChainUrl)>> {
    let authority = url.authority();
    if authority.len() != AUTHORITY_LEN {
        return Ok(None);
    }
    let raw = match hex::decode(authority) {
        Ok(b) => b,
        Err(_) => return Ok(None),
    };
    let (key, sum) = raw.split_at(KEY_PART);
    if checksum(&hex::encode(key)) != sum {
        return Err(ExecError::Validation(format!(
            "{} has an invalid lite address checksum",
            url
        )));
    }
    let token = url.path().trim_start_matches('/');
    if token.is_empty() {
        return Err(ExecError::Validation(format!(
            "{} is missing its token path",
            url
        )));
    }
    let token = ChainUrl::parse(token)?;
    let mut key_hash = [0u8; KEY_PART];
    key_hash.copy_from_slice(key);
    Ok(Some((key_hash, token)))
}

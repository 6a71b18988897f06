use sha2::{Digest, Sha256};

pub type Hash32 = [u8; 32];

pub fn sha256(bytes: &[u8]) -> Hash32 {
    Sha256::digest(bytes).into()
}

/// `sha256:<hex>` label used in logs and query views.
pub fn tx_label(hash: &Hash32) -> String {
    format!("sha256:{}", hex::encode(hash))
}

/// First eight bytes, hex; enough to tell transactions apart in a log line.
pub fn short(hash: &Hash32) -> String {
    hex::encode(&hash[..8])
}

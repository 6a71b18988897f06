//! Ed25519 signatures over transaction hashes, and the node key ring that
//! signs synthetic transactions.

use crate::hash::Hash32;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

pub const PUBLIC_KEY_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ed25519Sig {
    pub public_key: [u8; PUBLIC_KEY_LEN],
    pub signature: [u8; SIGNATURE_LEN],
}

impl Ed25519Sig {
    pub fn sign(key: &SigningKey, hash: &Hash32) -> Self {
        Self {
            public_key: key.verifying_key().to_bytes(),
            signature: key.sign(hash).to_bytes(),
        }
    }

    /// False for a malformed public key as well as a bad signature.
    pub fn verify(&self, hash: &Hash32) -> bool {
        let vk = match VerifyingKey::from_bytes(&self.public_key) {
            Ok(vk) => vk,
            Err(_) => return false,
        };
        let sig = Signature::from_bytes(&self.signature);
        vk.verify(hash, &sig).is_ok()
    }
}

/// Signing context of this node.
#[derive(Clone)]
pub struct KeyRing {
    pub active: SigningKey,
    pub active_kid: String,
}

impl KeyRing {
    pub fn new(active: SigningKey, kid: impl Into<String>) -> Self {
        Self {
            active,
            active_kid: kid.into(),
        }
    }

    pub fn dev() -> Self {
        Self::new(SigningKey::from_bytes(&[7u8; 32]), "node:dev#k1")
    }

    pub fn public_key(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.active.verifying_key().to_bytes()
    }

    pub fn sign(&self, hash: &Hash32) -> Ed25519Sig {
        Ed25519Sig::sign(&self.active, hash)
    }
}

impl std::fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRing")
            .field("active_kid", &self.active_kid)
            .field("public_key", &hex::encode(self.public_key()))
            .finish()
    }
}

//! Transaction envelope: signatures plus the signed portion (routing number,
//! destination chain id, body).
//!
//! The signed portion is what gets hashed; signatures sit in front of it on
//! the wire and never feed into the hash, so re-signing a transaction keeps
//! its identity.

use crate::codec::{Decoder, Encoder};
use crate::error::{ExecError, Result};
use crate::hash::{sha256, Hash32};
use crate::signature::{Ed25519Sig, KeyRing, PUBLIC_KEY_LEN, SIGNATURE_LEN};
use crate::txn::TxType;
use crate::url::{ChainId, ChainUrl};

/// Hard ceiling on signatures per envelope, whatever the configuration says.
pub const MAX_SIGNATURES: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub signatures: Vec<Ed25519Sig>,
    pub routing: u64,
    pub chain_id: ChainId,
    pub body: Vec<u8>,
}

impl Envelope {
    /// Unsigned envelope addressed to `destination`.
    pub fn new(destination: &ChainUrl, body: Vec<u8>) -> Self {
        let mut env = Self {
            signatures: Vec::new(),
            routing: 0,
            chain_id: ChainId::default(),
            body,
        };
        env.set_routing(destination);
        env
    }

    pub fn set_routing(&mut self, destination: &ChainUrl) {
        self.routing = destination.routing();
        self.chain_id = destination.chain_id();
    }

    /// Canonical bytes of the signed portion.
    pub fn encode(&self) -> Vec<u8> {
        let mut e = Encoder::new();
        self.encode_into(&mut e);
        e.finish()
    }

    fn encode_into(&self, e: &mut Encoder) {
        e.u64(self.routing);
        e.hash(self.chain_id.as_bytes());
        e.bytes(&self.body);
    }

    /// Inverse of [`Envelope::encode`]. The result carries no signatures;
    /// unconsumed input is handed back.
    pub fn decode(data: &[u8]) -> Result<(Self, &[u8])> {
        let mut d = Decoder::new(data);
        let env = Self::decode_from(&mut d, Vec::new())?;
        Ok((env, d.rest()))
    }

    fn decode_from(d: &mut Decoder<'_>, signatures: Vec<Ed25519Sig>) -> Result<Self> {
        let routing = d.u64()?;
        let chain_id = ChainId(d.hash()?);
        let body = d.bytes()?.to_vec();
        Ok(Self {
            signatures,
            routing,
            chain_id,
            body,
        })
    }

    pub fn transaction_hash(&self) -> Hash32 {
        sha256(&self.encode())
    }

    pub fn sign(&mut self, keys: &KeyRing) {
        let hash = self.transaction_hash();
        self.signatures.push(keys.sign(&hash));
    }

    /// Rejects an empty set or one over `max` (itself capped at
    /// [`MAX_SIGNATURES`]) before checking any signature.
    pub fn verify_signatures(&self, max: usize) -> Result<()> {
        let max = max.min(MAX_SIGNATURES);
        if self.signatures.is_empty() {
            return Err(ExecError::Signature("no signatures".into()));
        }
        if self.signatures.len() > max {
            return Err(ExecError::Signature(format!(
                "{} signatures exceeds the limit of {}",
                self.signatures.len(),
                max
            )));
        }
        let hash = self.transaction_hash();
        for (i, sig) in self.signatures.iter().enumerate() {
            if !sig.verify(&hash) {
                return Err(ExecError::Signature(format!("signature {} is invalid", i)));
            }
        }
        Ok(())
    }

    /// Whether any carried signature is by one of `keys`. Says nothing
    /// about validity; pair with [`Envelope::verify_signatures`].
    pub fn signed_by_any(&self, keys: &[[u8; PUBLIC_KEY_LEN]]) -> bool {
        self.signatures.iter().any(|s| keys.contains(&s.public_key))
    }

    pub fn to_wire(&self) -> Vec<u8> {
        let mut e = Encoder::new();
        e.uvarint(self.signatures.len() as u64);
        for sig in &self.signatures {
            e.bytes(&sig.public_key);
            e.bytes(&sig.signature);
        }
        self.encode_into(&mut e);
        e.finish()
    }

    pub fn from_wire(data: &[u8]) -> Result<(Self, &[u8])> {
        let mut d = Decoder::new(data);
        let count = d.uvarint()?;
        if count == 0 {
            return Err(ExecError::Signature("no signatures".into()));
        }
        if count > MAX_SIGNATURES as u64 {
            return Err(ExecError::Signature(format!(
                "{} signatures exceeds the limit of {}",
                count, MAX_SIGNATURES
            )));
        }
        let mut signatures = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let public_key = d.bytes()?;
            let public_key: [u8; PUBLIC_KEY_LEN] = public_key.try_into().map_err(|_| {
                ExecError::Encoding(format!("public key must be {} bytes", PUBLIC_KEY_LEN))
            })?;
            let signature = d.bytes()?;
            let signature: [u8; SIGNATURE_LEN] = signature.try_into().map_err(|_| {
                ExecError::Encoding(format!("signature must be {} bytes", SIGNATURE_LEN))
            })?;
            signatures.push(Ed25519Sig {
                public_key,
                signature,
            });
        }
        let env = Self::decode_from(&mut d, signatures)?;
        Ok((env, d.rest()))
    }

    /// Type tag at the front of the body.
    pub fn tx_type(&self) -> Result<TxType> {
        TxType::from_u64(Decoder::new(&self.body).uvarint()?)
    }
}

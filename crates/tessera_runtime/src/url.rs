//! Chain URLs and the identifiers derived from them.
//!
//! A chain URL has the form `acc://authority/path`. The chain identifier is
//! SHA-256 over the lower-cased `authority + path`, so URLs differing only in
//! case name the same chain. The routing number only looks at the authority.

use crate::error::{ExecError, Result};
use crate::hash::sha256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub const SCHEME: &str = "acc";
pub const NATIVE_TOKEN: &str = "ACME";

/// SHA-256 of a canonical chain URL; the storage key of a record.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ChainId(pub [u8; 32]);

impl ChainId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for ChainId {
    fn from(b: [u8; 32]) -> Self {
        Self(b)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainId({})", hex::encode(self.0))
    }
}

#[derive(Clone)]
pub struct ChainUrl {
    authority: String,
    // Empty, or starts with '/' and has no trailing '/'.
    path: String,
}

fn invalid(input: &str, why: &str) -> ExecError {
    ExecError::Validation(format!("invalid url {:?}: {}", input, why))
}

impl ChainUrl {
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        if s.is_empty() {
            return Err(invalid(input, "empty"));
        }
        let full = if s.contains("://") {
            s.to_string()
        } else {
            format!("{}://{}", SCHEME, s)
        };
        let u = url::Url::parse(&full).map_err(|e| invalid(input, &e.to_string()))?;
        if u.scheme() != SCHEME {
            return Err(invalid(input, "scheme must be acc"));
        }
        if !u.username().is_empty() || u.password().is_some() {
            return Err(invalid(input, "user info is not allowed"));
        }
        if u.port().is_some() {
            return Err(invalid(input, "port is not allowed"));
        }
        if u.query().is_some() || u.fragment().is_some() {
            return Err(invalid(input, "query and fragment are not allowed"));
        }
        let authority = match u.host_str() {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => return Err(invalid(input, "missing authority")),
        };
        let path = u.path().trim_end_matches('/').to_string();
        Ok(Self { authority, path })
    }

    /// `acc://ACME`, the token a zero-valued token account refers to.
    pub fn native_token() -> Self {
        Self {
            authority: NATIVE_TOKEN.into(),
            path: String::new(),
        }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Lower-cased authority and path; the input to every derived identifier.
    pub fn canonical(&self) -> String {
        format!("{}{}", self.authority, self.path).to_lowercase()
    }

    pub fn chain_id(&self) -> ChainId {
        ChainId(sha256(self.canonical().as_bytes()))
    }

    /// The URL reduced to its authority.
    pub fn identity(&self) -> ChainUrl {
        ChainUrl {
            authority: self.authority.clone(),
            path: String::new(),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.path.is_empty()
    }

    pub fn join_path(&self, segment: &str) -> ChainUrl {
        let segment = segment.trim_matches('/');
        if segment.is_empty() {
            return self.clone();
        }
        ChainUrl {
            authority: self.authority.clone(),
            path: format!("{}/{}", self.path, segment),
        }
    }

    /// Big-endian u64 of the first eight bytes of SHA-256(lowercase authority).
    pub fn routing(&self) -> u64 {
        let h = sha256(self.authority.to_lowercase().as_bytes());
        let mut b = [0u8; 8];
        b.copy_from_slice(&h[..8]);
        u64::from_be_bytes(b)
    }
}

impl PartialEq for ChainUrl {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for ChainUrl {}

impl std::hash::Hash for ChainUrl {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl fmt::Display for ChainUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", SCHEME, self.authority, self.path)
    }
}

impl fmt::Debug for ChainUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainUrl({})", self)
    }
}

impl std::str::FromStr for ChainUrl {
    type Err = ExecError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for ChainUrl {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ChainUrl {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        ChainUrl::parse(&s).map_err(serde::de::Error::custom)
    }
}

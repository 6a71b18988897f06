//! Execution policy knobs for the tessera core.
//!
//! Values come from `TESSERA_*` environment variables and fall back to
//! compiled defaults when a variable is unset or does not parse.

use lazy_static::lazy_static;
use std::str::FromStr;

pub const DEFAULT_MAX_SIGNATURES: usize = 100;
pub const DEFAULT_MAX_TOKEN_PRECISION: u64 = 18;
pub const DEFAULT_MAX_TX_BYTES: usize = 1024 * 1024;
pub const DEFAULT_SYNTHETIC_LEDGER_URL: &str = "acc://node/synthetic";
pub const DEFAULT_LEDGER_DIR: &str = "ledger";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecConfig {
    /// Signatures accepted on one envelope (never more than 100).
    pub max_signatures: usize,
    /// Largest decimal precision a token issuer may declare.
    pub max_token_precision: u64,
    /// Envelopes larger than this are rejected before decoding.
    pub max_tx_bytes: usize,
    /// Chain that records this node's synthetic transaction count and tip.
    pub synthetic_ledger_url: String,
    /// Directory of the file-backed ledger opened by `Executor::open`.
    pub ledger_dir: String,
    /// Hex Ed25519 public keys, besides the node's own, whose signature
    /// makes a synthetic transaction acceptable.
    pub validator_keys: Vec<String>,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            max_signatures: DEFAULT_MAX_SIGNATURES,
            max_token_precision: DEFAULT_MAX_TOKEN_PRECISION,
            max_tx_bytes: DEFAULT_MAX_TX_BYTES,
            synthetic_ledger_url: DEFAULT_SYNTHETIC_LEDGER_URL.into(),
            ledger_dir: DEFAULT_LEDGER_DIR.into(),
            validator_keys: Vec::new(),
        }
    }
}

impl ExecConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let text = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            max_signatures: parsed(&lookup, "TESSERA_MAX_SIGNATURES", d.max_signatures)
                .min(DEFAULT_MAX_SIGNATURES),
            max_token_precision: parsed(
                &lookup,
                "TESSERA_MAX_TOKEN_PRECISION",
                d.max_token_precision,
            ),
            max_tx_bytes: parsed(&lookup, "TESSERA_MAX_TX_BYTES", d.max_tx_bytes),
            synthetic_ledger_url: text("TESSERA_SYNTHETIC_LEDGER").unwrap_or(d.synthetic_ledger_url),
            ledger_dir: text("TESSERA_LEDGER_DIR").unwrap_or(d.ledger_dir),
            validator_keys: text("TESSERA_VALIDATOR_KEYS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|k| !k.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or(d.validator_keys),
        }
    }
}

fn parsed<T, F>(lookup: &F, name: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

lazy_static! {
    /// Process-wide config for embedding binaries. Library code takes an
    /// explicit `ExecConfig` instead.
    pub static ref CONFIG: ExecConfig = ExecConfig::from_env();
}

//! Where hashes come from: recent-transaction feeds and single-hash lookup.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::cell_index::CellCoord;
use crate::error_codes::{CodedError, HASH_NOT_FOUND, INVALID_HASH, UPSTREAM};
use crate::prng::XorShift64;
use crate::session::GridSession;

pub const SYNTHETIC_POOL_SIZE: usize = 100;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SYNTHETIC_CHUNKS: usize = 4;
const SYNTHETIC_CHUNK_LEN: usize = 11;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub signature: String,
    #[serde(default)]
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, deserialize_with = "amount_as_text")]
    pub amount: String,
    #[serde(default)]
    pub slot: u64,
    #[serde(default, alias = "blockTime")]
    pub block_time: i64,
    #[serde(default)]
    pub activity_type: String,
}

fn amount_as_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(match Amount::deserialize(deserializer)? {
        Amount::Text(text) => text,
        Amount::Integer(value) => value.to_string(),
        Amount::Float(value) => value.to_string(),
    })
}

/// Feed of recent records, in display order.
pub trait TransactionSource {
    fn recent(&self) -> Result<Vec<TransactionRecord>>;
}

/// Resolves exactly one hash.
pub trait TransactionLookup {
    fn lookup(&self, hash: &str) -> Result<TransactionRecord, LookupError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    InvalidHash(String),
    NotFound(String),
    Upstream(String),
}

impl LookupError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidHash(_) => INVALID_HASH,
            Self::NotFound(_) => HASH_NOT_FOUND,
            Self::Upstream(_) => UPSTREAM,
        }
    }

    pub fn into_coded(self) -> CodedError {
        let code = self.code();
        match self {
            Self::Upstream(_) => CodedError::upstream(code, self.to_string()),
            _ => CodedError::usage(code, self.to_string()),
        }
    }
}

impl Display for LookupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHash(hash) => write!(f, "invalid transaction hash '{hash}'"),
            Self::NotFound(hash) => write!(f, "transaction '{hash}' not found"),
            Self::Upstream(message) => write!(f, "lookup failed: {message}"),
        }
    }
}

impl Error for LookupError {}

/// Signatures are non-empty runs of ASCII letters and digits.
pub fn validate_hash(hash: &str) -> Result<&str, LookupError> {
    let trimmed = hash.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(LookupError::InvalidHash(hash.to_owned()));
    }
    Ok(trimmed)
}

/// JSON array of records on disk. Serves as both feed and lookup.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    records: Vec<TransactionRecord>,
}

impl JsonFileSource {
    pub fn open(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read transactions {}", path.display()))?;
        let records: Vec<TransactionRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse transactions {}", path.display()))?;
        info!(path = %path.display(), records = records.len(), "loaded transactions");
        Ok(Self { records })
    }
}

impl TransactionSource for JsonFileSource {
    fn recent(&self) -> Result<Vec<TransactionRecord>> {
        Ok(self.records.clone())
    }
}

impl TransactionLookup for JsonFileSource {
    fn lookup(&self, hash: &str) -> Result<TransactionRecord, LookupError> {
        let hash = validate_hash(hash)?;
        self.records
            .iter()
            .find(|record| record.signature == hash)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(hash.to_owned()))
    }
}

/// Offline pool of pseudo-random base-36 signatures with placeholder fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticSource {
    pub count: usize,
    pub seed: u64,
}

impl SyntheticSource {
    pub fn new(count: usize, seed: u64) -> Self {
        Self { count, seed }
    }

    pub fn signatures(&self) -> Vec<String> {
        let mut rng = XorShift64::from_seed(self.seed);
        (0..self.count)
            .map(|_| {
                let mut signature = String::with_capacity(SYNTHETIC_CHUNKS * SYNTHETIC_CHUNK_LEN);
                for _ in 0..SYNTHETIC_CHUNKS {
                    let mut bits = rng.next_u64();
                    for _ in 0..SYNTHETIC_CHUNK_LEN {
                        signature.push(BASE36[(bits % 36) as usize] as char);
                        bits /= 36;
                    }
                }
                signature
            })
            .collect()
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new(SYNTHETIC_POOL_SIZE, 0)
    }
}

impl TransactionSource for SyntheticSource {
    fn recent(&self) -> Result<Vec<TransactionRecord>> {
        Ok(self
            .signatures()
            .into_iter()
            .map(|signature| TransactionRecord {
                signature,
                from: "0x123".to_owned(),
                to: None,
                amount: "100".to_owned(),
                slot: 123,
                block_time: 123,
                activity_type: "mint".to_owned(),
            })
            .collect())
    }
}

/// Resolves `query`, adds its hash to the grid and selects the nearest cell
/// showing it. The session is untouched when the lookup fails.
pub fn lookup_and_focus<L>(lookup: &L, query: &str, session: &mut GridSession) -> Result<(TransactionRecord, CellCoord)>
where
    L: TransactionLookup + ?Sized,
{
    let record = lookup
        .lookup(query)
        .map_err(|err| anyhow!(err.into_coded()))
        .with_context(|| format!("lookup of '{}' failed", query.trim()))?;
    let cell = session.focus_hash(&record.signature)?;
    Ok((record, cell))
}

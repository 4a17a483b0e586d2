//! Content-addressed identity: genome ids, code fingerprints, item ids.
//!
//! Every digest here is SHA-256 over a canonical JSON form in which object
//! keys are sorted, so field insertion order never changes an id.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use super::error::IdentityError;
use super::types::GenomeId;

/// Compute SHA256 hash of bytes and return as hex string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Serialize `value` to JSON with every object's keys in sorted order.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, IdentityError> {
    let value = serde_json::to_value(value)?;
    Ok(serde_json::to_string(&canonicalize(value))?)
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Fingerprint of an organism's behavioral code (source text, module bytes,
/// or any stable description of the decision capability).
pub fn code_fingerprint(code: &[u8]) -> String {
    sha256_hex(code)
}

/// Derive the genome id of a configuration + code pair.
///
/// Identical canonical config, fingerprint and state version always yield
/// the identical id.
pub fn compute_genome_id<T: Serialize + ?Sized>(
    config: &T,
    code_fingerprint: &str,
    state_version: u32,
) -> Result<GenomeId, IdentityError> {
    let canonical = canonical_json(config)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hasher.update(b"\n");
    hasher.update(code_fingerprint.as_bytes());
    hasher.update(b"\n");
    hasher.update(format!("v{state_version}").as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Deterministic item id over name, weight and properties.
pub fn compute_item_id(
    name: &str,
    weight: f64,
    properties: &BTreeMap<String, Value>,
) -> Result<String, IdentityError> {
    let canonical = canonical_json(&serde_json::json!({
        "name": name,
        "weight": weight,
        "properties": properties,
    }))?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// The raw 32 digest bytes behind a genome id.
///
/// Ids that are not 64 hex chars (reserved markers, hand-made test ids) are
/// hashed first so callers can always index into 32 bytes.
pub fn genome_digest_bytes(genome_id: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    match hex::decode(genome_id) {
        Ok(bytes) if bytes.len() == 32 => out.copy_from_slice(&bytes),
        _ => {
            let mut hasher = Sha256::new();
            hasher.update(genome_id.as_bytes());
            out.copy_from_slice(&hasher.finalize());
        }
    }
    out
}

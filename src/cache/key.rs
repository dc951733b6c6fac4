//! Cache key generation using SHA-256 hashes

use std::fmt;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Deterministic cache key for an operation and its variables
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    operation: String,
    digest: String,
}

impl CacheKey {
    /// Key from an operation name and a caller-chosen discriminator
    /// (e.g. a resource id), hashed the same way as variables.
    pub fn new(operation: &str, discriminator: &str) -> Self {
        derive_key(operation, &Value::String(discriminator.to_string()))
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.operation, self.digest)
    }
}

/// Generate a deterministic cache key from an operation name and variables.
///
/// The key is a SHA-256 hash of the operation name and the canonical JSON
/// form of the variables (object keys sorted at every depth), so the same
/// variables in a different key order produce the same key.
pub fn derive_key(operation: &str, variables: &Value) -> CacheKey {
    let mut canonical = String::new();
    write_canonical(variables, &mut canonical);

    let mut hasher = Sha256::new();
    hasher.update(operation.as_bytes());
    hasher.update(b"|");
    hasher.update(canonical.as_bytes());

    CacheKey {
        operation: operation.to_string(),
        digest: format!("{:x}", hasher.finalize()),
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Strings serialize infallibly
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                if let Some(v) = map.get(key) {
                    write_canonical(v, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

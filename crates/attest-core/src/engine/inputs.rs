//! Input sources.
//!
//! A source is a named, finite, restartable sequence of input tuples; the
//! driver cycles through it modulo its length when the sample count exceeds
//! it. A source that exposes a content hash participates in
//! factor-consistency checks: the hash identifies the full ordered sequence,
//! independent of how many values any one consumer cycles through.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

pub type InputTuple = Vec<Value>;

pub trait InputSource: Send + Sync {
    fn name(&self) -> &str;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The tuple at `index`; callers pass `index % len()`.
    fn tuple(&self, index: usize) -> InputTuple;

    /// Content hash over the full ordered sequence. `None` opts the source
    /// out of factor-consistency checks.
    fn content_hash(&self) -> Option<String> {
        None
    }
}

/// An in-memory source with a lazily computed, cached content hash.
pub struct StaticInputSource {
    name: String,
    tuples: Vec<InputTuple>,
    hash: OnceLock<String>,
}

impl StaticInputSource {
    pub fn new(name: impl Into<String>, tuples: Vec<InputTuple>) -> Self {
        Self {
            name: name.into(),
            tuples,
            hash: OnceLock::new(),
        }
    }
}

impl InputSource for StaticInputSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.tuples.len()
    }

    fn tuple(&self, index: usize) -> InputTuple {
        self.tuples[index].clone()
    }

    fn content_hash(&self) -> Option<String> {
        Some(
            self.hash
                .get_or_init(|| hash_sequence(&self.tuples))
                .clone(),
        )
    }
}

/// A single empty tuple for test bodies that take no inputs. Carries no
/// content hash, so factor-consistency checks report "not applicable".
pub struct UnitInputSource {
    name: String,
}

impl UnitInputSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl InputSource for UnitInputSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        1
    }

    fn tuple(&self, _index: usize) -> InputTuple {
        Vec::new()
    }
}

/// Canonical JSON per tuple, one line each, SHA-256 over the whole.
fn hash_sequence(tuples: &[InputTuple]) -> String {
    let mut h = Sha256::new();
    for tuple in tuples {
        let line =
            serde_json::to_string(tuple).unwrap_or_else(|_| String::from("<unencodable>"));
        h.update(line.as_bytes());
        h.update(b"\n");
    }
    hex::encode(h.finalize())
}

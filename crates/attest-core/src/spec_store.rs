//! Flat-file persistence for execution specifications.
//!
//! YAML or JSON, chosen by file extension; `.json` gets JSON, anything else
//! gets YAML. Documents are immutable once written: a load followed by a
//! save must reproduce the same spec.

use crate::model::spec::SPEC_VERSION;
use crate::model::ExecutionSpecification;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecStoreError {
    #[error("failed to read spec {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write spec {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse spec {path}: {detail}")]
    Parse { path: String, detail: String },
    #[error("spec {path} has unsupported version {found} (supported: {SPEC_VERSION})")]
    UnsupportedVersion { path: String, found: u32 },
}

fn is_json(path: &Path) -> bool {
    path.extension().map(|e| e == "json").unwrap_or(false)
}

pub fn load_spec(path: &Path) -> Result<ExecutionSpecification, SpecStoreError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SpecStoreError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let spec: ExecutionSpecification = if is_json(path) {
        serde_json::from_str(&raw).map_err(|e| SpecStoreError::Parse {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?
    } else {
        serde_yaml::from_str(&raw).map_err(|e| SpecStoreError::Parse {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?
    };
    if spec.version != SPEC_VERSION {
        return Err(SpecStoreError::UnsupportedVersion {
            path: path.display().to_string(),
            found: spec.version,
        });
    }
    Ok(spec)
}

pub fn save_spec(spec: &ExecutionSpecification, path: &Path) -> Result<(), SpecStoreError> {
    let content = if is_json(path) {
        serde_json::to_string_pretty(spec).map_err(|e| SpecStoreError::Parse {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?
    } else {
        serde_yaml::to_string(spec).map_err(|e| SpecStoreError::Parse {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?
    };
    std::fs::write(path, content).map_err(|source| SpecStoreError::Write {
        path: path.display().to_string(),
        source,
    })
}

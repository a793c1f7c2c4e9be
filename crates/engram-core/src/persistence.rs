//! # Document Persistence
//!
//! JSON serialization of the whole graph document and the file-level
//! load/save policy:
//! - A missing file loads as an empty document; a malformed one is a
//!   fatal load error.
//! - Saves dump the three top-level maps as pretty-printed JSON
//!   (two-space indent) in a single direct write.
//!
//! Serialization is separated from the store so it stays a pure
//! transformation; the store decides *when* to persist and handles
//! rollback.

use crate::EngramError;
use crate::types::GraphDocument;
use std::path::Path;

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a document to pretty-printed JSON bytes.
pub fn document_to_bytes(document: &GraphDocument) -> Result<Vec<u8>, EngramError> {
    serde_json::to_vec_pretty(document)
        .map_err(|e| EngramError::Persistence(format!("failed to serialize graph document: {e}")))
}

/// Deserialize a document from JSON bytes.
///
/// Missing top-level keys are tolerated (they load as empty maps);
/// anything else malformed is an error.
pub fn document_from_bytes(bytes: &[u8]) -> Result<GraphDocument, EngramError> {
    serde_json::from_slice(bytes)
        .map_err(|e| EngramError::Persistence(format!("failed to parse graph document: {e}")))
}

// =============================================================================
// FILE I/O
// =============================================================================

/// Load a document from a file path.
///
/// A missing file is treated as an empty graph so a fresh store can be
/// opened against a path that does not exist yet.
pub fn load_document(path: &Path) -> Result<GraphDocument, EngramError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no graph document yet, starting empty");
            return Ok(GraphDocument::new());
        }
        Err(e) => {
            return Err(EngramError::Persistence(format!(
                "failed to read graph document {}: {e}",
                path.display()
            )));
        }
    };

    let document = document_from_bytes(&bytes)?;
    tracing::debug!(
        path = %path.display(),
        entities = document.entities.len(),
        relations = document.relations.len(),
        observations = document.observations.len(),
        "loaded graph document"
    );
    Ok(document)
}

/// Write serialized document bytes to a file path.
///
/// Atomicity is best-effort: this is a direct write, and a failure
/// surfaces to the store which rolls the in-memory mutation back.
pub fn write_document(path: &Path, bytes: &[u8]) -> Result<(), EngramError> {
    std::fs::write(path, bytes).map_err(|e| {
        EngramError::Persistence(format!(
            "failed to write graph document {}: {e}",
            path.display()
        ))
    })
}

// =============================================================================
// TESTS
// =============================================================================

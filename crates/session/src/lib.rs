//! # Repolens Session
//!
//! Session-scoped index state: one namespace per conversation.
//!
//! Each session owns a manifest (what was ingested, content hashes, chunk
//! payloads) plus live sparse and dense indexes rebuilt from it on demand.
//! Manifests persist through atomic writes; corrupt ones quarantine and
//! force a session-local reindex without touching any other session.

mod error;
mod manifest;
mod registry;
mod store;

pub use error::{Result, SessionError};
pub use manifest::{
    content_hash, DocumentRecord, IndexedChunk, SessionManifest, MANIFEST_SCHEMA_VERSION,
};
pub use registry::{IndexHandle, SessionIndexes, SessionRegistry};
pub use store::SessionStore;

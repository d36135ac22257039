//! # Repolens Search
//!
//! Rank fusion for hybrid retrieval.
//!
//! Dense and sparse retrievers score on incompatible scales, so fusion works
//! purely on ranks: reciprocal-rank fusion with fixed constants and total
//! tie-breaking, giving a deterministic hybrid ordering.

mod fusion;

pub use fusion::{FusedHit, Provenance, RrfFusion};

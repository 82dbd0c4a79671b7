//! # DedupX
//!
//! Deterministic record matching and identity resolution for company and
//! contact data. DedupX evaluates configurable match rules over per-field
//! similarity scores, restricts comparisons to blocked candidate groups,
//! and assigns every record a stable DeDup ID that persists across
//! independent runs.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use dedupx::prelude::*;
//!
//! let store = Arc::new(DedupKeyStore::in_memory(FingerprintRecipe::default()));
//! let engine = MatchingEngine::new(EngineConfig::default(), store).unwrap();
//!
//! let batch = vec![
//!     Record::new()
//!         .with(field::SOURCE_TYPE, "CRM")
//!         .with(field::SOURCE_ID, "1")
//!         .with(field::COMPANY_NAME, "Acme, Inc.")
//!         .with(field::PHONE_NUMBER, "404-555-1234"),
//!     Record::new()
//!         .with(field::SOURCE_TYPE, "CRM")
//!         .with(field::SOURCE_ID, "2")
//!         .with(field::COMPANY_NAME, "ACME LLC")
//!         .with(field::PHONE_NUMBER, "(404) 555-1234"),
//! ];
//!
//! let output = engine.run(&batch).unwrap();
//! assert_eq!(output.records[0].dedup_id, output.records[1].dedup_id);
//! ```
//!
//! ## Crate Structure
//!
//! - `dedupx-core` - record model, normalization, candidate blocking
//! - `dedupx-similarity` - field scoring, match rules, quality scoring
//! - `dedupx-store` - persistent fingerprint-to-DeDup-ID store
//! - `dedupx-engine` - configuration and the batch pipeline

// Re-export core types
pub use dedupx_core::{
    field, BlockingIndex, BlockingRecipe, Error, FieldKind, Record, RecordId, Result,
};

// Re-export similarity
pub use dedupx_similarity::{
    field_similarity, Classifier, Condition, ConfidenceScores, QualityScore, QualityWeights,
    Rule, RuleSet, TableClassifier,
};

// Re-export store
pub use dedupx_store::{DedupEntry, DedupKeyStore, Fingerprint, FingerprintRecipe, StoreDelta};

// Re-export engine
pub use dedupx_engine::{EngineConfig, MatchStatus, MatchingEngine, OutputRecord, RunStats};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        field, BlockingIndex, BlockingRecipe, Classifier, Condition, DedupKeyStore, EngineConfig,
        Error, FieldKind, Fingerprint, FingerprintRecipe, MatchStatus, MatchingEngine,
        OutputRecord, QualityWeights, Record, Result, Rule, RuleSet, RunStats, StoreDelta,
        TableClassifier,
    };
}

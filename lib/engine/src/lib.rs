//! # DedupX Engine
//!
//! The batch matching pipeline: configuration context, parallel rule
//! evaluation over blocked candidates, and deterministic DeDup ID
//! assignment against a persistent identity store.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use dedupx_core::{field, Record};
//! use dedupx_engine::{EngineConfig, MatchingEngine};
//! use dedupx_store::{DedupKeyStore, FingerprintRecipe};
//!
//! let store = Arc::new(DedupKeyStore::in_memory(FingerprintRecipe::default()));
//! let engine = MatchingEngine::new(EngineConfig::default(), store).unwrap();
//!
//! let batch = vec![Record::new()
//!     .with(field::SOURCE_TYPE, "CRM")
//!     .with(field::SOURCE_ID, "1")
//!     .with(field::COMPANY_NAME, "Acme, Inc.")];
//! let output = engine.run(&batch).unwrap();
//! assert_eq!(output.stats.new_keys, 1);
//! ```

pub mod config;
pub mod pipeline;

pub use config::{standard_rules, EngineConfig};
pub use pipeline::{
    MatchStatus, MatchingEngine, OutputRecord, RunOutput, RunStats, REASON_DEDUP_KEY, REASON_NEW,
};

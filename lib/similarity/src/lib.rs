//! # DedupX Similarity
//!
//! Field similarity scoring, match rules and quality scoring for the DedupX
//! record-matching engine.
//!
//! ## Features
//!
//! - **Per-field scoring**: algorithm selected by field kind - fuzzy blends
//!   for names and addresses, binary exact for phones, emails and zips
//! - **Rule engine**: priority-ordered, configurable match rules with
//!   include/exclude polarity and blank policies
//! - **Quality scoring**: weighted 0-100 contact-field quality over injected
//!   classification predicates
//! - **Explainability**: every evaluation reports its per-field scores and
//!   confidence breakdown
//!
//! ## Example
//!
//! ```rust
//! use dedupx_core::{field, Record};
//! use dedupx_similarity::{ColumnCatalog, Condition, Rule, RuleSet};
//!
//! let rules = vec![Rule {
//!     id: "email_exact".to_string(),
//!     name: "Exact email".to_string(),
//!     priority: 100,
//!     enabled: true,
//!     match_reason: "EMAIL_EXACT".to_string(),
//!     conditions: vec![Condition {
//!         field: field::EMAIL_ADDRESS.to_string(),
//!         threshold: 100.0,
//!         polarity: Default::default(),
//!         blank_policy: Default::default(),
//!     }],
//! }];
//!
//! let set = RuleSet::compile(&rules, &ColumnCatalog::standard()).unwrap();
//! let a = Record::new().with(field::EMAIL_ADDRESS, "info@acme.com");
//! let b = Record::new().with(field::EMAIL_ADDRESS, "INFO@acme.com");
//! let scores = set.pair_scores(&a, &b);
//! assert!(set.evaluate(&a, &b, &scores).is_some());
//! ```

pub mod quality;
pub mod rules;
pub mod score;

// Re-export main types for convenience
pub use quality::{
    address_confidence, confidence_scores, overall_confidence, Classifier, ConfidenceScores,
    EmailWeights, PhoneWeights, QualityScore, QualityScorer, QualityWeights, TableClassifier,
};
pub use rules::{BlankPolicy, ColumnCatalog, Condition, Polarity, Rule, RuleMatch, RuleSet};
pub use score::field_similarity;

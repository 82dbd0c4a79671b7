//! Batch matching pipeline
//!
//! Orchestrates one run: required-field validation, standardization and
//! quality scoring, candidate blocking, rule evaluation, identity
//! resolution. Scoring and rule evaluation are pure and run in parallel;
//! DeDup ID assignment walks the batch in input order so a run's output is
//! fully determined by the store state and the input sequence.

use crate::config::EngineConfig;
use chrono::{DateTime, Utc};
use dedupx_core::normalize::standardize;
use dedupx_core::{field, BlockingIndex, Error, Record, Result};
use dedupx_similarity::{
    confidence_scores, overall_confidence, Classifier, ColumnCatalog, ConfidenceScores,
    QualityScore, QualityScorer, RuleMatch, RuleSet,
};
use dedupx_store::{DedupKeyStore, StoreDelta};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How a record's identity was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Linked to an identity that already existed (in this batch or in the
    /// persistent store).
    MatchedExisting,
    /// A new identity was minted for this record.
    New,
}

/// Reason reported when an unmatched record's fingerprint was already known
/// to the store.
pub const REASON_DEDUP_KEY: &str = "DEDUP_KEY";
/// Reason reported when a new identity was minted.
pub const REASON_NEW: &str = "NEW";

/// An input record annotated with the run's outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputRecord {
    #[serde(flatten)]
    pub record: Record,
    pub dedup_id: String,
    pub match_status: MatchStatus,
    pub match_reason: String,
    pub matched_identifiers: Vec<String>,
    pub field_scores: BTreeMap<String, f64>,
    pub confidence: ConfidenceScores,
    pub overall_confidence: f64,
    pub email_quality: QualityScore,
    pub phone_quality: QualityScore,
    pub matched_at: DateTime<Utc>,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub total_records: usize,
    pub matched_existing: usize,
    pub new_keys: usize,
    pub normalization_warnings: usize,
}

/// Everything a run produces: annotated records, counters and the store
/// delta for the caller's storage layer.
#[derive(Debug)]
pub struct RunOutput {
    pub records: Vec<OutputRecord>,
    pub stats: RunStats,
    pub delta: StoreDelta,
}

/// A phase-1 decision for one record: the earliest candidate satisfying the
/// highest-priority rule, with the pair's field scores.
struct PairDecision {
    partner: usize,
    rule: RuleMatch,
    scores: HashMap<String, f64>,
}

/// The record-matching engine for one configuration and one store.
pub struct MatchingEngine {
    config: EngineConfig,
    rules: RuleSet,
    classifier: Arc<dyn Classifier>,
    store: Arc<DedupKeyStore>,
}

impl MatchingEngine {
    /// Build an engine with the configuration's own classification tables.
    pub fn new(config: EngineConfig, store: Arc<DedupKeyStore>) -> Result<Self> {
        let classifier = Arc::new(config.classification.clone());
        Self::with_classifier(config, classifier, store)
    }

    /// Build an engine with an externally supplied classifier. Rule
    /// compilation happens here; a bad configuration never reaches `run`.
    pub fn with_classifier(
        config: EngineConfig,
        classifier: Arc<dyn Classifier>,
        store: Arc<DedupKeyStore>,
    ) -> Result<Self> {
        let rules = RuleSet::compile(&config.rules, &ColumnCatalog::standard())?;
        if rules.is_empty() {
            return Err(Error::Config(
                "no enabled rules; every pair would be a non-match".to_string(),
            ));
        }
        Ok(Self {
            config,
            rules,
            classifier,
            store,
        })
    }

    /// Run the pipeline over one batch.
    pub fn run(&self, records: &[Record]) -> Result<RunOutput> {
        self.validate_required(records)?;

        // Standardize and count degraded normalizations. Pure, parallel.
        let standardized: Vec<(Record, usize)> = records
            .par_iter()
            .map(|record| standardize_with_warnings(record))
            .collect();
        let normalization_warnings: usize = standardized.iter().map(|(_, w)| w).sum();
        let standardized: Vec<Record> = standardized.into_iter().map(|(r, _)| r).collect();

        let index = BlockingIndex::build(self.config.blocking.clone(), &standardized);
        debug!(
            blocks = index.block_count(),
            records = standardized.len(),
            "blocking index built"
        );

        // Phase 1: evaluate each record against earlier records sharing a
        // block. Pure given the batch, safe to parallelize.
        let decisions: Vec<Option<PairDecision>> = (0..standardized.len())
            .into_par_iter()
            .map(|i| self.decide(i, &standardized, &index))
            .collect();

        // Phase 2: assign identities in input order.
        let scorer = QualityScorer::new(self.config.quality.clone(), self.classifier.as_ref());
        let mut outputs: Vec<OutputRecord> = Vec::with_capacity(standardized.len());
        let mut stats = RunStats {
            total_records: records.len(),
            normalization_warnings,
            ..Default::default()
        };

        for (i, record) in standardized.iter().enumerate() {
            let decision = &decisions[i];
            let (dedup_id, status, reason, scores) = match decision {
                Some(found) => {
                    let dedup_id = outputs[found.partner].dedup_id.clone();
                    self.store.link(&dedup_id, record);
                    debug!(
                        record = i,
                        partner = found.partner,
                        rule = %found.rule.rule_id,
                        "rule match"
                    );
                    stats.matched_existing += 1;
                    (
                        dedup_id,
                        MatchStatus::MatchedExisting,
                        found.rule.match_reason.clone(),
                        found.scores.clone(),
                    )
                }
                None => {
                    let (dedup_id, created) = self.store.resolve(record);
                    if created {
                        stats.new_keys += 1;
                        (
                            dedup_id,
                            MatchStatus::New,
                            REASON_NEW.to_string(),
                            HashMap::new(),
                        )
                    } else {
                        stats.matched_existing += 1;
                        (
                            dedup_id,
                            MatchStatus::MatchedExisting,
                            REASON_DEDUP_KEY.to_string(),
                            fingerprint_scores(record),
                        )
                    }
                }
            };

            let confidence = confidence_scores(&scores);
            let overall = overall_confidence(&scores);
            let matched_identifiers = match status {
                MatchStatus::MatchedExisting => self.store.identifiers(&dedup_id),
                MatchStatus::New => Vec::new(),
            };
            outputs.push(OutputRecord {
                record: record.clone(),
                dedup_id,
                match_status: status,
                match_reason: reason,
                matched_identifiers,
                field_scores: scores
                    .into_iter()
                    .map(|(name, score)| (name, round2(score)))
                    .collect(),
                confidence,
                overall_confidence: overall,
                email_quality: scorer.score_email(record.get(field::EMAIL_ADDRESS)),
                phone_quality: scorer.score_phone(
                    record.get(field::PHONE_NUMBER),
                    record.get(field::PHONE_EXTENSION),
                ),
                matched_at: Utc::now(),
            });
        }

        let delta = self.store.commit()?;
        info!(
            total = stats.total_records,
            matched_existing = stats.matched_existing,
            new_keys = stats.new_keys,
            warnings = stats.normalization_warnings,
            "matching run complete"
        );
        Ok(RunOutput {
            records: outputs,
            stats,
            delta,
        })
    }

    /// All required fields missing anywhere in the batch, reported at once.
    fn validate_required(&self, records: &[Record]) -> Result<()> {
        let mut missing: BTreeSet<String> = BTreeSet::new();
        for record in records {
            for required in &self.config.required_fields {
                if record.is_blank(required) {
                    missing.insert(required.clone());
                }
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingFields(missing.into_iter().collect()))
        }
    }

    /// Best match for record `i` among earlier records sharing a blocking
    /// key: the candidate satisfying the highest-priority rule, earliest
    /// candidate on ties.
    fn decide(
        &self,
        i: usize,
        records: &[Record],
        index: &BlockingIndex,
    ) -> Option<PairDecision> {
        let record = &records[i];
        let mut best: Option<(usize, PairDecision)> = None;
        for j in index.candidates(i, record) {
            if j >= i {
                continue;
            }
            let scores = self.rules.pair_scores(record, &records[j]);
            if let Some((rank, rule)) = self.rules.evaluate_ranked(record, &records[j], &scores) {
                let better = match &best {
                    Some((best_rank, _)) => rank < *best_rank,
                    None => true,
                };
                if better {
                    let decision = PairDecision {
                        partner: j,
                        rule,
                        scores,
                    };
                    if rank == 0 {
                        return Some(decision);
                    }
                    best = Some((rank, decision));
                }
            }
        }
        best.map(|(_, decision)| decision)
    }
}

/// Scores reported for a store-resolved record. A fingerprint hit means the
/// identity-bearing fields agree exactly with the stored entry, so every
/// populated one scores 100.
fn fingerprint_scores(record: &Record) -> HashMap<String, f64> {
    let mut scores = HashMap::new();
    for name in [
        field::COMPANY_NAME,
        field::ADDRESS_LINE_1,
        field::PHONE_NUMBER,
    ] {
        if !record.is_blank(name) {
            scores.insert(name.to_string(), 100.0);
        }
    }
    scores
}

/// Standardize one record, counting fields whose raw value carried content
/// the normalizer could not keep anything of.
fn standardize_with_warnings(record: &Record) -> (Record, usize) {
    let std = standardize(record);
    let mut warnings = 0;
    for (raw, derived) in [
        (field::COMPANY_NAME, field::COMPANY_NAME_STD),
        (field::ADDRESS_LINE_1, field::ADDRESS1_STD),
        (field::ADDRESS_LINE_2, field::ADDRESS2_STD),
        (field::PHONE_NUMBER, field::PHONE_STD),
    ] {
        if !record.is_blank(raw) && std.get(derived).is_empty() {
            warn!(
                field = raw,
                value = record.get(raw),
                "value degraded to empty during normalization"
            );
            warnings += 1;
        }
    }
    (std, warnings)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use dedupx_store::FingerprintRecipe;

    fn record(source_id: &str, company: &str, address: &str, zip: &str, phone: &str) -> Record {
        Record::new()
            .with(field::SOURCE_TYPE, "CRM")
            .with(field::SOURCE_ID, source_id)
            .with(field::COMPANY_NAME, company)
            .with(field::ADDRESS_LINE_1, address)
            .with(field::ZIP_CODE, zip)
            .with(field::PHONE_NUMBER, phone)
    }

    fn engine() -> MatchingEngine {
        let store = Arc::new(DedupKeyStore::in_memory(FingerprintRecipe::default()));
        MatchingEngine::new(EngineConfig::default(), store).unwrap()
    }

    #[test]
    fn test_empty_batch() {
        let output = engine().run(&[]).unwrap();
        assert!(output.records.is_empty());
        assert_eq!(output.stats.new_keys, 0);
    }

    #[test]
    fn test_missing_required_field_aborts_run() {
        let records = vec![
            record("1", "Acme", "1 Main St", "30301", "404-555-1234"),
            record("2", "", "2 Oak Ave", "30301", "404-555-9999"),
        ];
        let err = engine().run(&records).unwrap_err();
        match err {
            Error::MissingFields(fields) => {
                assert_eq!(fields, vec![field::COMPANY_NAME.to_string()])
            }
            other => panic!("expected MissingFields, got {other}"),
        }
    }

    #[test]
    fn test_duplicate_pair_links_in_batch() {
        let records = vec![
            record("1", "Acme, Inc.", "1 Main Street", "30301", "404-555-1234"),
            record("2", "ACME LLC", "1 Main St", "30301", "404-555-1234"),
        ];
        let output = engine().run(&records).unwrap();
        assert_eq!(output.records[0].match_status, MatchStatus::New);
        assert_eq!(output.records[1].match_status, MatchStatus::MatchedExisting);
        assert_eq!(output.records[1].match_reason, "NAME_ADDRESS");
        assert_eq!(output.records[0].dedup_id, output.records[1].dedup_id);
        assert_eq!(output.records[1].confidence.company, 100.0);
        assert_eq!(
            output.records[1].matched_identifiers,
            vec!["CRM:1".to_string(), "CRM:2".to_string()]
        );
        assert_eq!(output.stats.new_keys, 1);
        assert_eq!(output.stats.matched_existing, 1);
    }

    #[test]
    fn test_unrelated_records_each_mint() {
        let records = vec![
            record("1", "Acme", "1 Main St", "30301", "404-555-1111"),
            record("2", "Zenith", "9 Elm St", "98101", "206-555-2222"),
        ];
        let output = engine().run(&records).unwrap();
        assert_eq!(output.stats.new_keys, 2);
        assert_ne!(output.records[0].dedup_id, output.records[1].dedup_id);
        assert_eq!(output.delta.created.len(), 2);
    }

    #[test]
    fn test_rule_priority_decides_reason() {
        // Pair satisfies both name_phone (150) and email_exact (200).
        let a = record("1", "Acme", "", "", "404-555-1234")
            .with(field::EMAIL_ADDRESS, "info@acme.com");
        let b = record("2", "Acme", "", "", "404-555-1234")
            .with(field::EMAIL_ADDRESS, "info@acme.com");
        let output = engine().run(&[a, b]).unwrap();
        assert_eq!(output.records[1].match_reason, "NAME_PHONE");
    }

    #[test]
    fn test_quality_scores_always_reported() {
        let records = vec![record("1", "Acme", "1 Main St", "30301", "404-555-1234")
            .with(field::EMAIL_ADDRESS, "jane@acme.com")];
        let output = engine().run(&records).unwrap();
        assert_eq!(output.records[0].email_quality.total, 100.0);
        assert!(output.records[0].phone_quality.total > 0.0);
    }

    #[test]
    fn test_no_enabled_rules_is_config_error() {
        let mut config = EngineConfig::default();
        for rule in &mut config.rules {
            rule.enabled = false;
        }
        let store = Arc::new(DedupKeyStore::in_memory(FingerprintRecipe::default()));
        assert!(matches!(
            MatchingEngine::new(config, store),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_determinism_same_store_same_output() {
        let records = vec![
            record("1", "Acme, Inc.", "1 Main Street", "30301", "404-555-1234"),
            record("2", "ACME LLC", "1 Main St", "30301", "404-555-1234"),
            record("3", "Zenith", "9 Elm St", "98101", "206-555-2222"),
        ];
        let first = engine().run(&records).unwrap();
        let second = engine().run(&records).unwrap();
        for (a, b) in first.records.iter().zip(&second.records) {
            assert_eq!(a.match_status, b.match_status);
            assert_eq!(a.match_reason, b.match_reason);
            assert_eq!(a.field_scores, b.field_scores);
            assert_eq!(a.confidence, b.confidence);
        }
    }
}

//! Run configuration
//!
//! One explicit configuration context per run, passed into the engine at
//! construction. Nothing here is a process-wide singleton; reloading a
//! configuration means building a new [`EngineConfig`] and a new engine.

use dedupx_core::blocking::{default_recipes, BlockingRecipe};
use dedupx_core::{field, Result};
use dedupx_similarity::{Condition, QualityWeights, Rule, TableClassifier};
use dedupx_store::FingerprintRecipe;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete configuration for a matching run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Match rules, any order; the rule compiler sorts by priority.
    pub rules: Vec<Rule>,
    /// Fields every input record must carry a non-blank value for.
    pub required_fields: Vec<String>,
    /// Quality criterion weights.
    pub quality: QualityWeights,
    /// Fingerprint recipe for the identity store.
    pub fingerprint: FingerprintRecipe,
    /// Blocking recipes; candidate sets are unioned across recipes.
    pub blocking: Vec<BlockingRecipe>,
    /// Classification tables for the default classifier. Ignored when the
    /// caller injects its own classifier.
    pub classification: TableClassifier,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rules: standard_rules(),
            required_fields: vec![field::COMPANY_NAME.to_string()],
            quality: QualityWeights::default(),
            fingerprint: FingerprintRecipe::default(),
            blocking: default_recipes(),
            classification: TableClassifier::default(),
        }
    }
}

impl EngineConfig {
    /// Load a configuration file (JSON). Missing sections fall back to the
    /// defaults; validation happens when the engine compiles the rules.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        let config: EngineConfig = serde_json::from_slice(&data)?;
        Ok(config)
    }
}

/// The standard rule table. Priority 100 is the strongest signal (name plus
/// street address in the same zip), 150 falls back to name plus exact phone,
/// 200 to an exact email alone.
pub fn standard_rules() -> Vec<Rule> {
    fn include(field: &str, threshold: f64) -> Condition {
        Condition {
            field: field.to_string(),
            threshold,
            polarity: Default::default(),
            blank_policy: Default::default(),
        }
    }

    vec![
        Rule {
            id: "name_address".to_string(),
            name: "Company name + street address + zip".to_string(),
            priority: 100,
            enabled: true,
            match_reason: "NAME_ADDRESS".to_string(),
            conditions: vec![
                include(field::COMPANY_NAME, 85.0),
                include(field::ADDRESS_LINE_1, 85.0),
                include(field::ZIP_CODE, 100.0),
            ],
        },
        Rule {
            id: "name_phone".to_string(),
            name: "Company name + exact phone".to_string(),
            priority: 150,
            enabled: true,
            match_reason: "NAME_PHONE".to_string(),
            conditions: vec![
                include(field::COMPANY_NAME, 85.0),
                include(field::PHONE_NUMBER, 100.0),
            ],
        },
        Rule {
            id: "email_exact".to_string(),
            name: "Exact email address".to_string(),
            priority: 200,
            enabled: true,
            match_reason: "EMAIL_EXACT".to_string(),
            conditions: vec![include(field::EMAIL_ADDRESS, 100.0)],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use dedupx_similarity::{ColumnCatalog, RuleSet};

    #[test]
    fn test_standard_rules_compile() {
        let set = RuleSet::compile(&standard_rules(), &ColumnCatalog::standard()).unwrap();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_default_config_roundtrip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.rules, config.rules);
        assert_eq!(parsed.required_fields, config.required_fields);
        assert_eq!(parsed.fingerprint, config.fingerprint);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: EngineConfig =
            serde_json::from_str(r#"{"required_fields": ["COMPANY_NAME", "ZIP_CODE"]}"#).unwrap();
        assert_eq!(parsed.required_fields.len(), 2);
        assert_eq!(parsed.rules, standard_rules());
        assert_eq!(parsed.blocking, default_recipes());
    }
}

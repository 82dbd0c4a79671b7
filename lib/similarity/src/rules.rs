//! Match rules and rule evaluation
//!
//! Rules are immutable configuration loaded once per run. Each rule is an
//! ordered set of per-field conditions; a candidate pair matches when every
//! condition of some rule holds, and the first satisfied rule in priority
//! order wins. Lower numeric priority is evaluated first, ties broken by
//! rule id, so evaluation order is a total order.

use crate::score::field_similarity;
use ahash::AHashMap;
use dedupx_core::{field, Error, FieldKind, Record, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a condition relates the field score to its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// Satisfied iff `score >= threshold`.
    #[default]
    Include,
    /// Satisfied iff `score < threshold`.
    Exclude,
}

/// How a condition treats empty values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlankPolicy {
    /// A blank on either side leaves the condition unsatisfied.
    #[default]
    None,
    /// Satisfied when the threshold is met, or when both sides are blank.
    BlankAllowed,
    /// Satisfied iff both sides are blank; the score is irrelevant.
    BlankOnly,
}

/// One per-field requirement inside a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    #[serde(rename = "threshold_percent")]
    pub threshold: f64,
    #[serde(default)]
    pub polarity: Polarity,
    #[serde(default)]
    pub blank_policy: BlankPolicy,
}

/// A configured match rule. Never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub priority: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub match_reason: String,
    pub conditions: Vec<Condition>,
}

fn default_enabled() -> bool {
    true
}

/// Known columns and their comparison kinds. Conditions are resolved against
/// the catalog once, at compile time; referencing an unknown column is a
/// configuration error, not a runtime one.
#[derive(Debug, Clone)]
pub struct ColumnCatalog {
    columns: AHashMap<String, FieldKind>,
}

impl ColumnCatalog {
    pub fn empty() -> Self {
        Self {
            columns: AHashMap::new(),
        }
    }

    /// Catalog of the standard input columns.
    pub fn standard() -> Self {
        let mut catalog = Self::empty();
        catalog.insert(field::COMPANY_NAME, FieldKind::Company);
        catalog.insert(field::ADDRESS_LINE_1, FieldKind::Address);
        catalog.insert(field::ADDRESS_LINE_2, FieldKind::Address);
        catalog.insert(field::CITY, FieldKind::Text);
        catalog.insert(field::STATE, FieldKind::Exact);
        catalog.insert(field::ZIP_CODE, FieldKind::Exact);
        catalog.insert(field::COUNTRY, FieldKind::Exact);
        catalog.insert(field::PHONE_NUMBER, FieldKind::Phone);
        catalog.insert(field::PHONE_EXTENSION, FieldKind::Exact);
        catalog.insert(field::EMAIL_ADDRESS, FieldKind::Email);
        catalog.insert(field::SOURCE_TYPE, FieldKind::Exact);
        catalog.insert(field::SOURCE_ID, FieldKind::Exact);
        catalog
    }

    pub fn insert(&mut self, name: impl Into<String>, kind: FieldKind) {
        self.columns.insert(name.into(), kind);
    }

    pub fn kind(&self, name: &str) -> Option<FieldKind> {
        self.columns.get(name).copied()
    }
}

#[derive(Debug, Clone)]
struct CompiledCondition {
    field: String,
    kind: FieldKind,
    threshold: f64,
    polarity: Polarity,
    blank_policy: BlankPolicy,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    id: String,
    match_reason: String,
    conditions: Vec<CompiledCondition>,
}

/// The winning rule for a candidate pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleMatch {
    pub rule_id: String,
    pub match_reason: String,
}

/// A validated, priority-ordered rule set, ready for evaluation.
///
/// Disabled rules are dropped at compile time and can never shadow an
/// enabled lower-priority rule.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
    fields: Vec<(String, FieldKind)>,
}

impl RuleSet {
    /// Validate and compile a rule list against a column catalog.
    ///
    /// Errors carry the offending rule and field so the configuration can be
    /// fixed at the source.
    pub fn compile(rules: &[Rule], catalog: &ColumnCatalog) -> Result<Self> {
        let mut sorted: Vec<&Rule> = rules.iter().collect();
        sorted.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));

        let mut compiled = Vec::new();
        let mut fields: Vec<(String, FieldKind)> = Vec::new();

        for rule in sorted {
            if rule.conditions.is_empty() {
                return Err(Error::Config(format!(
                    "rule '{}' has no conditions",
                    rule.id
                )));
            }
            let mut conditions = Vec::with_capacity(rule.conditions.len());
            for condition in &rule.conditions {
                let kind = catalog.kind(&condition.field).ok_or_else(|| {
                    Error::Config(format!(
                        "rule '{}' references unknown field '{}'",
                        rule.id, condition.field
                    ))
                })?;
                if !(0.0..=100.0).contains(&condition.threshold) {
                    return Err(Error::Config(format!(
                        "rule '{}' field '{}' has threshold {} outside [0, 100]",
                        rule.id, condition.field, condition.threshold
                    )));
                }
                if rule.enabled && !fields.iter().any(|(name, _)| name == &condition.field) {
                    fields.push((condition.field.clone(), kind));
                }
                conditions.push(CompiledCondition {
                    field: condition.field.clone(),
                    kind,
                    threshold: condition.threshold,
                    polarity: condition.polarity,
                    blank_policy: condition.blank_policy,
                });
            }
            if !rule.enabled {
                continue;
            }
            compiled.push(CompiledRule {
                id: rule.id.clone(),
                match_reason: rule.match_reason.clone(),
                conditions,
            });
        }

        Ok(Self {
            rules: compiled,
            fields,
        })
    }

    /// Every field referenced by any rule, with its resolved kind.
    pub fn fields(&self) -> &[(String, FieldKind)] {
        &self.fields
    }

    /// Number of enabled rules after compilation.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Raw similarity scores for every rule-referenced field of a pair.
    pub fn pair_scores(&self, a: &Record, b: &Record) -> HashMap<String, f64> {
        self.fields
            .iter()
            .map(|(name, kind)| {
                (
                    name.clone(),
                    field_similarity(*kind, a.get(name), b.get(name)),
                )
            })
            .collect()
    }

    /// First rule, in priority order, whose every condition is satisfied by
    /// the pair's scores; `None` means no match.
    pub fn evaluate(
        &self,
        a: &Record,
        b: &Record,
        scores: &HashMap<String, f64>,
    ) -> Option<RuleMatch> {
        self.evaluate_ranked(a, b, scores).map(|(_, m)| m)
    }

    /// Like [`evaluate`](Self::evaluate), also returning the winning rule's
    /// position in priority order so candidates can be compared across a
    /// whole block.
    pub fn evaluate_ranked(
        &self,
        a: &Record,
        b: &Record,
        scores: &HashMap<String, f64>,
    ) -> Option<(usize, RuleMatch)> {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, rule)| {
                rule.conditions
                    .iter()
                    .all(|condition| condition_satisfied(condition, a, b, scores))
            })
            .map(|(rank, rule)| {
                (
                    rank,
                    RuleMatch {
                        rule_id: rule.id.clone(),
                        match_reason: rule.match_reason.clone(),
                    },
                )
            })
    }
}

fn condition_satisfied(
    condition: &CompiledCondition,
    a: &Record,
    b: &Record,
    scores: &HashMap<String, f64>,
) -> bool {
    let a_blank = a.is_blank(&condition.field);
    let b_blank = b.is_blank(&condition.field);
    let score = scores
        .get(&condition.field)
        .copied()
        .unwrap_or_else(|| field_similarity(condition.kind, a.get(&condition.field), b.get(&condition.field)));

    let threshold_met = match condition.polarity {
        Polarity::Include => score >= condition.threshold,
        Polarity::Exclude => score < condition.threshold,
    };

    match condition.blank_policy {
        BlankPolicy::BlankOnly => a_blank && b_blank,
        BlankPolicy::BlankAllowed => (a_blank && b_blank) || threshold_met,
        BlankPolicy::None => {
            if a_blank || b_blank {
                false
            } else {
                threshold_met
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn include(field: &str, threshold: f64) -> Condition {
        Condition {
            field: field.to_string(),
            threshold,
            polarity: Polarity::Include,
            blank_policy: BlankPolicy::None,
        }
    }

    fn rule(id: &str, priority: u32, reason: &str, conditions: Vec<Condition>) -> Rule {
        Rule {
            id: id.to_string(),
            name: id.to_string(),
            priority,
            enabled: true,
            match_reason: reason.to_string(),
            conditions,
        }
    }

    fn pair() -> (Record, Record) {
        let a = Record::new()
            .with(field::COMPANY_NAME, "Acme Inc")
            .with(field::PHONE_NUMBER, "404-555-1234")
            .with(field::EMAIL_ADDRESS, "info@acme.com");
        let b = Record::new()
            .with(field::COMPANY_NAME, "Acme LLC")
            .with(field::PHONE_NUMBER, "(404) 555-1234")
            .with(field::EMAIL_ADDRESS, "info@acme.com");
        (a, b)
    }

    fn evaluate(rules: &[Rule], a: &Record, b: &Record) -> Option<RuleMatch> {
        let set = RuleSet::compile(rules, &ColumnCatalog::standard()).unwrap();
        let scores = set.pair_scores(a, b);
        set.evaluate(a, b, &scores)
    }

    #[test]
    fn test_unknown_field_is_config_error() {
        let rules = vec![rule("r1", 100, "X", vec![include("NO_SUCH_FIELD", 80.0)])];
        let err = RuleSet::compile(&rules, &ColumnCatalog::standard()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("r1") && message.contains("NO_SUCH_FIELD"), "{}", message);
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let rules = vec![rule("r1", 100, "X", vec![include(field::COMPANY_NAME, 120.0)])];
        assert!(RuleSet::compile(&rules, &ColumnCatalog::standard()).is_err());
    }

    #[test]
    fn test_first_satisfied_rule_wins_by_priority() {
        let (a, b) = pair();
        let rules = vec![
            rule("b_low", 200, "LOW", vec![include(field::EMAIL_ADDRESS, 100.0)]),
            rule("a_high", 100, "HIGH", vec![include(field::EMAIL_ADDRESS, 100.0)]),
        ];
        let matched = evaluate(&rules, &a, &b).unwrap();
        assert_eq!(matched.match_reason, "HIGH");
        assert_eq!(matched.rule_id, "a_high");
    }

    #[test]
    fn test_priority_tie_broken_by_id() {
        let (a, b) = pair();
        let rules = vec![
            rule("zz", 100, "ZZ", vec![include(field::EMAIL_ADDRESS, 100.0)]),
            rule("aa", 100, "AA", vec![include(field::EMAIL_ADDRESS, 100.0)]),
        ];
        assert_eq!(evaluate(&rules, &a, &b).unwrap().match_reason, "AA");
    }

    #[test]
    fn test_disabled_rule_skipped_entirely() {
        let (a, b) = pair();
        let mut high = rule("high", 100, "HIGH", vec![include(field::EMAIL_ADDRESS, 100.0)]);
        high.enabled = false;
        let rules = vec![
            high,
            rule("low", 200, "LOW", vec![include(field::EMAIL_ADDRESS, 100.0)]),
        ];
        assert_eq!(evaluate(&rules, &a, &b).unwrap().match_reason, "LOW");
    }

    #[test]
    fn test_all_conditions_must_hold() {
        let (a, b) = pair();
        let rules = vec![rule(
            "r1",
            100,
            "BOTH",
            vec![
                include(field::EMAIL_ADDRESS, 100.0),
                include(field::ADDRESS_LINE_1, 80.0), // both blank: unsatisfied
            ],
        )];
        assert!(evaluate(&rules, &a, &b).is_none());
    }

    #[test]
    fn test_exclude_polarity() {
        let (a, b) = pair();
        // Phones are identical, so an exclude-at-100 condition fails...
        let rules = vec![rule(
            "r1",
            100,
            "NO_PHONE",
            vec![Condition {
                field: field::PHONE_NUMBER.to_string(),
                threshold: 100.0,
                polarity: Polarity::Exclude,
                blank_policy: BlankPolicy::None,
            }],
        )];
        assert!(evaluate(&rules, &a, &b).is_none());
        // ...but holds against a record with a different phone.
        let c = b.clone().with(field::PHONE_NUMBER, "404-555-9999");
        assert!(evaluate(&rules, &a, &c).is_some());
    }

    #[test]
    fn test_blank_only_policy() {
        let blank_only = Condition {
            field: field::PHONE_NUMBER.to_string(),
            threshold: 0.0,
            polarity: Polarity::Include,
            blank_policy: BlankPolicy::BlankOnly,
        };
        let rules = vec![rule("r1", 100, "NO_PHONES", vec![blank_only])];

        let a = Record::new().with(field::COMPANY_NAME, "Acme");
        let b = Record::new().with(field::COMPANY_NAME, "Acme");
        assert!(evaluate(&rules, &a, &b).is_some());

        // One side populated: unsatisfied regardless of score.
        let c = b.clone().with(field::PHONE_NUMBER, "404-555-1234");
        assert!(evaluate(&rules, &a, &c).is_none());
    }

    #[test]
    fn test_blank_allowed_policy() {
        let blank_allowed = Condition {
            field: field::EMAIL_ADDRESS.to_string(),
            threshold: 100.0,
            polarity: Polarity::Include,
            blank_policy: BlankPolicy::BlankAllowed,
        };
        let rules = vec![rule("r1", 100, "EMAIL_OR_BLANK", vec![blank_allowed])];

        // Both blank: satisfied.
        let a = Record::new();
        let b = Record::new();
        assert!(evaluate(&rules, &a, &b).is_some());

        // Threshold met: satisfied.
        let a2 = Record::new().with(field::EMAIL_ADDRESS, "x@y.com");
        let b2 = Record::new().with(field::EMAIL_ADDRESS, "x@y.com");
        assert!(evaluate(&rules, &a2, &b2).is_some());

        // One blank, threshold unmet: unsatisfied.
        assert!(evaluate(&rules, &a2, &b).is_none());
    }

    #[test]
    fn test_no_rule_satisfied_is_no_match() {
        let (a, b) = pair();
        let rules = vec![rule(
            "r1",
            100,
            "ADDR",
            vec![include(field::ADDRESS_LINE_1, 90.0)],
        )];
        assert!(evaluate(&rules, &a, &b).is_none());
    }

    #[test]
    fn test_pair_scores_reported_for_all_rule_fields() {
        let (a, b) = pair();
        let rules = vec![rule(
            "r1",
            100,
            "X",
            vec![
                include(field::COMPANY_NAME, 80.0),
                include(field::PHONE_NUMBER, 100.0),
            ],
        )];
        let set = RuleSet::compile(&rules, &ColumnCatalog::standard()).unwrap();
        let scores = set.pair_scores(&a, &b);
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[field::PHONE_NUMBER], 100.0);
        assert_eq!(scores[field::COMPANY_NAME], 100.0); // suffixes normalize away
    }
}

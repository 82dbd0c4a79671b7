//! Contact-field quality scoring
//!
//! Scores how trustworthy an email or phone value is, independent of whether
//! it matched anything. Each criterion carries a configured weight; the
//! reported total is the sum of satisfied criteria weights, clamped to 100.
//! Classification signals (personal domains, generic mailboxes, toll-free
//! codes) are injected through the [`Classifier`] trait; the scorer never
//! computes or stores them itself, and a lookup miss is neutral, never an
//! error.

use dedupx_core::normalize::{email_domain, email_local, normalize_email, normalize_phone};
use dedupx_core::field;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Externally supplied classification predicates. Implementations must be
/// total: unknown values return the neutral answer (`false`).
pub trait Classifier: Send + Sync {
    fn is_personal_domain(&self, domain: &str) -> bool;
    fn is_generic_prefix(&self, prefix: &str) -> bool;
    fn is_admin_prefix(&self, prefix: &str) -> bool;
    fn is_department_prefix(&self, prefix: &str) -> bool;
    fn is_toll_free_code(&self, area_code: &str) -> bool;
}

/// Lookup-table classifier. The default tables cover the common public
/// email providers, role mailboxes and US toll-free codes; callers with a
/// richer classification service supply their own [`Classifier`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableClassifier {
    pub personal_domains: Vec<String>,
    pub generic_prefixes: Vec<String>,
    pub admin_prefixes: Vec<String>,
    pub department_prefixes: Vec<String>,
    pub toll_free_codes: Vec<String>,
}

impl Default for TableClassifier {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            personal_domains: owned(&[
                "gmail.com", "yahoo.com", "hotmail.com", "outlook.com", "aol.com",
                "icloud.com", "mail.com", "protonmail.com", "zoho.com", "yandex.com",
                "live.com", "msn.com", "comcast.net", "att.net", "verizon.net",
            ]),
            generic_prefixes: owned(&[
                "info", "contact", "sales", "support", "admin", "help", "service",
                "webmaster", "postmaster", "noreply", "no-reply", "hello", "enquiries",
            ]),
            admin_prefixes: owned(&["admin", "support", "help", "helpdesk", "service"]),
            department_prefixes: owned(&[
                "hr", "finance", "marketing", "legal", "accounting", "billing",
                "operations", "engineering", "it", "tech", "development",
            ]),
            toll_free_codes: owned(&["800", "888", "877", "866", "855", "844", "833"]),
        }
    }
}

impl Classifier for TableClassifier {
    fn is_personal_domain(&self, domain: &str) -> bool {
        self.personal_domains.iter().any(|d| d == domain)
    }

    fn is_generic_prefix(&self, prefix: &str) -> bool {
        self.generic_prefixes.iter().any(|p| p == prefix)
    }

    fn is_admin_prefix(&self, prefix: &str) -> bool {
        self.admin_prefixes.iter().any(|p| p == prefix)
    }

    fn is_department_prefix(&self, prefix: &str) -> bool {
        self.department_prefixes.iter().any(|p| p == prefix)
    }

    fn is_toll_free_code(&self, area_code: &str) -> bool {
        self.toll_free_codes.iter().any(|c| c == area_code)
    }
}

/// Criterion weights for email quality. Weights should sum to <= 100; an
/// overflowing configuration is clamped at scoring time, not rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailWeights {
    pub valid_format: f64,
    pub non_personal: f64,
    pub non_generic: f64,
    pub non_admin: f64,
    pub non_department: f64,
}

impl Default for EmailWeights {
    fn default() -> Self {
        Self {
            valid_format: 20.0,
            non_personal: 20.0,
            non_generic: 20.0,
            non_admin: 20.0,
            non_department: 20.0,
        }
    }
}

/// Criterion weights for phone quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhoneWeights {
    pub has_10_digits: f64,
    pub not_all_same: f64,
    pub valid_area_code: f64,
    pub valid_exchange: f64,
    pub valid_line_number: f64,
    pub not_toll_free: f64,
    pub not_main_line: f64,
    pub has_extension: f64,
    pub has_extension_partial: f64,
    pub high_quality: f64,
}

impl Default for PhoneWeights {
    fn default() -> Self {
        Self {
            has_10_digits: 11.0,
            not_all_same: 11.0,
            valid_area_code: 11.0,
            valid_exchange: 11.0,
            valid_line_number: 11.0,
            not_toll_free: 12.0,
            not_main_line: 11.0,
            has_extension: 11.0,
            has_extension_partial: 5.0,
            high_quality: 11.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    pub email: EmailWeights,
    pub phone: PhoneWeights,
}

/// A 0-100 quality total plus the per-criterion breakdown that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub total: f64,
    pub criteria: BTreeMap<String, f64>,
}

impl QualityScore {
    fn add(&mut self, name: &str, weight: f64) {
        self.criteria.insert(name.to_string(), weight);
        if weight > 0.0 {
            self.total = (self.total + weight).min(100.0);
        }
    }

    fn miss(&mut self, name: &str) {
        self.criteria.insert(name.to_string(), 0.0);
    }
}

/// Quality scorer over injected classification predicates.
pub struct QualityScorer<'a> {
    weights: QualityWeights,
    classifier: &'a dyn Classifier,
}

impl<'a> QualityScorer<'a> {
    pub fn new(weights: QualityWeights, classifier: &'a dyn Classifier) -> Self {
        Self { weights, classifier }
    }

    /// Score an email address. An invalid format zeroes every other
    /// criterion; there is nothing trustworthy to grade in that case.
    pub fn score_email(&self, email: &str) -> QualityScore {
        let w = &self.weights.email;
        let mut score = QualityScore::default();
        for name in [
            "valid_format",
            "non_personal",
            "non_generic",
            "non_admin",
            "non_department",
        ] {
            score.miss(name);
        }

        let email = normalize_email(email);
        if email.is_empty() || !valid_email_format(&email) {
            return score;
        }
        score.add("valid_format", w.valid_format);

        let (Some(local), Some(domain)) = (email_local(&email), email_domain(&email)) else {
            return score;
        };

        if !self.classifier.is_personal_domain(domain) {
            score.add("non_personal", w.non_personal);
        }
        if !self.classifier.is_generic_prefix(local) {
            score.add("non_generic", w.non_generic);
        }
        if !self.classifier.is_admin_prefix(local) {
            score.add("non_admin", w.non_admin);
        }
        if !self.classifier.is_department_prefix(local) {
            score.add("non_department", w.non_department);
        }
        score
    }

    /// Score a phone number (with optional extension). A number that does
    /// not reduce to ten digits zeroes every other criterion.
    pub fn score_phone(&self, phone: &str, extension: &str) -> QualityScore {
        let w = &self.weights.phone;
        let mut score = QualityScore::default();
        for name in [
            "has_10_digits",
            "not_all_same",
            "valid_area_code",
            "valid_exchange",
            "valid_line_number",
            "not_toll_free",
            "not_main_line",
            "has_extension",
            "high_quality",
        ] {
            score.miss(name);
        }

        let digits = normalize_phone(phone);
        if digits.len() != 10 {
            return score;
        }
        score.add("has_10_digits", w.has_10_digits);

        let bytes = digits.as_bytes();
        if bytes.iter().any(|&b| b != bytes[0]) {
            score.add("not_all_same", w.not_all_same);
        }

        let area_code = &digits[..3];
        let line_number = &digits[6..];

        if !matches!(bytes[0], b'0' | b'1') {
            score.add("valid_area_code", w.valid_area_code);
        }
        if !matches!(bytes[3], b'0' | b'1') {
            score.add("valid_exchange", w.valid_exchange);
        }
        if line_number != "0000" {
            score.add("valid_line_number", w.valid_line_number);
        }
        if !self.classifier.is_toll_free_code(area_code) {
            score.add("not_toll_free", w.not_toll_free);
        }

        let is_main_line = line_number.ends_with("000");
        if !is_main_line {
            score.add("not_main_line", w.not_main_line);
        }

        if !extension.trim().is_empty() {
            score.add("has_extension", w.has_extension);
        } else if !is_main_line {
            // Partial credit: a direct line without an extension is still
            // reachable.
            score.add("has_extension", w.has_extension_partial);
        }

        let sequential =
            digits.contains("0123456789") || digits.contains("9876543210");
        let repeating = (0..=6).any(|i| {
            let block = &bytes[i..i + 4];
            block.iter().all(|&b| b == block[0])
        });
        if !sequential && !repeating {
            score.add("high_quality", w.high_quality);
        }

        score
    }
}

/// Structural email check: one `@`, a plausible local part, a dotted domain
/// with an alphabetic TLD of at least two characters.
fn valid_email_format(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains('@') {
        return false;
    }
    if !local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '%' | '+' | '-'))
    {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    if !labels.iter().all(|label| {
        !label.is_empty()
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
    }) {
        return false;
    }
    let tld = labels[labels.len() - 1];
    tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}

/// Blended confidence per contact facet for an evaluated pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScores {
    pub company: f64,
    pub address: f64,
    pub email: f64,
    pub phone: f64,
}

/// Weighted blend of the address-related field scores.
pub fn address_confidence(scores: &HashMap<String, f64>) -> f64 {
    const WEIGHTS: &[(&str, f64)] = &[
        (field::ADDRESS_LINE_1, 0.4),
        (field::ADDRESS_LINE_2, 0.1),
        (field::CITY, 0.2),
        (field::STATE, 0.15),
        (field::ZIP_CODE, 0.15),
    ];
    let total: f64 = WEIGHTS
        .iter()
        .map(|(name, weight)| scores.get(*name).copied().unwrap_or(0.0) * weight)
        .sum();
    round2(total)
}

/// Overall match confidence: weighted over the facets that actually carry a
/// score, renormalized against the full weight table so missing facets still
/// discount the result.
pub fn overall_confidence(scores: &HashMap<String, f64>) -> f64 {
    const WEIGHTS: &[(&str, f64)] = &[
        (field::COMPANY_NAME, 0.35),
        (field::ADDRESS_LINE_1, 0.25),
        (field::EMAIL_ADDRESS, 0.20),
        (field::PHONE_NUMBER, 0.20),
    ];
    let full_weight: f64 = WEIGHTS.iter().map(|(_, w)| w).sum();
    let mut total = 0.0;
    let mut present_weight = 0.0;
    for (name, weight) in WEIGHTS {
        if let Some(&score) = scores.get(*name) {
            if score > 0.0 {
                total += score * weight;
                present_weight += weight;
            }
        }
    }
    if present_weight > 0.0 {
        round2(total / full_weight)
    } else {
        0.0
    }
}

/// Per-facet confidence for an evaluated pair, from its field scores.
pub fn confidence_scores(scores: &HashMap<String, f64>) -> ConfidenceScores {
    ConfidenceScores {
        company: round2(scores.get(field::COMPANY_NAME).copied().unwrap_or(0.0)),
        address: address_confidence(scores),
        email: round2(scores.get(field::EMAIL_ADDRESS).copied().unwrap_or(0.0)),
        phone: round2(scores.get(field::PHONE_NUMBER).copied().unwrap_or(0.0)),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer(weights: QualityWeights, classifier: &TableClassifier) -> QualityScorer<'_> {
        QualityScorer::new(weights, classifier)
    }

    #[test]
    fn test_business_email_scores_full() {
        let classifier = TableClassifier::default();
        let s = scorer(QualityWeights::default(), &classifier);
        let q = s.score_email("jane.doe@acme.com");
        assert_eq!(q.total, 100.0);
        assert_eq!(q.criteria["valid_format"], 20.0);
        assert_eq!(q.criteria["non_personal"], 20.0);
    }

    #[test]
    fn test_personal_generic_email_penalized() {
        let classifier = TableClassifier::default();
        let s = scorer(QualityWeights::default(), &classifier);
        let q = s.score_email("info@gmail.com");
        // Loses non_personal, non_generic; "info" is not an admin or
        // department prefix in the default tables.
        assert_eq!(q.criteria["non_personal"], 0.0);
        assert_eq!(q.criteria["non_generic"], 0.0);
        assert_eq!(q.total, 60.0);
    }

    #[test]
    fn test_invalid_email_zeroes_everything() {
        let classifier = TableClassifier::default();
        let s = scorer(QualityWeights::default(), &classifier);
        for bad in ["", "not-an-email", "a@b", "a b@c.com", "x@.com", "x@y.c"] {
            let q = s.score_email(bad);
            assert_eq!(q.total, 0.0, "expected zero for {:?}", bad);
            assert_eq!(q.criteria["valid_format"], 0.0);
        }
    }

    #[test]
    fn test_direct_phone_scores_full() {
        let classifier = TableClassifier::default();
        let s = scorer(QualityWeights::default(), &classifier);
        let q = s.score_phone("(404) 555-1234", "88");
        assert_eq!(q.total, 100.0);
    }

    #[test]
    fn test_short_phone_zeroes_everything() {
        let classifier = TableClassifier::default();
        let s = scorer(QualityWeights::default(), &classifier);
        let q = s.score_phone("555-1234", "");
        assert_eq!(q.total, 0.0);
        assert_eq!(q.criteria["has_10_digits"], 0.0);
    }

    #[test]
    fn test_toll_free_and_main_line_penalized() {
        let classifier = TableClassifier::default();
        let s = scorer(QualityWeights::default(), &classifier);
        let q = s.score_phone("800-555-2000", "");
        assert_eq!(q.criteria["not_toll_free"], 0.0);
        assert_eq!(q.criteria["not_main_line"], 0.0);
        assert_eq!(q.criteria["has_extension"], 0.0);
        assert!(q.total < 100.0);
    }

    #[test]
    fn test_weight_overflow_clamps_at_100() {
        let classifier = TableClassifier::default();
        let weights = QualityWeights {
            email: EmailWeights {
                valid_format: 50.0,
                non_personal: 50.0,
                non_generic: 50.0,
                non_admin: 50.0,
                non_department: 50.0,
            },
            ..Default::default()
        };
        let s = scorer(weights, &classifier);
        let q = s.score_email("jane.doe@acme.com");
        assert_eq!(q.total, 100.0);
    }

    #[test]
    fn test_classifier_miss_is_neutral() {
        let classifier = TableClassifier {
            personal_domains: vec![],
            generic_prefixes: vec![],
            admin_prefixes: vec![],
            department_prefixes: vec![],
            toll_free_codes: vec![],
        };
        let s = scorer(QualityWeights::default(), &classifier);
        // With empty tables every domain counts as business.
        assert_eq!(s.score_email("info@gmail.com").total, 100.0);
    }

    #[test]
    fn test_address_confidence_blend() {
        let mut scores = HashMap::new();
        scores.insert(field::ADDRESS_LINE_1.to_string(), 100.0);
        scores.insert(field::CITY.to_string(), 100.0);
        scores.insert(field::STATE.to_string(), 100.0);
        scores.insert(field::ZIP_CODE.to_string(), 100.0);
        // ADDRESS_LINE_2 missing: its 0.1 weight contributes nothing.
        assert_eq!(address_confidence(&scores), 90.0);
    }

    #[test]
    fn test_overall_confidence_renormalizes() {
        let mut scores = HashMap::new();
        scores.insert(field::COMPANY_NAME.to_string(), 100.0);
        scores.insert(field::ADDRESS_LINE_1.to_string(), 100.0);
        scores.insert(field::EMAIL_ADDRESS.to_string(), 100.0);
        scores.insert(field::PHONE_NUMBER.to_string(), 100.0);
        assert_eq!(overall_confidence(&scores), 100.0);

        // Only company present: 100 * 0.35 / 1.0 of the full table.
        let mut partial = HashMap::new();
        partial.insert(field::COMPANY_NAME.to_string(), 100.0);
        assert_eq!(overall_confidence(&partial), 35.0);

        assert_eq!(overall_confidence(&HashMap::new()), 0.0);
    }

    #[test]
    fn test_confidence_scores_facets() {
        let mut scores = HashMap::new();
        scores.insert(field::COMPANY_NAME.to_string(), 100.0);
        scores.insert(field::PHONE_NUMBER.to_string(), 100.0);
        let confidence = confidence_scores(&scores);
        assert_eq!(confidence.company, 100.0);
        assert_eq!(confidence.phone, 100.0);
        assert_eq!(confidence.email, 0.0);
        assert_eq!(confidence.address, 0.0);
    }
}

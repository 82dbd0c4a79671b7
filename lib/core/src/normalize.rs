//! Field normalization
//!
//! Turns raw field values into comparison-ready strings. Every function here
//! is pure and total: unparsable input degrades to an empty or partial
//! canonical form, it never errors. Scoring and blocking both run on these
//! canonical forms, so the same normalization has to be used everywhere a
//! value is compared or fingerprinted.

use crate::record::{field, Record};
use serde::{Deserialize, Serialize};

/// Comparison semantics of a column.
///
/// Resolved once at configuration-load time (see the rule compiler); never
/// guessed per evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Company / organization name: suffix-stripped fuzzy text.
    Company,
    /// Street address line: abbreviation-folded fuzzy text.
    Address,
    /// Phone number: digit-only, exact comparison.
    Phone,
    /// Email address: lowercased, exact comparison.
    Email,
    /// Categorical value (zip, state, country): exact comparison.
    Exact,
    /// Any other free text: generic fuzzy text.
    Text,
}

/// Normalize a raw value according to the field's kind.
pub fn normalize(kind: FieldKind, raw: &str) -> String {
    match kind {
        FieldKind::Company => normalize_company(raw),
        FieldKind::Address => normalize_address(raw),
        FieldKind::Phone => normalize_phone(raw),
        FieldKind::Email => normalize_email(raw),
        FieldKind::Exact => normalize_text(raw),
        FieldKind::Text => normalize_text(raw),
    }
}

/// Lowercase, punctuation to spaces, whitespace collapsed.
pub fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_space = true;
    for c in raw.trim().chars() {
        let c = if c.is_alphanumeric() {
            c.to_lowercase().next().unwrap_or(c)
        } else {
            ' '
        };
        if c == ' ' {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(c);
            last_space = false;
        }
    }
    out.trim_end().to_string()
}

const COMPANY_SUFFIXES: &[&str] = &[
    "inc",
    "incorporated",
    "corp",
    "corporation",
    "llc",
    "ltd",
    "limited",
    "co",
    "company",
    "plc",
    "lp",
    "llp",
    "pllc",
    "pc",
    "pa",
    "na",
    "the",
    "a",
    "an",
];

/// Company names: generic text normalization plus removal of legal-suffix
/// tokens and leading articles. The raw value is left untouched on the
/// record; only the `_STD` derivation drops the suffixes.
pub fn normalize_company(raw: &str) -> String {
    let base = normalize_text(raw);
    let kept: Vec<&str> = base
        .split_whitespace()
        .filter(|token| !COMPANY_SUFFIXES.contains(token))
        .collect();
    kept.join(" ")
}

const ADDRESS_ABBREVIATIONS: &[(&str, &str)] = &[
    ("street", "st"),
    ("avenue", "ave"),
    ("road", "rd"),
    ("boulevard", "blvd"),
    ("drive", "dr"),
    ("lane", "ln"),
    ("court", "ct"),
    ("place", "pl"),
    ("suite", "ste"),
    ("apartment", "apt"),
    ("building", "bldg"),
    ("floor", "fl"),
    ("north", "n"),
    ("south", "s"),
    ("east", "e"),
    ("west", "w"),
];

/// Addresses: generic text normalization plus USPS-style abbreviation
/// folding, so "123 North Main Street" and "123 N Main St" compare equal.
pub fn normalize_address(raw: &str) -> String {
    let base = normalize_text(raw);
    let folded: Vec<&str> = base
        .split_whitespace()
        .map(|token| {
            ADDRESS_ABBREVIATIONS
                .iter()
                .find(|(long, _)| *long == token)
                .map(|(_, short)| *short)
                .unwrap_or(token)
        })
        .collect();
    folded.join(" ")
}

/// Phones: digits only; a leading `1` on an 11-digit number is dropped so
/// US numbers compare in 10-digit form.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 11 && digits.starts_with('1') {
        digits[1..].to_string()
    } else {
        digits
    }
}

/// Emails: lowercased and trimmed. Structure validation belongs to quality
/// scoring, not normalization.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// The domain part of a normalized email, if there is one.
pub fn email_domain(normalized: &str) -> Option<&str> {
    let (_, domain) = normalized.rsplit_once('@')?;
    if domain.is_empty() {
        None
    } else {
        Some(domain)
    }
}

/// The mailbox (local part) of a normalized email, if there is one.
pub fn email_local(normalized: &str) -> Option<&str> {
    let (local, _) = normalized.rsplit_once('@')?;
    if local.is_empty() {
        None
    } else {
        Some(local)
    }
}

/// Clone a record and add the standardized `*_STD` fields next to the raw
/// ones. Raw values are never overwritten.
pub fn standardize(record: &Record) -> Record {
    let mut out = record.clone();
    out.set(
        field::COMPANY_NAME_STD,
        normalize_company(record.get(field::COMPANY_NAME)),
    );
    out.set(
        field::ADDRESS1_STD,
        normalize_address(record.get(field::ADDRESS_LINE_1)),
    );
    out.set(
        field::ADDRESS2_STD,
        normalize_address(record.get(field::ADDRESS_LINE_2)),
    );
    out.set(
        field::PHONE_STD,
        normalize_phone(record.get(field::PHONE_NUMBER)),
    );
    out.set(
        field::EMAIL_STD,
        normalize_email(record.get(field::EMAIL_ADDRESS)),
    );
    out
}

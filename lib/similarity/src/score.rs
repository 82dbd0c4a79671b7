//! Per-field similarity scoring
//!
//! All scores are in `[0.0, 100.0]` and symmetric: `score(a, b) == score(b, a)`.
//! Inputs are normalized internally with the same canonicalization the rest
//! of the engine uses, so callers pass raw field values. An empty side always
//! scores 0; blank-policy handling lives in the rule engine, never here.

use dedupx_core::normalize::normalize;
use dedupx_core::FieldKind;
use std::collections::BTreeSet;

/// Weight of the edit-distance component in the free-text blend.
const EDIT_WEIGHT: f64 = 0.6;
/// Weight of the token-set overlap component in the free-text blend.
const TOKEN_WEIGHT: f64 = 0.4;
/// Added when Soundex codes agree on company names; capped at 100, never a
/// substitute for the textual score.
const PHONETIC_BONUS: f64 = 5.0;

/// Similarity between two raw values of a field, selected by field kind.
pub fn field_similarity(kind: FieldKind, a: &str, b: &str) -> f64 {
    let na = normalize(kind, a);
    let nb = normalize(kind, b);
    if na.is_empty() || nb.is_empty() {
        return 0.0;
    }
    match kind {
        FieldKind::Company => {
            let base = text_blend(&na, &nb);
            if base < 100.0 && phonetic_match(&na, &nb) {
                (base + PHONETIC_BONUS).min(100.0)
            } else {
                base
            }
        }
        FieldKind::Address | FieldKind::Text => text_blend(&na, &nb),
        FieldKind::Phone | FieldKind::Email | FieldKind::Exact => exact_score(&na, &nb),
    }
}

/// 100 iff the normalized values are equal (both known non-empty here).
fn exact_score(a: &str, b: &str) -> f64 {
    if a == b {
        100.0
    } else {
        0.0
    }
}

/// Free-text score: blend of token-sorted normalized edit distance and
/// token-set Jaccard overlap, scaled to 0-100. Equal normalized inputs
/// short-circuit to 100.
fn text_blend(a: &str, b: &str) -> f64 {
    if a == b {
        return 100.0;
    }
    let edit = token_sort_ratio(a, b);
    let overlap = jaccard_tokens(a, b);
    (EDIT_WEIGHT * edit + TOKEN_WEIGHT * overlap).clamp(0.0, 100.0)
}

/// Normalized Levenshtein over token-sorted strings, 0-100. Token sorting
/// makes "main acme street" vs "acme main street" compare as reordered
/// rather than as distant edits.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    let sa = sort_tokens(a);
    let sb = sort_tokens(b);
    if sa.is_empty() || sb.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(&sa, &sb) * 100.0
}

fn sort_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Jaccard index over whitespace token sets, 0-100.
pub fn jaccard_tokens(a: &str, b: &str) -> f64 {
    let set_a: BTreeSet<&str> = a.split_whitespace().collect();
    let set_b: BTreeSet<&str> = b.split_whitespace().collect();
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f64 / union as f64 * 100.0
}

/// True when the leading tokens of two normalized company names share a
/// Soundex code.
fn phonetic_match(a: &str, b: &str) -> bool {
    let ta = a.split_whitespace().next().unwrap_or("");
    let tb = b.split_whitespace().next().unwrap_or("");
    match (soundex(ta), soundex(tb)) {
        (Some(ca), Some(cb)) => ca == cb,
        _ => false,
    }
}

/// Classic four-character Soundex code; `None` when the input has no ASCII
/// letters to encode.
pub fn soundex(s: &str) -> Option<String> {
    let mut letters = s
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase());
    let first = letters.next()?;
    let mut code = String::with_capacity(4);
    code.push(first);
    let mut prev = soundex_digit(first);
    for c in letters {
        if code.len() == 4 {
            break;
        }
        let d = soundex_digit(c);
        match d {
            0 => prev = 0,  // vowels separate duplicate codes
            7 => {}         // h and w are transparent
            d if d != prev => {
                code.push((b'0' + d) as char);
                prev = d;
            }
            _ => {}
        }
    }
    while code.len() < 4 {
        code.push('0');
    }
    Some(code)
}

fn soundex_digit(c: char) -> u8 {
    match c {
        'B' | 'F' | 'P' | 'V' => 1,
        'C' | 'G' | 'J' | 'K' | 'Q' | 'S' | 'X' | 'Z' => 2,
        'D' | 'T' => 3,
        'L' => 4,
        'M' | 'N' => 5,
        'R' => 6,
        'H' | 'W' => 7,
        _ => 0,
    }
}

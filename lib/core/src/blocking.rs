//! Candidate blocking
//!
//! Partitions a record set into coarse groups so pairwise comparison stays
//! sub-quadratic. Only records sharing at least one blocking key are ever
//! compared; two records that could plausibly match must share a key, which
//! is why multiple recipes run side by side and their candidate sets are
//! unioned.

use crate::normalize::{normalize_company, normalize_phone};
use crate::record::{field, Record, RecordId};
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

/// A deterministic recipe deriving a coarse key from one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockingRecipe {
    /// First three characters of the normalized company name plus the first
    /// five characters of the zip code.
    CompanyZip,
    /// Last four digits of the normalized phone number.
    PhoneSuffix,
}

impl BlockingRecipe {
    /// Key for a record, or `None` when the record lacks the material the
    /// recipe needs. Keyless records land in no block for this recipe.
    pub fn key(&self, record: &Record) -> Option<String> {
        match self {
            BlockingRecipe::CompanyZip => {
                let company = normalize_company(record.get(field::COMPANY_NAME));
                if company.is_empty() {
                    return None;
                }
                let prefix: String = company.chars().take(3).collect();
                let zip: String = record
                    .get(field::ZIP_CODE)
                    .trim()
                    .chars()
                    .take(5)
                    .collect();
                Some(format!("cz:{}_{}", prefix, zip.to_lowercase()))
            }
            BlockingRecipe::PhoneSuffix => {
                let phone = normalize_phone(record.get(field::PHONE_NUMBER));
                if phone.len() < 4 {
                    return None;
                }
                Some(format!("ps:{}", &phone[phone.len() - 4..]))
            }
        }
    }
}

/// Default recipe set: company-prefix+zip unioned with phone-suffix.
pub fn default_recipes() -> Vec<BlockingRecipe> {
    vec![BlockingRecipe::CompanyZip, BlockingRecipe::PhoneSuffix]
}

/// Index of blocking keys to record ids.
///
/// Supports incremental extension: inserting a record only computes that
/// record's own keys, the rest of the index is untouched.
#[derive(Debug, Clone)]
pub struct BlockingIndex {
    recipes: Vec<BlockingRecipe>,
    blocks: AHashMap<String, Vec<RecordId>>,
}

impl BlockingIndex {
    pub fn new(recipes: Vec<BlockingRecipe>) -> Self {
        Self {
            recipes,
            blocks: AHashMap::new(),
        }
    }

    /// Build an index over a whole batch, keyed by batch position.
    pub fn build(recipes: Vec<BlockingRecipe>, records: &[Record]) -> Self {
        let mut index = Self::new(recipes);
        for (id, record) in records.iter().enumerate() {
            index.insert(id, record);
        }
        index
    }

    pub fn insert(&mut self, id: RecordId, record: &Record) {
        for recipe in &self.recipes {
            if let Some(key) = recipe.key(record) {
                self.blocks.entry(key).or_default().push(id);
            }
        }
    }

    /// Record ids sharing at least one blocking key with `record`, excluding
    /// `self_id`, deduplicated and in ascending id order. A pair sharing two
    /// keys shows up once.
    pub fn candidates(&self, self_id: RecordId, record: &Record) -> Vec<RecordId> {
        let mut seen = AHashSet::new();
        for recipe in &self.recipes {
            if let Some(key) = recipe.key(record) {
                if let Some(members) = self.blocks.get(&key) {
                    for &member in members {
                        if member != self_id {
                            seen.insert(member);
                        }
                    }
                }
            }
        }
        let mut out: Vec<RecordId> = seen.into_iter().collect();
        out.sort_unstable();
        out
    }

    /// Number of distinct blocks currently indexed.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

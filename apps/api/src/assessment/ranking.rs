//! Corpus Ranker — orders the question corpus by relevance to a role.
//!
//! score = 3·[department matches] + 2·[seniority matches]
//!       + 1·[category is behavioral or culture_safe] + 1·[rubric present]
//!
//! The sort is stable, so equal scores keep corpus-store order. No LLM calls.

use serde::Serialize;

use crate::models::corpus::{CorpusCategory, CorpusItem};

const DEPARTMENT_WEIGHT: u8 = 3;
const SENIORITY_WEIGHT: u8 = 2;
const PORTABLE_CATEGORY_WEIGHT: u8 = 1;
const RUBRIC_WEIGHT: u8 = 1;

/// A corpus item with its relevance score for the current role.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedItem {
    pub item: CorpusItem,
    pub relevance: u8,
}

/// Case-insensitive, whitespace-trimmed equality. An empty target never matches.
fn attribute_matches(value: &str, target: &str) -> bool {
    let target = target.trim();
    !target.is_empty() && value.trim().eq_ignore_ascii_case(target)
}

pub fn relevance_score(item: &CorpusItem, department: &str, seniority: &str) -> u8 {
    let mut score = 0;
    if attribute_matches(&item.department, department) {
        score += DEPARTMENT_WEIGHT;
    }
    if attribute_matches(&item.seniority, seniority) {
        score += SENIORITY_WEIGHT;
    }
    if matches!(
        item.category,
        CorpusCategory::Behavioral | CorpusCategory::CultureSafe
    ) {
        score += PORTABLE_CATEGORY_WEIGHT;
    }
    if item.rubric.is_some() {
        score += RUBRIC_WEIGHT;
    }
    score
}

/// Ranks the whole corpus, highest relevance first.
pub fn rank_corpus(corpus: Vec<CorpusItem>, department: &str, seniority: &str) -> Vec<RankedItem> {
    let mut ranked: Vec<RankedItem> = corpus
        .into_iter()
        .map(|item| {
            let relevance = relevance_score(&item, department, seniority);
            RankedItem { item, relevance }
        })
        .collect();

    // Vec::sort_by is stable: ties retain store order
    ranked.sort_by(|a, b| b.relevance.cmp(&a.relevance));
    ranked
}

/// The bounded head of the ranking that is shown to the model.
pub fn prompt_slice(ranked: &[RankedItem], limit: usize) -> &[RankedItem] {
    &ranked[..ranked.len().min(limit)]
}

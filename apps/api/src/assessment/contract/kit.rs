use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

use super::{
    clamped_field, string_field, string_list, ContractOutcome, Repair, Validated, FALLBACK_MESSAGE,
};
use crate::assessment::extract::{parse_model_json, ParseOutcome};
use crate::assessment::ranking::RankedItem;
use crate::models::corpus::{CorpusCategory, CorpusItem};
use crate::models::decision::{
    Band, BackfillReport, CategoryShortfall, KitItem, KitItemSource, KitReasoning,
};

pub const KIT_MIN_ITEMS: usize = 8;
pub const KIT_MIN_PER_CATEGORY: usize = 2;

/// Item weight >= 7 → high priority, >= 4 → medium, otherwise low.
pub const ITEM_HIGH_THRESHOLD: f64 = 7.0;
pub const ITEM_MEDIUM_THRESHOLD: f64 = 4.0;

/// Kit coverage_score >= 70 → high priority, >= 40 → medium, otherwise low.
pub const COVERAGE_HIGH_THRESHOLD: f64 = 70.0;
pub const COVERAGE_MEDIUM_THRESHOLD: f64 = 40.0;

pub const BACKFILL_WEIGHT: f64 = 3.0;

const WEIGHT_MAX: f64 = 10.0;
const COVERAGE_MAX: f64 = 100.0;

/// Validated interview kit, before ids and revision are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct KitDraft {
    pub coverage_score: f64,
    pub priority: Band,
    pub items: Vec<KitItem>,
    pub reasoning: KitReasoning,
}

pub fn item_priority_for_weight(weight: f64) -> Band {
    if weight >= ITEM_HIGH_THRESHOLD {
        Band::High
    } else if weight >= ITEM_MEDIUM_THRESHOLD {
        Band::Medium
    } else {
        Band::Low
    }
}

pub fn kit_priority_for_coverage(coverage: f64) -> Band {
    if coverage >= COVERAGE_HIGH_THRESHOLD {
        Band::High
    } else if coverage >= COVERAGE_MEDIUM_THRESHOLD {
        Band::Medium
    } else {
        Band::Low
    }
}

fn kit_item(
    item: &CorpusItem,
    weight: f64,
    priority: Band,
    rationale: String,
    source: KitItemSource,
) -> KitItem {
    KitItem {
        item_id: item.id,
        category: item.category,
        question: item.question.clone(),
        rubric: item.rubric.clone(),
        weight,
        priority,
        rationale,
        source,
    }
}

fn backfill_item(item: &CorpusItem, reason_category: CorpusCategory) -> KitItem {
    kit_item(
        item,
        BACKFILL_WEIGHT,
        Band::Low,
        format!("Added to meet minimum coverage for {reason_category}"),
        KitItemSource::Backfill,
    )
}

/// Resolves the model's selection against the corpus. Unknown ids and duplicates are dropped;
/// category, question and rubric always come from the corpus.
fn selected_items(
    map: &Map<String, Value>,
    by_id: &HashMap<Uuid, &CorpusItem>,
    repairs: &mut Vec<Repair>,
) -> Vec<KitItem> {
    let Some(raw_items) = map.get("selected_items").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for (index, raw) in raw_items.iter().enumerate() {
        let mut reject = |reference: String, reason: &str| {
            repairs.push(Repair::DroppedItem {
                reference,
                reason: reason.to_string(),
            });
        };

        let Some(entry) = raw.as_object() else {
            reject(format!("selected_items[{index}]"), "not an object");
            continue;
        };
        let Some(id_text) = string_field(entry, "item_id") else {
            reject(format!("selected_items[{index}]"), "missing item_id");
            continue;
        };
        let Ok(item_id) = Uuid::parse_str(&id_text) else {
            reject(id_text, "item_id is not a valid id");
            continue;
        };
        let Some(corpus_item) = by_id.get(&item_id) else {
            reject(id_text, "item_id not in corpus");
            continue;
        };
        if !seen.insert(item_id) {
            reject(id_text, "duplicate item_id");
            continue;
        }

        let field = format!("selected_items[{index}].weight");
        let weight = clamped_field(entry, "weight", &field, 0.0, WEIGHT_MAX, repairs);
        let priority = match entry.get("priority").and_then(Value::as_str).and_then(Band::parse) {
            Some(priority) => priority,
            None => {
                let derived = item_priority_for_weight(weight);
                repairs.push(Repair::Derived {
                    field: format!("selected_items[{index}].priority"),
                    value: derived.as_str().to_string(),
                });
                derived
            }
        };
        let rationale = string_field(entry, "rationale").unwrap_or_default();

        items.push(kit_item(corpus_item, weight, priority, rationale, KitItemSource::Model));
    }

    items
}

/// Tops the kit up from the ranked corpus until the minimums hold or the corpus runs out.
///
/// Category shortfalls are filled first in `CorpusCategory::REQUIRED` order, then the total
/// shortfall in rank order. Anything the corpus cannot supply is reported, not hidden.
pub fn backfill_kit(
    items: &mut Vec<KitItem>,
    ranked: &[RankedItem],
    repairs: &mut Vec<Repair>,
) -> BackfillReport {
    let mut selected: HashSet<Uuid> = items.iter().map(|i| i.item_id).collect();
    let mut report = BackfillReport::default();

    for category in CorpusCategory::REQUIRED {
        let mut count = items.iter().filter(|i| i.category == category).count();
        while count < KIT_MIN_PER_CATEGORY {
            let next = ranked
                .iter()
                .map(|r| &r.item)
                .find(|item| item.category == category && !selected.contains(&item.id));
            let Some(item) = next else {
                report.unmet.push(CategoryShortfall {
                    category,
                    required: KIT_MIN_PER_CATEGORY,
                    selected: count,
                });
                break;
            };
            selected.insert(item.id);
            items.push(backfill_item(item, category));
            repairs.push(Repair::Backfilled {
                item_id: item.id,
                category,
            });
            report.added += 1;
            count += 1;
        }
    }

    while items.len() < KIT_MIN_ITEMS {
        let next = ranked
            .iter()
            .map(|r| &r.item)
            .find(|item| !selected.contains(&item.id));
        let Some(item) = next else {
            report.total_shortfall = Some(KIT_MIN_ITEMS - items.len());
            break;
        };
        selected.insert(item.id);
        items.push(backfill_item(item, item.category));
        repairs.push(Repair::Backfilled {
            item_id: item.id,
            category: item.category,
        });
        report.added += 1;
    }

    if report.corpus_exhausted() {
        warn!(
            unmet_categories = report.unmet.len(),
            total_shortfall = ?report.total_shortfall,
            "Corpus exhausted before kit minimums were met"
        );
    }

    report
}

fn fallback(reason: String, ranked: &[RankedItem]) -> ContractOutcome<KitDraft> {
    warn!(reason = %reason, "Malformed interview-kit output, building kit from backfill");
    let mut repairs = Vec::new();
    let mut items = Vec::new();
    let backfill = backfill_kit(&mut items, ranked, &mut repairs);

    let draft = KitDraft {
        coverage_score: 0.0,
        priority: Band::Low,
        items,
        reasoning: KitReasoning {
            summary: FALLBACK_MESSAGE.to_string(),
            focus_areas: Vec::new(),
            backfill,
            fallback_reason: Some(reason.clone()),
        },
    };
    ContractOutcome::Fallback {
        validated: Validated { draft, repairs },
        reason,
    }
}

/// Validates and repairs raw interview-kit output against the full ranked corpus.
pub fn validate_kit(raw: &str, ranked: &[RankedItem]) -> ContractOutcome<KitDraft> {
    let map = match parse_model_json(raw) {
        ParseOutcome::Parsed(map) => map,
        ParseOutcome::Fallback(malformed) => return fallback(malformed.reason, ranked),
    };

    let by_id: HashMap<Uuid, &CorpusItem> = ranked.iter().map(|r| (r.item.id, &r.item)).collect();
    let mut repairs = Vec::new();

    let mut items = selected_items(&map, &by_id, &mut repairs);
    let backfill = backfill_kit(&mut items, ranked, &mut repairs);

    let coverage_score = clamped_field(
        &map,
        "coverage_score",
        "coverage_score",
        0.0,
        COVERAGE_MAX,
        &mut repairs,
    );
    let priority = match map.get("priority").and_then(Value::as_str).and_then(Band::parse) {
        Some(priority) => priority,
        None => {
            let derived = kit_priority_for_coverage(coverage_score);
            repairs.push(Repair::Derived {
                field: "priority".to_string(),
                value: derived.as_str().to_string(),
            });
            derived
        }
    };

    let reasoning = KitReasoning {
        summary: string_field(&map, "summary").unwrap_or_default(),
        focus_areas: string_list(&map, "focus_areas"),
        backfill,
        fallback_reason: None,
    };

    ContractOutcome::Conforming(Validated {
        draft: KitDraft {
            coverage_score,
            priority,
            items,
            reasoning,
        },
        repairs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::ranking::rank_corpus;
    use serde_json::json;

    fn corpus_item(category: CorpusCategory, n: usize) -> CorpusItem {
        CorpusItem {
            id: Uuid::new_v4(),
            department: "Engineering".to_string(),
            category,
            seniority: "mid".to_string(),
            difficulty: "medium".to_string(),
            is_safe: true,
            question: format!("{category} question {n}"),
            rubric: None,
        }
    }

    /// Three items per required category.
    fn full_corpus() -> Vec<RankedItem> {
        let corpus = CorpusCategory::REQUIRED
            .iter()
            .flat_map(|c| (0..3).map(move |n| corpus_item(*c, n)))
            .collect();
        rank_corpus(corpus, "Engineering", "mid")
    }

    fn ids_of(ranked: &[RankedItem], category: CorpusCategory) -> Vec<Uuid> {
        ranked
            .iter()
            .filter(|r| r.item.category == category)
            .map(|r| r.item.id)
            .collect()
    }

    fn selection(ids: &[Uuid]) -> String {
        let items: Vec<Value> = ids
            .iter()
            .map(|id| json!({"item_id": id, "weight": 8, "priority": "high", "rationale": "checks depth"}))
            .collect();
        json!({"selected_items": items, "coverage_score": 85, "summary": "kit"}).to_string()
    }

    #[test]
    fn test_short_selection_is_backfilled_without_duplicates() {
        let ranked = full_corpus();
        let behavioral = ids_of(&ranked, CorpusCategory::Behavioral);
        let role = ids_of(&ranked, CorpusCategory::RoleSpecific);
        let execution = ids_of(&ranked, CorpusCategory::Execution);
        let chosen = vec![behavioral[0], behavioral[1], role[0], role[1], execution[0]];

        let outcome = validate_kit(&selection(&chosen), &ranked);
        assert!(!outcome.is_fallback());
        let draft = outcome.draft();

        assert!(draft.items.len() >= KIT_MIN_ITEMS);
        let unique: HashSet<Uuid> = draft.items.iter().map(|i| i.item_id).collect();
        assert_eq!(unique.len(), draft.items.len());
        for id in &chosen {
            assert!(unique.contains(id));
        }
        for category in CorpusCategory::REQUIRED {
            let count = draft.items.iter().filter(|i| i.category == category).count();
            assert!(count >= KIT_MIN_PER_CATEGORY, "{category} has {count}");
        }
        assert!(!draft.reasoning.backfill.corpus_exhausted());
        assert_eq!(draft.reasoning.backfill.added, 3);
    }

    #[test]
    fn test_backfilled_items_are_low_priority_with_generic_rationale() {
        let ranked = full_corpus();
        let draft = validate_kit(&selection(&[]), &ranked).draft().clone();
        let filled: Vec<_> = draft
            .items
            .iter()
            .filter(|i| i.source == KitItemSource::Backfill)
            .collect();
        assert_eq!(filled.len(), KIT_MIN_ITEMS);
        assert!(filled.iter().all(|i| i.priority == Band::Low && i.weight == BACKFILL_WEIGHT));
        assert_eq!(filled[0].rationale, "Added to meet minimum coverage for behavioral");
    }

    #[test]
    fn test_unknown_and_duplicate_ids_are_dropped() {
        let ranked = full_corpus();
        let known = ranked[0].item.id;
        let raw = json!({
            "selected_items": [
                {"item_id": known, "weight": 5},
                {"item_id": known, "weight": 9},
                {"item_id": Uuid::new_v4(), "weight": 9},
                {"item_id": "q-17", "weight": 9},
                "just a string"
            ]
        })
        .to_string();

        let outcome = validate_kit(&raw, &ranked);
        let dropped = outcome
            .repairs()
            .iter()
            .filter(|r| matches!(r, Repair::DroppedItem { .. }))
            .count();
        assert_eq!(dropped, 4);

        let model_items: Vec<_> = outcome
            .draft()
            .items
            .iter()
            .filter(|i| i.source == KitItemSource::Model)
            .collect();
        assert_eq!(model_items.len(), 1);
        assert_eq!(model_items[0].weight, 5.0);
        assert_eq!(model_items[0].priority, Band::Medium);
    }

    #[test]
    fn test_category_comes_from_corpus_not_model() {
        let ranked = full_corpus();
        let culture = ids_of(&ranked, CorpusCategory::CultureSafe)[0];
        let raw = json!({
            "selected_items": [{"item_id": culture, "category": "execution", "weight": 4}]
        })
        .to_string();
        let draft = validate_kit(&raw, &ranked).draft().clone();
        let item = draft.items.iter().find(|i| i.item_id == culture).unwrap();
        assert_eq!(item.category, CorpusCategory::CultureSafe);
    }

    #[test]
    fn test_weights_and_coverage_are_clamped() {
        let ranked = full_corpus();
        let id = ranked[0].item.id;
        let raw = json!({
            "selected_items": [{"item_id": id, "weight": 42}],
            "coverage_score": -10
        })
        .to_string();
        let draft = validate_kit(&raw, &ranked).draft().clone();
        assert_eq!(draft.items[0].weight, 10.0);
        assert_eq!(draft.items[0].priority, Band::High);
        assert_eq!(draft.coverage_score, 0.0);
        assert_eq!(draft.priority, Band::Low);
    }

    #[test]
    fn test_kit_priority_derivation() {
        assert_eq!(kit_priority_for_coverage(70.0), Band::High);
        assert_eq!(kit_priority_for_coverage(69.0), Band::Medium);
        assert_eq!(kit_priority_for_coverage(40.0), Band::Medium);
        assert_eq!(kit_priority_for_coverage(39.0), Band::Low);
    }

    #[test]
    fn test_corpus_exhaustion_is_reported() {
        let corpus = vec![
            corpus_item(CorpusCategory::Behavioral, 0),
            corpus_item(CorpusCategory::Behavioral, 1),
            corpus_item(CorpusCategory::Execution, 0),
            corpus_item(CorpusCategory::CultureSafe, 0),
        ];
        let ranked = rank_corpus(corpus, "Engineering", "mid");
        let draft = validate_kit("{}", &ranked).draft().clone();

        assert_eq!(draft.items.len(), 4);
        let report = &draft.reasoning.backfill;
        assert!(report.corpus_exhausted());
        assert_eq!(report.total_shortfall, Some(4));
        let unmet: Vec<_> = report.unmet.iter().map(|s| (s.category, s.selected)).collect();
        assert_eq!(
            unmet,
            vec![
                (CorpusCategory::RoleSpecific, 0),
                (CorpusCategory::Execution, 1),
                (CorpusCategory::CultureSafe, 1),
            ]
        );
    }

    #[test]
    fn test_malformed_output_builds_backfill_only_kit() {
        let ranked = full_corpus();
        let outcome = validate_kit("not json at all", &ranked);
        assert!(outcome.is_fallback());
        let draft = outcome.draft();
        assert_eq!(draft.coverage_score, 0.0);
        assert_eq!(draft.reasoning.summary, FALLBACK_MESSAGE);
        assert_eq!(draft.items.len(), KIT_MIN_ITEMS);
        assert!(draft.items.iter().all(|i| i.source == KitItemSource::Backfill));
    }
}

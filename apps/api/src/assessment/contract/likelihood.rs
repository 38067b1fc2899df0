use serde_json::{Map, Value};
use tracing::warn;

use super::{
    clamped_field, string_field, string_list, ContractOutcome, Repair, Validated, FALLBACK_MESSAGE,
};
use crate::assessment::extract::{parse_model_json, ParseOutcome};
use crate::models::decision::{Band, DimensionScores, LikelihoodReasoning};

/// overall_score >= 75 → high
pub const LIKELIHOOD_HIGH_THRESHOLD: f64 = 75.0;
/// overall_score >= 45 → medium, otherwise low
pub const LIKELIHOOD_MEDIUM_THRESHOLD: f64 = 45.0;

const OVERALL_MAX: f64 = 100.0;
const DIMENSION_MAX: f64 = 10.0;

/// Confidence derivation: number of available signal sources.
const HIGH_CONFIDENCE_SOURCES: usize = 3;
const MEDIUM_CONFIDENCE_SOURCES: usize = 1;

/// Validated hire-likelihood output, before ids and revision are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct LikelihoodDraft {
    pub overall_score: f64,
    pub band: Band,
    pub confidence: Band,
    pub dimensions: DimensionScores,
    pub reasoning: LikelihoodReasoning,
}

pub fn band_for_score(score: f64) -> Band {
    if score >= LIKELIHOOD_HIGH_THRESHOLD {
        Band::High
    } else if score >= LIKELIHOOD_MEDIUM_THRESHOLD {
        Band::Medium
    } else {
        Band::Low
    }
}

pub fn confidence_for_sources(available_sources: usize) -> Band {
    if available_sources >= HIGH_CONFIDENCE_SOURCES {
        Band::High
    } else if available_sources >= MEDIUM_CONFIDENCE_SOURCES {
        Band::Medium
    } else {
        Band::Low
    }
}

/// Uses the model's label when it is in the enumeration, otherwise the derived value.
fn categorical(
    map: &Map<String, Value>,
    key: &str,
    derived: Band,
    repairs: &mut Vec<Repair>,
) -> Band {
    match map.get(key).and_then(Value::as_str).and_then(Band::parse) {
        Some(band) => band,
        None => {
            repairs.push(Repair::Derived {
                field: key.to_string(),
                value: derived.as_str().to_string(),
            });
            derived
        }
    }
}

fn dimensions(map: &Map<String, Value>, repairs: &mut Vec<Repair>) -> DimensionScores {
    let empty = Map::new();
    let dims = map
        .get("dimensions")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let mut read = |key: &str| {
        clamped_field(
            dims,
            key,
            &format!("dimensions.{key}"),
            0.0,
            DIMENSION_MAX,
            repairs,
        )
    };

    DimensionScores {
        skills_alignment: read("skills_alignment"),
        experience_relevance: read("experience_relevance"),
        interview_performance: read("interview_performance"),
        scenario_judgment: read("scenario_judgment"),
        growth_potential: read("growth_potential"),
    }
}

fn fallback(reason: String) -> ContractOutcome<LikelihoodDraft> {
    warn!(reason = %reason, "Malformed hire-likelihood output, storing fallback record");
    let draft = LikelihoodDraft {
        overall_score: 0.0,
        band: Band::Low,
        confidence: Band::Low,
        dimensions: DimensionScores::default(),
        reasoning: LikelihoodReasoning {
            summary: FALLBACK_MESSAGE.to_string(),
            strengths: Vec::new(),
            risks: Vec::new(),
            fallback_reason: Some(reason.clone()),
        },
    };
    ContractOutcome::Fallback {
        validated: Validated {
            draft,
            repairs: Vec::new(),
        },
        reason,
    }
}

/// Validates and repairs raw hire-likelihood output.
///
/// `available_sources` is the number of signal sources that were present in the bundle; it
/// drives the confidence label when the model omits or mangles it.
pub fn validate_likelihood(raw: &str, available_sources: usize) -> ContractOutcome<LikelihoodDraft> {
    let map = match parse_model_json(raw) {
        ParseOutcome::Parsed(map) => map,
        ParseOutcome::Fallback(malformed) => return fallback(malformed.reason),
    };

    let mut repairs = Vec::new();

    // Some models answer with "score" despite the schema.
    let overall_missing = map.get("overall_score").map_or(true, Value::is_null);
    let score_key = if overall_missing && map.get("score").is_some_and(|v| !v.is_null()) {
        "score"
    } else {
        "overall_score"
    };
    let overall_score =
        clamped_field(&map, score_key, "overall_score", 0.0, OVERALL_MAX, &mut repairs);

    let band = categorical(&map, "band", band_for_score(overall_score), &mut repairs);
    let confidence = categorical(
        &map,
        "confidence",
        confidence_for_sources(available_sources),
        &mut repairs,
    );
    let dimensions = dimensions(&map, &mut repairs);

    let reasoning = LikelihoodReasoning {
        summary: string_field(&map, "summary").unwrap_or_default(),
        strengths: string_list(&map, "strengths"),
        risks: string_list(&map, "risks"),
        fallback_reason: None,
    };

    ContractOutcome::Conforming(Validated {
        draft: LikelihoodDraft {
            overall_score,
            band,
            confidence,
            dimensions,
            reasoning,
        },
        repairs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conforming_output_passes_through() {
        let raw = r#"{
            "overall_score": 82,
            "band": "high",
            "confidence": "medium",
            "dimensions": {
                "skills_alignment": 8, "experience_relevance": 7.5,
                "interview_performance": 9, "scenario_judgment": 6, "growth_potential": 8
            },
            "summary": "Strong systems background.",
            "strengths": ["distributed systems"],
            "risks": ["limited people management"]
        }"#;
        let outcome = validate_likelihood(raw, 4);
        assert!(!outcome.is_fallback());
        assert!(outcome.repairs().is_empty());

        let draft = outcome.draft();
        assert_eq!(draft.overall_score, 82.0);
        assert_eq!(draft.band, Band::High);
        assert_eq!(draft.confidence, Band::Medium);
        assert_eq!(draft.dimensions.experience_relevance, 7.5);
        assert_eq!(draft.reasoning.risks, vec!["limited people management"]);
    }

    #[test]
    fn test_band_derivation_uses_fixed_thresholds() {
        for (score, expected) in [(80, Band::High), (50, Band::Medium), (20, Band::Low)] {
            let outcome = validate_likelihood(&format!("{{\"overall_score\": {score}}}"), 2);
            assert_eq!(outcome.draft().band, expected, "score {score}");
        }
        assert_eq!(band_for_score(75.0), Band::High);
        assert_eq!(band_for_score(74.9), Band::Medium);
        assert_eq!(band_for_score(45.0), Band::Medium);
        assert_eq!(band_for_score(44.9), Band::Low);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let raw = r#"{"overall_score": 240, "dimensions": {"skills_alignment": -4, "growth_potential": 99}}"#;
        let draft = validate_likelihood(raw, 1).draft().clone();
        assert_eq!(draft.overall_score, 100.0);
        assert_eq!(draft.dimensions.skills_alignment, 0.0);
        assert_eq!(draft.dimensions.growth_potential, 10.0);
    }

    #[test]
    fn test_non_numeric_score_coerces_to_zero() {
        let outcome = validate_likelihood(r#"{"overall_score": "excellent", "band": "stellar"}"#, 0);
        let draft = outcome.draft();
        assert_eq!(draft.overall_score, 0.0);
        assert_eq!(draft.band, Band::Low);
        assert!(outcome.repairs().contains(&Repair::Derived {
            field: "band".to_string(),
            value: "low".to_string(),
        }));
    }

    #[test]
    fn test_numeric_string_and_score_alias_accepted() {
        let draft = validate_likelihood(r#"{"score": "66"}"#, 1).draft().clone();
        assert_eq!(draft.overall_score, 66.0);
        assert_eq!(draft.band, Band::Medium);
    }

    #[test]
    fn test_score_alias_used_when_overall_score_is_null() {
        let draft = validate_likelihood(r#"{"overall_score": null, "score": 70}"#, 1)
            .draft()
            .clone();
        assert_eq!(draft.overall_score, 70.0);
        assert_eq!(draft.band, Band::Medium);

        let draft = validate_likelihood(r#"{"overall_score": 20, "score": 90}"#, 1)
            .draft()
            .clone();
        assert_eq!(draft.overall_score, 20.0);
    }

    #[test]
    fn test_confidence_derived_from_available_sources() {
        assert_eq!(validate_likelihood("{}", 5).draft().confidence, Band::High);
        assert_eq!(validate_likelihood("{}", 3).draft().confidence, Band::High);
        assert_eq!(validate_likelihood("{}", 1).draft().confidence, Band::Medium);
        assert_eq!(validate_likelihood("{}", 0).draft().confidence, Band::Low);
    }

    #[test]
    fn test_malformed_output_yields_fallback_record() {
        let outcome = validate_likelihood("not json at all", 3);
        assert!(outcome.is_fallback());
        let draft = outcome.draft();
        assert_eq!(draft.overall_score, 0.0);
        assert_eq!(draft.band, Band::Low);
        assert_eq!(draft.reasoning.summary, FALLBACK_MESSAGE);
        assert!(draft.reasoning.fallback_reason.is_some());
    }
}

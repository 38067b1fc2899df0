use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::corpus::{CorpusCategory, Rubric};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    HireLikelihood,
    InterviewKit,
}

impl DecisionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionType::HireLikelihood => "hire_likelihood",
            DecisionType::InterviewKit => "interview_kit",
        }
    }
}

impl fmt::Display for DecisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three-level categorical used for likelihood band, confidence and kit priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    High,
    Medium,
    Low,
}

impl Band {
    pub fn as_str(&self) -> &'static str {
        match self {
            Band::High => "high",
            Band::Medium => "medium",
            Band::Low => "low",
        }
    }

    /// Strict parse: anything outside the enumeration is `None`.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "high" => Some(Band::High),
            "medium" => Some(Band::Medium),
            "low" => Some(Band::Low),
            _ => None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Hire likelihood
// ────────────────────────────────────────────────────────────────────────────

/// Per-dimension scores, each in [0, 10].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionScores {
    pub skills_alignment: f64,
    pub experience_relevance: f64,
    pub interview_performance: f64,
    pub scenario_judgment: f64,
    pub growth_potential: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LikelihoodReasoning {
    pub summary: String,
    pub strengths: Vec<String>,
    pub risks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikelihoodRecord {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub revision: i32,
    /// [0, 100]
    pub overall_score: f64,
    pub band: Band,
    pub confidence: Band,
    pub dimensions: DimensionScores,
    pub reasoning: LikelihoodReasoning,
    pub model: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

// ────────────────────────────────────────────────────────────────────────────
// Interview kit
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KitItemSource {
    Model,
    Backfill,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KitItem {
    pub item_id: Uuid,
    pub category: CorpusCategory,
    pub question: String,
    pub rubric: Option<Rubric>,
    /// [0, 10]
    pub weight: f64,
    pub priority: Band,
    pub rationale: String,
    pub source: KitItemSource,
}

/// A required category the corpus could not fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryShortfall {
    pub category: CorpusCategory,
    pub required: usize,
    pub selected: usize,
}

/// What backfill added and what it could not satisfy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackfillReport {
    pub added: usize,
    pub unmet: Vec<CategoryShortfall>,
    /// Set when the total item minimum could not be reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_shortfall: Option<usize>,
}

impl BackfillReport {
    pub fn corpus_exhausted(&self) -> bool {
        !self.unmet.is_empty() || self.total_shortfall.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KitReasoning {
    pub summary: String,
    pub focus_areas: Vec<String>,
    pub backfill: BackfillReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KitRecord {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub revision: i32,
    /// [0, 100]
    pub coverage_score: f64,
    pub priority: Band,
    pub items: Vec<KitItem>,
    pub reasoning: KitReasoning,
    pub model: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

// ────────────────────────────────────────────────────────────────────────────
// Shared lifecycle
// ────────────────────────────────────────────────────────────────────────────

/// Either concrete decision shape. Store and audit code work on this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision_type", rename_all = "snake_case")]
pub enum Decision {
    HireLikelihood(LikelihoodRecord),
    InterviewKit(KitRecord),
}

impl Decision {
    pub fn decision_type(&self) -> DecisionType {
        match self {
            Decision::HireLikelihood(_) => DecisionType::HireLikelihood,
            Decision::InterviewKit(_) => DecisionType::InterviewKit,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Decision::HireLikelihood(r) => r.id,
            Decision::InterviewKit(r) => r.id,
        }
    }

    pub fn candidate_id(&self) -> Uuid {
        match self {
            Decision::HireLikelihood(r) => r.candidate_id,
            Decision::InterviewKit(r) => r.candidate_id,
        }
    }

    pub fn job_id(&self) -> Uuid {
        match self {
            Decision::HireLikelihood(r) => r.job_id,
            Decision::InterviewKit(r) => r.job_id,
        }
    }

    pub fn revision(&self) -> i32 {
        match self {
            Decision::HireLikelihood(r) => r.revision,
            Decision::InterviewKit(r) => r.revision,
        }
    }

    pub fn is_fallback(&self) -> bool {
        match self {
            Decision::HireLikelihood(r) => r.reasoning.fallback_reason.is_some(),
            Decision::InterviewKit(r) => r.reasoning.fallback_reason.is_some(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Audit
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairnessChecks {
    pub protected_attributes_excluded: bool,
    pub removed_protected_keys: Vec<String>,
    pub numeric_ranges_enforced: bool,
    pub categorical_fields_validated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model: String,
    pub temperature: f32,
    pub latency_ms: u64,
    pub fallback: bool,
}

/// One entry per persisted decision; never written on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub decision_type: DecisionType,
    pub decision_id: Uuid,
    pub job_id: Uuid,
    pub candidate_id: Uuid,
    pub actor_id: Uuid,
    pub input_summary: Value,
    pub output_summary: Value,
    pub fairness_checks: FairnessChecks,
    pub model_metadata: ModelMetadata,
    pub created_at: DateTime<Utc>,
}

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Question category. Kits must cover the first four; `Other` is never required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorpusCategory {
    Behavioral,
    RoleSpecific,
    Execution,
    CultureSafe,
    Other,
}

impl CorpusCategory {
    /// Categories a kit must cover, in backfill preference order.
    pub const REQUIRED: [CorpusCategory; 4] = [
        CorpusCategory::Behavioral,
        CorpusCategory::RoleSpecific,
        CorpusCategory::Execution,
        CorpusCategory::CultureSafe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CorpusCategory::Behavioral => "behavioral",
            CorpusCategory::RoleSpecific => "role_specific",
            CorpusCategory::Execution => "execution",
            CorpusCategory::CultureSafe => "culture_safe",
            CorpusCategory::Other => "other",
        }
    }

    /// Unknown labels from the store map to `Other` rather than failing the read.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "behavioral" | "behavioural" => CorpusCategory::Behavioral,
            "role_specific" => CorpusCategory::RoleSpecific,
            "execution" => CorpusCategory::Execution,
            "culture_safe" => CorpusCategory::CultureSafe,
            _ => CorpusCategory::Other,
        }
    }
}

impl fmt::Display for CorpusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scoring guidance attached to a corpus question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rubric {
    #[serde(default)]
    pub good_answer_bullets: Vec<String>,
    #[serde(default)]
    pub follow_up_probes: Vec<String>,
    #[serde(default)]
    pub bias_traps: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A reusable interview question. Read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusItem {
    pub id: Uuid,
    pub department: String,
    pub category: CorpusCategory,
    pub seniority: String,
    pub difficulty: String,
    pub is_safe: bool,
    pub question: String,
    pub rubric: Option<Rubric>,
}

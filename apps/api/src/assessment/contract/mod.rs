//! Contract Validator & Repairer — turns untrusted model text into a record that satisfies the
//! output contract.
//!
//! Each decision type has its own validator (`likelihood`, `kit`). Both follow the same steps:
//! extract JSON, parse, clamp numerics, derive invalid categoricals, enforce cardinality.
//! No step raises: malformed output becomes a `Fallback` outcome carrying a neutral record.

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::models::corpus::CorpusCategory;

pub mod kit;
pub mod likelihood;

/// Message stored on every fallback record.
pub const FALLBACK_MESSAGE: &str = "evaluation failed due to parsing error";

/// A change the validator made to the model's output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Repair {
    /// Numeric field was missing, non-numeric or out of range.
    Clamped { field: String, to: f64 },
    /// Categorical field was missing or outside its enumeration.
    Derived { field: String, value: String },
    /// Model item was unusable (unknown id, duplicate, malformed).
    DroppedItem { reference: String, reason: String },
    /// Item appended from the ranked corpus to meet a minimum.
    Backfilled { item_id: Uuid, category: CorpusCategory },
}

/// Validated draft plus the repairs that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated<T> {
    pub draft: T,
    pub repairs: Vec<Repair>,
}

/// Typed result of validation: conforming output, or a neutral fallback and the reason.
#[derive(Debug, Clone, PartialEq)]
pub enum ContractOutcome<T> {
    Conforming(Validated<T>),
    Fallback { validated: Validated<T>, reason: String },
}

impl<T> ContractOutcome<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ContractOutcome::Fallback { .. })
    }

    pub fn draft(&self) -> &T {
        match self {
            ContractOutcome::Conforming(v) => &v.draft,
            ContractOutcome::Fallback { validated, .. } => &validated.draft,
        }
    }

    pub fn repairs(&self) -> &[Repair] {
        match self {
            ContractOutcome::Conforming(v) => &v.repairs,
            ContractOutcome::Fallback { validated, .. } => &validated.repairs,
        }
    }

    pub fn into_validated(self) -> Validated<T> {
        match self {
            ContractOutcome::Conforming(v) => v,
            ContractOutcome::Fallback { validated, .. } => validated,
        }
    }
}

/// Reads a number leniently: JSON numbers and numeric strings parse; everything else,
/// including NaN and infinities, is 0. Returns the value and whether it was usable as-is.
pub(crate) fn coerce_number(value: Option<&Value>) -> (f64, bool) {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) if n.is_finite() => (n, true),
        _ => (0.0, false),
    }
}

/// Coerces and clamps a numeric field into [min, max], recording a repair when the stored
/// value differs from what the model sent.
pub(crate) fn clamped_field(
    map: &Map<String, Value>,
    key: &str,
    field: &str,
    min: f64,
    max: f64,
    repairs: &mut Vec<Repair>,
) -> f64 {
    let (raw, usable) = coerce_number(map.get(key));
    let clamped = raw.max(min).min(max);
    if !usable || clamped != raw {
        repairs.push(Repair::Clamped {
            field: field.to_string(),
            to: clamped,
        });
    }
    clamped
}

pub(crate) fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Non-empty strings from an array field; other element types are skipped.
pub(crate) fn string_list(map: &Map<String, Value>, key: &str) -> Vec<String> {
    map.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

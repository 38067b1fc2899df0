//! Prompt Builder — renders the system and user messages for one inference call.
//!
//! Output is deterministic for identical inputs: JSON objects serialize with sorted keys and
//! the corpus slice keeps rank order. Protected attributes never reach the prompt: the
//! candidate profile goes through an allow-listed projection and free-form signal payloads are
//! scrubbed of protected keys.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::assessment::prompts::{
    KIT_PROMPT_TEMPLATE, KIT_ROLE, KIT_SCHEMA, LIKELIHOOD_PROMPT_TEMPLATE, LIKELIHOOD_ROLE,
    LIKELIHOOD_SCHEMA,
};
use crate::assessment::ranking::RankedItem;
use crate::assessment::signals::CandidateSignalBundle;
use crate::llm_client::prompts::{FAIRNESS_INSTRUCTION, JSON_ONLY_SYSTEM, PROTECTED_ATTRIBUTE_KEYS};
use crate::models::signals::{CandidateProfile, JobContext};

/// A rendered prompt plus what the builder did to produce it.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltPrompt {
    pub system: String,
    pub user: String,
    /// Protected keys found in upstream payloads and removed, sorted.
    pub removed_protected_keys: Vec<String>,
    pub corpus_items_offered: usize,
}

/// The only candidate profile fields a prompt may carry.
#[derive(Debug, Serialize)]
pub struct PromptCandidate<'a> {
    pub candidate_ref: Uuid,
    pub current_title: Option<&'a str>,
    pub headline: Option<&'a str>,
    pub years_experience: Option<f64>,
    pub skills: &'a [String],
}

impl<'a> PromptCandidate<'a> {
    fn project(candidate_id: Uuid, profile: Option<&'a CandidateProfile>) -> Self {
        Self {
            candidate_ref: candidate_id,
            current_title: profile.and_then(|p| p.current_title.as_deref()),
            headline: profile.and_then(|p| p.headline.as_deref()),
            years_experience: profile.and_then(|p| p.years_experience),
            skills: profile.map(|p| p.skills.as_slice()).unwrap_or(&[]),
        }
    }
}

fn system_prompt(role: &str, schema: &str) -> String {
    format!("{role}\n\n{JSON_ONLY_SYSTEM}\n\n{FAIRNESS_INSTRUCTION}\n\n{schema}")
}

fn job_json(job: &JobContext) -> Value {
    json!({
        "title": job.title,
        "department": job.department,
        "seniority": job.seniority,
        "description": job.description,
    })
}

/// Compact signal payload. Returns the payload and the protected keys removed from it.
fn signals_json(bundle: &CandidateSignalBundle) -> (Value, BTreeSet<String>) {
    let candidate = PromptCandidate::project(bundle.candidate_id, bundle.profile.as_ref());
    let interviews = bundle.interview_summary();

    let mut payload = json!({
        "candidate": candidate,
        "role_fit": bundle.fit.as_ref().map(|f| json!({
            "score": f.overall_score,
            "strengths": f.strengths,
            "gaps": f.gaps,
        })),
        "pipeline": bundle.pipeline.as_ref().map(|p| json!({
            "predictive_score": p.predictive_score,
            "shortlist_rank": p.shortlist_rank,
        })),
        "prior_interviews": {
            "count": interviews.count,
            "average_score": interviews.average_score,
            "strengths": interviews.strengths,
            "gaps": interviews.gaps,
            "summaries": bundle
                .interviews
                .iter()
                .filter_map(|i| i.summary.as_deref())
                .collect::<Vec<_>>(),
        },
        "warmup_scenarios": bundle
            .warmups
            .iter()
            .map(|w| json!({
                "scenario": w.scenario_title,
                "score": w.score,
                "signals": w.signals,
            }))
            .collect::<Vec<_>>(),
    });

    let mut removed = BTreeSet::new();
    scrub_protected(&mut payload, &mut removed);
    (payload, removed)
}

/// Splits a JSON key into lowercase words on `_`, `-`, `.`, whitespace and camelCase humps.
fn key_words(key: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in key.chars() {
        if c == '_' || c == '-' || c == '.' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.extend(c.to_lowercase());
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// A key is protected when any run of its words spells a protected attribute, so
/// `dateOfBirth`, `Marital-Status` and `candidate_gender` all match.
fn is_protected_key(key: &str) -> bool {
    let words = key_words(key);
    (0..words.len()).any(|start| {
        (start + 1..=words.len()).any(|end| {
            let run = words[start..end].concat();
            PROTECTED_ATTRIBUTE_KEYS
                .iter()
                .any(|protected| normalize_key(protected) == run)
        })
    })
}

/// Removes protected keys at any depth, recording each removed key name.
pub fn scrub_protected(value: &mut Value, removed: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            let doomed: Vec<String> = map.keys().filter(|k| is_protected_key(k)).cloned().collect();
            for key in doomed {
                map.remove(&key);
                removed.insert(key.to_lowercase());
            }
            for child in map.values_mut() {
                scrub_protected(child, removed);
            }
        }
        Value::Array(items) => {
            for child in items {
                scrub_protected(child, removed);
            }
        }
        _ => {}
    }
}

fn corpus_json(slice: &[RankedItem]) -> Value {
    Value::Array(
        slice
            .iter()
            .map(|ranked| {
                let item = &ranked.item;
                let mut entry = Map::new();
                entry.insert("item_id".to_string(), json!(item.id));
                entry.insert("category".to_string(), json!(item.category));
                entry.insert("seniority".to_string(), json!(item.seniority));
                entry.insert("difficulty".to_string(), json!(item.difficulty));
                entry.insert("question".to_string(), json!(item.question));
                entry.insert("relevance".to_string(), json!(ranked.relevance));
                entry.insert("has_rubric".to_string(), json!(item.rubric.is_some()));
                Value::Object(entry)
            })
            .collect(),
    )
}

/// Fills `{name}` placeholders in a single pass over the template. Substituted values are
/// never rescanned, so placeholder-looking text inside job or signal data stays literal.
fn render_template(template: &str, slots: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let slot = slots.iter().find(|(name, _)| {
            tail.strip_prefix('{')
                .and_then(|t| t.strip_prefix(*name))
                .is_some_and(|t| t.starts_with('}'))
        });
        match slot {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 2..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Prompt for pure scoring: no corpus.
pub fn build_likelihood_prompt(job: &JobContext, bundle: &CandidateSignalBundle) -> BuiltPrompt {
    let (signals, removed) = signals_json(bundle);
    let user = render_template(
        LIKELIHOOD_PROMPT_TEMPLATE,
        &[
            ("job_json", job_json(job).to_string()),
            ("signals_json", signals.to_string()),
        ],
    );

    BuiltPrompt {
        system: system_prompt(LIKELIHOOD_ROLE, LIKELIHOOD_SCHEMA),
        user,
        removed_protected_keys: removed.into_iter().collect(),
        corpus_items_offered: 0,
    }
}

/// Prompt for kit generation: embeds the ranked corpus slice.
pub fn build_kit_prompt(
    job: &JobContext,
    bundle: &CandidateSignalBundle,
    corpus_slice: &[RankedItem],
) -> BuiltPrompt {
    let (signals, removed) = signals_json(bundle);
    let user = render_template(
        KIT_PROMPT_TEMPLATE,
        &[
            ("job_json", job_json(job).to_string()),
            ("signals_json", signals.to_string()),
            ("corpus_json", corpus_json(corpus_slice).to_string()),
        ],
    );

    BuiltPrompt {
        system: system_prompt(KIT_ROLE, KIT_SCHEMA),
        user,
        removed_protected_keys: removed.into_iter().collect(),
        corpus_items_offered: corpus_slice.len(),
    }
}

//! Signal Collector — gathers every prior signal about a candidate for one job.
//!
//! Every source is optional. A missing row is simply absent; a failed read is logged,
//! treated as absent, and named in `unavailable_sources` so the audit trail shows it.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::signals::{
    CandidateProfile, FitScoreRow, InterviewResultRow, PipelineScoreRow, WarmupResponseRow,
};
use crate::store::{AssessmentStore, StoreError};

/// At most this many completed interviews are read per candidate.
pub const INTERVIEW_HISTORY_LIMIT: usize = 3;

/// Everything known about a candidate for one job. Built per invocation, never persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CandidateSignalBundle {
    pub candidate_id: Uuid,
    pub profile: Option<CandidateProfile>,
    pub fit: Option<FitScoreRow>,
    pub pipeline: Option<PipelineScoreRow>,
    pub interviews: Vec<InterviewResultRow>,
    pub warmups: Vec<WarmupResponseRow>,
    pub unavailable_sources: Vec<String>,
}

/// Aggregate of the prior interviews in a bundle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterviewSummary {
    pub count: usize,
    pub average_score: Option<f64>,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
}

impl CandidateSignalBundle {
    /// Number of sources that contributed at least one row.
    pub fn available_source_count(&self) -> usize {
        [
            self.profile.is_some(),
            self.fit.is_some(),
            self.pipeline.is_some(),
            !self.interviews.is_empty(),
            !self.warmups.is_empty(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }

    pub fn available_sources(&self) -> Vec<&'static str> {
        let mut sources = Vec::new();
        if self.profile.is_some() {
            sources.push("profile");
        }
        if self.fit.is_some() {
            sources.push("fit_score");
        }
        if self.pipeline.is_some() {
            sources.push("pipeline_score");
        }
        if !self.interviews.is_empty() {
            sources.push("interviews");
        }
        if !self.warmups.is_empty() {
            sources.push("warmup");
        }
        sources
    }

    pub fn interview_summary(&self) -> InterviewSummary {
        let scores: Vec<f64> = self
            .interviews
            .iter()
            .filter_map(|i| i.overall_score)
            .collect();
        let average_score = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        };

        InterviewSummary {
            count: self.interviews.len(),
            average_score,
            strengths: dedup_in_order(self.interviews.iter().flat_map(|i| i.strengths.iter())),
            gaps: dedup_in_order(self.interviews.iter().flat_map(|i| i.gaps.iter())),
        }
    }

    /// Identity-free description of what was collected, for the audit input summary.
    pub fn audit_summary(&self) -> Value {
        let interviews = self.interview_summary();
        json!({
            "sources_available": self.available_sources(),
            "sources_unavailable": self.unavailable_sources,
            "fit_score": self.fit.as_ref().map(|f| f.overall_score),
            "pipeline_score": self.pipeline.as_ref().map(|p| p.predictive_score),
            "interview_count": interviews.count,
            "interview_average": interviews.average_score,
            "warmup_response_count": self.warmups.len(),
        })
    }
}

fn dedup_in_order<'a>(items: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .filter(|s| seen.insert(s.trim().to_lowercase()))
        .cloned()
        .collect()
}

/// Reads all five sources concurrently and assembles the bundle. Never fails.
pub async fn collect_signals(
    store: &dyn AssessmentStore,
    candidate_id: Uuid,
    job_id: Uuid,
) -> CandidateSignalBundle {
    let (profile, fit, pipeline, interviews, warmups) = tokio::join!(
        store.candidate_profile(candidate_id),
        store.latest_fit_score(candidate_id, job_id),
        store.latest_pipeline_score(candidate_id, job_id),
        store.recent_interviews(candidate_id, job_id, INTERVIEW_HISTORY_LIMIT),
        store.latest_warmup_responses(candidate_id, job_id),
    );

    let mut unavailable_sources = Vec::new();
    let profile = tolerate("profile", profile, &mut unavailable_sources).flatten();
    let fit = tolerate("fit_score", fit, &mut unavailable_sources).flatten();
    let pipeline = tolerate("pipeline_score", pipeline, &mut unavailable_sources).flatten();
    let mut interviews =
        tolerate("interviews", interviews, &mut unavailable_sources).unwrap_or_default();
    interviews.truncate(INTERVIEW_HISTORY_LIMIT);
    let warmups = tolerate("warmup", warmups, &mut unavailable_sources).unwrap_or_default();

    let bundle = CandidateSignalBundle {
        candidate_id,
        profile,
        fit,
        pipeline,
        interviews,
        warmups,
        unavailable_sources,
    };

    info!(
        "Collected {} signal source(s) for candidate {candidate_id} on job {job_id}",
        bundle.available_source_count()
    );
    bundle
}

fn tolerate<T>(
    source: &'static str,
    result: Result<T, StoreError>,
    unavailable: &mut Vec<String>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Signal source '{source}' unavailable, continuing without it: {e}");
            unavailable.push(source.to_string());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use chrono::{Duration, Utc};

    fn interview(score: Option<f64>, days_ago: i64, strengths: &[&str]) -> InterviewResultRow {
        InterviewResultRow {
            id: Uuid::new_v4(),
            overall_score: score,
            strengths: strengths.iter().map(|s| s.to_string()).collect(),
            gaps: vec!["system design depth".to_string()],
            summary: None,
            completed_at: Utc::now() - Duration::days(days_ago),
        }
    }

    #[tokio::test]
    async fn test_empty_store_yields_valid_empty_bundle() {
        let store = MemoryStore::default();
        let bundle = collect_signals(&store, Uuid::new_v4(), Uuid::new_v4()).await;
        assert_eq!(bundle.available_source_count(), 0);
        assert!(bundle.unavailable_sources.is_empty());
        assert!(bundle.interviews.is_empty());
    }

    #[tokio::test]
    async fn test_failed_source_is_recorded_not_raised() {
        let candidate = Uuid::new_v4();
        let job = Uuid::new_v4();
        let store = MemoryStore::default().with(|s| {
            s.fit_scores.insert(
                (candidate, job),
                FitScoreRow {
                    overall_score: 72.0,
                    strengths: vec!["rust".to_string()],
                    gaps: vec![],
                    created_at: Utc::now(),
                },
            );
            s.failing_sources.insert("interviews");
        });

        let bundle = collect_signals(&store, candidate, job).await;
        assert_eq!(bundle.unavailable_sources, vec!["interviews".to_string()]);
        assert_eq!(bundle.fit.as_ref().map(|f| f.overall_score), Some(72.0));
        assert_eq!(bundle.available_sources(), vec!["fit_score"]);
    }

    #[tokio::test]
    async fn test_interviews_capped_at_three_newest_first() {
        let candidate = Uuid::new_v4();
        let job = Uuid::new_v4();
        let store = MemoryStore::default().with(|s| {
            s.interviews.insert(
                (candidate, job),
                vec![
                    interview(Some(50.0), 10, &[]),
                    interview(Some(80.0), 1, &[]),
                    interview(Some(70.0), 3, &[]),
                    interview(Some(60.0), 5, &[]),
                ],
            );
        });

        let bundle = collect_signals(&store, candidate, job).await;
        assert_eq!(bundle.interviews.len(), INTERVIEW_HISTORY_LIMIT);
        assert_eq!(bundle.interviews[0].overall_score, Some(80.0));
    }

    #[test]
    fn test_interview_summary_averages_scored_interviews_only() {
        let bundle = CandidateSignalBundle {
            interviews: vec![
                interview(Some(80.0), 1, &["Clear communicator"]),
                interview(None, 2, &["clear communicator", "Ownership"]),
                interview(Some(60.0), 3, &[]),
            ],
            ..Default::default()
        };
        let summary = bundle.interview_summary();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.average_score, Some(70.0));
        assert_eq!(summary.strengths, vec!["Clear communicator", "Ownership"]);
        assert_eq!(summary.gaps.len(), 1);
    }

    #[test]
    fn test_audit_summary_has_no_identity_fields() {
        let bundle = CandidateSignalBundle {
            profile: Some(CandidateProfile {
                id: Uuid::new_v4(),
                full_name: "Jordan Example".to_string(),
                email: "jordan@example.com".to_string(),
                current_title: None,
                headline: None,
                years_experience: None,
                skills: vec![],
                location: Some("Somewhere".to_string()),
            }),
            ..Default::default()
        };
        let summary = bundle.audit_summary().to_string();
        assert!(!summary.contains("Jordan"));
        assert!(!summary.contains("example.com"));
        assert!(summary.contains("profile"));
    }
}

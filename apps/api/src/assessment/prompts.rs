// All LLM prompt constants for the assessment pipeline.
// Reuses cross-cutting fragments from llm_client::prompts.
// Schema text here must stay in step with the validators in assessment::contract.

/// System prompt role line for hire-likelihood scoring.
pub const LIKELIHOOD_ROLE: &str = "You are a structured hiring-signal analyst. \
    You estimate how likely a candidate is to succeed in a specific role, using only the \
    job-relevant evidence you are given.";

/// Output schema for hire-likelihood scoring.
pub const LIKELIHOOD_SCHEMA: &str = r#"Return a JSON object with this EXACT schema (no extra fields):
{
  "overall_score": 0,
  "band": "high",
  "confidence": "medium",
  "dimensions": {
    "skills_alignment": 0,
    "experience_relevance": 0,
    "interview_performance": 0,
    "scenario_judgment": 0,
    "growth_potential": 0
  },
  "summary": "Two or three sentences grounded in the evidence.",
  "strengths": ["evidence-backed strength"],
  "risks": ["evidence-backed risk or open question"]
}

FIELD RULES:
- overall_score: integer 0-100
- band: exactly one of "high" | "medium" | "low" (high >= 75, medium >= 45, otherwise low)
- confidence: exactly one of "high" | "medium" | "low", reflecting how much evidence was available
- every dimensions value: number 0-10
- strengths and risks: arrays of short strings; empty arrays are allowed
- if a signal section is missing, score from what is present and lower confidence; never guess"#;

/// System prompt role line for interview kit generation.
pub const KIT_ROLE: &str = "You are a structured-interview designer. \
    You assemble a fair, job-relevant interview kit by selecting questions from a vetted \
    question corpus.";

/// Output schema for interview kit generation.
pub const KIT_SCHEMA: &str = r#"Return a JSON object with this EXACT schema (no extra fields):
{
  "selected_items": [
    {
      "item_id": "the-exact-item_id-uuid-from-the-corpus",
      "weight": 0,
      "priority": "high",
      "rationale": "Why this question probes a gap or strength in the evidence."
    }
  ],
  "focus_areas": ["area the interviewers should probe"],
  "coverage_score": 0,
  "priority": "medium",
  "summary": "One or two sentences on what this kit is designed to verify."
}

HARD RULES:
1. Select AT LEAST 8 items
2. Select AT LEAST 2 items from EACH category: behavioral, role_specific, execution, culture_safe
3. EVERY item_id MUST be copied exactly from the QUESTION CORPUS below; never invent questions
4. weight: number 0-10 (how important the question is for this candidate)
5. priority (per item and for the kit): exactly one of "high" | "medium" | "low"
6. coverage_score: integer 0-100, how well the kit covers the role's requirements"#;

/// User message template for hire-likelihood scoring.
/// Replace: {job_json}, {signals_json}
pub const LIKELIHOOD_PROMPT_TEMPLATE: &str = r#"ROLE:
{job_json}

CANDIDATE SIGNALS (source of truth; use ONLY these):
{signals_json}

Score this candidate for the role. Respond with the JSON object only."#;

/// User message template for interview kit generation.
/// Replace: {job_json}, {signals_json}, {corpus_json}
pub const KIT_PROMPT_TEMPLATE: &str = r#"ROLE:
{job_json}

CANDIDATE SIGNALS (use to target gaps and verify strengths):
{signals_json}

QUESTION CORPUS (ranked by relevance; select ONLY from these item_id values):
{corpus_json}

Build the interview kit. Respond with the JSON object only."#;

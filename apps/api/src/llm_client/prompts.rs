// Shared prompt constants and prompt-building utilities.
// Each decision type defines its own schema prompt in assessment/prompts.rs.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Fairness rules appended to every assessment system prompt.
pub const FAIRNESS_INSTRUCTION: &str = "\
    FAIRNESS RULES: Base every judgement only on job-relevant evidence present in the input \
    (skills, experience, scenario answers, interview results). \
    NEVER infer, estimate, or mention any of the following: age, gender, race, ethnicity, \
    religion, nationality, national origin, marital or family status, pregnancy, disability, \
    health, sexual orientation, political views, or socioeconomic background. \
    Do NOT use names, photos, addresses, or schools as proxies for any of these. \
    Use neutral, evidence-based language; do NOT use words like 'culture fit', 'young', \
    'energetic', 'native speaker', or 'overqualified'.";

/// Keys stripped from any JSON payload before it is embedded in a prompt.
/// Matched against every run of words in a key, ignoring case and separators.
pub const PROTECTED_ATTRIBUTE_KEYS: &[&str] = &[
    "name",
    "full_name",
    "first_name",
    "last_name",
    "surname",
    "email",
    "phone",
    "photo",
    "photo_url",
    "avatar_url",
    "address",
    "location",
    "age",
    "date_of_birth",
    "dob",
    "birth_date",
    "birthday",
    "birth_year",
    "gender",
    "sex",
    "pronouns",
    "race",
    "ethnicity",
    "religion",
    "nationality",
    "citizenship",
    "national_origin",
    "marital_status",
    "family_status",
    "pregnancy",
    "disability",
    "health",
    "sexual_orientation",
    "veteran_status",
];

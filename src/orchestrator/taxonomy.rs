//! Flattening of role and JD taxonomy documents.
//!
//! The data service returns skills and responsibilities either as plain
//! strings or as rich objects. The generation service only wants names.

use serde_json::Value;

use crate::orchestrator::types::Document;

/// Keys tried, in order, to name a role skill object.
const ROLE_SKILL_KEYS: [&str; 4] = ["skill_name", "name", "skill_id", "role_required_skills_name"];

/// Keys tried, in order, to name a JD skill object.
const JD_SKILL_KEYS: [&str; 5] = ["skill_id", "skill_code", "skill_name", "name", "jd_required_skills_name"];

/// Role skill names from `role_required_skills`.
pub fn role_required_skills(role: &Document) -> Vec<String> {
    flatten(role.get("role_required_skills"), &ROLE_SKILL_KEYS)
}

/// JD skill names from `job_required_skills`, falling back to `jd_required_skills`.
pub fn jd_required_skills(jd: &Document) -> Vec<String> {
    let raw = jd
        .get("job_required_skills")
        .filter(|v| !v.is_null())
        .or_else(|| jd.get("jd_required_skills"));
    flatten(raw, &JD_SKILL_KEYS)
}

/// JD responsibilities as plain sentences.
pub fn jd_responsibilities(jd: &Document) -> Vec<String> {
    flatten(jd.get("job_responsibilities"), &["responsibility"])
}

/// JD identifier as reported by the data service.
pub fn jd_identifier(jd: &Document) -> Option<String> {
    ["jd_id", "job_id"]
        .iter()
        .filter_map(|k| jd.get(*k))
        .find_map(non_blank)
}

fn flatten(items: Option<&Value>, keys: &[&str]) -> Vec<String> {
    let Some(Value::Array(items)) = items else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(obj) => keys.iter().filter_map(|k| obj.get(*k)).find_map(non_blank),
            other => non_blank(other),
        })
        .collect()
}

fn non_blank(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

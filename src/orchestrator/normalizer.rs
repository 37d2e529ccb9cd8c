//! Key normalization and request shape validation.
//!
//! Clients may spell every top-level field in camelCase or snake_case. A
//! single pass over [`FIELD_ALIASES`] resolves each logical field (camelCase
//! wins when both spellings carry a value), rejects unknown keys, and
//! collects every field violation before failing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{ApiError, SubErrors};
use crate::orchestrator::types::{
    Document, Language, LanguageTone, NormalizedRequest, PassThrough, Section,
};

/// The two accepted spellings of one logical field.
#[derive(Debug, Clone, Copy)]
pub struct FieldAlias {
    pub camel: &'static str,
    pub snake: &'static str,
}

const fn alias(camel: &'static str, snake: &'static str) -> FieldAlias {
    FieldAlias { camel, snake }
}

pub const STUDENT_ID: FieldAlias = alias("studentId", "student_id");
pub const TEMPLATE_ID: FieldAlias = alias("templateId", "template_id");
pub const LANGUAGE: FieldAlias = alias("language", "language");
pub const LANGUAGE_TONE: FieldAlias = alias("languageTone", "language_tone");
pub const SECTIONS: FieldAlias = alias("sections", "sections");
pub const ROLE_ID: FieldAlias = alias("roleId", "role_id");
pub const JD_ID: FieldAlias = alias("jdId", "jd_id");
pub const USER_INPUT_CV_TEXT: FieldAlias =
    alias("userInputCvTextBySection", "user_input_cv_text_by_section");
pub const USER_OR_LLM_COMMENTS: FieldAlias = alias("userOrLlmComments", "user_or_llm_comments");
pub const REQUEST_METADATA: FieldAlias = alias("requestMetadata", "request_metadata");

/// Every accepted top-level field.
pub const FIELD_ALIASES: [FieldAlias; 10] = [
    STUDENT_ID,
    TEMPLATE_ID,
    LANGUAGE,
    LANGUAGE_TONE,
    SECTIONS,
    ROLE_ID,
    JD_ID,
    USER_INPUT_CV_TEXT,
    USER_OR_LLM_COMMENTS,
    REQUEST_METADATA,
];

const MAX_STUDENT_ID_LEN: usize = 50;
const MAX_TAXONOMY_ID_LEN: usize = 200;
const MAX_SECTIONS: usize = 10;

static STUDENT_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("student id pattern"));
static TEMPLATE_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^T_[A-Z_]+_V\d+$").expect("template id pattern"));

/// Parse a raw body and normalize it.
pub fn normalize_body(body: &[u8]) -> Result<NormalizedRequest, ApiError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        let mut errors = SubErrors::new();
        errors.push("body", "json_invalid", format!("Invalid JSON: {e}"));
        ApiError::Validation(errors.into_vec())
    })?;

    match value {
        Value::Object(obj) => normalize(&obj),
        _ => {
            let mut errors = SubErrors::new();
            errors.push("body", "model_type", "Input should be a JSON object");
            Err(ApiError::Validation(errors.into_vec()))
        }
    }
}

/// Normalize an already-parsed request object.
pub fn normalize(obj: &Map<String, Value>) -> Result<NormalizedRequest, ApiError> {
    let mut errors = SubErrors::new();

    for key in obj.keys() {
        if !FIELD_ALIASES.iter().any(|a| a.camel == key || a.snake == key) {
            errors.push(key.as_str(), "extra_forbidden", "Extra inputs are not permitted");
        }
    }

    let student_id = required_id(&mut errors, obj, STUDENT_ID, |field, s, errors| {
        if s.chars().count() > MAX_STUDENT_ID_LEN {
            errors.push(
                field,
                "string_too_long",
                format!("String should have at most {MAX_STUDENT_ID_LEN} characters"),
            );
        }
        if !STUDENT_ID_PATTERN.is_match(s) {
            errors.push(
                field,
                "string_pattern_mismatch",
                format!("String should match pattern '{}'", STUDENT_ID_PATTERN.as_str()),
            );
        }
    });

    let template_id = required_id(&mut errors, obj, TEMPLATE_ID, |field, s, errors| {
        if !TEMPLATE_ID_PATTERN.is_match(s) {
            errors.push(
                field,
                "string_pattern_mismatch",
                format!("String should match pattern '{}'", TEMPLATE_ID_PATTERN.as_str()),
            );
        }
    });

    let language = enum_field::<Language>(
        &mut errors,
        obj,
        LANGUAGE,
        "Input should be 'en' or 'th'",
    );
    let language_tone = enum_field::<LanguageTone>(
        &mut errors,
        obj,
        LANGUAGE_TONE,
        "Input should be 'formal', 'neutral', 'academic', 'funny' or 'casual'",
    );

    let sections = sections_field(&mut errors, obj);
    let role_id = optional_id(&mut errors, obj, ROLE_ID);
    let jd_id = optional_id(&mut errors, obj, JD_ID);

    let user_input_cv_text_by_section = object_field(&mut errors, obj, USER_INPUT_CV_TEXT);
    let user_or_llm_comments = object_field(&mut errors, obj, USER_OR_LLM_COMMENTS);
    let request_metadata = object_field(&mut errors, obj, REQUEST_METADATA);

    if errors.is_empty() {
        if let (Some(student_id), Some(template_id), Some(language), Some(language_tone), Some(sections)) =
            (student_id, template_id, language, language_tone, sections)
        {
            return Ok(NormalizedRequest {
                student_id,
                template_id,
                language,
                language_tone,
                sections,
                role_id,
                jd_id,
                user_input_cv_text_by_section,
                pass_through: PassThrough {
                    user_or_llm_comments,
                    request_metadata,
                },
            });
        }
    }

    Err(ApiError::Validation(errors.into_vec()))
}

/// Resolve one logical field. `null` counts as absent; camelCase wins when
/// both spellings carry a value.
pub fn resolve<'a>(obj: &'a Map<String, Value>, alias: FieldAlias) -> Option<&'a Value> {
    let present = |key: &str| obj.get(key).filter(|v| !v.is_null());

    let camel = present(alias.camel);
    if alias.camel == alias.snake {
        return camel;
    }
    let snake = present(alias.snake);

    match (camel, snake) {
        (Some(c), Some(s)) => {
            if c != s {
                tracing::debug!(
                    field = alias.camel,
                    "camelCase and snake_case values disagree, using camelCase"
                );
            }
            Some(c)
        }
        (Some(c), None) => Some(c),
        (None, s) => s,
    }
}

fn required_id<F>(
    errors: &mut SubErrors,
    obj: &Map<String, Value>,
    alias: FieldAlias,
    rules: F,
) -> Option<String>
where
    F: FnOnce(&'static str, &str, &mut SubErrors),
{
    let field = alias.camel;
    match resolve(obj, alias) {
        None => {
            errors.push(field, "missing", "Field required");
            None
        }
        Some(Value::String(s)) if s.is_empty() => {
            errors.push(field, "string_too_short", "String should have at least 1 character");
            None
        }
        Some(Value::String(s)) => {
            rules(field, s, errors);
            Some(s.clone())
        }
        Some(_) => {
            errors.push(field, "string_type", "Input should be a valid string");
            None
        }
    }
}

fn optional_id(errors: &mut SubErrors, obj: &Map<String, Value>, alias: FieldAlias) -> Option<String> {
    match resolve(obj, alias) {
        None => None,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else if trimmed.chars().count() > MAX_TAXONOMY_ID_LEN {
                errors.push(
                    alias.camel,
                    "string_too_long",
                    format!("String should have at most {MAX_TAXONOMY_ID_LEN} characters"),
                );
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Some(_) => {
            errors.push(alias.camel, "string_type", "Input should be a valid string");
            None
        }
    }
}

fn enum_field<T>(
    errors: &mut SubErrors,
    obj: &Map<String, Value>,
    alias: FieldAlias,
    expected: &str,
) -> Option<T>
where
    T: std::str::FromStr + Default,
{
    match resolve(obj, alias) {
        None => Some(T::default()),
        Some(Value::String(s)) => match s.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                errors.push(alias.camel, "enum", expected);
                None
            }
        },
        Some(_) => {
            errors.push(alias.camel, "enum", expected);
            None
        }
    }
}

fn sections_field(errors: &mut SubErrors, obj: &Map<String, Value>) -> Option<Vec<String>> {
    let items = match resolve(obj, SECTIONS) {
        None => {
            return Some(Section::DEFAULTS.iter().map(|s| s.as_str().to_string()).collect());
        }
        Some(Value::Array(items)) => items,
        Some(_) => {
            errors.push(SECTIONS.camel, "list_type", "Input should be a valid list");
            return None;
        }
    };

    // Length bounds apply to the list as sent, before duplicates collapse.
    if items.is_empty() {
        errors.push(SECTIONS.camel, "too_short", "List should have at least 1 item after validation");
        return None;
    }
    if items.len() > MAX_SECTIONS {
        errors.push(
            SECTIONS.camel,
            "too_long",
            format!("List should have at most {MAX_SECTIONS} items after validation, not {}", items.len()),
        );
        return None;
    }

    let mut sections: Vec<String> = Vec::with_capacity(items.len());
    let mut valid = true;
    for (idx, item) in items.iter().enumerate() {
        match item {
            Value::String(name) => {
                if !sections.iter().any(|s| s == name) {
                    sections.push(name.clone());
                }
            }
            _ => {
                errors.push(format!("sections[{idx}]"), "string_type", "Input should be a valid string");
                valid = false;
            }
        }
    }

    valid.then_some(sections)
}

fn object_field(errors: &mut SubErrors, obj: &Map<String, Value>, alias: FieldAlias) -> Option<Document> {
    match resolve(obj, alias) {
        None => None,
        Some(Value::Object(map)) => Some(map.clone()),
        Some(_) => {
            errors.push(alias.camel, "dict_type", "Input should be a valid dictionary");
            None
        }
    }
}

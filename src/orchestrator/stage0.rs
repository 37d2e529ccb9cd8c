//! Stage-0 payload assembly.
//!
//! Cross-field rules run over the normalized request and the hydrated data;
//! every violation is collected before failing. The payload serializes in a
//! fixed field order so identical inputs produce identical bytes.

use serde::Serialize;

use crate::error::{ApiError, SubErrors};
use crate::orchestrator::taxonomy;
use crate::orchestrator::types::{Document, Language, LanguageTone, NormalizedRequest, Section};
use crate::upstream::data::UpstreamData;

/// Canonical input of the generation service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stage0Payload {
    pub user_id: String,
    pub template_id: String,
    pub cv_language: Language,
    pub language_tone: LanguageTone,
    pub sections: Vec<Section>,
    pub student_profile: Document,
    pub template_info: Document,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_role_info: Option<JobRoleInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_position_info: Option<JobPositionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jd_required_skills: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_input_cv_text_by_section: Option<Document>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_or_llm_comments: Option<Document>,
}

/// Target role taxonomy with skills flattened to names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRoleInfo {
    pub role_id: String,
    pub role_required_skills: Vec<String>,
    #[serde(flatten)]
    pub attributes: Document,
}

/// Target JD taxonomy with skills and responsibilities flattened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobPositionInfo {
    pub jd_id: String,
    pub job_required_skills: Vec<String>,
    pub job_responsibilities: Vec<String>,
    #[serde(flatten)]
    pub attributes: Document,
}

const ROLE_OWN_KEYS: [&str; 2] = ["role_id", "role_required_skills"];
const JD_OWN_KEYS: [&str; 5] = [
    "jd_id",
    "job_id",
    "job_required_skills",
    "jd_required_skills",
    "job_responsibilities",
];

/// Rules that need only the request. Run before hydration so that a bad
/// section list never costs an upstream round trip.
pub fn precheck(req: &NormalizedRequest) -> Result<(), ApiError> {
    let mut errors = SubErrors::new();
    check_sections(req, &mut errors);
    check_drafts(req, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Stage0Build(errors.into_vec()))
    }
}

/// Validate and assemble the payload. `include_comments` forwards the
/// client's `userOrLlmComments` to the generation service.
pub fn build(req: &NormalizedRequest, data: &UpstreamData, include_comments: bool) -> Result<Stage0Payload, ApiError> {
    let mut errors = SubErrors::new();

    let job_role_info = data.role_taxonomy.as_ref().map(|role| JobRoleInfo {
        role_id: role.id.clone(),
        role_required_skills: taxonomy::role_required_skills(&role.attributes),
        attributes: without(&role.attributes, &ROLE_OWN_KEYS),
    });
    if let Some(role) = &job_role_info {
        if role.role_required_skills.is_empty() {
            errors.push(
                "role_required_skills",
                "too_short",
                "role_required_skills must contain at least 1 item",
            );
        }
    }

    // Empty JD skill lists are accepted.
    let job_position_info = data.jd_taxonomy.as_ref().map(|jd| JobPositionInfo {
        jd_id: taxonomy::jd_identifier(&jd.attributes).unwrap_or_else(|| jd.id.clone()),
        job_required_skills: taxonomy::jd_required_skills(&jd.attributes),
        job_responsibilities: taxonomy::jd_responsibilities(&jd.attributes),
        attributes: without(&jd.attributes, &JD_OWN_KEYS),
    });

    let sections = check_sections(req, &mut errors);
    check_drafts(req, &mut errors);

    if !errors.is_empty() {
        let errors = errors.into_vec();
        tracing::warn!(
            student_id = %req.student_id,
            violations = errors.len(),
            "Stage-0 validation failed"
        );
        return Err(ApiError::Stage0Build(errors));
    }

    let payload = Stage0Payload {
        user_id: req.student_id.clone(),
        template_id: req.template_id.clone(),
        cv_language: req.language,
        language_tone: req.language_tone,
        sections,
        student_profile: data.student_profile.attributes.clone(),
        template_info: data.template_info.attributes.clone(),
        jd_required_skills: job_position_info.as_ref().map(|jd| jd.job_required_skills.clone()),
        job_role_info,
        job_position_info,
        user_input_cv_text_by_section: req.user_input_cv_text_by_section.clone(),
        user_or_llm_comments: if include_comments {
            req.pass_through.user_or_llm_comments.clone()
        } else {
            None
        },
    };

    tracing::info!(
        user_id = %payload.user_id,
        template_id = %payload.template_id,
        language = %payload.cv_language,
        sections = payload.sections.len(),
        "Stage-0 payload built"
    );
    Ok(payload)
}

fn check_sections(req: &NormalizedRequest, errors: &mut SubErrors) -> Vec<Section> {
    let mut sections = Vec::with_capacity(req.sections.len());
    for (idx, name) in req.sections.iter().enumerate() {
        match name.parse::<Section>() {
            Ok(section) => sections.push(section),
            Err(()) => errors.push(
                format!("sections[{idx}]"),
                "enum",
                format!("Unknown section '{name}'. Expected one of: {}", section_names()),
            ),
        }
    }
    sections
}

fn check_drafts(req: &NormalizedRequest, errors: &mut SubErrors) {
    let Some(drafts) = &req.user_input_cv_text_by_section else {
        return;
    };
    for key in drafts.keys() {
        if !req.sections.iter().any(|s| s == key) {
            errors.push(
                format!("user_input_cv_text_by_section.{key}"),
                "not_in_sections",
                format!("Draft text given for '{key}', which is not a requested section"),
            );
        }
    }
}

fn section_names() -> String {
    Section::ALL.iter().map(Section::as_str).collect::<Vec<_>>().join(", ")
}

fn without(doc: &Document, keys: &[&str]) -> Document {
    doc.iter()
        .filter(|(k, _)| !keys.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

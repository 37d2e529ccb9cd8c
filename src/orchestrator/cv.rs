//! The client-facing `cv` object derived from a generation result.
//!
//! Downstream results may use either key casing; the materialized object
//! always serializes camelCase. The full result is kept verbatim under
//! `rawGenerationResult`.

use serde::ser::{Serialize, Serializer};
use serde_json::Value;

use crate::orchestrator::types::{Document, Language, LanguageTone, NormalizedRequest};

/// Generated CV as returned to clients.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCv {
    pub job_id: Option<String>,
    pub template_id: String,
    pub language: Language,
    pub language_tone: LanguageTone,
    pub rendered_html: Option<String>,
    pub rendered_markdown: Option<String>,
    pub sections: SectionMap,
    pub metadata: GenerationMetadata,
    pub raw_generation_result: Value,
}

/// Per-section output. Section names are data and keep their casing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionMap(pub Vec<(String, SectionOutput)>);

impl SectionMap {
    pub fn get(&self, name: &str) -> Option<&SectionOutput> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

impl Serialize for SectionMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionOutput {
    pub text: String,
    pub word_count: u64,
    pub matched_jd_skills: Vec<String>,
    pub confidence_score: Option<f64>,
}

/// Pipeline metadata reported by the generation service.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    pub generated_at: Option<String>,
    pub model_version: Option<String>,
    pub tokens_used: Option<u64>,
    pub cost_estimate_usd: Option<f64>,
    pub request_id: Option<String>,
}

impl GeneratedCv {
    /// Derive the client view of `raw`. Values missing from the result fall
    /// back to what the client asked for.
    pub fn from_result(raw: Document, req: &NormalizedRequest) -> Self {
        let metadata_source = match raw.get("metadata") {
            Some(Value::Object(meta)) => meta,
            _ => &raw,
        };

        let metadata = GenerationMetadata {
            generated_at: string_at(metadata_source, &["generated_at", "generatedAt", "timestamp"]),
            model_version: string_at(metadata_source, &["model_version", "modelVersion", "model"]),
            tokens_used: lookup(metadata_source, &["tokens_used", "tokensUsed"]).and_then(Value::as_u64),
            cost_estimate_usd: lookup(metadata_source, &["cost_estimate_usd", "costEstimateUsd"])
                .and_then(Value::as_f64),
            request_id: string_at(metadata_source, &["request_id", "requestId"]),
        };

        let sections = match lookup(&raw, &["sections"]) {
            Some(Value::Object(sections)) => SectionMap(
                sections
                    .iter()
                    .filter_map(|(name, value)| section_output(value).map(|s| (name.clone(), s)))
                    .collect(),
            ),
            _ => SectionMap::default(),
        };

        GeneratedCv {
            job_id: string_at(&raw, &["job_id", "jobId"]),
            template_id: string_at(&raw, &["template_id", "templateId"]).unwrap_or_else(|| req.template_id.clone()),
            language: parsed_at(&raw, &["language"]).unwrap_or(req.language),
            language_tone: parsed_at(&raw, &["language_tone", "languageTone"]).unwrap_or(req.language_tone),
            rendered_html: string_at(&raw, &["rendered_html", "renderedHtml"]),
            rendered_markdown: string_at(&raw, &["rendered_markdown", "renderedMarkdown"]),
            sections,
            metadata,
            raw_generation_result: Value::Object(raw),
        }
    }
}

fn section_output(value: &Value) -> Option<SectionOutput> {
    match value {
        Value::String(text) => Some(SectionOutput {
            word_count: count_words(text),
            text: text.clone(),
            matched_jd_skills: Vec::new(),
            confidence_score: None,
        }),
        Value::Object(obj) => {
            let text = string_at(obj, &["text", "content"]).unwrap_or_default();
            Some(SectionOutput {
                word_count: lookup(obj, &["word_count", "wordCount"])
                    .and_then(Value::as_u64)
                    .unwrap_or_else(|| count_words(&text)),
                matched_jd_skills: lookup(obj, &["matched_jd_skills", "matchedJdSkills"])
                    .and_then(Value::as_array)
                    .map(|skills| skills.iter().filter_map(Value::as_str).map(str::to_string).collect())
                    .unwrap_or_default(),
                confidence_score: lookup(obj, &["confidence_score", "confidenceScore"]).and_then(Value::as_f64),
                text,
            })
        }
        _ => None,
    }
}

fn count_words(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

fn lookup<'a>(obj: &'a Document, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| obj.get(*k)).find(|v| !v.is_null())
}

fn string_at(obj: &Document, keys: &[&str]) -> Option<String> {
    lookup(obj, keys).and_then(Value::as_str).map(str::to_string)
}

fn parsed_at<T: std::str::FromStr>(obj: &Document, keys: &[&str]) -> Option<T> {
    lookup(obj, keys).and_then(Value::as_str).and_then(|s| s.parse().ok())
}

//! Canonical request types shared by the pipeline stages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque JSON object the engine never inspects beyond presence.
pub type Document = Map<String, Value>;

/// Supported CV generation languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Th,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::Th];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Th => "th",
        }
    }
}

/// Supported tone styles for generated CV text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageTone {
    #[default]
    Formal,
    Neutral,
    Academic,
    Funny,
    Casual,
}

impl LanguageTone {
    pub const ALL: [LanguageTone; 5] = [
        LanguageTone::Formal,
        LanguageTone::Neutral,
        LanguageTone::Academic,
        LanguageTone::Funny,
        LanguageTone::Casual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageTone::Formal => "formal",
            LanguageTone::Neutral => "neutral",
            LanguageTone::Academic => "academic",
            LanguageTone::Funny => "funny",
            LanguageTone::Casual => "casual",
        }
    }
}

/// Closed set of CV sections the generation service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    ProfileSummary,
    Skills,
    Experience,
    Education,
    Projects,
    Certifications,
    Awards,
    Extracurricular,
    Volunteering,
    Interests,
    Publications,
    Training,
    References,
    AdditionalInfo,
}

impl Section {
    pub const ALL: [Section; 14] = [
        Section::ProfileSummary,
        Section::Skills,
        Section::Experience,
        Section::Education,
        Section::Projects,
        Section::Certifications,
        Section::Awards,
        Section::Extracurricular,
        Section::Volunteering,
        Section::Interests,
        Section::Publications,
        Section::Training,
        Section::References,
        Section::AdditionalInfo,
    ];

    /// Sections generated when the client does not choose.
    pub const DEFAULTS: [Section; 6] = [
        Section::ProfileSummary,
        Section::Skills,
        Section::Experience,
        Section::Education,
        Section::Awards,
        Section::Extracurricular,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::ProfileSummary => "profile_summary",
            Section::Skills => "skills",
            Section::Experience => "experience",
            Section::Education => "education",
            Section::Projects => "projects",
            Section::Certifications => "certifications",
            Section::Awards => "awards",
            Section::Extracurricular => "extracurricular",
            Section::Volunteering => "volunteering",
            Section::Interests => "interests",
            Section::Publications => "publications",
            Section::Training => "training",
            Section::References => "references",
            Section::AdditionalInfo => "additional_info",
        }
    }
}

macro_rules! impl_str_enum {
    ($ty:ty) => {
        impl FromStr for $ty {
            type Err = ();

            /// Case-sensitive match against the wire names.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty>::ALL.into_iter().find(|v| v.as_str() == s).ok_or(())
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_str_enum!(Language);
impl_str_enum!(LanguageTone);
impl_str_enum!(Section);

/// Client request after key reconciliation and shape validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRequest {
    pub student_id: String,
    pub template_id: String,
    pub language: Language,
    pub language_tone: LanguageTone,
    /// Deduplicated, first occurrence order. Names are checked against
    /// [`Section`] by the Stage-0 builder.
    pub sections: Vec<String>,
    pub role_id: Option<String>,
    pub jd_id: Option<String>,
    pub user_input_cv_text_by_section: Option<Document>,
    pub pass_through: PassThrough,
}

/// Client-owned objects echoed verbatim on the response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassThrough {
    pub user_or_llm_comments: Option<Document>,
    pub request_metadata: Option<Document>,
}

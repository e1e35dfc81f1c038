//! Public request/response DTOs for the HTTP endpoints (serde ready).
//! Wire names stay camelCase to match the SPA; `thread_id` keeps its
//! historical snake_case spelling.

use serde::{Deserialize, Serialize};

use crate::domain::{SubjectEntry, TestBlock};

/// Body of `POST /api/v1/generate`: the full configurator payload.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateIn {
    pub edu_lang: String,
    pub class_level: String,
    pub subject_code: String,
    #[serde(default)]
    pub subject_name: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub theme: String,
    #[serde(default = "default_difficulty")]
    pub difficulty_level: i64,
    #[serde(default)]
    pub custom_settings: String,
    #[serde(default)]
    pub test_constructor: Vec<TestBlock>,
    #[serde(default, rename = "thread_id")]
    pub thread_id: Option<String>,
}

fn default_difficulty() -> i64 {
    2
}

/// Body of `POST /api/v1/thread`; the resolved textbook list is seeded into
/// the new session.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadIn {
    pub edu_lang: String,
    pub class_level: String,
    pub subject_code: String,
    #[serde(default)]
    pub author: Option<String>,
}
#[derive(Serialize)]
pub struct ThreadOut {
    #[serde(rename = "thread_id")]
    pub thread_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SubjectsQuery {
    pub lang: String,
    pub grade: String,
}
#[derive(Serialize)]
pub struct SubjectsOut {
    pub subjects: Vec<SubjectEntry>,
}

#[derive(Debug, Deserialize)]
pub struct AuthorsQuery {
    pub lang: String,
    pub grade: String,
    pub subject: String,
}
#[derive(Serialize)]
pub struct AuthorsOut {
    pub authors: Vec<String>,
}

/// Body of `POST /api/v1/message`: workspace chat forwarding.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatIn {
    pub chat_message: String,
    #[serde(default)]
    pub workspace_content: String,
}
#[derive(Serialize)]
pub struct ChatOut {
    pub reply: String,
}

/// Structured error body returned with HTTP 500.
#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

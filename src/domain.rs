//! Domain models used by the backend: question-block specs, subject catalog
//! entries, and the parsed generation result.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row of the test constructor: a homogeneous block of questions.
/// Values arrive as the SPA's select-box strings and are embedded verbatim.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestBlock {
  #[serde(default)]
  pub questions: String,
  #[serde(default)]
  pub question_type: String,
  #[serde(default)]
  pub answers_type: String,
  #[serde(default)]
  pub points: String,
}

/// Subject catalog entry derived from a reference row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubjectEntry {
  pub code: String,
  pub name: String,
}

/// Parsed model output returned to the caller.
///
/// `answers` is either a plain string or an object keyed by block label,
/// so it stays a raw JSON value. Transient; never persisted here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneratedResult {
  pub material: String,
  pub answers: Value,
  pub comments: String,
}

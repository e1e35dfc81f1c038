//! Minimal OpenAI client for our use-cases.
//!
//! Two modes: a stateless chat completion, and assistants-v2 thread runs
//! (message append, run creation, status polling, message listing). Calls
//! are instrumented and log model names, statuses, and latencies (not
//! contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short to
//! avoid PII leaks.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument};

/// Fixed polling cadence for thread runs: one status probe per tick until
/// the ceiling, then a timeout failure distinct from an API failure.
pub const RUN_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const RUN_POLL_TIMEOUT: Duration = Duration::from_secs(300);

const ASSISTANTS_BETA: (&str, &str) = ("OpenAI-Beta", "assistants=v2");
const USER_AGENT_VALUE: &str = "neurolab-backend/0.1";

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub assistant_id: String,
}

/// Classification of a run status string into the poll loop's states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
  Completed,
  Failed,
  Cancelled,
  Pending,
}

/// `succeeded` is accepted as a completion alias; everything that is not a
/// known terminal status keeps the run pending.
pub fn run_outcome(status: &str) -> RunOutcome {
  match status {
    "completed" | "succeeded" => RunOutcome::Completed,
    "failed" => RunOutcome::Failed,
    "cancelled" => RunOutcome::Cancelled,
    _ => RunOutcome::Pending,
  }
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".into());
    let assistant_id = std::env::var("OPENAI_ASSISTANT_ID").unwrap_or_default();

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(120))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, model, assistant_id })
  }

  fn request(&self, rb: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    rb.header(USER_AGENT, USER_AGENT_VALUE)
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
  }

  fn assistants_request(&self, rb: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    self.request(rb).header(ASSISTANTS_BETA.0, ASSISTANTS_BETA.1)
  }

  /// Stateless chat completion: system + prompt, one request/response.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  pub async fn chat_completion(&self, system: &str, user: &str) -> Result<Value, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature: 0.7,
    };

    let start = Instant::now();
    let res = self
      .request(self.client.post(&url))
      .json(&req)
      .send()
      .await
      .map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      return Err(format!("OpenAI HTTP {}: {}", status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, elapsed = ?start.elapsed(), "OpenAI usage");
    }
    let text = body
      .choices
      .first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();

    Ok(Value::String(text))
  }

  /// Create an empty thread; returns its id.
  #[instrument(level = "info", skip(self))]
  pub async fn create_thread(&self) -> Result<String, String> {
    let url = format!("{}/threads", self.base_url);
    let res = self
      .assistants_request(self.client.post(&url))
      .send()
      .await
      .map_err(|e| e.to_string())?;
    let body = check_response(res, "thread creation").await?;
    body
      .get("id")
      .and_then(Value::as_str)
      .map(str::to_string)
      .ok_or_else(|| "thread creation failed: response carries no id".into())
  }

  /// Append a user message to a thread.
  #[instrument(level = "info", skip(self, content), fields(%thread_id, content_len = content.len()))]
  pub async fn add_message(&self, thread_id: &str, content: &str) -> Result<(), String> {
    let url = format!("{}/threads/{}/messages", self.base_url, thread_id);
    let res = self
      .assistants_request(self.client.post(&url))
      .json(&json!({ "role": "user", "content": content }))
      .send()
      .await
      .map_err(|e| e.to_string())?;
    check_response(res, "message append").await.map(|_| ())
  }

  /// Start a run over a thread with a file-search tool hint; returns the run id.
  #[instrument(level = "info", skip(self, instructions), fields(%thread_id, assistant = %self.assistant_id))]
  pub async fn create_run(&self, thread_id: &str, instructions: &str) -> Result<String, String> {
    let url = format!("{}/threads/{}/runs", self.base_url, thread_id);
    let res = self
      .assistants_request(self.client.post(&url))
      .json(&json!({
        "assistant_id": self.assistant_id,
        "instructions": instructions,
        "tool_choice": { "type": "file_search" }
      }))
      .send()
      .await
      .map_err(|e| e.to_string())?;
    let body = check_response(res, "run creation").await?;
    body
      .get("id")
      .and_then(Value::as_str)
      .map(str::to_string)
      .ok_or_else(|| "run creation failed: response carries no id".into())
  }

  /// Fetch the current status string of a run.
  #[instrument(level = "debug", skip(self), fields(%thread_id, %run_id))]
  pub async fn run_status(&self, thread_id: &str, run_id: &str) -> Result<String, String> {
    let url = format!("{}/threads/{}/runs/{}", self.base_url, thread_id, run_id);
    let res = self
      .assistants_request(self.client.get(&url))
      .send()
      .await
      .map_err(|e| e.to_string())?;
    let body = check_response(res, "run status fetch").await?;
    Ok(body.get("status").and_then(Value::as_str).unwrap_or_default().to_string())
  }

  /// Content of the most recent assistant message in a thread. The listing
  /// is newest-first, so the first assistant entry is the reply.
  #[instrument(level = "info", skip(self), fields(%thread_id))]
  pub async fn latest_assistant_content(&self, thread_id: &str) -> Result<Value, String> {
    let url = format!("{}/threads/{}/messages", self.base_url, thread_id);
    let res = self
      .assistants_request(self.client.get(&url))
      .send()
      .await
      .map_err(|e| e.to_string())?;
    let body = check_response(res, "message listing").await?;
    body
      .get("data")
      .and_then(Value::as_array)
      .and_then(|data| {
        data
          .iter()
          .find(|m| m.get("role").and_then(Value::as_str) == Some("assistant"))
          .and_then(|m| m.get("content").cloned())
      })
      .ok_or_else(|| "assistant response missing".into())
  }

  /// Poll a run to a terminal state.
  ///
  /// Fixed-interval probes of the run status: `completed`/`succeeded`
  /// resolves to the newest assistant message content, `failed`/`cancelled`
  /// is a terminal failure naming the status, and crossing the ceiling
  /// yields a timeout error distinct from an API failure. Transport errors
  /// at any probe are terminal; nothing is retried.
  #[instrument(level = "info", skip(self, timeout, interval), fields(%thread_id, %run_id))]
  pub async fn poll_run(
    &self,
    thread_id: &str,
    run_id: &str,
    timeout: Duration,
    interval: Duration,
  ) -> Result<Value, String> {
    let start = Instant::now();
    while start.elapsed() < timeout {
      let status = self.run_status(thread_id, run_id).await?;
      info!(target: "generate", %run_id, %status, "Run status");

      match run_outcome(&status) {
        RunOutcome::Completed => return self.latest_assistant_content(thread_id).await,
        RunOutcome::Failed | RunOutcome::Cancelled => {
          return Err(format!("run ended with status: {}", status));
        }
        RunOutcome::Pending => {}
      }

      tokio::time::sleep(interval).await;
    }
    Err("timeout waiting for run result".into())
  }
}

async fn check_response(res: reqwest::Response, what: &str) -> Result<Value, String> {
  if !res.status().is_success() {
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    let msg = extract_openai_error(&body).unwrap_or(body);
    return Err(format!("{} failed: HTTP {}: {}", what, status, msg));
  }
  res.json::<Value>().await.map_err(|e| e.to_string())
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
}
#[derive(Serialize)]
struct ChatMessageReq {
  role: String,
  content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)]
  usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice {
  message: ChatMessageResp,
}
#[derive(Deserialize)]
struct ChatMessageResp {
  content: Option<String>,
}
#[derive(Deserialize)]
struct Usage {
  #[serde(default)]
  prompt_tokens: Option<u32>,
  #[serde(default)]
  completion_tokens: Option<u32>,
  #[serde(default)]
  total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap {
    error: EObj,
  }
  #[derive(Deserialize)]
  struct EObj {
    message: String,
  }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}

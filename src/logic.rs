//! Core generation pipeline shared by the HTTP handlers.
//!
//! Flow: resolve textbooks → build the prompt → call the model (thread run
//! or stateless completion) → extract the JSON payload. Handlers stay thin
//! wrappers around these functions.

use tracing::{info, instrument};

use crate::domain::GeneratedResult;
use crate::openai::{OpenAI, RUN_POLL_INTERVAL, RUN_POLL_TIMEOUT};
use crate::parser::parse_generated;
use crate::prompt::build_prompt;
use crate::protocol::{ChatIn, GenerateIn, ThreadIn};
use crate::resolver;
use crate::state::AppState;
use crate::util::{fill_template, trunc_for_log};

fn client(state: &AppState) -> Result<&OpenAI, String> {
  state
    .openai
    .as_ref()
    .ok_or_else(|| "OpenAI is not configured (OPENAI_API_KEY missing)".to_string())
}

/// Run the full generation pipeline for one request.
///
/// Data absence (unloaded table, unknown subject, sentinel cell) is not an
/// error: the prompt falls back to general knowledge. Upstream failures and
/// the polling timeout abort the request; nothing is retried, and two
/// identical requests perform two independent upstream calls.
#[instrument(level = "info", skip(state, req), fields(lang = %req.edu_lang, grade = %req.class_level, subject = %req.subject_code, threaded = req.thread_id.is_some()))]
pub async fn generate_material(state: &AppState, req: &GenerateIn) -> Result<GeneratedResult, String> {
  let oa = client(state)?;

  let textbooks = resolver::resolve(
    &state.library,
    &req.edu_lang,
    &req.class_level,
    &req.subject_code,
    req.author.as_deref(),
  );
  let prompt = build_prompt(&state.prompts, req, &textbooks);
  info!(target: "generate", textbooks = textbooks.len(), prompt_preview = %trunc_for_log(&prompt, 200), "Prompt assembled");

  let raw = match &req.thread_id {
    Some(thread_id) => {
      oa.add_message(thread_id, &prompt).await?;
      let run_id = oa.create_run(thread_id, &prompt).await?;
      info!(target: "generate", %thread_id, %run_id, "Run started");
      oa.poll_run(thread_id, &run_id, RUN_POLL_TIMEOUT, RUN_POLL_INTERVAL).await?
    }
    None => oa.chat_completion(&state.prompts.system, &prompt).await?,
  };

  Ok(parse_generated(&raw))
}

/// Create a session thread seeded with the resolved textbook list.
#[instrument(level = "info", skip(state, req), fields(lang = %req.edu_lang, grade = %req.class_level, subject = %req.subject_code))]
pub async fn open_thread(state: &AppState, req: &ThreadIn) -> Result<String, String> {
  let oa = client(state)?;

  let textbooks = resolver::resolve(
    &state.library,
    &req.edu_lang,
    &req.class_level,
    &req.subject_code,
    req.author.as_deref(),
  );
  let thread_id = oa.create_thread().await?;

  let mut seed = state.prompts.thread_seed.clone();
  if !textbooks.is_empty() {
    seed = format!("Учебники: {}\n{}", textbooks.join(", "), seed);
  }
  oa.add_message(&thread_id, &seed).await?;
  info!(target: "generate", %thread_id, textbooks = textbooks.len(), "Thread opened");
  Ok(thread_id)
}

/// Forward a workspace chat message through the stateless completion.
#[instrument(level = "info", skip(state, req), fields(message_len = req.chat_message.len()))]
pub async fn chat_reply(state: &AppState, req: &ChatIn) -> Result<String, String> {
  let oa = client(state)?;
  let user = fill_template(
    &state.prompts.chat_template,
    &[("workspace", &req.workspace_content), ("message", &req.chat_message)],
  );
  let raw = oa.chat_completion(&state.prompts.system, &user).await?;
  Ok(raw.as_str().unwrap_or_default().to_string())
}

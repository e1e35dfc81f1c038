//! HTTP endpoint handlers. These are thin wrappers that forward to core
//! logic and map pipeline failures to a structured 500 body.

use std::sync::Arc;
use axum::{
  extract::{Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{error, info, instrument};

use crate::logic;
use crate::protocol::*;
use crate::resolver;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
  Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(state), fields(lang = %q.lang, grade = %q.grade))]
pub async fn http_get_subjects(
  State(state): State<Arc<AppState>>,
  Query(q): Query<SubjectsQuery>,
) -> impl IntoResponse {
  let subjects = resolver::available_subjects(&state.library, &q.lang, &q.grade);
  info!(target: "generate", count = subjects.len(), "Subject catalog served");
  Json(SubjectsOut { subjects })
}

#[instrument(level = "info", skip(state), fields(lang = %q.lang, grade = %q.grade, subject = %q.subject))]
pub async fn http_get_authors(
  State(state): State<Arc<AppState>>,
  Query(q): Query<AuthorsQuery>,
) -> impl IntoResponse {
  let authors = resolver::authors_for(&state.library, &q.lang, &q.grade, &q.subject);
  info!(target: "generate", count = authors.len(), "Author list served");
  Json(AuthorsOut { authors })
}

#[instrument(level = "info", skip(state, body), fields(subject = %body.subject_code))]
pub async fn http_post_thread(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ThreadIn>,
) -> impl IntoResponse {
  match logic::open_thread(&state, &body).await {
    Ok(thread_id) => Json(ThreadOut { thread_id }).into_response(),
    Err(e) => {
      error!(target: "generate", error = %e, "Thread creation failed");
      fail(e)
    }
  }
}

#[instrument(level = "info", skip(state, body), fields(subject = %body.subject_code, threaded = body.thread_id.is_some()))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateIn>,
) -> impl IntoResponse {
  match logic::generate_material(&state, &body).await {
    Ok(result) => {
      info!(target: "generate", material_len = result.material.len(), "Generation served");
      Json(result).into_response()
    }
    Err(e) => {
      error!(target: "generate", error = %e, "Generation failed");
      fail(format!("generation failed: {}", e))
    }
  }
}

#[instrument(level = "info", skip(state, body), fields(message_len = body.chat_message.len()))]
pub async fn http_post_message(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ChatIn>,
) -> impl IntoResponse {
  match logic::chat_reply(&state, &body).await {
    Ok(reply) => Json(ChatOut { reply }).into_response(),
    Err(e) => {
      error!(target: "generate", error = %e, "Chat forwarding failed");
      fail(e)
    }
  }
}

fn fail(error: String) -> Response {
  (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorOut { error })).into_response()
}

//! Integration tests: the completion client's polling state machine and the
//! full generate pipeline, driven against an in-process stub of the
//! upstream API (plain axum, same stack as the server itself).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};

use neurolab_backend::openai::{OpenAI, RUN_POLL_INTERVAL};
use neurolab_backend::parser::parse_generated;
use neurolab_backend::reference::{parse_reference_table, ReferenceLibrary};
use neurolab_backend::routes::build_router;
use neurolab_backend::state::AppState;

/// Scripted upstream behavior shared by the stub handlers.
#[derive(Clone)]
struct Stub {
    /// Run statuses returned probe by probe; the last one repeats.
    statuses: Arc<Vec<&'static str>>,
    probes: Arc<AtomicUsize>,
    /// Assistant message content for the thread listing; None = no
    /// assistant message at all.
    assistant_content: Option<Value>,
    /// Reply text for /chat/completions.
    chat_reply: &'static str,
    /// Captured /chat/completions request bodies.
    captured: Arc<Mutex<Vec<Value>>>,
}

impl Stub {
    fn new(statuses: Vec<&'static str>) -> Self {
        Self {
            statuses: Arc::new(statuses),
            probes: Arc::new(AtomicUsize::new(0)),
            assistant_content: Some(json!([
                { "type": "text", "text": { "value": "{\"material\":\"Тест готов\",\"answers\":{\"Блок #1\":[\"А\"]},\"comments\":\"ок\"}" } }
            ])),
            chat_reply: "",
            captured: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn router(&self) -> Router {
        let run_stub = self.clone();
        let msg_stub = self.clone();
        let chat_stub = self.clone();

        Router::new()
            .route("/threads", post(|| async { Json(json!({ "id": "t1" })) }))
            .route("/threads/t1/runs", post(|| async { Json(json!({ "id": "r1", "status": "queued" })) }))
            .route(
                "/threads/t1/runs/r1",
                get(move || {
                    let stub = run_stub.clone();
                    async move {
                        let i = stub.probes.fetch_add(1, Ordering::SeqCst);
                        let idx = i.min(stub.statuses.len().saturating_sub(1));
                        let status = stub.statuses.get(idx).copied().unwrap_or("completed");
                        Json(json!({ "id": "r1", "status": status }))
                    }
                }),
            )
            .route(
                "/threads/t1/messages",
                post(|| async { Json(json!({ "id": "m1" })) }).get(move || {
                    let stub = msg_stub.clone();
                    async move {
                        let mut data = Vec::new();
                        if let Some(content) = &stub.assistant_content {
                            data.push(json!({ "role": "assistant", "content": content }));
                        }
                        data.push(json!({ "role": "user", "content": "seed" }));
                        Json(json!({ "data": data }))
                    }
                }),
            )
            .route(
                "/chat/completions",
                post(move |Json(body): Json<Value>| {
                    let stub = chat_stub.clone();
                    async move {
                        stub.captured.lock().unwrap().push(body);
                        Json(json!({
                            "choices": [ { "message": { "role": "assistant", "content": stub.chat_reply } } ]
                        }))
                    }
                }),
            )
    }
}

async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client_for(addr: SocketAddr) -> OpenAI {
    OpenAI {
        client: reqwest::Client::new(),
        api_key: "test-key".into(),
        base_url: format!("http://{}", addr),
        model: "gpt-4o".into(),
        assistant_id: "asst_stub".into(),
    }
}

fn fixture_library() -> ReferenceLibrary {
    ReferenceLibrary {
        kaz: None,
        rus: Some(parse_reference_table(
            "Код;Предмет;9\nBIO;Биология;BIO_9_RUS_2019_Петров_2,CHEM_9_RUS_2020_Сидоров_0\n",
        )),
    }
}

fn app_state(openai: OpenAI) -> AppState {
    AppState {
        library: fixture_library(),
        prompts: Default::default(),
        openai: Some(openai),
    }
}

#[tokio::test]
async fn run_completes_after_pending_probes() {
    let stub = Stub::new(vec!["in_progress", "in_progress", "completed"]);
    let addr = spawn(stub.router()).await;
    let oa = client_for(addr);

    let content = oa
        .poll_run("t1", "r1", Duration::from_secs(5), Duration::from_millis(10))
        .await
        .expect("run should complete");

    let result = parse_generated(&content);
    assert_eq!(result.material, "Тест готов");
    assert_eq!(result.answers, json!({ "Блок #1": ["А"] }));
    assert_eq!(result.comments, "ок");
    assert_eq!(stub.probes.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn failed_run_is_a_terminal_failure() {
    let stub = Stub::new(vec!["in_progress", "failed"]);
    let addr = spawn(stub.router()).await;
    let oa = client_for(addr);

    let err = oa
        .poll_run("t1", "r1", Duration::from_secs(5), Duration::from_millis(10))
        .await
        .expect_err("run should fail");
    assert!(err.contains("failed"), "unexpected error: {}", err);
}

#[tokio::test]
async fn cancelled_run_is_a_terminal_failure() {
    let stub = Stub::new(vec!["cancelled"]);
    let addr = spawn(stub.router()).await;
    let oa = client_for(addr);

    let err = oa
        .poll_run("t1", "r1", Duration::from_secs(5), Duration::from_millis(10))
        .await
        .expect_err("run should be cancelled");
    assert!(err.contains("cancelled"), "unexpected error: {}", err);
}

#[tokio::test]
async fn run_that_never_terminates_times_out() {
    let stub = Stub::new(vec!["in_progress"]);
    let addr = spawn(stub.router()).await;
    let oa = client_for(addr);

    let err = oa
        .poll_run("t1", "r1", Duration::from_millis(50), Duration::from_millis(10))
        .await
        .expect_err("run should time out");
    assert!(err.contains("timeout"), "unexpected error: {}", err);
}

#[tokio::test]
async fn completed_run_without_assistant_message_fails() {
    let mut stub = Stub::new(vec!["completed"]);
    stub.assistant_content = None;
    let addr = spawn(stub.router()).await;
    let oa = client_for(addr);

    let err = oa
        .poll_run("t1", "r1", Duration::from_secs(5), Duration::from_millis(10))
        .await
        .expect_err("missing assistant reply should fail");
    assert!(err.contains("assistant response missing"), "unexpected error: {}", err);
}

#[tokio::test]
async fn stateless_generate_round_trip_lists_textbooks_in_prompt() {
    let mut stub = Stub::new(vec![]);
    stub.chat_reply =
        "```json\n{\"material\":\"Сгенерированный тест\",\"answers\":{\"Блок #1\":[\"B\"]},\"comments\":\"\"}\n```";
    let upstream = spawn(stub.router()).await;

    let state = Arc::new(app_state(client_for(upstream)));
    let api = spawn(build_router(state)).await;

    let body = json!({
        "eduLang": "rus",
        "classLevel": "9",
        "subjectCode": "BIO",
        "subjectName": "Биология",
        "theme": "Клетка",
        "difficultyLevel": 2,
        "customSettings": "",
        "testConstructor": [
            { "questions": "10", "questionType": "closed", "answersType": "single", "points": "1" }
        ]
    });

    let res = reqwest::Client::new()
        .post(format!("http://{}/api/v1/generate", api))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());

    let out: Value = res.json().await.unwrap();
    assert_eq!(out["material"], "Сгенерированный тест");
    assert_eq!(out["answers"], json!({ "Блок #1": ["B"] }));
    assert_eq!(out["comments"], "");

    // The prompt forwarded upstream must list the resolved textbooks verbatim.
    let captured = stub.captured.lock().unwrap();
    assert_eq!(captured.len(), 1);
    let prompt = captured[0]["messages"][1]["content"].as_str().unwrap();
    assert!(prompt.contains("- BIO_9_RUS_2019_Петров_1"));
    assert!(prompt.contains("- BIO_9_RUS_2019_Петров_2"));
    assert!(prompt.contains("- CHEM_9_RUS_2020_Сидоров"));
    assert!(prompt.contains("Уровень сложности: Нормальный"));
}

#[tokio::test]
async fn threaded_generate_round_trip_polls_the_run() {
    let stub = Stub::new(vec!["completed"]);
    let upstream = spawn(stub.router()).await;

    let state = Arc::new(app_state(client_for(upstream)));
    let api = spawn(build_router(state)).await;

    let body = json!({
        "eduLang": "rus",
        "classLevel": "9",
        "subjectCode": "BIO",
        "subjectName": "Биология",
        "theme": "Клетка",
        "difficultyLevel": 7,
        "customSettings": "",
        "testConstructor": [],
        "thread_id": "t1"
    });

    let res = reqwest::Client::new()
        .post(format!("http://{}/api/v1/generate", api))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());

    let out: Value = res.json().await.unwrap();
    assert_eq!(out["material"], "Тест готов");
    assert_eq!(stub.probes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn thread_endpoint_returns_the_new_thread_id() {
    let stub = Stub::new(vec![]);
    let upstream = spawn(stub.router()).await;

    let state = Arc::new(app_state(client_for(upstream)));
    let api = spawn(build_router(state)).await;

    let body = json!({ "eduLang": "rus", "classLevel": "9", "subjectCode": "BIO" });
    let res = reqwest::Client::new()
        .post(format!("http://{}/api/v1/thread", api))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());

    let out: Value = res.json().await.unwrap();
    assert_eq!(out["thread_id"], "t1");
}

#[tokio::test]
async fn generate_without_openai_is_a_structured_error() {
    let state = Arc::new(AppState {
        library: fixture_library(),
        prompts: Default::default(),
        openai: None,
    });
    let api = spawn(build_router(state)).await;

    let body = json!({ "eduLang": "rus", "classLevel": "9", "subjectCode": "BIO" });
    let res = reqwest::Client::new()
        .post(format!("http://{}/api/v1/generate", api))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);

    let out: Value = res.json().await.unwrap();
    assert!(out["error"].as_str().unwrap().contains("not configured"));
}

#[tokio::test]
async fn subject_and_author_catalogs_are_served() {
    let library = ReferenceLibrary {
        kaz: None,
        rus: Some(parse_reference_table(
            "Код;Предмет;9\nBIO;Биология;BIO_9_OGN_RUS_2019_Петров_2,CHEM_9_OGN_RUS_2020_Сидоров_0\n",
        )),
    };
    let state = Arc::new(AppState {
        library,
        prompts: Default::default(),
        openai: None,
    });
    let api = spawn(build_router(state)).await;

    let res = reqwest::Client::new()
        .get(format!("http://{}/api/v1/subjects?lang=rus&grade=9", api))
        .send()
        .await
        .unwrap();
    let out: Value = res.json().await.unwrap();
    assert_eq!(out["subjects"][0]["code"], "BIO");
    assert_eq!(out["subjects"][0]["name"], "Биология");

    let res = reqwest::Client::new()
        .get(format!("http://{}/api/v1/authors?lang=rus&grade=9&subject=BIO", api))
        .send()
        .await
        .unwrap();
    let out: Value = res.json().await.unwrap();
    assert_eq!(out["authors"], json!(["Петров 2019", "Сидоров 2020"]));
}

#[tokio::test]
async fn poll_interval_constant_matches_the_contract() {
    // The production cadence is part of the external contract: 2s ticks.
    assert_eq!(RUN_POLL_INTERVAL, Duration::from_secs(2));
}

// Integration tests for the chat session against an in-process backend
use crate::{
    models::{HistoryChannel, Interaction, MatchType},
    store::{Store, StoreEvent},
    transport::{ChatSession, WizardClient},
    PatAgentError,
};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::{collections::HashMap, net::TcpListener, sync::Arc, time::Duration};
use tokio::sync::Mutex;

type Backend = Arc<Mutex<Vec<Interaction>>>;

// Test helpers
async fn answer(
    State(list): State<Backend>,
    Json(body): Json<Value>,
) -> Result<Json<Vec<Interaction>>, (StatusCode, Json<Value>)> {
    let question = body["question"].as_str().unwrap_or_default();
    if question.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "No question provided"})),
        ));
    }
    let mut list = list.lock().await;
    list.push(Interaction::new(question, format!("answer to {}", question)));
    Ok(Json(list.clone()))
}

async fn history(State(list): State<Backend>) -> Json<Vec<Interaction>> {
    Json(list.lock().await.clone())
}

async fn delete(
    State(list): State<Backend>,
    Json(body): Json<Value>,
) -> Result<Json<Vec<Interaction>>, (StatusCode, Json<Value>)> {
    let mut list = list.lock().await;
    match body["index"].as_u64().map(|i| i as usize) {
        Some(index) if index < list.len() => {
            list.remove(index);
            Ok(Json(list.clone()))
        }
        _ => Err((StatusCode::BAD_REQUEST, Json(json!({"error": "Invalid index"})))),
    }
}

async fn model(Json(body): Json<Value>) -> Json<Value> {
    assert_eq!(body["history"], "const");
    Json(json!({
        "status": "success",
        "data": {
            "timestamp": "2025-03-01 10:00:00",
            "question": body["question"],
            "answerGPT": "{\"processes\": []}",
            "PAT": ""
        }
    }))
}

async fn algorithm_details(Query(query): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    match query.get("algorithm").map(String::as_str) {
        Some("peterson") => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "data": {"id": "peterson", "matchtype": "loose match", "description": "Peterson"}
            })),
        ),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"status": "error", "message": "Algorithm not found"})),
        ),
    }
}

fn create_test_app(list: Backend) -> Router {
    Router::new()
        .route("/get_answers", post(answer))
        .route("/get_history", get(history))
        .route("/del_msg", post(delete))
        .route("/get_chatbot_model_answers", post(model))
        .route("/get_classical_algorithm_details", get(algorithm_details))
        .with_state(list)
}

fn spawn_backend(list: Backend) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = axum::Server::from_tcp(listener)
        .unwrap()
        .serve(create_test_app(list).into_make_service());
    tokio::spawn(server);
    format!("http://{}", addr)
}

fn session_for(base_url: &str) -> ChatSession {
    let client = WizardClient::builder()
        .with_base_url(base_url)
        .with_timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    ChatSession::new(client, Store::new())
}

fn seeded(questions: &[&str]) -> Backend {
    Arc::new(Mutex::new(
        questions
            .iter()
            .map(|q| Interaction::new(*q, format!("answer to {}", q)))
            .collect(),
    ))
}

#[tokio::test]
async fn test_ask_question_replaces_list_and_clears_input() {
    let base_url = spawn_backend(seeded(&["first"]));
    let session = session_for(&base_url);
    let mut events = session.store().subscribe();

    session
        .store()
        .apply(StoreEvent::QuestionEdited("x".to_string()))
        .await;
    session.ask_current_question().await.unwrap();

    let state = session.store().snapshot().await;
    assert_eq!(state.msg_list.len(), 2);
    assert_eq!(state.msg_list[1].question, "x");
    assert_eq!(state.msg_list[1].answer, "answer to x");
    assert!(!state.is_generating_answer);
    assert!(state.question.is_empty());
    assert_eq!(state.scroll_generation, 1);

    // Scroll comes after the list, flag and input updates
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert_eq!(seen.last(), Some(&StoreEvent::ScrollToBottom));
    assert!(seen.contains(&StoreEvent::GenerationStarted));
}

#[tokio::test]
async fn test_ask_question_failure_keeps_generating_flag() {
    let base_url = spawn_backend(seeded(&[]));
    let session = session_for(&base_url);

    let err = session.ask_question("").await.unwrap_err();
    assert!(matches!(err, PatAgentError::Server { status: 400, ref message } if message == "No question provided"));

    let state = session.store().snapshot().await;
    assert!(state.is_generating_answer);
    assert!(state.msg_list.is_empty());
    assert!(state.last_error.unwrap().starts_with("get_answers"));
}

#[tokio::test]
async fn test_ask_question_failure_can_reset_flag() {
    let base_url = spawn_backend(seeded(&[]));
    let session = session_for(&base_url).reset_generating_on_failure(true);

    assert!(session.ask_question("").await.is_err());
    assert!(!session.store().is_generating().await);
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    // Bind then drop so nothing listens on the port
    let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let session = session_for(&format!("http://{}", addr));

    let err = session.fetch_history().await.unwrap_err();
    assert!(matches!(err, PatAgentError::Transport(_)));
    assert!(session.store().snapshot().await.last_error.is_some());
}

#[tokio::test]
async fn test_fetch_history() {
    let base_url = spawn_backend(seeded(&["a", "b", "c"]));
    let session = session_for(&base_url);

    session.fetch_history().await.unwrap();
    let questions: Vec<_> = session
        .messages()
        .await
        .into_iter()
        .map(|i| i.question)
        .collect();
    assert_eq!(questions, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_delete_message_clears_generating() {
    let base_url = spawn_backend(seeded(&["a", "b", "c"]));
    let session = session_for(&base_url);
    session.store().apply(StoreEvent::GenerationStarted).await;

    session.delete_message(2).await.unwrap();

    let state = session.store().snapshot().await;
    assert_eq!(state.msg_list.len(), 2);
    assert!(!state.is_generating_answer);
}

#[tokio::test]
async fn test_delete_out_of_range_leaves_list() {
    let base_url = spawn_backend(seeded(&["a"]));
    let session = session_for(&base_url);
    session.fetch_history().await.unwrap();

    let err = session.delete_message(5).await.unwrap_err();
    assert!(matches!(err, PatAgentError::Server { status: 400, .. }));
    assert_eq!(session.messages().await.len(), 1);
}

#[tokio::test]
async fn test_spawned_operations_complete_through_store() {
    let base_url = spawn_backend(seeded(&["a"]));
    let session = session_for(&base_url);

    session.spawn_ask_question("b").await.unwrap().unwrap();
    session.spawn_delete_message(0).await.unwrap().unwrap();
    session.spawn_fetch_history().await.unwrap().unwrap();

    let messages = session.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].question, "b");
}

#[tokio::test]
async fn test_concurrent_questions_all_recorded() {
    let backend = seeded(&[]);
    let base_url = spawn_backend(backend.clone());
    let session = session_for(&base_url);

    let results = futures::future::join_all(
        ["one", "two", "three"].map(|q| session.spawn_ask_question(q)),
    )
    .await;
    for result in results {
        result.unwrap().unwrap();
    }

    assert_eq!(backend.lock().await.len(), 3);
    assert!(!session.store().is_generating().await);
}

#[tokio::test]
async fn test_ask_model_unwraps_envelope() {
    let base_url = spawn_backend(seeded(&[]));
    let client = WizardClient::builder().with_base_url(base_url).build().unwrap();

    let interaction = client
        .ask_model("extract tables", HistoryChannel::Const)
        .await
        .unwrap();
    assert_eq!(interaction.question, "extract tables");
    assert_eq!(interaction.answer, "{\"processes\": []}");
}

#[tokio::test]
async fn test_fetch_algorithm_details() {
    let base_url = spawn_backend(seeded(&[]));
    let client = WizardClient::builder().with_base_url(base_url).build().unwrap();

    let entry = client.fetch_algorithm_details("peterson").await.unwrap();
    assert_eq!(entry.id, "peterson");
    assert_eq!(entry.match_type, MatchType::Loose);

    match client.fetch_algorithm_details("dining").await {
        Err(PatAgentError::Server { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "Algorithm not found");
        }
        other => panic!("expected a 404, got {:?}", other),
    }
}

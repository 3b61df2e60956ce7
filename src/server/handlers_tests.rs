// Integration tests for the backend handlers
use crate::{
    llm::{
        ChatMessage, Choice, LLMError, LLMProviderClient, LLMProviderType, LLMRequest,
        LLMResponse, LLMResult, TokenUsage,
    },
    models::{AlgorithmReference, HistoryChannel, Interaction, MatchType, RetrievedExample},
    server::{
        create_router, AlgorithmCatalog, ExampleIndex, HistoryStorage, InMemoryHistory,
        ServerState,
    },
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};
use tower::ServiceExt;

// Test helpers

/// Answers prompts from a fixed script and remembers what it was asked
struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        })
    }

    /// Like `new`, but every answer takes `delay`
    fn slow(replies: &[&str], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
            delay: Some(delay),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProviderClient for ScriptedProvider {
    async fn chat_completion(&self, request: &LLMRequest) -> LLMResult<LLMResponse> {
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt);

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LLMError::Network("script exhausted".to_string()))?;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(LLMResponse {
            id: request.id.to_string(),
            model: request.model.clone(),
            choices: vec![Choice {
                index: 0,
                message: ChatMessage {
                    role: crate::llm::MessageRole::Assistant,
                    content: reply,
                },
                finish_reason: Some("stop".to_string()),
            }],
            usage: TokenUsage::default(),
            provider: LLMProviderType::Custom("scripted".to_string()),
        })
    }

    fn provider_type(&self) -> LLMProviderType {
        LLMProviderType::Custom("scripted".to_string())
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }
}

fn state_with(history: Arc<InMemoryHistory>, provider: Option<Arc<ScriptedProvider>>) -> ServerState {
    let mut state = ServerState::new(history);
    state.llm = provider.map(|p| p as Arc<dyn LLMProviderClient>);
    state
}

fn create_test_app(state: ServerState) -> Router {
    create_router(state, true)
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
        Value::String(String::from_utf8_lossy(&bytes).to_string())
    });
    (status, value)
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app(state_with(Arc::new(InMemoryHistory::new()), None));
    let (status, body) = send(app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("running"));
}

#[tokio::test]
async fn test_get_answers_appends_and_returns_full_list() {
    let history = Arc::new(InMemoryHistory::with_interactions(
        HistoryChannel::Default,
        vec![Interaction::new("earlier", "before")],
    ));
    let provider = ScriptedProvider::new(&["Two processes share x."]);
    let app = create_test_app(state_with(history.clone(), Some(provider.clone())));

    let (status, body) = send(
        app,
        Method::POST,
        "/get_answers",
        Some(json!({"question": "What does the model do?"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let list: Vec<Interaction> = serde_json::from_value(body).unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[1].question, "What does the model do?");
    assert_eq!(list[1].answer, "Two processes share x.");
    assert_eq!(provider.prompts(), vec!["What does the model do?"]);
    assert_eq!(history.load(HistoryChannel::Default).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_get_answers_context_reaches_the_model() {
    let provider = ScriptedProvider::new(&["ok"]);
    let app = create_test_app(state_with(Arc::new(InMemoryHistory::new()), Some(provider.clone())));

    let (status, body) = send(
        app,
        Method::POST,
        "/get_answers",
        Some(json!({"question": "Explain", "context": {"stage": 3}})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["context"]["stage"], 3);
    assert!(provider.prompts()[0].contains("\"stage\":3"));
}

#[tokio::test]
async fn test_get_answers_rejects_empty_question() {
    let provider = ScriptedProvider::new(&[]);
    let app = create_test_app(state_with(Arc::new(InMemoryHistory::new()), Some(provider.clone())));

    let (status, body) = send(app, Method::POST, "/get_answers", Some(json!({"question": "  "}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No question provided"}));
    assert!(provider.prompts().is_empty());
}

#[tokio::test]
async fn test_model_endpoints_without_provider_are_unavailable() {
    let app = create_test_app(state_with(Arc::new(InMemoryHistory::new()), None));
    let (status, body) = send(app, Method::POST, "/get_answers", Some(json!({"question": "hi"}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("No language model"));
}

#[tokio::test]
async fn test_provider_failure_is_bad_gateway() {
    let provider = ScriptedProvider::new(&[]);
    let app = create_test_app(state_with(Arc::new(InMemoryHistory::new()), Some(provider)));
    let (status, _) = send(app, Method::POST, "/get_answers", Some(json!({"question": "hi"}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_get_history_by_channel() {
    let history = Arc::new(InMemoryHistory::new());
    history
        .append(HistoryChannel::Default, Interaction::new("chat", "reply"))
        .await
        .unwrap();
    history
        .append(HistoryChannel::Const, Interaction::new("tables", "{}"))
        .await
        .unwrap();
    let app = create_test_app(state_with(history, None));

    let (status, body) = send(app.clone(), Method::GET, "/get_history", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["question"], "chat");

    let (_, body) = send(app.clone(), Method::GET, "/get_history?channel=const", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["question"], "tables");

    let (_, body) = send(app, Method::GET, "/get_history?channel=assertion", None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_del_msg_removes_by_index() {
    let history = Arc::new(InMemoryHistory::with_interactions(
        HistoryChannel::Default,
        vec![Interaction::new("a", "1"), Interaction::new("b", "2")],
    ));
    let app = create_test_app(state_with(history, None));

    let (status, body) = send(app, Method::POST, "/del_msg", Some(json!({"index": 0}))).await;
    assert_eq!(status, StatusCode::OK);
    let list: Vec<Interaction> = serde_json::from_value(body).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].question, "b");
}

#[tokio::test]
async fn test_del_msg_invalid_index() {
    let history = Arc::new(InMemoryHistory::with_interactions(
        HistoryChannel::Default,
        vec![Interaction::new("a", "1")],
    ));
    let app = create_test_app(state_with(history.clone(), None));

    for body in [json!({"index": 1}), json!({}), json!({"index": -1}), json!({"index": "0"})] {
        let (status, answer) = send(app.clone(), Method::POST, "/del_msg", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(answer, json!({"error": "Invalid index"}));
    }
    assert_eq!(history.load(HistoryChannel::Default).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_model_answers_recorded_in_channel() {
    let history = Arc::new(InMemoryHistory::new());
    let provider = ScriptedProvider::new(&["{\"processes\": []}", "fine"]);
    let app = create_test_app(state_with(history.clone(), Some(provider)));

    let (status, body) = send(
        app.clone(),
        Method::POST,
        "/get_chatbot_model_answers",
        Some(json!({"question": "extract tables", "history": "const"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["answerGPT"], "{\"processes\": []}");
    assert_eq!(history.load(HistoryChannel::Const).await.unwrap().len(), 1);

    let (status, _) = send(
        app,
        Method::POST,
        "/get_chatbot_model_answers",
        Some(json!({"question": "classify", "history": "skip"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(history.load(HistoryChannel::Skip).await.unwrap().is_empty());
    assert!(history.load(HistoryChannel::Default).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_classical_algorithms() {
    let mut state = state_with(Arc::new(InMemoryHistory::new()), None);
    state.catalog = Arc::new(AlgorithmCatalog::new(vec![AlgorithmReference::new(
        "dining_philosophers",
        MatchType::Loose,
        "Dining philosophers",
    )]));
    let app = create_test_app(state);

    let (status, body) = send(app, Method::GET, "/get_classical_algorithms", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"][0]["id"], "dining_philosophers");
    assert_eq!(body["data"][0]["matchtype"], "loose match");
}

#[tokio::test]
async fn test_get_most_relevant_example() {
    let mut state = state_with(Arc::new(InMemoryHistory::new()), None);
    state.examples = Arc::new(ExampleIndex::new(vec![
        RetrievedExample {
            nl: "A philosopher takes two forks".to_string(),
            code: "Phil()".to_string(),
        },
        RetrievedExample {
            nl: "The owner opens the car door".to_string(),
            code: "Owner()".to_string(),
        },
    ]));
    let app = create_test_app(state);

    let (status, body) = send(
        app,
        Method::POST,
        "/get_most_relevant_example",
        Some(json!({"instruction": "car door owner"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "Owner()");
}

#[tokio::test]
async fn test_most_relevant_example_without_database() {
    let app = create_test_app(state_with(Arc::new(InMemoryHistory::new()), None));
    let (status, body) = send(
        app,
        Method::POST,
        "/get_most_relevant_example",
        Some(json!({"instruction": "anything"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "No examples available");
}

#[tokio::test]
async fn test_add_new_classical_algorithm() {
    let provider = ScriptedProvider::new(&[
        "This model simulates a car system composed of 2 interacting components: owner, key.",
        " Car_Owner-Key ",
        "Car owner with key",
    ]);
    let mut state = state_with(Arc::new(InMemoryHistory::new()), Some(provider.clone()));
    let catalog = Arc::new(AlgorithmCatalog::default());
    state.catalog = catalog.clone();
    let app = create_test_app(state);

    let (status, body) = send(
        app,
        Method::POST,
        "/add_new_classical_algorithm",
        Some(json!({"code": "Owner() = unlock -> Owner();"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["newEntry"]["id"], "car_ownerkey");
    assert_eq!(body["newEntry"]["matchtype"], "exact match");

    let entry = catalog.get("car_ownerkey").await.unwrap();
    assert_eq!(entry.name, "Car owner with key");
    assert_eq!(entry.implementation, "Owner() = unlock -> Owner();");
    assert!(provider.prompts()[0].contains("Owner() = unlock -> Owner();"));
}

#[tokio::test]
async fn test_add_new_classical_algorithm_requires_code() {
    let app = create_test_app(state_with(Arc::new(InMemoryHistory::new()), None));
    let (status, body) = send(
        app,
        Method::POST,
        "/add_new_classical_algorithm",
        Some(json!({"code": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"status": "error", "message": "No code provided"}));
}

#[tokio::test]
async fn test_add_new_classical_algorithm_rejects_duplicate_id() {
    let provider = ScriptedProvider::new(&["A door.", "door"]);
    let mut state = state_with(Arc::new(InMemoryHistory::new()), Some(provider));
    state.catalog = Arc::new(AlgorithmCatalog::new(vec![AlgorithmReference::new(
        "door",
        MatchType::Exact,
        "A door",
    )]));
    let app = create_test_app(state);

    let (status, body) = send(
        app,
        Method::POST,
        "/add_new_classical_algorithm",
        Some(json!({"code": "Door() = open -> Door();"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_concurrent_adds_store_one_entry() {
    let provider = ScriptedProvider::slow(&["dup_id"; 6], Duration::from_millis(20));
    let mut state = state_with(Arc::new(InMemoryHistory::new()), Some(provider));
    let catalog = Arc::new(AlgorithmCatalog::default());
    state.catalog = catalog.clone();
    let app = create_test_app(state);

    let ((first, _), (second, _)) = tokio::join!(
        send(
            app.clone(),
            Method::POST,
            "/add_new_classical_algorithm",
            Some(json!({"code": "A() = a -> A();"})),
        ),
        send(
            app,
            Method::POST,
            "/add_new_classical_algorithm",
            Some(json!({"code": "B() = b -> B();"})),
        ),
    );

    let mut statuses = vec![first, second];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);
    let ids: Vec<String> = catalog.entries().await.into_iter().map(|e| e.id).collect();
    assert_eq!(ids, vec!["dup_id".to_string()]);
}

#[tokio::test]
async fn test_get_classical_algorithm_details() {
    let mut state = state_with(Arc::new(InMemoryHistory::new()), None);
    let mut peterson = AlgorithmReference::new("peterson", MatchType::Loose, "Peterson's mutual exclusion");
    peterson.implementation = "var turn = 0;".to_string();
    state.catalog = Arc::new(AlgorithmCatalog::new(vec![peterson]));
    let app = create_test_app(state);

    let (status, body) = send(
        app.clone(),
        Method::GET,
        "/get_classical_algorithm_details?algorithm=peterson",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["id"], "peterson");
    assert_eq!(body["data"]["implementation"], "var turn = 0;");

    let (status, body) = send(
        app.clone(),
        Method::GET,
        "/get_classical_algorithm_details?algorithm=dining",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"status": "error", "message": "Algorithm not found"}));

    let (status, _) = send(app, Method::GET, "/get_classical_algorithm_details", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

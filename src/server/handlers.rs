// HTTP handlers for the reference backend
// Each handler answers one of the endpoints the wizard client calls

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::{AlgorithmCatalog, ExampleIndex, HistoryStorage};
use crate::llm::LLMProviderClient;
use crate::models::{AlgorithmReference, HistoryChannel, Interaction, MatchType, RetrievedExample};
use crate::prompts;
use crate::PatAgentError;

/// Shared application state for the backend
#[derive(Clone)]
pub struct ServerState {
    pub history: Arc<dyn HistoryStorage>,
    pub llm: Option<Arc<dyn LLMProviderClient>>,
    pub catalog: Arc<AlgorithmCatalog>,
    pub examples: Arc<ExampleIndex>,
    pub max_tokens: Option<u32>,
}

impl ServerState {
    pub fn new(history: Arc<dyn HistoryStorage>) -> Self {
        Self {
            history,
            llm: None,
            catalog: Arc::new(AlgorithmCatalog::default()),
            examples: Arc::new(ExampleIndex::default()),
            max_tokens: None,
        }
    }

    /// Send one prompt to the configured provider
    async fn complete(&self, prompt: &str) -> Result<String, ApiError> {
        let llm = self.llm.as_ref().ok_or_else(|| {
            ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "No language model configured")
        })?;
        let answer = llm
            .complete(prompt, self.max_tokens)
            .await
            .map_err(PatAgentError::from)?;
        Ok(answer)
    }
}

/// Error answer sent as `{"error": message}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// The `{status: "error", message}` shape used by the catalog endpoints
    fn into_status_response(self) -> Response {
        (
            self.status,
            Json(json!({"status": "error", "message": self.message})),
        )
            .into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({"error": self.message}))).into_response()
    }
}

impl From<PatAgentError> for ApiError {
    fn from(err: PatAgentError) -> Self {
        let status = match &err {
            PatAgentError::Llm(_) => StatusCode::BAD_GATEWAY,
            PatAgentError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PatAgentError::NotFound(_) => StatusCode::NOT_FOUND,
            PatAgentError::Conflict(_) => StatusCode::CONFLICT,
            PatAgentError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error!("Request failed ({}): {}", status, err);
        Self::new(status, err.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub context: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ModelQuestionRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub history: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub channel: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AlgorithmQuery {
    #[serde(default)]
    pub algorithm: String,
}

#[derive(Debug, Deserialize)]
pub struct InstructionRequest {
    #[serde(default)]
    pub instruction: String,
}

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    #[serde(default)]
    pub code: String,
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "PAT Agent server is running")
}

/// `POST /get_answers`: answer a chat question and return the full default history
pub async fn get_answers(
    State(state): State<ServerState>,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<Vec<Interaction>>, ApiError> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(ApiError::bad_request("No question provided"));
    }

    let prompt = match &request.context {
        Some(context) => format!("{}\n\nContext:\n{}", question, context),
        None => question.to_string(),
    };
    let answer = state.complete(&prompt).await?;

    let mut interaction = Interaction::new(question, answer);
    if let Some(context) = request.context {
        interaction = interaction.with_context(context);
    }
    let list = state
        .history
        .append(HistoryChannel::Default, interaction)
        .await?;
    debug!("Default history now holds {} interactions", list.len());
    Ok(Json(list))
}

/// `GET /get_history[?channel=label]`
pub async fn get_history(
    State(state): State<ServerState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Interaction>>, ApiError> {
    let channel = query
        .channel
        .as_deref()
        .map(HistoryChannel::from_label)
        .unwrap_or(HistoryChannel::Default);
    Ok(Json(state.history.load(channel).await?))
}

/// `POST /del_msg {index}`
pub async fn del_msg(
    State(state): State<ServerState>,
    Json(body): Json<Value>,
) -> Result<Json<Vec<Interaction>>, ApiError> {
    let index = body
        .get("index")
        .and_then(Value::as_u64)
        .ok_or_else(|| ApiError::bad_request("Invalid index"))?;

    match state
        .history
        .delete(HistoryChannel::Default, index as usize)
        .await?
    {
        Some(list) => Ok(Json(list)),
        None => Err(ApiError::bad_request("Invalid index")),
    }
}

/// `POST /get_chatbot_model_answers {question, history}`: run one wizard prompt
pub async fn get_chatbot_model_answers(
    State(state): State<ServerState>,
    Json(request): Json<ModelQuestionRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.question.trim().is_empty() {
        return Err(ApiError::bad_request("No question provided"));
    }
    let channel = request
        .history
        .as_deref()
        .map(HistoryChannel::from_label)
        .unwrap_or(HistoryChannel::Default);

    let answer = state.complete(&request.question).await?;
    let interaction = Interaction::new(request.question, answer);
    state.history.append(channel, interaction.clone()).await?;
    debug!("Model answer recorded in {} channel", channel);

    Ok(Json(json!({"status": "success", "data": interaction})))
}

/// `GET /get_classical_algorithms`
pub async fn get_classical_algorithms(State(state): State<ServerState>) -> Json<Value> {
    Json(json!({"status": "success", "data": state.catalog.entries().await}))
}

/// `GET /get_classical_algorithm_details?algorithm=<id>`
pub async fn get_classical_algorithm_details(
    State(state): State<ServerState>,
    Query(query): Query<AlgorithmQuery>,
) -> Response {
    match state.catalog.get(query.algorithm.trim()).await {
        Some(entry) => Json(json!({"status": "success", "data": entry})).into_response(),
        None => ApiError::new(StatusCode::NOT_FOUND, "Algorithm not found").into_status_response(),
    }
}

/// `POST /get_most_relevant_example {instruction}` → `{nl, code}`
pub async fn get_most_relevant_example(
    State(state): State<ServerState>,
    Json(request): Json<InstructionRequest>,
) -> Result<Json<RetrievedExample>, ApiError> {
    state
        .examples
        .most_relevant(&request.instruction)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "No examples available"))
}

/// `POST /add_new_classical_algorithm {code}`: describe, name and store a finished model
pub async fn add_new_classical_algorithm(
    State(state): State<ServerState>,
    Json(request): Json<CodeRequest>,
) -> Response {
    match register_algorithm(&state, &request.code).await {
        Ok(entry) => Json(json!({"status": "success", "newEntry": entry})).into_response(),
        Err(err) => err.into_status_response(),
    }
}

async fn register_algorithm(state: &ServerState, code: &str) -> Result<AlgorithmReference, ApiError> {
    if code.trim().is_empty() {
        return Err(ApiError::bad_request("No code provided"));
    }

    let description = state.complete(&prompts::describe_code(code)).await?;
    let description = description.trim().to_string();
    let id = prompts::sanitize_algorithm_id(
        &state.complete(&prompts::name_algorithm_id(&description)).await?,
    );
    if id.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_GATEWAY,
            "Model returned an empty algorithm id",
        ));
    }
    if state.catalog.get(&id).await.is_some() {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            format!("Algorithm {} already exists", id),
        ));
    }
    let name = state.complete(&prompts::name_algorithm(&description)).await?;

    let mut entry = AlgorithmReference::new(id, MatchType::Exact, description);
    entry.name = name.trim().to_string();
    entry.implementation = code.to_string();
    state.catalog.add(entry.clone()).await?;

    info!("Added algorithm {} to the catalog", entry.id);
    Ok(entry)
}

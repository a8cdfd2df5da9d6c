//! JSON API over estimator sessions.
//!
//! - `GET   /api/v1/pricing`                            pricing table, milestones, usd rate
//! - `POST  /api/v1/sessions`                           create a session
//! - `GET   /api/v1/sessions/{id}`                      selections, quote, chat state
//! - `DELETE /api/v1/sessions/{id}`                     drop a session
//! - `PATCH /api/v1/sessions/{id}/selections`           strict user edit
//! - `GET   /api/v1/sessions/{id}/quote`                quote in `ngn` or `usd`
//! - `POST  /api/v1/sessions/{id}/chat/open`            seed the welcome message
//! - `POST  /api/v1/sessions/{id}/chat`                 submit a chat message
//! - `POST  /api/v1/sessions/{id}/chat/pricing-choice`  resolve the pricing prompt
//! - `POST  /api/v1/sessions/{id}/discuss`              send the estimate to chat
//! - `GET   /api/v1/sessions/{id}/transcript`           text, html or download
//!
//! Chat turns run on their own task, so a client that disconnects mid-reply
//! does not cancel the completion or the selection patch it carries.

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use rust_decimal::Decimal;
use scopewise_agent::conversation::{download_file_name, ChatMessage};
use scopewise_agent::runtime::{
    AgentRuntime, ChatSession, PricingChoice, SessionSnapshot, SubmitError, TurnOutcome,
};
use scopewise_core::domain::selections::{Selections, SelectionsPatch};
use scopewise_core::errors::{ApplicationError, InterfaceError};
use scopewise_core::pricing::currency::Currency;
use scopewise_core::pricing::milestones::MilestoneSchedule;
use scopewise_core::pricing::{CostComponent, PricingTable, QuoteEngine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::sessions::SessionRegistry;

#[derive(Clone)]
pub struct ApiState {
    pub runtime: Arc<AgentRuntime>,
    pub sessions: SessionRegistry,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/pricing", get(pricing))
        .route("/api/v1/sessions", post(create_session))
        .route("/api/v1/sessions/{id}", get(get_session).delete(delete_session))
        .route("/api/v1/sessions/{id}/selections", patch(update_selections))
        .route("/api/v1/sessions/{id}/quote", get(get_quote))
        .route("/api/v1/sessions/{id}/chat/open", post(open_chat))
        .route("/api/v1/sessions/{id}/chat", post(submit_chat))
        .route("/api/v1/sessions/{id}/chat/pricing-choice", post(pricing_choice))
        .route("/api/v1/sessions/{id}/discuss", post(discuss))
        .route("/api/v1/sessions/{id}/transcript", get(transcript))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("session `{0}` was not found")]
    SessionNotFound(Uuid),
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error(transparent)]
    Interface(#[from] InterfaceError),
    #[error("chat turn task failed: {0}")]
    TurnAborted(#[from] JoinError),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidBody(_) | Self::Submit(SubmitError::EmptyMessage) => {
                StatusCode::BAD_REQUEST
            }
            Self::Submit(SubmitError::Busy) => StatusCode::CONFLICT,
            Self::Interface(InterfaceError::BadRequest { .. }) => StatusCode::BAD_REQUEST,
            Self::Interface(InterfaceError::Internal { .. }) | Self::TurnAborted(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn class(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "not_found",
            Self::InvalidBody(_) => "invalid_body",
            Self::Submit(SubmitError::Busy) => "busy",
            Self::Submit(SubmitError::EmptyMessage) => "empty_message",
            Self::Interface(InterfaceError::BadRequest { .. }) => "invalid_selection",
            Self::Interface(InterfaceError::Internal { .. }) | Self::TurnAborted(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, correlation_id) = match &self {
            Self::Interface(error @ InterfaceError::Internal { .. }) => {
                (error.user_message().to_string(), Some(error.correlation_id().to_string()))
            }
            Self::Interface(error) => (error.to_string(), Some(error.correlation_id().to_string())),
            other => (other.to_string(), None),
        };
        if status.is_server_error() {
            warn!(event_name = "server.api.error", status = %status, error = %self, "request failed");
        }
        (status, Json(ErrorBody { error: self.class().to_string(), message, correlation_id }))
            .into_response()
    }
}

fn correlation_id() -> String {
    Uuid::new_v4().to_string()
}

async fn find_session(state: &ApiState, id: Uuid) -> Result<Arc<ChatSession>, ApiError> {
    state.sessions.get(id).await.ok_or(ApiError::SessionNotFound(id))
}

async fn detach<F>(turn: F) -> Result<TurnOutcome, ApiError>
where
    F: Future<Output = Result<TurnOutcome, SubmitError>> + Send + 'static,
{
    Ok(tokio::spawn(turn).await??)
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct PricingResponse {
    pub table: PricingTable,
    pub milestones: MilestoneSchedule,
    pub usd_rate: Decimal,
}

#[derive(Debug, Serialize)]
pub struct MilestoneView {
    pub phase: String,
    pub label: String,
    pub description: String,
    pub amount: Decimal,
    pub amount_display: String,
}

#[derive(Debug, Serialize)]
pub struct QuoteView {
    pub currency: Currency,
    /// Always NGN; `total_display` carries the converted figure.
    pub total: Decimal,
    pub total_display: String,
    pub milestones: Vec<MilestoneView>,
    pub breakdown: Vec<CostComponent>,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: SessionSnapshot,
    pub quote: QuoteView,
}

fn quote_view(runtime: &AgentRuntime, selections: &Selections, currency: Currency) -> QuoteView {
    let quote = runtime.engine().quote(selections);
    let formatter = runtime.formatter();
    QuoteView {
        currency,
        total: quote.total,
        total_display: formatter.format(quote.total, currency),
        milestones: quote
            .milestones
            .into_iter()
            .map(|milestone| MilestoneView {
                amount_display: formatter.format(milestone.amount, currency),
                phase: milestone.phase,
                label: milestone.label,
                description: milestone.description,
                amount: milestone.amount,
            })
            .collect(),
        breakdown: quote.breakdown,
    }
}

fn session_view(runtime: &AgentRuntime, session: &ChatSession) -> SessionView {
    let snapshot = session.snapshot();
    let quote = quote_view(runtime, &snapshot.state.selections, Currency::Ngn);
    SessionView { session: snapshot, quote }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn pricing(State(state): State<ApiState>) -> Json<PricingResponse> {
    let engine = state.runtime.engine();
    Json(PricingResponse {
        table: engine.table().clone(),
        milestones: engine.schedule().clone(),
        usd_rate: state.runtime.formatter().usd_rate(),
    })
}

pub async fn create_session(State(state): State<ApiState>) -> (StatusCode, Json<SessionView>) {
    let session = state.sessions.create().await;
    (StatusCode::CREATED, Json(session_view(&state.runtime, &session)))
}

pub async fn get_session(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let session = find_session(&state, id).await?;
    Ok(Json(session_view(&state.runtime, &session)))
}

pub async fn delete_session(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound(id))
    }
}

pub async fn update_selections(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> Result<Json<SessionView>, ApiError> {
    let session = find_session(&state, id).await?;
    let edit = serde_json::from_value::<SelectionsPatch>(body)
        .map_err(|error| ApiError::InvalidBody(error.to_string()))?;

    let correlation_id = correlation_id();
    let updated = session
        .store()
        .update(&edit)
        .map_err(|error| ApplicationError::from(error).into_interface(correlation_id.as_str()))?;
    info!(
        event_name = "server.selections.updated",
        correlation_id = %correlation_id,
        session_id = %id,
        revision = updated.revision,
        changed = ?updated.changed,
        "user edited selections"
    );
    Ok(Json(session_view(&state.runtime, &session)))
}

#[derive(Debug, Default, Deserialize)]
pub struct QuoteQuery {
    pub currency: Option<Currency>,
}

pub async fn get_quote(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<QuoteView>, ApiError> {
    let session = find_session(&state, id).await?;
    let selections = session.store().selections();
    Ok(Json(quote_view(&state.runtime, &selections, query.currency.unwrap_or_default())))
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<ChatMessage>,
}

pub async fn open_chat(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let session = find_session(&state, id).await?;
    Ok(Json(MessagesResponse { messages: state.runtime.open(&session) }))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

pub async fn submit_chat(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<TurnOutcome>, ApiError> {
    let session = find_session(&state, id).await?;
    let runtime = Arc::clone(&state.runtime);
    let outcome = detach(async move { runtime.submit(&session, &request.message).await }).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct PricingChoiceRequest {
    pub choice: PricingChoice,
}

pub async fn pricing_choice(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(request): Json<PricingChoiceRequest>,
) -> Result<Json<TurnOutcome>, ApiError> {
    let session = find_session(&state, id).await?;
    let runtime = Arc::clone(&state.runtime);
    let outcome =
        detach(async move { runtime.choose_pricing_option(&session, request.choice).await })
            .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Default, Deserialize)]
pub struct DiscussRequest {
    #[serde(default)]
    pub currency: Currency,
}

pub async fn discuss(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(request): Json<DiscussRequest>,
) -> Result<Json<TurnOutcome>, ApiError> {
    let session = find_session(&state, id).await?;
    let runtime = Arc::clone(&state.runtime);
    let outcome =
        detach(async move { runtime.discuss_estimate(&session, request.currency).await }).await?;
    Ok(Json(outcome))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptFormat {
    #[default]
    Text,
    Html,
    Download,
}

#[derive(Debug, Default, Deserialize)]
pub struct TranscriptQuery {
    #[serde(default)]
    pub format: TranscriptFormat,
}

pub async fn transcript(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Query(query): Query<TranscriptQuery>,
) -> Result<Response, ApiError> {
    let session = find_session(&state, id).await?;
    let advisor = state.runtime.advisor_name();
    let transcript = session.transcript();

    let response = match query.format {
        TranscriptFormat::Text => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            transcript.to_plain_text(advisor),
        )
            .into_response(),
        TranscriptFormat::Html => {
            let correlation_id = correlation_id();
            let html = transcript.to_print_html(advisor).map_err(|error| {
                ApplicationError::Configuration(error.to_string())
                    .into_interface(correlation_id.as_str())
            })?;
            Html(html).into_response()
        }
        TranscriptFormat::Download => (
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", download_file_name(advisor)),
                ),
            ],
            transcript.to_plain_text(advisor),
        )
            .into_response(),
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        extract::{Path, State},
        http::{header, Request, StatusCode},
        Router,
    };
    use scopewise_agent::llm::{CompletionRequest, LlmClient, ScriptedLlmClient};
    use scopewise_agent::runtime::{AgentRuntime, SubmitError};
    use scopewise_core::config::AppConfig;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::{get_session, router, ApiError, ApiState};
    use crate::sessions::SessionRegistry;

    fn state(replies: &[&str]) -> (ApiState, Arc<ScriptedLlmClient>) {
        let client = Arc::new(ScriptedLlmClient::new(replies.iter().copied()));
        (state_with(client.clone()), client)
    }

    fn state_with(client: Arc<dyn LlmClient>) -> ApiState {
        let mut config = AppConfig::default();
        config.chat.calculating_min_ms = 0;
        config.chat.calculating_max_ms = 0;
        let runtime = AgentRuntime::from_config(&config, client).expect("runtime");
        ApiState { runtime: Arc::new(runtime), sessions: SessionRegistry::default() }
    }

    struct SlowClient {
        delay: Duration,
        reply: &'static str,
    }

    #[async_trait]
    impl LlmClient for SlowClient {
        async fn complete(&self, _request: &CompletionRequest) -> anyhow::Result<String> {
            tokio::time::sleep(self.delay).await;
            Ok(self.reply.to_string())
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder().method(method).uri(uri).body(Body::empty()).expect("request")
    }

    async fn create(app: &Router) -> String {
        let (status, body) = send(app, empty_request("POST", "/api/v1/sessions")).await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().expect("id").to_string()
    }

    #[tokio::test]
    async fn new_session_starts_with_default_quote() {
        let (state, _) = state(&[]);
        let app = router(state);

        let (status, body) = send(&app, empty_request("POST", "/api/v1/sessions")).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["state"]["revision"], 0);
        assert_eq!(body["state"]["selections"]["designTier"], 1);
        assert_eq!(body["quote"]["total_display"], "₦425,000");
        assert_eq!(body["quote"]["milestones"].as_array().map(Vec::len), Some(4));
        assert_eq!(body["phase"], "idle");
    }

    #[tokio::test]
    async fn user_edit_updates_quote_and_rejects_out_of_range() {
        let (state, _) = state(&[]);
        let app = router(state);
        let id = create(&app).await;
        let uri = format!("/api/v1/sessions/{id}/selections");

        let (status, body) = send(
            &app,
            json_request("PATCH", &uri, json!({"products": 10, "paymentGateway": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"]["origin"], "user");
        assert_eq!(body["quote"]["total_display"], "₦925,000");

        let (status, body) =
            send(&app, json_request("PATCH", &uri, json!({"designTier": 7}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_selection");
        assert!(body["correlation_id"].is_string());

        let (status, body) =
            send(&app, json_request("PATCH", &uri, json!({"colour": "red"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_body");
    }

    #[tokio::test]
    async fn quote_can_be_displayed_in_dollars() {
        let (state, _) = state(&[]);
        let app = router(state);
        let id = create(&app).await;

        let (status, body) =
            send(&app, empty_request("GET", &format!("/api/v1/sessions/{id}/quote?currency=usd")))
                .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_display"], "$274.19");
        assert_eq!(body["total"], "425000");
    }

    #[tokio::test]
    async fn chat_patch_replaces_session_selections() {
        let (state, client) = state(&[
            r#"Here you go [CALCULATOR_JSON]:{"designTier":2,"standardPages":5} thanks!"#,
        ]);
        let app = router(state);
        let id = create(&app).await;

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                &format!("/api/v1/sessions/{id}/chat"),
                json!({"message": "Tier 2, five pages"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "selections_updated");
        assert_eq!(body["reply"]["text"], "Here you go thanks!");
        assert_eq!(body["state"]["selections"]["standardPages"], 5);
        assert_eq!(client.requests().len(), 1);

        let (_, session) = send(&app, empty_request("GET", &format!("/api/v1/sessions/{id}"))).await;
        assert_eq!(session["state"]["origin"], "agent");
        assert_eq!(session["quote"]["total_display"], "₦575,000");
        assert_eq!(session["messages"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn empty_chat_message_is_bad_request() {
        let (state, _) = state(&[]);
        let app = router(state);
        let id = create(&app).await;

        let (status, body) = send(
            &app,
            json_request("POST", &format!("/api/v1/sessions/{id}/chat"), json!({"message": "  "})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "empty_message");
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let (state, _) = state(&[]);

        let result = get_session(State(state), Path(Uuid::new_v4())).await;

        assert!(matches!(result, Err(ApiError::SessionNotFound(_))));
    }

    #[test]
    fn busy_maps_to_conflict() {
        let response = axum::response::IntoResponse::into_response(ApiError::Submit(SubmitError::Busy));
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn panicked_turn_maps_to_internal_error() {
        let join_error = tokio::spawn(async { panic!("turn task panicked") })
            .await
            .expect_err("task should panic");

        let error = ApiError::from(join_error);
        assert_eq!(error.class(), "internal");
        let response = axum::response::IntoResponse::into_response(error);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn transcript_exports_text_and_download() {
        let (state, _) = state(&["Yusuf builds with React."]);
        let app = router(state);
        let id = create(&app).await;
        send(&app, empty_request("POST", &format!("/api/v1/sessions/{id}/chat/open"))).await;
        send(
            &app,
            json_request("POST", &format!("/api/v1/sessions/{id}/chat"), json!({"message": "Stack?"})),
        )
        .await;

        let response = app
            .clone()
            .oneshot(empty_request("GET", &format!("/api/v1/sessions/{id}/transcript?format=download")))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"chat-with-amir.txt\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let text = String::from_utf8(bytes.to_vec()).expect("utf8");
        assert!(text.starts_with("Amir: Hi! I'm Amir"));
        assert!(text.contains("\n\nYou: Stack?\n\nAmir: Yusuf builds with React."));

        let response = app
            .clone()
            .oneshot(empty_request("GET", &format!("/api/v1/sessions/{id}/transcript?format=html")))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        assert!(String::from_utf8_lossy(&bytes).contains("Yusuf builds with React."));
    }

    #[tokio::test]
    async fn pricing_endpoint_exposes_table_and_rate() {
        let (state, _) = state(&[]);
        let app = router(state);

        let (status, body) = send(&app, empty_request("GET", "/api/v1/pricing")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["table"]["base_fee"], "250000");
        assert_eq!(body["usd_rate"], "1550");
        assert_eq!(body["milestones"]["phases"].as_array().map(Vec::len), Some(4));
    }

    #[tokio::test]
    async fn discuss_sends_scope_summary_to_chat() {
        let (state, client) = state(&["Sure, let's talk."]);
        let app = router(state);
        let id = create(&app).await;

        let (status, _) = send(
            &app,
            json_request("POST", &format!("/api/v1/sessions/{id}/discuss"), json!({"currency": "ngn"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(client.requests()[0].latest.contains("The estimated total is ₦425,000."));
    }

    #[tokio::test]
    async fn dropped_chat_request_still_applies_the_reply() {
        let state = state_with(Arc::new(SlowClient {
            delay: Duration::from_millis(200),
            reply: r#"Tier 3 it is. [CALCULATOR_JSON]:{"designTier":3}"#,
        }));
        let app = router(state.clone());
        let id = create(&app).await;
        let session = state.sessions.get(id.parse().expect("uuid")).await.expect("session");

        let request = app.clone().oneshot(json_request(
            "POST",
            &format!("/api/v1/sessions/{id}/chat"),
            json!({"message": "tier 3 please"}),
        ));
        assert!(tokio::time::timeout(Duration::from_millis(20), request).await.is_err());

        for _ in 0..100 {
            if !session.is_busy() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!session.is_busy());
        assert_eq!(session.store().selections().design_tier, 3);
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn deleted_session_is_not_found_afterwards() {
        let (state, _) = state(&[]);
        let app = router(state);
        let id = create(&app).await;
        let uri = format!("/api/v1/sessions/{id}");

        let (status, _) = send(&app, empty_request("DELETE", &uri)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, empty_request("GET", &uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");

        let (status, _) = send(&app, empty_request("DELETE", &uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

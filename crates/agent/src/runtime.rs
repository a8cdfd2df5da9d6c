//! Chat orchestration around a single shared selection store.
//!
//! Each `ChatSession` allows one completion in flight. A second submission
//! while the first is pending is rejected, never queued. The calculating
//! pause is a tokio sleep, so state reads and user edits stay responsive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use scopewise_core::config::{AppConfig, ChatConfig};
use scopewise_core::domain::selections::{SelectionField, Selections};
use scopewise_core::pricing::budget::{check_budget, BudgetCheck};
use scopewise_core::pricing::currency::{Currency, CurrencyFormatter};
use scopewise_core::pricing::{DeterministicQuoteEngine, QuoteEngine};
use scopewise_core::state::{ChangeOrigin, SelectionState, SelectionStore};
use scopewise_core::summary::scope_summary;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::conversation::{
    BudgetIntent, BudgetIntentDetector, ChatMessage, MessageAction, Transcript,
};
use crate::directives::{parse_reply, DirectiveFailure};
use crate::llm::{CompletionRequest, LlmClient};
use crate::prompt::{AdvisorProfile, SystemInstructions};

pub const TRANSPORT_ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again.";
pub const ASSIST_REQUEST: &str = "Please assist me here.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatPhase {
    Idle,
    Waiting,
    Calculating,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingChoice {
    /// Open the estimator and close the chat.
    Calculator,
    /// Let the advisor configure the estimator.
    Assist,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", content = "fields", rename_all = "snake_case")]
pub enum UiEffect {
    FocusEstimator,
    HighlightFields(Vec<SelectionField>),
    CloseChat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Replied,
    SelectionsUpdated,
    PricingChoiceOffered,
    PricingChoiceResolved,
    DirectiveFailed,
    TransportFailed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub status: TurnStatus,
    pub reply: Option<ChatMessage>,
    pub effects: Vec<UiEffect>,
    pub state: SelectionState,
    pub budget_check: Option<BudgetCheck>,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    #[error("a reply is already being generated for this chat")]
    Busy,
    #[error("message must not be empty")]
    EmptyMessage,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub state: SelectionState,
    pub phase: ChatPhase,
    pub in_flight: bool,
    pub messages: Vec<ChatMessage>,
    pub last_suggestion: Option<Selections>,
}

pub struct ChatSession {
    id: Uuid,
    store: SelectionStore,
    transcript: Mutex<Transcript>,
    phase: Mutex<ChatPhase>,
    last_budget: Mutex<Option<BudgetIntent>>,
    last_suggestion: Mutex<Option<Selections>>,
    in_flight: AtomicBool,
    welcomed: AtomicBool,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(SelectionStore::default())
    }
}

impl ChatSession {
    pub fn new(store: SelectionStore) -> Self {
        Self {
            id: Uuid::new_v4(),
            store,
            transcript: Mutex::new(Transcript::new()),
            phase: Mutex::new(ChatPhase::Idle),
            last_budget: Mutex::new(None),
            last_suggestion: Mutex::new(None),
            in_flight: AtomicBool::new(false),
            welcomed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    pub fn phase(&self) -> ChatPhase {
        *lock(&self.phase)
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn transcript(&self) -> Transcript {
        lock(&self.transcript).clone()
    }

    pub fn last_budget(&self) -> Option<BudgetIntent> {
        lock(&self.last_budget).clone()
    }

    pub fn last_suggestion(&self) -> Option<Selections> {
        lock(&self.last_suggestion).clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            state: self.store.snapshot(),
            phase: self.phase(),
            in_flight: self.is_busy(),
            messages: lock(&self.transcript).history(),
            last_suggestion: self.last_suggestion(),
        }
    }

    fn try_begin(&self) -> Option<InFlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard { session: self })
    }

    fn set_phase(&self, phase: ChatPhase) {
        *lock(&self.phase) = phase;
    }

    fn push(&self, message: ChatMessage) {
        lock(&self.transcript).push(message);
    }
}

/// Releases the single-flight gate and resets the phase on every exit path.
struct InFlightGuard<'a> {
    session: &'a ChatSession,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.session.set_phase(ChatPhase::Idle);
        self.session.in_flight.store(false, Ordering::Release);
    }
}

fn resolve_pricing_choice(session: &ChatSession, choice: PricingChoice) {
    let removed = lock(&session.transcript).remove_pending_pricing_choice();
    info!(
        event_name = "agent.pricing_choice",
        session_id = %session.id,
        choice = ?choice,
        removed_prompt = removed,
        "pricing choice resolved"
    );
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct AgentRuntime {
    client: Arc<dyn LlmClient>,
    instructions: SystemInstructions,
    engine: DeterministicQuoteEngine,
    chat: ChatConfig,
    formatter: CurrencyFormatter,
    detector: BudgetIntentDetector,
}

impl AgentRuntime {
    pub fn new(
        client: Arc<dyn LlmClient>,
        engine: DeterministicQuoteEngine,
        chat: ChatConfig,
        formatter: CurrencyFormatter,
    ) -> Result<Self> {
        let instructions = SystemInstructions::render(
            engine.table(),
            &AdvisorProfile::from(&chat),
            formatter.usd_rate(),
        )?;
        Ok(Self {
            client,
            instructions,
            engine,
            chat,
            formatter,
            detector: BudgetIntentDetector::new(formatter),
        })
    }

    pub fn from_config(config: &AppConfig, client: Arc<dyn LlmClient>) -> Result<Self> {
        Self::new(
            client,
            DeterministicQuoteEngine::new(config.pricing.table.clone(), Default::default()),
            config.chat.clone(),
            CurrencyFormatter::new(config.pricing.usd_rate),
        )
    }

    pub fn engine(&self) -> &DeterministicQuoteEngine {
        &self.engine
    }

    pub fn formatter(&self) -> &CurrencyFormatter {
        &self.formatter
    }

    pub fn instructions(&self) -> &SystemInstructions {
        &self.instructions
    }

    pub fn advisor_name(&self) -> &str {
        &self.chat.advisor_name
    }

    pub fn welcome_message(&self) -> String {
        format!(
            "Hi! I'm {}, an AI assistant. How can I help you learn more about {}'s work?",
            self.chat.advisor_name, self.chat.owner_name
        )
    }

    /// Seeds the welcome message the first time the chat is opened.
    pub fn open(&self, session: &ChatSession) -> Vec<ChatMessage> {
        if !session.welcomed.swap(true, Ordering::AcqRel) {
            session.push(ChatMessage::agent(self.welcome_message()));
        }
        lock(&session.transcript).history()
    }

    pub async fn submit(
        &self,
        session: &ChatSession,
        text: &str,
    ) -> Result<TurnOutcome, SubmitError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SubmitError::EmptyMessage);
        }
        let _guard = session.try_begin().ok_or(SubmitError::Busy)?;
        Ok(self.run_turn(session, text).await)
    }

    /// For `Assist`, the pending choice prompt is removed only after the gate is taken.
    pub async fn choose_pricing_option(
        &self,
        session: &ChatSession,
        choice: PricingChoice,
    ) -> Result<TurnOutcome, SubmitError> {
        match choice {
            PricingChoice::Calculator => {
                resolve_pricing_choice(session, choice);
                Ok(TurnOutcome {
                    status: TurnStatus::PricingChoiceResolved,
                    reply: None,
                    effects: vec![UiEffect::FocusEstimator, UiEffect::CloseChat],
                    state: session.store.snapshot(),
                    budget_check: None,
                })
            }
            PricingChoice::Assist => {
                let _guard = session.try_begin().ok_or(SubmitError::Busy)?;
                resolve_pricing_choice(session, choice);
                Ok(self.run_turn(session, ASSIST_REQUEST).await)
            }
        }
    }

    /// Opens the chat and sends a summary of the current estimate.
    pub async fn discuss_estimate(
        &self,
        session: &ChatSession,
        currency: Currency,
    ) -> Result<TurnOutcome, SubmitError> {
        self.open(session);
        let selections = session.store.selections();
        let total = self.engine.quote(&selections).total;
        let summary = scope_summary(
            &self.chat.advisor_name,
            &selections,
            &self.formatter.format(total, currency),
        );
        self.submit(session, &summary).await
    }

    async fn run_turn(&self, session: &ChatSession, text: &str) -> TurnOutcome {
        let correlation_id = Uuid::new_v4().to_string();
        let history = lock(&session.transcript).history();
        session.push(ChatMessage::user(text));
        if let Some(intent) = self.detector.detect(text) {
            info!(
                event_name = "agent.budget_prompt",
                correlation_id = %correlation_id,
                session_id = %session.id,
                budget_ngn = ?intent.budget_ngn,
                "budget prompt recorded"
            );
            *lock(&session.last_budget) = Some(intent);
        }
        session.set_phase(ChatPhase::Waiting);

        let request = CompletionRequest {
            system: self.instructions.as_str().to_string(),
            history,
            latest: text.to_string(),
        };
        let raw = match self.client.complete(&request).await {
            Ok(raw) => raw,
            Err(error) => {
                warn!(
                    event_name = "agent.turn.transport_failed",
                    correlation_id = %correlation_id,
                    session_id = %session.id,
                    error = %error,
                    "completion request failed"
                );
                let reply = ChatMessage::agent(TRANSPORT_ERROR_REPLY);
                session.push(reply.clone());
                return TurnOutcome {
                    status: TurnStatus::TransportFailed,
                    reply: Some(reply),
                    effects: Vec::new(),
                    state: session.store.snapshot(),
                    budget_check: None,
                };
            }
        };

        let parsed = parse_reply(&raw);
        let mut effects = Vec::new();
        if parsed.calculating {
            session.set_phase(ChatPhase::Calculating);
            effects.push(UiEffect::FocusEstimator);
            tokio::time::sleep(self.calculating_delay()).await;
        }

        let mut reply = ChatMessage::agent(parsed.text.clone());
        reply.action = parsed.action;
        let mut budget_check = None;
        let status = if let Some(patch) = &parsed.patch {
            let state = session.store.replace(patch.selections.clone(), ChangeOrigin::Agent);
            *lock(&session.last_suggestion) = Some(state.selections.clone());
            if !effects.contains(&UiEffect::FocusEstimator) {
                effects.push(UiEffect::FocusEstimator);
            }
            effects.push(UiEffect::HighlightFields(state.changed.clone()));
            reply.show_estimator_cta = true;
            budget_check = lock(&session.last_budget)
                .as_ref()
                .and_then(|intent| intent.budget_ngn)
                .map(|budget| check_budget(self.engine.table(), &state.selections, budget));

            info!(
                event_name = "agent.selections.replaced",
                correlation_id = %correlation_id,
                session_id = %session.id,
                revision = state.revision,
                changed = ?state.changed,
                ignored_keys = ?patch.ignored_keys,
                "agent replaced selections"
            );
            TurnStatus::SelectionsUpdated
        } else if parsed.action == Some(MessageAction::PricingChoice) {
            TurnStatus::PricingChoiceOffered
        } else if parsed.failure.as_ref().is_some_and(|failure| *failure != DirectiveFailure::EmptyReply) {
            TurnStatus::DirectiveFailed
        } else {
            TurnStatus::Replied
        };

        session.push(reply.clone());
        info!(
            event_name = "agent.turn.completed",
            correlation_id = %correlation_id,
            session_id = %session.id,
            status = ?status,
            calculating = parsed.calculating,
            "chat turn completed"
        );

        TurnOutcome {
            status,
            reply: Some(reply),
            effects,
            state: session.store.snapshot(),
            budget_check,
        }
    }

    fn calculating_delay(&self) -> Duration {
        let min = self.chat.calculating_min_ms;
        let max = self.chat.calculating_max_ms.max(min);
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

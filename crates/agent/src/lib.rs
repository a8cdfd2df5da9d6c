//! Chat advisor runtime.
//!
//! - `directives`: parses advisor replies into prose plus structured effects
//! - `llm`: completion client trait and the OpenAI-compatible adapter
//! - `prompt`: system instructions rendered from the live pricing table
//! - `conversation`: transcript, exports and budget prompt detection
//! - `runtime`: per-session turn orchestration over the shared selection store
//!
//! The model never computes prices. It proposes selections; the quote engine
//! in `scopewise-core` turns them into totals.

pub mod conversation;
pub mod directives;
pub mod llm;
pub mod prompt;
pub mod runtime;

pub use conversation::{ChatMessage, ChatRole, MessageAction, Transcript};
pub use directives::{parse_reply, strip_reasoning, DirectiveFailure, ParsedReply};
pub use llm::{CompletionRequest, LlmClient, OpenAiCompatibleClient, ScriptedLlmClient};
pub use prompt::{AdvisorProfile, SystemInstructions};
pub use runtime::{
    AgentRuntime, ChatPhase, ChatSession, PricingChoice, SessionSnapshot, SubmitError,
    TurnOutcome, TurnStatus, UiEffect,
};

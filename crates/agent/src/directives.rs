//! Directive parsing for advisor replies.
//!
//! One canonical grammar is accepted:
//!
//! - `<internal_monologue>...</internal_monologue>` reasoning blocks, removed
//!   before anything else is looked at
//! - `[ACTION:CALCULATING]` at the start of the reply
//! - `[ACTION:PRICING]` as the entire reply
//! - `[CALCULATOR_JSON]:{...}` selection patch, single-line JSON object
//!
//! Raw parse errors are logged and never shown to the visitor.

use scopewise_core::domain::patch::{decode_agent_patch, PatchDecode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::conversation::MessageAction;

pub const REASONING_OPEN: &str = "<internal_monologue>";
pub const REASONING_CLOSE: &str = "</internal_monologue>";
pub const CALCULATING_SENTINEL: &str = "[ACTION:CALCULATING]";
pub const PRICING_SENTINEL: &str = "[ACTION:PRICING]";
pub const PATCH_SENTINEL: &str = "[CALCULATOR_JSON]:";

pub const PRICING_PROMPT: &str = "I can help with that. Would you like to go to the pricing calculator or have me adjust it for you based on our conversation?";
pub const MISSING_PAYLOAD_FALLBACK: &str =
    "I had trouble generating the calculator configuration. Let's try that again.";
pub const MALFORMED_PAYLOAD_FALLBACK: &str = "I seem to have run into a small issue with formatting my response. Could you try asking that again?";
pub const EMPTY_REPLY_FALLBACK: &str = "Sorry, I seem to be having trouble connecting. Please check your connection or try again in a moment.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DirectiveFailure {
    /// No `{ ... }` pair after the patch sentinel.
    MissingPayload,
    /// The payload was not valid JSON.
    InvalidJson { error: String },
    /// The payload parsed but was not an object.
    NotAnObject,
    /// Nothing was left to show after stripping.
    EmptyReply,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedReply {
    pub text: String,
    pub calculating: bool,
    pub action: Option<MessageAction>,
    pub patch: Option<PatchDecode>,
    pub failure: Option<DirectiveFailure>,
}

impl ParsedReply {
    /// True when a patch directive was present, whether or not it decoded.
    pub fn attempted_patch(&self) -> bool {
        self.patch.is_some()
            || matches!(
                self.failure,
                Some(
                    DirectiveFailure::MissingPayload
                        | DirectiveFailure::InvalidJson { .. }
                        | DirectiveFailure::NotAnObject
                )
            )
    }
}

pub fn parse_reply(raw: &str) -> ParsedReply {
    let stripped = strip_reasoning(raw);
    let mut body = stripped.trim();

    let calculating = match body.strip_prefix(CALCULATING_SENTINEL) {
        Some(rest) => {
            body = rest.trim();
            true
        }
        None => false,
    };

    let mut reply =
        ParsedReply { text: String::new(), calculating, action: None, patch: None, failure: None };

    if body == PRICING_SENTINEL {
        reply.text = PRICING_PROMPT.to_string();
        reply.action = Some(MessageAction::PricingChoice);
        return reply;
    }

    match body.split_once(PATCH_SENTINEL) {
        Some((prose, remainder)) => match extract_patch(prose.trim(), remainder) {
            Ok((text, patch)) => {
                reply.text = text;
                reply.patch = Some(patch);
            }
            Err(failure) => {
                reply.text = match failure {
                    DirectiveFailure::MissingPayload => MISSING_PAYLOAD_FALLBACK,
                    _ => MALFORMED_PAYLOAD_FALLBACK,
                }
                .to_string();
                reply.failure = Some(failure);
            }
        },
        None => reply.text = body.to_string(),
    }

    if reply.text.trim().is_empty() {
        reply.text = EMPTY_REPLY_FALLBACK.to_string();
        reply.failure.get_or_insert(DirectiveFailure::EmptyReply);
    }

    reply
}

fn extract_patch(prose: &str, remainder: &str) -> Result<(String, PatchDecode), DirectiveFailure> {
    let (Some(start), Some(end)) = (remainder.find('{'), remainder.rfind('}')) else {
        warn!(
            event_name = "agent.directive.payload_missing",
            remainder_len = remainder.len(),
            "patch sentinel without a JSON object"
        );
        return Err(DirectiveFailure::MissingPayload);
    };
    if end < start {
        warn!(
            event_name = "agent.directive.payload_missing",
            remainder_len = remainder.len(),
            "patch braces out of order"
        );
        return Err(DirectiveFailure::MissingPayload);
    }

    let payload = &remainder[start..=end];
    let value = serde_json::from_str::<Value>(payload).map_err(|error| {
        warn!(
            event_name = "agent.directive.payload_invalid",
            error = %error,
            payload_len = payload.len(),
            "patch payload is not valid JSON"
        );
        DirectiveFailure::InvalidJson { error: error.to_string() }
    })?;
    let Value::Object(object) = value else {
        warn!(event_name = "agent.directive.payload_invalid", "patch payload is not an object");
        return Err(DirectiveFailure::NotAnObject);
    };

    let decode = decode_agent_patch(&object);
    if !decode.adjustments.is_empty() || !decode.ignored_keys.is_empty() {
        warn!(
            event_name = "agent.directive.payload_adjusted",
            adjustments = decode.adjustments.len(),
            ignored_keys = ?decode.ignored_keys,
            "patch values were coerced or ignored"
        );
    }

    let mut text = prose.to_string();
    let trailing = remainder[end + 1..].trim();
    if !trailing.is_empty() {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(trailing);
    }
    Ok((text, decode))
}

/// Removes every reasoning block. An opening tag without a matching close
/// hides the rest of the reply; stray closing tags are dropped.
pub fn strip_reasoning(raw: &str) -> String {
    let mut output = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(open) = rest.find(REASONING_OPEN) {
        output.push_str(&rest[..open]);
        let inner = &rest[open + REASONING_OPEN.len()..];
        match inner.find(REASONING_CLOSE) {
            Some(close) => rest = &inner[close + REASONING_CLOSE.len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    output.push_str(rest);
    output.replace(REASONING_CLOSE, "")
}

#[cfg(test)]
mod tests {
    use scopewise_core::domain::selections::{CmsTier, Selections};

    use super::{
        parse_reply, strip_reasoning, DirectiveFailure, EMPTY_REPLY_FALLBACK,
        MALFORMED_PAYLOAD_FALLBACK, MISSING_PAYLOAD_FALLBACK, PRICING_PROMPT,
    };
    use crate::conversation::MessageAction;

    #[test]
    fn plain_prose_passes_through_trimmed() {
        let reply = parse_reply("  Yusuf builds with React and Next.js.  ");
        assert_eq!(reply.text, "Yusuf builds with React and Next.js.");
        assert!(!reply.calculating);
        assert!(reply.action.is_none());
        assert!(reply.patch.is_none());
        assert!(reply.failure.is_none());
    }

    #[test]
    fn patch_with_prose_and_trailing_text() {
        let reply = parse_reply(
            r#"Here you go [CALCULATOR_JSON]:{"designTier":2,"standardPages":5} thanks!"#,
        );

        assert_eq!(reply.text, "Here you go thanks!");
        let patch = reply.patch.expect("patch decoded");
        assert_eq!(
            patch.selections,
            Selections { design_tier: 2, standard_pages: 5, ..Selections::default() }
        );
        assert!(reply.failure.is_none());
    }

    #[test]
    fn exact_pricing_sentinel_becomes_choice_prompt() {
        let reply = parse_reply("  [ACTION:PRICING]\n");
        assert_eq!(reply.text, PRICING_PROMPT);
        assert_eq!(reply.action, Some(MessageAction::PricingChoice));
        assert!(reply.patch.is_none());
    }

    #[test]
    fn pricing_sentinel_inside_prose_is_not_a_directive() {
        let reply = parse_reply("Reply with [ACTION:PRICING] if you want a quote.");
        assert!(reply.action.is_none());
        assert_eq!(reply.text, "Reply with [ACTION:PRICING] if you want a quote.");
    }

    #[test]
    fn invalid_json_yields_fallback_without_patch() {
        let reply = parse_reply("[CALCULATOR_JSON]:{not valid json}");
        assert_eq!(reply.text, MALFORMED_PAYLOAD_FALLBACK);
        assert!(reply.patch.is_none());
        assert!(matches!(reply.failure, Some(DirectiveFailure::InvalidJson { .. })));
        assert!(reply.attempted_patch());
    }

    #[test]
    fn missing_braces_yield_configuration_fallback() {
        for raw in ["Sure [CALCULATOR_JSON]: designTier 2", "x [CALCULATOR_JSON]:} oops {"] {
            let reply = parse_reply(raw);
            assert_eq!(reply.text, MISSING_PAYLOAD_FALLBACK, "for {raw}");
            assert_eq!(reply.failure, Some(DirectiveFailure::MissingPayload));
        }
    }

    #[test]
    fn unknown_keys_are_ignored_and_rest_defaults() {
        let reply = parse_reply(r#"Updated. [CALCULATOR_JSON]:{"colour":"red","apis":2}"#);
        let patch = reply.patch.expect("patch decoded");
        assert_eq!(patch.ignored_keys, vec!["colour".to_string()]);
        assert_eq!(patch.selections, Selections { apis: 2, ..Selections::default() });
        assert_eq!(reply.text, "Updated.");
    }

    #[test]
    fn reasoning_blocks_are_stripped_before_parsing() {
        let raw = "[ACTION:CALCULATING]\n<internal_monologue>\nGoal: fit 700k.\n[CALCULATOR_JSON]:{\"apis\":9}\n</internal_monologue>\nOkay, Tier 2 with 10 pages. [CALCULATOR_JSON]:{\"designTier\":2,\"standardPages\":10}";
        let reply = parse_reply(raw);

        assert!(reply.calculating);
        assert_eq!(reply.text, "Okay, Tier 2 with 10 pages.");
        let patch = reply.patch.expect("patch from visible text");
        assert_eq!(patch.selections.design_tier, 2);
        assert_eq!(patch.selections.standard_pages, 10);
        assert_eq!(patch.selections.apis, 0);
    }

    #[test]
    fn calculating_sentinel_on_same_line_is_accepted() {
        let reply = parse_reply("[ACTION:CALCULATING] Here is a leaner option.");
        assert!(reply.calculating);
        assert_eq!(reply.text, "Here is a leaner option.");
    }

    #[test]
    fn unterminated_reasoning_hides_the_rest() {
        assert_eq!(strip_reasoning("Visible <internal_monologue> secret"), "Visible ");
        assert_eq!(strip_reasoning("a</internal_monologue>b"), "ab");
        assert_eq!(
            strip_reasoning("<internal_monologue>x</internal_monologue>1<internal_monologue>y</internal_monologue>2"),
            "12"
        );
    }

    #[test]
    fn blank_reply_gets_connection_fallback() {
        for raw in ["", "   ", "<internal_monologue>only thoughts</internal_monologue>", "[ACTION:CALCULATING]"] {
            let reply = parse_reply(raw);
            assert_eq!(reply.text, EMPTY_REPLY_FALLBACK, "for {raw:?}");
            assert_eq!(reply.failure, Some(DirectiveFailure::EmptyReply));
        }
    }

    #[test]
    fn patch_without_prose_keeps_blank_text_fallback() {
        let reply = parse_reply(r#"[CALCULATOR_JSON]:{"cmsType":"100000"}"#);
        let patch = reply.patch.as_ref().expect("patch decoded");
        assert_eq!(patch.selections.cms_type, CmsTier::Headless);
        assert_eq!(reply.text, EMPTY_REPLY_FALLBACK);
    }

    #[test]
    fn parsing_is_idempotent() {
        let raw = r#"Done [CALCULATOR_JSON]:{"products":25,"paymentGateway":true}"#;
        assert_eq!(parse_reply(raw), parse_reply(raw));
    }

    #[test]
    fn garbage_never_panics() {
        let samples = [
            "[CALCULATOR_JSON]:",
            "[CALCULATOR_JSON]:{",
            "[CALCULATOR_JSON]:}",
            "[CALCULATOR_JSON]:{{{}}}",
            "[CALCULATOR_JSON]:{\"designTier\":\"999999999999999999999\"}",
            "<internal_monologue>",
            "</internal_monologue>",
            "[ACTION:CALCULATING][ACTION:PRICING]",
            "ñ [CALCULATOR_JSON]:{\"apis\":\"é\"} ü",
        ];
        for raw in samples {
            let reply = parse_reply(raw);
            assert!(!reply.text.is_empty(), "empty text for {raw:?}");
            if let Some(patch) = reply.patch {
                assert!(patch.selections.validate().is_ok());
            }
        }
    }
}

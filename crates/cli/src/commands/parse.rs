use scopewise_agent::directives::parse_reply;

use crate::commands::CommandResult;

/// Parses one raw advisor reply and reports what the chat would show and do.
pub fn run(raw: &str) -> CommandResult {
    let parsed = parse_reply(raw);
    CommandResult::data("parse", &serde_json::json!({ "reply": parsed }))
}

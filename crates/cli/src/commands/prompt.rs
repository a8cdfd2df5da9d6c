use scopewise_agent::prompt::{AdvisorProfile, SystemInstructions};

use crate::commands::{load_config, CommandResult, EXIT_RUNTIME};

pub fn run(raw: bool) -> CommandResult {
    let config = match load_config("prompt") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let instructions = match SystemInstructions::render(
        &config.pricing.table,
        &AdvisorProfile::from(&config.chat),
        config.pricing.usd_rate,
    ) {
        Ok(instructions) => instructions,
        Err(error) => {
            return CommandResult::failure("prompt", "template", format!("{error:#}"), EXIT_RUNTIME)
        }
    };

    if raw {
        return CommandResult { exit_code: 0, output: instructions.as_str().to_string() };
    }
    CommandResult::data("prompt", &serde_json::json!({ "instructions": instructions.as_str() }))
}

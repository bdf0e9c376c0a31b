use std::fs;
use std::path::Path;

use answer_core::engine::{run_engine, EngineInput};

use crate::commands::{CommandResult, EXIT_INPUT};

/// Runs the decision engine once over a JSON input file. No storage or network is touched.
pub fn run(input_path: &Path) -> CommandResult {
    let raw = match fs::read_to_string(input_path) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure(
                "turn",
                "input_read",
                format!("could not read `{}`: {error}", input_path.display()),
                EXIT_INPUT,
            );
        }
    };

    let input: EngineInput = match serde_json::from_str(&raw) {
        Ok(input) => input,
        Err(error) => {
            return CommandResult::failure(
                "turn",
                "input_parse",
                format!("`{}` is not a valid engine input: {error}", input_path.display()),
                EXIT_INPUT,
            );
        }
    };

    let response = run_engine(&input);
    match serde_json::to_string_pretty(&response) {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(error) => CommandResult::failure(
            "turn",
            "serialization",
            format!("could not render engine response: {error}"),
            EXIT_INPUT,
        ),
    }
}

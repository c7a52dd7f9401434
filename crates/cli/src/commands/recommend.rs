use std::path::Path;

use crate::commands::{
    build_matcher, load_live_config, read_owned_books, runtime, CommandResult, EXIT_CONFIG,
};
use crate::logging::init_logging;

pub fn run(config_path: Option<&Path>, question: &str, owned_path: Option<&Path>) -> CommandResult {
    match execute(config_path, question, owned_path) {
        Ok(result) | Err(result) => result,
    }
}

fn execute(
    config_path: Option<&Path>,
    question: &str,
    owned_path: Option<&Path>,
) -> Result<CommandResult, CommandResult> {
    let owned_books = match owned_path {
        Some(path) => read_owned_books("recommend", path)?,
        None => Vec::new(),
    };
    let config = load_live_config("recommend", config_path)?;
    init_logging(&config);

    let matcher = build_matcher(&config).map_err(|error| {
        CommandResult::failure("recommend", "client_setup", format!("{error:#}"), EXIT_CONFIG)
    })?;
    let runtime = runtime("recommend")?;

    let output = runtime.block_on(matcher.resolve_recommendation(question, &owned_books));
    Ok(CommandResult::json("recommend", &output))
}

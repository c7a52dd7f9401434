use std::path::Path;

use bookmatch_core::domain::book::CatalogRecord;
use serde::Serialize;

use crate::commands::{
    build_matcher, load_live_config, read_owned_books, runtime, CommandResult, EXIT_CONFIG,
};
use crate::logging::init_logging;

#[derive(Debug, Serialize)]
struct OwnedRecommendations {
    records: Vec<CatalogRecord>,
}

pub fn run(config_path: Option<&Path>, owned_path: &Path) -> CommandResult {
    match execute(config_path, owned_path) {
        Ok(result) | Err(result) => result,
    }
}

fn execute(config_path: Option<&Path>, owned_path: &Path) -> Result<CommandResult, CommandResult> {
    let owned_books = read_owned_books("owned", owned_path)?;
    let config = load_live_config("owned", config_path)?;
    init_logging(&config);

    let matcher = build_matcher(&config).map_err(|error| {
        CommandResult::failure("owned", "client_setup", format!("{error:#}"), EXIT_CONFIG)
    })?;
    let runtime = runtime("owned")?;

    let records = runtime.block_on(matcher.resolve_owned_books_only(&owned_books));
    Ok(CommandResult::json("owned", &OwnedRecommendations { records }))
}

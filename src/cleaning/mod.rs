pub mod client;
pub mod cleaner;
pub mod config;
pub mod constants;
pub mod dedupe;
pub mod error;
pub mod field;
pub mod parser;
pub mod prompt;
pub mod table;


pub use cleaner::{CleaningSession, CleaningStats, RowCleaner};
pub use client::{Completion, CompletionClient};
pub use config::CleanConfig;
pub use dedupe::{Deduplicator, DuplicateGroup};
pub use error::CleanError;
pub use parser::{CleanedRow, FieldResult, ResponseParser};
pub use prompt::PromptBuilder;
pub use table::CsvTable;

use anyhow::Result;

/// Runs the whole pipeline over an already-parsed table: one completion call
/// per row, in order, with failed rows degraded to placeholders.
pub async fn clean_table(
    table: CsvTable,
    config: CleanConfig,
    credential: Option<String>,
) -> Result<(CleaningSession, CleaningStats)> {
    table.validate()?;

    let verbose = config.verbose;
    let client = CompletionClient::new(config, credential)?;
    let cleaner = RowCleaner::new(client, verbose);

    let mut session = CleaningSession::new(table);
    let stats = cleaner.clean(&mut session).await;
    Ok((session, stats))
}

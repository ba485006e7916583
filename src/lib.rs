// Cleaning module - the row-cleaning orchestration pipeline
pub mod cleaning;

// Shared helpers (logging setup, formatting)
pub mod utils;

// Re-export main types for convenience
pub use cleaning::{
    CleanConfig, CleanError, CleanedRow, CleaningSession, CleaningStats, CompletionClient,
    CsvTable, Deduplicator, DuplicateGroup, FieldResult, ResponseParser, RowCleaner,
};

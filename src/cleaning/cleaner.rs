use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::cleaning::client::Completion;
use crate::cleaning::constants::PROCESSING_ERROR_NOTE;
use crate::cleaning::field::{format_phone, is_valid_email};
use crate::cleaning::parser::{CleanedRow, FieldResult, ResponseParser};
use crate::cleaning::prompt::PromptBuilder;
use crate::cleaning::table::CsvTable;

/// Lifecycle of one row inside the cleaning loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPhase {
    Pending,
    Prompting,
    AwaitingCompletion,
    Parsing,
    Success,
    Failed,
}

/// Session state owned by the orchestrator for the duration of the cleaning
/// pass. The table is immutable once loaded; `cleaned_rows` gains exactly one
/// entry per source row, in source order.
#[derive(Debug)]
pub struct CleaningSession {
    pub table: CsvTable,
    pub cleaned_rows: Vec<CleanedRow>,
}

impl CleaningSession {
    pub fn new(table: CsvTable) -> Self {
        Self {
            table,
            cleaned_rows: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CleaningStats {
    pub rows_processed: usize,
    pub rows_cleaned: usize,
    pub rows_failed: usize,
    pub processing_time_ms: u64,
}

type ProgressFn = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Drives prompt building, the remote completion call and response parsing
/// for every row of the session, strictly one row at a time so progress and
/// an early abort both leave a well-defined prefix of completed rows.
pub struct RowCleaner<C: Completion> {
    client: C,
    verbose: bool,
    shutdown_flag: Arc<AtomicBool>,
    progress: Option<ProgressFn>,
}

impl<C: Completion> RowCleaner<C> {
    pub fn new(client: C, verbose: bool) -> Self {
        Self {
            client,
            verbose,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            progress: None,
        }
    }

    pub fn with_shutdown_signal(mut self, shutdown_flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = shutdown_flag;
        self
    }

    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    pub async fn clean(&self, session: &mut CleaningSession) -> CleaningStats {
        let start = Instant::now();
        let total = session.table.rows.len();
        let mut stats = CleaningStats::default();

        if self.verbose {
            println!("🚀 Cleaning {} rows", total);
        }

        for (index, row) in session.table.rows.iter().enumerate() {
            if self.shutdown_flag.load(Ordering::Relaxed) {
                if self.verbose {
                    println!("🛑 Shutdown requested. Stopping at row {}/{}", index, total);
                }
                break;
            }

            let cleaned = self.clean_row(index, row, &session.table.headers).await;
            if cleaned.success {
                stats.rows_cleaned += 1;
            } else {
                stats.rows_failed += 1;
            }
            stats.rows_processed += 1;
            session.cleaned_rows.push(cleaned);

            if let Some(progress) = &self.progress {
                progress(stats.rows_processed, total);
            }

            if self.verbose {
                println!("📊 Progress: {}/{} rows", stats.rows_processed, total);
            }
        }

        stats.processing_time_ms = start.elapsed().as_millis() as u64;
        stats
    }

    async fn clean_row(&self, index: usize, row: &[String], headers: &[String]) -> CleanedRow {
        let mut phase = RowPhase::Pending;
        debug!("Row {}: {:?}", index, phase);

        phase = RowPhase::Prompting;
        debug!("Row {}: {:?}", index, phase);
        let context = PromptBuilder::build_context(row, headers);
        let prompt = PromptBuilder::build_prompt(&context);

        phase = RowPhase::AwaitingCompletion;
        debug!("Row {}: {:?}", index, phase);
        let raw_text = match self.client.complete(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Row {} completion failed: {}", index, e);
                return error_row(headers, row, e.to_string());
            }
        };

        phase = RowPhase::Parsing;
        debug!("Row {}: {:?}", index, phase);
        let mut cleaned = ResponseParser::parse(&raw_text);

        if !cleaned.success {
            phase = RowPhase::Failed;
            debug!("Row {}: {:?}", index, phase);
            let message = cleaned.error.unwrap_or_else(|| "parse failure".to_string());
            return error_row(headers, row, message);
        }

        enforce_field_contracts(&mut cleaned.cleaned_data);

        phase = RowPhase::Success;
        debug!("Row {}: {:?}", index, phase);
        cleaned
    }
}

/// Placeholder row for a failure: echoes each original header/cell pair at
/// confidence 0 so the cleaned collection keeps positional correspondence
/// with the source table.
fn error_row(headers: &[String], row: &[String], error: String) -> CleanedRow {
    let cleaned_data = headers
        .iter()
        .enumerate()
        .map(|(index, header)| FieldResult {
            field: header.clone(),
            value: Some(row.get(index).cloned().unwrap_or_default()),
            confidence: 0.0,
            notes: PROCESSING_ERROR_NOTE.to_string(),
        })
        .collect();

    CleanedRow::failed(error, cleaned_data)
}

/// Machine-checkable contracts the model cannot be trusted with: emails are
/// lower-cased and must match the address pattern, phone numbers are
/// re-formatted locally into digit pairs. Violations become null values.
fn enforce_field_contracts(results: &mut [FieldResult]) {
    for result in results.iter_mut() {
        match result.field.to_lowercase().as_str() {
            "email" => {
                result.value = result.value.take().and_then(|v| {
                    let normalized: String =
                        v.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase();
                    if is_valid_email(&normalized) {
                        Some(normalized)
                    } else {
                        None
                    }
                });
            }
            "phonenumber" => {
                result.value = result.value.take().and_then(|v| format_phone(&v));
            }
            _ => {}
        }
    }
}

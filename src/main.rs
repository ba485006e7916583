use anyhow::Result;
use clap::Parser;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use contact_sift::cleaning::{
    table, CleanConfig, CleaningSession, CompletionClient, Deduplicator, RowCleaner,
};
use contact_sift::utils;
use contact_sift::CsvTable;

#[derive(Parser)]
#[command(name = "contact-sift")]
#[command(about = "Contact Sift - cleans a contact CSV through a remote assistant endpoint and sifts out duplicates")]
struct Args {
    #[arg(short, long, help = "Input CSV file")]
    input: PathBuf,

    #[arg(short, long, help = "Output file for the cleaned CSV")]
    output: Option<PathBuf>,

    #[arg(short, long, default_value = "config.json", help = "Configuration file path")]
    config: PathBuf,

    #[arg(short, long, help = "Bearer credential for the assistant endpoint (falls back to CONTACT_SIFT_TOKEN)")]
    token: Option<String>,

    #[arg(long, help = "Drop all but the first row of every duplicate group")]
    drop_duplicates: bool,

    #[arg(short, long, help = "Verbose output")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = if args.config.exists() {
        CleanConfig::from_file(&args.config)?
    } else {
        CleanConfig::default()
    };
    config.verbose = config.verbose || args.verbose;

    let verbosity = if config.verbose { "verbose" } else { "normal" };
    utils::setup_logging(verbosity)?;

    info!("Starting Contact Sift cleaning");
    info!("Input file: {}", args.input.display());

    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    let output_file = args
        .output
        .unwrap_or_else(|| PathBuf::from(&config.output_file));
    info!("Output file: {}", output_file.display());

    let text = std::fs::read_to_string(&args.input)?;
    let csv_table = CsvTable::parse(&text)?;
    csv_table.validate()?;
    info!(
        "Parsed {} rows with {} columns",
        csv_table.rows.len(),
        csv_table.headers.len()
    );

    let token = args
        .token
        .or_else(|| std::env::var("CONTACT_SIFT_TOKEN").ok());

    let verbose = config.verbose;
    let client = CompletionClient::new(config, token)?;
    if !client.validate_credential().await {
        anyhow::bail!("Credential rejected by the assistant endpoint. Supply a valid token via --token or CONTACT_SIFT_TOKEN.");
    }

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let signal_flag = shutdown_flag.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_flag.store(true, Ordering::Relaxed);
        }
    });

    let cleaner = RowCleaner::new(client, verbose).with_shutdown_signal(shutdown_flag);

    let mut session = CleaningSession::new(csv_table);
    let stats = cleaner.clean(&mut session).await;

    info!("Cleaning completed");
    info!("Rows processed: {}", stats.rows_processed);
    info!("Rows cleaned: {}", stats.rows_cleaned);
    info!("Rows failed: {}", stats.rows_failed);
    info!(
        "Processing time: {}",
        utils::format_duration(stats.processing_time_ms as f64 / 1000.0)
    );

    let groups = Deduplicator::find_groups(&session.cleaned_rows);
    if groups.is_empty() {
        info!("No duplicates found");
    } else {
        info!("Duplicate groups found: {}", groups.len());
        for group in &groups {
            info!("  {} rows share key \"{}\"", group.indices.len(), group.key);
        }

        if args.drop_duplicates {
            let keep_set: HashSet<usize> =
                groups.iter().map(|group| group.indices[0]).collect();
            let before = session.cleaned_rows.len();
            session.cleaned_rows = Deduplicator::apply(session.cleaned_rows, &groups, &keep_set);
            info!(
                "Duplicates removed: {}",
                before - session.cleaned_rows.len()
            );
        }
    }

    let exported = table::export_cleaned(&session.table.headers, &session.cleaned_rows);
    std::fs::write(&output_file, exported)?;
    info!("Cleaned CSV written to {}", output_file.display());

    Ok(())
}

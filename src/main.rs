mod config;
mod ingestion;
mod models;
mod query;
mod storage;
mod types;

use std::io::{stderr, stdout, BufWriter, Write};
use std::process::exit;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use crate::config::{DEFAULT_BACKPRESSURE, DEFAULT_CHUNK_SIZE};
use crate::ingestion::{IngestReport, IngestionEngine};
use crate::query::{PageRequest, QueryError, TransactionFilter, TransactionQueryService};
use crate::storage::{MemoryStore, SqliteStore, TransactionStore};

const USAGE: &str = "\
Usage:
  fraud-ledger ingest [input].csv [database] [chunk_size:optional] [checkpoint:optional]
  fraud-ledger list [database] [page:optional] [page_size:optional]
  fraud-ledger search [database] [merchant=..] [min_amount=..] [max_amount=..] [page=..] [page_size=..]
  fraud-ledger get [database] [transaction_id]
Ingesting into the database :memory: validates the input without persisting it.
Log level is read from FRAUD_LEDGER_LOG: error, warn, info, debug, trace (default: info)
Chunks buffered ahead of the loader are read from FRAUD_LEDGER_BACKPRESSURE (default: 1)";

const IN_MEMORY_DATABASE: &str = ":memory:";

const EXIT_USAGE: i32 = 1;
const EXIT_INVALID_PARAMETER: i32 = 2;
const EXIT_NOT_FOUND: i32 = 4;

#[tokio::main]
async fn main() -> Result<()> {
    //NOTE: Argument parsing is hand rolled to match the small surface; a growing CLI should move to clap
    let args: Vec<String> = std::env::args().collect();

    let log_level = std::env::var("FRAUD_LEDGER_LOG")
        .map(|level| parse_log_level(&level))
        .unwrap_or(LevelFilter::INFO);

    setup_logging(log_level);

    let Some(command) = args.get(1) else {
        eprintln!("{USAGE}");
        exit(EXIT_USAGE);
    };

    match (command.as_str(), &args[2..]) {
        ("ingest", [input, database, options @ ..]) => run_ingest(input, database, options).await,
        ("list", [database, options @ ..]) => run_list(database, options),
        ("search", [database, options @ ..]) => run_search(database, options),
        ("get", [database, transaction_id]) => run_get(database, transaction_id),
        _ => {
            eprintln!("{USAGE}");
            exit(EXIT_USAGE);
        }
    }
}

fn parse_log_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => {
            eprintln!("Invalid log level '{}', defaulting to 'info'", level);
            LevelFilter::INFO
        }
    }
}

fn setup_logging(level: LevelFilter) {
    //NOTE: stdout carries the command result, so logging goes to stderr
    let terminal_log = fmt::layer()
        .with_target(false)
        .with_writer(stderr)
        .with_filter(level);

    tracing_subscriber::registry()
        .with(terminal_log)
        .init();
}

async fn run_ingest(input: &str, database: &str, options: &[String]) -> Result<()> {
    let chunk_size = match options.first() {
        Some(value) => parse_or_exit::<usize>("chunk_size", value),
        None => DEFAULT_CHUNK_SIZE
    };

    let backpressure = match std::env::var("FRAUD_LEDGER_BACKPRESSURE") {
        Ok(value) => parse_or_exit::<usize>("FRAUD_LEDGER_BACKPRESSURE", &value),
        Err(_) => DEFAULT_BACKPRESSURE
    };

    let checkpoint = options.get(1);

    let report = if database == IN_MEMORY_DATABASE {
        info!("Dry run, [{input}] is validated but not persisted");
        ingest(Arc::new(MemoryStore::new()), input, chunk_size, backpressure, checkpoint).await?
    } else {
        ingest(Arc::new(SqliteStore::open(database)?), input, chunk_size, backpressure, checkpoint).await?
    };

    write_report_to_stdout(&report)
}

async fn ingest<S: TransactionStore>(
    storage: Arc<S>,
    input: &str,
    chunk_size: usize,
    backpressure: usize,
    checkpoint: Option<&String>
) -> Result<IngestReport> {
    let mut engine = IngestionEngine::new(storage)
        .with_chunk_size(chunk_size)
        .with_backpressure(backpressure);

    if let Some(checkpoint) = checkpoint {
        engine = engine.with_checkpoint(checkpoint);
    }

    let timer = Instant::now();
    let report = engine.run(input).await?;
    let duration = timer.elapsed();

    info!("Processed transactions in: {duration:?}");

    Ok(report)
}

fn run_list(database: &str, options: &[String]) -> Result<()> {
    let defaults = PageRequest::default();
    let page = PageRequest::new(
        options.first().map_or(defaults.page, |value| parse_or_exit("page", value)),
        options.get(1).map_or(defaults.page_size, |value| parse_or_exit("page_size", value))
    );

    let service = TransactionQueryService::new(Arc::new(SqliteStore::open(database)?));
    let response = exit_on_client_error(service.list_transactions(page))?;

    write_json_to_stdout(&response)
}

fn run_search(database: &str, options: &[String]) -> Result<()> {
    let mut filter = TransactionFilter::new();
    let mut page = PageRequest::default();

    for option in options {
        let Some((key, value)) = option.split_once('=') else {
            exit_with_invalid_parameter(&format!("Expected key=value, got '{option}'"));
        };

        match key {
            "merchant" => filter = filter.merchant(value),
            "min_amount" => filter = filter.min_amount(parse_or_exit::<Decimal>("min_amount", value)),
            "max_amount" => filter = filter.max_amount(parse_or_exit::<Decimal>("max_amount", value)),
            "page" => page.page = parse_or_exit("page", value),
            "page_size" => page.page_size = parse_or_exit("page_size", value),
            _ => exit_with_invalid_parameter(&format!("Unknown search parameter '{key}'"))
        }
    }

    let service = TransactionQueryService::new(Arc::new(SqliteStore::open(database)?));
    let response = exit_on_client_error(service.search_transactions(&filter, page))?;

    write_json_to_stdout(&response)
}

fn run_get(database: &str, transaction_id: &str) -> Result<()> {
    let service = TransactionQueryService::new(Arc::new(SqliteStore::open(database)?));

    match exit_on_client_error(service.get_transaction(transaction_id))? {
        Some(transaction) => write_json_to_stdout(&transaction),
        None => {
            write_json_to_stdout(&serde_json::json!({ "detail": "Transaction not found" }))?;
            exit(EXIT_NOT_FOUND);
        }
    }
}

fn parse_or_exit<T: FromStr>(parameter: &str, value: &str) -> T {
    value.trim().parse().unwrap_or_else(|_| {
        exit_with_invalid_parameter(&format!("Invalid value '{value}' for [{parameter}]"))
    })
}

fn exit_on_client_error<T>(result: Result<T, QueryError>) -> Result<T> {
    match result {
        Err(error) if error.is_client_error() => exit_with_invalid_parameter(&error.to_string()),
        other => Ok(other?)
    }
}

fn exit_with_invalid_parameter(message: &str) -> ! {
    eprintln!("{message}");
    exit(EXIT_INVALID_PARAMETER);
}

fn write_report_to_stdout(report: &IngestReport) -> Result<()> {
    let mut output = BufWriter::new(stdout().lock());

    writeln!(output, "total,inserted,skipped,duplicates,failed")?;
    writeln!(
        output,
        "{},{},{},{},{}",
        report.total,
        report.inserted,
        report.skipped,
        report.duplicates,
        report.failed
    )?;

    output.flush()?;

    Ok(())
}

fn write_json_to_stdout<T: Serialize>(value: &T) -> Result<()> {
    let mut output = BufWriter::new(stdout().lock());

    serde_json::to_writer_pretty(&mut output, value)?;
    writeln!(output)?;
    output.flush()?;

    Ok(())
}

//! Command-line front end: parse single résumés or run a directory through
//! the bulk queue.

use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};
use walkdir::WalkDir;

use cvparse::queue::{JsonLinesSink, NoopSink, SubmittedFile, DEFAULT_BATCH_PRIORITY};
use cvparse::{
    resolve_config, Config, DocumentType, ExtractorRegistry, JobQueue, ProcessingMode,
    RecordAssembler, RecordSink,
};

#[derive(Parser, Debug)]
#[command(name = "cvparse", author, version, about)]
struct Args {
    /// JSON configuration file; `CVPARSE_*` environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse résumés and print one JSON record per file
    Parse {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Submit every PDF and DOCX in a directory as one batch
    Batch {
        dir: PathBuf,

        /// Lower runs first
        #[arg(long, default_value_t = DEFAULT_BATCH_PRIORITY)]
        priority: u32,

        /// How long to wait for the batch before reporting
        #[arg(long, default_value_t = 600)]
        wait_secs: u64,

        /// Write processed records here as JSON lines
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(args.json_logs) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(json: bool) -> Result<(), Box<dyn Error>> {
    tracing_log::LogTracer::init()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)));

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = resolve_config(args.config.as_deref())?;

    match args.command {
        Command::Parse { files } => parse_files(&config, &files),
        Command::Batch {
            dir,
            priority,
            wait_secs,
            output,
        } => run_batch(&config, &dir, priority, Duration::from_secs(wait_secs), output),
    }
}

fn parse_files(config: &Config, files: &[PathBuf]) -> Result<(), Box<dyn Error>> {
    let assembler = RecordAssembler::new(ExtractorRegistry::new(config.min_pdf_text_chars), None);
    let mut failures = 0;

    for path in files {
        let outcome = DocumentType::from_path(path)
            .and_then(|document_type| assembler.assemble(path, document_type));

        match outcome {
            Ok(record) => println!("{}", serde_json::to_string(&record)?),
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                failures += 1;
            }
        }
    }

    if failures == files.len() {
        return Err(format!("None of the {} files could be parsed", files.len()).into());
    }
    Ok(())
}

/// Top-level PDF and DOCX files of `dir`, in name order.
fn scan_directory(dir: &Path) -> Result<Vec<SubmittedFile>, Box<dyn Error>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        match SubmittedFile::from_path(entry.path()) {
            Ok(file) => files.push(file),
            Err(_) => info!("Ignoring {}", entry.path().display()),
        }
    }

    Ok(files)
}

fn run_batch(
    config: &Config,
    dir: &Path,
    priority: u32,
    wait: Duration,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let files = scan_directory(dir)?;
    config.validate_bulk_upload_request(files.len())?;

    let mode = config.processing_mode(files.len());
    if mode == ProcessingMode::Asynchronous {
        info!(
            "{} files exceed the bulk threshold of {}; processing in the background",
            files.len(),
            config.bulk_processing_threshold
        );
    }

    let sink: Arc<dyn RecordSink> = match output {
        Some(path) => Arc::new(JsonLinesSink::new(BufWriter::new(File::create(path)?))),
        None => Arc::new(NoopSink),
    };

    let queue = Arc::new(JobQueue::from_config(config, sink)?);
    {
        let queue = Arc::clone(&queue);
        ctrlc::set_handler(move || {
            info!("Received interrupt, shutting down...");
            queue.shutdown();
        })?;
    }

    let batch_id = uuid::Uuid::new_v4().to_string();
    let requested = files.len();
    let accepted = queue.submit_with_priority(&batch_id, files, priority);
    if accepted < requested {
        warn!("{} files did not fit in the queue", requested - accepted);
    }

    let status = queue.wait_for_batch(&batch_id, wait);
    let finished = status.as_ref().is_some_and(|status| status.is_done());
    if finished && !queue.is_shutdown() {
        queue.shutdown_after_drain(config.job_timeout());
    } else {
        queue.shutdown();
    }
    let results = queue.batch_results(&batch_id);

    let Some(status) = status else {
        return Err(format!("Batch {} was never registered", batch_id).into());
    };
    println!("{}", serde_json::to_string_pretty(&status)?);

    if let Some(results) = results {
        for processed in &results.records {
            let years = processed
                .years_experience
                .map(|y| y.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "ok\t{}\t{}\t{} yrs\t{}",
                processed.filename,
                processed.record.personal_info.name.as_deref().unwrap_or(""),
                years,
                processed.content_hash
            );
        }
        for failure in &results.failures {
            println!("failed\t{}\t{}", failure.job.filename, failure.error);
        }
    }

    if !status.is_done() {
        warn!(
            "Batch {} still has {} queued and {} active jobs",
            batch_id, status.queued, status.active
        );
    }
    Ok(())
}

//! CLI commands implementation.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::chat::{ChatService, GenerativeBackend, KeywordRetriever, OllamaBackend};
use crate::config::Settings;
use crate::ingest::{
    ExtractionWorker, IngestEvent, IngestionPipeline, ToolExtractor, UploadRequest,
    VerificationDecision,
};
use crate::models::{AccessLevel, DocumentStatus, Locale};
use crate::repository::{
    DocumentFilter, DocumentRepository, FileDocumentRepository, FileWorkflowRepository,
};
use crate::server::{self, AppState};
use crate::storage::{BlobStore, FsBlobStore};
use crate::templates::TemplateCatalog;
use crate::workflow::WorkflowTracker;

#[derive(Parser)]
#[command(name = "lexvault")]
#[command(about = "Legal document intake and research system")]
#[command(version)]
pub struct Cli {
    /// Data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a file: upload, extract text, and categorize
    Ingest {
        /// File to ingest
        file: PathBuf,
        /// Uploader identity
        #[arg(short, long, default_value = "cli")]
        user: String,
        /// Uploader access level (admin, lawyer, paralegal)
        #[arg(short, long, default_value = "lawyer", value_parser = parse_access_level)]
        access: AccessLevel,
        /// Resolve a low-confidence result without prompting
        #[arg(long, conflicts_with = "reject")]
        accept: bool,
        /// Reject a low-confidence result without prompting
        #[arg(long)]
        reject: bool,
    },

    /// Show configuration and collaborator availability
    Status,

    /// List documents in the library
    Documents {
        /// Filter by status (uploading, processing_ocr, categorized, ...)
        #[arg(short, long)]
        status: Option<String>,
        /// Filter by category
        #[arg(long)]
        category: Option<String>,
        /// Substring search over name and extracted text
        #[arg(short, long)]
        query: Option<String>,
    },

    /// List the draft template catalog
    Templates,

    /// Manage review workflows
    Workflows {
        #[command(subcommand)]
        command: WorkflowCommands,
    },

    /// Ask the legal assistant a question
    Chat {
        /// Question to ask
        question: String,
        /// Answer language (en, ar)
        #[arg(short, long, default_value = "en", value_parser = parse_locale)]
        language: Locale,
    },

    /// Start the JSON API server
    Serve {
        /// Address to bind to as HOST:PORT (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
        /// Leave OCR to external collaborators instead of the built-in worker
        #[arg(long)]
        no_ocr: bool,
    },
}

#[derive(Subcommand)]
enum WorkflowCommands {
    /// Open a new pending workflow item
    Add {
        /// Item title
        title: String,
        /// Initiator identity
        #[arg(short, long, default_value = "cli")]
        initiator: String,
        /// Due date (YYYY-MM-DD, defaults to a week out)
        #[arg(short, long)]
        due: Option<NaiveDate>,
    },
    /// List workflow items
    List,
    /// Approve a pending item
    Approve {
        /// Item ID
        item_id: String,
    },
    /// Reject a pending item
    Reject {
        /// Item ID
        item_id: String,
        /// Rejection reason
        #[arg(short, long)]
        reason: Option<String>,
    },
}

fn parse_access_level(s: &str) -> Result<AccessLevel, String> {
    match s {
        "admin" => Ok(AccessLevel::Admin),
        "lawyer" => Ok(AccessLevel::Lawyer),
        "paralegal" => Ok(AccessLevel::Paralegal),
        other => Err(format!(
            "unknown access level '{}' (expected admin, lawyer, or paralegal)",
            other
        )),
    }
}

fn parse_locale(s: &str) -> Result<Locale, String> {
    Locale::parse(s).ok_or_else(|| format!("unknown language '{}' (expected en or ar)", s))
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref(), cli.data_dir.as_deref())?;

    match cli.command {
        Commands::Ingest {
            file,
            user,
            access,
            accept,
            reject,
        } => cmd_ingest(&settings, &file, user, access, accept, reject).await,
        Commands::Status => cmd_status(&settings).await,
        Commands::Documents {
            status,
            category,
            query,
        } => cmd_documents(&settings, status.as_deref(), category, query).await,
        Commands::Templates => cmd_templates(),
        Commands::Workflows { command } => {
            let state = build_state(&settings).await?;
            match command {
                WorkflowCommands::Add {
                    title,
                    initiator,
                    due,
                } => cmd_workflow_add(&state, title, initiator, due).await,
                WorkflowCommands::List => cmd_workflow_list(&state).await,
                WorkflowCommands::Approve { item_id } => {
                    cmd_workflow_resolve(&state, &item_id, None).await
                }
                WorkflowCommands::Reject { item_id, reason } => {
                    cmd_workflow_resolve(&state, &item_id, Some(reason)).await
                }
            }
        }
        Commands::Chat { question, language } => cmd_chat(&settings, &question, language).await,
        Commands::Serve { bind, no_ocr } => cmd_serve(&settings, bind.as_deref(), no_ocr).await,
    }
}

/// Assemble the application state shared by the server and CLI commands.
///
/// Metadata lives in file-backed repositories under the data directory, so
/// `documents` and `workflows` see what earlier invocations committed.
async fn build_state(settings: &Settings) -> anyhow::Result<AppState> {
    let data_dir = settings.data_dir();
    let documents: Arc<dyn DocumentRepository> = Arc::new(
        FileDocumentRepository::open(data_dir.join("documents.json")).await?,
    );
    let workflows = Arc::new(FileWorkflowRepository::open(data_dir.join("workflows.json")).await?);

    let pipeline = Arc::new(IngestionPipeline::new(
        settings.intake.clone(),
        documents.clone(),
    ));
    let tracker = Arc::new(WorkflowTracker::new(workflows));
    let chat = Arc::new(ChatService::new(
        Arc::new(OllamaBackend::new(settings.llm.clone())),
        Arc::new(KeywordRetriever::new(documents.clone())),
    ));
    Ok(AppState {
        pipeline,
        documents,
        tracker,
        chat,
        templates: Arc::new(TemplateCatalog::new()),
    })
}

async fn cmd_ingest(
    settings: &Settings,
    file: &std::path::Path,
    user: String,
    access: AccessLevel,
    accept: bool,
    reject: bool,
) -> anyhow::Result<()> {
    let content = tokio::fs::read(file).await?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.display().to_string());
    let mime_type = mime_guess::from_path(file)
        .first_or_octet_stream()
        .to_string();

    let state = build_state(settings).await?;
    let blobs = Arc::new(FsBlobStore::new(settings.documents_dir()));

    let id = state
        .pipeline
        .begin_upload(UploadRequest {
            name: name.clone(),
            mime_type: mime_type.clone(),
            size_bytes: content.len() as u64,
            uploaded_by: user,
            access_level: access,
        })
        .await?;

    // Progress display is fed by pipeline events, same as any other observer.
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );
    pb.set_message("uploading");
    let mut rx = state.pipeline.subscribe();
    let pb_events = pb.clone();
    let events = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event {
                IngestEvent::ProgressUpdated {
                    status, progress, ..
                } => {
                    pb_events.set_position(progress as u64);
                    pb_events.set_message(status.as_str());
                }
                IngestEvent::StatusChanged { to, .. } => {
                    pb_events.set_message(to.as_str());
                    if to.is_ingestion_terminal() {
                        break;
                    }
                }
                IngestEvent::DocumentCreated { .. } => {}
            }
        }
    });

    let hash = blobs.put(&content, &mime_type).await?;
    state.pipeline.record_blob(&id, &hash).await?;
    state.pipeline.report_progress(&id, 100).await;
    state.pipeline.complete_upload(&id).await?;

    let worker = ExtractionWorker::new(Arc::new(ToolExtractor::default()), blobs);
    let mut status = worker.process(&state.pipeline, &id).await?;

    if status == DocumentStatus::RequiresVerification {
        pb.finish_and_clear();
        let doc = state.pipeline.document(&id).await;
        let confidence = doc
            .and_then(|d| d.extraction.map(|e| e.confidence))
            .unwrap_or(0.0);
        println!(
            "{} Extraction confidence {:.2} is below the {:.2} threshold",
            style("!").yellow(),
            confidence,
            settings.intake.confidence_threshold
        );

        let accepted = if accept || reject {
            accept
        } else {
            prompt_yes("Accept this document into the library?")?
        };
        let decision = if accepted {
            VerificationDecision::Accept
        } else {
            VerificationDecision::Reject
        };
        status = state.pipeline.resolve_verification(&id, decision).await?;
    }

    pb.finish_and_clear();
    let _ = events.await;

    let doc = state.pipeline.document(&id).await;
    match status {
        DocumentStatus::Categorized => {
            let category = doc
                .as_ref()
                .and_then(|d| d.category.clone())
                .unwrap_or_else(|| "Uncategorized".to_string());
            let confidence = doc
                .as_ref()
                .and_then(|d| d.extraction.as_ref().map(|e| e.confidence))
                .unwrap_or(0.0);
            println!(
                "{} Ingested '{}' as {} (confidence {:.2})",
                style("✓").green(),
                name,
                style(category).cyan(),
                confidence
            );
        }
        DocumentStatus::Rejected => {
            println!("{} Rejected '{}'", style("✗").red(), name);
        }
        other => {
            println!("{} '{}' ended in {}", style("!").yellow(), name, other);
        }
    }
    println!("  {} Document ID: {}", style("→").dim(), id);

    Ok(())
}

fn prompt_yes(question: &str) -> anyhow::Result<bool> {
    use std::io::{self, Write};
    print!("{} [y/N] ", question);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

async fn cmd_status(settings: &Settings) -> anyhow::Result<()> {
    println!("\n{}", style("LexVault Status").bold());
    println!("{}", "-".repeat(40));
    println!("{:<22} {}", "Data Directory:", settings.data_dir().display());
    println!(
        "{:<22} {}",
        "Allowed Types:",
        settings.intake.allowed_types.join(", ")
    );
    println!(
        "{:<22} {} MB",
        "Max Upload Size:",
        settings.intake.max_bytes / (1024 * 1024)
    );
    println!(
        "{:<22} {:.2}",
        "Confidence Threshold:", settings.intake.confidence_threshold
    );

    println!("\n{}", style("Extraction Tools:").cyan());
    let available = ToolExtractor::available_tools();
    for tool in ["pdftotext", "tesseract"] {
        let mark = if available.contains(&tool) {
            style("✓ found").green()
        } else {
            style("✗ not found").red()
        };
        println!("  {:<15} {}", tool, mark);
    }

    println!("\n{}", style("Assistant Backend:").cyan());
    let backend = OllamaBackend::new(settings.llm.clone());
    let mark = if backend.is_available().await {
        style("✓ reachable").green()
    } else {
        style("✗ unreachable").red()
    };
    println!("  {:<15} {}", settings.llm.model, mark);
    println!("  {:<15} {}", "endpoint", settings.llm.endpoint);

    Ok(())
}

async fn cmd_documents(
    settings: &Settings,
    status: Option<&str>,
    category: Option<String>,
    query: Option<String>,
) -> anyhow::Result<()> {
    let status = match status {
        Some(raw) => Some(
            DocumentStatus::parse(raw)
                .ok_or_else(|| anyhow::anyhow!("unknown status '{}'", raw))?,
        ),
        None => None,
    };

    let state = build_state(settings).await?;
    let docs = state
        .documents
        .list(&DocumentFilter {
            status,
            category,
            query,
        })
        .await?;
    if docs.is_empty() {
        println!("{} No documents in the library", style("!").yellow());
        return Ok(());
    }

    println!("\n{}", style("Documents").bold());
    println!("{}", "-".repeat(70));
    println!(
        "{:<38} {:<22} {:<12} Category",
        "ID", "Name", "Status"
    );
    println!("{}", "-".repeat(70));
    for doc in docs {
        println!(
            "{:<38} {:<22} {:<12} {}",
            doc.id,
            doc.name,
            doc.status,
            doc.category.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn cmd_templates() -> anyhow::Result<()> {
    let catalog = TemplateCatalog::new();

    println!("\n{}", style("Draft Templates").bold());
    println!("{}", "-".repeat(60));
    println!("{:<22} {:<26} Description", "ID", "Title");
    println!("{}", "-".repeat(60));
    for template in catalog.list() {
        println!(
            "{:<22} {:<26} {}",
            template.id, template.title, template.description
        );
    }

    Ok(())
}

async fn cmd_workflow_add(
    state: &AppState,
    title: String,
    initiator: String,
    due: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let due_date = due.unwrap_or_else(|| Utc::now().date_naive() + Duration::days(7));
    let item = state.tracker.create(title, initiator, due_date).await?;
    println!(
        "{} Opened workflow '{}' due {}",
        style("✓").green(),
        item.title,
        item.due_date
    );
    println!("  {} Item ID: {}", style("→").dim(), item.id);
    Ok(())
}

async fn cmd_workflow_list(state: &AppState) -> anyhow::Result<()> {
    let items = state.tracker.list(None).await?;
    if items.is_empty() {
        println!("{} No workflow items", style("!").yellow());
        return Ok(());
    }

    let today = Utc::now().date_naive();
    println!("\n{}", style("Workflows").bold());
    println!("{}", "-".repeat(60));
    for item in items {
        let due = if item.is_overdue(today) {
            style(format!("{} (overdue)", item.due_date)).red().to_string()
        } else {
            item.due_date.to_string()
        };
        println!(
            "{:<38} {:<10} due {}  {}",
            item.id, item.status, due, item.title
        );
    }
    Ok(())
}

async fn cmd_workflow_resolve(
    state: &AppState,
    item_id: &str,
    reject_reason: Option<Option<String>>,
) -> anyhow::Result<()> {
    let result = match reject_reason {
        None => state.tracker.approve(item_id).await,
        Some(reason) => state.tracker.reject(item_id, reason).await,
    };
    match result {
        Ok(item) => {
            println!(
                "{} Workflow '{}' is now {}",
                style("✓").green(),
                item.title,
                item.status
            );
            Ok(())
        }
        Err(e) => {
            println!("{} {}", style("✗").red(), e);
            Err(e.into())
        }
    }
}

async fn cmd_chat(settings: &Settings, question: &str, language: Locale) -> anyhow::Result<()> {
    let state = build_state(settings).await?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message("Thinking...");

    let conv = state.chat.start_conversation(language).await;
    let answer = state.chat.ask(&conv.id, question, None).await?;
    pb.finish_and_clear();

    println!("{}", answer);
    Ok(())
}

async fn cmd_serve(
    settings: &Settings,
    bind: Option<&str>,
    no_ocr: bool,
) -> anyhow::Result<()> {
    let mut settings = settings.clone();
    if let Some(bind) = bind {
        let (host, port) = bind
            .rsplit_once(':')
            .ok_or_else(|| anyhow::anyhow!("bind address must be HOST:PORT, got '{}'", bind))?;
        settings.server.host = host.to_string();
        settings.server.port = port.parse()?;
    }

    let state = build_state(&settings).await?;
    let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(settings.documents_dir()));

    // The built-in worker picks up documents as they enter the OCR phase.
    // External OCR collaborators use the extraction callback instead.
    if !no_ocr {
        let worker = Arc::new(ExtractionWorker::new(
            Arc::new(ToolExtractor::default()),
            blobs,
        ));
        let pipeline = state.pipeline.clone();
        let mut rx = pipeline.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(IngestEvent::StatusChanged { id, to, .. })
                        if to == DocumentStatus::ProcessingOcr =>
                    {
                        let worker = worker.clone();
                        let pipeline = pipeline.clone();
                        tokio::spawn(async move {
                            if let Err(e) = worker.process(&pipeline, &id).await {
                                tracing::warn!(document = %id, "Extraction worker failed: {}", e);
                            }
                        });
                    }
                    Ok(_) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("Extraction worker lagged {} events", n);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    server::serve(&settings, state).await
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        (build_state(&settings).await.unwrap(), dir)
    }

    #[tokio::test]
    async fn test_resolve_unknown_workflow_exits_nonzero() {
        let (state, _dir) = test_state().await;
        let result = cmd_workflow_resolve(&state, "missing", None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_resolve_known_workflow_succeeds() {
        let (state, _dir) = test_state().await;
        let due = Utc::now().date_naive() + Duration::days(7);
        let item = state
            .tracker
            .create("NDA review", "sarah", due)
            .await
            .unwrap();
        assert!(cmd_workflow_resolve(&state, &item.id, None).await.is_ok());
    }
}

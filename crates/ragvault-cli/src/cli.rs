//! CLI definition and command dispatch for RagVault.
//!
//! ## Configuration Precedence
//!
//! 1. CLI flags (`--config`, `--data-dir`, `--verbose`)
//! 2. Environment variables (`RAGVAULT_CONFIG`, `RAGVAULT_DATA_DIR`, `RAGVAULT_VERBOSE`)
//! 3. Settings file (`~/.ragvault/config.yaml`)
//! 4. Built-in defaults
//!
//! The running index configuration (`ragvault config set`) is persisted in the
//! data directory and takes precedence over the `index` section of the
//! settings file once it exists.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};

use ragvault_core::{
    IndexConfigPatch, LoadOptions, PinnedRecordInput, RagEngine, RagError, RagSettings,
    RecordType, SaveOptions,
};

use crate::ui::color::terminal_width;
use crate::ui::format::{format_bytes, format_duration_ms, format_relative_time, snippet};
use crate::ui::progress::Spinner;
use crate::ui::{table, ColorMode, IndexProgress, MessageType, ProgressMode, Style};

// ============================================================================
// CLI Definition
// ============================================================================

/// RagVault – local document knowledge base with dual-embedding retrieval
#[derive(Parser, Debug)]
#[command(name = "ragvault")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, env = "RAGVAULT_VERBOSE")]
    pub verbose: bool,

    /// Suppress progress and informational messages
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print machine-readable JSON instead of formatted output
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to settings file (default: ~/.ragvault/config.yaml)
    #[arg(long, global = true, env = "RAGVAULT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory holding the store, snapshots and running config
    #[arg(long, global = true, env = "RAGVAULT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Color output mode
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the data directory and open the vector store
    #[command(after_help = r#"EXAMPLES:
    # Initialize the default data directory (~/.ragvault/data)
    ragvault init

    # Use a project-local data directory
    ragvault --data-dir ./.ragvault init
"#)]
    Init,

    /// Index files and directories
    #[command(after_help = r#"EXAMPLES:
    # Index a documentation folder
    ragvault index docs/

    # Index a few files and a source tree
    ragvault index README.md CHANGELOG.md src/

Directories are walked recursively; .git, node_modules, target and similar
directories are skipped. Press Ctrl-C to stop after the current batch;
files already written stay in the store.
"#)]
    Index {
        /// Files or directories to index
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Search the knowledge base
    #[command(after_help = r#"EXAMPLES:
    # Ask a question
    ragvault search "how is the cache invalidated?"

    # Only show the three best hits
    ragvault search "retry policy" --limit 3

    # Machine-readable output
    ragvault search "retry policy" --json
"#)]
    Search {
        /// Natural-language or code query
        query: String,

        /// Show at most this many results (the engine returns `rerank_top_n`)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show store statistics
    Stats,

    /// Delete every record from the store
    #[command(after_help = r#"EXAMPLES:
    # Save first, then clear
    ragvault snapshot save before-clear && ragvault clear --yes
"#)]
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Pin a note or conversation turn so it is retrieved with documents
    #[command(after_help = r#"EXAMPLES:
    # Pin a note with a positive boost
    ragvault pin "Deploys go through the staging cluster first" --boost 0.2

    # Pin an assistant answer under a stable id
    ragvault pin "The cache TTL is 10 minutes" --id answer-42 --type assistant --tags cache,ops
"#)]
    Pin {
        /// Text to embed and store
        text: String,

        /// Record id (default: generated from the current time)
        #[arg(long)]
        id: Option<String>,

        /// Record type: pinned_user, pinned_assistant or system
        #[arg(long = "type", default_value = "pinned_user")]
        record_type: RecordType,

        /// Score boost added to the similarity (may be negative)
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        boost: f32,

        /// Priority carried with the record
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        priority: i32,

        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Free-form source label (default: pinned://<id>)
        #[arg(long)]
        source: Option<String>,
    },

    /// Remove a pinned record
    Unpin {
        /// Id given to `ragvault pin`
        id: String,
    },

    /// Save, load and manage snapshots of the store
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },

    /// Show or change the running index configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check embedding models against each other and the store
    #[command(after_help = r#"EXAMPLES:
    # Check the configured models
    ragvault models

    # Try a different code model before switching to it
    ragvault models --code-model nomic-embed-code
"#)]
    Models {
        /// Text model to probe (default: configured text model)
        #[arg(long)]
        text_model: Option<String>,

        /// Code model to probe (default: configured code model)
        #[arg(long)]
        code_model: Option<String>,
    },
}

impl Command {
    /// Whether the command works on the live store.
    fn needs_store(&self) -> bool {
        !matches!(self, Self::Init | Self::Config { .. })
    }
}

/// Snapshot subcommands
#[derive(Subcommand, Debug)]
pub enum SnapshotAction {
    /// Save the live store under a name
    #[command(after_help = r#"EXAMPLES:
    ragvault snapshot save nightly
    ragvault snapshot save release --timestamp
"#)]
    Save {
        name: String,

        /// Append _YYYYMMDD_HHMMSS to the name
        #[arg(long)]
        timestamp: bool,
    },

    /// Replace the live store with a snapshot
    #[command(after_help = r#"EXAMPLES:
    # Check first, then load
    ragvault snapshot check nightly && ragvault snapshot load nightly
"#)]
    Load {
        name: String,

        /// Do not back up the live store before replacing it
        #[arg(long)]
        skip_backup: bool,
    },

    /// Merge a snapshot's records into the live store
    Append { name: String },

    /// List snapshots, newest first
    List,

    /// Show one snapshot's metadata
    Info { name: String },

    /// Check whether a snapshot can be loaded with the installed models
    Check { name: String },

    /// Delete a snapshot
    Delete { name: String },

    /// Show the active snapshot pointer
    Active,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the running index configuration
    Show,

    /// Set one or more keys
    #[command(after_help = r#"EXAMPLES:
    ragvault config set use_reranking=true rerank_top_n=10
    ragvault config set code_model=nomic-embed-code

Changing `dimension` is only possible while the store is empty.
"#)]
    Set {
        /// key=value pairs
        #[arg(required = true)]
        pairs: Vec<String>,
    },
}

// ============================================================================
// Entry point
// ============================================================================

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Warnings always; debug only with --verbose. Logs go to stderr so that
    // --json output stays parseable.
    let log_level = if cli.verbose { "debug" } else { "warn" };
    let filter = format!(
        "ragvault_core={l},ragvault_db={l},ragvault_model={l},ragvault_cli={l}",
        l = log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(&filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let style = Style::new(cli.color);
    let mode = ProgressMode::detect(cli.quiet, cli.json);

    let engine = match build_engine(&cli) {
        Ok(engine) => engine,
        Err(e) => {
            let hint = match &cli.config {
                Some(path) => format!("Check your settings at {}", path.display()),
                None => "Check your settings at ~/.ragvault/config.yaml".to_string(),
            };
            eprintln!(
                "{}",
                style.error_with_context(
                    "Failed to initialize RagVault",
                    Some(&e.to_string()),
                    Some(&hint),
                )
            );
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!(
                "{}",
                style.error_with_context("Failed to start async runtime", Some(&e.to_string()), None)
            );
            return ExitCode::FAILURE;
        }
    };

    let ctx = Ctx {
        style: &style,
        engine: &engine,
        json: cli.json,
        mode,
    };
    let result = runtime.block_on(dispatch(ctx, cli.command));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let hint = e.downcast_ref::<RagError>().and_then(hint_for);
            let cause = e.chain().nth(1).map(|c| c.to_string());
            eprintln!(
                "{}",
                style.error_with_context(&e.to_string(), cause.as_deref(), hint.as_deref())
            );
            ExitCode::FAILURE
        }
    }
}

fn build_engine(cli: &Cli) -> Result<RagEngine, RagError> {
    let mut settings = RagSettings::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        settings = settings.with_data_dir(dir);
    }
    RagEngine::from_settings(settings)
}

/// Actionable follow-up for errors a user can fix.
fn hint_for(err: &RagError) -> Option<String> {
    let hint = match err {
        RagError::Provider(_) => {
            "Is the embedding service running? Check `embedding.base_url` in your settings"
        }
        RagError::NotInitialized => "Run `ragvault init` first",
        RagError::EmptyStore => "Index some documents with `ragvault index <paths>`",
        RagError::DimensionMismatch { .. } => {
            "Both models must produce the store dimension; run `ragvault models` to compare"
        }
        RagError::SnapshotNotFound(_) => "List snapshots with `ragvault snapshot list`",
        RagError::SnapshotInUse(_) => "Load another snapshot or run `ragvault clear --yes` first",
        RagError::SnapshotValidation(_) => "Run `ragvault snapshot check <name>` for details",
        RagError::SnapshotRestore { .. } => {
            "The snapshot's store files may be damaged; save a fresh snapshot"
        }
        RagError::Config(_) => "Check the YAML syntax of your settings file",
        _ => return None,
    };
    Some(hint.to_string())
}

/// Shared state for command handlers.
#[derive(Clone, Copy)]
struct Ctx<'a> {
    style: &'a Style,
    engine: &'a RagEngine,
    json: bool,
    mode: ProgressMode,
}

impl Ctx<'_> {
    fn say(&self, msg_type: MessageType, text: &str) {
        if !self.json {
            println!("{}", self.style.message(msg_type, text));
        }
    }

    fn detail(&self, label: &str, value: &str) {
        if !self.json {
            println!("{}", self.style.message_detail(label, value));
        }
    }
}

async fn dispatch(ctx: Ctx<'_>, command: Command) -> anyhow::Result<()> {
    if command.needs_store() {
        ctx.engine.initialize_database().await?;
    }

    match command {
        Command::Init => handle_init(ctx).await,
        Command::Index { paths } => handle_index(ctx, paths).await,
        Command::Search { query, limit } => handle_search(ctx, &query, limit).await,
        Command::Stats => handle_stats(ctx).await,
        Command::Clear { yes } => handle_clear(ctx, yes).await,
        Command::Pin {
            text,
            id,
            record_type,
            boost,
            priority,
            tags,
            source,
        } => {
            let id = id.unwrap_or_else(|| format!("pin-{}", Utc::now().format("%Y%m%d%H%M%S%3f")));
            let mut input = PinnedRecordInput::new(id, text)
                .with_record_type(record_type)
                .with_score_boost(boost)
                .with_priority(priority)
                .with_tags(tags);
            input.source = source;
            handle_pin(ctx, input).await
        }
        Command::Unpin { id } => handle_unpin(ctx, &id).await,
        Command::Snapshot { action } => handle_snapshot(ctx, action).await,
        Command::Config { action } => handle_config(ctx, action).await,
        Command::Models {
            text_model,
            code_model,
        } => handle_models(ctx, text_model, code_model).await,
    }
}

// ============================================================================
// Command handlers
// ============================================================================

async fn handle_init(ctx: Ctx<'_>) -> anyhow::Result<()> {
    let layout = ctx.engine.layout();
    let existed = layout.store_dir.exists();
    ctx.engine.initialize_database().await?;

    let stats = ctx.engine.stats().await?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&stats).unwrap_or_default());
        return Ok(());
    }

    if existed {
        ctx.say(
            MessageType::Info,
            &format!("Store already initialized at {}", layout.root.display()),
        );
    } else {
        ctx.say(
            MessageType::Ok,
            &format!("Initialized store at {}", layout.root.display()),
        );
    }
    ctx.detail("Backend", &stats.backend);
    ctx.detail("Dimension", &stats.dimension.to_string());
    ctx.detail("Models", &format!("{} (text), {} (code)", stats.text_model, stats.code_model));
    ctx.detail("Records", &stats.count.to_string());

    if stats.count == 0 {
        println!();
        println!("{}", ctx.style.message(MessageType::Hint, "Next steps:"));
        println!("  1. Index documents:  ragvault index docs/");
        println!("  2. Ask a question:   ragvault search \"How does this work?\"");
        println!("  3. Save the result:  ragvault snapshot save docs");
    }
    Ok(())
}

async fn handle_index(ctx: Ctx<'_>, paths: Vec<PathBuf>) -> anyhow::Result<()> {
    for path in paths.iter().filter(|p| !p.exists()) {
        ctx.say(
            MessageType::Warn,
            &format!("{} does not exist", path.display()),
        );
    }

    let total = ragvault_core::expand_paths(&paths).len() as u64;
    let progress = IndexProgress::new(total, ctx.mode);
    let (tx, rx) = ragvault_core::progress_channel();
    let listener = progress.listen(rx);

    let abort = ctx.engine.abort_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, stopping after the current batch");
            abort.abort();
        }
    });

    let result = ctx.engine.add_documents(&paths, Some(tx)).await;
    interrupt.abort();
    if let Err(e) = listener.await {
        tracing::debug!("Progress listener ended abnormally: {}", e);
    }
    progress.finish();

    let outcome = result.context("Indexing failed")?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&outcome).unwrap_or_default());
    } else {
        let msg_type = if outcome.aborted || outcome.files_skipped > 0 {
            MessageType::Warn
        } else {
            MessageType::Ok
        };
        ctx.say(msg_type, &outcome.message);
        ctx.detail("Duration", &format_duration_ms(outcome.duration_ms));
        if let Some(backup) = &outcome.backup {
            ctx.detail("Backup", &ctx.style.snapshot_name(backup));
        }

        if !outcome.failures.is_empty() {
            ctx.say(
                MessageType::Skip,
                &format!("Skipped {} file(s)", outcome.failures.len()),
            );
            for failure in &outcome.failures {
                println!(
                    "{}",
                    ctx.style
                        .list_item("-", &format!("{} ({})", failure.file, failure.message))
                );
            }
        }
    }

    if outcome.aborted {
        bail!("Indexing aborted; only flushed files were kept");
    }
    if !outcome.success {
        bail!("No files could be indexed");
    }
    Ok(())
}

async fn handle_search(ctx: Ctx<'_>, query: &str, limit: Option<usize>) -> anyhow::Result<()> {
    let mut response = ctx.engine.search(query).await?;
    if let Some(limit) = limit {
        response.results.truncate(limit);
    }

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&response).unwrap_or_default());
        return Ok(());
    }

    if let Some(message) = &response.message {
        ctx.say(MessageType::Info, message);
        return Ok(());
    }
    if response.results.is_empty() {
        ctx.say(MessageType::Info, "No matching chunks found.");
        return Ok(());
    }

    let style = ctx.style;
    println!("{}", style.section("RESULTS"));
    println!();

    let width = terminal_width().saturating_sub(6).max(20);
    for (i, hit) in response.results.iter().enumerate() {
        let mut line = format!(
            "  {}. {} {} score: {}",
            i + 1,
            style.file_path(&hit.file_path),
            style.tag(&hit.space.to_string()),
            style.score(hit.score)
        );
        if let Some(rerank) = hit.rerank_score {
            line.push_str(&format!(" rerank: {:.3}", rerank));
        }
        if hit.record_type != RecordType::File {
            line.push_str(&format!(" {}", style.tag(hit.record_type.as_str())));
        }
        println!("{}", line);

        if let Some(heading) = &hit.heading {
            println!("     {}", style.key_value("Section", heading));
        }
        let preview = snippet(&hit.text, width);
        if !preview.is_empty() {
            println!("     {}", preview);
        }
        println!();
    }

    ctx.say(
        MessageType::Ok,
        &format!(
            "{} chunks from {} sources in {}",
            response.results.len(),
            response.sources_count,
            format_duration_ms(response.duration_ms)
        ),
    );
    Ok(())
}

async fn handle_stats(ctx: Ctx<'_>) -> anyhow::Result<()> {
    let stats = ctx.engine.stats().await?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&stats).unwrap_or_default());
        return Ok(());
    }

    let style = ctx.style;
    println!("{}", style.section("STORE"));
    println!();
    println!("  {}", style.key_value("Data dir", &ctx.engine.layout().root.display().to_string()));
    println!("  {}", style.key_value("Backend", &stats.backend));
    println!("  {}", style.key_value("Records", &stats.count.to_string()));
    println!("  {}", style.key_value("Files", &stats.files.to_string()));
    println!("  {}", style.key_value("Dimension", &stats.dimension.to_string()));
    println!("  {}", style.key_value("Text model", &stats.text_model));
    println!("  {}", style.key_value("Code model", &stats.code_model));

    let active = match &stats.active_snapshot {
        Some(name) if stats.modified_since_load => {
            format!("{} (modified since load)", style.snapshot_name(name))
        }
        Some(name) => style.snapshot_name(name),
        None => "-".to_string(),
    };
    println!("  {}", style.key_value("Snapshot", &active));
    Ok(())
}

async fn handle_clear(ctx: Ctx<'_>, yes: bool) -> anyhow::Result<()> {
    if !yes {
        let count = ctx.engine.stats().await?.count;
        bail!(
            "Refusing to delete {} records without --yes (save a snapshot first to keep them)",
            count
        );
    }

    ctx.engine.clear_database().await?;
    if ctx.json {
        println!("{}", serde_json::json!({ "cleared": true }));
    } else {
        ctx.say(MessageType::Ok, "Cleared the vector store");
    }
    Ok(())
}

async fn handle_pin(ctx: Ctx<'_>, input: PinnedRecordInput) -> anyhow::Result<()> {
    let id = input.id.clone();
    let record_id = ctx.engine.add_pinned_record(input).await?;

    if ctx.json {
        println!(
            "{}",
            serde_json::json!({ "id": id, "recordId": record_id, "filePath": format!("pinned://{}", id) })
        );
    } else {
        ctx.say(MessageType::Ok, &format!("Pinned `{}`", id));
        ctx.detail("Path", &format!("pinned://{}", id));
    }
    Ok(())
}

async fn handle_unpin(ctx: Ctx<'_>, id: &str) -> anyhow::Result<()> {
    let removed = ctx.engine.remove_pinned_record(id).await?;

    if ctx.json {
        println!("{}", serde_json::json!({ "id": id, "removed": removed }));
    } else if removed == 0 {
        ctx.say(MessageType::Info, &format!("No pinned record with id `{}`", id));
    } else {
        ctx.say(MessageType::Ok, &format!("Removed pinned record `{}`", id));
    }
    Ok(())
}

async fn handle_snapshot(ctx: Ctx<'_>, action: SnapshotAction) -> anyhow::Result<()> {
    let style = ctx.style;
    let engine = ctx.engine;

    match action {
        SnapshotAction::Save { name, timestamp } => {
            let spinner = Spinner::start(&format!("Saving snapshot {}", name), ctx.mode);
            let result = engine
                .save_snapshot(
                    &name,
                    SaveOptions {
                        auto_timestamp: timestamp,
                    },
                )
                .await;
            spinner.finish();
            let outcome = result.with_context(|| format!("Failed to save snapshot `{}`", name))?;

            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&outcome).unwrap_or_default());
            } else {
                ctx.say(
                    MessageType::Ok,
                    &format!("Saved snapshot {}", style.snapshot_name(&outcome.name)),
                );
                ctx.detail("Chunks", &outcome.chunks.to_string());
                ctx.detail("Files", &outcome.files.to_string());
                ctx.detail("Path", &outcome.path.display().to_string());
            }
        }

        SnapshotAction::Load { name, skip_backup } => {
            let spinner = Spinner::start(&format!("Loading snapshot {}", name), ctx.mode);
            let result = engine
                .load_snapshot(&name, LoadOptions { skip_backup })
                .await;
            spinner.finish();
            let outcome = result.with_context(|| format!("Failed to load snapshot `{}`", name))?;

            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&outcome).unwrap_or_default());
            } else {
                ctx.say(
                    MessageType::Ok,
                    &format!("Loaded snapshot {}", style.snapshot_name(&outcome.name)),
                );
                ctx.detail("Chunks", &outcome.chunks.to_string());
                ctx.detail("Dimension", &outcome.dimension.to_string());
                if let Some(backup) = &outcome.backup {
                    ctx.detail("Backup", &style.snapshot_name(backup));
                }
            }
        }

        SnapshotAction::Append { name } => {
            let spinner = Spinner::start(&format!("Appending snapshot {}", name), ctx.mode);
            let result = engine.append_snapshot(&name).await;
            spinner.finish();
            let outcome =
                result.with_context(|| format!("Failed to append snapshot `{}`", name))?;

            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&outcome).unwrap_or_default());
            } else {
                ctx.say(
                    MessageType::Ok,
                    &format!(
                        "Appended {} records from {} files",
                        outcome.records_added, outcome.files_added
                    ),
                );
                if outcome.duplicates_skipped > 0 {
                    ctx.say(
                        MessageType::Skip,
                        &format!(
                            "Skipped {} records from files already in the store",
                            outcome.duplicates_skipped
                        ),
                    );
                }
                for warning in &outcome.warnings {
                    ctx.say(MessageType::Warn, warning);
                }
            }
        }

        SnapshotAction::List => {
            let snapshots = engine.list_snapshots().await?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&snapshots).unwrap_or_default());
            } else if snapshots.is_empty() {
                ctx.say(MessageType::Info, "No snapshots yet.");
                ctx.say(MessageType::Hint, "Save one with `ragvault snapshot save <name>`");
            } else {
                println!("{}", table::render_snapshots_table(&snapshots));
            }
        }

        SnapshotAction::Info { name } => {
            let info = engine.snapshot_info(&name).await?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&info).unwrap_or_default());
                return Ok(());
            }

            let meta = &info.metadata;
            let unknown = || "-".to_string();
            println!("{}", style.section("SNAPSHOT"));
            println!();
            println!("  {}", style.key_value("Name", &style.snapshot_name(&meta.name)));
            println!(
                "  {}",
                style.key_value(
                    "Created",
                    &format!(
                        "{} ({})",
                        meta.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                        format_relative_time(meta.created_at)
                    )
                )
            );
            println!("  {}", style.key_value("Format", &meta.format_version.to_string()));
            println!("  {}", style.key_value("Chunks", &meta.chunks.to_string()));
            println!("  {}", style.key_value("Files", &meta.files.to_string()));
            println!("  {}", style.key_value("Dimension", &meta.dimension.to_string()));
            println!(
                "  {}",
                style.key_value("Text model", &meta.text_model.clone().unwrap_or_else(unknown))
            );
            println!(
                "  {}",
                style.key_value("Code model", &meta.code_model.clone().unwrap_or_else(unknown))
            );
            println!("  {}", style.key_value("Backend", &meta.backend));
            println!("  {}", style.key_value("Size", &format_bytes(info.size_bytes)));
            println!(
                "  {}",
                style.key_value("Active", if info.is_active { "yes" } else { "no" })
            );
        }

        SnapshotAction::Check { name } => {
            let report = engine.check_snapshot_compatibility(&name).await?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
                return Ok(());
            }

            if report.compatible {
                ctx.say(
                    MessageType::Ok,
                    &format!("Snapshot {} can be loaded", style.snapshot_name(&report.name)),
                );
            } else {
                ctx.say(
                    MessageType::Warn,
                    &format!("Snapshot {} cannot be loaded", style.snapshot_name(&report.name)),
                );
                for issue in &report.issues {
                    println!("{}", style.list_item("-", issue));
                }
            }
            for warning in &report.warnings {
                ctx.say(MessageType::Warn, warning);
            }
        }

        SnapshotAction::Delete { name } => {
            engine.delete_snapshot(&name).await?;
            if ctx.json {
                println!("{}", serde_json::json!({ "deleted": name }));
            } else {
                ctx.say(
                    MessageType::Ok,
                    &format!("Deleted snapshot {}", style.snapshot_name(&name)),
                );
            }
        }

        SnapshotAction::Active => {
            let pointer = engine.active_snapshot().await?;
            if ctx.json {
                println!("{}", serde_json::to_string_pretty(&pointer).unwrap_or_default());
                return Ok(());
            }

            match pointer {
                Some(pointer) => {
                    ctx.say(
                        MessageType::Info,
                        &format!(
                            "Active snapshot: {}",
                            style.snapshot_name(&pointer.snapshot_name)
                        ),
                    );
                    ctx.detail("Loaded", &format_relative_time(pointer.loaded_at));
                    ctx.detail(
                        "Modified",
                        if pointer.modified_since_load { "yes" } else { "no" },
                    );
                }
                None => ctx.say(MessageType::Info, "No snapshot loaded."),
            }
        }
    }

    Ok(())
}

async fn handle_config(ctx: Ctx<'_>, action: ConfigAction) -> anyhow::Result<()> {
    let config = match action {
        ConfigAction::Show => ctx.engine.config().await,
        ConfigAction::Set { pairs } => {
            let mut patch = IndexConfigPatch::default();
            for pair in &pairs {
                let (key, value) = pair
                    .split_once('=')
                    .with_context(|| format!("Expected key=value, got `{}`", pair))?;
                patch.set(key.trim(), value.trim())?;
            }
            let updated = ctx.engine.set_config(patch).await?;
            ctx.say(MessageType::Ok, &format!("Updated {} key(s)", pairs.len()));
            updated
        }
    };

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&config).unwrap_or_default());
    } else {
        println!("{}", table::render_config_table(&config));
    }
    Ok(())
}

async fn handle_models(
    ctx: Ctx<'_>,
    text_model: Option<String>,
    code_model: Option<String>,
) -> anyhow::Result<()> {
    let config = ctx.engine.config().await;
    let text_model = text_model.unwrap_or(config.text_model);
    let code_model = code_model.unwrap_or(config.code_model);

    let report = ctx
        .engine
        .validate_model_compatibility(&text_model, &code_model)
        .await?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
        return Ok(());
    }

    if report.compatible {
        ctx.say(MessageType::Ok, "Models are compatible with the store");
    } else {
        ctx.say(MessageType::Warn, "Models are not compatible with the store");
    }
    ctx.detail("Text", &format!("{} ({} dims)", text_model, report.text_dimension));
    ctx.detail("Code", &format!("{} ({} dims)", code_model, report.code_dimension));
    ctx.detail(
        "Store",
        &format!("{} dims, {} records", report.store_dimension, report.store_count),
    );
    for issue in &report.issues {
        println!("{}", ctx.style.list_item("-", issue));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_pin_accepts_negative_boost() {
        let cli = Cli::try_parse_from([
            "ragvault", "pin", "legacy note", "--boost", "-0.5", "--tags", "a,b", "--type",
            "assistant",
        ])
        .expect("parse");
        match cli.command {
            Command::Pin {
                boost,
                tags,
                record_type,
                ..
            } => {
                assert_eq!(boost, -0.5);
                assert_eq!(tags, vec!["a", "b"]);
                assert_eq!(record_type, RecordType::PinnedAssistant);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_store_free_commands() {
        let cli = Cli::try_parse_from(["ragvault", "config", "show"]).expect("parse");
        assert!(!cli.command.needs_store());
        let cli = Cli::try_parse_from(["ragvault", "stats"]).expect("parse");
        assert!(cli.command.needs_store());
    }

    #[test]
    fn test_hints_for_fixable_errors() {
        assert!(hint_for(&RagError::NotInitialized)
            .is_some_and(|h| h.contains("ragvault init")));
        assert!(hint_for(&RagError::SnapshotNotFound("x".into()))
            .is_some_and(|h| h.contains("snapshot list")));
        assert!(hint_for(&RagError::invalid_config("bad", "fix it")).is_none());
    }
}

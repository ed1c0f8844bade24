use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cursor_orchestrator::{spawn_run, CursorHandle, TestPlan};
use element_scanner::{metrics as scan_metrics, scan, SCAN_TAG_ATTR};
use improve_loop::{
    spawn_improve, CredentialStore, ImproveHandle, ImprovePhase, MemoryCredentialStore,
    RecordingSurface, ScriptedGenerationService,
};
use page_model::{samples, DocumentSpec, PageDocument};
use selector_engine::compute_selector;

use pagepilot_cli::config::Config;
use pagepilot_cli::credentials::FileCredentialStore;
use pagepilot_cli::host::{HostController, RunKind};
use pagepilot_cli::project::{self, ProjectSpec};
use pagepilot_cli::report::{self, OutputFormat, ScanOutput};

/// PagePilot - a virtual user for generated web apps
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a document and print what a scan finds in it
    Scan(ScanArgs),
    /// Let the virtual cursor act on a sandboxed document
    Drive(DriveArgs),
    /// Run the autonomous improvement loop over a scripted project
    Improve(ImproveArgs),
    /// Show version and build information
    Info,
}

#[derive(Args)]
struct ScanArgs {
    /// Document spec (YAML or JSON); the built-in demo app when omitted
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Compute a selector path per element
    #[arg(long)]
    selectors: bool,

    /// Include scanner counters in the output
    #[arg(long)]
    metrics: bool,
}

#[derive(Args)]
struct DriveArgs {
    /// Document spec (YAML or JSON); the built-in demo app when omitted
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Scripted plan (YAML); random walk when omitted
    #[arg(long, value_name = "FILE")]
    plan: Option<PathBuf>,

    /// RNG seed for a reproducible random walk
    #[arg(long)]
    seed: Option<u64>,

    /// Random-walk action budget (0 = run until stopped)
    #[arg(long, default_value_t = 10)]
    max_actions: u32,

    /// Stop the run after this long, e.g. "30s"
    #[arg(long, value_parser = humantime::parse_duration)]
    duration: Option<Duration>,
}

#[derive(Args)]
struct ImproveArgs {
    /// Project file: app files, change requests, optional document
    #[arg(long, value_name = "FILE")]
    project: PathBuf,

    /// Credentials file (YAML map); overrides the configured path
    #[arg(long, value_name = "FILE")]
    credentials: Option<PathBuf>,

    /// RNG seed for reproducible review passes
    #[arg(long)]
    seed: Option<u64>,

    /// Cycle budget; defaults to the project's request count
    #[arg(long)]
    cycles: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref())?;

    info!("Starting PagePilot v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load(cli.config.as_deref()).await?;

    // Execute command
    let result = match cli.command {
        Commands::Scan(args) => cmd_scan(args, cli.output).await,
        Commands::Drive(args) => cmd_drive(args, &config, cli.output).await,
        Commands::Improve(args) => cmd_improve(args, &config, cli.output).await,
        Commands::Info => cmd_info(&config).await,
    };

    match result {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(
    level: &str,
    log_file: Option<&Path>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Invalid log level")?;

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let directory = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let file_name = path
                .file_name()
                .context("Log file path needs a file name")?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(
                    directory, file_name,
                ));
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn load_input(input: Option<&PathBuf>) -> Result<DocumentSpec> {
    match input {
        Some(path) => project::load_document(path).await,
        None => Ok(samples::demo_document()),
    }
}

async fn cmd_scan(args: ScanArgs, output: OutputFormat) -> Result<()> {
    let spec = load_input(args.input.as_ref()).await?;
    let mut doc = PageDocument::from_spec(&spec).context("document spec rejected")?;
    let elements = scan(&mut doc).context("scan failed")?;
    info!("Scan found {} interactive element(s)", elements.len());

    let selectors = args.selectors.then(|| {
        elements
            .iter()
            .map(|element| {
                doc.find_by_attr(SCAN_TAG_ATTR, &element.id.to_string())
                    .and_then(|node| compute_selector(&doc, node))
            })
            .collect::<Vec<_>>()
    });
    let metrics = args.metrics.then(scan_metrics::snapshot);

    let payload = ScanOutput {
        elements,
        selectors,
        metrics,
    };
    report::emit(output, &payload, || report::scan_text(&payload))
}

async fn cmd_drive(args: DriveArgs, config: &Config, output: OutputFormat) -> Result<()> {
    let spec = load_input(args.input.as_ref()).await?;
    let plan = match &args.plan {
        Some(path) => {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read plan file {}", path.display()))?;
            let plan: TestPlan = serde_yaml::from_str(&content)
                .with_context(|| format!("failed to parse plan file {}", path.display()))?;
            info!("Loaded plan with {} step(s)", plan.len());
            Some(plan)
        }
        None => None,
    };

    let controller = HostController::start(config.agent.sandbox_config());
    let _guard = controller.begin_run(RunKind::Drive)?;
    controller.load(spec).await?;

    let budget = (args.max_actions > 0).then_some(args.max_actions);
    let handle = spawn_run(
        config.agent.cursor_config(budget),
        controller.action_port(),
        controller.inventory_stream(),
        plan,
        args.seed,
    );
    info!("Run {} started", handle.run_id());

    let limit = args.duration.unwrap_or(Duration::from_secs(86_400));
    tokio::select! {
        _ = watch_drive(&handle) => {}
        _ = tokio::time::sleep(limit), if args.duration.is_some() => {
            info!("Duration elapsed, stopping run");
            handle.stop();
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, stopping run");
            handle.stop();
        }
    }

    let run_report = handle.join().await;
    controller.shutdown().await;
    report::emit(output, &run_report, || report::run_text(&run_report))
}

/// Follow the run's state until its publisher goes away, which marks the end
/// of the run task.
async fn watch_drive(handle: &CursorHandle) {
    let mut state = handle.state_stream();
    loop {
        {
            let snapshot = *state.borrow_and_update();
            debug!(phase = ?snapshot.phase, target = ?snapshot.target, "cursor state");
        }
        if state.changed().await.is_err() {
            break;
        }
    }
}

async fn cmd_improve(args: ImproveArgs, config: &Config, output: OutputFormat) -> Result<()> {
    let ProjectSpec {
        name,
        document,
        files,
        requests,
    } = project::load_project(&args.project).await?;
    if let Some(name) = &name {
        info!("Improving project '{name}'");
    }
    if requests.is_empty() {
        warn!("Project has no change requests; the run will stop on the first cycle");
    }

    let cycles = args.cycles.or_else(|| {
        let scripted = requests.len() as u32;
        (scripted > 0).then_some(scripted)
    });

    let controller = HostController::start(config.agent.sandbox_config());
    let _guard = controller.begin_run(RunKind::Improve)?;
    controller
        .load(document.unwrap_or_else(samples::demo_document))
        .await?;

    let credentials: Arc<dyn CredentialStore> =
        match args.credentials.or_else(|| config.credentials.file.clone()) {
            Some(path) => {
                info!("Watching credentials file {}", path.display());
                Arc::new(FileCredentialStore::new(path))
            }
            None => Arc::new(MemoryCredentialStore::new()),
        };
    let service = Arc::new(ScriptedGenerationService::new(requests));
    let surface = Arc::new(RecordingSurface::new());

    let handle = spawn_improve(
        config.improve.improve_config(cycles),
        service,
        credentials,
        surface,
        files,
        args.seed,
    );
    info!("Improve run {} started", handle.run_id());

    tokio::select! {
        _ = watch_improve(&handle) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, stopping run");
            handle.stop();
        }
    }

    let improve_report = handle.join().await;
    controller.shutdown().await;
    report::emit(output, &improve_report, || {
        report::improve_text(&improve_report)
    })?;

    if let Some(failure) = &improve_report.failure {
        bail!("{failure}");
    }
    Ok(())
}

/// Follow the loop's status, logging each transition. There is no real build
/// pipeline behind a scripted run, so a build finishes the moment the loop
/// starts waiting on one.
async fn watch_improve(handle: &ImproveHandle) {
    let mut status = handle.status_stream();
    loop {
        {
            let snapshot = status.borrow_and_update().clone();
            info!(
                phase = ?snapshot.phase,
                cycle = snapshot.cycle,
                "{}",
                snapshot.message
            );
            if snapshot.phase == ImprovePhase::Building {
                handle.notify_build_finished();
            }
        }
        if status.changed().await.is_err() {
            break;
        }
    }
}

async fn cmd_info(config: &Config) -> Result<()> {
    println!("PagePilot Information");
    println!("=====================");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Build Date: {}", env!("BUILD_DATE"));
    println!("Git Commit: {}", env!("GIT_HASH"));
    println!();
    println!("Configuration:");
    println!("  Settle delay: {}ms", config.agent.settle_ms);
    println!("  Pointer travel: {}ms", config.agent.travel_ms);
    println!("  Press hold: {}ms", config.agent.hold_ms);
    println!("  Typing cadence: {}ms/char", config.agent.per_char_ms);
    println!("  Improve dwell: {}ms", config.improve.dwell_ms);
    println!("  Credential poll: {}ms", config.improve.poll_ms);
    match &config.credentials.file {
        Some(path) => println!("  Credentials file: {}", path.display()),
        None => println!("  Credentials file: (none)"),
    }
    Ok(())
}

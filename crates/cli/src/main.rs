use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fazreport_core::{
    load_config, parse_flat_list, validate_config, ArtifactWriter, Config, DirectoryResolver,
    FazClient, LdapDirectoryResolver, NaumenClient, ReportAppliance, ReportOrchestrator,
    ReportSettings, RunInput, SanitizedConfig, SqliteWorkItemStore, TableLayout,
    TicketingSystem, WorkItemStore,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Where the list of users to report on comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Unprocessed work items from the database, reconciled against tickets
    Tickets,
    /// A `name,start,end` file; no ticketing and no database updates
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "faz-reports", version, about = "FortiAnalyzer report automation")]
struct Args {
    /// Configuration file
    #[arg(long, env = "FAZREPORT_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    #[arg(long, value_enum, default_value_t = Mode::Tickets)]
    mode: Mode,

    /// User list for csv mode
    #[arg(long)]
    users_file: Option<PathBuf>,

    /// Also append logs to <dir>/faz-reports_<DD.MM.YYYY>.log
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Resolution text posted when a ticket is accepted (overrides config)
    #[arg(long)]
    solution_text: Option<String>,

    /// Work item database path (overrides config)
    #[arg(long)]
    dsn: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging(args.log_dir.as_deref()) {
        eprintln!("Failed to initialize logging: {:#}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(args).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn log_file_name() -> String {
    format!("faz-reports_{}.log", Local::now().format("%d.%m.%Y"))
}

fn init_logging(log_dir: Option<&Path>) -> Result<()> {
    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {:?}", dir))?;
            let path = dir.join(log_file_name());
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    info!(version = VERSION, mode = ?args.mode, "Starting report run");

    info!("Loading configuration from {:?}", args.config);
    let mut config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    if let Some(dsn) = &args.dsn {
        config.database.path = dsn.clone();
    }
    if let Some(text) = &args.solution_text {
        if let Some(ticketing) = config.ticketing.as_mut() {
            ticketing.resolution_text = text.clone();
        }
    }

    validate_config(&config).context("Configuration validation failed")?;

    let sanitized = SanitizedConfig::from(&config);
    info!(
        "Configuration loaded: {}",
        serde_json::to_string(&sanitized).unwrap_or_default()
    );

    let appliance: Arc<dyn ReportAppliance> = Arc::new(
        FazClient::new(&config.appliance).context("Failed to create appliance client")?,
    );
    let directory: Arc<dyn DirectoryResolver> =
        Arc::new(LdapDirectoryResolver::new(&config.directory));
    let writer = ArtifactWriter::new(&config.output);

    let orchestrator = ReportOrchestrator::new(
        config.orchestrator.clone(),
        ReportSettings::from(&config.appliance),
        appliance,
        directory,
        writer,
    );

    let (orchestrator, input) = match args.mode {
        Mode::Tickets => {
            let orchestrator = with_ticketing(orchestrator, &config)?;
            (orchestrator, RunInput::Tickets)
        }
        Mode::Csv => {
            let Some(path) = &args.users_file else {
                bail!("--users-file is required in csv mode");
            };
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read user list {:?}", path))?;
            let users = parse_flat_list(&text)
                .with_context(|| format!("Invalid user list {:?}", path))?;
            info!(count = users.len(), "User list loaded");
            (orchestrator, RunInput::FlatList(users))
        }
    };

    let summary = orchestrator.run(input).await.context("Report run failed")?;

    info!(
        "Run summary: {}",
        serde_json::to_string(&summary).unwrap_or_default()
    );
    Ok(())
}

fn with_ticketing(orchestrator: ReportOrchestrator, config: &Config) -> Result<ReportOrchestrator> {
    let Some(ticketing_config) = &config.ticketing else {
        bail!("Ticket mode requires a [ticketing] section");
    };

    let ticketing: Arc<dyn TicketingSystem> = Arc::new(
        NaumenClient::new(ticketing_config).context("Failed to create ticketing client")?,
    );
    let store: Arc<dyn WorkItemStore> = Arc::new(
        SqliteWorkItemStore::open(&config.database.path, TableLayout::from(&config.database))
            .with_context(|| format!("Failed to open database {:?}", config.database.path))?,
    );
    info!("Database path: {:?}", config.database.path);

    Ok(orchestrator.with_ticketing(ticketing, store, ticketing_config.resolution_text.clone()))
}

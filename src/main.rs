//! Vigil - headless scan loop and one-shot commands
//!
//! ```bash
//! vigil watch --auto-confirm
//! vigil scan
//! vigil simulate --hint "unsigned binary beaconing"
//! vigil ingest --data-type ioc_feed --file feed.json --graph kg.json
//! vigil suggest --incidents incidents.txt
//! vigil --replay replies.json --simulated scan
//! ```

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::time::MissedTickBehavior;

use vigil_core::constants::{APP_NAME, APP_VERSION};
use vigil_core::logic::backend::{OpenAiCompatBackend, ReasoningBackend, ScriptedBackend};
use vigil_core::logic::collector::HostCollector;
use vigil_core::logic::config::ExecutionMode;
use vigil_core::logic::incident::IncidentBoard;
use vigil_core::logic::intel::{DataType, KnowledgeGraph};
use vigil_core::{Disposition, Pipeline, PipelineError, VigilConfig};

/// Incidents handed to a policy review
const REVIEW_WINDOW: usize = 20;

#[derive(Parser)]
#[command(name = "vigil")]
#[command(version)]
#[command(about = "Vigil threat reasoning and response core", long_about = None)]
struct Cli {
    /// JSON config file (defaults to VIGIL_CONFIG, then the user config dir)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Replay backend replies from a JSON file instead of calling a model
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Log commands instead of executing them
    #[arg(long)]
    simulated: bool,

    /// Never act without confirmation
    #[arg(long)]
    analysis_only: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan on a fixed interval until interrupted
    Watch {
        /// Confirm pending responses automatically
        #[arg(long)]
        auto_confirm: bool,
        /// Run a policy review after this many new incidents
        #[arg(long)]
        suggest_every: Option<usize>,
    },
    /// Scan this host once
    Scan,
    /// Generate a simulated scenario and run it through the pipeline
    Simulate {
        #[arg(long)]
        hint: Option<String>,
    },
    /// Ingest security data into the knowledge graph
    Ingest {
        /// threat_report, ioc_feed, network_log or osint_data
        #[arg(long)]
        data_type: String,
        #[arg(long)]
        file: PathBuf,
        /// Graph file to merge the fragment into
        #[arg(long)]
        graph: Option<PathBuf>,
    },
    /// Suggest capability improvements from past incidents
    Suggest {
        /// Text file summarizing recent incidents
        #[arg(long)]
        incidents: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = VigilConfig::load(cli.config.as_deref())?;
    if cli.simulated {
        config.execution.mode = ExecutionMode::Simulated;
    }
    if cli.analysis_only {
        config.policy.autonomous = false;
    }
    config.validate()?;

    let backend: Arc<dyn ReasoningBackend> = match &cli.replay {
        Some(path) => Arc::new(ScriptedBackend::from_file(path)?),
        None => Arc::new(OpenAiCompatBackend::new(&config.backend)?),
    };

    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string());
    log::info!("Starting {} v{} on {}...", APP_NAME, APP_VERSION, host);
    log::info!("   Backend: {}", backend.describe());
    log::info!("   Execution: {:?} on {:?}", config.execution.mode, config.execution.platform);
    log::info!(
        "   Policy: {}",
        if config.policy.autonomous { "autonomous" } else { "analysis-only" }
    );

    let pipeline = Pipeline::from_config(config, backend);

    match cli.command {
        Commands::Watch {
            auto_confirm,
            suggest_every,
        } => watch(&pipeline, auto_confirm, suggest_every).await,
        Commands::Scan => {
            let collector = HostCollector::from_config(pipeline.config());
            report(pipeline.scan(&collector).await)
        }
        Commands::Simulate { hint } => {
            let snapshot = pipeline.simulator().simulate(hint.as_deref()).await?;
            print_json(&snapshot)?;
            report(pipeline.run(snapshot).await)
        }
        Commands::Ingest {
            data_type,
            file,
            graph,
        } => {
            let data_type: DataType = data_type.parse()?;
            let data = fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let fragment = pipeline.ingestor().ingest(data_type, &data).await?;

            if let Some(path) = graph {
                let mut kg = KnowledgeGraph::load(&path)?;
                let stats = kg.absorb(fragment.clone());
                kg.save(&path)?;
                log::info!(
                    "Graph {}: +{} node(s), +{} edge(s), {} dangling",
                    path.display(),
                    stats.nodes_added,
                    stats.edges_added,
                    kg.dangling_edges().len()
                );
            }
            print_json(&fragment)
        }
        Commands::Suggest { incidents } => {
            let recent = match incidents {
                Some(path) => fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?,
                None => String::new(),
            };
            let suggestions = pipeline
                .advisor()
                .suggest(&recent, &pipeline.executor().inventory())
                .await?;
            print_json(&suggestions)
        }
    }
}

async fn watch(pipeline: &Pipeline, auto_confirm: bool, suggest_every: Option<usize>) -> anyhow::Result<()> {
    let collector = HostCollector::from_config(pipeline.config());
    let mut board = IncidentBoard::new();
    let mut since_review = 0usize;

    let mut ticker = tokio::time::interval(pipeline.config().scan_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    log::info!("Watching: one scan every {:?}", pipeline.config().scan_interval());

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, stopping watch");
                break;
            }
        }

        match pipeline.scan(&collector).await {
            Ok(outcome) => {
                print_json(&outcome)?;
                if board.record_outcome(&outcome).is_some() {
                    since_review += 1;
                }

                if let Disposition::AwaitingConfirmation { approval_id, user_query } = &outcome.disposition {
                    if auto_confirm {
                        match pipeline.confirm(approval_id).await {
                            Ok(Some(confirmed)) => {
                                print_json(&confirmed)?;
                                board.record_confirmation(&confirmed);
                            }
                            Ok(None) => log::warn!("Approval {} expired before confirmation", approval_id),
                            Err(e) => fail(&mut board, &e)?,
                        }
                    } else {
                        log::warn!("Confirmation required ({}): {}", approval_id, user_query);
                    }
                }
            }
            Err(e) => fail(&mut board, &e)?,
        }

        if let Some(every) = suggest_every.filter(|n| *n > 0) {
            if since_review >= every {
                since_review = 0;
                review(pipeline, &board).await;
            }
        }
    }

    log::info!(
        "Watch ended: {} incident(s), {} notification(s)",
        board.incidents().len(),
        board.notifications().len()
    );
    Ok(())
}

async fn review(pipeline: &Pipeline, board: &IncidentBoard) {
    let digest = board.digest(REVIEW_WINDOW);
    match pipeline.advisor().suggest(&digest, &pipeline.executor().inventory()).await {
        Ok(suggestions) => {
            for s in &suggestions {
                log::info!("Suggestion [{:?}]: {}", s.category, s.suggestion);
            }
        }
        Err(e) => log::warn!("Policy review failed: {}", e),
    }
}

fn fail(board: &mut IncidentBoard, error: &PipelineError) -> anyhow::Result<()> {
    board.record_failure(error);
    print_json(&error.report())
}

fn report(result: Result<vigil_core::PipelineOutcome, PipelineError>) -> anyhow::Result<()> {
    match result {
        Ok(outcome) => print_json(&outcome),
        Err(e) => {
            print_json(&e.report())?;
            Err(e.into())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

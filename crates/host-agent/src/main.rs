use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use coordination::{EventBus, EventBusExt, EventSink, GameStateSource, PhaseScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use host_agent::agents::{register_roster, RosterFactory};
use host_agent::config::HostConfig;
use host_agent::output::{record_transcript, transcript_filter, JsonLinesSink, TeeSink};
use host_agent::simulator::SimulatedGame;
use host_agent::state_file::FileStateSource;
use host_agent::telemetry::{append_telemetry, TelemetrySink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Run one hosted game session, printing events to stdout as JSON lines.
#[derive(Debug, Parser)]
#[command(name = "host-agent", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured game id
    #[arg(long)]
    game_id: Option<String>,

    /// Override the number of simulated rounds
    #[arg(long)]
    rounds: Option<u32>,

    /// Poll this JSON snapshot file instead of running the built-in simulator
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Append a session summary to this JSONL file
    #[arg(long)]
    telemetry_path: Option<PathBuf>,

    /// Write a plain-text chat transcript to this file
    #[arg(long)]
    transcript: Option<PathBuf>,

    /// Log output format (logs go to stderr)
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let mut config = HostConfig::load(cli.config.as_deref()).context("Failed to load host config")?;
    if let Some(game_id) = cli.game_id {
        config.game_id = game_id;
    }
    if let Some(rounds) = cli.rounds {
        config.rounds = rounds;
    }
    config.validate().context("Invalid host config")?;

    let session_id = format!(
        "{}-{}",
        config.game_id,
        chrono::Utc::now().format("%Y%m%dT%H%M%S")
    );
    info!(
        session_id = %session_id,
        game_id = %config.game_id,
        rounds = config.rounds,
        agents = config.agents.len(),
        discuss_ms = config.scheduler.durations.discuss_ms,
        "Host agent starting"
    );

    let cancel = CancellationToken::new();
    let observers = EventBus::new().shared();
    let transcript = match cli.transcript {
        Some(path) => {
            let file = std::fs::File::create(&path)
                .with_context(|| format!("Failed to create transcript {}", path.display()))?;
            let events = observers.subscribe_filtered(transcript_filter());
            let cancel = cancel.clone();
            info!(path = %path.display(), "Writing chat transcript");
            Some(tokio::spawn(record_transcript(events, file, cancel)))
        }
        None => None,
    };

    let stdout: Arc<dyn EventSink> = Arc::new(JsonLinesSink::stdout());
    let output: Arc<dyn EventSink> = Arc::new(TeeSink::new(stdout, Arc::clone(&observers)));
    let telemetry = Arc::new(TelemetrySink::new(
        output,
        &config.scheduler.host_id,
        &config.scheduler.fallback_text,
    ));

    let (source, simulator): (Arc<dyn GameStateSource>, Option<Arc<SimulatedGame>>) =
        match cli.state_file {
            Some(path) => {
                info!(path = %path.display(), "Polling game state file");
                (Arc::new(FileStateSource::new(path)), None)
            }
            None => {
                let game = Arc::new(SimulatedGame::from_config(&config));
                (game.clone(), Some(game))
            }
        };

    let scheduler = PhaseScheduler::new(
        &config.game_id,
        source,
        telemetry.clone(),
        Arc::new(RosterFactory::new(&config.agents)),
        config.scheduler.clone(),
    )
    .context("Failed to build phase scheduler")?;
    register_roster(&scheduler, &config.agents);

    let simulation = simulator.map(|game| {
        let sink = telemetry.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { game.drive(sink.as_ref(), cancel).await })
    });

    let guard = scheduler.guard();
    let outcome = tokio::select! {
        result = guard.start() => result.context("Phase scheduler failed"),
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping");
            Ok(())
        }
    };
    drop(guard);
    cancel.cancel();

    if let Some(task) = simulation {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Simulated game stopped early: {e}"),
            Err(e) => warn!("Simulated game task failed: {e}"),
        }
    }
    if let Some(task) = transcript {
        match task.await {
            Ok(Ok(lines)) => info!(lines, "Transcript written"),
            Ok(Err(e)) => warn!("Transcript write failed: {e}"),
            Err(e) => warn!("Transcript task failed: {e}"),
        }
    }

    let session = telemetry.finish(
        &session_id,
        &config.game_id,
        outcome.as_ref().err().map(|e| format!("{e:#}")),
    );
    info!(
        events = ?session.events_by_kind,
        agent_messages = session.agent_messages,
        fallbacks = session.fallbacks,
        rounds = session.rounds_seen,
        elapsed_ms = session.elapsed_ms,
        "Session finished"
    );
    if let Some(path) = cli.telemetry_path {
        append_telemetry(&session, &path);
    }

    outcome
}

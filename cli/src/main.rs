//! CLI entrypoint for codearena
//!
//! Wires the layers together with dependency injection, dispatches one
//! prompt against the requested models, and follows the run's event stream
//! until it settles.

use anyhow::{Context, Result, bail};
use arena_application::ports::stream_gateway::{RunEvent, StreamChannel, StreamGateway};
use arena_application::{
    DispatchInput, DispatchRunUseCase, ExecuteVariationsUseCase, ManageSessionsUseCase,
    RecordTurnUseCase, RunRegistry, StateTracker,
};
use arena_domain::{ModelId, RunStatus, SessionDraft, TurnDraft, UserId, VariantRequest};
use arena_infrastructure::{
    BroadcastStreamGateway, CliAgentProvider, ConfigLoader, FanoutGateway, FileConfig,
    HttpGatewayProvider, InMemoryRecordStore, JsonlRunLogger, StaticProviderRouter,
};
use arena_domain::AgentMode;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "codearena", version, about = "Fan one prompt out to competing AI coding agents")]
struct Cli {
    /// The prompt to execute
    prompt: Option<String>,

    /// Model to run (repeat for several, e.g. -m claude-code -m gpt-4-codex)
    #[arg(short, long)]
    model: Vec<String>,

    /// Context hint for the turn; a context containing "chat" forces
    /// conversational mode for every variant
    #[arg(long)]
    context: Option<String>,

    /// Override the configured ceiling on concurrent variants
    #[arg(long)]
    max_models: Option<usize>,

    /// Explicit config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ignore all config files and use built-in defaults
    #[arg(long)]
    no_config: bool,

    /// User the session is created under
    #[arg(long, default_value = "local")]
    user: String,

    /// Write tracing output to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Suppress the header and per-event progress lines
    #[arg(short, long)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    // Keep the guard alive for the lifetime of the process
    let _appender_guard = match &cli.log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("cannot create log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .init();
            None
        }
    };

    info!("Starting codearena");

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow::anyhow!(e))?
    };

    let Some(prompt) = cli.prompt.clone() else {
        bail!("A prompt is required");
    };

    let models: Vec<String> = if cli.model.is_empty() {
        vec!["claude-code".to_string()]
    } else {
        cli.model.clone()
    };
    let max_models = cli.max_models.unwrap_or(config.dispatch.max_models);

    // === Dependency Injection ===
    let store = Arc::new(InMemoryRecordStore::new());
    let tracker = Arc::new(StateTracker::new());
    let registry = Arc::new(RunRegistry::new());

    let broadcast = Arc::new(BroadcastStreamGateway::new());
    let stream: Arc<dyn StreamGateway> = match config.run_log.as_ref().and_then(JsonlRunLogger::new)
    {
        Some(logger) => {
            info!("Logging run events to {}", logger.path().display());
            Arc::new(FanoutGateway::new(vec![broadcast.clone(), Arc::new(logger)]))
        }
        None => broadcast.clone(),
    };

    let router = Arc::new(build_router(&config));
    let orchestrator = Arc::new(
        ExecuteVariationsUseCase::new(
            Arc::clone(&store),
            router,
            Arc::clone(&stream),
            Arc::clone(&tracker),
        )
        .with_retry(config.retry.policy()),
    );
    let sessions = ManageSessionsUseCase::new(
        Arc::clone(&store),
        Arc::clone(&tracker),
        Arc::clone(&registry),
    );
    let turns = RecordTurnUseCase::new(Arc::clone(&store), Arc::clone(&tracker));
    let dispatcher = DispatchRunUseCase::new(
        Arc::clone(&store),
        Arc::clone(&stream),
        orchestrator,
        Arc::clone(&tracker),
        registry,
    );

    // === Session / turn setup ===
    let owner = UserId::new(cli.user.clone());
    let title: String = prompt.chars().take(60).collect();
    let session = sessions.create(owner.clone(), SessionDraft::new(title)).await?;

    let mut draft = TurnDraft::new(prompt.clone());
    draft.context = cli.context.clone();
    draft.models_requested = models.iter().map(ModelId::new).collect();
    let turn = turns.create(&owner, &session.id, draft).await?;

    if !cli.quiet {
        println!();
        println!("Prompt: {prompt}");
        println!("Models: {}", models.join(", "));
        println!();
    }

    // === Dispatch and follow ===
    let variants = models
        .iter()
        .enumerate()
        .map(|(i, m)| VariantRequest::new(format!("v{}", i + 1), m.as_str()))
        .collect();
    let ack = dispatcher
        .dispatch(DispatchInput {
            session_id: session.id.clone(),
            turn_id: turn.id.clone(),
            owner: owner.clone(),
            prompt,
            context: cli.context,
            variants,
            max_models,
        })
        .await?;

    info!("Run {} accepted, streaming at {}", ack.run_id, ack.stream_address);

    // Live progress comes from the broadcast stream; the final result is
    // read from the run record, so a missed early event costs nothing.
    let progress = if cli.quiet {
        None
    } else {
        let mut events = broadcast.subscribe(&ack.run_id, StreamChannel::Primary);
        Some(tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                print_event(&event);
                if event.is_terminal() {
                    break;
                }
            }
        }))
    };

    let run = loop {
        let run = dispatcher.get_run(&owner, &session.id, &ack.run_id).await?;
        if run.status.is_terminal() {
            break run;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    };
    if let Some(handle) = progress {
        let _ = handle.await;
    }

    // === Results ===
    for outcome in &run.outcomes {
        println!();
        println!("=== {} ({}) ===", outcome.model, outcome.variant_id);
        match (&outcome.content, &outcome.error) {
            (Some(content), _) => println!("{content}"),
            (None, Some(error)) => println!("failed: {error}"),
            (None, None) => println!("no output"),
        }
    }
    println!();
    println!(
        "Run {} finished: {} (total cost ${:.4})",
        run.id,
        run.status,
        run.total_cost()
    );

    if run.status == RunStatus::Failed {
        bail!("all model variants failed");
    }
    Ok(())
}

fn build_router(config: &FileConfig) -> StaticProviderRouter {
    let providers = &config.providers;
    let timeout = Duration::from_secs(providers.agent_timeout_secs);

    let litellm = Arc::new(
        HttpGatewayProvider::new(
            AgentMode::Litellm,
            providers.litellm_base_url.clone(),
            providers.litellm_api_key.clone(),
        )
        .with_cost_per_token(providers.cost_per_token),
    );
    let chat = Arc::new(
        HttpGatewayProvider::new(
            AgentMode::Chat,
            providers.litellm_base_url.clone(),
            providers.litellm_api_key.clone(),
        )
        .with_cost_per_token(providers.cost_per_token),
    );

    StaticProviderRouter::new()
        .register(Arc::new(
            CliAgentProvider::new(
                AgentMode::ClaudeCli,
                providers.claude_command.clone(),
                providers.claude_args.clone(),
            )
            .with_timeout(timeout),
        ))
        .register(Arc::new(
            CliAgentProvider::new(
                AgentMode::OpenaiCodex,
                providers.codex_command.clone(),
                providers.codex_args.clone(),
            )
            .with_timeout(timeout),
        ))
        .register(Arc::new(
            CliAgentProvider::new(
                AgentMode::GeminiCli,
                providers.gemini_command.clone(),
                providers.gemini_args.clone(),
            )
            .with_timeout(timeout),
        ))
        .register(chat)
        .with_fallback(litellm)
}

fn print_event(event: &RunEvent) {
    match event {
        RunEvent::RunStarted { variations, .. } => {
            println!("run started with {variations} variant(s)");
        }
        RunEvent::VariantStarted {
            variant_id,
            model,
            agent_mode,
        } => {
            println!("[{variant_id}] {model} running via {agent_mode}");
        }
        RunEvent::VariantCompleted {
            variant_id, cost, ..
        } => {
            println!("[{variant_id}] completed (cost ${cost:.4})");
        }
        RunEvent::VariantFailed {
            variant_id,
            error,
            attempts,
            ..
        } => {
            println!("[{variant_id}] failed after {attempts} attempt(s): {error}");
        }
        RunEvent::VariantCancelled { variant_id } => {
            println!("[{variant_id}] cancelled");
        }
        RunEvent::RunCompleted { status, .. } => {
            println!("run {status}");
        }
        RunEvent::VariantDelta { .. } | RunEvent::Diagnostic { .. } => {}
    }
}

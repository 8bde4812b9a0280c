use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use hive_ai::ai::{BoardEncoder, DecisionPolicy};
use hive_ai::checkpoint::{CheckpointManager, FileModelStore};
use hive_ai::config::AppConfig;
use hive_ai::game::{GameRules, GameState, HiveRules};
use hive_ai::training::{derive_seed, train_combined, EvolutionaryTrainer, SelfPlayTrainer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Refine a stored (or fresh) agent by playing it against itself
    Selfplay,
    /// Evolve a population through tournament play
    Evolution,
    /// Evolution first, then self-play on the best evolved agent
    Combined,
    /// Load the stored agent and play ten plies from the opening
    Test,
}

/// Train the hive move engine.
#[derive(Parser)]
#[command(name = "train", about = "Train the hive move engine by self-play and evolution")]
struct Cli {
    #[arg(long, value_enum, default_value = "evolution")]
    mode: Mode,

    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override number of self-play games
    #[arg(long)]
    games: Option<usize>,

    /// Override number of generations
    #[arg(long)]
    generations: Option<usize>,

    /// Override population size
    #[arg(long)]
    population: Option<usize>,

    /// Base seed; OS entropy when neither this nor the config sets one
    #[arg(long)]
    seed: Option<u64>,

    /// Override the directory holding weights and checkpoints
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Default log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    // Apply CLI overrides
    if let Some(games) = cli.games {
        config.self_play.games = games;
    }
    if let Some(generations) = cli.generations {
        config.evolution.generations = generations;
    }
    if let Some(population) = cli.population {
        config.evolution.population_size = population;
    }
    if let Some(dir) = cli.model_dir {
        config.storage.model_dir = dir;
    }
    config.validate().context("validating configuration")?;

    let seed = cli.seed.or(config.seed).unwrap_or_else(rand::random);
    info!(mode = ?cli.mode, seed, model_dir = %config.storage.model_dir.display(), "hive training");

    let rules = HiveRules::new();
    let encoder = BoardEncoder::new();
    let policy = DecisionPolicy::new(&rules, &encoder, config.policy.clone(), config.mcts.clone());
    let store = config.storage.open();

    match cli.mode {
        Mode::Selfplay => run_self_play(&config, policy, &store, seed),
        Mode::Evolution => run_evolution(&config, policy, &store, seed),
        Mode::Combined => {
            let report = train_combined(
                &config.network,
                policy,
                &store,
                config.evolution.clone(),
                config.self_play.clone(),
                seed,
            )
            .context("combined training")?;
            info!(
                generations = report.generations.len(),
                games = report.self_play.games,
                agent = report.agent.id,
                "combined training complete"
            );
            Ok(())
        }
        Mode::Test => run_test(&config, &policy, &rules, &store, seed),
    }
}

fn run_self_play(
    config: &AppConfig,
    policy: DecisionPolicy<'_>,
    store: &FileModelStore,
    seed: u64,
) -> Result<()> {
    let agent = CheckpointManager::new(store)
        .load_agent(0, &config.network, seed)
        .context("building agent")?;
    let mut trainer = SelfPlayTrainer::new(
        agent,
        policy,
        store,
        config.self_play.clone(),
        derive_seed(seed, 1),
    );

    trainer.train(config.self_play.games);
    trainer.final_checkpoint();
    // Failures are logged by the exporter and never fatal.
    let _ = trainer.export_training_data(&config.self_play.export_path);
    info!("self-play training complete");
    Ok(())
}

fn run_evolution(
    config: &AppConfig,
    policy: DecisionPolicy<'_>,
    store: &FileModelStore,
    seed: u64,
) -> Result<()> {
    let mut evolver = EvolutionaryTrainer::new(
        &config.network,
        policy,
        store,
        config.evolution.clone(),
        seed,
    )
    .context("building population")?;

    evolver.evolve(config.evolution.generations, config.evolution.games_per_eval);
    let _ = evolver.export_stats(&config.evolution.stats_path);
    info!("evolutionary training complete");
    Ok(())
}

fn run_test(
    config: &AppConfig,
    policy: &DecisionPolicy<'_>,
    rules: &HiveRules,
    store: &FileModelStore,
    seed: u64,
) -> Result<()> {
    let agent = CheckpointManager::new(store)
        .load_agent(0, &config.network, seed)
        .context("loading agent")?;
    let mut rng = StdRng::seed_from_u64(derive_seed(seed, 2));
    let mut state = GameState::initial();

    for turn in 1..=10 {
        let Some(mv) = policy.choose_move(&agent, &state, &mut rng) else {
            info!(turn, "no legal moves available");
            break;
        };
        info!(turn, "{}", mv);
        if let Err(e) = rules.apply(&mut state, &mv) {
            warn!(turn, error = %e, "move could not be applied");
            break;
        }
        let outcome = rules.terminal(&state);
        if outcome.is_over() {
            info!(turn, %outcome, "game over");
            break;
        }
    }

    info!("test complete");
    Ok(())
}

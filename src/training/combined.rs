use tracing::info;

use crate::ai::{Agent, DecisionPolicy, NetworkConfig};
use crate::checkpoint::ModelStore;
use crate::error::TrainingError;
use crate::training::episode::derive_seed;
use crate::training::evolution::{EvolutionConfig, EvolutionaryTrainer, GenerationStats};
use crate::training::self_play::{SelfPlayConfig, SelfPlaySummary, SelfPlayTrainer};

/// What a combined run produced.
pub struct CombinedReport {
    pub generations: Vec<GenerationStats>,
    pub self_play: SelfPlaySummary,
    pub agent: Agent,
}

/// Evolve a population for diversity, then refine its best agent with
/// self-play.
pub fn train_combined<'a>(
    network: &NetworkConfig,
    policy: DecisionPolicy<'a>,
    store: &'a dyn ModelStore,
    evolution: EvolutionConfig,
    self_play: SelfPlayConfig,
    seed: u64,
) -> Result<CombinedReport, TrainingError> {
    let generations = evolution.generations;
    let games_per_eval = evolution.games_per_eval;
    let games = self_play.games;

    info!(generations, "phase 1: evolutionary initialization");
    let mut evolver = EvolutionaryTrainer::new(network, policy.clone(), store, evolution, seed)?;
    let history = evolver.evolve(generations, games_per_eval);
    let best = evolver
        .into_best_agent()
        .ok_or(TrainingError::EmptyPopulation)?;

    info!(games, agent = best.id, "phase 2: self-play refinement");
    let mut refiner = SelfPlayTrainer::new(best, policy, store, self_play, derive_seed(seed, 1));
    let summary = refiner.train(games);
    refiner.final_checkpoint();

    Ok(CombinedReport {
        generations: history,
        self_play: summary,
        agent: refiner.into_agent(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{BoardEncoder, MctsConfig, PolicyConfig};
    use crate::checkpoint::{CheckpointKind, CheckpointManager, MemoryModelStore};
    use crate::game::HiveRules;

    #[test]
    fn test_combined_run_ends_with_self_play_checkpoint() {
        let rules = HiveRules::new();
        let encoder = BoardEncoder::new();
        let mcts = MctsConfig {
            max_iterations: 5,
            ..MctsConfig::default()
        };
        let policy = DecisionPolicy::new(&rules, &encoder, PolicyConfig::default(), mcts);
        let store = MemoryModelStore::new();
        let network = NetworkConfig {
            layer_sizes: vec![1220, 8, 64],
            learning_rate: 0.001,
            seed: 1,
        };
        let evolution = EvolutionConfig {
            population_size: 2,
            generations: 1,
            games_per_eval: 1,
            max_moves: 10,
            elite_count: 1,
            tournament_size: 2,
            ..EvolutionConfig::default()
        };
        let self_play = SelfPlayConfig {
            games: 1,
            max_moves: 10,
            batch_size: 4,
            ..SelfPlayConfig::default()
        };

        let report = train_combined(&network, policy, &store, evolution, self_play, 3).unwrap();
        assert_eq!(report.generations.len(), 1);
        assert_eq!(report.self_play.games, 1);
        assert_eq!(report.agent.policy_net.layer_sizes(), &[1220, 8, 64]);

        let meta = CheckpointManager::new(&store).latest_metadata().unwrap();
        assert_eq!(meta.kind, CheckpointKind::SelfPlay);
        assert_eq!(meta.step, 1);
    }
}

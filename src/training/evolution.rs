use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::ai::{Agent, AgentStats, DecisionPolicy, MatchOutcome, NetworkConfig};
use crate::checkpoint::{CheckpointManager, CheckpointMetadata, ModelStore};
use crate::error::{ExportError, NetworkError};
use crate::game::{Outcome, Side};
use crate::training::episode::{derive_seed, play_match};
use crate::training::export::write_population_stats;

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub generations: usize,
    pub games_per_eval: usize,
    /// Ply cap per tournament game; a game reaching it is a draw.
    pub max_moves: usize,
    /// Best agents carried into the next generation unchanged.
    pub elite_count: usize,
    pub tournament_size: usize,
    pub mutation_rate: f64,
    pub mutation_strength: f64,
    /// Save the best agent every this many generations.
    pub save_interval: usize,
    pub stats_path: PathBuf,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        EvolutionConfig {
            population_size: 5,
            generations: 2,
            games_per_eval: 5,
            max_moves: 100,
            elite_count: 5,
            tournament_size: 5,
            mutation_rate: 0.1,
            mutation_strength: 0.05,
            save_interval: 10,
            stats_path: PathBuf::from("evolution_stats.csv"),
        }
    }
}

/// Summary of one evaluated generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationStats {
    /// 1-based.
    pub generation: usize,
    pub best_id: usize,
    pub best_fitness: f64,
    pub average_fitness: f64,
    /// Standard deviation of normalized fitness.
    pub diversity: f64,
    pub best_wins: u32,
    pub best_losses: u32,
    pub best_draws: u32,
}

impl GenerationStats {
    fn from_ranked(generation: usize, ranked: &[Agent]) -> Self {
        let n = ranked.len().max(1) as f64;
        let mean = ranked.iter().map(|a| a.fitness).sum::<f64>() / n;
        let variance = ranked
            .iter()
            .map(|a| (a.fitness - mean).powi(2))
            .sum::<f64>()
            / n;
        let best = ranked.first().map(Agent::stats);
        GenerationStats {
            generation,
            best_id: best.map_or(0, |b| b.id),
            best_fitness: best.map_or(0.0, |b| b.fitness),
            average_fitness: mean,
            diversity: variance.sqrt(),
            best_wins: best.map_or(0, |b| b.wins),
            best_losses: best.map_or(0, |b| b.losses),
            best_draws: best.map_or(0, |b| b.draws),
        }
    }
}

// ─── Trainer ─────────────────────────────────────────────────────────────────

/// Genetic search over agents: tournament play for fitness, elitism,
/// tournament selection, crossover and mutation.
pub struct EvolutionaryTrainer<'a> {
    population: Vec<Agent>,
    policy: DecisionPolicy<'a>,
    checkpoints: CheckpointManager<'a>,
    config: EvolutionConfig,
    rng: StdRng,
    next_id: usize,
    generation: usize,
    /// Records of the most recently evaluated generation, best first.
    last_ranking: Vec<AgentStats>,
}

impl<'a> EvolutionaryTrainer<'a> {
    /// Build a population of `config.population_size` independently seeded
    /// agents.
    pub fn new(
        network: &NetworkConfig,
        policy: DecisionPolicy<'a>,
        store: &'a dyn ModelStore,
        config: EvolutionConfig,
        seed: u64,
    ) -> Result<Self, NetworkError> {
        info!(size = config.population_size, "initializing population");
        let population = (0..config.population_size)
            .map(|i| Agent::new(i, network, derive_seed(seed, i)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_population(population, policy, store, config, seed))
    }

    pub fn from_population(
        population: Vec<Agent>,
        policy: DecisionPolicy<'a>,
        store: &'a dyn ModelStore,
        config: EvolutionConfig,
        seed: u64,
    ) -> Self {
        let next_id = population.iter().map(|a| a.id + 1).max().unwrap_or(0);
        EvolutionaryTrainer {
            population,
            policy,
            checkpoints: CheckpointManager::new(store),
            config,
            rng: StdRng::seed_from_u64(seed),
            next_id,
            generation: 0,
            last_ranking: Vec::new(),
        }
    }

    pub fn population(&self) -> &[Agent] {
        &self.population
    }

    /// The first agent of the current population: the top elite once a
    /// generation has run.
    pub fn best_agent(&self) -> Option<&Agent> {
        self.population.first()
    }

    pub fn into_best_agent(self) -> Option<Agent> {
        self.population.into_iter().next()
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn last_ranking(&self) -> &[AgentStats] {
        &self.last_ranking
    }

    /// Run `generations` generations of `games_per_eval` games per agent.
    pub fn evolve(&mut self, generations: usize, games_per_eval: usize) -> Vec<GenerationStats> {
        info!(generations, games_per_eval, "starting evolutionary training");
        let mut history = Vec::with_capacity(generations);

        for g in 0..generations {
            let stats = self.run_generation(games_per_eval);
            info!(
                generation = stats.generation,
                best = stats.best_fitness,
                wins = stats.best_wins,
                losses = stats.best_losses,
                draws = stats.best_draws,
                average = stats.average_fitness,
                diversity = stats.diversity,
                "generation complete"
            );

            let last = g + 1 == generations;
            let due = self.config.save_interval > 0 && self.generation % self.config.save_interval == 0;
            if due || last {
                self.save_best(stats.best_fitness);
            }
            history.push(stats);
        }

        info!("evolution complete");
        history
    }

    /// Evaluate, rank and replace the population once.
    fn run_generation(&mut self, games_per_eval: usize) -> GenerationStats {
        self.evaluate_fitness(games_per_eval);

        self.population
            .sort_by(|a, b| b.fitness.partial_cmp(&a.fitness).unwrap_or(Ordering::Equal));
        self.generation += 1;
        let stats = GenerationStats::from_ranked(self.generation, &self.population);
        self.last_ranking = self.population.iter().map(Agent::stats).collect();

        self.population = self.next_generation();
        stats
    }

    /// Play every agent `games` times as White against a random opponent
    /// and normalize fitness by the generation's best.
    fn evaluate_fitness(&mut self, games: usize) {
        for agent in &mut self.population {
            agent.reset_record();
        }
        let n = self.population.len();
        if n == 0 {
            return;
        }

        for idx in 0..n {
            for game in 0..games {
                let mut opponent = self.rng.random_range(0..n);
                if opponent == idx && n > 1 {
                    opponent = (idx + 1) % n;
                }

                let result = play_match(
                    &self.policy,
                    &self.population[idx],
                    &self.population[opponent],
                    self.config.max_moves,
                    &mut self.rng,
                );
                debug!(
                    agent = self.population[idx].id,
                    opponent = self.population[opponent].id,
                    game,
                    outcome = %result.outcome,
                    plies = result.game_length,
                    "tournament game"
                );

                let (white, black) = match result.outcome {
                    Outcome::Win(Side::White) => (MatchOutcome::Win, MatchOutcome::Loss),
                    Outcome::Win(Side::Black) => (MatchOutcome::Loss, MatchOutcome::Win),
                    Outcome::Draw | Outcome::Ongoing => (MatchOutcome::Draw, MatchOutcome::Draw),
                };
                self.population[idx].record(white);
                self.population[opponent].record(black);
            }
        }

        let max = self
            .population
            .iter()
            .map(|a| a.fitness)
            .fold(f64::NEG_INFINITY, f64::max);
        if max > 0.0 {
            for agent in &mut self.population {
                agent.fitness /= max;
            }
        }
    }

    /// Elites first, then mutated crossover children until the population
    /// is back to size. Expects the population sorted best first.
    fn next_generation(&mut self) -> Vec<Agent> {
        let size = self.population.len();
        let mut next: Vec<Agent> = self
            .population
            .iter()
            .take(self.config.elite_count)
            .map(Agent::clone_agent)
            .collect();

        while next.len() < size {
            let p1 = self.select_parent();
            let p2 = self.select_parent();
            let child_id = self.next_id;
            match self.population[p1].crossover(&self.population[p2], child_id, &mut self.rng) {
                Ok(mut child) => {
                    child.mutate(
                        self.config.mutation_rate,
                        self.config.mutation_strength,
                        &mut self.rng,
                    );
                    self.next_id += 1;
                    next.push(child);
                }
                Err(e) => {
                    // Parents share one layout, so this only happens with a
                    // hand-built mixed population.
                    warn!(error = %e, "crossover failed, cloning first parent");
                    let mut clone = self.population[p1].clone_agent();
                    clone.id = child_id;
                    self.next_id += 1;
                    next.push(clone);
                }
            }
        }
        next
    }

    /// Index of the fittest of `tournament_size` uniformly drawn agents.
    fn select_parent(&mut self) -> usize {
        let n = self.population.len();
        let mut best = self.rng.random_range(0..n);
        for _ in 1..self.config.tournament_size.max(1) {
            let candidate = self.rng.random_range(0..n);
            if self.population[candidate].fitness > self.population[best].fitness {
                best = candidate;
            }
        }
        best
    }

    fn save_best(&self, best_fitness: f64) {
        let Some(best) = self.population.first() else {
            return;
        };
        let metadata = CheckpointMetadata::evolution(
            self.generation,
            best_fitness,
            best.policy_net.layer_sizes(),
        );
        match self.checkpoints.save(best, &metadata) {
            Ok(()) => info!(generation = self.generation, agent = best.id, "best agent saved"),
            Err(e) => warn!(generation = self.generation, error = %e, "failed to save best agent"),
        }
    }

    /// Write the last evaluated generation's records, best first. Before
    /// any generation has run, the current population is written.
    pub fn export_stats(&self, path: &Path) -> Result<usize, ExportError> {
        let current: Vec<AgentStats>;
        let rows = if self.last_ranking.is_empty() {
            current = self.population.iter().map(Agent::stats).collect();
            &current
        } else {
            &self.last_ranking
        };

        match write_population_stats(path, rows) {
            Ok(n) => {
                info!(path = %path.display(), rows = n, "population stats exported");
                Ok(n)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to export population stats");
                Err(e)
            }
        }
    }
}

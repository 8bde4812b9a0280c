use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::ai::{move_slot, Agent, DecisionPolicy, Experience};
use crate::checkpoint::{CheckpointManager, CheckpointMetadata, CheckpointMetrics, ModelStore};
use crate::error::{ExportError, NetworkError};
use crate::game::{Outcome, Side};
use crate::training::episode::{play_self_play_game, EpisodeTrace};
use crate::training::export::write_training_data;
use crate::training::metrics::TrainingMetrics;
use crate::training::replay_buffer::ReplayBuffer;

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SelfPlayConfig {
    pub games: usize,
    /// Ply cap per game; a game reaching it is a draw.
    pub max_moves: usize,
    pub buffer_capacity: usize,
    pub batch_size: usize,
    /// Per-ply reward decay and TD discount.
    pub discount: f64,
    pub log_interval: usize,
    pub checkpoint_interval: usize,
    pub export_path: PathBuf,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        SelfPlayConfig {
            games: 1,
            max_moves: 100,
            buffer_capacity: 10_000,
            batch_size: 64,
            discount: 0.99,
            log_interval: 10,
            checkpoint_interval: 100,
            export_path: PathBuf::from("training_data.csv"),
        }
    }
}

/// Tally of a [`SelfPlayTrainer::train`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelfPlaySummary {
    pub games: usize,
    pub white_wins: usize,
    pub black_wins: usize,
    pub draws: usize,
    pub buffer_len: usize,
}

// ─── Trainer ─────────────────────────────────────────────────────────────────

/// Improves one agent by playing it against itself and training both
/// networks from a replay buffer.
pub struct SelfPlayTrainer<'a> {
    agent: Agent,
    policy: DecisionPolicy<'a>,
    checkpoints: CheckpointManager<'a>,
    buffer: ReplayBuffer,
    metrics: TrainingMetrics,
    config: SelfPlayConfig,
    rng: StdRng,
    games_played: usize,
    /// Game count of the last successful checkpoint.
    last_checkpoint: Option<usize>,
}

impl<'a> SelfPlayTrainer<'a> {
    pub fn new(
        agent: Agent,
        policy: DecisionPolicy<'a>,
        store: &'a dyn ModelStore,
        config: SelfPlayConfig,
        seed: u64,
    ) -> Self {
        SelfPlayTrainer {
            agent,
            policy,
            checkpoints: CheckpointManager::new(store),
            buffer: ReplayBuffer::new(config.buffer_capacity),
            metrics: TrainingMetrics::new(),
            config,
            rng: StdRng::seed_from_u64(seed),
            games_played: 0,
            last_checkpoint: None,
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn into_agent(self) -> Agent {
        self.agent
    }

    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    pub fn games_played(&self) -> usize {
        self.games_played
    }

    /// Play one capped self-play game with rewards filled in. Nothing is
    /// stored or trained.
    pub fn play_game(&mut self) -> EpisodeTrace {
        play_self_play_game(
            &self.policy,
            &self.agent,
            self.config.max_moves,
            self.config.discount,
            &mut self.rng,
        )
    }

    /// Play `games` games, feeding each into the buffer and training a
    /// batch after every game once the buffer holds a full one.
    pub fn train(&mut self, games: usize) -> SelfPlaySummary {
        info!(
            games,
            max_moves = self.config.max_moves,
            batch_size = self.config.batch_size,
            "starting self-play training"
        );
        let mut summary = SelfPlaySummary::default();

        for _ in 0..games {
            let trace = self.play_game();
            match trace.result.outcome {
                Outcome::Win(Side::White) => summary.white_wins += 1,
                Outcome::Win(Side::Black) => summary.black_wins += 1,
                Outcome::Draw | Outcome::Ongoing => summary.draws += 1,
            }
            self.metrics.record_episode(trace.result);
            self.buffer.push_game(trace.experiences);
            self.games_played += 1;
            summary.games += 1;

            if self.buffer.len() >= self.config.batch_size {
                if let Some(loss) = self.train_batch() {
                    self.metrics.record_update(loss);
                }
            }

            if self.config.log_interval > 0 && self.games_played % self.config.log_interval == 0 {
                info!(
                    game = self.games_played,
                    white_win_rate = self.metrics.win_rate(Side::White, 100),
                    draw_rate = self.metrics.draw_rate(100),
                    avg_length = self.metrics.average_game_length(100),
                    avg_loss = self.metrics.average_loss(100),
                    buffer = self.buffer.len(),
                    "self-play progress"
                );
            }

            if self.config.checkpoint_interval > 0
                && self.games_played % self.config.checkpoint_interval == 0
            {
                self.checkpoint();
            }
        }

        summary.buffer_len = self.buffer.len();
        info!(
            games = summary.games,
            white_wins = summary.white_wins,
            black_wins = summary.black_wins,
            draws = summary.draws,
            "self-play training complete"
        );
        summary
    }

    /// Sample a batch and take one training step per experience. Returns
    /// the mean policy loss, or `None` if no step succeeded.
    fn train_batch(&mut self) -> Option<f64> {
        let batch = self.buffer.sample(self.config.batch_size, &mut self.rng);
        let mut total = 0.0;
        let mut steps = 0usize;
        for exp in batch {
            match train_step(&mut self.agent, exp, self.config.discount) {
                Ok(loss) => {
                    total += loss;
                    steps += 1;
                }
                Err(e) => warn!(error = %e, "skipping training sample"),
            }
        }
        if steps == 0 {
            return None;
        }
        let loss = total / steps as f64;
        debug!(steps, loss, "trained batch");
        Some(loss)
    }

    /// Checkpoint unless the current game count is already saved.
    pub fn final_checkpoint(&mut self) {
        if self.last_checkpoint != Some(self.games_played) {
            self.checkpoint();
        }
    }

    /// Save both networks and a progress line. Failures are logged only.
    pub fn checkpoint(&mut self) {
        let metrics = CheckpointMetrics {
            white_win_rate: self.metrics.win_rate(Side::White, 100),
            black_win_rate: self.metrics.win_rate(Side::Black, 100),
            draw_rate: self.metrics.draw_rate(100),
            average_game_length: self.metrics.average_game_length(100),
            average_loss: self.metrics.average_loss(100),
        };
        let metadata = CheckpointMetadata::self_play(
            self.games_played,
            self.buffer.len(),
            metrics,
            self.agent.policy_net.layer_sizes(),
        );
        match self.checkpoints.save(&self.agent, &metadata) {
            Ok(()) => self.last_checkpoint = Some(self.games_played),
            Err(e) => warn!(game = self.games_played, error = %e, "failed to save checkpoint"),
        }
    }

    /// Write every buffered experience as `Move,Reward,Result` rows.
    pub fn export_training_data(&self, path: &Path) -> Result<usize, ExportError> {
        match write_training_data(path, self.buffer.iter()) {
            Ok(rows) => {
                info!(path = %path.display(), rows, "exported training data");
                Ok(rows)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to export training data");
                Err(e)
            }
        }
    }
}

/// One TD step on the policy network and one regression step on the value
/// network.
///
/// The policy network doubles as an action-value function: only the output
/// slot of the taken move moves toward `reward + discount * max Q(after)`.
/// The value network's first output moves toward the recorded reward.
/// Returns the policy loss.
pub fn train_step(agent: &mut Agent, exp: &Experience, discount: f64) -> Result<f64, NetworkError> {
    let current_q = agent.policy_net.forward(&exp.state_before)?;
    let next_q = agent.policy_net.forward(&exp.state_after)?;
    let max_next = next_q.iter().copied().fold(0.0, f64::max);

    let slot = move_slot(&exp.mv, current_q.len());
    let mut target = current_q.clone();
    target[slot] = exp.reward + discount * max_next;
    let gradient: Vec<f64> = current_q.iter().zip(&target).map(|(q, t)| q - t).collect();
    let loss = agent
        .policy_net
        .train(&exp.state_before, &target, &gradient)?;

    let value = agent.value_net.forward(&exp.state_before)?;
    let mut value_target = value.clone();
    value_target[0] = exp.reward;
    let mut value_gradient = vec![0.0; value.len()];
    value_gradient[0] = value[0] - exp.reward;
    agent
        .value_net
        .train(&exp.state_before, &value_target, &value_gradient)?;

    Ok(loss)
}

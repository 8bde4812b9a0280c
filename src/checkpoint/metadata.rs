use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Which trainer wrote the checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointKind {
    SelfPlay,
    Evolution,
}

/// Rolling self-play metrics snapshot at checkpoint time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetrics {
    pub white_win_rate: f64,
    pub black_win_rate: f64,
    pub draw_rate: f64,
    pub average_game_length: f64,
    pub average_loss: f64,
}

/// Top-level checkpoint metadata written to checkpoint.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub kind: CheckpointKind,
    /// Games played for self-play, generations completed for evolution.
    pub step: usize,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_len: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_fitness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<CheckpointMetrics>,
    pub layer_sizes: Vec<usize>,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl CheckpointMetadata {
    pub fn self_play(
        games: usize,
        buffer_len: usize,
        metrics: CheckpointMetrics,
        layer_sizes: &[usize],
    ) -> Self {
        CheckpointMetadata {
            kind: CheckpointKind::SelfPlay,
            step: games,
            timestamp: now_secs(),
            buffer_len: Some(buffer_len),
            best_fitness: None,
            metrics: Some(metrics),
            layer_sizes: layer_sizes.to_vec(),
        }
    }

    pub fn evolution(generation: usize, best_fitness: f64, layer_sizes: &[usize]) -> Self {
        CheckpointMetadata {
            kind: CheckpointKind::Evolution,
            step: generation,
            timestamp: now_secs(),
            buffer_len: None,
            best_fitness: Some(best_fitness),
            metrics: None,
            layer_sizes: layer_sizes.to_vec(),
        }
    }

    /// One-line progress entry for the training log.
    pub fn log_line(&self) -> String {
        match self.kind {
            CheckpointKind::SelfPlay => format!(
                "Checkpoint at game {} - Buffer size: {}",
                self.step,
                self.buffer_len.unwrap_or(0)
            ),
            CheckpointKind::Evolution => format!(
                "Generation {} - Best fitness: {:.3}",
                self.step,
                self.best_fitness.unwrap_or(0.0)
            ),
        }
    }
}

use rand::Rng;
use tracing::{debug, trace};

use crate::ai::agent::Agent;
use crate::ai::mcts::{MctsConfig, MctsEngine};
use crate::ai::state_encoding::StateEncoder;
use crate::game::{GameRules, GameState, HexCoord, Move, PieceType};

// ─── Config ──────────────────────────────────────────────────────────────────

/// Phase thresholds and blending ratios.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Plies played by the opening heuristic.
    pub opening_plies: u32,
    /// First ply of the pure-search endgame.
    pub endgame_ply: u32,
    pub midgame_iterations: usize,
    pub endgame_iterations: usize,
    /// Chance of taking the search result in the midgame.
    pub mcts_probability: f64,
    /// Softmax temperature for policy sampling.
    pub temperature: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig {
            opening_plies: 4,
            endgame_ply: 12,
            midgame_iterations: 100,
            endgame_iterations: 200,
            mcts_probability: 0.7,
            temperature: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Opening,
    Midgame,
    Endgame,
}

impl Phase {
    pub fn from_ply(ply: u32, config: &PolicyConfig) -> Phase {
        if ply < config.opening_plies {
            Phase::Opening
        } else if ply < config.endgame_ply {
            Phase::Midgame
        } else {
            Phase::Endgame
        }
    }
}

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Phase-dependent move selection for one agent.
///
/// Openings use a cheap heuristic, the midgame mixes search with sampling
/// from the policy network and the endgame relies on search alone.
#[derive(Clone)]
pub struct DecisionPolicy<'a> {
    rules: &'a dyn GameRules,
    encoder: &'a dyn StateEncoder,
    config: PolicyConfig,
    mcts: MctsConfig,
}

impl<'a> DecisionPolicy<'a> {
    pub fn new(
        rules: &'a dyn GameRules,
        encoder: &'a dyn StateEncoder,
        config: PolicyConfig,
        mcts: MctsConfig,
    ) -> Self {
        DecisionPolicy {
            rules,
            encoder,
            config,
            mcts,
        }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn rules(&self) -> &'a dyn GameRules {
        self.rules
    }

    pub fn encoder(&self) -> &'a dyn StateEncoder {
        self.encoder
    }

    /// Pick a move for the side to move.
    ///
    /// `None` when the side has no legal move, or in the endgame when the
    /// search ran out of time before expanding the root.
    pub fn choose_move<R: Rng + ?Sized>(
        &self,
        agent: &Agent,
        state: &GameState,
        rng: &mut R,
    ) -> Option<Move> {
        let side = state.side_to_move();
        let moves = self.rules.legal_moves(state, side);
        if moves.is_empty() {
            return None;
        }

        let phase = Phase::from_ply(state.ply(), &self.config);
        trace!(agent = agent.id, ply = state.ply(), ?phase, moves = moves.len(), "choosing move");

        match phase {
            Phase::Opening => self.opening_move(state, moves, rng),
            Phase::Midgame => {
                let searched = self.search(agent, state, self.config.midgame_iterations);
                let use_search = rng.random::<f64>() < self.config.mcts_probability;
                match searched {
                    Some(mv) if use_search => Some(mv),
                    _ => self.sample_from_policy(agent, state, moves, rng),
                }
            }
            Phase::Endgame => self.search(agent, state, self.config.endgame_iterations),
        }
    }

    fn search(&self, agent: &Agent, state: &GameState, iterations: usize) -> Option<Move> {
        MctsEngine::new(self.rules, self.encoder, self.mcts.clone())
            .with_networks(Some(&agent.policy_net), Some(&agent.value_net))
            .search(state, iterations)
            .best
    }

    fn opening_move<R: Rng + ?Sized>(
        &self,
        state: &GameState,
        moves: Vec<Move>,
        rng: &mut R,
    ) -> Option<Move> {
        if state.ply() == 0 {
            if let Some(mv) = moves.iter().find(|m| m.to == HexCoord::ORIGIN) {
                return Some(mv.clone());
            }
        }
        if self.rules.must_place_queen(state, state.side_to_move()) {
            if let Some(mv) = moves.iter().find(|m| m.piece.kind == PieceType::Queen) {
                return Some(mv.clone());
            }
        }
        random_move(moves, rng)
    }

    fn sample_from_policy<R: Rng + ?Sized>(
        &self,
        agent: &Agent,
        state: &GameState,
        moves: Vec<Move>,
        rng: &mut R,
    ) -> Option<Move> {
        let features = self.encoder.encode(state, state.side_to_move());
        match agent.policy_net.forward(&features) {
            Ok(outputs) => softmax_sample(moves, &outputs, self.config.temperature, rng),
            Err(e) => {
                debug!(agent = agent.id, error = %e, "policy network failed, picking at random");
                random_move(moves, rng)
            }
        }
    }
}

fn random_move<R: Rng + ?Sized>(mut moves: Vec<Move>, rng: &mut R) -> Option<Move> {
    if moves.is_empty() {
        return None;
    }
    let idx = rng.random_range(0..moves.len());
    Some(moves.swap_remove(idx))
}

/// Roulette-wheel sample with weights `exp(outputs[i % len] / temperature)`.
///
/// Outputs are matched to moves by position and wrap around when there are
/// more moves than outputs.
pub fn softmax_sample<R: Rng + ?Sized>(
    mut moves: Vec<Move>,
    outputs: &[f64],
    temperature: f64,
    rng: &mut R,
) -> Option<Move> {
    if moves.is_empty() {
        return None;
    }
    if outputs.is_empty() {
        return random_move(moves, rng);
    }

    let temperature = temperature.max(f64::MIN_POSITIVE);
    let weights: Vec<f64> = (0..moves.len())
        .map(|i| (outputs[i % outputs.len()] / temperature).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return random_move(moves, rng);
    }

    let target = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    for (i, w) in weights.iter().enumerate() {
        cumulative += w;
        if target <= cumulative {
            return Some(moves.swap_remove(i));
        }
    }
    Some(moves.swap_remove(0))
}

use rand::Rng;

use crate::ai::networks::{NetworkConfig, NeuralNetwork};
use crate::checkpoint::{ModelStore, POLICY_NETWORK_KEY, VALUE_NETWORK_KEY};
use crate::error::NetworkError;
use crate::game::{Move, MoveKind, Outcome};
use crate::training::derive_seed;

/// One recorded ply of self-play.
#[derive(Debug, Clone)]
pub struct Experience {
    /// Encoding before the move, from the mover's perspective.
    pub state_before: Vec<f64>,
    pub mv: Move,
    /// Encoding after the move, from the same perspective.
    pub state_after: Vec<f64>,
    pub reward: f64,
    /// Final result of the game this ply belongs to.
    pub result: Outcome,
}

/// How a single game went for one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Win,
    Loss,
    Draw,
}

impl MatchOutcome {
    /// Fitness credited for this result.
    pub fn fitness(self) -> f64 {
        match self {
            MatchOutcome::Win => 1.0,
            MatchOutcome::Draw => 0.5,
            MatchOutcome::Loss => 0.0,
        }
    }
}

/// An agent's tournament record without its networks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentStats {
    pub id: usize,
    pub fitness: f64,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

/// A policy/value network pair with its tournament record.
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: usize,
    pub policy_net: NeuralNetwork,
    pub value_net: NeuralNetwork,
    pub fitness: f64,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

impl Agent {
    /// Fresh random networks. The value network gets its own seed derived
    /// from `seed`.
    pub fn new(id: usize, config: &NetworkConfig, seed: u64) -> Result<Self, NetworkError> {
        let policy_net = NeuralNetwork::from_config(config, seed)?;
        let value_net = NeuralNetwork::from_config(config, derive_seed(seed, 1))?;
        Ok(Self::from_networks(id, policy_net, value_net))
    }

    /// Load both networks from `store`, falling back to fresh weights.
    pub fn from_store(
        id: usize,
        config: &NetworkConfig,
        store: &dyn ModelStore,
        seed: u64,
    ) -> Result<Self, NetworkError> {
        let policy_net = NeuralNetwork::load_or_init(config, store, POLICY_NETWORK_KEY, seed)?;
        let value_net =
            NeuralNetwork::load_or_init(config, store, VALUE_NETWORK_KEY, derive_seed(seed, 1))?;
        Ok(Self::from_networks(id, policy_net, value_net))
    }

    pub fn from_networks(id: usize, policy_net: NeuralNetwork, value_net: NeuralNetwork) -> Self {
        Agent {
            id,
            policy_net,
            value_net,
            fitness: 0.0,
            wins: 0,
            losses: 0,
            draws: 0,
        }
    }

    /// Deep copy of both networks under the same id, with a clean record.
    pub fn clone_agent(&self) -> Agent {
        Self::from_networks(self.id, self.policy_net.clone(), self.value_net.clone())
    }

    pub fn mutate<R: Rng + ?Sized>(&mut self, rate: f64, strength: f64, rng: &mut R) {
        self.policy_net.mutate(rate, strength, rng);
        self.value_net.mutate(rate, strength, rng);
    }

    /// Child of `self` and `other` by uniform crossover of each network.
    pub fn crossover<R: Rng + ?Sized>(
        &self,
        other: &Agent,
        child_id: usize,
        rng: &mut R,
    ) -> Result<Agent, NetworkError> {
        let policy_net = self.policy_net.crossover(&other.policy_net, rng)?;
        let value_net = self.value_net.crossover(&other.value_net, rng)?;
        Ok(Self::from_networks(child_id, policy_net, value_net))
    }

    pub fn reset_record(&mut self) {
        self.fitness = 0.0;
        self.wins = 0;
        self.losses = 0;
        self.draws = 0;
    }

    pub fn record(&mut self, outcome: MatchOutcome) {
        match outcome {
            MatchOutcome::Win => self.wins += 1,
            MatchOutcome::Loss => self.losses += 1,
            MatchOutcome::Draw => self.draws += 1,
        }
        self.fitness += outcome.fitness();
    }

    pub fn games_played(&self) -> u32 {
        self.wins + self.losses + self.draws
    }

    pub fn stats(&self) -> AgentStats {
        AgentStats {
            id: self.id,
            fitness: self.fitness,
            wins: self.wins,
            losses: self.losses,
            draws: self.draws,
        }
    }
}

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// Fixed policy-output slot for `mv`: FNV-1a over the move's identifying
/// fields, modulo `width`. Ignores the transient score.
pub fn move_slot(mv: &Move, width: usize) -> usize {
    let from = mv.from.map_or([i32::MIN, i32::MIN], |c| [c.q, c.r]);
    let kind = match mv.kind {
        MoveKind::Place => 0u8,
        MoveKind::Move => 1u8,
    };

    let mut bytes = Vec::with_capacity(20);
    bytes.push(mv.piece.kind.ordinal() as u8);
    bytes.push(mv.piece.side.index() as u8);
    bytes.push(mv.piece.instance);
    bytes.push(kind);
    for v in [from[0], from[1], mv.to.q, mv.to.r] {
        bytes.extend_from_slice(&v.to_le_bytes());
    }

    let hash = bytes
        .iter()
        .fold(FNV_OFFSET, |h, b| (h ^ *b as u64).wrapping_mul(FNV_PRIME));
    (hash % width.max(1) as u64) as usize
}

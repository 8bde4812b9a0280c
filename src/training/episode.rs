use rand::Rng;
use tracing::{debug, warn};

use crate::ai::{Agent, DecisionPolicy, Experience};
use crate::game::{GameState, Outcome, Side};
use crate::training::metrics::EpisodeResult;

/// Result of playing a single self-play game.
pub struct EpisodeTrace {
    pub experiences: Vec<Experience>,
    pub result: EpisodeResult,
}

/// Play `white` against `black` from the opening, for at most `max_moves`
/// plies.
///
/// A game that hits the cap, reaches a side with no move, or fails to apply
/// a move ends as a draw.
pub fn play_match<R: Rng + ?Sized>(
    policy: &DecisionPolicy<'_>,
    white: &Agent,
    black: &Agent,
    max_moves: usize,
    rng: &mut R,
) -> EpisodeResult {
    let rules = policy.rules();
    let mut state = GameState::initial();
    let mut plies = 0;

    while plies < max_moves {
        let agent = match state.side_to_move() {
            Side::White => white,
            Side::Black => black,
        };
        let Some(mv) = policy.choose_move(agent, &state, rng) else {
            debug!(agent = agent.id, ply = plies, "no move available, scoring draw");
            break;
        };
        if let Err(e) = rules.apply(&mut state, &mv) {
            warn!(white = white.id, black = black.id, error = %e, "game aborted, scoring draw");
            return EpisodeResult {
                outcome: Outcome::Draw,
                game_length: plies,
            };
        }
        plies += 1;

        let outcome = rules.terminal(&state);
        if outcome.is_over() {
            return EpisodeResult {
                outcome,
                game_length: plies,
            };
        }
    }

    EpisodeResult {
        outcome: Outcome::Draw,
        game_length: plies,
    }
}

/// Play one self-play game. The agent plays both sides.
///
/// Every ply is recorded with the position encoded before and after the
/// move from the mover's perspective. Rewards are filled in by
/// [`assign_rewards`] once the result is known.
pub fn play_self_play_game<R: Rng + ?Sized>(
    policy: &DecisionPolicy<'_>,
    agent: &Agent,
    max_moves: usize,
    discount: f64,
    rng: &mut R,
) -> EpisodeTrace {
    let rules = policy.rules();
    let encoder = policy.encoder();
    let mut state = GameState::initial();
    let mut experiences: Vec<Experience> = Vec::new();
    let mut outcome = Outcome::Ongoing;

    while experiences.len() < max_moves {
        let mover = state.side_to_move();
        let Some(mv) = policy.choose_move(agent, &state, rng) else {
            debug!(ply = experiences.len(), "no move available, scoring draw");
            break;
        };

        let state_before = encoder.encode(&state, mover);
        if let Err(e) = rules.apply(&mut state, &mv) {
            warn!(agent = agent.id, error = %e, "self-play game aborted, scoring draw");
            break;
        }
        let state_after = encoder.encode(&state, mover);

        experiences.push(Experience {
            state_before,
            mv,
            state_after,
            reward: 0.0,
            result: Outcome::Ongoing,
        });

        outcome = rules.terminal(&state);
        if outcome.is_over() {
            break;
        }
    }

    if !outcome.is_over() {
        outcome = Outcome::Draw;
    }
    assign_rewards(&mut experiences, outcome, discount);

    let game_length = experiences.len();
    EpisodeTrace {
        experiences,
        result: EpisodeResult {
            outcome,
            game_length,
        },
    }
}

/// Fill in rewards backwards from the last ply and tag every experience
/// with `outcome`.
///
/// White moves on even plies. On a decisive result the winner's plies get
/// `r` and the loser's `1 - r`, where `r` starts at 1.0 on the final ply and
/// is multiplied by `discount` per ply moving back. A draw gives every ply
/// 0.5.
pub fn assign_rewards(experiences: &mut [Experience], outcome: Outcome, discount: f64) {
    let mut r = 1.0;
    for (i, exp) in experiences.iter_mut().enumerate().rev() {
        exp.result = outcome;
        exp.reward = match outcome {
            Outcome::Win(winner) => {
                let mover = if i % 2 == 0 { Side::White } else { Side::Black };
                if mover == winner {
                    r
                } else {
                    1.0 - r
                }
            }
            Outcome::Draw | Outcome::Ongoing => 0.5,
        };
        r *= discount;
    }
}

/// Derive an independent seed for the `index`-th random stream under
/// `base_seed`.
///
/// Population members use their index under the run seed, an agent's value
/// network uses index 1 under the agent seed, and trainers offset their own
/// rng from the run seed the same way.
pub fn derive_seed(base_seed: u64, index: usize) -> u64 {
    const PRIME: u64 = 0x100000001b3;
    let index = index as u64;
    let hash = (base_seed ^ 0x517cc1b727220a95).wrapping_mul(PRIME);
    let hash = (hash ^ index).wrapping_mul(PRIME);
    hash ^ (index >> 32)
}

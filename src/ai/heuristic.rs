//! Hand-tuned position evaluation used when no value network is available.

use crate::game::{GameRules, GameState, Side};

const BASELINE: f64 = 0.5;
const QUEEN_PRESSURE_WEIGHT: f64 = 0.08;
const MOBILITY_WEIGHT: f64 = 0.01;
const CENTER_WEIGHT: f64 = 0.05;

/// Score `state` for `side` in [0, 1].
///
/// Starts from 0.5 and adds queen pressure (neighbours around the enemy
/// queen minus neighbours around our own), the mobility difference and a
/// small bonus for own pieces near the origin.
pub fn evaluate(rules: &dyn GameRules, state: &GameState, side: Side) -> f64 {
    let board = state.board();
    let mut score = BASELINE;

    if let Some(own_queen) = board.queen_position(side) {
        score -= board.occupied_neighbors(own_queen) as f64 * QUEEN_PRESSURE_WEIGHT;
    }
    if let Some(enemy_queen) = board.queen_position(side.other()) {
        score += board.occupied_neighbors(enemy_queen) as f64 * QUEEN_PRESSURE_WEIGHT;
    }

    let own_mobility = rules.mobility(state, side) as f64;
    let enemy_mobility = rules.mobility(state, side.other()) as f64;
    score += (own_mobility - enemy_mobility) * MOBILITY_WEIGHT;

    score += center_control(state, side) * CENTER_WEIGHT;

    score.clamp(0.0, 1.0)
}

/// Σ 1 / (1 + |c|) over cells whose top piece belongs to `side`.
fn center_control(state: &GameState, side: Side) -> f64 {
    state
        .board()
        .tops()
        .filter(|(_, p)| p.side == side)
        .map(|(c, _)| 1.0 / (1.0 + c.axial_length()))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::fixtures::position;
    use crate::game::{HexCoord, HiveRules, PieceType};

    #[test]
    fn test_empty_board_is_neutral() {
        let v = evaluate(&HiveRules::new(), &GameState::initial(), Side::White);
        assert!((v - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_pressure_on_enemy_queen_is_good() {
        let rules = HiveRules::new();
        let ring = HexCoord::ORIGIN.neighbors();
        let mut cells = vec![(PieceType::Queen, Side::Black, (0, 0))];
        for (kind, c) in [PieceType::Ant, PieceType::Spider, PieceType::Beetle, PieceType::Queen]
            .iter()
            .zip(ring.iter())
        {
            cells.push((*kind, Side::White, (c.q, c.r)));
        }
        let state = position(&cells, Side::White);

        let white = evaluate(&rules, &state, Side::White);
        let black = evaluate(&rules, &state, Side::Black);
        assert!(white > 0.5, "white score {}", white);
        assert!(black < 0.5, "black score {}", black);
        assert!((0.0..=1.0).contains(&white));
        assert!((0.0..=1.0).contains(&black));
    }

    #[test]
    fn test_center_control() {
        let near = position(&[(PieceType::Ant, Side::White, (0, 0))], Side::Black);
        let far = position(&[(PieceType::Ant, Side::White, (3, 0))], Side::Black);
        assert!((center_control(&near, Side::White) - 1.0).abs() < 1e-12);
        assert!((center_control(&far, Side::White) - 0.25).abs() < 1e-12);
        assert_eq!(center_control(&near, Side::Black), 0.0);
    }
}

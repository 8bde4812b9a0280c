use std::collections::VecDeque;

use rand::Rng;

use crate::ai::Experience;

/// Bounded FIFO store of past experiences. The oldest are evicted first.
pub struct ReplayBuffer {
    buffer: VecDeque<Experience>,
    capacity: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        ReplayBuffer {
            buffer: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    /// Add an experience, evicting the oldest when full.
    pub fn push(&mut self, experience: Experience) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(experience);
    }

    /// Append a finished game in ply order.
    pub fn push_game(&mut self, game: Vec<Experience>) {
        for exp in game {
            self.push(exp);
        }
    }

    /// `batch_size` experiences drawn independently and uniformly, with
    /// replacement. Empty when the buffer is empty.
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Vec<&Experience> {
        if self.buffer.is_empty() {
            return Vec::new();
        }
        (0..batch_size)
            .map(|_| &self.buffer[rng.random_range(0..self.buffer.len())])
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Experience> + '_ {
        self.buffer.iter()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{HexCoord, Move, Outcome, Piece, PieceType, Side};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn dummy_experience(reward: f64) -> Experience {
        Experience {
            state_before: vec![0.0; 4],
            mv: Move::place(Piece::new(PieceType::Ant, Side::White, 1), HexCoord::ORIGIN),
            state_after: vec![1.0; 4],
            reward,
            result: Outcome::Draw,
        }
    }

    #[test]
    fn test_push_and_len() {
        let mut buf = ReplayBuffer::new(10);
        assert!(buf.is_empty());

        buf.push(dummy_experience(0.0));
        assert_eq!(buf.len(), 1);

        for _ in 0..9 {
            buf.push(dummy_experience(0.0));
        }
        assert_eq!(buf.len(), 10);
    }

    #[test]
    fn test_evicts_oldest_first() {
        let mut buf = ReplayBuffer::new(5);
        buf.push_game((0..8).map(|i| dummy_experience(i as f64)).collect());
        assert_eq!(buf.len(), 5);
        let rewards: Vec<f64> = buf.iter().map(|e| e.reward).collect();
        assert_eq!(rewards, vec![3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_sample_with_replacement() {
        let mut buf = ReplayBuffer::new(100);
        for i in 0..3 {
            buf.push(dummy_experience(i as f64));
        }
        let mut rng = StdRng::seed_from_u64(1);
        let batch = buf.sample(10, &mut rng);
        assert_eq!(batch.len(), 10);
        assert!(batch.iter().all(|e| (0.0..3.0).contains(&e.reward)));
    }

    #[test]
    fn test_sample_empty() {
        let buf = ReplayBuffer::new(10);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(buf.sample(4, &mut rng).is_empty());
    }
}

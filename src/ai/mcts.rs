use std::time::{Duration, Instant};

use tracing::{debug, error, trace};

use crate::ai::heuristic;
use crate::ai::networks::NeuralNetwork;
use crate::ai::state_encoding::StateEncoder;
use crate::game::{GameRules, GameState, Move, Outcome, Side};

const EPSILON: f64 = 1e-8;

// ─── Config ──────────────────────────────────────────────────────────────────

/// Search parameters shared by every engine instance.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MctsConfig {
    /// UCT exploration constant.
    pub exploration: f64,
    /// Weight of the policy prior added to a child's selection score.
    pub prior_weight: f64,
    /// Hard cap on any requested iteration budget.
    pub max_iterations: usize,
    pub timeout_ms: u64,
    /// The clock is read once every this many iterations.
    pub time_check_interval: usize,
    pub max_depth: usize,
    /// Children generated per expansion, in legal-move order.
    pub max_children: usize,
}

impl Default for MctsConfig {
    fn default() -> Self {
        MctsConfig {
            exploration: 1.41,
            prior_weight: 0.3,
            max_iterations: 100,
            timeout_ms: 5000,
            time_check_interval: 10,
            max_depth: 100,
            max_children: 50,
        }
    }
}

// ─── Search tree (arena-based) ───────────────────────────────────────────────

struct SearchNode {
    parent: Option<usize>,
    /// Move that produced this node; `None` at the root.
    mv: Option<Move>,
    children: Vec<usize>,
    visits: u32,
    /// Accumulated value from the perspective of the side that played `mv`.
    value_sum: f64,
    prior: f64,
}

struct SearchTree {
    nodes: Vec<SearchNode>,
}

impl SearchTree {
    fn new() -> Self {
        let mut nodes = Vec::with_capacity(256);
        nodes.push(SearchNode {
            parent: None,
            mv: None,
            children: Vec::new(),
            visits: 0,
            value_sum: 0.0,
            prior: 1.0,
        });
        SearchTree { nodes }
    }

    fn add_child(&mut self, parent: usize, mv: Move, prior: f64) {
        let idx = self.nodes.len();
        self.nodes.push(SearchNode {
            parent: Some(parent),
            mv: Some(mv),
            children: Vec::new(),
            visits: 0,
            value_sum: 0.0,
            prior,
        });
        self.nodes[parent].children.push(idx);
    }

    /// Child of `node_idx` with the best UCT score plus prior bonus.
    fn select_child(&self, node_idx: usize, exploration: f64, prior_weight: Option<f64>) -> Option<usize> {
        let node = &self.nodes[node_idx];
        let log_parent = ((node.visits + 1) as f64).ln();

        let mut best = None;
        let mut best_score = f64::NEG_INFINITY;
        for &ci in &node.children {
            let child = &self.nodes[ci];
            let visits = child.visits as f64;
            let mut score = child.value_sum / (visits + EPSILON)
                + exploration * (log_parent / (visits + EPSILON)).sqrt();
            if let Some(w) = prior_weight {
                score += w * child.prior;
            }
            if score > best_score {
                best_score = score;
                best = Some(ci);
            }
        }
        best
    }

    /// Walk from `leaf` to the root, flipping the value at every step.
    fn backpropagate(&mut self, leaf: usize, value: f64) {
        let mut current = Some(leaf);
        let mut v = value;
        while let Some(idx) = current {
            let node = &mut self.nodes[idx];
            node.visits += 1;
            node.value_sum += v;
            current = node.parent;
            v = 1.0 - v;
        }
    }

    /// Most-visited root child; ties go to the earliest child.
    fn best_root_move(&self) -> Option<Move> {
        let mut best: Option<&SearchNode> = None;
        for &ci in &self.nodes[0].children {
            let child = &self.nodes[ci];
            if best.map_or(true, |b| child.visits > b.visits) {
                best = Some(child);
            }
        }
        best.and_then(|n| n.mv.clone())
    }

    fn root_child_visits(&self) -> Vec<(Move, u32)> {
        self.nodes[0]
            .children
            .iter()
            .filter_map(|&ci| {
                let child = &self.nodes[ci];
                child.mv.clone().map(|m| (m, child.visits))
            })
            .collect()
    }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Outcome of one search.
#[derive(Debug, Clone)]
pub struct SearchReport {
    /// `None` when no root child was ever created.
    pub best: Option<Move>,
    /// Iterations completed before the budget or the clock ran out.
    pub iterations: usize,
    /// Root children in expansion order with their visit counts.
    pub child_visits: Vec<(Move, u32)>,
    pub timed_out: bool,
}

impl SearchReport {
    pub fn total_child_visits(&self) -> u32 {
        self.child_visits.iter().map(|(_, v)| v).sum()
    }
}

/// Monte-Carlo tree search guided by optional policy and value networks.
///
/// The engine borrows its collaborators; a fresh tree is built for every
/// call to [`MctsEngine::search`] and dropped when it returns.
pub struct MctsEngine<'a> {
    rules: &'a dyn GameRules,
    encoder: &'a dyn StateEncoder,
    policy_net: Option<&'a NeuralNetwork>,
    value_net: Option<&'a NeuralNetwork>,
    config: MctsConfig,
}

impl<'a> MctsEngine<'a> {
    pub fn new(rules: &'a dyn GameRules, encoder: &'a dyn StateEncoder, config: MctsConfig) -> Self {
        MctsEngine {
            rules,
            encoder,
            policy_net: None,
            value_net: None,
            config,
        }
    }

    pub fn with_networks(
        mut self,
        policy_net: Option<&'a NeuralNetwork>,
        value_net: Option<&'a NeuralNetwork>,
    ) -> Self {
        self.policy_net = policy_net;
        self.value_net = value_net;
        self
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// Search from `root` for the side to move with up to `iterations`
    /// iterations (further capped by `max_iterations`).
    pub fn search(&self, root: &GameState, iterations: usize) -> SearchReport {
        self.run(root, iterations).1
    }

    fn run(&self, root: &GameState, iterations: usize) -> (SearchTree, SearchReport) {
        let start = Instant::now();
        let mut tree = SearchTree::new();
        let searcher = root.side_to_move();

        let legal = self.rules.legal_moves(root, searcher);
        if legal.len() <= 1 {
            let best = legal.into_iter().next();
            let report = SearchReport {
                best,
                iterations: 0,
                child_visits: Vec::new(),
                timed_out: false,
            };
            return (tree, report);
        }

        let budget = iterations.min(self.config.max_iterations);
        let timeout = Duration::from_millis(self.config.timeout_ms);
        let check_every = self.config.time_check_interval.max(1);
        let mut completed = 0;
        let mut timed_out = false;

        for i in 0..budget {
            if i % check_every == 0 && start.elapsed() > timeout {
                debug!(iterations = i, elapsed_ms = start.elapsed().as_millis() as u64, "search timed out");
                timed_out = true;
                break;
            }
            self.iterate(&mut tree, root, searcher);
            completed += 1;
        }

        let report = SearchReport {
            best: tree.best_root_move(),
            iterations: completed,
            child_visits: tree.root_child_visits(),
            timed_out,
        };
        trace!(
            iterations = report.iterations,
            nodes = tree.nodes.len(),
            best = ?report.best.as_ref().map(|m| m.to_string()),
            "search finished"
        );
        (tree, report)
    }

    fn iterate(&self, tree: &mut SearchTree, root: &GameState, searcher: Side) {
        let mut state = root.clone();
        let mut node = 0;
        let mut depth = 0;
        let prior_weight = self.policy_net.map(|_| self.config.prior_weight);

        // Selection
        while !tree.nodes[node].children.is_empty()
            && !self.rules.terminal(&state).is_over()
            && depth < self.config.max_depth
        {
            let Some(child) = tree.select_child(node, self.config.exploration, prior_weight) else {
                break;
            };
            if !self.apply_node_move(tree, child, &mut state) {
                break;
            }
            node = child;
            depth += 1;
        }

        // Expansion
        if tree.nodes[node].visits > 0 && !self.rules.terminal(&state).is_over() {
            self.expand(tree, node, &state);
            if let Some(&first) = tree.nodes[node].children.first() {
                if self.apply_node_move(tree, first, &mut state) {
                    node = first;
                    depth += 1;
                }
            }
        }

        // Evaluation, converted to the perspective of the node's mover.
        let value = self.evaluate(&state, searcher).clamp(0.0, 1.0);
        let node_value = if depth % 2 == 1 { value } else { 1.0 - value };

        tree.backpropagate(node, node_value);
    }

    fn apply_node_move(&self, tree: &SearchTree, idx: usize, state: &mut GameState) -> bool {
        let Some(mv) = tree.nodes[idx].mv.as_ref() else {
            return false;
        };
        match self.rules.apply(state, mv) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, mv = %mv, "search move failed to apply");
                false
            }
        }
    }

    fn expand(&self, tree: &mut SearchTree, node: usize, state: &GameState) {
        let side = state.side_to_move();
        let mut moves = self.rules.legal_moves(state, side);
        moves.truncate(self.config.max_children);
        if moves.is_empty() {
            return;
        }

        let priors = self.policy_net.and_then(|net| {
            let features = self.encoder.encode(state, side);
            match net.forward(&features) {
                Ok(out) => Some(out),
                Err(e) => {
                    debug!(error = %e, "policy network failed, using uniform priors");
                    None
                }
            }
        });

        let uniform = 1.0 / moves.len() as f64;
        for (i, mv) in moves.into_iter().enumerate() {
            let prior = priors
                .as_ref()
                .and_then(|p| p.get(i).copied())
                .unwrap_or(uniform);
            tree.add_child(node, mv, prior);
        }
    }

    /// Value of `state` for `searcher` in [0, 1].
    fn evaluate(&self, state: &GameState, searcher: Side) -> f64 {
        match self.rules.terminal(state) {
            Outcome::Win(side) if side == searcher => return 1.0,
            Outcome::Win(_) => return 0.0,
            Outcome::Draw => return 0.5,
            Outcome::Ongoing => {}
        }

        if let Some(net) = self.value_net {
            let features = self.encoder.encode(state, searcher);
            match net.forward(&features) {
                Ok(out) if !out.is_empty() => return out[0],
                Ok(_) => {}
                Err(e) => debug!(error = %e, "value network failed, using heuristic"),
            }
        }
        heuristic::evaluate(self.rules, state, searcher)
    }
}

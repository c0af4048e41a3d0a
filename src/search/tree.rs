// Bounded-depth lookahead tree
//
// Plies rotate through the agents starting with us: with one snake we always act,
// with two the turns alternate. Each edge carries the reward of the acting agent's
// destination and a node is worth its reward plus the decayed best child. Every
// ply maximises the same scalar, so the opponent is modelled as cooperative
// rather than adversarial. The tree is rebuilt for depths 1..=max_depth and the
// root choice is published after each depth.

use log::{debug, info, warn};
use rand::RngCore;
use rayon::prelude::*;
use std::time::Instant;

use super::{Decision, MoveStrategy, SearchProgress};
use crate::board::{AgentId, Board};
use crate::config::{Config, ScoresConfig};
use crate::movegen::safe_moves;
use crate::scoring::score;
use crate::types::Direction;

/// One position in the lookahead tree. Children are owned exclusively.
#[derive(Debug, Clone)]
pub struct SearchNode {
    pub board: Board,
    /// Move that produced this node; `None` at the root
    pub direction: Option<Direction>,
    /// Reward of the transition into this node
    pub reward: f32,
    /// Agent that made the transition into this node
    pub agent: AgentId,
    pub children: Vec<SearchNode>,
}

impl SearchNode {
    pub fn root(board: Board) -> Self {
        SearchNode {
            board,
            direction: None,
            reward: 0.0,
            agent: AgentId::YOU,
            children: Vec::new(),
        }
    }

    /// Reward plus `decay` times the best child value; a leaf is worth its reward
    pub fn value(&self, decay: f32) -> f32 {
        let best_child = self
            .children
            .iter()
            .map(|child| child.value(decay))
            .fold(None, |best: Option<f32>, v| Some(best.map_or(v, |b| b.max(v))));

        match best_child {
            Some(best) => self.reward + decay * best,
            None => self.reward,
        }
    }

    /// Number of nodes in this subtree, including itself
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(SearchNode::size).sum::<usize>()
    }

    /// Children for every safe move of the agent acting at `ply`
    fn successors(&self, ply: usize, weights: &ScoresConfig) -> Vec<SearchNode> {
        let agent = acting_agent(&self.board, ply);
        let head = self.board.snake(agent).head();

        safe_moves(&self.board, agent)
            .into_iter()
            .map(|dir| {
                let destination = dir.apply(&head);
                SearchNode {
                    reward: score(&self.board, agent, &destination, weights),
                    board: self.board.apply_move(agent, dir),
                    direction: Some(dir),
                    agent,
                    children: Vec::new(),
                }
            })
            .collect()
    }

    /// Grows this subtree `remaining` more plies; the next ply to move is `ply`
    fn expand(&mut self, remaining: u8, ply: usize, weights: &ScoresConfig) {
        if remaining == 0 {
            return;
        }
        self.children = self.successors(ply, weights);
        for child in &mut self.children {
            child.expand(remaining - 1, ply + 1, weights);
        }
    }
}

/// Agent to move at `ply` (root children are ply 0)
fn acting_agent(board: &Board, ply: usize) -> AgentId {
    AgentId(ply % board.agent_count().max(1))
}

/// Decayed-reward lookahead strategy
#[derive(Debug, Clone)]
pub struct TreeSearch {
    pub max_depth: u8,
    pub reward_decay: f32,
    pub parallel_root: bool,
    pub fallback: Direction,
    pub weights: ScoresConfig,
}

impl TreeSearch {
    pub fn from_config(config: &Config) -> Self {
        TreeSearch {
            max_depth: config.search.max_depth,
            reward_decay: config.search.reward_decay,
            parallel_root: config.search.parallel_root,
            fallback: config.search.fallback_direction,
            weights: config.scores.clone(),
        }
    }

    /// Builds the full tree `depth` plies below `board`
    pub fn build(&self, board: &Board, depth: u8) -> SearchNode {
        let mut root = SearchNode::root(board.clone());
        if depth == 0 {
            return root;
        }

        root.children = root.successors(0, &self.weights);
        let weights = &self.weights;
        if self.parallel_root {
            root.children
                .par_iter_mut()
                .for_each(|child| child.expand(depth - 1, 1, weights));
        } else {
            for child in &mut root.children {
                child.expand(depth - 1, 1, weights);
            }
        }

        root
    }

    /// Root child with the highest value. Ties go to the earliest direction.
    pub fn best_root_move(&self, root: &SearchNode) -> Option<(Direction, f32)> {
        let mut best: Option<(Direction, f32)> = None;

        for child in &root.children {
            let value = child.value(self.reward_decay);
            debug!(
                "  {:>5}: {:.4}",
                child.direction.map_or("-", |d| d.as_str()),
                value
            );
            if best.map_or(true, |(_, b)| value > b) {
                best = child.direction.map(|d| (d, value));
            }
        }

        best
    }
}

impl MoveStrategy for TreeSearch {
    fn name(&self) -> &'static str {
        "tree"
    }

    fn search(&self, board: &Board, progress: &SearchProgress, _rng: &mut dyn RngCore) -> Decision {
        let start_time = Instant::now();
        let mut decision = Decision::fallback(self.fallback);

        for depth in 1..=self.max_depth {
            let root = self.build(board, depth);

            match self.best_root_move(&root) {
                Some((direction, value)) => {
                    decision = Decision {
                        direction,
                        score: value,
                        no_safe_move: false,
                        iterations: depth as u32,
                    };
                    progress.publish(&decision);
                    debug!(
                        "Depth {}: {} nodes, best {} ({:.4})",
                        depth,
                        root.size(),
                        direction.as_str(),
                        value
                    );
                }
                None => {
                    warn!("No safe moves detected at the root");
                    return decision;
                }
            }
        }

        info!(
            "Tree search chose {} (score: {:.4}, depth: {}, time: {}ms)",
            decision.direction.as_str(),
            decision.score,
            decision.iterations,
            start_time.elapsed().as_millis()
        );
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coord;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn c(x: i32, y: i32) -> Coord {
        Coord::new(x, y)
    }

    fn tree(max_depth: u8, parallel_root: bool) -> TreeSearch {
        let mut config = Config::default_hardcoded();
        config.search.max_depth = max_depth;
        config.search.parallel_root = parallel_root;
        TreeSearch::from_config(&config)
    }

    fn run(search: &TreeSearch, board: &Board) -> Decision {
        let progress = SearchProgress::new(search.fallback);
        let mut rng = StdRng::seed_from_u64(0);
        search.search(board, &progress, &mut rng)
    }

    #[test]
    fn test_single_agent_always_acts() {
        let board = Board::new(7, 7, vec![], vec![(vec![c(3, 3)], 100)]);
        let root = tree(2, false).build(&board, 2);

        assert_eq!(root.children.len(), 4);
        for child in &root.children {
            assert_eq!(child.agent, AgentId::YOU);
            for grandchild in &child.children {
                assert_eq!(grandchild.agent, AgentId::YOU);
            }
        }
    }

    #[test]
    fn test_two_agents_alternate_starting_with_us() {
        let board = Board::new(
            11,
            11,
            vec![],
            vec![(vec![c(2, 2), c(2, 1)], 100), (vec![c(8, 8), c(8, 9)], 100)],
        );
        let root = tree(3, false).build(&board, 3);

        for child in &root.children {
            assert_eq!(child.agent, AgentId::YOU);
            for grandchild in &child.children {
                assert_eq!(grandchild.agent, AgentId(1));
                for great in &grandchild.children {
                    assert_eq!(great.agent, AgentId::YOU);
                }
            }
        }
    }

    #[test]
    fn test_value_is_reward_plus_decayed_best_child() {
        let leaf = |reward: f32| SearchNode {
            board: Board::new(1, 1, vec![], vec![]),
            direction: Some(Direction::Up),
            reward,
            agent: AgentId::YOU,
            children: vec![],
        };
        let mut node = leaf(1.0);
        node.children = vec![leaf(0.5), leaf(3.0), leaf(-2.0)];

        assert_eq!(node.value(0.5), 2.5);
        assert_eq!(leaf(4.0).value(0.5), 4.0);
    }

    #[test]
    fn test_moves_toward_sole_food() {
        let board = Board::new(7, 7, vec![c(4, 3)], vec![(vec![c(3, 3)], 100)]);

        let decision = run(&tree(2, false), &board);

        assert_eq!(decision.direction, Direction::Right);
        assert!(!decision.no_safe_move);
        assert_eq!(decision.iterations, 2);
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let board = Board::new(
            11,
            11,
            vec![c(1, 9), c(7, 2), c(5, 5)],
            vec![
                (vec![c(3, 3), c(3, 2), c(3, 1)], 60),
                (vec![c(6, 6), c(6, 7), c(6, 8), c(7, 8)], 80),
            ],
        );

        let sequential = run(&tree(3, false), &board);
        let parallel = run(&tree(3, true), &board);

        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_trapped_returns_fallback() {
        let board = Board::new(
            3,
            3,
            vec![],
            vec![
                (vec![c(0, 0), c(1, 0), c(1, 1)], 100),
                (vec![c(0, 2), c(0, 1), c(1, 2), c(2, 2)], 100),
            ],
        );

        let decision = run(&tree(2, false), &board);

        assert!(decision.no_safe_move);
        assert_eq!(decision.direction, Direction::Down);
    }

    #[test]
    fn test_ties_go_to_first_direction() {
        // Nothing to score: every move is worth zero
        let mut search = tree(1, false);
        search.weights.food_enabled = false;
        search.weights.edge_enabled = false;
        let board = Board::new(7, 7, vec![], vec![(vec![c(3, 3)], 100)]);

        let decision = run(&search, &board);

        assert_eq!(decision.direction, Direction::Up);
        assert_eq!(decision.score, 0.0);
    }
}

// Move search
//
// Both strategies sit behind `MoveStrategy` and report into a `SearchProgress`
// whenever they have a better answer, so whoever owns the deadline can read a
// valid move at any moment (anytime behaviour). The core itself never times out.

pub mod rollout;
pub mod tree;

use log::warn;
use rand::RngCore;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::board::{AgentId, Board};
use crate::config::{Config, StrategyKind};
use crate::movegen::safe_moves;
use crate::types::Direction;

pub use rollout::RolloutSearch;
pub use tree::{SearchNode, TreeSearch};

/// Result of one decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub direction: Direction,
    pub score: f32,
    /// Every direction was unsafe and `direction` is the configured fallback
    pub no_safe_move: bool,
    /// Completed tree depths or rollout rounds behind this answer
    pub iterations: u32,
}

impl Decision {
    /// The answer given when no direction survives the legality filter
    pub fn fallback(direction: Direction) -> Self {
        Decision {
            direction,
            score: f32::MIN,
            no_safe_move: true,
            iterations: 0,
        }
    }
}

const NO_SAFE_MOVE_BIT: u8 = 0b100;

/// Direction index in the low two bits, the no-safe-move flag above them
fn pack_move(direction: Direction, no_safe_move: bool) -> u8 {
    direction.index() | if no_safe_move { NO_SAFE_MOVE_BIT } else { 0 }
}

fn unpack_move(bits: u8) -> (Direction, bool) {
    (
        Direction::from_index(bits & !NO_SAFE_MOVE_BIT),
        bits & NO_SAFE_MOVE_BIT != 0,
    )
}

/// Lock-free best-so-far state shared between a running search and its poller.
///
/// The direction and the no-safe-move flag share one atomic and are always read
/// as a pair. Score and iteration count are informational and may already
/// belong to a newer publish than the move read with them.
#[derive(Debug)]
pub struct SearchProgress {
    /// Best move found so far, packed with the no-safe-move flag
    best_move: AtomicU8,
    /// Best score, stored as f32 bits
    best_score: AtomicU32,
    iterations: AtomicU32,
    /// Flag indicating search completion
    search_complete: AtomicBool,
}

impl SearchProgress {
    /// Starts out answering `fallback`, flagged as having no safe move
    pub fn new(fallback: Direction) -> Self {
        SearchProgress {
            best_move: AtomicU8::new(pack_move(fallback, true)),
            best_score: AtomicU32::new(f32::MIN.to_bits()),
            iterations: AtomicU32::new(0),
            search_complete: AtomicBool::new(false),
        }
    }

    /// Starts out answering the first safe move on `board`, so an early deadline
    /// still gets a legal answer. Without one it behaves like `new`.
    pub fn for_board(board: &Board, fallback: Direction) -> Self {
        let progress = SearchProgress::new(fallback);
        if let Some(&direction) = safe_moves(board, AgentId::YOU).first() {
            progress.publish(&Decision {
                direction,
                score: f32::MIN,
                no_safe_move: false,
                iterations: 0,
            });
        }
        progress
    }

    /// Replaces the published answer
    pub fn publish(&self, decision: &Decision) {
        self.best_score
            .store(decision.score.to_bits(), Ordering::Release);
        self.iterations
            .store(decision.iterations, Ordering::Release);
        self.best_move.store(
            pack_move(decision.direction, decision.no_safe_move),
            Ordering::Release,
        );
    }

    pub fn mark_complete(&self) {
        self.search_complete.store(true, Ordering::Release);
    }

    pub fn is_complete(&self) -> bool {
        self.search_complete.load(Ordering::Acquire)
    }

    /// Current best answer
    pub fn snapshot(&self) -> Decision {
        let (direction, no_safe_move) = unpack_move(self.best_move.load(Ordering::Acquire));
        Decision {
            direction,
            score: f32::from_bits(self.best_score.load(Ordering::Acquire)),
            no_safe_move,
            iterations: self.iterations.load(Ordering::Acquire),
        }
    }
}

/// A pluggable move-selection policy
pub trait MoveStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Searches `board` for our snake's next move.
    /// Improvements are published to `progress` as they are found.
    fn search(&self, board: &Board, progress: &SearchProgress, rng: &mut dyn RngCore) -> Decision;
}

/// Builds the strategy selected in `config`
pub fn strategy_for(config: &Config) -> Box<dyn MoveStrategy> {
    match config.search.strategy {
        StrategyKind::Tree => Box::new(TreeSearch::from_config(config)),
        StrategyKind::Rollout => Box::new(RolloutSearch::from_config(config)),
    }
}

/// Picks our snake's next move on `board`
pub fn decide_move(board: &Board, config: &Config, rng: &mut dyn RngCore) -> Decision {
    let progress = SearchProgress::for_board(board, config.search.fallback_direction);
    decide_move_with_progress(board, config, &progress, rng)
}

/// `decide_move`, publishing intermediate answers to `progress` and marking it
/// complete at the end
pub fn decide_move_with_progress(
    board: &Board,
    config: &Config,
    progress: &SearchProgress,
    rng: &mut dyn RngCore,
) -> Decision {
    let strategy = strategy_for(config);
    let decision = strategy.search(board, progress, rng);
    progress.publish(&decision);
    progress.mark_complete();

    if decision.no_safe_move {
        warn!(
            "{}: no safe move, falling back to {}",
            strategy.name(),
            decision.direction.as_str()
        );
    }

    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_progress_starts_at_fallback() {
        let progress = SearchProgress::new(Direction::Left);
        let snapshot = progress.snapshot();

        assert_eq!(snapshot.direction, Direction::Left);
        assert!(snapshot.no_safe_move);
        assert!(!progress.is_complete());
    }

    #[test]
    fn test_progress_publish_round_trips_score() {
        let progress = SearchProgress::new(Direction::Down);
        let decision = Decision {
            direction: Direction::Right,
            score: 1.25,
            no_safe_move: false,
            iterations: 2,
        };

        progress.publish(&decision);

        assert_eq!(progress.snapshot(), decision);
    }

    #[test]
    fn test_move_and_flag_are_packed_together() {
        for direction in Direction::all() {
            for flag in [false, true] {
                assert_eq!(unpack_move(pack_move(direction, flag)), (direction, flag));
            }
        }

        let progress = SearchProgress::new(Direction::Down);
        progress.publish(&Decision {
            direction: Direction::Up,
            score: 0.5,
            no_safe_move: false,
            iterations: 1,
        });
        let snapshot = progress.snapshot();
        assert_eq!(snapshot.direction, Direction::Up);
        assert!(!snapshot.no_safe_move);
    }

    #[test]
    fn test_progress_for_board_starts_on_a_safe_move() {
        use crate::types::Coord;

        // Up is the wall and Down our neck; the fallback itself is illegal
        let board = Board::new(
            7,
            7,
            vec![],
            vec![(vec![Coord::new(3, 6), Coord::new(3, 5), Coord::new(3, 4)], 100)],
        );
        let progress = SearchProgress::for_board(&board, Direction::Down);
        let snapshot = progress.snapshot();

        assert_eq!(snapshot.direction, Direction::Left);
        assert!(!snapshot.no_safe_move);
        assert!(!progress.is_complete());
    }

    #[test]
    fn test_progress_for_trapped_board_starts_on_fallback() {
        use crate::types::Coord;

        let board = Board::new(
            2,
            2,
            vec![],
            vec![(vec![Coord::new(0, 0), Coord::new(0, 1), Coord::new(1, 1), Coord::new(1, 0)], 100)],
        );
        let snapshot = SearchProgress::for_board(&board, Direction::Left).snapshot();

        assert_eq!(snapshot.direction, Direction::Left);
        assert!(snapshot.no_safe_move);
    }

    #[test]
    fn test_decide_move_marks_progress_complete() {
        use crate::types::Coord;

        let board = Board::new(7, 7, vec![], vec![(vec![Coord::new(3, 3)], 100)]);
        let config = Config::default_hardcoded();
        let progress = SearchProgress::new(config.search.fallback_direction);
        let mut rng = StdRng::seed_from_u64(1);

        let decision = decide_move_with_progress(&board, &config, &progress, &mut rng);

        assert!(progress.is_complete());
        assert_eq!(progress.snapshot(), decision);
    }
}

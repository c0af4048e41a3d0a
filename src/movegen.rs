// Legality filter
//
// A direction is safe for an agent when the resulting head stays on the board,
// misses the agent's own trailing body, and misses every opponent's body.
// An opponent that is strictly shorter than the agent does not block its own
// head cell: moving onto it is a head-to-head the agent wins.

use crate::board::{AgentId, Board};
use crate::types::{Coord, Direction};

/// Returns the safe directions for `agent`, in `Direction::all()` order.
/// The result may be empty.
pub fn safe_moves(board: &Board, agent: AgentId) -> Vec<Direction> {
    let snake = board.snake(agent);
    let head = snake.head();

    Direction::all()
        .iter()
        .filter(|&&dir| {
            let next = dir.apply(&head);

            if !board.in_bounds(&next) {
                return false;
            }

            if snake.trailing_body().contains(&next) {
                return false;
            }

            !collides_with_opponent(board, agent, &next)
        })
        .copied()
        .collect()
}

/// True if `coord` hits an opponent of `agent`, honoring the smaller-head exception
fn collides_with_opponent(board: &Board, agent: AgentId, coord: &Coord) -> bool {
    let own_length = board.snake(agent).length();

    board.opponents(agent).any(|opponent| {
        let blocking = if opponent.length() < own_length {
            opponent.trailing_body()
        } else {
            &opponent.body[..]
        };
        blocking.contains(coord)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: i32, y: i32) -> Coord {
        Coord::new(x, y)
    }

    #[test]
    fn test_left_wall_excludes_left() {
        let board = Board::new(7, 7, vec![], vec![(vec![c(0, 3)], 100)]);

        let moves = safe_moves(&board, AgentId::YOU);

        assert!(!moves.contains(&Direction::Left));
        assert_eq!(moves, vec![Direction::Up, Direction::Down, Direction::Right]);
    }

    #[test]
    fn test_corner_leaves_two_moves() {
        let board = Board::new(7, 7, vec![], vec![(vec![c(6, 6)], 100)]);

        let moves = safe_moves(&board, AgentId::YOU);

        assert_eq!(moves, vec![Direction::Down, Direction::Left]);
    }

    #[test]
    fn test_own_body_is_excluded() {
        // Head at (3,3) with the body curling up and to the right
        let board = Board::new(
            7,
            7,
            vec![],
            vec![(vec![c(3, 3), c(3, 4), c(4, 4), c(4, 3), c(4, 2)], 100)],
        );

        let moves = safe_moves(&board, AgentId::YOU);

        assert_eq!(moves, vec![Direction::Down, Direction::Left]);
    }

    #[test]
    fn test_larger_opponent_blocks_its_head() {
        let board = Board::new(
            7,
            7,
            vec![],
            vec![
                (vec![c(3, 3), c(2, 3), c(1, 3)], 100),
                (vec![c(4, 3), c(5, 3), c(6, 3), c(6, 4)], 100),
            ],
        );

        let moves = safe_moves(&board, AgentId::YOU);

        assert!(!moves.contains(&Direction::Right));
    }

    #[test]
    fn test_equal_opponent_blocks_its_head() {
        let board = Board::new(
            7,
            7,
            vec![],
            vec![
                (vec![c(3, 3), c(2, 3)], 100),
                (vec![c(4, 3), c(5, 3)], 100),
            ],
        );

        assert!(!safe_moves(&board, AgentId::YOU).contains(&Direction::Right));
    }

    #[test]
    fn test_smaller_opponent_head_may_be_pursued() {
        let board = Board::new(
            7,
            7,
            vec![],
            vec![
                (vec![c(3, 3), c(2, 3), c(1, 3)], 100),
                (vec![c(4, 3), c(5, 3)], 100),
            ],
        );

        let moves = safe_moves(&board, AgentId::YOU);
        assert!(moves.contains(&Direction::Right));

        // The opponent's own view: our head is not smaller, so it stays blocked
        let theirs = safe_moves(&board, AgentId(1));
        assert!(!theirs.contains(&Direction::Left));
    }

    #[test]
    fn test_opponent_body_segment_blocks() {
        let board = Board::new(
            7,
            7,
            vec![],
            vec![
                (vec![c(3, 3), c(2, 3), c(1, 3)], 100),
                (vec![c(5, 4), c(4, 4), c(3, 4)], 100),
            ],
        );

        assert!(!safe_moves(&board, AgentId::YOU).contains(&Direction::Up));
    }

    #[test]
    fn test_fully_boxed_in_has_no_moves() {
        let board = Board::new(
            3,
            3,
            vec![],
            vec![
                (vec![c(0, 0), c(1, 0), c(1, 1)], 100),
                (vec![c(0, 2), c(0, 1), c(1, 2), c(2, 2)], 100),
            ],
        );

        assert!(safe_moves(&board, AgentId::YOU).is_empty());
    }

    #[test]
    fn test_safe_moves_never_leave_the_board() {
        for x in 0..5 {
            for y in 0..5 {
                let board = Board::new(5, 5, vec![], vec![(vec![c(x, y)], 100)]);
                for dir in safe_moves(&board, AgentId::YOU) {
                    assert!(board.in_bounds(&dir.apply(&c(x, y))));
                }
            }
        }
    }
}

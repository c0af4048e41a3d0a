// Reachable-space analyzer
//
// Answers "would a snake of this size fit in the region it is entering" with an
// early-terminating flood fill. Every snake segment and every off-board cell is
// a wall. The query stops as soon as enough cells have been seen, so it is cheap
// on open boards and only walks the whole region when the region is too small.

use std::collections::HashSet;

use crate::board::Board;
use crate::types::{Coord, Direction};

/// True when at least `agent_size` cells are 4-connected to `start`.
///
/// `start` is the cell the head is about to occupy and counts as the first cell
/// even if a segment currently sits there (a head-to-head target). Its neighbours
/// must be free. An off-board `start` only fits a size of zero.
pub fn can_fit(board: &Board, agent_size: usize, start: Coord) -> bool {
    if agent_size == 0 {
        return true;
    }
    if !board.in_bounds(&start) {
        return false;
    }

    let blocked: HashSet<Coord> = board
        .snakes
        .iter()
        .flat_map(|s| s.body.iter().copied())
        .collect();

    let mut visited = HashSet::with_capacity(agent_size);
    let mut stack = vec![start];
    visited.insert(start);

    while let Some(cell) = stack.pop() {
        if visited.len() >= agent_size {
            return true;
        }

        for dir in Direction::all().iter() {
            let next = dir.apply(&cell);
            if board.in_bounds(&next) && !blocked.contains(&next) && visited.insert(next) {
                stack.push(next);
            }
        }
    }

    visited.len() >= agent_size
}

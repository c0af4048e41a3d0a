// Reward model
//
// Scores the cell an agent is about to move into, from that agent's point of view.
// The board passed in is the position *before* the move, so opponent heads and
// food are where the mover sees them when it commits.

use crate::board::{AgentId, Board};
use crate::config::ScoresConfig;
use crate::space::can_fit;
use crate::types::Coord;

/// Relation of a cell to the opponents' bodies and heads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proximity {
    /// Nothing nearby
    Neutral,
    /// Next to the head of an opponent at least as long as us
    AdjacentRisk,
    /// On an opponent segment
    Collision,
    /// Next to the head of a strictly shorter opponent
    KillOpportunity,
}

/// Classifies `coord` for `agent`.
/// Precedence when several opponents qualify: Collision, AdjacentRisk, KillOpportunity.
pub fn classify_proximity(board: &Board, agent: AgentId, coord: &Coord) -> Proximity {
    let own_length = board.snake(agent).length();
    let mut result = Proximity::Neutral;

    for opponent in board.opponents(agent) {
        if opponent.body.contains(coord) {
            return Proximity::Collision;
        }
        if opponent.head().manhattan(coord) == 1 {
            if opponent.length() < own_length {
                if result == Proximity::Neutral {
                    result = Proximity::KillOpportunity;
                }
            } else {
                result = Proximity::AdjacentRisk;
            }
        }
    }

    result
}

/// Weighted reward for `agent` moving its head onto `destination`
pub fn score(board: &Board, agent: AgentId, destination: &Coord, weights: &ScoresConfig) -> f32 {
    let snake = board.snake(agent);
    let own_length = snake.length();
    let longest_opponent = board.opponents(agent).map(|s| s.length()).max();
    let mut total = 0.0;

    if weights.food_enabled {
        // With nobody to out-grow, food is always worth chasing
        let wants_food = snake.health < weights.hunger_threshold
            || longest_opponent.map_or(true, |len| own_length <= len);

        if wants_food {
            total += food_attraction(board, destination, weights.food_exact_bonus);
        }
    }

    for opponent in board.opponents(agent) {
        let distance = destination.manhattan(&opponent.head());

        if weights.aggression_enabled && opponent.length() < own_length {
            let span = (board.width + board.height) as f32;
            total += weights.aggression_multiplier * (span - distance as f32);
        }

        if weights.head_avoidance_enabled && own_length <= opponent.length() && distance <= 1 {
            total += weights.head_avoidance_penalty;
        }
    }

    if weights.enclosed_space_enabled && !can_fit(board, own_length, *destination) {
        total += weights.enclosed_space_penalty;
    }

    if weights.edge_enabled && board.is_edge(destination) {
        total += weights.edge_penalty;
    }

    if weights.proximity_enabled {
        match classify_proximity(board, agent, destination) {
            Proximity::AdjacentRisk => total += weights.adjacency_risk_penalty,
            Proximity::KillOpportunity => total += weights.kill_bonus,
            Proximity::Neutral | Proximity::Collision => {}
        }
    }

    total
}

/// Sum over every food of the exact-hit bonus or the reciprocal Manhattan distance.
/// Nearby clusters add up.
fn food_attraction(board: &Board, destination: &Coord, exact_bonus: f32) -> f32 {
    board
        .food
        .iter()
        .map(|food| match destination.manhattan(food) {
            0 => exact_bonus,
            d => 1.0 / d as f32,
        })
        .sum()
}

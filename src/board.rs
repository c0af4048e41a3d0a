// Board model and move applier
//
// The engine never looks at the raw API payload. A `Board` is built once per turn
// from the validated `GameState` and every hypothetical future is a fresh `Board`
// value produced by `apply_move`, so sibling branches of a search never share state.

use serde::Serialize;

use crate::types::{self, Coord, Direction, GameState};

/// Health a snake is restored to after eating
pub const MAX_HEALTH: i32 = 100;

/// Identity of an agent on the board. Index 0 is always our own snake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AgentId(pub usize);

impl AgentId {
    pub const YOU: AgentId = AgentId(0);

    pub fn is_you(&self) -> bool {
        *self == AgentId::YOU
    }
}

/// Per-agent snake state. The body runs from head (index 0) to tail.
///
/// Length is always derived from the body so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snake {
    pub id: AgentId,
    pub body: Vec<Coord>,
    pub health: i32,
}

impl Snake {
    pub fn new(id: AgentId, body: Vec<Coord>, health: i32) -> Self {
        Snake { id, body, health }
    }

    pub fn head(&self) -> Coord {
        self.body[0]
    }

    pub fn length(&self) -> usize {
        self.body.len()
    }

    /// Segments behind the head
    pub fn trailing_body(&self) -> &[Coord] {
        &self.body[1..]
    }

    fn invariants_hold(&self) -> bool {
        !self.body.is_empty()
    }
}

/// Immutable-by-convention board snapshot used by the decision engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Board {
    pub width: i32,
    pub height: i32,
    pub food: Vec<Coord>,
    pub snakes: Vec<Snake>,
}

impl Board {
    /// Builds a board directly. `snakes[0]` must be our own snake.
    ///
    /// Preconditions (not checked here): positive dimensions, non-empty bodies,
    /// every coordinate inside the board, no duplicated food.
    pub fn new(width: i32, height: i32, food: Vec<Coord>, bodies: Vec<(Vec<Coord>, i32)>) -> Self {
        let snakes = bodies
            .into_iter()
            .enumerate()
            .map(|(i, (body, health))| Snake::new(AgentId(i), body, health))
            .collect();

        Board {
            width,
            height,
            food,
            snakes,
        }
    }

    /// Normalizes an API snapshot into a board, rejecting malformed input.
    ///
    /// Our snake is placed first; opponents keep the order the server sent them in.
    /// Snakes with no health left are dropped.
    pub fn from_game_state(state: &GameState) -> Result<Board, String> {
        Board::from_snapshot(&state.board, &state.you.id)
    }

    /// `from_game_state` for a bare wire board and the id of our snake
    pub fn from_snapshot(raw: &types::Board, you_id: &str) -> Result<Board, String> {
        if raw.width <= 0 || raw.height <= 0 {
            return Err(format!(
                "Invalid board dimensions {}x{}",
                raw.width, raw.height
            ));
        }

        let in_bounds = |c: &Coord| c.x >= 0 && c.x < raw.width && c.y >= 0 && c.y < raw.height;

        let mut food = Vec::with_capacity(raw.food.len());
        for f in &raw.food {
            if !in_bounds(f) {
                return Err(format!("Food at ({}, {}) lies outside the board", f.x, f.y));
            }
            if !food.contains(f) {
                food.push(*f);
            }
        }

        let you = raw
            .snakes
            .iter()
            .find(|s| s.id == you_id)
            .ok_or_else(|| format!("Snake '{}' is missing from board.snakes", you_id))?;

        let others = raw
            .snakes
            .iter()
            .filter(|s| s.id != you_id && s.health > 0);

        let mut snakes = Vec::with_capacity(raw.snakes.len());
        for (i, snake) in std::iter::once(you).chain(others).enumerate() {
            if snake.body.is_empty() {
                return Err(format!("Snake '{}' has an empty body", snake.id));
            }
            if snake.body[0] != snake.head {
                return Err(format!("Snake '{}' head does not match body[0]", snake.id));
            }
            if let Some(c) = snake.body.iter().find(|c| !in_bounds(c)) {
                return Err(format!(
                    "Snake '{}' has a segment at ({}, {}) outside the board",
                    snake.id, c.x, c.y
                ));
            }
            if !(0..=MAX_HEALTH).contains(&snake.health) {
                return Err(format!(
                    "Snake '{}' has health {} outside 0..={}",
                    snake.id, snake.health, MAX_HEALTH
                ));
            }
            snakes.push(Snake::new(AgentId(i), snake.body.clone(), snake.health));
        }

        Ok(Board {
            width: raw.width,
            height: raw.height,
            food,
            snakes,
        })
    }

    pub fn you(&self) -> &Snake {
        &self.snakes[0]
    }

    pub fn snake(&self, agent: AgentId) -> &Snake {
        &self.snakes[agent.0]
    }

    pub fn agent_count(&self) -> usize {
        self.snakes.len()
    }

    /// Every snake except `agent`
    pub fn opponents(&self, agent: AgentId) -> impl Iterator<Item = &Snake> {
        self.snakes.iter().filter(move |s| s.id != agent)
    }

    pub fn in_bounds(&self, coord: &Coord) -> bool {
        coord.x >= 0 && coord.x < self.width && coord.y >= 0 && coord.y < self.height
    }

    /// True for cells on the outer ring of the board
    pub fn is_edge(&self, coord: &Coord) -> bool {
        coord.x == 0 || coord.y == 0 || coord.x == self.width - 1 || coord.y == self.height - 1
    }

    /// True if any snake segment covers `coord`
    pub fn is_occupied(&self, coord: &Coord) -> bool {
        self.snakes.iter().any(|s| s.body.contains(coord))
    }

    pub fn has_food(&self, coord: &Coord) -> bool {
        self.food.contains(coord)
    }

    /// Returns the board after `agent` moves one cell in `direction`.
    ///
    /// The new head is prepended. Landing on food consumes it, restores health
    /// and keeps the tail (growth); otherwise the tail retracts and health drops
    /// by one. Safety is not checked, so callers may simulate fatal moves.
    pub fn apply_move(&self, agent: AgentId, direction: Direction) -> Board {
        let mut next = self.clone();
        let new_head = direction.apply(&next.snakes[agent.0].head());

        let ate = match next.food.iter().position(|f| *f == new_head) {
            Some(idx) => {
                next.food.swap_remove(idx);
                true
            }
            None => false,
        };

        let snake = &mut next.snakes[agent.0];
        snake.body.insert(0, new_head);
        if ate {
            snake.health = MAX_HEALTH;
        } else {
            snake.body.pop();
            snake.health -= 1;
        }

        debug_assert!(snake.invariants_hold(), "snake {:?} lost its body", agent);
        next
    }
}

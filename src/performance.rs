// Per-game performance accounting
//
// The tracker is owned by the caller (the HTTP boundary keeps one per game id).
// Nothing here is global: start a tracker on /start, feed it every /move and
// turn it into a `GamePerformance` on /end.

use serde::Serialize;

use crate::board::MAX_HEALTH;
use crate::types::Board;

const KILL_GAIN: f64 = 1.0;
const SIZE_GAIN: f64 = 10.0;
const AVG_HEALTH_GAIN: f64 = 10.0;
const WIN_TIME_GAIN: f64 = 50_000.0;
const SURVIVAL_TIME_GAIN: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Won,
    Draw,
    Lost,
}

impl Outcome {
    /// Reads the outcome off the final board sent with /end
    pub fn from_final_board(board: &Board, you_id: &str) -> Outcome {
        match board.snakes.as_slice() {
            [] => Outcome::Draw,
            [only] if only.id == you_id => Outcome::Won,
            _ => Outcome::Lost,
        }
    }

    fn credit(&self) -> f64 {
        match self {
            Outcome::Won => 1.0,
            Outcome::Draw => 0.5,
            Outcome::Lost => 0.0,
        }
    }
}

/// Running counters for one game
#[derive(Debug, Clone, Default)]
pub struct PerformanceTracker {
    turns_recorded: u32,
    health_sum: i64,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once per move request with our current health
    pub fn record_turn(&mut self, health: i32) {
        self.turns_recorded += 1;
        self.health_sum += health as i64;
    }

    pub fn turns_recorded(&self) -> u32 {
        self.turns_recorded
    }

    /// Closes the books on the game
    pub fn finish(&self, final_turn: i32, final_length: i32, outcome: Outcome) -> GamePerformance {
        let avg_health = if self.turns_recorded == 0 {
            MAX_HEALTH as f64
        } else {
            self.health_sum as f64 / self.turns_recorded as f64
        };

        GamePerformance {
            turns_alive: final_turn.max(0) as u32,
            snake_size: final_length.max(0) as u32,
            avg_health,
            outcome,
        }
    }
}

/// Summary of one finished game
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GamePerformance {
    pub turns_alive: u32,
    pub snake_size: u32,
    pub avg_health: f64,
    pub outcome: Outcome,
}

impl GamePerformance {
    /// Scalar used to compare hyperparameter sets.
    /// Wins are worth more the faster they come; other games earn a little per turn survived.
    pub fn fitness(&self) -> f64 {
        let base = KILL_GAIN * self.outcome.credit()
            + SIZE_GAIN * self.snake_size as f64
            + AVG_HEALTH_GAIN * self.avg_health;

        match self.outcome {
            Outcome::Won => base + WIN_TIME_GAIN / self.turns_alive.max(1) as f64,
            Outcome::Draw | Outcome::Lost => base + SURVIVAL_TIME_GAIN * self.turns_alive as f64,
        }
    }
}

/// Mean fitness over a batch of games, `None` for an empty batch
pub fn average_fitness(games: &[GamePerformance]) -> Option<f64> {
    if games.is_empty() {
        return None;
    }
    Some(games.iter().map(GamePerformance::fitness).sum::<f64>() / games.len() as f64)
}

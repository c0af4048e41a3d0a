// Request/response boundary around the move-decision engine
//
// The engine is synchronous and never looks at the clock. Everything that deals
// with the outside world lives here: converting the API snapshot, running the
// search on a blocking thread while an async poller enforces the response budget,
// per-game performance accounting and the optional debug log.

use log::{error, info, warn};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::board::Board;
use crate::config::Config;
use crate::debug_logger::DebugLogger;
use crate::performance::{average_fitness, GamePerformance, Outcome, PerformanceTracker};
use crate::search::{decide_move_with_progress, SearchProgress};
use crate::types::{self, Battlesnake, Direction, Game};

/// Battlesnake bot with one method per API endpoint
pub struct Bot {
    config: Config,
    /// Running performance counters, keyed by game id
    games: Mutex<HashMap<String, PerformanceTracker>>,
    /// Every game finished since the server started
    finished: Mutex<Vec<GamePerformance>>,
    debug_logger: DebugLogger,
}

impl Bot {
    /// Creates a bot with debug logging switched off
    ///
    /// # Arguments
    /// * `config` - Static configuration that does not change during the bot's lifetime
    pub fn new(config: Config) -> Self {
        Bot::with_debug_logger(config, DebugLogger::disabled())
    }

    pub fn with_debug_logger(config: Config, debug_logger: DebugLogger) -> Self {
        Bot {
            config,
            games: Mutex::new(HashMap::new()),
            finished: Mutex::new(Vec::new()),
            debug_logger,
        }
    }

    /// Returns bot metadata and appearance
    /// Corresponds to GET / endpoint
    pub fn info(&self) -> Value {
        info!("INFO");

        json!({
            "apiversion": "1",
            "author": "lookahead-snake",
            "color": "#3E7CB1",
            "head": "smart-caterpillar",
            "tail": "round-bum",
        })
    }

    /// Called when a game starts. Opens a fresh performance tracker for it.
    /// Corresponds to POST /start endpoint
    pub fn start(&self, game: &Game, _turn: &i32, _board: &types::Board, you: &Battlesnake) {
        info!("GAME START {} as {}", game.id, you.name);
        self.games
            .lock()
            .insert(game.id.clone(), PerformanceTracker::new());
    }

    /// Called when a game ends. Closes the game's tracker and reports its fitness.
    /// Corresponds to POST /end endpoint
    pub fn end(
        &self,
        game: &Game,
        turn: &i32,
        board: &types::Board,
        you: &Battlesnake,
    ) -> GamePerformance {
        let tracker = self.games.lock().remove(&game.id).unwrap_or_else(|| {
            warn!("Game {} ended without a tracker", game.id);
            PerformanceTracker::new()
        });

        let outcome = Outcome::from_final_board(board, &you.id);
        let performance = tracker.finish(*turn, you.length, outcome);

        info!(
            "GAME OVER {}: {:?} after {} turns (size: {}, avg health: {:.1}, fitness: {:.2})",
            game.id,
            performance.outcome,
            performance.turns_alive,
            performance.snake_size,
            performance.avg_health,
            performance.fitness()
        );

        let mut finished = self.finished.lock();
        finished.push(performance.clone());
        if let Some(average) = average_fitness(&finished) {
            info!("Average fitness over {} games: {:.2}", finished.len(), average);
        }

        performance
    }

    /// Mean fitness of every game finished so far, `None` before the first one
    pub fn session_fitness(&self) -> Option<f64> {
        average_fitness(&self.finished.lock())
    }

    /// Number of games currently being tracked
    pub fn active_games(&self) -> usize {
        self.games.lock().len()
    }

    /// Computes and returns the next move
    /// Corresponds to POST /move endpoint
    ///
    /// The search runs on tokio's blocking pool and publishes its best answer as it
    /// goes. This future polls that answer until the search finishes or the
    /// effective budget is spent, then responds with whatever is published.
    ///
    /// # Returns
    /// * `Value` - JSON response containing the chosen move direction
    pub async fn get_move(
        &self,
        game: &Game,
        turn: &i32,
        board: &types::Board,
        you: &Battlesnake,
    ) -> Value {
        let start_time = Instant::now();
        let fallback = self.config.search.fallback_direction;

        self.games
            .lock()
            .entry(game.id.clone())
            .or_default()
            .record_turn(you.health);

        let snapshot = match Board::from_snapshot(board, &you.id) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Turn {}: rejected board ({}), answering {}", turn, e, fallback.as_str());
                return json!({ "move": fallback.as_str() });
            }
        };

        let progress = Arc::new(SearchProgress::for_board(&snapshot, fallback));
        let progress_clone = progress.clone();
        let config = self.config.clone();
        let mut rng = match config.search.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(*turn as u64)),
            None => StdRng::seed_from_u64(rand::random()),
        };

        tokio::task::spawn_blocking(move || {
            decide_move_with_progress(&snapshot, &config, &progress_clone, &mut rng)
        });

        let effective_budget = self.config.timing.effective_budget_ms();
        let polling_interval = Duration::from_millis(self.config.timing.polling_interval_ms);

        loop {
            tokio::time::sleep(polling_interval).await;

            let elapsed = start_time.elapsed().as_millis() as u64;
            if elapsed >= effective_budget || progress.is_complete() {
                break;
            }
        }

        let decision = progress.snapshot();
        if !progress.is_complete() {
            warn!("Turn {}: budget spent before the search finished", turn);
        }
        if decision.no_safe_move {
            warn!("Turn {}: no safe move, answering {}", turn, decision.direction.as_str());
        }

        info!(
            "Turn {}: Chose {} (score: {:.4}, iterations: {}, time: {}ms)",
            turn,
            decision.direction.as_str(),
            decision.score,
            decision.iterations,
            start_time.elapsed().as_millis()
        );

        self.debug_logger
            .log_move(*turn, you.id.clone(), board.clone(), decision.direction);

        json!({ "move": decision.direction.as_str() })
    }

    /// Direction carried by a `/move` response
    pub fn response_direction(response: &Value) -> Result<Direction, String> {
        response["move"]
            .as_str()
            .ok_or_else(|| format!("Response has no move: {}", response))
            .and_then(Direction::parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coord;

    fn game() -> Game {
        Game {
            id: "game-1".to_string(),
            ruleset: json!({}),
            timeout: 500,
            source: String::new(),
        }
    }

    fn snake(id: &str, body: Vec<Coord>, health: i32) -> Battlesnake {
        Battlesnake {
            id: id.to_string(),
            name: id.to_string(),
            health,
            head: body[0],
            length: body.len() as i32,
            body,
            latency: "0".to_string(),
            shout: String::new(),
        }
    }

    #[test]
    fn test_info_has_appearance_fields() {
        let bot = Bot::new(Config::default_hardcoded());
        let info = bot.info();

        assert_eq!(info["apiversion"], "1");
        for key in ["author", "color", "head", "tail"] {
            assert!(info[key].is_string(), "missing {}", key);
        }
    }

    #[test]
    fn test_lifecycle_tracks_and_releases_game() {
        let bot = Bot::new(Config::default_hardcoded());
        assert_eq!(bot.session_fitness(), None);
        let you = snake("me", vec![Coord::new(1, 1), Coord::new(1, 0)], 90);
        let board = types::Board {
            height: 11,
            width: 11,
            food: vec![],
            snakes: vec![you.clone()],
            hazards: vec![],
        };

        bot.start(&game(), &0, &board, &you);
        assert_eq!(bot.active_games(), 1);

        let performance = bot.end(&game(), &12, &board, &you);

        assert_eq!(bot.active_games(), 0);
        assert_eq!(bot.session_fitness(), Some(performance.fitness()));
        assert_eq!(performance.outcome, Outcome::Won);
        assert_eq!(performance.turns_alive, 12);
        assert_eq!(performance.snake_size, 2);
    }

    #[test]
    fn test_response_direction() {
        assert_eq!(
            Bot::response_direction(&json!({ "move": "left" })),
            Ok(Direction::Left)
        );
        assert!(Bot::response_direction(&json!({})).is_err());
    }

    #[tokio::test]
    async fn test_move_on_malformed_board_answers_fallback() {
        let bot = Bot::new(Config::default_hardcoded());
        let you = snake("me", vec![Coord::new(1, 1)], 90);
        let board = types::Board {
            height: 11,
            width: 11,
            food: vec![],
            snakes: vec![],
            hazards: vec![],
        };

        let response = bot.get_move(&game(), &3, &board, &you).await;

        assert_eq!(response["move"], "down");
    }

    #[tokio::test]
    async fn test_expired_budget_still_answers_a_legal_move() {
        let mut config = Config::default_hardcoded();
        config.timing.response_time_budget_ms = 0;
        config.timing.network_overhead_ms = 0;
        config.search.fallback_direction = Direction::Up;
        let bot = Bot::new(config);

        // Up leaves the board and Down is our neck
        let you = snake("me", vec![Coord::new(5, 10), Coord::new(5, 9), Coord::new(5, 8)], 90);
        let board = types::Board {
            height: 11,
            width: 11,
            food: vec![],
            snakes: vec![you.clone()],
            hazards: vec![],
        };

        let response = bot.get_move(&game(), &0, &board, &you).await;
        let direction = Bot::response_direction(&response).unwrap();

        assert!(matches!(direction, Direction::Left | Direction::Right));
    }
}

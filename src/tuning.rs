// Hyperparameter local search for the rollout strategy
//
// `LocalSearch` holds the hill-climbing state. `tune` drives it offline: every
// candidate plays a batch of solo training games and its average fitness is fed
// back through `LocalSearch::accept`.

use log::info;
use rand::seq::IndexedRandom;
use rand::{Rng, RngCore};
use serde::Serialize;
use std::f64::consts::PI;

use crate::board::{AgentId, Board};
use crate::config::{Config, ParamRange, RolloutConfig, StrategyKind, TuningConfig};
use crate::performance::{average_fitness, GamePerformance, Outcome, PerformanceTracker};
use crate::search::decide_move;
use crate::types::Coord;

/// The tunable subset of `RolloutConfig`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HyperParameters {
    pub iterations: i32,
    pub mutation_rate: f64,
    pub food_benefit: i32,
    pub adjacency_risk: i32,
    pub kill_reward: i32,
}

impl HyperParameters {
    pub fn from_rollout(rollout: &RolloutConfig) -> Self {
        HyperParameters {
            iterations: rollout.iterations as i32,
            mutation_rate: rollout.mutation_rate,
            food_benefit: rollout.food_benefit,
            adjacency_risk: rollout.adjacency_risk,
            kill_reward: rollout.kill_reward,
        }
    }

    /// Uniform sample from the search space
    pub fn randomize(ranges: &TuningConfig, rng: &mut dyn RngCore) -> Self {
        HyperParameters {
            iterations: sample(ranges.iterations, rng),
            mutation_rate: rng.random_range(ranges.mutation_rate.min..=ranges.mutation_rate.max),
            food_benefit: sample(ranges.food_benefit, rng),
            adjacency_risk: sample(ranges.adjacency_risk, rng),
            kill_reward: sample(ranges.kill_reward, rng),
        }
    }

    /// Nearby point: integers move by up to `integer_step`, the mutation rate by a
    /// Gaussian of width `gaussian_sigma`. Everything is clamped back into range.
    pub fn neighbour(&self, ranges: &TuningConfig, rng: &mut dyn RngCore) -> Self {
        let step = ranges.integer_step;

        HyperParameters {
            iterations: nudge(self.iterations, ranges.iterations, step, rng),
            mutation_rate: ranges
                .mutation_rate
                .clamp(gaussian(rng, self.mutation_rate, ranges.gaussian_sigma)),
            food_benefit: nudge(self.food_benefit, ranges.food_benefit, step, rng),
            adjacency_risk: nudge(self.adjacency_risk, ranges.adjacency_risk, step, rng),
            kill_reward: nudge(self.kill_reward, ranges.kill_reward, step, rng),
        }
    }

    /// Writes these values into a rollout configuration
    pub fn apply_to(&self, rollout: &mut RolloutConfig) {
        rollout.iterations = self.iterations.max(1) as u32;
        rollout.mutation_rate = self.mutation_rate;
        rollout.food_benefit = self.food_benefit;
        rollout.adjacency_risk = self.adjacency_risk;
        rollout.kill_reward = self.kill_reward;
    }
}

fn sample(range: ParamRange<i32>, rng: &mut dyn RngCore) -> i32 {
    rng.random_range(range.min..=range.max)
}

fn nudge(value: i32, range: ParamRange<i32>, step: i32, rng: &mut dyn RngCore) -> i32 {
    range.clamp(value + rng.random_range(-step..=step))
}

/// Box-Muller sample from N(mean, sigma)
fn gaussian(rng: &mut dyn RngCore, mean: f64, sigma: f64) -> f64 {
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random();
    mean + sigma * (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Hill-climbing state: the incumbent parameters and their best average fitness
#[derive(Debug, Clone)]
pub struct LocalSearch {
    incumbent: HyperParameters,
    best_fitness: f64,
    evaluations: u32,
}

impl LocalSearch {
    pub fn new(start: HyperParameters) -> Self {
        LocalSearch {
            incumbent: start,
            best_fitness: f64::NEG_INFINITY,
            evaluations: 0,
        }
    }

    /// Next candidate to evaluate
    pub fn propose(&self, ranges: &TuningConfig, rng: &mut dyn RngCore) -> HyperParameters {
        self.incumbent.neighbour(ranges, rng)
    }

    /// Records the average fitness of `candidate`; it becomes the incumbent only on
    /// a strict improvement. Returns whether it was accepted.
    pub fn accept(&mut self, candidate: HyperParameters, avg_fitness: f64) -> bool {
        self.evaluations += 1;
        if avg_fitness > self.best_fitness {
            self.incumbent = candidate;
            self.best_fitness = avg_fitness;
            true
        } else {
            false
        }
    }

    pub fn incumbent(&self) -> &HyperParameters {
        &self.incumbent
    }

    pub fn best_fitness(&self) -> f64 {
        self.best_fitness
    }

    pub fn evaluations(&self) -> u32 {
        self.evaluations
    }
}

/// Rules of an offline training game: one snake, food topped up every turn
#[derive(Debug, Clone)]
pub struct TrainingGame {
    pub width: i32,
    pub height: i32,
    pub food_count: usize,
    /// Games still running after this many turns end in a draw
    pub max_turns: i32,
}

impl Default for TrainingGame {
    fn default() -> Self {
        TrainingGame {
            width: 11,
            height: 11,
            food_count: 3,
            max_turns: 200,
        }
    }
}

/// Tops the board up to `count` food on random free cells
fn spawn_food(board: &mut Board, count: usize, rng: &mut dyn RngCore) {
    while board.food.len() < count {
        let free: Vec<Coord> = (0..board.width)
            .flat_map(|x| (0..board.height).map(move |y| Coord::new(x, y)))
            .filter(|c| !board.is_occupied(c) && !board.has_food(c))
            .collect();

        match free.choose(rng) {
            Some(cell) => board.food.push(*cell),
            None => return,
        }
    }
}

/// Our snake is still alive after its last move
fn survived(board: &Board) -> bool {
    let snake = board.you();
    let head = snake.head();
    board.in_bounds(&head) && !snake.trailing_body().contains(&head) && snake.health > 0
}

/// Plays one training game with `config` and reports how it went
pub fn play_solo_game(config: &Config, game: &TrainingGame, rng: &mut dyn RngCore) -> GamePerformance {
    let (cx, cy) = (game.width / 2, game.height / 2);
    let start = vec![Coord::new(cx, cy), Coord::new(cx, cy - 1), Coord::new(cx, cy - 2)];
    let mut board = Board::new(game.width, game.height, vec![], vec![(start, 100)]);
    let mut tracker = PerformanceTracker::new();
    let mut turn = 0;

    let outcome = loop {
        if turn >= game.max_turns {
            break Outcome::Draw;
        }
        spawn_food(&mut board, game.food_count, rng);
        tracker.record_turn(board.you().health);

        let decision = decide_move(&board, config, rng);
        board = board.apply_move(AgentId::YOU, decision.direction);
        turn += 1;

        if !survived(&board) {
            break Outcome::Lost;
        }
    };

    tracker.finish(turn, board.you().length() as i32, outcome)
}

/// Average fitness of `params` over `games` training games with the rollout strategy
pub fn evaluate_parameters(
    config: &Config,
    params: &HyperParameters,
    game: &TrainingGame,
    games: usize,
    rng: &mut dyn RngCore,
) -> f64 {
    let mut candidate = config.clone();
    candidate.search.strategy = StrategyKind::Rollout;
    params.apply_to(&mut candidate.rollout);

    let results: Vec<GamePerformance> = (0..games)
        .map(|_| play_solo_game(&candidate, game, rng))
        .collect();

    average_fitness(&results).unwrap_or(f64::NEG_INFINITY)
}

/// Hill-climbs from the configured rollout parameters for `rounds` proposals
pub fn tune(
    config: &Config,
    game: &TrainingGame,
    rounds: u32,
    games_per_candidate: usize,
    rng: &mut dyn RngCore,
) -> LocalSearch {
    let start = HyperParameters::from_rollout(&config.rollout);
    let mut search = LocalSearch::new(start);

    let baseline = evaluate_parameters(config, &start, game, games_per_candidate, rng);
    search.accept(start, baseline);
    info!("Baseline fitness: {:.2}", baseline);

    for round in 1..=rounds {
        let candidate = search.propose(&config.tuning, rng);
        let fitness = evaluate_parameters(config, &candidate, game, games_per_candidate, rng);
        let accepted = search.accept(candidate, fitness);

        info!(
            "Round {}: fitness {:.2} ({}), best {:.2}",
            round,
            fitness,
            if accepted { "accepted" } else { "rejected" },
            search.best_fitness()
        );
    }

    search
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn in_ranges(params: &HyperParameters, ranges: &TuningConfig) -> bool {
        ranges.iterations.contains(params.iterations)
            && ranges.mutation_rate.contains(params.mutation_rate)
            && ranges.food_benefit.contains(params.food_benefit)
            && ranges.adjacency_risk.contains(params.adjacency_risk)
            && ranges.kill_reward.contains(params.kill_reward)
    }

    #[test]
    fn test_random_and_neighbour_points_stay_in_range() {
        let ranges = Config::default_hardcoded().tuning;
        let mut rng = StdRng::seed_from_u64(42);

        let mut params = HyperParameters::randomize(&ranges, &mut rng);
        for _ in 0..500 {
            assert!(in_ranges(&params, &ranges), "{:?}", params);
            params = params.neighbour(&ranges, &mut rng);
        }
    }

    #[test]
    fn test_defaults_lie_inside_search_space() {
        let config = Config::default_hardcoded();
        let params = HyperParameters::from_rollout(&config.rollout);

        assert!(in_ranges(&params, &config.tuning));
    }

    #[test]
    fn test_apply_round_trips() {
        let mut rollout = Config::default_hardcoded().rollout;
        let params = HyperParameters {
            iterations: 2,
            mutation_rate: 0.3,
            food_benefit: 6,
            adjacency_risk: 9,
            kill_reward: 19,
        };

        params.apply_to(&mut rollout);

        assert_eq!(HyperParameters::from_rollout(&rollout), params);
    }

    #[test]
    fn test_accept_only_on_strict_improvement() {
        let config = Config::default_hardcoded();
        let start = HyperParameters::from_rollout(&config.rollout);
        let mut search = LocalSearch::new(start);
        let mut rng = StdRng::seed_from_u64(1);

        let first = search.propose(&config.tuning, &mut rng);
        assert!(search.accept(first, 100.0));
        assert_eq!(search.incumbent(), &first);

        let worse = search.propose(&config.tuning, &mut rng);
        assert!(!search.accept(worse, 100.0));
        assert_eq!(search.incumbent(), &first);

        let better = search.propose(&config.tuning, &mut rng);
        assert!(search.accept(better, 120.5));
        assert_eq!(search.best_fitness(), 120.5);
        assert_eq!(search.evaluations(), 3);
    }

    fn short_game() -> TrainingGame {
        TrainingGame {
            width: 7,
            height: 7,
            food_count: 2,
            max_turns: 6,
        }
    }

    #[test]
    fn test_solo_game_respects_turn_cap() {
        let config = Config::default_hardcoded();
        let mut rng = StdRng::seed_from_u64(9);

        let game = play_solo_game(&config, &short_game(), &mut rng);

        assert!(game.turns_alive <= 6);
        assert!(game.snake_size >= 3);
        if game.turns_alive < 6 {
            assert_eq!(game.outcome, Outcome::Lost);
        } else {
            assert_eq!(game.outcome, Outcome::Draw);
        }
        assert!(game.fitness().is_finite());
    }

    #[test]
    fn test_food_is_topped_up_on_free_cells() {
        let mut board = Board::new(3, 1, vec![], vec![(vec![Coord::new(0, 0), Coord::new(1, 0)], 100)]);
        let mut rng = StdRng::seed_from_u64(2);

        spawn_food(&mut board, 3, &mut rng);

        // Only one cell is free
        assert_eq!(board.food, vec![Coord::new(2, 0)]);
    }

    #[test]
    fn test_tune_evaluates_baseline_and_every_round() {
        let config = Config::default_hardcoded();
        let mut rng = StdRng::seed_from_u64(4);

        let search = tune(&config, &short_game(), 2, 1, &mut rng);

        assert_eq!(search.evaluations(), 3);
        assert!(search.best_fitness().is_finite());
        assert!(in_ranges(search.incumbent(), &config.tuning));
    }
}

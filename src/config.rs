// Configuration module for reading Snake.toml
// This module provides OOP-style configuration management for the decision engine

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::types::Direction;

/// Main configuration structure containing all tunable parameters
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    pub timing: TimingConfig,
    pub search: SearchConfig,
    pub scores: ScoresConfig,
    pub rollout: RolloutConfig,
    pub tuning: TuningConfig,
    pub debug: DebugConfig,
}

/// Timing constants used by the HTTP boundary's anytime poller
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TimingConfig {
    pub response_time_budget_ms: u64,
    pub network_overhead_ms: u64,
    pub polling_interval_ms: u64,
}

impl TimingConfig {
    /// Computes the effective computation budget
    pub fn effective_budget_ms(&self) -> u64 {
        self.response_time_budget_ms.saturating_sub(self.network_overhead_ms)
    }
}

/// Which search policy answers `/move`
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Bounded-depth lookahead tree with decayed rewards
    Tree,
    /// Random move sequences improved by local mutation
    Rollout,
}

/// Search strategy selection and tree search limits
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SearchConfig {
    pub strategy: StrategyKind,
    /// Ply limit of the tree search (1..=8)
    pub max_depth: u8,
    /// Weight of a child's value relative to its parent's reward (0.0..=1.0)
    pub reward_decay: f32,
    /// Expand the root's children on the rayon pool
    pub parallel_root: bool,
    /// Answered when no direction is safe
    pub fallback_direction: Direction,
    /// Fixed RNG seed for reproducible rollouts; fresh entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Reward model weights. Each term has its own toggle.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ScoresConfig {
    // Food attraction
    pub food_enabled: bool,
    pub food_exact_bonus: f32,
    pub hunger_threshold: i32,

    // Closing in on a strictly smaller opponent
    pub aggression_enabled: bool,
    pub aggression_multiplier: f32,

    // Contesting a head we cannot win
    pub head_avoidance_enabled: bool,
    pub head_avoidance_penalty: f32,

    // Region too small for our body
    pub enclosed_space_enabled: bool,
    pub enclosed_space_penalty: f32,

    // Outer ring of the board
    pub edge_enabled: bool,
    pub edge_penalty: f32,

    // Adjacency to opponent heads
    pub proximity_enabled: bool,
    pub adjacency_risk_penalty: f32,
    pub kill_bonus: f32,
}

/// Stochastic rollout search parameters
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RolloutConfig {
    /// Candidate pools evaluated per round (1..=5)
    pub iterations: u32,
    /// Rounds allowed before giving up on finding any valid sequence
    pub max_rounds: u32,
    /// Fresh sequences in the pool while no incumbent exists
    pub initial_candidates: usize,
    /// Fresh sequences added next to the incumbent
    pub fresh_candidates: usize,
    /// Mutated copies of the incumbent per pool
    pub mutated_candidates: usize,
    /// Probability that a mutation is applied (0.0..=1.0)
    pub mutation_rate: f64,
    /// Sequence length never shrinks below this
    pub min_sequence_length: usize,
    pub step_reward: i32,
    pub food_benefit: i32,
    pub adjacency_risk: i32,
    pub kill_reward: i32,
}

/// Closed interval for a tunable parameter
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ParamRange<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy> ParamRange<T> {
    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: T) -> T {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }
}

/// Hyperparameter search space for the rollout strategy
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TuningConfig {
    pub iterations: ParamRange<i32>,
    pub mutation_rate: ParamRange<f64>,
    pub food_benefit: ParamRange<i32>,
    pub adjacency_risk: ParamRange<i32>,
    pub kill_reward: ParamRange<i32>,
    pub gaussian_sigma: f64,
    pub integer_step: i32,
}

/// Debug configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DebugConfig {
    pub enabled: bool,
    pub log_file_path: String,
}

impl Config {
    /// Loads configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the Snake.toml configuration file
    ///
    /// # Returns
    /// * `Result<Config, String>` - Parsed and validated configuration or error message
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, String> {
        let config: Config =
            toml::from_str(contents).map_err(|e| format!("Failed to parse config file: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Loads default configuration from Snake.toml in the project root
    pub fn load_default() -> Result<Self, String> {
        Self::from_file("Snake.toml")
    }

    /// Checks every documented range
    pub fn validate(&self) -> Result<(), String> {
        let search = &self.search;
        if !(1..=8).contains(&search.max_depth) {
            return Err(format!("search.max_depth {} outside 1..=8", search.max_depth));
        }
        if !(0.0..=1.0).contains(&search.reward_decay) {
            return Err(format!(
                "search.reward_decay {} outside 0.0..=1.0",
                search.reward_decay
            ));
        }

        let scores = &self.scores;
        if !(0..=100).contains(&scores.hunger_threshold) {
            return Err(format!(
                "scores.hunger_threshold {} outside 0..=100",
                scores.hunger_threshold
            ));
        }
        for (name, penalty) in [
            ("head_avoidance_penalty", scores.head_avoidance_penalty),
            ("enclosed_space_penalty", scores.enclosed_space_penalty),
            ("edge_penalty", scores.edge_penalty),
            ("adjacency_risk_penalty", scores.adjacency_risk_penalty),
        ] {
            if penalty > 0.0 {
                return Err(format!("scores.{} must not be positive ({})", name, penalty));
            }
        }

        let rollout = &self.rollout;
        if rollout.iterations == 0 || rollout.max_rounds == 0 {
            return Err("rollout.iterations and rollout.max_rounds must be positive".to_string());
        }
        if rollout.initial_candidates == 0 {
            return Err("rollout.initial_candidates must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&rollout.mutation_rate) {
            return Err(format!(
                "rollout.mutation_rate {} outside 0.0..=1.0",
                rollout.mutation_rate
            ));
        }
        if rollout.min_sequence_length == 0 {
            return Err("rollout.min_sequence_length must be positive".to_string());
        }

        let tuning = &self.tuning;
        if tuning.iterations.min < 1 || tuning.iterations.min > tuning.iterations.max {
            return Err("tuning.iterations must be a non-empty range of positive values".to_string());
        }
        if tuning.mutation_rate.min < 0.0
            || tuning.mutation_rate.max > 1.0
            || tuning.mutation_rate.min > tuning.mutation_rate.max
        {
            return Err("tuning.mutation_rate must lie within 0.0..=1.0".to_string());
        }
        for (name, range) in [
            ("food_benefit", tuning.food_benefit),
            ("adjacency_risk", tuning.adjacency_risk),
            ("kill_reward", tuning.kill_reward),
        ] {
            if range.min > range.max {
                return Err(format!("tuning.{} range is empty", name));
            }
        }
        if tuning.gaussian_sigma < 0.0 || tuning.integer_step < 0 {
            return Err("tuning step sizes must not be negative".to_string());
        }

        Ok(())
    }

    /// Creates a configuration with hardcoded default values as fallback
    /// This should match the constants defined in Snake.toml
    pub fn default_hardcoded() -> Self {
        Config {
            timing: TimingConfig {
                response_time_budget_ms: 400,
                network_overhead_ms: 50,
                polling_interval_ms: 10,
            },
            search: SearchConfig {
                strategy: StrategyKind::Tree,
                max_depth: 2,
                reward_decay: 0.5,
                parallel_root: true,
                fallback_direction: Direction::Down,
                seed: None,
            },
            scores: ScoresConfig {
                food_enabled: true,
                food_exact_bonus: 2.0,
                hunger_threshold: 50,
                aggression_enabled: true,
                aggression_multiplier: 0.05,
                head_avoidance_enabled: true,
                head_avoidance_penalty: -100.0,
                enclosed_space_enabled: true,
                enclosed_space_penalty: -1000.0,
                edge_enabled: true,
                edge_penalty: -0.25,
                proximity_enabled: false,
                adjacency_risk_penalty: -1.5,
                kill_bonus: 1.7,
            },
            rollout: RolloutConfig {
                iterations: 5,
                max_rounds: 25,
                initial_candidates: 6,
                fresh_candidates: 3,
                mutated_candidates: 3,
                mutation_rate: 1.0,
                min_sequence_length: 2,
                step_reward: 1,
                food_benefit: 5,
                adjacency_risk: 15,
                kill_reward: 17,
            },
            tuning: TuningConfig {
                iterations: ParamRange { min: 1, max: 5 },
                mutation_rate: ParamRange { min: 0.0, max: 1.0 },
                food_benefit: ParamRange { min: 2, max: 7 },
                adjacency_risk: ParamRange { min: 8, max: 15 },
                kill_reward: ParamRange { min: 15, max: 20 },
                gaussian_sigma: 0.1,
                integer_step: 2,
            },
            debug: DebugConfig {
                enabled: false,
                log_file_path: "battlesnake_debug.jsonl".to_string(),
            },
        }
    }

    /// Attempts to load from file, falls back to hardcoded defaults on error
    pub fn load_or_default() -> Self {
        Self::load_default().unwrap_or_else(|e| {
            eprintln!(
                "Warning: Could not load Snake.toml ({}), using hardcoded defaults",
                e
            );
            Self::default_hardcoded()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_budget_calculation() {
        let config = Config::default_hardcoded();
        assert_eq!(config.timing.effective_budget_ms(), 350);
    }

    #[test]
    fn test_hardcoded_defaults_are_valid() {
        let config = Config::default_hardcoded();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.strategy, StrategyKind::Tree);
        assert_eq!(config.search.fallback_direction, Direction::Down);
    }

    #[test]
    fn test_snake_toml_can_be_parsed() {
        // This test ensures Snake.toml is valid and can be parsed
        let result = Config::from_file("Snake.toml");
        assert!(
            result.is_ok(),
            "Failed to parse Snake.toml: {:?}",
            result.err()
        );
    }

    #[test]
    fn test_out_of_range_decay_is_rejected() {
        let mut config = Config::default_hardcoded();
        config.search.reward_decay = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_positive_penalty_is_rejected() {
        let mut config = Config::default_hardcoded();
        config.scores.edge_penalty = 3.0;
        let err = config.validate().unwrap_err();
        assert!(err.contains("edge_penalty"));
    }

    #[test]
    fn test_unknown_strategy_fails_to_parse() {
        let text = fs::read_to_string("Snake.toml")
            .unwrap()
            .replace("strategy = \"tree\"", "strategy = \"oracle\"");
        assert!(Config::from_toml_str(&text).is_err());
    }

    #[test]
    fn test_param_range_clamps() {
        let range = ParamRange { min: 2, max: 7 };
        assert_eq!(range.clamp(0), 2);
        assert_eq!(range.clamp(9), 7);
        assert_eq!(range.clamp(4), 4);
        assert!(range.contains(7));
        assert!(!range.contains(8));
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        // Test with a non-existent file
        let result = Config::from_file("nonexistent.toml");
        assert!(result.is_err());
    }
}

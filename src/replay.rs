// Replay of recorded decisions
//
// Loads the JSONL debug log, re-runs the configured strategy on every (or a
// chosen subset of) recorded board and compares the answer with what was played.
// Replay is synchronous and unbounded by the response budget; with a fixed seed
// the rollout strategy replays deterministically too.

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use crate::board::Board;
use crate::config::Config;
use crate::debug_logger::DebugLogEntry;
use crate::search::decide_move;
use crate::types::Direction;

pub type LogEntry = DebugLogEntry;

/// Result of replaying a single turn
#[derive(Debug, Clone)]
pub struct ReplayResult {
    pub turn: i32,
    pub original_move: Direction,
    pub replayed_move: Direction,
    pub matches: bool,
    pub replayed_score: f32,
    pub no_safe_move: bool,
    pub iterations: u32,
    pub computation_time_ms: u128,
}

/// Statistics for a complete replay session
#[derive(Debug, Default, PartialEq)]
pub struct ReplayStats {
    pub total_turns: usize,
    pub matches: usize,
    pub mismatches: usize,
    pub match_rate: f64,
}

/// Replay engine for analyzing debug logs
pub struct ReplayEngine {
    config: Config,
    verbose: bool,
}

impl ReplayEngine {
    pub fn new(config: Config, verbose: bool) -> Self {
        ReplayEngine { config, verbose }
    }

    /// Loads all log entries from a JSONL file. Blank lines are skipped.
    pub fn load_log_file<P: AsRef<Path>>(&self, log_path: P) -> Result<Vec<LogEntry>, String> {
        let file =
            File::open(log_path.as_ref()).map_err(|e| format!("Failed to open log file: {}", e))?;

        let mut entries = Vec::new();
        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| format!("Failed to read line {}: {}", line_num + 1, e))?;
            if line.trim().is_empty() {
                continue;
            }

            let entry: LogEntry = serde_json::from_str(&line)
                .map_err(|e| format!("Failed to parse JSON on line {}: {}", line_num + 1, e))?;
            entries.push(entry);
        }

        info!("Loaded {} log entries", entries.len());
        Ok(entries)
    }

    /// Re-decides a single log entry and compares the result
    pub fn replay_entry(&self, entry: &LogEntry) -> Result<ReplayResult, String> {
        let original_move = Direction::parse(&entry.chosen_move)?;
        let board = Board::from_snapshot(&entry.board, &entry.you_id)?;

        let seed = self.config.search.seed.unwrap_or(0);
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(entry.turn as u64));

        let start_time = Instant::now();
        let decision = decide_move(&board, &self.config, &mut rng);
        let computation_time_ms = start_time.elapsed().as_millis();

        let result = ReplayResult {
            turn: entry.turn,
            original_move,
            replayed_move: decision.direction,
            matches: original_move == decision.direction,
            replayed_score: decision.score,
            no_safe_move: decision.no_safe_move,
            iterations: decision.iterations,
            computation_time_ms,
        };

        if self.verbose {
            if result.matches {
                info!(
                    "Turn {}: MATCH {} (score: {:.4}, time: {}ms)",
                    result.turn,
                    result.replayed_move.as_str(),
                    result.replayed_score,
                    result.computation_time_ms
                );
            } else {
                warn!(
                    "Turn {}: MISMATCH played {}, replayed {} (score: {:.4}, time: {}ms)",
                    result.turn,
                    result.original_move.as_str(),
                    result.replayed_move.as_str(),
                    result.replayed_score,
                    result.computation_time_ms
                );
            }
        }

        Ok(result)
    }

    /// Replays every entry; entries that cannot be replayed are logged and skipped
    pub fn replay_all(&self, entries: &[LogEntry]) -> Vec<ReplayResult> {
        entries
            .iter()
            .filter_map(|entry| match self.replay_entry(entry) {
                Ok(result) => Some(result),
                Err(e) => {
                    warn!("Failed to replay turn {}: {}", entry.turn, e);
                    None
                }
            })
            .collect()
    }

    /// Replays the listed turns. A turn missing from the log is an error.
    pub fn replay_turns(
        &self,
        entries: &[LogEntry],
        turn_numbers: &[i32],
    ) -> Result<Vec<ReplayResult>, String> {
        turn_numbers
            .iter()
            .map(|turn| {
                let entry = entries
                    .iter()
                    .find(|e| e.turn == *turn)
                    .ok_or_else(|| format!("Turn {} not found in log file", turn))?;
                self.replay_entry(entry)
            })
            .collect()
    }

    pub fn generate_stats(&self, results: &[ReplayResult]) -> ReplayStats {
        let total_turns = results.len();
        let matches = results.iter().filter(|r| r.matches).count();
        let match_rate = if total_turns > 0 {
            (matches as f64 / total_turns as f64) * 100.0
        } else {
            0.0
        };

        ReplayStats {
            total_turns,
            matches,
            mismatches: total_turns - matches,
            match_rate,
        }
    }

    /// Prints a summary followed by every mismatch
    pub fn print_report(&self, results: &[ReplayResult]) {
        let stats = self.generate_stats(results);

        println!("\n=== REPLAY REPORT ({}) ===", strategy_label(&self.config));
        println!("Total Turns:    {}", stats.total_turns);
        println!("Matches:        {} ({:.1}%)", stats.matches, stats.match_rate);
        println!("Mismatches:     {}", stats.mismatches);

        if !results.is_empty() {
            let avg_time = results
                .iter()
                .map(|r| r.computation_time_ms as f64)
                .sum::<f64>()
                / results.len() as f64;
            println!("Average Computation Time: {:.1}ms", avg_time);
        }

        for result in results.iter().filter(|r| !r.matches) {
            println!(
                "Turn {}: {} -> {} (score: {:.4}{})",
                result.turn,
                result.original_move.as_str(),
                result.replayed_move.as_str(),
                result.replayed_score,
                if result.no_safe_move { ", no safe move" } else { "" }
            );
        }
        println!();
    }

    /// Checks that each listed turn was played with one of the acceptable moves
    pub fn validate_expected_moves(
        &self,
        entries: &[LogEntry],
        expected_moves: &[(i32, Vec<Direction>)],
    ) -> Result<(), String> {
        for (turn, acceptable) in expected_moves {
            let entry = entries
                .iter()
                .find(|e| e.turn == *turn)
                .ok_or_else(|| format!("Turn {} not found in log", turn))?;

            let actual_move = Direction::parse(&entry.chosen_move)?;
            if !acceptable.contains(&actual_move) {
                return Err(format!(
                    "Turn {}: Expected one of {:?}, but got {}",
                    turn,
                    acceptable.iter().map(|d| d.as_str()).collect::<Vec<_>>(),
                    actual_move.as_str()
                ));
            }
        }

        Ok(())
    }
}

fn strategy_label(config: &Config) -> String {
    format!("{:?}", config.search.strategy).to_lowercase()
}

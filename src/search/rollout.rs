// Stochastic rollout search with local mutation
//
// Random move sequences for our snake are scored against a frozen board (the
// opponents do not move during a rollout). The best sequence survives into the
// next candidate pool together with fresh sequences and mutated copies of it,
// which makes the search an anytime hill-climb over sequences. If no valid
// sequence turns up, later rounds try shorter ones.

use log::{debug, info, warn};
use rand::seq::IndexedRandom;
use rand::{Rng, RngCore};
use std::time::Instant;

use super::{Decision, MoveStrategy, SearchProgress};
use crate::board::{AgentId, Board};
use crate::config::{Config, RolloutConfig};
use crate::movegen::safe_moves;
use crate::scoring::{classify_proximity, Proximity};
use crate::types::{Coord, Direction};

pub type MoveSequence = Vec<Direction>;

#[derive(Debug, Clone)]
pub struct RolloutSearch {
    pub params: RolloutConfig,
    pub fallback: Direction,
}

/// Body cells a head may not enter: everything but the tail, which retracts
fn blocks_self(board: &Board, coord: &Coord) -> bool {
    let body = &board.you().body;
    body[..body.len() - 1].contains(coord)
}

impl RolloutSearch {
    pub fn from_config(config: &Config) -> Self {
        RolloutSearch {
            params: config.rollout.clone(),
            fallback: config.search.fallback_direction,
        }
    }

    /// Random walk of up to `steps` moves. The first move is one of `safe_moves`;
    /// later moves never leave the board, never reverse and never enter our own
    /// body. Stops early when boxed in.
    pub fn generate_sequence(
        &self,
        board: &Board,
        steps: usize,
        rng: &mut dyn RngCore,
    ) -> MoveSequence {
        let mut sim = board.clone();
        let mut sequence = MoveSequence::with_capacity(steps);

        for _ in 0..steps {
            let head = sim.you().head();

            let options: Vec<Direction> = match sequence.last().copied() {
                None => safe_moves(board, AgentId::YOU),
                Some(previous) => Direction::all()
                    .iter()
                    .copied()
                    .filter(|dir| *dir != previous.opposite())
                    .filter(|dir| {
                        let next = dir.apply(&head);
                        sim.in_bounds(&next) && !blocks_self(&sim, &next)
                    })
                    .collect(),
            };

            let chosen = match options.choose(rng) {
                Some(dir) => *dir,
                None => break,
            };

            sequence.push(chosen);
            sim = sim.apply_move(AgentId::YOU, chosen);
        }

        sequence
    }

    /// Cost of playing `sequence` on the frozen `board`: a reward per step, a bonus
    /// per food, a penalty next to a dangerous head and a bonus next to a smaller one.
    /// `None` when the sequence is empty, opens with a move `safe_moves` rejects,
    /// or later crashes into a wall or a body.
    pub fn evaluate(&self, board: &Board, sequence: &[Direction]) -> Option<i32> {
        let first = sequence.first()?;
        if !safe_moves(board, AgentId::YOU).contains(first) {
            return None;
        }

        let mut sim = board.clone();
        let mut cost = 0;

        for dir in sequence {
            let next = dir.apply(&sim.you().head());

            if !sim.in_bounds(&next) || blocks_self(&sim, &next) {
                return None;
            }

            match classify_proximity(&sim, AgentId::YOU, &next) {
                Proximity::Collision => return None,
                Proximity::AdjacentRisk => cost -= self.params.adjacency_risk,
                Proximity::KillOpportunity => cost += self.params.kill_reward,
                Proximity::Neutral => {}
            }

            if sim.has_food(&next) {
                cost += self.params.food_benefit;
            }

            sim = sim.apply_move(AgentId::YOU, *dir);
            cost += self.params.step_reward;
        }

        Some(cost)
    }

    /// Copy of `sequence` with one interior move possibly replaced.
    /// The replacement never reverses the move before it or gets reversed by the one after.
    pub fn mutate(&self, sequence: &[Direction], rng: &mut dyn RngCore) -> MoveSequence {
        let mut mutated = sequence.to_vec();
        if sequence.len() <= 2 {
            return mutated;
        }

        let point = rng.random_range(1..sequence.len() - 1);
        let before = sequence[point - 1];
        let after = sequence[point + 1];

        let replacements: Vec<Direction> = Direction::all()
            .iter()
            .copied()
            .filter(|dir| *dir != before.opposite() && *dir != after.opposite())
            .collect();

        if rng.random_bool(self.params.mutation_rate) {
            if let Some(dir) = replacements.choose(rng) {
                mutated[point] = *dir;
            }
        }

        mutated
    }

    /// Candidate pool for one iteration
    fn candidate_pool(
        &self,
        board: &Board,
        steps: usize,
        incumbent: Option<&MoveSequence>,
        rng: &mut dyn RngCore,
    ) -> Vec<MoveSequence> {
        match incumbent {
            None => (0..self.params.initial_candidates)
                .map(|_| self.generate_sequence(board, steps, rng))
                .collect(),
            Some(best) => {
                let mut pool = Vec::with_capacity(
                    1 + self.params.fresh_candidates + self.params.mutated_candidates,
                );
                pool.push(best.clone());
                for _ in 0..self.params.fresh_candidates {
                    pool.push(self.generate_sequence(board, steps, rng));
                }
                for _ in 0..self.params.mutated_candidates {
                    pool.push(self.mutate(best, rng));
                }
                pool
            }
        }
    }
}

impl MoveStrategy for RolloutSearch {
    fn name(&self) -> &'static str {
        "rollout"
    }

    fn search(&self, board: &Board, progress: &SearchProgress, rng: &mut dyn RngCore) -> Decision {
        let start_time = Instant::now();
        let legal = safe_moves(board, AgentId::YOU);
        if legal.is_empty() {
            warn!("No safe moves detected at the root");
            return Decision::fallback(self.fallback);
        }

        let mut steps = board.you().length().max(1);
        let floor = self.params.min_sequence_length.min(steps);

        let mut best: Option<(MoveSequence, i32)> = None;
        let mut rounds = 0;

        while best.is_none() && rounds < self.params.max_rounds {
            for _ in 0..self.params.iterations {
                let pool = self.candidate_pool(board, steps, best.as_ref().map(|(s, _)| s), rng);

                for candidate in pool {
                    let cost = match self.evaluate(board, &candidate) {
                        Some(cost) => cost,
                        None => continue,
                    };
                    if best.as_ref().map_or(true, |(_, b)| cost > *b) {
                        progress.publish(&Decision {
                            direction: candidate[0],
                            score: cost as f32,
                            no_safe_move: false,
                            iterations: rounds + 1,
                        });
                        best = Some((candidate, cost));
                    }
                }
            }

            rounds += 1;
            if best.is_none() {
                steps = steps.saturating_sub(1).max(floor);
                debug!("Round {}: no valid sequence, trying {} steps", rounds, steps);
            }
        }

        let decision = match best {
            Some((sequence, cost)) => {
                debug!(
                    "Best sequence: {:?} (cost {})",
                    sequence.iter().map(|d| d.as_str()).collect::<Vec<_>>(),
                    cost
                );
                Decision {
                    direction: sequence[0],
                    score: cost as f32,
                    no_safe_move: false,
                    iterations: rounds,
                }
            }
            None => match legal.choose(rng) {
                Some(dir) => {
                    warn!("No valid sequence after {} rounds, picking a random safe move", rounds);
                    Decision {
                        direction: *dir,
                        score: f32::MIN,
                        no_safe_move: false,
                        iterations: rounds,
                    }
                }
                None => Decision::fallback(self.fallback),
            },
        };

        info!(
            "Rollout search chose {} (score: {}, rounds: {}, time: {}ms)",
            decision.direction.as_str(),
            decision.score,
            decision.iterations,
            start_time.elapsed().as_millis()
        );
        decision
    }
}

//! Offline hill climbing over the rollout hyperparameters
//!
//! Every candidate plays a batch of solo training games; the best set found is
//! printed as the tuned keys of the `[rollout]` section of Snake.toml.
//!
//! Usage: tune [--rounds N] [--games N] [--max-turns N] [--seed N] [--config <path>]

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::env;
use std::process;

use lookahead_snake::config::Config;
use lookahead_snake::tuning::{tune, HyperParameters, TrainingGame};

struct Args {
    rounds: u32,
    games: usize,
    max_turns: i32,
    seed: u64,
    config_path: String,
}

fn print_usage() {
    eprintln!("USAGE:");
    eprintln!("  tune [OPTIONS]");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("  --rounds <N>      Candidates to try after the baseline (default: 20)");
    eprintln!("  --games <N>       Training games per candidate (default: 5)");
    eprintln!("  --max-turns <N>   Turn cap of a training game (default: 200)");
    eprintln!("  --seed <N>        Seed for games and proposals (default: 0)");
    eprintln!("  --config <path>   Path to Snake.toml (default: Snake.toml)");
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| format!("Invalid value '{}' for {}: {}", value, flag, e))
}

fn parse_args(raw: &[String]) -> Result<Args, String> {
    let mut args = Args {
        rounds: 20,
        games: 5,
        max_turns: TrainingGame::default().max_turns,
        seed: 0,
        config_path: "Snake.toml".to_string(),
    };

    let mut rest = raw.iter();
    while let Some(flag) = rest.next() {
        let value = rest
            .next()
            .ok_or_else(|| format!("{} requires an argument", flag))?;
        match flag.as_str() {
            "--rounds" => args.rounds = parse_number(flag, value)?,
            "--games" => args.games = parse_number(flag, value)?,
            "--max-turns" => args.max_turns = parse_number(flag, value)?,
            "--seed" => args.seed = parse_number(flag, value)?,
            "--config" => args.config_path = value.clone(),
            other => return Err(format!("Unknown option '{}'", other)),
        }
    }

    if args.games == 0 {
        return Err("--games must be at least 1".to_string());
    }
    Ok(args)
}

fn print_rollout_block(params: &HyperParameters) {
    println!("[rollout]");
    println!("# tuned keys only, the rest of the section stays as configured");
    println!("iterations = {}", params.iterations);
    println!("mutation_rate = {:.3}", params.mutation_rate);
    println!("food_benefit = {}", params.food_benefit);
    println!("adjacency_risk = {}", params.adjacency_risk);
    println!("kill_reward = {}", params.kill_reward);
}

fn main() {
    env_logger::init();

    let raw: Vec<String> = env::args().skip(1).collect();
    if raw.iter().any(|a| a == "--help") {
        print_usage();
        process::exit(0);
    }

    let args = parse_args(&raw).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        print_usage();
        process::exit(1);
    });

    let config = Config::from_file(&args.config_path).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from '{}': {}", args.config_path, e);
        eprintln!("Using default configuration");
        Config::default_hardcoded()
    });

    let game = TrainingGame {
        max_turns: args.max_turns,
        ..TrainingGame::default()
    };

    println!("\n=== ROLLOUT TUNING ===");
    println!("Rounds:            {}", args.rounds);
    println!("Games per round:   {}", args.games);
    println!("Board:             {}x{}, {} food", game.width, game.height, game.food_count);
    println!("Turn cap:          {}", game.max_turns);
    println!("Seed:              {}\n", args.seed);

    let mut rng = StdRng::seed_from_u64(args.seed);
    let search = tune(&config, &game, args.rounds, args.games, &mut rng);

    println!("Evaluations:       {}", search.evaluations());
    println!("Best fitness:      {:.2}\n", search.best_fitness());
    print_rollout_block(search.incumbent());
}

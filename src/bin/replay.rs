// Replays a debug log against the current configuration
//
// Usage:
//   cargo run --bin replay -- <log_file> [options]

use std::env;
use std::process;

use lookahead_snake::config::{Config, StrategyKind};
use lookahead_snake::replay::ReplayEngine;
use lookahead_snake::types::Direction;

fn print_usage() {
    eprintln!("USAGE:");
    eprintln!("  replay <log_file> [OPTIONS]");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("  --all                   Replay all turns in the log (default)");
    eprintln!("  --turns <T1,T2,...>     Replay specific turns");
    eprintln!("  --validate <T:M,...>    Check logged moves, e.g. 5:up,10:left|right");
    eprintln!("  --strategy <tree|rollout>  Override the configured strategy");
    eprintln!("  --seed <N>              Seed for the rollout strategy");
    eprintln!("  --config <path>         Path to Snake.toml (default: Snake.toml)");
    eprintln!("  --verbose               Log every replayed turn");
}

enum Mode {
    All,
    Turns(Vec<i32>),
    Validate(Vec<(i32, Vec<Direction>)>),
}

struct Args {
    log_file: String,
    config_path: String,
    strategy: Option<StrategyKind>,
    seed: Option<u64>,
    verbose: bool,
    mode: Mode,
}

fn parse_turns(s: &str) -> Result<Vec<i32>, String> {
    s.split(',')
        .map(|t| {
            t.trim()
                .parse::<i32>()
                .map_err(|e| format!("Invalid turn number '{}': {}", t, e))
        })
        .collect()
}

fn parse_expected_moves(s: &str) -> Result<Vec<(i32, Vec<Direction>)>, String> {
    s.split(',')
        .map(|pair| {
            let (turn, moves) = pair
                .trim()
                .split_once(':')
                .ok_or_else(|| format!("Invalid format '{}'. Expected 'turn:move'", pair))?;
            let turn = turn
                .parse::<i32>()
                .map_err(|e| format!("Invalid turn number '{}': {}", turn, e))?;
            let moves = moves
                .split('|')
                .map(|m| Direction::parse(m.trim()))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((turn, moves))
        })
        .collect()
}

fn parse_strategy(s: &str) -> Result<StrategyKind, String> {
    match s {
        "tree" => Ok(StrategyKind::Tree),
        "rollout" => Ok(StrategyKind::Rollout),
        _ => Err(format!("Unknown strategy '{}'", s)),
    }
}

fn parse_args(raw: &[String]) -> Result<Args, String> {
    let log_file = raw.first().ok_or("Missing log file")?.clone();
    let mut args = Args {
        log_file,
        config_path: "Snake.toml".to_string(),
        strategy: None,
        seed: None,
        verbose: false,
        mode: Mode::All,
    };

    let mut rest = raw[1..].iter();
    while let Some(flag) = rest.next() {
        let mut value = || {
            rest.next()
                .ok_or_else(|| format!("{} requires an argument", flag))
        };
        match flag.as_str() {
            "--all" => args.mode = Mode::All,
            "--turns" => args.mode = Mode::Turns(parse_turns(value()?)?),
            "--validate" => args.mode = Mode::Validate(parse_expected_moves(value()?)?),
            "--strategy" => args.strategy = Some(parse_strategy(value()?)?),
            "--seed" => {
                let seed = value()?;
                args.seed = Some(
                    seed.parse()
                        .map_err(|e| format!("Invalid seed '{}': {}", seed, e))?,
                );
            }
            "--config" => args.config_path = value()?.clone(),
            "--verbose" => args.verbose = true,
            other => return Err(format!("Unknown option '{}'", other)),
        }
    }

    Ok(args)
}

fn main() {
    env_logger::init();

    let raw: Vec<String> = env::args().skip(1).collect();
    if raw.is_empty() || raw.iter().any(|a| a == "--help") {
        print_usage();
        process::exit(if raw.is_empty() { 1 } else { 0 });
    }

    let args = parse_args(&raw).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        print_usage();
        process::exit(1);
    });

    let mut config = Config::from_file(&args.config_path).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from '{}': {}", args.config_path, e);
        eprintln!("Using default configuration");
        Config::default_hardcoded()
    });
    if let Some(strategy) = args.strategy {
        config.search.strategy = strategy;
    }
    if let Some(seed) = args.seed {
        config.search.seed = Some(seed);
    }

    let engine = ReplayEngine::new(config, args.verbose);
    let entries = engine.load_log_file(&args.log_file).unwrap_or_else(|e| {
        eprintln!("Error loading log file: {}", e);
        process::exit(1);
    });
    if entries.is_empty() {
        eprintln!("Error: Log file is empty");
        process::exit(1);
    }

    match args.mode {
        Mode::All => {
            let results = engine.replay_all(&entries);
            engine.print_report(&results);
        }
        Mode::Turns(turns) => match engine.replay_turns(&entries, &turns) {
            Ok(results) => engine.print_report(&results),
            Err(e) => {
                eprintln!("Error during replay: {}", e);
                process::exit(1);
            }
        },
        Mode::Validate(expected) => match engine.validate_expected_moves(&entries, &expected) {
            Ok(()) => println!("All {} expected move(s) validated", expected.len()),
            Err(e) => {
                eprintln!("Validation failed: {}", e);
                process::exit(1);
            }
        },
    }
}

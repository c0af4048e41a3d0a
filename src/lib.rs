// Library exports for the lookahead snake
// The server binary, the replay tool and the integration tests all go through here

pub mod board;
pub mod bot;
pub mod config;
pub mod debug_logger;
pub mod movegen;
pub mod performance;
pub mod replay;
pub mod scoring;
pub mod search;
pub mod space;
pub mod tuning;
pub mod types;

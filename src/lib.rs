// src/lib.rs
pub mod agents;
pub mod cli;
pub mod core;
pub mod llm;
pub mod queue;
pub mod services;
pub mod tools;
pub mod types;
pub mod utils;
pub mod web;
pub mod worker;

pub use cli::{handle_command, Cli};
pub use crate::core::{ConfigManager, Database};
pub use web::start_web_server;

pub mod commands;
pub mod run_config;
pub mod util;

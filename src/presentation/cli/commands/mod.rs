pub mod config;
pub mod daemon;
pub mod exec;
pub mod status;

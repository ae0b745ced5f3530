//! cargoscout library: the tool-calling research agent core.

pub mod agent;
pub mod config;
pub mod errors;
pub mod providers;

pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod output;
pub mod sources;
pub mod state;
pub mod workload;

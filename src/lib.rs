pub mod auth;
pub mod config;
pub mod errors;
pub mod ingest;
pub mod narrative;
pub mod stats;

pub mod database;
pub mod server;
pub mod services;

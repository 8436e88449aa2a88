pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod network;
pub mod notify;
pub mod progress;
pub mod scheduler;
pub mod session;

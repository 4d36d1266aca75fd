pub mod config;
pub mod error;
pub mod flow;
pub mod models;
pub mod services;

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod id;
pub mod middleware;
pub mod model;
pub mod server;
pub mod state;
pub mod store;

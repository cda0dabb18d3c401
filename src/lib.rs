// Public API for the binary and integration tests

pub mod api;
pub mod cascade;
pub mod config;
pub mod countdown;
pub mod dispenser;
pub mod pool;
pub mod protocol;
pub mod providers;
pub mod session;
pub mod state;
pub mod types;
pub mod ws;

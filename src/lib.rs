//! In-memory chat room: message log, presence and inactivity eviction
//! served over a polling JSON API.

pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;

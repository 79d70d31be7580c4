//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own state and lifecycle rules so route handlers can stay
//! focused on request decoding and response shaping.

pub mod store;

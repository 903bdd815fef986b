//! Mastery API Library Crate
//!
//! This library contains the service side of the mastery tutor: configuration,
//! prompt loading, tutor wiring, in-memory learner sessions, API handlers and
//! routing, plus the terminal channel used by the `tutor` binary. The binaries
//! are thin wrappers around this library.

pub mod bootstrap;
pub mod config;
pub mod handlers;
pub mod models;
pub mod prompts;
pub mod router;
pub mod sessions;
pub mod state;
pub mod terminal;

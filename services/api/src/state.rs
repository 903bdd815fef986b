//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the tutor, the
//! checkpoint catalog, and the live learner sessions.

use crate::sessions::SessionStore;
use mastery_core::{Catalog, Tutor};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
/// All fields are public to be accessible from other modules.
#[derive(Clone)]
pub struct AppState {
    pub tutor: Arc<Tutor>,
    pub catalog: Arc<Catalog>,
    pub sessions: Arc<SessionStore>,
}

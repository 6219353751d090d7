//! Chat session management
//!
//! This module provides the `ChatSession` actor that owns the view state and:
//! - Applies remote log snapshots through the feed adapter
//! - Submits announcements to the speech queue
//! - Applies user actions and runs their effects (append, clipboard, timers)
//! - Re-renders after every mutation and publishes the frame

mod config;
mod session;
mod state;

pub use config::SessionConfig;
pub use session::{ChatSession, SessionHandle};
pub use state::{
    Action, ConnectionStatus, Effect, SettingsUpdate, ViewState, COPIED_INDICATOR,
};

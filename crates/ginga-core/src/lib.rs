//! Core types for the ginga actor.
//!
//! Holds the error type, CLI settings, TOML configuration, the
//! hostname → actor-name table, the value types that flow between layers,
//! and the routing rules that turn a keyword event into a display request.

pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod routing;
pub mod settings;

pub use error::{ActorError, Result};

//! Runtime layer for the ginga actor.
//!
//! Runs the hub connection task, serves actor commands, and drives the actor
//! that turns keyword updates into viewer requests.

pub mod actor;
pub mod commands;
pub mod hub;

pub use ginga_core as core;
pub use ginga_keys as keys;
pub use ginga_viewer as viewer;

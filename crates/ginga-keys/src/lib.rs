//! Hub keyword protocol for the ginga actor.
//!
//! Parses the reply lines relayed by the hub, turns them into keyword-variable
//! updates, and keeps the registry of callbacks attached to those keywords.

pub mod keyvar;
pub mod protocol;
pub mod subscriptions;

pub use ginga_core as core;

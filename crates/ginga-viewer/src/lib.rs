//! Remote image viewer integration for the ginga actor.
//!
//! Provides the [`viewer::Viewer`] capability trait, a JSON-RPC client for a
//! viewer process, FITS header/data unit lookup, and the dispatcher that
//! ensures a channel exists before loading an exposure into it.

pub mod dispatcher;
pub mod fits;
pub mod remote;
pub mod viewer;

pub use ginga_core as core;

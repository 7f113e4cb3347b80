//! Registry of keyword callbacks.
//!
//! Handlers are plain values (`T`) keyed by `(actor, keyword)`; whoever owns
//! the registry decides what a handler means when a matching [`KeyVar`]
//! arrives.

use std::collections::HashMap;

use crate::keyvar::KeyVar;

#[derive(Debug, Clone)]
pub struct Subscriptions<T> {
    handlers: HashMap<(String, String), Vec<T>>,
}

impl<T> Subscriptions<T> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register `handler` for `actor.keyword`. Several handlers may share a key.
    pub fn add(&mut self, actor: &str, keyword: &str, handler: T) {
        tracing::debug!(actor, keyword, "keyword callback registered");
        self.handlers
            .entry((actor.to_string(), keyword.to_string()))
            .or_default()
            .push(handler);
    }

    /// Handlers registered for the keyword carried by `keyvar`.
    pub fn handlers_for(&self, keyvar: &KeyVar) -> &[T] {
        self.handlers
            .get(&(keyvar.actor.clone(), keyvar.name.clone()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<T> Default for Subscriptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

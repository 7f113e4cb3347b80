//! Keyword-variable updates extracted from hub replies.

use chrono::{DateTime, Utc};

use crate::protocol::Reply;

/// The latest value of one keyword published by one actor.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyVar {
    /// Actor (model) that published the keyword, e.g. `ccd_r1`.
    pub actor: String,
    /// Keyword name, e.g. `filepath`.
    pub name: String,
    pub values: Vec<String>,
    /// When the update was read off the hub connection.
    pub received_at: DateTime<Utc>,
}

impl KeyVar {
    /// Dotted `actor.keyword` name used in logs.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.actor, self.name)
    }

    /// Split a reply into one update per keyword it carries.
    pub fn from_reply(reply: &Reply, received_at: DateTime<Utc>) -> Vec<KeyVar> {
        reply
            .keywords
            .iter()
            .map(|keyword| KeyVar {
                actor: reply.actor.clone(),
                name: keyword.name.clone(),
                values: keyword.values.clone(),
                received_at,
            })
            .collect()
    }
}

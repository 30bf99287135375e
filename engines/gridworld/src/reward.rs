//! Reward table and the fallback resolution used by composite actions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::protocol::Reward;

/// Reward keys looked up by the engine. Direction- and object-specific keys
/// are built with the helpers at the bottom.
pub mod keys {
    use crate::direction::Direction;

    pub const WAIT: &str = "WAIT";
    pub const MOVE: &str = "MOVE";
    pub const MOVE_NO_EXIT: &str = "MOVE:NO_EXIT";
    pub const MOVE_BLOCKED: &str = "MOVE:BLOCKED";
    pub const GET: &str = "GET";
    pub const GET_OBJECT: &str = "GET:OBJECT";
    pub const GET_NO_OBJECT: &str = "GET:NO_OBJECT";
    pub const GET_FULL: &str = "GET:FULL";
    pub const GET_FAILED: &str = "GET:FAILED";
    pub const GET_TRAPPED: &str = "GET:TRAPPED";
    pub const DROP: &str = "DROP";
    pub const DROP_OBJECT: &str = "DROP:OBJECT";
    pub const DROP_NO_OBJECT: &str = "DROP:NO_OBJECT";
    pub const DROP_FULL: &str = "DROP:FULL";
    pub const DROP_FAILED: &str = "DROP:FAILED";
    pub const PUSH: &str = "PUSH";
    pub const PUSH_NO_OBJECT: &str = "PUSH:NO_OBJECT";
    pub const PUSH_FAILED: &str = "PUSH:FAILED";
    pub const USE: &str = "USE";
    pub const USE_OBJECT: &str = "USE:OBJECT";
    pub const USE_NO_OBJECT: &str = "USE:NO_OBJECT";
    pub const ENTER_GOAL: &str = "ENTER:GOAL";

    /// `MOVE:EAST` and friends.
    pub fn move_in(direction: Direction) -> String {
        format!("{MOVE}:{}", direction.name())
    }

    /// `PUSH_EAST` and friends.
    pub fn push_in(direction: Direction) -> String {
        format!("{PUSH}_{}", direction.name())
    }

    /// `GET:OBJECT[key]` and friends.
    pub fn object_key(behavior: &str, name: &str) -> String {
        format!("{behavior}:OBJECT[{name}]")
    }
}

/// String-keyed reward table. Missing keys are not errors.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewardMap(HashMap<String, f64>);

impl RewardMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) -> Option<f64> {
        self.0.insert(key.into(), value)
    }

    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.insert(key, value);
        self
    }

    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// First key present, most specific first.
    pub fn lookup(&self, keys: &[&str]) -> Option<f64> {
        keys.iter().find_map(|k| self.get(k))
    }

    /// An explicit reward always wins; otherwise the first key present,
    /// otherwise 0.0.
    pub fn resolve(&self, explicit: Reward, keys: &[&str]) -> f64 {
        explicit.or_else(|| self.lookup(keys)).unwrap_or(0.0)
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for RewardMap {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

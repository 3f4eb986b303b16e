use std::collections::HashMap;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::graphql::GraphqlRequest;
use crate::session::{AccessToken, AccessTokenCell};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    operation: &'static str,
    variables: String,
}

impl CacheKey {
    pub fn for_request(request: &GraphqlRequest) -> Self {
        Self {
            operation: request.operation,
            variables: request.variables.to_string(),
        }
    }
}

/// Query results cached for the identity that fetched them. Any change of
/// access token empties the cache before the next lookup.
#[derive(Debug)]
pub struct QueryCache {
    entries: HashMap<CacheKey, serde_json::Value>,
    identity: watch::Receiver<Option<AccessToken>>,
    generation: u64,
}

impl QueryCache {
    pub fn new(tokens: &AccessTokenCell) -> Self {
        Self {
            entries: HashMap::new(),
            identity: tokens.subscribe(),
            generation: 0,
        }
    }

    /// Resets the cache when the token changed since the last call.
    pub fn observe_identity(&mut self) -> bool {
        if !self.identity.has_changed().unwrap_or(false) {
            return false;
        }
        let _ = self.identity.borrow_and_update();
        self.clear("access token changed");
        true
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<serde_json::Value> {
        self.observe_identity();
        let hit = self.entries.get(key).cloned();
        if hit.is_some() {
            debug!(operation = key.operation, "query cache hit");
        }
        hit
    }

    /// Incremented on every reset; results fetched under an older
    /// generation are never stored.
    pub fn generation(&mut self) -> u64 {
        self.observe_identity();
        self.generation
    }

    pub fn insert(&mut self, key: CacheKey, value: serde_json::Value, generation: u64) {
        self.observe_identity();
        if generation != self.generation {
            debug!(operation = key.operation, "dropping result fetched before cache reset");
            return;
        }
        self.entries.insert(key, value);
    }

    pub fn clear(&mut self, reason: &'static str) {
        let cleared = self.entries.len();
        self.entries.clear();
        self.generation = self.generation.wrapping_add(1);
        info!(reason, cleared, "query cache reset");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

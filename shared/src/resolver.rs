//! Turns persisted farm location ids back into display names.
//!
//! Every level of every chain is requested at once, keyed by the persisted
//! parent id, so a failure at one level only degrades that level. Lists are
//! kept in a bounded LRU: a list already loaded or in flight is never
//! requested twice. Failures are not kept.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{ResolverConfig, DEFAULT_RESOLVER_CACHE_CAPACITY};
use crate::error::LocationError;
use crate::model::{CascadeSelection, Level, LocationId, LocationNode};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NameResolution {
    Resolved { id: LocationId, name: String },
    /// The parent's list has not arrived yet.
    Pending { id: LocationId },
    /// The chain stops above this level.
    #[default]
    Absent,
    /// The parent's list loaded but does not contain `id`.
    NotFound { id: LocationId },
    Failed { id: LocationId, error: LocationError },
}

impl NameResolution {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            NameResolution::Resolved { name, .. } => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedNames {
    levels: [NameResolution; 4],
    unknown_label: String,
}

impl ResolvedNames {
    #[must_use]
    pub fn get(&self, level: Level) -> &NameResolution {
        &self.levels[level.depth()]
    }

    /// The name at `level`, or the unknown label.
    #[must_use]
    pub fn display(&self, level: Level) -> &str {
        self.get(level).name().unwrap_or(&self.unknown_label)
    }

    /// `"Jardin, Antioquia, Colombia"`: deepest level first, absent levels skipped.
    #[must_use]
    pub fn summary(&self) -> String {
        Level::ALL
            .into_iter()
            .rev()
            .filter(|level| *self.get(*level) != NameResolution::Absent)
            .map(|level| self.display(level))
            .collect::<Vec<_>>()
            .join(", ")
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.levels
            .iter()
            .any(|level| matches!(level, NameResolution::Pending { .. }))
    }
}

/// A list as the backend serves it: one level under one parent.
pub type ListKey = (Level, Option<LocationId>);

enum ListEntry {
    Pending,
    Ready(Arc<Vec<LocationNode>>),
}

pub struct NamesState {
    chains: Vec<CascadeSelection>,
    resolutions: Vec<[NameResolution; 4]>,
    lists: LruCache<ListKey, ListEntry>,
}

impl Default for NamesState {
    fn default() -> Self {
        Self {
            chains: Vec::new(),
            resolutions: Vec::new(),
            lists: LruCache::new(capacity(DEFAULT_RESOLVER_CACHE_CAPACITY)),
        }
    }
}

impl NamesState {
    /// Resizes the list cache and forgets every list in it.
    pub fn configure(&mut self, config: &ResolverConfig) {
        self.lists = LruCache::new(capacity(config.cache_capacity));
    }

    /// Replaces the chains being resolved. Returns the lists that have to be
    /// requested; everything else is answered from the cache or is already in
    /// flight.
    pub fn begin(&mut self, chains: Vec<CascadeSelection>) -> Vec<ListKey> {
        let chains: Vec<_> = chains
            .into_iter()
            .map(CascadeSelection::normalized)
            .collect();
        let mut requests = Vec::new();
        let mut resolutions = Vec::with_capacity(chains.len());

        for chain in &chains {
            let mut levels: [NameResolution; 4] = Default::default();
            for level in Level::ALL {
                let Some(id) = chain.get(level) else {
                    break;
                };
                let key = list_key(chain, level);
                levels[level.depth()] = match self.lists.get(&key) {
                    Some(ListEntry::Ready(nodes)) => lookup(nodes, level, id),
                    Some(ListEntry::Pending) => NameResolution::Pending { id: id.clone() },
                    None => {
                        self.lists.put(key.clone(), ListEntry::Pending);
                        requests.push(key);
                        NameResolution::Pending { id: id.clone() }
                    }
                };
            }
            resolutions.push(levels);
        }

        debug!(
            chains = chains.len(),
            requests = requests.len(),
            "resolving location names"
        );
        self.chains = chains;
        self.resolutions = resolutions;
        requests
    }

    /// Fills every pending level that was waiting on `key`.
    pub fn apply(&mut self, key: &ListKey, result: Result<Vec<LocationNode>, LocationError>) {
        let result = result.map(Arc::new);
        match &result {
            Ok(nodes) => {
                self.lists.put(key.clone(), ListEntry::Ready(Arc::clone(nodes)));
            }
            Err(error) => {
                warn!(level = %key.0, %error, "could not load list for name resolution");
                self.lists.pop(key);
            }
        }

        let (level, _) = key;
        for (chain, levels) in self.chains.iter().zip(self.resolutions.iter_mut()) {
            let slot = &mut levels[level.depth()];
            let NameResolution::Pending { id } = slot else {
                continue;
            };
            if list_key(chain, *level) != *key {
                continue;
            }
            let id = id.clone();
            *slot = match &result {
                Ok(nodes) => lookup(nodes, *level, &id),
                Err(error) => NameResolution::Failed {
                    id,
                    error: error.clone(),
                },
            };
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.resolutions
            .iter()
            .flatten()
            .any(|level| matches!(level, NameResolution::Pending { .. }))
    }

    /// One entry per chain, in the order they were handed to [`begin`](Self::begin).
    #[must_use]
    pub fn resolved(&self, unknown_label: &str) -> Vec<ResolvedNames> {
        self.resolutions
            .iter()
            .map(|levels| ResolvedNames {
                levels: levels.clone(),
                unknown_label: unknown_label.to_string(),
            })
            .collect()
    }
}

fn capacity(configured: usize) -> NonZeroUsize {
    NonZeroUsize::new(configured).unwrap_or(NonZeroUsize::MIN)
}

fn list_key(chain: &CascadeSelection, level: Level) -> ListKey {
    let parent = level.parent().and_then(|parent| chain.get(parent)).cloned();
    (level, parent)
}

fn lookup(nodes: &[LocationNode], level: Level, id: &LocationId) -> NameResolution {
    match nodes.iter().find(|node| &node.id == id) {
        Some(node) => NameResolution::Resolved {
            id: id.clone(),
            name: node.name.clone(),
        },
        None => {
            debug!(%level, %id, "id not present in its parent's list");
            NameResolution::NotFound { id: id.clone() }
        }
    }
}

/// Key Resolution Module
///
/// Maps natural keys (nconst, tconst, genre name) to the surrogate keys the
/// store assigned. A miss is not an error: the referenced row is simply outside
/// the loaded window and the reference is skipped.
use crate::db::Store;
use crate::models::EntityKind;
use anyhow::Result;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct KeyResolver {
    /// Map of entity kind -> (natural key -> surrogate key)
    maps: HashMap<EntityKind, HashMap<String, i64>>,
}

impl KeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map one natural key, replacing any earlier surrogate for it
    pub fn register(&mut self, kind: EntityKind, external_id: impl Into<String>, surrogate_id: i64) {
        self.maps.entry(kind).or_default().insert(external_id.into(), surrogate_id);
    }

    pub fn resolve(&self, kind: EntityKind, external_id: &str) -> Option<i64> {
        self.maps.get(&kind).and_then(|map| map.get(external_id)).copied()
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        self.maps.get(&kind).map_or(0, HashMap::len)
    }

    /// Replace the map for `kind` with everything the store holds for it.
    ///
    /// Reading back the whole table (rather than tracking inserts) also picks up
    /// rows left by earlier runs, so re-runs resolve against them.
    pub async fn rebuild<S: Store + ?Sized>(&mut self, kind: EntityKind, store: &S) -> Result<usize> {
        let keys = store.natural_keys(kind).await?;
        self.maps.insert(kind, HashMap::with_capacity(keys.len()));
        for (external_id, surrogate_id) in keys {
            self.register(kind, external_id, surrogate_id);
        }

        let size = self.len(kind);
        tracing::info!("Resolved {} {} keys", size, kind.as_str());

        Ok(size)
    }
}

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use super::{FieldDescriptor, SchemaProvider};
use crate::error::SchemaError;

/// Thread-safe LRU cache in front of a schema provider
///
/// Keeps the field lists of recently used models so that repeated builds
/// against a slow provider (e.g. a remote service) skip redundant lookups.
/// Failed lookups are never cached.
pub struct CachedProvider<P> {
    inner: P,
    cache: Mutex<LruCache<String, Vec<FieldDescriptor>>>,
}

impl<P: SchemaProvider> CachedProvider<P> {
    /// Wrap `inner` with a cache holding at most `capacity` models
    ///
    /// A capacity of 0 is treated as 1.
    pub fn new(inner: P, capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Get the current number of cached models
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every cached entry
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, Vec<FieldDescriptor>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P: SchemaProvider> SchemaProvider for CachedProvider<P> {
    fn fields(&self, model: &str) -> std::result::Result<Vec<FieldDescriptor>, SchemaError> {
        if let Some(fields) = self.lock().get(model) {
            log::trace!("Schema cache hit: {}", model);
            return Ok(fields.clone());
        }

        // Lock is not held across the inner call
        let fields = self.inner.fields(model)?;
        self.lock().put(model.to_string(), fields.clone());
        Ok(fields)
    }
}

use crate::core::geo::TileCoord;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(512) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

/// Downloaded tile bytes keyed by coordinate, with LRU eviction.
/// Clones share the same storage.
#[derive(Debug)]
pub struct TileCache {
    cache: Arc<Mutex<LruCache<TileCoord, Arc<Vec<u8>>>>>,
}

impl TileCache {
    /// A zero capacity falls back to the default of 512 tiles
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY);
        Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY.get())
    }

    /// Looks a tile up, marking it as recently used
    pub fn get(&self, coord: &TileCoord) -> Option<Arc<Vec<u8>>> {
        self.cache.lock().ok()?.get(coord).cloned()
    }

    pub fn insert(&self, coord: TileCoord, data: Vec<u8>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(coord, Arc::new(data));
        }
    }

    pub fn contains(&self, coord: &TileCoord) -> bool {
        self.cache.lock().ok()
            .map(|cache| cache.contains(coord))
            .unwrap_or(false)
    }

    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().ok()
            .map(|cache| cache.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.cache.lock().ok()
            .map(|cache| cache.cap().get())
            .unwrap_or(0)
    }
}

impl Clone for TileCache {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let cache = TileCache::new(4);
        let tile = TileCoord::new(404, 254, 9);
        assert!(cache.is_empty());

        cache.insert(tile, vec![0x89, b'P', b'N', b'G']);
        assert!(cache.contains(&tile));
        assert_eq!(cache.get(&tile).map(|b| b.len()), Some(4));

        let shared = cache.clone();
        assert_eq!(shared.len(), 1);
        shared.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let cache = TileCache::new(2);
        let a = TileCoord::new(1, 1, 2);
        let b = TileCoord::new(2, 1, 2);
        let c = TileCoord::new(3, 1, 2);

        cache.insert(a, vec![1]);
        cache.insert(b, vec![2]);
        // touch `a` so that `b` becomes the eviction candidate
        assert!(cache.get(&a).is_some());
        cache.insert(c, vec![3]);

        assert!(cache.contains(&a));
        assert!(!cache.contains(&b));
        assert!(cache.contains(&c));
    }

    #[test]
    fn test_zero_capacity_uses_default() {
        assert_eq!(TileCache::new(0).capacity(), 512);
    }
}

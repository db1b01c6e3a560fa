//! Bounded LRU caches for info, thumbnails and waveforms.
//!
//! Three independent stores share one maximum entry count. Each store has its
//! own mutex; all critical sections are short and never call out.
//! Keys come from `cache_key`; values are immutable once stored.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, trace};
use lru::LruCache;

use crate::core::cache_key::key_path;
use crate::entities::{Image, Info, TriMesh};

/// Hit/miss counters for one store
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses();
        if total == 0 { 0.0 } else { self.hits() as f64 / total as f64 }
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

/// One LRU store. Unbounded `LruCache` trimmed by hand so a max of 0 works.
struct Store<V> {
    name: &'static str,
    lru: Mutex<LruCache<String, V>>,
    stats: CacheStats,
}

impl<V: Clone> Store<V> {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            lru: Mutex::new(LruCache::unbounded()),
            stats: CacheStats::default(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, V>> {
        self.lru.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn evict(&self, lru: &mut LruCache<String, V>, max: usize) {
        while lru.len() > max {
            match lru.pop_lru() {
                Some((key, _)) => trace!("{} cache evicted {}", self.name, key),
                None => break,
            }
        }
    }

    fn add(&self, key: String, value: V, max: &AtomicUsize) {
        let mut lru = self.lock();
        lru.put(key, value);
        self.evict(&mut lru, max.load(Ordering::SeqCst));
    }

    fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    fn get(&self, key: &str) -> Option<V> {
        let value = self.lock().get(key).cloned();
        match value {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        value
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn trim(&self, max: usize) {
        let mut lru = self.lock();
        self.evict(&mut lru, max);
    }

    fn clear(&self) {
        self.lock().clear();
    }

    fn remove_path(&self, path: &str) -> usize {
        let mut lru = self.lock();
        let doomed: Vec<String> = lru
            .iter()
            .filter(|(key, _)| key_path(key).as_deref() == Some(path))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            lru.pop(key);
        }
        doomed.len()
    }
}

/// Thread-safe cache shared by the generator workers and the owning app.
pub struct Cache {
    max: AtomicUsize,
    info: Store<Info>,
    thumbnails: Store<Arc<Image>>,
    waveforms: Store<Arc<TriMesh>>,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl Cache {
    pub fn new(max: usize) -> Self {
        debug!("Cache created: max={} per store", max);
        Self {
            max: AtomicUsize::new(max),
            info: Store::new("info"),
            thumbnails: Store::new("thumbnail"),
            waveforms: Store::new("waveform"),
        }
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }

    /// Change the per-store bound, evicting immediately.
    pub fn set_max(&self, max: usize) {
        self.max.store(max, Ordering::SeqCst);
        self.info.trim(max);
        self.thumbnails.trim(max);
        self.waveforms.trim(max);
        debug!("Cache max set to {}", max);
    }

    /// Total entries across all three stores.
    pub fn size(&self) -> usize {
        self.info.len() + self.thumbnails.len() + self.waveforms.len()
    }

    /// Occupancy of all stores, 0-100.
    pub fn percentage(&self) -> f32 {
        let capacity = self.max() * 3;
        if capacity == 0 {
            0.0
        } else {
            self.size() as f32 / capacity as f32 * 100.0
        }
    }

    pub fn info_len(&self) -> usize {
        self.info.len()
    }

    pub fn thumbnail_len(&self) -> usize {
        self.thumbnails.len()
    }

    pub fn waveform_len(&self) -> usize {
        self.waveforms.len()
    }

    pub fn add_info(&self, key: String, info: Info) {
        self.info.add(key, info, &self.max);
    }

    pub fn contains_info(&self, key: &str) -> bool {
        self.info.contains(key)
    }

    /// Returns the value and marks it most recently used.
    pub fn get_info(&self, key: &str) -> Option<Info> {
        self.info.get(key)
    }

    pub fn add_thumbnail(&self, key: String, image: Arc<Image>) {
        self.thumbnails.add(key, image, &self.max);
    }

    pub fn contains_thumbnail(&self, key: &str) -> bool {
        self.thumbnails.contains(key)
    }

    pub fn get_thumbnail(&self, key: &str) -> Option<Arc<Image>> {
        self.thumbnails.get(key)
    }

    pub fn add_waveform(&self, key: String, mesh: Arc<TriMesh>) {
        self.waveforms.add(key, mesh, &self.max);
    }

    pub fn contains_waveform(&self, key: &str) -> bool {
        self.waveforms.contains(key)
    }

    pub fn get_waveform(&self, key: &str) -> Option<Arc<TriMesh>> {
        self.waveforms.get(key)
    }

    /// Drop every entry built from `path`, e.g. after that file changed on disk.
    pub fn remove_path(&self, path: &std::path::Path) -> usize {
        let path = path.to_string_lossy();
        let removed = self.info.remove_path(&path)
            + self.thumbnails.remove_path(&path)
            + self.waveforms.remove_path(&path);
        debug!("Removed {} cache entries for {}", removed, path);
        removed
    }

    /// Empty all three stores.
    pub fn clear(&self) {
        self.info.clear();
        self.thumbnails.clear();
        self.waveforms.clear();
        debug!("Cleared entire cache");
    }

    pub fn info_stats(&self) -> &CacheStats {
        &self.info.stats
    }

    pub fn thumbnail_stats(&self) -> &CacheStats {
        &self.thumbnails.stats
    }

    pub fn waveform_stats(&self) -> &CacheStats {
        &self.waveforms.stats
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("max", &self.max())
            .field("info", &self.info_len())
            .field("thumbnails", &self.thumbnail_len())
            .field("waveforms", &self.waveform_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache_key::{info_key, thumbnail_key};
    use crate::entities::{Options, Size2};
    use std::path::Path;

    fn thumb(w: u32) -> Arc<Image> {
        Arc::new(Image::new(Size2::new(w, 1)))
    }

    #[test]
    fn test_cache_basic_operations() {
        let cache = Cache::new(10);
        cache.add_thumbnail("a".into(), thumb(2));
        assert!(cache.contains_thumbnail("a"));
        assert_eq!(cache.get_thumbnail("a").unwrap().width(), 2);
        assert!(cache.get_thumbnail("b").is_none());
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.thumbnail_len(), 1);
        assert_eq!(cache.info_len(), 0);
    }

    #[test]
    fn test_overflow_evicts_least_recently_used() {
        let cache = Cache::new(3);
        cache.add_thumbnail("a".into(), thumb(1));
        cache.add_thumbnail("b".into(), thumb(2));
        cache.add_thumbnail("c".into(), thumb(3));
        // Touch "a" so "b" becomes least recently used
        assert!(cache.get_thumbnail("a").is_some());
        cache.add_thumbnail("d".into(), thumb(4));

        assert_eq!(cache.size(), 3);
        assert!(!cache.contains_thumbnail("b"));
        assert!(cache.contains_thumbnail("a"));
        assert!(cache.contains_thumbnail("c"));
        assert!(cache.contains_thumbnail("d"));
    }

    #[test]
    fn test_size_never_exceeds_max() {
        let cache = Cache::new(5);
        for i in 0..50 {
            cache.add_info(format!("k{}", i), Info::default());
            assert!(cache.size() <= 5);
        }
        assert!(cache.contains_info("k49"));
        assert!(!cache.contains_info("k44"));
    }

    #[test]
    fn test_contains_does_not_refresh() {
        let cache = Cache::new(2);
        cache.add_waveform("a".into(), Arc::new(TriMesh::default()));
        cache.add_waveform("b".into(), Arc::new(TriMesh::default()));
        assert!(cache.contains_waveform("a"));
        cache.add_waveform("c".into(), Arc::new(TriMesh::default()));
        assert!(!cache.contains_waveform("a"));
    }

    #[test]
    fn test_set_max_zero() {
        let cache = Cache::new(10);
        cache.add_info("a".into(), Info::default());
        cache.set_max(0);
        assert_eq!(cache.size(), 0);
        cache.add_thumbnail("b".into(), thumb(1));
        cache.add_waveform("c".into(), Arc::new(TriMesh::default()));
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.percentage(), 0.0);
    }

    #[test]
    fn test_set_max_shrinks_each_store() {
        let cache = Cache::new(10);
        for i in 0..10 {
            cache.add_info(format!("i{}", i), Info::default());
            cache.add_thumbnail(format!("t{}", i), thumb(1));
        }
        assert_eq!(cache.size(), 20);
        assert_eq!(cache.percentage(), 20.0 / 30.0 * 100.0);
        cache.set_max(4);
        assert_eq!(cache.info_len(), 4);
        assert_eq!(cache.thumbnail_len(), 4);
        assert!(cache.contains_info("i9"));
        assert!(!cache.contains_info("i5"));
    }

    #[test]
    fn test_clear() {
        let cache = Cache::new(10);
        cache.add_info("a".into(), Info::default());
        cache.add_thumbnail("b".into(), thumb(1));
        cache.clear();
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_remove_path() {
        let cache = Cache::new(10);
        let o = Options::new();
        let a = Path::new("/m/a.mov");
        let b = Path::new("/m/b.mov");
        cache.add_info(info_key(a, None, &o), Info::default());
        cache.add_thumbnail(thumbnail_key(64, a, None, Some(1.0), &o), thumb(1));
        cache.add_thumbnail(thumbnail_key(64, b, None, Some(1.0), &o), thumb(1));
        assert_eq!(cache.remove_path(a), 2);
        assert_eq!(cache.size(), 1);
        assert!(cache.contains_thumbnail(&thumbnail_key(64, b, None, Some(1.0), &o)));
    }

    #[test]
    fn test_cache_statistics() {
        let cache = Cache::new(10);
        cache.add_info("a".into(), Info::default());
        let _ = cache.get_info("a");
        let _ = cache.get_info("missing");
        let stats = cache.info_stats();
        assert_eq!(stats.hits(), 1);
        assert_eq!(stats.misses(), 1);
        assert_eq!(stats.hit_rate(), 0.5);
        stats.reset();
        assert_eq!(stats.hits(), 0);
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(Cache::new(64));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let key = format!("{}-{}", t, i);
                        cache.add_thumbnail(key.clone(), thumb(1));
                        let _ = cache.get_thumbnail(&key);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.thumbnail_len(), 64);
    }
}

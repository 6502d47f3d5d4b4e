//! LRU Narration Cache
//!
//! 一本书的播放音频工作集。key 为音频块起点，value 为整页音频；
//! 时间戳先在已缓存区间内查找，未命中再查询持久层。

use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::application::ports::{
    BookRepositoryPort, CacheStats, CachedChunk, ChunkKey, NarrationCachePort, NarrationError,
    ScrubResult,
};

/// 内存 LRU 播放缓存
pub struct LruNarrationCache {
    book_id: Uuid,
    capacity: NonZeroUsize,
    /// 未命中时额外预取的后续音频块数量
    prefetch_ahead: usize,
    repository: Arc<dyn BookRepositoryPort>,
    entries: Mutex<LruCache<ChunkKey, CachedChunk>>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    eviction_count: AtomicU64,
}

impl LruNarrationCache {
    pub fn new(
        book_id: Uuid,
        capacity: usize,
        prefetch_ahead: usize,
        repository: Arc<dyn BookRepositoryPort>,
    ) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);

        tracing::debug!(
            book_id = %book_id,
            capacity = capacity.get(),
            prefetch_ahead,
            "Narration cache created"
        );

        Self {
            book_id,
            capacity,
            prefetch_ahead,
            repository,
            entries: Mutex::new(LruCache::new(capacity)),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            eviction_count: AtomicU64::new(0),
        }
    }

    fn validate(timestamp: f64) -> Result<(), NarrationError> {
        if !timestamp.is_finite() || timestamp < 0.0 {
            return Err(NarrationError::InvalidTimestamp(timestamp));
        }
        Ok(())
    }

    /// 在已缓存区间内查找，命中时提升为最近使用
    async fn find_cached(&self, timestamp: f64) -> Option<CachedChunk> {
        let mut entries = self.entries.lock().await;
        let key = entries
            .iter()
            .find(|(_, chunk)| chunk.contains(timestamp))
            .map(|(key, _)| *key)?;
        entries.get(&key).cloned()
    }

    async fn insert(&self, chunk: CachedChunk) {
        let key = chunk.key;
        let mut entries = self.entries.lock().await;
        if let Some((evicted, _)) = entries.push(key, chunk) {
            // push 对同一个 key 返回旧值，不算淘汰
            if evicted != key {
                self.eviction_count.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    book_id = %self.book_id,
                    evicted = %evicted,
                    "Evicted least recently used chunk"
                );
            }
        }
    }

    async fn fetch(&self, timestamp: f64) -> Result<Option<CachedChunk>, NarrationError> {
        let lookup = self
            .repository
            .get_chunk_for_timestamp(self.book_id, timestamp)
            .await?;
        Ok(lookup.map(|l| CachedChunk::from(l.chunk)))
    }

    /// 依次取紧随其后的音频块，遇到空档或错误即停止
    async fn prefetch_after(&self, chunk: &CachedChunk) -> Vec<CachedChunk> {
        let mut fetched: Vec<CachedChunk> = Vec::new();
        let mut previous = chunk.clone();

        for _ in 0..self.prefetch_ahead {
            if previous.duration_secs <= 0.0 {
                break;
            }
            match self.fetch(previous.end_secs()).await {
                Ok(Some(next)) if next.key != previous.key => {
                    previous = next.clone();
                    fetched.push(next);
                }
                Ok(_) => break,
                Err(e) => {
                    tracing::debug!(book_id = %self.book_id, error = %e, "Prefetch stopped");
                    break;
                }
            }
        }

        fetched
    }
}

#[async_trait]
impl NarrationCachePort for LruNarrationCache {
    fn book_id(&self) -> Uuid {
        self.book_id
    }

    async fn load(&self, timestamp: f64) -> Result<CachedChunk, NarrationError> {
        Self::validate(timestamp)?;

        if let Some(chunk) = self.find_cached(timestamp).await {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(book_id = %self.book_id, timestamp, key = %chunk.key, "Cache hit");
            return Ok(chunk);
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);
        let chunk = self
            .fetch(timestamp)
            .await?
            .ok_or(NarrationError::ChunkNotFound {
                book_id: self.book_id,
                timestamp,
            })?;

        tracing::debug!(
            book_id = %self.book_id,
            timestamp,
            key = %chunk.key,
            page_number = chunk.page_number,
            "Cache miss, chunk loaded"
        );

        if self.prefetch_ahead > 0 {
            for next in self.prefetch_after(&chunk).await {
                self.insert(next).await;
            }
        }
        self.insert(chunk.clone()).await;

        Ok(chunk)
    }

    async fn scrub(&self, timestamp: f64) -> Result<ScrubResult, NarrationError> {
        let chunk = self.load(timestamp).await?;
        let offset_secs = (timestamp - chunk.start_secs).max(0.0);
        Ok(ScrubResult { chunk, offset_secs })
    }

    async fn stats(&self) -> CacheStats {
        let entries = self.entries.lock().await.len();
        CacheStats {
            entries,
            capacity: self.capacity.get(),
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            eviction_count: self.eviction_count.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::book_store::fixtures::book_with_audio;
    use crate::infrastructure::memory::InMemoryBookStore;

    // 三页，各 10 秒：A=[0,10) B=[10,20) C=[20,30)
    async fn setup(capacity: usize, prefetch: usize) -> (Arc<InMemoryBookStore>, LruNarrationCache) {
        let store = Arc::new(InMemoryBookStore::new());
        let (book_id, _) = book_with_audio(&store, &[10.0, 10.0, 10.0]).await;
        let cache = LruNarrationCache::new(book_id, capacity, prefetch, store.clone());
        (store, cache)
    }

    #[tokio::test]
    async fn test_capacity_two_keeps_two_most_recent() {
        let (store, cache) = setup(2, 0).await;

        cache.load(0.0).await.unwrap();
        cache.load(10.0).await.unwrap();
        cache.load(20.0).await.unwrap();
        assert_eq!(store.chunk_lookups(), 3);

        // B 与 C 仍在缓存中
        cache.load(15.0).await.unwrap();
        cache.load(25.0).await.unwrap();
        assert_eq!(store.chunk_lookups(), 3);

        // A 已被淘汰
        cache.load(5.0).await.unwrap();
        assert_eq!(store.chunk_lookups(), 4);

        let stats = cache.stats().await;
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.capacity, 2);
        assert_eq!(stats.miss_count, 4);
        assert_eq!(stats.hit_count, 2);
        assert_eq!(stats.eviction_count, 2);
    }

    #[tokio::test]
    async fn test_hit_promotes_entry() {
        let (store, cache) = setup(2, 0).await;

        cache.load(0.0).await.unwrap();
        cache.load(10.0).await.unwrap();
        // 命中 A，使 B 成为最久未使用
        cache.load(1.0).await.unwrap();
        cache.load(20.0).await.unwrap();
        assert_eq!(store.chunk_lookups(), 3);

        cache.load(2.0).await.unwrap();
        assert_eq!(store.chunk_lookups(), 3);

        cache.load(12.0).await.unwrap();
        assert_eq!(store.chunk_lookups(), 4);
    }

    #[tokio::test]
    async fn test_scrub_inside_cached_interval_skips_repository() {
        let (store, cache) = setup(5, 0).await;

        let chunk = cache.load(10.0).await.unwrap();
        assert_eq!(chunk.page_number, 2);
        assert_eq!(store.chunk_lookups(), 1);

        let result = cache.scrub(15.5).await.unwrap();
        assert_eq!(result.chunk.key, ChunkKey::from_secs(10.0));
        assert!((result.offset_secs - 5.5).abs() < 1e-9);
        assert_eq!(store.chunk_lookups(), 1);
    }

    #[tokio::test]
    async fn test_timestamp_past_end_is_not_found() {
        let (_, cache) = setup(5, 0).await;

        let result = cache.load(30.0).await;
        assert!(matches!(result, Err(NarrationError::ChunkNotFound { .. })));
        assert_eq!(cache.stats().await.entries, 0);
    }

    #[tokio::test]
    async fn test_invalid_timestamp_is_rejected_without_lookup() {
        let (store, cache) = setup(5, 0).await;

        assert!(matches!(
            cache.load(-1.0).await,
            Err(NarrationError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            cache.scrub(f64::NAN).await,
            Err(NarrationError::InvalidTimestamp(_))
        ));
        assert_eq!(store.chunk_lookups(), 0);
    }

    #[tokio::test]
    async fn test_prefetch_loads_following_chunks() {
        let (store, cache) = setup(5, 2).await;

        cache.load(0.0).await.unwrap();
        assert_eq!(store.chunk_lookups(), 3);

        cache.load(10.0).await.unwrap();
        cache.load(29.9).await.unwrap();
        assert_eq!(store.chunk_lookups(), 3);
        assert_eq!(cache.stats().await.entries, 3);
    }

    #[tokio::test]
    async fn test_prefetch_stops_at_end_of_book() {
        let (store, cache) = setup(5, 4).await;

        cache.load(10.0).await.unwrap();
        // B 命中后取 C，再取 30.0 得到 None
        assert_eq!(store.chunk_lookups(), 3);
        assert_eq!(cache.stats().await.entries, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_loads_stay_within_capacity() {
        let (store, cache) = setup(2, 0).await;
        let cache = Arc::new(cache);

        let mut handles = Vec::new();
        for i in 0..32u32 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                let timestamp = f64::from(i % 30) + 0.5;
                if i % 2 == 0 {
                    cache.load(timestamp).await.map(|_| ())
                } else {
                    cache.scrub(timestamp).await.map(|_| ())
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stats = cache.stats().await;
        assert!(stats.entries <= 2);
        assert_eq!(stats.hit_count + stats.miss_count, 32);
        // 未开启预取时每次未命中恰好查询一次
        assert_eq!(stats.miss_count, store.chunk_lookups() as u64);
    }

    #[tokio::test]
    async fn test_zero_capacity_is_clamped() {
        let (_, cache) = setup(0, 0).await;

        cache.load(0.0).await.unwrap();
        cache.load(10.0).await.unwrap();
        let stats = cache.stats().await;
        assert_eq!(stats.capacity, 1);
        assert_eq!(stats.entries, 1);
    }
}

//! Narration Registry - 当前播放书籍的缓存
//!
//! 进程内只保留一个活动缓存；切换书籍时丢弃旧实例

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::LruNarrationCache;
use crate::application::ports::{BookRepositoryPort, NarrationCachePort, NarrationRegistryPort};

/// 缓存参数
#[derive(Debug, Clone, Copy)]
pub struct NarrationCacheSettings {
    pub capacity: usize,
    pub prefetch_ahead: usize,
}

impl Default for NarrationCacheSettings {
    fn default() -> Self {
        Self {
            capacity: 5,
            prefetch_ahead: 0,
        }
    }
}

/// 活动书籍缓存注册表
pub struct NarrationRegistry {
    repository: Arc<dyn BookRepositoryPort>,
    settings: NarrationCacheSettings,
    active: Mutex<Option<Arc<dyn NarrationCachePort>>>,
}

impl NarrationRegistry {
    pub fn new(repository: Arc<dyn BookRepositoryPort>, settings: NarrationCacheSettings) -> Self {
        Self {
            repository,
            settings,
            active: Mutex::new(None),
        }
    }
}

#[async_trait]
impl NarrationRegistryPort for NarrationRegistry {
    async fn activate(&self, book_id: Uuid) -> Arc<dyn NarrationCachePort> {
        let mut active = self.active.lock().await;

        if let Some(cache) = active.as_ref() {
            if cache.book_id() == book_id {
                return cache.clone();
            }
            tracing::info!(
                previous = %cache.book_id(),
                book_id = %book_id,
                "Switching active book, dropping narration cache"
            );
        }

        let cache: Arc<dyn NarrationCachePort> = Arc::new(LruNarrationCache::new(
            book_id,
            self.settings.capacity,
            self.settings.prefetch_ahead,
            self.repository.clone(),
        ));
        *active = Some(cache.clone());
        cache
    }

    async fn current(&self) -> Option<Arc<dyn NarrationCachePort>> {
        self.active.lock().await.clone()
    }

    async fn deactivate(&self) {
        if let Some(cache) = self.active.lock().await.take() {
            tracing::info!(book_id = %cache.book_id(), "Narration cache deactivated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::book_store::fixtures::book_with_audio;
    use crate::infrastructure::memory::InMemoryBookStore;

    #[tokio::test]
    async fn test_same_book_reuses_cache() {
        let store = Arc::new(InMemoryBookStore::new());
        let (book_id, _) = book_with_audio(&store, &[5.0]).await;
        let registry = NarrationRegistry::new(store.clone(), NarrationCacheSettings::default());

        let first = registry.activate(book_id).await;
        first.load(1.0).await.unwrap();
        let second = registry.activate(book_id).await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.stats().await.entries, 1);
    }

    #[tokio::test]
    async fn test_switching_books_replaces_cache() {
        let store = Arc::new(InMemoryBookStore::new());
        let (first_book, _) = book_with_audio(&store, &[5.0]).await;
        let (second_book, _) = book_with_audio(&store, &[5.0]).await;
        let registry = NarrationRegistry::new(store.clone(), NarrationCacheSettings::default());

        registry.activate(first_book).await.load(1.0).await.unwrap();
        let cache = registry.activate(second_book).await;

        assert_eq!(cache.book_id(), second_book);
        assert_eq!(cache.stats().await.entries, 0);
        assert_eq!(registry.current().await.map(|c| c.book_id()), Some(second_book));

        registry.deactivate().await;
        assert!(registry.current().await.is_none());
    }
}

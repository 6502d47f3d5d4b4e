//! Narration Query Handlers
//!
//! 播放控制：按时间戳取音频、拖动、回退、跳页、恢复阅读位置

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{
    BookRepositoryPort, CachedChunk, NarrationRegistryPort, ReadingStateRepositoryPort,
};
use crate::application::queries::narration_queries::{
    AudioResponse, GetReadingPosition, JumpToPageQuery, LoadAudioQuery, RewindQuery, ScrubQuery,
};
use crate::domain::ReadingPosition;

fn to_response(chunk: CachedChunk, offset_secs: f64, content_type: &str) -> AudioResponse {
    AudioResponse {
        audio_data: chunk.audio_data,
        content_type: content_type.to_string(),
        page_number: chunk.page_number,
        start_secs: chunk.start_secs,
        duration_secs: chunk.duration_secs,
        offset_secs,
    }
}

// ============================================================================
// LoadAudio
// ============================================================================

pub struct LoadAudioHandler {
    registry: Arc<dyn NarrationRegistryPort>,
    content_type: String,
}

impl LoadAudioHandler {
    pub fn new(registry: Arc<dyn NarrationRegistryPort>, content_type: impl Into<String>) -> Self {
        Self {
            registry,
            content_type: content_type.into(),
        }
    }

    pub async fn handle(&self, query: LoadAudioQuery) -> Result<AudioResponse, ApplicationError> {
        let cache = self.registry.activate(query.book_id).await;
        let chunk = cache.load(query.timestamp).await?;
        let offset_secs = (query.timestamp - chunk.start_secs).max(0.0);
        Ok(to_response(chunk, offset_secs, &self.content_type))
    }
}

// ============================================================================
// Scrub / Rewind
// ============================================================================

pub struct ScrubHandler {
    registry: Arc<dyn NarrationRegistryPort>,
    content_type: String,
}

impl ScrubHandler {
    pub fn new(registry: Arc<dyn NarrationRegistryPort>, content_type: impl Into<String>) -> Self {
        Self {
            registry,
            content_type: content_type.into(),
        }
    }

    pub async fn handle(&self, query: ScrubQuery) -> Result<AudioResponse, ApplicationError> {
        let cache = self.registry.activate(query.book_id).await;
        let result = cache.scrub(query.timestamp).await?;

        tracing::debug!(
            book_id = %query.book_id,
            timestamp = query.timestamp,
            page_number = result.chunk.page_number,
            offset_secs = result.offset_secs,
            "Scrubbed"
        );

        Ok(to_response(result.chunk, result.offset_secs, &self.content_type))
    }
}

pub struct RewindHandler {
    scrub: ScrubHandler,
}

impl RewindHandler {
    pub fn new(registry: Arc<dyn NarrationRegistryPort>, content_type: impl Into<String>) -> Self {
        Self {
            scrub: ScrubHandler::new(registry, content_type),
        }
    }

    pub async fn handle(&self, query: RewindQuery) -> Result<AudioResponse, ApplicationError> {
        if !query.seconds.is_finite() || query.seconds < 0.0 {
            return Err(ApplicationError::validation(format!(
                "Rewind seconds must be a non-negative number, got {}",
                query.seconds
            )));
        }

        let target = (query.timestamp - query.seconds).max(0.0);
        self.scrub
            .handle(ScrubQuery {
                book_id: query.book_id,
                timestamp: target,
            })
            .await
    }
}

// ============================================================================
// JumpToPage
// ============================================================================

pub struct JumpToPageHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
    load: LoadAudioHandler,
}

impl JumpToPageHandler {
    pub fn new(
        book_repo: Arc<dyn BookRepositoryPort>,
        registry: Arc<dyn NarrationRegistryPort>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            book_repo,
            load: LoadAudioHandler::new(registry, content_type),
        }
    }

    pub async fn handle(&self, query: JumpToPageQuery) -> Result<AudioResponse, ApplicationError> {
        let start = self
            .book_repo
            .find_page_audio_start(query.book_id, query.page_number)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Page audio", query.book_id))?;

        self.load
            .handle(LoadAudioQuery {
                book_id: query.book_id,
                timestamp: start,
            })
            .await
    }
}

// ============================================================================
// GetReadingPosition
// ============================================================================

pub struct GetReadingPositionHandler {
    reading_state_repo: Arc<dyn ReadingStateRepositoryPort>,
}

impl GetReadingPositionHandler {
    pub fn new(reading_state_repo: Arc<dyn ReadingStateRepositoryPort>) -> Self {
        Self { reading_state_repo }
    }

    pub async fn handle(
        &self,
        query: GetReadingPosition,
    ) -> Result<Option<ReadingPosition>, ApplicationError> {
        Ok(self
            .reading_state_repo
            .find_reading_position(query.user_id, query.book_id)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::book_store::fixtures::book_with_audio;
    use crate::infrastructure::memory::{InMemoryBookStore, NarrationCacheSettings, NarrationRegistry};
    use uuid::Uuid;

    async fn setup() -> (Arc<InMemoryBookStore>, Arc<NarrationRegistry>, Uuid) {
        let store = Arc::new(InMemoryBookStore::new());
        let (book_id, _) = book_with_audio(&store, &[10.0, 10.0, 10.0]).await;
        let registry = Arc::new(NarrationRegistry::new(
            store.clone(),
            NarrationCacheSettings::default(),
        ));
        (store, registry, book_id)
    }

    #[tokio::test]
    async fn test_load_returns_chunk_and_offset() {
        let (_, registry, book_id) = setup().await;
        let handler = LoadAudioHandler::new(registry, "audio/mpeg");

        let response = handler
            .handle(LoadAudioQuery {
                book_id,
                timestamp: 23.0,
            })
            .await
            .unwrap();

        assert_eq!(response.page_number, 3);
        assert_eq!(response.content_type, "audio/mpeg");
        assert_eq!(response.start_secs, 20.0);
        assert!((response.offset_secs - 3.0).abs() < 1e-9);
        assert_eq!(response.audio_data.as_slice(), &[2u8; 4]);
    }

    #[tokio::test]
    async fn test_load_past_end_is_not_found() {
        let (_, registry, book_id) = setup().await;
        let handler = LoadAudioHandler::new(registry, "audio/mpeg");

        let err = handler
            .handle(LoadAudioQuery {
                book_id,
                timestamp: 31.0,
            })
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_rewind_clamps_at_zero() {
        let (_, registry, book_id) = setup().await;
        let handler = RewindHandler::new(registry, "audio/mpeg");

        let response = handler
            .handle(RewindQuery {
                book_id,
                timestamp: 12.0,
                seconds: 30.0,
            })
            .await
            .unwrap();
        assert_eq!(response.page_number, 1);
        assert_eq!(response.offset_secs, 0.0);

        let invalid = handler
            .handle(RewindQuery {
                book_id,
                timestamp: 12.0,
                seconds: -1.0,
            })
            .await;
        assert!(matches!(invalid, Err(ApplicationError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_scrub_reuses_cached_interval() {
        let (store, registry, book_id) = setup().await;
        let handler = ScrubHandler::new(registry, "audio/mpeg");

        handler.handle(ScrubQuery { book_id, timestamp: 10.0 }).await.unwrap();
        let response = handler.handle(ScrubQuery { book_id, timestamp: 19.5 }).await.unwrap();

        assert_eq!(response.page_number, 2);
        assert!((response.offset_secs - 9.5).abs() < 1e-9);
        assert_eq!(store.chunk_lookups(), 1);
    }

    #[tokio::test]
    async fn test_jump_to_page() {
        let (store, registry, book_id) = setup().await;
        let handler = JumpToPageHandler::new(store.clone(), registry, "audio/mpeg");

        let response = handler
            .handle(JumpToPageQuery {
                book_id,
                page_number: 2,
            })
            .await
            .unwrap();
        assert_eq!(response.start_secs, 10.0);
        assert_eq!(response.offset_secs, 0.0);

        let missing = handler
            .handle(JumpToPageQuery {
                book_id,
                page_number: 9,
            })
            .await;
        assert!(matches!(missing, Err(ApplicationError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_get_reading_position() {
        let (store, _, book_id) = setup().await;
        let user_id = Uuid::new_v4();
        let handler = GetReadingPositionHandler::new(store.clone());

        let query = GetReadingPosition { user_id, book_id };
        assert!(handler.handle(query).await.unwrap().is_none());

        store
            .update_reading_position(user_id, book_id, &ReadingPosition::new(2, 1.5, 10.0))
            .await
            .unwrap();
        let position = handler.handle(query).await.unwrap().unwrap();
        assert_eq!(position.page_number, 2);
    }
}

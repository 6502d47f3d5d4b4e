//! Interrupt Handler - 播放中断时回写阅读位置

use std::sync::Arc;

use crate::application::commands::InterruptNarration;
use crate::application::error::ApplicationError;
use crate::application::ports::{BookRepositoryPort, ReadingStateRepositoryPort};
use crate::domain::ReadingPosition;

pub struct InterruptHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
    reading_state_repo: Arc<dyn ReadingStateRepositoryPort>,
}

impl InterruptHandler {
    pub fn new(
        book_repo: Arc<dyn BookRepositoryPort>,
        reading_state_repo: Arc<dyn ReadingStateRepositoryPort>,
    ) -> Self {
        Self {
            book_repo,
            reading_state_repo,
        }
    }

    /// 时间戳无对应音频块时不写入，返回 None
    pub async fn handle(
        &self,
        command: InterruptNarration,
    ) -> Result<Option<ReadingPosition>, ApplicationError> {
        let InterruptNarration {
            user_id,
            book_id,
            timestamp,
        } = command;

        if !timestamp.is_finite() || timestamp < 0.0 {
            tracing::debug!(book_id = %book_id, timestamp, "Interrupt with invalid timestamp ignored");
            return Ok(None);
        }

        let Some(lookup) = self
            .book_repo
            .get_chunk_for_timestamp(book_id, timestamp)
            .await?
        else {
            tracing::debug!(book_id = %book_id, timestamp, "No chunk at interrupt timestamp, position unchanged");
            return Ok(None);
        };

        let position = ReadingPosition::new(
            lookup.chunk.page_number,
            lookup.chunk.audio.chapter_offset_secs + lookup.relative_position,
            lookup.chunk.audio.duration_secs,
        );

        self.reading_state_repo
            .update_reading_position(user_id, book_id, &position)
            .await?;

        tracing::info!(
            user_id = %user_id,
            book_id = %book_id,
            page_number = position.page_number,
            chapter_timestamp = position.chapter_timestamp,
            "Reading position saved"
        );

        Ok(Some(position))
    }
}

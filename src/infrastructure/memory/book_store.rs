//! In-Memory Book Store Implementation
//!
//! 同时实现 BookRepositoryPort 与 ReadingStateRepositoryPort，用于测试和无数据库运行

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

use crate::application::ports::{
    AudioChunk, BookRecord, BookRepositoryPort, ChunkLookup, PageAudioRecord, PageRecord,
    ReadingStateRepositoryPort, RepositoryError,
};
use crate::domain::ReadingPosition;

#[derive(Debug, Clone)]
struct StoredPage {
    record: PageRecord,
    audio: Option<PageAudioRecord>,
}

/// 内存书籍存储
pub struct InMemoryBookStore {
    books: DashMap<Uuid, BookRecord>,
    /// page_id -> StoredPage
    pages: DashMap<Uuid, StoredPage>,
    /// (user_id, book_id) -> ReadingPosition
    positions: DashMap<(Uuid, Uuid), ReadingPosition>,
    chunk_lookups: AtomicUsize,
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self {
            books: DashMap::new(),
            pages: DashMap::new(),
            positions: DashMap::new(),
            chunk_lookups: AtomicUsize::new(0),
        }
    }

    /// get_chunk_for_timestamp 被调用的次数
    pub fn chunk_lookups(&self) -> usize {
        self.chunk_lookups.load(Ordering::Relaxed)
    }

    /// 获取页面音频（测试断言用）
    pub fn page_audio(&self, page_id: Uuid) -> Option<PageAudioRecord> {
        self.pages.get(&page_id).and_then(|p| p.audio.clone())
    }

    fn book_pages(&self, book_id: Uuid) -> Vec<StoredPage> {
        let mut pages: Vec<StoredPage> = self
            .pages
            .iter()
            .filter(|entry| entry.record.book_id == book_id)
            .map(|entry| entry.value().clone())
            .collect();
        pages.sort_by_key(|p| p.record.page_number);
        pages
    }
}

impl Default for InMemoryBookStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookRepositoryPort for InMemoryBookStore {
    async fn save_book(&self, book: &BookRecord) -> Result<(), RepositoryError> {
        self.books.insert(book.id, book.clone());
        Ok(())
    }

    async fn find_book(&self, id: Uuid) -> Result<Option<BookRecord>, RepositoryError> {
        Ok(self.books.get(&id).map(|b| b.clone()))
    }

    async fn save_pages(&self, pages: &[PageRecord]) -> Result<(), RepositoryError> {
        for page in pages {
            // 同一本书同一页码视为更新
            let existing = self
                .pages
                .iter()
                .find(|entry| {
                    entry.record.book_id == page.book_id
                        && entry.record.page_number == page.page_number
                        && entry.record.id != page.id
                })
                .map(|entry| *entry.key());
            if let Some(old_id) = existing {
                self.pages.remove(&old_id);
            }

            self.pages.insert(
                page.id,
                StoredPage {
                    record: page.clone(),
                    audio: None,
                },
            );
        }
        Ok(())
    }

    async fn get_pages(
        &self,
        book_id: Uuid,
        start_page: u32,
        count: usize,
    ) -> Result<Vec<PageRecord>, RepositoryError> {
        Ok(self
            .book_pages(book_id)
            .into_iter()
            .filter(|p| p.record.page_number >= start_page)
            .take(count)
            .map(|p| p.record)
            .collect())
    }

    async fn get_chunk_for_timestamp(
        &self,
        book_id: Uuid,
        timestamp: f64,
    ) -> Result<Option<ChunkLookup>, RepositoryError> {
        self.chunk_lookups.fetch_add(1, Ordering::Relaxed);

        let found = self.book_pages(book_id).into_iter().find_map(|page| {
            page.audio
                .filter(|audio| audio.covers(timestamp))
                .map(|audio| AudioChunk {
                    page_id: page.record.id,
                    page_number: page.record.page_number,
                    chapter: page.record.chapter,
                    audio,
                })
        });

        Ok(found.map(|chunk| ChunkLookup {
            relative_position: timestamp - chunk.audio.book_offset_secs,
            chunk,
        }))
    }

    async fn find_page_audio_start(
        &self,
        book_id: Uuid,
        page_number: u32,
    ) -> Result<Option<f64>, RepositoryError> {
        Ok(self
            .book_pages(book_id)
            .into_iter()
            .find(|p| p.record.page_number == page_number)
            .and_then(|p| p.audio)
            .map(|audio| audio.book_offset_secs))
    }

    async fn save_page_audio(
        &self,
        page_id: Uuid,
        audio: &PageAudioRecord,
    ) -> Result<(), RepositoryError> {
        let mut page = self
            .pages
            .get_mut(&page_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("page {}", page_id)))?;
        page.audio = Some(audio.clone());
        Ok(())
    }

    async fn clear_page_audio(&self, page_id: Uuid) -> Result<(), RepositoryError> {
        let mut page = self
            .pages
            .get_mut(&page_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("page {}", page_id)))?;
        page.audio = None;
        Ok(())
    }
}

#[async_trait]
impl ReadingStateRepositoryPort for InMemoryBookStore {
    async fn update_reading_position(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        position: &ReadingPosition,
    ) -> Result<(), RepositoryError> {
        self.positions.insert((user_id, book_id), position.clone());
        Ok(())
    }

    async fn find_reading_position(
        &self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> Result<Option<ReadingPosition>, RepositoryError> {
        Ok(self.positions.get(&(user_id, book_id)).map(|p| p.clone()))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::Utc;

    /// 构造一本每页音频时长已知的书：pages[i] 覆盖 [sum(durations[..i]), +durations[i])
    pub async fn book_with_audio(store: &InMemoryBookStore, durations: &[f64]) -> (Uuid, Vec<Uuid>) {
        let book_id = Uuid::new_v4();
        store
            .save_book(&BookRecord {
                id: book_id,
                title: "Fixture".to_string(),
                total_pages: durations.len() as u32,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let mut page_ids = Vec::new();
        let mut offset = 0.0;
        for (i, duration) in durations.iter().enumerate() {
            let page = PageRecord {
                id: Uuid::new_v4(),
                book_id,
                page_number: i as u32 + 1,
                chapter: Some("1".to_string()),
                paragraphed_text: format!("Page {}.", i + 1),
            };
            store.save_pages(std::slice::from_ref(&page)).await.unwrap();
            store
                .save_page_audio(
                    page.id,
                    &PageAudioRecord {
                        audio_data: vec![i as u8; 4],
                        duration_secs: *duration,
                        chapter_offset_secs: offset,
                        book_offset_secs: offset,
                    },
                )
                .await
                .unwrap();
            offset += duration;
            page_ids.push(page.id);
        }

        (book_id, page_ids)
    }
}

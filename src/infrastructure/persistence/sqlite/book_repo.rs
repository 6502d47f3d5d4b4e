//! SQLite Book Repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::DbPool;
use crate::application::ports::{
    AudioChunk, BookRecord, BookRepositoryPort, ChunkLookup, PageAudioRecord, PageRecord,
    RepositoryError,
};

/// SQLite Book Repository
pub struct SqliteBookRepository {
    pool: DbPool,
}

impl SqliteBookRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_uuid(value: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(value).map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

#[derive(FromRow)]
struct BookRow {
    id: String,
    title: String,
    total_pages: i64,
    created_at: String,
}

impl TryFrom<BookRow> for BookRecord {
    type Error = RepositoryError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        Ok(BookRecord {
            id: parse_uuid(&row.id)?,
            title: row.title,
            total_pages: row.total_pages as u32,
            created_at: DateTime::parse_from_rfc3339(&row.created_at)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?
                .with_timezone(&Utc),
        })
    }
}

#[derive(FromRow)]
struct PageRow {
    id: String,
    book_id: String,
    page_number: i64,
    chapter: Option<String>,
    paragraphed_text: String,
}

impl TryFrom<PageRow> for PageRecord {
    type Error = RepositoryError;

    fn try_from(row: PageRow) -> Result<Self, Self::Error> {
        Ok(PageRecord {
            id: parse_uuid(&row.id)?,
            book_id: parse_uuid(&row.book_id)?,
            page_number: row.page_number as u32,
            chapter: row.chapter,
            paragraphed_text: row.paragraphed_text,
        })
    }
}

#[derive(FromRow)]
struct ChunkRow {
    id: String,
    page_number: i64,
    chapter: Option<String>,
    audio: Vec<u8>,
    audio_duration: f64,
    chapter_offset: f64,
    book_offset: f64,
}

impl TryFrom<ChunkRow> for AudioChunk {
    type Error = RepositoryError;

    fn try_from(row: ChunkRow) -> Result<Self, Self::Error> {
        Ok(AudioChunk {
            page_id: parse_uuid(&row.id)?,
            page_number: row.page_number as u32,
            chapter: row.chapter,
            audio: PageAudioRecord {
                audio_data: row.audio,
                duration_secs: row.audio_duration,
                chapter_offset_secs: row.chapter_offset,
                book_offset_secs: row.book_offset,
            },
        })
    }
}

#[async_trait]
impl BookRepositoryPort for SqliteBookRepository {
    async fn save_book(&self, book: &BookRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO books (id, title, total_pages, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                total_pages = excluded.total_pages
            "#,
        )
        .bind(book.id.to_string())
        .bind(&book.title)
        .bind(book.total_pages as i64)
        .bind(book.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_book(&self, id: Uuid) -> Result<Option<BookRecord>, RepositoryError> {
        let row: Option<BookRow> = sqlx::query_as(
            "SELECT id, title, total_pages, created_at FROM books WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(BookRecord::try_from).transpose()
    }

    async fn save_pages(&self, pages: &[PageRecord]) -> Result<(), RepositoryError> {
        if pages.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        for page in pages {
            sqlx::query(
                r#"
                INSERT INTO pages (id, book_id, page_number, chapter, paragraphed_text)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(book_id, page_number) DO UPDATE SET
                    id = excluded.id,
                    chapter = excluded.chapter,
                    paragraphed_text = excluded.paragraphed_text,
                    audio = NULL,
                    audio_duration = NULL,
                    chapter_offset = NULL,
                    book_offset = NULL
                "#,
            )
            .bind(page.id.to_string())
            .bind(page.book_id.to_string())
            .bind(page.page_number as i64)
            .bind(&page.chapter)
            .bind(&page.paragraphed_text)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn get_pages(
        &self,
        book_id: Uuid,
        start_page: u32,
        count: usize,
    ) -> Result<Vec<PageRecord>, RepositoryError> {
        let rows: Vec<PageRow> = sqlx::query_as(
            r#"
            SELECT id, book_id, page_number, chapter, paragraphed_text
            FROM pages
            WHERE book_id = ? AND page_number >= ?
            ORDER BY page_number
            LIMIT ?
            "#,
        )
        .bind(book_id.to_string())
        .bind(start_page as i64)
        .bind(count as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(PageRecord::try_from).collect()
    }

    async fn get_chunk_for_timestamp(
        &self,
        book_id: Uuid,
        timestamp: f64,
    ) -> Result<Option<ChunkLookup>, RepositoryError> {
        let row: Option<ChunkRow> = sqlx::query_as(
            r#"
            SELECT id, page_number, chapter, audio, audio_duration, chapter_offset, book_offset
            FROM pages
            WHERE book_id = ?
              AND audio IS NOT NULL
              AND book_offset <= ?
              AND ? < book_offset + audio_duration
            ORDER BY book_offset DESC
            LIMIT 1
            "#,
        )
        .bind(book_id.to_string())
        .bind(timestamp)
        .bind(timestamp)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let chunk = AudioChunk::try_from(row)?;
        let relative_position = timestamp - chunk.audio.book_offset_secs;
        Ok(Some(ChunkLookup {
            chunk,
            relative_position,
        }))
    }

    async fn find_page_audio_start(
        &self,
        book_id: Uuid,
        page_number: u32,
    ) -> Result<Option<f64>, RepositoryError> {
        let start: Option<(f64,)> = sqlx::query_as(
            r#"
            SELECT book_offset FROM pages
            WHERE book_id = ? AND page_number = ? AND audio IS NOT NULL AND book_offset IS NOT NULL
            "#,
        )
        .bind(book_id.to_string())
        .bind(page_number as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(start.map(|(offset,)| offset))
    }

    async fn save_page_audio(
        &self,
        page_id: Uuid,
        audio: &PageAudioRecord,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE pages
            SET audio = ?, audio_duration = ?, chapter_offset = ?, book_offset = ?
            WHERE id = ?
            "#,
        )
        .bind(&audio.audio_data)
        .bind(audio.duration_secs)
        .bind(audio.chapter_offset_secs)
        .bind(audio.book_offset_secs)
        .bind(page_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("page {}", page_id)));
        }

        Ok(())
    }

    async fn clear_page_audio(&self, page_id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE pages
            SET audio = NULL, audio_duration = NULL, chapter_offset = NULL, book_offset = NULL
            WHERE id = ?
            "#,
        )
        .bind(page_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("page {}", page_id)));
        }

        Ok(())
    }
}

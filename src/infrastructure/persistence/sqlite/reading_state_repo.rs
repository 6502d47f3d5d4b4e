//! SQLite Reading State Repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::DbPool;
use crate::application::ports::{ReadingStateRepositoryPort, RepositoryError};
use crate::domain::ReadingPosition;

/// SQLite Reading State Repository
pub struct SqliteReadingStateRepository {
    pool: DbPool,
}

impl SqliteReadingStateRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ReadingStateRow {
    page_number: i64,
    chapter_timestamp: f64,
    chunk_duration: f64,
    updated_at: String,
}

impl TryFrom<ReadingStateRow> for ReadingPosition {
    type Error = RepositoryError;

    fn try_from(row: ReadingStateRow) -> Result<Self, Self::Error> {
        Ok(ReadingPosition {
            page_number: row.page_number as u32,
            chapter_timestamp: row.chapter_timestamp,
            chunk_duration: row.chunk_duration,
            updated_at: DateTime::parse_from_rfc3339(&row.updated_at)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?
                .with_timezone(&Utc),
        })
    }
}

#[async_trait]
impl ReadingStateRepositoryPort for SqliteReadingStateRepository {
    async fn update_reading_position(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        position: &ReadingPosition,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO user_book_states (user_id, book_id, page_number, chapter_timestamp, chunk_duration, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, book_id) DO UPDATE SET
                page_number = excluded.page_number,
                chapter_timestamp = excluded.chapter_timestamp,
                chunk_duration = excluded.chunk_duration,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id.to_string())
        .bind(book_id.to_string())
        .bind(position.page_number as i64)
        .bind(position.chapter_timestamp)
        .bind(position.chunk_duration)
        .bind(position.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_reading_position(
        &self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> Result<Option<ReadingPosition>, RepositoryError> {
        let row: Option<ReadingStateRow> = sqlx::query_as(
            r#"
            SELECT page_number, chapter_timestamp, chunk_duration, updated_at
            FROM user_book_states
            WHERE user_id = ? AND book_id = ?
            "#,
        )
        .bind(user_id.to_string())
        .bind(book_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(ReadingPosition::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{BookRecord, BookRepositoryPort};
    use crate::infrastructure::persistence::sqlite::{
        create_pool, run_migrations, DatabaseConfig, SqliteBookRepository,
    };

    #[tokio::test]
    async fn test_position_is_last_write_wins() {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let book = BookRecord {
            id: Uuid::new_v4(),
            title: "Book".to_string(),
            total_pages: 1,
            created_at: Utc::now(),
        };
        SqliteBookRepository::new(pool.clone()).save_book(&book).await.unwrap();

        let repo = SqliteReadingStateRepository::new(pool);
        let user_id = Uuid::new_v4();
        assert!(repo.find_reading_position(user_id, book.id).await.unwrap().is_none());

        repo.update_reading_position(user_id, book.id, &ReadingPosition::new(1, 3.0, 10.0))
            .await
            .unwrap();
        repo.update_reading_position(user_id, book.id, &ReadingPosition::new(4, 7.5, 12.0))
            .await
            .unwrap();

        let position = repo.find_reading_position(user_id, book.id).await.unwrap().unwrap();
        assert_eq!(position.page_number, 4);
        assert_eq!(position.chapter_timestamp, 7.5);
        assert_eq!(position.chunk_duration, 12.0);
    }
}

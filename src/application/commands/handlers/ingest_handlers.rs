//! Ingest Book Handler
//!
//! 保存书籍与页面后立即返回，音频合成交给后台队列

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::application::commands::IngestBook;
use crate::application::error::ApplicationError;
use crate::application::ports::{BookRecord, BookRepositoryPort, PageRecord};

/// 导入响应（此时尚无音频）
#[derive(Debug, Clone)]
pub struct IngestBookResponse {
    pub book_id: Uuid,
    pub total_pages: u32,
}

pub struct IngestBookHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
    pipeline_queue: mpsc::Sender<Uuid>,
}

impl IngestBookHandler {
    pub fn new(book_repo: Arc<dyn BookRepositoryPort>, pipeline_queue: mpsc::Sender<Uuid>) -> Self {
        Self {
            book_repo,
            pipeline_queue,
        }
    }

    pub async fn handle(&self, command: IngestBook) -> Result<IngestBookResponse, ApplicationError> {
        let title = command.title.trim();
        if title.is_empty() {
            return Err(ApplicationError::validation("Book title must not be empty"));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = command
            .pages
            .iter()
            .find(|p| !seen.insert(p.page_number))
        {
            return Err(ApplicationError::validation(format!(
                "Duplicate page number: {}",
                dup.page_number
            )));
        }

        let book_id = Uuid::new_v4();
        let total_pages = command.pages.len() as u32;

        let book = BookRecord {
            id: book_id,
            title: title.to_string(),
            total_pages,
            created_at: Utc::now(),
        };

        let pages: Vec<PageRecord> = command
            .pages
            .into_iter()
            .map(|p| PageRecord {
                id: Uuid::new_v4(),
                book_id,
                page_number: p.page_number,
                chapter: p.chapter,
                paragraphed_text: p.paragraphs.join("\n"),
            })
            .collect();

        self.book_repo.save_book(&book).await?;
        self.book_repo.save_pages(&pages).await?;

        tracing::info!(
            book_id = %book_id,
            title = %book.title,
            total_pages,
            "Book ingested"
        );

        if let Err(e) = self.pipeline_queue.try_send(book_id) {
            tracing::warn!(book_id = %book_id, error = %e, "Failed to enqueue book for narration");
        }

        Ok(IngestBookResponse {
            book_id,
            total_pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::IngestPage;
    use crate::infrastructure::memory::InMemoryBookStore;

    fn page(number: u32, text: &str) -> IngestPage {
        IngestPage {
            page_number: number,
            chapter: Some("1".to_string()),
            paragraphs: vec![text.to_string(), "Second.".to_string()],
        }
    }

    #[tokio::test]
    async fn test_ingest_saves_pages_and_enqueues() {
        let store = Arc::new(InMemoryBookStore::new());
        let (tx, mut rx) = mpsc::channel(4);
        let handler = IngestBookHandler::new(store.clone(), tx);

        let response = handler
            .handle(IngestBook {
                title: "  Moby Dick ".to_string(),
                pages: vec![page(1, "Call me Ishmael."), page(2, "Some years ago.")],
            })
            .await
            .unwrap();

        assert_eq!(response.total_pages, 2);
        assert_eq!(rx.try_recv().unwrap(), response.book_id);

        let book = store.find_book(response.book_id).await.unwrap().unwrap();
        assert_eq!(book.title, "Moby Dick");

        let pages = store.get_pages(response.book_id, 0, 10).await.unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].paragraphs(), vec!["Call me Ishmael.", "Second."]);
    }

    #[tokio::test]
    async fn test_duplicate_page_numbers_are_rejected() {
        let store = Arc::new(InMemoryBookStore::new());
        let (tx, _rx) = mpsc::channel(4);
        let handler = IngestBookHandler::new(store, tx);

        let result = handler
            .handle(IngestBook {
                title: "Book".to_string(),
                pages: vec![page(1, "A."), page(1, "B.")],
            })
            .await;

        assert!(matches!(result, Err(ApplicationError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_closed_queue_does_not_fail_ingest() {
        let store = Arc::new(InMemoryBookStore::new());
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handler = IngestBookHandler::new(store, tx);

        let result = handler
            .handle(IngestBook {
                title: "Book".to_string(),
                pages: vec![page(1, "A.")],
            })
            .await;

        assert!(result.is_ok());
    }
}

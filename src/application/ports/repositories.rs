//! Repository Ports - 出站端口
//!
//! 定义数据持久化的抽象接口
//! 具体实现在 infrastructure 层（SQLite / 内存）

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{split_paragraphs, ReadingPosition};

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// ============================================================================
// Book Repository
// ============================================================================

/// 书籍实体（用于持久化）
#[derive(Debug, Clone)]
pub struct BookRecord {
    pub id: Uuid,
    pub title: String,
    pub total_pages: u32,
    pub created_at: DateTime<Utc>,
}

/// 页面实体
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: Uuid,
    pub book_id: Uuid,
    pub page_number: u32,
    pub chapter: Option<String>,
    /// 以换行分隔段落的页面文本
    pub paragraphed_text: String,
}

impl PageRecord {
    /// 页面的段落序列（已丢弃空段落）
    pub fn paragraphs(&self) -> Vec<&str> {
        split_paragraphs(&self.paragraphed_text)
    }
}

/// 页面音频记录
#[derive(Debug, Clone, PartialEq)]
pub struct PageAudioRecord {
    pub audio_data: Vec<u8>,
    pub duration_secs: f64,
    /// 页面在章节内的起始偏移
    pub chapter_offset_secs: f64,
    /// 页面在全书内的起始偏移
    pub book_offset_secs: f64,
}

impl PageAudioRecord {
    /// 时间戳是否落在 [start, start + duration) 内
    pub fn covers(&self, timestamp: f64) -> bool {
        timestamp >= self.book_offset_secs
            && timestamp < self.book_offset_secs + self.duration_secs
    }
}

/// 已合成的音频块（一页）
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub page_id: Uuid,
    pub page_number: u32,
    pub chapter: Option<String>,
    pub audio: PageAudioRecord,
}

/// 时间戳查询结果
#[derive(Debug, Clone)]
pub struct ChunkLookup {
    pub chunk: AudioChunk,
    /// 时间戳相对于音频块起点的偏移（秒）
    pub relative_position: f64,
}

/// Book Repository Port
#[async_trait]
pub trait BookRepositoryPort: Send + Sync {
    /// 保存书籍
    async fn save_book(&self, book: &BookRecord) -> Result<(), RepositoryError>;

    /// 根据 ID 查找书籍
    async fn find_book(&self, id: Uuid) -> Result<Option<BookRecord>, RepositoryError>;

    /// 保存页面（同一本书内 page_number 唯一）
    async fn save_pages(&self, pages: &[PageRecord]) -> Result<(), RepositoryError>;

    /// 按页码升序获取从 start_page 开始的最多 count 页
    async fn get_pages(
        &self,
        book_id: Uuid,
        start_page: u32,
        count: usize,
    ) -> Result<Vec<PageRecord>, RepositoryError>;

    /// 查找覆盖指定时间戳的音频块
    ///
    /// 没有音频块覆盖时返回 `Ok(None)`，不报错
    async fn get_chunk_for_timestamp(
        &self,
        book_id: Uuid,
        timestamp: f64,
    ) -> Result<Option<ChunkLookup>, RepositoryError>;

    /// 获取页面音频在全书内的起始偏移（页面尚无音频时返回 None）
    async fn find_page_audio_start(
        &self,
        book_id: Uuid,
        page_number: u32,
    ) -> Result<Option<f64>, RepositoryError>;

    /// 保存页面音频
    async fn save_page_audio(
        &self,
        page_id: Uuid,
        audio: &PageAudioRecord,
    ) -> Result<(), RepositoryError>;

    /// 清除页面音频，页面不再参与时间戳查找
    async fn clear_page_audio(&self, page_id: Uuid) -> Result<(), RepositoryError>;
}

// ============================================================================
// Reading State Repository
// ============================================================================

/// Reading State Repository Port
#[async_trait]
pub trait ReadingStateRepositoryPort: Send + Sync {
    /// 覆盖写入用户在某本书中的阅读位置（后写覆盖先写）
    async fn update_reading_position(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        position: &ReadingPosition,
    ) -> Result<(), RepositoryError>;

    /// 获取用户在某本书中的阅读位置
    async fn find_reading_position(
        &self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> Result<Option<ReadingPosition>, RepositoryError>;
}

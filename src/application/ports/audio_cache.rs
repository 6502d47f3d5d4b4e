//! Narration Cache Port - 播放音频缓存
//!
//! 定义按时间戳取音频的缓存抽象，具体实现为内存 LRU

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::repositories::AudioChunk;

/// Narration Cache 错误
#[derive(Debug, Error)]
pub enum NarrationError {
    /// 时间戳不在任何已合成的音频块内（超出书尾或该区域尚未合成）
    #[error("No audio chunk covers timestamp {timestamp} in book {book_id}")]
    ChunkNotFound { book_id: Uuid, timestamp: f64 },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(f64),

    #[error("Repository error: {0}")]
    RepositoryError(String),
}

impl From<super::RepositoryError> for NarrationError {
    fn from(err: super::RepositoryError) -> Self {
        Self::RepositoryError(err.to_string())
    }
}

/// 缓存 key：音频块在全书内的起点（毫秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey(u64);

impl ChunkKey {
    pub fn from_secs(start_secs: f64) -> Self {
        Self((start_secs.max(0.0) * 1000.0).round() as u64)
    }
}

impl std::fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// 缓存条目
#[derive(Debug, Clone)]
pub struct CachedChunk {
    pub key: ChunkKey,
    pub page_id: Uuid,
    pub page_number: u32,
    pub start_secs: f64,
    pub duration_secs: f64,
    pub audio_data: Arc<Vec<u8>>,
}

impl CachedChunk {
    /// 时间戳是否落在 [start, start + duration) 内
    pub fn contains(&self, timestamp: f64) -> bool {
        timestamp >= self.start_secs && timestamp < self.start_secs + self.duration_secs
    }

    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.duration_secs
    }
}

impl From<AudioChunk> for CachedChunk {
    fn from(chunk: AudioChunk) -> Self {
        Self {
            key: ChunkKey::from_secs(chunk.audio.book_offset_secs),
            page_id: chunk.page_id,
            page_number: chunk.page_number,
            start_secs: chunk.audio.book_offset_secs,
            duration_secs: chunk.audio.duration_secs,
            audio_data: Arc::new(chunk.audio.audio_data),
        }
    }
}

/// 拖动进度的结果
#[derive(Debug, Clone)]
pub struct ScrubResult {
    pub chunk: CachedChunk,
    /// 时间戳在音频块内的偏移（秒）
    pub offset_secs: f64,
}

/// 缓存统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hit_count: u64,
    pub miss_count: u64,
    pub eviction_count: u64,
}

/// Narration Cache Port
///
/// 每个实例只服务一本书；换书时整体替换实例
#[async_trait]
pub trait NarrationCachePort: Send + Sync {
    /// 缓存所属的书籍
    fn book_id(&self) -> Uuid;

    /// 取覆盖时间戳的音频块
    ///
    /// 命中时提升为最近使用，不访问持久层；未命中时查询持久层并写入缓存
    async fn load(&self, timestamp: f64) -> Result<CachedChunk, NarrationError>;

    /// 拖动到时间戳：先在已缓存区间内查找，再走未命中路径
    async fn scrub(&self, timestamp: f64) -> Result<ScrubResult, NarrationError>;

    /// 获取缓存统计信息
    async fn stats(&self) -> CacheStats;
}

/// 活动缓存注册表 Port
///
/// 进程内只有一本书处于播放状态
#[async_trait]
pub trait NarrationRegistryPort: Send + Sync {
    /// 获取指定书籍的缓存，书籍不同则替换当前实例
    async fn activate(&self, book_id: Uuid) -> Arc<dyn NarrationCachePort>;

    /// 当前活动缓存
    async fn current(&self) -> Option<Arc<dyn NarrationCachePort>>;

    /// 丢弃当前活动缓存
    async fn deactivate(&self);
}

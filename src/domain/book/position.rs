//! Book Context - 阅读位置

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 用户在一本书中的续播位置
///
/// `chapter_timestamp` 为章节内的秒数，`chunk_duration` 为所在页音频总时长。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingPosition {
    pub page_number: u32,
    pub chapter_timestamp: f64,
    pub chunk_duration: f64,
    pub updated_at: DateTime<Utc>,
}

impl ReadingPosition {
    pub fn new(page_number: u32, chapter_timestamp: f64, chunk_duration: f64) -> Self {
        Self {
            page_number,
            chapter_timestamp,
            chunk_duration,
            updated_at: Utc::now(),
        }
    }
}

//! Narration Queries - 播放查询

use std::sync::Arc;
use uuid::Uuid;

/// 按时间戳取音频
#[derive(Debug, Clone, Copy)]
pub struct LoadAudioQuery {
    pub book_id: Uuid,
    pub timestamp: f64,
}

/// 拖动进度
#[derive(Debug, Clone, Copy)]
pub struct ScrubQuery {
    pub book_id: Uuid,
    pub timestamp: f64,
}

/// 从当前时间戳回退若干秒
#[derive(Debug, Clone, Copy)]
pub struct RewindQuery {
    pub book_id: Uuid,
    pub timestamp: f64,
    pub seconds: f64,
}

/// 跳转到指定页
#[derive(Debug, Clone, Copy)]
pub struct JumpToPageQuery {
    pub book_id: Uuid,
    pub page_number: u32,
}

/// 读取已保存的阅读位置
#[derive(Debug, Clone, Copy)]
pub struct GetReadingPosition {
    pub user_id: Uuid,
    pub book_id: Uuid,
}

/// 播放响应
#[derive(Debug, Clone)]
pub struct AudioResponse {
    pub audio_data: Arc<Vec<u8>>,
    pub content_type: String,
    pub page_number: u32,
    /// 音频块在全书内的起点
    pub start_secs: f64,
    pub duration_secs: f64,
    /// 请求时间戳在块内的偏移
    pub offset_secs: f64,
}

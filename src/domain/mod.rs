//! Domain Layer - 领域层
//!
//! - Book Context: 章节时间轴与阅读位置
//! - 文本分割器: 段落 → 合成缓冲区

pub mod book;

mod text_segmenter;

pub use book::{ChapterTimeline, ReadingPosition};
pub use text_segmenter::{
    segment, split_paragraphs, split_sentences, DEFAULT_MAX_CHARS,
};

//! Book Context - 书籍朗读上下文
//!
//! 职责:
//! - 章节内时间偏移累加
//! - 用户阅读位置

mod position;
mod timeline;

pub use position::ReadingPosition;
pub use timeline::ChapterTimeline;

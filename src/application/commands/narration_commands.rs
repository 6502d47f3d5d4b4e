//! Narration Commands

use uuid::Uuid;

/// 导入书籍中的一页
#[derive(Debug, Clone)]
pub struct IngestPage {
    pub page_number: u32,
    pub chapter: Option<String>,
    pub paragraphs: Vec<String>,
}

/// 导入书籍命令（页面已由外部提取）
#[derive(Debug, Clone)]
pub struct IngestBook {
    pub title: String,
    pub pages: Vec<IngestPage>,
}

/// 播放中断命令：记录读者停在的位置
#[derive(Debug, Clone, Copy)]
pub struct InterruptNarration {
    pub user_id: Uuid,
    pub book_id: Uuid,
    /// 全书时间戳（秒）
    pub timestamp: f64,
}

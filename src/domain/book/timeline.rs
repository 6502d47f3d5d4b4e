//! Book Context - 章节时间轴
//!
//! 按页码顺序折叠每页的音频时长，得到每页在章节内、全书内的起始偏移。

/// 章节偏移累加器
///
/// 不变量:
/// - 章节标签与上一页不同时，章节偏移归零
/// - 全书偏移只随成功合成的页面前进
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChapterTimeline {
    chapter: Option<String>,
    chapter_offset_secs: f64,
    book_offset_secs: f64,
    started: bool,
}

impl ChapterTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// 进入新的一页，章节变化时重置章节偏移
    pub fn enter(self, chapter: Option<&str>) -> Self {
        let changed = !self.started || self.chapter.as_deref() != chapter;
        if changed {
            Self {
                chapter: chapter.map(str::to_string),
                chapter_offset_secs: 0.0,
                book_offset_secs: self.book_offset_secs,
                started: true,
            }
        } else {
            self
        }
    }

    /// 当前页合成成功后，按时长前进
    pub fn advance(self, duration_secs: f64) -> Self {
        Self {
            chapter_offset_secs: self.chapter_offset_secs + duration_secs,
            book_offset_secs: self.book_offset_secs + duration_secs,
            ..self
        }
    }

    pub fn chapter(&self) -> Option<&str> {
        self.chapter.as_deref()
    }

    pub fn chapter_offset_secs(&self) -> f64 {
        self.chapter_offset_secs
    }

    pub fn book_offset_secs(&self) -> f64 {
        self.book_offset_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_accumulate_within_chapter() {
        let timeline = ChapterTimeline::new()
            .enter(Some("1"))
            .advance(10.0)
            .enter(Some("1"))
            .advance(5.0)
            .enter(Some("1"));

        assert_eq!(timeline.chapter_offset_secs(), 15.0);
        assert_eq!(timeline.book_offset_secs(), 15.0);
    }

    #[test]
    fn test_chapter_change_resets_chapter_offset_only() {
        let timeline = ChapterTimeline::new()
            .enter(Some("1"))
            .advance(10.0)
            .enter(Some("2"));

        assert_eq!(timeline.chapter(), Some("2"));
        assert_eq!(timeline.chapter_offset_secs(), 0.0);
        assert_eq!(timeline.book_offset_secs(), 10.0);
    }

    #[test]
    fn test_missing_label_counts_as_a_change() {
        let timeline = ChapterTimeline::new()
            .enter(Some("1"))
            .advance(3.0)
            .enter(None);
        assert_eq!(timeline.chapter_offset_secs(), 0.0);

        let timeline = timeline.advance(2.0).enter(None);
        assert_eq!(timeline.chapter_offset_secs(), 2.0);
        assert_eq!(timeline.book_offset_secs(), 5.0);
    }
}

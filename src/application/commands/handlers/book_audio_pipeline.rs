//! Book Audio Pipeline
//!
//! 导入后在后台运行：按页码顺序为整本书合成音频，
//! 折叠章节时间轴得到每页偏移，逐页写回持久层。
//! 单页失败只记录，不中止整本书。

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::PageAudioAssembler;
use crate::application::error::ApplicationError;
use crate::application::ports::{BookRepositoryPort, PageAudioRecord, PageRecord};
use crate::domain::ChapterTimeline;

/// 流水线参数
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// 每次从持久层读取的页数
    pub page_batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            page_batch_size: 50,
        }
    }
}

/// 单页失败记录
#[derive(Debug, Clone)]
pub struct PageFailure {
    pub page_id: Uuid,
    pub page_number: u32,
    pub reason: String,
}

/// 一次运行的结果
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub book_id: Uuid,
    pub pages_attempted: usize,
    pub pages_succeeded: usize,
    pub failures: Vec<PageFailure>,
    /// 成功页面的总时长
    pub total_duration_secs: f64,
    pub cancelled: bool,
}

impl PipelineReport {
    fn new(book_id: Uuid) -> Self {
        Self {
            book_id,
            pages_attempted: 0,
            pages_succeeded: 0,
            failures: Vec::new(),
            total_duration_secs: 0.0,
            cancelled: false,
        }
    }
}

pub struct BookAudioPipeline {
    book_repo: Arc<dyn BookRepositoryPort>,
    assembler: Arc<PageAudioAssembler>,
    config: PipelineConfig,
}

impl BookAudioPipeline {
    pub fn new(
        book_repo: Arc<dyn BookRepositoryPort>,
        assembler: Arc<PageAudioAssembler>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            book_repo,
            assembler,
            config,
        }
    }

    pub async fn run(
        &self,
        book_id: Uuid,
        cancel: CancellationToken,
    ) -> Result<PipelineReport, ApplicationError> {
        let book = self
            .book_repo
            .find_book(book_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Book", book_id))?;

        tracing::info!(book_id = %book_id, title = %book.title, "Book audio pipeline started");

        let batch_size = self.config.page_batch_size.max(1);
        let mut report = PipelineReport::new(book_id);
        let mut timeline = ChapterTimeline::new();
        let mut next_page: Option<u32> = Some(0);

        while let Some(start_page) = next_page {
            let batch = self
                .book_repo
                .get_pages(book_id, start_page, batch_size)
                .await?;
            if batch.len() < batch_size {
                next_page = None;
            }

            for page in batch {
                if cancel.is_cancelled() {
                    report.cancelled = true;
                    break;
                }
                if next_page.is_some() {
                    next_page = page.page_number.checked_add(1);
                }
                timeline = self.process_page(&page, timeline, &mut report).await;
            }

            if report.cancelled {
                break;
            }
        }

        if report.cancelled {
            tracing::warn!(
                book_id = %book_id,
                pages_attempted = report.pages_attempted,
                "Book audio pipeline cancelled"
            );
        } else {
            tracing::info!(
                book_id = %book_id,
                pages_attempted = report.pages_attempted,
                pages_succeeded = report.pages_succeeded,
                failures = report.failures.len(),
                total_duration_secs = report.total_duration_secs,
                "Book audio pipeline finished"
            );
        }

        Ok(report)
    }

    /// 处理单页，返回前进后的时间轴（失败页不前进）
    async fn process_page(
        &self,
        page: &PageRecord,
        timeline: ChapterTimeline,
        report: &mut PipelineReport,
    ) -> ChapterTimeline {
        let timeline = timeline.enter(page.chapter.as_deref());
        report.pages_attempted += 1;

        let assembled = match self.assembler.assemble(page).await {
            Ok(assembled) => assembled,
            Err(e) => {
                tracing::warn!(
                    page_id = %page.id,
                    page_number = page.page_number,
                    chapter = ?timeline.chapter(),
                    buffer_index = e.buffer_index,
                    error = %e.source,
                    "Page synthesis failed, skipping"
                );
                self.discard_page_audio(page).await;
                report.failures.push(PageFailure {
                    page_id: page.id,
                    page_number: page.page_number,
                    reason: e.to_string(),
                });
                return timeline;
            }
        };

        let duration_secs = assembled.duration_secs;
        let record = PageAudioRecord {
            audio_data: assembled.audio_data,
            duration_secs,
            chapter_offset_secs: timeline.chapter_offset_secs(),
            book_offset_secs: timeline.book_offset_secs(),
        };

        if let Err(e) = self.book_repo.save_page_audio(page.id, &record).await {
            tracing::warn!(
                page_id = %page.id,
                page_number = page.page_number,
                chapter = ?timeline.chapter(),
                error = %e,
                "Failed to persist page audio, skipping"
            );
            self.discard_page_audio(page).await;
            report.failures.push(PageFailure {
                page_id: page.id,
                page_number: page.page_number,
                reason: e.to_string(),
            });
            return timeline;
        }

        report.pages_succeeded += 1;
        report.total_duration_secs += duration_secs;
        timeline.advance(duration_secs)
    }

    /// 清除失败页上次运行残留的音频
    async fn discard_page_audio(&self, page: &PageRecord) {
        if let Err(e) = self.book_repo.clear_page_audio(page.id).await {
            tracing::warn!(
                page_id = %page.id,
                page_number = page.page_number,
                error = %e,
                "Failed to clear stale page audio"
            );
        }
    }
}

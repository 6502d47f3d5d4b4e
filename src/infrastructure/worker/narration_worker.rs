//! Narration Worker - Background Book Audio Processor

use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::commands::handlers::BookAudioPipeline;

/// Worker 配置
#[derive(Debug, Clone)]
pub struct NarrationWorkerConfig {
    /// 最大并发合成书籍数
    pub max_concurrent: usize,
}

impl Default for NarrationWorkerConfig {
    fn default() -> Self {
        Self { max_concurrent: 2 }
    }
}

/// 合成 Worker
///
/// 从队列消费书籍 ID，为每本书运行一次音频流水线
pub struct NarrationWorker {
    config: NarrationWorkerConfig,
    queue_receiver: mpsc::Receiver<Uuid>,
    pipeline: Arc<BookAudioPipeline>,
    cancel: CancellationToken,
}

impl NarrationWorker {
    pub fn new(
        config: NarrationWorkerConfig,
        queue_receiver: mpsc::Receiver<Uuid>,
        pipeline: Arc<BookAudioPipeline>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            queue_receiver,
            pipeline,
            cancel,
        }
    }

    /// 启动 Worker，队列关闭或取消后等待在途任务结束
    pub async fn run(mut self) {
        tracing::info!(
            max_concurrent = self.config.max_concurrent,
            "NarrationWorker started"
        );

        // 使用 semaphore 控制并发
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let mut in_flight = JoinSet::new();

        loop {
            let book_id = tokio::select! {
                _ = self.cancel.cancelled() => break,
                next = self.queue_receiver.recv() => match next {
                    Some(book_id) => book_id,
                    None => break,
                },
            };

            let permit = tokio::select! {
                _ = self.cancel.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to acquire semaphore permit");
                        break;
                    }
                },
            };

            let pipeline = self.pipeline.clone();
            let cancel = self.cancel.child_token();

            in_flight.spawn(async move {
                let _permit = permit; // 持有 permit 直到任务完成

                match pipeline.run(book_id, cancel).await {
                    Ok(report) if !report.failures.is_empty() => {
                        tracing::warn!(
                            book_id = %book_id,
                            failures = report.failures.len(),
                            pages_succeeded = report.pages_succeeded,
                            "Book narrated with page failures"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(book_id = %book_id, error = %e, "Book audio pipeline failed");
                    }
                }
            });

            // 回收已完成的任务
            while in_flight.try_join_next().is_some() {}
        }

        while let Some(result) = in_flight.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Pipeline task panicked");
            }
        }

        tracing::info!("NarrationWorker stopped");
    }
}

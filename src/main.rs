//! Narrator - 有声书朗读核心
//!
//! 用法: `narrator [BOOK_ID ...]`
//! 为给定书籍（重新）合成音频，完成后从 0 秒载入一次确认可播放，
//! 队列处理完毕或收到 Ctrl-C 后退出

use std::sync::Arc;

use narrator::application::commands::handlers::{
    AssemblerConfig, BookAudioPipeline, PageAudioAssembler, PipelineConfig,
};
use narrator::application::ports::{BookRepositoryPort, NarrationRegistryPort, TtsEnginePort};
use narrator::application::queries::handlers::LoadAudioHandler;
use narrator::application::queries::LoadAudioQuery;
use narrator::config::{load_config, print_config, LogConfig, TtsProvider};
use narrator::infrastructure::adapters::{
    FakeTtsClient, FakeTtsClientConfig, OpenAiTtsClient, OpenAiTtsClientConfig,
};
use narrator::infrastructure::memory::{NarrationCacheSettings, NarrationRegistry};
use narrator::infrastructure::persistence::sqlite::{
    create_pool, run_migrations, DatabaseConfig, SqliteBookRepository,
};
use narrator::infrastructure::worker::{NarrationWorker, NarrationWorkerConfig};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn init_logging(log: &LogConfig) {
    let log_filter = format!("{},narrator={}", log.level, log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if log.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_logging(&config.log);

    tracing::info!("Narrator - 有声书朗读核心");
    print_config(&config);

    // 确保数据目录存在
    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // 初始化数据库
    let db_config = DatabaseConfig {
        database_url: config.database.database_url(),
        max_connections: config.database.max_connections,
    };
    let pool = create_pool(&db_config).await?;
    run_migrations(&pool).await?;

    let book_repo: Arc<dyn BookRepositoryPort> = Arc::new(SqliteBookRepository::new(pool.clone()));

    // 创建 TTS 引擎
    let tts_engine: Arc<dyn TtsEnginePort> = match config.tts.provider {
        TtsProvider::Openai => {
            let tts_config = OpenAiTtsClientConfig {
                base_url: config.tts.url.clone(),
                api_key: config.tts.api_key.clone().unwrap_or_default(),
                model: config.tts.model.clone(),
                response_format: config.audio.format.as_str().to_string(),
                max_input_chars: config.narration.max_chars,
                timeout_secs: config.tts.timeout_secs,
            };
            Arc::new(OpenAiTtsClient::new(tts_config)?)
        }
        TtsProvider::Fake => Arc::new(FakeTtsClient::new(FakeTtsClientConfig::default())),
    };

    if !tts_engine.health_check().await {
        tracing::warn!(provider = %config.tts.provider, "TTS engine health check failed");
    }

    // 创建音频流水线
    let assembler = Arc::new(PageAudioAssembler::new(
        tts_engine,
        AssemblerConfig {
            max_chars: config.narration.max_chars,
            bitrate_bps: config.narration.bitrate_bps,
            voice: config.tts.voice.clone(),
        },
    ));
    let pipeline = Arc::new(BookAudioPipeline::new(
        book_repo.clone(),
        assembler,
        PipelineConfig {
            page_batch_size: config.pipeline.page_batch_size,
        },
    ));

    // 播放缓存注册表
    let registry: Arc<dyn NarrationRegistryPort> = Arc::new(NarrationRegistry::new(
        book_repo.clone(),
        NarrationCacheSettings {
            capacity: config.narration.cache_capacity,
            prefetch_ahead: config.narration.prefetch_ahead,
        },
    ));
    let load_audio = LoadAudioHandler::new(registry.clone(), config.audio.content_type());

    // 创建书籍队列与 Worker
    let (queue_tx, queue_rx) = mpsc::channel(config.pipeline.queue_capacity);
    let cancel = CancellationToken::new();
    let worker = NarrationWorker::new(
        NarrationWorkerConfig {
            max_concurrent: config.pipeline.max_concurrent_books,
        },
        queue_rx,
        pipeline,
        cancel.clone(),
    );
    let mut worker_handle = tokio::spawn(worker.run());

    let mut queued = Vec::new();
    for arg in std::env::args().skip(1) {
        let book_id = match Uuid::parse_str(&arg) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(arg = %arg, error = %e, "Ignoring invalid book id");
                continue;
            }
        };

        if book_repo.find_book(book_id).await?.is_none() {
            tracing::warn!(book_id = %book_id, "Book not found, skipping");
            continue;
        }

        queue_tx.send(book_id).await?;
        queued.push(book_id);
        tracing::info!(book_id = %book_id, "Book queued for narration");
    }

    // 关闭队列，Worker 处理完毕后退出
    drop(queue_tx);

    tokio::select! {
        result = &mut worker_handle => {
            result?;
            for book_id in queued {
                match load_audio.handle(LoadAudioQuery { book_id, timestamp: 0.0 }).await {
                    Ok(audio) => tracing::info!(
                        book_id = %book_id,
                        page_number = audio.page_number,
                        duration_secs = audio.duration_secs,
                        bytes = audio.audio_data.len(),
                        content_type = %audio.content_type,
                        "Book ready for playback"
                    ),
                    Err(e) => tracing::warn!(book_id = %book_id, error = %e, "Book has no playable audio"),
                }
            }
            registry.deactivate().await;
        }
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => {
                    tracing::info!("Received shutdown signal, cancelling in-flight books");
                    cancel.cancel();
                }
                Err(e) => tracing::error!(error = %e, "Failed to listen for ctrl-c"),
            }
            worker_handle.await?;
        }
    }

    pool.close().await;
    tracing::info!("Narrator shutdown complete");

    Ok(())
}

//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, TtsProvider};

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 环境变量前缀
const ENV_PREFIX: &str = "NARRATOR";

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `NARRATOR_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `NARRATOR_TTS__API_KEY=sk-...`
/// - `NARRATOR_TTS__PROVIDER=fake`
/// - `NARRATOR_NARRATION__CACHE_CAPACITY=8`
/// - `NARRATOR_DATABASE__PATH=/data/narrator.db`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    build_config(config_path, None)
}

/// `env` 为 None 时读取进程环境变量
fn build_config(
    config_path: Option<&Path>,
    env: Option<config::Map<String, String>>,
) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("tts.provider", "openai")?
        .set_default("tts.url", "https://api.openai.com")?
        .set_default("tts.model", "tts-1")?
        .set_default("tts.voice", "alloy")?
        .set_default("tts.timeout_secs", 120)?
        .set_default("audio.format", "mp3")?
        .set_default("narration.max_chars", 4096)?
        .set_default("narration.cache_capacity", 5)?
        .set_default("narration.bitrate_bps", 128_000)?
        .set_default("narration.prefetch_ahead", 0)?
        .set_default("pipeline.max_concurrent_books", 2)?
        .set_default("pipeline.page_batch_size", 50)?
        .set_default("pipeline.queue_capacity", 100)?
        .set_default("database.path", "data/narrator.db")?
        .set_default("database.max_connections", 5)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: NARRATOR_TTS__URL=http://tts-server:8000
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(env),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    let invalid = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));

    if config.tts.provider == TtsProvider::Openai {
        if config.tts.url.trim().is_empty() {
            return invalid("TTS URL cannot be empty");
        }
        if config
            .tts
            .api_key
            .as_deref()
            .map_or(true, |key| key.trim().is_empty())
        {
            return invalid("TTS API key is required for the openai provider");
        }
    }

    if config.narration.max_chars == 0 {
        return invalid("narration.max_chars cannot be 0");
    }
    if config.narration.cache_capacity == 0 {
        return invalid("narration.cache_capacity cannot be 0");
    }
    if config.narration.bitrate_bps == 0 {
        return invalid("narration.bitrate_bps cannot be 0");
    }

    if config.pipeline.max_concurrent_books == 0 {
        return invalid("pipeline.max_concurrent_books cannot be 0");
    }
    if config.pipeline.page_batch_size == 0 {
        return invalid("pipeline.page_batch_size cannot be 0");
    }
    if config.pipeline.queue_capacity == 0 {
        return invalid("pipeline.queue_capacity cannot be 0");
    }

    if config.database.path.trim().is_empty() {
        return invalid("Database path cannot be empty");
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("TTS Provider: {}", config.tts.provider);
    tracing::info!("TTS URL: {}", config.tts.url);
    tracing::info!("TTS Model: {} (voice {})", config.tts.model, config.tts.voice);
    tracing::info!("TTS Timeout: {}s", config.tts.timeout_secs);
    tracing::info!("Audio Format: {}", config.audio.format.as_str());
    tracing::info!("Max Chars Per Request: {}", config.narration.max_chars);
    tracing::info!(
        "Narration Cache: {} chunks, prefetch {}",
        config.narration.cache_capacity,
        config.narration.prefetch_ahead
    );
    tracing::info!("Bitrate: {} bps", config.narration.bitrate_bps);
    tracing::info!(
        "Pipeline: {} concurrent books, batch {} pages",
        config.pipeline.max_concurrent_books,
        config.pipeline.page_batch_size
    );
    tracing::info!("Database: {}", config.database.path);
    tracing::info!("Database Max Connections: {}", config.database.max_connections);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// TTS 引擎配置
    #[serde(default)]
    pub tts: TtsConfig,

    /// 音频配置
    #[serde(default)]
    pub audio: AudioConfig,

    /// 分段与播放缓存配置
    #[serde(default)]
    pub narration: NarrationConfig,

    /// 后台合成流水线配置
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// TTS 提供方
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    #[default]
    Openai,
    /// 回显文本字节，不访问网络
    Fake,
}

impl std::fmt::Display for TtsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Openai => write!(f, "openai"),
            Self::Fake => write!(f, "fake"),
        }
    }
}

/// TTS 引擎配置
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    #[serde(default)]
    pub provider: TtsProvider,

    /// TTS 服务基础 URL
    #[serde(default = "default_tts_url")]
    pub url: String,

    /// API Key（openai 必填）
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_tts_model")]
    pub model: String,

    #[serde(default = "default_tts_voice")]
    pub voice: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,
}

fn default_tts_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_tts_model() -> String {
    "tts-1".to_string()
}

fn default_tts_voice() -> String {
    "alloy".to_string()
}

fn default_tts_timeout() -> u64 {
    120
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: TtsProvider::default(),
            url: default_tts_url(),
            api_key: None,
            model: default_tts_model(),
            voice: default_tts_voice(),
            timeout_secs: default_tts_timeout(),
        }
    }
}

/// 合成音频格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Opus,
    Aac,
    Flac,
    Wav,
}

impl AudioFormat {
    /// 请求 TTS 服务时使用的格式名
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Opus => "opus",
            Self::Aac => "aac",
            Self::Flac => "flac",
            Self::Wav => "wav",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Opus => "audio/ogg",
            Self::Aac => "audio/aac",
            Self::Flac => "audio/flac",
            Self::Wav => "audio/wav",
        }
    }
}

/// 音频配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AudioConfig {
    /// 输出格式
    /// 可选: mp3, opus, aac, flac, wav
    #[serde(default)]
    pub format: AudioFormat,
}

impl AudioConfig {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

/// 分段与播放缓存配置
#[derive(Debug, Clone, Deserialize)]
pub struct NarrationConfig {
    /// 单次合成的最大字符数
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// 播放缓存可容纳的音频块数
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// 用于估算音频时长的码率（bps）
    #[serde(default = "default_bitrate_bps")]
    pub bitrate_bps: u32,

    /// 未命中时预取的后续音频块数，0 表示关闭
    #[serde(default)]
    pub prefetch_ahead: usize,
}

fn default_max_chars() -> usize {
    4096
}

fn default_cache_capacity() -> usize {
    5
}

fn default_bitrate_bps() -> u32 {
    128_000
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            cache_capacity: default_cache_capacity(),
            bitrate_bps: default_bitrate_bps(),
            prefetch_ahead: 0,
        }
    }
}

/// 后台合成流水线配置
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// 同时合成的书籍数
    #[serde(default = "default_max_concurrent_books")]
    pub max_concurrent_books: usize,

    /// 每批读取的页数
    #[serde(default = "default_page_batch_size")]
    pub page_batch_size: usize,

    /// 待合成书籍队列长度
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_max_concurrent_books() -> usize {
    2
}

fn default_page_batch_size() -> usize {
    50
}

fn default_queue_capacity() -> usize {
    100
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_books: default_max_concurrent_books(),
            page_batch_size: default_page_batch_size(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库文件路径
    #[serde(default = "default_db_path")]
    pub path: String,

    /// 最大连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/narrator.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// 获取数据库 URL
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.path)
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.tts.provider, TtsProvider::Openai);
        assert_eq!(config.tts.model, "tts-1");
        assert_eq!(config.narration.max_chars, 4096);
        assert_eq!(config.narration.cache_capacity, 5);
        assert_eq!(config.narration.bitrate_bps, 128_000);
        assert_eq!(config.narration.prefetch_ahead, 0);
        assert_eq!(config.database.path, "data/narrator.db");
    }

    #[test]
    fn test_audio_content_type() {
        assert_eq!(AudioConfig::default().content_type(), "audio/mpeg");
        assert_eq!(AudioFormat::Opus.as_str(), "opus");
    }

    #[test]
    fn test_database_url() {
        let config = DatabaseConfig::default();
        assert_eq!(config.database_url(), "sqlite:data/narrator.db?mode=rwc");
    }
}

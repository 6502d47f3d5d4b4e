//! Narrator - 有声书朗读核心
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Book Context: 章节时间轴、阅读位置
//! - 文本分割器: 段落 → 有长度上限的合成缓冲区
//!
//! 应用层 (application/):
//! - Ports: 端口定义（TtsEngine, Repositories, NarrationCache）
//! - Commands: 导入书籍、整书音频流水线、播放中断
//! - Queries: 按时间戳播放、拖动、回退、跳页、恢复位置
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: OpenAI TTS Client, Fake TTS Client
//! - Persistence: SQLite 存储
//! - Memory: LRU 播放缓存、活动书籍注册表、内存存储
//! - Worker: NarrationWorker 后台合成
//!
//! 请求层（HTTP 不在本 crate 内）用 `NarrationRegistry` 与 `narration.cache_capacity`、
//! `narration.prefetch_ahead`、`audio.format` 构造播放查询处理器，`main` 中的装配即为示例

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};

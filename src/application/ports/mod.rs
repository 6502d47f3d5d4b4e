//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_cache;
mod repositories;
mod tts_engine;

pub use audio_cache::{
    CacheStats, CachedChunk, ChunkKey, NarrationCachePort, NarrationError, NarrationRegistryPort,
    ScrubResult,
};
pub use repositories::{
    AudioChunk, BookRecord, BookRepositoryPort, ChunkLookup, PageAudioRecord, PageRecord,
    ReadingStateRepositoryPort, RepositoryError,
};
pub use tts_engine::{SynthesisRequest, TtsEnginePort, TtsError};

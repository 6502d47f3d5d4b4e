//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（TtsEngine、Repository、NarrationCache）
//! - commands: CQRS 命令及处理器（导入、合成流水线、中断）
//! - queries: CQRS 查询及处理器（播放控制）
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;

// Re-exports
pub use commands::{
    IngestBook,
    IngestPage,
    InterruptNarration,
    // Handlers
    handlers::{
        AssembledPage, AssemblerConfig, AssemblyError, BookAudioPipeline, IngestBookHandler,
        IngestBookResponse, InterruptHandler, PageAudioAssembler, PageFailure, PipelineConfig,
        PipelineReport,
    },
};

pub use error::ApplicationError;

pub use ports::{
    // Narration cache
    CacheStats,
    CachedChunk,
    ChunkKey,
    NarrationCachePort,
    NarrationError,
    NarrationRegistryPort,
    ScrubResult,
    // Repositories
    AudioChunk,
    BookRecord,
    BookRepositoryPort,
    ChunkLookup,
    PageAudioRecord,
    PageRecord,
    ReadingStateRepositoryPort,
    RepositoryError,
    // TTS engine
    SynthesisRequest,
    TtsEnginePort,
    TtsError,
};

pub use queries::{
    AudioResponse,
    GetReadingPosition,
    JumpToPageQuery,
    LoadAudioQuery,
    RewindQuery,
    ScrubQuery,
    // Handlers
    handlers::{
        GetReadingPositionHandler, JumpToPageHandler, LoadAudioHandler, RewindHandler,
        ScrubHandler,
    },
};

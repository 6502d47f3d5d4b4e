//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod book_audio_pipeline;
mod ingest_handlers;
mod interrupt_handlers;
mod page_audio_assembler;

pub use book_audio_pipeline::*;
pub use ingest_handlers::*;
pub use interrupt_handlers::*;
pub use page_audio_assembler::*;

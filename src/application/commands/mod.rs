//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：导入书籍、生成音频、回写阅读位置

mod narration_commands;

pub mod handlers;

pub use narration_commands::*;

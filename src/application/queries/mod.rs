//! 应用层 - 查询（读操作）
//!
//! CQRS 查询侧：播放控制与阅读位置

mod narration_queries;

pub mod handlers;

pub use narration_queries::*;

//! Query Handlers 实现

mod narration_handlers;

pub use narration_handlers::*;

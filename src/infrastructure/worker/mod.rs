//! Worker Layer - Background Task Processing
//!
//! 实现 NarrationWorker，在后台为导入的书籍合成音频

mod narration_worker;

pub use narration_worker::{NarrationWorker, NarrationWorkerConfig};

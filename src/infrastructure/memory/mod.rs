//! Memory Layer - In-Memory State Management
//!
//! 播放缓存、活动书籍注册表，以及测试和无数据库运行用的内存存储

pub(crate) mod book_store;
mod narration_cache;
mod narration_registry;

pub use book_store::InMemoryBookStore;
pub use narration_cache::LruNarrationCache;
pub use narration_registry::{NarrationCacheSettings, NarrationRegistry};

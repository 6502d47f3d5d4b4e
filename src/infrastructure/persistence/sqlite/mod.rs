//! SQLite Persistence - SQLite 数据库持久化实现

mod book_repo;
mod database;
mod reading_state_repo;

pub use book_repo::*;
pub use database::*;
pub use reading_state_repo::*;

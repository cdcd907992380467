pub mod memory;
pub mod model;
pub mod query;
pub mod repo;
pub mod sqlite;

pub use memory::MemoryRepository;
pub use model::*;
pub use query::{MovieFilter, MovieQuery};
pub use repo::*;
pub use sqlite::SqliteRepository;

//! Semantic cache store implementations

mod in_memory;
mod postgres;

pub use in_memory::{InMemoryQaStore, InMemoryVectorStore};
pub use postgres::{PostgresQaStore, PostgresVectorStore};

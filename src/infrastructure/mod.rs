//! Infrastructure layer - External service implementations

pub mod embedding;
pub mod http_client;
pub mod logging;
pub mod metrics;
pub mod semantic_cache;
pub mod services;
pub mod storage;

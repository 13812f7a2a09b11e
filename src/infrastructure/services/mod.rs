//! Infrastructure services

mod relay_gate;
mod semantic_cache_service;
mod sensitive_filter_service;

pub use relay_gate::{CacheTicket, GateDecision, RelayGate};
pub use semantic_cache_service::SemanticCacheService;
pub use sensitive_filter_service::{IngestReport, SensitiveFilterService};

//! Per-message gate in front of the model call
//!
//! Runs the blocklist first and the response cache second, sharing one
//! embedding between them. The cache ticket returned to the caller replaces
//! any process-wide "last matched entry" state.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::{SemanticCacheService, SensitiveFilterService};
use crate::domain::semantic_cache::CacheLookup;
use crate::domain::DomainError;

/// Cache entry a real answer should be attached to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheTicket {
    pub entry_id: Option<i64>,
}

impl CacheTicket {
    pub fn new(entry_id: i64) -> Self {
        Self {
            entry_id: Some(entry_id),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// What to do with an incoming message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    /// Matched the blocklist; send `reply` if present, never call the model
    Blocked {
        matched_text: Option<String>,
        reply: Option<String>,
    },
    /// A cached answer is reused
    Answered { answer: String, ticket: CacheTicket },
    /// Call the model, then hand the answer to [`RelayGate::remember`]
    Proceed { ticket: CacheTicket },
}

impl GateDecision {
    fn proceed_uncached() -> Self {
        Self::Proceed {
            ticket: CacheTicket::empty(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelayGate {
    cache: Arc<SemanticCacheService>,
    sensitive: Arc<SensitiveFilterService>,
}

impl RelayGate {
    pub fn new(cache: Arc<SemanticCacheService>, sensitive: Arc<SensitiveFilterService>) -> Self {
        Self { cache, sensitive }
    }

    pub fn cache(&self) -> &SemanticCacheService {
        &self.cache
    }

    pub fn sensitive(&self) -> &SensitiveFilterService {
        &self.sensitive
    }

    /// Decide how to handle a message.
    ///
    /// Blocklist failures are returned; cache failures degrade to an
    /// uncached `Proceed`.
    pub async fn screen(&self, text: &str) -> Result<GateDecision, DomainError> {
        let cache_enabled = self.cache.is_enabled();
        let sensitive_enabled = self.sensitive.is_enabled();

        if !cache_enabled && !sensitive_enabled {
            return Ok(GateDecision::proceed_uncached());
        }

        let vector = match self.cache.calculate_text_embedding(text).await {
            Ok(vector) => vector,
            Err(e) if sensitive_enabled => return Err(e),
            Err(e) => {
                warn!("Skipping semantic cache, embedding failed: {}", e);
                return Ok(GateDecision::proceed_uncached());
            }
        };

        if sensitive_enabled {
            let verdict = self.sensitive.intercept_sensitive_content(&vector).await?;
            if verdict.blocked {
                return Ok(GateDecision::Blocked {
                    matched_text: verdict.matched_text,
                    reply: verdict.reply,
                });
            }
        }

        if !cache_enabled {
            return Ok(GateDecision::proceed_uncached());
        }

        match self.cache.lookup(text, &vector).await {
            Ok(CacheLookup::Reused {
                answer, entry_id, ..
            }) => Ok(GateDecision::Answered {
                answer,
                ticket: CacheTicket::new(entry_id),
            }),
            Ok(lookup) => Ok(GateDecision::Proceed {
                ticket: CacheTicket::new(lookup.entry_id()),
            }),
            Err(e) => {
                warn!("Skipping semantic cache, lookup failed: {}", e);
                Ok(GateDecision::proceed_uncached())
            }
        }
    }

    /// Attach a real answer to the ticket's cache entry.
    ///
    /// Returns the stored answer id, or `None` when there is nothing to store.
    pub async fn remember(
        &self,
        question: &str,
        answer: &str,
        ticket: CacheTicket,
    ) -> Result<Option<i64>, DomainError> {
        let Some(entry_id) = ticket.entry_id else {
            debug!("No cache entry for this message; answer not stored");
            return Ok(None);
        };

        if answer.trim().is_empty() {
            warn!(entry_id, "Refusing to cache an empty answer");
            return Ok(None);
        }

        self.cache
            .insert_qa_entry(question, answer, entry_id)
            .await
            .map(Some)
    }
}

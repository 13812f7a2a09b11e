//! Reuse decisions for cache hits

use rand::Rng;
use serde::Serialize;

use crate::domain::DomainError;

/// Percentage of cache hits that reuse a stored answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReuseChance(u8);

impl ReuseChance {
    pub const NEVER: Self = Self(0);
    pub const ALWAYS: Self = Self(100);

    pub fn new(percent: u8) -> Result<Self, DomainError> {
        if percent > 100 {
            return Err(DomainError::configuration(format!(
                "reuse chance must be within 0..=100, got {}",
                percent
            )));
        }

        Ok(Self(percent))
    }

    /// Whether a roll in `[0, 100)` selects reuse
    pub fn accepts(&self, roll: u32) -> bool {
        roll < u32::from(self.0)
    }

    /// Draw a uniform roll in `[0, 100)` and decide
    pub fn roll(&self) -> bool {
        let roll = rand::thread_rng().gen_range(0..100);
        self.accepts(roll)
    }
}

impl Default for ReuseChance {
    fn default() -> Self {
        Self::ALWAYS
    }
}

/// Outcome of a cache lookup for one incoming question
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CacheLookup {
    /// A stored answer of the best match is reused; nothing was written
    Reused {
        answer: String,
        matched_question: String,
        entry_id: i64,
        distance: u32,
    },
    /// A match exists but a real inference is needed; its id is kept so the
    /// generated answer joins the existing question
    Matched {
        matched_question: String,
        entry_id: i64,
        distance: u32,
    },
    /// No match; a new entry was stored for this question
    Stored { entry_id: i64 },
}

impl CacheLookup {
    /// Cache entry a later answer should be attached to
    pub fn entry_id(&self) -> i64 {
        match self {
            Self::Reused { entry_id, .. }
            | Self::Matched { entry_id, .. }
            | Self::Stored { entry_id } => *entry_id,
        }
    }

    pub fn answer(&self) -> Option<&str> {
        match self {
            Self::Reused { answer, .. } => Some(answer),
            _ => None,
        }
    }

    /// Label used for metrics and logs
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Reused { .. } => "reused",
            Self::Matched { .. } => "matched",
            Self::Stored { .. } => "stored",
        }
    }
}

/// Result of the blocklist pre-filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SensitiveVerdict {
    pub blocked: bool,
    /// Closest blocklisted phrase, when blocked
    pub matched_text: Option<String>,
    /// Safe reply to send instead of an answer, when configured
    pub reply: Option<String>,
}

impl SensitiveVerdict {
    pub fn clear() -> Self {
        Self::default()
    }
}

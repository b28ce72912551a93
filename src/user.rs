//! Users — the submitters of climate-hazard reports.
//!
//! Like events, users are external entities with caller-supplied ids. The
//! core never mutates a user in place: trust-score changes are applied as
//! fresh trust-score atoms so the full history stays queryable.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default trust score for a new user.
pub const DEFAULT_TRUST_SCORE: i64 = 50;

/// Caller-supplied stable user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wraps a caller-supplied id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the id is empty after trimming.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A community member who submits reports.
///
/// Trust scores start at 50 and range conceptually over 0–100+; they are
/// only ever changed through trust-score-delta atoms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Caller-supplied stable id.
    pub id: UserId,

    /// Current trust score as known to the caller.
    pub trust_score: i64,

    /// Home region, also the fallback region for submitted events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Payout wallet address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<String>,
}

impl User {
    /// Creates a user with the default trust score.
    #[must_use]
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            trust_score: DEFAULT_TRUST_SCORE,
            location: None,
            wallet: None,
        }
    }

    /// Sets the trust score.
    #[must_use]
    pub const fn with_trust_score(mut self, score: i64) -> Self {
        self.trust_score = score;
        self
    }

    /// Sets the home region.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the wallet address.
    #[must_use]
    pub fn with_wallet(mut self, wallet: impl Into<String>) -> Self {
        self.wallet = Some(wallet.into());
        self
    }
}

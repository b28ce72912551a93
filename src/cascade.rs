//! The verification cascade.
//!
//! Verification is a two-stage decision over facts already in the store:
//! automatic verification from evidence and model confidence, then a
//! high-trust fallback for reporters with a strong track record. Both
//! outcomes carry a reasoning trace naming every predicate checked, so a
//! decision can always be replayed and explained.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::atom::Atom;
use crate::compiler::FactCompiler;
use crate::event::{EventId, ReportedEvent};
use crate::store::{AtomStore, Namespace, StoreError};
use crate::user::{User, UserId};
use crate::value::Value;

/// Thresholds governing the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CascadeConfig {
    /// Minimum image-analysis confidence for automatic verification.
    pub image_confidence_min: f64,
    /// Minimum description-analysis confidence for automatic verification.
    pub description_confidence_min: f64,
    /// Minimum reporter trust score for the high-trust fallback stage.
    pub high_trust_min: i64,
    /// Baseline trust score named in the reasoning trace. Informational:
    /// it gates nothing, but readers of a trace expect to see it.
    pub submission_trust_min: i64,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            image_confidence_min: 0.7,
            description_confidence_min: 0.7,
            high_trust_min: 75,
            submission_trust_min: 60,
        }
    }
}

/// Model confidence scores supplied by the caller alongside a submission.
///
/// The engine never runs analysis itself; scores arrive as plain data.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfidenceScores {
    /// Confidence that the attached image shows the reported hazard.
    pub image: f64,
    /// Confidence that the description matches the reported hazard.
    pub description: f64,
}

impl ConfidenceScores {
    /// Creates a score pair.
    #[must_use]
    pub const fn new(image: f64, description: f64) -> Self {
        Self { image, description }
    }
}

/// Unique identifier for one verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationId(Uuid);

impl VerificationId {
    /// Generates a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for VerificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for VerificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Which stage of the cascade settled the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    /// Stage 1: evidence, location, and timing atoms plus model confidence.
    AutoVerify,
    /// Stage 2: the reporter's trust score cleared the high-trust bar.
    HighTrustFallback,
    /// No stage verified the report, or a terminal status already applied.
    None,
}

impl std::fmt::Display for VerificationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::AutoVerify => "auto_verify",
            Self::HighTrustFallback => "high_trust_fallback",
            Self::None => "none",
        })
    }
}

/// The durable outcome of one cascade run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    /// Identifier of this attempt.
    pub id: VerificationId,
    /// The event the attempt concerned.
    pub event_id: EventId,
    /// The reporter.
    pub user_id: UserId,
    /// The event's symbolic store reference.
    pub fact_ref: String,
    /// Whether the event is verified after this run.
    pub verified: bool,
    /// The stage that settled the outcome.
    pub method: VerificationMethod,
    /// One line per predicate checked, in check order.
    pub reasoning: Vec<String>,
    /// When the attempt ran.
    pub timestamp: DateTime<Utc>,
}

/// Runs the two-stage verification cascade against a store.
#[derive(Debug, Clone, Copy)]
pub struct VerificationCascade {
    config: CascadeConfig,
}

impl VerificationCascade {
    /// Creates a cascade with the given thresholds.
    #[must_use]
    pub const fn new(config: CascadeConfig) -> Self {
        Self { config }
    }

    /// Returns the thresholds in force.
    #[must_use]
    pub const fn config(&self) -> &CascadeConfig {
        &self.config
    }

    /// Runs the cascade for an event whose atoms are already in the store.
    ///
    /// A run against an event whose status is already terminal (verified or
    /// rejected) records that status without writing anything. Otherwise
    /// Stage 1 (auto-verify) runs first; Stage 2 (high-trust fallback) runs
    /// only if Stage 1 fails. Neither passing leaves the event pending.
    ///
    /// # Errors
    ///
    /// `StoreError` if a store lock is poisoned.
    pub fn run(
        &self,
        store: &AtomStore,
        event: &ReportedEvent,
        user: &User,
        scores: ConfidenceScores,
    ) -> Result<VerificationRecord, StoreError> {
        let fact_ref = FactCompiler::fact_ref(event);
        let mut reasoning = Vec::new();

        if let Some(status) =
            store.latest_attribute(Namespace::Event, &fact_ref, "verification-status")?
        {
            let status_text = status.as_symbol().unwrap_or("unknown").to_string();
            reasoning.push(format!(
                "verification-status already terminal: {status_text}"
            ));
            return Ok(self.record(event, user, fact_ref, status_text == "verified", VerificationMethod::None, reasoning));
        }

        let has_evidence = store
            .latest_attribute(Namespace::Event, &fact_ref, "evidence-link")?
            .is_some();
        let has_gps = store
            .latest_attribute(Namespace::Event, &fact_ref, "gps-coords")?
            .is_some();
        let has_timestamp = store
            .latest_attribute(Namespace::Event, &fact_ref, "timestamp")?
            .is_some();
        reasoning.push(format!("evidence-link atom present: {has_evidence}"));
        reasoning.push(format!("gps-coords atom present: {has_gps}"));
        reasoning.push(format!("timestamp atom present: {has_timestamp}"));

        let image_ok = scores.image >= self.config.image_confidence_min;
        let description_ok = scores.description >= self.config.description_confidence_min;
        reasoning.push(format!(
            "image confidence {:.2} >= {:.2}: {image_ok}",
            scores.image, self.config.image_confidence_min
        ));
        reasoning.push(format!(
            "description confidence {:.2} >= {:.2}: {description_ok}",
            scores.description, self.config.description_confidence_min
        ));

        if has_evidence && has_gps && has_timestamp && (image_ok || description_ok) {
            reasoning.push("auto-verify: all evidence predicates satisfied".to_string());
            store.insert(
                Namespace::Event,
                Atom::attribute(
                    fact_ref.clone(),
                    "verification-status",
                    Value::symbol("verified"),
                ),
            )?;
            return Ok(self.record(event, user, fact_ref, true, VerificationMethod::AutoVerify, reasoning));
        }
        reasoning.push("auto-verify: failed, falling back to reporter trust".to_string());

        let trust = store
            .latest_attribute(Namespace::Trust, user.id.as_str(), "trust-score")?
            .and_then(|v| v.as_int())
            .unwrap_or(user.trust_score);
        reasoning.push(format!(
            "trust score {trust} meets submission minimum {}: {}",
            self.config.submission_trust_min,
            trust >= self.config.submission_trust_min
        ));
        let trusted = trust >= self.config.high_trust_min;
        reasoning.push(format!(
            "trust score {trust} >= high-trust threshold {}: {trusted}",
            self.config.high_trust_min
        ));

        if trusted {
            store.insert(
                Namespace::Event,
                Atom::attribute(
                    fact_ref.clone(),
                    "verification-status",
                    Value::symbol("verified"),
                ),
            )?;
            return Ok(self.record(event, user, fact_ref, true, VerificationMethod::HighTrustFallback, reasoning));
        }

        reasoning.push("no stage passed: event remains pending".to_string());
        Ok(self.record(event, user, fact_ref, false, VerificationMethod::None, reasoning))
    }

    fn record(
        &self,
        event: &ReportedEvent,
        user: &User,
        fact_ref: String,
        verified: bool,
        method: VerificationMethod,
        reasoning: Vec<String>,
    ) -> VerificationRecord {
        VerificationRecord {
            id: VerificationId::new(),
            event_id: event.id.clone(),
            user_id: user.id.clone(),
            fact_ref,
            verified,
            method,
            reasoning,
            timestamp: Utc::now(),
        }
    }
}

//! Derivations over verified facts.
//!
//! Everything here is computed from atoms already in the store: trust-score
//! adjustments, insurance payouts, economic-impact aggregates, and
//! early-warning alerts. Derivations that write always write new atoms;
//! prior values stay queryable as history.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::atom::Atom;
use crate::compiler::FactCompiler;
use crate::event::{EventType, ReportedEvent};
use crate::pattern::{Pattern, Term};
use crate::store::{AtomStore, Namespace, StoreError};
use crate::user::{User, UserId};
use crate::value::Value;

/// Adjudicated outcome of a report, driving the trust-score delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportOutcome {
    /// The report was confirmed accurate.
    ConfirmedAccurate,
    /// The report turned out to be wrong.
    FalseReport,
    /// The report was deliberately misleading.
    Malicious,
}

impl ReportOutcome {
    /// The trust-score delta this outcome applies.
    #[must_use]
    pub const fn delta(self) -> i64 {
        match self {
            Self::ConfirmedAccurate => 15,
            Self::FalseReport => -10,
            Self::Malicious => -25,
        }
    }
}

/// A computed insurance payout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    /// The verified event the payout settles.
    pub event_ref: String,
    /// The policy holder receiving the payout.
    pub holder: UserId,
    /// Policy coverage amount.
    pub coverage: f64,
    /// Fraction of coverage paid for a verified event.
    pub fraction: f64,
    /// `coverage * fraction`.
    pub amount: f64,
}

/// Optional region and trailing-window constraints for impact aggregation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactFilter {
    /// Only count events in this region.
    pub region: Option<String>,
    /// Only count events verified within this trailing window.
    #[serde(skip)]
    pub window: Option<Duration>,
}

impl ImpactFilter {
    /// A filter matching every verified event.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts the filter to one region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Restricts the filter to a trailing window ending now.
    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = Some(window);
        self
    }
}

/// Aggregate of verified events matching an [`ImpactFilter`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactSummary {
    /// Number of verified events counted.
    pub events: usize,
    /// Verified event counts per impact category.
    pub by_category: BTreeMap<String, usize>,
    /// Sum of severity weights (High 1.0, Medium 0.6, Low 0.3).
    pub severity_index: f64,
}

/// Early-warning alert level for a (region, event type) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    /// No verified events in the window.
    None,
    /// One or two verified events.
    Low,
    /// Exactly three verified events.
    Medium,
    /// More than three verified events.
    High,
}

impl AlertLevel {
    /// Maps a verified-event count to an alert level.
    #[must_use]
    pub const fn from_count(count: usize) -> Self {
        match count {
            0 => Self::None,
            1 | 2 => Self::Low,
            3 => Self::Medium,
            _ => Self::High,
        }
    }

    /// Lowercase name used in alert atoms.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn severity_weight(severity: &str) -> f64 {
    match severity {
        "High" => 1.0,
        "Medium" => 0.6,
        "Low" => 0.3,
        _ => 0.0,
    }
}

/// Computes derived facts from the store.
#[derive(Debug, Default, Clone, Copy)]
pub struct DerivationEngine;

impl DerivationEngine {
    /// Creates an engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Applies a report outcome to a user's trust score.
    ///
    /// Reads the latest score (falling back to the user's carried score),
    /// applies the outcome's delta, clamps at zero, and inserts a fresh
    /// trust-score atom. Earlier scores remain queryable.
    ///
    /// # Errors
    ///
    /// `StoreError` if a store lock is poisoned.
    pub fn derive_trust_delta(
        &self,
        store: &AtomStore,
        user: &User,
        outcome: ReportOutcome,
    ) -> Result<i64, StoreError> {
        let current = store
            .latest_attribute(Namespace::Trust, user.id.as_str(), "trust-score")?
            .and_then(|v| v.as_int())
            .unwrap_or(user.trust_score);
        let updated = (current + outcome.delta()).max(0);
        store.insert(
            Namespace::Trust,
            Atom::attribute(user.id.as_str(), "trust-score", updated),
        )?;
        Ok(updated)
    }

    /// Computes the payout a verified event entitles its reporter to.
    ///
    /// Requires the event's latest verification status to be `verified` and
    /// an active insurance policy held by the reporter. Returns `None` when
    /// either precondition fails. On success a payout atom is recorded.
    ///
    /// # Errors
    ///
    /// `StoreError` if a store lock is poisoned.
    pub fn derive_payout(
        &self,
        store: &AtomStore,
        event: &ReportedEvent,
    ) -> Result<Option<Payout>, StoreError> {
        let fact_ref = FactCompiler::fact_ref(event);
        let verified = store
            .latest_attribute(Namespace::Event, &fact_ref, "verification-status")?
            .as_ref()
            .and_then(Value::as_symbol)
            == Some("verified");
        if !verified {
            return Ok(None);
        }

        let policy_pattern = Pattern::relation(
            "insurance-policy",
            vec![
                Term::symbol(event.submitter.as_str()),
                Term::var("coverage"),
                Term::var("fraction"),
                Term::lit("active"),
            ],
        );
        let bindings = store.query(Namespace::Economic, &policy_pattern)?;
        let Some(policy) = bindings.last() else {
            return Ok(None);
        };
        let (Some(coverage), Some(fraction)) = (
            policy.get("coverage").and_then(Value::as_float),
            policy.get("fraction").and_then(Value::as_float),
        ) else {
            return Ok(None);
        };

        let amount = coverage * fraction;
        store.insert(
            Namespace::Economic,
            Atom::attribute(fact_ref.clone(), "payout", amount),
        )?;
        Ok(Some(Payout {
            event_ref: fact_ref,
            holder: event.submitter.clone(),
            coverage,
            fraction,
            amount,
        }))
    }

    /// Aggregates verified events into an economic-impact summary.
    ///
    /// # Errors
    ///
    /// `StoreError` if a store lock is poisoned.
    pub fn economic_impact(
        &self,
        store: &AtomStore,
        filter: &ImpactFilter,
    ) -> Result<ImpactSummary, StoreError> {
        let refs = self.verified_refs(store, filter.window)?;
        let mut summary = ImpactSummary::default();

        for fact_ref in refs {
            if let Some(region) = &filter.region {
                let event_region = store
                    .latest_attribute(Namespace::Event, &fact_ref, "region")?
                    .as_ref()
                    .and_then(Value::as_str)
                    .map(ToString::to_string);
                if event_region.as_deref() != Some(region.as_str()) {
                    continue;
                }
            }

            summary.events += 1;
            if let Some(category) = store
                .latest_attribute(Namespace::Economic, &fact_ref, "impact")?
                .as_ref()
                .and_then(Value::as_symbol)
            {
                *summary.by_category.entry(category.to_string()).or_insert(0) += 1;
            }
            if let Some(severity) = store
                .latest_attribute(Namespace::Event, &fact_ref, "severity")?
                .as_ref()
                .and_then(Value::as_symbol)
            {
                summary.severity_index += severity_weight(severity);
            }
        }
        Ok(summary)
    }

    /// Computes the alert level for a (region, event type) pair over a
    /// trailing window, recording an early-warning atom when it is above
    /// [`AlertLevel::None`].
    ///
    /// # Errors
    ///
    /// `StoreError` if a store lock is poisoned.
    pub fn derive_alert(
        &self,
        store: &AtomStore,
        region: &str,
        event_type: &EventType,
        window: Duration,
    ) -> Result<AlertLevel, StoreError> {
        let refs = self.verified_refs(store, Some(window))?;
        let mut count = 0usize;
        for fact_ref in refs {
            let region_matches = store
                .latest_attribute(Namespace::Event, &fact_ref, "region")?
                .as_ref()
                .and_then(Value::as_str)
                == Some(region);
            let type_matches = store
                .latest_attribute(Namespace::Event, &fact_ref, "event-type")?
                .as_ref()
                .and_then(Value::as_symbol)
                == Some(event_type.as_str());
            if region_matches && type_matches {
                count += 1;
            }
        }

        let level = AlertLevel::from_count(count);
        if level > AlertLevel::None {
            store.insert(
                Namespace::Prediction,
                Atom::relation(
                    "early-warning",
                    vec![
                        Value::from(region),
                        Value::symbol(event_type.as_str()),
                        Value::symbol(level.as_str()),
                    ],
                ),
            )?;
        }
        Ok(level)
    }

    /// Fact refs whose latest verification status is `verified`, optionally
    /// limited to statuses written inside a trailing window ending now.
    fn verified_refs(
        &self,
        store: &AtomStore,
        window: Option<Duration>,
    ) -> Result<Vec<String>, StoreError> {
        let pattern = Pattern::attribute(
            Term::var("ref"),
            "verification-status",
            Term::var("status"),
        );
        let statuses = store.query_with_time(Namespace::Event, &pattern)?;

        // Later writes overwrite earlier ones: last status wins per ref.
        let mut latest: BTreeMap<String, (String, chrono::DateTime<Utc>)> = BTreeMap::new();
        for (binding, at) in statuses {
            let (Some(fact_ref), Some(status)) = (
                binding.get("ref").and_then(Value::as_symbol),
                binding.get("status").and_then(Value::as_symbol),
            ) else {
                continue;
            };
            latest.insert(fact_ref.to_string(), (status.to_string(), at));
        }

        let cutoff = window.map(|w| Utc::now() - w);
        Ok(latest
            .into_iter()
            .filter(|(_, (status, at))| {
                status == "verified" && cutoff.map_or(true, |c| *at >= c)
            })
            .map(|(fact_ref, _)| fact_ref)
            .collect())
    }
}

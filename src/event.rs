//! Reported climate-hazard events.
//!
//! A `ReportedEvent` is an external entity: its id is caller-supplied (it
//! usually originates in an application database), and the core treats it as
//! a plain data record to be compiled into atoms.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Caller-supplied stable event identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
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

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Classification of climate-hazard events.
///
/// The fixed variants key into the impact/severity lookup table; anything
/// else travels as `Other` and carries no impact mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Drought,
    Flood,
    Locust,
    ExtremeHeat,
    Wildfire,
    Storm,
    /// An event type outside the fixed taxonomy.
    Other(String),
}

impl EventType {
    /// Returns the canonical lowercase name used in atoms.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Drought => "drought",
            Self::Flood => "flood",
            Self::Locust => "locust",
            Self::ExtremeHeat => "extreme_heat",
            Self::Wildfire => "wildfire",
            Self::Storm => "storm",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a reported event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Awaiting verification; the only non-terminal status.
    Pending,
    /// Verified by the cascade.
    Verified,
    /// Rejected by admin action. Never produced by the cascade.
    Rejected,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Verified => write!(f, "verified"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// A GPS coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

/// A community-submitted climate-hazard report.
///
/// # Examples
///
/// ```
/// use witnesskb::{EventType, ReportedEvent};
///
/// let event = ReportedEvent::new("evt-001", EventType::Drought, "user-1")
///     .with_coords(3.119, 35.597)
///     .with_evidence("/uploads/drought.jpg");
/// assert!(event.coords.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportedEvent {
    /// Caller-supplied stable id.
    pub id: EventId,
    /// What kind of hazard was observed.
    pub event_type: EventType,
    /// Who submitted the report.
    pub submitter: crate::user::UserId,

    /// Where the hazard was observed, if the device provided a fix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coords: Option<GeoPoint>,

    /// When the hazard was observed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Free-text description from the submitter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Reference to photo or other evidence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,

    /// Named region, used by early-warning alerts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Lifecycle status as known to the caller.
    pub status: EventStatus,
}

impl ReportedEvent {
    /// Creates a pending report with the required fields.
    #[must_use]
    pub fn new(
        id: impl Into<EventId>,
        event_type: EventType,
        submitter: impl Into<crate::user::UserId>,
    ) -> Self {
        Self {
            id: id.into(),
            event_type,
            submitter: submitter.into(),
            coords: None,
            timestamp: None,
            description: None,
            evidence: None,
            region: None,
            status: EventStatus::Pending,
        }
    }

    /// Sets the GPS coordinates.
    #[must_use]
    pub const fn with_coords(mut self, lat: f64, lon: f64) -> Self {
        self.coords = Some(GeoPoint { lat, lon });
        self
    }

    /// Sets the observation timestamp.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the free-text description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the evidence reference.
    #[must_use]
    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    /// Sets the named region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

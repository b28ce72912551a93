//! # witnesskb - Symbolic fact store for community climate-hazard reports
//!
//! `witnesskb` ingests community-submitted climate-hazard reports and decides,
//! deterministically and explainably, whether each report is verified, what
//! trust-score adjustment its submitter receives, and what derived facts
//! (payout eligibility, economic impact, early-warning alerts) follow from
//! accepted reports.
//!
//! ## Core Concepts
//!
//! - **Atom**: an immutable typed fact (identity, relation, or attribute)
//! - **AtomStore**: a namespaced collection of atoms with pattern-match queries
//! - **FactCompiler**: a pure mapping from (event, user) to an atom set
//! - **VerificationCascade**: a layered decision procedure with a mandatory
//!   reasoning trace
//! - **DerivationEngine**: trust deltas, payouts, impact aggregates, and alerts
//!   computed from verified facts
//!
//! ## Usage
//!
//! ```rust
//! use witnesskb::{
//!     CascadeConfig, ConfidenceScores, EventType, QueryGateway, ReportedEvent, User,
//! };
//!
//! let gateway = QueryGateway::new(CascadeConfig::default());
//!
//! let event = ReportedEvent::new("evt-001", EventType::Drought, "user-1")
//!     .with_coords(3.119, 35.597)
//!     .with_timestamp(chrono::Utc::now())
//!     .with_evidence("/uploads/drought.jpg");
//! let user = User::new("user-1");
//!
//! let record = gateway
//!     .submit(&event, &user, ConfidenceScores::new(0.9, 0.0))
//!     .unwrap();
//! assert!(record.verified);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod atom;
pub mod cascade;
pub mod compiler;
pub mod derive;
pub mod error;
pub mod event;
pub mod gateway;
pub mod pattern;
pub mod runtime;
pub mod store;
pub mod user;
pub mod value;

// Re-export primary types at crate root for convenience
pub use atom::Atom;
pub use cascade::{
    CascadeConfig, ConfidenceScores, VerificationCascade, VerificationId, VerificationMethod,
    VerificationRecord,
};
pub use compiler::{CompiledFacts, FactCompiler};
pub use derive::{
    AlertLevel, DerivationEngine, ImpactFilter, ImpactSummary, Payout, ReportOutcome,
};
pub use error::{CompilationError, ExecutionError, WitnessError, WitnessResult};
pub use event::{EventId, EventStatus, EventType, GeoPoint, ReportedEvent};
pub use gateway::{QueryGateway, StoreStats};
pub use pattern::{Binding, Pattern, Term};
pub use runtime::{
    DefaultRouter, ExecutionHandle, ExecutionPath, RequestRouter, WitnessRequest,
    WitnessResponse, WitnessRuntime, WitnessRuntimeConfig,
};
pub use store::{AtomStore, Namespace, StoreError};
pub use user::{User, UserId};
pub use value::Value;

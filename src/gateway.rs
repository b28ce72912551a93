//! The query gateway — the single entry point callers talk to.
//!
//! A gateway binds one store, one compiler, one cascade, and one derivation
//! engine together, and keeps the append-only verification history. All
//! writes flow through it; reads go straight to the store snapshot.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::atom::Atom;
use crate::cascade::{CascadeConfig, ConfidenceScores, VerificationCascade, VerificationRecord};
use crate::compiler::FactCompiler;
use crate::derive::{AlertLevel, DerivationEngine, ImpactFilter, ImpactSummary, Payout, ReportOutcome};
use crate::error::{WitnessError, WitnessResult};
use crate::event::{EventType, ReportedEvent};
use crate::pattern::{Binding, Pattern, Term};
use crate::store::{AtomStore, Namespace, StoreError};
use crate::user::{User, UserId};
use crate::value::Value;

/// Atom counts per namespace plus verification-history length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Atom count per namespace, keyed by namespace name.
    pub atoms_by_namespace: BTreeMap<String, usize>,
    /// Total atoms across every namespace.
    pub total_atoms: usize,
    /// Number of verification attempts recorded.
    pub verification_attempts: usize,
}

/// The submit/query/derive surface over one atom store.
#[derive(Debug)]
pub struct QueryGateway {
    store: Arc<AtomStore>,
    compiler: FactCompiler,
    cascade: VerificationCascade,
    engine: DerivationEngine,
    history: RwLock<Vec<VerificationRecord>>,
}

impl QueryGateway {
    /// Creates a gateway over a fresh store.
    #[must_use]
    pub fn new(config: CascadeConfig) -> Self {
        Self::with_store(Arc::new(AtomStore::new()), config)
    }

    /// Creates a gateway over an existing store handle.
    #[must_use]
    pub fn with_store(store: Arc<AtomStore>, config: CascadeConfig) -> Self {
        Self {
            store,
            compiler: FactCompiler::new(),
            cascade: VerificationCascade::new(config),
            engine: DerivationEngine::new(),
            history: RwLock::new(Vec::new()),
        }
    }

    /// Returns the shared store handle.
    #[must_use]
    pub fn store(&self) -> &Arc<AtomStore> {
        &self.store
    }

    /// Submits a report: compile, insert, verify, record.
    ///
    /// The compiled atom set is inserted as a unit per namespace, so a
    /// concurrent reader never observes part of a submission. The returned
    /// record is also appended to the verification history.
    ///
    /// # Errors
    ///
    /// `WitnessError::Compilation` if a required field is missing (nothing
    /// is inserted), `WitnessError::Store` on lock poisoning.
    pub fn submit(
        &self,
        event: &ReportedEvent,
        user: &User,
        scores: ConfidenceScores,
    ) -> WitnessResult<VerificationRecord> {
        let facts = self.compiler.compile(event, user)?;
        self.store.insert_all(facts.atoms)?;
        let record = self.cascade.run(&self.store, event, user, scores)?;
        info!(
            event = %record.fact_ref,
            verified = record.verified,
            method = %record.method,
            "report submitted"
        );
        self.append_history(record.clone())?;
        Ok(record)
    }

    /// Matches a pattern against one namespace.
    ///
    /// # Errors
    ///
    /// `WitnessError::Store` on lock poisoning.
    pub fn query(&self, namespace: Namespace, pattern: &Pattern) -> WitnessResult<Vec<Binding>> {
        Ok(self.store.query(namespace, pattern)?)
    }

    /// Applies a report outcome to a user's trust score.
    ///
    /// # Errors
    ///
    /// `WitnessError::Store` on lock poisoning.
    pub fn derive_trust_delta(&self, user: &User, outcome: ReportOutcome) -> WitnessResult<i64> {
        let score = self.engine.derive_trust_delta(&self.store, user, outcome)?;
        debug!(user = %user.id, score, "trust score updated");
        Ok(score)
    }

    /// Computes the payout a verified event entitles its reporter to.
    ///
    /// # Errors
    ///
    /// `WitnessError::Store` on lock poisoning.
    pub fn derive_payout(&self, event: &ReportedEvent) -> WitnessResult<Option<Payout>> {
        Ok(self.engine.derive_payout(&self.store, event)?)
    }

    /// Aggregates verified events into an economic-impact summary.
    ///
    /// # Errors
    ///
    /// `WitnessError::Store` on lock poisoning.
    pub fn economic_impact(&self, filter: &ImpactFilter) -> WitnessResult<ImpactSummary> {
        Ok(self.engine.economic_impact(&self.store, filter)?)
    }

    /// Computes the alert level for a (region, event type) pair over a
    /// trailing window.
    ///
    /// # Errors
    ///
    /// `WitnessError::Store` on lock poisoning.
    pub fn derive_alert(
        &self,
        region: &str,
        event_type: &EventType,
        window: Duration,
    ) -> WitnessResult<AlertLevel> {
        Ok(self.engine.derive_alert(&self.store, region, event_type, window)?)
    }

    /// Rejects an event. This is the only path to a rejected status; the
    /// verification cascade never rejects on its own.
    ///
    /// Writes the terminal status plus a governance note carrying the
    /// reason. A later cascade run against this event observes the terminal
    /// status and does not reopen it.
    ///
    /// # Errors
    ///
    /// `WitnessError::UnknownEvent` if the event was never admitted,
    /// `WitnessError::Store` on lock poisoning.
    pub fn reject(&self, event: &ReportedEvent, reason: &str) -> WitnessResult<()> {
        let fact_ref = FactCompiler::fact_ref(event);
        let admitted = !self
            .store
            .query(
                Namespace::Event,
                &Pattern::identity("event", Term::symbol(fact_ref.clone())),
            )?
            .is_empty();
        if !admitted {
            return Err(WitnessError::UnknownEvent { fact_ref });
        }
        self.store.insert_all([
            (
                Namespace::Event,
                Atom::attribute(
                    fact_ref.clone(),
                    "verification-status",
                    Value::symbol("rejected"),
                ),
            ),
            (
                Namespace::Governance,
                Atom::attribute(fact_ref.clone(), "rejected", reason),
            ),
        ])?;
        info!(event = %fact_ref, reason, "report rejected");
        Ok(())
    }

    /// Registers an active insurance policy for a holder.
    ///
    /// # Errors
    ///
    /// `WitnessError::Store` on lock poisoning.
    pub fn add_policy(
        &self,
        holder: &UserId,
        coverage: f64,
        fraction: f64,
    ) -> WitnessResult<()> {
        self.store.insert(
            Namespace::Economic,
            Atom::relation(
                "insurance-policy",
                vec![
                    Value::symbol(holder.as_str()),
                    Value::Float(coverage),
                    Value::Float(fraction),
                    Value::from("active"),
                ],
            ),
        )?;
        Ok(())
    }

    /// Returns every verification attempt so far, in order.
    ///
    /// # Errors
    ///
    /// `WitnessError::Store` if the history lock is poisoned.
    pub fn verification_history(&self) -> WitnessResult<Vec<VerificationRecord>> {
        Ok(self
            .history
            .read()
            .map_err(|_| StoreError::Poisoned {
                context: "gateway.verification_history".to_string(),
            })?
            .clone())
    }

    /// Reports atom counts and history length.
    ///
    /// # Errors
    ///
    /// `WitnessError::Store` on lock poisoning.
    pub fn stats(&self) -> WitnessResult<StoreStats> {
        let mut atoms_by_namespace = BTreeMap::new();
        let mut total_atoms = 0;
        for namespace in Namespace::ALL {
            let count = self.store.count(namespace)?;
            atoms_by_namespace.insert(namespace.to_string(), count);
            total_atoms += count;
        }
        Ok(StoreStats {
            atoms_by_namespace,
            total_atoms,
            verification_attempts: self.verification_history()?.len(),
        })
    }

    fn append_history(&self, record: VerificationRecord) -> Result<(), StoreError> {
        self.history
            .write()
            .map_err(|_| StoreError::Poisoned {
                context: "gateway.append_history".to_string(),
            })?
            .push(record);
        Ok(())
    }
}

//! The namespaced atom store.
//!
//! Atoms live in one of five namespaces partitioning the knowledge base by
//! domain. Each namespace is an append-only log: inserts are the only
//! mutation path, writers are serialized per namespace by an exclusive lock,
//! and readers match against an immutable snapshot so they never observe a
//! torn atom set and never block on writers.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::atom::Atom;
use crate::pattern::{Binding, Pattern};
use crate::value::Value;

/// A partition of the atom store scoping queries by domain.
///
/// These are the five atom spaces of the knowledge base: identities,
/// evidence, and verification status live in `Event`; trust scores in
/// `Trust`; impact and payout facts in `Economic`; admin decisions in
/// `Governance`; early-warning facts in `Prediction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Event identities, locations, evidence, verification status.
    Event,
    /// User identities and trust scores.
    Trust,
    /// Impact, payouts, insurance policies, wallets.
    Economic,
    /// Admin decisions and rejection records.
    Governance,
    /// Early-warning alerts.
    Prediction,
}

impl Namespace {
    /// All namespaces, in stable order.
    pub const ALL: [Self; 5] = [
        Self::Event,
        Self::Trust,
        Self::Economic,
        Self::Governance,
        Self::Prediction,
    ];

    const fn index(self) -> usize {
        match self {
            Self::Event => 0,
            Self::Trust => 1,
            Self::Economic => 2,
            Self::Governance => 3,
            Self::Prediction => 4,
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Event => write!(f, "event"),
            Self::Trust => write!(f, "trust"),
            Self::Economic => write!(f, "economic"),
            Self::Governance => write!(f, "governance"),
            Self::Prediction => write!(f, "prediction"),
        }
    }
}

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A namespace lock was poisoned by a panicking writer.
    #[error("Store lock poisoned: {context}")]
    Poisoned {
        /// Which operation observed the poison.
        context: String,
    },
}

fn lock_err(context: &'static str) -> StoreError {
    StoreError::Poisoned {
        context: context.to_string(),
    }
}

/// An atom together with its insertion metadata.
///
/// The per-namespace sequence number is the tiebreaker for
/// last-write-wins lookups; `tx_time` is retained for audit queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAtom {
    /// Per-namespace monotone insertion sequence.
    pub seq: u64,
    /// When the atom was inserted.
    pub tx_time: DateTime<Utc>,
    /// The fact itself.
    pub atom: Atom,
}

#[derive(Debug, Default)]
struct Shard {
    log: RwLock<Arc<Vec<StoredAtom>>>,
}

impl Shard {
    fn snapshot(&self, context: &'static str) -> Result<Arc<Vec<StoredAtom>>, StoreError> {
        Ok(Arc::clone(&*self.log.read().map_err(|_| lock_err(context))?))
    }
}

/// The namespaced, append-only atom store.
///
/// Constructed explicitly and passed by handle to every component; there is
/// no process-global instance.
///
/// # Examples
///
/// ```
/// use witnesskb::{Atom, AtomStore, Namespace, Pattern, Term};
///
/// let store = AtomStore::new();
/// store
///     .insert(Namespace::Trust, Atom::attribute("user-1", "trust-score", 50i64))
///     .unwrap();
///
/// let pattern = Pattern::attribute(Term::symbol("user-1"), "trust-score", Term::var("s"));
/// let bindings = store.query(Namespace::Trust, &pattern).unwrap();
/// assert_eq!(bindings.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct AtomStore {
    shards: [Shard; 5],
}

impl AtomStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one atom to a namespace.
    pub fn insert(&self, namespace: Namespace, atom: Atom) -> Result<(), StoreError> {
        self.insert_all([(namespace, atom)])
    }

    /// Appends a batch of atoms, grouped so each namespace's lock is taken
    /// exactly once.
    ///
    /// A concurrent reader observes either none or all of the batch's atoms
    /// for any given namespace; two concurrent submissions cannot interleave
    /// partial atom sets within a namespace.
    pub fn insert_all(
        &self,
        atoms: impl IntoIterator<Item = (Namespace, Atom)>,
    ) -> Result<(), StoreError> {
        let mut grouped: [Vec<Atom>; 5] = Default::default();
        for (namespace, atom) in atoms {
            grouped[namespace.index()].push(atom);
        }

        let now = Utc::now();
        for (idx, batch) in grouped.into_iter().enumerate() {
            if batch.is_empty() {
                continue;
            }
            let mut log = self.shards[idx]
                .log
                .write()
                .map_err(|_| lock_err("store.insert"))?;
            // Clone-and-swap: readers holding the previous Arc keep a
            // consistent snapshot.
            let mut next: Vec<StoredAtom> = (**log).clone();
            next.reserve(batch.len());
            let mut seq = next.last().map_or(0, |s| s.seq);
            for atom in batch {
                seq += 1;
                next.push(StoredAtom {
                    seq,
                    tx_time: now,
                    atom,
                });
            }
            *log = Arc::new(next);
        }
        Ok(())
    }

    /// Matches a pattern against every atom in a namespace.
    ///
    /// Returns one binding per matching atom, in insertion order. Queries
    /// never mutate.
    pub fn query(&self, namespace: Namespace, pattern: &Pattern) -> Result<Vec<Binding>, StoreError> {
        let snapshot = self.shards[namespace.index()].snapshot("store.query")?;
        Ok(snapshot
            .iter()
            .filter_map(|stored| pattern.match_atom(&stored.atom))
            .collect())
    }

    /// Returns the most recently inserted attribute value for a subject+key.
    ///
    /// This implements last-write-wins for single-valued facts such as
    /// trust scores and verification status.
    pub fn latest_attribute(
        &self,
        namespace: Namespace,
        subject: &str,
        key: &str,
    ) -> Result<Option<Value>, StoreError> {
        let snapshot = self.shards[namespace.index()].snapshot("store.latest_attribute")?;
        Ok(snapshot.iter().rev().find_map(|stored| match &stored.atom {
            Atom::Attribute {
                subject: s,
                key: k,
                value,
            } if s == subject && k == key => Some(value.clone()),
            _ => None,
        }))
    }

    /// Matches a pattern and reports each binding with its insertion time.
    ///
    /// Used by derivations that filter on trailing windows.
    pub fn query_with_time(
        &self,
        namespace: Namespace,
        pattern: &Pattern,
    ) -> Result<Vec<(Binding, DateTime<Utc>)>, StoreError> {
        let snapshot = self.shards[namespace.index()].snapshot("store.query_with_time")?;
        Ok(snapshot
            .iter()
            .filter_map(|stored| {
                pattern
                    .match_atom(&stored.atom)
                    .map(|b| (b, stored.tx_time))
            })
            .collect())
    }

    /// Returns the number of atoms in a namespace.
    pub fn count(&self, namespace: Namespace) -> Result<usize, StoreError> {
        Ok(self.shards[namespace.index()].snapshot("store.count")?.len())
    }
}

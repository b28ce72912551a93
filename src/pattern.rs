//! Pattern AST and structural matching.
//!
//! A pattern is an atom template with zero or more free variables. Queries
//! build patterns at compile time from typed constructors — there is no
//! string interpolation into a query language, which removes the injection
//! class entirely.
//!
//! Matching is structural: fixed positions must be equal, variable positions
//! match any value and are reported in the binding. A relation pattern only
//! matches relations with the same predicate and arity. No backtracking
//! across multiple clauses is provided; callers issue independent
//! single-pattern queries and conjunct results themselves.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::atom::Atom;
use crate::value::Value;

/// One position of a pattern: a bound literal or a named free variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Term {
    /// A free variable; matches any value and is reported in the binding.
    Var(String),
    /// A fixed literal; matches only an equal value.
    Lit(Value),
}

impl Term {
    /// Creates a variable term.
    #[must_use]
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    /// Creates a literal term.
    #[must_use]
    pub fn lit(value: impl Into<Value>) -> Self {
        Self::Lit(value.into())
    }

    /// Creates a literal symbol term (the common case for atom references).
    #[must_use]
    pub fn symbol(s: impl Into<String>) -> Self {
        Self::Lit(Value::symbol(s))
    }

    fn matches(&self, value: &Value, binding: &mut BTreeMap<String, Value>) -> bool {
        match self {
            Self::Var(name) => match binding.get(name) {
                // A variable repeated within one pattern must bind consistently.
                Some(bound) => bound == value,
                None => {
                    binding.insert(name.clone(), value.clone());
                    true
                }
            },
            Self::Lit(expected) => expected == value,
        }
    }
}

/// An atom template with free variables.
///
/// # Examples
///
/// ```
/// use witnesskb::{Pattern, Term};
///
/// // (trust-score user-1 $score)
/// let p = Pattern::attribute(Term::symbol("user-1"), "trust-score", Term::var("score"));
/// assert_eq!(p.head(), Some("trust-score"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Pattern {
    /// Matches identity atoms of a fixed kind.
    Identity {
        /// The identity kind, e.g. `event`.
        kind: String,
        /// The id position.
        id: Term,
    },

    /// Matches relation atoms with the same predicate and arity.
    Relation {
        /// The relation predicate. Always fixed; never a variable.
        predicate: String,
        /// The argument positions.
        args: Vec<Term>,
    },

    /// Matches attribute atoms.
    Attribute {
        /// The subject position.
        subject: Term,
        /// The attribute key. Always fixed; never a variable.
        key: String,
        /// The value position.
        value: Term,
    },
}

impl Pattern {
    /// Creates an identity pattern, e.g. `(event $x)`.
    #[must_use]
    pub fn identity(kind: impl Into<String>, id: Term) -> Self {
        Self::Identity {
            kind: kind.into(),
            id,
        }
    }

    /// Creates a relation pattern, e.g. `(reports $user evt_1)`.
    #[must_use]
    pub fn relation(predicate: impl Into<String>, args: Vec<Term>) -> Self {
        Self::Relation {
            predicate: predicate.into(),
            args,
        }
    }

    /// Creates an attribute pattern, e.g. `(trust-score user-1 $score)`.
    #[must_use]
    pub fn attribute(subject: Term, key: impl Into<String>, value: Term) -> Self {
        Self::Attribute {
            subject,
            key: key.into(),
            value,
        }
    }

    /// Returns the fixed predicate/kind/key this pattern matches on.
    #[must_use]
    pub fn head(&self) -> Option<&str> {
        match self {
            Self::Identity { kind, .. } => Some(kind),
            Self::Relation { predicate, .. } => Some(predicate),
            Self::Attribute { key, .. } => Some(key),
        }
    }

    /// Attempts to match one atom, returning its binding on success.
    #[must_use]
    pub fn match_atom(&self, atom: &Atom) -> Option<Binding> {
        let mut vars = BTreeMap::new();
        let matched = match (self, atom) {
            (Self::Identity { kind, id }, Atom::Identity { kind: ak, id: aid }) => {
                kind == ak && id.matches(&Value::symbol(aid.clone()), &mut vars)
            }
            (
                Self::Relation { predicate, args },
                Atom::Relation {
                    predicate: ap,
                    args: aargs,
                },
            ) => {
                predicate == ap
                    && args.len() == aargs.len()
                    && args
                        .iter()
                        .zip(aargs.iter())
                        .all(|(term, value)| term.matches(value, &mut vars))
            }
            (
                Self::Attribute {
                    subject,
                    key,
                    value,
                },
                Atom::Attribute {
                    subject: asub,
                    key: akey,
                    value: aval,
                },
            ) => {
                key == akey
                    && subject.matches(&Value::symbol(asub.clone()), &mut vars)
                    && value.matches(aval, &mut vars)
            }
            _ => false,
        };

        matched.then(|| Binding {
            vars,
            atom: atom.clone(),
        })
    }
}

/// The result of a successful pattern match: variable assignments plus the
/// matched atom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    /// Variable name → bound value.
    pub vars: BTreeMap<String, Value>,
    /// The atom that matched.
    pub atom: Atom,
}

impl Binding {
    /// Returns the value bound to a variable, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }
}

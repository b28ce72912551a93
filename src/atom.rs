//! Atom types — the immutable typed facts the store holds.
//!
//! An atom is one of three shapes: an identity (`(event drought_a1b2c3d4)`),
//! a relation (`(reports user-1 drought_a1b2c3d4)`), or an attribute
//! (`(trust-score user-1 50)`). Atoms are immutable once inserted; "updating"
//! a single-valued fact means inserting a newer attribute atom and relying on
//! last-write-wins lookup.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// An immutable typed fact.
///
/// The textual form produced by [`Atom::to_text`] is the stable
/// s-expression syntax used for persistence and debugging:
/// `(predicate arg1 arg2 ...)` for relations, `(key subject value)` for
/// attributes. Rendering is total; there is no runtime type probing.
///
/// # Examples
///
/// ```
/// use witnesskb::{Atom, Value};
///
/// let atom = Atom::relation("reports", vec![Value::symbol("user-1"), Value::symbol("evt_1")]);
/// assert_eq!(atom.to_text(), "(reports user-1 evt_1)");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Atom {
    /// An identity fact, e.g. `(event drought_a1b2c3d4)` or `(user user-1)`.
    Identity {
        /// The identity kind (`event`, `user`, ...).
        kind: String,
        /// The stable id this identity anchors.
        id: String,
    },

    /// A relation between values, e.g. `(reports user-1 drought_a1b2c3d4)`.
    Relation {
        /// The relation predicate.
        predicate: String,
        /// Ordered arguments (atom references or literals).
        args: Vec<Value>,
    },

    /// A keyed attribute of a subject, e.g. `(trust-score user-1 50)`.
    Attribute {
        /// The subject id the attribute describes.
        subject: String,
        /// The attribute key.
        key: String,
        /// The attribute value.
        value: Value,
    },
}

impl Atom {
    /// Creates an identity atom.
    #[must_use]
    pub fn identity(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Identity {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Creates a relation atom.
    #[must_use]
    pub fn relation(predicate: impl Into<String>, args: Vec<Value>) -> Self {
        Self::Relation {
            predicate: predicate.into(),
            args,
        }
    }

    /// Creates an attribute atom.
    #[must_use]
    pub fn attribute(
        subject: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self::Attribute {
            subject: subject.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    /// Returns the predicate/kind/key heading this atom.
    #[must_use]
    pub fn head(&self) -> &str {
        match self {
            Self::Identity { kind, .. } => kind,
            Self::Relation { predicate, .. } => predicate,
            Self::Attribute { key, .. } => key,
        }
    }

    /// Returns the subject id for identities and attributes.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::Identity { id, .. } => Some(id),
            Self::Attribute { subject, .. } => Some(subject),
            Self::Relation { .. } => None,
        }
    }

    /// Renders this atom in the stable s-expression form.
    ///
    /// Identities render as `(kind id)`, relations as
    /// `(predicate arg1 arg2 ...)`, and attributes as `(key subject value)`.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Identity { kind, id } => format!("({kind} {id})"),
            Self::Relation { predicate, args } => {
                let mut out = String::with_capacity(16 + predicate.len());
                out.push('(');
                out.push_str(predicate);
                for arg in args {
                    out.push(' ');
                    out.push_str(&arg.to_text());
                }
                out.push(')');
                out
            }
            Self::Attribute {
                subject,
                key,
                value,
            } => format!("({key} {subject} {})", value.to_text()),
        }
    }
}

impl std::fmt::Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_text())
    }
}

//! The fact compiler — (event, user) → atoms.
//!
//! Compilation is a deterministic, total mapping with no dependency on
//! network or store state. It either produces the full atom set or fails
//! with a `CompilationError` before anything is inserted (all-or-nothing
//! per call).

use serde::{Deserialize, Serialize};

use crate::atom::Atom;
use crate::error::CompilationError;
use crate::event::{EventType, ReportedEvent};
use crate::store::Namespace;
use crate::user::User;
use crate::value::Value;

/// Impact and severity classification for a known event type.
///
/// Unknown/`Other` event types map to `None` and carry no impact atoms.
#[must_use]
pub fn impact_severity(event_type: &EventType) -> Option<(&'static str, &'static str)> {
    match event_type {
        EventType::Drought => Some(("Livestock_Risk", "High")),
        EventType::Flood => Some(("Infrastructure_Damage", "Medium")),
        EventType::Locust => Some(("Crop_Failure", "High")),
        EventType::ExtremeHeat => Some(("Water_Scarcity", "Medium")),
        EventType::Wildfire => Some(("Ecosystem_Damage", "High")),
        EventType::Storm => Some(("Property_Damage", "Medium")),
        EventType::Other(_) => None,
    }
}

/// The ordered output of one compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledFacts {
    /// The symbolic reference for the event inside the store, of the form
    /// `{event_type}_{id prefix}`.
    pub fact_ref: String,
    /// Namespace-tagged atoms, in emission order.
    pub atoms: Vec<(Namespace, Atom)>,
}

/// Compiles domain entities into atom sets.
#[derive(Debug, Default, Clone, Copy)]
pub struct FactCompiler;

impl FactCompiler {
    /// Creates a compiler.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Derives the symbolic event reference used in atoms.
    ///
    /// The reference is the event type joined with the first eight
    /// characters of the id, e.g. `drought_evt-001`. Two same-type events
    /// whose ids share an eight-character prefix alias to the same
    /// reference and are treated as one event; callers minting their own
    /// ids must keep the first eight characters unique per type.
    #[must_use]
    pub fn fact_ref(event: &ReportedEvent) -> String {
        let prefix: String = event.id.as_str().chars().take(8).collect();
        format!("{}_{}", event.event_type.as_str(), prefix)
    }

    /// Compiles a (event, user) pair into its full atom set.
    ///
    /// # Errors
    ///
    /// `CompilationError::MissingField` if the event id, event type, or
    /// user id is absent or empty. Nothing is produced on error.
    pub fn compile(
        &self,
        event: &ReportedEvent,
        user: &User,
    ) -> Result<CompiledFacts, CompilationError> {
        if event.id.is_empty() {
            return Err(CompilationError::MissingField("event id"));
        }
        if event.event_type.as_str().trim().is_empty() {
            return Err(CompilationError::MissingField("event type"));
        }
        if user.id.is_empty() {
            return Err(CompilationError::MissingField("user id"));
        }

        let fact_ref = Self::fact_ref(event);
        let user_id = user.id.as_str();
        let mut atoms: Vec<(Namespace, Atom)> = Vec::with_capacity(16);

        // Event identity and reporter relationship.
        atoms.push((Namespace::Event, Atom::identity("event", fact_ref.clone())));
        atoms.push((
            Namespace::Event,
            Atom::relation(
                "reports",
                vec![Value::symbol(user_id), Value::symbol(fact_ref.clone())],
            ),
        ));
        atoms.push((
            Namespace::Event,
            Atom::attribute(
                fact_ref.clone(),
                "event-type",
                Value::symbol(event.event_type.as_str()),
            ),
        ));

        if let Some(ts) = event.timestamp {
            atoms.push((
                Namespace::Event,
                Atom::attribute(fact_ref.clone(), "timestamp", Value::Time(ts)),
            ));
        }

        if let Some(coords) = event.coords {
            atoms.push((
                Namespace::Event,
                Atom::attribute(
                    fact_ref.clone(),
                    "gps-coords",
                    Value::Coords {
                        lat: coords.lat,
                        lon: coords.lon,
                    },
                ),
            ));
        }

        if let Some(evidence) = &event.evidence {
            atoms.push((
                Namespace::Event,
                Atom::attribute(fact_ref.clone(), "evidence-link", evidence.as_str()),
            ));
            // Evidence capture time defaults to the event timestamp.
            if let Some(ts) = event.timestamp {
                atoms.push((
                    Namespace::Event,
                    Atom::attribute(fact_ref.clone(), "photo-timestamp", Value::Time(ts)),
                ));
            }
        }

        if let Some(description) = &event.description {
            atoms.push((
                Namespace::Event,
                Atom::attribute(fact_ref.clone(), "description", description.as_str()),
            ));
        }

        // Region for alert matching: the event's own region, or the
        // submitter's home region as fallback.
        if let Some(region) = event.region.as_deref().or(user.location.as_deref()) {
            atoms.push((
                Namespace::Event,
                Atom::attribute(fact_ref.clone(), "region", region),
            ));
        }

        if let Some((impact, severity)) = impact_severity(&event.event_type) {
            atoms.push((
                Namespace::Economic,
                Atom::attribute(fact_ref.clone(), "impact", Value::symbol(impact)),
            ));
            atoms.push((
                Namespace::Event,
                Atom::attribute(fact_ref.clone(), "severity", Value::symbol(severity)),
            ));
        }

        // User atoms, once per user touch.
        atoms.push((Namespace::Trust, Atom::identity("user", user_id)));
        atoms.push((
            Namespace::Trust,
            Atom::attribute(user_id, "trust-score", user.trust_score),
        ));
        if let Some(location) = &user.location {
            atoms.push((
                Namespace::Event,
                Atom::attribute(user_id, "location", location.as_str()),
            ));
        }
        if let Some(wallet) = &user.wallet {
            atoms.push((
                Namespace::Economic,
                Atom::attribute(user_id, "wallet-address", wallet.as_str()),
            ));
        }

        Ok(CompiledFacts { fact_ref, atoms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn full_event() -> ReportedEvent {
        ReportedEvent::new("evt-00123456", EventType::Drought, "user-1")
            .with_coords(3.119, 35.597)
            .with_timestamp(Utc::now())
            .with_description("river bed dry")
            .with_evidence("/uploads/drought.jpg")
            .with_region("turkana")
    }

    #[test]
    fn fact_ref_joins_type_and_id_prefix() {
        let event = full_event();
        assert_eq!(FactCompiler::fact_ref(&event), "drought_evt-0012");
    }

    #[test]
    fn fact_ref_ignores_id_beyond_eight_chars() {
        let a = ReportedEvent::new("evt-00123456", EventType::Drought, "user-1");
        let b = ReportedEvent::new("evt-00123457", EventType::Drought, "user-1");
        // Shared prefix, shared reference: these are one event to the store.
        assert_eq!(FactCompiler::fact_ref(&a), FactCompiler::fact_ref(&b));

        let c = ReportedEvent::new("evt-1", EventType::Flood, "user-1");
        assert_eq!(FactCompiler::fact_ref(&c), "flood_evt-1");
    }

    #[test]
    fn compile_emits_required_atoms_first() {
        let compiler = FactCompiler::new();
        let facts = compiler.compile(&full_event(), &User::new("user-1")).unwrap();

        assert_eq!(
            facts.atoms[0],
            (Namespace::Event, Atom::identity("event", "drought_evt-0012"))
        );
        assert_eq!(
            facts.atoms[1].1.to_text(),
            "(reports user-1 drought_evt-0012)"
        );
        assert_eq!(
            facts.atoms[2].1.to_text(),
            "(event-type drought_evt-0012 drought)"
        );
    }

    #[test]
    fn compile_emits_conditionals_only_when_present() {
        let compiler = FactCompiler::new();
        let bare = ReportedEvent::new("evt-1", EventType::Other("haze".to_string()), "user-1");
        let facts = compiler.compile(&bare, &User::new("user-1")).unwrap();

        let texts: Vec<String> = facts.atoms.iter().map(|(_, a)| a.to_text()).collect();
        assert!(!texts.iter().any(|t| t.contains("gps-coords")));
        assert!(!texts.iter().any(|t| t.contains("evidence-link")));
        assert!(!texts.iter().any(|t| t.contains("impact")));
        assert!(!texts.iter().any(|t| t.contains("severity")));
    }

    #[test]
    fn compile_maps_impact_and_severity_by_type() {
        let compiler = FactCompiler::new();
        let facts = compiler.compile(&full_event(), &User::new("user-1")).unwrap();

        let impact = facts
            .atoms
            .iter()
            .find(|(ns, a)| *ns == Namespace::Economic && a.head() == "impact")
            .unwrap();
        assert_eq!(impact.1.to_text(), "(impact drought_evt-0012 Livestock_Risk)");

        let severity = facts
            .atoms
            .iter()
            .find(|(ns, a)| *ns == Namespace::Event && a.head() == "severity")
            .unwrap();
        assert_eq!(severity.1.to_text(), "(severity drought_evt-0012 High)");
    }

    #[test]
    fn compile_region_falls_back_to_user_location() {
        let compiler = FactCompiler::new();
        let event = ReportedEvent::new("evt-1", EventType::Flood, "user-1");
        let user = User::new("user-1").with_location("kisumu");

        let facts = compiler.compile(&event, &user).unwrap();
        let region = facts
            .atoms
            .iter()
            .find(|(_, a)| a.head() == "region")
            .unwrap();
        assert_eq!(region.1.to_text(), "(region flood_evt-1 \"kisumu\")");
    }

    #[test]
    fn compile_emits_user_atoms() {
        let compiler = FactCompiler::new();
        let user = User::new("user-1").with_trust_score(72).with_wallet("0xabc");
        let facts = compiler.compile(&full_event(), &user).unwrap();

        let texts: Vec<String> = facts.atoms.iter().map(|(_, a)| a.to_text()).collect();
        assert!(texts.contains(&"(user user-1)".to_string()));
        assert!(texts.contains(&"(trust-score user-1 72)".to_string()));
        assert!(texts.contains(&"(wallet-address user-1 \"0xabc\")".to_string()));
    }

    #[test]
    fn compile_is_deterministic() {
        let compiler = FactCompiler::new();
        let event = ReportedEvent::new("evt-1", EventType::Storm, "user-1");
        let user = User::new("user-1");

        let a = compiler.compile(&event, &user).unwrap();
        let b = compiler.compile(&event, &user).unwrap();
        assert_eq!(a.fact_ref, b.fact_ref);
        assert_eq!(a.atoms, b.atoms);
    }

    #[test]
    fn compile_rejects_missing_required_fields() {
        let compiler = FactCompiler::new();
        let user = User::new("user-1");

        let no_event_id = ReportedEvent::new("", EventType::Drought, "user-1");
        assert_eq!(
            compiler.compile(&no_event_id, &user),
            Err(CompilationError::MissingField("event id"))
        );

        let no_type = ReportedEvent::new("evt-1", EventType::Other(String::new()), "user-1");
        assert_eq!(
            compiler.compile(&no_type, &user),
            Err(CompilationError::MissingField("event type"))
        );

        let no_user = User::new("");
        let ok_event = ReportedEvent::new("evt-1", EventType::Drought, "user-1");
        assert_eq!(
            compiler.compile(&ok_event, &no_user),
            Err(CompilationError::MissingField("user id"))
        );
    }
}

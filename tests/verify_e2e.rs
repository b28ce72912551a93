use witnesskb::{
    CascadeConfig, ConfidenceScores, EventType, Namespace, Pattern, QueryGateway, ReportedEvent,
    Term, User, Value, VerificationMethod,
};

use chrono::Utc;

fn gateway() -> QueryGateway {
    QueryGateway::new(CascadeConfig::default())
}

fn drought_with_evidence(id: &str, submitter: &str) -> ReportedEvent {
    ReportedEvent::new(id, EventType::Drought, submitter)
        .with_coords(3.119, 35.597)
        .with_timestamp(Utc::now())
        .with_description("river bed completely dry, livestock struggling")
        .with_evidence("/uploads/drought_riverbed.jpg")
        .with_region("turkana")
}

#[test]
fn drought_report_with_evidence_auto_verifies() {
    let gw = gateway();
    // Trust 40 would fail the fallback stage; evidence settles it first.
    let user = User::new("user-1")
        .with_location("turkana")
        .with_trust_score(40);

    // Description confidence alone clears the bar; no image score needed.
    let record = gw
        .submit(
            &drought_with_evidence("evt-1", "user-1"),
            &user,
            ConfidenceScores::new(0.0, 0.75),
        )
        .unwrap();

    assert!(record.verified);
    assert_eq!(record.method, VerificationMethod::AutoVerify);

    let status = gw
        .store()
        .latest_attribute(Namespace::Event, &record.fact_ref, "verification-status")
        .unwrap();
    assert_eq!(status, Some(Value::symbol("verified")));

    // The reasoning trace names every predicate it checked.
    let trace = record.reasoning.join("\n");
    assert!(trace.contains("evidence-link"));
    assert!(trace.contains("gps-coords"));
    assert!(trace.contains("timestamp"));
    assert!(trace.contains("description confidence"));
}

#[test]
fn report_without_evidence_from_low_trust_user_stays_pending() {
    let gw = gateway();
    let user = User::new("user-2").with_trust_score(40);
    let event = ReportedEvent::new("evt-2", EventType::Flood, "user-2");

    let record = gw
        .submit(&event, &user, ConfidenceScores::default())
        .unwrap();

    assert!(!record.verified);
    assert_eq!(record.method, VerificationMethod::None);
    assert_eq!(
        gw.store()
            .latest_attribute(Namespace::Event, &record.fact_ref, "verification-status")
            .unwrap(),
        None
    );
    // Pending, not rejected: the cascade never writes a rejection.
    let trace = record.reasoning.join("\n");
    assert!(trace.contains("pending"));
}

#[test]
fn high_trust_reporter_verifies_without_evidence() {
    let gw = gateway();
    let elder = User::new("user-3").with_trust_score(85);
    let event = ReportedEvent::new("evt-3", EventType::Locust, "user-3");

    let record = gw
        .submit(&event, &elder, ConfidenceScores::default())
        .unwrap();

    assert!(record.verified);
    assert_eq!(record.method, VerificationMethod::HighTrustFallback);
}

#[test]
fn auto_verify_is_checked_before_trust() {
    let gw = gateway();
    // Trust 90 would clear stage 2, but stage 1 settles it first.
    let user = User::new("user-4").with_trust_score(90);

    let record = gw
        .submit(
            &drought_with_evidence("evt-4", "user-4"),
            &user,
            ConfidenceScores::new(0.9, 0.0),
        )
        .unwrap();

    assert_eq!(record.method, VerificationMethod::AutoVerify);
}

#[test]
fn duplicate_submission_does_not_change_latest_status() {
    let gw = gateway();
    let user = User::new("user-1");
    let event = drought_with_evidence("evt-1", "user-1");

    let first = gw
        .submit(&event, &user, ConfidenceScores::new(0.9, 0.0))
        .unwrap();
    let second = gw
        .submit(&event, &user, ConfidenceScores::new(0.9, 0.0))
        .unwrap();

    assert!(first.verified);
    assert!(second.verified);
    assert_eq!(second.method, VerificationMethod::None);
    assert_eq!(
        gw.store()
            .latest_attribute(Namespace::Event, &first.fact_ref, "verification-status")
            .unwrap(),
        Some(Value::symbol("verified"))
    );

    // Both attempts land in the history, in order.
    let history = gw.verification_history().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, first.id);
    assert_eq!(history[1].id, second.id);
}

#[test]
fn rejected_event_is_terminal_even_for_high_trust_resubmission() {
    let gw = gateway();
    let user = User::new("user-1");
    let event = ReportedEvent::new("evt-1", EventType::Storm, "user-1");

    gw.submit(&event, &user, ConfidenceScores::default()).unwrap();
    gw.reject(&event, "contradicted by field assessment").unwrap();

    let rerun = gw
        .submit(
            &event,
            &User::new("user-1").with_trust_score(95),
            ConfidenceScores::default(),
        )
        .unwrap();

    assert!(!rerun.verified);
    assert_eq!(rerun.method, VerificationMethod::None);
    assert_eq!(
        gw.store()
            .latest_attribute(Namespace::Event, &rerun.fact_ref, "verification-status")
            .unwrap(),
        Some(Value::symbol("rejected"))
    );

    let notes = gw
        .query(
            Namespace::Governance,
            &Pattern::attribute(Term::var("e"), "rejected", Term::var("why")),
        )
        .unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(
        notes[0].get("why"),
        Some(&Value::from("contradicted by field assessment"))
    );
}

#[test]
fn submission_atoms_are_queryable_across_namespaces() {
    let gw = gateway();
    let user = User::new("user-1")
        .with_location("turkana")
        .with_wallet("0xabc123");

    gw.submit(
        &drought_with_evidence("evt-1", "user-1"),
        &user,
        ConfidenceScores::new(0.9, 0.0),
    )
    .unwrap();

    let reports = gw
        .query(
            Namespace::Event,
            &Pattern::relation("reports", vec![Term::symbol("user-1"), Term::var("e")]),
        )
        .unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(
        reports[0].get("e"),
        Some(&Value::symbol("drought_evt-1"))
    );

    let impacts = gw
        .query(
            Namespace::Economic,
            &Pattern::attribute(Term::symbol("drought_evt-1"), "impact", Term::var("i")),
        )
        .unwrap();
    assert_eq!(impacts[0].get("i"), Some(&Value::symbol("Livestock_Risk")));

    let trust = gw
        .query(
            Namespace::Trust,
            &Pattern::attribute(Term::symbol("user-1"), "trust-score", Term::var("s")),
        )
        .unwrap();
    assert_eq!(trust[0].get("s"), Some(&Value::Int(50)));

    let stats = gw.stats().unwrap();
    assert_eq!(stats.verification_attempts, 1);
    assert!(stats.atoms_by_namespace["governance"] == 0);
    assert!(stats.total_atoms > 0);
}

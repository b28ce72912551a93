use witnesskb::{
    AlertLevel, CascadeConfig, ConfidenceScores, EventType, ImpactFilter, Namespace, Pattern,
    QueryGateway, ReportOutcome, ReportedEvent, Term, User, Value, WitnessRequest,
    WitnessResponse, WitnessRuntime, WitnessRuntimeConfig,
};

use chrono::{Duration, Utc};

fn gateway() -> QueryGateway {
    QueryGateway::new(CascadeConfig::default())
}

fn verified_event(gw: &QueryGateway, id: &str, event_type: EventType, user: &User) -> ReportedEvent {
    let event = ReportedEvent::new(id, event_type, user.id.as_str())
        .with_coords(3.119, 35.597)
        .with_timestamp(Utc::now())
        .with_evidence("/uploads/evidence.jpg");
    let record = gw
        .submit(&event, user, ConfidenceScores::new(0.9, 0.0))
        .unwrap();
    assert!(record.verified);
    event
}

#[test]
fn trust_score_walk_keeps_full_history() {
    let gw = gateway();
    let user = User::new("user-1");

    // Submission writes the baseline score of 50.
    verified_event(&gw, "evt-1", EventType::Drought, &user);

    let up = gw
        .derive_trust_delta(&user, ReportOutcome::ConfirmedAccurate)
        .unwrap();
    assert_eq!(up, 65);

    let down = gw
        .derive_trust_delta(&user, ReportOutcome::FalseReport)
        .unwrap();
    assert_eq!(down, 55);

    // 50 -> 65 -> 55, every intermediate still queryable.
    let history = gw
        .query(
            Namespace::Trust,
            &Pattern::attribute(Term::symbol("user-1"), "trust-score", Term::var("s")),
        )
        .unwrap();
    let scores: Vec<i64> = history
        .iter()
        .filter_map(|b| b.get("s").and_then(Value::as_int))
        .collect();
    assert_eq!(scores, vec![50, 65, 55]);

    assert_eq!(
        gw.store()
            .latest_attribute(Namespace::Trust, "user-1", "trust-score")
            .unwrap(),
        Some(Value::Int(55))
    );
}

#[test]
fn malicious_outcome_clamps_at_zero() {
    let gw = gateway();
    let user = User::new("user-1").with_trust_score(20);

    let score = gw
        .derive_trust_delta(&user, ReportOutcome::Malicious)
        .unwrap();
    assert_eq!(score, 0);

    let again = gw
        .derive_trust_delta(&user, ReportOutcome::FalseReport)
        .unwrap();
    assert_eq!(again, 0);
}

#[test]
fn payout_pays_policy_holders_only() {
    let gw = gateway();
    let holder = User::new("user-1");
    let bystander = User::new("user-2");
    gw.add_policy(&holder.id, 1000.0, 0.8).unwrap();

    let insured = verified_event(&gw, "evt-1", EventType::Drought, &holder);
    let uninsured = verified_event(&gw, "evt-2", EventType::Drought, &bystander);

    let payout = gw.derive_payout(&insured).unwrap().unwrap();
    assert!((payout.amount - 800.0).abs() < f64::EPSILON);
    assert_eq!(payout.holder, holder.id);
    assert!((payout.coverage - 1000.0).abs() < f64::EPSILON);

    assert_eq!(gw.derive_payout(&uninsured).unwrap(), None);

    // The payout itself becomes a queryable economic fact.
    let recorded = gw
        .query(
            Namespace::Economic,
            &Pattern::attribute(Term::symbol("drought_evt-1"), "payout", Term::var("amt")),
        )
        .unwrap();
    assert_eq!(recorded.len(), 1);
}

#[test]
fn payout_requires_verification() {
    let gw = gateway();
    let holder = User::new("user-1");
    gw.add_policy(&holder.id, 1000.0, 0.8).unwrap();

    let pending = ReportedEvent::new("evt-1", EventType::Flood, "user-1");
    gw.submit(&pending, &holder, ConfidenceScores::default())
        .unwrap();

    assert_eq!(gw.derive_payout(&pending).unwrap(), None);
}

#[test]
fn alert_level_steps_with_verified_event_count() {
    let gw = gateway();
    let user = User::new("user-1").with_location("turkana");
    let window = Duration::hours(24);

    // No verified events anywhere yet.
    assert_eq!(
        gw.derive_alert("turkana", &EventType::Drought, window).unwrap(),
        AlertLevel::None
    );

    verified_event(&gw, "evt-1", EventType::Drought, &user);
    verified_event(&gw, "evt-2", EventType::Drought, &user);
    assert_eq!(
        gw.derive_alert("turkana", &EventType::Drought, window).unwrap(),
        AlertLevel::Low
    );

    verified_event(&gw, "evt-3", EventType::Drought, &user);
    assert_eq!(
        gw.derive_alert("turkana", &EventType::Drought, window).unwrap(),
        AlertLevel::Medium
    );

    verified_event(&gw, "evt-4", EventType::Drought, &user);
    assert_eq!(
        gw.derive_alert("turkana", &EventType::Drought, window).unwrap(),
        AlertLevel::High
    );

    // Other regions and other hazard types stay quiet.
    assert_eq!(
        gw.derive_alert("kisumu", &EventType::Drought, window).unwrap(),
        AlertLevel::None
    );
    assert_eq!(
        gw.derive_alert("turkana", &EventType::Flood, window).unwrap(),
        AlertLevel::None
    );

    // Each raised level left an early-warning fact behind.
    let warnings = gw
        .query(
            Namespace::Prediction,
            &Pattern::relation(
                "early-warning",
                vec![
                    Term::lit("turkana"),
                    Term::symbol("drought"),
                    Term::var("level"),
                ],
            ),
        )
        .unwrap();
    assert_eq!(warnings.len(), 3);
    assert_eq!(
        warnings.last().unwrap().get("level"),
        Some(&Value::symbol("high"))
    );
}

#[test]
fn impact_summary_aggregates_verified_events() {
    let gw = gateway();
    let turkana = User::new("user-1").with_location("turkana");
    let kisumu = User::new("user-2").with_location("kisumu");

    verified_event(&gw, "evt-1", EventType::Drought, &turkana);
    verified_event(&gw, "evt-2", EventType::Drought, &turkana);
    verified_event(&gw, "evt-3", EventType::Flood, &kisumu);

    // A pending event never counts.
    gw.submit(
        &ReportedEvent::new("evt-4", EventType::Locust, "user-1"),
        &turkana,
        ConfidenceScores::default(),
    )
    .unwrap();

    let all = gw.economic_impact(&ImpactFilter::all()).unwrap();
    assert_eq!(all.events, 3);
    assert_eq!(all.by_category.get("Livestock_Risk"), Some(&2));
    assert_eq!(all.by_category.get("Infrastructure_Damage"), Some(&1));
    assert!((all.severity_index - 2.6).abs() < 1e-9);

    let turkana_only = gw
        .economic_impact(&ImpactFilter::all().with_region("turkana"))
        .unwrap();
    assert_eq!(turkana_only.events, 2);
    assert_eq!(turkana_only.by_category.get("Infrastructure_Damage"), None);

    let recent = gw
        .economic_impact(&ImpactFilter::all().with_window(Duration::hours(1)))
        .unwrap();
    assert_eq!(recent.events, 3);
}

#[test]
fn trailing_window_excludes_older_verifications() {
    let gw = gateway();
    let user = User::new("user-1").with_location("turkana");
    verified_event(&gw, "evt-1", EventType::Drought, &user);

    // Let the verification age past a deliberately tiny window.
    std::thread::sleep(std::time::Duration::from_millis(80));

    assert_eq!(
        gw.derive_alert("turkana", &EventType::Drought, Duration::milliseconds(10))
            .unwrap(),
        AlertLevel::None
    );
    let recent = gw
        .economic_impact(&ImpactFilter::all().with_window(Duration::milliseconds(10)))
        .unwrap();
    assert_eq!(recent.events, 0);

    // Unwindowed aggregates still see the event.
    assert_eq!(gw.economic_impact(&ImpactFilter::all()).unwrap().events, 1);
    assert_eq!(
        gw.derive_alert("turkana", &EventType::Drought, Duration::hours(24))
            .unwrap(),
        AlertLevel::Low
    );
}

#[test]
fn duplicate_submission_does_not_double_count_aggregates() {
    let gw = gateway();
    let user = User::new("user-1").with_location("turkana");

    // Same event id twice: the atoms are duplicated, the event is not.
    verified_event(&gw, "evt-1", EventType::Drought, &user);
    verified_event(&gw, "evt-1", EventType::Drought, &user);

    let summary = gw.economic_impact(&ImpactFilter::all()).unwrap();
    assert_eq!(summary.events, 1);
    assert_eq!(summary.by_category.get("Livestock_Risk"), Some(&1));
    assert!((summary.severity_index - 1.0).abs() < 1e-9);

    assert_eq!(
        gw.derive_alert("turkana", &EventType::Drought, Duration::hours(24))
            .unwrap(),
        AlertLevel::Low
    );
}

#[test]
fn routed_runtime_runs_the_full_flow() {
    let runtime = WitnessRuntime::new(
        QueryGateway::new(CascadeConfig::default()),
        WitnessRuntimeConfig::default(),
    );
    let user = User::new("user-1").with_location("turkana");
    let event = ReportedEvent::new("evt-1", EventType::Drought, "user-1")
        .with_coords(3.119, 35.597)
        .with_timestamp(Utc::now())
        .with_evidence("/uploads/evidence.jpg");

    runtime.gateway().add_policy(&user.id, 1000.0, 0.8).unwrap();

    let WitnessResponse::Verification(record) = runtime
        .execute(WitnessRequest::Submit {
            event: event.clone(),
            user: user.clone(),
            scores: ConfidenceScores::new(0.9, 0.0),
        })
        .unwrap()
    else {
        panic!("expected verification response");
    };
    assert!(record.verified);

    let WitnessResponse::Payout(Some(payout)) = runtime
        .execute(WitnessRequest::Payout { event })
        .unwrap()
    else {
        panic!("expected payout");
    };
    assert!((payout.amount - 800.0).abs() < f64::EPSILON);

    let WitnessResponse::Stats(stats) = runtime.execute(WitnessRequest::Stats).unwrap() else {
        panic!("expected stats");
    };
    assert_eq!(stats.verification_attempts, 1);
}

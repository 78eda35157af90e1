use super::common::*;
use std::sync::Arc;

use crate::workflows::risk::evaluation::{
    classify, health_score, AnalysisError, DebtorMetrics, RiskEngine, RuleSet, RuleSetWarning,
    NO_HISTORY_SENTINEL_DAYS,
};

#[test]
fn scenario_a_large_dormant_balance_is_grade_d() {
    let rules = standard_rules();

    let matched = classify(&scenario_a_debtor(), &rules, None, now()).expect("grade assigned");

    assert_eq!(matched.id, "D");
}

#[test]
fn scenario_c_settled_debtor_falls_through_to_catch_all() {
    let rules = standard_rules();

    for contacted in [None, Some(0), Some(200)] {
        let debtor = debtor("settled", 0.0, Some(0), contacted);
        let matched = classify(&debtor, &rules, None, now()).expect("grade assigned");
        assert_eq!(matched.id, "A", "contact {contacted:?} should not matter");
    }
}

#[test]
fn middle_grades_follow_their_thresholds() {
    let rules = standard_rules();

    let grade_c = classify(
        &debtor("c", 25_000.0, Some(50), Some(10)),
        &rules,
        None,
        now(),
    )
    .expect("grade assigned");
    let grade_b = classify(
        &debtor("b", 8_000.0, Some(20), Some(40)),
        &rules,
        None,
        now(),
    )
    .expect("grade assigned");

    assert_eq!(grade_c.id, "C");
    assert_eq!(grade_b.id, "B");
}

#[test]
fn missing_history_uses_sentinel_days() {
    let debtor = never_touched("no-history", 100.0);

    let metrics = DebtorMetrics::measure(&debtor, None, now());

    assert_eq!(metrics.days_since_payment, NO_HISTORY_SENTINEL_DAYS);
    assert_eq!(metrics.days_since_contact, NO_HISTORY_SENTINEL_DAYS);
    assert!(metrics.last_payment_on.is_none());
    assert!(metrics.last_contact_at.is_none());

    let rules = RuleSet::new(
        1,
        vec![
            rule("STALE", 1, 0.0, 90, 90),
            rule("FRESH", 2, 0.0, 0, 0),
        ],
    );
    let matched = classify(&debtor, &rules, None, now()).expect("grade assigned");
    assert_eq!(matched.id, "STALE");
}

#[test]
fn sentinel_satisfies_thresholds_up_to_its_own_value() {
    let debtor = never_touched("no-history", 100.0);
    let rules = RuleSet::new(
        1,
        vec![
            rule("YEAR", 1, 0.0, 365, 0),
            rule("BEYOND", 2, 0.0, 366, 0),
            rule("FALLBACK", 3, 0.0, 0, 0),
        ],
    );

    let matched = classify(&debtor, &rules, None, now()).expect("grade assigned");

    assert_eq!(matched.id, "YEAR");

    let rules = RuleSet::new(
        1,
        vec![rule("BEYOND", 1, 0.0, 366, 0), rule("FALLBACK", 2, 0.0, 0, 0)],
    );
    let matched = classify(&debtor, &rules, None, now()).expect("grade assigned");
    assert_eq!(matched.id, "FALLBACK");
}

#[test]
fn rules_are_sorted_by_priority_before_evaluation() {
    let rules = RuleSet::new(
        1,
        vec![
            rule("LOW", 10, 0.0, 0, 0),
            rule("HIGH", 1, 1_000.0, 0, 0),
        ],
    );

    let matched = classify(&debtor("rich", 5_000.0, Some(1), Some(1)), &rules, None, now())
        .expect("grade assigned");

    assert_eq!(matched.id, "HIGH");
    assert_eq!(
        rules
            .rules()
            .iter()
            .map(|rule| rule.id.as_str())
            .collect::<Vec<_>>(),
        vec!["HIGH", "LOW"]
    );
}

#[test]
fn equal_priorities_keep_input_order() {
    let rules = RuleSet::new(
        1,
        vec![
            rule("FIRST", 5, 0.0, 0, 0),
            rule("SECOND", 5, 0.0, 0, 0),
            rule("EARLY", 1, 1_000_000.0, 0, 0),
        ],
    );

    let matched = classify(&debtor("tie", 10.0, Some(1), Some(1)), &rules, None, now())
        .expect("grade assigned");

    assert_eq!(matched.id, "FIRST");
    assert_eq!(rules.position("SECOND"), Some(2));
}

#[test]
fn priority_wins_when_debtor_satisfies_several_rules() {
    let rules = RuleSet::new(
        1,
        vec![
            rule("R2", 2, 100.0, 10, 0),
            rule("R1", 1, 50.0, 5, 0),
            rule("R3", 3, 0.0, 0, 0),
        ],
    );

    let matched = classify(&debtor("both", 500.0, Some(30), None), &rules, None, now())
        .expect("grade assigned");

    assert_eq!(matched.id, "R1");
}

#[test]
fn unmatched_debtor_falls_back_to_last_rule_even_with_thresholds() {
    let rules = RuleSet::new(
        1,
        vec![
            rule("BIG", 1, 100_000.0, 0, 0),
            rule("LAST", 2, 50_000.0, 30, 30),
        ],
    );

    let matched = classify(&debtor("small", 10.0, Some(1), Some(1)), &rules, None, now())
        .expect("fallback assigned");

    assert_eq!(matched.id, "LAST");
    assert_eq!(
        rules.validate(),
        vec![RuleSetWarning::MissingCatchAll {
            fallback_grade: "LAST".to_string()
        }]
    );
}

#[test]
fn empty_rule_set_is_invalid_configuration() {
    let rules = RuleSet::new(3, Vec::new());

    let error = classify(&scenario_a_debtor(), &rules, None, now()).expect_err("no grade");

    assert!(matches!(error, AnalysisError::InvalidConfiguration { .. }));
}

#[test]
fn classification_always_returns_a_member_of_the_rule_set() {
    let rules = standard_rules();
    let debtors = vec![
        never_touched("zero", 0.0),
        never_touched("huge", 10_000_000.0),
        debtor("negative", -500.0, Some(3), Some(3)),
        debtor("fresh", 30_000.0, Some(0), Some(0)),
        debtor("old", 30_000.0, Some(1_000), Some(1_000)),
    ];

    for debtor in &debtors {
        let matched = classify(debtor, &rules, None, now()).expect("grade assigned");
        assert!(rules.rules().iter().any(|rule| rule == matched));
    }
}

#[test]
fn analysis_is_deterministic_for_fixed_inputs() {
    let engine = engine();
    let debtor = scenario_a_debtor();

    let first = engine.analyze(&debtor, None, now()).expect("analysis");
    let second = engine.analyze(&debtor, None, now()).expect("analysis");
    let third = RiskEngine::new(Arc::new(standard_rules()))
        .analyze(&debtor, None, now())
        .expect("analysis");

    assert_eq!(first, second);
    assert_eq!(first, third);
}

#[test]
fn analysis_reports_full_tuple() {
    let analysis = engine()
        .analyze(&scenario_a_debtor(), None, now())
        .expect("analysis");

    assert_eq!(analysis.assigned_grade, "D");
    assert_eq!(analysis.matched_rule.id, "D");
    assert_eq!(analysis.days_since_last_payment, 120);
    assert_eq!(analysis.days_since_last_contact, 60);
    assert!(!analysis.is_contact_blocked);
    assert!(analysis.blocked_until.is_none());
    assert_eq!(analysis.health_score, 34.0);
    assert_eq!(analysis.ledger.currency.balance, 60_000.0);
    assert_eq!(analysis.rule_set_version, 1);
    assert_eq!(analysis.evaluated_at, now());
}

#[test]
fn future_dated_history_counts_as_zero_days() {
    let debtor = debtor("future", 60_000.0, Some(-3), Some(-1));

    let metrics = DebtorMetrics::measure(&debtor, None, now());

    assert_eq!(metrics.days_since_payment, 0);
    assert_eq!(metrics.days_since_contact, 0);
}

#[test]
fn health_score_follows_balance_and_dormancy() {
    let debtor = never_touched("health", 250_000.0);

    assert_eq!(health_score(&debtor, 40), 55.0);
    assert_eq!(health_score(&debtor, NO_HISTORY_SENTINEL_DAYS), 0.0);
    assert_eq!(health_score(&never_touched("clear", 0.0), 0), 100.0);
    assert_eq!(health_score(&never_touched("credit", -50_000.0), 0), 100.0);
}

#[test]
fn health_score_does_not_influence_grading() {
    let rules = standard_rules();
    let healthy = debtor("healthy", 60_000.0, Some(90), Some(15));
    let metrics = DebtorMetrics::measure(&healthy, None, now());
    assert!(health_score(&healthy, metrics.days_since_payment) > 0.0);

    let matched = rules.select(&metrics).expect("grade assigned");

    assert_eq!(matched.id, "D");
}

#[test]
fn validation_flags_duplicates_and_suspicious_thresholds() {
    let mut silent = rule("A", 3, 0.0, 0, 0);
    silent.cooldown_amount = 0;
    let rules = RuleSet::new(
        1,
        vec![
            rule("B", 1, -10.0, 0, 0),
            rule("B", 2, 5.0, 0, 0),
            silent,
        ],
    );

    let warnings = rules.validate();

    assert!(warnings.contains(&RuleSetWarning::DuplicateGrade {
        grade: "B".to_string()
    }));
    assert!(warnings.contains(&RuleSetWarning::NegativeBalanceThreshold {
        grade: "B".to_string(),
        min_balance: -10.0
    }));
    assert!(warnings.contains(&RuleSetWarning::ZeroCooldown {
        grade: "A".to_string()
    }));
    assert!(!warnings
        .iter()
        .any(|warning| matches!(warning, RuleSetWarning::MissingCatchAll { .. })));
    assert!(standard_rules().validate().is_empty());
}

#[test]
fn rule_set_documents_deserialize_sorted() {
    let document = r#"{
        "version": 7,
        "rules": [
            {"id": "A", "priority": 9, "min_balance": 0, "min_days_since_payment": 0,
             "min_days_since_contact": 0, "cooldown_amount": 7, "cooldown_unit": "days"},
            {"id": "D", "priority": 1, "min_balance": 50000, "min_days_since_payment": 90,
             "min_days_since_contact": 15, "cooldown_amount": 48, "cooldown_unit": "hours",
             "channels": {"chat": true, "sms": true, "push": false},
             "templates": {"sms": "final_notice"}}
        ]
    }"#;

    let rules: RuleSet = serde_json::from_str(document).expect("rule set parses");

    assert_eq!(rules.version(), 7);
    assert_eq!(rules.rules()[0].id, "D");
    assert_eq!(rules.rules()[0].cooldown_hours(), 48);
    assert_eq!(rules.rules()[1].cooldown_hours(), 168);
    assert!(rules.rules()[1].channels.chat);
    assert_eq!(
        rules.rules()[0].templates.sms.as_deref(),
        Some("final_notice")
    );
}

//! Alert debounce behaviour over verdict sequences

use posture_monitor::{
    alert::{AlertEngine, AlertEvent, AlertPhase, SuggestionTable, GENERIC_SUGGESTION},
    classifier::{ErrorKind, PostureVerdict},
};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

fn activations(events: &[AlertEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, AlertEvent::Activated { .. }))
        .count()
}

#[test]
fn test_nine_bad_verdicts_never_alert() {
    let mut engine = AlertEngine::default();
    let bad = PostureVerdict::incorrect(ErrorKind::SpineTooCurved);

    let events: Vec<AlertEvent> = (0..9).map(|_| engine.update(&bad)).collect();
    assert_eq!(activations(&events), 0);
    assert_eq!(engine.phase(), AlertPhase::Streak);
    assert_eq!(engine.state().bad_posture_run_length, 9);
    assert!(!engine.state().active);
}

#[test]
fn test_tenth_bad_verdict_alerts_exactly_once() {
    let mut engine = AlertEngine::default();
    let bad = PostureVerdict::incorrect(ErrorKind::SpineTooCurved);

    let events: Vec<AlertEvent> = (0..11).map(|_| engine.update(&bad)).collect();
    assert_eq!(activations(&events), 1);
    match &events[9] {
        AlertEvent::Activated {
            error_kind,
            suggestions,
        } => {
            assert_eq!(*error_kind, ErrorKind::SpineTooCurved);
            assert_eq!(suggestions.len(), 3);
        }
        other => panic!("expected activation on the 10th verdict, got {other:?}"),
    }
    assert_eq!(events[10], AlertEvent::None);
    assert_eq!(engine.phase(), AlertPhase::Alerting);
}

#[test]
fn test_good_verdict_clears_immediately() {
    let mut engine = AlertEngine::default();
    let bad = PostureVerdict::incorrect(ErrorKind::NeckTilted);
    for _ in 0..12 {
        engine.update(&bad);
    }
    assert!(engine.state().active);

    assert_eq!(engine.update(&PostureVerdict::correct()), AlertEvent::Cleared);
    let state = engine.state();
    assert!(!state.active);
    assert_eq!(state.bad_posture_run_length, 0);
    assert_eq!(state.error_kind, None);
    assert_eq!(engine.phase(), AlertPhase::Idle);

    // Clearing while idle is harmless and still reported
    assert_eq!(engine.update(&PostureVerdict::correct()), AlertEvent::Cleared);
}

#[test]
fn test_rearms_only_after_idle() {
    let mut engine = AlertEngine::new(3, SuggestionTable::default());
    let bad = PostureVerdict::incorrect(ErrorKind::SpineTooStraight);

    let mut events = Vec::new();
    for _ in 0..6 {
        events.push(engine.update(&bad));
    }
    events.push(engine.update(&PostureVerdict::correct()));
    for _ in 0..3 {
        events.push(engine.update(&bad));
    }

    assert_eq!(activations(&events), 2);
    assert!(matches!(events[2], AlertEvent::Activated { .. }));
    assert!(matches!(events[9], AlertEvent::Activated { .. }));
}

#[test]
fn test_interrupted_streak_restarts_count() {
    let mut engine = AlertEngine::default();
    let bad = PostureVerdict::incorrect(ErrorKind::SpineTooCurved);

    for _ in 0..8 {
        engine.update(&bad);
    }
    engine.update(&PostureVerdict::correct());
    let events: Vec<AlertEvent> = (0..9).map(|_| engine.update(&bad)).collect();
    assert_eq!(activations(&events), 0);
}

#[test]
fn test_kind_change_within_streak_keeps_counting() {
    let mut engine = AlertEngine::new(4, SuggestionTable::default());
    engine.update(&PostureVerdict::incorrect(ErrorKind::SpineTooCurved));
    engine.update(&PostureVerdict::incorrect(ErrorKind::SpineTooCurved));
    engine.update(&PostureVerdict::incorrect(ErrorKind::NeckTilted));

    match engine.update(&PostureVerdict::incorrect(ErrorKind::NeckTilted)) {
        AlertEvent::Activated { error_kind, .. } => assert_eq!(error_kind, ErrorKind::NeckTilted),
        other => panic!("expected activation, got {other:?}"),
    }
}

#[test]
fn test_transition_times_recorded() {
    let mut engine = AlertEngine::new(2, SuggestionTable::default());
    let bad = PostureVerdict::incorrect(ErrorKind::NeckTilted);
    let start = Instant::now();

    engine.update_at(&bad, start);
    assert_eq!(engine.state().last_transition_time, Some(start));

    let later = start + Duration::from_millis(500);
    engine.update_at(&bad, later);
    assert_eq!(engine.state().last_transition_time, Some(later));

    let cleared = later + Duration::from_millis(500);
    engine.update_at(&PostureVerdict::correct(), cleared);
    assert_eq!(engine.state().last_transition_time, Some(cleared));
}

#[test]
fn test_unconfigured_kind_uses_generic_suggestion() {
    let mut entries = BTreeMap::new();
    entries.insert(ErrorKind::NeckTilted, vec!["Raise your screen".to_string()]);
    let table = SuggestionTable::new(entries).unwrap();
    let mut engine = AlertEngine::new(1, table);

    match engine.update(&PostureVerdict::incorrect(ErrorKind::SpineTooCurved)) {
        AlertEvent::Activated { suggestions, .. } => {
            assert_eq!(suggestions, vec![GENERIC_SUGGESTION.to_string()]);
        }
        other => panic!("expected activation, got {other:?}"),
    }
}

#[test]
fn test_zero_threshold_is_clamped() {
    let mut engine = AlertEngine::new(0, SuggestionTable::default());
    assert_eq!(engine.threshold(), 1);
    assert!(matches!(
        engine.update(&PostureVerdict::incorrect(ErrorKind::NeckTilted)),
        AlertEvent::Activated { .. }
    ));
}

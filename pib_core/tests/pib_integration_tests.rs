use pib_core::{
    Candidate, EventLog, Level, PibEvent, Policy, PolicyRecord, PolicyStore, Property, PropertySet,
    Request, Value,
};
use serde_json::json;

fn bulk_transfer_policy() -> Policy {
    Policy::new("bulk transfer")
        .with_match("is_wired_interface", true, Level::Requested)
        .with_action("MTU", 9600, Level::Immutable)
}

fn wired_candidate() -> Candidate {
    let seed: PropertySet = [Property::requested("is_wired_interface", true)]
        .into_iter()
        .collect();
    Candidate::new(&seed)
}

#[test]
fn test_matching_policy_is_applied() {
    let mut store = PolicyStore::new();
    let policy_id = store.register(bulk_transfer_policy()).unwrap();

    let mut candidate = wired_candidate();
    let matched = store.lookup(&mut candidate, true).unwrap();

    assert_eq!(matched, vec![policy_id]);
    assert!(candidate.has_applied(policy_id));
    let mtu = candidate.properties.get("MTU").unwrap();
    assert_eq!(mtu.value, Value::from(9600));
    assert_eq!(mtu.level, Level::Immutable);
}

#[test]
fn test_conflicting_candidate_is_removed() {
    let log = EventLog::new();
    let mut store = PolicyStore::new().with_event_log(log.clone());
    store.register(bulk_transfer_policy()).unwrap();

    let mut conflicting = wired_candidate();
    conflicting.add(Property::immutable("MTU", 1500)).unwrap();
    let conflicting_id = conflicting.id();

    // the violation surfaces directly from a single lookup
    let mut single = conflicting.clone();
    assert!(store.lookup(&mut single, true).is_err());

    let mut candidates = vec![conflicting, wired_candidate()];
    let report = store.lookup_all(&mut candidates);

    assert_eq!(report.evaluated, 2);
    assert_eq!(report.invalidated, vec![conflicting_id]);
    assert_eq!(report.retained(), 1);
    assert_eq!(candidates.len(), 1);
    assert_ne!(candidates[0].id(), conflicting_id);
    assert!(log
        .events()
        .contains(&PibEvent::CandidateInvalidated {
            candidate_id: conflicting_id
        }));
}

#[test]
fn test_wildcard_policy_matches_every_candidate() {
    let mut store = PolicyStore::new();
    let wildcard = store
        .register(Policy::new("default").with_action("TCP_CC", "cubic", Level::Informational))
        .unwrap();

    let mut candidates = vec![
        Candidate::default(),
        wired_candidate(),
        Candidate::new(&[Property::immutable("TCP", true)].into_iter().collect::<PropertySet>()),
    ];
    store.lookup_all(&mut candidates);

    assert_eq!(candidates.len(), 3);
    assert!(candidates.iter().all(|c| c.has_applied(wildcard)));
}

#[test]
fn test_confirmed_candidates_rank_higher() {
    let mut store = PolicyStore::new();
    store
        .register(
            Policy::new("prefer wired")
                .with_match("is_wired_interface", true, Level::Informational)
                .with_action("TCP_CC", "LBE", Level::Requested),
        )
        .unwrap();

    let mut request = Request::new(vec![], vec![("is_wired_interface", Value::from(true))], vec![])
        .unwrap();

    let mut agrees = request.candidate();
    agrees.add(Property::requested("TCP_CC", "LBE")).unwrap();
    let agrees_id = agrees.id();
    let mut differs = request.candidate();
    differs.add(Property::requested("TCP_CC", "cubic")).unwrap();
    let differs_id = differs.id();

    request.push_candidate(differs);
    request.push_candidate(agrees);
    let report = request.lookup_all(&store);
    assert!(report.invalidated.is_empty());

    let ranked = request.ranked();
    assert_eq!(ranked[0].id(), agrees_id);
    assert_eq!(ranked[1].id(), differs_id);
    assert!(ranked[0].score() > 0.0);
    assert!(ranked[1].score() < 0.0);
}

#[test]
fn test_general_policies_are_overridden_by_specific_ones() {
    let mut store = PolicyStore::new();
    store
        .register(
            Policy::new("specific")
                .with_match("is_wired_interface", true, Level::Requested)
                .with_match("TCP", true, Level::Requested)
                .with_action("TCP_CC", "LBE", Level::Requested),
        )
        .unwrap();
    store
        .register(Policy::new("general").with_action("TCP_CC", "cubic", Level::Requested))
        .unwrap();

    let mut candidate = wired_candidate();
    store.lookup(&mut candidate, true).unwrap();

    assert_eq!(candidate.applied_policies().len(), 2);
    assert_eq!(
        candidate.properties.get("TCP_CC").unwrap().value,
        Value::from("LBE")
    );
}

#[test]
fn test_records_drive_lookup() {
    let records = [
        json!({
            "name": "A",
            "description": "bulk file transfer",
            "priority": "0",
            "match": {"requested": {"is_wired_interface": true, "interface_speed": [1000, 100000]}},
            "properties": {"immutable": {"MTU": 9600}, "requested": {"TCP_CC": "LBE"}}
        }),
        json!({
            "name": "C",
            "match": {"requested": {"foo": "bar"}},
            "properties": {"immutable": {"foo3": "bar3"}}
        }),
    ];

    let mut store = PolicyStore::new();
    for record in records {
        let record: PolicyRecord = serde_json::from_value(record).unwrap();
        store.register(record.to_policy().unwrap()).unwrap();
    }

    let request = Request::new(
        vec![("is_wired_interface", Value::from(true))],
        vec![("interface_speed", Value::from(10000))],
        vec![],
    )
    .unwrap();
    let mut candidates = vec![request.candidate()];
    store.lookup_all(&mut candidates);

    let props = &candidates[0].properties;
    assert_eq!(props.get("MTU").unwrap().value, Value::from(9600));
    assert_eq!(props.get("TCP_CC").unwrap().value, Value::from("LBE"));
    assert!(!props.contains_key("foo3"));
}

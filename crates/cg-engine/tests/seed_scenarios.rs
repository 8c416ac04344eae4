//! End-to-end coverage of the six seed scenarios: single-valued pass, local
//! repair, remote repair, revup bootstrap, TID-dedup redelivery, and
//! concurrent unrelated writes (the "blank node" case — different subjects,
//! no conflict).

use cg_constraint::{CheckList, SingleValued, SubjectGraph};
use cg_dataset::{MemoryGraphStore, MemoryKv, Patch};
use cg_engine::{CloneConfig, CloneEngine, EngineState};
use cg_remotes::{MemoryBus, MemoryTransport, Transport};
use std::sync::Arc;

fn config(id: &str, domain: &str, genesis: bool) -> CloneConfig {
    CloneConfig {
        id: id.to_string(),
        domain: domain.to_string(),
        genesis,
        constraints: vec![],
        log_level: "error".to_string(),
        send_timeout_ms: 1_000,
        snapshot_batch_size: 2,
    }
}

type Engine = CloneEngine<MemoryGraphStore, CheckList, MemoryKv, MemoryTransport>;

fn engine(id: &str, domain: &str, genesis: bool, transport: Arc<MemoryTransport>) -> Engine {
    let checks = CheckList::new().push(SingleValued::new("name"));
    CloneEngine::new(config(id, domain, genesis), MemoryGraphStore::new(), checks, MemoryKv::new(), transport)
}

fn insert(subject: &str, predicate: &str, value: &str) -> Patch {
    Patch {
        inserts: vec![serde_json::json!({"@id": subject, predicate: value})],
        deletes: vec![],
    }
}

/// Bring up a genesis clone `a` and a joining clone `b` that bootstraps off
/// it via the real `NewClock`/`Revup` request flow, so every other test
/// starts from two clones with genuinely distinct tree-clock identities.
async fn bootstrap_pair(bus: &MemoryBus) -> (Engine, Engine) {
    let mut a = engine("a", "domain", true, Arc::new(bus.connect("a")));
    a.bootstrap().await.unwrap();

    let b_transport = Arc::new(bus.connect("b"));
    let a_task = tokio::spawn(async move {
        a.poll_once().await.unwrap(); // serves NewClock
        a.poll_once().await.unwrap(); // serves Revup
        a
    });

    let mut b = engine("b", "domain", false, b_transport);
    b.bootstrap().await.unwrap();
    assert_eq!(b.state(), EngineState::Online);

    let a = a_task.await.unwrap();
    (a, b)
}

#[tokio::test]
async fn bootstrap_fails_when_storage_is_already_locked() {
    let bus = MemoryBus::new();
    let kv = MemoryKv::new();
    let checks = || CheckList::new().push(SingleValued::new("name"));

    let mut a = CloneEngine::new(
        config("a", "domain", true),
        MemoryGraphStore::new(),
        checks(),
        kv.clone(),
        Arc::new(bus.connect("a")),
    );
    a.bootstrap().await.unwrap();

    let mut b = CloneEngine::new(
        config("b", "domain", true),
        MemoryGraphStore::new(),
        checks(),
        kv,
        Arc::new(bus.connect("b")),
    );
    assert!(b.bootstrap().await.is_err());
}

#[tokio::test]
async fn single_valued_write_passes_without_repair() {
    let bus = MemoryBus::new();
    let mut a = engine("a", "domain", true, Arc::new(bus.connect("a")));
    a.bootstrap().await.unwrap();

    let delta = a.transact(insert("s1", "name", "alice")).await.unwrap();
    assert!(delta.deletes.is_empty());
    assert_eq!(a.graph().values("s1", "name"), vec!["alice".to_string()]);
}

#[tokio::test]
async fn single_valued_violation_fails_the_local_transaction_with_no_state_change() {
    let bus = MemoryBus::new();
    let mut a = engine("a", "domain", true, Arc::new(bus.connect("a")));
    a.bootstrap().await.unwrap();

    // a local write asserting two values for the same subject/predicate
    // must fail outright — no repair, no state change, nothing journaled.
    let before = a.time().clone();
    let patch = Patch {
        inserts: vec![
            serde_json::json!({"@id": "fred", "name": "Fred"}),
            serde_json::json!({"@id": "fred", "name": "Flintstone"}),
        ],
        deletes: vec![],
    };
    assert!(a.transact(patch).await.is_err());
    assert!(a.graph().values("fred", "name").is_empty());
    assert_eq!(a.time(), &before);
}

#[tokio::test]
async fn joining_clone_catches_up_via_revup() {
    let bus = MemoryBus::new();
    let mut a = engine("a", "domain", true, Arc::new(bus.connect("a")));
    a.bootstrap().await.unwrap();
    a.transact(insert("s1", "name", "alice")).await.unwrap();
    a.transact(insert("s2", "name", "bob")).await.unwrap();

    let b_transport = Arc::new(bus.connect("b"));
    let a_task = tokio::spawn(async move {
        a.poll_once().await.unwrap(); // serves NewClock
        a.poll_once().await.unwrap(); // serves Revup
        a
    });

    let mut b = engine("b", "domain", false, b_transport);
    b.bootstrap().await.unwrap();
    assert_eq!(b.state(), EngineState::Online);

    let a = a_task.await.unwrap();
    assert_eq!(a.graph().values("s1", "name"), b.graph().values("s1", "name"));
    assert_eq!(b.graph().values("s2", "name"), vec!["bob".to_string()]);
}

#[tokio::test]
async fn concurrent_conflicting_writes_are_repaired_and_converge() {
    let bus = MemoryBus::new();
    let (mut a, mut b) = bootstrap_pair(&bus).await;

    a.transact(insert("s1", "name", "zoe")).await.unwrap();
    b.transact(insert("s1", "name", "alice")).await.unwrap();

    // each applies the other's concurrent write and must repair
    assert!(a.poll_once().await.unwrap().is_some());
    assert!(b.poll_once().await.unwrap().is_some());

    // and each must see the other's repair delta
    a.poll_once().await.unwrap();
    b.poll_once().await.unwrap();

    assert_eq!(a.graph().values("s1", "name"), vec!["alice".to_string()]);
    assert_eq!(b.graph().values("s1", "name"), vec!["alice".to_string()]);
}

#[tokio::test]
async fn redelivered_delta_is_a_no_op() {
    let bus = MemoryBus::new();
    let (mut a, mut b) = bootstrap_pair(&bus).await;
    let spy = bus.connect("spy");

    let delta = a.transact(insert("s1", "name", "alice")).await.unwrap();
    assert!(b.poll_once().await.unwrap().is_some());

    // simulate an at-least-once broker redelivering the same delta
    spy.publish("domain", delta.encode().unwrap()).await.unwrap();
    assert!(b.poll_once().await.unwrap().is_none());
    assert_eq!(b.graph().values("s1", "name"), vec!["alice".to_string()]);
}

#[tokio::test]
async fn concurrent_writes_to_different_subjects_merge_without_conflict() {
    let bus = MemoryBus::new();
    let (mut a, mut b) = bootstrap_pair(&bus).await;

    a.transact(insert("s1", "name", "alice")).await.unwrap();
    b.transact(insert("s2", "name", "bob")).await.unwrap();

    assert!(a.poll_once().await.unwrap().is_some());
    assert!(b.poll_once().await.unwrap().is_some());

    assert_eq!(a.graph().values("s2", "name"), vec!["bob".to_string()]);
    assert_eq!(b.graph().values("s1", "name"), vec!["alice".to_string()]);
}

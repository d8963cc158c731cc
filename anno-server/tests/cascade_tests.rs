//! Deletion cascade tests
//!
//! The label store and the ledger must stay in agreement through all
//! three deletion granularities, and instance numbers must stay dense.

use anno_common::model::{Block, Clip, PassKind, WorkItem};
use anno_common::Error;
use anno_server::{manifest, Engine, Store};

async fn setup_engine(items: &[(&str, u32)], users: &[(&str, &str, &str)]) -> Engine {
    let store = Store::open_in_memory().await.unwrap();
    let catalog: Vec<WorkItem> = items
        .iter()
        .map(|(file, index)| WorkItem::new(*file, *index, format!("blocks/{}/{}.zip", file, index)))
        .collect();
    manifest::sync_catalog(&store, &catalog).await.unwrap();

    let engine = Engine::load(store).await.unwrap();
    for (lab_key, lab_name, username) in users {
        engine.register_user(lab_key, lab_name, username).await.unwrap();
    }
    engine
}

fn block(item_id: &str, lab_key: &str, coder: &str, kind: PassKind) -> Block {
    let (file, index) = item_id.split_once(":::").unwrap();
    Block {
        item_id: item_id.to_string(),
        clan_file: file.to_string(),
        block_index: index.parse().unwrap(),
        lab_key: lab_key.to_string(),
        lab_name: format!("{} lab", lab_key),
        coder: coder.to_string(),
        instance: 0,
        kind,
        fan_or_man: false,
        dont_share: false,
        clips: vec![Clip {
            index: 0,
            tier: "FAN".to_string(),
            classification: "ids".to_string(),
            ..Default::default()
        }],
    }
}

#[tokio::test]
async fn deleting_a_middle_instance_renumbers_densely() {
    let engine = setup_engine(
        &[("fileT", 0)],
        &[("L1", "Seattle", "a"), ("L1", "Seattle", "b"), ("L1", "Seattle", "c")],
    )
    .await;

    for coder in ["a", "b", "c"] {
        engine.submit_block(block("fileT:::0", "L1", coder, PassKind::Training)).await.unwrap();
    }

    let group_deleted = engine.delete_instance("L1", "b", "fileT:::0", 1).await.unwrap();
    assert!(!group_deleted);

    let group = engine.group("fileT:::0").await.unwrap();
    let coders: Vec<&str> = group.blocks.iter().map(|b| b.coder.as_str()).collect();
    let instances: Vec<usize> = group.blocks.iter().map(|b| b.instance).collect();
    assert_eq!(coders, vec!["a", "c"], "submission order preserved");
    assert_eq!(instances, vec![0, 1], "instances renumbered from 0");
}

#[tokio::test]
async fn past_entry_survives_while_user_still_has_an_instance() {
    let engine = setup_engine(&[("fileT", 1)], &[("L1", "Seattle", "alice")]).await;

    engine.submit_block(block("fileT:::1", "L1", "alice", PassKind::Training)).await.unwrap();
    engine.submit_block(block("fileT:::1", "L1", "alice", PassKind::Training)).await.unwrap();

    engine.delete_instance("L1", "alice", "fileT:::1", 0).await.unwrap();
    let lab = engine.lab("L1").await.unwrap();
    assert!(
        lab.users["alice"].past_items.contains("fileT:::1"),
        "one of her instances remains, so the item stays past"
    );

    engine.delete_instance("L1", "alice", "fileT:::1", 0).await.unwrap();
    let lab = engine.lab("L1").await.unwrap();
    assert!(!lab.users["alice"].past_items.contains("fileT:::1"));
    assert!(matches!(engine.group("fileT:::1").await.unwrap_err(), Error::BlockGroupNotFound(_)));
}

#[tokio::test]
async fn instance_ownership_mismatch_is_an_inconsistency() {
    let engine = setup_engine(&[("fileT", 2)], &[("L1", "Seattle", "alice"), ("L1", "Seattle", "bob")]).await;
    engine.submit_block(block("fileT:::2", "L1", "alice", PassKind::Regular)).await.unwrap();

    // Bob claims alice's instance; nothing may be deleted.
    let err = engine.delete_instance("L1", "bob", "fileT:::2", 0).await.unwrap_err();
    assert!(matches!(err, Error::Inconsistency(_)));
    assert_eq!(engine.group("fileT:::2").await.unwrap().len(), 1);

    let err = engine.delete_instance("L1", "alice", "fileT:::2", 7).await.unwrap_err();
    assert!(matches!(err, Error::InstanceNotFound { .. }));
}

#[tokio::test]
async fn user_scope_delete_removes_only_their_instances() {
    let engine = setup_engine(
        &[("fileU", 0), ("fileU", 1)],
        &[("L1", "Seattle", "alice"), ("L1", "Seattle", "bob")],
    )
    .await;

    engine.submit_block(block("fileU:::0", "L1", "alice", PassKind::Regular)).await.unwrap();
    engine.submit_block(block("fileU:::0", "L1", "bob", PassKind::Regular)).await.unwrap();
    engine.submit_block(block("fileU:::1", "L1", "alice", PassKind::Training)).await.unwrap();

    engine.delete_user_instances("L1", "alice").await.unwrap();

    // Bob's instance survives, renumbered to the front.
    let group = engine.group("fileU:::0").await.unwrap();
    assert_eq!(group.len(), 1);
    assert_eq!(group.blocks[0].coder, "bob");
    assert_eq!(group.blocks[0].instance, 0);

    // Alice's training-only group is gone entirely.
    assert!(matches!(engine.group("fileU:::1").await.unwrap_err(), Error::BlockGroupNotFound(_)));

    let lab = engine.lab("L1").await.unwrap();
    let alice = &lab.users["alice"];
    assert!(alice.past_items.is_empty());
    assert!(alice.complete_train.is_empty());
    assert!(alice.complete_rel.is_empty());
    assert!(lab.users["bob"].past_items.contains("fileU:::0"), "bob's history untouched");
}

#[tokio::test]
async fn lab_scope_delete_clears_every_member() {
    // Alice and bob fill the regular cap for "fileB:::1"; carol's third
    // submission conflicts; deleting the lab removes both instances and
    // both users' history.
    let engine = setup_engine(
        &[("fileB", 1)],
        &[("L1", "Seattle", "alice"), ("L1", "Seattle", "bob"), ("L1", "Seattle", "carol")],
    )
    .await;

    engine.submit_block(block("fileB:::1", "L1", "alice", PassKind::Regular)).await.unwrap();
    engine.submit_block(block("fileB:::1", "L1", "bob", PassKind::Regular)).await.unwrap();
    let err = engine
        .submit_block(block("fileB:::1", "L1", "carol", PassKind::Regular))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BlockGroupFull(_)));

    engine.delete_lab_instances("L1").await.unwrap();

    assert!(matches!(engine.group("fileB:::1").await.unwrap_err(), Error::BlockGroupNotFound(_)));
    let lab = engine.lab("L1").await.unwrap();
    for user in lab.users.values() {
        assert!(user.past_items.is_empty());
        assert!(user.complete_train.is_empty());
        assert!(user.complete_rel.is_empty());
    }
    assert!(engine.completed_item_ids("L1").await.unwrap().is_empty());
}

#[tokio::test]
async fn lab_scope_delete_leaves_other_labs_alone() {
    let engine = setup_engine(
        &[("fileV", 0)],
        &[("L1", "Seattle", "alice"), ("L2", "Boston", "dora")],
    )
    .await;

    engine.submit_block(block("fileV:::0", "L1", "alice", PassKind::Regular)).await.unwrap();
    engine.submit_block(block("fileV:::0", "L2", "dora", PassKind::Regular)).await.unwrap();

    engine.delete_lab_instances("L1").await.unwrap();

    let group = engine.group("fileV:::0").await.unwrap();
    assert_eq!(group.len(), 1);
    assert_eq!(group.blocks[0].lab_key, "L2");
    assert_eq!(group.blocks[0].instance, 0);
    assert_eq!(engine.completed_item_ids("L2").await.unwrap(), vec!["fileV:::0"]);
}

#[tokio::test]
async fn shared_reliability_item_counted_per_user() {
    let engine = setup_engine(
        &[("fileW", 0)],
        &[("L1", "Seattle", "alice"), ("L1", "Seattle", "bob")],
    )
    .await;

    engine.submit_block(block("fileW:::0", "L1", "alice", PassKind::Reliability)).await.unwrap();
    engine.submit_block(block("fileW:::0", "L1", "bob", PassKind::Reliability)).await.unwrap();

    // Union across users keeps both contributions.
    let ids = engine.completed_reliability_ids("L1").await.unwrap();
    assert_eq!(ids, vec!["fileW:::0", "fileW:::0"]);
}

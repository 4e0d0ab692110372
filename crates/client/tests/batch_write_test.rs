//! Batch-write semantics: independent per-group outcomes, lazy result
//! consumption, early termination, session discipline

use meridian_client::mock::{MockDatabase, MockSessionProvider};
use meridian_client::{
    CallOptions, DatabaseClient, GroupStatus, Mutation, MutationGroup, RpcError, StatusCode,
};
use std::collections::BTreeSet;
use std::sync::Arc;

fn client() -> (
    DatabaseClient<MockSessionProvider, MockDatabase>,
    Arc<MockSessionProvider>,
    Arc<MockDatabase>,
) {
    let provider = Arc::new(MockSessionProvider::new("db"));
    let service = Arc::new(MockDatabase::new());
    (
        DatabaseClient::new(provider.clone(), service.clone()),
        provider,
        service,
    )
}

fn group(id: i64) -> MutationGroup {
    MutationGroup::new(vec![
        Mutation::insert("Singers").set("SingerId", id).build(),
        Mutation::update("Albums").set("SingerId", id).build(),
    ])
}

#[tokio::test]
async fn test_failed_group_does_not_stop_others() {
    let (client, _, service) = client();
    service.fail_group(1, RpcError::new(StatusCode::FailedPrecondition, "fk violation"));

    let stream = client
        .batch_write_at_least_once(vec![group(1), group(2), group(3)], CallOptions::new())
        .await
        .unwrap();
    let results = stream.collect().await;

    // Exactly one result per group, whatever the delivery order.
    assert_eq!(results.len(), 3);
    let covered: BTreeSet<usize> = results
        .iter()
        .flat_map(|r| r.group_indexes.iter().copied())
        .collect();
    assert_eq!(covered, BTreeSet::from([0, 1, 2]));

    for result in &results {
        if result.group_indexes.contains(&1) {
            match &result.status {
                GroupStatus::Failed { code, message } => {
                    assert_eq!(*code, StatusCode::FailedPrecondition);
                    assert_eq!(message, "fk violation");
                }
                other => panic!("group 1 should have failed, got {:?}", other),
            }
        } else {
            assert!(result.status.is_ok(), "group {:?} should be OK", result.group_indexes);
        }
    }
}

#[tokio::test]
async fn test_successful_groups_get_distinct_timestamps() {
    let (client, _, _service) = client();

    let stream = client
        .batch_write_at_least_once(vec![group(1), group(2)], CallOptions::new())
        .await
        .unwrap();
    let results = stream.collect().await;

    let timestamps: BTreeSet<_> = results
        .iter()
        .filter_map(|r| match r.status {
            GroupStatus::Ok { commit_timestamp } => Some(commit_timestamp),
            GroupStatus::Failed { .. } => None,
        })
        .collect();
    assert_eq!(timestamps.len(), 2);
}

#[tokio::test]
async fn test_transport_failure_ends_stream_early() {
    let (client, _, service) = client();
    service.cut_batch_after(1);

    let mut stream = client
        .batch_write_at_least_once(vec![group(1), group(2), group(3)], CallOptions::new())
        .await
        .unwrap();

    // The one delivered result remains valid.
    let first = stream.next().await.unwrap();
    assert!(first.status.is_ok());
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_stream_owns_session_until_dropped() {
    let (client, provider, _service) = client();

    let mut stream = client
        .batch_write_at_least_once(vec![group(1), group(2)], CallOptions::new())
        .await
        .unwrap();
    let _ = stream.next().await;
    assert_eq!(provider.active_sessions(), 1);

    // Dropping before draining still releases exactly once.
    drop(stream);
    assert_eq!(provider.acquired(), 1);
    assert_eq!(provider.released(), 1);
}

//! At-least-once and partitioned DML semantics through the client facade

use meridian_client::mock::{MockDatabase, MockSessionProvider};
use meridian_client::{
    CallOptions, ClientError, DatabaseClient, Mutation, RpcError, Statement, StatusCode,
};
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

fn keyed_write(id: i64) -> Mutation {
    Mutation::insert_or_update("Singers").set("SingerId", id).build()
}

#[tokio::test]
async fn test_at_least_once_does_not_retry_on_abort() {
    let (client, provider, service) = client();
    service.fail_next_commits(1, RpcError::aborted("conflict"));

    let err = client
        .write_at_least_once(vec![keyed_write(1)], CallOptions::new())
        .await
        .unwrap_err();

    // Single attempt only: the abort surfaces instead of being absorbed.
    assert!(err.is_aborted());
    assert_eq!(service.commit_attempts(), 1);
    assert_eq!(provider.released(), 1);
}

#[tokio::test]
async fn test_at_least_once_transport_failure_is_ambiguous() {
    let (client, _, service) = client();
    service.fail_next_commits(1, RpcError::new(StatusCode::Unavailable, "connection reset"));

    let err = client
        .write_at_least_once(vec![keyed_write(1)], CallOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::AmbiguousOutcome(_)));
}

#[tokio::test]
async fn test_transactional_write_retries_where_at_least_once_does_not() {
    let (client, _, service) = client();
    service.fail_next_commits(1, RpcError::aborted("conflict"));

    let response = client.write(vec![keyed_write(1)], CallOptions::new()).await.unwrap();
    assert_eq!(response.mutation_count, Some(1));
    // First attempt aborted, second applied.
    assert_eq!(service.commit_attempts(), 2);
    assert_eq!(service.commit_count(), 1);
}

#[tokio::test]
async fn test_pdml_errors_surface_unretried() {
    let (client, _, service) = client();
    service.fail_pdml(RpcError::new(StatusCode::InvalidArgument, "not partitionable"));

    let err = client
        .partitioned_update(Statement::of("UPDATE Singers SET x = 1"), CallOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::InvalidArgument(_)));
    assert_eq!(service.pdml_requests().len(), 0);
}

#[tokio::test]
async fn test_pdml_returns_lower_bound_count() {
    let (client, provider, service) = client();
    service.set_pdml_rows(100_000);

    let rows = client
        .partitioned_update(
            Statement::of("DELETE FROM Events WHERE ts < @cutoff").bind("cutoff", 1_700_000_000i64),
            CallOptions::new(),
        )
        .await
        .unwrap();

    assert_eq!(rows, 100_000);
    assert_eq!(provider.released(), 1);
}

#[tokio::test]
async fn test_aborted_statement_retries_whole_function() {
    let (client, _, service) = client();
    service.fail_next_update(RpcError::aborted("wounded"));

    let (rows, _) = client
        .read_write_transaction(CallOptions::new())
        .run(|txn| async move {
            txn.execute_update(Statement::of("UPDATE Singers SET FirstName = 'Hi'")).await
        })
        .await
        .unwrap();

    assert_eq!(rows, 1);
    // Aborted first statement, retried attempt ran it again and committed.
    assert_eq!(service.update_count(), 1);
    assert_eq!(service.commit_attempts(), 1);
    assert_eq!(service.commit_requests()[0].attempt, 2);
}

use std::time::Duration;

use anonsync::anonymizer::anonymize_customer;
use anonsync::destination::base::Destination;
use anonsync::destination::memory::MemoryDestination;
use anonsync::error::ErrorKind;
use anonsync::pipeline::Pipeline;
use anonsync::source::memory::{MemoryChangeEvent, MemoryChangeSource, MemoryReindexSource};
use anonsync::types::{Address, Batch, Customer, CustomerId};
use anonsync_config::shared::{
    AnonymizerConfig, BatchConfig, CollectionsConfig, MongoConnectionConfig, PipelineConfig,
};
use anonsync_telemetry::tracing::init_test_tracing;
use mongodb::bson::DateTime;
use tokio::time::sleep;

/// Builds a key whose ordering follows `n`.
fn customer_id(n: u8) -> CustomerId {
    CustomerId::from_bytes([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, n])
}

/// Builds a deterministic customer record keyed by `n`.
fn customer(n: u8) -> Customer {
    Customer {
        id: customer_id(n),
        first_name: format!("First{n}"),
        last_name: format!("Last{n}"),
        email: format!("user{n}@example.com"),
        address: Address {
            line1: format!("{n} High Street"),
            line2: "Unit 1".to_owned(),
            postcode: format!("PC{n}"),
            city: "Springfield".to_owned(),
            state: "IL".to_owned(),
            country: "US".to_owned(),
        },
        created_at: DateTime::from_millis(1_700_000_000_000 + i64::from(n)),
    }
}

/// The record the pipeline is expected to write for `customer(n)` under the
/// default digest length.
fn anonymized(n: u8) -> Customer {
    anonymize_customer(&customer(n), 8).unwrap()
}

fn batch_config(max_size: usize, max_fill_ms: u64) -> BatchConfig {
    BatchConfig {
        max_size,
        max_fill_ms,
    }
}

fn pipeline_config(batch: BatchConfig) -> PipelineConfig {
    PipelineConfig {
        connection: MongoConnectionConfig::new("mongodb://localhost:27017", "testdb"),
        collections: CollectionsConfig::default(),
        batch,
        anonymizer: AnonymizerConfig::default(),
    }
}

/// Waits until the destination committed at least `commits` batches.
///
/// The tests run under paused time, so the sleeps auto-advance the clock and
/// the loop settles deterministically.
async fn wait_for_commits<P>(destination: &MemoryDestination<P>, commits: usize)
where
    P: Clone + std::fmt::Debug + Send + Sync + 'static,
{
    for _ in 0..200 {
        if destination.commits().await >= commits {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }

    panic!("timed out waiting for {commits} committed batches");
}

#[tokio::test]
async fn full_reindex_flushes_one_batch_and_checkpoints_the_last_key() {
    init_test_tracing();

    let destination = MemoryDestination::<CustomerId>::new();
    let source = MemoryReindexSource::new(vec![customer(1), customer(2)], destination.clone());

    let mut pipeline = Pipeline::new(
        pipeline_config(batch_config(2, 10_000)),
        source,
        destination.clone(),
    );
    pipeline.start().await.unwrap();
    pipeline.wait().await.unwrap();

    assert_eq!(destination.commits().await, 1);
    assert_eq!(destination.output().await, vec![anonymized(1), anonymized(2)]);
    assert_eq!(destination.checkpoint().await, Some(customer_id(2)));
}

#[tokio::test]
async fn reindex_resumes_strictly_after_the_checkpointed_key() {
    init_test_tracing();

    let records: Vec<Customer> = (1..=10).map(customer).collect();

    let destination = MemoryDestination::<CustomerId>::new();
    destination.set_checkpoint(customer_id(5)).await;

    let source = MemoryReindexSource::new(records, destination.clone());
    let mut pipeline = Pipeline::new(
        pipeline_config(batch_config(100, 10_000)),
        source,
        destination.clone(),
    );
    pipeline.start().await.unwrap();
    pipeline.wait().await.unwrap();

    // Only keys 6..=10 were rescanned, in ascending order.
    let expected: Vec<Customer> = (6..=10).map(anonymized).collect();
    assert_eq!(destination.output().await, expected);
    assert_eq!(destination.checkpoint().await, Some(customer_id(10)));
    assert_eq!(destination.commits().await, 1);
}

#[tokio::test]
async fn reindex_checkpoint_advances_monotonically_across_runs() {
    init_test_tracing();

    let destination = MemoryDestination::<CustomerId>::new();

    let source = MemoryReindexSource::new((1..=3).map(customer).collect(), destination.clone());
    let mut pipeline = Pipeline::new(
        pipeline_config(batch_config(100, 10_000)),
        source,
        destination.clone(),
    );
    pipeline.start().await.unwrap();
    pipeline.wait().await.unwrap();

    let first_checkpoint = destination.checkpoint().await.unwrap();
    assert_eq!(first_checkpoint, customer_id(3));

    // A later run over a grown dataset picks up after the first checkpoint.
    let source = MemoryReindexSource::new((1..=6).map(customer).collect(), destination.clone());
    let mut pipeline = Pipeline::new(
        pipeline_config(batch_config(100, 10_000)),
        source,
        destination.clone(),
    );
    pipeline.start().await.unwrap();
    pipeline.wait().await.unwrap();

    let second_checkpoint = destination.checkpoint().await.unwrap();
    assert_eq!(second_checkpoint, customer_id(6));
    assert!(second_checkpoint > first_checkpoint);
    assert_eq!(destination.commits().await, 2);
    assert_eq!(destination.output().await.len(), 6);
}

#[tokio::test]
async fn size_threshold_splits_a_reindex_into_full_batches() {
    init_test_tracing();

    let destination = MemoryDestination::<CustomerId>::new();
    let source = MemoryReindexSource::new((1..=6).map(customer).collect(), destination.clone());

    let mut pipeline = Pipeline::new(
        pipeline_config(batch_config(3, 600_000)),
        source,
        destination.clone(),
    );
    pipeline.start().await.unwrap();
    pipeline.wait().await.unwrap();

    // Two size-triggered flushes and no trailing empty one.
    assert_eq!(destination.commits().await, 2);
    assert_eq!(destination.output().await.len(), 6);
    assert_eq!(destination.checkpoint().await, Some(customer_id(6)));
}

#[tokio::test(start_paused = true)]
async fn idle_timeout_flushes_a_partial_sync_batch() {
    init_test_tracing();

    let destination = MemoryDestination::<u64>::new();
    let (source, events) = MemoryChangeSource::new(destination.clone());

    let mut pipeline = Pipeline::new(
        pipeline_config(batch_config(1000, 1000)),
        source,
        destination.clone(),
    );
    pipeline.start().await.unwrap();

    events
        .send(MemoryChangeEvent::insert(customer(1), 1))
        .unwrap();
    events
        .send(MemoryChangeEvent::insert(customer(2), 2))
        .unwrap();

    // Far below the size threshold: only the idle timer can flush.
    wait_for_commits(&destination, 1).await;

    assert_eq!(destination.output().await, vec![anonymized(1), anonymized(2)]);
    assert_eq!(destination.checkpoint().await, Some(2));

    pipeline.shutdown_and_wait().await.unwrap();

    // The shutdown drain had nothing left to flush.
    assert_eq!(destination.commits().await, 1);
}

#[tokio::test(start_paused = true)]
async fn sync_forwards_only_inserts_and_updates() {
    init_test_tracing();

    let destination = MemoryDestination::<u64>::new();
    let (source, events) = MemoryChangeSource::new(destination.clone());

    let mut pipeline = Pipeline::new(
        pipeline_config(batch_config(3, 600_000)),
        source,
        destination.clone(),
    );
    pipeline.start().await.unwrap();

    events
        .send(MemoryChangeEvent::insert(customer(1), 1))
        .unwrap();
    events.send(MemoryChangeEvent::delete(2)).unwrap();
    events
        .send(MemoryChangeEvent::insert(customer(3), 3))
        .unwrap();
    events.send(MemoryChangeEvent::other(4)).unwrap();
    events
        .send(MemoryChangeEvent::update(customer(5), 5))
        .unwrap();

    // The three forwardable events fill the batch; the skipped ones advance
    // the feed position without being written.
    wait_for_commits(&destination, 1).await;

    assert_eq!(
        destination.output().await,
        vec![anonymized(1), anonymized(3), anonymized(5)]
    );
    assert_eq!(destination.checkpoint().await, Some(5));

    pipeline.shutdown_and_wait().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn sync_resumes_strictly_after_the_committed_token() {
    init_test_tracing();

    let destination = MemoryDestination::<u64>::new();
    destination.set_checkpoint(5).await;

    let (source, events) = MemoryChangeSource::new(destination.clone());
    let mut pipeline = Pipeline::new(
        pipeline_config(batch_config(1, 600_000)),
        source,
        destination.clone(),
    );
    pipeline.start().await.unwrap();

    // Tokens at or before the checkpoint are never redelivered.
    events
        .send(MemoryChangeEvent::insert(customer(4), 4))
        .unwrap();
    events
        .send(MemoryChangeEvent::insert(customer(5), 5))
        .unwrap();
    events
        .send(MemoryChangeEvent::insert(customer(6), 6))
        .unwrap();

    wait_for_commits(&destination, 1).await;

    assert_eq!(destination.output().await, vec![anonymized(6)]);
    assert_eq!(destination.checkpoint().await, Some(6));
    assert_eq!(destination.commits().await, 1);

    pipeline.shutdown_and_wait().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_flushes_the_pending_remainder() {
    init_test_tracing();

    let destination = MemoryDestination::<u64>::new();
    let (source, events) = MemoryChangeSource::new(destination.clone());

    let mut pipeline = Pipeline::new(
        pipeline_config(batch_config(1000, 600_000)),
        source,
        destination.clone(),
    );
    pipeline.start().await.unwrap();

    events
        .send(MemoryChangeEvent::insert(customer(1), 1))
        .unwrap();
    events
        .send(MemoryChangeEvent::insert(customer(2), 2))
        .unwrap();

    // Let the worker buffer both events before requesting shutdown; neither
    // the size threshold nor the idle timer has fired yet.
    sleep(Duration::from_millis(10)).await;
    assert_eq!(destination.commits().await, 0);

    pipeline.shutdown_and_wait().await.unwrap();

    assert_eq!(destination.commits().await, 1);
    assert_eq!(destination.output().await, vec![anonymized(1), anonymized(2)]);
    assert_eq!(destination.checkpoint().await, Some(2));
}

#[tokio::test(start_paused = true)]
async fn change_feed_end_flushes_then_surfaces_an_error() {
    init_test_tracing();

    let destination = MemoryDestination::<u64>::new();
    let (source, events) = MemoryChangeSource::new(destination.clone());

    let mut pipeline = Pipeline::new(
        pipeline_config(batch_config(1000, 600_000)),
        source,
        destination.clone(),
    );
    pipeline.start().await.unwrap();

    events
        .send(MemoryChangeEvent::insert(customer(1), 1))
        .unwrap();
    drop(events);

    // The feed ending is fatal for an infinite source, but the pending
    // remainder is still committed first.
    let err = pipeline.wait().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ChangeFeedEnded);

    assert_eq!(destination.commits().await, 1);
    assert_eq!(destination.output().await, vec![anonymized(1)]);
    assert_eq!(destination.checkpoint().await, Some(1));
}

#[tokio::test]
async fn failed_commit_leaves_no_partial_state_and_replay_converges() {
    init_test_tracing();

    let destination = MemoryDestination::<CustomerId>::new();
    destination.fail_next_commit().await;

    let source = MemoryReindexSource::new((1..=3).map(customer).collect(), destination.clone());
    let mut pipeline = Pipeline::new(
        pipeline_config(batch_config(100, 10_000)),
        source,
        destination.clone(),
    );
    pipeline.start().await.unwrap();

    let err = pipeline.wait().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransactionFailed);

    // Neither the records nor the checkpoint became observable.
    assert!(destination.output().await.is_empty());
    assert_eq!(destination.checkpoint().await, None);
    assert_eq!(destination.commits().await, 0);

    // A restart replays from the absent checkpoint and converges.
    let source = MemoryReindexSource::new((1..=3).map(customer).collect(), destination.clone());
    let mut pipeline = Pipeline::new(
        pipeline_config(batch_config(100, 10_000)),
        source,
        destination.clone(),
    );
    pipeline.start().await.unwrap();
    pipeline.wait().await.unwrap();

    assert_eq!(destination.output().await.len(), 3);
    assert_eq!(destination.checkpoint().await, Some(customer_id(3)));
}

#[tokio::test]
async fn malformed_email_stops_the_pipeline_before_any_commit() {
    init_test_tracing();

    let mut bad_record = customer(1);
    bad_record.email = "missing-separator".to_owned();

    let destination = MemoryDestination::<CustomerId>::new();
    let source = MemoryReindexSource::new(vec![bad_record], destination.clone());

    let mut pipeline = Pipeline::new(
        pipeline_config(batch_config(100, 10_000)),
        source,
        destination.clone(),
    );
    pipeline.start().await.unwrap();

    let err = pipeline.wait().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);

    assert!(destination.output().await.is_empty());
    assert_eq!(destination.checkpoint().await, None);
}

#[tokio::test]
async fn applying_the_same_batch_twice_is_idempotent() {
    init_test_tracing();

    let destination = MemoryDestination::<CustomerId>::new();
    let batch = Batch {
        records: vec![anonymized(1), anonymized(2)],
        position: customer_id(2),
    };

    destination.upsert_with_progress(batch.clone()).await.unwrap();
    let after_first = destination.output().await;

    destination.upsert_with_progress(batch).await.unwrap();
    let after_second = destination.output().await;

    assert_eq!(after_first, after_second);
    assert_eq!(destination.checkpoint().await, Some(customer_id(2)));
}

#[tokio::test]
async fn upserts_replace_previous_record_versions() {
    init_test_tracing();

    let destination = MemoryDestination::<CustomerId>::new();

    let original = anonymized(1);
    destination
        .upsert_with_progress(Batch {
            records: vec![original.clone()],
            position: customer_id(1),
        })
        .await
        .unwrap();

    // The source record changed; the re-upserted digest supersedes the old one.
    let mut changed = customer(1);
    changed.first_name = "Renamed".to_owned();
    let reanonymized = anonymize_customer(&changed, 8).unwrap();

    destination
        .upsert_with_progress(Batch {
            records: vec![reanonymized.clone()],
            position: customer_id(1),
        })
        .await
        .unwrap();

    let output = destination.output().await;
    assert_eq!(output, vec![reanonymized.clone()]);
    assert_ne!(output[0].first_name, original.first_name);
}

//! Visit counter tests

mod common;

use std::sync::Arc;

use common::init_tracing;
use kments_core::visit::{COUNT_ALL_KEY, VisitCounter, page_counter_key};
use kments_counter_adapter_memory::CounterAdapterMemory;
use kments_types::counter_adapter::{CounterAdapter, CounterValue, Pipeline};
use kments_types::error::Error;
use kments_types::utils::page_id;

fn create_counter() -> (VisitCounter, Arc<CounterAdapterMemory>) {
	init_tracing();
	let store = Arc::new(CounterAdapterMemory::new());
	(VisitCounter::new(store.clone()), store)
}

async fn read(store: &CounterAdapterMemory, key: &str) -> i64 {
	let reply = store.exec(Pipeline::new().get(key)).await.expect("exec");
	reply.into_values().expect("values")[0].as_int().unwrap_or(0)
}

#[tokio::test]
async fn test_repeat_visits_are_not_counted() {
	let (visits, store) = create_counter();

	assert_eq!(visits.count_visit(Some("/post/1"), "10.0.0.1").await.expect("count"), 1);
	assert_eq!(visits.count_visit(Some("/post/1"), "10.0.0.1").await.expect("count"), 1);
	assert_eq!(visits.count_visit(Some("/post/1/"), "10.0.0.2").await.expect("count"), 2);

	let key = page_counter_key(&page_id("/post/1").expect("page id"));
	assert_eq!(read(&store, &key).await, 2);
}

#[tokio::test]
async fn test_site_total_counts_unique_visitors() {
	let (visits, store) = create_counter();

	visits.count_visit(Some("/a"), "10.0.0.1").await.expect("count");
	visits.count_visit(Some("/b"), "10.0.0.1").await.expect("count");
	visits.count_visit(Some("/b"), "10.0.0.2").await.expect("count");
	assert_eq!(read(&store, COUNT_ALL_KEY).await, 2);

	// reading the total as a known visitor does not count
	assert_eq!(visits.count_visit(None, "10.0.0.2").await.expect("count"), 2);
	assert_eq!(visits.count_visit(None, "10.0.0.3").await.expect("count"), 3);
	assert_eq!(visits.count_visit(None, "10.0.0.3").await.expect("count"), 3);
}

#[tokio::test]
async fn test_pages_view_never_counts() {
	let (visits, store) = create_counter();
	visits.count_visit(Some("/seen"), "10.0.0.1").await.expect("count");

	let pages = vec!["/seen".to_string(), "/unseen".to_string(), "/seen?x=1".to_string()];
	assert_eq!(visits.pages_view(&pages).await.expect("view"), vec![1, 0, 1]);
	assert_eq!(visits.pages_view(&pages).await.expect("view"), vec![1, 0, 1]);
	assert!(visits.pages_view(&[]).await.expect("view").is_empty());

	assert_eq!(read(&store, COUNT_ALL_KEY).await, 1);
}

#[tokio::test]
async fn test_pages_view_reports_failed_reads() {
	let (visits, store) = create_counter();
	visits.count_visit(Some("/ok"), "10.0.0.1").await.expect("count");

	// a sorted set where a counter belongs
	let broken = page_counter_key(&page_id("/broken").expect("page id"));
	store.exec(Pipeline::new().zadd(&broken, 1, "x")).await.expect("exec");

	let pages = vec!["/ok".to_string(), "/broken".to_string()];
	assert_eq!(visits.pages_view(&pages).await.expect("view"), vec![1, -1]);

	// counting on the broken key fails as a whole
	let res = visits.count_visit(Some("/broken"), "10.0.0.1").await;
	assert!(matches!(res, Err(Error::PartialPipelineFailure { .. })));
}

#[tokio::test]
async fn test_partial_failure_versus_default() {
	let (_, store) = create_counter();
	store.exec(Pipeline::new().zadd("typed", 1, "x")).await.expect("exec");

	let pipeline = || Pipeline::new().incr("fine").get("typed").zcard("typed");
	let reply = store.exec(pipeline()).await.expect("exec");
	match reply.into_values() {
		Err(Error::PartialPipelineFailure { failed, .. }) => assert_eq!(failed, vec![1]),
		other => panic!("expected partial failure, got {:?}", other),
	}

	let values = store.exec(pipeline()).await.expect("exec").into_values_or(&CounterValue::Int(-1));
	assert_eq!(values, vec![CounterValue::Int(2), CounterValue::Int(-1), CounterValue::Int(1)]);
}

#[tokio::test]
async fn test_store_failure_propagates() {
	let (visits, store) = create_counter();
	store.set_unavailable(true);

	let res = visits.count_visit(Some("/a"), "10.0.0.1").await;
	assert!(matches!(res, Err(Error::StoreUnavailable(_))));
	let res = visits.pages_view(&["/a".to_string()]).await;
	assert!(matches!(res, Err(Error::StoreUnavailable(_))));
}

#[tokio::test]
async fn test_failed_visit_counts_on_retry() {
	let (visits, store) = create_counter();

	store.set_unavailable(true);
	assert!(visits.count_visit(Some("/post/1"), "10.0.0.1").await.is_err());
	assert!(visits.count_visit(None, "10.0.0.2").await.is_err());
	store.set_unavailable(false);

	assert_eq!(visits.count_visit(Some("/post/1"), "10.0.0.1").await.expect("count"), 1);
	assert_eq!(read(&store, COUNT_ALL_KEY).await, 1);
	assert_eq!(visits.count_visit(None, "10.0.0.2").await.expect("count"), 2);
}

#[tokio::test]
async fn test_partial_failure_keeps_applied_site_count() {
	let (visits, store) = create_counter();
	let broken = page_counter_key(&page_id("/broken").expect("page id"));
	store.exec(Pipeline::new().zadd(&broken, 1, "x")).await.expect("exec");

	// the page increment fails, the site increment goes through
	let res = visits.count_visit(Some("/broken"), "10.0.0.1").await;
	assert!(matches!(res, Err(Error::PartialPipelineFailure { .. })));
	assert_eq!(read(&store, COUNT_ALL_KEY).await, 1);

	// the site total is not counted twice for the same visitor
	store.exec(Pipeline::new().del(&broken)).await.expect("exec");
	assert_eq!(visits.count_visit(Some("/broken"), "10.0.0.1").await.expect("count"), 1);
	assert_eq!(read(&store, COUNT_ALL_KEY).await, 1);
}

// vim: ts=4

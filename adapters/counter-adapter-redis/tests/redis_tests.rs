//! Pipeline tests against a live Redis server
//!
//! Skipped unless `KMENTS_TEST_REDIS_URL` points to a disposable database.

use kments::counter_adapter::{CounterAdapter, CounterValue, Pipeline, ScoreBound};
use kments::utils::random_id;
use kments_counter_adapter_redis::CounterAdapterRedis;

async fn create_test_adapter() -> Option<CounterAdapterRedis> {
	let url = std::env::var("KMENTS_TEST_REDIS_URL").ok()?;
	Some(CounterAdapterRedis::new(&url).await.expect("Failed to connect to redis"))
}

/// Unique key prefix so parallel test runs do not collide
fn test_key(name: &str) -> String {
	format!("kments-test-{}-{}", random_id(8), name)
}

#[tokio::test]
async fn test_sorted_set_window() {
	let Some(adapter) = create_test_adapter().await else {
		return;
	};
	let key = test_key("window");

	let pipeline = Pipeline::new()
		.zadd(&key, 0, "0:a")
		.zadd(&key, 500, "500:b")
		.zadd(&key, 1500, "1500:c")
		.zremrangebyscore(&key, ScoreBound::NegInf, ScoreBound::Inclusive(500))
		.zcard(&key)
		.zrevrange(&key, 0, -1)
		.del(&key);
	let values = adapter.exec(pipeline).await.expect("exec").into_values().expect("values");

	assert_eq!(values[3].as_int(), Some(2));
	assert_eq!(values[4].as_int(), Some(1));
	let scored = values[5].clone().into_scored();
	assert_eq!(scored.len(), 1);
	assert_eq!(&*scored[0].member, "1500:c");
	assert_eq!(scored[0].score, 1500);
}

#[tokio::test]
async fn test_pexpire() {
	let Some(adapter) = create_test_adapter().await else {
		return;
	};
	let key = test_key("expire");

	let pipeline = Pipeline::new().zadd(&key, 1, "a").pexpire(&key, 50).pexpire(&test_key("none"), 50);
	let values = adapter.exec(pipeline).await.expect("exec").into_values().expect("values");
	assert_eq!(values[1].as_int(), Some(1));
	assert_eq!(values[2].as_int(), Some(0));

	tokio::time::sleep(std::time::Duration::from_millis(200)).await;
	let values =
		adapter.exec(Pipeline::new().exists(&key)).await.expect("exec").into_values().expect("values");
	assert!(!values[0].as_bool());
}

#[tokio::test]
async fn test_strings_and_sets() {
	let Some(adapter) = create_test_adapter().await else {
		return;
	};
	let counter = test_key("count");
	let set = test_key("set");

	let pipeline = Pipeline::new()
		.get(&counter)
		.incr(&counter)
		.incr(&counter)
		.sadd(&set, "1.2.3.4")
		.sismember(&set, "1.2.3.4")
		.exists(&set)
		.srem(&set, "1.2.3.4")
		.setex(&counter, 60, "0")
		.get(&counter)
		.del(&counter);
	let values = adapter.exec(pipeline).await.expect("exec").into_values().expect("values");

	assert_eq!(values[0], CounterValue::Nil);
	assert_eq!(values[2].as_int(), Some(2));
	assert!(values[4].as_bool());
	assert_eq!(values[5].as_int(), Some(1));
	assert_eq!(values[7], CounterValue::Ok);
	assert_eq!(values[8].as_int(), Some(0));
}

#[tokio::test]
async fn test_wrong_type_is_per_command() {
	let Some(adapter) = create_test_adapter().await else {
		return;
	};
	let key = test_key("typed");

	let pipeline = Pipeline::new().incr(&key).zcard(&key).get(&key).del(&key);
	let reply = adapter.exec(pipeline).await.expect("exec");
	assert_eq!(reply.failed(), vec![1]);

	let values = reply.into_values_or(&CounterValue::Int(-1));
	assert_eq!(values[1], CounterValue::Int(-1));
	assert_eq!(values[2].as_int(), Some(1));
}

#[tokio::test]
async fn test_unreachable_server() {
	if std::env::var("KMENTS_TEST_REDIS_URL").is_err() {
		return;
	}
	// nothing listens on the discard port
	assert!(CounterAdapterRedis::new("redis://127.0.0.1:9/").await.is_err());
}

// vim: ts=4

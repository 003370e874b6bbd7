use std::path::PathBuf;
use std::sync::Arc;

use kments::config::KmentsConfig;
use kments::prelude::*;
use kments::AppBuilder;
use kments_comment_adapter_sqlite::CommentAdapterSqlite;
use kments_counter_adapter_redis::CounterAdapterRedis;

#[tokio::main]
async fn main() -> ClResult<()> {
	let config_path =
		PathBuf::from(std::env::var("KMENTS_CONFIG").unwrap_or_else(|_| "kments.yaml".to_string()));
	let config = KmentsConfig::load(&config_path)?;

	let counter_adapter = Arc::new(CounterAdapterRedis::new(&config.redis_url).await?);
	let comment_adapter = Arc::new(CommentAdapterSqlite::new(&*config.db).await?);

	let mut builder = AppBuilder::new(config);
	builder.counter_adapter(counter_adapter).comment_adapter(comment_adapter);
	builder.run().await.inspect_err(|e| error!("FATAL: {}", e))
}

// vim: ts=4

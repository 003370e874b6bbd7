//! Page visit counters.
//!
//! Counters live in the counter store. Repeat visits from the same IP are
//! suppressed by sets kept in this process, so counts are unique visitors
//! per process lifetime.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use kments_types::counter_adapter::{CounterAdapter, CounterValue, Pipeline};
use kments_types::utils::page_id;

use crate::prelude::*;

/// Site-wide visitor counter
pub const COUNT_ALL_KEY: &str = "count-all";

pub fn page_counter_key(page_id: &PageId) -> String {
	format!("count:{}", page_id)
}

#[derive(Debug, Default)]
struct SeenVisitors {
	pages: HashMap<PageId, HashSet<Box<str>>>,
	global: HashSet<Box<str>>,
}

#[derive(Debug)]
pub struct VisitCounter {
	counter: Arc<dyn CounterAdapter>,
	seen: Mutex<SeenVisitors>,
}

impl VisitCounter {
	pub fn new(counter: Arc<dyn CounterAdapter>) -> Self {
		Self { counter, seen: Mutex::new(SeenVisitors::default()) }
	}

	/// Counts a visit and returns the counter including it.
	///
	/// `pathname = None` reads the site total. A first visit to a page also
	/// counts towards the site total when the IP is new to this process.
	pub async fn count_visit(&self, pathname: Option<&str>, ip: &str) -> ClResult<i64> {
		let Some(pathname) = pathname else {
			let first = self.seen.lock().global.insert(ip.into());
			let pipeline = if first {
				Pipeline::new().incr(COUNT_ALL_KEY)
			} else {
				Pipeline::new().get(COUNT_ALL_KEY)
			};
			let res = self.first_int(pipeline).await;
			if let (Err(e), true) = (&res, first) {
				debug!("visit to site total not counted: {}", e);
				self.seen.lock().global.remove(ip);
			}
			return res;
		};

		let page_id = page_id(pathname)?;
		let key = page_counter_key(&page_id);
		let (first_on_page, first_global) = {
			let mut seen = self.seen.lock();
			let first_on_page = seen.pages.entry(page_id.clone()).or_default().insert(ip.into());
			(first_on_page, first_on_page && seen.global.insert(ip.into()))
		};

		let mut pipeline =
			if first_on_page { Pipeline::new().incr(&key) } else { Pipeline::new().get(&key) };
		if first_global {
			pipeline = pipeline.incr(COUNT_ALL_KEY);
		}
		let res = self.first_int(pipeline).await;
		match &res {
			Err(e) if first_on_page => {
				// a command that did not apply leaves the visitor unseen
				debug!("visit to {} not counted: {}", page_id, e);
				let mut seen = self.seen.lock();
				if !applied(e, 0) {
					if let Some(ips) = seen.pages.get_mut(&page_id) {
						ips.remove(ip);
					}
				}
				if first_global && !applied(e, 1) {
					seen.global.remove(ip);
				}
			}
			_ => {}
		}
		res
	}

	/// Reads the counters of many pages without counting a visit.
	///
	/// Missing counters read 0, failed reads -1.
	pub async fn pages_view(&self, pathnames: &[String]) -> ClResult<Vec<i64>> {
		if pathnames.is_empty() {
			return Ok(Vec::new());
		}
		let mut pipeline = Pipeline::new();
		for pathname in pathnames {
			pipeline = pipeline.get(&page_counter_key(&page_id(pathname)?));
		}
		let values = self.counter.exec(pipeline).await?.into_values_or(&CounterValue::Int(-1));
		Ok(values.iter().map(|v| v.as_int().unwrap_or(0)).collect())
	}

	async fn first_int(&self, pipeline: Pipeline) -> ClResult<i64> {
		let values = self.counter.exec(pipeline).await?.into_values()?;
		Ok(values.first().and_then(CounterValue::as_int).unwrap_or(0))
	}
}

/// Whether command `idx` took effect in a pipeline that returned `err`
fn applied(err: &Error, idx: usize) -> bool {
	match err {
		Error::PartialPipelineFailure { failed, .. } => !failed.contains(&idx),
		_ => false,
	}
}

// vim: ts=4

//! App builder - constructs and runs the kments application

use std::net::SocketAddr;
use std::sync::Arc;

use kments_core::clock::{Clock, SystemClock};
use kments_core::config::KmentsConfig;
use kments_types::comment_adapter::CommentAdapter;
use kments_types::counter_adapter::CounterAdapter;

use crate::prelude::*;
use crate::routes;

pub use kments_core::app::{App, AppState, ServerMode, VERSION};

pub struct AppBuilder {
	config: KmentsConfig,
	clock: Arc<dyn Clock>,
	counter_adapter: Option<Arc<dyn CounterAdapter>>,
	comment_adapter: Option<Arc<dyn CommentAdapter>>,
}

impl AppBuilder {
	pub fn new(config: KmentsConfig) -> Self {
		// a second builder in the same process keeps the first subscriber
		let _ = tracing_subscriber::fmt()
			.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
			.with_target(false)
			.try_init();
		AppBuilder { config, clock: Arc::new(SystemClock), counter_adapter: None, comment_adapter: None }
	}

	// Opts
	pub fn mode(&mut self, mode: ServerMode) -> &mut Self {
		self.config.mode = mode;
		self
	}
	pub fn listen(&mut self, listen: impl Into<Box<str>>) -> &mut Self {
		self.config.listen = listen.into();
		self
	}
	pub fn clock(&mut self, clock: Arc<dyn Clock>) -> &mut Self {
		self.clock = clock;
		self
	}

	// Adapters
	pub fn counter_adapter(&mut self, counter_adapter: Arc<dyn CounterAdapter>) -> &mut Self {
		self.counter_adapter = Some(counter_adapter);
		self
	}
	pub fn comment_adapter(&mut self, comment_adapter: Arc<dyn CommentAdapter>) -> &mut Self {
		self.comment_adapter = Some(comment_adapter);
		self
	}

	/// Creates the app state and fills the recent comments index
	pub async fn build(&self) -> ClResult<App> {
		let Some(counter_adapter) = self.counter_adapter.clone() else {
			error!("FATAL: No counter adapter configured");
			return Err(Error::Internal("No counter adapter configured".to_string()));
		};
		let Some(comment_adapter) = self.comment_adapter.clone() else {
			error!("FATAL: No comment adapter configured");
			return Err(Error::Internal("No comment adapter configured".to_string()));
		};

		let app: App = Arc::new(AppState::new(
			&self.config,
			counter_adapter,
			comment_adapter,
			self.clock.clone(),
		)?);

		// A cold index is also refilled on the next deletion
		match app.recent.warm_up().await {
			Ok(len) => info!("Recent comments index holds {} entries", len),
			Err(e) => warn!("Failed to warm up recent comments index: {}", e),
		}

		Ok(app)
	}

	pub async fn run(self) -> ClResult<()> {
		info!(" _                         _");
		info!("| | ___ __ ___   ___ _ __ | |_ ___");
		info!("| |/ / '_ ` _ \\ / _ \\ '_ \\| __/ __|");
		info!("|   <| | | | | |  __/ | | | |_\\__ \\");
		info!("|_|\\_\\_| |_| |_|\\___|_| |_|\\__|___/");
		info!("V{}", VERSION);
		info!("");

		let app = self.build().await?;
		let router = routes::init(app.clone());

		let listener = tokio::net::TcpListener::bind(self.config.listen.as_ref()).await?;
		info!("Listening on {} ({:?} mode)", self.config.listen, app.mode);

		axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
			.with_graceful_shutdown(shutdown_signal())
			.await?;

		info!("Server stopped");
		Ok(())
	}
}

async fn shutdown_signal() {
	let ctrl_c = async {
		match tokio::signal::ctrl_c().await {
			Ok(()) => info!("Received Ctrl+C, shutting down"),
			Err(e) => {
				warn!("Failed to install Ctrl+C handler: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(unix)]
	let terminate = async {
		use tokio::signal::unix::{SignalKind, signal};
		match signal(SignalKind::terminate()) {
			Ok(mut sig) => {
				sig.recv().await;
				info!("Received terminate signal, shutting down");
			}
			Err(e) => {
				warn!("Failed to install signal handler: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => {},
		() = terminate => {},
	}
}

// vim: ts=4

//! HTTP server
use axum::{
	routing::{get, post},
	Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
	config::Config,
	handlers::{self, AppState},
	listener::ListenerClient,
};

/// Routes of the proxy
pub fn router(listener: ListenerClient) -> Router {
	Router::new()
		.route(
			"/api/bridge/create-request",
			post(handlers::create_bridge_request).fallback(handlers::method_not_allowed),
		)
		.route(
			"/api/bridge/initiate",
			post(handlers::initiate_bridge).fallback(handlers::method_not_allowed),
		)
		.route(
			"/api/htlc/create-ordinal-htlc",
			post(handlers::create_ordinal_htlc).fallback(handlers::method_not_allowed),
		)
		.route(
			"/api/htlc/execute-refund",
			post(handlers::execute_refund).fallback(handlers::method_not_allowed),
		)
		.route(
			"/api/htlc/status/:request_id",
			get(handlers::htlc_status).fallback(handlers::method_not_allowed),
		)
		.fallback(handlers::not_found)
		.layer(TraceLayer::new_for_http())
		.with_state(AppState { listener })
}

/// Serve the proxy until the process is stopped
pub async fn serve(config: Config) -> anyhow::Result<()> {
	let listener = ListenerClient::new(&config.bridge_listener_url, config.request_timeout())?;

	let tcp_listener = TcpListener::bind(config.listen_address).await?;
	info!(
		"Proxying bridge requests on {} to {}",
		tcp_listener.local_addr()?,
		config.bridge_listener_url
	);

	axum::serve(tcp_listener, router(listener)).await?;

	Ok(())
}

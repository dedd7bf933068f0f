//! Client of the external bridge listener service
use std::time::Duration;

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::trace;
use url::Url;

use crate::error::ProxyError;

/// Response of the listener, passed through to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct Upstream {
	/// HTTP status returned by the listener
	pub status: u16,
	/// JSON body returned by the listener
	pub body: Value,
}

impl IntoResponse for Upstream {
	fn into_response(self) -> Response {
		let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_GATEWAY);
		(status, Json(self.body)).into_response()
	}
}

/// Forwards requests to the bridge listener
#[derive(Debug, Clone)]
pub struct ListenerClient {
	http_client: reqwest::Client,
	base_url: String,
}

impl ListenerClient {
	/// Create a listener client. The base URL is only parsed when a request
	/// is forwarded.
	pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
		let http_client = reqwest::Client::builder().timeout(timeout).build()?;

		Ok(Self {
			http_client,
			base_url: base_url.into(),
		})
	}

	/// Build the listener URL for the given path segments
	pub fn url(&self, segments: &[&str]) -> Result<Url, ProxyError> {
		let mut url = Url::parse(&self.base_url)?;

		url.path_segments_mut()
			.map_err(|_| {
				ProxyError::InvalidListenerUrl(format!(
					"{} cannot be used as a base URL",
					self.base_url
				))
			})?
			.pop_if_empty()
			.extend(segments);

		Ok(url)
	}

	/// POST a JSON body to the listener
	pub async fn post<T>(&self, segments: &[&str], body: &T) -> Result<Upstream, ProxyError>
	where
		T: Serialize + ?Sized,
	{
		let url = self.url(segments)?;
		trace!("Forwarding POST {}", url);

		self.send(self.http_client.post(url).json(body)).await
	}

	/// GET a resource from the listener
	pub async fn get(&self, segments: &[&str]) -> Result<Upstream, ProxyError> {
		let url = self.url(segments)?;
		trace!("Forwarding GET {}", url);

		self.send(self.http_client.get(url)).await
	}

	async fn send(&self, request: reqwest::RequestBuilder) -> Result<Upstream, ProxyError> {
		let response = request.send().await.map_err(ProxyError::from_transport)?;
		let status = response.status().as_u16();
		let bytes = response.bytes().await.map_err(ProxyError::from_transport)?;

		let body = if bytes.is_empty() {
			json!({})
		} else {
			serde_json::from_slice(&bytes).unwrap_or_else(|_| {
				json!({
					"error": "Unexpected response from bridge listener service",
					"details": String::from_utf8_lossy(&bytes),
				})
			})
		};

		trace!("Listener responded {}: {}", status, body);

		Ok(Upstream { status, body })
	}
}

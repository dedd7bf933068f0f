//! Proxy errors and their JSON rendering
use std::{error::Error as _, io};

use axum::{
	extract::rejection::JsonRejection,
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Body of every error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
	/// Fixed error message
	pub error: String,
	/// Underlying cause, when there is one
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub details: Option<String>,
}

/// Errors returned by the proxy handlers
#[derive(Debug, Error)]
pub enum ProxyError {
	/// Required fields are absent or empty
	#[error("Missing required fields")]
	MissingFields(Vec<&'static str>),
	/// The body is not the expected JSON
	#[error("Invalid request body")]
	InvalidBody(String),
	/// A field is present but malformed
	#[error("Invalid {field}")]
	InvalidField {
		/// Name of the field, as sent on the wire
		field: &'static str,
		/// Why it was rejected
		reason: String,
	},
	/// Known path, wrong method
	#[error("Method not allowed")]
	MethodNotAllowed,
	/// Unknown path
	#[error("Not found")]
	NotFound,
	/// The listener refused the connection
	#[error("Bridge listener service is not running")]
	ListenerNotRunning(String),
	/// The configured listener URL cannot be used
	#[error("Invalid bridge listener URL")]
	InvalidListenerUrl(String),
	/// Any other transport failure
	#[error("Failed to reach bridge listener service")]
	Transport(String),
}

impl ProxyError {
	/// HTTP status of the error response
	pub fn status(&self) -> StatusCode {
		match self {
			Self::MissingFields(_) | Self::InvalidBody(_) | Self::InvalidField { .. } => {
				StatusCode::BAD_REQUEST
			}
			Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
			Self::NotFound => StatusCode::NOT_FOUND,
			Self::ListenerNotRunning(_) | Self::InvalidListenerUrl(_) | Self::Transport(_) => {
				StatusCode::INTERNAL_SERVER_ERROR
			}
		}
	}

	fn details(&self) -> Option<String> {
		match self {
			Self::MissingFields(fields) => Some(fields.join(", ")),
			Self::InvalidField { reason, .. } => Some(reason.clone()),
			Self::InvalidBody(details)
			| Self::ListenerNotRunning(details)
			| Self::InvalidListenerUrl(details)
			| Self::Transport(details) => Some(details.clone()),
			Self::MethodNotAllowed | Self::NotFound => None,
		}
	}

	/// Classify a failed call to the listener by its transport failure mode
	pub fn from_transport(err: reqwest::Error) -> Self {
		let details = err.to_string();

		if err.is_builder() {
			Self::InvalidListenerUrl(details)
		} else if is_connection_refused(&err) {
			Self::ListenerNotRunning(details)
		} else {
			Self::Transport(details)
		}
	}
}

fn is_connection_refused(err: &reqwest::Error) -> bool {
	let mut source = err.source();

	while let Some(cause) = source {
		if let Some(io_err) = cause.downcast_ref::<io::Error>() {
			if io_err.kind() == io::ErrorKind::ConnectionRefused {
				return true;
			}
		}
		source = cause.source();
	}

	false
}

impl From<JsonRejection> for ProxyError {
	fn from(rejection: JsonRejection) -> Self {
		Self::InvalidBody(rejection.body_text())
	}
}

impl From<url::ParseError> for ProxyError {
	fn from(err: url::ParseError) -> Self {
		Self::InvalidListenerUrl(err.to_string())
	}
}

impl IntoResponse for ProxyError {
	fn into_response(self) -> Response {
		let status = self.status();
		if status.is_server_error() {
			warn!("Forwarding failed: {}: {:?}", self, self.details());
		}

		let body = ErrorBody {
			error: self.to_string(),
			details: self.details(),
		};

		(status, Json(body)).into_response()
	}
}

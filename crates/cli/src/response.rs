//! Plain-text response model.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

/// Outcome class of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
	Ok,
	/// Malformed or missing parameter.
	BadRequest,
	/// No device session.
	Forbidden,
	/// Unknown command.
	NotFound,
	/// `shell` without a POST body.
	MethodNotAllowed,
	/// Driver or transport failure.
	InternalError,
}

impl Status {
	pub fn http(self) -> StatusCode {
		match self {
			Status::Ok => StatusCode::OK,
			Status::BadRequest => StatusCode::BAD_REQUEST,
			Status::Forbidden => StatusCode::FORBIDDEN,
			Status::NotFound => StatusCode::NOT_FOUND,
			Status::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
			Status::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	pub fn code(self) -> u16 {
		self.http().as_u16()
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
	pub status: Status,
	pub body: String,
}

impl CommandResponse {
	pub fn ok(body: impl Into<String>) -> Self {
		Self::with_status(Status::Ok, body)
	}

	pub fn with_status(status: Status, body: impl Into<String>) -> Self {
		Self {
			status,
			body: body.into(),
		}
	}
}

impl IntoResponse for CommandResponse {
	fn into_response(self) -> Response {
		(
			self.status.http(),
			[(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
			self.body,
		)
			.into_response()
	}
}

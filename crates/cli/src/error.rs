use chimp::TransferError;
use thiserror::Error;

use crate::response::{CommandResponse, Status};

/// Every way a command can fail. Each variant maps to exactly one [`Status`].
#[derive(Debug, Error)]
pub enum CommandError {
	#[error("device not connected.")]
	NotReady,

	#[error("not supported.")]
	UnknownCommand(String),

	#[error("missing required parameter '{0}'")]
	MissingParam(&'static str),

	#[error("invalid value '{value}' for parameter '{name}': {reason}")]
	InvalidParam {
		name: &'static str,
		value: String,
		reason: String,
	},

	#[error("use POST")]
	UsePost,

	#[error("device not connected within timeout ({attempts} attempts in {elapsed_ms}ms)")]
	ConnectTimeout { attempts: u32, elapsed_ms: u128 },

	#[error("SERVER INTERNAL ERROR: {}: {}", .0.category(), .0.message())]
	Transfer(#[from] TransferError),

	#[error("SERVER INTERNAL ERROR: {0}")]
	Device(#[from] chimp::Error),
}

impl CommandError {
	pub fn status(&self) -> Status {
		match self {
			CommandError::NotReady => Status::Forbidden,
			CommandError::UnknownCommand(_) => Status::NotFound,
			CommandError::MissingParam(_) | CommandError::InvalidParam { .. } => Status::BadRequest,
			CommandError::UsePost => Status::MethodNotAllowed,
			CommandError::ConnectTimeout { .. } | CommandError::Transfer(_) | CommandError::Device(_) => {
				Status::InternalError
			}
		}
	}

	/// True for failures caused by the caller rather than the device.
	pub fn is_client_error(&self) -> bool {
		!matches!(self.status(), Status::InternalError)
	}
}

impl From<CommandError> for CommandResponse {
	fn from(err: CommandError) -> Self {
		CommandResponse::with_status(err.status(), err.to_string())
	}
}

//! Error types for the device runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving `adb` or the monkey service.
#[derive(Debug, Error)]
pub enum Error {
	/// No adb executable could be located.
	#[error("adb not found. Install the Android platform-tools or pass --adb <PATH>")]
	AdbNotFound,

	/// The adb process could not be spawned.
	#[error("Failed to launch adb: {0}")]
	LaunchFailed(String),

	/// adb ran but exited unsuccessfully.
	#[error("adb {command} failed (exit {status}): {output}")]
	CommandFailed { command: String, status: String, output: String },

	/// Timeout waiting for an operation.
	#[error("Timeout: {0}")]
	Timeout(String),

	/// Failed to establish the monkey connection.
	#[error("Failed to connect to monkey: {0}")]
	ConnectionFailed(String),

	/// Monkey answered a request with `ERROR`.
	#[error("monkey rejected '{command}': {message}")]
	Monkey { command: String, message: String },

	/// Protocol-level error (unparseable reply).
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

impl From<chimp_protocol::ParseError> for Error {
	fn from(err: chimp_protocol::ParseError) -> Self {
		Error::ProtocolError(err.to_string())
	}
}

/// Failure categories of a file push or pull.
///
/// Each variant carries the message reported by adb (or the local I/O layer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
	/// Local I/O failed, including failure to run adb at all.
	#[error("IoError: {0}")]
	Io(String),

	/// The adb server refused the request (device offline, unauthorized, missing).
	#[error("CommandRejected: {0}")]
	CommandRejected(String),

	/// The transfer did not finish within its time budget.
	#[error("Timeout: {0}")]
	Timeout(String),

	/// The sync protocol reported a failure (missing remote file, permission denied, ...).
	#[error("SyncError: {0}")]
	Sync(String),
}

impl TransferError {
	/// Short name of the failure category.
	pub fn category(&self) -> &'static str {
		match self {
			TransferError::Io(_) => "IoError",
			TransferError::CommandRejected(_) => "CommandRejected",
			TransferError::Timeout(_) => "Timeout",
			TransferError::Sync(_) => "SyncError",
		}
	}

	pub fn message(&self) -> &str {
		match self {
			TransferError::Io(msg)
			| TransferError::CommandRejected(msg)
			| TransferError::Timeout(msg)
			| TransferError::Sync(msg) => msg,
		}
	}
}

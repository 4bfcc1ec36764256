use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	#[error(transparent)]
	Runtime(#[from] chimp_runtime::Error),

	#[error("no device matching '{pattern}' became available within {timeout_ms}ms")]
	NoDevice { pattern: String, timeout_ms: u128 },

	#[error("unsupported operation: {0}")]
	Unsupported(String),

	#[error("unknown image format '{0}'")]
	UnknownImageFormat(String),

	#[error("invalid pixel buffer: {0}")]
	InvalidPixels(String),

	#[error("image encoding failed: {0}")]
	Image(#[from] image::ImageError),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

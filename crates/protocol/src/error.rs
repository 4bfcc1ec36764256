use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
	#[error("unknown press type '{0}' (expected one of: down, up, move, downAndUp)")]
	UnknownPressType(String),

	#[error("malformed monkey reply: {0:?}")]
	MalformedReply(String),
}

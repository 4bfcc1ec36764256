//! Line protocol spoken by the on-device `monkey --port` service.
//!
//! Every request is one newline-terminated line and every response is one line:
//!
//! ```text
//! > touch down 120 480
//! < OK
//! > getvar build.model
//! < OK:Pixel 7
//! > key down KEYCODE_BOGUS
//! < ERROR:unknown keycode
//! ```

use std::fmt;

use crate::error::ParseError;

/// A single monkey request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonkeyCommand {
	KeyDown { key: String },
	KeyUp { key: String },
	/// Key down followed by key up.
	Press { key: String },
	TouchDown { x: i32, y: i32 },
	TouchUp { x: i32, y: i32 },
	TouchMove { x: i32, y: i32 },
	/// Touch down followed by touch up.
	Tap { x: i32, y: i32 },
	/// Text without line breaks; callers split on `\n` and send `KEYCODE_ENTER`.
	Type { text: String },
	Wake,
	GetVar { name: String },
	ListVar,
	/// Terminates the monkey process.
	Quit,
}

impl MonkeyCommand {
	/// Renders the command as a protocol line, without the trailing newline.
	pub fn to_line(&self) -> String {
		self.to_string()
	}
}

impl fmt::Display for MonkeyCommand {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MonkeyCommand::KeyDown { key } => write!(f, "key down {key}"),
			MonkeyCommand::KeyUp { key } => write!(f, "key up {key}"),
			MonkeyCommand::Press { key } => write!(f, "press {key}"),
			MonkeyCommand::TouchDown { x, y } => write!(f, "touch down {x} {y}"),
			MonkeyCommand::TouchUp { x, y } => write!(f, "touch up {x} {y}"),
			MonkeyCommand::TouchMove { x, y } => write!(f, "touch move {x} {y}"),
			MonkeyCommand::Tap { x, y } => write!(f, "tap {x} {y}"),
			MonkeyCommand::Type { text } => write!(f, "type {}", quote_argument(text)),
			MonkeyCommand::Wake => f.write_str("wake"),
			MonkeyCommand::GetVar { name } => write!(f, "getvar {name}"),
			MonkeyCommand::ListVar => f.write_str("listvar"),
			MonkeyCommand::Quit => f.write_str("quit"),
		}
	}
}

/// Monkey splits arguments on whitespace unless they are double-quoted.
fn quote_argument(text: &str) -> String {
	if !text.is_empty() && !text.chars().any(|c| c.is_whitespace() || c == '"' || c == '\\') {
		return text.to_string();
	}
	let mut quoted = String::with_capacity(text.len() + 2);
	quoted.push('"');
	for c in text.chars() {
		if c == '"' || c == '\\' {
			quoted.push('\\');
		}
		quoted.push(c);
	}
	quoted.push('"');
	quoted
}

/// A parsed monkey response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonkeyReply {
	/// `OK` or `OK:<value>`
	Ok(Option<String>),
	/// `ERROR` or `ERROR:<message>`
	Error(Option<String>),
}

impl MonkeyReply {
	pub fn parse(line: &str) -> Result<Self, ParseError> {
		let line = line.trim_end_matches(['\r', '\n']);
		if let Some(rest) = line.strip_prefix("OK") {
			return match rest.strip_prefix(':') {
				Some(value) => Ok(MonkeyReply::Ok(Some(value.to_string()))),
				None if rest.is_empty() => Ok(MonkeyReply::Ok(None)),
				None => Err(ParseError::MalformedReply(line.to_string())),
			};
		}
		if let Some(rest) = line.strip_prefix("ERROR") {
			return match rest.strip_prefix(':') {
				Some(message) => Ok(MonkeyReply::Error(Some(message.to_string()))),
				None if rest.is_empty() => Ok(MonkeyReply::Error(None)),
				None => Err(ParseError::MalformedReply(line.to_string())),
			};
		}
		Err(ParseError::MalformedReply(line.to_string()))
	}
}

//! Press-type tokens accepted by the `press` and `touch` commands.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Gesture phase for a key or touch event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PressType {
	/// Press without releasing
	Down,
	/// Release a previous press
	Up,
	/// Move an active touch
	Move,
	/// Press then release
	#[default]
	DownAndUp,
}

impl PressType {
	pub const ALL: [PressType; 4] = [PressType::Down, PressType::Up, PressType::Move, PressType::DownAndUp];

	/// Returns the token used on the REST surface.
	pub fn identifier(self) -> &'static str {
		match self {
			PressType::Down => "down",
			PressType::Up => "up",
			PressType::Move => "move",
			PressType::DownAndUp => "downAndUp",
		}
	}
}

impl fmt::Display for PressType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.identifier())
	}
}

impl FromStr for PressType {
	type Err = ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		PressType::ALL
			.into_iter()
			.find(|kind| kind.identifier() == s)
			.ok_or_else(|| ParseError::UnknownPressType(s.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_every_identifier() {
		for kind in PressType::ALL {
			assert_eq!(kind.identifier().parse::<PressType>(), Ok(kind));
		}
	}

	#[test]
	fn rejects_unknown_and_miscased_tokens() {
		assert!("tap".parse::<PressType>().is_err());
		assert!("DOWN".parse::<PressType>().is_err());
		assert!("downandup".parse::<PressType>().is_err());
		assert!("".parse::<PressType>().is_err());
	}

	#[test]
	fn default_is_down_and_up() {
		assert_eq!(PressType::default(), PressType::DownAndUp);
	}

	#[test]
	fn serde_uses_rest_tokens() {
		let json = serde_json::to_string(&PressType::DownAndUp).unwrap();
		assert_eq!(json, "\"downAndUp\"");
		let parsed: PressType = serde_json::from_str("\"move\"").unwrap();
		assert_eq!(parsed, PressType::Move);
	}
}

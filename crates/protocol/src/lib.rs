//! Wire types shared by the chimp-rest crates.
//!
//! # Main Types
//!
//! - [`PressType`] - Gesture phase for key and touch events
//! - [`MonkeyCommand`] - One line of the on-device monkey protocol
//! - [`MonkeyReply`] - Parsed monkey response line

pub mod error;
pub mod monkey;
pub mod press;

pub use monkey::{MonkeyCommand, MonkeyReply};
pub use error::ParseError;
pub use press::PressType;

//! Drag gesture geometry.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
	pub x: i32,
	pub y: i32,
}

impl Point {
	pub const fn new(x: i32, y: i32) -> Self {
		Self { x, y }
	}
}

/// A straight-line drag from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drag {
	pub start: Point,
	pub end: Point,
	/// Number of intermediate move events.
	pub steps: u32,
	/// Total duration of the move phase.
	pub duration: Duration,
}

impl Drag {
	/// Largest accepted `steps`.
	pub const MAX_STEPS: u32 = 1_000;
	/// Largest accepted `duration`.
	pub const MAX_DURATION: Duration = Duration::from_secs(60);

	/// Points visited by move events, evenly spaced, ending at `end`.
	///
	/// Computed lazily; nothing is buffered per step.
	pub fn points(self) -> impl Iterator<Item = Point> {
		let steps = i64::from(self.steps);
		let (dx, dy) = (
			i64::from(self.end.x) - i64::from(self.start.x),
			i64::from(self.end.y) - i64::from(self.start.y),
		);
		(1..=steps).map(move |i| Point {
			x: (i64::from(self.start.x) + dx * i / steps) as i32,
			y: (i64::from(self.start.y) + dy * i / steps) as i32,
		})
	}

	/// Pause between consecutive move events.
	pub fn step_pause(&self) -> Duration {
		if self.steps == 0 {
			Duration::ZERO
		} else {
			self.duration / self.steps
		}
	}
}

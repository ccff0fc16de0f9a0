use std::time::{Duration, Instant};

/// Timing of one tick, captured at the top of the tick before the slot is admitted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameTiming {
	/// time since the previous tick, since construction for the first
	pub delta: Duration,
	/// time since the timer was created or last reset
	pub total: Duration,
	/// starts at 0, counts every tick including ones whose frame failed
	pub frame_index: u64,
}

pub struct FrameTimer {
	start: Instant,
	last: Instant,
	frame_index: u64,
}

impl FrameTimer {
	pub fn new() -> Self {
		let now = Instant::now();
		Self {
			start: now,
			last: now,
			frame_index: 0,
		}
	}

	pub fn tick(&mut self) -> FrameTiming {
		let now = Instant::now();
		let timing = FrameTiming {
			delta: now - self.last,
			total: now - self.start,
			frame_index: self.frame_index,
		};
		self.last = now;
		self.frame_index += 1;
		timing
	}

	/// Restarts both clocks and the index, as if freshly constructed.
	pub fn reset(&mut self) {
		*self = Self::new();
	}

	pub fn frame_index(&self) -> u64 {
		self.frame_index
	}
}

impl Default for FrameTimer {
	fn default() -> Self {
		Self::new()
	}
}

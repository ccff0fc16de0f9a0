/// Countdown of how many frame slots still hold a stale copy of some CPU-side value.
///
/// A value mirrored into per-slot upload buffers must be rewritten into every slot once after it changes,
/// because each slot keeps its own copy. [`mark`](Self::mark) on change, [`consume`](Self::consume) once per
/// frame while updating that slot's buffers.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct DirtyFrames {
	remaining: usize,
}

impl DirtyFrames {
	/// Fully dirty: a freshly created value no slot has seen yet.
	pub fn new(frames_in_flight: usize) -> Self {
		Self {
			remaining: frames_in_flight,
		}
	}

	/// Nothing to refresh.
	pub fn clean() -> Self {
		Self { remaining: 0 }
	}

	/// The value changed: every slot's copy is stale again, including slots mid-countdown.
	pub fn mark(&mut self, frames_in_flight: usize) {
		self.remaining = frames_in_flight;
	}

	/// Whether the current frame still has to rewrite its slot's copy. Decrements while dirty and clamps at
	/// zero: consuming a clean countdown stays clean rather than wrapping around.
	pub fn consume(&mut self) -> bool {
		if self.remaining > 0 {
			self.remaining -= 1;
			true
		} else {
			false
		}
	}

	pub fn is_dirty(&self) -> bool {
		self.remaining > 0
	}

	pub fn remaining(&self) -> usize {
		self.remaining
	}
}

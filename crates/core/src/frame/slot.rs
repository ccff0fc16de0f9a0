use crate::platform::FramePlatform;

/// Where a frame slot is in its lifecycle. Retirement is observed lazily: a `Submitted` slot whose fence value
/// has completed stays `Submitted` until its next cycle, where it passes the gate instantly.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SlotState {
	/// Never submitted, or a recording was abandoned before submit.
	Idle,
	/// Between gate admission and submit. Payload writes are allowed.
	Recording,
	/// Stamped with a fence value the device may not have retired yet.
	Submitted,
}

/// One frame's worth of device resources: the command allocator that frame records through, the caller's
/// per-frame payload `F` (the slot's upload buffers), and the fence stamp of the slot's most recent
/// submission.
///
/// Mutable access to the payload and the allocator only exists through the gate's
/// [`RecordingFrame`](crate::frame::RecordingFrame) guard, which is what keeps CPU writes between gate
/// admission and submit.
pub struct FrameSlot<P: FramePlatform, F> {
	pub(super) index: usize,
	pub(super) command_allocator: P::CommandAllocator,
	pub(super) resources: F,
	pub(super) last_fence_value: Option<u64>,
	pub(super) state: SlotState,
}

impl<P: FramePlatform, F> FrameSlot<P, F> {
	pub(super) fn new(index: usize, command_allocator: P::CommandAllocator, resources: F) -> Self {
		Self {
			index,
			command_allocator,
			resources,
			last_fence_value: None,
			state: SlotState::Idle,
		}
	}

	pub fn index(&self) -> usize {
		self.index
	}

	pub fn state(&self) -> SlotState {
		self.state
	}

	/// Stamp of the most recent submission through this slot, `None` until its first one. Once `Some` it never
	/// becomes `None` again, even across abandoned recordings.
	pub fn last_fence_value(&self) -> Option<u64> {
		self.last_fence_value
	}

	pub fn resources(&self) -> &F {
		&self.resources
	}

	pub fn command_allocator(&self) -> &P::CommandAllocator {
		&self.command_allocator
	}
}

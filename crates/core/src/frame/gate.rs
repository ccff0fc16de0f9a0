use crate::context::Inflight;
use crate::fence::DeviceLost;
use crate::frame::slot::{FrameSlot, SlotState};
use crate::platform::FramePlatform;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering::Relaxed;

/// Admission control for slot reuse: a slot may record a new frame only once the device has retired the slot's
/// previous submission.
pub struct SyncGate<P: FramePlatform> {
	inflight: Inflight<P>,
	stall_count: AtomicU64,
}

impl<P: FramePlatform> SyncGate<P> {
	pub fn new(inflight: &Inflight<P>) -> Self {
		Self {
			inflight: inflight.clone(),
			stall_count: AtomicU64::new(0),
		}
	}

	/// How many admissions had to block on the fence so far. The CPU outrunning the device by more than N
	/// frames shows up here first.
	pub fn stalls(&self) -> u64 {
		self.stall_count.load(Relaxed)
	}

	/// Admit `slot` for recording a new frame.
	///
	/// A slot that was never submitted passes for free, which is why the first N frames after startup never
	/// block. Otherwise the slot's stamped fence value must have completed; if it has not, this blocks (infinite
	/// timeout) until it does. On admission the slot's command allocator is reset, exactly once per cycle, and
	/// the [`RecordingFrame`] guard is handed out.
	pub fn wait_if_needed<'a, F>(
		&self,
		slot: &'a mut FrameSlot<P, F>,
	) -> Result<RecordingFrame<'a, P, F>, DeviceLost<P>> {
		profiling::function_scope!();
		debug_assert_ne!(
			slot.state,
			SlotState::Recording,
			"slot {} is already recording",
			slot.index
		);
		if let Some(value) = slot.last_fence_value {
			let fence = self.inflight.fence();
			if !fence.is_complete(value) {
				log::trace!("slot {} still in flight at fence value {value}, blocking", slot.index);
				self.stall_count.fetch_add(1, Relaxed);
				fence.block_until(value)?;
			}
		}
		self.inflight
			.platform
			.reset_command_allocator(&mut slot.command_allocator)
			.map_err(DeviceLost)?;
		slot.state = SlotState::Recording;
		Ok(RecordingFrame {
			inflight: self.inflight.clone(),
			slot,
		})
	}
}

/// Exclusive access to a frame slot between gate admission and submit. Derefs to the slot's payload; while the
/// guard lives the payload may be written and the allocator recorded through.
///
/// [`Self::submit`] signals the fence counter and stamps the slot in one step, so a submission can never go out
/// unstamped. Dropping the guard instead abandons the recording: the slot returns to [`SlotState::Idle`] and
/// keeps its previous, already retired stamp.
pub struct RecordingFrame<'a, P: FramePlatform, F> {
	inflight: Inflight<P>,
	slot: &'a mut FrameSlot<P, F>,
}

impl<P: FramePlatform, F> RecordingFrame<'_, P, F> {
	pub fn index(&self) -> usize {
		self.slot.index
	}

	pub fn allocator_mut(&mut self) -> &mut P::CommandAllocator {
		&mut self.slot.command_allocator
	}

	/// Signal the fence counter and stamp the slot with the returned value. All device work recorded for this
	/// frame must already be enqueued on the queue; the signal lands behind it.
	pub fn submit(self) -> Result<u64, DeviceLost<P>> {
		let value = self.inflight.fence().signal()?;
		self.slot.last_fence_value = Some(value);
		self.slot.state = SlotState::Submitted;
		Ok(value)
	}
}

impl<P: FramePlatform, F> Deref for RecordingFrame<'_, P, F> {
	type Target = F;

	fn deref(&self) -> &Self::Target {
		&self.slot.resources
	}
}

impl<P: FramePlatform, F> DerefMut for RecordingFrame<'_, P, F> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.slot.resources
	}
}

impl<P: FramePlatform, F> Drop for RecordingFrame<'_, P, F> {
	fn drop(&mut self) {
		// a submitted slot keeps its state and stamp, only an unfinished recording is reverted
		if self.slot.state == SlotState::Recording {
			self.slot.state = SlotState::Idle;
		}
	}
}

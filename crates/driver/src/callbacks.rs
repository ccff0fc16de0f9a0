use crate::timer::FrameTiming;
use inflight_core::context::Inflight;
use inflight_core::frame::RecordingFrame;
use inflight_core::platform::FramePlatform;
use std::error::Error;

/// The application half of a [`FrameLoop`]: the loop owns the ring, gate and timer, the callbacks own
/// everything frame-content related. Implementors never touch the fence directly, admission and submission
/// happen in the loop.
///
/// [`FrameLoop`]: crate::frame_loop::FrameLoop
pub trait FrameCallbacks<P: FramePlatform>: Sized {
	/// Per-slot resources, typically the slot's upload buffers.
	type FrameData: 'static + Send;
	type Error: Error + Send + Sync + 'static;

	/// Called once per slot while the loop is constructed, in slot index order, before the first tick.
	fn create_frame_data(&mut self, inflight: &Inflight<P>, index: usize) -> Result<Self::FrameData, Self::Error>;

	/// Advance simulation state. Runs every tick after the slot was admitted, before [`Self::render`].
	fn update(&mut self, timing: &FrameTiming) -> Result<(), Self::Error>;

	/// Record the frame: write the slot's upload buffers and its command allocator. The loop submits the
	/// frame when this returns Ok and abandons it on Err, the slot then goes back to its retired stamp.
	fn render(
		&mut self,
		frame: &mut RecordingFrame<'_, P, Self::FrameData>,
		timing: &FrameTiming,
	) -> Result<(), Self::Error>;

	/// The output surface changed size. Runs only once the loop has drained the device, so every slot is
	/// retired and size-dependent resources are safe to recreate.
	fn on_resize(&mut self, inflight: &Inflight<P>, width: u32, height: u32) -> Result<(), Self::Error> {
		let _ = (inflight, width, height);
		Ok(())
	}
}

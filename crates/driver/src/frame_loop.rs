use crate::callbacks::FrameCallbacks;
use crate::timer::FrameTimer;
use inflight_core::context::Inflight;
use inflight_core::fence::DeviceLost;
use inflight_core::frame::{FrameRing, RingCreateError, SyncGate, DEFAULT_FRAMES_IN_FLIGHT};
use inflight_core::platform::FramePlatform;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use thiserror::Error;

pub struct FrameLoopCreateInfo {
	pub frames_in_flight: usize,
}

impl Default for FrameLoopCreateInfo {
	fn default() -> Self {
		Self {
			frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
		}
	}
}

#[derive(Error)]
pub enum FrameLoopError<P: FramePlatform, E: Error + Send + Sync + 'static> {
	#[error("{0}")]
	Device(#[from] DeviceLost<P>),
	#[error("{0}")]
	Ring(#[from] RingCreateError<P, E>),
	#[error("Frame Callbacks Error: {0}")]
	App(#[source] E),
}

impl<P: FramePlatform, E: Error + Send + Sync + 'static> Debug for FrameLoopError<P, E> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		Display::fmt(self, f)
	}
}

/// Owns the pacing machinery of one output: ring, gate and timer, plus the application's
/// [`FrameCallbacks`]. Every [`Self::tick`] runs exactly one frame through the slot lifecycle, so the
/// application code never sees a slot the device may still be reading.
pub struct FrameLoop<P: FramePlatform, C: FrameCallbacks<P>> {
	inflight: Inflight<P>,
	gate: SyncGate<P>,
	ring: FrameRing<P, C::FrameData>,
	timer: FrameTimer,
	callbacks: C,
}

impl<P: FramePlatform, C: FrameCallbacks<P>> FrameLoop<P, C> {
	/// Builds the ring by asking `callbacks` for each slot's frame data in index order.
	pub fn new(
		inflight: &Inflight<P>,
		create_info: &FrameLoopCreateInfo,
		mut callbacks: C,
	) -> Result<Self, FrameLoopError<P, C::Error>> {
		let ring = FrameRing::new(inflight, create_info.frames_in_flight, |inflight, index| {
			callbacks.create_frame_data(inflight, index)
		})?;
		log::debug!("frame loop created with {} frames in flight", ring.len());
		Ok(Self {
			inflight: inflight.clone(),
			gate: SyncGate::new(inflight),
			ring,
			timer: FrameTimer::new(),
			callbacks,
		})
	}

	/// Runs one frame: advance to the next slot, block until its previous submission retired, then
	/// `update`, `render` and submit. Returns the fence value the frame will retire at.
	///
	/// An `update` or `render` error abandons the frame without submitting, the slot reverts to idle with
	/// its old stamp and the loop stays usable for the next tick.
	pub fn tick(&mut self) -> Result<u64, FrameLoopError<P, C::Error>> {
		profiling::function_scope!();
		let timing = self.timer.tick();
		let slot = self.ring.advance();
		let mut frame = self.gate.wait_if_needed(slot)?;
		self.callbacks.update(&timing).map_err(FrameLoopError::App)?;
		self.callbacks.render(&mut frame, &timing).map_err(FrameLoopError::App)?;
		let value = frame.submit()?;
		profiling::finish_frame!();
		Ok(value)
	}

	/// Drives [`Self::tick`] `frames` times, stopping at the first error. Headless runs and tests.
	pub fn run_frames(&mut self, frames: u64) -> Result<(), FrameLoopError<P, C::Error>> {
		for _ in 0..frames {
			self.tick()?;
		}
		Ok(())
	}

	/// Drains the device, then lets the callbacks recreate size-dependent state. Draining first means no
	/// in-flight frame can still reference whatever `on_resize` replaces.
	pub fn resize(&mut self, width: u32, height: u32) -> Result<(), FrameLoopError<P, C::Error>> {
		profiling::function_scope!();
		self.inflight.fence().wait_idle()?;
		self.callbacks
			.on_resize(&self.inflight, width, height)
			.map_err(FrameLoopError::App)
	}

	/// Blocks until every submitted frame has retired.
	pub fn wait_idle(&self) -> Result<(), DeviceLost<P>> {
		self.inflight.fence().wait_idle()
	}

	pub fn inflight(&self) -> &Inflight<P> {
		&self.inflight
	}

	pub fn ring(&self) -> &FrameRing<P, C::FrameData> {
		&self.ring
	}

	pub fn gate(&self) -> &SyncGate<P> {
		&self.gate
	}

	pub fn timer(&self) -> &FrameTimer {
		&self.timer
	}

	pub fn callbacks(&self) -> &C {
		&self.callbacks
	}

	pub fn callbacks_mut(&mut self) -> &mut C {
		&mut self.callbacks
	}
}

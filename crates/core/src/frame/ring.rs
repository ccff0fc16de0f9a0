use crate::context::Inflight;
use crate::frame::slot::FrameSlot;
use crate::platform::FramePlatform;
use smallvec::SmallVec;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use thiserror::Error;

/// Three frames in flight is the usual sweet spot: the CPU can run up to two full frames ahead without the
/// per-frame memory cost growing further.
pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 3;

#[derive(Error)]
pub enum RingCreateError<P: FramePlatform, E: Error + Send + Sync + 'static> {
	#[error("Platform Error: {0}")]
	Platform(#[source] P::Error),
	#[error("frame resources for slot {index}: {source}")]
	FrameData { index: usize, #[source] source: E },
	#[error("a frame ring requires at least one slot")]
	ZeroSlots,
}

impl<P: FramePlatform, E: Error + Send + Sync + 'static> Debug for RingCreateError<P, E> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		Display::fmt(self, f)
	}
}

/// Fixed ring of N frame slots. The cursor is the only rotation state: slots never migrate, `advance` moves the
/// cursor `(i + 1) % N` once per application frame.
pub struct FrameRing<P: FramePlatform, F> {
	slots: SmallVec<[FrameSlot<P, F>; DEFAULT_FRAMES_IN_FLIGHT]>,
	current: usize,
	frames_started: u64,
}

impl<P: FramePlatform, F> FrameRing<P, F> {
	/// Creates `frames_in_flight` slots, each with its own command allocator and a payload built by
	/// `init(context, slot_index)`. Every failure is fatal at construction time: there is no partially usable
	/// ring.
	pub fn new<E: Error + Send + Sync + 'static>(
		inflight: &Inflight<P>,
		frames_in_flight: usize,
		mut init: impl FnMut(&Inflight<P>, usize) -> Result<F, E>,
	) -> Result<Self, RingCreateError<P, E>> {
		if frames_in_flight == 0 {
			return Err(RingCreateError::ZeroSlots);
		}
		let mut slots = SmallVec::with_capacity(frames_in_flight);
		for index in 0..frames_in_flight {
			let command_allocator = inflight
				.platform
				.create_command_allocator()
				.map_err(RingCreateError::Platform)?;
			let resources = init(inflight, index).map_err(|source| RingCreateError::FrameData { index, source })?;
			slots.push(FrameSlot::new(index, command_allocator, resources));
		}
		Ok(Self {
			slots,
			// parked on the last slot so the first advance lands on slot 0
			current: frames_in_flight - 1,
			frames_started: 0,
		})
	}

	/// Move the cursor to the next slot and hand it out. Called exactly once per application frame, before the
	/// gate. After k calls the cursor sits on slot `(k - 1) % N`.
	pub fn advance(&mut self) -> &mut FrameSlot<P, F> {
		self.current = (self.current + 1) % self.slots.len();
		self.frames_started += 1;
		&mut self.slots[self.current]
	}

	pub fn len(&self) -> usize {
		self.slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	/// Index of the slot most recently returned by [`Self::advance`]. Before the first advance the cursor parks
	/// on the last slot.
	pub fn current_index(&self) -> usize {
		self.current
	}

	/// How many times [`Self::advance`] ran, i.e. how many frames were started.
	pub fn frames_started(&self) -> u64 {
		self.frames_started
	}

	pub fn get(&self, index: usize) -> Option<&FrameSlot<P, F>> {
		self.slots.get(index)
	}

	pub fn slots(&self) -> impl Iterator<Item = &FrameSlot<P, F>> {
		self.slots.iter()
	}
}

use crate::context::{Inflight, WeakInflight};
use crate::platform::FramePlatform;
use crossbeam_utils::CachePadded;
use std::fmt::{Debug, Display, Formatter};
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering::Relaxed;
use thiserror::Error;

/// The device queue died underneath us. Terminal: callers do not retry, the context can only be torn down.
#[derive(Error)]
#[error("device lost: {0}")]
pub struct DeviceLost<P: FramePlatform>(#[source] pub P::Error);

impl<P: FramePlatform> Debug for DeviceLost<P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		Display::fmt(self, f)
	}
}

/// Distributor of the queue's fence values, one per [`Inflight`] context, alive as long as the device queue.
///
/// Values start at 1 and are strictly consecutive. 0 is the idle baseline: it was never signaled and counts as
/// always complete, which is what lets a freshly created context [`wait_idle`](Self::wait_idle) instantly and
/// lets frame slots distinguish "never submitted" from any real submission.
pub struct FenceCounter<P: FramePlatform> {
	inflight: WeakInflight<P>,
	/// the value the next signal hands out
	next_value: CachePadded<AtomicU64>,
}

impl<P: FramePlatform> FenceCounter<P> {
	pub(crate) fn new(inflight: WeakInflight<P>) -> Self {
		Self {
			inflight,
			next_value: CachePadded::new(AtomicU64::new(1)),
		}
	}

	#[inline(never)]
	fn unreachable_inflight_dropped() -> ! {
		unreachable!("Inflight context has most likely been dropped");
	}

	#[inline]
	fn inflight(&self) -> Inflight<P> {
		match self.inflight.upgrade() {
			Some(inflight) => inflight,
			None => Self::unreachable_inflight_dropped(),
		}
	}

	/// Take the next fence value and enqueue its signal on the device queue, after all previously submitted
	/// work. Returns the value to stamp the submission with: if a call returns k, the next call returns k + 1.
	///
	/// Submissions happen from one thread at a time; signaling concurrently would race the queue order.
	pub fn signal(&self) -> Result<u64, DeviceLost<P>> {
		let value = self.next_value.fetch_add(1, Relaxed);
		self.inflight().platform.signal(value).map_err(DeviceLost)?;
		Ok(value)
	}

	/// The largest value the device has retired so far. Monotonic.
	pub fn completed_value(&self) -> u64 {
		self.inflight().platform.completed_value()
	}

	/// The most recently signaled value, 0 if nothing was ever signaled.
	pub fn last_signaled(&self) -> u64 {
		self.next_value.load(Relaxed) - 1
	}

	/// Whether `value` has retired on the device. Idempotent: once this returns true for a value, it keeps
	/// returning true.
	pub fn is_complete(&self, value: u64) -> bool {
		self.completed_value() >= value
	}

	/// Block the calling thread until `value` retires, with an infinite timeout. Returns immediately if it
	/// already has.
	pub fn block_until(&self, value: u64) -> Result<(), DeviceLost<P>> {
		if self.is_complete(value) {
			return Ok(());
		}
		profiling::function_scope!();
		self.inflight().platform.wait_for_value(value).map_err(DeviceLost)
	}

	/// Block until everything ever signaled has retired: the queue drain used at shutdown and before touching
	/// resources the device may still reference.
	pub fn wait_idle(&self) -> Result<(), DeviceLost<P>> {
		self.block_until(self.last_signaled())
	}
}

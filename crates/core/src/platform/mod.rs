pub mod sim;

use std::error::Error;

/// Device interface the frame-pacing machinery is generic over. An implementation wraps one device queue and the
/// fence observing it.
///
/// # Safety
/// Implementations promise the fence semantics the synchronization relies on:
/// * [`Self::completed_value`] is monotonic and only reports values that have actually retired on the device.
/// * [`Self::wait_for_value`] blocks with an infinite timeout until the value retires or the device is lost.
/// * [`Self::mapped_slab`] returns a live mapping covering the whole allocation requested from
///   [`Self::alloc_upload`].
pub unsafe trait FramePlatform: Sized + Send + Sync + 'static {
	type CreateInfo: 'static + Send;
	type CreateError: Error + Send + Sync + 'static;
	/// Device-level failure, typically device loss. Terminal: callers do not retry.
	type Error: Error + Send + Sync + 'static;
	type CommandAllocator: 'static + Send;
	/// Persistently mapped CPU-visible memory. Mapped once at creation and unmapped on drop, never in between.
	type UploadMemory: 'static + Send + Sync;

	/// Create the platform from the supplied [`Self::CreateInfo`]. Typically the create info wraps the
	/// implementation's device, queue and fence objects initialized by the end user.
	///
	/// # Safety
	/// Any device handles inside `create_info` must be valid and owned by the new platform.
	unsafe fn create_platform(create_info: Self::CreateInfo) -> Result<Self, Self::CreateError>;

	/// Enqueue a fence signal of `value` on the device queue, after all previously submitted work.
	fn signal(&self, value: u64) -> Result<(), Self::Error>;

	/// The largest fence value the device has retired so far. 0 before anything was ever signaled.
	fn completed_value(&self) -> u64;

	/// Block the calling thread until `completed_value() >= value`. Infinite timeout.
	fn wait_for_value(&self, value: u64) -> Result<(), Self::Error>;

	fn create_command_allocator(&self) -> Result<Self::CommandAllocator, Self::Error>;

	/// Recycle an allocator whose recorded work has retired. The caller guarantees the device is no longer
	/// executing out of it.
	fn reset_command_allocator(&self, allocator: &mut Self::CommandAllocator) -> Result<(), Self::Error>;

	/// Allocate `size` bytes of persistently mapped upload memory. `name` is a debug label.
	fn alloc_upload(&self, size: usize, name: &str) -> Result<Self::UploadMemory, Self::Error>;

	/// Turn the upload memory's mapping into a Slab for presser copies.
	///
	/// # Safety
	/// The caller must have exclusive access to `upload` and the device must not currently read the range
	/// being written.
	#[allow(clippy::mut_from_ref)]
	unsafe fn mapped_slab(upload: &Self::UploadMemory) -> &mut (impl presser::Slab + '_);

	/// Called once by the owning instance after the queue has drained. Joins any worker threads.
	fn shutdown(&self);
}

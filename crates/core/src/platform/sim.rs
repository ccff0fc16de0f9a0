use crate::platform::FramePlatform;
use crossbeam_queue::SegQueue;
use parking_lot::{Condvar, Mutex};
use std::cell::UnsafeCell;
use std::convert::Infallible;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::Relaxed;
use std::thread;
use std::time::Duration;
use thiserror::Error;

pub const SIM_RETIRE_THREAD_NAME: &str = "SimRetireThread";

/// How the simulated queue retires signaled fence values.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum SimQueueMode {
	/// Every signal retires the moment it is enqueued. Waits never block.
	#[default]
	Immediate,
	/// Signals retire only when the test calls [`Sim::retire_up_to`]. This is the controllable fence used to
	/// provoke and release blocking waits deterministically.
	Manual,
	/// A background thread retires every signaled value after `latency`, oldest first.
	Worker { latency: Duration },
}

#[derive(Debug, Copy, Clone, Default)]
pub struct SimCreateInfo {
	pub queue: SimQueueMode,
	/// Upper bound on live upload bytes. `None` is unlimited.
	pub upload_budget: Option<usize>,
}

#[derive(Error, Clone, PartialEq, Eq)]
pub enum SimError {
	#[error("simulated device loss")]
	DeviceLost,
	#[error("upload allocation of {size} bytes exceeds the remaining budget of {remaining} bytes")]
	OutOfMemory { size: usize, remaining: usize },
}

impl Debug for SimError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		Display::fmt(self, f)
	}
}

struct SimFenceState {
	completed: u64,
	signaled: u64,
	lost: bool,
}

struct SimShared {
	fence: Mutex<SimFenceState>,
	fence_condvar: Condvar,
	/// values handed to the retire worker, oldest first
	submitted: SegQueue<u64>,
	worker_wake: Mutex<bool>,
	worker_condvar: Condvar,
	worker_shutdown: AtomicBool,
	upload_used: AtomicUsize,
	upload_budget: Option<usize>,
}

impl SimShared {
	fn complete(&self, value: u64) {
		let mut state = self.fence.lock();
		if state.lost {
			return;
		}
		state.completed = state.completed.max(value);
		drop(state);
		self.fence_condvar.notify_all();
	}

	fn reserve_upload(&self, size: usize) -> Result<(), SimError> {
		if let Some(limit) = self.upload_budget {
			let used = self.upload_used.fetch_add(size, Relaxed);
			if used + size > limit {
				self.upload_used.fetch_sub(size, Relaxed);
				return Err(SimError::OutOfMemory {
					size,
					remaining: limit.saturating_sub(used),
				});
			}
		}
		Ok(())
	}

	fn release_upload(&self, size: usize) {
		self.upload_used.fetch_sub(size, Relaxed);
	}
}

/// Software [`FramePlatform`]: a fence timeline and queue without any device behind them. Used by unit and
/// integration tests and the headless demos, and as the reference for what a real backend must implement.
pub struct Sim {
	shared: Arc<SimShared>,
	queue_mode: SimQueueMode,
	worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl Sim {
	/// Retire every signaled value up to and including `value`. Only meaningful in [`SimQueueMode::Manual`],
	/// harmless in the other modes.
	pub fn retire_up_to(&self, value: u64) {
		{
			let state = self.shared.fence.lock();
			assert!(
				value <= state.signaled,
				"cannot retire {value}, only {} was signaled",
				state.signaled
			);
		}
		self.shared.complete(value);
	}

	/// Retire everything signaled so far.
	pub fn retire_all(&self) {
		let signaled = self.shared.fence.lock().signaled;
		self.shared.complete(signaled);
	}

	/// Simulate device loss: the timeline freezes, blocked waiters wake with [`SimError::DeviceLost`] and every
	/// subsequent fallible operation fails.
	pub fn lose_device(&self) {
		{
			let mut state = self.shared.fence.lock();
			state.lost = true;
		}
		self.shared.fence_condvar.notify_all();
		let mut wake = self.shared.worker_wake.lock();
		*wake = true;
		self.shared.worker_condvar.notify_all();
	}

	pub fn is_lost(&self) -> bool {
		self.shared.fence.lock().lost
	}

	pub fn signaled_value(&self) -> u64 {
		self.shared.fence.lock().signaled
	}

	pub fn upload_bytes_used(&self) -> usize {
		self.shared.upload_used.load(Relaxed)
	}

	fn check_lost(&self) -> Result<(), SimError> {
		if self.shared.fence.lock().lost {
			Err(SimError::DeviceLost)
		} else {
			Ok(())
		}
	}
}

fn retire_thread_main(shared: Arc<SimShared>, latency: Duration) {
	loop {
		if let Some(value) = shared.submitted.pop() {
			thread::sleep(latency);
			shared.complete(value);
			continue;
		}
		if shared.worker_shutdown.load(Relaxed) {
			break;
		}
		let mut wake = shared.worker_wake.lock();
		// a signal may have landed between the pop and the lock
		if !*wake && !shared.worker_shutdown.load(Relaxed) {
			shared.worker_condvar.wait(&mut wake);
		}
		*wake = false;
	}
}

unsafe impl FramePlatform for Sim {
	type CreateInfo = SimCreateInfo;
	type CreateError = Infallible;
	type Error = SimError;
	type CommandAllocator = SimCommandAllocator;
	type UploadMemory = SimUpload;

	unsafe fn create_platform(create_info: SimCreateInfo) -> Result<Self, Infallible> {
		let shared = Arc::new(SimShared {
			fence: Mutex::new(SimFenceState {
				completed: 0,
				signaled: 0,
				lost: false,
			}),
			fence_condvar: Condvar::new(),
			submitted: SegQueue::new(),
			worker_wake: Mutex::new(false),
			worker_condvar: Condvar::new(),
			worker_shutdown: AtomicBool::new(false),
			upload_used: AtomicUsize::new(0),
			upload_budget: create_info.upload_budget,
		});
		let worker = match create_info.queue {
			SimQueueMode::Worker { latency } => {
				let shared = shared.clone();
				Some(
					thread::Builder::new()
						.name(SIM_RETIRE_THREAD_NAME.to_string())
						.spawn(move || retire_thread_main(shared, latency))
						.unwrap(),
				)
			}
			_ => None,
		};
		Ok(Self {
			shared,
			queue_mode: create_info.queue,
			worker: Mutex::new(worker),
		})
	}

	fn signal(&self, value: u64) -> Result<(), SimError> {
		let mut state = self.shared.fence.lock();
		if state.lost {
			return Err(SimError::DeviceLost);
		}
		debug_assert!(
			value > state.signaled,
			"fence values must increase, got {value} after {}",
			state.signaled
		);
		state.signaled = value;
		match self.queue_mode {
			SimQueueMode::Immediate => {
				state.completed = value;
				drop(state);
				self.shared.fence_condvar.notify_all();
			}
			SimQueueMode::Manual => {}
			SimQueueMode::Worker { .. } => {
				drop(state);
				self.shared.submitted.push(value);
				let mut wake = self.shared.worker_wake.lock();
				*wake = true;
				self.shared.worker_condvar.notify_one();
			}
		}
		Ok(())
	}

	fn completed_value(&self) -> u64 {
		self.shared.fence.lock().completed
	}

	fn wait_for_value(&self, value: u64) -> Result<(), SimError> {
		let mut state = self.shared.fence.lock();
		loop {
			if state.completed >= value {
				return Ok(());
			}
			if state.lost {
				return Err(SimError::DeviceLost);
			}
			self.shared.fence_condvar.wait(&mut state);
		}
	}

	fn create_command_allocator(&self) -> Result<SimCommandAllocator, SimError> {
		self.check_lost()?;
		Ok(SimCommandAllocator::default())
	}

	fn reset_command_allocator(&self, allocator: &mut SimCommandAllocator) -> Result<(), SimError> {
		self.check_lost()?;
		allocator.markers.clear();
		allocator.resets += 1;
		Ok(())
	}

	fn alloc_upload(&self, size: usize, name: &str) -> Result<SimUpload, SimError> {
		self.check_lost()?;
		self.shared.reserve_upload(size)?;
		Ok(SimUpload {
			name: name.to_string(),
			size,
			memory: UnsafeCell::new(SimSlabMemory {
				bytes: vec![0u8; size].into_boxed_slice(),
			}),
			shared: self.shared.clone(),
		})
	}

	unsafe fn mapped_slab(upload: &Self::UploadMemory) -> &mut (impl presser::Slab + '_) {
		// exclusive access is the caller's contract, see the trait
		unsafe { &mut *upload.memory.get() }
	}

	fn shutdown(&self) {
		let handle = self.worker.lock().take();
		if let Some(handle) = handle {
			if handle.thread().id() == thread::current().id() {
				panic!("shutdown() must not be called in {SIM_RETIRE_THREAD_NAME}");
			}
			self.shared.worker_shutdown.store(true, Relaxed);
			{
				let mut wake = self.shared.worker_wake.lock();
				*wake = true;
				self.shared.worker_condvar.notify_all();
			}
			handle.join().unwrap();
		}
	}
}

/// Stand-in for a device command allocator. Frames record named markers into it so tests can observe what a
/// slot's allocator held when it was recycled.
#[derive(Debug, Default)]
pub struct SimCommandAllocator {
	markers: Vec<String>,
	resets: u64,
}

impl SimCommandAllocator {
	pub fn record_marker(&mut self, name: impl Into<String>) {
		self.markers.push(name.into());
	}

	pub fn markers(&self) -> &[String] {
		&self.markers
	}

	pub fn resets(&self) -> u64 {
		self.resets
	}
}

/// Persistently "mapped" upload memory: zero-initialized boxed bytes.
pub struct SimUpload {
	name: String,
	size: usize,
	memory: UnsafeCell<SimSlabMemory>,
	shared: Arc<SimShared>,
}

// all mutable access goes through mapped_slab, whose contract demands exclusivity
unsafe impl Send for SimUpload {}
unsafe impl Sync for SimUpload {}

impl SimUpload {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn size(&self) -> usize {
		self.size
	}

	/// Copy the current contents out for test verification.
	///
	/// # Safety
	/// No writer may hold the slab from [`FramePlatform::mapped_slab`] while this reads.
	pub unsafe fn snapshot(&self) -> Vec<u8> {
		unsafe { (*self.memory.get()).bytes.to_vec() }
	}
}

impl Drop for SimUpload {
	fn drop(&mut self) {
		self.shared.release_upload(self.size);
	}
}

struct SimSlabMemory {
	bytes: Box<[u8]>,
}

// the mapping is the boxed allocation itself
unsafe impl presser::Slab for SimSlabMemory {
	fn base_ptr(&self) -> *const u8 {
		self.bytes.as_ptr()
	}

	fn base_ptr_mut(&mut self) -> *mut u8 {
		self.bytes.as_mut_ptr()
	}

	fn size(&self) -> usize {
		self.bytes.len()
	}
}

use crate::fence::FenceCounter;
use crate::platform::FramePlatform;
use std::ops::Deref;
use std::sync::{Arc, Weak};

/// Process-scoped frame context: the platform plus the fence counter observing its queue. Cheap to clone and
/// hand to whoever needs device access; there are no globals.
pub struct Inflight<P: FramePlatform>(Arc<InflightInner<P>>);

impl<P: FramePlatform> Clone for Inflight<P> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<P: FramePlatform> Deref for Inflight<P> {
	type Target = Arc<InflightInner<P>>;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl<P: FramePlatform> Inflight<P> {
	#[inline]
	pub fn fence(&self) -> &FenceCounter<P> {
		&self.0.fence
	}

	pub fn weak(&self) -> WeakInflight<P> {
		WeakInflight(Arc::downgrade(&self.0))
	}
}

pub struct WeakInflight<P: FramePlatform>(Weak<InflightInner<P>>);

impl<P: FramePlatform> WeakInflight<P> {
	pub fn upgrade(&self) -> Option<Inflight<P>> {
		self.0.upgrade().map(Inflight)
	}
}

impl<P: FramePlatform> Clone for WeakInflight<P> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

pub struct InflightInner<P: FramePlatform> {
	pub platform: P,
	fence: FenceCounter<P>,
}

impl<P: FramePlatform> Deref for InflightInner<P> {
	type Target = P;

	fn deref(&self) -> &Self::Target {
		&self.platform
	}
}

/// The owning handle of an [`Inflight`] context. Dropping it drains the queue, so nothing the device may still
/// reference is torn down early, and then shuts the platform down.
pub struct InflightInstance<P: FramePlatform>(Inflight<P>);

impl<P: FramePlatform> Deref for InflightInstance<P> {
	type Target = Inflight<P>;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl<P: FramePlatform> InflightInstance<P> {
	/// Creates the platform from its create info and the context around it.
	///
	/// # Safety
	/// * There must only be one context per device queue.
	/// * Any device handles inside `create_info` must be valid and stay owned by the platform.
	pub unsafe fn new(create_info: P::CreateInfo) -> Result<Self, P::CreateError> {
		unsafe {
			let platform = P::create_platform(create_info)?;
			let inflight = Inflight(Arc::new_cyclic(|weak| {
				let weak = WeakInflight(weak.clone());
				InflightInner {
					fence: FenceCounter::new(weak),
					platform,
				}
			}));
			log::debug!("frame context initialized");
			Ok(InflightInstance(inflight))
		}
	}
}

impl<P: FramePlatform> Drop for InflightInstance<P> {
	fn drop(&mut self) {
		if let Err(err) = self.0.fence().wait_idle() {
			log::error!("device lost while draining the queue at shutdown: {err}");
		}
		self.0.platform.shutdown();
	}
}

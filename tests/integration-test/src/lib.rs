use inflight_core::context::InflightInstance;
use inflight_core::platform::sim::{Sim, SimCreateInfo, SimQueueMode};

pub mod lifecycle;
pub mod loop_driver;
pub mod upload;

/// every scenario runs on the simulated queue, immediate unless it needs scripted retirement
pub fn sim_instance(queue: SimQueueMode) -> InflightInstance<Sim> {
	unsafe {
		InflightInstance::<Sim>::new(SimCreateInfo {
			queue,
			..SimCreateInfo::default()
		})
		.unwrap()
	}
}

#![cfg(test)]

use crate::sim_instance;
use inflight_core::context::Inflight;
use inflight_core::frame::{FrameRing, RecordingFrame, SyncGate};
use inflight_core::platform::sim::{Sim, SimError, SimQueueMode};
use inflight_driver::callbacks::FrameCallbacks;
use inflight_driver::frame_loop::{FrameLoop, FrameLoopCreateInfo, FrameLoopError};
use inflight_driver::timer::FrameTiming;
use std::convert::Infallible;
use std::thread;
use std::time::Duration;

struct Noop;

impl FrameCallbacks<Sim> for Noop {
	type FrameData = usize;
	type Error = Infallible;

	fn create_frame_data(&mut self, _inflight: &Inflight<Sim>, index: usize) -> Result<usize, Infallible> {
		Ok(index)
	}

	fn update(&mut self, _timing: &FrameTiming) -> Result<(), Infallible> {
		Ok(())
	}

	fn render(&mut self, _frame: &mut RecordingFrame<'_, Sim, usize>, _timing: &FrameTiming) -> Result<(), Infallible> {
		Ok(())
	}
}

#[test]
fn test_dropping_the_instance_drains_pending_frames() -> anyhow::Result<()> {
	let instance = sim_instance(SimQueueMode::Worker {
		latency: Duration::from_millis(5),
	});
	let inflight = instance.clone();
	{
		let gate = SyncGate::new(&instance);
		let mut ring = FrameRing::new(&instance, 3, |_, index| Ok::<_, SimError>(index))?;
		for _ in 0..3 {
			gate.wait_if_needed(ring.advance())?.submit()?;
		}
	}
	drop(instance);

	// the instance only came back from its drop once every submission had retired
	assert_eq!(inflight.fence().last_signaled(), 3);
	assert!(inflight.fence().is_complete(3));
	Ok(())
}

#[test]
fn test_device_loss_fails_the_blocked_frame() -> anyhow::Result<()> {
	let instance = sim_instance(SimQueueMode::Manual);
	let gate = SyncGate::new(&instance);
	let mut ring = FrameRing::new(&instance, 1, |_, index| Ok::<_, SimError>(index))?;

	gate.wait_if_needed(ring.advance())?.submit()?;

	let trigger = {
		let inflight = instance.clone();
		thread::spawn(move || {
			thread::sleep(Duration::from_millis(10));
			inflight.lose_device();
		})
	};

	// the only slot's stamp can never complete anymore, the gate unblocks with the loss instead
	let err = gate.wait_if_needed(ring.advance()).err().expect("the device is gone");
	assert_eq!(err.0, SimError::DeviceLost);
	trigger.join().unwrap();

	// and every later submission fails immediately
	let err = instance.fence().signal().err().expect("the queue is dead");
	assert_eq!(err.0, SimError::DeviceLost);
	Ok(())
}

#[test]
fn test_the_loop_surfaces_device_loss() -> anyhow::Result<()> {
	let instance = sim_instance(SimQueueMode::Manual);
	let create_info = FrameLoopCreateInfo { frames_in_flight: 1 };
	let mut frame_loop = FrameLoop::new(&instance, &create_info, Noop)?;

	assert_eq!(frame_loop.tick()?, 1);

	let trigger = {
		let inflight = instance.clone();
		thread::spawn(move || {
			thread::sleep(Duration::from_millis(10));
			inflight.lose_device();
		})
	};

	let err = frame_loop.tick().err().expect("the device is gone");
	assert!(matches!(err, FrameLoopError::Device(_)));
	trigger.join().unwrap();

	let err = frame_loop.wait_idle().err().expect("draining a lost device fails too");
	assert_eq!(err.0, SimError::DeviceLost);
	Ok(())
}

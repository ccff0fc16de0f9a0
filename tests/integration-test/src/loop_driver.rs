#![cfg(test)]

use crate::sim_instance;
use inflight_core::context::Inflight;
use inflight_core::frame::RecordingFrame;
use inflight_core::platform::sim::{Sim, SimQueueMode};
use inflight_core::upload::{UploadBuffer, UploadBufferCreateInfo, UploadBufferUsage, UploadError};
use inflight_driver::callbacks::FrameCallbacks;
use inflight_driver::frame_loop::{FrameLoop, FrameLoopCreateInfo, FrameLoopError};
use inflight_driver::timer::FrameTiming;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Event {
	Create(usize),
	Update(u64),
	Render { frame: u64, slot: usize },
	Resize { width: u32, height: u32 },
}

#[derive(Error)]
enum JournalError {
	#[error("{0}")]
	Upload(#[from] UploadError<Sim>),
	#[error("scripted update failure at frame {0}")]
	Scripted(u64),
}

impl std::fmt::Debug for JournalError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Display::fmt(self, f)
	}
}

/// Records every callback invocation and mirrors the frame index into the slot's upload buffer.
#[derive(Default)]
struct Journal {
	events: Vec<Event>,
	fail_update_at: Option<u64>,
}

impl FrameCallbacks<Sim> for Journal {
	type FrameData = UploadBuffer<Sim>;
	type Error = JournalError;

	fn create_frame_data(&mut self, inflight: &Inflight<Sim>, index: usize) -> Result<UploadBuffer<Sim>, JournalError> {
		self.events.push(Event::Create(index));
		let name = format!("journal slot {index}");
		Ok(UploadBuffer::for_elements::<u64>(
			inflight,
			&UploadBufferCreateInfo {
				usage: UploadBufferUsage::empty(),
				name: &name,
			},
			1,
		)?)
	}

	fn update(&mut self, timing: &FrameTiming) -> Result<(), JournalError> {
		if self.fail_update_at == Some(timing.frame_index) {
			return Err(JournalError::Scripted(timing.frame_index));
		}
		self.events.push(Event::Update(timing.frame_index));
		Ok(())
	}

	fn render(&mut self, frame: &mut RecordingFrame<'_, Sim, UploadBuffer<Sim>>, timing: &FrameTiming) -> Result<(), JournalError> {
		self.events.push(Event::Render {
			frame: timing.frame_index,
			slot: frame.index(),
		});
		let index = timing.frame_index;
		frame.write(0, index);
		Ok(())
	}

	fn on_resize(&mut self, _inflight: &Inflight<Sim>, width: u32, height: u32) -> Result<(), JournalError> {
		self.events.push(Event::Resize { width, height });
		Ok(())
	}
}

fn slot_value(frame_loop: &FrameLoop<Sim, Journal>, slot: usize) -> u64 {
	let bytes = unsafe { frame_loop.ring().get(slot).unwrap().resources().memory().snapshot() };
	bytemuck::pod_read_unaligned::<u64>(&bytes)
}

#[test]
fn test_callbacks_run_in_slot_order() -> anyhow::Result<()> {
	let instance = sim_instance(SimQueueMode::Immediate);
	let create_info = FrameLoopCreateInfo { frames_in_flight: 2 };
	let mut frame_loop = FrameLoop::new(&instance, &create_info, Journal::default())?;

	frame_loop.run_frames(4)?;
	assert_eq!(
		frame_loop.callbacks().events,
		vec![
			Event::Create(0),
			Event::Create(1),
			Event::Update(0),
			Event::Render { frame: 0, slot: 0 },
			Event::Update(1),
			Event::Render { frame: 1, slot: 1 },
			Event::Update(2),
			Event::Render { frame: 2, slot: 0 },
			Event::Update(3),
			Event::Render { frame: 3, slot: 1 },
		]
	);
	// every slot's buffer holds the last frame rendered into it
	assert_eq!(slot_value(&frame_loop, 0), 2);
	assert_eq!(slot_value(&frame_loop, 1), 3);
	Ok(())
}

#[test]
fn test_an_update_error_never_reaches_render() -> anyhow::Result<()> {
	let instance = sim_instance(SimQueueMode::Immediate);
	let callbacks = Journal {
		fail_update_at: Some(1),
		..Journal::default()
	};
	let mut frame_loop = FrameLoop::new(&instance, &FrameLoopCreateInfo::default(), callbacks)?;

	assert_eq!(frame_loop.tick()?, 1);
	let err = frame_loop.tick().err().expect("the second update is scripted to fail");
	assert!(matches!(err, FrameLoopError::App(JournalError::Scripted(1))));
	assert_eq!(frame_loop.tick()?, 2);

	let events = &frame_loop.callbacks().events;
	// frame 1 appears in no render event, its slot was abandoned before recording
	assert!(!events.iter().any(|e| matches!(e, Event::Render { frame: 1, .. })));
	assert!(events.contains(&Event::Render { frame: 2, slot: 2 }));
	Ok(())
}

#[test]
fn test_resize_mid_run_keeps_the_loop_going() -> anyhow::Result<()> {
	let instance = sim_instance(SimQueueMode::Worker {
		latency: Duration::from_millis(1),
	});
	let mut frame_loop = FrameLoop::new(&instance, &FrameLoopCreateInfo::default(), Journal::default())?;

	frame_loop.run_frames(2)?;
	frame_loop.resize(1920, 1080)?;
	// everything submitted so far has retired before on_resize ran
	assert!(frame_loop.inflight().fence().is_complete(2));
	frame_loop.run_frames(2)?;

	let events = &frame_loop.callbacks().events;
	let resize_position = events
		.iter()
		.position(|e| matches!(e, Event::Resize { width: 1920, height: 1080 }))
		.expect("resize was journaled");
	let renders_before = events[..resize_position]
		.iter()
		.filter(|e| matches!(e, Event::Render { .. }))
		.count();
	let renders_after = events[resize_position..]
		.iter()
		.filter(|e| matches!(e, Event::Render { .. }))
		.count();
	assert_eq!(renders_before, 2);
	assert_eq!(renders_after, 2);
	Ok(())
}

#![cfg(test)]

use crate::sim_instance;
use inflight_core::context::InflightInstance;
use inflight_core::frame::{FrameRing, RingCreateError, SyncGate};
use inflight_core::platform::sim::{Sim, SimCreateInfo, SimError, SimQueueMode};
use inflight_core::upload::{UploadBuffer, UploadBufferCreateInfo, UploadBufferUsage, UploadError};
use static_assertions::assert_impl_all;

assert_impl_all!(UploadBuffer<Sim>: Send, Sync);

#[test]
fn test_ten_elements_of_sixty_four_bytes() -> anyhow::Result<()> {
	let instance = sim_instance(SimQueueMode::Immediate);
	let mut buffer = UploadBuffer::new(&instance, &UploadBufferCreateInfo::default(), 64, 10)?;
	assert_eq!(buffer.stride(), 64);
	assert_eq!(buffer.len(), 10);
	assert_eq!(buffer.size_bytes(), 640);

	// every index up to 9 is writable and each write covers exactly its own element
	for index in 0..10 {
		buffer.copy_data(index, &[index as u8 + 1; 64]);
	}
	let bytes = unsafe { buffer.memory().snapshot() };
	for index in 0..10 {
		let element = &bytes[index * 64..(index + 1) * 64];
		assert!(element.iter().all(|&b| b == index as u8 + 1));
	}
	Ok(())
}

#[test]
#[should_panic(expected = "out of range")]
fn test_element_ten_is_out_of_range() {
	let instance = sim_instance(SimQueueMode::Immediate);
	let mut buffer = UploadBuffer::new(&instance, &UploadBufferCreateInfo::default(), 64, 10).unwrap();
	buffer.copy_data(10, &[0; 64]);
}

#[test]
#[should_panic(expected = "exactly one element")]
fn test_partial_writes_are_rejected() {
	let instance = sim_instance(SimQueueMode::Immediate);
	let mut buffer = UploadBuffer::new(&instance, &UploadBufferCreateInfo::default(), 64, 10).unwrap();
	buffer.copy_data(0, &[0; 32]);
}

#[test]
fn test_each_slot_owns_its_upload_memory() -> anyhow::Result<()> {
	let instance = sim_instance(SimQueueMode::Immediate);
	let gate = SyncGate::new(&instance);
	let mut ring = FrameRing::new(&instance, 3, |inflight, index| {
		let name = format!("slot {index} constants");
		UploadBuffer::<Sim>::new(
			inflight,
			&UploadBufferCreateInfo {
				usage: UploadBufferUsage::empty(),
				name: &name,
			},
			64,
			10,
		)
	})?;

	// one lap over the ring, each frame writes a slot specific pattern into its own buffer
	for _ in 0..3 {
		let mut frame = gate.wait_if_needed(ring.advance())?;
		let pattern = frame.index() as u8 + 10;
		frame.copy_data(0, &[pattern; 64]);
		frame.submit()?;
	}

	for index in 0..3 {
		let bytes = unsafe { ring.get(index).unwrap().resources().memory().snapshot() };
		assert!(bytes[..64].iter().all(|&b| b == index as u8 + 10));
		// untouched elements stay zeroed, writes never leak into another slot's buffer
		assert!(bytes[64..].iter().all(|&b| b == 0));
	}
	Ok(())
}

#[test]
fn test_budget_exhaustion_names_the_failing_slot() {
	let instance = unsafe {
		InflightInstance::<Sim>::new(SimCreateInfo {
			upload_budget: Some(1600),
			..SimCreateInfo::default()
		})
		.unwrap()
	};
	let result = FrameRing::new(&instance, 3, |inflight, _| {
		UploadBuffer::<Sim>::new(inflight, &UploadBufferCreateInfo::default(), 64, 10)
	});
	let err = result.err().expect("the third slot exceeds the budget");
	assert!(matches!(
		err,
		RingCreateError::FrameData {
			index: 2,
			source: UploadError::Platform(SimError::OutOfMemory {
				size: 640,
				remaining: 320,
			}),
		}
	));
}

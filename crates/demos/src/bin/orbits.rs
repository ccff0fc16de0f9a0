//! Headless pacing demo: objects on orbits, driven through the frame loop over the simulated queue.
//! With a non-zero queue latency the run shows the CPU pulling ahead by the slot count and the gate
//! stalling it whenever it laps the queue.

use clap::Parser;
use inflight_core::platform::sim::SimQueueMode;
use inflight_demos::{run_orbits, OrbitDemoCreateInfo};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "orbits")]
#[command(about = "Runs the orbit scene headless and reports frame pacing statistics", long_about = None)]
struct Args {
	/// How many frame slots the CPU may record ahead of the queue
	#[arg(long, default_value_t = 3)]
	frames_in_flight: usize,

	/// Total frames to run
	#[arg(long, default_value_t = 240)]
	frames: u64,

	/// Objects in the scene
	#[arg(long, default_value_t = 64)]
	objects: usize,

	/// Simulated queue latency per frame in microseconds, 0 retires submissions instantly
	#[arg(long, default_value_t = 500)]
	latency_us: u64,
}

pub fn main() -> anyhow::Result<()> {
	inflight_demos::init_logging();
	let args = Args::parse();

	let queue = if args.latency_us == 0 {
		SimQueueMode::Immediate
	} else {
		SimQueueMode::Worker {
			latency: Duration::from_micros(args.latency_us),
		}
	};
	let create_info = OrbitDemoCreateInfo {
		object_count: args.objects,
		frames_in_flight: args.frames_in_flight,
		..OrbitDemoCreateInfo::default()
	};

	log::info!(
		"running {} frames of {} objects with {} frames in flight, queue latency {}us",
		args.frames,
		args.objects,
		args.frames_in_flight,
		args.latency_us
	);
	let summary = run_orbits(&create_info, queue, args.frames)?;

	let fps = summary.frames as f64 / summary.elapsed.as_secs_f64().max(f64::EPSILON);
	log::info!("finished in {:.1?} ({fps:.0} fps)", summary.elapsed);
	log::info!(
		"gate stalls: {}, sim steps: {}, constant writes: {}, clean skips: {}",
		summary.gate_stalls,
		summary.sim_steps,
		summary.constant_writes,
		summary.clean_skips
	);
	Ok(())
}

use bytemuck_derive::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use inflight_core::context::{Inflight, InflightInstance};
use inflight_core::frame::{DirtyFrames, RecordingFrame, DEFAULT_FRAMES_IN_FLIGHT};
use inflight_core::platform::sim::{Sim, SimCreateInfo, SimQueueMode};
use inflight_core::upload::{UploadBuffer, UploadBufferCreateInfo, UploadBufferUsage, UploadError};
use inflight_driver::callbacks::FrameCallbacks;
use inflight_driver::frame_loop::{FrameLoop, FrameLoopCreateInfo};
use inflight_driver::timer::FrameTiming;
use std::f32::consts::TAU;
use std::time::{Duration, Instant};

pub fn init_logging() {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// fixed simulation timestep, ticks faster than this leave the scene untouched
pub const SIM_STEP: f32 = 1.0 / 120.0;

const PALETTE: [Vec4; 6] = [
	Vec4::new(0.91, 0.30, 0.24, 1.0),
	Vec4::new(0.95, 0.61, 0.07, 1.0),
	Vec4::new(0.18, 0.80, 0.44, 1.0),
	Vec4::new(0.20, 0.60, 0.86, 1.0),
	Vec4::new(0.61, 0.35, 0.71, 1.0),
	Vec4::new(0.93, 0.94, 0.95, 1.0),
];

/// Per-object shader constants, one 256 byte element per object in each slot's constant buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ObjectConstants {
	pub world: Mat4,
	pub color: Vec4,
}

/// Per-pass shader constants, rewritten into the current slot every frame.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct PassConstants {
	pub view_proj: Mat4,
	pub time: f32,
	pub _pad: [f32; 3],
}

pub fn camera_view_proj(aspect: f32, time: f32) -> Mat4 {
	let eye = Vec3::new(14.0 * (0.1 * time).cos(), 8.0, 14.0 * (0.1 * time).sin());
	let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
	let proj = Mat4::perspective_rh(45f32.to_radians(), aspect, 0.1, 100.0);
	proj * view
}

pub struct OrbitObject {
	pub radius: f32,
	pub height: f32,
	pub angular_velocity: f32,
	pub scale: f32,
	pub color: Vec4,
	pub angle: f32,
	/// how many slots still hold this object's previous constants
	pub dirty: DirtyFrames,
}

impl OrbitObject {
	pub fn world(&self) -> Mat4 {
		let position = Vec3::new(
			self.radius * self.angle.cos(),
			self.height,
			self.radius * self.angle.sin(),
		);
		Mat4::from_translation(position) * Mat4::from_scale(Vec3::splat(self.scale))
	}
}

/// A deterministic scene of objects circling the origin, generated from the object index alone so runs are
/// reproducible without a random source.
pub struct OrbitScene {
	objects: Vec<OrbitObject>,
}

impl OrbitScene {
	pub fn generate(object_count: usize, frames_in_flight: usize) -> Self {
		let objects = (0..object_count)
			.map(|i| {
				let direction = if i % 2 == 0 { 1.0 } else { -1.0 };
				OrbitObject {
					radius: 2.0 + (i % 8) as f32 * 0.75,
					height: ((i % 5) as f32 - 2.0) * 0.4,
					angular_velocity: direction * (0.2 + (i % 4) as f32 * 0.15),
					scale: 0.25 + (i % 3) as f32 * 0.1,
					color: PALETTE[i % PALETTE.len()],
					angle: i as f32 * TAU / object_count as f32,
					dirty: DirtyFrames::new(frames_in_flight),
				}
			})
			.collect();
		Self { objects }
	}

	/// One fixed timestep: every object moves along its orbit and must be rewritten into all slots.
	pub fn step(&mut self, dt: f32, frames_in_flight: usize) {
		for object in &mut self.objects {
			object.angle = (object.angle + object.angular_velocity * dt) % TAU;
			object.dirty.mark(frames_in_flight);
		}
	}

	pub fn objects(&self) -> &[OrbitObject] {
		&self.objects
	}

	pub fn objects_mut(&mut self) -> &mut [OrbitObject] {
		&mut self.objects
	}

	pub fn len(&self) -> usize {
		self.objects.len()
	}

	pub fn is_empty(&self) -> bool {
		self.objects.is_empty()
	}
}

pub struct OrbitDemoCreateInfo {
	pub object_count: usize,
	pub frames_in_flight: usize,
	pub aspect: f32,
}

impl Default for OrbitDemoCreateInfo {
	fn default() -> Self {
		Self {
			object_count: 64,
			frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
			aspect: 16.0 / 9.0,
		}
	}
}

pub struct OrbitFrameData {
	pub pass_constants: UploadBuffer<Sim>,
	pub object_constants: UploadBuffer<Sim>,
}

/// Drives the orbit scene through a [`FrameLoop`]: a fixed-step simulation in `update`, constant uploads in
/// `render`. Objects untouched since a slot last saw them are skipped, their constants in that slot are still
/// current.
pub struct OrbitCallbacks {
	scene: OrbitScene,
	frames_in_flight: usize,
	aspect: f32,
	accumulator: f32,
	time: f32,
	sim_steps: u64,
	constant_writes: u64,
	clean_skips: u64,
}

impl OrbitCallbacks {
	pub fn new(create_info: &OrbitDemoCreateInfo) -> Self {
		assert!(create_info.object_count > 0, "a scene needs at least one object");
		Self {
			scene: OrbitScene::generate(create_info.object_count, create_info.frames_in_flight),
			frames_in_flight: create_info.frames_in_flight,
			aspect: create_info.aspect,
			accumulator: 0.0,
			time: 0.0,
			sim_steps: 0,
			constant_writes: 0,
			clean_skips: 0,
		}
	}

	pub fn scene(&self) -> &OrbitScene {
		&self.scene
	}

	pub fn sim_steps(&self) -> u64 {
		self.sim_steps
	}

	pub fn constant_writes(&self) -> u64 {
		self.constant_writes
	}

	pub fn clean_skips(&self) -> u64 {
		self.clean_skips
	}
}

impl FrameCallbacks<Sim> for OrbitCallbacks {
	type FrameData = OrbitFrameData;
	type Error = UploadError<Sim>;

	fn create_frame_data(&mut self, inflight: &Inflight<Sim>, index: usize) -> Result<OrbitFrameData, UploadError<Sim>> {
		let pass_constants = UploadBuffer::for_elements::<PassConstants>(
			inflight,
			&UploadBufferCreateInfo {
				usage: UploadBufferUsage::CONSTANT,
				name: &format!("pass constants slot {index}"),
			},
			1,
		)?;
		let object_constants = UploadBuffer::for_elements::<ObjectConstants>(
			inflight,
			&UploadBufferCreateInfo {
				usage: UploadBufferUsage::CONSTANT,
				name: &format!("object constants slot {index}"),
			},
			self.scene.len(),
		)?;
		Ok(OrbitFrameData {
			pass_constants,
			object_constants,
		})
	}

	fn update(&mut self, timing: &FrameTiming) -> Result<(), UploadError<Sim>> {
		// a stalled tick simulates at most a quarter second
		self.accumulator += timing.delta.as_secs_f32().min(0.25);
		while self.accumulator >= SIM_STEP {
			self.accumulator -= SIM_STEP;
			self.time += SIM_STEP;
			self.scene.step(SIM_STEP, self.frames_in_flight);
			self.sim_steps += 1;
		}
		Ok(())
	}

	fn render(
		&mut self,
		frame: &mut RecordingFrame<'_, Sim, OrbitFrameData>,
		_timing: &FrameTiming,
	) -> Result<(), UploadError<Sim>> {
		profiling::function_scope!();
		let pass = PassConstants {
			view_proj: camera_view_proj(self.aspect, self.time),
			time: self.time,
			_pad: [0.0; 3],
		};
		frame.pass_constants.write(0, pass);

		let mut writes = 0;
		let mut skips = 0;
		for (index, object) in self.scene.objects.iter_mut().enumerate() {
			if object.dirty.consume() {
				let constants = ObjectConstants {
					world: object.world(),
					color: object.color,
				};
				frame.object_constants.write(index, constants);
				writes += 1;
			} else {
				skips += 1;
			}
		}
		self.constant_writes += writes;
		self.clean_skips += skips;
		frame.allocator_mut().record_marker(&format!("draw {} orbits", self.scene.len()));
		Ok(())
	}

	fn on_resize(&mut self, _inflight: &Inflight<Sim>, width: u32, height: u32) -> Result<(), UploadError<Sim>> {
		self.aspect = width as f32 / height.max(1) as f32;
		log::info!("render target resized to {width}x{height}");
		Ok(())
	}
}

pub struct OrbitRunSummary {
	pub frames: u64,
	pub elapsed: Duration,
	pub gate_stalls: u64,
	pub sim_steps: u64,
	pub constant_writes: u64,
	pub clean_skips: u64,
}

/// Runs the orbit scene headless for `frames` frames and drains the queue before returning.
pub fn run_orbits(
	create_info: &OrbitDemoCreateInfo,
	queue: SimQueueMode,
	frames: u64,
) -> anyhow::Result<OrbitRunSummary> {
	let instance = unsafe {
		InflightInstance::<Sim>::new(SimCreateInfo {
			queue,
			..SimCreateInfo::default()
		})?
	};
	let callbacks = OrbitCallbacks::new(create_info);
	let mut frame_loop = FrameLoop::new(
		&instance,
		&FrameLoopCreateInfo {
			frames_in_flight: create_info.frames_in_flight,
		},
		callbacks,
	)?;

	let start = Instant::now();
	frame_loop.run_frames(frames)?;
	frame_loop.wait_idle()?;
	let elapsed = start.elapsed();

	Ok(OrbitRunSummary {
		frames,
		elapsed,
		gate_stalls: frame_loop.gate().stalls(),
		sim_steps: frame_loop.callbacks().sim_steps(),
		constant_writes: frame_loop.callbacks().constant_writes(),
		clean_skips: frame_loop.callbacks().clean_skips(),
	})
}

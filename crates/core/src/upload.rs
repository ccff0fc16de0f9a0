use crate::context::Inflight;
use crate::platform::FramePlatform;
use bytemuck::Pod;
use std::fmt::{Debug, Display, Formatter};
use std::mem::{align_of, size_of};
use thiserror::Error;

/// Device rule for binding element ranges as constant buffers: every element must start on a 256 byte
/// boundary, so constant-buffer strides are multiples of 256.
pub const CONSTANT_BUFFER_ALIGNMENT: usize = 256;
static_assertions::const_assert!(CONSTANT_BUFFER_ALIGNMENT.is_power_of_two());

bitflags::bitflags! {
	/// What the elements of an [`UploadBuffer`] are bound as. The usage decides the element alignment the
	/// stride must satisfy.
	#[repr(transparent)]
	#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
	pub struct UploadBufferUsage: u32 {
		/// Elements are bound as constant buffers, strides must be multiples of
		/// [`CONSTANT_BUFFER_ALIGNMENT`].
		const CONSTANT = 0b1;
		/// Elements feed a vertex stream that is rewritten every frame.
		const VERTEX = 0b10;
		/// Elements feed an index stream that is rewritten every frame.
		const INDEX = 0b100;
	}
}

impl UploadBufferUsage {
	pub fn element_alignment(&self) -> usize {
		if self.contains(Self::CONSTANT) {
			CONSTANT_BUFFER_ALIGNMENT
		} else {
			1
		}
	}
}

pub struct UploadBufferCreateInfo<'a> {
	pub usage: UploadBufferUsage,
	/// debug label forwarded to the platform allocation
	pub name: &'a str,
}

impl Default for UploadBufferCreateInfo<'static> {
	fn default() -> Self {
		Self {
			usage: UploadBufferUsage::empty(),
			name: "upload buffer",
		}
	}
}

#[derive(Error)]
pub enum UploadError<P: FramePlatform> {
	#[error("Platform Error: {0}")]
	Platform(#[source] P::Error),
	#[error("upload buffer {name:?} needs a non-zero element stride and count, got {stride} x {count}")]
	EmptyLayout { name: String, stride: usize, count: usize },
	#[error("upload buffer {name:?} element stride {stride} is not a multiple of the usage alignment of {alignment}")]
	MisalignedStride {
		name: String,
		stride: usize,
		alignment: usize,
	},
	#[error("upload buffer {name:?} byte size {stride} x {count} overflows")]
	SizeOverflow { name: String, stride: usize, count: usize },
}

impl<P: FramePlatform> Debug for UploadError<P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		Display::fmt(self, f)
	}
}

/// `element_count` elements of `element_stride` bytes each in persistently mapped CPU-visible memory, owned by
/// one frame slot. The mapping is created once and only goes away when the buffer drops.
///
/// The buffer is a write-only mirror of CPU data; nothing reads the mapping back. Writing an element the
/// device is still reading would tear it, which is exactly what the slot's gate prevents: a slot's buffers are
/// only writable between gate admission and submit.
pub struct UploadBuffer<P: FramePlatform> {
	memory: P::UploadMemory,
	stride: usize,
	len: usize,
}

impl<P: FramePlatform> UploadBuffer<P> {
	/// Allocates `element_stride * element_count` mapped bytes. The layout is validated before any platform
	/// call; every failure is fatal at construction time, there is no partially allocated buffer.
	pub fn new(
		inflight: &Inflight<P>,
		create_info: &UploadBufferCreateInfo,
		element_stride: usize,
		element_count: usize,
	) -> Result<Self, UploadError<P>> {
		let alignment = create_info.usage.element_alignment();
		if element_stride == 0 || element_count == 0 {
			return Err(UploadError::EmptyLayout {
				name: create_info.name.to_string(),
				stride: element_stride,
				count: element_count,
			});
		}
		if element_stride % alignment != 0 {
			return Err(UploadError::MisalignedStride {
				name: create_info.name.to_string(),
				stride: element_stride,
				alignment,
			});
		}
		let size = element_stride
			.checked_mul(element_count)
			.ok_or_else(|| UploadError::SizeOverflow {
				name: create_info.name.to_string(),
				stride: element_stride,
				count: element_count,
			})?;
		let memory = inflight
			.platform
			.alloc_upload(size, create_info.name)
			.map_err(UploadError::Platform)?;
		Ok(Self {
			memory,
			stride: element_stride,
			len: element_count,
		})
	}

	/// Stride sized for `T`, rounded up to the usage alignment: a 16 byte constant-buffer element still
	/// occupies 256 bytes per slot element.
	pub fn for_elements<T: Pod>(
		inflight: &Inflight<P>,
		create_info: &UploadBufferCreateInfo,
		element_count: usize,
	) -> Result<Self, UploadError<P>> {
		let stride = size_of::<T>().next_multiple_of(create_info.usage.element_alignment());
		Self::new(inflight, create_info, stride, element_count)
	}

	pub fn stride(&self) -> usize {
		self.stride
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	pub fn size_bytes(&self) -> usize {
		self.stride * self.len
	}

	/// The platform memory handle, for binding element ranges while recording commands.
	pub fn memory(&self) -> &P::UploadMemory {
		&self.memory
	}

	/// Write exactly one element's stride of raw bytes at byte offset `index * stride`.
	///
	/// An `index` out of range or a `data` length other than the stride is a violated caller precondition and
	/// panics; there is no silent wraparound or truncation.
	pub fn copy_data(&mut self, index: usize, data: &[u8]) {
		assert!(
			index < self.len,
			"upload buffer index {index} out of range, len is {}",
			self.len
		);
		assert_eq!(
			data.len(),
			self.stride,
			"copy_data writes exactly one element of {} bytes",
			self.stride
		);
		let start_offset = index * self.stride;
		// exclusive access: &mut self owns the mapping, device reads are fenced off by the slot's gate
		unsafe {
			let slab = P::mapped_slab(&self.memory);
			let record = presser::copy_from_slice_to_offset(data, slab, start_offset).unwrap();
			assert_eq!(record.copy_start_offset, start_offset, "presser must not add padding");
		}
	}

	/// Write one `T` at byte offset `index * stride`, leaving any stride padding untouched. `T` must fit the
	/// stride and the stride must be aligned for it; both hold by construction with [`Self::for_elements`].
	/// The same fail-fast bounds rule as [`Self::copy_data`] applies.
	pub fn write<T: Pod>(&mut self, index: usize, value: T) {
		assert!(
			index < self.len,
			"upload buffer index {index} out of range, len is {}",
			self.len
		);
		assert!(
			size_of::<T>() <= self.stride,
			"element type of {} bytes does not fit the stride of {}",
			size_of::<T>(),
			self.stride
		);
		assert_eq!(
			self.stride % align_of::<T>(),
			0,
			"stride {} is not aligned for an element type with alignment {}",
			self.stride,
			align_of::<T>()
		);
		let start_offset = index * self.stride;
		// exclusive access: &mut self owns the mapping, device reads are fenced off by the slot's gate
		unsafe {
			let slab = P::mapped_slab(&self.memory);
			let record = presser::copy_from_slice_to_offset(&[value], slab, start_offset).unwrap();
			assert_eq!(record.copy_start_offset, start_offset, "presser must not add padding");
		}
	}
}

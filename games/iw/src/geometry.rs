//! Packed geometry codec.
//!
//! Pure decoding of the engine's bit-packed vertex and index formats.
//! Bit layouts and constants are reverse engineered from the shipped
//! binary and pinned by the tests; they are not derivable from first
//! principles.

use std::io;

use byteorder::{
	LE,
	ReadBytesExt
};

use half::f16;
use thiserror::Error;

use ultraviolet::vec::{
	Vec2,
	Vec3
};

use rrk_core::memory::{
	DataSource,
	MemoryDecode,
	ReadError
};

/// Each packed position component is a 21-bit unsigned field.
pub const POSITION_FIELD_MASK: u64 = 0x1F_FFFF;

#[derive(Error, Debug)]
pub enum GeometryError {
	#[error("triangle {0} is outside every packed index run")]
	TriangleOutOfRange(u32),
	#[error("packed index run declares unsupported width {0}")]
	RunWidth(u8),
	#[error("index data read failed")]
	Read {
		#[from]
		source: ReadError,
	},
}

fn position_fields(packed: u64) -> [u32; 3] {
	[
		(packed & POSITION_FIELD_MASK) as u32,
		((packed >> 21) & POSITION_FIELD_MASK) as u32,
		((packed >> 42) & POSITION_FIELD_MASK) as u32,
	]
}

/// Map-world reconstruction: each field scales linearly from the
/// zone's draw offset.
pub fn unpack_world_position(packed: u64, scale: f32, offset: Vec3) -> Vec3 {
	let [x, y, z] = position_fields(packed);

	Vec3::new(
		x as f32 * scale + offset.x,
		y as f32 * scale + offset.y,
		z as f32 * scale + offset.z,
	)
}

/// Model-local reconstruction: each field maps into `[-1, 1]` before
/// the submesh scale and offset apply.
pub fn unpack_local_position(packed: u64, scale: f32, offset: Vec3) -> Vec3 {
	let [x, y, z] = position_fields(packed);
	let norm = |field: u32| (field as f32 / POSITION_FIELD_MASK as f32) * 2.0 - 1.0;

	Vec3::new(
		norm(x) * scale + offset.x,
		norm(y) * scale + offset.y,
		norm(z) * scale + offset.z,
	)
}

/// Unpacks a 32-bit tangent frame into unit tangent and normal.
///
/// Bits 0-9, 10-19 and 20-28 hold three quaternion components mapped
/// into `[-1/sqrt(2), 1/sqrt(2)]`, bits 30-31 select the omitted
/// component (reconstructed from unit length), bit 29 carries the
/// binormal sign and is not consumed here. Tangent and normal are the
/// quaternion-rotated X and Z axes.
pub fn unpack_qtangent(packed: u32) -> (Vec3, Vec3) {
	const INV_SQRT2: f32 = std::f32::consts::FRAC_1_SQRT_2;

	let idx = packed >> 30;
	let a = ((packed & 0x3FF) as f32 / 511.5 - 1.0) * INV_SQRT2;
	let b = (((packed >> 10) & 0x3FF) as f32 / 511.5 - 1.0) * INV_SQRT2;
	let c = (((packed >> 20) & 0x1FF) as f32 / 255.5 - 1.0) * INV_SQRT2;

	let sum = a * a + b * b + c * c;
	let d = if sum <= 1.0 { (1.0 - sum).sqrt() } else { 0.0 };

	let (qx, qy, qz, qw) = match idx {
		0 => (d, a, b, c),
		1 => (a, d, b, c),
		2 => (a, b, d, c),
		_ => (a, b, c, d),
	};

	let tangent = Vec3::new(
		1.0 - 2.0 * (qy * qy + qz * qz),
		2.0 * (qx * qy + qw * qz),
		2.0 * (qx * qz - qw * qy),
	);
	let normal = Vec3::new(
		2.0 * (qx * qz + qw * qy),
		2.0 * (qy * qz - qw * qx),
		1.0 - 2.0 * (qx * qx + qy * qy),
	);

	(tangent, normal)
}

/// Unpacks a UV pair stored as two half floats.
pub fn unpack_uv_half(packed: u32) -> Vec2 {
	Vec2::new(
		f16::from_bits(packed as u16).to_f32(),
		f16::from_bits((packed >> 16) as u16).to_f32(),
	)
}

/// Byte stride of one run descriptor in the packed index table.
pub const FACE_RUN_SIZE: u64 = 40;

/// Width tag routing a run through the plain 16-bit index buffer.
pub const RUN_WIDTH_PLAIN: u8 = 0;

/// One run of the packed triangle-index table.
///
/// The table partitions a surface's triangle range into runs sharing
/// one index width. Width tags 1 and 2 are element sizes in the packed
/// buffer; [`RUN_WIDTH_PLAIN`] reads the plain buffer. Decoded values
/// are relative to `base_vertex`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FaceIndexRun {
	pub first_triangle: u32, // 0x00
	pub triangle_count: u32, // 0x04
	pub data_offset: u32,    // 0x08, into the run's backing buffer
	pub base_vertex: u32,    // 0x0c
	pub index_width: u8,     // 0x10
}

impl MemoryDecode for FaceIndexRun {
	const SIZE: usize = FACE_RUN_SIZE as usize;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		Ok(FaceIndexRun {
			first_triangle: buf.read_u32::<LE>()?,
			triangle_count: buf.read_u32::<LE>()?,
			data_offset: buf.read_u32::<LE>()?,
			base_vertex: buf.read_u32::<LE>()?,
			index_width: buf.read_u8()?,
		})
	}
}

fn read_run(tables: &dyn DataSource, entry: u64) -> Result<FaceIndexRun, GeometryError> {
	let mut raw = [0; FaceIndexRun::SIZE];
	tables.read_at(entry * FACE_RUN_SIZE, &mut raw)?;

	FaceIndexRun::decode(&mut raw.as_slice()).map_err(|source| {
		GeometryError::Read {
			source: ReadError::Decode {
				address: entry * FACE_RUN_SIZE,
				source: source,
			},
		}
	})
}

/// Resolves the three vertex indices of `triangle`.
///
/// Scans the run table for the run containing `triangle` and decodes
/// with that run's width from its backing buffer. A triangle outside
/// every run, or any failed buffer read, is a hard failure: the caller
/// must discard the surface's whole face list rather than emit partial
/// triangles.
pub fn unpack_face_indices(
	tables: &dyn DataSource,
	table_count: u32,
	packed: &dyn DataSource,
	plain: &dyn DataSource,
	triangle: u32,
) -> Result<[u16; 3], GeometryError> {
	for entry in 0..table_count as u64 {
		let run = read_run(tables, entry)?;

		if triangle < run.first_triangle
			|| triangle - run.first_triangle >= run.triangle_count
		{
			continue;
		}

		let rel = (triangle - run.first_triangle) as u64;
		let mut indices = [0u16; 3];

		match run.index_width {
			RUN_WIDTH_PLAIN => {
				let base = run.data_offset as u64 + rel * 6;
				for (k, index) in indices.iter_mut().enumerate() {
					let raw = plain.read_u16_at(base + k as u64 * 2)?;
					*index = (raw as u32 + run.base_vertex) as u16;
				}
			}
			1 => {
				let base = run.data_offset as u64 + rel * 3;
				for (k, index) in indices.iter_mut().enumerate() {
					let raw = packed.read_u8_at(base + k as u64)?;
					*index = (raw as u32 + run.base_vertex) as u16;
				}
			}
			2 => {
				let base = run.data_offset as u64 + rel * 6;
				for (k, index) in indices.iter_mut().enumerate() {
					let raw = packed.read_u16_at(base + k as u64 * 2)?;
					*index = (raw as u32 + run.base_vertex) as u16;
				}
			}
			width => return Err(GeometryError::RunWidth(width)),
		}

		return Ok(indices);
	}

	Err(GeometryError::TriangleOutOfRange(triangle))
}

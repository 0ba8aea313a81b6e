//! DDS container construction for ripped pixel data.
//!
//! Streamed images come out of the process as bare encoded payloads;
//! the import pipeline expects a complete DX10-style DDS file, so the
//! header must be reconstructed bit-exactly from the resolved
//! dimensions and format tag.

pub const DDS_MAGIC: u32 = u32::from_le_bytes(*b"DDS ");
pub const FOURCC_DX10: u32 = u32::from_le_bytes(*b"DX10");

pub const DXGI_R16G16B16A16_FLOAT: u32 = 10;
pub const DXGI_R8G8B8A8_UNORM: u32 = 28;
pub const DXGI_R8G8B8A8_UNORM_SRGB: u32 = 29;
pub const DXGI_R8G8_UNORM: u32 = 49;
pub const DXGI_R8_UNORM: u32 = 61;
pub const DXGI_A8_UNORM: u32 = 65;
pub const DXGI_R9G9B9E5_SHAREDEXP: u32 = 67;
pub const DXGI_BC1_UNORM: u32 = 71;
pub const DXGI_BC1_UNORM_SRGB: u32 = 72;
pub const DXGI_BC2_UNORM: u32 = 74;
pub const DXGI_BC3_UNORM: u32 = 77;
pub const DXGI_BC3_UNORM_SRGB: u32 = 78;
pub const DXGI_BC4_UNORM: u32 = 80;
pub const DXGI_BC5_UNORM: u32 = 83;
pub const DXGI_BC6H_UF16: u32 = 95;
pub const DXGI_BC7_UNORM: u32 = 98;
pub const DXGI_BC7_UNORM_SRGB: u32 = 99;

const DDSD_CAPS: u32 = 0x1;
const DDSD_HEIGHT: u32 = 0x2;
const DDSD_WIDTH: u32 = 0x4;
const DDSD_PIXELFORMAT: u32 = 0x1000;
const DDSD_MIPMAPCOUNT: u32 = 0x20000;
const DDPF_FOURCC: u32 = 0x4;
const DDSCAPS_TEXTURE: u32 = 0x1000;
const DDS_DIMENSION_TEXTURE2D: u32 = 3;

/// Engine pixel-format byte to DXGI tag.
///
/// The engine stores a one-byte format id in the image header; this is
/// the subset of its table that surfaces in ripped assets.
const ENGINE_FORMATS: [u32; 18] = [
	0,
	DXGI_R8_UNORM,
	DXGI_R8G8_UNORM,
	DXGI_R8G8B8A8_UNORM,
	DXGI_R8G8B8A8_UNORM_SRGB,
	DXGI_R16G16B16A16_FLOAT,
	DXGI_R9G9B9E5_SHAREDEXP,
	DXGI_A8_UNORM,
	DXGI_BC1_UNORM,
	DXGI_BC1_UNORM_SRGB,
	DXGI_BC2_UNORM,
	DXGI_BC3_UNORM,
	DXGI_BC3_UNORM_SRGB,
	DXGI_BC4_UNORM,
	DXGI_BC5_UNORM,
	DXGI_BC6H_UF16,
	DXGI_BC7_UNORM,
	DXGI_BC7_UNORM_SRGB,
];

/// Maps the engine's pixel-format byte to a DXGI tag.
pub fn engine_format(tag: u8) -> Option<u32> {
	match ENGINE_FORMATS.get(tag as usize) {
		Some(0) | None => None,
		Some(format) => Some(*format),
	}
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
	out.extend_from_slice(&value.to_le_bytes());
}

/// Builds a complete single-mip DDS file from raw pixel data.
///
/// Returns `None` when either dimension is zero; the result is
/// undecodable downstream without real dimensions.
pub fn build_dds(width: u32, height: u32, dxgi_format: u32, payload: &[u8]) -> Option<Vec<u8>> {
	if width == 0 || height == 0 {
		return None;
	}

	let mut out = Vec::with_capacity(148 + payload.len());

	put_u32(&mut out, DDS_MAGIC);
	put_u32(&mut out, 124);
	put_u32(
		&mut out,
		DDSD_CAPS | DDSD_HEIGHT | DDSD_WIDTH | DDSD_PIXELFORMAT | DDSD_MIPMAPCOUNT,
	);
	put_u32(&mut out, height);
	put_u32(&mut out, width);
	put_u32(&mut out, 0); // pitch/linear size
	put_u32(&mut out, 0); // depth
	put_u32(&mut out, 1); // mip count
	for _ in 0..11 {
		put_u32(&mut out, 0); // reserved
	}

	// DDS_PIXELFORMAT, deferring the real format to the DX10 block
	put_u32(&mut out, 32);
	put_u32(&mut out, DDPF_FOURCC);
	put_u32(&mut out, FOURCC_DX10);
	for _ in 0..5 {
		put_u32(&mut out, 0); // rgb bit counts and masks
	}

	put_u32(&mut out, DDSCAPS_TEXTURE);
	for _ in 0..4 {
		put_u32(&mut out, 0); // caps2-4 and reserved
	}

	// DDS_HEADER_DXT10
	put_u32(&mut out, dxgi_format);
	put_u32(&mut out, DDS_DIMENSION_TEXTURE2D);
	put_u32(&mut out, 0); // misc
	put_u32(&mut out, 1); // array size
	put_u32(&mut out, 0); // misc2

	out.extend_from_slice(payload);
	Some(out)
}

//! Image decoding.
//!
//! Pixel data is either resident behind the image header or streamed
//! per mip. Either way the output is a complete DDS container built
//! from the resolved dimensions and the engine's pixel-format tag.

use rrk_core::memory::ReadMemoryExt;
use rrk_core::scene::ImagePayload;
use rrk_core::texture::{
	build_dds,
	engine_format
};

use crate::stream::extract_best_mip;
use crate::structures::{
	GfxImage,
	GfxMip
};
use crate::{
	AssetContext,
	AssetKind,
	DecodeError
};

/// Largest mip array the engine emits.
const MAX_MIPS: usize = 32;

pub fn read_image(ctx: &AssetContext<'_>, handle: u64) -> Result<ImagePayload, DecodeError> {
	let image: GfxImage = ctx.reader.read_struct(handle)?;

	let format = engine_format(image.image_format).ok_or(DecodeError::PixelFormat {
		hash: image.hash,
		tag: image.image_format,
	})?;

	let (width, height, pixels) = if image.loaded_image_ptr != 0 {
		if image.buffer_size == 0 {
			return Err(DecodeError::EmptyImageBuffer {
				hash: image.hash,
			});
		}

		let pixels = ctx
			.reader
			.read_bytes(image.loaded_image_ptr, image.buffer_size as usize)?;
		(image.width as u32, image.height as u32, pixels)
	} else {
		if image.mip_maps_ptr == 0 {
			return Err(DecodeError::Unavailable {
				kind: AssetKind::Image,
				hash: image.hash,
			});
		}

		let mip_count = (image.mip_count as usize).min(MAX_MIPS);
		let mips: Vec<GfxMip> = ctx.reader.read_array(image.mip_maps_ptr, mip_count)?;

		let selection = extract_best_mip(ctx.store, &mips).ok_or(DecodeError::Unavailable {
			kind: AssetKind::Image,
			hash: image.hash,
		})?;

		// Every higher mip that went unused halves both dimensions.
		let shift = (mip_count - selection.index - 1) as u32;
		(
			image.width as u32 >> shift,
			image.height as u32 >> shift,
			selection.data,
		)
	};

	let data = build_dds(width, height, format, &pixels).ok_or(DecodeError::BadDimensions {
		hash: image.hash,
	})?;

	Ok(ImagePayload {
		width: width,
		height: height,
		format: format,
		data: data,
	})
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use rrk_core::memory::{
		MemoryDecode,
		SnapshotReader
	};
	use rrk_core::name::PlaceholderResolver;
	use rrk_core::store::{
		ContentStore,
		NullStore
	};
	use rrk_core::texture::DXGI_BC1_UNORM;

	use crate::GameFlavor;

	use super::*;

	const IMAGE_PTR: u64 = 0x1000;
	const PIXEL_PTR: u64 = 0x2000;
	const MIPS_PTR: u64 = 0x3000;

	struct LocalOnlyStore {
		local: HashMap<u64, Vec<u8>>,
	}

	impl ContentStore for LocalOnlyStore {
		fn extract_local(&self, key: u64, _size: u64) -> Vec<u8> {
			self.local.get(&key).cloned().unwrap_or_default()
		}

		fn extract_remote(&self, _key: u64, _expected_size: u64) -> Vec<u8> {
			Vec::new()
		}

		fn has_local_key(&self, key: u64) -> bool {
			self.local.contains_key(&key)
		}
	}

	fn map_image(
		snap: &mut SnapshotReader,
		loaded_ptr: u64,
		mips_ptr: u64,
		buffer_size: u32,
		width: u16,
		height: u16,
		format: u8,
		mip_count: u8,
	) {
		let mut raw = Vec::new();
		raw.extend_from_slice(&0xE0u64.to_le_bytes());
		raw.extend_from_slice(&loaded_ptr.to_le_bytes());
		raw.extend_from_slice(&mips_ptr.to_le_bytes());
		raw.extend_from_slice(&buffer_size.to_le_bytes());
		raw.extend_from_slice(&width.to_le_bytes());
		raw.extend_from_slice(&height.to_le_bytes());
		raw.push(format);
		raw.push(mip_count);
		raw.resize(GfxImage::SIZE, 0);
		snap.map(IMAGE_PTR, raw);
	}

	fn map_mips(snap: &mut SnapshotReader, mips: &[(u64, u32)]) {
		let mut raw = Vec::new();
		for (hash, size) in mips {
			raw.extend_from_slice(&hash.to_le_bytes());
			raw.extend_from_slice(&size.to_le_bytes());
			raw.extend_from_slice(&0u32.to_le_bytes());
		}
		snap.map(MIPS_PTR, raw);
	}

	fn context<'a>(snap: &'a SnapshotReader, store: &'a dyn ContentStore) -> AssetContext<'a> {
		AssetContext {
			reader: snap,
			names: &PlaceholderResolver,
			store: store,
			flavor: GameFlavor::Multiplayer,
		}
	}

	#[test]
	fn test_resident_image_becomes_a_dds_container() {
		let mut snap = SnapshotReader::new();
		map_image(&mut snap, PIXEL_PTR, 0, 8, 64, 32, 8, 1);
		snap.map(PIXEL_PTR, vec![0x5A; 8]);

		let ctx = context(&snap, &NullStore);
		let payload = read_image(&ctx, IMAGE_PTR).unwrap();

		assert_eq!(payload.width, 64);
		assert_eq!(payload.height, 32);
		assert_eq!(payload.format, DXGI_BC1_UNORM);
		assert_eq!(&payload.data[0..4], b"DDS ");
		assert_eq!(payload.data.len(), 148 + 8);
		assert_eq!(payload.data[148], 0x5A);
	}

	#[test]
	fn test_zero_size_resident_buffer_fails() {
		let mut snap = SnapshotReader::new();
		map_image(&mut snap, PIXEL_PTR, 0, 0, 64, 32, 8, 1);

		let ctx = context(&snap, &NullStore);
		let err = read_image(&ctx, IMAGE_PTR).unwrap_err();
		assert!(matches!(err, DecodeError::EmptyImageBuffer { .. }));
	}

	#[test]
	fn test_unknown_pixel_format_fails() {
		let mut snap = SnapshotReader::new();
		map_image(&mut snap, PIXEL_PTR, 0, 8, 64, 32, 200, 1);

		let ctx = context(&snap, &NullStore);
		let err = read_image(&ctx, IMAGE_PTR).unwrap_err();
		assert!(matches!(err, DecodeError::PixelFormat { tag: 200, .. }));
	}

	#[test]
	fn test_mip_fallback_shifts_dimensions() {
		// Four mips; only mip 2's key resolves locally and the remote
		// store is empty, so the one skipped higher mip halves the
		// declared 256x128 once.
		let mut snap = SnapshotReader::new();
		map_image(&mut snap, 0, MIPS_PTR, 0, 256, 128, 8, 4);
		map_mips(&mut snap, &[(0xA0, 64), (0xA1, 256), (0xA2, 1024), (0xA3, 4096)]);

		let store = LocalOnlyStore {
			local: HashMap::from([(0xA2, vec![1; 1024])]),
		};
		let ctx = context(&snap, &store);
		let payload = read_image(&ctx, IMAGE_PTR).unwrap();

		assert_eq!(payload.width, 128);
		assert_eq!(payload.height, 64);
		assert_eq!(payload.data.len(), 148 + 1024);
	}

	#[test]
	fn test_no_servable_source_is_unavailable() {
		let mut snap = SnapshotReader::new();
		map_image(&mut snap, 0, MIPS_PTR, 0, 256, 128, 8, 2);
		map_mips(&mut snap, &[(0xB0, 64), (0xB1, 256)]);

		let ctx = context(&snap, &NullStore);
		let err = read_image(&ctx, IMAGE_PTR).unwrap_err();
		assert!(matches!(
			err,
			DecodeError::Unavailable {
				kind: AssetKind::Image,
				..
			}
		));
	}

	#[test]
	fn test_missing_mip_table_is_unavailable() {
		let mut snap = SnapshotReader::new();
		map_image(&mut snap, 0, 0, 0, 256, 128, 8, 4);

		let ctx = context(&snap, &NullStore);
		let err = read_image(&ctx, IMAGE_PTR).unwrap_err();
		assert!(matches!(err, DecodeError::Unavailable { .. }));
	}
}

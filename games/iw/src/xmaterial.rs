//! Material decoding.
//!
//! Campaign and multiplayer builds carry distinct material layouts at
//! the same semantic role; both join an image-pointer table with a
//! texture-binding table by index and produce the same normalized
//! output.

use rrk_core::memory::{
	MemoryDecode,
	ReadMemoryExt
};
use rrk_core::scene::{
	ImageRef,
	MaterialAsset
};

use crate::structures::{
	GfxImage,
	Material,
	MaterialSp,
	MaterialTextureDef,
	MaterialTextureDefSp
};
use crate::{
	AssetContext,
	DecodeError,
	GameFlavor,
	HASH_MASK
};

/// Image names beginning with this character are engine placeholders
/// and never carry real pixel data.
const PLACEHOLDER_SENTINEL: char = '$';

pub fn read_material(ctx: &AssetContext<'_>, handle: u64) -> Result<MaterialAsset, DecodeError> {
	match ctx.flavor {
		GameFlavor::Multiplayer => read_multiplayer(ctx, handle),
		GameFlavor::SinglePlayer => read_singleplayer(ctx, handle),
	}
}

fn read_multiplayer(ctx: &AssetContext<'_>, handle: u64) -> Result<MaterialAsset, DecodeError> {
	let header: Material = ctx.reader.read_struct(handle)?;
	let images = read_image_table(ctx, header.image_table_ptr, header.image_count as usize)?;

	let mut material = MaterialAsset {
		hash: header.hash & HASH_MASK,
		handle: handle,
		name: ctx.names.resolve(header.hash, "xmaterial"),
		images: Vec::new(),
	};

	for index in 0..header.texture_count as u64 {
		let def: MaterialTextureDef = ctx
			.reader
			.read_struct(header.texture_table_ptr + index * MaterialTextureDef::SIZE as u64)?;
		bind_image(ctx, &images, def.image_index, def.semantic, &mut material);
	}

	Ok(material)
}

fn read_singleplayer(ctx: &AssetContext<'_>, handle: u64) -> Result<MaterialAsset, DecodeError> {
	let header: MaterialSp = ctx.reader.read_struct(handle)?;
	let images = read_image_table(ctx, header.image_table_ptr, header.image_count as usize)?;

	let mut material = MaterialAsset {
		hash: header.hash & HASH_MASK,
		handle: handle,
		name: ctx.names.resolve(header.hash, "xmaterial"),
		images: Vec::new(),
	};

	for index in 0..header.texture_count as u64 {
		let def: MaterialTextureDefSp = ctx
			.reader
			.read_struct(header.texture_table_ptr + index * MaterialTextureDefSp::SIZE as u64)?;
		bind_image(ctx, &images, def.image_index, def.semantic, &mut material);
	}

	Ok(material)
}

fn read_image_table(
	ctx: &AssetContext<'_>,
	table_ptr: u64,
	count: usize,
) -> Result<Vec<(u64, GfxImage)>, DecodeError> {
	let pointers: Vec<u64> = ctx.reader.read_array(table_ptr, count)?;

	let mut images = Vec::with_capacity(count);
	for pointer in pointers {
		let image: GfxImage = ctx.reader.read_struct(pointer)?;
		images.push((pointer, image));
	}

	Ok(images)
}

fn bind_image(
	ctx: &AssetContext<'_>,
	images: &[(u64, GfxImage)],
	image_index: u32,
	semantic: u32,
	material: &mut MaterialAsset,
) {
	let (pointer, image) = match images.get(image_index as usize) {
		Some(entry) => entry,
		None => {
			tracing::warn!(
				"material {:#x}: binding references image {} of {}",
				material.hash,
				image_index,
				images.len()
			);
			return;
		}
	};

	let name = ctx.names.resolve(image.hash, "ximage");
	if name.starts_with(PLACEHOLDER_SENTINEL) {
		return;
	}

	material.images.push(ImageRef {
		name: name,
		semantic: semantic,
		handle: *pointer,
	});
}

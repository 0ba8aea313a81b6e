//! In-memory structures of the IW engine.
//!
//! These layouts are a reverse-engineered contract: field positions
//! are fixed by the shipped binary, not by this crate. Every structure
//! decodes from the little-endian bytes of the foreign process; sizes
//! include trailing padding the decoders skip.

use std::io;

use byteorder::{
	LE,
	ReadBytesExt
};

use ultraviolet::vec::{
	Vec3,
	Vec4
};

use rrk_core::memory::MemoryDecode;

/// Model asset header.
#[derive(Clone, Copy, Debug, Default)]
pub struct XModel {
	pub hash: u64,                  // 0x00
	pub name_ptr: u64,              // 0x08
	pub bone_info_ptr: u64,         // 0x10
	pub lod_info_ptr: u64,          // 0x18
	pub material_handles_ptr: u64,  // 0x20
	pub num_lods: u32,              // 0x28
}

impl MemoryDecode for XModel {
	const SIZE: usize = 0x30;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		Ok(XModel {
			hash: buf.read_u64::<LE>()?,
			name_ptr: buf.read_u64::<LE>()?,
			bone_info_ptr: buf.read_u64::<LE>()?,
			lod_info_ptr: buf.read_u64::<LE>()?,
			material_handles_ptr: buf.read_u64::<LE>()?,
			num_lods: buf.read_u32::<LE>()?,
		})
	}
}

/// Bone bookkeeping hanging off the model header.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoneInfo {
	pub bone_ids_ptr: u64,        // 0x00
	pub bone_parents_ptr: u64,    // 0x08
	pub rotations_ptr: u64,       // 0x10
	pub translations_ptr: u64,    // 0x18
	pub base_transforms_ptr: u64, // 0x20
	pub num_bones: u32,           // 0x28
	pub num_root_bones: u32,      // 0x2c
	pub cosmetic_bone_count: u32, // 0x30
}

impl MemoryDecode for BoneInfo {
	const SIZE: usize = 0x38;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		Ok(BoneInfo {
			bone_ids_ptr: buf.read_u64::<LE>()?,
			bone_parents_ptr: buf.read_u64::<LE>()?,
			rotations_ptr: buf.read_u64::<LE>()?,
			translations_ptr: buf.read_u64::<LE>()?,
			base_transforms_ptr: buf.read_u64::<LE>()?,
			num_bones: buf.read_u32::<LE>()?,
			num_root_bones: buf.read_u32::<LE>()?,
			cosmetic_bone_count: buf.read_u32::<LE>()?,
		})
	}
}

/// One absolute bone transform: quaternion, translation, and the
/// engine's translation weight.
#[derive(Clone, Copy, Debug)]
pub struct BoneTransform {
	pub rotation: Vec4,    // 0x00, (x, y, z, w)
	pub translation: Vec3, // 0x10
	pub weight: f32,       // 0x1c
}

impl MemoryDecode for BoneTransform {
	const SIZE: usize = 0x20;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		Ok(BoneTransform {
			rotation: Vec4::new(
				buf.read_f32::<LE>()?,
				buf.read_f32::<LE>()?,
				buf.read_f32::<LE>()?,
				buf.read_f32::<LE>()?,
			),
			translation: Vec3::new(
				buf.read_f32::<LE>()?,
				buf.read_f32::<LE>()?,
				buf.read_f32::<LE>()?,
			),
			weight: buf.read_f32::<LE>()?,
		})
	}
}

/// One level-of-detail entry in the model's LOD table.
#[derive(Clone, Copy, Debug, Default)]
pub struct XModelLod {
	pub mesh_ptr: u64,     // 0x00, streamed mesh info block
	pub surfs_ptr: u64,    // 0x08
	pub lod_distance: f32, // 0x10
	pub num_surfs: u32,    // 0x14
}

impl MemoryDecode for XModelLod {
	const SIZE: usize = 0x18;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		Ok(XModelLod {
			mesh_ptr: buf.read_u64::<LE>()?,
			surfs_ptr: buf.read_u64::<LE>()?,
			lod_distance: buf.read_f32::<LE>()?,
			num_surfs: buf.read_u32::<LE>()?,
		})
	}
}

/// One submesh descriptor. All `*_offset` fields are byte offsets into
/// the LOD's streamed payload; `vertex_color_offset` uses an all-ones
/// sentinel for "no colors".
#[derive(Clone, Copy, Debug, Default)]
pub struct XSurface {
	pub vert_count: u32,                  // 0x00
	pub tri_count: u32,                   // 0x04
	pub packed_indices_table_count: u32,  // 0x08
	pub vertex_color_offset: u32,         // 0x0c
	pub xyz_offset: u64,                  // 0x10
	pub tex_coord_offset: u64,            // 0x18
	pub tangent_frame_offset: u64,        // 0x20
	pub index_data_offset: u64,           // 0x28
	pub packed_indices_table_offset: u64, // 0x30
	pub packed_indices_offset: u64,       // 0x38
	pub weights_offset: u64,              // 0x40
	pub weight_counts: [u16; 8],          // 0x48
	pub override_scale: f32,              // 0x58, -1.0 = derive from min/max/scale
	pub min: f32,                         // 0x5c
	pub max: f32,                         // 0x60
	pub scale: f32,                       // 0x64
	pub offsets_x: f32,                   // 0x68
	pub offsets_y: f32,                   // 0x6c
	pub offsets_z: f32,                   // 0x70
}

impl MemoryDecode for XSurface {
	const SIZE: usize = 0x78;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		let mut surface = XSurface {
			vert_count: buf.read_u32::<LE>()?,
			tri_count: buf.read_u32::<LE>()?,
			packed_indices_table_count: buf.read_u32::<LE>()?,
			vertex_color_offset: buf.read_u32::<LE>()?,
			xyz_offset: buf.read_u64::<LE>()?,
			tex_coord_offset: buf.read_u64::<LE>()?,
			tangent_frame_offset: buf.read_u64::<LE>()?,
			index_data_offset: buf.read_u64::<LE>()?,
			packed_indices_table_offset: buf.read_u64::<LE>()?,
			packed_indices_offset: buf.read_u64::<LE>()?,
			weights_offset: buf.read_u64::<LE>()?,
			..XSurface::default()
		};

		for count in surface.weight_counts.iter_mut() {
			*count = buf.read_u16::<LE>()?;
		}
		surface.override_scale = buf.read_f32::<LE>()?;
		surface.min = buf.read_f32::<LE>()?;
		surface.max = buf.read_f32::<LE>()?;
		surface.scale = buf.read_f32::<LE>()?;
		surface.offsets_x = buf.read_f32::<LE>()?;
		surface.offsets_y = buf.read_f32::<LE>()?;
		surface.offsets_z = buf.read_f32::<LE>()?;

		Ok(surface)
	}
}

/// Streamed mesh info block referenced by a LOD.
#[derive(Clone, Copy, Debug, Default)]
pub struct XModelSurfs {
	pub hash: u64,       // 0x00
	pub shared_ptr: u64, // 0x08
	pub xpak_key: u64,   // 0x10
}

impl MemoryDecode for XModelSurfs {
	const SIZE: usize = 0x18;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		Ok(XModelSurfs {
			hash: buf.read_u64::<LE>()?,
			shared_ptr: buf.read_u64::<LE>()?,
			xpak_key: buf.read_u64::<LE>()?,
		})
	}
}

/// Shared vertex/index buffer descriptor for a streamed mesh.
#[derive(Clone, Copy, Debug, Default)]
pub struct XSurfaceShared {
	pub data_ptr: u64,  // 0x00, 0 when not resident
	pub data_size: u32, // 0x08
}

impl MemoryDecode for XSurfaceShared {
	const SIZE: usize = 0x10;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		Ok(XSurfaceShared {
			data_ptr: buf.read_u64::<LE>()?,
			data_size: buf.read_u32::<LE>()?,
		})
	}
}

/// Image asset header.
#[derive(Clone, Copy, Debug, Default)]
pub struct GfxImage {
	pub hash: u64,             // 0x00
	pub loaded_image_ptr: u64, // 0x08, resident pixel data when nonzero
	pub mip_maps_ptr: u64,     // 0x10
	pub buffer_size: u32,      // 0x18
	pub width: u16,            // 0x1c
	pub height: u16,           // 0x1e
	pub image_format: u8,      // 0x20
	pub mip_count: u8,         // 0x21
}

impl MemoryDecode for GfxImage {
	const SIZE: usize = 0x28;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		Ok(GfxImage {
			hash: buf.read_u64::<LE>()?,
			loaded_image_ptr: buf.read_u64::<LE>()?,
			mip_maps_ptr: buf.read_u64::<LE>()?,
			buffer_size: buf.read_u32::<LE>()?,
			width: buf.read_u16::<LE>()?,
			height: buf.read_u16::<LE>()?,
			image_format: buf.read_u8()?,
			mip_count: buf.read_u8()?,
		})
	}
}

/// One entry of an image's mip descriptor array.
#[derive(Clone, Copy, Debug, Default)]
pub struct GfxMip {
	pub hash: u64, // 0x00, package key for this mip
	pub size: u32, // 0x08
}

impl MemoryDecode for GfxMip {
	const SIZE: usize = 0x10;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		Ok(GfxMip {
			hash: buf.read_u64::<LE>()?,
			size: buf.read_u32::<LE>()?,
		})
	}
}

/// Material header, multiplayer layout.
#[derive(Clone, Copy, Debug, Default)]
pub struct Material {
	pub hash: u64,              // 0x00
	pub image_table_ptr: u64,   // 0x08
	pub texture_table_ptr: u64, // 0x10
	pub image_count: u8,        // 0x18
	pub texture_count: u8,      // 0x19
}

impl MemoryDecode for Material {
	const SIZE: usize = 0x20;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		Ok(Material {
			hash: buf.read_u64::<LE>()?,
			image_table_ptr: buf.read_u64::<LE>()?,
			texture_table_ptr: buf.read_u64::<LE>()?,
			image_count: buf.read_u8()?,
			texture_count: buf.read_u8()?,
		})
	}
}

/// Material header, campaign layout. Same role as [`Material`], fields
/// shuffled by the single-player binary.
#[derive(Clone, Copy, Debug, Default)]
pub struct MaterialSp {
	pub techset_ptr: u64,       // 0x00
	pub hash: u64,              // 0x08
	pub texture_table_ptr: u64, // 0x10
	pub image_table_ptr: u64,   // 0x18
	pub texture_count: u8,      // 0x20
	pub image_count: u8,        // 0x21
}

impl MemoryDecode for MaterialSp {
	const SIZE: usize = 0x28;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		Ok(MaterialSp {
			techset_ptr: buf.read_u64::<LE>()?,
			hash: buf.read_u64::<LE>()?,
			texture_table_ptr: buf.read_u64::<LE>()?,
			image_table_ptr: buf.read_u64::<LE>()?,
			texture_count: buf.read_u8()?,
			image_count: buf.read_u8()?,
		})
	}
}

/// Texture binding entry, multiplayer layout.
#[derive(Clone, Copy, Debug, Default)]
pub struct MaterialTextureDef {
	pub semantic: u32,    // 0x00, slot the image binds to
	pub image_index: u32, // 0x04, index into the image pointer table
}

impl MemoryDecode for MaterialTextureDef {
	const SIZE: usize = 0x08;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		Ok(MaterialTextureDef {
			semantic: buf.read_u32::<LE>()?,
			image_index: buf.read_u32::<LE>()?,
		})
	}
}

/// Texture binding entry, campaign layout.
#[derive(Clone, Copy, Debug, Default)]
pub struct MaterialTextureDefSp {
	pub image_index: u32, // 0x00
	pub semantic: u32,    // 0x04
}

impl MemoryDecode for MaterialTextureDefSp {
	const SIZE: usize = 0x10;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		Ok(MaterialTextureDefSp {
			image_index: buf.read_u32::<LE>()?,
			semantic: buf.read_u32::<LE>()?,
		})
	}
}

/// Sound asset header.
#[derive(Clone, Copy, Debug, Default)]
pub struct SoundAsset {
	pub hash: u64,           // 0x00
	pub stream_key: u64,     // 0x08
	pub stream_key_ex: u64,  // 0x10, extended key used when 0x08 is empty
	pub size: u32,           // 0x18
	pub loaded_size: u32,    // 0x1c
	pub seek_table_size: u32,// 0x20
	pub frame_count: u32,    // 0x24
	pub frame_rate: u32,     // 0x28
	pub channel_count: u8,   // 0x2c
}

impl MemoryDecode for SoundAsset {
	const SIZE: usize = 0x30;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		Ok(SoundAsset {
			hash: buf.read_u64::<LE>()?,
			stream_key: buf.read_u64::<LE>()?,
			stream_key_ex: buf.read_u64::<LE>()?,
			size: buf.read_u32::<LE>()?,
			loaded_size: buf.read_u32::<LE>()?,
			seek_table_size: buf.read_u32::<LE>()?,
			frame_count: buf.read_u32::<LE>()?,
			frame_rate: buf.read_u32::<LE>()?,
			channel_count: buf.read_u8()?,
		})
	}
}

/// The world header embeds at most this many transient zone pointers.
pub const MAX_TRANSIENT_ZONES: usize = 128;

/// Surface block of the world header.
#[derive(Clone, Copy, Debug, Default)]
pub struct GfxWorldSurfaces {
	pub count: u32,            // 0x00
	pub surfaces_ptr: u64,     // 0x08
	pub ugb_surf_data_ptr: u64,// 0x10
	pub materials_ptr: u64,    // 0x18
}

impl MemoryDecode for GfxWorldSurfaces {
	const SIZE: usize = 0x20;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		let count = buf.read_u32::<LE>()?;
		let _pad = buf.read_u32::<LE>()?;
		Ok(GfxWorldSurfaces {
			count: count,
			surfaces_ptr: buf.read_u64::<LE>()?,
			ugb_surf_data_ptr: buf.read_u64::<LE>()?,
			materials_ptr: buf.read_u64::<LE>()?,
		})
	}
}

/// Static model block of the world header.
#[derive(Clone, Copy, Debug, Default)]
pub struct GfxWorldStaticModels {
	pub collections_count: u32, // 0x00
	pub instance_count: u32,    // 0x04
	pub collections_ptr: u64,   // 0x08
	pub smodels_ptr: u64,       // 0x10
	pub instance_data_ptr: u64, // 0x18
}

impl MemoryDecode for GfxWorldStaticModels {
	const SIZE: usize = 0x20;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		Ok(GfxWorldStaticModels {
			collections_count: buf.read_u32::<LE>()?,
			instance_count: buf.read_u32::<LE>()?,
			collections_ptr: buf.read_u64::<LE>()?,
			smodels_ptr: buf.read_u64::<LE>()?,
			instance_data_ptr: buf.read_u64::<LE>()?,
		})
	}
}

/// World (map) asset header. The zone pointer array is inline; only
/// the declared count is retained.
#[derive(Clone, Debug, Default)]
pub struct GfxWorld {
	pub transient_zone_count: u32,   // 0x00
	pub transient_zones: Vec<u64>,   // 0x08, `MAX_TRANSIENT_ZONES` slots
	pub surfaces: GfxWorldSurfaces,  // 0x408
	pub smodels: GfxWorldStaticModels, // 0x428
}

impl MemoryDecode for GfxWorld {
	const SIZE: usize = 0x448;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		let count = buf.read_u32::<LE>()?;
		let _pad = buf.read_u32::<LE>()?;

		let mut zones = Vec::with_capacity(MAX_TRANSIENT_ZONES);
		for _ in 0..MAX_TRANSIENT_ZONES {
			zones.push(buf.read_u64::<LE>()?);
		}
		zones.truncate((count as usize).min(MAX_TRANSIENT_ZONES));

		Ok(GfxWorld {
			transient_zone_count: count,
			transient_zones: zones,
			surfaces: GfxWorldSurfaces::decode(buf)?,
			smodels: GfxWorldStaticModels::decode(buf)?,
		})
	}
}

/// Base buffers of one transient zone.
#[derive(Clone, Copy, Debug, Default)]
pub struct GfxDrawVerts {
	pub pos_data: u64,       // 0x00
	pub indices: u64,        // 0x08
	pub table_data: u64,     // 0x10
	pub packed_indices: u64, // 0x18
}

/// One streamed zone of the world; a zero hash marks an unloaded slot.
#[derive(Clone, Copy, Debug, Default)]
pub struct GfxWorldTransientZone {
	pub hash: u64,                 // 0x00
	pub draw_verts: GfxDrawVerts,  // 0x08
}

impl MemoryDecode for GfxWorldTransientZone {
	const SIZE: usize = 0x28;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		Ok(GfxWorldTransientZone {
			hash: buf.read_u64::<LE>()?,
			draw_verts: GfxDrawVerts {
				pos_data: buf.read_u64::<LE>()?,
				indices: buf.read_u64::<LE>()?,
				table_data: buf.read_u64::<LE>()?,
				packed_indices: buf.read_u64::<LE>()?,
			},
		})
	}
}

/// One world surface.
#[derive(Clone, Copy, Debug, Default)]
pub struct GfxSurface {
	pub vertex_count: u32,              // 0x00
	pub tri_count: u32,                 // 0x04
	pub ugb_surf_data_index: u32,       // 0x08
	pub material_index: u32,            // 0x0c
	pub table_index: u32,               // 0x10
	pub base_index: u32,                // 0x14
	pub packed_indices_offset: u32,     // 0x18
	pub packed_indices_table_count: u32,// 0x1c
}

impl MemoryDecode for GfxSurface {
	const SIZE: usize = 0x20;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		Ok(GfxSurface {
			vertex_count: buf.read_u32::<LE>()?,
			tri_count: buf.read_u32::<LE>()?,
			ugb_surf_data_index: buf.read_u32::<LE>()?,
			material_index: buf.read_u32::<LE>()?,
			table_index: buf.read_u32::<LE>()?,
			base_index: buf.read_u32::<LE>()?,
			packed_indices_offset: buf.read_u32::<LE>()?,
			packed_indices_table_count: buf.read_u32::<LE>()?,
		})
	}
}

/// Linear reconstruction parameters for a surface's packed positions.
#[derive(Clone, Copy, Debug, Default)]
pub struct GfxWorldDrawOffset {
	pub x: f32,     // 0x00
	pub y: f32,     // 0x04
	pub z: f32,     // 0x08
	pub scale: f32, // 0x0c
}

/// Per-surface vertex stream placement inside its zone.
#[derive(Clone, Copy, Debug, Default)]
pub struct GfxUgbSurfData {
	pub transient_zone_index: u32,          // 0x00
	pub layer_count: u32,                   // 0x04
	pub xyz_offset: u32,                    // 0x08
	pub tangent_frame_offset: u32,          // 0x0c
	pub tex_coord_offset: u32,              // 0x10
	pub color_offset: u32,                  // 0x14
	pub world_draw_offset: GfxWorldDrawOffset, // 0x18
}

impl MemoryDecode for GfxUgbSurfData {
	const SIZE: usize = 0x28;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		Ok(GfxUgbSurfData {
			transient_zone_index: buf.read_u32::<LE>()?,
			layer_count: buf.read_u32::<LE>()?,
			xyz_offset: buf.read_u32::<LE>()?,
			tangent_frame_offset: buf.read_u32::<LE>()?,
			tex_coord_offset: buf.read_u32::<LE>()?,
			color_offset: buf.read_u32::<LE>()?,
			world_draw_offset: GfxWorldDrawOffset {
				x: buf.read_f32::<LE>()?,
				y: buf.read_f32::<LE>()?,
				z: buf.read_f32::<LE>()?,
				scale: buf.read_f32::<LE>()?,
			},
		})
	}
}

/// Groups the instances of one static model within one zone.
#[derive(Clone, Copy, Debug, Default)]
pub struct GfxStaticModelCollection {
	pub smodel_index: u32,         // 0x00
	pub transient_zone_index: u32, // 0x04
	pub first_instance: u32,       // 0x08
	pub instance_count: u32,       // 0x0c
}

impl MemoryDecode for GfxStaticModelCollection {
	const SIZE: usize = 0x10;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		Ok(GfxStaticModelCollection {
			smodel_index: buf.read_u32::<LE>()?,
			transient_zone_index: buf.read_u32::<LE>()?,
			first_instance: buf.read_u32::<LE>()?,
			instance_count: buf.read_u32::<LE>()?,
		})
	}
}

/// One static model slot.
#[derive(Clone, Copy, Debug, Default)]
pub struct GfxStaticModel {
	pub xmodel_ptr: u64, // 0x00
}

impl MemoryDecode for GfxStaticModel {
	const SIZE: usize = 0x08;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		Ok(GfxStaticModel {
			xmodel_ptr: buf.read_u64::<LE>()?,
		})
	}
}

/// Quantized placement of one static model instance.
#[derive(Clone, Copy, Debug, Default)]
pub struct GfxSModelInstanceData {
	pub translation: [i32; 3],  // 0x00, fixed point, 1/4096 units
	pub orientation: [u16; 4],  // 0x0c, quantized quaternion
	pub half_float_scale: u16,  // 0x14
}

impl MemoryDecode for GfxSModelInstanceData {
	const SIZE: usize = 0x18;

	fn decode(buf: &mut &[u8]) -> io::Result<Self> {
		let mut translation = [0i32; 3];
		for t in translation.iter_mut() {
			*t = buf.read_i32::<LE>()?;
		}
		let mut orientation = [0u16; 4];
		for o in orientation.iter_mut() {
			*o = buf.read_u16::<LE>()?;
		}
		Ok(GfxSModelInstanceData {
			translation: translation,
			orientation: orientation,
			half_float_scale: buf.read_u16::<LE>()?,
		})
	}
}

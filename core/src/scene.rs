use std::collections::HashMap;

use ultraviolet::{
	rotor::Rotor3,
	vec::{
		Vec2,
		Vec3,
		Vec4
	}
};

/// Element width of a variant-width foreign index array.
///
/// Exactly one width is active per array; it is declared by the asset
/// header and branched on once at read time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IndexWidth {
	U8,
	U16,
	#[default]
	U32,
}

impl IndexWidth {
	pub fn bytes(self) -> usize {
		match self {
			IndexWidth::U8 => 1,
			IndexWidth::U16 => 2,
			IndexWidth::U32 => 4,
		}
	}
}

pub fn vec4_to_rot3(v: Vec4) -> Rotor3 {
	Rotor3::from_quaternion_array([v.x, v.y, v.z, v.w])
}

/// Normalized model descriptor.
///
/// Carries the counts and foreign array addresses needed to resolve
/// bones and streamed geometry later; an address of zero means the
/// array is absent.
#[derive(Clone, Debug, Default)]
pub struct ModelAsset {
	pub name: String,
	pub bone_count: u32,
	pub root_bone_count: u32,
	pub cosmetic_bone_count: u32,
	pub streamed: bool,
	pub bone_ids_ptr: u64,
	pub bone_index_width: IndexWidth,
	pub bone_parents_ptr: u64,
	pub bone_parent_width: IndexWidth,
	pub rotations_ptr: u64,
	pub translations_ptr: u64,
	pub base_transform_ptr: u64,
	pub lods: Vec<ModelLod>,
}

/// One discrete resolution variant of a model.
///
/// `submeshes` and `materials` are index-aligned.
#[derive(Clone, Debug, Default)]
pub struct ModelLod {
	pub distance: f32,
	pub stream_info_ptr: u64,
	pub submeshes: Vec<Submesh>,
	pub materials: Vec<MaterialAsset>,
}

/// A contiguous vertex/index range sharing one material.
///
/// The `*_offset` fields are byte offsets into the LOD's streamed
/// payload buffer, which may not have been fetched yet.
#[derive(Clone, Debug)]
pub struct Submesh {
	pub vertex_count: u32,
	pub face_count: u32,
	pub packed_index_table_count: u32,
	pub vertex_offset: u64,
	pub uv_offset: u64,
	pub tangent_offset: u64,
	pub face_offset: u64,
	pub packed_index_table_offset: u64,
	pub packed_index_buffer_offset: u64,
	pub color_offset: Option<u64>,
	pub weights_offset: u64,
	pub weight_counts: [u16; 8],
	pub scale: f32,
	pub offset: Vec3,
	pub material_hash: u64,
	pub material_index: Option<u32>,
}

impl Default for Submesh {
	fn default() -> Submesh {
		Submesh {
			vertex_count: 0,
			face_count: 0,
			packed_index_table_count: 0,
			vertex_offset: 0,
			uv_offset: 0,
			tangent_offset: 0,
			face_offset: 0,
			packed_index_table_offset: 0,
			packed_index_buffer_offset: 0,
			color_offset: None,
			weights_offset: 0,
			weight_counts: [0; 8],
			scale: 1.0,
			offset: Vec3::zero(),
			material_hash: 0,
			material_index: None,
		}
	}
}

/// One resolved bone.
///
/// World transforms are read from the process; local transforms are
/// recomputed against the already-resolved parent entry.
#[derive(Clone, Debug)]
pub struct Bone {
	pub name: String,
	pub parent: Option<usize>,
	pub world_position: Vec3,
	pub world_rotation: Rotor3,
	pub local_position: Vec3,
	pub local_rotation: Rotor3,
}

#[derive(Clone, Debug, Default)]
pub struct Skeleton {
	pub bones: Vec<Bone>,
}

/// A material's reference to one image, bound to a semantic slot.
#[derive(Clone, Debug, Default)]
pub struct ImageRef {
	pub name: String,
	pub semantic: u32,
	pub handle: u64,
}

#[derive(Clone, Debug, Default)]
pub struct MaterialAsset {
	pub hash: u64,
	pub handle: u64,
	pub name: String,
	pub images: Vec<ImageRef>,
}

/// Per-vertex bone influences, slot 0 carrying the remainder weight.
#[derive(Clone, Copy, Debug, Default)]
pub struct VertexWeights {
	pub count: u32,
	pub bones: [u16; 8],
	pub values: [f32; 8],
}

/// Fully decoded geometry for one submesh or map surface.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
	pub name: String,
	pub material_hash: u64,
	pub material_index: Option<u32>,
	pub positions: Vec<Vec3>,
	pub normals: Vec<Vec3>,
	pub tangents: Vec<Vec3>,
	pub uvs: Vec<Vec2>,
	pub colors: Vec<u32>,
	pub weights: Vec<VertexWeights>,
	pub faces: Vec<u16>,
}

/// Decoded model output handed to the import pipeline.
#[derive(Clone, Debug, Default)]
pub struct ModelScene {
	pub name: String,
	pub meshes: Vec<Mesh>,
	pub skeletons: Vec<Skeleton>,
}

/// A complete header-prefixed image container plus its effective
/// dimensions and pixel format tag.
#[derive(Clone, Debug, Default)]
pub struct ImagePayload {
	pub width: u32,
	pub height: u32,
	pub format: u32,
	pub data: Vec<u8>,
}

#[derive(Clone, Debug, Default)]
pub struct SoundPayload {
	pub channel_count: u8,
	pub frame_count: u32,
	pub frame_rate: u32,
	pub samples: Vec<i16>,
}

/// Composed transform of one placed static model.
#[derive(Clone, Copy, Debug)]
pub struct Placement {
	pub translation: Vec3,
	pub rotation: Rotor3,
	pub scale: Vec3,
}

#[derive(Clone, Debug)]
pub struct PlacedInstance {
	pub model_handle: u64,
	pub name: String,
	pub placement: Placement,
}

/// Deduplicated material list with hash lookup.
#[derive(Clone, Debug, Default)]
pub struct MaterialTable {
	materials: Vec<MaterialAsset>,
	by_hash: HashMap<u64, u32>,
}

impl MaterialTable {
	pub fn new() -> MaterialTable {
		MaterialTable::default()
	}

	/// Adds `material` unless its hash is already present; either way
	/// returns the table index for the hash.
	pub fn insert(&mut self, material: MaterialAsset) -> u32 {
		if let Some(index) = self.by_hash.get(&material.hash) {
			return *index;
		}

		let index = self.materials.len() as u32;
		self.by_hash.insert(material.hash, index);
		self.materials.push(material);
		index
	}

	pub fn index_of(&self, hash: u64) -> Option<u32> {
		self.by_hash.get(&hash).copied()
	}

	pub fn contains(&self, hash: u64) -> bool {
		self.by_hash.contains_key(&hash)
	}

	pub fn materials(&self) -> &[MaterialAsset] {
		&self.materials
	}

	pub fn len(&self) -> usize {
		self.materials.len()
	}

	pub fn is_empty(&self) -> bool {
		self.materials.is_empty()
	}
}

/// Map-level scene graph: mesh chunks, the material table they index,
/// and placed static-model instances.
#[derive(Clone, Debug, Default)]
pub struct MapScene {
	pub name: String,
	pub meshes: Vec<Mesh>,
	pub materials: MaterialTable,
	pub instances: Vec<PlacedInstance>,
}

//! Bone hierarchy resolution.
//!
//! The engine stores absolute world transforms per bone and encodes
//! the parent chain as back-reference offsets in a variant-width
//! array. Local transforms are recomputed against the parent's world
//! values, superseding the local rotation/translation arrays the
//! model header also carries.

use rrk_core::memory::{
	MemoryReader,
	ReadError,
	ReadMemoryExt
};
use rrk_core::name::NameResolver;
use rrk_core::scene::{
	vec4_to_rot3,
	Bone,
	IndexWidth,
	ModelAsset,
	ModelScene,
	Skeleton
};

use crate::structures::BoneTransform;
use crate::DecodeError;

/// A foreign index array whose element width is declared at decode
/// time. Exactly one width is active; values widen to `u32` on read.
#[derive(Clone, Debug)]
pub enum BoneIndexArray {
	U8(Vec<u8>),
	U16(Vec<u16>),
	U32(Vec<u32>),
}

impl BoneIndexArray {
	/// Reads `count` elements of the declared width starting at
	/// `address`.
	pub fn read(
		reader: &dyn MemoryReader,
		address: u64,
		count: usize,
		width: IndexWidth,
	) -> Result<BoneIndexArray, ReadError> {
		Ok(match width {
			IndexWidth::U8 => BoneIndexArray::U8(reader.read_array(address, count)?),
			IndexWidth::U16 => BoneIndexArray::U16(reader.read_array(address, count)?),
			IndexWidth::U32 => BoneIndexArray::U32(reader.read_array(address, count)?),
		})
	}

	/// Flattens into a uniform `u32` representation; the narrow width
	/// only matters at read time.
	pub fn widen(self) -> Vec<u32> {
		match self {
			BoneIndexArray::U8(vals) => vals.into_iter().map(|v| v as u32).collect(),
			BoneIndexArray::U16(vals) => vals.into_iter().map(|v| v as u32).collect(),
			BoneIndexArray::U32(vals) => vals,
		}
	}

	pub fn len(&self) -> usize {
		match self {
			BoneIndexArray::U8(vals) => vals.len(),
			BoneIndexArray::U16(vals) => vals.len(),
			BoneIndexArray::U32(vals) => vals.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Resolves the model's skeleton into `scene`.
///
/// Bones resolve once per model: LODs share one skeleton, so a scene
/// that already has one is left untouched. A model with no bones still
/// gets a single empty skeleton entry.
pub fn resolve_bones(
	reader: &dyn MemoryReader,
	names: &dyn NameResolver,
	model: &ModelAsset,
	scene: &mut ModelScene,
) -> Result<(), DecodeError> {
	if !scene.skeletons.is_empty() {
		return Ok(());
	}

	if model.bone_count == 0 {
		scene.skeletons.push(Skeleton::default());
		return Ok(());
	}

	let child_count = model
		.bone_count
		.checked_sub(model.root_bone_count)
		.ok_or(DecodeError::BoneCounts {
			bone_count: model.bone_count,
			root_count: model.root_bone_count,
		})? as usize;
	let bone_count = model.bone_count as usize;
	let root_count = model.root_bone_count as usize;

	let hashes =
		BoneIndexArray::read(reader, model.bone_ids_ptr, bone_count, model.bone_index_width)?
			.widen();
	let parents = BoneIndexArray::read(
		reader,
		model.bone_parents_ptr,
		child_count,
		model.bone_parent_width,
	)?
	.widen();
	let transforms: Vec<BoneTransform> =
		reader.read_array(model.base_transform_ptr, bone_count)?;

	let mut bones: Vec<Bone> = Vec::with_capacity(bone_count);

	for (index, transform) in transforms.iter().enumerate() {
		let name = names.resolve(hashes[index] as u64, "bone");
		let world_position = transform.translation;
		let world_rotation = vec4_to_rot3(transform.rotation);

		let parent = if index < root_count {
			None
		} else {
			// The stored value is an offset back from this bone, not
			// an absolute index.
			let stored = parents[index - root_count];
			match (index as u32).checked_sub(stored) {
				Some(parent) if stored > 0 => Some(parent as usize),
				_ => {
					return Err(DecodeError::BoneParent {
						index: index,
						stored: stored,
					})
				}
			}
		};

		let (local_position, local_rotation) = match parent {
			Some(parent_index) => {
				let parent_bone = &bones[parent_index];
				let inverse = parent_bone.world_rotation.reversed();

				(
					inverse * (world_position - parent_bone.world_position),
					inverse * world_rotation,
				)
			}
			None => (world_position, world_rotation),
		};

		bones.push(Bone {
			name: name,
			parent: parent,
			world_position: world_position,
			world_rotation: world_rotation,
			local_position: local_position,
			local_rotation: local_rotation,
		});
	}

	scene.skeletons.push(Skeleton {
		bones: bones,
	});
	Ok(())
}

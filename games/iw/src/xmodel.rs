//! Model decoding.
//!
//! Two stages mirror how the engine stores models. `read_model` walks
//! the header graph into a [`ModelAsset`] descriptor whose geometry is
//! still byte offsets into an unfetched payload; `translate_model`
//! materializes one LOD of that descriptor into a [`ModelScene`],
//! fetching the streamed payload and resolving bones along the way.

use ultraviolet::vec::Vec3;

use rrk_core::memory::{
	DataSource,
	LocalRegion,
	MemoryDecode,
	ReadMemoryExt
};
use rrk_core::name::sanitize_name;
use rrk_core::scene::{
	IndexWidth,
	MaterialTable,
	Mesh,
	ModelAsset,
	ModelLod,
	ModelScene,
	Submesh,
	VertexWeights
};

use crate::geometry::{
	unpack_face_indices,
	unpack_local_position,
	unpack_qtangent,
	unpack_uv_half
};
use crate::structures::{
	BoneInfo,
	XModel,
	XModelLod,
	XSurface
};
use crate::{
	bones,
	stream,
	xmaterial,
	AssetContext,
	DecodeError
};

/// Sentinel in the surface's override-scale field meaning no explicit
/// scale applies and the min/max/scale triple does.
const SCALE_FROM_EXTENTS: f32 = -1.0;

/// Reads a model header graph into a normalized descriptor.
///
/// An embedded name wins over the resolver. Geometry stays as offsets
/// into the LOD's streamed payload; each submesh's material decodes
/// eagerly so the descriptor is self-contained.
pub fn read_model(ctx: &AssetContext<'_>, handle: u64) -> Result<ModelAsset, DecodeError> {
	let header: XModel = ctx.reader.read_struct(handle)?;

	let mut model = ModelAsset::default();
	model.name = if header.name_ptr != 0 {
		sanitize_name(&ctx.reader.read_string(header.name_ptr)?)
	} else {
		ctx.names.resolve(header.hash, "xmodel")
	};
	model.streamed = true;

	// The engine fixes these widths; the variant mechanism still
	// dispatches on them at read time.
	model.bone_index_width = IndexWidth::U32;
	model.bone_parent_width = IndexWidth::U16;

	if header.bone_info_ptr != 0 {
		let info: BoneInfo = ctx.reader.read_struct(header.bone_info_ptr)?;

		if info.bone_parents_ptr != 0 {
			model.bone_count = info.num_bones + info.cosmetic_bone_count;
			model.root_bone_count = info.num_root_bones;
			model.cosmetic_bone_count = info.cosmetic_bone_count;
		}
		if model.bone_count < model.root_bone_count {
			return Err(DecodeError::BoneCounts {
				bone_count: model.bone_count,
				root_count: model.root_bone_count,
			});
		}

		model.bone_ids_ptr = info.bone_ids_ptr;
		model.bone_parents_ptr = info.bone_parents_ptr;
		model.rotations_ptr = info.rotations_ptr;
		model.translations_ptr = info.translations_ptr;
		model.base_transform_ptr = info.base_transforms_ptr;
	}

	for lod_index in 0..header.num_lods as u64 {
		let lod_info: XModelLod = ctx
			.reader
			.read_struct(header.lod_info_ptr + lod_index * XModelLod::SIZE as u64)?;

		let mut lod = ModelLod {
			distance: lod_info.lod_distance,
			stream_info_ptr: lod_info.mesh_ptr,
			submeshes: Vec::with_capacity(lod_info.num_surfs as usize),
			materials: Vec::with_capacity(lod_info.num_surfs as usize),
		};

		for surface_index in 0..lod_info.num_surfs as u64 {
			let surface: XSurface = ctx
				.reader
				.read_struct(lod_info.surfs_ptr + surface_index * XSurface::SIZE as u64)?;

			let material_handle: u64 = ctx
				.reader
				.read_struct(header.material_handles_ptr + surface_index * 8)?;
			let material = xmaterial::read_material(ctx, material_handle)?;

			lod.submeshes.push(submesh_from_surface(&surface, material.hash));
			lod.materials.push(material);
		}

		model.lods.push(lod);
	}

	Ok(model)
}

fn submesh_from_surface(surface: &XSurface, material_hash: u64) -> Submesh {
	let (scale, offset) = if surface.override_scale != SCALE_FROM_EXTENTS {
		(surface.override_scale, Vec3::zero())
	} else {
		(
			surface.min.max(surface.max).max(surface.scale),
			Vec3::new(surface.offsets_x, surface.offsets_y, surface.offsets_z),
		)
	};

	Submesh {
		vertex_count: surface.vert_count,
		face_count: surface.tri_count,
		packed_index_table_count: surface.packed_indices_table_count,
		vertex_offset: surface.xyz_offset,
		uv_offset: surface.tex_coord_offset,
		tangent_offset: surface.tangent_frame_offset,
		face_offset: surface.index_data_offset,
		packed_index_table_offset: surface.packed_indices_table_offset,
		packed_index_buffer_offset: surface.packed_indices_offset,
		color_offset: if surface.vertex_color_offset != u32::MAX {
			Some(surface.vertex_color_offset as u64)
		} else {
			None
		},
		weights_offset: surface.weights_offset,
		weight_counts: surface.weight_counts,
		scale: scale,
		offset: offset,
		material_hash: material_hash,
		material_index: None,
	}
}

/// Materializes LOD `lod_index` of `model` into a scene.
///
/// Submesh material references resolve against `materials`; a hash the
/// table does not know leaves the submesh unassigned rather than
/// failing the model. A model whose payload no source can serve yet
/// still returns its skeleton.
pub fn translate_model(
	ctx: &AssetContext<'_>,
	model: &mut ModelAsset,
	lod_index: usize,
	materials: &MaterialTable,
) -> Result<ModelScene, DecodeError> {
	if lod_index >= model.lods.len() {
		return Err(DecodeError::LodIndex {
			index: lod_index,
			count: model.lods.len(),
		});
	}

	let mut scene = ModelScene {
		name: model.name.clone(),
		meshes: Vec::new(),
		skeletons: Vec::new(),
	};

	let lod = &mut model.lods[lod_index];
	for index in 0..lod.submeshes.len() {
		let hash = match lod.materials.get(index) {
			Some(material) => material.hash,
			None => {
				tracing::warn!(
					"model {}: submesh {} has no aligned material entry",
					scene.name,
					index
				);
				continue;
			}
		};

		let submesh = &mut lod.submeshes[index];
		submesh.material_hash = hash;
		submesh.material_index = materials.index_of(hash);
		if submesh.material_index.is_none() {
			tracing::warn!(
				"model {}: material {:#x} is not in the scene table",
				scene.name,
				hash
			);
		}
	}

	if model.streamed {
		load_streamed_geometry(ctx, model, lod_index, &mut scene)?;
	}

	Ok(scene)
}

fn load_streamed_geometry(
	ctx: &AssetContext<'_>,
	model: &ModelAsset,
	lod_index: usize,
	scene: &mut ModelScene,
) -> Result<(), DecodeError> {
	let lod = &model.lods[lod_index];
	let payload = stream::extract_mesh_payload(ctx.reader, ctx.store, lod)?;

	bones::resolve_bones(ctx.reader, ctx.names, model, scene)?;

	if payload.is_empty() {
		tracing::debug!(
			"model {}: no source can serve the LOD {} payload yet",
			scene.name,
			lod_index
		);
		return Ok(());
	}

	let has_bones = scene.skeletons.iter().any(|skeleton| !skeleton.bones.is_empty());

	for (index, submesh) in lod.submeshes.iter().enumerate() {
		let name = format!("{}_mesh_{}", scene.name, index);
		scene
			.meshes
			.push(decode_submesh(&payload, submesh, has_bones, name)?);
	}

	Ok(())
}

fn decode_submesh(
	payload: &[u8],
	submesh: &Submesh,
	decode_weights: bool,
	name: String,
) -> Result<Mesh, DecodeError> {
	let mut mesh = Mesh::default();
	mesh.name = name;
	mesh.material_hash = submesh.material_hash;
	mesh.material_index = submesh.material_index;

	let positions = LocalRegion::new(payload, submesh.vertex_offset);
	let tangents = LocalRegion::new(payload, submesh.tangent_offset);
	let uvs = LocalRegion::new(payload, submesh.uv_offset);

	for vertex in 0..submesh.vertex_count as u64 {
		let packed = positions.read_u64_at(vertex * 8)?;
		mesh.positions
			.push(unpack_local_position(packed, submesh.scale, submesh.offset));

		let (tangent, normal) = unpack_qtangent(tangents.read_u32_at(vertex * 4)?);
		mesh.tangents.push(tangent);
		mesh.normals.push(normal);

		mesh.uvs.push(unpack_uv_half(uvs.read_u32_at(vertex * 4)?));
	}

	if let Some(color_offset) = submesh.color_offset {
		let colors = LocalRegion::new(payload, color_offset);
		for vertex in 0..submesh.vertex_count as u64 {
			mesh.colors.push(colors.read_u32_at(vertex * 4)?);
		}
	}

	if decode_weights {
		mesh.weights = decode_vertex_weights(payload, submesh)?;
	}

	decode_faces(payload, submesh, &mut mesh);

	Ok(mesh)
}

/// Weight records are bucketed by influence count: bucket `i` holds
/// `weight_counts[i]` consecutive vertices with `i + 1` influences,
/// stored slot-major as (bone, raw weight) u16 pairs. Slot 0's stored
/// weight is unused; it carries whatever the other slots leave over.
fn decode_vertex_weights(
	payload: &[u8],
	submesh: &Submesh,
) -> Result<Vec<VertexWeights>, DecodeError> {
	let mut weights = vec![VertexWeights::default(); submesh.vertex_count as usize];
	let source = LocalRegion::new(payload, submesh.weights_offset);

	let mut cursor = 0u64;
	let mut bucket_base = 0usize;

	for bucket in 0..8usize {
		let influences = bucket + 1;
		let count = submesh.weight_counts[bucket] as usize;

		for slot in 0..influences {
			for vertex in bucket_base..bucket_base + count {
				let entry = &mut weights[vertex];
				entry.count = influences as u32;

				entry.bones[slot] = source.read_u16_at(cursor)?;
				cursor += 2;

				if slot > 0 {
					let value = source.read_u16_at(cursor)? as f32 / 65536.0;
					entry.values[slot] = value;
					entry.values[0] -= value;
				} else {
					entry.values[0] = 1.0;
				}
				cursor += 2;
			}
		}

		bucket_base += count;
	}

	Ok(weights)
}

/// A face decode failure discards the whole list; a model with valid
/// vertices and bones is still usable without triangles.
fn decode_faces(payload: &[u8], submesh: &Submesh, mesh: &mut Mesh) {
	let tables = LocalRegion::new(payload, submesh.packed_index_table_offset);
	let packed = LocalRegion::new(payload, submesh.packed_index_buffer_offset);
	let plain = LocalRegion::new(payload, submesh.face_offset);

	mesh.faces.reserve(submesh.face_count as usize * 3);

	for triangle in 0..submesh.face_count {
		match unpack_face_indices(
			&tables,
			submesh.packed_index_table_count,
			&packed,
			&plain,
			triangle,
		) {
			Ok(indices) => {
				// Stored winding is reversed relative to the output
				// convention.
				mesh.faces.push(indices[2]);
				mesh.faces.push(indices[1]);
				mesh.faces.push(indices[0]);
			}
			Err(error) => {
				tracing::warn!(
					"{}: triangle {} failed to unpack ({}); dropping the face list",
					mesh.name,
					triangle,
					error
				);
				mesh.faces.clear();
				break;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use rrk_core::memory::SnapshotReader;
	use rrk_core::name::PlaceholderResolver;
	use rrk_core::scene::MaterialAsset;
	use rrk_core::store::NullStore;

	use crate::geometry::RUN_WIDTH_PLAIN;
	use crate::GameFlavor;

	use super::*;

	const MODEL_PTR: u64 = 0x1000;
	const NAME_PTR: u64 = 0x1100;
	const BONE_INFO_PTR: u64 = 0x1200;
	const LOD_INFO_PTR: u64 = 0x1300;
	const SURFS_PTR: u64 = 0x1400;
	const MATERIAL_HANDLES_PTR: u64 = 0x1600;
	const MATERIAL_PTR: u64 = 0x1700;
	const STREAM_INFO_PTR: u64 = 0x1800;
	const SHARED_PTR: u64 = 0x1900;
	const PAYLOAD_PTR: u64 = 0x2000;
	const BONE_IDS_PTR: u64 = 0x3000;
	const BONE_TRANSFORMS_PTR: u64 = 0x3100;

	const MATERIAL_HASH: u64 = 0xAB;

	fn context(snap: &SnapshotReader) -> AssetContext<'_> {
		AssetContext {
			reader: snap,
			names: &PlaceholderResolver,
			store: &NullStore,
			flavor: GameFlavor::Multiplayer,
		}
	}

	fn map_model_header(snap: &mut SnapshotReader, name_ptr: u64, num_lods: u32) {
		let mut raw = Vec::new();
		raw.extend_from_slice(&0x77u64.to_le_bytes());
		raw.extend_from_slice(&name_ptr.to_le_bytes());
		raw.extend_from_slice(&BONE_INFO_PTR.to_le_bytes());
		raw.extend_from_slice(&LOD_INFO_PTR.to_le_bytes());
		raw.extend_from_slice(&MATERIAL_HANDLES_PTR.to_le_bytes());
		raw.extend_from_slice(&num_lods.to_le_bytes());
		raw.resize(XModel::SIZE, 0);
		snap.map(MODEL_PTR, raw);
	}

	fn map_bone_info(snap: &mut SnapshotReader, num_bones: u32, num_roots: u32, cosmetic: u32) {
		let mut raw = Vec::new();
		raw.extend_from_slice(&BONE_IDS_PTR.to_le_bytes());
		raw.extend_from_slice(&0x3200u64.to_le_bytes()); // parents
		raw.extend_from_slice(&0x3300u64.to_le_bytes()); // rotations
		raw.extend_from_slice(&0x3400u64.to_le_bytes()); // translations
		raw.extend_from_slice(&BONE_TRANSFORMS_PTR.to_le_bytes());
		raw.extend_from_slice(&num_bones.to_le_bytes());
		raw.extend_from_slice(&num_roots.to_le_bytes());
		raw.extend_from_slice(&cosmetic.to_le_bytes());
		raw.resize(BoneInfo::SIZE, 0);
		snap.map(BONE_INFO_PTR, raw);
	}

	fn map_empty_material(snap: &mut SnapshotReader) {
		let mut handles = Vec::new();
		handles.extend_from_slice(&MATERIAL_PTR.to_le_bytes());
		handles.extend_from_slice(&MATERIAL_PTR.to_le_bytes());
		snap.map(MATERIAL_HANDLES_PTR, handles);

		let mut raw = Vec::new();
		raw.extend_from_slice(&MATERIAL_HASH.to_le_bytes());
		raw.resize(crate::structures::Material::SIZE, 0);
		snap.map(MATERIAL_PTR, raw);
	}

	fn surface_bytes(surface: &XSurface) -> Vec<u8> {
		let mut raw = Vec::new();
		raw.extend_from_slice(&surface.vert_count.to_le_bytes());
		raw.extend_from_slice(&surface.tri_count.to_le_bytes());
		raw.extend_from_slice(&surface.packed_indices_table_count.to_le_bytes());
		raw.extend_from_slice(&surface.vertex_color_offset.to_le_bytes());
		raw.extend_from_slice(&surface.xyz_offset.to_le_bytes());
		raw.extend_from_slice(&surface.tex_coord_offset.to_le_bytes());
		raw.extend_from_slice(&surface.tangent_frame_offset.to_le_bytes());
		raw.extend_from_slice(&surface.index_data_offset.to_le_bytes());
		raw.extend_from_slice(&surface.packed_indices_table_offset.to_le_bytes());
		raw.extend_from_slice(&surface.packed_indices_offset.to_le_bytes());
		raw.extend_from_slice(&surface.weights_offset.to_le_bytes());
		for count in surface.weight_counts {
			raw.extend_from_slice(&count.to_le_bytes());
		}
		for field in [
			surface.override_scale,
			surface.min,
			surface.max,
			surface.scale,
			surface.offsets_x,
			surface.offsets_y,
			surface.offsets_z,
		] {
			raw.extend_from_slice(&field.to_le_bytes());
		}
		raw.resize(XSurface::SIZE, 0);
		raw
	}

	fn map_lod_table(snap: &mut SnapshotReader, num_surfs: u32) {
		let mut raw = Vec::new();
		raw.extend_from_slice(&STREAM_INFO_PTR.to_le_bytes());
		raw.extend_from_slice(&SURFS_PTR.to_le_bytes());
		raw.extend_from_slice(&10.0f32.to_le_bytes());
		raw.extend_from_slice(&num_surfs.to_le_bytes());
		raw.resize(XModelLod::SIZE, 0);
		snap.map(LOD_INFO_PTR, raw);
	}

	fn map_stream_info(snap: &mut SnapshotReader, data_ptr: u64, data_size: u32) {
		let mut surfs = Vec::new();
		surfs.extend_from_slice(&0x55u64.to_le_bytes());
		surfs.extend_from_slice(&SHARED_PTR.to_le_bytes());
		surfs.extend_from_slice(&0xfeedu64.to_le_bytes());
		snap.map(STREAM_INFO_PTR, surfs);

		let mut shared = Vec::new();
		shared.extend_from_slice(&data_ptr.to_le_bytes());
		shared.extend_from_slice(&data_size.to_le_bytes());
		shared.extend_from_slice(&0u32.to_le_bytes());
		snap.map(SHARED_PTR, shared);
	}

	#[test]
	fn test_read_model_descriptor() {
		let mut snap = SnapshotReader::new();
		snap.map(NAME_PTR, b"props/crates\\wooden_box.xmodel\x00".to_vec());
		map_model_header(&mut snap, NAME_PTR, 1);
		map_bone_info(&mut snap, 3, 1, 2);
		map_lod_table(&mut snap, 2);
		map_empty_material(&mut snap);

		let override_surface = XSurface {
			vert_count: 10,
			tri_count: 4,
			override_scale: 2.0,
			min: 0.1,
			max: 0.2,
			scale: 0.3,
			offsets_x: 5.0,
			vertex_color_offset: u32::MAX,
			..XSurface::default()
		};
		let extents_surface = XSurface {
			vert_count: 20,
			tri_count: 8,
			override_scale: -1.0,
			min: 0.5,
			max: 2.5,
			scale: 1.5,
			offsets_x: 7.0,
			offsets_y: 8.0,
			offsets_z: 9.0,
			vertex_color_offset: 0x40,
			..XSurface::default()
		};
		let mut surfaces = surface_bytes(&override_surface);
		surfaces.extend_from_slice(&surface_bytes(&extents_surface));
		snap.map(SURFS_PTR, surfaces);

		let ctx = context(&snap);
		let model = read_model(&ctx, MODEL_PTR).unwrap();

		assert_eq!(model.name, "wooden_box");
		assert_eq!(model.bone_count, 5);
		assert_eq!(model.root_bone_count, 1);
		assert_eq!(model.cosmetic_bone_count, 2);
		assert_eq!(model.bone_index_width, IndexWidth::U32);
		assert_eq!(model.bone_parent_width, IndexWidth::U16);
		assert_eq!(model.lods.len(), 1);

		let lod = &model.lods[0];
		assert_eq!(lod.distance, 10.0);
		assert_eq!(lod.submeshes.len(), 2);
		assert_eq!(lod.materials.len(), 2);
		assert_eq!(lod.materials[0].hash, MATERIAL_HASH);

		// Explicit override scale zeroes the axis offsets.
		assert_eq!(lod.submeshes[0].scale, 2.0);
		assert_eq!(lod.submeshes[0].offset, Vec3::zero());
		assert_eq!(lod.submeshes[0].color_offset, None);
		assert_eq!(lod.submeshes[0].material_hash, MATERIAL_HASH);

		// Sentinel derives the scale from the extents triple.
		assert_eq!(lod.submeshes[1].scale, 2.5);
		assert_eq!(lod.submeshes[1].offset, Vec3::new(7.0, 8.0, 9.0));
		assert_eq!(lod.submeshes[1].color_offset, Some(0x40));
	}

	#[test]
	fn test_resolver_names_model_without_embedded_name() {
		let mut snap = SnapshotReader::new();
		map_model_header(&mut snap, 0, 0);
		map_bone_info(&mut snap, 0, 0, 0);

		let ctx = context(&snap);
		let model = read_model(&ctx, MODEL_PTR).unwrap();
		assert_eq!(model.name, "xmodel_77");
	}

	#[test]
	fn test_translate_bad_lod_index() {
		let snap = SnapshotReader::new();
		let ctx = context(&snap);
		let mut model = ModelAsset::default();

		let err = translate_model(&ctx, &mut model, 1, &MaterialTable::new()).unwrap_err();
		assert!(matches!(err, DecodeError::LodIndex { index: 1, count: 0 }));
	}

	#[test]
	fn test_unavailable_payload_still_yields_bones() {
		let mut snap = SnapshotReader::new();
		map_stream_info(&mut snap, 0, 64);

		let mut model = ModelAsset {
			name: "partial".to_string(),
			streamed: true,
			..ModelAsset::default()
		};
		model.lods.push(ModelLod {
			stream_info_ptr: STREAM_INFO_PTR,
			..ModelLod::default()
		});

		let ctx = context(&snap);
		let scene = translate_model(&ctx, &mut model, 0, &MaterialTable::new()).unwrap();

		assert_eq!(scene.skeletons.len(), 1);
		assert!(scene.meshes.is_empty());
	}

	/// Payload with 3 vertices and one plain-width triangle run.
	fn build_geometry_payload() -> (Vec<u8>, Submesh) {
		let mut submesh = Submesh::default();
		submesh.vertex_count = 3;
		submesh.face_count = 1;
		submesh.packed_index_table_count = 1;
		submesh.scale = 1.0;
		submesh.weight_counts[0] = 3;

		let mut payload = Vec::new();

		submesh.vertex_offset = payload.len() as u64;
		for fields in [[0u64, 0, 0], [0x1FFFFF, 0x1FFFFF, 0x1FFFFF], [0x100000, 0, 0x1FFFFF]] {
			let packed = fields[0] | (fields[1] << 21) | (fields[2] << 42);
			payload.extend_from_slice(&packed.to_le_bytes());
		}

		submesh.tangent_offset = payload.len() as u64;
		let frame: u32 = (3 << 30) | (256 << 20) | (512 << 10) | 512;
		for _ in 0..3 {
			payload.extend_from_slice(&frame.to_le_bytes());
		}

		submesh.uv_offset = payload.len() as u64;
		for _ in 0..3 {
			payload.extend_from_slice(&0x3800_3C00u32.to_le_bytes());
		}

		// Bucket 0: three single-influence vertices, bones 5, 6, 7.
		submesh.weights_offset = payload.len() as u64;
		for bone in [5u16, 6, 7] {
			payload.extend_from_slice(&bone.to_le_bytes());
			payload.extend_from_slice(&0u16.to_le_bytes());
		}

		submesh.packed_index_table_offset = payload.len() as u64;
		payload.extend_from_slice(&0u32.to_le_bytes()); // first triangle
		payload.extend_from_slice(&1u32.to_le_bytes()); // count
		payload.extend_from_slice(&0u32.to_le_bytes()); // data offset
		payload.extend_from_slice(&0u32.to_le_bytes()); // base vertex
		payload.push(RUN_WIDTH_PLAIN);
		payload.resize(payload.len() + 23, 0);

		submesh.face_offset = payload.len() as u64;
		for index in [0u16, 0, 1] {
			payload.extend_from_slice(&index.to_le_bytes());
		}

		submesh.packed_index_buffer_offset = payload.len() as u64;

		(payload, submesh)
	}

	#[test]
	fn test_streamed_geometry_decode() {
		let (payload, submesh) = build_geometry_payload();

		let mut snap = SnapshotReader::new();
		map_stream_info(&mut snap, PAYLOAD_PTR, payload.len() as u32);
		snap.map(PAYLOAD_PTR, payload);

		// One root bone so weights decode.
		snap.map(BONE_IDS_PTR, 42u32.to_le_bytes().to_vec());
		let mut transform = Vec::new();
		for c in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0] {
			transform.extend_from_slice(&c.to_le_bytes());
		}
		snap.map(BONE_TRANSFORMS_PTR, transform);

		let mut model = ModelAsset {
			name: "crate".to_string(),
			streamed: true,
			bone_count: 1,
			root_bone_count: 1,
			bone_ids_ptr: BONE_IDS_PTR,
			bone_index_width: IndexWidth::U32,
			bone_parent_width: IndexWidth::U16,
			base_transform_ptr: BONE_TRANSFORMS_PTR,
			..ModelAsset::default()
		};
		model.lods.push(ModelLod {
			stream_info_ptr: STREAM_INFO_PTR,
			submeshes: vec![submesh],
			materials: vec![MaterialAsset {
				hash: MATERIAL_HASH,
				..MaterialAsset::default()
			}],
			..ModelLod::default()
		});

		let mut table = MaterialTable::new();
		table.insert(MaterialAsset {
			hash: MATERIAL_HASH,
			..MaterialAsset::default()
		});

		let ctx = context(&snap);
		let scene = translate_model(&ctx, &mut model, 0, &table).unwrap();

		assert_eq!(scene.meshes.len(), 1);
		let mesh = &scene.meshes[0];
		assert_eq!(mesh.name, "crate_mesh_0");
		assert_eq!(mesh.material_index, Some(0));

		// Field 0 maps to -1, the max field to +1.
		assert!((mesh.positions[0] - Vec3::new(-1.0, -1.0, -1.0)).mag() < 1e-5);
		assert!((mesh.positions[1] - Vec3::new(1.0, 1.0, 1.0)).mag() < 1e-5);
		assert!(mesh.positions[2].x.abs() < 1e-5);

		assert!((mesh.tangents[0] - Vec3::new(1.0, 0.0, 0.0)).mag() < 1e-2);
		assert!((mesh.normals[0] - Vec3::new(0.0, 0.0, 1.0)).mag() < 1e-2);

		assert_eq!(mesh.uvs[1].x, 1.0);
		assert_eq!(mesh.uvs[1].y, 0.5);

		assert_eq!(mesh.weights[0].count, 1);
		assert_eq!(mesh.weights[0].bones[0], 5);
		assert_eq!(mesh.weights[0].values[0], 1.0);
		assert_eq!(mesh.weights[2].bones[0], 7);

		// Winding comes out reversed.
		assert_eq!(mesh.faces, vec![1, 0, 0]);
		assert!(mesh.colors.is_empty());
	}

	#[test]
	fn test_face_decode_failure_keeps_vertices() {
		let (payload, mut submesh) = build_geometry_payload();
		// Declare one more triangle than the run table covers.
		submesh.face_count = 2;

		let mesh = decode_submesh(&payload, &submesh, false, "broken".to_string()).unwrap();

		assert_eq!(mesh.positions.len(), 3);
		assert!(mesh.faces.is_empty());
	}

	#[test]
	fn test_multi_influence_weight_buckets() {
		// One vertex in bucket 0 (1 influence) and one in bucket 1
		// (2 influences), slot-major layout.
		let mut submesh = Submesh::default();
		submesh.vertex_count = 2;
		submesh.weight_counts[0] = 1;
		submesh.weight_counts[1] = 1;

		let mut payload = Vec::new();
		// Bucket 0, slot 0: vertex 0.
		payload.extend_from_slice(&3u16.to_le_bytes());
		payload.extend_from_slice(&0u16.to_le_bytes());
		// Bucket 1, slot 0: vertex 1.
		payload.extend_from_slice(&4u16.to_le_bytes());
		payload.extend_from_slice(&0u16.to_le_bytes());
		// Bucket 1, slot 1: vertex 1, bone 9 at quarter weight.
		payload.extend_from_slice(&9u16.to_le_bytes());
		payload.extend_from_slice(&16384u16.to_le_bytes());

		let weights = decode_vertex_weights(&payload, &submesh).unwrap();

		assert_eq!(weights[0].count, 1);
		assert_eq!(weights[0].bones[0], 3);
		assert_eq!(weights[0].values[0], 1.0);

		assert_eq!(weights[1].count, 2);
		assert_eq!(weights[1].bones[0], 4);
		assert_eq!(weights[1].bones[1], 9);
		assert!((weights[1].values[1] - 0.25).abs() < 1e-6);
		assert!((weights[1].values[0] - 0.75).abs() < 1e-6);
	}
}

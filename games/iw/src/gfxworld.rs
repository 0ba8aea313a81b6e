//! Map decoding and scene assembly.
//!
//! A world asset spreads its geometry across streamed transient
//! zones. Surfaces resolve their vertex and index streams relative to
//! their zone's base buffers; static model placements are quantized
//! per instance. Everything folds into one [`MapScene`] with a
//! deduplicated material table.

use half::f16;

use ultraviolet::{
	rotor::Rotor3,
	vec::{
		Vec2,
		Vec3
	}
};

use rrk_core::memory::{
	ForeignRegion,
	MemoryDecode,
	ReadMemoryExt
};
use rrk_core::name::sanitize_name;
use rrk_core::scene::{
	MapScene,
	Mesh,
	PlacedInstance,
	Placement
};

use crate::geometry::{
	unpack_face_indices,
	unpack_qtangent,
	unpack_world_position,
	FACE_RUN_SIZE
};
use crate::structures::{
	GfxSModelInstanceData,
	GfxStaticModel,
	GfxStaticModelCollection,
	GfxSurface,
	GfxUgbSurfData,
	GfxWorld,
	GfxWorldStaticModels,
	GfxWorldSurfaces,
	GfxWorldTransientZone,
	XModel
};
use crate::{
	xmaterial,
	AssetContext,
	DecodeError
};

/// Instance translations are fixed point in 1/4096 units.
const TRANSLATION_SCALE: f32 = 1.0 / 4096.0;

/// Bias scale of the quantized instance orientation components.
const ORIENTATION_SCALE: f32 = 0.000030518044;

/// Decodes a world asset into a map scene.
///
/// A surface or instance that cannot be resolved is skipped; only a
/// failure to read the world header or a zone table entry aborts the
/// map as a whole.
pub fn read_map(
	ctx: &AssetContext<'_>,
	handle: u64,
	asset_name: &str,
) -> Result<MapScene, DecodeError> {
	let world: GfxWorld = ctx.reader.read_struct(handle)?;

	let mut scene = MapScene::default();
	scene.name = sanitize_name(asset_name);

	// Zones are random-accessed by index below, so they all load up
	// front.
	let mut zones = Vec::with_capacity(world.transient_zones.len());
	for zone_ptr in &world.transient_zones {
		let zone: GfxWorldTransientZone = ctx.reader.read_struct(*zone_ptr)?;
		zones.push(zone);
	}

	read_surfaces(ctx, &world.surfaces, &zones, &mut scene);
	read_static_models(ctx, &world.smodels, &zones, &mut scene);

	Ok(scene)
}

fn read_surfaces(
	ctx: &AssetContext<'_>,
	surfaces: &GfxWorldSurfaces,
	zones: &[GfxWorldTransientZone],
	scene: &mut MapScene,
) {
	for surface_index in 0..surfaces.count as u64 {
		let surface: GfxSurface = match ctx
			.reader
			.read_struct(surfaces.surfaces_ptr + surface_index * GfxSurface::SIZE as u64)
		{
			Ok(surface) => surface,
			Err(_) => continue,
		};

		let surf_data: GfxUgbSurfData = match ctx.reader.read_struct(
			surfaces.ugb_surf_data_ptr
				+ surface.ugb_surf_data_index as u64 * GfxUgbSurfData::SIZE as u64,
		) {
			Ok(data) => data,
			Err(_) => continue,
		};

		let zone = match zones.get(surf_data.transient_zone_index as usize) {
			Some(zone) if zone.hash != 0 => zone,
			_ => continue,
		};
		if surface.vertex_count == 0 || surface.tri_count == 0 {
			continue;
		}

		let material_ptr: u64 = match ctx
			.reader
			.read_struct(surfaces.materials_ptr + surface.material_index as u64 * 8)
		{
			Ok(pointer) => pointer,
			Err(_) => continue,
		};
		let material = match xmaterial::read_material(ctx, material_ptr) {
			Ok(material) => material,
			Err(error) => {
				tracing::warn!(
					"map {}: material at {:#x} failed to decode ({})",
					scene.name,
					material_ptr,
					error
				);
				continue;
			}
		};
		let material_hash = material.hash;
		let material_index = scene.materials.insert(material);

		let name = format!("{}_chunk_{}", scene.name, surface_index);
		if let Some(mut mesh) = decode_surface(ctx, &surface, &surf_data, zone, name) {
			mesh.material_hash = material_hash;
			mesh.material_index = Some(material_index);
			scene.meshes.push(mesh);
		}
	}
}

/// Decodes one surface's vertex and index streams.
///
/// `None` drops the chunk: either a vertex stream read failed or the
/// decoded face list does not account for every declared triangle.
fn decode_surface(
	ctx: &AssetContext<'_>,
	surface: &GfxSurface,
	surf_data: &GfxUgbSurfData,
	zone: &GfxWorldTransientZone,
	name: String,
) -> Option<Mesh> {
	let mut mesh = Mesh::default();
	mesh.name = name;

	let draw = surf_data.world_draw_offset;
	let offset = Vec3::new(draw.x, draw.y, draw.z);

	let xyz_base = zone.draw_verts.pos_data + surf_data.xyz_offset as u64;
	let tangent_base = zone.draw_verts.pos_data + surf_data.tangent_frame_offset as u64;
	let uv_base = zone.draw_verts.pos_data + surf_data.tex_coord_offset as u64;

	// UV layers are stored interleaved ahead of the vertex stream;
	// only the last layer carries the texture channel.
	let layer_skip = surf_data.layer_count.max(1) as u64 - 1;

	for vertex in 0..surface.vertex_count as u64 {
		let packed: u64 = match ctx.reader.read_struct(xyz_base + vertex * 8) {
			Ok(packed) => packed,
			Err(_) => {
				tracing::warn!("{}: vertex stream ended at {}", mesh.name, vertex);
				return None;
			}
		};
		mesh.positions
			.push(unpack_world_position(packed, draw.scale, offset));

		let frame: u32 = match ctx.reader.read_struct(tangent_base + vertex * 4) {
			Ok(frame) => frame,
			Err(_) => return None,
		};
		let (tangent, normal) = unpack_qtangent(frame);
		mesh.tangents.push(tangent);
		mesh.normals.push(normal);

		let uv_address = uv_base + 8 * (vertex + layer_skip);
		let u: f32 = match ctx.reader.read_struct(uv_address) {
			Ok(value) => value,
			Err(_) => return None,
		};
		let v: f32 = match ctx.reader.read_struct(uv_address + 4) {
			Ok(value) => value,
			Err(_) => return None,
		};
		mesh.uvs.push(Vec2::new(u, v));
	}
	// The vertex color stream's packing is unverified; it stays
	// undecoded even when the surface carries an offset for it.

	let tables = ForeignRegion::new(
		ctx.reader,
		zone.draw_verts.table_data + surface.table_index as u64 * FACE_RUN_SIZE,
	);
	let plain = ForeignRegion::new(
		ctx.reader,
		zone.draw_verts.indices + surface.base_index as u64 * 2,
	);
	let packed = ForeignRegion::new(
		ctx.reader,
		zone.draw_verts.packed_indices + surface.packed_indices_offset as u64,
	);

	mesh.faces.reserve(surface.tri_count as usize * 3);
	for triangle in 0..surface.tri_count {
		match unpack_face_indices(
			&tables,
			surface.packed_indices_table_count,
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
					"{}: triangle {} failed to unpack ({})",
					mesh.name,
					triangle,
					error
				);
				mesh.faces.clear();
				break;
			}
		}
	}

	// A chunk that cannot account for every declared triangle is
	// dropped whole.
	if mesh.faces.len() != surface.tri_count as usize * 3 {
		return None;
	}

	Some(mesh)
}

fn read_static_models(
	ctx: &AssetContext<'_>,
	smodels: &GfxWorldStaticModels,
	zones: &[GfxWorldTransientZone],
	scene: &mut MapScene,
) {
	for collection_index in 0..smodels.collections_count as u64 {
		let collection: GfxStaticModelCollection = match ctx.reader.read_struct(
			smodels.collections_ptr + collection_index * GfxStaticModelCollection::SIZE as u64,
		) {
			Ok(collection) => collection,
			Err(_) => continue,
		};

		let slot: GfxStaticModel = match ctx.reader.read_struct(
			smodels.smodels_ptr + collection.smodel_index as u64 * GfxStaticModel::SIZE as u64,
		) {
			Ok(slot) => slot,
			Err(_) => continue,
		};

		match zones.get(collection.transient_zone_index as usize) {
			Some(zone) if zone.hash != 0 => {}
			_ => continue,
		}

		let model: XModel = match ctx.reader.read_struct(slot.xmodel_ptr) {
			Ok(model) => model,
			Err(_) => continue,
		};

		let model_name = match model.name_ptr {
			0 => ctx.names.resolve(model.hash, "xmodel"),
			pointer => match ctx.reader.read_string(pointer) {
				Ok(raw) => sanitize_name(&raw),
				Err(_) => ctx.names.resolve(model.hash, "xmodel"),
			},
		};

		for instance_offset in 0..collection.instance_count {
			let instance_id = collection.first_instance + instance_offset;
			if instance_id >= smodels.instance_count {
				tracing::warn!(
					"map {}: instance {} outside the declared {} instances",
					scene.name,
					instance_id,
					smodels.instance_count
				);
				continue;
			}

			let data: GfxSModelInstanceData = match ctx.reader.read_struct(
				smodels.instance_data_ptr + instance_id as u64 * GfxSModelInstanceData::SIZE as u64,
			) {
				Ok(data) => data,
				Err(_) => continue,
			};

			scene.instances.push(PlacedInstance {
				model_handle: slot.xmodel_ptr,
				name: format!("{}_inst_{}", model_name, instance_id),
				placement: instance_placement(&data),
			});
		}
	}
}

/// Decodes one instance's quantized placement.
///
/// Translation is fixed point, rotation four biased 16-bit components,
/// scale a half float. The Y rotation and translation components flip
/// to convert the engine's handedness into the output convention;
/// that flip is a reverse-engineered contract, not a derivation.
fn instance_placement(data: &GfxSModelInstanceData) -> Placement {
	let translation = Vec3::new(
		data.translation[0] as f32 * TRANSLATION_SCALE,
		-(data.translation[1] as f32 * TRANSLATION_SCALE),
		data.translation[2] as f32 * TRANSLATION_SCALE,
	);

	let component = |raw: u16| (raw as f32 * ORIENTATION_SCALE - 1.0).clamp(-1.0, 1.0);
	let mut quat = [
		component(data.orientation[0]),
		-component(data.orientation[1]),
		component(data.orientation[2]),
		-component(data.orientation[3]),
	];

	let mag = quat.iter().map(|c| c * c).sum::<f32>().sqrt();
	if mag > f32::EPSILON {
		for c in quat.iter_mut() {
			*c /= mag;
		}
	}

	let scale = f16::from_bits(data.half_float_scale).to_f32();

	Placement {
		translation: translation,
		rotation: Rotor3::from_quaternion_array(quat),
		scale: Vec3::new(scale, scale, scale),
	}
}

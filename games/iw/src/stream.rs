//! Streamed payload extraction.
//!
//! Bulk geometry and pixel data is usually not resident in the
//! process; it lives in encrypted packages on disk or behind the
//! remote content store. An empty answer from either store means the
//! data is currently unavailable, which callers turn into a partial
//! result rather than a failure.

use rrk_core::memory::{
	MemoryReader,
	ReadError,
	ReadMemoryExt
};
use rrk_core::scene::ModelLod;
use rrk_core::store::ContentStore;

use crate::structures::{
	GfxMip,
	XModelSurfs,
	XSurfaceShared
};

/// Materializes a LOD's vertex/index payload.
///
/// A resident buffer is read exactly; a short read fails the whole
/// extraction. Otherwise the mesh's package key is handed to the
/// content store.
pub fn extract_mesh_payload(
	reader: &dyn MemoryReader,
	store: &dyn ContentStore,
	lod: &ModelLod,
) -> Result<Vec<u8>, ReadError> {
	let surfs: XModelSurfs = reader.read_struct(lod.stream_info_ptr)?;
	let shared: XSurfaceShared = reader.read_struct(surfs.shared_ptr)?;

	if shared.data_ptr != 0 {
		return reader.read_bytes(shared.data_ptr, shared.data_size as usize);
	}

	tracing::debug!(
		"mesh {:#x} is not resident; asking the package store",
		surfs.hash
	);
	Ok(store.extract_local(surfs.xpak_key, shared.data_size as u64))
}

/// Which mip was materialized, and its bytes.
///
/// The index feeds the effective-dimension shift: every unused higher
/// mip halves both dimensions.
#[derive(Clone, Debug)]
pub struct MipSelection {
	pub index: usize,
	pub data: Vec<u8>,
}

/// Picks the best materializable mip from `mips` (lowest resolution
/// first, highest last).
///
/// The highest mip is preferred; when its key is not decryptable
/// locally it is fetched from the remote store, and an empty remote
/// answer falls back to the best locally resolvable mip. `None` means
/// no source can serve any mip right now.
pub fn extract_best_mip(store: &dyn ContentStore, mips: &[GfxMip]) -> Option<MipSelection> {
	let highest = mips.len().checked_sub(1)?;

	let mut local_best = None;
	for (index, mip) in mips.iter().enumerate() {
		if store.has_local_key(mip.hash) {
			local_best = Some(index);
		}
	}

	if local_best != Some(highest) {
		let data = store.extract_remote(mips[highest].hash, mips[highest].size as u64);
		if !data.is_empty() {
			return Some(MipSelection {
				index: highest,
				data: data,
			});
		}
		tracing::debug!(
			"remote store has nothing for mip {:#x}; falling back",
			mips[highest].hash
		);
	}

	let index = local_best?;
	let data = store.extract_local(mips[index].hash, mips[index].size as u64);
	if data.is_empty() {
		return None;
	}

	Some(MipSelection {
		index: index,
		data: data,
	})
}

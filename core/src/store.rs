/// The decrypt/CDN layer that materializes bulk payloads which are not
/// resident in process memory.
///
/// Both extraction calls return an empty buffer when the key cannot be
/// served; that is a legitimate "no data" answer, not a failure. Calls
/// may block on disk or network, so callers must not hold locks across
/// them.
pub trait ContentStore: Send + Sync {
	/// Extracts a payload from a locally decryptable package.
	fn extract_local(&self, key: u64, size: u64) -> Vec<u8>;

	/// Fetches an object from the remote content store.
	fn extract_remote(&self, key: u64, expected_size: u64) -> Vec<u8>;

	/// Whether `key` can currently be decrypted without the remote store.
	fn has_local_key(&self, key: u64) -> bool;
}

/// Store with no packages and no remote endpoint.
pub struct NullStore;

impl ContentStore for NullStore {
	fn extract_local(&self, _key: u64, _size: u64) -> Vec<u8> {
		Vec::new()
	}

	fn extract_remote(&self, _key: u64, _expected_size: u64) -> Vec<u8> {
		Vec::new()
	}

	fn has_local_key(&self, _key: u64) -> bool {
		false
	}
}

/// Decompresses an interleaved audio stream into 16-bit samples.
///
/// The codec itself lives outside this kit; sound decoding only
/// prepares the stripped stream and the frame/channel bookkeeping.
pub trait AudioCodec: Send + Sync {
	fn decode_interleaved(
		&self,
		data: &[u8],
		frame_rate: u32,
		channels: u8,
		frame_count: u32,
	) -> Option<Vec<i16>>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_null_store_serves_nothing() {
		assert!(NullStore.extract_local(1, 64).is_empty());
		assert!(NullStore.extract_remote(1, 64).is_empty());
		assert!(!NullStore.has_local_key(1));
	}
}

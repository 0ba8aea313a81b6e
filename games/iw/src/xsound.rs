//! Sound decoding.
//!
//! Sound payloads live in packages keyed by one of two stream keys;
//! the extracted buffer leads with a seek table (and a fixed prefix on
//! the extended-key path) that must be stripped before the interleaved
//! sample decode.

use rrk_core::memory::ReadMemoryExt;
use rrk_core::scene::SoundPayload;
use rrk_core::store::AudioCodec;

use crate::structures::SoundAsset;
use crate::{
	AssetContext,
	AssetKind,
	DecodeError
};

/// Extra bytes in front of the seek table on the extended-key path.
const EXTENDED_KEY_PREFIX: usize = 32;

/// Package payloads are stored page aligned.
fn aligned_len(declared: u32, seek_table: u32) -> u64 {
	(declared as u64 + seek_table as u64 + 4095) & !0xFFF
}

pub fn read_sound(
	ctx: &AssetContext<'_>,
	codec: &dyn AudioCodec,
	handle: u64,
) -> Result<SoundPayload, DecodeError> {
	let sound: SoundAsset = ctx.reader.read_struct(handle)?;

	let (key, declared, prefix) = if sound.stream_key != 0 {
		(sound.stream_key, sound.size, 0)
	} else {
		(sound.stream_key_ex, sound.loaded_size, EXTENDED_KEY_PREFIX)
	};

	let buffer = ctx
		.store
		.extract_local(key, aligned_len(declared, sound.seek_table_size));
	if buffer.is_empty() {
		return Err(DecodeError::Unavailable {
			kind: AssetKind::Sound,
			hash: sound.hash,
		});
	}

	let strip = prefix + sound.seek_table_size as usize;
	if buffer.len() < strip {
		return Err(DecodeError::SoundTruncated {
			hash: sound.hash,
		});
	}

	let samples = codec
		.decode_interleaved(
			&buffer[strip..],
			sound.frame_rate,
			sound.channel_count,
			sound.frame_count,
		)
		.ok_or(DecodeError::AudioCodec {
			hash: sound.hash,
		})?;

	Ok(SoundPayload {
		channel_count: sound.channel_count,
		frame_count: sound.frame_count,
		frame_rate: sound.frame_rate,
		samples: samples,
	})
}

//! Animation decoding.
//!
//! This engine's animation path is not implemented. Callers get a
//! distinct unsupported result so the gap is never mistaken for a
//! failed read of a real layout.

use crate::{
	AssetContext,
	AssetKind,
	DecodeError
};

pub fn read_animation(_ctx: &AssetContext<'_>, _handle: u64) -> Result<(), DecodeError> {
	Err(DecodeError::Unsupported {
		kind: AssetKind::Animation,
	})
}

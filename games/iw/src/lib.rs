use std::fmt::{
	Display,
	Formatter,
	self
};

use thiserror::Error;

use rrk_core::memory::{
	MemoryReader,
	ReadError
};
use rrk_core::name::NameResolver;
use rrk_core::store::ContentStore;

use crate::geometry::GeometryError;

pub mod bones;
pub mod geometry;
pub mod gfxworld;
pub mod stream;
pub mod structures;
pub mod xanim;
pub mod ximage;
pub mod xmaterial;
pub mod xmodel;
pub mod xsound;

/// Asset hashes carry flag bits in the top nibble; identity is the low
/// 60 bits.
pub const HASH_MASK: u64 = 0x0FFF_FFFF_FFFF_FFFF;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
	Model,
	Image,
	Material,
	Sound,
	Map,
	Animation,
}

impl Display for AssetKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let name = match self {
			AssetKind::Model => "model",
			AssetKind::Image => "image",
			AssetKind::Material => "material",
			AssetKind::Sound => "sound",
			AssetKind::Map => "map",
			AssetKind::Animation => "animation",
		};
		write!(f, "{}", name)
	}
}

/// Campaign and multiplayer builds lay some structures out differently
/// at the same semantic role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameFlavor {
	SinglePlayer,
	Multiplayer,
}

/// Collaborators every decoder needs, bound explicitly per decode
/// batch. Decoders hold no state of their own; one context can be
/// shared across worker threads.
pub struct AssetContext<'a> {
	pub reader: &'a dyn MemoryReader,
	pub names: &'a dyn NameResolver,
	pub store: &'a dyn ContentStore,
	pub flavor: GameFlavor,
}

#[derive(Error, Debug)]
pub enum DecodeError {
	#[error("memory read failed")]
	Read {
		#[from]
		source: ReadError,
	},
	#[error("face index decode failed")]
	Geometry {
		#[from]
		source: GeometryError,
	},
	#[error("{kind} {hash:#x}: bulk data is not resident and no store can serve it")]
	Unavailable {
		kind: AssetKind,
		hash: u64,
	},
	#[error("{kind} decoding is not supported")]
	Unsupported {
		kind: AssetKind,
	},
	#[error("model has no LOD {index} (count {count})")]
	LodIndex {
		index: usize,
		count: usize,
	},
	#[error("model declares {root_count} root bones but only {bone_count} bones")]
	BoneCounts {
		bone_count: u32,
		root_count: u32,
	},
	#[error("bone {index} stores invalid parent back-reference {stored}")]
	BoneParent {
		index: usize,
		stored: u32,
	},
	#[error("image {hash:#x} declares a resident buffer of zero bytes")]
	EmptyImageBuffer {
		hash: u64,
	},
	#[error("image {hash:#x} uses unknown pixel format {tag}")]
	PixelFormat {
		hash: u64,
		tag: u8,
	},
	#[error("image {hash:#x} resolves to zero-sized dimensions")]
	BadDimensions {
		hash: u64,
	},
	#[error("sound {hash:#x} payload is shorter than its seek table")]
	SoundTruncated {
		hash: u64,
	},
	#[error("sound {hash:#x} was rejected by the audio codec")]
	AudioCodec {
		hash: u64,
	},
}

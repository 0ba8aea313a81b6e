use std::collections::BTreeMap;
use std::io::{
	Read,
	self
};

use thiserror::Error;

/// Longest null-terminated string a reader will chase before giving up.
pub const MAX_STRING_LEN: usize = 4096;

#[derive(Error, Debug)]
pub enum ReadError {
	#[error("address {address:#x} is not mapped")]
	Unmapped {
		address: u64,
	},
	#[error("short read at {address:#x}: wanted {wanted} bytes, got {got}")]
	Short {
		address: u64,
		wanted: usize,
		got: usize,
	},
	#[error("unterminated string at {address:#x}")]
	Unterminated {
		address: u64,
	},
	#[error("structure at {address:#x} did not decode")]
	Decode {
		address: u64,
		source: io::Error,
	},
}

/// Read access to a foreign address space.
///
/// Implementations must be safe for concurrent reads; decode workers
/// share one reader across threads. A failed call is always
/// distinguishable from a successful zero-filled one.
pub trait MemoryReader: Send + Sync {
	/// Fills `buf` from `address`, failing on any partial read.
	fn read_exact_at(&self, address: u64, buf: &mut [u8]) -> Result<(), ReadError>;

	/// Reads a null-terminated string starting at `address`.
	fn read_string(&self, address: u64) -> Result<String, ReadError> {
		let mut s = String::new();
		let mut byte = [0; 1];

		for i in 0..MAX_STRING_LEN as u64 {
			self.read_exact_at(address + i, &mut byte)?;
			if byte[0] == 0 {
				return Ok(s);
			}
			s.push(byte[0] as char);
		}

		Err(ReadError::Unterminated {
			address: address,
		})
	}
}

/// Decode of one fixed-size foreign structure from raw little-endian bytes.
pub trait MemoryDecode: Sized {
	/// Bytes one element occupies in the foreign layout. Decoders may
	/// consume less than this; the remainder is padding.
	const SIZE: usize;

	fn decode(buf: &mut &[u8]) -> io::Result<Self>;
}

macro_rules! decode_le {
	($($t:ty),+) => {
		$(impl MemoryDecode for $t {
			const SIZE: usize = std::mem::size_of::<$t>();

			fn decode(buf: &mut &[u8]) -> io::Result<Self> {
				let mut raw = [0; std::mem::size_of::<$t>()];
				buf.read_exact(&mut raw)?;
				Ok(<$t>::from_le_bytes(raw))
			}
		})+
	}
}

decode_le!(u8, u16, u32, u64, i8, i16, i32, i64, f32);

/// Typed reads layered over any [`MemoryReader`].
pub trait ReadMemoryExt: MemoryReader {
	fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>, ReadError> {
		if len == 0 {
			return Ok(Vec::new());
		}

		let mut buf = vec![0; len];
		self.read_exact_at(address, &mut buf)?;
		Ok(buf)
	}

	fn read_struct<T>(&self, address: u64) -> Result<T, ReadError>
	where
		T: MemoryDecode,
	{
		let raw = self.read_bytes(address, T::SIZE)?;
		T::decode(&mut raw.as_slice()).map_err(|source| ReadError::Decode {
			address: address,
			source: source,
		})
	}

	fn read_array<T>(&self, address: u64, count: usize) -> Result<Vec<T>, ReadError>
	where
		T: MemoryDecode,
	{
		let raw = self.read_bytes(address, T::SIZE * count)?;
		let mut slice = raw.as_slice();
		let mut items = Vec::with_capacity(count);

		for i in 0..count {
			items.push(T::decode(&mut slice).map_err(|source| ReadError::Decode {
				address: address + (i * T::SIZE) as u64,
				source: source,
			})?);
		}

		Ok(items)
	}
}

impl<R> ReadMemoryExt for R
where
	R: MemoryReader + ?Sized,
{
}

/// A byte-addressed view over index data.
///
/// The face-index codec runs against either the foreign process (map
/// surfaces) or an already materialized payload buffer (streamed model
/// surfaces); the two are kept as distinct named views so a value is
/// never a process address in one code path and a local byte offset in
/// another.
pub trait DataSource {
	/// Fills `buf` starting `offset` bytes into this view.
	fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), ReadError>;

	fn read_u8_at(&self, offset: u64) -> Result<u8, ReadError> {
		let mut raw = [0; 1];
		self.read_at(offset, &mut raw)?;
		Ok(raw[0])
	}

	fn read_u16_at(&self, offset: u64) -> Result<u16, ReadError> {
		let mut raw = [0; 2];
		self.read_at(offset, &mut raw)?;
		Ok(u16::from_le_bytes(raw))
	}

	fn read_u32_at(&self, offset: u64) -> Result<u32, ReadError> {
		let mut raw = [0; 4];
		self.read_at(offset, &mut raw)?;
		Ok(u32::from_le_bytes(raw))
	}

	fn read_u64_at(&self, offset: u64) -> Result<u64, ReadError> {
		let mut raw = [0; 8];
		self.read_at(offset, &mut raw)?;
		Ok(u64::from_le_bytes(raw))
	}
}

/// A window into the foreign process, addressed relative to a base address.
pub struct ForeignRegion<'a> {
	reader: &'a dyn MemoryReader,
	base: u64,
}

impl<'a> ForeignRegion<'a> {
	pub fn new(reader: &'a dyn MemoryReader, base: u64) -> ForeignRegion<'a> {
		ForeignRegion {
			reader: reader,
			base: base,
		}
	}
}

impl DataSource for ForeignRegion<'_> {
	fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), ReadError> {
		self.reader.read_exact_at(self.base + offset, buf)
	}
}

/// A window into a locally materialized payload, addressed relative to
/// a byte offset within it.
pub struct LocalRegion<'a> {
	data: &'a [u8],
	base: u64,
}

impl<'a> LocalRegion<'a> {
	pub fn new(data: &'a [u8], base: u64) -> LocalRegion<'a> {
		LocalRegion {
			data: data,
			base: base,
		}
	}
}

impl DataSource for LocalRegion<'_> {
	fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), ReadError> {
		let start = (self.base + offset) as usize;
		let available = self.data.len().saturating_sub(start);

		if available < buf.len() {
			return Err(ReadError::Short {
				address: self.base + offset,
				wanted: buf.len(),
				got: available,
			});
		}

		buf.copy_from_slice(&self.data[start..start + buf.len()]);
		Ok(())
	}
}

/// [`MemoryReader`] over captured memory regions.
///
/// Regions are keyed by base address and may not overlap; reads never
/// straddle two regions. Backs the test suites and offline analysis of
/// process dumps.
#[derive(Debug, Default)]
pub struct SnapshotReader {
	regions: BTreeMap<u64, Vec<u8>>,
}

impl SnapshotReader {
	pub fn new() -> SnapshotReader {
		SnapshotReader {
			regions: BTreeMap::new(),
		}
	}

	/// Maps `bytes` at `address`.
	pub fn map(&mut self, address: u64, bytes: Vec<u8>) {
		self.regions.insert(address, bytes);
	}
}

impl MemoryReader for SnapshotReader {
	fn read_exact_at(&self, address: u64, buf: &mut [u8]) -> Result<(), ReadError> {
		let (base, bytes) = self
			.regions
			.range(..=address)
			.next_back()
			.ok_or(ReadError::Unmapped {
				address: address,
			})?;

		let offset = (address - base) as usize;
		if offset >= bytes.len() {
			return Err(ReadError::Unmapped {
				address: address,
			});
		}

		let available = bytes.len() - offset;
		if available < buf.len() {
			return Err(ReadError::Short {
				address: address,
				wanted: buf.len(),
				got: available,
			});
		}

		buf.copy_from_slice(&bytes[offset..offset + buf.len()]);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct Pair {
		a: u32,
		b: u16,
	}

	impl MemoryDecode for Pair {
		const SIZE: usize = 8;

		fn decode(buf: &mut &[u8]) -> io::Result<Self> {
			Ok(Pair {
				a: u32::decode(buf)?,
				b: u16::decode(buf)?,
			})
		}
	}

	#[test]
	fn test_read_struct() {
		let mut snap = SnapshotReader::new();
		snap.map(0x1000, vec![0x78, 0x56, 0x34, 0x12, 0xcd, 0xab, 0, 0]);

		let pair: Pair = snap.read_struct(0x1000).unwrap();
		assert_eq!(pair.a, 0x12345678);
		assert_eq!(pair.b, 0xabcd);
	}

	#[test]
	fn test_read_array() {
		let mut snap = SnapshotReader::new();
		snap.map(0x40, vec![1, 0, 2, 0, 3, 0]);

		let vals: Vec<u16> = snap.read_array(0x40, 3).unwrap();
		assert_eq!(vals, [1, 2, 3]);
	}

	#[test]
	fn test_read_string() {
		let mut snap = SnapshotReader::new();
		snap.map(0x200, b"mp_rust\x00trailing".to_vec());

		assert_eq!(snap.read_string(0x200).unwrap(), "mp_rust");
	}

	#[test]
	fn test_short_read_is_an_error() {
		let mut snap = SnapshotReader::new();
		snap.map(0x10, vec![0; 4]);

		let err = snap.read_bytes(0x12, 4).unwrap_err();
		assert!(matches!(err, ReadError::Short { got: 2, .. }));
	}

	#[test]
	fn test_zero_length_read_always_succeeds() {
		let snap = SnapshotReader::new();
		assert!(snap.read_bytes(0, 0).unwrap().is_empty());
		assert!(snap.read_array::<u16>(0xdead, 0).unwrap().is_empty());
	}

	#[test]
	fn test_unmapped_address() {
		let snap = SnapshotReader::new();
		assert!(matches!(
			snap.read_bytes(0xdead, 1).unwrap_err(),
			ReadError::Unmapped { .. }
		));
	}

	#[test]
	fn test_local_region_offsets() {
		let payload = [0u8, 0, 0x11, 0x22, 0x33, 0x44];
		let region = LocalRegion::new(&payload, 2);

		assert_eq!(region.read_u16_at(0).unwrap(), 0x2211);
		assert_eq!(region.read_u16_at(2).unwrap(), 0x4433);
		assert!(region.read_u32_at(2).is_err());
	}

	#[test]
	fn test_foreign_region_offsets() {
		let mut snap = SnapshotReader::new();
		snap.map(0x3000, vec![0xaa, 0xbb, 0xcc]);

		let region = ForeignRegion::new(&snap, 0x3000);
		assert_eq!(region.read_u8_at(2).unwrap(), 0xcc);
	}
}

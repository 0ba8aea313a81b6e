/// Maps engine name hashes to human-readable names.
///
/// Resolution is deterministic and never fails; a miss yields a
/// formatted placeholder so downstream assets always have a usable
/// name.
pub trait NameResolver: Send + Sync {
	fn resolve(&self, hash: u64, category: &str) -> String;
}

/// Resolver with no backing database; every lookup is a miss.
pub struct PlaceholderResolver;

impl NameResolver for PlaceholderResolver {
	fn resolve(&self, hash: u64, category: &str) -> String {
		placeholder(hash, category)
	}
}

/// Formats the deterministic placeholder used for unresolved hashes.
pub fn placeholder(hash: u64, category: &str) -> String {
	format!("{}_{:x}", category, hash)
}

/// Reduces an embedded asset path to a bare, filesystem-safe name.
///
/// Engine names arrive as full paths with extensions and may contain
/// characters the import pipeline rejects.
pub fn sanitize_name(raw: &str) -> String {
	let base = raw
		.rsplit(|c| c == '/' || c == '\\')
		.next()
		.unwrap_or(raw);

	let stem = match base.rfind('.') {
		Some(0) | None => base,
		Some(dot) => &base[..dot],
	};

	stem.chars()
		.map(|c| {
			if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
				c
			} else {
				'_'
			}
		})
		.collect()
}

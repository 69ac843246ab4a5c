use serde::*;

/// A source of package metadata.
///
/// Lower priorities are preferred, ties are broken by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Repository {
	pub name: String,
	pub uri: String,
	#[serde(default)]
	pub priority: i32,
}

impl Repository {
	pub const DEFAULT_NAME: &'static str = "default";
	pub const DEFAULT_URI: &'static str = "https://github.com/KSP-CKAN/CKAN-meta/archive/master.tar.gz";
	/// The default repository's address before the metadata moved to a tarball.
	pub(crate) const OLD_DEFAULT_URI: &'static str = "https://github.com/KSP-CKAN/CKAN-meta/archive/master.zip";

	pub fn new(name: impl Into<String>, uri: impl Into<String>, priority: i32) -> Self {
		Self { name: name.into(), uri: uri.into(), priority }
	}
}

impl Default for Repository {
	fn default() -> Self {
		Self::new(Self::DEFAULT_NAME, Self::DEFAULT_URI, 0)
	}
}

impl std::fmt::Display for Repository {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} ({})", self.name, self.uri)
	}
}

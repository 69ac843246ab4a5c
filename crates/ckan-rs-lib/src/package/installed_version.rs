use std::cmp::Ordering;

use serde::*;

use super::PackageVersion;

/// The version of something the game instance has, as opposed to something in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstalledVersion {
	/// Installed through the registry.
	Release(PackageVersion),
	/// Found on disk, either a loose DLL or a DLC.
	/// `None` when the version couldn't be determined, it then satisfies every version requirement.
	Unmanaged(Option<PackageVersion>),
	/// Not installed itself but `provider` provides it.
	Provided {
		provider: String,
		version: PackageVersion,
	},
}

impl InstalledVersion {
	/// The version to compare against, `None` for unknown and provided versions.
	pub fn comparable_version(&self) -> Option<&PackageVersion> {
		match self {
			InstalledVersion::Release(v) => Some(v),
			InstalledVersion::Unmanaged(v) => v.as_ref(),
			InstalledVersion::Provided { .. } => None,
		}
	}

	pub fn is_provided(&self) -> bool { matches!(self, InstalledVersion::Provided { .. }) }
	pub fn is_unmanaged(&self) -> bool { matches!(self, InstalledVersion::Unmanaged(_)) }
}

impl PartialEq<PackageVersion> for InstalledVersion {
	fn eq(&self, other: &PackageVersion) -> bool {
		self.comparable_version().is_some_and(|v| v == other)
	}
}

impl PartialOrd<PackageVersion> for InstalledVersion {
	fn partial_cmp(&self, other: &PackageVersion) -> Option<Ordering> {
		self.comparable_version().map(|v| v.cmp(other))
	}
}

impl std::fmt::Display for InstalledVersion {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			InstalledVersion::Release(v) => write!(f, "{}", v),
			InstalledVersion::Unmanaged(Some(v)) => write!(f, "{} (unmanaged)", v),
			InstalledVersion::Unmanaged(None) => write!(f, "(unmanaged)"),
			InstalledVersion::Provided { provider, version } => write!(f, "{} (provided by {})", version, provider),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn v(s: &str) -> PackageVersion { PackageVersion::new(s).unwrap() }
	fn provided() -> InstalledVersion { InstalledVersion::Provided { provider: "Provider".into(), version: v("1.0") } }

	#[test] fn provided_is_never_ordered() { assert_eq!(provided().partial_cmp(&v("1.0")), None) }
	#[test] fn provided_is_never_equal() { assert!(provided() != v("1.0")) }
	#[test] fn release_orders_by_version() { assert!(InstalledVersion::Release(v("1.0")) < v("1.1")) }
	#[test] fn provided_display() { assert_eq!(provided().to_string(), "1.0 (provided by Provider)") }
}

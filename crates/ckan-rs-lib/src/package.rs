//! Various types associated with packages.

use std::collections::BTreeMap;
use serde::*;

/// A single release of a mod, as read from a `.ckan` file.
///
/// We use the term "Package" instead of "Module" due to the overlap with rust's keywords.
///
/// Packages are identified by their [`PackageIdentifier`], two packages with the same identifier and version are equal.
/* NOTE: Deserialize is for the registry's own format, `.ckan` files go through `read_from_json` */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
	/* Required Fields */
	pub spec_version: String,
	pub identifier: PackageIdentifier,
	pub name: String,
	/// Rust friendly alias for `abstract`.
	pub blurb: String,
	/* one or many */
	pub author: Vec<String>,
	/* Required when `kind` is not `"metapackage"` or `"dlc"` */
	pub download: Option<String>,
	/* one or many */
	pub license: Vec<String>,

	/* Optional Fields */
	pub install: Vec<install::InstallDirective>,
	pub description: Option<String>,
	pub release_status: ReleaseStatus,
	pub game_version: GameVersionBounds,
	pub game_version_strict: bool,
	pub tags: Vec<String>,
	pub release_date: Option<String>,
	pub depends: Vec<Relationship>,
	pub recommends: Vec<Relationship>,
	pub suggests: Vec<Relationship>,
	pub supports: Vec<Relationship>,
	pub conflicts: Vec<Relationship>,
	pub replaced_by: Option<PackageDescriptor>,
	pub kind: Kind,
	pub provides: Vec<String>,
	pub resources: BTreeMap<String, String>,
}

impl std::hash::Hash for Package {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.identifier.hash(state);
	}
}

impl std::cmp::Ord for Package {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self.identifier.cmp(&other.identifier)
	}
}

impl std::cmp::PartialOrd for Package {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl std::cmp::PartialEq for Package {
	fn eq(&self, other: &Self) -> bool {
		self.identifier == other.identifier
	}
}

impl std::cmp::Eq for Package {}

impl AsRef<PackageIdentifier> for Package {
	fn as_ref(&self) -> &PackageIdentifier {
		&self.identifier
	}
}

impl std::fmt::Display for Package {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.identifier)
	}
}

impl Package {
	/// Minimal metadata for a DLC detected on disk that the catalog doesn't know about.
	pub fn dlc(identifier: impl Into<String>, version: PackageVersion) -> Self {
		let identifier = identifier.into();
		Self {
			spec_version: "v1.28".to_string(),
			name: identifier.clone(),
			blurb: "An official expansion pack for KSP".to_string(),
			author: vec!["SQUAD".to_string()],
			download: None,
			license: vec!["restricted".to_string()],
			install: Vec::new(),
			description: None,
			release_status: ReleaseStatus::Stable,
			game_version: VersionBounds::Any,
			game_version_strict: false,
			tags: Vec::new(),
			release_date: None,
			depends: Vec::new(),
			recommends: Vec::new(),
			suggests: Vec::new(),
			supports: Vec::new(),
			conflicts: Vec::new(),
			replaced_by: None,
			kind: Kind::DLC,
			provides: Vec::new(),
			resources: BTreeMap::new(),
			identifier: PackageIdentifier::new(identifier, version),
		}
	}

	/// The identifier followed by everything this package provides.
	pub fn provides_list(&self) -> impl Iterator<Item = &str> {
		std::iter::once(self.identifier.identifier.as_str()).chain(self.provides.iter().map(String::as_str))
	}

	pub fn does_provide(&self, identifier: &str) -> bool {
		self.provides_list().any(|p| p == identifier)
	}

	/// Checks if the given packages conflict with each other.
	///
	/// Versions of the same identifier never conflict, they replace each other instead.
	pub fn conflicts_with(&self, other: &Self) -> bool {
		if self.identifier.identifier == other.identifier.identifier {
			return false
		}
		Self::uni_conflicts(self, other) || Self::uni_conflicts(other, self)
	}

	/// Checks if `lhs` conflicts with `rhs` without checking the reverse.
	fn uni_conflicts(lhs: &Self, rhs: &Self) -> bool {
		lhs.conflicts.iter().any(|c| c.matches_package(rhs))
	}

	/// The game versions this package declares support for.
	pub fn compatible_range(&self) -> GameVersionRange {
		match &self.game_version {
			VersionBounds::Any => GameVersionRange::ANY,
			VersionBounds::Explicit(v) => v.to_range(),
			VersionBounds::MinOnly(min) => GameVersionRange::new(min.to_range().lower, GameVersionBound::UNBOUNDED),
			VersionBounds::MaxOnly(max) => GameVersionRange::new(GameVersionBound::UNBOUNDED, max.to_range().upper),
			VersionBounds::MinMax(min, max) => GameVersionRange::from_versions(min, max),
		}
	}

	/// Checks if this package supports any game version in `criteria`.
	pub fn is_compatible(&self, criteria: &GameVersionRange) -> bool {
		self.compatible_range().intersect(criteria).is_some()
	}

	/// Lowest game version this package claims to support, [`GameVersion::ANY`] when there's no lower limit.
	pub fn earliest_game_version(&self) -> GameVersion {
		self.game_version.min().copied().unwrap_or(GameVersion::ANY)
	}

	/// Highest game version this package claims to support, [`GameVersion::ANY`] when there's no upper limit.
	pub fn latest_game_version(&self) -> GameVersion {
		self.game_version.max().copied().unwrap_or(GameVersion::ANY)
	}

	pub fn is_metapackage(&self) -> bool { self.kind == Kind::MetaPackage }
	pub fn is_dlc(&self) -> bool { self.kind == Kind::DLC }

	/// The directives to install with, packages without any get [`install::InstallDirective::default_for`] their identifier.
	pub fn install_directives(&self) -> Vec<install::InstallDirective> {
		if self.install.is_empty() && self.kind == Kind::Package {
			vec![install::InstallDirective::default_for(&self.identifier.identifier)]
		} else {
			self.install.clone()
		}
	}
}

/* CKAN Types */

mod version_bounds;
pub use version_bounds::VersionBounds;

mod game_version;
pub use game_version::GameVersion;
pub use game_version::GameVersionBound;
pub use game_version::GameVersionRange;
pub type GameVersionBounds = VersionBounds<GameVersion>;

mod package_version;
pub use package_version::PackageVersion;
pub type PackageVersionBounds = VersionBounds<PackageVersion>;

mod installed_version;
pub use installed_version::InstalledVersion;

pub mod install;

mod relationship;
pub use relationship::PackageIdentifier;
pub use relationship::PackageDescriptor;
pub use relationship::Relationship;

/// The stability of a package, ordered from most to least stable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReleaseStatus {
	#[default] Stable,
	Testing,
	Development,
}

/// The type of a package.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
	/// A normal installable module.
	#[default] Package,
	/// A distributable .ckan file that has relationships to other mods while having no download of its own.
	MetaPackage,
	/// A paid expansion from SQUAD, which CKAN can detect but not install. Also has no download.
	DLC,
}

mod import;

#[cfg(test)]
mod test {
	use super::*;

	fn package(json: serde_json::Value) -> Package { Package::read_from_json(json).unwrap() }
	fn gv(s: &str) -> GameVersion { GameVersion::new(s).unwrap() }

	fn compatible_explicit(package_version: &str, game: &str) -> bool {
		package(serde_json::json!({"identifier": "kOS", "version": "0.14", "ksp_version": package_version})).is_compatible(&gv(game).to_range())
	}

	fn compatible_min_max(min: Option<&str>, max: Option<&str>, game: &str) -> bool {
		package(serde_json::json!({"identifier": "kOS", "version": "0.14", "ksp_version_min": min, "ksp_version_max": max})).is_compatible(&gv(game).to_range())
	}

	#[test]
	fn explicit_game_version_compatibility() {
		let cases = [
			("1.0", "1.0.4", true), ("1.1", "1.0.4", false),
			("1.0.4.1234", "1.0.4.1234", true), ("1.0.4.1235", "1.0.4.1234", false),
			("1.0.4", "1.0.4.1234", true), ("1.0.4.1234", "1.0.4", true),
			("1.0.4.0000", "1.0.4", true), ("1.1", "1.0", false), ("1.0", "1.1", false),
			("1.0.4", "1", true), ("1.0.4", "1.0", true), ("1.0.4", "1.0.5", false),
			("1.0.4", "1.0.3", false), ("1.0.4", "1.1", false), ("1.0.4", "0.9", false),
			("1", "1.0.4.1234", true), ("1", "2", false), ("1", "0.9", false),
		];
		for (package_version, game, expected) in cases {
			assert_eq!(compatible_explicit(package_version, game), expected, "{package_version} on {game}");
		}
	}

	#[test]
	fn min_max_game_version_compatibility() {
		let cases = [
			(Some("1.0.4"), None, "1.0.3", false), (Some("1.0.4"), None, "1.0.4", true), (Some("1.0.4"), None, "1.1", true),
			(Some("1.0"), None, "0.9", false), (Some("1.0"), None, "1.0.4", true),
			(Some("1.1"), None, "1.0.4", false), (Some("1.1"), None, "1.2", true),
			(None, Some("1.0.4"), "1.0.5", false), (None, Some("1.0.4"), "1.0.4", true), (None, Some("1.0.4"), "1.0", true),
			(None, Some("1.0"), "0.9", true), (None, Some("1.0"), "1.1", false),
			(None, Some("1.1"), "1.1.1", true), (None, Some("1.1"), "1.2", false),
		];
		for (min, max, game, expected) in cases {
			assert_eq!(compatible_min_max(min, max, game), expected, "{min:?}-{max:?} on {game}");
		}
	}

	#[test] fn no_game_version_is_compatible_with_anything() { assert!(package(serde_json::json!({"identifier": "A", "version": "1"})).is_compatible(&gv("1.12").to_range())) }
	#[test] fn latest_game_version_prefers_max() { assert_eq!(package(serde_json::json!({"identifier": "A", "version": "1", "ksp_version_min": "1.8", "ksp_version_max": "1.12"})).latest_game_version(), gv("1.12")) }
	#[test] fn earliest_game_version_without_limit_is_any() { assert!(package(serde_json::json!({"identifier": "A", "version": "1", "ksp_version_max": "1.12"})).earliest_game_version().is_any()) }

	#[test]
	fn conflicts_are_checked_both_ways() {
		let a = package(serde_json::json!({"identifier": "A", "version": "1.0", "conflicts": [{"name": "C"}]}));
		let b = package(serde_json::json!({"identifier": "B", "version": "1.0", "provides": ["C"]}));
		assert!(a.conflicts_with(&b));
		assert!(b.conflicts_with(&a));
	}

	#[test]
	fn conflicts_respect_versions() {
		let a = package(serde_json::json!({"identifier": "A", "version": "1.0", "conflicts": [{"name": "B", "max_version": "1.0"}]}));
		let b = package(serde_json::json!({"identifier": "B", "version": "2.0"}));
		assert!(!a.conflicts_with(&b));
	}

	#[test]
	fn never_conflicts_with_other_versions_of_itself() {
		let a1 = package(serde_json::json!({"identifier": "A", "version": "1.0", "conflicts": [{"name": "A"}]}));
		let a2 = package(serde_json::json!({"identifier": "A", "version": "2.0"}));
		assert!(!a1.conflicts_with(&a2));
	}

	#[test] fn provides_list_starts_with_identifier() { assert_eq!(package(serde_json::json!({"identifier": "A", "version": "1", "provides": ["B"]})).provides_list().collect::<Vec<_>>(), ["A", "B"]) }
	#[test] fn metapackage_gets_no_default_install() { assert!(package(serde_json::json!({"identifier": "A", "version": "1", "kind": "metapackage"})).install_directives().is_empty()) }
	#[test] fn package_gets_default_install() { assert_eq!(package(serde_json::json!({"identifier": "A", "version": "1"})).install_directives().len(), 1) }
	#[test] fn release_status_is_ordered() { assert!(ReleaseStatus::Stable < ReleaseStatus::Testing && ReleaseStatus::Testing < ReleaseStatus::Development) }
}

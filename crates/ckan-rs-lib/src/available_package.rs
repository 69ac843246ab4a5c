//! Every known version of one identifier.

use std::collections::{BTreeMap, BTreeSet};

use serde::*;

use crate::package::*;

/// Extra filters for [`AvailablePackage::latest_with`].
///
/// Every filter left at its default accepts everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct LatestFilter<'a> {
	/// Only consider packages compatible with these game versions.
	pub criteria: Option<&'a GameVersionRange>,
	/// Only consider packages satisfying this relationship.
	pub relationship: Option<&'a Relationship>,
	/// Only consider packages at least this stable.
	pub stability_tolerance: Option<ReleaseStatus>,
	/// Packages already installed, see [`AvailablePackage::depends_and_conflicts_ok`].
	pub installed: &'a [&'a Package],
	/// Packages planned for installation, see [`AvailablePackage::depends_and_conflicts_ok`].
	pub to_install: &'a [&'a Package],
}

/// Tracks the versions available for a single identifier, oldest to newest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailablePackage {
	identifier: String,
	#[serde(rename = "module_version")]
	versions: BTreeMap<PackageVersion, Package>,
}

impl AvailablePackage {
	pub fn new(identifier: impl Into<String>) -> Self {
		Self {
			identifier: identifier.into(),
			versions: BTreeMap::new(),
		}
	}

	pub fn identifier(&self) -> &str { &self.identifier }
	pub fn is_empty(&self) -> bool { self.versions.is_empty() }
	pub fn len(&self) -> usize { self.versions.len() }

	/// Records `package` as available, replacing any package with an equal version.
	///
	/// # Panics
	/// When `package` has a different identifier, mixing identifiers is a programming error.
	pub fn add(&mut self, package: Package) {
		assert_eq!(package.identifier.identifier, self.identifier, "added {} to the versions of {}", package.identifier, self.identifier);
		log::trace!("Adding {}", package.identifier);
		self.versions.insert(package.identifier.version.clone(), package);
	}

	/// Describes every stored package filed under the wrong identifier or version.
	///
	/// Always empty for values built with [`AvailablePackage::add`], only deserialized values can be misfiled.
	pub(crate) fn misfiled(&self) -> Vec<String> {
		self.versions.iter()
			.filter(|(version, package)| package.identifier.identifier != self.identifier || &package.identifier.version != *version)
			.map(|(version, package)| format!("{} is filed as {} {}", package.identifier, self.identifier, version))
			.collect()
	}

	pub fn remove(&mut self, version: &PackageVersion) -> Option<Package> {
		self.versions.remove(version)
	}

	/// Gets the package with exactly `version`.
	pub fn by_version(&self, version: &PackageVersion) -> Option<&Package> {
		self.versions.get(version)
	}

	/// Every version, newest first.
	pub fn all_available(&self) -> impl DoubleEndedIterator<Item = &Package> {
		self.versions.values().rev()
	}

	/// The newest package compatible with `criteria` and satisfying `relationship`.
	///
	/// Returns `None` when nothing passes, that's an expected outcome rather than an error.
	pub fn latest(&self, criteria: Option<&GameVersionRange>, relationship: Option<&Relationship>) -> Option<&Package> {
		self.latest_with(LatestFilter { criteria, relationship, ..Default::default() })
	}

	/// The newest package passing every filter in `filter`.
	pub fn latest_with(&self, filter: LatestFilter<'_>) -> Option<&Package> {
		let others = filter.installed.iter().chain(filter.to_install).copied().collect::<Vec<_>>();
		self.all_available().find(|package| {
			filter.criteria.map_or(true, |c| package.is_compatible(c))
			&& filter.relationship.map_or(true, |r| r.matches_package(package))
			&& filter.stability_tolerance.map_or(true, |t| package.release_status <= t)
			&& (others.is_empty() || Self::depends_and_conflicts_ok(package, &others))
		})
	}

	/// Checks that `package` can sit beside `others` without breaking either side.
	///
	/// Rejects the package when
	/// - a depends names one of `others` but that package's version doesn't match.
	/// - it conflicts with one of `others`.
	/// - one of `others` conflicts with it.
	/// - one of `others` depends on exactly this identifier at a version it doesn't have.
	///
	/// Other versions of the same identifier are ignored, they'd be replaced.
	pub fn depends_and_conflicts_ok(package: &Package, others: &[&Package]) -> bool {
		let no_dlls = BTreeSet::new();
		let no_dlc = BTreeMap::new();
		let others = others.iter().copied()
			.filter(|o| o.identifier.identifier != package.identifier.identifier)
			.collect::<Vec<_>>();

		for rel in &package.depends {
			let named = others.iter().any(|o| rel.contains_any(o.provides_list()));
			if named && !rel.matches_any(others.iter().copied(), &no_dlls, &no_dlc) {
				return false
			}
		}

		if others.iter().any(|o| package.conflicts_with(o)) {
			return false
		}

		let this = &package.identifier.identifier;
		for other in &others {
			for rel in &other.depends {
				if rel.names().all(|n| n == this) && !rel.matches_package(package) {
					return false
				}
			}
		}

		true
	}

	/// The highest of `real_versions` any version of this package supports.
	///
	/// When none of them are supported the highest version any package declares is returned instead,
	/// [`GameVersion::ANY`] when one of them has no upper limit.
	pub fn latest_compatible_game_version(&self, real_versions: &[GameVersion]) -> GameVersion {
		let best_real = real_versions.iter()
			.filter(|rv| self.versions.values().any(|p| p.is_compatible(&rv.to_range())))
			.max();
		if let Some(v) = best_real {
			return *v
		}

		let declared = self.versions.values().map(Package::latest_game_version).collect::<Vec<_>>();
		if declared.iter().any(GameVersion::is_any) {
			GameVersion::ANY
		} else {
			declared.into_iter().max().unwrap_or(GameVersion::ANY)
		}
	}

	/// Combines two sources of the same identifier, versions in `other` replace equal versions in `self`.
	///
	/// # Panics
	/// When the identifiers differ.
	pub fn merge(mut self, other: Self) -> Self {
		assert_eq!(self.identifier, other.identifier, "can't merge versions of different identifiers");
		self.versions.extend(other.versions);
		self
	}
}

impl Extend<Package> for AvailablePackage {
	fn extend<T: IntoIterator<Item = Package>>(&mut self, iter: T) {
		for package in iter {
			self.add(package);
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use serde_json::json;

	fn package(json: serde_json::Value) -> Package { Package::read_from_json(json).unwrap() }
	fn v(s: &str) -> PackageVersion { PackageVersion::new(s).unwrap() }
	fn gv(s: &str) -> GameVersion { GameVersion::new(s).unwrap() }

	fn available(identifier: &str, packages: impl IntoIterator<Item = serde_json::Value>) -> AvailablePackage {
		let mut available = AvailablePackage::new(identifier);
		available.extend(packages.into_iter().map(package));
		available
	}

	fn mod_a() -> AvailablePackage {
		available("ModA", [
			json!({"identifier": "ModA", "version": "1.0", "ksp_version": "1.4"}),
			json!({"identifier": "ModA", "version": "1.1", "ksp_version": "1.5", "release_status": "testing"}),
			json!({"identifier": "ModA", "version": "2.0", "ksp_version": "1.8"}),
		])
	}

	#[test] fn latest_without_filters_is_newest() { assert_eq!(mod_a().latest(None, None).unwrap().identifier.version, v("2.0")) }
	#[test] fn latest_respects_criteria() { assert_eq!(mod_a().latest(Some(&gv("1.5").to_range()), None).unwrap().identifier.version, v("1.1")) }
	#[test] fn latest_nothing_compatible_is_none() { assert!(mod_a().latest(Some(&gv("1.12").to_range()), None).is_none()) }
	#[test] fn by_version_finds_exact() { assert!(mod_a().by_version(&v("1.1")).is_some()) }
	#[test] fn all_available_is_newest_first() { assert_eq!(mod_a().all_available().map(|p| p.identifier.version.to_string()).collect::<Vec<_>>(), ["2.0", "1.1", "1.0"]) }

	#[test]
	fn latest_respects_relationship() {
		let rel = Relationship::One(PackageDescriptor::new("ModA", VersionBounds::MaxOnly(v("1.1"))));
		assert_eq!(mod_a().latest(None, Some(&rel)).unwrap().identifier.version, v("1.1"));
	}

	#[test]
	fn latest_respects_stability() {
		let available = mod_a();
		let filter = LatestFilter { criteria: Some(&GameVersionRange::from_versions(&gv("1.4"), &gv("1.5"))), stability_tolerance: Some(ReleaseStatus::Stable), ..Default::default() };
		assert_eq!(available.latest_with(filter).unwrap().identifier.version, v("1.0"));
	}

	#[test]
	fn latest_skips_conflicting_versions() {
		let available = mod_a();
		let installed = package(json!({"identifier": "ModB", "version": "1.0", "conflicts": [{"name": "ModA", "min_version": "2.0"}]}));
		let filter = LatestFilter { installed: &[&installed], ..Default::default() };
		assert_eq!(available.latest_with(filter).unwrap().identifier.version, v("1.1"));
	}

	#[test]
	fn depends_on_wrong_version_of_other_is_rejected() {
		let a = package(json!({"identifier": "A", "version": "1.0", "depends": [{"name": "B", "min_version": "2.0"}]}));
		let b = package(json!({"identifier": "B", "version": "1.0"}));
		assert!(!AvailablePackage::depends_and_conflicts_ok(&a, &[&b]));
	}

	#[test]
	fn other_depending_on_wrong_version_is_rejected() {
		let a = package(json!({"identifier": "A", "version": "1.0"}));
		let b = package(json!({"identifier": "B", "version": "1.0", "depends": [{"name": "A", "version": "2.0"}]}));
		assert!(!AvailablePackage::depends_and_conflicts_ok(&a, &[&b]));
	}

	#[test]
	fn other_versions_of_self_are_ignored() {
		let a1 = package(json!({"identifier": "A", "version": "1.0", "conflicts": [{"name": "A"}]}));
		let a2 = package(json!({"identifier": "A", "version": "2.0"}));
		assert!(AvailablePackage::depends_and_conflicts_ok(&a1, &[&a2]));
	}

	#[test]
	fn latest_compatible_game_version_picks_highest_real() {
		let real = [gv("1.4.5"), gv("1.5.1"), gv("1.8.1"), gv("1.12.5")];
		assert_eq!(mod_a().latest_compatible_game_version(&real), gv("1.8.1"));
	}

	#[test]
	fn latest_compatible_game_version_without_limit_is_any() {
		let available = available("A", [json!({"identifier": "A", "version": "1"})]);
		assert!(available.latest_compatible_game_version(&[]).is_any());
	}

	#[test]
	fn merge_is_union() {
		let other = available("ModA", [json!({"identifier": "ModA", "version": "3.0"})]);
		assert_eq!(mod_a().merge(other).len(), 4);
	}

	#[test]
	#[should_panic]
	fn adding_other_identifier_panics() {
		mod_a().add(package(json!({"identifier": "ModB", "version": "1.0"})));
	}
}

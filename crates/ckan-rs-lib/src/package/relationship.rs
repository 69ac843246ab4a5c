use std::collections::{BTreeMap, BTreeSet};

use serde::*;
use super::*;

/// A unique identifier for packages.
///
/// Mainly used as a key into [`crate::registry::Registry`] and in error reports.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PackageIdentifier {
	pub identifier: String,
	pub version: PackageVersion,
}

impl PackageIdentifier {
	pub fn new(identifier: impl Into<String>, version: PackageVersion) -> Self {
		Self { identifier: identifier.into(), version }
	}
}

impl std::cmp::Ord for PackageIdentifier {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		match self.identifier.cmp(&other.identifier) {
			core::cmp::Ordering::Equal => {}
			ord => return ord,
		}
		self.version.cmp(&other.version)
	}
}

impl std::cmp::PartialOrd for PackageIdentifier {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl std::fmt::Display for PackageIdentifier {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} {}", self.identifier, self.version)
	}
}

impl AsRef<PackageIdentifier> for PackageIdentifier {
	fn as_ref(&self) -> &PackageIdentifier {
		self
	}
}

/// Describes a package using an identifier and version requirement.
///
/// Differs from [`PackageIdentifier`] in that it represents a range of packages.
/// The name may also be a virtual identifier that other packages `provide`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageDescriptor {
	pub name: String,
	pub version: PackageVersionBounds,
}

impl PackageDescriptor {
	pub fn new(name: impl Into<String>, version: PackageVersionBounds) -> Self {
		Self {
			name: name.into(),
			version,
		}
	}

	/// A descriptor accepting any version of `name`.
	pub fn any(name: impl Into<String>) -> Self {
		Self::new(name, PackageVersionBounds::Any)
	}

	pub fn within_bounds(&self, version: &PackageVersion) -> bool {
		self.version.is_version_within(version)
	}

	/// Checks if `package` is or provides the described name within bounds.
	///
	/// The package's own version is what gets checked, even when the match is through `provides`.
	pub fn matches_package(&self, package: &Package) -> bool {
		package.does_provide(&self.name) && self.within_bounds(&package.identifier.version)
	}

	/// Checks if anything in the given state satisfies this descriptor.
	///
	/// Only real packages and DLC are checked against the version bounds.
	/// A DLL or another package providing the name satisfies any version.
	pub fn matches_any<'a>(
		&self,
		packages: impl IntoIterator<Item = &'a Package>,
		dlls: &BTreeSet<String>,
		dlc: &BTreeMap<String, Option<PackageVersion>>,
	) -> bool {
		if dlls.contains(&self.name) {
			return true
		}

		for package in packages {
			if package.identifier.identifier == self.name {
				if self.within_bounds(&package.identifier.version) {
					return true
				}
			} else if package.provides.iter().any(|p| p == &self.name) {
				return true
			}
		}

		match dlc.get(&self.name) {
			Some(Some(version)) => self.within_bounds(version),
			Some(None) => true,
			None => false,
		}
	}
}

impl std::fmt::Display for PackageDescriptor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match &self.version {
			VersionBounds::Any => write!(f, "{}", self.name),
			bounds => write!(f, "{} {}", self.name, bounds),
		}
	}
}

/// A requirement of a package that must be met for the package to be installed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relationship {
	/// At least one of the descriptors must match to fulfill the relationship.
	AnyOf(Vec<PackageDescriptor>),
	/// This single descriptor requirement must be met.
	One(PackageDescriptor),
}

impl Relationship {
	pub fn descriptors(&self) -> impl Iterator<Item = &PackageDescriptor> {
		match self {
			Relationship::AnyOf(v) => v.iter(),
			Relationship::One(r) => std::slice::from_ref(r).iter(),
		}
	}

	/// Every identifier this relationship names.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.descriptors().map(|d| d.name.as_str())
	}

	/// Checks if this relationship names any of `identifiers`.
	pub fn contains_any<'a>(&self, mut identifiers: impl Iterator<Item = &'a str>) -> bool {
		identifiers.any(|i| self.names().any(|n| n == i))
	}

	/// Checks if `package` satisfies any branch of this relationship, see [`PackageDescriptor::matches_package`].
	pub fn matches_package(&self, package: &Package) -> bool {
		self.descriptors().any(|d| d.matches_package(package))
	}

	/// Checks if anything in the given state satisfies any branch of this relationship, see [`PackageDescriptor::matches_any`].
	pub fn matches_any<'a>(
		&self,
		packages: impl IntoIterator<Item = &'a Package> + Clone,
		dlls: &BTreeSet<String>,
		dlc: &BTreeMap<String, Option<PackageVersion>>,
	) -> bool {
		self.descriptors().any(|d| d.matches_any(packages.clone(), dlls, dlc))
	}
}

impl From<PackageDescriptor> for Relationship {
	fn from(value: PackageDescriptor) -> Self {
		Relationship::One(value)
	}
}

impl std::fmt::Display for Relationship {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let parts = self.descriptors().map(|d| d.to_string()).collect::<Vec<_>>();
		write!(f, "{}", parts.join(" OR "))
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn v(s: &str) -> PackageVersion { PackageVersion::new(s).unwrap() }
	fn package(json: serde_json::Value) -> Package { Package::read_from_json(json).unwrap() }

	fn no_dlls() -> BTreeSet<String> { BTreeSet::new() }
	fn no_dlc() -> BTreeMap<String, Option<PackageVersion>> { BTreeMap::new() }

	#[test]
	fn descriptor_checks_version_of_real_package() {
		let a = package(serde_json::json!({"identifier": "A", "version": "1.0"}));
		let wants_two = PackageDescriptor::new("A", VersionBounds::MinOnly(v("2.0")));
		assert!(!wants_two.matches_any([&a], &no_dlls(), &no_dlc()));
		assert!(PackageDescriptor::any("A").matches_any([&a], &no_dlls(), &no_dlc()));
	}

	#[test]
	fn descriptor_ignores_version_of_provider() {
		let b = package(serde_json::json!({"identifier": "B", "version": "1.0", "provides": ["A"]}));
		let wants_two = PackageDescriptor::new("A", VersionBounds::MinOnly(v("2.0")));
		assert!(wants_two.matches_any([&b], &no_dlls(), &no_dlc()));
	}

	#[test]
	fn descriptor_dll_matches_any_version() {
		let dlls = BTreeSet::from(["A".to_string()]);
		assert!(PackageDescriptor::new("A", VersionBounds::Explicit(v("3.0"))).matches_any([], &dlls, &no_dlc()));
	}

	#[test]
	fn descriptor_checks_dlc_version() {
		let dlc = BTreeMap::from([("MakingHistory-DLC".to_string(), Some(v("1.1.0")))]);
		assert!(PackageDescriptor::new("MakingHistory-DLC", VersionBounds::MinOnly(v("1.0"))).matches_any([], &no_dlls(), &dlc));
		assert!(!PackageDescriptor::new("MakingHistory-DLC", VersionBounds::MinOnly(v("1.2"))).matches_any([], &no_dlls(), &dlc));
	}

	#[test]
	fn matches_package_checks_provider_version() {
		let b = package(serde_json::json!({"identifier": "B", "version": "1.0", "provides": ["A"]}));
		assert!(PackageDescriptor::new("A", VersionBounds::MaxOnly(v("1.0"))).matches_package(&b));
		assert!(!PackageDescriptor::new("A", VersionBounds::MinOnly(v("2.0"))).matches_package(&b));
	}

	#[test]
	fn any_of_matches_any_branch() {
		let b = package(serde_json::json!({"identifier": "B", "version": "1.0"}));
		let rel = Relationship::AnyOf(vec![PackageDescriptor::any("A"), PackageDescriptor::any("B")]);
		assert!(rel.matches_any([&b], &no_dlls(), &no_dlc()));
		assert!(rel.contains_any(["B"].into_iter()));
	}

	#[test] fn relationship_display() { assert_eq!(Relationship::AnyOf(vec![PackageDescriptor::any("A"), PackageDescriptor::new("B", VersionBounds::MinOnly(v("1.0")))]).to_string(), "A OR B 1.0 or later") }
	#[test] fn identifier_display() { assert_eq!(PackageIdentifier::new("A", v("1.0")).to_string(), "A 1.0") }
}

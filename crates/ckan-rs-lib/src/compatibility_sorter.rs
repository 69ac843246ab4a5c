//! Splits the catalog into what can and can't be installed on a set of game versions.
//!
//! A package is compatible when one of its versions supports the game versions
//! and every one of that version's depends can be met by something else compatible.
//!
//! Dependency cycles are treated as satisfied: while a package is being checked, any
//! dependency back onto it counts as met. This over-approximates compatibility for
//! cycles whose members turn out incompatible for another reason, the resolver catches those.

use std::collections::{BTreeMap, BTreeSet};

use dashmap::DashMap;
use rayon::prelude::*;

use crate::available_package::AvailablePackage;
use crate::iterator::GameVersionMatchesExt;
use crate::package::*;
use crate::registry::{DlcVersions, Registry};

pub struct CompatibilitySorter<'r> {
	registry: &'r Registry,
	criteria: GameVersionRange,
	stability_tolerance: ReleaseStatus,
	dlls: BTreeSet<String>,
	dlc: DlcVersions,
	compatible: BTreeMap<String, &'r AvailablePackage>,
	incompatible: BTreeMap<String, &'r AvailablePackage>,
}

impl<'r> CompatibilitySorter<'r> {
	/// Sorts the registry's catalog, any release status is accepted.
	pub fn new(registry: &'r Registry, criteria: GameVersionRange) -> Self {
		Self::with_stability_tolerance(registry, criteria, ReleaseStatus::Development)
	}

	/// Sorts the registry's catalog, only versions at least as stable as `stability_tolerance` count.
	pub fn with_stability_tolerance(registry: &'r Registry, criteria: GameVersionRange, stability_tolerance: ReleaseStatus) -> Self {
		let mut sorter = Self {
			registry,
			criteria,
			stability_tolerance,
			dlls: registry.installed_dlls(),
			dlc: registry.installed_dlc(),
			compatible: BTreeMap::new(),
			incompatible: BTreeMap::new(),
		};
		sorter.partition();
		sorter
	}

	fn compatible_versions<'a>(&self, available: &'a AvailablePackage) -> impl Iterator<Item = &'a Package> {
		let tolerance = self.stability_tolerance;
		available.all_available()
			.game_version_matches(self.criteria)
			.filter(move |p| p.release_status <= tolerance)
	}

	fn partition(&mut self) {
		log::debug!("Sorting {} packages for compatibility with {}", self.registry.available_packages().len(), self.criteria);

		let compatible = DashMap::new();
		let incompatible = DashMap::new();
		let indeterminate = DashMap::new();

		let sorter = &*self;
		sorter.registry.available_packages().par_iter().for_each(|(identifier, available)| {
			if sorter.compatible_versions(available).next().is_none() {
				incompatible.entry(identifier.clone()).or_insert(available);
			} else if available.all_available().all(|p| p.depends.is_empty()) {
				compatible.entry(identifier.clone()).or_insert(available);
			} else {
				indeterminate.entry(identifier.clone()).or_insert(available);
			}
		});

		self.compatible = compatible.into_iter().collect();
		self.incompatible = incompatible.into_iter().collect();
		let mut indeterminate = indeterminate.into_iter().collect::<BTreeMap<_, _>>();

		while let Some(identifier) = indeterminate.keys().next().cloned() {
			let mut investigating = Vec::new();
			self.check_depends(&identifier, &mut investigating, &mut indeterminate);
		}

		log::debug!("{} compatible, {} incompatible", self.compatible.len(), self.incompatible.len());
	}

	/// Moves `identifier` from `indeterminate` into compatible or incompatible, recursing into its dependencies as needed.
	fn check_depends(&mut self, identifier: &str, investigating: &mut Vec<String>, indeterminate: &mut BTreeMap<String, &'r AvailablePackage>) {
		let Some(available) = indeterminate.get(identifier).copied() else { return };
		investigating.push(identifier.to_string());

		let found = self.compatible_versions(available).collect::<Vec<_>>().into_iter().any(|package| {
			package.depends.iter().all(|rel| self.relationship_satisfiable(rel, investigating, indeterminate))
		});

		indeterminate.remove(identifier);
		investigating.pop();
		if found {
			log::trace!("{} is compatible", identifier);
			self.compatible.insert(identifier.to_string(), available);
		} else {
			log::trace!("{} is incompatible, a dependency can't be met", identifier);
			self.incompatible.insert(identifier.to_string(), available);
		}
	}

	fn relationship_satisfiable(&mut self, rel: &Relationship, investigating: &mut Vec<String>, indeterminate: &mut BTreeMap<String, &'r AvailablePackage>) -> bool {
		if rel.matches_any(std::iter::empty::<&Package>(), &self.dlls, &self.dlc) {
			return true
		}

		for provider in self.candidates(rel) {
			let id = provider.identifier().to_string();
			if investigating.contains(&id) {
				return true
			}
			if indeterminate.contains_key(&id) {
				self.check_depends(&id, investigating, indeterminate);
			}
			if self.compatible.contains_key(&id) {
				return true
			}
		}
		false
	}

	/// Every identifier with a compatible version satisfying `rel`.
	fn candidates(&self, rel: &Relationship) -> Vec<&'r AvailablePackage> {
		let mut seen = BTreeSet::new();
		rel.names()
			.flat_map(|name| self.registry.all_available_by_provides(name))
			.filter(|available| seen.insert(available.identifier().to_string()))
			.filter(|available| self.compatible_versions(available).any(|p| rel.matches_package(p)))
			.collect()
	}

	pub fn criteria(&self) -> &GameVersionRange {
		&self.criteria
	}

	pub fn is_compatible(&self, identifier: &str) -> bool {
		self.compatible.contains_key(identifier)
	}

	pub fn compatible(&self) -> &BTreeMap<String, &'r AvailablePackage> {
		&self.compatible
	}

	pub fn incompatible(&self) -> &BTreeMap<String, &'r AvailablePackage> {
		&self.incompatible
	}

	/// The newest compatible version of every compatible identifier.
	pub fn latest_compatible(&self) -> Vec<&'r Package> {
		self.compatible.values()
			.filter_map(|&a| self.compatible_versions(a).next())
			.collect()
	}

	/// The newest version of every incompatible identifier.
	pub fn latest_incompatible(&self) -> Vec<&'r Package> {
		self.incompatible.values().filter_map(|a| a.all_available().next()).collect()
	}
}

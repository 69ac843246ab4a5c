//! Turns requirements into a consistent set of packages to install.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use super::dependency_graph::DependencyGraph;
use super::*;
use crate::available_package::LatestFilter;
use crate::iterator::PackageVersionMatchesExt;
use crate::registry::{DlcVersions, Registry};

/// A package waiting for its relationships to be resolved.
struct QueueEntry<'r> {
	package: &'r Package,
	options: RelationshipResolverOptions,
	/// The stanza that pulled this package in, used to pick between providers.
	parent_stanza: Option<&'r [Relationship]>,
}

/// Memory for [`RelationshipResolver::might_be_installable`], kept for a whole resolve.
#[derive(Debug, Default)]
struct InstallableSearch<'r> {
	/// Identifiers being checked further up the dependency chain.
	investigating: Vec<&'r str>,
	/// Times a dependency back on one of `investigating` was assumed installable.
	assumptions: usize,
	known: HashMap<&'r PackageIdentifier, bool>,
}

/// RelationshipResolver will take a list of top level requirements and generate a list of required packages.
///
/// # Process
/// 1. Every requirement is turned into a package and checked for conflicts against each other and the installed packages.
/// 1. Packages are taken from a queue, oldest first, and their depends, recommends and suggests resolved.
/// Relationships already met by a selected or installed package are skipped,
/// anything else gets the latest compatible provider which is queued in turn.
/// 1. The selected packages together with the installed ones are checked for consistency.
///
/// ## Failures
/// - [`PackageNotFound`](crate::Error::PackageNotFound) when nothing anywhere has a requested identifier.
/// - [`DependencyNotSatisfied`](crate::Error::DependencyNotSatisfied) when it exists but no version fits.
/// - [`TooManyProviders`](crate::Error::TooManyProviders) when a choice has to be made, see [`RelationshipResolver::add_decision`].
/// - [`Inconsistent`](crate::Error::Inconsistent) for conflicts, listing every one found.
#[derive(Debug)]
pub struct RelationshipResolver<'r> {
	registry: &'r Registry,
	criteria: GameVersionRange,
	options: RelationshipResolverOptions,
	stability_tolerance: ReleaseStatus,
	requirements: Vec<InstallRequirement>,

	/// Tells the resolver which package to chose when faced with a decision
	decisions: BTreeSet<String>,

	/// Installed packages not being removed.
	installed: Vec<&'r Package>,
	dlls: BTreeSet<String>,
	dlc: DlcVersions,

	/// Identifiers and provided aliases of selected packages.
	selected: BTreeMap<String, &'r Package>,
	/// Selected packages in the order they were added, metapackages excluded.
	packages: Vec<&'r Package>,
	reasons: BTreeMap<String, SelectionReason>,
	conflicts: Vec<(PackageIdentifier, PackageIdentifier)>,
	/// Contradictions found while resolving, reported together once the queue is empty.
	inconsistencies: Vec<String>,
	installable: InstallableSearch<'r>,
}

impl<'r> RelationshipResolver<'r> {
	/// Creates a new `RelationshipResolver`, use a [`ResolverBuilder`] instead.
	///
	/// # Arguments
	/// - `registry`: the catalog to select from and the installed state to resolve against.
	/// - `criteria`: Packages for these versions of the game can be installed.
	/// - `removing`: installed identifiers to treat as already removed.
	pub(super) fn new(
		registry: &'r Registry,
		criteria: GameVersionRange,
		options: RelationshipResolverOptions,
		stability_tolerance: ReleaseStatus,
		requirements: Vec<InstallRequirement>,
		removing: &BTreeSet<String>,
	) -> Self {
		let installed = registry.installed_packages()
			.map(|i| i.package())
			.filter(|p| !removing.contains(&p.identifier.identifier))
			.collect::<Vec<_>>();
		let reasons = installed.iter()
			.map(|p| (p.identifier.identifier.clone(), SelectionReason::Installed))
			.collect();

		Self {
			registry,
			criteria,
			options,
			stability_tolerance,
			requirements,
			decisions: Default::default(),
			installed,
			dlls: registry.installed_dlls().into_iter().filter(|d| !removing.contains(d)).collect(),
			dlc: registry.installed_dlc().into_iter().filter(|(d, _)| !removing.contains(d)).collect(),
			selected: Default::default(),
			packages: Default::default(),
			reasons,
			conflicts: Default::default(),
			inconsistencies: Default::default(),
			installable: Default::default(),
		}
	}

	/// Adds an identifer to be selected when present in a decisions options.
	pub fn add_decision(&mut self, identifier: &str) {
		self.decisions.insert(identifier.to_owned());
	}

	/// Runs the resolve.
	///
	/// # Errors
	/// See [`RelationshipResolver`] for the failures.
	pub fn resolve(mut self) -> crate::Result<Resolution<'r>> {
		log::info!("Resolving {} requirements for {}", self.requirements.len(), self.criteria);

		let requirements = std::mem::take(&mut self.requirements);
		let mut requested = Vec::with_capacity(requirements.len());
		for requirement in &requirements {
			requested.push(self.package_for_requirement(requirement)?);
		}

		/* Requested packages must be selected before anything else, they may provide virtual identifiers other packages depend on */
		let mut inconsistencies = Vec::new();
		for package in requested.iter().copied() {
			if let Some(existing) = self.selected.get(&package.identifier.identifier) {
				if existing.identifier != package.identifier {
					inconsistencies.push(format!("{} and {} were both requested", existing.identifier, package.identifier));
				}
				continue
			}

			let conflicting = self.fixed_packages()
				.filter(|listed| listed.conflicts_with(package))
				.collect::<Vec<_>>();
			for listed in conflicting {
				if self.options.proceed_with_inconsistencies {
					self.conflicts.push((listed.identifier.clone(), package.identifier.clone()));
				} else {
					inconsistencies.push(format!("{} conflicts with {}, can't install both.", package.identifier, listed.identifier));
				}
			}
			self.add(package, SelectionReason::UserRequested);
		}
		if !inconsistencies.is_empty() {
			return Err(crate::Error::Inconsistent(inconsistencies))
		}

		let mut queue = requested.iter()
			.map(|&package| QueueEntry { package, options: self.options, parent_stanza: None })
			.collect::<VecDeque<_>>();
		while let Some(entry) = queue.pop_front() {
			self.resolve_package(entry, &mut queue)?;
		}
		if !self.inconsistencies.is_empty() {
			return Err(crate::Error::Inconsistent(std::mem::take(&mut self.inconsistencies)))
		}

		let replaced = self.packages.iter().map(|p| p.identifier.identifier.as_str()).collect::<BTreeSet<_>>();
		if !self.options.without_enforce_consistency {
			let final_packages = self.packages.iter().copied()
				.chain(self.installed.iter().copied().filter(|p| !replaced.contains(p.identifier.identifier.as_str())))
				.collect::<Vec<_>>();
			crate::sanity_checker::enforce(&final_packages, &self.dlls, &self.dlc)?;
		}

		let install_order = DependencyGraph::new(&self.packages, &self.selected).install_order();
		log::info!("Resolved {} packages to install", install_order.len());
		Ok(Resolution::new(self.packages, install_order, self.reasons, self.conflicts))
	}

	/// Selected packages and installed packages, the ones every new candidate has to get along with.
	fn fixed_packages(&self) -> impl Iterator<Item = &'r Package> + '_ {
		let mut seen = BTreeSet::new();
		self.selected.values().copied()
			.chain(self.installed.iter().copied())
			.filter(move |&p| seen.insert(&p.identifier))
	}

	/// Finds the package a requirement asks for.
	///
	/// A pinned version is taken as is, otherwise the latest compatible version.
	/// An installed package meeting the requirement is used when the catalog has nothing compatible.
	fn package_for_requirement(&self, requirement: &InstallRequirement) -> crate::Result<&'r Package> {
		let identifier = &requirement.identifier;
		let installed = self.installed.iter().copied()
			.filter(|p| &p.identifier.identifier == identifier)
			.package_version_matches(requirement.required_version.clone())
			.next();

		let Some(available) = self.registry.available(identifier) else {
			return installed.ok_or_else(|| crate::Error::PackageNotFound {
				identifier: identifier.clone(),
				version: match &requirement.required_version {
					VersionBounds::Any => None,
					bounds => Some(bounds.to_string()),
				},
			})
		};

		if let VersionBounds::Explicit(version) = &requirement.required_version {
			return available.by_version(version).ok_or_else(|| crate::Error::PackageNotFound {
				identifier: identifier.clone(),
				version: Some(version.to_string()),
			})
		}

		let relationship = requirement.as_relationship();
		available.latest_with(LatestFilter {
			criteria: Some(&self.criteria),
			relationship: Some(&relationship),
			stability_tolerance: Some(self.stability_tolerance),
			..Default::default()
		})
			.or(installed)
			.ok_or_else(|| crate::Error::DependencyNotSatisfied {
				parent: None,
				relationship: relationship.to_string(),
			})
	}

	/// Resolves all relationships of one package.
	fn resolve_package(&mut self, entry: QueueEntry<'r>, queue: &mut VecDeque<QueueEntry<'r>>) -> crate::Result<()> {
		let QueueEntry { package, options, parent_stanza } = entry;
		let parent = &package.identifier.identifier;

		/* Suggestions of the requested packages can be followed, suggestions of those are only followed with `with_all_suggests` */
		let sub_options = RelationshipResolverOptions { with_suggests: false, ..options };

		log::debug!("Resolving dependencies for {}", package.identifier);
		self.resolve_stanza(&package.depends, SelectionReason::Depends(parent.clone()), sub_options, false, parent_stanza, queue)?;

		if options.with_recommends {
			log::debug!("Resolving recommends for {}", package.identifier);
			self.resolve_stanza(&package.recommends, SelectionReason::Recommended(parent.clone()), sub_options, true, parent_stanza, queue)?;
		}

		if options.with_suggests || options.with_all_suggests {
			log::debug!("Resolving suggests for {}", package.identifier);
			self.resolve_stanza(&package.suggests, SelectionReason::Suggested(parent.clone()), sub_options, true, parent_stanza, queue)?;
		}
		Ok(())
	}

	/// Resolves a list of relationships, selecting and queueing a package for each one not yet met.
	///
	/// `soft` relationships that can't be met are skipped instead of failing the resolve.
	fn resolve_stanza(
		&mut self,
		stanza: &'r [Relationship],
		reason: SelectionReason,
		options: RelationshipResolverOptions,
		soft: bool,
		parent_stanza: Option<&'r [Relationship]>,
		queue: &mut VecDeque<QueueEntry<'r>>,
	) -> crate::Result<()> {
		let parent = reason.parent().unwrap_or_default().to_string();

		for rel in stanza {
			log::trace!("Considering {}", rel);

			/* Already covered by a selected package */
			let selected = rel.names().filter_map(|n| self.selected.get(n).copied()).collect::<Vec<_>>();
			if rel.matches_any(selected.iter().copied(), &BTreeSet::new(), &BTreeMap::new()) {
				continue
			}
			if !selected.is_empty() && selected.len() == rel.names().count() {
				/* XXX: A selected package could be swapped for a version satisfying both, we don't try */
				let existing = selected[0];
				if soft {
					continue
				} else if options.proceed_with_inconsistencies {
					self.record_conflict(existing, &parent);
					continue
				}
				self.inconsistent(format!("{} requires {}, but {} is already selected", parent, rel, existing.identifier));
				continue
			}

			/* Already installed */
			if rel.matches_any(self.installed.iter().copied(), &self.dlls, &self.dlc) {
				continue
			}

			let candidates = self.candidates(rel);
			let candidate = match candidates.len() {
				0 if soft => {
					log::info!("{} of {} can't be found or isn't compatible, skipping", rel, parent);
					continue
				},
				0 => return Err(self.unsatisfiable(rel, &parent)),
				1 => candidates[0],
				_ => match self.choose_candidate(rel, &candidates, parent_stanza, options) {
					Some(c) => c,
					None if options.without_toomanyprovides_kraken => continue,
					None => return Err(crate::Error::TooManyProviders {
						requested: rel.names().collect::<Vec<_>>().join(" or "),
						candidates: candidates.iter().map(|c| c.identifier.clone()).collect(),
					}),
				},
			};

			/* Check the candidate against everything which might object to it being installed */
			let conflicting = self.fixed_packages()
				.filter(|fixed| fixed.conflicts_with(candidate))
				.collect::<Vec<_>>();
			if conflicting.is_empty() {
				self.add(candidate, reason.clone());
				queue.push_back(QueueEntry { package: candidate, options, parent_stanza: Some(stanza) });
			} else if soft {
				log::info!("{} would conflict with {}, excluding it from consideration", candidate.identifier, conflicting[0].identifier);
			} else if options.proceed_with_inconsistencies {
				self.add(candidate, reason.clone());
				for fixed in conflicting {
					self.conflicts.push((fixed.identifier.clone(), candidate.identifier.clone()));
				}
				queue.push_back(QueueEntry { package: candidate, options, parent_stanza: Some(stanza) });
			} else {
				/* The candidate stays unselected, the rest of the queue is still resolved to find every contradiction */
				for fixed in conflicting {
					self.inconsistent(format!("{} conflicts with {}, can't install both.", fixed.identifier, candidate.identifier));
				}
			}
		}
		Ok(())
	}

	fn inconsistent(&mut self, message: String) {
		if !self.inconsistencies.contains(&message) {
			log::debug!("{}", message);
			self.inconsistencies.push(message);
		}
	}

	/// The latest compatible provider of each identifier `rel` names, filtered by the version bounds.
	fn candidates(&mut self, rel: &Relationship) -> Vec<&'r Package> {
		let mut search = std::mem::take(&mut self.installable);
		let mut seen = BTreeSet::new();
		let mut candidates = Vec::new();
		for descriptor in rel.descriptors() {
			let single = Relationship::One(descriptor.clone());
			let filter = LatestFilter {
				criteria: Some(&self.criteria),
				relationship: Some(&single),
				stability_tolerance: Some(self.stability_tolerance),
				..Default::default()
			};
			for package in self.registry.latest_providers(&descriptor.name, filter) {
				if seen.insert(&package.identifier.identifier) && self.might_be_installable(package, &mut search) {
					candidates.push(package);
				}
			}
		}
		self.installable = search;
		candidates
	}

	/// Picks between several candidates.
	///
	/// In order of preference
	/// 1. a candidate the caller decided on.
	/// 1. a real package with the identifier asked for, over packages providing it.
	/// 1. the single candidate the parent's stanza also names.
	fn choose_candidate(&self, rel: &Relationship, candidates: &[&'r Package], parent_stanza: Option<&[Relationship]>, options: RelationshipResolverOptions) -> Option<&'r Package> {
		if let Some(decided) = candidates.iter().find(|c| self.decisions.contains(&c.identifier.identifier)) {
			return Some(*decided)
		}

		let mut named = candidates.iter().filter(|c| rel.names().any(|n| n == c.identifier.identifier));
		if let (Some(real), None) = (named.next(), named.next()) {
			return Some(*real)
		}

		if options.without_toomanyprovides_kraken {
			return None
		}

		let stanza = parent_stanza?;
		let mut provided = candidates.iter().filter(|c| stanza.iter().any(|r| r.names().any(|n| n == c.identifier.identifier)));
		match (provided.next(), provided.next()) {
			(Some(only), None) => Some(*only),
			_ => None,
		}
	}

	fn unsatisfiable(&self, rel: &Relationship, parent: &str) -> crate::Error {
		let known = rel.names().any(|n| !self.registry.all_available_by_provides(n).is_empty());
		if known {
			crate::Error::DependencyNotSatisfied {
				parent: Some(parent.to_string()),
				relationship: rel.to_string(),
			}
		} else {
			log::error!("Dependency on {} found but it is not listed in the index", rel);
			crate::Error::PackageNotFound {
				identifier: rel.names().collect::<Vec<_>>().join(" or "),
				version: None,
			}
		}
	}

	/// Checks that every depends of `package` has at least one compatible package that might be installable in turn.
	///
	/// A dependency back on a package being checked further up is assumed installable.
	/// Answers that didn't rest on such an assumption are remembered, so shared dependencies are only checked once.
	fn might_be_installable(&self, package: &'r Package, search: &mut InstallableSearch<'r>) -> bool {
		let identifier = package.identifier.identifier.as_str();
		if package.depends.is_empty() {
			return true
		}
		if search.investigating.contains(&identifier) {
			search.assumptions += 1;
			return true
		}
		if let Some(&known) = search.known.get(&package.identifier) {
			return known
		}

		let assumptions = search.assumptions;
		search.investigating.push(identifier);
		let installable = package.depends.iter().all(|rel| {
			rel.matches_any(self.installed.iter().copied(), &self.dlls, &self.dlc)
			|| rel.names().any(|name| {
				self.registry.latest_available_with_provides(name, Some(&self.criteria), Some(rel))
					.into_iter()
					.any(|p| self.might_be_installable(p, search))
			})
		});
		search.investigating.pop();

		/* Assuming more is installable can only turn answers true, so a false answer always holds */
		if !installable || search.assumptions == assumptions {
			search.known.insert(&package.identifier, installable);
		}
		installable
	}

	/// Adds `package` to the selection along with the aliases it provides.
	///
	/// Metapackages aren't installed, only their relationships are resolved.
	fn add(&mut self, package: &'r Package, reason: SelectionReason) {
		self.reasons.entry(package.identifier.identifier.clone()).or_insert(reason);
		if package.is_metapackage() {
			return
		}

		log::debug!("Adding {}", package.identifier);
		self.packages.push(package);
		self.selected.insert(package.identifier.identifier.clone(), package);
		for alias in &package.provides {
			self.selected.entry(alias.clone()).or_insert(package);
		}
	}

	fn record_conflict(&mut self, existing: &Package, parent: &str) {
		let parent = self.selected.get(parent).map(|p| p.identifier.clone())
			.or_else(|| self.installed.iter().find(|p| p.identifier.identifier == parent).map(|p| p.identifier.clone()));
		if let Some(parent) = parent {
			self.conflicts.push((existing.identifier.clone(), parent));
		}
	}
}

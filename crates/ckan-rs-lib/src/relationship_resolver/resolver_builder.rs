use std::collections::BTreeSet;

use super::{InstallRequirement, RelationshipResolver, RelationshipResolverOptions};
use crate::package::*;
use crate::registry::Registry;

pub struct ResolverBuilder<'r> {
	registry: &'r Registry,
	criteria: GameVersionRange,
	options: RelationshipResolverOptions,
	stability_tolerance: ReleaseStatus,

	requirements: Vec<InstallRequirement>,
	removing: BTreeSet<String>,
	decisions: BTreeSet<String>,
}

impl<'r> ResolverBuilder<'r> {
	pub fn new(registry: &'r Registry) -> Self {
		Self {
			registry,
			criteria: GameVersionRange::ANY,
			options: Default::default(),
			stability_tolerance: ReleaseStatus::Development,
			requirements: Default::default(),
			removing: Default::default(),
			decisions: Default::default(),
		}
	}

	/// Takes the resolver options and stability tolerance from `config`.
	pub fn config(mut self, config: &crate::config::Config) -> Self {
		self.options = *config.resolver_options();
		self.stability_tolerance = config.stability_tolerance();
		self
	}

	pub fn add_package_requirements(mut self, requirements: impl IntoIterator<Item = InstallRequirement>) -> Self {
		for requirement in requirements {
			self.requirements.push(requirement);
		}
		self
	}

	/// Adds requirements written as `Identifier` or `Identifier=version`.
	///
	/// # Errors
	/// See [`InstallRequirement::parse`].
	pub fn add_requirement_strings<S: AsRef<str>>(self, requirements: impl IntoIterator<Item = S>) -> crate::Result<Self> {
		let requirements = requirements.into_iter()
			.map(|r| InstallRequirement::parse(r.as_ref()))
			.collect::<crate::Result<Vec<_>>>()?;
		Ok(self.add_package_requirements(requirements))
	}

	/// Installed packages that will be removed, they no longer satisfy or conflict with anything.
	pub fn remove_packages(mut self, identifiers: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.removing.extend(identifiers.into_iter().map(Into::into));
		self
	}

	/// Only packages supporting one of these game versions can be installed.
	pub fn compatible_game_versions(mut self, criteria: GameVersionRange) -> Self {
		self.criteria = criteria;
		self
	}

	pub fn options(mut self, options: RelationshipResolverOptions) -> Self {
		self.options = options;
		self
	}

	pub fn stability_tolerance(mut self, stability_tolerance: ReleaseStatus) -> Self {
		self.stability_tolerance = stability_tolerance;
		self
	}

	/// Identifiers to pick when several packages could satisfy a relationship.
	pub fn add_decisions(mut self, identifiers: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.decisions.extend(identifiers.into_iter().map(Into::into));
		self
	}

	pub fn build(self) -> RelationshipResolver<'r> {
		let mut resolver = RelationshipResolver::new(
			self.registry,
			self.criteria,
			self.options,
			self.stability_tolerance,
			self.requirements,
			&self.removing,
		);
		for decision in &self.decisions {
			resolver.add_decision(decision);
		}
		resolver
	}
}

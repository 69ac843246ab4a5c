//! The result of a completed resolve.

use std::collections::{BTreeMap, BTreeSet};

use super::SelectionReason;
use crate::package::*;

#[derive(Debug, Clone)]
pub struct Resolution<'r> {
	/// Every new package in the order it was selected.
	packages: Vec<&'r Package>,
	install_order: Vec<&'r Package>,
	reasons: BTreeMap<String, SelectionReason>,
	conflicts: Vec<(PackageIdentifier, PackageIdentifier)>,
}

impl<'r> Resolution<'r> {
	pub(super) fn new(
		packages: Vec<&'r Package>,
		install_order: Vec<&'r Package>,
		reasons: BTreeMap<String, SelectionReason>,
		conflicts: Vec<(PackageIdentifier, PackageIdentifier)>,
	) -> Self {
		Self {
			packages,
			install_order,
			reasons,
			conflicts,
		}
	}

	/// Every package to install, in the order they were selected.
	pub fn packages(&self) -> &[&'r Package] {
		&self.packages
	}

	/// Every package to install, each after the packages it depends on.
	pub fn install_order(&self) -> &[&'r Package] {
		&self.install_order
	}

	pub fn contains(&self, identifier: &str) -> bool {
		self.packages.iter().any(|p| p.identifier.identifier == identifier)
	}

	/// Why `identifier` is part of the resolution, installed packages included.
	pub fn reason_for(&self, identifier: &str) -> Option<&SelectionReason> {
		self.reasons.get(identifier)
	}

	/// Explains the whole chain of reasons from `identifier` back to a user request or an installed package,
	/// one reason per line.
	pub fn reason_string_for(&self, identifier: &str) -> String {
		let mut lines = Vec::new();
		let mut seen = BTreeSet::new();
		let mut current = identifier;
		while let Some(reason) = self.reasons.get(current) {
			lines.push(format!("  {}", reason));
			match reason.parent() {
				Some(parent) if seen.insert(current) => current = parent,
				_ => break,
			}
		}
		lines.join("\n")
	}

	/// Pairs of packages that can't be installed together.
	///
	/// Only filled when resolving with `proceed_with_inconsistencies`.
	pub fn conflicts(&self) -> &[(PackageIdentifier, PackageIdentifier)] {
		&self.conflicts
	}

	/// A description of each conflict, keyed by both identifiers involved.
	pub fn conflict_descriptions(&self) -> BTreeMap<String, String> {
		let mut descriptions = BTreeMap::new();
		for (lhs, rhs) in &self.conflicts {
			for (a, b) in [(lhs, rhs), (rhs, lhs)] {
				descriptions.insert(a.identifier.clone(), format!(
					"{} conflicts with {}\n\n{}:\n{}\n{}:\n{}",
					a.identifier, b.identifier,
					a.identifier, self.reason_string_for(&a.identifier),
					b.identifier, self.reason_string_for(&b.identifier),
				));
			}
		}
		descriptions
	}

	pub fn is_consistent(&self) -> bool {
		self.conflicts.is_empty()
	}
}

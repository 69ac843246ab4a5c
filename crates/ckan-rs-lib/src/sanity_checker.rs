//! Consistency checks over a set of packages that would be installed together.
//!
//! A set is consistent when every depends is met by the set, a DLL or a DLC,
//! and no two packages in it conflict.

use std::collections::BTreeSet;

use crate::package::*;
use crate::registry::DlcVersions;

/// Every depends in `packages` nothing in the set satisfies, paired with the package declaring it.
pub fn find_unsatisfied_depends<'a>(packages: &[&'a Package], dlls: &BTreeSet<String>, dlc: &DlcVersions) -> Vec<(&'a Package, &'a Relationship)> {
	let mut unsatisfied = Vec::new();
	for package in packages {
		for rel in &package.depends {
			if !rel.matches_any(packages.iter().copied(), dlls, dlc) {
				unsatisfied.push((*package, rel));
			}
		}
	}
	unsatisfied
}

/// Every pair of packages in `packages` where the first conflicts with the second.
///
/// A package never conflicts with itself or another version of itself.
pub fn find_conflicting<'a>(packages: &[&'a Package], dlls: &BTreeSet<String>, dlc: &DlcVersions) -> Vec<(&'a Package, &'a Relationship)> {
	let mut conflicts = Vec::new();
	for package in packages {
		let others = packages.iter().copied()
			.filter(|o| o.identifier.identifier != package.identifier.identifier)
			.collect::<Vec<_>>();
		for rel in &package.conflicts {
			if rel.matches_any(others.iter().copied(), dlls, dlc) {
				conflicts.push((*package, rel));
			}
		}
	}
	conflicts
}

/// # Errors
/// [`Inconsistent`](crate::Error::Inconsistent) listing every unmet depends and every conflict.
pub fn check(packages: &[&Package], dlls: &BTreeSet<String>, dlc: &DlcVersions) -> crate::Result<()> {
	let mut problems = find_unsatisfied_depends(packages, dlls, dlc).into_iter()
		.map(|(package, rel)| format!("{} has an unsatisfied dependency: {}", package.identifier, rel))
		.collect::<Vec<_>>();
	problems.extend(find_conflicting(packages, dlls, dlc).into_iter()
		.map(|(package, rel)| format!("{} conflicts with {}", package.identifier, rel)));

	if problems.is_empty() {
		Ok(())
	} else {
		log::debug!("{} consistency problems found", problems.len());
		Err(crate::Error::Inconsistent(problems))
	}
}

pub fn is_consistent(packages: &[&Package], dlls: &BTreeSet<String>, dlc: &DlcVersions) -> bool {
	check(packages, dlls, dlc).is_ok()
}

/// Same as [`check`], named for callers that refuse to continue with an inconsistent set.
pub fn enforce(packages: &[&Package], dlls: &BTreeSet<String>, dlc: &DlcVersions) -> crate::Result<()> {
	check(packages, dlls, dlc)
}

#[cfg(test)]
mod test {
	use super::*;
	use serde_json::json;

	fn package(json: serde_json::Value) -> Package { Package::read_from_json(json).unwrap() }
	fn none() -> (BTreeSet<String>, DlcVersions) { (BTreeSet::new(), DlcVersions::new()) }

	#[test]
	fn empty_set_is_consistent() {
		let (dlls, dlc) = none();
		assert!(is_consistent(&[], &dlls, &dlc));
	}

	#[test]
	fn every_problem_is_reported() {
		let a = package(json!({"identifier": "A", "version": "1", "depends": [{"name": "Missing"}, {"name": "AlsoMissing"}]}));
		let b = package(json!({"identifier": "B", "version": "1", "conflicts": [{"name": "A"}]}));
		let (dlls, dlc) = none();
		match check(&[&a, &b], &dlls, &dlc) {
			Err(crate::Error::Inconsistent(problems)) => assert_eq!(problems.len(), 3),
			other => panic!("expected inconsistency, got {:?}", other),
		}
	}

	#[test]
	fn provides_satisfy_depends() {
		let a = package(json!({"identifier": "A", "version": "1", "depends": [{"name": "Virtual"}]}));
		let b = package(json!({"identifier": "B", "version": "1", "provides": ["Virtual"]}));
		let (dlls, dlc) = none();
		assert!(find_unsatisfied_depends(&[&a, &b], &dlls, &dlc).is_empty());
	}

	#[test]
	fn dlc_version_is_checked() {
		let a = package(json!({"identifier": "A", "version": "1", "depends": [{"name": "MakingHistory-DLC", "min_version": "1.2"}]}));
		let dlls = BTreeSet::new();
		let old = DlcVersions::from([("MakingHistory-DLC".to_string(), Some(PackageVersion::new("1.1").unwrap()))]);
		let unknown = DlcVersions::from([("MakingHistory-DLC".to_string(), None)]);
		assert!(!is_consistent(&[&a], &dlls, &old));
		assert!(is_consistent(&[&a], &dlls, &unknown));
	}

	#[test]
	fn self_conflicts_are_ignored() {
		let a = package(json!({"identifier": "A", "version": "1", "provides": ["Virtual"], "conflicts": [{"name": "Virtual"}]}));
		let (dlls, dlc) = none();
		assert!(find_conflicting(&[&a], &dlls, &dlc).is_empty());
	}

	#[test]
	fn conflicting_dll_is_reported() {
		let a = package(json!({"identifier": "A", "version": "1", "conflicts": [{"name": "Old"}]}));
		let dlls = BTreeSet::from(["Old".to_string()]);
		assert_eq!(find_conflicting(&[&a], &dlls, &DlcVersions::new()).len(), 1);
	}
}

//! Working out what else has to go when packages are removed.

use std::collections::BTreeSet;

use crate::installed_package::InstalledPackage;
use crate::package::*;
use crate::registry::DlcVersions;

/// Relationships this returns `true` for are treated as satisfied.
pub type SatisfiedFilter<'f> = &'f dyn Fn(&Package, &Relationship) -> bool;

/// Finds every installed identifier left with an unmet depends once `to_remove` is gone and `to_install` is in place.
///
/// The result includes `to_remove` and grows until removing it breaks nothing further.
/// Installed packages sharing an identifier with something in `to_install` are treated as replaced.
pub fn find_reverse_dependencies(
	to_remove: &BTreeSet<String>,
	to_install: &[&Package],
	installed: &[&Package],
	dlls: &BTreeSet<String>,
	dlc: &DlcVersions,
	satisfied_filter: Option<SatisfiedFilter<'_>>,
) -> BTreeSet<String> {
	if to_remove.is_empty() && to_install.is_empty() {
		return BTreeSet::new()
	}

	let installed_ids = installed.iter().map(|p| p.identifier.identifier.clone()).collect::<BTreeSet<_>>();
	let replaced = to_install.iter().map(|p| p.identifier.identifier.as_str()).collect::<BTreeSet<_>>();

	let mut removing = to_remove.clone();
	loop {
		let hypothetical = installed.iter().copied()
			.filter(|p| !removing.contains(&p.identifier.identifier) && !replaced.contains(p.identifier.identifier.as_str()))
			.chain(to_install.iter().copied())
			.collect::<Vec<_>>();
		let dlls = dlls.difference(&removing).cloned().collect::<BTreeSet<_>>();
		let dlc = dlc.iter()
			.filter(|(id, _)| !removing.contains(*id))
			.map(|(id, v)| (id.clone(), v.clone()))
			.collect::<DlcVersions>();

		let broken = crate::sanity_checker::find_unsatisfied_depends(&hypothetical, &dlls, &dlc)
			.into_iter()
			.filter(|(package, rel)| !satisfied_filter.is_some_and(|f| f(*package, *rel)))
			.map(|(package, _)| package.identifier.identifier.clone())
			.filter(|id| installed_ids.contains(id))
			.collect::<BTreeSet<_>>();

		if broken.is_subset(&removing) {
			log::debug!("Removing {:?} takes {:?} with it", to_remove, removing.difference(to_remove).collect::<Vec<_>>());
			return removing
		}
		removing.extend(broken);
	}
}

/// Auto-installed packages that nothing left behind would need once `removing` is gone.
///
/// A package is only returned when everything its removal would break is also auto-installed and returned.
pub fn find_removable_auto_installed<'a>(
	installed: &[&'a InstalledPackage],
	removing: &BTreeSet<String>,
	dlls: &BTreeSet<String>,
	dlc: &DlcVersions,
) -> Vec<&'a InstalledPackage> {
	let packages = installed.iter().map(|i| i.package()).collect::<Vec<_>>();
	let auto_installed = installed.iter()
		.filter(|i| i.auto_installed())
		.map(|i| i.identifier())
		.collect::<BTreeSet<_>>();
	let mut candidates = installed.iter().copied()
		.filter(|i| i.auto_installed() && !i.package().is_dlc() && !removing.contains(i.identifier()))
		.collect::<Vec<_>>();
	candidates.sort_by(|a, b| a.identifier().cmp(b.identifier()));

	let already_removed = find_reverse_dependencies(removing, &[], &packages, dlls, dlc, None);
	let mut accepted = BTreeSet::<String>::new();
	loop {
		let mut changed = false;
		for candidate in &candidates {
			if accepted.contains(candidate.identifier()) {
				continue
			}
			let mut trial = already_removed.union(&accepted).cloned().collect::<BTreeSet<_>>();
			trial.insert(candidate.identifier().to_string());

			let broken = find_reverse_dependencies(&trial, &[], &packages, dlls, dlc, None);
			if broken.difference(&already_removed).all(|id| auto_installed.contains(id.as_str())) {
				log::trace!("{} is no longer needed", candidate.identifier());
				accepted.insert(candidate.identifier().to_string());
				changed = true;
			}
		}
		if !changed {
			break
		}
	}

	candidates.into_iter().filter(|c| accepted.contains(c.identifier())).collect()
}

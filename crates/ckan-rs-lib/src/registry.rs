//! # The Registry
//!
//! The registry is the record of one game instance: every package the repositories offer,
//! every package installed along with the files it owns, and anything detected on disk the registry didn't install.
//!
//! The registry never touches the game directory itself. Installers tell it what they did through
//! [`Registry::register_package`] and [`Registry::deregister_package`], both of which validate
//! the whole change before applying any of it.
//!
//! File paths are always relative to the game directory and use `/` separators.

use std::collections::{BTreeMap, BTreeSet};

use serde::*;

use crate::available_package::{AvailablePackage, LatestFilter};
use crate::installed_package::InstalledPackage;
use crate::package::*;

mod repository;
pub use repository::Repository;

mod persistence;
pub use persistence::LATEST_REGISTRY_VERSION;

mod handle;
pub use handle::RegistryHandle;

/// Installed DLC by identifier, `None` when the version couldn't be detected.
pub type DlcVersions = BTreeMap<String, Option<PackageVersion>>;

#[derive(Debug, Clone, Serialize)]
pub struct Registry {
	registry_version: u32,
	repositories: BTreeMap<String, Repository>,
	#[serde(rename = "available_modules")]
	available_packages: BTreeMap<String, AvailablePackage>,
	#[serde(rename = "installed_modules")]
	installed_packages: BTreeMap<String, InstalledPackage>,
	/// Identifier to relative path.
	installed_dlls: BTreeMap<String, String>,
	/// Relative path to owning identifier.
	installed_files: BTreeMap<String, String>,
	/// Every identifier and the identifiers of the available packages providing it.
	#[serde(skip)]
	providers: BTreeMap<String, BTreeSet<String>>,
}

impl Default for Registry {
	fn default() -> Self {
		Self::new()
	}
}

/// Replaces `\` with `/`, directories keep a single trailing `/`.
pub(crate) fn normalize_path(path: &str) -> String {
	let normalized = path.replace('\\', "/");
	let trimmed = normalized.trim_end_matches('/');
	if trimmed.len() == normalized.len() || trimmed.is_empty() {
		normalized
	} else {
		format!("{}/", trimmed)
	}
}

/// Directories are listed by every package installing into them, so they're never indexed to an owner.
pub(crate) fn is_directory(path: &str) -> bool {
	path.ends_with('/')
}

/// Checks for absolute paths on any platform, a registry may have been written on another OS.
pub(crate) fn is_absolute_path(path: &str) -> bool {
	let bytes = path.as_bytes();
	let drive_letter = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
	path.starts_with('/') || path.starts_with('\\') || drive_letter || std::path::Path::new(path).is_absolute()
}

fn relative_path_required(path: &str) -> crate::Error {
	crate::Error::Path {
		path: path.into(),
		reason: "expected a path relative to the game directory".to_string(),
	}
}

impl Registry {
	/// An empty registry using the default repository.
	pub fn new() -> Self {
		let default_repository = Repository::default();
		Self {
			registry_version: LATEST_REGISTRY_VERSION,
			repositories: BTreeMap::from([(default_repository.name.clone(), default_repository)]),
			available_packages: BTreeMap::new(),
			installed_packages: BTreeMap::new(),
			installed_dlls: BTreeMap::new(),
			installed_files: BTreeMap::new(),
			providers: BTreeMap::new(),
		}
	}

	pub fn registry_version(&self) -> u32 {
		self.registry_version
	}

	/* Repositories */

	pub fn repositories(&self) -> &BTreeMap<String, Repository> {
		&self.repositories
	}

	pub fn set_repositories(&mut self, repositories: BTreeMap<String, Repository>) {
		self.repositories = repositories;
	}

	pub fn add_repository(&mut self, repository: Repository) {
		log::debug!("Adding repository {}", repository);
		self.repositories.insert(repository.name.clone(), repository);
	}

	pub fn remove_repository(&mut self, name: &str) -> Option<Repository> {
		self.repositories.remove(name)
	}

	pub fn clear_repositories(&mut self) {
		self.repositories.clear();
	}

	/* Available */

	/// Forgets every available package, used before reading a refreshed catalog.
	pub fn clear_available(&mut self) {
		self.available_packages.clear();
		self.providers.clear();
	}

	/// Records `package` as available, replacing an existing package with the same identifier and version.
	pub fn add_available(&mut self, package: Package) {
		let identifier = package.identifier.identifier.clone();
		for provided in package.provides_list() {
			self.providers.entry(provided.to_string()).or_default().insert(identifier.clone());
		}
		self.available_packages
			.entry(identifier.clone())
			.or_insert_with(|| AvailablePackage::new(identifier))
			.add(package);
	}

	/// Reads and adds every `.ckan` stanza in `stanzas`.
	///
	/// A stanza that fails to parse is skipped, the rest of the catalog is still added.
	/// Returns the errors for the skipped stanzas.
	pub fn add_available_from_json(&mut self, stanzas: impl IntoIterator<Item = serde_json::Value>) -> Vec<crate::Error> {
		let mut errors = Vec::new();
		for stanza in stanzas {
			let identifier = stanza.get("identifier").and_then(|i| i.as_str()).unwrap_or("<unknown>").to_string();
			match Package::read_from_json(stanza) {
				Ok(package) => self.add_available(package),
				Err(e) => {
					log::warn!("Skipping package {}: {}", identifier, e);
					errors.push(e);
				},
			}
		}
		errors
	}

	/// Removes a single version from the catalog.
	pub fn remove_available(&mut self, identifier: &str, version: &PackageVersion) -> Option<Package> {
		let available = self.available_packages.get_mut(identifier)?;
		let removed = available.remove(version);
		if available.is_empty() {
			self.available_packages.remove(identifier);
		}
		self.rebuild_providers();
		removed
	}

	pub(crate) fn rebuild_providers(&mut self) {
		let mut providers = BTreeMap::<String, BTreeSet<String>>::new();
		for (identifier, available) in &self.available_packages {
			for package in available.all_available() {
				for provided in package.provides_list() {
					providers.entry(provided.to_string()).or_default().insert(identifier.clone());
				}
			}
		}
		self.providers = providers;
	}

	pub fn available_packages(&self) -> &BTreeMap<String, AvailablePackage> {
		&self.available_packages
	}

	pub fn available(&self, identifier: &str) -> Option<&AvailablePackage> {
		self.available_packages.get(identifier)
	}

	fn get_available(&self, identifier: &str) -> crate::Result<&AvailablePackage> {
		self.available_packages.get(identifier).ok_or_else(|| crate::Error::PackageNotFound {
			identifier: identifier.to_string(),
			version: None,
		})
	}

	/// The newest version of `identifier` compatible with `criteria`.
	///
	/// # Errors
	/// [`PackageNotFound`](crate::Error::PackageNotFound) when nothing with that identifier is available.
	/// A known identifier with no compatible version gives `Ok(None)`.
	pub fn latest_available(&self, identifier: &str, criteria: Option<&GameVersionRange>) -> crate::Result<Option<&Package>> {
		Ok(self.get_available(identifier)?.latest(criteria, None))
	}

	/// Every version of `identifier`, newest first.
	///
	/// # Errors
	/// [`PackageNotFound`](crate::Error::PackageNotFound) when nothing with that identifier is available.
	pub fn available_by_identifier(&self, identifier: &str) -> crate::Result<Vec<&Package>> {
		Ok(self.get_available(identifier)?.all_available().collect())
	}

	pub fn get_package_by_version(&self, identifier: &str, version: &PackageVersion) -> Option<&Package> {
		self.available_packages.get(identifier)?.by_version(version)
	}

	/// Every available identifier with at least one version providing `identifier`, itself included.
	pub fn all_available_by_provides(&self, identifier: &str) -> Vec<&AvailablePackage> {
		self.providers.get(identifier)
			.map(|ids| ids.iter().filter_map(|id| self.available_packages.get(id)).collect())
			.unwrap_or_default()
	}

	/// The newest compatible version of each identifier providing `identifier`.
	pub fn latest_available_with_provides(&self, identifier: &str, criteria: Option<&GameVersionRange>, relationship: Option<&Relationship>) -> Vec<&Package> {
		self.latest_providers(identifier, LatestFilter { criteria, relationship, ..Default::default() })
	}

	/// Like [`Registry::latest_available_with_provides`] with every filter of [`LatestFilter`].
	pub fn latest_providers(&self, identifier: &str, filter: LatestFilter<'_>) -> Vec<&Package> {
		let provides = Relationship::One(PackageDescriptor::any(identifier));
		let filter = LatestFilter { relationship: Some(filter.relationship.unwrap_or(&provides)), ..filter };
		self.all_available_by_provides(identifier)
			.into_iter()
			.filter_map(|available| available.latest_with(filter))
			.filter(|package| package.does_provide(identifier))
			.collect()
	}

	/// The highest of `real_versions` any version of `identifier` supports.
	///
	/// # Errors
	/// [`PackageNotFound`](crate::Error::PackageNotFound) when nothing with that identifier is available.
	pub fn latest_compatible_game_version(&self, real_versions: &[GameVersion], identifier: &str) -> crate::Result<GameVersion> {
		Ok(self.get_available(identifier)?.latest_compatible_game_version(real_versions))
	}

	/// The newest compatible version of every installable identifier.
	pub fn compatible_packages(&self, criteria: &GameVersionRange) -> Vec<&Package> {
		crate::compatibility_sorter::CompatibilitySorter::new(self, *criteria).latest_compatible()
	}

	/// The newest version of every identifier that can't be installed on `criteria`.
	pub fn incompatible_packages(&self, criteria: &GameVersionRange) -> Vec<&Package> {
		crate::compatibility_sorter::CompatibilitySorter::new(self, *criteria).latest_incompatible()
	}

	/* Installed */

	/// Records `package` as installed along with the files it placed.
	///
	/// Paths ending in a separator are directories, which may be shared between packages.
	/// Any DLL entry for the package or one of its files is dropped.
	///
	/// # Errors
	/// - [`Path`](crate::Error::Path) when a path is absolute.
	/// - [`Inconsistent`](crate::Error::Inconsistent) listing every file another package already owns,
	/// or when the identifier is already installed.
	///
	/// Nothing is changed when an error is returned.
	pub fn register_package(&mut self, package: Package, files: impl IntoIterator<Item = impl AsRef<str>>, auto_installed: bool) -> crate::Result<&InstalledPackage> {
		let identifier = package.identifier.identifier.clone();
		log::info!("Registering package {}", package.identifier);

		let mut relative = BTreeSet::new();
		for file in files {
			let file = file.as_ref();
			if is_absolute_path(file) {
				return Err(relative_path_required(file));
			}
			relative.insert(normalize_path(file));
		}

		let mut inconsistencies = Vec::new();
		if self.installed_packages.contains_key(&identifier) {
			inconsistencies.push(format!("{} is already installed", identifier));
		}
		for file in relative.iter().filter(|f| !is_directory(f)) {
			if let Some(owner) = self.installed_files.get(file) {
				inconsistencies.push(format!("{} wishes to install {}, but this file is registered to {}", identifier, file, owner));
			}
		}
		if !inconsistencies.is_empty() {
			return Err(crate::Error::Inconsistent(inconsistencies));
		}

		for file in relative.iter().filter(|f| !is_directory(f)) {
			self.installed_files.insert(file.clone(), identifier.clone());
		}
		self.installed_dlls.retain(|dll, path| dll != &identifier && !relative.contains(&normalize_path(path)));

		Ok(self.installed_packages
			.entry(identifier)
			.or_insert(InstalledPackage::new(package, relative, auto_installed)))
	}

	/// Forgets an installed package.
	///
	/// Files must be forgotten first with [`Registry::remove_installed_file`] as they're deleted,
	/// directories may be left behind for other packages.
	///
	/// # Errors
	/// - [`PackageNotFound`](crate::Error::PackageNotFound) when `identifier` isn't installed.
	/// - [`Inconsistent`](crate::Error::Inconsistent) listing every file the package still owns.
	pub fn deregister_package(&mut self, identifier: &str) -> crate::Result<InstalledPackage> {
		log::info!("Deregistering package {}", identifier);
		let installed = self.installed_packages.get(identifier).ok_or_else(|| crate::Error::PackageNotFound {
			identifier: identifier.to_string(),
			version: None,
		})?;

		let remaining = installed.files().iter()
			.filter(|f| !is_directory(f))
			.map(|f| format!("{} from {} has not been removed", f, identifier))
			.collect::<Vec<_>>();
		if !remaining.is_empty() {
			return Err(crate::Error::Inconsistent(remaining));
		}

		self.installed_packages.remove(identifier).ok_or_else(|| crate::Error::PackageNotFound {
			identifier: identifier.to_string(),
			version: None,
		})
	}

	/// Forgets a single installed file, returning its owner.
	///
	/// # Errors
	/// [`Path`](crate::Error::Path) when `path` is absolute.
	pub fn remove_installed_file(&mut self, path: &str) -> crate::Result<Option<String>> {
		if is_absolute_path(path) {
			return Err(relative_path_required(path));
		}
		let path = normalize_path(path);
		for installed in self.installed_packages.values_mut() {
			installed.files_mut().remove(&path);
		}
		Ok(self.installed_files.remove(&path))
	}

	/// Replaces the set of DLLs found on disk, identifier to relative path.
	///
	/// DLLs that are installed packages or files owned by packages are ignored.
	/// Returns if anything changed.
	pub fn set_dlls(&mut self, dlls: BTreeMap<String, String>) -> bool {
		let unregistered = dlls.into_iter()
			.map(|(identifier, path)| (identifier, normalize_path(&path)))
			.filter(|(identifier, path)| !self.installed_packages.contains_key(identifier) && !self.installed_files.contains_key(path))
			.collect::<BTreeMap<_, _>>();
		if unregistered != self.installed_dlls {
			log::debug!("Installed DLLs changed to {:?}", unregistered.keys().collect::<Vec<_>>());
			self.installed_dlls = unregistered;
			true
		} else {
			false
		}
	}

	/// Replaces the set of DLC found on disk. Returns if anything changed.
	///
	/// DLC are tracked as installed packages, using the catalog's metadata when it has the exact version.
	/// A DLC sharing an identifier with an installed package that isn't DLC is ignored,
	/// that package keeps its files.
	pub fn set_dlcs(&mut self, dlcs: BTreeMap<String, PackageVersion>) -> bool {
		let stale = self.installed_packages.values()
			.filter(|i| i.package().is_dlc() && !dlcs.contains_key(i.identifier()))
			.map(|i| i.identifier().to_string())
			.collect::<Vec<_>>();
		let mut changed = !stale.is_empty();
		for identifier in stale {
			self.installed_packages.remove(&identifier);
		}

		for (identifier, version) in dlcs {
			match self.installed_packages.get(&identifier) {
				Some(existing) if !existing.package().is_dlc() => {
					log::warn!("Ignoring DLC {} {}, {} is installed as a package", identifier, version, existing.package().identifier);
					continue
				},
				Some(existing) if existing.package().identifier.version == version => continue,
				_ => {},
			}
			let package = self.get_package_by_version(&identifier, &version)
				.cloned()
				.unwrap_or_else(|| Package::dlc(identifier.clone(), version));
			self.installed_packages.insert(identifier, InstalledPackage::new(package, BTreeSet::new(), false));
			changed = true;
		}
		changed
	}

	/// Every installed identifier and its version.
	///
	/// Installed packages override provided identifiers, which override DLLs.
	pub fn installed(&self, with_provides: bool, with_dlls: bool) -> BTreeMap<String, InstalledVersion> {
		let mut installed = BTreeMap::new();
		if with_dlls {
			for identifier in self.installed_dlls.keys() {
				installed.insert(identifier.clone(), InstalledVersion::Unmanaged(None));
			}
		}
		if with_provides {
			installed.extend(self.provided_by_installed());
		}
		for (identifier, package) in &self.installed_packages {
			installed.insert(identifier.clone(), Self::installed_version_of(package));
		}
		installed
	}

	fn installed_version_of(installed: &InstalledPackage) -> InstalledVersion {
		let version = installed.package().identifier.version.clone();
		if installed.package().is_dlc() {
			InstalledVersion::Unmanaged(Some(version))
		} else {
			InstalledVersion::Release(version)
		}
	}

	/// Identifiers provided by installed packages, the first provider by identifier wins.
	pub fn provided_by_installed(&self) -> BTreeMap<String, InstalledVersion> {
		let mut provided = BTreeMap::new();
		for installed in self.installed_packages.values() {
			let package = installed.package();
			for p in &package.provides {
				provided.entry(p.clone()).or_insert_with(|| InstalledVersion::Provided {
					provider: package.identifier.identifier.clone(),
					version: package.identifier.version.clone(),
				});
			}
		}
		provided
	}

	/// The installed version of `identifier`, checking installed packages, then DLLs, then provided identifiers.
	pub fn installed_version(&self, identifier: &str, with_provides: bool) -> Option<InstalledVersion> {
		if let Some(installed) = self.installed_packages.get(identifier) {
			return Some(Self::installed_version_of(installed))
		}
		if self.installed_dlls.contains_key(identifier) {
			return Some(InstalledVersion::Unmanaged(None))
		}
		if with_provides {
			return self.installed_packages.values()
				.map(InstalledPackage::package)
				.find(|p| p.provides.iter().any(|name| name == identifier))
				.map(|p| InstalledVersion::Provided {
					provider: p.identifier.identifier.clone(),
					version: p.identifier.version.clone(),
				})
		}
		None
	}

	pub fn is_installed(&self, identifier: &str, with_provides: bool) -> bool {
		self.installed_version(identifier, with_provides).is_some()
	}

	pub fn installed_package(&self, identifier: &str) -> Option<&InstalledPackage> {
		self.installed_packages.get(identifier)
	}

	pub fn installed_packages(&self) -> impl Iterator<Item = &InstalledPackage> {
		self.installed_packages.values()
	}

	/// The package owning `path`.
	///
	/// # Errors
	/// [`Path`](crate::Error::Path) when `path` is absolute.
	pub fn file_owner(&self, path: &str) -> crate::Result<Option<&InstalledPackage>> {
		if is_absolute_path(path) {
			return Err(relative_path_required(path));
		}
		Ok(self.installed_files.get(&normalize_path(path)).and_then(|owner| self.installed_packages.get(owner)))
	}

	/// Relative path to owning identifier for every installed file.
	pub fn installed_files(&self) -> &BTreeMap<String, String> {
		&self.installed_files
	}

	pub fn installed_dlls(&self) -> BTreeSet<String> {
		self.installed_dlls.keys().cloned().collect()
	}

	pub fn dll_path(&self, identifier: &str) -> Option<&str> {
		self.installed_dlls.get(identifier).map(String::as_str)
	}

	pub fn installed_dlc(&self) -> DlcVersions {
		self.installed_packages.values()
			.filter(|i| i.package().is_dlc())
			.map(|i| (i.identifier().to_string(), Some(i.package().identifier.version.clone())))
			.collect()
	}

	/// Installed packages that don't support `criteria`, unless the catalog's copy of the same version does.
	pub fn incompatible_installed(&self, criteria: &GameVersionRange) -> Vec<&InstalledPackage> {
		self.installed_packages.values()
			.filter(|i| {
				let package = i.package();
				!package.is_compatible(criteria)
				&& !self.get_package_by_version(&package.identifier.identifier, &package.identifier.version)
					.is_some_and(|p| p.is_compatible(criteria))
			})
			.collect()
	}

	/// Checks the installed packages' depends and conflicts against each other.
	///
	/// # Errors
	/// [`Inconsistent`](crate::Error::Inconsistent) listing every problem found.
	pub fn check_sanity(&self) -> crate::Result<()> {
		let mut problems = self.file_index_problems();
		let packages = self.installed_packages.values().map(InstalledPackage::package).collect::<Vec<_>>();
		match crate::sanity_checker::enforce(&packages, &self.installed_dlls(), &self.installed_dlc()) {
			Err(crate::Error::Inconsistent(relationships)) => problems.extend(relationships),
			other => other?,
		}

		if problems.is_empty() {
			Ok(())
		} else {
			Err(crate::Error::Inconsistent(problems))
		}
	}

	/// Compares the file ownership index against the installed packages' file lists.
	fn file_index_problems(&self) -> Vec<String> {
		let mut problems = Vec::new();
		let mut listed = BTreeMap::<&str, &str>::new();
		for installed in self.installed_packages.values() {
			for file in installed.files().iter().filter(|f| !is_directory(f)) {
				if let Some(other) = listed.insert(file, installed.identifier()) {
					problems.push(format!("{} is listed by both {} and {}", file, other, installed.identifier()));
				}
			}
		}

		for (file, owner) in &self.installed_files {
			match listed.get(file.as_str()) {
				_ if is_directory(file) => problems.push(format!("Directory {} is indexed to {}", file, owner)),
				None => problems.push(format!("{} is indexed to {} but no installed package lists it", file, owner)),
				Some(lister) if lister != owner => problems.push(format!("{} is indexed to {} but listed by {}", file, owner, lister)),
				Some(_) => {},
			}
		}
		for (file, lister) in &listed {
			if !self.installed_files.contains_key(*file) {
				problems.push(format!("{} from {} is missing from the file index", file, lister));
			}
		}
		problems
	}

	/// Rebuilds the file ownership index from the installed packages' file lists.
	pub fn reindex_installed(&mut self) {
		self.installed_files = self.installed_packages.values()
			.flat_map(|i| i.files().iter().filter(|f| !is_directory(f)).map(|f| (f.clone(), i.identifier().to_string())))
			.collect();
	}

	/// Fixes whatever can be fixed without outside information.
	pub fn repair(&mut self) {
		self.reindex_installed();
	}

	/* Reverse dependencies */

	/// Every installed identifier that would be broken by removing `to_remove` while installing `to_install`,
	/// `to_remove` included.
	pub fn find_reverse_dependencies<S: AsRef<str>>(&self, to_remove: &[S], to_install: &[&Package]) -> BTreeSet<String> {
		let installed = self.installed_packages.values().map(InstalledPackage::package).collect::<Vec<_>>();
		let to_remove = to_remove.iter().map(|s| s.as_ref().to_string()).collect();
		crate::reverse_dependencies::find_reverse_dependencies(
			&to_remove,
			to_install,
			&installed,
			&self.installed_dlls(),
			&self.installed_dlc(),
			None,
		)
	}

	/// Auto-installed packages nothing would need anymore once `removing` is gone.
	pub fn find_removable_auto_installed(&self, removing: &BTreeSet<String>) -> Vec<&InstalledPackage> {
		let installed = self.installed_packages.values().collect::<Vec<_>>();
		crate::reverse_dependencies::find_removable_auto_installed(&installed, removing, &self.installed_dlls(), &self.installed_dlc())
	}
}

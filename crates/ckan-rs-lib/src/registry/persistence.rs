//! Reading and writing `registry.json`, upgrading files written by older versions.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::*;

use super::{is_absolute_path, is_directory, normalize_path, Registry, Repository};
use crate::available_package::AvailablePackage;
use crate::installed_package::InstalledPackage;

/// Version 0 stored absolute paths, version 1 still tracked `001ControlLock` under its old identifier,
/// version 2 predates the tarball repository address.
pub const LATEST_REGISTRY_VERSION: u32 = 3;

/// The registry as it sits on disk, every field may be missing from old files.
#[derive(Debug, Deserialize)]
struct RegistryFile {
	#[serde(default)]
	registry_version: u32,
	#[serde(default, alias = "sorted_repositories")]
	repositories: BTreeMap<String, Repository>,
	#[serde(default, rename = "available_modules")]
	available_packages: BTreeMap<String, AvailablePackage>,
	#[serde(default, rename = "installed_modules")]
	installed_packages: BTreeMap<String, InstalledPackage>,
	#[serde(default)]
	installed_dlls: BTreeMap<String, String>,
	installed_files: Option<BTreeMap<String, String>>,
}

/// Makes an absolute path relative to `game_dir`, relative paths are only normalized.
fn make_relative(path: &str, game_dir: &Path) -> crate::Result<String> {
	if !is_absolute_path(path) {
		return Ok(normalize_path(path))
	}

	let normalized = normalize_path(path);
	let relative = pathdiff::diff_paths(Path::new(&normalized), game_dir)
		.filter(|p| !p.starts_with(".."))
		.ok_or_else(|| crate::Error::Path {
			path: normalized.clone().into(),
			reason: format!("not inside the game directory {}", game_dir.display()),
		})?;
	let relative = normalize_path(&relative.to_string_lossy());
	if is_directory(&normalized) && !relative.is_empty() {
		Ok(format!("{}/", relative))
	} else {
		Ok(relative)
	}
}

impl RegistryFile {
	fn upgrade(self, game_dir: &Path) -> crate::Result<Registry> {
		if self.registry_version > LATEST_REGISTRY_VERSION {
			return Err(crate::Error::RegistryVersionNotSupported {
				found: self.registry_version,
				supported: LATEST_REGISTRY_VERSION,
			})
		}

		let needs_reindex = self.installed_files.is_none() || self.registry_version < 2;
		let mut registry = Registry {
			registry_version: self.registry_version,
			repositories: self.repositories,
			available_packages: self.available_packages,
			installed_packages: self.installed_packages,
			installed_dlls: self.installed_dlls,
			installed_files: self.installed_files.unwrap_or_default(),
			providers: BTreeMap::new(),
		};

		if registry.registry_version < 1 {
			log::warn!("Upgrading registry from version {}, converting to relative paths", registry.registry_version);
			for installed in registry.installed_packages.values_mut() {
				let files = installed.files().iter()
					.map(|f| make_relative(f, game_dir))
					.collect::<crate::Result<_>>()?;
				*installed.files_mut() = files;
			}
			registry.installed_dlls = std::mem::take(&mut registry.installed_dlls)
				.into_iter()
				.map(|(identifier, path)| Ok((identifier, make_relative(&path, game_dir)?)))
				.collect::<crate::Result<_>>()?;
		}

		if registry.registry_version < 2 {
			if let Some(mut control_lock) = registry.installed_packages.remove("001ControlLock") {
				log::warn!("Renaming 001ControlLock to ControlLock");
				control_lock.package_mut().identifier.identifier = "ControlLock".to_string();
				registry.installed_packages.insert("ControlLock".to_string(), control_lock);
			}
		}

		let misfiled = registry.misfiled_entries();
		if !misfiled.is_empty() {
			return Err(crate::Error::Inconsistent(misfiled))
		}

		if needs_reindex {
			registry.reindex_installed();
		}

		for repository in registry.repositories.values_mut() {
			if repository.uri == Repository::OLD_DEFAULT_URI {
				log::warn!("Moving repository {} to {}", repository.name, Repository::DEFAULT_URI);
				repository.uri = Repository::DEFAULT_URI.to_string();
			}
		}

		let mut ordered = registry.repositories.values_mut().collect::<Vec<_>>();
		ordered.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
		for (priority, repository) in ordered.into_iter().enumerate() {
			repository.priority = priority as i32;
		}

		registry.registry_version = LATEST_REGISTRY_VERSION;
		registry.rebuild_providers();
		Ok(registry)
	}
}

impl Registry {
	/// Entries stored under a key that doesn't match the identifier inside them.
	fn misfiled_entries(&self) -> Vec<String> {
		let available = self.available_packages.iter().flat_map(|(key, available)| {
			let mut problems = available.misfiled();
			if key != available.identifier() {
				problems.push(format!("available {} is filed under {}", available.identifier(), key));
			}
			problems
		});
		let installed = self.installed_packages.iter()
			.filter(|(key, installed)| *key != installed.identifier())
			.map(|(key, installed)| format!("installed {} is filed under {}", installed.package().identifier, key));
		available.chain(installed).collect()
	}

	/// Reads a registry, upgrading it when it was written by an older version.
	///
	/// `game_dir` is only used to make absolute paths from the oldest registries relative.
	///
	/// # Errors
	/// - [`SerdeJSON`](crate::Error::SerdeJSON) when the text isn't a registry.
	/// - [`RegistryVersionNotSupported`](crate::Error::RegistryVersionNotSupported) when it was written by a newer version.
	/// - [`Path`](crate::Error::Path) when an old absolute path is outside `game_dir`.
	pub fn from_json(text: &str, game_dir: &Path) -> crate::Result<Self> {
		let file: RegistryFile = serde_json::from_str(text)?;
		file.upgrade(game_dir)
	}

	pub fn to_json(&self) -> crate::Result<String> {
		Ok(serde_json::to_string_pretty(self)?)
	}

	/// # Errors
	/// See [`Registry::from_json`], plus [`IO`](crate::Error::IO) for reading `path`.
	pub fn load(path: &Path, game_dir: &Path) -> crate::Result<Self> {
		log::info!("Loading registry from {}", path.display());
		let text = std::fs::read_to_string(path)?;
		Self::from_json(&text, game_dir)
	}

	/// Writes the registry to a temporary file beside `path` and renames it into place,
	/// a failed save never leaves a truncated registry behind.
	pub fn save(&self, path: &Path) -> crate::Result<()> {
		log::info!("Saving registry to {}", path.display());
		let dir = match path.parent() {
			Some(p) if !p.as_os_str().is_empty() => p,
			_ => Path::new("."),
		};
		std::fs::create_dir_all(dir)?;

		let mut file = tempfile::NamedTempFile::new_in(dir)?;
		file.write_all(self.to_json()?.as_bytes())?;
		file.flush()?;
		file.persist(path).map_err(|e| e.error)?;
		Ok(())
	}
}

//! Various helper functions for testing
//!
//! functions in this module should use results and not use any panics to avoid confusion in callers

use std::collections::BTreeMap;

use ckan_rs_registry::package::PackageVersion;
use ckan_rs_registry::{Package, Registry};

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
	#[error("registry error: {0}")]
	Registry(#[from] ckan_rs_registry::Error),
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("{0} catalog stanzas failed to parse")]
	SkippedStanzas(usize),
}

/// Installs a logger printing to the test output, safe to call from every test.
pub fn init_logger() {
	let _ = env_logger::builder().is_test(true).try_init();
}

/// Reads a package from a `.ckan` stanza.
pub fn package(stanza: serde_json::Value) -> Result<Package, FixtureError> {
	Ok(Package::read_from_json(stanza)?)
}

/// Builds a [`Package`] from `.ckan` style JSON.
///
/// ```ignore
/// let mod_a = package!({"identifier": "ModA", "version": "1.0", "depends": [{"name": "ModB"}]})?;
/// ```
#[macro_export]
macro_rules! package {
	($($json:tt)+) => {
		$crate::package(::serde_json::json!($($json)+))
	};
}

/// Creates a temporary directory removed when the returned value is dropped.
pub fn tempdir() -> Result<tempfile::TempDir, FixtureError> {
	Ok(tempfile::tempdir()?)
}

/// Builds a registry from catalog stanzas and installed packages.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
	available: Vec<serde_json::Value>,
	installed: Vec<(serde_json::Value, Vec<String>, bool)>,
	dlls: BTreeMap<String, String>,
	dlcs: BTreeMap<String, String>,
}

impl RegistryBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn available(mut self, stanzas: impl IntoIterator<Item = serde_json::Value>) -> Self {
		self.available.extend(stanzas);
		self
	}

	/// Registers a package as installed, it isn't added to the catalog.
	pub fn installed(mut self, stanza: serde_json::Value, files: &[&str], auto_installed: bool) -> Self {
		self.installed.push((stanza, files.iter().map(|f| f.to_string()).collect(), auto_installed));
		self
	}

	pub fn dll(mut self, identifier: &str, path: &str) -> Self {
		self.dlls.insert(identifier.to_string(), path.to_string());
		self
	}

	pub fn dlc(mut self, identifier: &str, version: &str) -> Self {
		self.dlcs.insert(identifier.to_string(), version.to_string());
		self
	}

	/// # Errors
	/// Fails when any stanza doesn't parse or a package can't be registered.
	pub fn build(self) -> Result<Registry, FixtureError> {
		let mut registry = Registry::new();

		let errors = registry.add_available_from_json(self.available);
		if !errors.is_empty() {
			return Err(FixtureError::SkippedStanzas(errors.len()));
		}

		for (stanza, files, auto_installed) in self.installed {
			registry.register_package(package(stanza)?, files, auto_installed)?;
		}

		registry.set_dlls(self.dlls);
		let dlcs = self.dlcs.into_iter()
			.map(|(identifier, version)| Ok((identifier, PackageVersion::new(version)?)))
			.collect::<Result<BTreeMap<_, _>, ckan_rs_registry::Error>>()?;
		registry.set_dlcs(dlcs);

		Ok(registry)
	}
}

use std::path::{Path, PathBuf};

use serde::*;

use crate::package::ReleaseStatus;
use crate::relationship_resolver::RelationshipResolverOptions;

/// Settings shared by every game instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
	data_dir: PathBuf,
	/// The least stable release status offered when picking package versions.
	stability_tolerance: ReleaseStatus,
	resolver_options: RelationshipResolverOptions,
}

impl Config {
	/// Settings using the platform's data directory.
	///
	/// # Errors
	/// - [`Path`](crate::Error::Path) when the data directory can't be determined from the environment.
	/// - [`IO`](crate::Error::IO) when it can't be created.
	pub fn new() -> crate::Result<Self> {
		let data_dir = Self::default_data_dir()?;
		std::fs::create_dir_all(&data_dir)?;
		Ok(Self::with_data_dir(data_dir))
	}

	/// Settings using `data_dir`, which isn't created or checked.
	pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
		Self {
			data_dir: data_dir.into(),
			stability_tolerance: ReleaseStatus::Stable,
			resolver_options: Default::default(),
		}
	}

	fn default_data_dir() -> crate::Result<PathBuf> {
		#[cfg(target_os = "windows")]
		let path = std::env::var_os("APPDATA").map(PathBuf::from);

		#[cfg(not(target_os = "windows"))]
		let path = std::env::var_os("XDG_DATA_HOME")
			.map(PathBuf::from)
			.or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local/share")));

		path.map(|p| p.join("CKAN-rs"))
			.ok_or_else(|| crate::Error::Path {
				path: PathBuf::new(),
				reason: "no data directory found in the environment".to_string(),
			})
	}

	pub fn data_dir(&self) -> &Path {
		&self.data_dir
	}
	/// returns if the directory is valid or not.
	pub fn set_data_dir(&mut self, data_dir: PathBuf) -> bool {
		if data_dir.is_dir() {
			self.data_dir = data_dir;
			true
		} else {
			false
		}
	}

	pub fn stability_tolerance(&self) -> ReleaseStatus {
		self.stability_tolerance
	}
	pub fn set_stability_tolerance(&mut self, stability_tolerance: ReleaseStatus) {
		self.stability_tolerance = stability_tolerance;
	}

	pub fn resolver_options(&self) -> &RelationshipResolverOptions {
		&self.resolver_options
	}
	pub fn resolver_options_mut(&mut self) -> &mut RelationshipResolverOptions {
		&mut self.resolver_options
	}

	/// Where the registry of the named game instance is kept.
	pub fn registry_path(&self, instance_name: &str) -> PathBuf {
		self.data_dir.join("instances").join(instance_name).join("registry.json")
	}
}

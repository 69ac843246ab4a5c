//! A package as it sits in a game instance.

use std::collections::BTreeSet;

use serde::*;

use crate::package::Package;

/// The record of an installed package and the files it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
	install_time: chrono::DateTime<chrono::Utc>,
	#[serde(rename = "module", alias = "source_module")]
	package: Package,
	/// Paths relative to the game directory using `/` separators.
	files: BTreeSet<String>,
	auto_installed: bool,
}

impl InstalledPackage {
	/// DLC is never considered auto-installed, the flag is ignored for it.
	pub fn new(package: Package, files: BTreeSet<String>, auto_installed: bool) -> Self {
		let auto_installed = auto_installed && !package.is_dlc();
		Self {
			install_time: chrono::Utc::now(),
			package,
			files,
			auto_installed,
		}
	}

	pub fn package(&self) -> &Package { &self.package }
	pub fn identifier(&self) -> &str { &self.package.identifier.identifier }
	pub fn files(&self) -> &BTreeSet<String> { &self.files }
	pub fn install_time(&self) -> chrono::DateTime<chrono::Utc> { self.install_time }
	pub fn auto_installed(&self) -> bool { self.auto_installed }

	pub(crate) fn files_mut(&mut self) -> &mut BTreeSet<String> { &mut self.files }
	pub(crate) fn package_mut(&mut self) -> &mut Package { &mut self.package }
}

#[cfg(test)]
mod test {
	use super::*;
	use serde_json::json;

	fn package(json: serde_json::Value) -> Package { Package::read_from_json(json).unwrap() }

	#[test] fn dlc_is_never_auto_installed() { assert!(!InstalledPackage::new(package(json!({"identifier": "MakingHistory-DLC", "version": "1.0", "kind": "dlc"})), BTreeSet::new(), true).auto_installed()) }
	#[test] fn auto_installed_is_kept() { assert!(InstalledPackage::new(package(json!({"identifier": "A", "version": "1.0"})), BTreeSet::new(), true).auto_installed()) }

	#[test]
	fn serializes_install_time() {
		let installed = InstalledPackage::new(package(json!({"identifier": "A", "version": "1.0"})), BTreeSet::from(["GameData/A/a.dll".to_string()]), false);
		let text = serde_json::to_string(&installed).unwrap();
		assert_eq!(serde_json::from_str::<InstalledPackage>(&text).unwrap(), installed);
	}
}

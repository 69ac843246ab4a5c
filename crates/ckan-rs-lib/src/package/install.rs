//! Install directives describe how a package's download maps onto the game directory.
//!
//! They are carried through the registry untouched, acting on them is the installer's job.

use serde::*;

/// Where in the download to start, exactly one is required per directive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceDirective {
	File(String),
	Find(String),
	FindRegExp(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionalDirective {
	As(String),
	Filter(Vec<String>),
	FilterRegExp(Vec<String>),
	IncludeOnly(Vec<String>),
	IncludeOnlyRegExp(Vec<String>),
	FindMatchesFiles(bool),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstallDirective {
	pub source: SourceDirective,
	pub install_to: String,
	pub additional: Vec<OptionalDirective>,
}

impl InstallDirective {
	pub fn new(source: SourceDirective, install_to: String, additional: Vec<OptionalDirective>) -> Self {
		Self { source, install_to, additional }
	}

	/// A directive installing the folder named after `identifier` into `GameData`,
	/// used for packages that don't list any directives.
	pub fn default_for(identifier: &str) -> Self {
		Self::new(SourceDirective::Find(identifier.to_string()), "GameData".to_string(), Vec::new())
	}
}

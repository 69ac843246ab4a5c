//! Library error type.

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

use crate::package::PackageIdentifier;

#[derive(Debug, Error)]
pub enum Error {
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("JSON error: {0}")]
	SerdeJSON(#[from] serde_json::Error),
	#[error("parsing error: {0}")]
	Parse(String),
	/// A version string that can't be turned into a [`PackageVersion`](crate::package::PackageVersion).
	///
	/// Only fatal to the package being read, catalog ingestion skips the package and carries on.
	#[error("invalid version format: {0:?}")]
	InvalidVersionFormat(String),
	/// The identifier isn't known to the catalog, not even as something another package provides.
	#[error("package {identifier} not found{}", .version.as_ref().map(|v| format!(" at version {v}")).unwrap_or_default())]
	PackageNotFound {
		identifier: String,
		version: Option<String>,
	},
	/// The identifier is known but no version fits the constraints placed on it.
	#[error("dependency {relationship} of {} can't be satisfied", .parent.as_deref().unwrap_or("the request"))]
	DependencyNotSatisfied {
		/// `None` when the relationship came directly from the user's request.
		parent: Option<String>,
		relationship: String,
	},
	/// More than one package could fulfill a virtual identifier and nothing narrowed the choice.
	///
	/// `candidates` holds every option so the caller can present a choice and retry with a decision.
	#[error("too many packages provide {requested}: {}", .candidates.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", "))]
	TooManyProviders {
		requested: String,
		candidates: Vec<PackageIdentifier>,
	},
	/// One or more relationship or ownership violations, every one found is listed.
	#[error("inconsistencies found:\n{}", .0.join("\n"))]
	Inconsistent(Vec<String>),
	#[error("path error {path}: {reason}")]
	Path {
		path: std::path::PathBuf,
		reason: String,
	},
	#[error("registry version {found} is newer than the latest supported version {supported}")]
	RegistryVersionNotSupported {
		found: u32,
		supported: u32,
	},
}

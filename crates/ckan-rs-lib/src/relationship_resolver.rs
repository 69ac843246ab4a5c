//! Utilities for getting a valid set of compatible packages to be installed from a list of desired packages.
//!
//! # Usage
//! 1. Create a [`ResolverBuilder`] borrowing the [`Registry`](crate::registry::Registry).
//! 1. Use the builder to add package requirements, packages being removed, game versions and decisions.
//! 1. [`ResolverBuilder::build()`] to get a [`RelationshipResolver`].
//! 1. [`RelationshipResolver::resolve()`] to get a [`Resolution`] to query.
//! 1. [`Resolution::install_order()`] to list every new package, dependencies first.
//!
//! When a virtual identifier has several providers the resolve fails with
//! [`TooManyProviders`](crate::Error::TooManyProviders) listing the candidates.
//! Pick one, add it with [`ResolverBuilder::add_decisions`] and resolve again.

use std::sync::OnceLock;

use regex::Regex;
use serde::*;

use crate::package::*;

mod dependency_graph;

mod resolver_builder;
pub use resolver_builder::ResolverBuilder;
mod processing_resolver;
pub use processing_resolver::RelationshipResolver;
mod finalized_resolver;
pub use finalized_resolver::Resolution;

/// A requirement that can be given to the resolver to fulfill.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstallRequirement {
	pub identifier: String,
	pub required_version: PackageVersionBounds,
}

impl InstallRequirement {
	pub fn new(identifier: impl Into<String>, required_version: PackageVersionBounds) -> Self {
		Self {
			identifier: identifier.into(),
			required_version,
		}
	}

	/// Reads a requirement written as `Identifier` or `Identifier=version`.
	///
	/// # Errors
	/// - [`Parse`](crate::Error::Parse) when the identifier is malformed.
	/// - [`InvalidVersionFormat`](crate::Error::InvalidVersionFormat) when the version is.
	pub fn parse(s: &str) -> crate::Result<Self> {
		static RE: OnceLock<Regex> = OnceLock::new();
		let re = RE.get_or_init(|| Regex::new(r"^(?P<identifier>[A-Za-z0-9][A-Za-z0-9_-]*)(?:=(?P<version>.+))?$").expect("failed to compile regex"));

		let captures = re.captures(s.trim()).ok_or_else(|| crate::Error::Parse(format!("invalid install requirement {:?}", s)))?;
		let required_version = match captures.name("version") {
			Some(v) => VersionBounds::Explicit(PackageVersion::new(v.as_str())?),
			None => VersionBounds::Any,
		};
		Ok(Self::new(&captures["identifier"], required_version))
	}

	/// The requirement as a relationship, for matching packages against it.
	pub fn as_relationship(&self) -> Relationship {
		Relationship::One(PackageDescriptor::new(&self.identifier, self.required_version.clone()))
	}
}

impl std::str::FromStr for InstallRequirement {
	type Err = crate::Error;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl std::fmt::Display for InstallRequirement {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match &self.required_version {
			VersionBounds::Explicit(v) => write!(f, "{}={}", self.identifier, v),
			VersionBounds::Any => write!(f, "{}", self.identifier),
			bounds => write!(f, "{} {}", self.identifier, bounds),
		}
	}
}

/// Controls how far the resolver reaches and how strict it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipResolverOptions {
	/// Add recommended packages and their recommendations.
	pub with_recommends: bool,
	/// Add the suggestions of the requested packages, but not suggestions of suggestions.
	pub with_suggests: bool,
	/// Add suggestions all the way down.
	pub with_all_suggests: bool,
	/// Skip relationships with several possible providers instead of failing with
	/// [`TooManyProviders`](crate::Error::TooManyProviders).
	pub without_toomanyprovides_kraken: bool,
	/// Skip the final consistency check. The result may not be installable.
	pub without_enforce_consistency: bool,
	/// Record conflicts in [`Resolution::conflicts`] instead of failing.
	/// The result is not installable while it has conflicts.
	pub proceed_with_inconsistencies: bool,
}

impl Default for RelationshipResolverOptions {
	fn default() -> Self {
		Self {
			with_recommends: true,
			with_suggests: false,
			with_all_suggests: false,
			without_toomanyprovides_kraken: false,
			without_enforce_consistency: false,
			proceed_with_inconsistencies: false,
		}
	}
}

/// Why a package is part of a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionReason {
	Installed,
	UserRequested,
	/// Required by the named package.
	Depends(String),
	Recommended(String),
	Suggested(String),
}

impl SelectionReason {
	/// The package that pulled this one in, `None` for root reasons.
	pub fn parent(&self) -> Option<&str> {
		match self {
			SelectionReason::Installed | SelectionReason::UserRequested => None,
			SelectionReason::Depends(p) | SelectionReason::Recommended(p) | SelectionReason::Suggested(p) => Some(p),
		}
	}
}

impl std::fmt::Display for SelectionReason {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			SelectionReason::Installed => write!(f, "Currently installed."),
			SelectionReason::UserRequested => write!(f, "Requested by user."),
			SelectionReason::Depends(p) => write!(f, "To satisfy dependency from {}.", p),
			SelectionReason::Recommended(p) => write!(f, "Recommended by {}.", p),
			SelectionReason::Suggested(p) => write!(f, "Suggested by {}.", p),
		}
	}
}

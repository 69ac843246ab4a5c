//! The version of a package, not to be confused with the version of the game.
//!
//! # Ordering
//!
//! Versions are compared by first comparing epochs, then walking both version strings
//! taking a run of non-digits followed by a run of digits from each side.
//! - Non-digit runs compare ordinally except `.` which sorts above everything else,
//! when both start with `.` a lone `.` sorts above a longer run.
//! - Digit runs compare numerically, so `1.01` and `1.1` are equal.
//! - Whichever version runs out of runs first is the lesser, `1.0 < 1.0.1`.
//!
//! Because of the `.` rule `1.0 < 1.0.repackaged < 1.0.1`.

use std::cmp::Ordering;
use std::sync::OnceLock;

use serde::*;

fn version_pattern() -> &'static regex::Regex {
	static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
	PATTERN.get_or_init(|| regex::Regex::new(r"^(?:(?P<epoch>[0-9]+):)?(?P<version>.*)$").expect("version pattern should compile."))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageVersion {
	epoch: Option<u32>,
	version: String,
}

impl PackageVersion {
	/// Parses a version string such as `"1:v1.2.3"`.
	///
	/// # Errors
	/// [`InvalidVersionFormat`](crate::Error::InvalidVersionFormat) when
	/// - the string is empty, or empty after the epoch.
	/// - the string contains control characters.
	/// - the epoch doesn't fit in a `u32`.
	pub fn new(version: impl AsRef<str>) -> crate::Result<Self> {
		use crate::Error::InvalidVersionFormat;
		let version = version.as_ref();

		if version.chars().any(char::is_control) {
			return Err(InvalidVersionFormat(version.to_string()))
		}

		let captures = version_pattern().captures(version).ok_or_else(|| InvalidVersionFormat(version.to_string()))?;
		let epoch = match captures.name("epoch") {
			Some(e) => Some(e.as_str().parse::<u32>().map_err(|_| InvalidVersionFormat(version.to_string()))?),
			None => None,
		};
		let remainder = captures.name("version").map(|m| m.as_str()).unwrap_or_default();
		if remainder.is_empty() {
			return Err(InvalidVersionFormat(version.to_string()))
		}

		Ok(PackageVersion {
			epoch,
			version: remainder.to_string(),
		})
	}

	pub fn epoch(&self) -> u32 {
		self.epoch.unwrap_or(0)
	}

	/// The version without the epoch.
	pub fn version(&self) -> &str {
		&self.version
	}

	fn pieces(&self) -> Pieces<'_> {
		Pieces { remainder: &self.version }
	}
}

/// Splits a version string into `(non-digits, digits)` pairs.
struct Pieces<'a> {
	remainder: &'a str,
}

impl<'a> Iterator for Pieces<'a> {
	type Item = (&'a str, &'a str);

	fn next(&mut self) -> Option<Self::Item> {
		if self.remainder.is_empty() {
			return None
		}
		let split = self.remainder.find(|c: char| c.is_ascii_digit()).unwrap_or(self.remainder.len());
		let (text, rest) = self.remainder.split_at(split);
		let split = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
		let (digits, rest) = rest.split_at(split);
		self.remainder = rest;
		Some((text, digits))
	}
}

/// Strips leading zeros, an empty run is treated as `0`.
fn normalize_digits(digits: &str) -> &str {
	let trimmed = digits.trim_start_matches('0');
	if trimmed.is_empty() { "0" } else { trimmed }
}

fn compare_text(lhs: &str, rhs: &str) -> Ordering {
	match (lhs.chars().next(), rhs.chars().next()) {
		(Some(l), Some(r)) => {
			match (l == '.', r == '.') {
				(false, true) => Ordering::Less,
				(true, false) => Ordering::Greater,
				(true, true) => {
					match (lhs.len() == 1, rhs.len() == 1) {
						(true, false) => Ordering::Greater,
						(false, true) => Ordering::Less,
						_ => lhs.cmp(rhs),
					}
				},
				(false, false) => lhs.cmp(rhs),
			}
		},
		_ => lhs.cmp(rhs),
	}
}

fn compare_digits(lhs: &str, rhs: &str) -> Ordering {
	let lhs = normalize_digits(lhs);
	let rhs = normalize_digits(rhs);
	/* Comparing as strings avoids overflowing on absurdly long numbers */
	lhs.len().cmp(&rhs.len()).then_with(|| lhs.cmp(rhs))
}

impl TryFrom<String> for PackageVersion {
	type Error = crate::Error;
	fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl TryFrom<&str> for PackageVersion {
	type Error = crate::Error;
	fn try_from(value: &str) -> Result<Self, Self::Error> { Self::new(value) }
}

impl std::str::FromStr for PackageVersion {
	type Err = crate::Error;
	fn from_str(s: &str) -> Result<Self, Self::Err> { Self::new(s) }
}

impl From<PackageVersion> for String {
	fn from(value: PackageVersion) -> Self {
		value.to_string()
	}
}

impl Ord for PackageVersion {
	fn cmp(&self, other: &Self) -> Ordering {
		match self.epoch().cmp(&other.epoch()) {
			Ordering::Equal => {},
			ord => return ord,
		}

		let mut lhs = self.pieces();
		let mut rhs = other.pieces();
		loop {
			match (lhs.next(), rhs.next()) {
				(Some((l_text, l_digits)), Some((r_text, r_digits))) => {
					match compare_text(l_text, r_text) {
						Ordering::Equal => {},
						ord => return ord,
					}
					match compare_digits(l_digits, r_digits) {
						Ordering::Equal => {},
						ord => return ord,
					}
				},
				(None, None) => return Ordering::Equal,
				(None, Some(_)) => return Ordering::Less,
				(Some(_), None) => return Ordering::Greater,
			}
		}
	}
}

impl PartialOrd for PackageVersion {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialEq for PackageVersion {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for PackageVersion {}

impl std::hash::Hash for PackageVersion {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		/* Must agree with `Eq` so hash the normalized pieces rather than the raw string */
		self.epoch().hash(state);
		for (text, digits) in self.pieces() {
			text.hash(state);
			normalize_digits(digits).hash(state);
		}
	}
}

impl std::fmt::Display for PackageVersion {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.epoch {
			Some(epoch) => write!(f, "{}:{}", epoch, self.version),
			None => write!(f, "{}", self.version),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn v(s: &str) -> PackageVersion { PackageVersion::new(s).unwrap() }

	#[test] fn mod_version_are_not_compared_lexically() { assert!(v("1.2.4.0") < v("1.2.10.0")) }
	#[test] fn mod_version_short_version_is_lt() { assert!(v("1.2") < v("1.2.3")) }
	#[test] fn mod_version_identical_are_eq() { assert!(v("1.2.3") == v("1.2.3")) }
	#[test] fn mod_version_higher_version_is_gt() { assert!(v("1.2.3") < v("1.2.4")) }
	#[test] fn mod_version_prefix_is_supported() { assert!(v("v1.2.3") < v("v1.2.4")) }
	#[test] fn mod_version_prefix_is_compared_lexically() { assert!(v("a1.2.3") < v("b1.2.3")) }
	#[test] fn mod_version_trailing_non_digit() { assert!(v("1.2a") < v("1.2b")) }
	#[test] fn mod_version_trailing_digit() { assert!(v("1.2") < v("1.3")) }
	#[test] fn mod_version_epoch_is_respected() { assert!(v("1:1.2") < v("2:v0.1")) }
	#[test] fn mod_version_epoch_dominates() { assert!(v("1:1.0") > v("2.0")) }
	#[test] fn mod_version_missing_epoch_is_zero() { assert!(v("0:1.0") == v("1.0")) }
	#[test] fn mod_version_leading_zeros_are_ignored() { assert!(v("1.01") == v("1.1")) }
	#[test] fn mod_version_dot_sorts_above_letters() { assert!(v("1.0") > v("1a")) }
	#[test] fn mod_version_repackaged_is_after_release() { assert!(v("1.0") < v("1.0.repackaged")) }
	#[test] fn mod_version_repackaged_is_before_next_release() { assert!(v("1.0.repackaged") < v("1.0.1")) }
	#[test] fn mod_version_huge_numbers_do_not_overflow() { assert!(v("1.99999999999999999999") < v("1.100000000000000000000")) }
	#[test] fn mod_version_empty_is_invalid() { assert!(matches!(PackageVersion::new(""), Err(crate::Error::InvalidVersionFormat(_)))) }
	#[test] fn mod_version_empty_after_epoch_is_invalid() { assert!(matches!(PackageVersion::new("1:"), Err(crate::Error::InvalidVersionFormat(_)))) }
	#[test] fn mod_version_newline_is_invalid() { assert!(matches!(PackageVersion::new("1.0\n2"), Err(crate::Error::InvalidVersionFormat(_)))) }
	#[test] fn mod_version_non_numeric_epoch_is_part_of_version() { assert_eq!(v("a:1.0").epoch(), 0) }
	#[test] fn mod_version_display_keeps_epoch() { assert_eq!(v("2:1.0").to_string(), "2:1.0") }

	#[test]
	fn mod_version_equal_versions_hash_equal() {
		use std::collections::HashSet;
		let set: HashSet<_> = [v("1.01"), v("1.1"), v("0:1.1")].into_iter().collect();
		assert_eq!(set.len(), 1);
	}

	#[test]
	fn mod_version_ordering_is_total() {
		let versions = ["0.1", "1", "1.0", "1.0.0", "1.0.repackaged", "1.0.1", "1.01.1", "v1.0", "1a", "1:0.1", "2.0-beta", "2.0"]
			.map(v);
		for a in &versions {
			for b in &versions {
				let ab = a.cmp(b);
				assert_eq!(ab, b.cmp(a).reverse(), "{a} vs {b}");
				for c in &versions {
					if ab != Ordering::Greater && b.cmp(c) != Ordering::Greater {
						assert_ne!(a.cmp(c), Ordering::Greater, "{a} <= {b} <= {c}");
					}
				}
			}
		}
	}

	#[test]
	fn mod_version_serializes_as_string() {
		let version = v("1:1.2.3");
		let json = serde_json::to_string(&version).unwrap();
		assert_eq!(json, "\"1:1.2.3\"");
		assert_eq!(serde_json::from_str::<PackageVersion>(&json).unwrap(), version);
	}
}

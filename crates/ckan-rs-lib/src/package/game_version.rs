//! Structs representing versions of the game and ranges of them.
//!
//! # Game Version Numbers
//!
//! Game versions follow the format `MAJOR`.`MINOR`.`PATCH`.`BUILD` where every component is optional
//! as long as the components before it are present. `"1.12"` is a valid version, `"1..3"` is not.
//!
//! A version with missing components stands for every version it could be expanded to,
//! see [`GameVersion::to_range()`] for how a version becomes a [`GameVersionRange`].
//!
//! # "any"
//!
//! The version with no components at all is [`GameVersion::ANY`], it sorts below every other version
//! and as a bound it means "unbounded".

use std::sync::OnceLock;

use serde::*;
use try_map::FallibleMapExt;

fn game_version_pattern() -> &'static regex::Regex {
	static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
	PATTERN.get_or_init(|| regex::Regex::new(r"^\d+(\.\d+(\.\d+(\.\d+)?)?)?$").expect("game version pattern should compile."))
}

/// Represents a version of the game.
///
/// # Eq & Ord
///
/// Components are compared in order, an undefined component sorts below any defined one.
/// So `1.12 < 1.12.0 < 1.12.1`.
///
/// The `Ord` implementation should not be used to check compatibility as `1.12` is meant to cover every patch
/// of `1.12`. Use [`GameVersionRange`]s for that.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GameVersion {
	major: Option<u32>,
	minor: Option<u32>,
	patch: Option<u32>,
	build: Option<u32>,
}

impl GameVersion {
	pub const ANY: GameVersion = GameVersion { major: None, minor: None, patch: None, build: None };

	/// Create a new [`GameVersion`] from a version string such as `"1.12.3"` or `"any"`.
	///
	/// # Errors
	/// [`Parse`](crate::Error::Parse) when the string isn't `"any"` or up to four dot separated integers.
	pub fn new(s: impl AsRef<str>) -> crate::Result<Self> {
		use crate::Error::Parse;
		let s = s.as_ref().trim();
		if s.eq_ignore_ascii_case("any") { return Ok(Self::ANY) }
		if !game_version_pattern().is_match(s) { return Err(Parse(format!("\"{}\" is not a valid game version", s))) }

		let components = s.split('.').collect::<Vec<_>>();
		let parse = |c: &&str| c.parse::<u32>().map_err(|_| Parse(format!("game version component \"{}\" is too large", c)));

		Ok(GameVersion {
			major: components.first().try_map(parse)?,
			minor: components.get(1).try_map(parse)?,
			patch: components.get(2).try_map(parse)?,
			build: components.get(3).try_map(parse)?,
		})
	}

	/// Builds a version from its components.
	///
	/// # Errors
	/// [`Parse`](crate::Error::Parse) when a component is defined while an earlier one isn't.
	pub fn from_parts(major: Option<u32>, minor: Option<u32>, patch: Option<u32>, build: Option<u32>) -> crate::Result<Self> {
		let defined = [major.is_some(), minor.is_some(), patch.is_some(), build.is_some()];
		if defined.windows(2).any(|w| !w[0] && w[1]) {
			return Err(crate::Error::Parse("game version components must be defined in order".into()))
		}
		Ok(GameVersion { major, minor, patch, build })
	}

	const fn full(major: u32, minor: u32, patch: u32, build: u32) -> Self {
		GameVersion { major: Some(major), minor: Some(minor), patch: Some(patch), build: Some(build) }
	}

	pub fn is_any(&self) -> bool { self.major.is_none() }

	pub fn major(&self) -> Option<u32> { self.major }
	pub fn minor(&self) -> Option<u32> { self.minor }
	pub fn patch(&self) -> Option<u32> { self.patch }
	pub fn build(&self) -> Option<u32> { self.build }

	/// Converts the version into the range of versions it stands for.
	///
	/// - `1.2.3.4` => `[1.2.3.4, 1.2.3.4]`
	/// - `1.2.3` => `[1.2.3.0, 1.2.4.0)`
	/// - `1.2` => `[1.2.0.0, 1.3.0.0)`
	/// - `1` => `[1.0.0.0, 2.0.0.0)`
	/// - `any` => unbounded
	pub fn to_range(&self) -> GameVersionRange {
		let (lower, upper) = match (self.major, self.minor, self.patch, self.build) {
			(Some(_), Some(_), Some(_), Some(_)) => (
				GameVersionBound::new(*self, true),
				GameVersionBound::new(*self, true),
			),
			(Some(major), Some(minor), Some(patch), None) => (
				GameVersionBound::new(Self::full(major, minor, patch, 0), true),
				GameVersionBound::new(Self::full(major, minor, patch.saturating_add(1), 0), false),
			),
			(Some(major), Some(minor), None, _) => (
				GameVersionBound::new(Self::full(major, minor, 0, 0), true),
				GameVersionBound::new(Self::full(major, minor.saturating_add(1), 0, 0), false),
			),
			(Some(major), None, _, _) => (
				GameVersionBound::new(Self::full(major, 0, 0, 0), true),
				GameVersionBound::new(Self::full(major.saturating_add(1), 0, 0, 0), false),
			),
			(None, _, _, _) => (GameVersionBound::UNBOUNDED, GameVersionBound::UNBOUNDED),
		};
		GameVersionRange::new(lower, upper)
	}
}

impl TryFrom<&str> for GameVersion {
	type Error = crate::Error;
	fn try_from(value: &str) -> Result<Self, Self::Error> { Self::new(value) }
}

impl TryFrom<String> for GameVersion {
	type Error = crate::Error;
	fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl std::str::FromStr for GameVersion {
	type Err = crate::Error;
	fn from_str(s: &str) -> Result<Self, Self::Err> { Self::new(s) }
}

impl From<GameVersion> for String {
	fn from(value: GameVersion) -> Self { value.to_string() }
}

impl std::fmt::Display for GameVersion {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if self.is_any() {
			return write!(f, "any")
		}
		let components = [self.major, self.minor, self.patch, self.build]
			.into_iter()
			.flatten()
			.map(|c| c.to_string())
			.collect::<Vec<_>>();
		write!(f, "{}", components.join("."))
	}
}

/// One end of a [`GameVersionRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameVersionBound {
	pub value: GameVersion,
	pub inclusive: bool,
}

impl Default for GameVersionBound {
	fn default() -> Self { Self::UNBOUNDED }
}

impl GameVersionBound {
	pub const UNBOUNDED: GameVersionBound = GameVersionBound { value: GameVersion::ANY, inclusive: true };

	pub fn new(value: GameVersion, inclusive: bool) -> Self {
		Self { value, inclusive }
	}

	pub fn is_unbounded(&self) -> bool {
		self.value.is_any()
	}

	/// The most restrictive of two lower bounds.
	///
	/// Unbounded loses to anything bounded, on equal values the exclusive bound wins.
	pub fn highest(lhs: Self, rhs: Self) -> Self {
		use std::cmp::Ordering;
		let order = lhs.is_unbounded().cmp(&rhs.is_unbounded())
			.then_with(|| rhs.value.cmp(&lhs.value))
			.then_with(|| lhs.inclusive.cmp(&rhs.inclusive));
		if order == Ordering::Greater { rhs } else { lhs }
	}

	/// The most restrictive of two upper bounds.
	///
	/// Unbounded loses to anything bounded, on equal values the exclusive bound wins.
	pub fn lowest(lhs: Self, rhs: Self) -> Self {
		use std::cmp::Ordering;
		let order = lhs.is_unbounded().cmp(&rhs.is_unbounded())
			.then_with(|| lhs.value.cmp(&rhs.value))
			.then_with(|| lhs.inclusive.cmp(&rhs.inclusive));
		if order == Ordering::Greater { rhs } else { lhs }
	}
}

/// An interval of game versions, each end may be inclusive or exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameVersionRange {
	pub lower: GameVersionBound,
	pub upper: GameVersionBound,
}

impl Default for GameVersionRange {
	fn default() -> Self { Self::ANY }
}

impl GameVersionRange {
	pub const ANY: GameVersionRange = GameVersionRange { lower: GameVersionBound::UNBOUNDED, upper: GameVersionBound::UNBOUNDED };

	pub fn new(lower: GameVersionBound, upper: GameVersionBound) -> Self {
		Self { lower, upper }
	}

	/// The range from the start of `lower` to the end of `upper`, as in `1.8 - 1.12` covering `[1.8.0.0, 1.13.0.0)`.
	pub fn from_versions(lower: &GameVersion, upper: &GameVersion) -> Self {
		Self::new(lower.to_range().lower, upper.to_range().upper)
	}

	pub fn is_any(&self) -> bool {
		self.lower.is_unbounded() && self.upper.is_unbounded()
	}

	/// Gets the intersection of two ranges, `None` when they don't overlap.
	pub fn intersect(&self, other: &Self) -> Option<Self> {
		let lower = GameVersionBound::highest(self.lower, other.lower);
		let upper = GameVersionBound::lowest(self.upper, other.upper);
		if Self::is_empty(&lower, &upper) {
			None
		} else {
			Some(Self::new(lower, upper))
		}
	}

	fn is_empty(lower: &GameVersionBound, upper: &GameVersionBound) -> bool {
		if lower.is_unbounded() || upper.is_unbounded() {
			return false
		}
		upper.value < lower.value || (lower.value == upper.value && (!lower.inclusive || !upper.inclusive))
	}

	/// Checks if every version in `other` is also in this range.
	pub fn is_superset_of(&self, other: &Self) -> bool {
		let lower_ok = self.lower.is_unbounded()
			|| (!other.lower.is_unbounded() && (
				self.lower.value < other.lower.value
				|| (self.lower.value == other.lower.value && (self.lower.inclusive || !other.lower.inclusive))
			));
		let upper_ok = self.upper.is_unbounded()
			|| (!other.upper.is_unbounded() && (
				other.upper.value < self.upper.value
				|| (other.upper.value == self.upper.value && (self.upper.inclusive || !other.upper.inclusive))
			));
		lower_ok && upper_ok
	}

	/// Checks if every version `version` stands for is in this range.
	pub fn contains(&self, version: &GameVersion) -> bool {
		self.is_superset_of(&version.to_range())
	}
}

impl From<GameVersion> for GameVersionRange {
	fn from(value: GameVersion) -> Self { value.to_range() }
}

impl std::fmt::Display for GameVersionRange {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let bound = |b: &GameVersionBound| if b.is_unbounded() { String::new() } else { b.value.to_string() };
		write!(f, "{}{},{}{}",
			if self.lower.inclusive { '[' } else { '(' },
			bound(&self.lower),
			bound(&self.upper),
			if self.upper.inclusive { ']' } else { ')' },
		)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn gv(s: &str) -> GameVersion { GameVersion::new(s).unwrap() }
	fn bound(s: &str, inclusive: bool) -> GameVersionBound { GameVersionBound::new(gv(s), inclusive) }
	fn range(lower: (&str, bool), upper: (&str, bool)) -> GameVersionRange { GameVersionRange::new(bound(lower.0, lower.1), bound(upper.0, upper.1)) }

	#[test] fn game_version_compares_as_ints() { assert!(gv("1.9") < gv("1.10")) }
	#[test] fn game_version_short_version_is_lt() { assert!(gv("1.12") < gv("1.12.1")) }
	#[test] fn game_version_any_is_lowest() { assert!(GameVersion::ANY < gv("0")) }
	#[test] fn game_version_any_parses() { assert!(gv("Any").is_any()) }
	#[test] fn game_version_rejects_empty_components() { assert!(GameVersion::new("1..3").is_err()) }
	#[test] fn game_version_rejects_five_components() { assert!(GameVersion::new("1.2.3.4.5").is_err()) }
	#[test] fn game_version_rejects_gaps() { assert!(GameVersion::from_parts(Some(1), None, Some(2), None).is_err()) }
	#[test] fn game_version_display_round_trips() { assert_eq!(gv("1.12.3").to_string(), "1.12.3") }
	#[test] fn game_version_minor_to_range() { assert_eq!(gv("1.2").to_range(), range(("1.2.0.0", true), ("1.3.0.0", false))) }
	#[test] fn game_version_patch_to_range() { assert_eq!(gv("1.2.3").to_range(), range(("1.2.3.0", true), ("1.2.4.0", false))) }
	#[test] fn game_version_build_to_range() { assert_eq!(gv("1.2.3.4").to_range(), range(("1.2.3.4", true), ("1.2.3.4", true))) }
	#[test] fn game_version_major_to_range() { assert_eq!(gv("1").to_range(), range(("1.0.0.0", true), ("2.0.0.0", false))) }
	#[test] fn game_version_any_to_range() { assert_eq!(GameVersion::ANY.to_range(), GameVersionRange::ANY) }

	#[test] fn range_display() { assert_eq!(range(("1.2.3.4", false), ("5.6.7.8", true)).to_string(), "(1.2.3.4,5.6.7.8]") }
	#[test] fn range_display_unbounded() { assert_eq!(GameVersionRange::ANY.to_string(), "[,]") }

	#[test] fn range_any_intersect_any_is_any() { assert_eq!(GameVersionRange::ANY.intersect(&GameVersionRange::ANY), Some(GameVersionRange::ANY)) }
	#[test] fn range_exclusive_point_is_empty() { assert_eq!(range(("1.2.3.4", false), ("1.2.3.4", false)).intersect(&range(("1.2.3.4", true), ("1.2.3.4", true))), None) }
	#[test] fn range_inclusive_point_intersects_itself() { let r = range(("1.0.4.1234", true), ("1.0.4.1234", true)); assert_eq!(r.intersect(&r), Some(r)) }
	#[test] fn range_disjoint_points() { assert_eq!(range(("1.0.4.1235", true), ("1.0.4.1235", true)).intersect(&range(("1.0.4.1234", true), ("1.0.4.1234", true))), None) }
	#[test] fn range_nested_intersection() { assert_eq!(range(("1.0.0.0", true), ("1.1.0.0", false)).intersect(&range(("1.0.4.0", true), ("1.0.5.0", false))), Some(range(("1.0.4.0", true), ("1.0.5.0", false)))) }
	#[test] fn range_touching_exclusive_is_empty() { assert_eq!(range(("1.1.0.0", true), ("1.2.0.0", false)).intersect(&range(("1.0.0.0", true), ("1.1.0.0", false))), None) }
	#[test] fn range_point_inside_range() { assert_eq!(range(("1.0.4.0", true), ("1.0.5.0", false)).intersect(&range(("1.0.4.1234", true), ("1.0.4.1234", true))), Some(range(("1.0.4.1234", true), ("1.0.4.1234", true)))) }
	#[test] fn range_half_open_lower() { assert_eq!(GameVersionRange::new(bound("1.0.4.0", true), GameVersionBound::UNBOUNDED).intersect(&range(("1.0.4.0", true), ("1.0.5.0", false))), Some(range(("1.0.4.0", true), ("1.0.5.0", false)))) }
	#[test] fn range_half_open_upper() { assert_eq!(GameVersionRange::new(GameVersionBound::UNBOUNDED, bound("1.0.4.0", true)).intersect(&range(("1.0.4.0", true), ("1.0.5.0", false))), Some(range(("1.0.4.0", true), ("1.0.4.0", true)))) }
	#[test] fn range_bounded_intersect_any() { let r = GameVersionRange::new(bound("1.0.0.0", true), GameVersionBound::UNBOUNDED); assert_eq!(r.intersect(&GameVersionRange::ANY), Some(r)) }

	#[test]
	fn range_intersection_is_commutative() {
		let ranges = [
			GameVersionRange::ANY,
			range(("1.0.0.0", true), ("1.1.0.0", false)),
			range(("1.0.4.0", true), ("1.0.5.0", false)),
			range(("1.0.5.0", true), ("1.0.5.0", true)),
			range(("1.1.0.0", false), ("1.2.0.0", true)),
			GameVersionRange::new(GameVersionBound::UNBOUNDED, bound("1.0.5.0", false)),
			GameVersionRange::new(bound("1.0.5.0", true), GameVersionBound::UNBOUNDED),
		];
		for a in &ranges {
			for b in &ranges {
				assert_eq!(a.intersect(b), b.intersect(a), "{a} and {b}");
			}
		}
	}

	#[test] fn superset_of_itself() { let r = range(("1.0.0.0", false), ("1.1.0.0", false)); assert!(r.is_superset_of(&r)) }
	#[test] fn any_is_superset_of_everything() { assert!(GameVersionRange::ANY.is_superset_of(&range(("1.0.0.0", true), ("1.1.0.0", false)))) }
	#[test] fn bounded_is_not_superset_of_any() { assert!(!range(("1.0.0.0", true), ("1.1.0.0", false)).is_superset_of(&GameVersionRange::ANY)) }
	#[test] fn inclusive_accepts_exclusive() { assert!(range(("1.0.0.0", true), ("1.1.0.0", true)).is_superset_of(&range(("1.0.0.0", false), ("1.1.0.0", false)))) }
	#[test] fn exclusive_rejects_inclusive() { assert!(!range(("1.0.0.0", false), ("1.1.0.0", false)).is_superset_of(&range(("1.0.0.0", true), ("1.1.0.0", true)))) }

	#[test]
	fn superset_is_transitive() {
		let a = GameVersionRange::new(bound("1.0.0.0", true), GameVersionBound::UNBOUNDED);
		let b = range(("1.0.0.0", true), ("1.5.0.0", false));
		let c = range(("1.2.0.0", false), ("1.3.0.0", true));
		assert!(a.is_superset_of(&b) && b.is_superset_of(&c) && a.is_superset_of(&c));
	}

	#[test] fn range_contains_patch() { assert!(gv("1.12").to_range().contains(&gv("1.12.3"))) }
	#[test] fn range_does_not_contain_other_minor() { assert!(!gv("1.12").to_range().contains(&gv("1.11.3"))) }
	#[test] fn range_does_not_contain_wider_version() { assert!(!gv("1.12.3").to_range().contains(&gv("1.12"))) }
	#[test] fn range_from_versions() { assert!(GameVersionRange::from_versions(&gv("1.8"), &gv("1.12")).contains(&gv("1.12.5"))) }
}

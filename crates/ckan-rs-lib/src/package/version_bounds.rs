use serde::{Serialize, Deserialize};

/// A generic enum to describe a range of versions.
///
/// Both ends are inclusive.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionBounds<T>
where T: std::cmp::PartialEq + std::cmp::Ord + std::clone::Clone,
{
	#[default] Any,
	Explicit(T),
	MinOnly(T),
	MaxOnly(T),
	MinMax(T, T),
}

impl<T> VersionBounds<T>
where T: std::cmp::PartialEq + std::cmp::Ord + std::clone::Clone,
{
	/// When all arguments are `None` will return `Any`
	///
	/// # Errors
	/// [`Parse`](crate::Error::Parse) when `explicit` is given alongside `min` or `max`.
	pub fn new(explicit: Option<T>, min: Option<T>, max: Option<T>) -> crate::Result<VersionBounds<T>> {
		match (explicit, min, max) {
			(None, None, None) => Ok(VersionBounds::Any),
			(None, None, Some(max)) => Ok(VersionBounds::MaxOnly(max)),
			(None, Some(min), None) => Ok(VersionBounds::MinOnly(min)),
			(None, Some(min), Some(max)) => Ok(VersionBounds::MinMax(min, max)),
			(Some(e), None, None) => Ok(VersionBounds::Explicit(e)),
			_ => Err(crate::Error::Parse("Attempted to create bounds with both explicit and min or max version constraint".to_string()))
		}
	}

	pub fn is_any(&self) -> bool {
		matches!(self, VersionBounds::Any)
	}

	pub fn is_version_within(&self, other: &T) -> bool {
		match self {
			VersionBounds::Any => true,
			VersionBounds::Explicit(v) => other == v,
			VersionBounds::MinOnly(min) => other >= min,
			VersionBounds::MaxOnly(max) => other <= max,
			VersionBounds::MinMax(min, max) => min <= other && other <= max,
		}
	}

	/// The lower end, `None` when unbounded.
	pub fn min(&self) -> Option<&T> {
		match self {
			VersionBounds::Explicit(v) | VersionBounds::MinOnly(v) | VersionBounds::MinMax(v, _) => Some(v),
			VersionBounds::Any | VersionBounds::MaxOnly(_) => None,
		}
	}

	/// The upper end, `None` when unbounded.
	pub fn max(&self) -> Option<&T> {
		match self {
			VersionBounds::Explicit(v) | VersionBounds::MaxOnly(v) | VersionBounds::MinMax(_, v) => Some(v),
			VersionBounds::Any | VersionBounds::MinOnly(_) => None,
		}
	}
}

impl<T> std::fmt::Display for VersionBounds<T>
where T: std::cmp::PartialEq + std::cmp::Ord + std::clone::Clone + std::fmt::Display,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			VersionBounds::Any => write!(f, "any version"),
			VersionBounds::Explicit(v) => write!(f, "{}", v),
			VersionBounds::MinOnly(min) => write!(f, "{} or later", min),
			VersionBounds::MaxOnly(max) => write!(f, "{} or earlier", max),
			VersionBounds::MinMax(min, max) => write!(f, "{} -- {}", min, max),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test] fn bounds_rejects_mixed() { assert!(VersionBounds::new(Some(1), Some(0), None).is_err()) }
	#[test] fn bounds_none_is_any() { assert_eq!(VersionBounds::<u32>::new(None, None, None).unwrap(), VersionBounds::Any) }
	#[test] fn bounds_min_max_inclusive() { assert!(VersionBounds::MinMax(1, 3).is_version_within(&3)) }
	#[test] fn bounds_min_excludes_lower() { assert!(!VersionBounds::MinOnly(2).is_version_within(&1)) }
	#[test] fn bounds_display() { assert_eq!(VersionBounds::MinOnly(2).to_string(), "2 or later") }
}

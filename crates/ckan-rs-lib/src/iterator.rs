//! Iterator adaptors for filtering streams of packages.

use crate::package::*;

pub struct GameVersionMatches<'a, I>
where
	I: Iterator<Item = &'a Package>,
{
	criteria: GameVersionRange,
	underlying: I,
}

impl<'a, I> Iterator for GameVersionMatches<'a, I>
where
	I: Iterator<Item = &'a Package>,
{
	type Item = I::Item;

	fn next(&mut self) -> Option<Self::Item> {
		self.underlying.by_ref().find(|package| package.is_compatible(&self.criteria))
	}
}

pub trait GameVersionMatchesExt<'a>: Iterator<Item = &'a Package>
{
	/// Filters the iterator to packages compatible with some version in `criteria`
	fn game_version_matches(self, criteria: GameVersionRange) -> GameVersionMatches<'a, Self>
	where
		Self: Sized,
	{
		GameVersionMatches { underlying: self, criteria }
	}
}

impl<'a, I: Iterator<Item = &'a Package>> GameVersionMatchesExt<'a> for I {}


pub struct PackageVersionMatches<'a, I>
where
	I: Iterator<Item = &'a Package>,
{
	bounds: PackageVersionBounds,
	underlying: I,
}

impl<'a, I> Iterator for PackageVersionMatches<'a, I>
where
	I: Iterator<Item = &'a Package>,
{
	type Item = I::Item;

	fn next(&mut self) -> Option<Self::Item> {
		self.underlying.by_ref().find(|package| self.bounds.is_version_within(&package.identifier.version))
	}
}

pub trait PackageVersionMatchesExt<'a>: Iterator<Item = &'a Package>
{
	/// Filters the iterator to packages matching the requirements of `bounds`
	fn package_version_matches(self, bounds: PackageVersionBounds) -> PackageVersionMatches<'a, Self>
	where
		Self: Sized,
	{
		PackageVersionMatches { underlying: self, bounds }
	}
}

impl<'a, I: Iterator<Item = &'a Package>> PackageVersionMatchesExt<'a> for I {}

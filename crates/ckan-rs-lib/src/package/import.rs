//! Functions and methods for reading `.ckan` JSON into packages.
//!
//! The `.ckan` format is looser than what serde's derive handles well:
//! fields can be one-or-many, versions need validating and several fields depend on each other.

use serde_json::{Map, Value};

use super::*;
use crate::Error::Parse;

/// Gets a string field, `None` when it's missing or `null`.
fn get_string(obj: &Map<String, Value>, key: &str) -> crate::Result<Option<String>> {
	match obj.get(key) {
		None | Some(Value::Null) => Ok(None),
		Some(Value::String(s)) => Ok(Some(s.clone())),
		Some(_) => Err(Parse(format!("{} must be a string", key))),
	}
}

/// Gets a field that may be either a single string or an array of strings.
fn get_one_or_many_string(obj: &Map<String, Value>, key: &str) -> crate::Result<Vec<String>> {
	match obj.get(key) {
		None | Some(Value::Null) => Ok(Vec::new()),
		Some(Value::String(s)) => Ok(vec![s.clone()]),
		Some(Value::Array(arr)) => arr.iter()
			.map(|e| e.as_str().map(str::to_string).ok_or_else(|| Parse(format!("{} elements must be strings", key))))
			.collect(),
		Some(_) => Err(Parse(format!("{} must be a string or an array of strings", key))),
	}
}

fn get_game_version(obj: &Map<String, Value>, key: &str) -> crate::Result<Option<GameVersion>> {
	match obj.get(key) {
		None | Some(Value::Null) => Ok(None),
		Some(Value::String(s)) => GameVersion::new(s).map(Some),
		/* Some older metadata has bare numbers such as `1.1` */
		Some(Value::Number(n)) => GameVersion::new(n.to_string()).map(Some),
		Some(_) => Err(Parse(format!("{} must be a string", key))),
	}
}

fn get_package_version(obj: &Map<String, Value>, key: &str) -> crate::Result<Option<PackageVersion>> {
	get_string(obj, key)?.map(PackageVersion::new).transpose()
}

impl install::InstallDirective {
	pub fn from_json(v: &Value) -> crate::Result<Vec<Self>> {
		use install::*;

		let arr = v.as_array().ok_or_else(|| Parse("install must be an array".to_string()))?;
		let mut directives = Vec::<Self>::new();

		for elem in arr {
			let obj = elem.as_object().ok_or_else(|| Parse("install elements must be objects".to_string()))?;

			let sources = [
				get_string(obj, "file")?.map(SourceDirective::File),
				get_string(obj, "find")?.map(SourceDirective::Find),
				get_string(obj, "find_regexp")?.map(SourceDirective::FindRegExp),
			];
			let mut sources = sources.into_iter().flatten();
			let source = sources.next().ok_or_else(|| Parse("install has no valid source directive".to_string()))?;
			if sources.next().is_some() {
				return Err(Parse("install has more than one source directive".to_string()));
			}

			let install_to = get_string(obj, "install_to")?.ok_or_else(|| Parse("install has no destination directive".to_string()))?;

			let mut additional = Vec::<OptionalDirective>::new();
			if let Some(as_name) = get_string(obj, "as")? {
				additional.push(OptionalDirective::As(as_name));
			}
			if obj.contains_key("filter") {
				additional.push(OptionalDirective::Filter(get_one_or_many_string(obj, "filter")?));
			}
			if obj.contains_key("filter_regexp") {
				additional.push(OptionalDirective::FilterRegExp(get_one_or_many_string(obj, "filter_regexp")?));
			}
			if obj.contains_key("include_only") {
				additional.push(OptionalDirective::IncludeOnly(get_one_or_many_string(obj, "include_only")?));
			}
			if obj.contains_key("include_only_regexp") {
				additional.push(OptionalDirective::IncludeOnlyRegExp(get_one_or_many_string(obj, "include_only_regexp")?));
			}
			if let Some(f) = obj.get("find_matches_files") {
				additional.push(OptionalDirective::FindMatchesFiles(f.as_bool().ok_or_else(|| Parse("find_matches_files directive must be a bool".to_string()))?));
			}

			directives.push(InstallDirective::new(source, install_to, additional));
		}

		Ok(directives)
	}
}

impl PackageDescriptor {
	pub fn from_json(v: &Value) -> crate::Result<Self> {
		let obj = v.as_object().ok_or_else(|| Parse("relationship must be an object".to_string()))?;
		Ok(PackageDescriptor::new(
			get_string(obj, "name")?.ok_or_else(|| Parse("relationship has no name field".to_string()))?,
			VersionBounds::new(
				get_package_version(obj, "version")?,
				get_package_version(obj, "min_version")?,
				get_package_version(obj, "max_version")?,
			)?,
		))
	}
}

impl Relationship {
	/// Reads an array of relationships such as the value of `depends`.
	pub fn from_json(v: &Value) -> crate::Result<Vec<Self>> {
		let arr = v.as_array().ok_or_else(|| Parse("relationships must be an array".to_string()))?;
		let mut relationships = Vec::<Relationship>::new();

		for elem in arr {
			let obj = elem.as_object().ok_or_else(|| Parse("relationship must be an object".to_string()))?;
			let relationship = if let Some(any_of) = obj.get("any_of") {
				let options = any_of.as_array().ok_or_else(|| Parse("any_of constraint must be an array".to_string()))?;
				Relationship::AnyOf(options.iter().map(PackageDescriptor::from_json).collect::<crate::Result<Vec<_>>>()?)
			} else if obj.contains_key("name") {
				Relationship::One(PackageDescriptor::from_json(elem)?)
			} else {
				return Err(Parse("relationship object must be a relationship or any_of constraint".to_string()));
			};
			relationships.push(relationship);
		}

		Ok(relationships)
	}
}

impl Package {
	/// Reads a package from a `.ckan` stanza.
	///
	/// # Errors
	/// - [`InvalidVersionFormat`](crate::Error::InvalidVersionFormat) when the package or a relationship has a bad version.
	/// - [`Parse`](crate::Error::Parse) for missing required fields, wrong types or mixing `ksp_version` with `ksp_version_min`/`ksp_version_max`.
	pub fn read_from_json(v: Value) -> crate::Result<Self> {
		let obj = v.as_object().ok_or_else(|| Parse("JSON is not an object".to_string()))?;

		let identifier = get_string(obj, "identifier")?.ok_or_else(|| Parse("package has no identifier".to_string()))?;
		let version = get_package_version(obj, "version")?.ok_or_else(|| Parse(format!("{} has no version", identifier)))?;

		let relationships = |key: &str| -> crate::Result<Vec<Relationship>> {
			obj.get(key).filter(|v| !v.is_null()).map_or_else(|| Ok(Vec::new()), Relationship::from_json)
		};

		Ok(Package {
			spec_version: match obj.get("spec_version") {
				None | Some(Value::Null) => "1".to_string(),
				Some(Value::Number(v)) => v.to_string(),
				Some(Value::String(v)) => v.to_owned(),
				Some(_) => return Err(Parse("spec_version must be a string or number".to_string())),
			},
			name: get_string(obj, "name")?.unwrap_or_else(|| identifier.clone()),
			blurb: get_string(obj, "abstract")?.unwrap_or_default(),
			author: get_one_or_many_string(obj, "author")?,
			download: get_string(obj, "download")?,
			license: get_one_or_many_string(obj, "license")?,

			/* Optionals */
			install: obj.get("install").filter(|v| !v.is_null()).map_or_else(|| Ok(Vec::new()), install::InstallDirective::from_json)?,
			description: get_string(obj, "description")?,
			release_status: match get_string(obj, "release_status")?.as_deref() {
				None | Some("stable") => ReleaseStatus::Stable,
				Some("testing") => ReleaseStatus::Testing,
				Some("development") => ReleaseStatus::Development,
				Some(other) => return Err(Parse(format!("unknown release_status {}", other))),
			},
			game_version: VersionBounds::new(
				get_game_version(obj, "ksp_version")?,
				get_game_version(obj, "ksp_version_min")?,
				get_game_version(obj, "ksp_version_max")?,
			)?,
			game_version_strict: obj.get("ksp_version_strict").and_then(Value::as_bool).unwrap_or(false),
			tags: get_one_or_many_string(obj, "tags")?,
			release_date: get_string(obj, "release_date")?,
			depends: relationships("depends")?,
			recommends: relationships("recommends")?,
			suggests: relationships("suggests")?,
			supports: relationships("supports")?,
			conflicts: relationships("conflicts")?,
			replaced_by: obj.get("replaced_by").filter(|v| !v.is_null()).map(PackageDescriptor::from_json).transpose()?,
			kind: match get_string(obj, "kind")?.as_deref() {
				None | Some("package") => Kind::Package,
				Some("metapackage") => Kind::MetaPackage,
				Some("dlc") => Kind::DLC,
				Some(other) => return Err(Parse(format!("unknown kind {}", other))),
			},
			provides: get_one_or_many_string(obj, "provides")?,
			resources: match obj.get("resources") {
				Some(Value::Object(map)) => map.iter()
					.filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
					.collect(),
				_ => BTreeMap::new(),
			},
			identifier: PackageIdentifier::new(identifier, version),
		})
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use serde_json::json;

	#[test]
	fn reads_full_stanza() {
		let package = Package::read_from_json(json!({
			"spec_version": "v1.4",
			"identifier": "ModA",
			"name": "Mod A",
			"abstract": "Does things",
			"author": "someone",
			"license": ["MIT", "GPL-3.0"],
			"version": "1:1.2.3",
			"ksp_version_min": "1.8",
			"ksp_version_max": "1.12",
			"release_status": "testing",
			"depends": [{"name": "ModB", "min_version": "2.0"}, {"any_of": [{"name": "ModC"}, {"name": "ModD"}]}],
			"provides": ["Virtual"],
			"install": [{"find": "ModA", "install_to": "GameData", "filter": "Thumbs.db"}],
			"resources": {"homepage": "https://example.com", "x_screenshot": 3},
		})).unwrap();

		assert_eq!(package.identifier.identifier, "ModA");
		assert_eq!(package.identifier.version.epoch(), 1);
		assert_eq!(package.author, ["someone"]);
		assert_eq!(package.license.len(), 2);
		assert_eq!(package.release_status, ReleaseStatus::Testing);
		assert_eq!(package.depends.len(), 2);
		assert!(matches!(package.depends[1], Relationship::AnyOf(ref v) if v.len() == 2));
		assert_eq!(package.install.len(), 1);
		assert_eq!(package.resources.len(), 1);
	}

	#[test] fn bad_version_is_invalid_version_format() { assert!(matches!(Package::read_from_json(json!({"identifier": "A", "version": "1:"})), Err(crate::Error::InvalidVersionFormat(_)))) }
	#[test] fn bad_relationship_version_is_invalid_version_format() { assert!(matches!(Package::read_from_json(json!({"identifier": "A", "version": "1", "depends": [{"name": "B", "version": ""}]})), Err(crate::Error::InvalidVersionFormat(_)))) }
	#[test] fn mixed_game_versions_is_parse_error() { assert!(matches!(Package::read_from_json(json!({"identifier": "A", "version": "1", "ksp_version": "1.12", "ksp_version_min": "1.8"})), Err(crate::Error::Parse(_)))) }
	#[test] fn missing_identifier_is_parse_error() { assert!(matches!(Package::read_from_json(json!({"version": "1"})), Err(crate::Error::Parse(_)))) }
	#[test] fn two_sources_is_parse_error() { assert!(Package::read_from_json(json!({"identifier": "A", "version": "1", "install": [{"file": "a", "find": "b", "install_to": "GameData"}]})).is_err()) }
	#[test] fn unknown_kind_is_parse_error() { assert!(Package::read_from_json(json!({"identifier": "A", "version": "1", "kind": "plugin"})).is_err()) }
	#[test] fn dlc_kind() { assert!(Package::read_from_json(json!({"identifier": "A", "version": "1", "kind": "dlc"})).unwrap().is_dlc()) }
}

//! Module for only DependencyGraph functions not related to the overall resolving process.

use std::collections::BTreeMap;

use petgraph::prelude::*;
use petgraph::visit::DfsPostOrder;

use crate::package::*;

/// Selected packages with an edge from each package to the selected packages satisfying its depends.
pub(super) struct DependencyGraph<'r> {
	graph: DiGraph<&'r Package, ()>,
	/// Node of every package in the order it was selected.
	nodes: Vec<NodeIndex>,
}

impl<'r> DependencyGraph<'r> {
	/// `selected` maps identifiers and provided aliases to the package filling them.
	pub fn new(packages: &[&'r Package], selected: &BTreeMap<String, &'r Package>) -> Self {
		let mut graph = DiGraph::new();
		let nodes = packages.iter().map(|p| graph.add_node(*p)).collect::<Vec<_>>();
		let index_of = packages.iter()
			.zip(&nodes)
			.map(|(p, i)| (p.identifier.identifier.as_str(), *i))
			.collect::<BTreeMap<_, _>>();

		for (package, node) in packages.iter().zip(&nodes) {
			for rel in &package.depends {
				let target = rel.names()
					.filter_map(|name| selected.get(name))
					.find_map(|dependency| index_of.get(dependency.identifier.identifier.as_str()));
				if let Some(target) = target {
					if target != node {
						graph.update_edge(*node, *target, ());
					}
				}
			}
		}

		Self { graph, nodes }
	}

	/// Every package after everything it depends on, otherwise in selection order.
	///
	/// Packages in a dependency cycle are ordered by which was selected first.
	pub fn install_order(&self) -> Vec<&'r Package> {
		let mut order = Vec::with_capacity(self.nodes.len());
		let mut dfs = DfsPostOrder::empty(&self.graph);
		for node in &self.nodes {
			dfs.move_to(*node);
			while let Some(n) = dfs.next(&self.graph) {
				order.push(self.graph[n]);
			}
		}
		order
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use serde_json::json;

	fn package(json: serde_json::Value) -> Package { Package::read_from_json(json).unwrap() }

	fn order(packages: &[Package]) -> Vec<String> {
		let refs = packages.iter().collect::<Vec<_>>();
		let selected = packages.iter()
			.flat_map(|p| p.provides_list().map(move |name| (name.to_string(), p)))
			.collect::<BTreeMap<_, _>>();
		DependencyGraph::new(&refs, &selected).install_order().iter().map(|p| p.identifier.identifier.clone()).collect()
	}

	#[test]
	fn dependencies_come_first() {
		let packages = [
			package(json!({"identifier": "A", "version": "1", "depends": [{"name": "B"}, {"name": "C"}]})),
			package(json!({"identifier": "C", "version": "1"})),
			package(json!({"identifier": "B", "version": "1", "depends": [{"name": "C"}]})),
		];
		assert_eq!(order(&packages), ["C", "B", "A"]);
	}

	#[test]
	fn provided_dependencies_come_first() {
		let packages = [
			package(json!({"identifier": "A", "version": "1", "depends": [{"name": "Virtual"}]})),
			package(json!({"identifier": "Impl", "version": "1", "provides": ["Virtual"]})),
		];
		assert_eq!(order(&packages), ["Impl", "A"]);
	}

	#[test]
	fn cycles_are_ordered_once() {
		let packages = [
			package(json!({"identifier": "A", "version": "1", "depends": [{"name": "B"}]})),
			package(json!({"identifier": "B", "version": "1", "depends": [{"name": "A"}]})),
		];
		assert_eq!(order(&packages), ["B", "A"]);
	}

	#[test]
	fn unrelated_keep_selection_order() {
		let packages = [
			package(json!({"identifier": "Z", "version": "1"})),
			package(json!({"identifier": "A", "version": "1"})),
		];
		assert_eq!(order(&packages), ["Z", "A"]);
	}
}

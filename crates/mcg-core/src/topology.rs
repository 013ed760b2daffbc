//! Supply reachability across lines and conversion links.
//!
//! The supply graph is directed: lines carry energy both ways between their
//! endpoints, links carry it from their input to each output with a positive
//! efficiency. A bus is *supplied* when it is reachable from a bus holding a
//! dispatchable generator.

use std::collections::{BTreeSet, HashMap};

use petgraph::algo::connected_components;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;

use crate::Network;

/// Directed graph of buses; edges point in the direction energy can flow.
#[derive(Debug, Clone)]
pub struct SupplyGraph {
    graph: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
    sources: Vec<NodeIndex>,
}

impl SupplyGraph {
    pub fn from_network(network: &Network) -> Self {
        let mut graph = DiGraph::with_capacity(network.buses.len(), network.lines.len() * 2);
        let mut index = HashMap::with_capacity(network.buses.len());
        for name in network.buses.keys() {
            index.insert(name.clone(), graph.add_node(name.clone()));
        }

        for line in network.lines.values() {
            if let (Some(&a), Some(&b)) = (index.get(&line.bus0), index.get(&line.bus1)) {
                graph.add_edge(a, b, ());
                graph.add_edge(b, a, ());
            }
        }
        for link in network.links.values() {
            let Some(&input) = index.get(&link.input) else {
                continue;
            };
            for port in &link.outputs {
                if !port.efficiency.is_positive() {
                    continue;
                }
                if let Some(&output) = index.get(&port.bus) {
                    graph.add_edge(input, output, ());
                }
            }
        }

        let mut sources: Vec<NodeIndex> = network
            .generators
            .values()
            .filter(|gen| gen.is_dispatchable())
            .filter_map(|gen| index.get(&gen.bus).copied())
            .collect();
        sources.sort();
        sources.dedup();

        Self {
            graph,
            index,
            sources,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Buses reachable from any dispatchable generator.
    pub fn supplied(&self) -> BTreeSet<String> {
        let mut reached = vec![false; self.graph.node_count()];
        for &source in &self.sources {
            if reached[source.index()] {
                continue;
            }
            let mut bfs = Bfs::new(&self.graph, source);
            while let Some(node) = bfs.next(&self.graph) {
                reached[node.index()] = true;
            }
        }
        self.graph
            .node_indices()
            .filter(|node| reached[node.index()])
            .map(|node| self.graph[node].clone())
            .collect()
    }

    pub fn is_supplied(&self, bus: &str) -> bool {
        self.index.contains_key(bus) && self.supplied().contains(bus)
    }

    /// Weakly connected components, counting isolated buses.
    pub fn island_count(&self) -> usize {
        connected_components(&self.graph)
    }
}

pub fn supplied_buses(network: &Network) -> BTreeSet<String> {
    SupplyGraph::from_network(network).supplied()
}

/// Buses with positive aggregate demand that no generator can reach, in bus order.
pub fn unsupplied_demand_buses(network: &Network) -> Vec<String> {
    let supplied = supplied_buses(network);
    network
        .buses
        .keys()
        .filter(|bus| !supplied.contains(*bus) && network.aggregate_demand(bus) > 0.0)
        .cloned()
        .collect()
}

pub fn island_count(network: &Network) -> usize {
    SupplyGraph::from_network(network).island_count()
}

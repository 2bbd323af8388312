use crate::element::{BranchNum, BusNum, LossModel};
use crate::network::LfNetwork;
use anyhow::{anyhow, Result};
use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::{HashMap, HashSet, VecDeque};

/// Summary statistics produced by `graph stats` over the energized topology.
#[derive(Debug, serde::Serialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub disabled_buses: usize,
    pub disabled_branches: usize,
    pub connected_components: usize,
    pub min_degree: usize,
    pub avg_degree: f64,
    pub max_degree: usize,
    pub density: f64,
    pub zero_impedance_networks_ac: usize,
    pub zero_impedance_networks_dc: usize,
}

/// Island summary used in `graph islands`.
#[derive(Debug, serde::Serialize)]
pub struct IslandSummary {
    pub island_id: usize,
    pub node_count: usize,
    pub has_slack: bool,
}

/// Island of every enabled bus.
#[derive(Debug, serde::Serialize)]
pub struct NodeAssignment {
    pub bus: BusNum,
    pub label: String,
    pub island_id: usize,
}

#[derive(Debug, serde::Serialize)]
pub struct IslandAnalysis {
    pub islands: Vec<IslandSummary>,
    pub assignments: Vec<NodeAssignment>,
}

/// Enabled buses as nodes and connectivity edges as edges.
fn energized_graph(network: &LfNetwork) -> UnGraph<BusNum, BranchNum> {
    let mut graph = UnGraph::default();
    let mut index: HashMap<BusNum, NodeIndex> = HashMap::new();
    for bus in network.buses().iter().filter(|bus| !bus.is_disabled()) {
        index.insert(bus.num(), graph.add_node(bus.num()));
    }
    for branch in network.branches() {
        if let Some((b1, b2)) = network.connectivity_edge(branch.num()) {
            if let (Some(&n1), Some(&n2)) = (index.get(&b1), index.get(&b2)) {
                graph.add_edge(n1, n2, branch.num());
            }
        }
    }
    graph
}

/// Density, degree distribution and component count of the energized topology.
pub fn graph_stats(network: &LfNetwork) -> Result<GraphStats> {
    let graph = energized_graph(network);
    let node_count = graph.node_count();
    let edge_count = graph.edge_count();
    let degrees: Vec<usize> = graph.node_indices().map(|node| graph.edges(node).count()).collect();
    let min_degree = *degrees.iter().min().unwrap_or(&0);
    let max_degree = *degrees.iter().max().unwrap_or(&0);
    let avg_degree = if node_count == 0 {
        0.0
    } else {
        degrees.iter().copied().sum::<usize>() as f64 / node_count as f64
    };
    let density = if node_count < 2 {
        0.0
    } else {
        2.0 * edge_count as f64 / (node_count as f64 * (node_count as f64 - 1.0))
    };
    let zin_count = |model| network.zero_impedance_networks(model).map_or(0, |z| z.len());
    Ok(GraphStats {
        node_count,
        edge_count,
        disabled_buses: network.disabled_buses().count(),
        disabled_branches: network.disabled_branches().count(),
        connected_components: connected_components(&graph),
        min_degree,
        avg_degree,
        max_degree,
        density,
        zero_impedance_networks_ac: zin_count(LossModel::Ac),
        zero_impedance_networks_dc: zin_count(LossModel::Dc),
    })
}

/// Labels connected components (breadth-first search) of the energized topology.
pub fn find_islands(network: &LfNetwork) -> Result<IslandAnalysis> {
    let graph = energized_graph(network);
    let slack = network.slack_bus();
    let mut visited = HashSet::new();
    let mut islands = Vec::new();
    let mut assignments = Vec::new();
    let mut island_id = 0;
    for start in graph.node_indices() {
        if visited.contains(&start) {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(start);
        let mut members = Vec::new();
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            members.push(node);
            for neighbor in graph.neighbors(node) {
                if !visited.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        islands.push(IslandSummary {
            island_id,
            node_count: members.len(),
            has_slack: members.iter().any(|&node| Some(graph[node]) == slack),
        });
        for node in members {
            let bus = graph[node];
            let label = network.bus(bus).map(|b| b.id().to_string()).unwrap_or_default();
            assignments.push(NodeAssignment { bus, label, island_id });
        }
        island_id += 1;
    }
    assignments.sort_by_key(|assignment| assignment.bus);
    Ok(IslandAnalysis { islands, assignments })
}

/// Export the topology to a DOT string (Graphviz). Disabled elements are dashed.
pub fn export_graph(network: &LfNetwork, format: &str) -> Result<String> {
    match format.to_ascii_lowercase().as_str() {
        "graphviz" | "dot" => Ok(render_dot(network)),
        other => Err(anyhow!("unsupported graph export format '{other}'")),
    }
}

fn render_dot(network: &LfNetwork) -> String {
    let mut buffer = String::new();
    buffer.push_str("graph lfnet {\n");
    for bus in network.buses() {
        let style = if bus.is_disabled() { ", style=dashed" } else { "" };
        let shape = if bus.is_slack() { ", shape=doublecircle" } else { "" };
        buffer.push_str(&format!(
            "  n{} [label=\"{}\"{shape}{style}];\n",
            bus.num().value(),
            sanitize_label(bus.id())
        ));
    }
    for branch in network.branches() {
        let (Some(b1), Some(b2)) = (branch.bus1(), branch.bus2()) else {
            continue;
        };
        let style = if network.connectivity_edge(branch.num()).is_some() {
            ""
        } else {
            ", style=dashed"
        };
        buffer.push_str(&format!(
            "  n{} -- n{} [label=\"{}\"{style}];\n",
            b1.value(),
            b2.value(),
            sanitize_label(branch.id())
        ));
    }
    buffer.push('}');
    buffer
}

fn sanitize_label(label: &str) -> String {
    label.replace('"', "\\\"")
}

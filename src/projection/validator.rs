// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Routing checks over a graph's nodes and connections.

use std::collections::HashMap;

use crate::model::{Connection, GraphNode, NodeKind, RenderGraph, MASTER_BUS_ID};

use super::error::ProjectionError;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Node ids in declaration order, followed by any id only mentioned by a connection.
fn index_nodes<'a>(
    nodes: &'a [GraphNode],
    connections: &'a [Connection],
) -> (Vec<&'a str>, HashMap<&'a str, usize>) {
    let mut ids: Vec<&str> = Vec::with_capacity(nodes.len());
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    let mentioned = nodes.iter().map(|node| node.id.as_str()).chain(
        connections
            .iter()
            .flat_map(|c| [c.from.as_str(), c.to.as_str()]),
    );
    for id in mentioned {
        if !index.contains_key(id) {
            index.insert(id, ids.len());
            ids.push(id);
        }
    }
    (ids, index)
}

/// Depth-first search from every unvisited node. Returns the first cycle found
/// as a path that starts and ends on the same node, or `None` if routing is acyclic.
/// Uses an explicit stack, so depth is bounded by memory rather than the call stack.
pub fn detect_circular_routing(
    nodes: &[GraphNode],
    connections: &[Connection],
) -> Option<Vec<String>> {
    let (ids, index) = index_nodes(nodes, connections);
    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];
    for connection in connections {
        edges[index[connection.from.as_str()]].push(index[connection.to.as_str()]);
    }

    let mut marks = vec![Mark::Unvisited; ids.len()];
    // (node, next edge to follow)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..ids.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::InProgress;
        stack.push((root, 0));

        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            if let Some(&target) = edges[node].get(next) {
                top.1 += 1;
                match marks[target] {
                    Mark::Unvisited => {
                        marks[target] = Mark::InProgress;
                        stack.push((target, 0));
                    }
                    Mark::InProgress => {
                        // The stack holds the current path; the cycle starts at `target`.
                        let start = stack
                            .iter()
                            .position(|&(n, _)| n == target)
                            .unwrap_or(0);
                        let mut path: Vec<String> = stack[start..]
                            .iter()
                            .map(|&(n, _)| ids[n].to_string())
                            .collect();
                        path.push(ids[target].to_string());
                        return Some(path);
                    }
                    Mark::Done => {}
                }
            } else {
                marks[node] = Mark::Done;
                stack.pop();
            }
        }
    }

    None
}

/// Every bus with no incoming connection, or `None` if there are none. Voices
/// are signal sources and master is the sink, so neither needs an input.
pub fn detect_orphaned_nodes(
    nodes: &[GraphNode],
    connections: &[Connection],
) -> Option<Vec<String>> {
    let orphans: Vec<String> = nodes
        .iter()
        .filter(|node| node.kind == NodeKind::Bus && node.id != MASTER_BUS_ID)
        .filter(|node| !connections.iter().any(|c| c.to == node.id))
        .map(|node| node.id.clone())
        .collect();

    if orphans.is_empty() {
        None
    } else {
        Some(orphans)
    }
}

/// Runs both routing checks over a render graph.
pub fn validate_graph(graph: &RenderGraph) -> Result<(), ProjectionError> {
    if let Some(path) = detect_circular_routing(graph.nodes(), graph.connections()) {
        let detail = path.join(" -> ");
        return Err(ProjectionError::circular_routing(
            format!("signal routing loops back through {}", path[0]),
            detail,
        ));
    }

    if let Some(orphans) = detect_orphaned_nodes(graph.nodes(), graph.connections()) {
        return Err(ProjectionError::orphaned_nodes(
            format!("{} node(s) receive no signal", orphans.len()),
            orphans.join(", "),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(ids: &[&str]) -> Vec<GraphNode> {
        ids.iter()
            .map(|id| {
                let kind = if *id == MASTER_BUS_ID {
                    NodeKind::Master
                } else {
                    NodeKind::Bus
                };
                GraphNode::new(id, kind)
            })
            .collect()
    }

    fn edges(pairs: &[(&str, &str)]) -> Vec<Connection> {
        pairs
            .iter()
            .map(|(from, to)| Connection::new(from, to))
            .collect()
    }

    #[test]
    fn test_two_node_cycle() {
        let nodes = nodes(&["a", "b", "c", MASTER_BUS_ID]);
        let connections = edges(&[("a", "b"), ("b", "a"), ("c", MASTER_BUS_ID)]);

        let path = detect_circular_routing(&nodes, &connections).expect("cycle");
        assert!(path.contains(&"a".to_string()));
        assert!(path.contains(&"b".to_string()));
        assert_eq!(path.first(), path.last());

        // a and b feed each other; c feeds master but nothing feeds c.
        assert_eq!(
            detect_orphaned_nodes(&nodes, &connections),
            Some(vec!["c".to_string()])
        );
    }

    #[test]
    fn test_acyclic_routing() {
        let nodes = nodes(&["v1", "v2", "bus", MASTER_BUS_ID]);
        let connections = edges(&[("v1", "bus"), ("v2", "bus"), ("bus", MASTER_BUS_ID)]);
        assert_eq!(detect_circular_routing(&nodes, &connections), None);

        // Diamonds revisit finished nodes without being cycles.
        let nodes = self::nodes(&["a", "b", "c", "d"]);
        let connections = edges(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
        assert_eq!(detect_circular_routing(&nodes, &connections), None);
    }

    #[test]
    fn test_long_cycle_path() {
        let nodes = nodes(&["x", "a", "b", "c"]);
        let connections = edges(&[("x", "a"), ("a", "b"), ("b", "c"), ("c", "a")]);
        let path = detect_circular_routing(&nodes, &connections).expect("cycle");
        assert_eq!(path, vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_self_loop() {
        let nodes = nodes(&["a"]);
        let connections = edges(&[("a", "a")]);
        assert_eq!(
            detect_circular_routing(&nodes, &connections),
            Some(vec!["a".to_string(), "a".to_string()])
        );
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let ids: Vec<String> = (0..100_000).map(|i| format!("n{}", i)).collect();
        let nodes: Vec<GraphNode> = ids
            .iter()
            .map(|id| GraphNode::new(id, NodeKind::Bus))
            .collect();
        let connections: Vec<Connection> = ids
            .windows(2)
            .map(|pair| Connection::new(&pair[0], &pair[1]))
            .collect();
        assert_eq!(detect_circular_routing(&nodes, &connections), None);
    }

    #[test]
    fn test_voices_are_sources() {
        let nodes = vec![
            GraphNode::new("voice-lead", NodeKind::Voice),
            GraphNode::new("bus", NodeKind::Bus),
            GraphNode::new("idle-bus", NodeKind::Bus),
            GraphNode::new(MASTER_BUS_ID, NodeKind::Master),
        ];
        let connections = edges(&[
            ("voice-lead", "bus"),
            ("bus", MASTER_BUS_ID),
            ("idle-bus", MASTER_BUS_ID),
        ]);
        assert_eq!(
            detect_orphaned_nodes(&nodes, &connections),
            Some(vec!["idle-bus".to_string()])
        );
    }

    #[test]
    fn test_master_is_never_orphaned() {
        let nodes = nodes(&["bus", MASTER_BUS_ID]);
        let connections = edges(&[("v", "bus")]);
        assert_eq!(detect_orphaned_nodes(&nodes, &connections), None);
    }
}

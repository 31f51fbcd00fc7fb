use crate::models::{Edge, EdgeKind, Node};
use std::collections::{HashMap, HashSet};

/// Synthesize the presentation edge list for a workspace.
///
/// Rules, applied in order:
///
/// 1. Every node with a `parent_id` gets a `parent -> node` edge. An `output`
///    node only gets it when its parent's `children` list names it as the
///    (single) current output, so superseded outputs stay unconnected.
/// 2. Every id in `input_node_ids` gets an `input -> node` edge unless that
///    exact (source, target) pair was already emitted.
///
/// Inactive nodes are ignored. Output order follows the iteration order of
/// `nodes`, parent edges first.
pub fn build_edges(nodes: &[Node]) -> Vec<Edge> {
    let by_id: HashMap<&str, &Node> = nodes
        .iter()
        .filter(|n| n.is_active)
        .map(|n| (n.id.as_str(), n))
        .collect();

    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut edges = Vec::new();

    for node in nodes.iter().filter(|n| n.is_active) {
        let Some(parent_id) = node.parent_id.as_deref() else {
            continue;
        };

        if node.node_type.is_output() {
            let is_current = by_id
                .get(parent_id)
                .and_then(|parent| current_output_of(parent, &by_id))
                == Some(node.id.as_str());
            if !is_current {
                continue;
            }
        }

        if seen.insert((parent_id, node.id.as_str())) {
            edges.push(Edge::new(parent_id, &node.id, EdgeKind::Parent));
        }
    }

    for node in nodes.iter().filter(|n| n.is_active) {
        for input_id in &node.input_node_ids {
            if seen.insert((input_id.as_str(), node.id.as_str())) {
                edges.push(Edge::new(input_id, &node.id, EdgeKind::Input));
            }
        }
    }

    edges
}

/// The last output recorded in the parent's `children` list.
fn current_output_of<'a>(parent: &'a Node, by_id: &HashMap<&str, &Node>) -> Option<&'a str> {
    parent
        .children
        .iter()
        .rev()
        .find(|id| {
            by_id
                .get(id.as_str())
                .is_some_and(|child| child.node_type.is_output())
        })
        .map(String::as_str)
}

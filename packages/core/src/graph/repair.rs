use crate::graph::children::{compute_children, creation_order};
use crate::models::Node;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// What a repair pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    /// Nodes whose dangling `parent_id` was cleared
    pub cleared_parents: Vec<String>,
    /// Nodes whose `parent_id` was cleared to break a cycle
    pub broken_cycles: Vec<String>,
    /// Dangling entries removed from `input_node_ids` / `child_node_ids`
    pub pruned_references: usize,
    /// Nodes whose `children` cache was rewritten
    pub refreshed_children: Vec<String>,
    /// Number of node documents written
    pub writes: usize,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        self.writes == 0
    }
}

/// Result of [`plan_repair`]
#[derive(Debug, Clone, Default)]
pub struct RepairPlan {
    /// Every active node after repair, in input order
    pub nodes: Vec<Node>,
    /// The subset of `nodes` that must be written back
    pub changed: Vec<Node>,
    pub report: RepairReport,
}

/// Plan the corrective writes that make a workspace referentially sound.
///
/// Inactive nodes are dropped from the input. For the remaining nodes:
///
/// - a `parent_id` that is the node itself, or that names a missing or
///   inactive node, is cleared
/// - `parent_id` cycles are broken by detaching the most recently created
///   member of the cycle
/// - `input_node_ids` and `child_node_ids` entries that name missing or
///   inactive nodes are dropped
/// - every `children` cache is recomputed from the repaired parent links
///
/// Only nodes that actually differ end up in `changed`, so planning a repair of
/// a sound workspace yields no writes.
pub fn plan_repair(nodes: Vec<Node>) -> RepairPlan {
    let mut nodes: Vec<Node> = nodes.into_iter().filter(|n| n.is_active).collect();
    let mut report = RepairReport::default();
    let mut dirty: HashSet<usize> = HashSet::new();

    let active: HashSet<String> = nodes.iter().map(|n| n.id.clone()).collect();

    for (i, node) in nodes.iter_mut().enumerate() {
        let dangling = match node.parent_id.as_deref() {
            Some(parent_id) => parent_id == node.id || !active.contains(parent_id),
            None => false,
        };
        if dangling {
            tracing::debug!(
                "Clearing orphaned parent {:?} of node {}",
                node.parent_id,
                node.id
            );
            node.parent_id = None;
            report.cleared_parents.push(node.id.clone());
            dirty.insert(i);
        }
    }

    for victim in find_cycle_victims(&nodes) {
        let node = &mut nodes[victim];
        tracing::debug!(
            "Breaking parent cycle at node {} (parent {:?})",
            node.id,
            node.parent_id
        );
        node.parent_id = None;
        report.broken_cycles.push(node.id.clone());
        dirty.insert(victim);
    }

    for (i, node) in nodes.iter_mut().enumerate() {
        let own_id = node.id.clone();
        let keep = |id: &String| *id != own_id && active.contains(id);

        let before = node.input_node_ids.len() + node.child_node_ids.len();
        node.input_node_ids.retain(|id| keep(id));
        node.child_node_ids.retain(|id| keep(id));
        let removed = before - node.input_node_ids.len() - node.child_node_ids.len();

        if removed > 0 {
            tracing::debug!("Pruned {} dangling references from node {}", removed, node.id);
            report.pruned_references += removed;
            dirty.insert(i);
        }
    }

    let mut by_parent: HashMap<&str, Vec<&Node>> = HashMap::new();
    for node in &nodes {
        if let Some(parent_id) = node.parent_id.as_deref() {
            by_parent.entry(parent_id).or_default().push(node);
        }
    }
    let recomputed: Vec<Vec<String>> = nodes
        .iter()
        .map(|n| match by_parent.get(n.id.as_str()) {
            Some(candidates) => compute_children(&n.id, candidates.iter().copied()),
            None => Vec::new(),
        })
        .collect();
    drop(by_parent);

    for (i, (node, children)) in nodes.iter_mut().zip(recomputed).enumerate() {
        if node.children != children {
            node.children = children;
            report.refreshed_children.push(node.id.clone());
            dirty.insert(i);
        }
    }

    let mut dirty: Vec<usize> = dirty.into_iter().collect();
    dirty.sort_unstable();
    for &i in &dirty {
        nodes[i].touch();
    }
    let changed: Vec<Node> = dirty.iter().map(|&i| nodes[i].clone()).collect();
    report.writes = changed.len();

    RepairPlan {
        nodes,
        changed,
        report,
    }
}

/// One node per `parent_id` cycle whose parent link should be cut.
fn find_cycle_victims(nodes: &[Node]) -> Vec<usize> {
    const UNSEEN: u8 = 0;
    const ON_PATH: u8 = 1;
    const DONE: u8 = 2;

    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    let mut state = vec![UNSEEN; nodes.len()];
    let mut victims = Vec::new();

    for start in 0..nodes.len() {
        if state[start] != UNSEEN {
            continue;
        }

        let mut path = Vec::new();
        let mut current = Some(start);
        while let Some(i) = current {
            match state[i] {
                UNSEEN => {
                    state[i] = ON_PATH;
                    path.push(i);
                    current = nodes[i]
                        .parent_id
                        .as_deref()
                        .and_then(|p| index.get(p).copied());
                }
                ON_PATH => {
                    let from = path.iter().position(|&j| j == i).unwrap_or(0);
                    if let Some(victim) = path[from..]
                        .iter()
                        .copied()
                        .max_by(|&a, &b| creation_order(&nodes[a], &nodes[b]))
                    {
                        victims.push(victim);
                    }
                    current = None;
                }
                _ => current = None,
            }
        }

        for i in path {
            state[i] = DONE;
        }
    }

    victims
}

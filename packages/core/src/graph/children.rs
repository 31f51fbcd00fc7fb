use crate::models::Node;
use std::cmp::Ordering;

/// Creation order with the id as tie-breaker, so equal timestamps still sort
/// deterministically.
pub fn creation_order(a: &Node, b: &Node) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

fn is_active_child_of(node: &Node, parent_id: &str) -> bool {
    node.is_active && node.id != parent_id && node.parent_id.as_deref() == Some(parent_id)
}

/// The most recently created active `output` child of `parent_id`.
pub fn current_output<'a>(
    parent_id: &str,
    candidates: impl IntoIterator<Item = &'a Node>,
) -> Option<&'a Node> {
    candidates
        .into_iter()
        .filter(|n| n.node_type.is_output() && is_active_child_of(n, parent_id))
        .max_by(|a, b| creation_order(a, b))
}

/// Compute the `children` cache for `parent_id` from a `parent_id` reverse scan.
///
/// Active children are listed in creation order. Of the `output` children only
/// the current (most recently created) one is kept; superseded outputs are not
/// children even while they still point at the parent.
pub fn compute_children<'a>(
    parent_id: &str,
    candidates: impl IntoIterator<Item = &'a Node>,
) -> Vec<String> {
    let mut children: Vec<&Node> = candidates
        .into_iter()
        .filter(|n| is_active_child_of(n, parent_id))
        .collect();

    let current = current_output(parent_id, children.iter().copied()).map(|n| n.id.clone());

    children.retain(|n| !n.node_type.is_output() || current.as_deref() == Some(n.id.as_str()));
    children.sort_by(|a, b| creation_order(a, b));
    children.into_iter().map(|n| n.id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NodeType, Position};
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn node(id: &str, node_type: NodeType, parent: Option<&str>, age_secs: i64) -> Node {
        let mut n = Node::new_with_id(
            id.to_string(),
            "ws".to_string(),
            "owner".to_string(),
            node_type,
            parent.map(str::to_string),
            Position::default(),
            json!({}),
        );
        n.created_at = Utc::now() - Duration::seconds(age_secs);
        n
    }

    #[test]
    fn test_children_follow_creation_order() {
        let nodes = vec![
            node("late", NodeType::Custom, Some("p"), 1),
            node("early", NodeType::Team, Some("p"), 10),
            node("elsewhere", NodeType::Team, Some("q"), 5),
        ];

        assert_eq!(compute_children("p", &nodes), vec!["early", "late"]);
    }

    #[test]
    fn test_only_latest_output_is_a_child() {
        let nodes = vec![
            node("out-1", NodeType::Output, Some("agent"), 30),
            node("out-3", NodeType::Output, Some("agent"), 10),
            node("out-2", NodeType::Output, Some("agent"), 20),
            node("portfolio", NodeType::Portfolio, Some("agent"), 40),
        ];

        assert_eq!(
            compute_children("agent", &nodes),
            vec!["portfolio", "out-3"]
        );
        assert_eq!(current_output("agent", &nodes).unwrap().id, "out-3");
    }

    #[test]
    fn test_inactive_children_are_skipped() {
        let mut newest = node("out-new", NodeType::Output, Some("agent"), 1);
        newest.is_active = false;
        let nodes = vec![newest, node("out-old", NodeType::Output, Some("agent"), 50)];

        assert_eq!(compute_children("agent", &nodes), vec!["out-old"]);
    }
}

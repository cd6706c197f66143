//! Depth-first reference ids (`e1`, `e2`, …) that tie each element in the
//! JSON payload to its label on the rendered overlay.

use crate::perception::types::ElementNode;

pub const REF_PREFIX: &str = "e";

/// Assign refs in pre-order: a node before its children, children before
/// the following sibling. Re-running on an unchanged tree yields the same ids.
pub fn assign_refs(forest: &mut [ElementNode]) -> usize {
    let mut counter = 1usize;
    let mut stack: Vec<&mut ElementNode> = forest.iter_mut().rev().collect();

    while let Some(node) = stack.pop() {
        node.ref_id = Some(format!("{REF_PREFIX}{counter}"));
        counter += 1;
        stack.extend(node.children.iter_mut().rev());
    }

    let assigned = counter - 1;
    tracing::debug!(assigned, "element refs assigned");
    assigned
}

/// All nodes in the same pre-order used by [`assign_refs`].
pub fn flatten(forest: &[ElementNode]) -> Vec<&ElementNode> {
    let mut out = Vec::new();
    let mut stack: Vec<&ElementNode> = forest.iter().rev().collect();
    while let Some(node) = stack.pop() {
        out.push(node);
        stack.extend(node.children.iter().rev());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::types::{AriaRole, BoundingBox};
    use std::collections::HashSet;

    fn leaf(name: &str) -> ElementNode {
        ElementNode::new(AriaRole::Generic, name, BoundingBox::new(0, 0, 1, 1))
    }

    fn sample_forest() -> Vec<ElementNode> {
        vec![
            leaf("a").with_children(vec![
                leaf("a1").with_children(vec![leaf("a1x")]),
                leaf("a2"),
            ]),
            leaf("b"),
            leaf("c").with_children(vec![leaf("c1")]),
        ]
    }

    #[test]
    fn refs_follow_preorder() {
        let mut forest = sample_forest();
        assert_eq!(assign_refs(&mut forest), 7);
        let order: Vec<(&str, &str)> = flatten(&forest)
            .iter()
            .map(|n| (n.name.as_str(), n.ref_id.as_deref().unwrap()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("a", "e1"),
                ("a1", "e2"),
                ("a1x", "e3"),
                ("a2", "e4"),
                ("b", "e5"),
                ("c", "e6"),
                ("c1", "e7"),
            ]
        );
    }

    #[test]
    fn refs_are_exhaustive_and_unique() {
        let mut forest = sample_forest();
        let n = assign_refs(&mut forest);
        let refs: HashSet<String> = flatten(&forest)
            .iter()
            .filter_map(|node| node.ref_id.clone())
            .collect();
        let expected: HashSet<String> = (1..=n).map(|i| format!("{REF_PREFIX}{i}")).collect();
        assert_eq!(refs, expected);
    }

    #[test]
    fn reassignment_is_idempotent() {
        let mut forest = sample_forest();
        assign_refs(&mut forest);
        let first = forest.clone();
        assign_refs(&mut forest);
        assert_eq!(forest, first);
    }

    #[test]
    fn empty_forest() {
        let mut forest: Vec<ElementNode> = Vec::new();
        assert_eq!(assign_refs(&mut forest), 0);
        assert!(flatten(&forest).is_empty());
    }
}

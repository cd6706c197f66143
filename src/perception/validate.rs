//! Bounding-box and role validation for element trees returned by the
//! vision model.
//!
//! Every reachable box is clamped to the image in place; problems are
//! reported as warnings keyed by the node's position
//! (`elements[0].children[2]`), never as errors.

use crate::perception::types::ElementNode;

pub fn validate(nodes: &mut [ElementNode], width: u32, height: u32) -> Vec<String> {
    let mut warnings = Vec::new();

    // Explicit stack so arbitrarily deep trees are safe. Children are pushed
    // in reverse to keep pre-order.
    let mut stack: Vec<(String, &mut ElementNode)> = nodes
        .iter_mut()
        .enumerate()
        .rev()
        .map(|(i, n)| (format!("elements[{i}]"), n))
        .collect();

    while let Some((path, node)) = stack.pop() {
        let Some(bbox) = node.bounding_box.to_box() else {
            warnings.push(format!("{path}: invalid bounding_box length"));
            continue;
        };

        if !bbox.is_ordered() {
            warnings.push(format!(
                "{path}: invalid bbox dimensions (y_min={}, y_max={}, x_min={}, x_max={})",
                bbox.y_min, bbox.y_max, bbox.x_min, bbox.x_max
            ));
        }

        node.bounding_box.set(bbox.clamped(width, height));

        if !node.role.is_known() {
            warnings.push(format!("{path}: invalid role '{}'", node.role.as_str()));
        }

        for (j, child) in node.children.iter_mut().enumerate().rev() {
            stack.push((format!("{path}.children[{j}]"), child));
        }
    }

    if !warnings.is_empty() {
        tracing::debug!(count = warnings.len(), "element tree validation warnings");
    }
    warnings
}

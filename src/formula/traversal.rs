//! Tree traversal helpers

use rustc_hash::FxHashSet;

use super::Formula;

/// Every distinct node reachable from `roots`, children before parents.
///
/// Shared subtrees (same node reached through several parents or several
/// roots) are listed once, which is the order an emission driver needs.
pub fn post_order(roots: &[Formula]) -> Vec<Formula> {
    let mut visited = FxHashSet::default();
    let mut order = Vec::new();

    for root in roots {
        // explicit stack of (node, children_pushed)
        let mut stack = vec![(root.clone(), false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                if visited.insert(node.addr()) {
                    order.push(node);
                }
                continue;
            }
            if visited.contains(&node.addr()) {
                continue;
            }
            stack.push((node.clone(), true));
            for child in node.children().iter().rev() {
                if !visited.contains(&child.addr()) {
                    stack.push((child.clone(), false));
                }
            }
        }
    }

    order
}

impl Formula {
    /// Number of distinct nodes in the tree
    pub fn node_count(&self) -> usize {
        post_order(std::slice::from_ref(self)).len()
    }
}

//! Per-node gradient rules
//!
//! `node_grad` is the body of [`Operation::grad`] for every node kind.

use crate::error::{FormulaError, Result};
use crate::formula::{Formula, Op, Operation, Var};
use crate::ops::{broadcast, sum, zero};

// ============================================================================
// Dispatcher
// ============================================================================

/// Contribution of `node` to the gradient w.r.t. `v`, given the incoming
/// gradient `gradin` (dimension `node.dim`).
pub fn node_grad(node: &Formula, v: &Var, gradin: &Formula) -> Result<Formula> {
    if gradin.dim() != node.dim() {
        return Err(FormulaError::mismatch("Grad", [gradin.dim(), node.dim()]));
    }
    // subtrees not reading v contribute nothing; the variable set is cached
    // per node, so this check does not walk the subtree
    if !node.depends_on(v) {
        return zero(v.dim());
    }

    match node.op() {
        Op::Var(w) if w == v => Ok(gradin.clone()),
        Op::Var(_) | Op::Zero | Op::IntCst(_) => zero(v.dim()),
        Op::Broadcast => broadcast_grad(node, v, gradin),
        Op::Sum => sum_grad(node, v, gradin),
        Op::Elementwise(e) => e.grad(node, v, gradin),
    }
}

// ============================================================================
// Structural nodes
// ============================================================================

/// `Broadcast(g, d)`: every component reads `g`, so `g` receives the sum
fn broadcast_grad(node: &Formula, v: &Var, gradin: &Formula) -> Result<Formula> {
    node.children()[0].grad(v, &sum(gradin)?)
}

/// `Sum(g)`: every component of `g` receives the same scalar
fn sum_grad(node: &Formula, v: &Var, gradin: &Formula) -> Result<Formula> {
    let child = &node.children()[0];
    child.grad(v, &broadcast(gradin, child.dim())?)
}

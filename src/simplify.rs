//! # Simplify Module
//!
//! Whole-tree re-simplification. The smart constructors already simplify as a
//! tree is built; `simplify` is for trees that contain generic nodes (built
//! with [`ElemOp::generic`](crate::ops::ElemOp::generic)) or were assembled
//! bottom-up before a child collapsed.

use log::debug;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::formula::{Formula, Op, post_order};
use crate::ops::{broadcast, sum};

/// Rebuilds every node of `f` through the simplifying constructors.
///
/// Shared subtrees are rebuilt once. Trees built only with the smart
/// constructors are returned unchanged.
pub fn simplify(f: &Formula) -> Result<Formula> {
    let mut memo: FxHashMap<usize, Formula> = FxHashMap::default();

    for node in post_order(std::slice::from_ref(f)) {
        let children: Vec<Formula> = node
            .children()
            .iter()
            .map(|c| memo.get(&c.addr()).cloned().unwrap_or_else(|| c.clone()))
            .collect();
        let rebuilt = match node.op() {
            Op::Zero | Op::Var(_) | Op::IntCst(_) => node.clone(),
            Op::Broadcast => broadcast(&children[0], node.dim())?,
            Op::Sum => sum(&children[0])?,
            Op::Elementwise(e) => e.build(&children)?,
        };
        memo.insert(node.addr(), rebuilt);
    }

    let out = memo.remove(&f.addr()).unwrap_or_else(|| f.clone());
    if out != *f {
        debug!("simplify: {f} -> {out}");
    }
    Ok(out)
}

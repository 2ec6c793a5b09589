//! Formula trees
//!
//! A [`Formula`] is an immutable, reference-counted expression node. Children
//! are owned through `Arc`, so a read-only subtree may be shared between
//! several parents (and several threads) without copying. Nodes are never
//! mutated after construction and no cycle can be formed.
//!
//! Formulas are normally created through the simplifying constructors in
//! [`crate::ops`]; the raw node constructor is crate-private.

mod operation;
mod print;
mod traversal;

pub use operation::Operation;
pub use print::{Fixity, PrintSpec};
pub use traversal::post_order;

use std::fmt;
use std::sync::Arc;

use crate::error::{FormulaError, Result};
use crate::ops::ElemOp;

// ============================================================================
// Leaves
// ============================================================================

/// Indexing category of an input variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Indexed by the outer ("i") dataset loop
    I,
    /// Indexed by the inner ("j") dataset loop
    J,
    /// Shared by every (i, j) pair
    Param,
}

impl Category {
    fn prefix(self) -> &'static str {
        match self {
            Category::I => "Vi",
            Category::J => "Vj",
            Category::Param => "Pm",
        }
    }
}

/// An externally supplied input: a Variable (`I`/`J`) or a Parameter.
///
/// Two `Var`s denote the same input iff index, dimension and category agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var {
    index: usize,
    dim: usize,
    cat: Category,
}

impl Var {
    pub fn new(index: usize, dim: usize, cat: Category) -> Result<Self> {
        if dim == 0 {
            return Err(FormulaError::InvalidDimension { op: "Var" });
        }
        Ok(Self { index, dim, cat })
    }

    /// Per-i variable
    pub fn vi(index: usize, dim: usize) -> Result<Self> {
        Self::new(index, dim, Category::I)
    }

    /// Per-j variable
    pub fn vj(index: usize, dim: usize) -> Result<Self> {
        Self::new(index, dim, Category::J)
    }

    /// Parameter
    pub fn pm(index: usize, dim: usize) -> Result<Self> {
        Self::new(index, dim, Category::Param)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn category(&self) -> Category {
        self.cat
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({},{})", self.cat.prefix(), self.index, self.dim)
    }
}

// ============================================================================
// Node
// ============================================================================

/// Operator carried by a node. This is a closed set: simplification rules
/// match on it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Additive identity of the node's dimension
    Zero,
    Var(Var),
    /// Dimension-1 integer constant, never 0
    IntCst(i32),
    /// Dimension-1 child repeated to the node's dimension
    Broadcast,
    /// Sum of the child's components (dimension 1)
    Sum,
    Elementwise(ElemOp),
}

#[derive(Debug)]
pub struct FormulaNode {
    op: Op,
    children: Vec<Formula>,
    dim: usize,
    /// Variables read anywhere below this node, sorted and deduplicated
    vars: Arc<[Var]>,
}

impl PartialEq for FormulaNode {
    fn eq(&self, other: &Self) -> bool {
        self.op == other.op && self.dim == other.dim && self.children == other.children
    }
}

/// Variable set of a new node, shared with its child when there is only one.
fn collect_vars(op: &Op, children: &[Formula]) -> Arc<[Var]> {
    match (op, children) {
        (Op::Var(v), _) => Arc::from([*v]),
        (_, [child]) => child.0.vars.clone(),
        _ => {
            let mut vars: Vec<Var> = children
                .iter()
                .flat_map(|c| c.0.vars.iter().copied())
                .collect();
            vars.sort();
            vars.dedup();
            vars.into()
        }
    }
}

/// Shared handle to an immutable formula node.
#[derive(Clone)]
pub struct Formula(Arc<FormulaNode>);

impl Formula {
    /// Builds a node without any simplification or validation.
    pub(crate) fn from_parts(op: Op, children: Vec<Formula>, dim: usize) -> Self {
        debug_assert!(dim > 0);
        let vars = collect_vars(&op, &children);
        Formula(Arc::new(FormulaNode {
            op,
            children,
            dim,
            vars,
        }))
    }

    pub fn op(&self) -> &Op {
        &self.0.op
    }

    pub fn dim(&self) -> usize {
        self.0.dim
    }

    pub fn children(&self) -> &[Formula] {
        &self.0.children
    }

    /// Variables appearing in the tree, sorted and deduplicated
    pub fn variables(&self) -> &[Var] {
        &self.0.vars
    }

    /// True if `v` appears anywhere in the tree.
    pub fn depends_on(&self, v: &Var) -> bool {
        self.0.vars.binary_search(v).is_ok()
    }

    pub fn is_zero(&self) -> bool {
        matches!(self.0.op, Op::Zero)
    }

    /// Value of an integer constant node
    pub fn as_int(&self) -> Option<i32> {
        match self.0.op {
            Op::IntCst(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_var(&self) -> Option<&Var> {
        match &self.0.op {
            Op::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_elementwise(&self) -> Option<ElemOp> {
        match self.0.op {
            Op::Elementwise(e) => Some(e),
            _ => None,
        }
    }

    /// True if both handles point at the very same node.
    pub fn ptr_eq(&self, other: &Formula) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Identity of the underlying node, stable for the node's lifetime.
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for Formula {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0 == *other.0
    }
}

impl From<Var> for Formula {
    fn from(v: Var) -> Self {
        Formula::from_parts(Op::Var(v), Vec::new(), v.dim())
    }
}

impl fmt::Debug for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Formula[{}]({})", self.dim(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{add, int_cst, zero};

    #[test]
    fn test_var_identity() {
        let a = Var::vi(0, 3).unwrap();
        let b = Var::vi(0, 3).unwrap();
        let c = Var::vj(0, 3).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "Vi(0,3)");
        assert_eq!(Var::pm(2, 1).unwrap().to_string(), "Pm(2,1)");
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert_eq!(
            Var::vi(0, 0),
            Err(FormulaError::InvalidDimension { op: "Var" })
        );
        assert!(zero(0).is_err());
    }

    #[test]
    fn test_structural_equality_of_distinct_nodes() {
        let x: Formula = Var::vi(0, 3).unwrap().into();
        let y: Formula = Var::vj(1, 3).unwrap().into();
        let s1 = add(&x, &y).unwrap();
        let s2 = add(&x, &y).unwrap();
        assert!(!s1.ptr_eq(&s2));
        assert_eq!(s1, s2);
        assert_ne!(s1, add(&y, &x).unwrap());
    }

    #[test]
    fn test_accessors() {
        let c = int_cst(7);
        assert_eq!(c.as_int(), Some(7));
        assert_eq!(c.dim(), 1);
        assert!(c.children().is_empty());
        assert!(int_cst(0).is_zero());
    }

    #[test]
    fn test_formula_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Formula>();
    }
}

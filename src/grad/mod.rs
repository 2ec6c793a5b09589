//! Symbolic differentiation
//!
//! Reverse-mode, source-to-source: the gradient of a formula is another
//! formula, built with the simplifying constructors so that branches which
//! are provably zero disappear as they are produced.
//!
//! # Example
//!
//! ```ignore
//! use symkern::prelude::*;
//!
//! let v = Var::vi(0, 3)?;
//! let x: Formula = v.into();
//! let f = sum(&square(&x)?)?;
//!
//! // d/dx Σ x² = 2x
//! let g = gradient(&f, &v)?;
//! ```
//!
//! # Rules
//!
//! - `Var`: `gradin` if it is the differentiation variable, else `Zero`
//! - `Zero`, `IntCst`: `Zero`
//! - `Broadcast(g)`: `g.Grad(v, Sum(gradin))`
//! - `Sum(g)`: `g.Grad(v, Broadcast(gradin, g.dim))`
//! - elementwise: the operator's own rule, or the chain rule over its
//!   `Derivative` (see [`crate::ops::vectorized::chain_rule`])
//!
//! Higher-order derivatives are repeated calls; the result of `grad` is an
//! ordinary formula.

mod rules;

pub(crate) use rules::node_grad;

use log::debug;

use crate::error::Result;
use crate::formula::{Formula, Operation, Var};
use crate::ops::{broadcast, int_cst};

/// Gradient of `f` w.r.t. `v` for the incoming gradient `gradin`
/// (dimension `f.dim`). The result has dimension `v.dim`.
pub fn grad(f: &Formula, v: &Var, gradin: &Formula) -> Result<Formula> {
    debug!("grad: d/d{v} of {f} with gradin {gradin}");
    let g = f.grad(v, gradin)?;
    debug!("grad: result {g} ({} nodes)", g.node_count());
    Ok(g)
}

/// One gradient per variable, in order.
pub fn grads(f: &Formula, vars: &[Var], gradin: &Formula) -> Result<Vec<Formula>> {
    vars.iter().map(|v| grad(f, v, gradin)).collect()
}

/// Gradient of the sum of the components of `f`, i.e. `grad` with an
/// all-ones incoming gradient.
pub fn gradient(f: &Formula, v: &Var) -> Result<Formula> {
    let ones = broadcast(&int_cst(1), f.dim())?;
    grad(f, v, &ones)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormulaError;
    use crate::ops::*;

    fn setup() -> (Var, Formula) {
        let _ = env_logger::builder().is_test(true).try_init();
        let v = Var::vi(0, 3).unwrap();
        (v, v.into())
    }

    #[test]
    fn test_leaf_rules() {
        let (v, x) = setup();
        let g: Formula = Var::vj(9, 3).unwrap().into();
        assert_eq!(grad(&x, &v, &g).unwrap(), g);

        let other: Formula = Var::vi(1, 3).unwrap().into();
        assert_eq!(grad(&other, &v, &g).unwrap(), zero(3).unwrap());
        assert_eq!(
            grad(&int_cst(4), &v, &int_cst(1)).unwrap(),
            zero(3).unwrap()
        );
    }

    #[test]
    fn test_same_index_different_category_is_other_variable() {
        let (v, _) = setup();
        let y: Formula = Var::vj(0, 3).unwrap().into();
        assert!(gradient(&y, &v).unwrap().is_zero());
    }

    #[test]
    fn test_gradin_dimension_checked() {
        let (v, x) = setup();
        let g: Formula = Var::vj(9, 2).unwrap().into();
        assert!(matches!(
            grad(&x, &v, &g),
            Err(FormulaError::DimensionMismatch { op: "Grad", .. })
        ));
    }

    #[test]
    fn test_sum_of_square() {
        let (v, x) = setup();
        let f = sum(&square(&x).unwrap()).unwrap();
        let g = gradient(&f, &v).unwrap();
        // gradin Broadcast(1, 3) flows through Sum, then Square: 1 * 2x
        assert_eq!(g, mult(&int_cst(2), &x).unwrap());
        assert_eq!(g.dim(), 3);
    }

    #[test]
    fn test_broadcast_scalar_gradient() {
        let _ = env_logger::builder().is_test(true).try_init();
        let v = Var::pm(0, 1).unwrap();
        let p: Formula = v.into();
        let f = broadcast(&p, 4).unwrap();
        // Σ_k 1 = 4
        assert_eq!(gradient(&f, &v).unwrap(), int_cst(4));
    }

    #[test]
    fn test_grads_in_order() {
        let (v, x) = setup();
        let w = Var::vj(1, 3).unwrap();
        let y: Formula = w.into();
        let f = mult(&x, &y).unwrap();
        let ones = broadcast(&int_cst(1), 3).unwrap();
        let gs = grads(&f, &[v, w], &ones).unwrap();
        assert_eq!(gs, vec![y.clone(), x.clone()]);
    }

    #[test]
    fn test_independent_shared_subtree_is_not_walked() {
        let (v, x) = setup();
        // 64 levels of b = b + exp(b): a small DAG whose unfolded tree has
        // 2^64 leaves
        let mut b: Formula = Var::vj(1, 3).unwrap().into();
        for _ in 0..64 {
            b = add(&b, &exp(&b).unwrap()).unwrap();
        }
        assert_eq!(b.variables(), &[Var::vj(1, 3).unwrap()]);
        let f = mult(&x, &b).unwrap();
        let ones = broadcast(&int_cst(1), 3).unwrap();
        assert_eq!(grad(&f, &v, &ones).unwrap(), b);
    }

    #[test]
    fn test_second_order() {
        let (v, x) = setup();
        let f = sum(&pow(&x, 3).unwrap()).unwrap();
        let g1 = gradient(&f, &v).unwrap();
        let g2 = gradient(&sum(&g1).unwrap(), &v).unwrap();
        // d²/dx² x³ = 6x
        assert_eq!(g2, mult(&int_cst(6), &x).unwrap());
    }
}

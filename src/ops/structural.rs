//! Leaves and dimension-changing operators: Zero, IntCst, Broadcast, Sum

use log::trace;

use crate::error::{FormulaError, Result};
use crate::formula::{Formula, Op};

use super::arithmetic::mult;

/// Additive identity of dimension `dim`
pub fn zero(dim: usize) -> Result<Formula> {
    if dim == 0 {
        return Err(FormulaError::InvalidDimension { op: "Zero" });
    }
    Ok(Formula::from_parts(Op::Zero, Vec::new(), dim))
}

/// Dimension-1 integer constant. `int_cst(0)` is `Zero(1)`.
pub fn int_cst(n: i32) -> Formula {
    if n == 0 {
        return Formula::from_parts(Op::Zero, Vec::new(), 1);
    }
    Formula::from_parts(Op::IntCst(n), Vec::new(), 1)
}

/// Re-expresses `f` at width `dim` without changing its values.
///
/// - `f.dim == dim`, or `dim == 1`: `f` itself (the wider side wins)
/// - `Zero` becomes `Zero(dim)`
/// - a dimension-1 `f` becomes a `Broadcast` node
pub fn broadcast(f: &Formula, dim: usize) -> Result<Formula> {
    if dim == 0 {
        return Err(FormulaError::InvalidDimension { op: "Broadcast" });
    }
    if f.dim() == dim || dim == 1 {
        return Ok(f.clone());
    }
    if f.dim() != 1 {
        return Err(FormulaError::mismatch("Broadcast", [f.dim(), dim]));
    }
    if f.is_zero() {
        trace!("Broadcast(Zero(1), {dim}) -> Zero({dim})");
        return zero(dim);
    }
    Ok(Formula::from_parts(Op::Broadcast, vec![f.clone()], dim))
}

/// Sum of the components of `f` (dimension 1).
pub fn sum(f: &Formula) -> Result<Formula> {
    if f.dim() == 1 {
        return Ok(f.clone());
    }
    match f.op() {
        Op::Zero => zero(1),
        // Σ_k g = d * g
        Op::Broadcast => {
            let d = i32::try_from(f.dim())
                .map_err(|_| FormulaError::mismatch("Sum", [f.dim()]))?;
            mult(&int_cst(d), &f.children()[0])
        }
        _ => Ok(Formula::from_parts(Op::Sum, vec![f.clone()], 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::Var;
    use rstest::rstest;

    fn x(dim: usize) -> Formula {
        Var::vi(0, dim).unwrap().into()
    }

    #[rstest]
    #[case(1, 1, 1)]
    #[case(3, 3, 3)]
    #[case(3, 1, 3)]
    #[case(1, 4, 4)]
    fn test_broadcast_dimension(#[case] from: usize, #[case] to: usize, #[case] expected: usize) {
        assert_eq!(broadcast(&x(from), to).unwrap().dim(), expected);
    }

    #[test]
    fn test_broadcast_identity_is_same_node() {
        let f = x(3);
        assert!(broadcast(&f, 3).unwrap().ptr_eq(&f));
        assert!(broadcast(&f, 1).unwrap().ptr_eq(&f));
    }

    #[test]
    fn test_broadcast_incompatible() {
        assert_eq!(
            broadcast(&x(2), 3),
            Err(FormulaError::DimensionMismatch {
                op: "Broadcast",
                dims: vec![2, 3]
            })
        );
    }

    #[test]
    fn test_broadcast_zero_folds() {
        assert_eq!(broadcast(&zero(1).unwrap(), 5).unwrap(), zero(5).unwrap());
    }

    #[test]
    fn test_broadcast_node() {
        let b = broadcast(&x(1), 4).unwrap();
        assert_eq!(b.op(), &Op::Broadcast);
        assert_eq!(b.children(), &[x(1)]);
    }

    #[test]
    fn test_sum_rules() {
        assert_eq!(sum(&x(1)).unwrap(), x(1));
        assert_eq!(sum(&zero(4).unwrap()).unwrap(), zero(1).unwrap());
        let s = sum(&x(3)).unwrap();
        assert_eq!((s.op(), s.dim()), (&Op::Sum, 1));
        // Σ Broadcast(x, 4) = 4 * x
        let b = broadcast(&x(1), 4).unwrap();
        assert_eq!(sum(&b).unwrap(), mult(&int_cst(4), &x(1)).unwrap());
    }

    #[test]
    fn test_int_cst_zero_is_zero_leaf() {
        assert_eq!(int_cst(0), zero(1).unwrap());
        assert_eq!(int_cst(3).as_int(), Some(3));
    }
}

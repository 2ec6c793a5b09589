//! Arithmetic operators: Add, Subtract, Mult, Divide, Minus
//!
//! Each public function is the smart constructor of its operator: it inspects
//! the operands for identity/absorbing values and only falls back to a generic
//! node when no rewrite applies. Binary constructors check the broadcast rule
//! first, so an invalid pair fails even when a rewrite would have matched.

use log::trace;

use crate::error::{FormulaError, Result};
use crate::formula::{Formula, Op, Operation, Var};

use super::ElemOp;
use super::math::square;
use super::structural::{broadcast, int_cst, zero};
use super::vectorized::{broadcast_dim, make, reduce_to};

// ============================================================================
// Add
// ============================================================================

pub fn add(a: &Formula, b: &Formula) -> Result<Formula> {
    let dim = broadcast_dim("Add", &[a.dim(), b.dim()])?;
    match (a.op(), b.op()) {
        (Op::Zero, _) => broadcast(b, a.dim()),
        (_, Op::Zero) => broadcast(a, b.dim()),
        (Op::IntCst(n), Op::IntCst(m)) if n.checked_add(*m).is_some() => Ok(int_cst(n + m)),
        _ if a == b => {
            trace!("Add: a + a -> 2 * a");
            mult(&int_cst(2), a)
        }
        _ => Ok(make(ElemOp::Add, &[a, b], dim)),
    }
}

pub(crate) fn add_grad(node: &Formula, v: &Var, gradin: &Formula) -> Result<Formula> {
    let [fa, fb] = node.children() else {
        return Err(FormulaError::UnsupportedOperand {
            op: "Add",
            arity: node.children().len(),
        });
    };
    let ga = fa.grad(v, &reduce_to(gradin, fa.dim())?)?;
    let gb = fb.grad(v, &reduce_to(gradin, fb.dim())?)?;
    add(&ga, &gb)
}

// ============================================================================
// Subtract
// ============================================================================

/// `a - b`
///
/// - `Zero - b` is `-b` broadcast to the zero's dimension
/// - `a - Zero` is `a` broadcast to the zero's dimension
pub fn subtract(a: &Formula, b: &Formula) -> Result<Formula> {
    let dim = broadcast_dim("Subtract", &[a.dim(), b.dim()])?;
    match (a.op(), b.op()) {
        (Op::Zero, _) => broadcast(&minus(b)?, a.dim()),
        (_, Op::Zero) => broadcast(a, b.dim()),
        (Op::IntCst(n), Op::IntCst(m)) if n.checked_sub(*m).is_some() => Ok(int_cst(n - m)),
        _ if a == b => zero(dim),
        _ => Ok(make(ElemOp::Subtract, &[a, b], dim)),
    }
}

pub(crate) fn subtract_grad(node: &Formula, v: &Var, gradin: &Formula) -> Result<Formula> {
    let [fa, fb] = node.children() else {
        return Err(FormulaError::UnsupportedOperand {
            op: "Subtract",
            arity: node.children().len(),
        });
    };
    let ga = fa.grad(v, &reduce_to(gradin, fa.dim())?)?;
    let gb = fb.grad(v, &reduce_to(gradin, fb.dim())?)?;
    subtract(&ga, &gb)
}

// ============================================================================
// Minus
// ============================================================================

pub fn minus(f: &Formula) -> Result<Formula> {
    match f.op() {
        Op::Zero => Ok(f.clone()),
        Op::Elementwise(ElemOp::Minus) => Ok(f.children()[0].clone()),
        Op::IntCst(n) if *n != i32::MIN => Ok(int_cst(-n)),
        Op::Elementwise(ElemOp::Mult) => match f.children()[0].as_int() {
            Some(n) if n != i32::MIN => mult(&int_cst(-n), &f.children()[1]),
            _ => Ok(make(ElemOp::Minus, &[f], f.dim())),
        },
        _ => Ok(make(ElemOp::Minus, &[f], f.dim())),
    }
}

pub(crate) fn minus_grad(node: &Formula, v: &Var, gradin: &Formula) -> Result<Formula> {
    minus(&node.children()[0].grad(v, gradin)?)
}

// ============================================================================
// Mult
// ============================================================================

/// `a * b`. Integer constants are kept on the left.
pub fn mult(a: &Formula, b: &Formula) -> Result<Formula> {
    let dim = broadcast_dim("Mult", &[a.dim(), b.dim()])?;
    match (a.op(), b.op()) {
        (Op::Zero, _) | (_, Op::Zero) => zero(dim),
        (Op::IntCst(n), Op::IntCst(m)) if n.checked_mul(*m).is_some() => Ok(int_cst(n * m)),
        (Op::IntCst(1), _) => broadcast(b, a.dim()),
        (_, Op::IntCst(1)) => broadcast(a, b.dim()),
        (Op::IntCst(-1), _) => broadcast(&minus(b)?, a.dim()),
        (_, Op::IntCst(-1)) => broadcast(&minus(a)?, b.dim()),
        (_, Op::IntCst(_)) if a.as_int().is_none() => mult(b, a),
        (Op::IntCst(n), Op::Elementwise(ElemOp::Mult)) => {
            match b.children()[0].as_int().and_then(|m| n.checked_mul(m)) {
                Some(nm) => {
                    trace!("Mult: n * (m * g) -> (n*m) * g");
                    mult(&int_cst(nm), &b.children()[1])
                }
                None => Ok(make(ElemOp::Mult, &[a, b], dim)),
            }
        }
        // a broadcast constant multiplies like the constant itself
        (Op::Broadcast, _) if a.children()[0].as_int().is_some() => {
            broadcast(&mult(&a.children()[0], b)?, dim)
        }
        (_, Op::Broadcast) if b.children()[0].as_int().is_some() => {
            broadcast(&mult(&b.children()[0], a)?, dim)
        }
        _ if a == b => square(a),
        _ => Ok(make(ElemOp::Mult, &[a, b], dim)),
    }
}

// ============================================================================
// Divide
// ============================================================================

pub fn divide(a: &Formula, b: &Formula) -> Result<Formula> {
    let dim = broadcast_dim("Divide", &[a.dim(), b.dim()])?;
    match (a.op(), b.op()) {
        (_, Op::Zero) => Err(FormulaError::SingularOperand { op: "Divide" }),
        (Op::Zero, _) => zero(dim),
        (_, Op::IntCst(1)) => broadcast(a, b.dim()),
        (_, Op::IntCst(-1)) => broadcast(&minus(a)?, b.dim()),
        (Op::IntCst(n), Op::IntCst(m)) if n.checked_rem(*m) == Some(0) => Ok(int_cst(n / m)),
        _ if a == b => broadcast(&int_cst(1), dim),
        _ => Ok(make(ElemOp::Divide, &[a, b], dim)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{exp, sum};
    use rstest::rstest;

    fn x(dim: usize) -> Formula {
        Var::vi(0, dim).unwrap().into()
    }

    fn y(dim: usize) -> Formula {
        Var::vj(1, dim).unwrap().into()
    }

    #[test]
    fn test_subtract_zero_right_is_broadcast() {
        let r = subtract(&x(3), &zero(3).unwrap()).unwrap();
        assert_eq!(r, broadcast(&x(3), 3).unwrap());
        assert_ne!(r.as_elementwise(), Some(ElemOp::Subtract));
    }

    #[test]
    fn test_subtract_zero_left_is_negated_broadcast() {
        let r = subtract(&zero(1).unwrap(), &x(3)).unwrap();
        assert_eq!(r, broadcast(&minus(&x(3)).unwrap(), 3).unwrap());
        assert_eq!(r.as_elementwise(), Some(ElemOp::Minus));
        assert_eq!(r.dim(), 3);
    }

    #[test]
    fn test_subtract_zero_widens_scalar() {
        // x(1) - Zero(3) = Broadcast(x, 3)
        let r = subtract(&x(1), &zero(3).unwrap()).unwrap();
        assert_eq!(r.op(), &Op::Broadcast);
        assert_eq!(r.dim(), 3);
    }

    #[rstest]
    #[case(2, 3)]
    #[case(3, 2)]
    #[case(4, 5)]
    fn test_binary_dimension_mismatch(#[case] da: usize, #[case] db: usize) {
        let expected = FormulaError::DimensionMismatch {
            op: "Subtract",
            dims: vec![da, db],
        };
        assert_eq!(subtract(&x(da), &y(db)), Err(expected));
        assert!(add(&x(da), &y(db)).is_err());
        assert!(mult(&x(da), &y(db)).is_err());
        assert!(divide(&x(da), &y(db)).is_err());
        // the rule is checked before zero folding
        assert!(subtract(&zero(da).unwrap(), &y(db)).is_err());
    }

    #[rstest]
    #[case(1, 1, 1)]
    #[case(1, 3, 3)]
    #[case(3, 1, 3)]
    #[case(3, 3, 3)]
    fn test_binary_dimension_rule(#[case] da: usize, #[case] db: usize, #[case] dim: usize) {
        assert_eq!(add(&x(da), &y(db)).unwrap().dim(), dim);
        assert_eq!(subtract(&x(da), &y(db)).unwrap().dim(), dim);
        assert_eq!(mult(&x(da), &y(db)).unwrap().dim(), dim);
        assert_eq!(divide(&x(da), &y(db)).unwrap().dim(), dim);
    }

    #[test]
    fn test_add_rules() {
        assert_eq!(add(&zero(3).unwrap(), &y(3)).unwrap(), y(3));
        assert_eq!(add(&int_cst(2), &int_cst(5)).unwrap(), int_cst(7));
        assert_eq!(add(&int_cst(2), &int_cst(-2)).unwrap(), zero(1).unwrap());
        assert_eq!(
            add(&x(2), &x(2)).unwrap(),
            mult(&int_cst(2), &x(2)).unwrap()
        );
        let node = add(&x(2), &y(2)).unwrap();
        assert_eq!(node.as_elementwise(), Some(ElemOp::Add));
    }

    #[test]
    fn test_subtract_rules() {
        assert_eq!(subtract(&x(2), &x(2)).unwrap(), zero(2).unwrap());
        assert_eq!(subtract(&int_cst(2), &int_cst(5)).unwrap(), int_cst(-3));
    }

    #[test]
    fn test_minus_rules() {
        assert_eq!(minus(&zero(4).unwrap()).unwrap(), zero(4).unwrap());
        assert_eq!(minus(&minus(&x(2)).unwrap()).unwrap(), x(2));
        assert_eq!(minus(&int_cst(3)).unwrap(), int_cst(-3));
        let twice = mult(&int_cst(2), &x(2)).unwrap();
        assert_eq!(
            minus(&twice).unwrap(),
            mult(&int_cst(-2), &x(2)).unwrap()
        );
    }

    #[test]
    fn test_mult_rules() {
        assert_eq!(mult(&x(3), &zero(1).unwrap()).unwrap(), zero(3).unwrap());
        assert_eq!(mult(&int_cst(1), &x(3)).unwrap(), x(3));
        assert_eq!(mult(&x(3), &int_cst(1)).unwrap(), x(3));
        assert_eq!(mult(&int_cst(-1), &x(3)).unwrap(), minus(&x(3)).unwrap());
        assert_eq!(mult(&int_cst(3), &int_cst(4)).unwrap(), int_cst(12));
        // constants are moved to the left
        assert_eq!(
            mult(&x(3), &int_cst(5)).unwrap(),
            mult(&int_cst(5), &x(3)).unwrap()
        );
        assert_eq!(mult(&x(3), &int_cst(5)).unwrap().children()[0], int_cst(5));
        // nested constants merge
        let inner = mult(&int_cst(3), &x(3)).unwrap();
        assert_eq!(
            mult(&int_cst(2), &inner).unwrap(),
            mult(&int_cst(6), &x(3)).unwrap()
        );
        assert_eq!(mult(&x(3), &x(3)).unwrap(), square(&x(3)).unwrap());
    }

    #[test]
    fn test_mult_by_broadcast_constant() {
        let ones = broadcast(&int_cst(1), 3).unwrap();
        assert_eq!(mult(&ones, &x(3)).unwrap(), x(3));
        assert_eq!(mult(&x(3), &ones).unwrap(), x(3));
        // x(1) * Broadcast(2, 3) keeps the wider dimension
        let twos = broadcast(&int_cst(2), 3).unwrap();
        let r = mult(&x(1), &twos).unwrap();
        assert_eq!(r, broadcast(&mult(&int_cst(2), &x(1)).unwrap(), 3).unwrap());
        assert_eq!(r.dim(), 3);
    }

    #[test]
    fn test_divide_rules() {
        assert_eq!(
            divide(&x(2), &zero(1).unwrap()),
            Err(FormulaError::SingularOperand { op: "Divide" })
        );
        assert_eq!(divide(&zero(1).unwrap(), &x(2)).unwrap(), zero(2).unwrap());
        assert_eq!(divide(&x(2), &int_cst(1)).unwrap(), x(2));
        assert_eq!(divide(&int_cst(6), &int_cst(3)).unwrap(), int_cst(2));
        assert_eq!(
            divide(&int_cst(1), &int_cst(2)).unwrap().as_elementwise(),
            Some(ElemOp::Divide)
        );
        let e = exp(&x(2)).unwrap();
        assert_eq!(
            divide(&e, &e).unwrap(),
            broadcast(&int_cst(1), 2).unwrap()
        );
    }

    #[test]
    fn test_sum_of_broadcast_product() {
        let b = broadcast(&x(1), 3).unwrap();
        let s = sum(&b).unwrap();
        assert_eq!(s, mult(&int_cst(3), &x(1)).unwrap());
    }
}

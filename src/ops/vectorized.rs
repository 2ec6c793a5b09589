//! Default behavior shared by elementwise operators
//!
//! An elementwise ("vectorized scalar") operator computes component `i` of its
//! result from component `i` of each operand, reading dimension-1 operands at
//! component 0. Operators compose the helpers below instead of inheriting
//! them:
//!
//! - [`broadcast_dim`]: result dimension / broadcast rule
//! - [`scalar_op`]: per-component code, `out = ReferenceFunction(args)` unless
//!   the operator has a fused form
//! - [`chain_rule`]: `Σ_i x_i.Grad(v, gradin * Derivative_i(x))`

use crate::codegen::{BinaryOp, Elem, ScalarExpr, Statement};
use crate::error::{FormulaError, Result};
use crate::formula::{Formula, Op, Operation, Var};

use super::ElemOp;
use super::arithmetic::{add, mult};
use super::structural::{sum, zero};

/// Result dimension for operands of the given dimensions.
///
/// Every operand must be of dimension 1 or of the largest dimension.
pub fn broadcast_dim(op: &'static str, dims: &[usize]) -> Result<usize> {
    let dim = dims.iter().copied().max().unwrap_or(1);
    if dims.iter().any(|&d| d != 1 && d != dim) {
        return Err(FormulaError::mismatch(op, dims));
    }
    Ok(dim)
}

/// Generic elementwise node, no rewriting. The caller has validated `dim`.
pub(crate) fn make(op: ElemOp, args: &[&Formula], dim: usize) -> Formula {
    Formula::from_parts(
        Op::Elementwise(op),
        args.iter().map(|a| (*a).clone()).collect(),
        dim,
    )
}

/// Brings a gradient weight down to an operand's width: a dimension-1 operand
/// broadcast over a wider node receives the sum of the weight's components.
pub(crate) fn reduce_to(weight: &Formula, dim: usize) -> Result<Formula> {
    if weight.dim() == dim {
        Ok(weight.clone())
    } else if dim == 1 {
        sum(weight)
    } else {
        Err(FormulaError::mismatch("Grad", [weight.dim(), dim]))
    }
}

/// Default reverse-mode rule built from the operator's symbolic derivative.
pub fn chain_rule(node: &Formula, op: ElemOp, v: &Var, gradin: &Formula) -> Result<Formula> {
    let children = node.children();
    let derivatives = op.derivative(children)?;

    let mut acc = zero(v.dim())?;
    for (child, df) in children.iter().zip(derivatives.iter()) {
        let weight = reduce_to(&mult(gradin, df)?, child.dim())?;
        acc = add(&acc, &child.grad(v, &weight)?)?;
    }
    Ok(acc)
}

/// Statement computing one component of `op` into `out`.
pub fn scalar_op(op: ElemOp, out: &Elem, args: &[Elem]) -> Result<Vec<Statement>> {
    let info = op.info();
    if args.len() != info.arity {
        return Err(FormulaError::ArgumentCount {
            op: info.string_id,
            expected: info.arity,
            got: args.len(),
        });
    }
    let operands: Vec<ScalarExpr> = args.iter().cloned().map(ScalarExpr::Elem).collect();

    let value = match info.scalar_fn {
        Some(fun) => fun.expand(&operands, &op.params()),
        None => fused(op, operands)?,
    };
    Ok(vec![Statement::assign(out.clone(), value)])
}

/// Operators that emit their arithmetic directly instead of calling a scalar
/// function.
fn fused(op: ElemOp, operands: Vec<ScalarExpr>) -> Result<ScalarExpr> {
    let mut it = operands.into_iter();
    match (op, it.next(), it.next()) {
        (ElemOp::Add, Some(a), Some(b)) => Ok(ScalarExpr::binary(BinaryOp::Add, a, b)),
        (ElemOp::Subtract, Some(a), Some(b)) => Ok(ScalarExpr::binary(BinaryOp::Sub, a, b)),
        (ElemOp::Minus, Some(a), None) => Ok(ScalarExpr::neg(a)),
        _ => Err(FormulaError::UnsupportedOperand {
            op: op.info().string_id,
            arity: op.info().arity,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{int_cst, log, xlogx};
    use rstest::rstest;

    #[rstest]
    #[case(&[1, 1], Some(1))]
    #[case(&[3, 3], Some(3))]
    #[case(&[1, 3], Some(3))]
    #[case(&[3, 1, 3], Some(3))]
    #[case(&[2, 3], None)]
    #[case(&[3, 2, 1], None)]
    fn test_broadcast_dim(#[case] dims: &[usize], #[case] expected: Option<usize>) {
        assert_eq!(broadcast_dim("Op", dims).ok(), expected);
    }

    #[test]
    fn test_chain_rule_matches_manual_expansion() {
        let v = Var::vi(0, 1).unwrap();
        let x: Formula = v.into();
        let g: Formula = Var::vj(5, 1).unwrap().into();
        let f = xlogx(&x).unwrap();

        let auto = chain_rule(&f, ElemOp::XLogX, &v, &g).unwrap();
        let df = add(&log(&x).unwrap(), &int_cst(1)).unwrap();
        let manual = x.grad(&v, &mult(&g, &df).unwrap()).unwrap();
        assert_eq!(auto, manual);
    }

    #[test]
    fn test_reduce_to() {
        let w: Formula = Var::vj(0, 3).unwrap().into();
        assert_eq!(reduce_to(&w, 3).unwrap(), w);
        assert_eq!(reduce_to(&w, 1).unwrap(), sum(&w).unwrap());
        assert!(reduce_to(&w, 2).is_err());
    }
}

//! Unary elementwise math operators

use crate::error::{FormulaError, Result};
use crate::formula::{Formula, Op, Var};

use super::ElemOp;
use super::structural::{broadcast, int_cst, zero};
use super::vectorized::make;

fn unary(op: ElemOp, f: &Formula) -> Result<Formula> {
    Ok(make(op, &[f], f.dim()))
}

/// `1` at the dimension of `f`
fn ones_like(f: &Formula) -> Result<Formula> {
    broadcast(&int_cst(1), f.dim())
}

pub fn exp(f: &Formula) -> Result<Formula> {
    match f.op() {
        Op::Zero => ones_like(f),
        _ => unary(ElemOp::Exp, f),
    }
}

pub fn log(f: &Formula) -> Result<Formula> {
    match f.op() {
        Op::Zero => Err(FormulaError::SingularOperand { op: "Log" }),
        Op::IntCst(1) => zero(1),
        _ => unary(ElemOp::Log, f),
    }
}

pub fn sin(f: &Formula) -> Result<Formula> {
    match f.op() {
        Op::Zero => Ok(f.clone()),
        _ => unary(ElemOp::Sin, f),
    }
}

pub fn cos(f: &Formula) -> Result<Formula> {
    match f.op() {
        Op::Zero => ones_like(f),
        _ => unary(ElemOp::Cos, f),
    }
}

pub fn sqrt(f: &Formula) -> Result<Formula> {
    match f.op() {
        Op::Zero | Op::IntCst(1) => Ok(f.clone()),
        _ => unary(ElemOp::Sqrt, f),
    }
}

/// `1 / sqrt(f)`
pub fn rsqrt(f: &Formula) -> Result<Formula> {
    match f.op() {
        Op::Zero => Err(FormulaError::SingularOperand { op: "Rsqrt" }),
        Op::IntCst(1) => Ok(f.clone()),
        _ => unary(ElemOp::Rsqrt, f),
    }
}

pub fn square(f: &Formula) -> Result<Formula> {
    match f.op() {
        Op::Zero => Ok(f.clone()),
        Op::IntCst(n) if n.checked_mul(*n).is_some() => Ok(int_cst(n * n)),
        Op::Elementwise(ElemOp::Minus) => square(&f.children()[0]),
        _ => unary(ElemOp::Square, f),
    }
}

/// `1 / f`
pub fn inv(f: &Formula) -> Result<Formula> {
    match f.op() {
        Op::Zero => Err(FormulaError::SingularOperand { op: "Inv" }),
        Op::IntCst(1) | Op::IntCst(-1) => Ok(f.clone()),
        Op::Elementwise(ElemOp::Inv) => Ok(f.children()[0].clone()),
        _ => unary(ElemOp::Inv, f),
    }
}

pub fn abs(f: &Formula) -> Result<Formula> {
    match f.op() {
        Op::Zero => Ok(f.clone()),
        Op::IntCst(n) if *n != i32::MIN => Ok(int_cst(n.abs())),
        _ => unary(ElemOp::Abs, f),
    }
}

/// `-1`, `0` or `1`
pub fn sign(f: &Formula) -> Result<Formula> {
    match f.op() {
        Op::Zero => Ok(f.clone()),
        Op::IntCst(n) => Ok(int_cst(n.signum())),
        _ => unary(ElemOp::Sign, f),
    }
}

/// Heaviside step, `1` at zero
pub fn step(f: &Formula) -> Result<Formula> {
    match f.op() {
        Op::Zero => ones_like(f),
        Op::IntCst(n) => Ok(int_cst(if *n < 0 { 0 } else { 1 })),
        _ => unary(ElemOp::Step, f),
    }
}

pub fn relu(f: &Formula) -> Result<Formula> {
    match f.op() {
        Op::Zero => Ok(f.clone()),
        Op::IntCst(n) => Ok(int_cst((*n).max(0))),
        _ => unary(ElemOp::ReLU, f),
    }
}

/// `x * log(x)`, continuously extended by `0` at `x = 0`
pub fn xlogx(f: &Formula) -> Result<Formula> {
    match f.op() {
        Op::Zero => Ok(f.clone()),
        Op::IntCst(1) => zero(1),
        _ => unary(ElemOp::XLogX, f),
    }
}

/// `f ** m` for an integer exponent
pub fn pow(f: &Formula, m: i32) -> Result<Formula> {
    match (m, f.op()) {
        (0, _) => ones_like(f),
        (1, _) => Ok(f.clone()),
        (2, _) => square(f),
        (m, Op::Zero) if m > 0 => Ok(f.clone()),
        (_, Op::Zero) => Err(FormulaError::SingularOperand { op: "Pow" }),
        (_, Op::IntCst(1)) => Ok(f.clone()),
        _ => unary(ElemOp::Pow(m), f),
    }
}

/// Piecewise-constant operators have a zero gradient everywhere they are
/// differentiable.
pub(crate) fn constant_grad(_node: &Formula, v: &Var, _gradin: &Formula) -> Result<Formula> {
    zero(v.dim())
}

//! Reductions over the inner dataset loop
//!
//! A reduction folds the per-pair values of its formula(s) into an
//! accumulator. Only the accumulator code is produced here; the loop that
//! evaluates the formulas and calls [`Reduction::reduce_pair`] is external.
//!
//! Two accumulation schemes are available: the plain one
//! ([`Reduction::reduce_pair`]) and a compensated (Kahan) one
//! ([`Reduction::reduce_pair_kahan`]) that carries the rounding error of
//! every addition in a separate `tmp` slot.

use std::fmt;

use log::debug;

use crate::codegen::{BinaryOp, CFun, Elem, ScalarExpr, Slot, Statement};
use crate::error::{FormulaError, Result};
use crate::formula::{Category, Formula, Var};
use crate::grad::grad;
use crate::ops::{exp, int_cst, mult, subtract};

/// Index of the reduction's output. The reduction runs over the other one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Axis {
    /// One output per `i`, summed over `j`
    #[default]
    I,
    /// One output per `j`, summed over `i`
    J,
}

impl Axis {
    /// Output index of a gradient w.r.t. `v`. A parameter gradient is
    /// produced per `i` and the caller sums it over `i`.
    pub fn of(v: &Var) -> Self {
        match v.category() {
            Category::I | Category::Param => Axis::I,
            Category::J => Axis::J,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::I => f.write_str("i"),
            Axis::J => f.write_str("j"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reduction {
    /// `Σ F`
    Sum { f: Formula, axis: Axis },
    /// Stabilised log-sum-exp with weights: the accumulator holds
    /// `(m, s)` with `m = max F` and `s = Σ exp(F - m) G`.
    MaxSumShiftExp { f: Formula, g: Formula, axis: Axis },
}

impl Reduction {
    pub fn sum(f: Formula, axis: Axis) -> Self {
        Reduction::Sum { f, axis }
    }

    /// `F` must be of dimension 1; `G` defaults to the constant 1.
    pub fn max_sum_shift_exp(f: Formula, g: Option<Formula>, axis: Axis) -> Result<Self> {
        if f.dim() != 1 {
            return Err(FormulaError::mismatch("Max_SumShiftExp", [f.dim(), 1]));
        }
        let g = g.unwrap_or_else(|| int_cst(1));
        Ok(Reduction::MaxSumShiftExp { f, g, axis })
    }

    pub fn string_id(&self) -> &'static str {
        match self {
            Reduction::Sum { .. } => "Sum_Reduction",
            Reduction::MaxSumShiftExp { .. } => "Max_SumShiftExp_Reduction",
        }
    }

    pub fn axis(&self) -> Axis {
        match self {
            Reduction::Sum { axis, .. } | Reduction::MaxSumShiftExp { axis, .. } => *axis,
        }
    }

    /// Formulas evaluated per pair, in the order their values are laid out
    /// in the `xi` slot.
    pub fn formulas(&self) -> Vec<&Formula> {
        match self {
            Reduction::Sum { f, .. } => vec![f],
            Reduction::MaxSumShiftExp { f, g, .. } => vec![f, g],
        }
    }

    /// Accumulator (and `xi`) dimension
    pub fn dim_red(&self) -> usize {
        self.formulas().iter().map(|f| f.dim()).sum()
    }

    /// Output dimension
    pub fn dim(&self) -> usize {
        self.dim_red()
    }

    /// Dimension of the `tmp` slot of the compensated scheme: one running
    /// error per summed component. The max of `Max_SumShiftExp` needs none.
    pub fn kahan_dim(&self) -> usize {
        match self {
            Reduction::Sum { .. } => self.dim_red(),
            Reduction::MaxSumShiftExp { .. } => self.dim_red() - 1,
        }
    }

    fn check(&self, slot: &Slot, dim: usize) -> Result<()> {
        if slot.dim != dim {
            return Err(FormulaError::mismatch(self.string_id(), [slot.dim, dim]));
        }
        Ok(())
    }

    pub fn initialize(&self, acc: &Slot) -> Result<Vec<Statement>> {
        self.check(acc, self.dim_red())?;
        let first = match self {
            Reduction::Sum { .. } => 0.0,
            Reduction::MaxSumShiftExp { .. } => f64::NEG_INFINITY,
        };
        Ok((0..acc.dim)
            .map(|k| {
                let v = if k == 0 { first } else { 0.0 };
                Statement::assign(acc.at(k), ScalarExpr::Lit(v))
            })
            .collect())
    }

    /// Zeroes the error slot of the compensated scheme.
    pub fn initialize_kahan(&self, tmp: &Slot) -> Result<Vec<Statement>> {
        self.check(tmp, self.kahan_dim())?;
        Ok((0..tmp.dim)
            .map(|k| Statement::assign(tmp.at(k), ScalarExpr::Lit(0.0)))
            .collect())
    }

    /// Folds the pair value `xi` into `acc`.
    pub fn reduce_pair(&self, acc: &Slot, xi: &Slot) -> Result<Vec<Statement>> {
        self.check(acc, self.dim_red())?;
        self.check(xi, self.dim_red())?;
        match self {
            Reduction::Sum { .. } => Ok((0..acc.dim)
                .map(|k| Statement::assign(acc.at(k), add(acc.at(k).into(), xi.at(k).into())))
                .collect()),
            Reduction::MaxSumShiftExp { .. } => Ok(vec![shift_exp_step(acc, xi)]),
        }
    }

    /// Folds `xi` into `acc` with compensated summation. `tmp` carries the
    /// running error (see [`Reduction::kahan_dim`]); `scratch` is a
    /// one-component slot for the corrected addend.
    pub fn reduce_pair_kahan(
        &self,
        acc: &Slot,
        xi: &Slot,
        tmp: &Slot,
        scratch: &Slot,
    ) -> Result<Vec<Statement>> {
        self.check(acc, self.dim_red())?;
        self.check(xi, self.dim_red())?;
        self.check(tmp, self.kahan_dim())?;
        self.check(scratch, 1)?;
        let a = scratch.at(0);
        match self {
            Reduction::Sum { .. } => Ok((0..acc.dim)
                .flat_map(|k| {
                    let addend = sub(xi.at(k).into(), tmp.at(k).into());
                    kahan_add(acc.at(k), acc.at(k).into(), addend, tmp.at(k), &a)
                })
                .collect()),
            Reduction::MaxSumShiftExp { .. } => {
                Ok(vec![shift_exp_step_kahan(acc, xi, tmp, &a)])
            }
        }
    }

    pub fn finalize(&self, acc: &Slot, out: &Slot) -> Result<Vec<Statement>> {
        self.check(acc, self.dim_red())?;
        self.check(out, self.dim())?;
        Ok((0..out.dim)
            .map(|k| Statement::assign(out.at(k), acc.at(k).into()))
            .collect())
    }

    /// Gradient of the reduction w.r.t. `v`, as a `Sum` reduction indexed
    /// by `v`'s category.
    ///
    /// For `Sum`, `gradin` has the output dimension and `shift` is unused.
    ///
    /// For `Max_SumShiftExp`, the output `(m, s)` must have been flattened
    /// into `L = m + log(s)` (or a weighted soft-max) before backpropagating.
    /// `shift` is the forward maximum `m` (dimension 1) and `gradin` is the
    /// incoming gradient of `L` divided by `s` (dimension `G.dim`). The
    /// result sums `Grad(exp(F - m) * G, v, gradin)`.
    pub fn grad(&self, v: &Var, gradin: &Formula, shift: Option<&Formula>) -> Result<Reduction> {
        let axis = Axis::of(v);
        let f = match self {
            Reduction::Sum { f, .. } => grad(f, v, gradin)?,
            Reduction::MaxSumShiftExp { f, g, .. } => {
                let m = shift.ok_or(FormulaError::MissingOperand {
                    op: self.string_id(),
                    operand: "shift",
                })?;
                if m.dim() != 1 {
                    return Err(FormulaError::mismatch(self.string_id(), [m.dim(), 1]));
                }
                let weighted = mult(&exp(&subtract(f, m)?)?, g)?;
                grad(&weighted, v, gradin)?
            }
        };
        debug!("{}: gradient w.r.t. {v} summed per {axis}", self.string_id());
        Ok(Reduction::sum(f, axis))
    }
}

fn add(a: ScalarExpr, b: ScalarExpr) -> ScalarExpr {
    ScalarExpr::binary(BinaryOp::Add, a, b)
}

fn sub(a: ScalarExpr, b: ScalarExpr) -> ScalarExpr {
    ScalarExpr::binary(BinaryOp::Sub, a, b)
}

fn mul(a: ScalarExpr, b: ScalarExpr) -> ScalarExpr {
    ScalarExpr::binary(BinaryOp::Mul, a, b)
}

fn exp_diff(a: ScalarExpr, b: ScalarExpr) -> ScalarExpr {
    ScalarExpr::call(CFun::Exp, sub(a, b))
}

/// `out = base + addend` with the rounding error stored in `err`.
///
/// `base` may read `out`: the error is written before `out` is, so both read
/// the old value.
fn kahan_add(
    out: Elem,
    base: ScalarExpr,
    addend: ScalarExpr,
    err: Elem,
    scratch: &Elem,
) -> [Statement; 3] {
    let a = || ScalarExpr::from(scratch.clone());
    [
        Statement::assign(scratch.clone(), addend),
        // (b - base) - a
        Statement::assign(err, sub(sub(add(base.clone(), a()), base.clone()), a())),
        Statement::assign(out, add(base, a())),
    ]
}

// m > m': (m, s + s' exp(m' - m))
// else:   (m', s' + s exp(m - m'))
fn shift_exp_step(acc: &Slot, xi: &Slot) -> Statement {
    let m = || ScalarExpr::from(acc.at(0));
    let m2 = || ScalarExpr::from(xi.at(0));

    let then = (1..acc.dim)
        .map(|k| {
            let scaled = mul(xi.at(k).into(), exp_diff(m2(), m()));
            Statement::assign(acc.at(k), add(acc.at(k).into(), scaled))
        })
        .collect();

    let mut otherwise: Vec<Statement> = (1..acc.dim)
        .map(|k| {
            let scaled = mul(exp_diff(m(), m2()), acc.at(k).into());
            Statement::assign(acc.at(k), add(xi.at(k).into(), scaled))
        })
        .collect();
    otherwise.push(Statement::assign(acc.at(0), m2()));

    Statement::If {
        cond: ScalarExpr::binary(BinaryOp::Gt, m(), m2()),
        then,
        otherwise,
    }
}

/// [`shift_exp_step`] with each sum update compensated; `tmp[k - 1]` is the
/// error of `acc[k]`.
fn shift_exp_step_kahan(acc: &Slot, xi: &Slot, tmp: &Slot, scratch: &Elem) -> Statement {
    let m = || ScalarExpr::from(acc.at(0));
    let m2 = || ScalarExpr::from(xi.at(0));

    let then = (1..acc.dim)
        .flat_map(|k| {
            let addend = sub(mul(xi.at(k).into(), exp_diff(m2(), m())), tmp.at(k - 1).into());
            kahan_add(acc.at(k), acc.at(k).into(), addend, tmp.at(k - 1), scratch)
        })
        .collect();

    let mut otherwise: Vec<Statement> = (1..acc.dim)
        .flat_map(|k| {
            let rescaled = mul(exp_diff(m(), m2()), acc.at(k).into());
            let addend = sub(xi.at(k).into(), mul(exp_diff(m(), m2()), tmp.at(k - 1).into()));
            kahan_add(acc.at(k), rescaled, addend, tmp.at(k - 1), scratch)
        })
        .collect();
    otherwise.push(Statement::assign(acc.at(0), m2()));

    Statement::If {
        cond: ScalarExpr::binary(BinaryOp::Gt, m(), m2()),
        then,
        otherwise,
    }
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reduction::Sum { f: formula, axis } => write!(f, "Sum_Reduction({formula},{axis})"),
            Reduction::MaxSumShiftExp { f: ff, g, axis } => {
                write!(f, "Max_SumShiftExp_Reduction(F={ff},{axis},G={g})")
            }
        }
    }
}

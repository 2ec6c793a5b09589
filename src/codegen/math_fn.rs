//! Reference scalar functions of the elementwise operators

use super::{BinaryOp, CFun, ScalarExpr};

/// Scalar function `out = f(args)` an elementwise operator applies per
/// component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarFn {
    Mult,
    Divide,
    Exp,
    Log,
    Sin,
    Cos,
    Sqrt,
    Rsqrt,
    Square,
    Inv,
    Abs,
    Sign,
    Step,
    ReLU,
    XLogX,
    /// Integer power, exponent in `params[0]`
    Pow,
}

fn lit(v: f64) -> ScalarExpr {
    ScalarExpr::Lit(v)
}

fn mul(a: ScalarExpr, b: ScalarExpr) -> ScalarExpr {
    ScalarExpr::binary(BinaryOp::Mul, a, b)
}

fn div(a: ScalarExpr, b: ScalarExpr) -> ScalarExpr {
    ScalarExpr::binary(BinaryOp::Div, a, b)
}

impl ScalarFn {
    /// Expression for the function applied to `args`.
    ///
    /// The caller has checked `args` against the operator's arity.
    pub fn expand(self, args: &[ScalarExpr], params: &[i32]) -> ScalarExpr {
        let a = args[0].clone();
        match self {
            ScalarFn::Mult => mul(a, args[1].clone()),
            ScalarFn::Divide => div(a, args[1].clone()),
            ScalarFn::Exp => ScalarExpr::call(CFun::Exp, a),
            ScalarFn::Log => ScalarExpr::call(CFun::Log, a),
            ScalarFn::Sin => ScalarExpr::call(CFun::Sin, a),
            ScalarFn::Cos => ScalarExpr::call(CFun::Cos, a),
            ScalarFn::Sqrt => ScalarExpr::call(CFun::Sqrt, a),
            ScalarFn::Rsqrt => div(lit(1.0), ScalarExpr::call(CFun::Sqrt, a)),
            ScalarFn::Square => mul(a.clone(), a),
            ScalarFn::Inv => div(lit(1.0), a),
            ScalarFn::Abs => ScalarExpr::call(CFun::Fabs, a),
            // (a > 0) - (a < 0)
            ScalarFn::Sign => ScalarExpr::binary(
                BinaryOp::Sub,
                ScalarExpr::binary(BinaryOp::Gt, a.clone(), lit(0.0)),
                ScalarExpr::binary(BinaryOp::Lt, a, lit(0.0)),
            ),
            ScalarFn::Step => ScalarExpr::select(
                ScalarExpr::binary(BinaryOp::Lt, a, lit(0.0)),
                lit(0.0),
                lit(1.0),
            ),
            ScalarFn::ReLU => ScalarExpr::select(
                ScalarExpr::binary(BinaryOp::Lt, a.clone(), lit(0.0)),
                lit(0.0),
                a,
            ),
            // 0 * log(0) is taken as 0
            ScalarFn::XLogX => ScalarExpr::select(
                ScalarExpr::binary(BinaryOp::Eq, a.clone(), lit(0.0)),
                lit(0.0),
                mul(a.clone(), ScalarExpr::call(CFun::Log, a)),
            ),
            ScalarFn::Pow => power(a, params.first().copied().unwrap_or(1)),
        }
    }
}

/// Largest `|m|` expanded into a product; larger exponents call `pow`.
const MAX_UNROLLED_POWER: u32 = 4;

/// `a ** m` as a product of `|m|` factors, inverted for negative `m`
fn power(a: ScalarExpr, m: i32) -> ScalarExpr {
    let n = m.unsigned_abs();
    if n == 0 {
        return lit(1.0);
    }
    if n > MAX_UNROLLED_POWER {
        return ScalarExpr::Call(CFun::Pow, vec![a, lit(f64::from(m))]);
    }
    let mut prod = a.clone();
    for _ in 1..n {
        prod = mul(prod, a.clone());
    }
    if m < 0 { div(lit(1.0), prod) } else { prod }
}

//! Elementwise operator kinds and their per-type metadata

use crate::codegen::{Elem, ScalarFn, Statement};
use crate::error::{FormulaError, Result};
use crate::formula::{Fixity, Formula, PrintSpec, Var};
use crate::verify::Verification;

use super::arithmetic::{self, add, divide, minus, mult, subtract};
use super::math::{self, abs, cos, exp, inv, log, pow, relu, rsqrt, sign, sin, sqrt, square, step, xlogx};
use super::structural::int_cst;
use super::vectorized::{self, broadcast_dim};

/// Elementwise operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElemOp {
    Add,
    Subtract,
    Mult,
    Divide,
    Minus,
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
    /// Integer power
    Pow(i32),
}

/// Compile-time record attached to each operator type.
pub struct OpInfo {
    pub string_id: &'static str,
    pub arity: usize,
    pub print_spec: Option<PrintSpec>,
    /// Reference scalar function used by the default emission; `None` means the
    /// operator emits fused arithmetic.
    pub scalar_fn: Option<ScalarFn>,
    /// The operator supplies its own `Grad` instead of a `Derivative`.
    pub overrides_grad: bool,
    pub verification: Option<Verification>,
}

// ============================================================================
// Metadata table
// ============================================================================

static ADD: OpInfo = OpInfo {
    string_id: "Add",
    arity: 2,
    print_spec: Some(PrintSpec::new("+", Fixity::Infix, 4)),
    scalar_fn: None,
    overrides_grad: true,
    verification: Some(Verification {
        ranges: &[],
        reference: |x, _| x[0] + x[1],
        description: "a + b",
    }),
};

static SUBTRACT: OpInfo = OpInfo {
    string_id: "Subtract",
    arity: 2,
    print_spec: Some(PrintSpec::new("-", Fixity::Infix, 4)),
    scalar_fn: None,
    overrides_grad: true,
    verification: Some(Verification {
        ranges: &[],
        reference: |x, _| x[0] - x[1],
        description: "a - b",
    }),
};

static MULT: OpInfo = OpInfo {
    string_id: "Mult",
    arity: 2,
    print_spec: Some(PrintSpec::new("*", Fixity::Infix, 3)),
    scalar_fn: Some(ScalarFn::Mult),
    overrides_grad: false,
    verification: Some(Verification {
        ranges: &[],
        reference: |x, _| x[0] * x[1],
        description: "a * b",
    }),
};

static DIVIDE: OpInfo = OpInfo {
    string_id: "Divide",
    arity: 2,
    print_spec: Some(PrintSpec::new("/", Fixity::Infix, 3)),
    scalar_fn: Some(ScalarFn::Divide),
    overrides_grad: false,
    verification: Some(Verification {
        ranges: &[(-2.0, 2.0), (0.5, 2.0)],
        reference: |x, _| x[0] / x[1],
        description: "a / b",
    }),
};

static MINUS: OpInfo = OpInfo {
    string_id: "Minus",
    arity: 1,
    print_spec: Some(PrintSpec::new("-", Fixity::Prefix, 2)),
    scalar_fn: None,
    overrides_grad: true,
    verification: Some(Verification {
        ranges: &[],
        reference: |x, _| -x[0],
        description: "-a",
    }),
};

static EXP: OpInfo = OpInfo {
    string_id: "Exp",
    arity: 1,
    print_spec: None,
    scalar_fn: Some(ScalarFn::Exp),
    overrides_grad: false,
    verification: Some(Verification {
        ranges: &[],
        reference: |x, _| x[0].exp(),
        description: "e^x",
    }),
};

static LOG: OpInfo = OpInfo {
    string_id: "Log",
    arity: 1,
    print_spec: None,
    scalar_fn: Some(ScalarFn::Log),
    overrides_grad: false,
    verification: Some(Verification {
        ranges: &[(0.1, 4.0)],
        reference: |x, _| x[0].ln(),
        description: "ln(x)",
    }),
};

static SIN: OpInfo = OpInfo {
    string_id: "Sin",
    arity: 1,
    print_spec: None,
    scalar_fn: Some(ScalarFn::Sin),
    overrides_grad: false,
    verification: Some(Verification {
        ranges: &[(-3.0, 3.0)],
        reference: |x, _| x[0].sin(),
        description: "sin(x)",
    }),
};

static COS: OpInfo = OpInfo {
    string_id: "Cos",
    arity: 1,
    print_spec: None,
    scalar_fn: Some(ScalarFn::Cos),
    overrides_grad: false,
    verification: Some(Verification {
        ranges: &[(-3.0, 3.0)],
        reference: |x, _| x[0].cos(),
        description: "cos(x)",
    }),
};

static SQRT: OpInfo = OpInfo {
    string_id: "Sqrt",
    arity: 1,
    print_spec: None,
    scalar_fn: Some(ScalarFn::Sqrt),
    overrides_grad: false,
    verification: Some(Verification {
        ranges: &[(0.1, 4.0)],
        reference: |x, _| x[0].sqrt(),
        description: "x^(1/2)",
    }),
};

static RSQRT: OpInfo = OpInfo {
    string_id: "Rsqrt",
    arity: 1,
    print_spec: None,
    scalar_fn: Some(ScalarFn::Rsqrt),
    overrides_grad: false,
    verification: Some(Verification {
        ranges: &[(0.1, 4.0)],
        reference: |x, _| x[0].powf(-0.5),
        description: "x^(-1/2)",
    }),
};

static SQUARE: OpInfo = OpInfo {
    string_id: "Square",
    arity: 1,
    print_spec: Some(PrintSpec::new("**2", Fixity::Postfix, 1)),
    scalar_fn: Some(ScalarFn::Square),
    overrides_grad: false,
    verification: Some(Verification {
        ranges: &[],
        reference: |x, _| x[0].powi(2),
        description: "x^2",
    }),
};

static INV: OpInfo = OpInfo {
    string_id: "Inv",
    arity: 1,
    print_spec: None,
    scalar_fn: Some(ScalarFn::Inv),
    overrides_grad: false,
    verification: Some(Verification {
        ranges: &[(0.5, 2.0)],
        reference: |x, _| x[0].recip(),
        description: "1 / x",
    }),
};

static ABS: OpInfo = OpInfo {
    string_id: "Abs",
    arity: 1,
    print_spec: None,
    scalar_fn: Some(ScalarFn::Abs),
    overrides_grad: false,
    verification: Some(Verification {
        ranges: &[],
        reference: |x, _| x[0].abs(),
        description: "|x|",
    }),
};

static SIGN: OpInfo = OpInfo {
    string_id: "Sign",
    arity: 1,
    print_spec: None,
    scalar_fn: Some(ScalarFn::Sign),
    overrides_grad: true,
    verification: Some(Verification {
        ranges: &[],
        reference: |x, _| {
            if x[0] > 0.0 {
                1.0
            } else if x[0] < 0.0 {
                -1.0
            } else {
                0.0
            }
        },
        description: "sign(x)",
    }),
};

static STEP: OpInfo = OpInfo {
    string_id: "Step",
    arity: 1,
    print_spec: None,
    scalar_fn: Some(ScalarFn::Step),
    overrides_grad: true,
    verification: Some(Verification {
        ranges: &[],
        reference: |x, _| if x[0] >= 0.0 { 1.0 } else { 0.0 },
        description: "H(x)",
    }),
};

static RELU: OpInfo = OpInfo {
    string_id: "ReLU",
    arity: 1,
    print_spec: None,
    scalar_fn: Some(ScalarFn::ReLU),
    overrides_grad: false,
    verification: Some(Verification {
        ranges: &[],
        reference: |x, _| x[0].max(0.0),
        description: "max(x, 0)",
    }),
};

static XLOGX: OpInfo = OpInfo {
    string_id: "XLogX",
    arity: 1,
    print_spec: None,
    scalar_fn: Some(ScalarFn::XLogX),
    overrides_grad: false,
    verification: Some(Verification {
        ranges: &[(0.0, 2.0)],
        reference: |x, _| if x[0] == 0.0 { 0.0 } else { x[0] * x[0].ln() },
        description: "x * ln(x)",
    }),
};

static POW: OpInfo = OpInfo {
    string_id: "Pow",
    arity: 1,
    print_spec: None,
    scalar_fn: Some(ScalarFn::Pow),
    overrides_grad: false,
    verification: Some(Verification {
        ranges: &[(0.5, 2.0)],
        reference: |x, p| x[0].powf(f64::from(p[0])),
        description: "x^m",
    }),
};

/// Operator instances covered by the differential test harness.
static CATALOG: [ElemOp; 21] = [
    ElemOp::Add,
    ElemOp::Subtract,
    ElemOp::Mult,
    ElemOp::Divide,
    ElemOp::Minus,
    ElemOp::Exp,
    ElemOp::Log,
    ElemOp::Sin,
    ElemOp::Cos,
    ElemOp::Sqrt,
    ElemOp::Rsqrt,
    ElemOp::Square,
    ElemOp::Inv,
    ElemOp::Abs,
    ElemOp::Sign,
    ElemOp::Step,
    ElemOp::ReLU,
    ElemOp::XLogX,
    ElemOp::Pow(3),
    ElemOp::Pow(-2),
    ElemOp::Pow(7),
];

impl ElemOp {
    pub fn info(&self) -> &'static OpInfo {
        match self {
            ElemOp::Add => &ADD,
            ElemOp::Subtract => &SUBTRACT,
            ElemOp::Mult => &MULT,
            ElemOp::Divide => &DIVIDE,
            ElemOp::Minus => &MINUS,
            ElemOp::Exp => &EXP,
            ElemOp::Log => &LOG,
            ElemOp::Sin => &SIN,
            ElemOp::Cos => &COS,
            ElemOp::Sqrt => &SQRT,
            ElemOp::Rsqrt => &RSQRT,
            ElemOp::Square => &SQUARE,
            ElemOp::Inv => &INV,
            ElemOp::Abs => &ABS,
            ElemOp::Sign => &SIGN,
            ElemOp::Step => &STEP,
            ElemOp::ReLU => &RELU,
            ElemOp::XLogX => &XLOGX,
            ElemOp::Pow(_) => &POW,
        }
    }

    pub fn catalog() -> &'static [ElemOp] {
        &CATALOG
    }

    pub fn arity(&self) -> usize {
        self.info().arity
    }

    pub fn params(&self) -> Vec<i32> {
        match self {
            ElemOp::Pow(m) => vec![*m],
            _ => Vec::new(),
        }
    }

    pub(crate) fn check_arity(&self, got: usize) -> Result<()> {
        let info = self.info();
        if got != info.arity {
            return Err(FormulaError::ArgumentCount {
                op: info.string_id,
                expected: info.arity,
                got,
            });
        }
        Ok(())
    }

    /// Builds `self(args)` through the simplifying constructor.
    pub fn build(&self, args: &[Formula]) -> Result<Formula> {
        self.check_arity(args.len())?;
        match self {
            ElemOp::Add => add(&args[0], &args[1]),
            ElemOp::Subtract => subtract(&args[0], &args[1]),
            ElemOp::Mult => mult(&args[0], &args[1]),
            ElemOp::Divide => divide(&args[0], &args[1]),
            ElemOp::Minus => minus(&args[0]),
            ElemOp::Exp => exp(&args[0]),
            ElemOp::Log => log(&args[0]),
            ElemOp::Sin => sin(&args[0]),
            ElemOp::Cos => cos(&args[0]),
            ElemOp::Sqrt => sqrt(&args[0]),
            ElemOp::Rsqrt => rsqrt(&args[0]),
            ElemOp::Square => square(&args[0]),
            ElemOp::Inv => inv(&args[0]),
            ElemOp::Abs => abs(&args[0]),
            ElemOp::Sign => sign(&args[0]),
            ElemOp::Step => step(&args[0]),
            ElemOp::ReLU => relu(&args[0]),
            ElemOp::XLogX => xlogx(&args[0]),
            ElemOp::Pow(m) => pow(&args[0], *m),
        }
    }

    /// Builds the generic node `self(args)` without any rewriting. The
    /// broadcast rule is still enforced.
    pub fn generic(&self, args: &[Formula]) -> Result<Formula> {
        self.check_arity(args.len())?;
        let dims: Vec<usize> = args.iter().map(Formula::dim).collect();
        let dim = broadcast_dim(self.info().string_id, &dims)?;
        let refs: Vec<&Formula> = args.iter().collect();
        Ok(vectorized::make(*self, &refs, dim))
    }

    /// Local partial derivatives `∂self/∂args[i]`, one formula per operand.
    ///
    /// Operators that override `Grad` have no derivative.
    pub fn derivative(&self, args: &[Formula]) -> Result<Vec<Formula>> {
        let info = self.info();
        if info.overrides_grad {
            return Err(FormulaError::UnsupportedOperand {
                op: info.string_id,
                arity: args.len(),
            });
        }
        self.check_arity(args.len())?;

        let x = &args[0];
        let d = match self {
            ElemOp::Mult => vec![args[1].clone(), args[0].clone()],
            ElemOp::Divide => {
                let b = &args[1];
                vec![inv(b)?, minus(&divide(x, &square(b)?)?)?]
            }
            ElemOp::Exp => vec![exp(x)?],
            ElemOp::Log => vec![inv(x)?],
            ElemOp::Sin => vec![cos(x)?],
            ElemOp::Cos => vec![minus(&sin(x)?)?],
            ElemOp::Sqrt => vec![divide(&rsqrt(x)?, &int_cst(2))?],
            ElemOp::Rsqrt => vec![divide(&minus(&rsqrt(x)?)?, &mult(&int_cst(2), x)?)?],
            ElemOp::Square => vec![mult(&int_cst(2), x)?],
            ElemOp::Inv => vec![minus(&square(&inv(x)?)?)?],
            ElemOp::Abs => vec![sign(x)?],
            ElemOp::ReLU => vec![step(x)?],
            ElemOp::XLogX => vec![add(&log(x)?, &int_cst(1))?],
            ElemOp::Pow(m) => {
                let m1 = m.checked_sub(1).ok_or(FormulaError::UnsupportedOperand {
                    op: info.string_id,
                    arity: 1,
                })?;
                vec![mult(&int_cst(*m), &pow(x, m1)?)?]
            }
            ElemOp::Add | ElemOp::Subtract | ElemOp::Minus | ElemOp::Sign | ElemOp::Step => {
                return Err(FormulaError::UnsupportedOperand {
                    op: info.string_id,
                    arity: args.len(),
                });
            }
        };
        Ok(d)
    }

    /// `Grad` of a node of this operator: the operator's own rule when it
    /// overrides it, the chain rule over [`ElemOp::derivative`] otherwise.
    pub fn grad(&self, node: &Formula, v: &Var, gradin: &Formula) -> Result<Formula> {
        if !self.info().overrides_grad {
            return vectorized::chain_rule(node, *self, v, gradin);
        }
        match self {
            ElemOp::Add => arithmetic::add_grad(node, v, gradin),
            ElemOp::Subtract => arithmetic::subtract_grad(node, v, gradin),
            ElemOp::Minus => arithmetic::minus_grad(node, v, gradin),
            ElemOp::Sign | ElemOp::Step => math::constant_grad(node, v, gradin),
            _ => Err(FormulaError::UnsupportedOperand {
                op: self.info().string_id,
                arity: node.children().len(),
            }),
        }
    }

    /// Statement(s) computing one component, see [`vectorized::scalar_op`].
    pub fn scalar_op(&self, out: &Elem, args: &[Elem]) -> Result<Vec<Statement>> {
        vectorized::scalar_op(*self, out, args)
    }
}

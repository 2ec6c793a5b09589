//! Emitted-code model
//!
//! Nodes emit a small typed statement tree instead of source text. The tree
//! is rendered to C by [`CRenderer`]; any other consumer (for instance a test
//! interpreter) can walk it directly.

mod c_renderer;
pub mod emit;
mod math_fn;

pub use c_renderer::{CRenderer, Precision, RenderConfig};
pub use math_fn::ScalarFn;

/// Named buffer of `dim` scalars.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slot {
    pub name: String,
    pub dim: usize,
}

impl Slot {
    pub fn new(name: impl Into<String>, dim: usize) -> Self {
        Self {
            name: name.into(),
            dim,
        }
    }

    /// Component `k`
    pub fn at(&self, k: usize) -> Elem {
        Elem {
            slot: self.name.clone(),
            index: k,
        }
    }

    /// Component `k` of an operand broadcast to a wider node: a dimension-1
    /// slot is always read at component 0.
    pub fn read(&self, k: usize) -> Elem {
        if self.dim == 1 { self.at(0) } else { self.at(k) }
    }
}

/// One scalar component of a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Elem {
    pub slot: String,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Eq,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Eq => "==",
        }
    }
}

/// C math library functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CFun {
    Exp,
    Log,
    Sin,
    Cos,
    Sqrt,
    Fabs,
    /// `pow(a, b)`
    Pow,
}

impl CFun {
    /// Double-precision name; the single-precision variant appends `f`.
    pub fn name(self) -> &'static str {
        match self {
            CFun::Exp => "exp",
            CFun::Log => "log",
            CFun::Sin => "sin",
            CFun::Cos => "cos",
            CFun::Sqrt => "sqrt",
            CFun::Fabs => "fabs",
            CFun::Pow => "pow",
        }
    }
}

/// Scalar expression
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarExpr {
    Elem(Elem),
    Lit(f64),
    Neg(Box<ScalarExpr>),
    Binary(BinaryOp, Box<ScalarExpr>, Box<ScalarExpr>),
    Call(CFun, Vec<ScalarExpr>),
    /// `cond ? then : otherwise`
    Select {
        cond: Box<ScalarExpr>,
        then: Box<ScalarExpr>,
        otherwise: Box<ScalarExpr>,
    },
}

impl ScalarExpr {
    pub fn binary(op: BinaryOp, a: ScalarExpr, b: ScalarExpr) -> Self {
        ScalarExpr::Binary(op, Box::new(a), Box::new(b))
    }

    pub fn neg(a: ScalarExpr) -> Self {
        ScalarExpr::Neg(Box::new(a))
    }

    pub fn call(f: CFun, a: ScalarExpr) -> Self {
        ScalarExpr::Call(f, vec![a])
    }

    pub fn select(cond: ScalarExpr, then: ScalarExpr, otherwise: ScalarExpr) -> Self {
        ScalarExpr::Select {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }
}

impl From<Elem> for ScalarExpr {
    fn from(e: Elem) -> Self {
        ScalarExpr::Elem(e)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Assign {
        out: Elem,
        value: ScalarExpr,
    },
    If {
        cond: ScalarExpr,
        then: Vec<Statement>,
        otherwise: Vec<Statement>,
    },
}

impl Statement {
    pub fn assign(out: Elem, value: ScalarExpr) -> Self {
        Statement::Assign { out, value }
    }

    /// Every element written by this statement (both branches of an `If`)
    pub fn writes(&self) -> Vec<&Elem> {
        match self {
            Statement::Assign { out, .. } => vec![out],
            Statement::If {
                then, otherwise, ..
            } => then
                .iter()
                .chain(otherwise.iter())
                .flat_map(Statement::writes)
                .collect(),
        }
    }
}

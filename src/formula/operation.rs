use crate::codegen::{Slot, Statement, emit};
use crate::error::Result;
use crate::grad;

use super::{Formula, Op, PrintSpec, Var};

/// Contract shared by every node of a formula tree.
///
/// The node kinds form a closed set ([`Op`]); this trait is the uniform view
/// the differentiation engine and the code-emission driver work against.
pub trait Operation {
    /// Identifier used to name the operator (and temporaries) in emitted code
    fn string_id(&self) -> &'static str;

    fn dim(&self) -> usize;

    fn children(&self) -> &[Formula];

    /// `None` prints the node in call style, `Id(children, params)`
    fn print_spec(&self) -> Option<PrintSpec>;

    /// Integer parameters that are part of the operator itself
    fn params(&self) -> Vec<i32>;

    /// Reverse-mode gradient contribution w.r.t. `v`.
    ///
    /// `gradin` must have the node's dimension; the result has `v`'s.
    fn grad(&self, v: &Var, gradin: &Formula) -> Result<Formula>;

    /// Statements writing the whole node value into `out`, reading one slot
    /// per child (or the bound input slot for a variable).
    fn emit(&self, out: &Slot, args: &[Slot]) -> Result<Vec<Statement>>;
}

impl Operation for Formula {
    fn string_id(&self) -> &'static str {
        match self.op() {
            Op::Zero => "Zero",
            Op::Var(_) => "Var",
            Op::IntCst(_) => "IntCst",
            Op::Broadcast => "Broadcast",
            Op::Sum => "Sum",
            Op::Elementwise(e) => e.info().string_id,
        }
    }

    fn dim(&self) -> usize {
        Formula::dim(self)
    }

    fn children(&self) -> &[Formula] {
        Formula::children(self)
    }

    fn print_spec(&self) -> Option<PrintSpec> {
        match self.op() {
            Op::Elementwise(e) => e.info().print_spec,
            _ => None,
        }
    }

    fn params(&self) -> Vec<i32> {
        match self.op() {
            Op::IntCst(n) => vec![*n],
            Op::Elementwise(e) => e.params(),
            _ => Vec::new(),
        }
    }

    fn grad(&self, v: &Var, gradin: &Formula) -> Result<Formula> {
        grad::node_grad(self, v, gradin)
    }

    fn emit(&self, out: &Slot, args: &[Slot]) -> Result<Vec<Statement>> {
        emit::emit_node(self, out, args)
    }
}

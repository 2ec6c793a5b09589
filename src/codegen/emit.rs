//! Node-level code emission

use log::trace;

use crate::error::{FormulaError, Result};
use crate::formula::{Formula, Op, Operation};

use super::{BinaryOp, ScalarExpr, Slot, Statement};

fn check_slots(node: &Formula, out: &Slot, args: &[Slot]) -> Result<()> {
    let op = node.string_id();
    let expected = match node.op() {
        Op::Var(_) => 1,
        _ => node.children().len(),
    };
    if args.len() != expected {
        return Err(FormulaError::ArgumentCount {
            op,
            expected,
            got: args.len(),
        });
    }
    if out.dim != node.dim() {
        return Err(FormulaError::mismatch(op, [out.dim, node.dim()]));
    }
    let arg_dims: Vec<usize> = match node.op() {
        Op::Var(v) => vec![v.dim()],
        _ => node.children().iter().map(Formula::dim).collect(),
    };
    for (slot, dim) in args.iter().zip(arg_dims) {
        if slot.dim != dim {
            return Err(FormulaError::mismatch(op, [slot.dim, dim]));
        }
    }
    Ok(())
}

/// Statements writing the value of `node` into `out`.
///
/// `args` holds one slot per child, already computed; a variable takes the
/// slot its input is bound to. Nothing but `out` is written.
pub fn emit_node(node: &Formula, out: &Slot, args: &[Slot]) -> Result<Vec<Statement>> {
    check_slots(node, out, args)?;
    trace!("emit {} into {}[{}]", node.string_id(), out.name, out.dim);

    let stmts = match node.op() {
        Op::Zero => (0..out.dim)
            .map(|k| Statement::assign(out.at(k), ScalarExpr::Lit(0.0)))
            .collect(),
        Op::IntCst(n) => vec![Statement::assign(out.at(0), ScalarExpr::Lit(f64::from(*n)))],
        Op::Var(_) => (0..out.dim)
            .map(|k| Statement::assign(out.at(k), args[0].at(k).into()))
            .collect(),
        Op::Broadcast => (0..out.dim)
            .map(|k| Statement::assign(out.at(k), args[0].at(0).into()))
            .collect(),
        Op::Sum => {
            let a = &args[0];
            let total = (1..a.dim).fold(ScalarExpr::from(a.at(0)), |acc, k| {
                ScalarExpr::binary(BinaryOp::Add, acc, a.at(k).into())
            });
            vec![Statement::assign(out.at(0), total)]
        }
        Op::Elementwise(e) => {
            let mut stmts = Vec::with_capacity(out.dim);
            for k in 0..out.dim {
                let operands: Vec<_> = args.iter().map(|s| s.read(k)).collect();
                stmts.extend(e.scalar_op(&out.at(k), &operands)?);
            }
            stmts
        }
    };
    Ok(stmts)
}

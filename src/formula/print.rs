//! Precedence-aware printing of formulas
//!
//! Printing is for debugging only; it is never executed. Lower precedence
//! numbers bind tighter, infix operators associate to the left. An operand
//! that starts with a sign is parenthesized after a prefix or infix symbol,
//! so `-(-x)` and `x - (-3)` never print as `--x` or `x - -3`.

use std::fmt;

use super::{Formula, Op, Operation};

/// Position of the operator symbol relative to its operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fixity {
    Prefix,
    /// Left-associative binary operator
    Infix,
    Postfix,
}

/// How an operator is printed: symbol, fixity and precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrintSpec {
    pub symbol: &'static str,
    pub fixity: Fixity,
    pub precedence: u8,
}

impl PrintSpec {
    pub const fn new(symbol: &'static str, fixity: Fixity, precedence: u8) -> Self {
        Self {
            symbol,
            fixity,
            precedence,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Precedence of a node when it appears as an operand. Atoms are 0.
fn binding(node: &Formula) -> u8 {
    match node.op() {
        Op::IntCst(n) if *n < 0 => 2,
        _ => node.print_spec().map(|s| s.precedence).unwrap_or(0),
    }
}

/// Negative literals and prefix operators print with a leading sign.
fn starts_with_sign(node: &Formula) -> bool {
    match node.op() {
        Op::IntCst(n) => *n < 0,
        _ => node
            .print_spec()
            .is_some_and(|s| s.fixity == Fixity::Prefix),
    }
}

fn needs_parens(child: &Formula, parent: &PrintSpec, side: Side) -> bool {
    let prec = binding(child);
    match (parent.fixity, side) {
        (Fixity::Infix, Side::Right) => prec >= parent.precedence || starts_with_sign(child),
        (Fixity::Prefix, _) => prec >= parent.precedence || starts_with_sign(child),
        _ => prec > parent.precedence,
    }
}

fn write_operand(
    f: &mut fmt::Formatter<'_>,
    child: &Formula,
    parent: &PrintSpec,
    side: Side,
) -> fmt::Result {
    if needs_parens(child, parent, side) {
        write!(f, "({child})")
    } else {
        write!(f, "{child}")
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op() {
            Op::Zero => return write!(f, "Zero({})", self.dim()),
            Op::Var(v) => return write!(f, "{v}"),
            Op::IntCst(n) => return write!(f, "{n}"),
            Op::Broadcast => {
                return write!(f, "{}({},{})", self.string_id(), self.children()[0], self.dim());
            }
            _ => {}
        }

        let children = self.children();
        match self.print_spec() {
            Some(spec) => match (spec.fixity, children) {
                (Fixity::Infix, [lhs, rhs]) => {
                    write_operand(f, lhs, &spec, Side::Left)?;
                    write!(f, " {} ", spec.symbol)?;
                    write_operand(f, rhs, &spec, Side::Right)
                }
                (Fixity::Prefix, [arg]) => {
                    f.write_str(spec.symbol)?;
                    write_operand(f, arg, &spec, Side::Left)
                }
                (Fixity::Postfix, [arg]) => {
                    write_operand(f, arg, &spec, Side::Left)?;
                    f.write_str(spec.symbol)
                }
                _ => write_call(f, self),
            },
            None => write_call(f, self),
        }
    }
}

fn write_call(f: &mut fmt::Formatter<'_>, node: &Formula) -> fmt::Result {
    write!(f, "{}(", node.string_id())?;
    let mut first = true;
    for child in node.children() {
        if !first {
            f.write_str(",")?;
        }
        write!(f, "{child}")?;
        first = false;
    }
    for p in node.params() {
        if !first {
            f.write_str(",")?;
        }
        write!(f, "{p}")?;
        first = false;
    }
    f.write_str(")")
}

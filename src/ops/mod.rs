//! Operator constructors
//!
//! Every constructor here simplifies: it returns the cheapest formula that is
//! semantically equal to the requested one (see the rule list on each
//! function). [`ElemOp::generic`] builds the raw node instead.

pub mod arithmetic;
pub mod elementwise;
pub mod math;
pub mod structural;
pub mod vectorized;

pub use arithmetic::{add, divide, minus, mult, subtract};
pub use elementwise::{ElemOp, OpInfo};
pub use math::{abs, cos, exp, inv, log, pow, relu, rsqrt, sign, sin, sqrt, square, step, xlogx};
pub use structural::{broadcast, int_cst, sum, zero};

//! symkern: symbolic formula core for fused reduction kernels
//!
//! Formulas are immutable trees of operators over dimensioned input
//! variables. They are simplified as they are built, differentiated
//! symbolically, and turned into straight-line scalar code that a kernel
//! generator splices into its reduction loop.
//!
//! # Architecture
//!
//! - **formula**: the node type, traversal and printing
//! - **ops**: simplifying constructors and the elementwise operator table
//! - **grad**: reverse-mode symbolic differentiation
//! - **codegen**: statement model, node emission and the C renderer
//! - **reduction**: accumulator code for the supported reductions
//! - **verify**: per-operator domains and reference functions for testing
//!
//! # Example
//!
//! ```ignore
//! use symkern::prelude::*;
//!
//! let x: Formula = Var::vi(0, 3)?.into();
//! let y: Formula = Var::vj(1, 3)?.into();
//! let f = subtract(&x, &y)?;
//! assert_eq!(f.to_string(), "Vi(0,3) - Vj(1,3)");
//! ```

// ============================================================================
// Core Modules
// ============================================================================

pub mod codegen;
pub mod error;
pub mod formula;
pub mod grad;
pub mod ops;
pub mod reduction;
pub mod simplify;
pub mod verify;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{FormulaError, Result};
pub use formula::{Category, Formula, Op, Operation, Var};
pub use grad::{grad, gradient, grads};
pub use simplify::simplify;

// ============================================================================
// Prelude
// ============================================================================

/// Prelude module with commonly used types and functions
pub mod prelude {
    pub use crate::codegen::{CRenderer, Precision, RenderConfig, Slot, Statement};
    pub use crate::error::{FormulaError, Result};
    pub use crate::formula::{Category, Formula, Operation, Var, post_order};
    pub use crate::grad::{grad, gradient, grads};
    pub use crate::ops::*;
    pub use crate::reduction::{Axis, Reduction};
    pub use crate::simplify::simplify;
}

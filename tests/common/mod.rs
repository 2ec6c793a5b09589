//! Test harness: runs emitted statements and checks them numerically.
#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;

use symkern::codegen::{BinaryOp, CFun, Elem, ScalarExpr, Slot, Statement};
use symkern::formula::{Category, Formula, Op, Operation, Var, post_order};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn rng() -> StdRng {
    StdRng::seed_from_u64(0x5eed)
}

// ============================================================================
// Interpreter
// ============================================================================

/// Memory the statements run against: one buffer per slot name.
#[derive(Debug, Default)]
pub struct Memory {
    buffers: FxHashMap<String, Vec<f64>>,
}

impl Memory {
    pub fn alloc(&mut self, slot: &Slot) {
        self.buffers
            .entry(slot.name.clone())
            .or_insert_with(|| vec![f64::NAN; slot.dim]);
    }

    pub fn set(&mut self, slot: &Slot, values: &[f64]) {
        assert_eq!(slot.dim, values.len(), "slot {}", slot.name);
        self.buffers.insert(slot.name.clone(), values.to_vec());
    }

    pub fn get(&self, slot: &Slot) -> &[f64] {
        &self.buffers[&slot.name]
    }

    fn load(&self, e: &Elem) -> f64 {
        self.buffers[&e.slot][e.index]
    }

    fn store(&mut self, e: &Elem, v: f64) {
        let buf = self
            .buffers
            .get_mut(&e.slot)
            .unwrap_or_else(|| panic!("unallocated slot {}", e.slot));
        buf[e.index] = v;
    }

    pub fn eval(&self, expr: &ScalarExpr) -> f64 {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        match expr {
            ScalarExpr::Elem(e) => self.load(e),
            ScalarExpr::Lit(v) => *v,
            ScalarExpr::Neg(a) => -self.eval(a),
            ScalarExpr::Binary(op, a, b) => {
                let (a, b) = (self.eval(a), self.eval(b));
                match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Lt => flag(a < b),
                    BinaryOp::Gt => flag(a > b),
                    BinaryOp::Eq => flag(a == b),
                }
            }
            ScalarExpr::Call(f, args) => {
                let a = self.eval(&args[0]);
                match f {
                    CFun::Pow => a.powf(self.eval(&args[1])),
                    CFun::Exp => a.exp(),
                    CFun::Log => a.ln(),
                    CFun::Sin => a.sin(),
                    CFun::Cos => a.cos(),
                    CFun::Sqrt => a.sqrt(),
                    CFun::Fabs => a.abs(),
                }
            }
            ScalarExpr::Select {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond) != 0.0 {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
        }
    }

    pub fn run(&mut self, stmts: &[Statement]) {
        for st in stmts {
            match st {
                Statement::Assign { out, value } => {
                    let v = self.eval(value);
                    self.store(out, v);
                }
                Statement::If {
                    cond,
                    then,
                    otherwise,
                } => {
                    if self.eval(cond) != 0.0 {
                        self.run(then);
                    } else {
                        self.run(otherwise);
                    }
                }
            }
        }
    }
}

// ============================================================================
// Formula evaluation through emission
// ============================================================================

pub type Inputs = FxHashMap<Var, Vec<f64>>;

pub fn input_slot(v: &Var) -> Slot {
    let cat = match v.category() {
        Category::I => "i",
        Category::J => "j",
        Category::Param => "p",
    };
    Slot::new(format!("in_{cat}{}", v.index()), v.dim())
}

/// Values of `f`, computed by emitting every node in dependency order and
/// running the statements.
pub fn evaluate(f: &Formula, inputs: &Inputs) -> Vec<f64> {
    let mut mem = Memory::default();
    for (v, values) in inputs {
        mem.set(&input_slot(v), values);
    }

    let order = post_order(std::slice::from_ref(f));
    let mut slots: FxHashMap<usize, Slot> = FxHashMap::default();
    for (i, node) in order.iter().enumerate() {
        let out = Slot::new(format!("t{i}"), node.dim());
        let args: Vec<Slot> = match node.op() {
            Op::Var(v) => vec![input_slot(v)],
            _ => node
                .children()
                .iter()
                .map(|c| slots[&c.addr()].clone())
                .collect(),
        };
        let stmts = node.emit(&out, &args).expect("emission failed");
        mem.alloc(&out);
        mem.run(&stmts);
        slots.insert(node.addr(), out);
    }
    mem.get(&slots[&f.addr()]).to_vec()
}

// ============================================================================
// Numeric checks
// ============================================================================

pub fn assert_close(got: f64, expected: f64, tol: f64, context: &str) {
    let scale = 1f64.max(got.abs()).max(expected.abs());
    assert!(
        (got - expected).abs() <= tol * scale,
        "{context}: got {got}, expected {expected}"
    );
}

/// Uniform sample from the inner 90% of `(low, high)`, away from the ends so
/// that finite differences stay inside the domain.
pub fn sample(rng: &mut StdRng, (low, high): (f64, f64)) -> f64 {
    let margin = 0.05 * (high - low);
    rng.gen_range(low + margin..high - margin)
}

/// Central difference of `fun` at `x` along coordinate `i`.
pub fn finite_difference(fun: impl Fn(&[f64]) -> f64, x: &[f64], i: usize) -> f64 {
    let h = 1e-6 * 1f64.max(x[i].abs());
    let mut plus = x.to_vec();
    let mut minus = x.to_vec();
    plus[i] += h;
    minus[i] -= h;
    (fun(&plus) - fun(&minus)) / (2.0 * h)
}

//! 検証用メタデータ
//!
//! 各要素演算子の型に付随する読み取り専用の記録。コンパイルには一切関与せず、
//! テストハーネスが入力のサンプリング範囲と独立した参照実装を得るためだけに使う。

use std::fmt;

use crate::error::{FormulaError, Result};
use crate::ops::ElemOp;

/// 参照実装 `(inputs, params) -> value`
pub type ReferenceFn = fn(&[f64], &[i32]) -> f64;

/// 範囲が宣言されていないオペランドのサンプリング範囲
pub const DEFAULT_RANGE: (f64, f64) = (-2.0, 2.0);

/// 演算子型ごとの検証記録
#[derive(Clone, Copy)]
pub struct Verification {
    /// オペランドごとの定義域。足りない分は [`DEFAULT_RANGE`]
    pub ranges: &'static [(f64, f64)],
    pub reference: ReferenceFn,
    pub description: &'static str,
}

impl fmt::Debug for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verification")
            .field("ranges", &self.ranges)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl Verification {
    /// オペランド `i` の定義域
    pub fn range(&self, i: usize) -> (f64, f64) {
        self.ranges.get(i).copied().unwrap_or(DEFAULT_RANGE)
    }

    /// 全ての入力が定義域内にあるか確認する
    pub fn check_domain(&self, op: &'static str, inputs: &[f64]) -> Result<()> {
        for (operand, &value) in inputs.iter().enumerate() {
            let (low, high) = self.range(operand);
            if !(low..=high).contains(&value) {
                return Err(FormulaError::DomainViolation {
                    op,
                    operand,
                    value,
                    low,
                    high,
                });
            }
        }
        Ok(())
    }

    /// 引数の数と定義域を確認してから `op` の参照実装を評価する
    ///
    /// パラメータは `op` 自身から取る（`Pow(m)` なら `[m]`）。
    pub fn evaluate(&self, op: ElemOp, inputs: &[f64]) -> Result<f64> {
        op.check_arity(inputs.len())?;
        self.check_domain(op.info().string_id, inputs)?;
        Ok((self.reference)(inputs, &op.params()))
    }
}

impl ElemOp {
    /// 参照実装で `self(inputs)` を評価する
    pub fn reference(&self, inputs: &[f64]) -> Option<Result<f64>> {
        self.info()
            .verification
            .as_ref()
            .map(|v| v.evaluate(*self, inputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ElemOp::Subtract, &[1.5, 0.25], 1.25)]
    #[case(ElemOp::XLogX, &[1.0], 0.0)]
    #[case(ElemOp::XLogX, &[0.0], 0.0)]
    #[case(ElemOp::Pow(-2), &[2.0], 0.25)]
    #[case(ElemOp::Step, &[0.0], 1.0)]
    #[case(ElemOp::Sign, &[-0.5], -1.0)]
    fn test_reference_values(#[case] op: ElemOp, #[case] inputs: &[f64], #[case] expected: f64) {
        let got = op.reference(inputs).unwrap().unwrap();
        assert!((got - expected).abs() < 1e-12, "{got} != {expected}");
    }

    #[rstest]
    #[case(ElemOp::Add, &[1.0], 2)]
    #[case(ElemOp::Add, &[], 2)]
    #[case(ElemOp::Exp, &[0.5, 0.5], 1)]
    #[case(ElemOp::Pow(3), &[], 1)]
    fn test_reference_argument_count(
        #[case] op: ElemOp,
        #[case] inputs: &[f64],
        #[case] expected: usize,
    ) {
        assert_eq!(
            op.reference(inputs),
            Some(Err(FormulaError::ArgumentCount {
                op: op.info().string_id,
                expected,
                got: inputs.len()
            }))
        );
    }

    #[test]
    fn test_default_range() {
        let v = ElemOp::Divide.info().verification.unwrap();
        assert_eq!(v.range(0), (-2.0, 2.0));
        assert_eq!(v.range(1), (0.5, 2.0));
        assert_eq!(ElemOp::Add.info().verification.unwrap().range(1), DEFAULT_RANGE);
    }

    #[test]
    fn test_domain_violation() {
        assert_eq!(
            ElemOp::Log.reference(&[-1.0]),
            Some(Err(FormulaError::DomainViolation {
                op: "Log",
                operand: 0,
                value: -1.0,
                low: 0.1,
                high: 4.0
            }))
        );
    }
}

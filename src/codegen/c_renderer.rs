//! C レンダラー
//!
//! 文 (Statement) の木を C のソースに変換する。二項演算は常に括弧で囲む。

use log::debug;
use typed_builder::TypedBuilder;

use super::{CFun, Elem, ScalarExpr, Statement};

/// 浮動小数点の精度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    /// `float`、リテラルに `f` を付け、`expf` などを使う
    #[default]
    F32,
    /// `double`
    F64,
}

/// レンダラーの設定
///
/// ```ignore
/// let renderer = RenderConfig::builder()
///     .precision(Precision::F64)
///     .indent(1)
///     .build();
/// ```
#[derive(Debug, Clone, TypedBuilder)]
#[builder(build_method(into = CRenderer))]
pub struct RenderConfig {
    /// 精度（デフォルト: F32）
    #[builder(default)]
    pub precision: Precision,
    /// 開始インデントレベル（デフォルト: 0）
    #[builder(default)]
    pub indent: usize,
    /// 1 レベル分のインデント（デフォルト: 空白 2 つ）
    #[builder(default = String::from("  "))]
    pub indent_str: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            precision: Precision::F32,
            indent: 0,
            indent_str: String::from("  "),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CRenderer {
    config: RenderConfig,
}

impl From<RenderConfig> for CRenderer {
    fn from(config: RenderConfig) -> Self {
        Self { config }
    }
}

impl CRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 文の列を描画する
    pub fn render(&self, stmts: &[Statement]) -> String {
        let mut code = String::new();
        for st in stmts {
            self.render_statement(st, self.config.indent, &mut code);
        }
        debug!("\n--- Rendered C code ---\n{code}-----------------------");
        code
    }

    fn indent(&self, level: usize) -> String {
        self.config.indent_str.repeat(level)
    }

    fn render_statement(&self, st: &Statement, level: usize, code: &mut String) {
        let pad = self.indent(level);
        match st {
            Statement::Assign { out, value } => {
                code.push_str(&format!(
                    "{pad}{} = {};\n",
                    self.render_elem(out),
                    self.render_expr(value)
                ));
            }
            Statement::If {
                cond,
                then,
                otherwise,
            } => {
                code.push_str(&format!("{pad}if ({}) {{\n", self.render_expr(cond)));
                for s in then {
                    self.render_statement(s, level + 1, code);
                }
                if otherwise.is_empty() {
                    code.push_str(&format!("{pad}}}\n"));
                } else {
                    code.push_str(&format!("{pad}}} else {{\n"));
                    for s in otherwise {
                        self.render_statement(s, level + 1, code);
                    }
                    code.push_str(&format!("{pad}}}\n"));
                }
            }
        }
    }

    fn render_elem(&self, e: &Elem) -> String {
        format!("{}[{}]", e.slot, e.index)
    }

    /// リテラルを描画
    pub fn render_literal(&self, v: f64) -> String {
        if v.is_nan() {
            return "NAN".to_string();
        }
        if v.is_infinite() {
            return if v > 0.0 { "INFINITY" } else { "(-INFINITY)" }.to_string();
        }
        let s = format!("{v}");
        // 小数点が含まれていない場合は .0 を追加（1 → 1.0f）
        let s = if !s.contains('.') && !s.contains('e') && !s.contains('E') {
            format!("{s}.0")
        } else {
            s
        };
        match self.config.precision {
            Precision::F32 => format!("{s}f"),
            Precision::F64 => s,
        }
    }

    fn render_fun(&self, f: CFun) -> String {
        match self.config.precision {
            Precision::F32 => format!("{}f", f.name()),
            Precision::F64 => f.name().to_string(),
        }
    }

    /// 式を描画
    pub fn render_expr(&self, expr: &ScalarExpr) -> String {
        match expr {
            ScalarExpr::Elem(e) => self.render_elem(e),
            ScalarExpr::Lit(v) => self.render_literal(*v),
            ScalarExpr::Neg(a) => format!("(-{})", self.render_expr(a)),
            ScalarExpr::Binary(op, a, b) => format!(
                "({} {} {})",
                self.render_expr(a),
                op.symbol(),
                self.render_expr(b)
            ),
            ScalarExpr::Call(f, args) => {
                let args: Vec<String> = args.iter().map(|a| self.render_expr(a)).collect();
                format!("{}({})", self.render_fun(*f), args.join(", "))
            }
            ScalarExpr::Select {
                cond,
                then,
                otherwise,
            } => format!(
                "({} ? {} : {})",
                self.render_expr(cond),
                self.render_expr(then),
                self.render_expr(otherwise)
            ),
        }
    }
}

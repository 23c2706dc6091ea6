//! Expression lowering to SMT-LIB v2 terms.
//!
//! Terms are lowered with an explicit sort context: comparisons, logical
//! connectives, and truth leaves are boolean-natured; everything else is a
//! bitvector. A boolean sub-term embedded in a bitvector context is lifted
//! via `ite(cond, (_ bv1 W), (_ bv0 W))`; equality and not-equality apply
//! the lift to both sides uniformly. A bitvector term in a boolean context
//! becomes a nonzero test.
//!
//! In flat array mode, nested `select` chains collapse to a single select
//! over the concatenation of the index levels; this rewrite happens here,
//! not in the expression tree.

use gametime_core::{AnalysisConfig, ArrayMode, Expr, Op};

use crate::error::SmtError;

/// Renders a name as an SMT symbol, quoting it when it falls outside the
/// simple-symbol grammar (version tags, call-site markers).
pub(crate) fn sym(name: &str) -> String {
    let simple = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if simple {
        name.to_string()
    } else {
        format!("|{name}|")
    }
}

/// `(_ bvN W)` for non-negative N, `(bvneg (_ bvN W))` for negatives.
fn bv_const(value: i128, bits: u32) -> String {
    if value < 0 {
        format!("(bvneg (_ bv{} {bits}))", -value)
    } else {
        format!("(_ bv{value} {bits})")
    }
}

/// Lowers expressions within one query.
pub(crate) struct Lowerer<'a> {
    pub config: &'a AnalysisConfig,
}

impl<'a> Lowerer<'a> {
    /// Lowers `e` in a boolean context.
    pub fn bool_term(&self, e: &Expr) -> Result<String, SmtError> {
        match e.op() {
            Op::True => Ok("true".into()),
            Op::False => Ok("false".into()),
            Op::And => Ok(format!(
                "(and {} {})",
                self.bool_term(e.get_parameter(0))?,
                self.bool_term(e.get_parameter(1))?
            )),
            Op::Or => Ok(format!(
                "(or {} {})",
                self.bool_term(e.get_parameter(0))?,
                self.bool_term(e.get_parameter(1))?
            )),
            Op::Not => Ok(format!("(not {})", self.bool_term(e.get_parameter(0))?)),
            Op::Implies => Ok(format!(
                "(=> {} {})",
                self.bool_term(e.get_parameter(0))?,
                self.bool_term(e.get_parameter(1))?
            )),
            Op::Iff => Ok(format!(
                "(= {} {})",
                self.bool_term(e.get_parameter(0))?,
                self.bool_term(e.get_parameter(1))?
            )),
            Op::Eq | Op::FEq => Ok(format!(
                "(= {} {})",
                self.bv_term(e.get_parameter(0))?,
                self.bv_term(e.get_parameter(1))?
            )),
            Op::Ne | Op::FNe => Ok(format!(
                "(not (= {} {}))",
                self.bv_term(e.get_parameter(0))?,
                self.bv_term(e.get_parameter(1))?
            )),
            op if op.is_comparison() => {
                let mnemonic = match op {
                    Op::SLt | Op::FLt => "bvslt",
                    Op::SLe | Op::FLe => "bvsle",
                    Op::SGt | Op::FGt => "bvsgt",
                    Op::SGe | Op::FGe => "bvsge",
                    Op::ULt => "bvult",
                    Op::ULe => "bvule",
                    Op::UGt => "bvugt",
                    Op::UGe => "bvuge",
                    _ => unreachable!("equality handled above"),
                };
                Ok(format!(
                    "({mnemonic} {} {})",
                    self.bv_term(e.get_parameter(0))?,
                    self.bv_term(e.get_parameter(1))?
                ))
            }
            // A bitvector term in a boolean position holds when nonzero.
            _ => Ok(format!(
                "(not (= {} {}))",
                self.bv_term(e)?,
                bv_const(0, e.bits())
            )),
        }
    }

    /// Lowers `e` in a bitvector context.
    pub fn bv_term(&self, e: &Expr) -> Result<String, SmtError> {
        if e.op().yields_boolean() {
            // Boolean sub-term embedded in a bitvector context.
            let cond = self.bool_term(e)?;
            return Ok(format!(
                "(ite {cond} {} {})",
                bv_const(1, e.bits()),
                bv_const(0, e.bits())
            ));
        }
        let binary = |mnemonic: &str| -> Result<String, SmtError> {
            Ok(format!(
                "({mnemonic} {} {})",
                self.bv_term(e.get_parameter(0))?,
                self.bv_term(e.get_parameter(1))?
            ))
        };
        match e.op() {
            Op::Constant => Ok(bv_const(
                e.const_value().unwrap_or_default(),
                e.bits(),
            )),
            Op::Variable | Op::ArrayVariable => Ok(sym(e.value())),
            Op::Add => binary("bvadd"),
            Op::Sub => binary("bvsub"),
            Op::Mul => binary("bvmul"),
            Op::SDiv => binary("bvsdiv"),
            Op::UDiv => binary("bvudiv"),
            // Remainder mirrors the source and lowers to bvsmod even for
            // operands that may be unsigned.
            Op::Rem => binary("bvsmod"),
            Op::BitAnd => binary("bvand"),
            Op::BitOr => binary("bvor"),
            Op::BitXor => binary("bvxor"),
            Op::Shl => binary("bvshl"),
            Op::AShr => binary("bvashr"),
            Op::LShr => binary("bvlshr"),
            Op::Concat => binary("concat"),
            Op::Negate => Ok(format!("(bvneg {})", self.bv_term(e.get_parameter(0))?)),
            Op::BitComplement => Ok(format!("(bvnot {})", self.bv_term(e.get_parameter(0))?)),
            Op::ZeroExtend => {
                let k = e.get_parameter(1).const_value().unwrap_or_default();
                Ok(format!(
                    "((_ zero_extend {k}) {})",
                    self.bv_term(e.get_parameter(0))?
                ))
            }
            Op::SignExtend => {
                let k = e.get_parameter(1).const_value().unwrap_or_default();
                Ok(format!(
                    "((_ sign_extend {k}) {})",
                    self.bv_term(e.get_parameter(0))?
                ))
            }
            Op::BitExtract => {
                let lo = e.get_parameter(1).const_value().unwrap_or_default();
                let hi = e.get_parameter(2).const_value().unwrap_or_default();
                Ok(format!(
                    "((_ extract {hi} {lo}) {})",
                    self.bv_term(e.get_parameter(0))?
                ))
            }
            Op::Ite => Ok(format!(
                "(ite {} {} {})",
                self.bool_term(e.get_parameter(0))?,
                self.bv_term(e.get_parameter(1))?,
                self.bv_term(e.get_parameter(2))?
            )),
            Op::Select => self.lower_select(e),
            Op::Store => Ok(format!(
                "(store {} {} {})",
                self.bv_term(e.get_parameter(0))?,
                self.bv_term(e.get_parameter(1))?,
                self.bv_term(e.get_parameter(2))?
            )),
            op => Err(SmtError::UnsupportedOp { op }),
        }
    }

    /// `select`, collapsing nested index levels into one concatenated
    /// index in flat mode.
    fn lower_select(&self, e: &Expr) -> Result<String, SmtError> {
        if self.config.array_mode == ArrayMode::Flat {
            let mut indices = Vec::new();
            let mut cur = e;
            while cur.op() == Op::Select {
                indices.push(cur.get_parameter(1));
                cur = cur.get_parameter(0);
            }
            indices.reverse();
            if indices.len() > 1 {
                let mut index = self.bv_term(indices[0])?;
                for next in &indices[1..] {
                    index = format!("(concat {index} {})", self.bv_term(next)?);
                }
                return Ok(format!("(select {} {index})", self.bv_term(cur)?));
            }
        }
        Ok(format!(
            "(select {} {})",
            self.bv_term(e.get_parameter(0))?,
            self.bv_term(e.get_parameter(1))?
        ))
    }
}

//! QF_AUFBV query emission.
//!
//! The query declares every free bitvector and array variable, then one
//! boolean constant per condition asserted equal to the lowered condition,
//! then the conjunction of all constraint booleans, `(check-sat)`, and
//! `(exit)`. Keeping each condition behind its own boolean permits
//! unsat-core extraction by the caller.

use std::fmt::Write;

use gametime_analyze::Path;
use gametime_core::{AnalysisConfig, ArrayMode};

use crate::error::SmtError;
use crate::lower::{sym, Lowerer};

/// The array sort for the given dimensions: nested `(Array idx ...)` per
/// level, or a single sort over the concatenation of the index widths.
fn array_sort(dims: &[u32], mode: ArrayMode) -> String {
    let element = *dims.last().expect("dimensions always end with the element width");
    let indices = &dims[..dims.len() - 1];
    match mode {
        ArrayMode::Nested => {
            let mut sort = format!("(_ BitVec {element})");
            for width in indices.iter().rev() {
                sort = format!("(Array (_ BitVec {width}) {sort})");
            }
            sort
        }
        ArrayMode::Flat => {
            let total: u32 = indices.iter().sum();
            format!("(Array (_ BitVec {total}) (_ BitVec {element}))")
        }
    }
}

/// Serializes an analyzed path to a complete SMT-LIB v2 query string.
pub fn generate_query(path: &Path, config: &AnalysisConfig) -> Result<String, SmtError> {
    let mut out = String::new();
    writeln!(out, "(set-logic QF_AUFBV)").expect("string write");

    for variable in path.variables() {
        writeln!(
            out,
            "(declare-fun {} () (_ BitVec {}))",
            sym(variable.value()),
            variable.bits()
        )
        .expect("string write");
    }
    for array in path.array_variables() {
        let original = array.value().split('<').next().unwrap_or(array.value());
        let dims = path
            .array_dimensions()
            .get(original)
            .ok_or_else(|| SmtError::UnknownDimensions {
                name: original.to_string(),
            })?;
        writeln!(
            out,
            "(declare-fun {} () {})",
            sym(array.value()),
            array_sort(dims, config.array_mode)
        )
        .expect("string write");
    }

    let names: Vec<String> = (0..path.conditions().len())
        .map(|k| format!("{}{k}", config.constraint_prefix))
        .collect();
    for name in &names {
        writeln!(out, "(declare-fun {name} () Bool)").expect("string write");
    }
    let lowerer = Lowerer { config };
    for (name, cond) in names.iter().zip(path.conditions()) {
        writeln!(out, "(assert (= {name} {}))", lowerer.bool_term(&cond.expr)?)
            .expect("string write");
    }

    writeln!(out, "(assert (and {}))", names.join(" ")).expect("string write");
    writeln!(out, "(check-sat)").expect("string write");
    writeln!(out, "(exit)").expect("string write");
    Ok(out)
}

//! Dereferencing functions and pointer offset arithmetic.
//!
//! A pointer is modeled as a Church-encoded function literal, one arity-2
//! layer per index level: applying a layer with `(index, extra bit offset)`
//! peels one array level and accumulates the offset. Offsetting a pointer
//! substitutes fresh formals into the body, splitting the bit offset into
//! an array index part (`offset / referent_bits`) and a remainder part
//! (`offset % referent_bits`); the division-over-multiplication rewrite in
//! the simplifier is what turns scaled offsets back into plain indices.

use gametime_core::{AnalysisConfig, CType, Expr, Op};

use crate::error::AnalyzeError;
use crate::helpers::aggregates;
use crate::path::Path;
use crate::simplify::simplify;

/// What a dereference resolves aggregate offsets into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerefMode {
    /// Decompose into per-field array accesses.
    FieldAccess,
    /// The aggregate is aliased, not field-accessed; keep the base.
    Alias,
}

/// Builds the dereferencing function for `base`, wrapping it in one
/// function layer per index level of `dims` (index widths plus the final
/// element width, as produced by [`super::arrays::dimensions_of`]).
///
/// Panics when `dims` describes no index level: dereferencing a
/// non-pointer expression is a programmer error.
pub(crate) fn dereferencing_function(
    base: &Expr,
    dims: &[u32],
    path: &mut Path,
    config: &AnalysisConfig,
) -> Expr {
    assert!(
        dims.len() >= 2,
        "dereferencing a non-pointer expression '{base}'"
    );
    let levels = dims.len() - 1;
    let element_bits = dims[levels];

    let formals: Vec<(Expr, Expr)> = (0..levels)
        .map(|_| {
            let index = Expr::variable(path.fresh_temp_var(config), config.word_bits);
            let offset = Expr::variable(path.fresh_temp_var(config), config.word_bits);
            (index, offset)
        })
        .collect();

    let mut core = base.clone();
    for (index, _) in &formals {
        core = Expr::array_access(core, index.clone(), element_bits);
    }
    let mut offset = formals[0].1.clone();
    for (_, o) in &formals[1..] {
        offset = Expr::binary(Op::Add, offset, o.clone());
    }

    let mut f = Expr::offset(core, offset);
    for (index, off) in formals.into_iter().rev() {
        f = Expr::function(vec![index, off], f);
    }
    f
}

/// Applies the outermost layer of a dereferencing function.
pub(crate) fn apply(f: &Expr, index: &Expr, offset: &Expr) -> Expr {
    assert!(
        f.op() == Op::Function && f.children().len() == 3,
        "applying a non-dereferencing expression '{f}'"
    );
    let body = f.get_parameter(2);
    body.replace(f.get_parameter(0), index)
        .replace(f.get_parameter(1), offset)
}

/// Rewrites the formals of a dereferencing function so that every later
/// application sees `offset_bits` added: the offset splits into an index
/// step and a remainder, each added to the corresponding formal.
pub(crate) fn add_offset_to_pointer(
    f: &Expr,
    offset_bits: &Expr,
    referent_bits: u64,
    path: &mut Path,
    config: &AnalysisConfig,
) -> Expr {
    assert!(
        f.op() == Op::Function && f.children().len() == 3,
        "offsetting a non-dereferencing expression '{f}'"
    );
    let index = f.get_parameter(0).clone();
    let offset = f.get_parameter(1).clone();
    let body = f.get_parameter(2).clone();

    let referent = Expr::constant(referent_bits as i128, offset_bits.bits());
    let index_step = simplify(&Expr::binary(Op::SDiv, offset_bits.clone(), referent.clone()));
    let remainder = simplify(&Expr::binary(Op::Rem, offset_bits.clone(), referent));

    let new_index = Expr::variable(path.fresh_temp_var(config), index.bits());
    let new_offset = Expr::variable(path.fresh_temp_var(config), offset.bits());

    let body = body
        .replace(&index, &Expr::binary(Op::Add, new_index.clone(), index_step))
        .replace(&offset, &Expr::binary(Op::Add, new_offset.clone(), remainder));
    Expr::function(vec![new_index, new_offset], simplify(&body))
}

/// Dereferences a pointer: applies its function with `(0, 0)` and resolves
/// the resulting `Offset` nodes (aggregate field decomposition or alias
/// passthrough).
pub(crate) fn dereference(
    f: &Expr,
    mode: DerefMode,
    access_bits: u32,
    access_ty: &CType,
    path: &mut Path,
    config: &AnalysisConfig,
) -> Result<Expr, AnalyzeError> {
    let zero = Expr::constant(0, config.word_bits);
    let applied = simplify(&apply(f, &zero, &zero));
    if applied.op() == Op::Function {
        // A partially applied multi-level pointer is still a pointer.
        return Ok(applied);
    }
    aggregates::resolve_offsets(&applied, mode, access_bits, access_ty, path, config)
}

/// Splits the two sides of a pointer addition into `(augend, addend)`.
/// The pointer side is recognized as a function literal, an array
/// variable, or a pointer-typed expression; when neither side qualifies
/// the operand order is kept.
pub(crate) fn get_augend_and_addend(lhs: &Expr, rhs: &Expr) -> (Expr, Expr) {
    let pointerish = |t: &Expr| {
        t.op() == Op::Function
            || t.is_array_variable()
            || t.ctype().map(|c| c.is_indexable()).unwrap_or(false)
    };
    if !pointerish(lhs) && pointerish(rhs) {
        (rhs.clone(), lhs.clone())
    } else {
        (lhs.clone(), rhs.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gametime_core::BlockId;

    fn setup() -> (Path, AnalysisConfig) {
        (Path::new(vec![BlockId(0)]), AnalysisConfig::default())
    }

    fn int_array(name: &str, len: u64) -> Expr {
        Expr::array_variable(name, 32).with_ctype(CType::array_of(CType::int32(), len))
    }

    #[test]
    fn single_level_function_shape() {
        let (mut path, cfg) = setup();
        let f = dereferencing_function(&int_array("a", 8), &[32, 32], &mut path, &cfg);

        assert_eq!(f.op(), Op::Function);
        assert_eq!(f.children().len(), 3);
        // Body is (a[i] . o).
        let body = f.get_parameter(2);
        assert_eq!(body.op(), Op::Offset);
        assert_eq!(body.get_parameter(0).op(), Op::Array);
    }

    #[test]
    fn apply_with_zero_reaches_element_zero() {
        let (mut path, cfg) = setup();
        let f = dereferencing_function(&int_array("a", 8), &[32, 32], &mut path, &cfg);
        let zero = Expr::constant(0, 32);
        let applied = simplify(&apply(&f, &zero, &zero));
        // (a[0] . 0); the offset resolution strips the zero offset later.
        assert_eq!(applied.value(), "(a[0] . 0)");
    }

    #[test]
    fn offsetting_recovers_the_index_from_a_scaled_offset() {
        let (mut path, cfg) = setup();
        let f = dereferencing_function(&int_array("a", 8), &[32, 32], &mut path, &cfg);

        // Offset by i * 32 bits over 32-bit elements: index advances by i.
        let scaled = Expr::binary(
            Op::Mul,
            Expr::variable("i", 32),
            Expr::constant(32, 32),
        );
        let shifted = add_offset_to_pointer(&f, &scaled, 32, &mut path, &cfg);

        let zero = Expr::constant(0, 32);
        let applied = simplify(&apply(&shifted, &zero, &zero));
        assert_eq!(applied.value(), "(a[i] . 0)");
    }

    #[test]
    fn constant_offset_splits_into_index_and_remainder() {
        let (mut path, cfg) = setup();
        let f = dereferencing_function(&int_array("a", 4), &[32, 32], &mut path, &cfg);

        // 40 bits over 32-bit elements: one element plus 8 bits.
        let shifted =
            add_offset_to_pointer(&f, &Expr::constant(40, 32), 32, &mut path, &cfg);
        let zero = Expr::constant(0, 32);
        let applied = simplify(&apply(&shifted, &zero, &zero));
        assert_eq!(applied.value(), "(a[1] . 8)");
    }

    #[test]
    fn dereference_strips_zero_offsets() {
        let (mut path, cfg) = setup();
        let f = dereferencing_function(&int_array("a", 8), &[32, 32], &mut path, &cfg);
        let e = dereference(&f, DerefMode::FieldAccess, 32, &CType::int32(), &mut path, &cfg)
            .unwrap();
        assert_eq!(e.value(), "a[0]");
        assert_eq!(e.op(), Op::Array);
    }

    #[test]
    fn augend_selection_prefers_the_pointer_side() {
        let a = int_array("a", 8);
        let i = Expr::variable("i", 32);
        let (augend, addend) = get_augend_and_addend(&i, &a);
        assert_eq!(augend, a);
        assert_eq!(addend, i);
    }

    #[test]
    #[should_panic(expected = "non-dereferencing")]
    fn applying_a_non_function_panics() {
        let x = Expr::variable("x", 32);
        let zero = Expr::constant(0, 32);
        let _ = apply(&x, &zero, &zero);
    }
}

//! Array bookkeeping: dimension computation, temporary-index replacement,
//! access witnesses, `Array` to `Select` lowering, and nonzero-divisor
//! guards.

use indexmap::IndexSet;

use gametime_core::{AnalysisConfig, ArrayMode, BlockId, CType, Expr, Op};

use crate::path::Path;

/// Index widths for each level of a pointer/array type, followed by the
/// final element width. Unmanaged-array levels index with the machine word,
/// and pointer levels with the pointer width (also the machine word).
/// Aggregates collapse: an array of aggregates carries indices only, so
/// its element slot is the word width.
pub(crate) fn dimensions_of(ty: &CType, config: &AnalysisConfig) -> Vec<u32> {
    let mut dims = Vec::new();
    let mut t = ty;
    loop {
        match t {
            CType::UnmanagedArray { element, .. } => {
                dims.push(config.word_bits);
                t = element;
            }
            CType::Pointer { referent } => {
                dims.push(config.word_bits);
                t = referent;
            }
            _ => break,
        }
    }
    let element = match t {
        CType::Aggregate(_) => config.word_bits,
        other => other.bits(config.word_bits) as u32,
    };
    dims.push(element);
    dims
}

/// Records dimensions for every array variable referenced by a condition,
/// memoized by the variable's original name.
pub(crate) fn compute_dimensions(path: &mut Path, config: &AnalysisConfig) {
    let mut leaves = Vec::new();
    for cond in &path.conditions {
        cond.expr.leaf_variables(&mut leaves);
    }
    for leaf in leaves {
        if !leaf.is_array_variable() {
            continue;
        }
        let original = Path::original_name(leaf.value()).to_string();
        if path.array_dimensions.contains_key(&original) {
            continue;
        }
        let dims = leaf
            .ctype()
            .map(|t| dimensions_of(t, config))
            .filter(|d| d.len() >= 2)
            .unwrap_or_else(|| vec![config.word_bits, leaf.bits()]);
        path.array_dimensions.insert(original, dims);
    }
}

/// The base leaf and per-level index expressions of an access chain,
/// indices ordered outermost level first.
pub(crate) fn access_chain(e: &Expr) -> Option<(Expr, Vec<Expr>)> {
    let mut indices = Vec::new();
    let mut cur = e;
    while matches!(cur.op(), Op::Array | Op::Select) {
        indices.push(cur.get_parameter(1).clone());
        cur = cur.get_parameter(0);
    }
    if indices.is_empty() || !(cur.is_array_variable() || cur.is_variable()) {
        return None;
    }
    indices.reverse();
    Some((cur.clone(), indices))
}

// ---------------------------------------------------------------------------
// Temporary-index replacement
// ---------------------------------------------------------------------------

/// Replaces the index of every array/store access with a fresh temporary
/// index variable, appending its defining equality (and a bounds condition
/// when the indexed dimension has a fixed size). Flat-mode concatenated
/// indices are split along the concatenation boundary and each sub-index
/// replaced independently.
pub(crate) fn replace_indices(path: &mut Path, config: &AnalysisConfig) {
    let count = path.conditions.len();
    for ci in 0..count {
        let cond = path.conditions[ci].clone();
        let mut appended = Vec::new();
        let rewritten = rewrite_node(&cond.expr, path, config, &mut appended);
        path.conditions[ci].expr = rewritten;
        for expr in appended {
            path.push_condition(expr, cond.block);
        }
    }
}

fn rewrite_node(
    e: &Expr,
    path: &mut Path,
    config: &AnalysisConfig,
    appended: &mut Vec<Expr>,
) -> Expr {
    if e.is_leaf() {
        return e.clone();
    }
    let mut node = e.clone();
    for i in 0..e.children().len() {
        node = node.update_parameter(i, rewrite_node(e.get_parameter(i), path, config, appended));
    }
    if !matches!(node.op(), Op::Array | Op::Store) {
        return node;
    }
    let index = node.get_parameter(1).clone();
    if is_temp_index(&index, config) {
        return node;
    }
    let bound = indexed_length(&node);
    let replacement = if config.array_mode == ArrayMode::Flat && index.op() == Op::Concat {
        let hi = replace_single(index.get_parameter(0), None, path, config, appended);
        let lo = replace_single(index.get_parameter(1), None, path, config, appended);
        Expr::concat(hi, lo)
    } else {
        replace_single(&index, bound, path, config, appended)
    };
    node.update_parameter(1, replacement)
}

fn replace_single(
    index: &Expr,
    bound: Option<u64>,
    path: &mut Path,
    config: &AnalysisConfig,
    appended: &mut Vec<Expr>,
) -> Expr {
    if is_temp_index(index, config) {
        return index.clone();
    }
    let (number, name) = path.fresh_temp_index(config);
    let temp = Expr::variable(name, index.bits());
    path.temp_index_exprs.insert(number, index.clone());
    appended.push(Expr::compare(
        Op::Eq,
        temp.clone(),
        index.clone(),
        config.word_bits,
    ));
    if let Some(n) = bound {
        let zero = Expr::constant(0, temp.bits());
        let len = Expr::constant(n as i128, temp.bits());
        let lower = Expr::compare(Op::SLe, zero, temp.clone(), config.word_bits);
        let upper = Expr::compare(Op::SLt, temp.clone(), len, config.word_bits);
        appended.push(Expr::binary(Op::And, lower, upper));
    }
    temp
}

pub(crate) fn is_temp_index(e: &Expr, config: &AnalysisConfig) -> bool {
    e.is_variable() && e.value().starts_with(&config.temp_index_prefix)
}

/// Fixed size of the dimension an access indexes, from the base leaf's
/// declared type. `None` for pointers and arrays of unknown extent.
fn indexed_length(node: &Expr) -> Option<u64> {
    let mut depth = 0usize;
    let mut cur = node.get_parameter(0);
    while matches!(cur.op(), Op::Array | Op::Select) {
        depth += 1;
        cur = cur.get_parameter(0);
    }
    let mut ty = cur.ctype()?.clone();
    for _ in 0..depth {
        ty = ty.indexed()?.clone();
    }
    ty.array_length()
}

// ---------------------------------------------------------------------------
// Access witnesses
// ---------------------------------------------------------------------------

/// Records `(array variable, temporary index numbers)` for every access
/// present in the conditions, in condition order.
pub(crate) fn record_array_accesses(path: &mut Path, config: &AnalysisConfig) {
    let mut found = Vec::new();
    for cond in &path.conditions {
        collect_accesses(&cond.expr, config, &mut found);
    }
    path.array_accesses.extend(found);
}

fn collect_accesses(e: &Expr, config: &AnalysisConfig, out: &mut Vec<(Expr, Vec<u32>)>) {
    match e.op() {
        Op::Array | Op::Select => {
            if let Some((base, indices)) = access_chain(e) {
                let numbers: Vec<u32> = indices
                    .iter()
                    .flat_map(|i| temp_numbers(i, config))
                    .collect();
                if !numbers.is_empty() {
                    out.push((base, numbers));
                }
                for index in &indices {
                    collect_accesses(index, config, out);
                }
                return;
            }
        }
        Op::Store => {
            let mut base = e.get_parameter(0);
            while matches!(base.op(), Op::Array | Op::Select | Op::Store) {
                base = base.get_parameter(0);
            }
            let numbers = temp_numbers(e.get_parameter(1), config);
            if (base.is_array_variable() || base.is_variable()) && !numbers.is_empty() {
                out.push((base.clone(), numbers));
            }
            collect_accesses(e.get_parameter(1), config, out);
            collect_accesses(e.get_parameter(2), config, out);
            return;
        }
        _ => {}
    }
    for child in e.children() {
        collect_accesses(child, config, out);
    }
}

/// Temporary-index numbers inside an index expression: a bare temporary,
/// or a flat-mode concatenation of temporaries.
fn temp_numbers(index: &Expr, config: &AnalysisConfig) -> Vec<u32> {
    if is_temp_index(index, config) {
        return index
            .value()
            .strip_prefix(&config.temp_index_prefix)
            .and_then(|s| s.parse().ok())
            .into_iter()
            .collect();
    }
    if index.op() == Op::Concat {
        let mut out = temp_numbers(index.get_parameter(0), config);
        out.extend(temp_numbers(index.get_parameter(1), config));
        return out;
    }
    Vec::new()
}

// ---------------------------------------------------------------------------
// Select lowering and divisor guards
// ---------------------------------------------------------------------------

/// Lowers every `Array` access node to a theory-of-arrays `Select`.
pub(crate) fn lower_array_accesses(path: &mut Path) {
    for i in 0..path.conditions.len() {
        path.conditions[i].expr = to_select(&path.conditions[i].expr);
    }
}

fn to_select(e: &Expr) -> Expr {
    if e.is_leaf() {
        return e.clone();
    }
    if e.op() == Op::Array {
        return Expr::select(
            to_select(e.get_parameter(0)),
            to_select(e.get_parameter(1)),
            e.bits(),
        );
    }
    let mut node = e.clone();
    for i in 0..e.children().len() {
        node = node.update_parameter(i, to_select(e.get_parameter(i)));
    }
    node
}

/// Appends `divisor != 0` for every division or remainder subterm present
/// in any condition; each distinct guard appears exactly once.
pub(crate) fn append_nonzero_divisor_guards(path: &mut Path, config: &AnalysisConfig) {
    let mut seen: IndexSet<Expr> = IndexSet::new();
    let mut guards: Vec<(Expr, BlockId)> = Vec::new();
    for cond in &path.conditions {
        let block = cond.block;
        cond.expr.for_each_subterm(&mut |term| {
            if term.op().is_division() {
                let divisor = term.get_parameter(1).clone();
                let zero = Expr::constant(0, divisor.bits());
                let guard = Expr::compare(Op::Ne, divisor, zero, config.word_bits);
                if seen.insert(guard.clone()) {
                    guards.push((guard, block));
                }
            }
        });
    }
    for (guard, block) in guards {
        path.push_condition(guard, block);
    }
}

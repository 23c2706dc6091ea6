//! Sidecar artifact writers.
//!
//! One ASCII file per artifact: condition expressions, path line numbers,
//! per-condition edges (with caller-supplied adjustment from IR block ids
//! to DAG node ids), conditional-branch directions, and array-access
//! witnesses. File handles are scoped and released on all exit paths.

use std::fs::File;
use std::io::{BufWriter, Write};

use gametime_core::{AnalysisConfig, BlockId};

use crate::error::AnalyzeError;
use crate::path::Path;

/// Condition expressions, one per line, in path order.
pub fn write_conditions(
    path: &Path,
    out: impl AsRef<std::path::Path>,
) -> Result<(), AnalyzeError> {
    let mut w = BufWriter::new(File::create(out)?);
    for cond in path.conditions() {
        writeln!(w, "{}", cond.expr)?;
    }
    w.flush()?;
    Ok(())
}

/// Sorted unique source line numbers, space-separated on a single line.
pub fn write_line_numbers(
    path: &Path,
    out: impl AsRef<std::path::Path>,
) -> Result<(), AnalyzeError> {
    let mut w = BufWriter::new(File::create(out)?);
    let lines: Vec<String> = path.line_numbers().iter().map(|l| l.to_string()).collect();
    writeln!(w, "{}", lines.join(" "))?;
    w.flush()?;
    Ok(())
}

/// Per-condition edges as `k: src_dag_id sink_dag_id`. The two functions
/// adjust IR block ids to DAG node ids; the sink is the block following
/// the condition's block on the path (the block itself at the path end).
pub fn write_condition_edges(
    path: &Path,
    adjust_source: impl Fn(BlockId) -> i64,
    adjust_sink: impl Fn(BlockId) -> i64,
    out: impl AsRef<std::path::Path>,
) -> Result<(), AnalyzeError> {
    let mut w = BufWriter::new(File::create(out)?);
    for (k, cond) in path.conditions().iter().enumerate() {
        let source = cond.block;
        let sink = path.successor_on_path(source).unwrap_or(source);
        writeln!(w, "{k}: {} {}", adjust_source(source), adjust_sink(sink))?;
    }
    w.flush()?;
    Ok(())
}

/// Conditional-branch line numbers with `True`/`False` labels, one per
/// line, in path order.
pub fn write_branch_directions(
    path: &Path,
    out: impl AsRef<std::path::Path>,
) -> Result<(), AnalyzeError> {
    let mut w = BufWriter::new(File::create(out)?);
    for record in path.branch_records() {
        let label = if record.taken_true { "True" } else { "False" };
        writeln!(w, "{}: {label}", record.line)?;
    }
    w.flush()?;
    Ok(())
}

/// Array accesses as `name: [(idx0, idx1, ...)]`, one per witnessed
/// access, followed by the original expressions behind each temporary
/// index as `k: expression` with index brackets and the temporary-index
/// prefix stripped.
pub fn write_array_accesses(
    path: &Path,
    config: &AnalysisConfig,
    out: impl AsRef<std::path::Path>,
) -> Result<(), AnalyzeError> {
    let mut w = BufWriter::new(File::create(out)?);
    for (array, numbers) in path.array_accesses() {
        let list = numbers
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(w, "{}: [({list})]", array.value())?;
    }
    for (k, expr) in path.temporary_index_expressions() {
        let cleaned = expr
            .value()
            .replace(['[', ']'], "")
            .replace(&config.temp_index_prefix, "");
        writeln!(w, "{k}: {cleaned}")?;
    }
    w.flush()?;
    Ok(())
}

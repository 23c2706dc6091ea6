//! Path state and the path analyzer.
//!
//! A [`Path`] holds everything accumulated while symbolically executing one
//! acyclic block sequence: the ordered conditions (stamped with the block
//! they arose in), the referenced variables, array dimensions, the
//! address-taken / alias / aggregate-offset tables, array-access witnesses,
//! and the path-scoped counters for synthesized names.
//!
//! The per-block assignment counters are kept as one path-level table keyed
//! by `(block, variable)` and projected per block; bumping a counter
//! affects the current block and every later block on the path, so
//! subsequent uses pick up the new version.
//!
//! [`PathAnalyzer`] walks the blocks in order, materializes assignments and
//! branch conditions through the backward executor, and post-processes the
//! result (array dimensions, index replacement, access witnesses,
//! `Array` to `Select` lowering, nonzero-divisor guards).

use std::collections::{BTreeSet, HashMap};

use indexmap::{IndexMap, IndexSet};

use gametime_core::{
    AnalysisConfig, ArrayMode, BlockId, CoreError, Expr, FunctionUnit, InstrId, InstrKind, Op,
    OperandId,
};

use crate::error::AnalyzeError;
use crate::helpers::arrays;
use crate::simplify::simplify;

/// One path condition and the block it arose in.
#[derive(Debug, Clone)]
pub struct Condition {
    pub expr: Expr,
    pub block: BlockId,
}

/// A conditional branch taken along the path.
#[derive(Debug, Clone, Copy)]
pub struct BranchRecord {
    pub line: u32,
    pub taken_true: bool,
}

/// Aggregate state for one path through one function unit.
#[derive(Debug, Clone)]
pub struct Path {
    blocks: Vec<BlockId>,
    pub(crate) conditions: Vec<Condition>,
    pub(crate) variables: IndexSet<Expr>,
    pub(crate) array_variables: IndexSet<Expr>,
    /// Index widths per level plus the element width, keyed by the array
    /// variable's original (version-stripped) name.
    pub(crate) array_dimensions: IndexMap<String, Vec<u32>>,
    /// Variable whose address was taken, to the synthetic pointer for it.
    pub(crate) address_taken: IndexMap<Expr, Expr>,
    /// Expression to the expression it is definitionally equal to.
    pub(crate) alias_table: IndexMap<Expr, Expr>,
    /// Aggregate expression to `(base aggregate, bit offset)`.
    pub(crate) aggregate_offsets: IndexMap<Expr, (Expr, Expr)>,
    /// `(array variable, temporary index numbers)` witnessed in conditions.
    pub(crate) array_accesses: Vec<(Expr, Vec<u32>)>,
    /// Temporary index number to the original index expression it replaced.
    pub(crate) temp_index_exprs: IndexMap<u32, Expr>,
    pub(crate) branch_records: Vec<BranchRecord>,
    pub(crate) lines: BTreeSet<u32>,
    assignment_counts: HashMap<(BlockId, String), u32>,
    next_temp_var: u32,
    next_temp_index: u32,
    next_temp_pointer: u32,
}

impl Path {
    pub fn new(blocks: Vec<BlockId>) -> Self {
        Path {
            blocks,
            conditions: Vec::new(),
            variables: IndexSet::new(),
            array_variables: IndexSet::new(),
            array_dimensions: IndexMap::new(),
            address_taken: IndexMap::new(),
            alias_table: IndexMap::new(),
            aggregate_offsets: IndexMap::new(),
            array_accesses: Vec::new(),
            temp_index_exprs: IndexMap::new(),
            branch_records: Vec::new(),
            lines: BTreeSet::new(),
            assignment_counts: HashMap::new(),
            next_temp_var: 0,
            next_temp_index: 0,
            next_temp_pointer: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Read accessors
    // -----------------------------------------------------------------------

    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn variables(&self) -> &IndexSet<Expr> {
        &self.variables
    }

    pub fn array_variables(&self) -> &IndexSet<Expr> {
        &self.array_variables
    }

    pub fn array_dimensions(&self) -> &IndexMap<String, Vec<u32>> {
        &self.array_dimensions
    }

    pub fn address_taken(&self) -> &IndexMap<Expr, Expr> {
        &self.address_taken
    }

    pub fn alias_table(&self) -> &IndexMap<Expr, Expr> {
        &self.alias_table
    }

    pub fn aggregate_offset_table(&self) -> &IndexMap<Expr, (Expr, Expr)> {
        &self.aggregate_offsets
    }

    pub fn array_accesses(&self) -> &[(Expr, Vec<u32>)] {
        &self.array_accesses
    }

    pub fn temporary_index_expressions(&self) -> &IndexMap<u32, Expr> {
        &self.temp_index_exprs
    }

    pub fn branch_records(&self) -> &[BranchRecord] {
        &self.branch_records
    }

    /// Source line numbers touched by the path, sorted and unique.
    pub fn line_numbers(&self) -> &BTreeSet<u32> {
        &self.lines
    }

    /// The block following `block` on this path.
    pub fn successor_on_path(&self, block: BlockId) -> Option<BlockId> {
        let pos = self.position_of(block)?;
        self.blocks.get(pos + 1).copied()
    }

    pub fn position_of(&self, block: BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| *b == block)
    }

    // -----------------------------------------------------------------------
    // Mutation during analysis
    // -----------------------------------------------------------------------

    pub(crate) fn push_condition(&mut self, expr: Expr, block: BlockId) {
        self.conditions.push(Condition { expr, block });
    }

    pub(crate) fn fresh_temp_var(&mut self, config: &AnalysisConfig) -> String {
        let name = format!("{}{}", config.temp_var_prefix, self.next_temp_var);
        self.next_temp_var += 1;
        name
    }

    pub(crate) fn fresh_temp_index(&mut self, config: &AnalysisConfig) -> (u32, String) {
        let k = self.next_temp_index;
        self.next_temp_index += 1;
        (k, format!("{}{}", config.temp_index_prefix, k))
    }

    pub(crate) fn fresh_temp_pointer(&mut self, config: &AnalysisConfig) -> String {
        let name = format!("{}{}", config.temp_pointer_prefix, self.next_temp_pointer);
        self.next_temp_pointer += 1;
        name
    }

    // -----------------------------------------------------------------------
    // Assignment counters (per-block addendum, projected)
    // -----------------------------------------------------------------------

    /// The original variable name: the substring before a `<k>` version tag.
    pub(crate) fn original_name(name: &str) -> &str {
        name.split('<').next().unwrap_or(name)
    }

    /// Renders `name` for version 0 and `name<k>` for version k >= 1.
    pub(crate) fn rendered_name(original: &str, version: u32) -> String {
        if version == 0 {
            original.to_string()
        } else {
            format!("{original}<{version}>")
        }
    }

    /// Number of assignments to `original` observed up to and including
    /// `block`.
    pub(crate) fn version(&self, block: BlockId, original: &str) -> u32 {
        self.assignment_counts
            .get(&(block, original.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Increments the assignment counter for `original` in `block` and
    /// every later block on the path.
    pub(crate) fn bump_assignment(&mut self, block: BlockId, original: &str) {
        let Some(pos) = self.position_of(block) else {
            return;
        };
        for b in self.blocks[pos..].to_vec() {
            *self
                .assignment_counts
                .entry((b, original.to_string()))
                .or_insert(0) += 1;
        }
    }

    /// Rewrites every variable leaf to its current versioned name as seen
    /// from `block`.
    pub(crate) fn update_expression(&self, e: &Expr, block: BlockId) -> Expr {
        e.map_leaves(&mut |leaf| {
            if !(leaf.is_variable() || leaf.is_array_variable()) {
                return None;
            }
            let original = Self::original_name(leaf.value());
            let rendered = Self::rendered_name(original, self.version(block, original));
            if rendered == leaf.value() {
                None
            } else {
                Some(leaf.renamed(rendered))
            }
        })
    }

    /// The canonical base aggregate and composed bit offset of an
    /// aggregate expression, following the aggregate-offset table and
    /// structural `Offset` nodes.
    pub(crate) fn base_aggregate_of(&self, e: &Expr, word_bits: u32) -> (Expr, Expr) {
        if let Some((base, off)) = self.aggregate_offsets.get(e) {
            let (base, off) = (base.clone(), off.clone());
            let (root, acc) = self.base_aggregate_of(&base, word_bits);
            return (root, simplify(&Expr::binary(Op::Add, acc, off)));
        }
        if e.op() == Op::Offset {
            let (root, acc) = self.base_aggregate_of(e.get_parameter(0), word_bits);
            let off = e.get_parameter(1).clone();
            return (root, simplify(&Expr::binary(Op::Add, acc, off)));
        }
        (e.clone(), Expr::constant(0, word_bits))
    }
}

/// Walks one path, accumulating conditions and assignments into a [`Path`].
pub struct PathAnalyzer<'u> {
    pub(crate) unit: &'u FunctionUnit,
    pub(crate) config: &'u AnalysisConfig,
    pub(crate) path: Path,
    /// Per-path memoization of traced operands.
    pub(crate) memo: HashMap<OperandId, Expr>,
    /// Block currently being walked; used to stamp synthesized conditions.
    pub(crate) current_block: BlockId,
}

impl<'u> PathAnalyzer<'u> {
    /// Creates an analyzer for the given block sequence. Every block must
    /// belong to the unit.
    pub fn new(
        unit: &'u FunctionUnit,
        config: &'u AnalysisConfig,
        blocks: Vec<BlockId>,
    ) -> Result<Self, AnalyzeError> {
        if blocks.is_empty() {
            return Err(AnalyzeError::MalformedIr {
                reason: "path has no blocks".into(),
            });
        }
        for b in &blocks {
            if !unit.contains_block(*b) {
                return Err(AnalyzeError::Core(CoreError::UnknownBlock { id: *b }));
            }
        }
        let first = blocks[0];
        Ok(PathAnalyzer {
            unit,
            config,
            path: Path::new(blocks),
            memo: HashMap::new(),
            current_block: first,
        })
    }

    pub fn into_path(self) -> Path {
        self.path
    }

    /// Walks the blocks in order, then post-processes the collected
    /// conditions.
    pub fn generate_conditions_and_assignments(&mut self) -> Result<(), AnalyzeError> {
        for i in 0..self.path.blocks.len() {
            let block = self.path.blocks[i];
            self.current_block = block;
            tracing::debug!(block = %block, "walking path block");
            self.walk_block(block)?;
            self.append_branch_condition(block)?;
        }

        if self.path.conditions.is_empty() {
            // Downstream consumers expect a well-formed path.
            let anchor = self.path.blocks[0];
            self.path
                .push_condition(Expr::truth(self.config.word_bits), anchor);
        }

        self.post_process()
    }

    fn walk_block(&mut self, block: BlockId) -> Result<(), AnalyzeError> {
        let instr_ids: Vec<InstrId> = self
            .unit
            .block(block)
            .map(|b| b.instr_ids().to_vec())
            .unwrap_or_default();

        for id in instr_ids {
            let instr = self
                .unit
                .instr(id)
                .ok_or_else(|| AnalyzeError::MalformedIr {
                    reason: format!("dangling instruction id {id}"),
                })?
                .clone();
            if instr.line > 0 {
                self.path.lines.insert(instr.line);
            }
            match &instr.kind {
                InstrKind::Switch => {
                    return Err(AnalyzeError::SwitchInstruction { line: instr.line })
                }
                InstrKind::Value(_) => {
                    let Some(dst) = instr.destination() else {
                        continue;
                    };
                    if dst.temporary {
                        // Temporaries are traced lazily, backward from uses.
                        continue;
                    }
                    let dst = dst.clone();
                    let dst_expr = self.trace_operand(&dst, false)?;
                    let src_expr = self.trace_operand(&dst, true)?;
                    let src_expr = self.path.update_expression(&simplify(&src_expr), block);
                    let dst_expr = self.path.update_expression(&dst_expr, block);
                    self.generate_and_log_assignment(dst_expr, src_expr, block)?;
                }
                InstrKind::Call { callee } if *callee == self.config.assume_name => {
                    let arg = instr
                        .srcs
                        .first()
                        .ok_or_else(|| AnalyzeError::MalformedIr {
                            reason: format!("assume call at line {} has no argument", instr.line),
                        })?
                        .clone();
                    let expr = self.trace_operand(&arg, false)?;
                    let expr = self.path.update_expression(&simplify(&expr), block);
                    let zero = Expr::constant(0, expr.bits());
                    let cond = Expr::compare(Op::Ne, expr, zero, self.config.word_bits);
                    self.path.push_condition(cond, block);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Appends the branch condition when `block` exits through a
    /// conditional branch on this path. The direction is reflected in the
    /// comparison by the executor, or wrapped in `Not` here when the
    /// condition is not comparison-shaped.
    fn append_branch_condition(&mut self, block: BlockId) -> Result<(), AnalyzeError> {
        let Some(next) = self.path.successor_on_path(block) else {
            return Ok(());
        };
        let Some(term) = self.unit.terminator(block) else {
            return Ok(());
        };
        let term = term.clone();
        let InstrKind::Branch {
            true_target,
            false_target,
        } = term.kind
        else {
            return Ok(());
        };
        let cond_op = term
            .srcs
            .first()
            .ok_or_else(|| AnalyzeError::MalformedIr {
                reason: format!("branch at line {} has no condition operand", term.line),
            })?
            .clone();

        let expr = self.trace_operand(&cond_op, false)?;
        let takes_false = next == false_target && false_target != true_target;
        let compare_defined = cond_op
            .def
            .and_then(|d| self.unit.instr(d))
            .map(|di| matches!(di.kind, InstrKind::Compare(_)))
            .unwrap_or(false);
        let expr = if takes_false && !compare_defined {
            Expr::unary(Op::Not, expr)
        } else {
            expr
        };
        let expr = self.path.update_expression(&simplify(&expr), block);
        self.path.push_condition(expr, block);
        self.path.branch_records.push(BranchRecord {
            line: term.line,
            taken_true: next == true_target,
        });
        Ok(())
    }

    /// Structural dispatcher over the destination shape of an assignment.
    pub(crate) fn generate_and_log_assignment(
        &mut self,
        dst: Expr,
        src: Expr,
        block: BlockId,
    ) -> Result<(), AnalyzeError> {
        // Pointer and aggregate destinations only log table entries.
        if dst.ctype().map(|t| t.is_pointer()).unwrap_or(false) || dst.op() == Op::Function {
            self.path.alias_table.insert(dst, src);
            return Ok(());
        }
        if dst.ctype().map(|t| t.is_aggregate()).unwrap_or(false) && dst.op() != Op::Array {
            let entry = self.path.base_aggregate_of(&src, self.config.word_bits);
            self.path.aggregate_offsets.insert(dst, entry);
            return Ok(());
        }

        match dst.op() {
            Op::Concat => {
                let hi = dst.get_parameter(0).clone();
                let lo = dst.get_parameter(1).clone();
                let lo_bits = lo.bits();
                let src_hi = Expr::bit_extract(src.clone(), lo_bits, lo_bits + hi.bits() - 1);
                let src_lo = Expr::bit_extract(src, 0, lo_bits - 1);
                self.generate_and_log_assignment(hi, src_hi, block)?;
                self.generate_and_log_assignment(lo, src_lo, block)
            }
            Op::ZeroExtend | Op::SignExtend => {
                let x = dst.get_parameter(0).clone();
                let truncated = Expr::bit_extract(src, 0, x.bits() - 1);
                self.generate_and_log_assignment(x, truncated, block)
            }
            Op::BitExtract => {
                let x = dst.get_parameter(0).clone();
                let lo = dst.get_parameter(1).const_value().unwrap_or(0) as u32;
                let hi = dst.get_parameter(2).const_value().unwrap_or(0) as u32;
                let x_cur = self.path.update_expression(&x, block);
                // Reassemble x: unchanged high bits, the stored slice, and
                // unchanged low bits.
                let mut pieces = Vec::new();
                if hi + 1 < x.bits() {
                    pieces.push(Expr::bit_extract(x_cur.clone(), hi + 1, x.bits() - 1));
                }
                pieces.push(src);
                if lo > 0 {
                    pieces.push(Expr::bit_extract(x_cur, 0, lo - 1));
                }
                let reassembled = pieces
                    .into_iter()
                    .reduce(Expr::concat)
                    .expect("at least the stored slice");
                self.generate_and_log_assignment(x, reassembled, block)
            }
            Op::Ite => {
                let cond = dst.get_parameter(0).clone();
                let a = dst.get_parameter(1).clone();
                let b = dst.get_parameter(2).clone();
                let a_cur = self.path.update_expression(&a, block);
                self.generate_and_log_assignment(a, Expr::ite(cond, src.clone(), a_cur), block)?;
                self.generate_and_log_assignment(b, src, block)
            }
            Op::Array => self.log_array_store(dst, src, block),
            Op::Variable => {
                let original = Path::original_name(dst.value()).to_string();
                let next = self.path.version(block, &original) + 1;
                self.path.bump_assignment(block, &original);
                let renamed = dst.renamed(Path::rendered_name(&original, next));
                let cond = Expr::compare(Op::Eq, renamed, src, self.config.word_bits);
                self.path.push_condition(cond, block);
                Ok(())
            }
            _ => Err(AnalyzeError::MalformedIr {
                reason: format!("unsupported assignment destination '{dst}'"),
            }),
        }
    }

    /// `array<k+1> = store(array<k>, i, source)`, or the flat-index
    /// concatenation equivalent.
    fn log_array_store(&mut self, dst: Expr, src: Expr, block: BlockId) -> Result<(), AnalyzeError> {
        let (base, indices) = arrays::access_chain(&dst).ok_or_else(|| {
            AnalyzeError::MalformedIr {
                reason: format!("array store into non-array expression '{dst}'"),
            }
        })?;

        let original = Path::original_name(base.value()).to_string();
        let current = self.path.version(block, &original);
        let cur_leaf = base.renamed(Path::rendered_name(&original, current));
        self.path.bump_assignment(block, &original);
        let new_leaf = base.renamed(Path::rendered_name(&original, current + 1));

        let store = match self.config.array_mode {
            ArrayMode::Flat if indices.len() > 1 => {
                let index = indices
                    .into_iter()
                    .reduce(Expr::concat)
                    .expect("nonempty index chain");
                Expr::store(cur_leaf, index, src)
            }
            _ => Self::nested_store(cur_leaf, &indices, src),
        };
        let cond = Expr::compare(Op::Eq, new_leaf, store, self.config.word_bits);
        self.path.push_condition(cond, block);
        Ok(())
    }

    fn nested_store(array: Expr, indices: &[Expr], src: Expr) -> Expr {
        if indices.len() == 1 {
            return Expr::store(array, indices[0].clone(), src);
        }
        let inner = Expr::select(array.clone(), indices[0].clone(), src.bits());
        let written = Self::nested_store(inner, &indices[1..], src);
        Expr::store(array, indices[0].clone(), written)
    }

    /// Post-processing, in order: array dimensions, index replacement,
    /// access witnesses, `Array` to `Select` lowering, nonzero-divisor
    /// guards, and the final variable census.
    fn post_process(&mut self) -> Result<(), AnalyzeError> {
        arrays::compute_dimensions(&mut self.path, self.config);
        arrays::replace_indices(&mut self.path, self.config);
        arrays::record_array_accesses(&mut self.path, self.config);
        arrays::lower_array_accesses(&mut self.path);
        arrays::append_nonzero_divisor_guards(&mut self.path, self.config);
        self.collect_variables();
        Ok(())
    }

    fn collect_variables(&mut self) {
        let mut leaves = Vec::new();
        for cond in &self.path.conditions {
            cond.expr.leaf_variables(&mut leaves);
        }
        for leaf in leaves {
            if leaf.is_array_variable() {
                self.path.array_variables.insert(leaf);
            } else {
                self.path.variables.insert(leaf);
            }
        }
    }
}

/// Runs the full analysis for one path: walk, conditions, post-processing.
pub fn analyze_path(
    unit: &FunctionUnit,
    config: &AnalysisConfig,
    blocks: Vec<BlockId>,
) -> Result<Path, AnalyzeError> {
    let mut analyzer = PathAnalyzer::new(unit, config, blocks)?;
    analyzer.generate_conditions_and_assignments()?;
    Ok(analyzer.into_path())
}

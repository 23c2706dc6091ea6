//! Backward symbolic executor.
//!
//! Given an SSA IR operand and the path, produces the expression for the
//! operand's value at its point of use by walking its definition chain
//! backward. Results are memoized per path, keyed by operand identity --
//! an optimization, and the defense against exponential blow-up on
//! diamond-shaped IR.
//!
//! Non-temporary operands defined by value instructions short-circuit to a
//! versioned variable leaf: their definitions were already materialized as
//! assignment conditions by the path walk. The dedicated complete-trace
//! mode (used for the right-hand side of such assignments) disables that
//! short-circuit for the requested operand only.

use gametime_core::{
    BlockId, CType, CmpKind, Expr, Immediate, Instr, InstrId, InstrKind, Op, Operand, ValueOp,
};

use crate::error::AnalyzeError;
use crate::helpers::arrays;
use crate::helpers::pointers::{self, DerefMode};
use crate::path::PathAnalyzer;
use crate::simplify::simplify;

/// Widens or narrows `e` to `to_bits`: sign- or zero-extension by the
/// source's signedness, or an extract of the low bits.
pub fn adjust_bit_size(e: Expr, to_bits: u32, signed: bool) -> Expr {
    let from = e.bits();
    if to_bits == from {
        e
    } else if to_bits > from {
        if signed {
            Expr::sign_extend(e, to_bits - from)
        } else {
            Expr::zero_extend(e, to_bits - from)
        }
    } else {
        Expr::bit_extract(e, 0, to_bits - 1)
    }
}

/// Source-level names arrive with language-mangling prefixes; symbolic
/// variables carry the bare name.
fn strip_mangling(name: &str) -> &str {
    let stripped = name.trim_start_matches('_');
    if stripped.is_empty() {
        name
    } else {
        stripped
    }
}

fn select_cmp(kind: CmpKind, float: bool, unsigned: bool) -> Op {
    match kind {
        CmpKind::Eq => {
            if float {
                Op::FEq
            } else {
                Op::Eq
            }
        }
        CmpKind::Ne => {
            if float {
                Op::FNe
            } else {
                Op::Ne
            }
        }
        CmpKind::Lt => {
            if float {
                Op::FLt
            } else if unsigned {
                Op::ULt
            } else {
                Op::SLt
            }
        }
        CmpKind::Le => {
            if float {
                Op::FLe
            } else if unsigned {
                Op::ULe
            } else {
                Op::SLe
            }
        }
        CmpKind::Gt => {
            if float {
                Op::FGt
            } else if unsigned {
                Op::UGt
            } else {
                Op::SGt
            }
        }
        CmpKind::Ge => {
            if float {
                Op::FGe
            } else if unsigned {
                Op::UGe
            } else {
                Op::SGe
            }
        }
    }
}

impl<'u> PathAnalyzer<'u> {
    /// Traces one operand. `complete` disables the non-temporary
    /// short-circuit for this operand (not for nested traces); complete
    /// results are not memoized.
    pub(crate) fn trace_operand(
        &mut self,
        operand: &Operand,
        complete: bool,
    ) -> Result<Expr, AnalyzeError> {
        if !complete {
            if let Some(hit) = self.memo.get(&operand.id) {
                return Ok(hit.clone());
            }
        }
        let result = self.trace_uncached(operand, complete)?;
        if !complete {
            self.memo.insert(operand.id, result.clone());
        }
        Ok(result)
    }

    fn trace_uncached(&mut self, operand: &Operand, complete: bool) -> Result<Expr, AnalyzeError> {
        if !complete {
            if let Some(imm) = operand.immediate {
                return self.immediate_expr(operand, imm);
            }
            if operand.address_of {
                return self.promote_address_taken(operand);
            }
            if operand.is_memory() {
                return self.trace_memory(operand);
            }
        }

        let Some(def_id) = operand.def else {
            return if complete {
                Err(AnalyzeError::MalformedIr {
                    reason: format!("operand '{}' has no defining instruction", operand.name),
                })
            } else {
                Ok(self.free_leaf(operand))
            };
        };
        let instr = self
            .unit
            .instr(def_id)
            .ok_or_else(|| AnalyzeError::MalformedIr {
                reason: format!(
                    "operand '{}' references missing instruction {def_id}",
                    operand.name
                ),
            })?
            .clone();

        // Defined outside the path: a fresh symbolic input.
        if self.path.position_of(instr.block).is_none() {
            return Ok(self.free_leaf(operand));
        }

        match instr.kind.clone() {
            InstrKind::Start => Ok(self.free_leaf(operand)),
            InstrKind::Chi => {
                let masked = instr.srcs.first().cloned();
                let of_start = masked
                    .as_ref()
                    .and_then(|s| s.def)
                    .and_then(|d| self.unit.instr(d))
                    .map(|i| matches!(i.kind, InstrKind::Start))
                    .unwrap_or(true);
                if of_start {
                    Ok(self.free_leaf(operand))
                } else {
                    self.trace_operand(&masked.expect("checked above"), false)
                }
            }
            InstrKind::Call { callee } => {
                // One distinct symbolic value per textual call site.
                let name = self.config.efc_name(&callee, instr.line);
                Ok(Expr::variable(name, operand.bits).with_ctype(operand.ty.clone()))
            }
            InstrKind::Compare(kind) => self.trace_compare(&instr, kind, def_id),
            InstrKind::Value(vop) => {
                if !complete && !operand.temporary {
                    // Already materialized as an assignment condition.
                    return Ok(self.free_leaf(operand));
                }
                self.trace_value(&instr, vop)
            }
            InstrKind::Phi { blocks } => self.trace_phi(&instr, &blocks, operand),
            other => Err(AnalyzeError::UnknownOpcode {
                opcode: format!("{other:?}"),
                operand: operand.name.clone(),
                line: instr.line,
            }),
        }
    }

    /// A fresh symbolic leaf for an input, out-of-path, or undefined
    /// operand.
    fn free_leaf(&self, operand: &Operand) -> Expr {
        let name = strip_mangling(&operand.name).to_string();
        if operand.ty.is_indexable() {
            let dims = arrays::dimensions_of(&operand.ty, self.config);
            let element_bits = *dims.last().unwrap_or(&operand.bits);
            Expr::array_variable(name, element_bits).with_ctype(operand.ty.clone())
        } else {
            Expr::variable(name, operand.bits).with_ctype(operand.ty.clone())
        }
    }

    fn immediate_expr(&self, operand: &Operand, imm: Immediate) -> Result<Expr, AnalyzeError> {
        match imm {
            Immediate::Int(value) => {
                Ok(Expr::constant(value, operand.bits).with_ctype(operand.ty.clone()))
            }
            Immediate::Float(value) => {
                if !value.is_finite() {
                    return Err(AnalyzeError::UnsupportedImmediate {
                        name: operand.name.clone(),
                    });
                }
                let truncated = value.trunc() as i128;
                tracing::warn!(
                    original = value,
                    truncated = %truncated,
                    "float immediate truncated to integer"
                );
                Ok(Expr::constant(truncated, operand.bits).with_ctype(operand.ty.clone()))
            }
        }
    }

    /// First address-taking of a variable: synthesize a temporary pointer,
    /// assert `*p = x` in the current block, and record the promotion so
    /// the address-of operator never reaches the query.
    fn promote_address_taken(&mut self, operand: &Operand) -> Result<Expr, AnalyzeError> {
        let pointer_ty = if operand.ty.is_pointer() {
            operand.ty.clone()
        } else {
            CType::pointer_to(operand.ty.clone())
        };
        assert!(
            pointer_ty.is_pointer(),
            "temporary pointer construction requires a pointer type"
        );
        let var_ty = pointer_ty.referent().cloned().unwrap_or(CType::Void);
        let var_bits = var_ty.bits(self.config.word_bits) as u32;
        let mode = if var_ty.is_aggregate() {
            DerefMode::Alias
        } else {
            DerefMode::FieldAccess
        };
        let var =
            Expr::variable(strip_mangling(&operand.name).to_string(), var_bits).with_ctype(var_ty);

        if let Some(pointer) = self.path.address_taken.get(&var) {
            return Ok(pointer.clone());
        }

        let name = self.path.fresh_temp_pointer(self.config);
        let pointer = Expr::array_variable(name.clone(), var_bits).with_ctype(pointer_ty.clone());
        let dims = arrays::dimensions_of(&pointer_ty, self.config);
        self.path.array_dimensions.insert(name, dims.clone());

        let f = pointers::dereferencing_function(&pointer, &dims, &mut self.path, self.config);
        let deref = pointers::dereference(&f, mode, var_bits, &pointer_ty, &mut self.path, self.config)?;

        let var_now = self.path.update_expression(&var, self.current_block);
        let cond = Expr::compare(Op::Eq, deref, var_now, self.config.word_bits);
        let block = self.current_block;
        self.path.push_condition(cond, block);

        self.path.address_taken.insert(var.clone(), pointer.clone());
        // Later dereferences of the pointer resolve back to the variable.
        let index = Expr::variable(self.path.fresh_temp_var(self.config), self.config.word_bits);
        let offset = Expr::variable(self.path.fresh_temp_var(self.config), self.config.word_bits);
        self.path
            .alias_table
            .insert(pointer.clone(), Expr::function(vec![index, offset], var));
        Ok(pointer)
    }

    /// Memory operand: trace the base pointer, apply the field offset, and
    /// dereference. An aggregate-typed access aliases the aggregate rather
    /// than decomposing it into fields.
    fn trace_memory(&mut self, operand: &Operand) -> Result<Expr, AnalyzeError> {
        let mref = operand.memory.clone().expect("memory operand");
        let base = mref.base.as_ref();
        let base_expr = self.trace_operand(base, false)?;

        let mode = if operand.ty.is_aggregate() {
            DerefMode::Alias
        } else {
            DerefMode::FieldAccess
        };

        let f = self.deref_function_for(&base_expr, &base.ty)?;
        let f = if mref.field_offset_bits > 0 {
            let referent_bits = base
                .ty
                .indexed()
                .map(|t| t.bits(self.config.word_bits))
                .unwrap_or(u64::from(operand.bits));
            let offset = Expr::constant(mref.field_offset_bits as i128, self.config.word_bits);
            pointers::add_offset_to_pointer(&f, &offset, referent_bits, &mut self.path, self.config)
        } else {
            f
        };
        let e = pointers::dereference(&f, mode, operand.bits, &operand.ty, &mut self.path, self.config)?;
        Ok(e.with_ctype(operand.ty.clone()))
    }

    /// The dereferencing function for a traced pointer expression,
    /// following the alias table until it yields a function or runs dry.
    fn deref_function_for(&mut self, base: &Expr, ty: &CType) -> Result<Expr, AnalyzeError> {
        let mut resolved = base.clone();
        let mut hops = 0;
        loop {
            if resolved.op() == Op::Function {
                return Ok(resolved);
            }
            match self.path.alias_table.get(&resolved) {
                Some(next) if hops < 16 => {
                    resolved = next.clone();
                    hops += 1;
                }
                _ => break,
            }
        }
        assert!(
            ty.is_indexable(),
            "dereferencing a non-pointer expression '{base}'"
        );
        let dims = arrays::dimensions_of(ty, self.config);
        Ok(pointers::dereferencing_function(
            &resolved,
            &dims,
            &mut self.path,
            self.config,
        ))
    }

    fn trace_compare(
        &mut self,
        instr: &Instr,
        kind: CmpKind,
        def_id: InstrId,
    ) -> Result<Expr, AnalyzeError> {
        let lhs_op = self.src_operand(instr, 0)?;
        let rhs_op = self.src_operand(instr, 1)?;
        let lhs = self.trace_operand(&lhs_op, false)?;
        let rhs = self.trace_operand(&rhs_op, false)?;

        let float = lhs_op.ty.is_float() || rhs_op.ty.is_float();
        let unsigned = !lhs_op.ty.is_signed() && !rhs_op.ty.is_signed();
        let mut expr = Expr::compare(select_cmp(kind, float, unsigned), lhs, rhs, self.config.word_bits);

        // When this compare feeds the block's conditional branch and the
        // path leaves by the false edge, the condition is the negation.
        if let Some(term) = self.unit.terminator(instr.block) {
            if let InstrKind::Branch {
                true_target,
                false_target,
            } = &term.kind
            {
                let feeds_branch = term.srcs.first().and_then(|s| s.def) == Some(def_id);
                if feeds_branch
                    && true_target != false_target
                    && self.path.successor_on_path(instr.block) == Some(*false_target)
                {
                    expr = Expr::unary(Op::Not, expr);
                }
            }
        }
        Ok(expr)
    }

    fn trace_value(&mut self, instr: &Instr, vop: ValueOp) -> Result<Expr, AnalyzeError> {
        let dst = instr
            .destination()
            .cloned()
            .ok_or_else(|| AnalyzeError::MalformedIr {
                reason: format!("value instruction at line {} has no destination", instr.line),
            })?;
        match vop {
            ValueOp::Assign => self.trace_src(instr, 0),
            ValueOp::Add | ValueOp::Sub if dst.ty.is_pointer() => {
                self.trace_pointer_arith(instr, vop, &dst)
            }
            ValueOp::Add => self.binary_value(instr, Op::Add),
            ValueOp::Sub => self.binary_value(instr, Op::Sub),
            ValueOp::Mul => self.binary_value(instr, Op::Mul),
            ValueOp::Div => {
                let unsigned = instr.srcs.iter().take(2).all(|s| !s.ty.is_signed());
                self.binary_value(instr, if unsigned { Op::UDiv } else { Op::SDiv })
            }
            ValueOp::Rem => self.binary_value(instr, Op::Rem),
            ValueOp::BitAnd => self.binary_value(instr, Op::BitAnd),
            ValueOp::BitOr => self.binary_value(instr, Op::BitOr),
            ValueOp::BitXor => self.binary_value(instr, Op::BitXor),
            ValueOp::Shl => self.binary_value(instr, Op::Shl),
            ValueOp::Shr => {
                let logical = instr.srcs.first().map(|s| !s.ty.is_signed()).unwrap_or(false);
                self.binary_value(instr, if logical { Op::LShr } else { Op::AShr })
            }
            ValueOp::Neg => Ok(Expr::unary(Op::Negate, self.trace_src(instr, 0)?)),
            ValueOp::BitNot => Ok(Expr::unary(Op::BitComplement, self.trace_src(instr, 0)?)),
            ValueOp::Not => {
                // Logical negation over a bitvector: ite(x = 0, 1, 0).
                let x = self.trace_src(instr, 0)?;
                let zero = Expr::constant(0, x.bits());
                let cond = Expr::compare(Op::Eq, x, zero, self.config.word_bits);
                Ok(Expr::ite(
                    cond,
                    Expr::constant(1, dst.bits),
                    Expr::constant(0, dst.bits),
                ))
            }
            ValueOp::Convert => self.trace_convert(instr, &dst),
            ValueOp::Subscript => self.trace_subscript(instr, &dst),
        }
    }

    fn binary_value(&mut self, instr: &Instr, op: Op) -> Result<Expr, AnalyzeError> {
        let lhs = self.trace_src(instr, 0)?;
        let rhs = self.trace_src(instr, 1)?;
        Ok(Expr::binary(op, lhs, rhs))
    }

    fn src_operand(&self, instr: &Instr, i: usize) -> Result<Operand, AnalyzeError> {
        instr
            .srcs
            .get(i)
            .cloned()
            .ok_or_else(|| AnalyzeError::MalformedIr {
                reason: format!(
                    "instruction at line {} is missing source operand {i}",
                    instr.line
                ),
            })
    }

    fn trace_src(&mut self, instr: &Instr, i: usize) -> Result<Expr, AnalyzeError> {
        let operand = self.src_operand(instr, i)?;
        self.trace_operand(&operand, false)
    }

    fn trace_convert(&mut self, instr: &Instr, dst: &Operand) -> Result<Expr, AnalyzeError> {
        let src_op = self.src_operand(instr, 0)?;
        let src = self.trace_operand(&src_op, false)?;
        if dst.ty.is_pointer() && src_op.ty.is_pointer() {
            // Pointer-to-pointer conversion preserves the source
            // expression and its type.
            return Ok(src);
        }
        Ok(adjust_bit_size(src, dst.bits, src_op.ty.is_signed()))
    }

    /// Arithmetic with a pointer-typed destination reshapes into
    /// `(base, offset)`: the addend is scaled to bits by the element size
    /// and folded into the base's dereferencing function.
    fn trace_pointer_arith(
        &mut self,
        instr: &Instr,
        vop: ValueOp,
        dst: &Operand,
    ) -> Result<Expr, AnalyzeError> {
        let first = self.src_operand(instr, 0)?;
        let second = self.src_operand(instr, 1)?;
        let base_raw = self.trace_operand(&first, false)?;
        // Alias lookup only when the first source was a non-temporary
        // operand.
        let base = if !first.temporary {
            self.path
                .alias_table
                .get(&base_raw)
                .cloned()
                .unwrap_or(base_raw)
        } else {
            base_raw
        };
        let addend = self.trace_operand(&second, false)?;

        let (augend, elements) = if base.op() == Op::Function {
            (base, addend)
        } else {
            pointers::get_augend_and_addend(&base, &addend)
        };

        let ptr_ty = if first.ty.is_indexable() {
            first.ty.clone()
        } else {
            dst.ty.clone()
        };
        let referent_bits = ptr_ty
            .indexed()
            .map(|t| t.bits(self.config.word_bits))
            .unwrap_or(u64::from(dst.bits));
        let factor = if vop == ValueOp::Sub {
            -(referent_bits as i128)
        } else {
            referent_bits as i128
        };
        let scaled = simplify(&Expr::binary(
            Op::Mul,
            elements.clone(),
            Expr::constant(factor, elements.bits()),
        ));
        let f = self.deref_function_for(&augend, &ptr_ty)?;
        Ok(pointers::add_offset_to_pointer(
            &f,
            &scaled,
            referent_bits,
            &mut self.path,
            self.config,
        ))
    }

    /// `p[i]`: dereference through the alias table, fold the scaled index
    /// into the pointer function, and materialize the element reference.
    fn trace_subscript(&mut self, instr: &Instr, dst: &Operand) -> Result<Expr, AnalyzeError> {
        let base_op = self.src_operand(instr, 0)?;
        let index_op = self.src_operand(instr, 1)?;

        let base_raw = self.trace_operand(&base_op, false)?;
        let base = self
            .path
            .alias_table
            .get(&base_raw)
            .cloned()
            .unwrap_or(base_raw);
        let f = self.deref_function_for(&base, &base_op.ty)?;

        let index = self.trace_operand(&index_op, false)?;
        let index = adjust_bit_size(index, self.config.word_bits, index_op.ty.is_signed());
        let referent_bits = base_op
            .ty
            .indexed()
            .map(|t| t.bits(self.config.word_bits))
            .unwrap_or(u64::from(dst.bits));
        let offset = simplify(&Expr::binary(
            Op::Mul,
            index,
            Expr::constant(referent_bits as i128, self.config.word_bits),
        ));
        let shifted =
            pointers::add_offset_to_pointer(&f, &offset, referent_bits, &mut self.path, self.config);

        let mode = if dst.ty.is_aggregate() {
            DerefMode::Alias
        } else {
            DerefMode::FieldAccess
        };
        let e = pointers::dereference(&shifted, mode, dst.bits, &dst.ty, &mut self.path, self.config)?;
        Ok(e.with_ctype(dst.ty.clone()))
    }

    /// Among the phi's sources, the one whose defining block is on the
    /// path and latest in path order. Ties do not occur on an acyclic
    /// single path.
    fn trace_phi(
        &mut self,
        instr: &Instr,
        blocks: &[BlockId],
        operand: &Operand,
    ) -> Result<Expr, AnalyzeError> {
        let mut best: Option<(usize, Operand)> = None;
        for (src, block) in instr.srcs.iter().zip(blocks) {
            if let Some(pos) = self.path.position_of(*block) {
                if best.as_ref().map(|(p, _)| pos > *p).unwrap_or(true) {
                    best = Some((pos, src.clone()));
                }
            }
        }
        match best {
            Some((_, src)) => self.trace_operand(&src, false),
            None => Ok(self.free_leaf(operand)),
        }
    }
}

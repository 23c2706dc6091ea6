//! Aggregate field resolution.
//!
//! A struct or union is modeled as a set of per-field arrays indexed by the
//! containing aggregate: the access `s[i].f` becomes
//! `__gtFIELD_f__gtAGG_S[i]`, with the aggregate level collapsed to an
//! index carrier. An access window that overlaps several fields is
//! reassembled from `BitExtract` slices with `Concat`, ordered by the
//! target's endianness; incomplete coverage at the high end is zero-padded
//! (a conservative over-approximation, surfaced as a warning).
//!
//! Cast-aliased aggregates reduce to a canonical base aggregate plus a bit
//! offset through the path's aggregate-offset table, so accesses through
//! either route resolve to the same field arrays.

use gametime_core::{AggregateDef, AnalysisConfig, CType, Endianness, Expr, Op};

use crate::error::AnalyzeError;
use crate::helpers::pointers::DerefMode;
use crate::path::Path;

/// One resolved slice of an aggregate access.
#[derive(Debug, Clone)]
pub struct AggregateField {
    /// Name of the aggregate type the field belongs to.
    pub aggregate: String,
    /// The field-array access expression.
    pub access: Expr,
    /// Start offset within the base aggregate, in bits.
    pub start_bits: u64,
    /// Field size in bits.
    pub bits: u64,
}

/// Walks a dereference result, resolving every `Offset` node: aggregate
/// bases decompose into field accesses (or pass through unchanged when
/// aliased); non-aggregate bases drop a zero offset and keep a nonzero
/// residual (an aliasing cast).
pub(crate) fn resolve_offsets(
    e: &Expr,
    mode: DerefMode,
    access_bits: u32,
    access_ty: &CType,
    path: &mut Path,
    config: &AnalysisConfig,
) -> Result<Expr, AnalyzeError> {
    if e.is_leaf() || e.op() == Op::Function {
        return Ok(e.clone());
    }
    let mut node = e.clone();
    for i in 0..e.children().len() {
        let resolved =
            resolve_offsets(e.get_parameter(i), mode, access_bits, access_ty, path, config)?;
        node = node.update_parameter(i, resolved);
    }
    if node.op() != Op::Offset {
        return Ok(node);
    }

    let base = node.get_parameter(0).clone();
    let offset = node.get_parameter(1).clone();

    let referent = referent_type_of(&base);
    if referent.as_ref().map(|t| t.is_aggregate()).unwrap_or(false) {
        if mode == DerefMode::Alias {
            return Ok(base);
        }
        let (root, extra) = path.base_aggregate_of(&base, config.word_bits);
        let offset_v = offset
            .const_value()
            .ok_or_else(|| AnalyzeError::NonConstantOffset {
                offset: offset.value().to_string(),
            })?;
        let extra_v = extra
            .const_value()
            .ok_or_else(|| AnalyzeError::NonConstantOffset {
                offset: extra.value().to_string(),
            })?;
        let total = (offset_v + extra_v) as u64;

        let def = referent_type_of(&root)
            .and_then(|t| t.aggregate().cloned())
            .or_else(|| referent.and_then(|t| t.aggregate().cloned()))
            .ok_or_else(|| AnalyzeError::MalformedIr {
                reason: format!("aggregate access through '{root}' without a definition"),
            })?;
        let carrier = carrier_of(&root, config);
        let fields = resolve_aggregate_access(
            &def,
            &carrier,
            total,
            u64::from(access_bits),
            access_ty,
            config,
        )?;
        return Ok(combine_fields(&fields, total, u64::from(access_bits), config));
    }

    if offset.const_value() == Some(0) {
        Ok(base)
    } else {
        // Nonzero residual offsets indicate an aliasing cast; preserved.
        Ok(node)
    }
}

/// The type of the storage an expression refers to: the leaf's declared
/// type with one `indexed` step per array level wrapped around it.
fn referent_type_of(e: &Expr) -> Option<CType> {
    let mut depth = 0usize;
    let mut cur = e;
    while matches!(cur.op(), Op::Array | Op::Select) {
        depth += 1;
        cur = cur.get_parameter(0);
    }
    let mut ty = cur.ctype()?.clone();
    for _ in 0..depth {
        ty = ty.indexed()?.clone();
    }
    Some(ty)
}

/// The index carrier of an aggregate expression: the index of its
/// enclosing array access (the aggregate level collapses), or the
/// aggregate variable itself at word width.
fn carrier_of(root: &Expr, config: &AnalysisConfig) -> Expr {
    match root.op() {
        Op::Array | Op::Select => root.get_parameter(1).clone(),
        Op::Variable | Op::ArrayVariable => Expr::variable(root.value(), config.word_bits),
        _ => Expr::constant(0, config.word_bits),
    }
}

/// Enumerates the fields of `def` overlapping the accessed bit range
/// `[offset, offset + access_bits)`, recursing into nested aggregates and
/// expanding fixed-size array fields whose element type differs from the
/// access into per-element synthetic accesses.
pub(crate) fn resolve_aggregate_access(
    def: &AggregateDef,
    carrier: &Expr,
    offset: u64,
    access_bits: u64,
    access_ty: &CType,
    config: &AnalysisConfig,
) -> Result<Vec<AggregateField>, AnalyzeError> {
    let word = config.word_bits;
    let end = offset + access_bits;
    let mut out = Vec::new();

    for field in def.fields_overlapping(offset, access_bits, word) {
        let field_bits = field.ty.bits(word);
        let field_end = field.offset_bits + field_bits;
        match &field.ty {
            CType::Aggregate(inner) => {
                // Offsets compose: the window re-expressed inside the
                // nested aggregate, then shifted back out.
                let inner_start = offset.max(field.offset_bits) - field.offset_bits;
                let inner_end = end.min(field_end) - field.offset_bits;
                let nested = resolve_aggregate_access(
                    inner,
                    carrier,
                    inner_start,
                    inner_end - inner_start,
                    access_ty,
                    config,
                )?;
                out.extend(nested.into_iter().map(|mut f| {
                    f.start_bits += field.offset_bits;
                    f
                }));
            }
            CType::UnmanagedArray {
                element,
                length: Some(n),
            } if access_ty != element.as_ref() => {
                let elem_bits = element.bits(word);
                for j in 0..*n {
                    let start = field.offset_bits + j * elem_bits;
                    if !(start < end && offset < start + elem_bits) {
                        continue;
                    }
                    let name = config
                        .field_array_name(&format!("{}_{}", field.name, j), &def.name);
                    let array = Expr::array_variable(name, elem_bits as u32);
                    out.push(AggregateField {
                        aggregate: def.name.clone(),
                        access: Expr::array_access(array, carrier.clone(), elem_bits as u32),
                        start_bits: start,
                        bits: elem_bits,
                    });
                }
            }
            _ => {
                let name = config.field_array_name(&field.name, &def.name);
                let array = Expr::array_variable(name, field_bits as u32);
                out.push(AggregateField {
                    aggregate: def.name.clone(),
                    access: Expr::array_access(array, carrier.clone(), field_bits as u32),
                    start_bits: field.offset_bits,
                    bits: field_bits,
                });
            }
        }
    }
    Ok(out)
}

/// Recombines overlapping field slices into one value of `access_bits`
/// bits. Field order reverses between little- and big-endian targets;
/// incomplete coverage at the high end is zero-padded.
pub(crate) fn combine_fields(
    fields: &[AggregateField],
    offset: u64,
    access_bits: u64,
    config: &AnalysisConfig,
) -> Expr {
    let end = offset + access_bits;
    let mut slices: Vec<(u64, u64, Expr)> = fields
        .iter()
        .map(|f| {
            let lo = offset.max(f.start_bits);
            let hi = end.min(f.start_bits + f.bits);
            let rel_lo = (lo - f.start_bits) as u32;
            let rel_hi = (hi - 1 - f.start_bits) as u32;
            let slice = if rel_lo == 0 && u64::from(rel_hi) == f.bits - 1 {
                f.access.clone()
            } else {
                Expr::bit_extract(f.access.clone(), rel_lo, rel_hi)
            };
            (lo, hi - lo, slice)
        })
        .collect();
    slices.sort_by_key(|(start, _, _)| *start);

    let covered: u64 = slices.iter().map(|(_, width, _)| *width).sum();
    if slices.is_empty() {
        tracing::warn!(
            expected = access_bits,
            "aggregate access matches no field; zero used"
        );
        return Expr::constant(0, access_bits as u32);
    }
    if slices.len() == 1 && covered == access_bits {
        return slices.remove(0).2;
    }

    let ordered: Vec<Expr> = match config.endianness {
        // Little-endian: the higher-addressed field holds the more
        // significant bits of the combined word.
        Endianness::Little => slices.iter().rev().map(|(_, _, e)| e.clone()).collect(),
        Endianness::Big => slices.iter().map(|(_, _, e)| e.clone()).collect(),
    };
    let mut acc = ordered[0].clone();
    for next in &ordered[1..] {
        acc = Expr::concat(acc, next.clone());
    }

    if covered < access_bits {
        tracing::warn!(
            expected = access_bits,
            covered,
            "aggregate access coverage incomplete; zero-padding high bits"
        );
        acc = Expr::concat(Expr::constant(0, (access_bits - covered) as u32), acc);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use gametime_core::{BlockId, FieldDef};

    fn two_shorts() -> AggregateDef {
        AggregateDef {
            name: "pair".into(),
            bits: 32,
            fields: vec![
                FieldDef {
                    name: "a".into(),
                    offset_bits: 0,
                    ty: CType::int16(),
                },
                FieldDef {
                    name: "b".into(),
                    offset_bits: 16,
                    ty: CType::int16(),
                },
            ],
        }
    }

    fn carrier() -> Expr {
        Expr::variable("s", 32)
    }

    #[test]
    fn single_field_access_resolves_to_field_array() {
        let cfg = AnalysisConfig::default();
        let fields =
            resolve_aggregate_access(&two_shorts(), &carrier(), 0, 16, &CType::int16(), &cfg)
                .unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].access.value(), "__gtFIELD_a__gtAGG_pair[s]");
        assert_eq!(fields[0].bits, 16);
    }

    #[test]
    fn word_access_spans_both_fields_little_endian() {
        let cfg = AnalysisConfig::default();
        let fields =
            resolve_aggregate_access(&two_shorts(), &carrier(), 0, 32, &CType::int32(), &cfg)
                .unwrap();
        assert_eq!(fields.len(), 2);

        let combined = combine_fields(&fields, 0, 32, &cfg);
        assert_eq!(combined.bits(), 32);
        assert_eq!(
            combined.value(),
            "concat(__gtFIELD_b__gtAGG_pair[s], __gtFIELD_a__gtAGG_pair[s])"
        );
    }

    #[test]
    fn word_access_reverses_on_big_endian() {
        let cfg = AnalysisConfig {
            endianness: Endianness::Big,
            ..AnalysisConfig::default()
        };
        let fields =
            resolve_aggregate_access(&two_shorts(), &carrier(), 0, 32, &CType::int32(), &cfg)
                .unwrap();
        let combined = combine_fields(&fields, 0, 32, &cfg);
        assert_eq!(
            combined.value(),
            "concat(__gtFIELD_a__gtAGG_pair[s], __gtFIELD_b__gtAGG_pair[s])"
        );
    }

    #[test]
    fn straddling_access_extracts_slices() {
        let cfg = AnalysisConfig::default();
        // Middle 16 bits: high half of a, low half of b.
        let fields =
            resolve_aggregate_access(&two_shorts(), &carrier(), 8, 16, &CType::int16(), &cfg)
                .unwrap();
        let combined = combine_fields(&fields, 8, 16, &cfg);
        assert_eq!(combined.bits(), 16);
        assert_eq!(
            combined.value(),
            "concat(extract(__gtFIELD_b__gtAGG_pair[s], 0, 7), \
             extract(__gtFIELD_a__gtAGG_pair[s], 8, 15))"
        );
    }

    #[test]
    fn nested_aggregate_offsets_compose() {
        let cfg = AnalysisConfig::default();
        let outer = AggregateDef {
            name: "outer".into(),
            bits: 64,
            fields: vec![
                FieldDef {
                    name: "head".into(),
                    offset_bits: 0,
                    ty: CType::int32(),
                },
                FieldDef {
                    name: "inner".into(),
                    offset_bits: 32,
                    ty: CType::Aggregate(two_shorts()),
                },
            ],
        };
        let fields =
            resolve_aggregate_access(&outer, &carrier(), 48, 16, &CType::int16(), &cfg).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].access.value(), "__gtFIELD_b__gtAGG_pair[s]");
        assert_eq!(fields[0].start_bits, 48);
    }

    #[test]
    fn array_field_with_differing_element_expands_per_element() {
        let cfg = AnalysisConfig::default();
        let holder = AggregateDef {
            name: "holder".into(),
            bits: 64,
            fields: vec![FieldDef {
                name: "raw".into(),
                offset_bits: 0,
                ty: CType::array_of(CType::int16(), 4),
            }],
        };
        let fields =
            resolve_aggregate_access(&holder, &carrier(), 0, 32, &CType::int32(), &cfg).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].access.value(), "__gtFIELD_raw_0__gtAGG_holder[s]");
        assert_eq!(fields[1].access.value(), "__gtFIELD_raw_1__gtAGG_holder[s]");
    }

    #[test]
    fn partial_coverage_zero_pads_the_high_end() {
        let cfg = AnalysisConfig::default();
        let thin = AggregateDef {
            name: "thin".into(),
            bits: 16,
            fields: vec![FieldDef {
                name: "only".into(),
                offset_bits: 0,
                ty: CType::int16(),
            }],
        };
        let fields =
            resolve_aggregate_access(&thin, &carrier(), 0, 32, &CType::int32(), &cfg).unwrap();
        let combined = combine_fields(&fields, 0, 32, &cfg);
        assert_eq!(combined.bits(), 32);
        assert!(combined.value().starts_with("concat(0, "));
    }

    #[test]
    fn zero_offset_on_scalar_base_resolves_to_base() {
        let cfg = AnalysisConfig::default();
        let mut path = Path::new(vec![BlockId(0)]);
        let access = Expr::array_access(
            Expr::array_variable("a", 32).with_ctype(CType::array_of(CType::int32(), 8)),
            Expr::variable("i", 32),
            32,
        );
        let e = Expr::offset(access.clone(), Expr::constant(0, 32));
        let resolved = resolve_offsets(
            &e,
            DerefMode::FieldAccess,
            32,
            &CType::int32(),
            &mut path,
            &cfg,
        )
        .unwrap();
        assert_eq!(resolved, access);
    }

    #[test]
    fn nonzero_residual_offset_is_preserved() {
        let cfg = AnalysisConfig::default();
        let mut path = Path::new(vec![BlockId(0)]);
        let base = Expr::array_access(
            Expr::array_variable("a", 32).with_ctype(CType::array_of(CType::int32(), 8)),
            Expr::constant(0, 32),
            32,
        );
        let e = Expr::offset(base, Expr::constant(8, 32));
        let resolved = resolve_offsets(
            &e,
            DerefMode::FieldAccess,
            32,
            &CType::int32(),
            &mut path,
            &cfg,
        )
        .unwrap();
        assert_eq!(resolved.op(), Op::Offset);
    }
}

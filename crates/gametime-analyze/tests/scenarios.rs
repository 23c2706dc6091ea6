//! End-to-end path analysis scenarios, built through the IR builder.

use gametime_analyze::{analyze_path, artifacts, AnalyzeError};
use gametime_core::{
    AnalysisConfig, BlockId, CType, CmpKind, Endianness, Expr, FieldDef, Instr, InstrId,
    InstrKind, Op, Operand, ValueOp,
};

fn cfg() -> AnalysisConfig {
    AnalysisConfig::default()
}

#[test]
fn empty_path_yields_a_single_true_condition() {
    let mut unit = gametime_core::FunctionUnit::new("empty");
    unit.add_block(BlockId(0)).unwrap();

    let path = analyze_path(&unit, &cfg(), vec![BlockId(0)]).unwrap();

    assert_eq!(path.conditions().len(), 1);
    assert_eq!(path.conditions()[0].expr.op(), Op::True);
    assert_eq!(path.conditions()[0].block, BlockId(0));
    assert!(path.array_dimensions().is_empty());
}

#[test]
fn constant_divisor_still_gets_a_nonzero_guard() {
    // y = x / 4 on a 32-bit machine.
    let mut unit = gametime_core::FunctionUnit::new("divide");
    unit.add_block(BlockId(0)).unwrap();

    let x = Operand::new(unit.fresh_operand_id(), "x", CType::int32(), 32);
    let four = Operand::int_immediate(unit.fresh_operand_id(), 4, CType::int32(), 32);
    let t1 = Operand::new(unit.fresh_operand_id(), "t1", CType::int32(), 32).temporary();
    let div_id = unit
        .push_instr(
            BlockId(0),
            Instr::new(InstrKind::Value(ValueOp::Div), 3)
                .dst(t1)
                .src(x)
                .src(four),
        )
        .unwrap();

    let t1_use = Operand::new(unit.fresh_operand_id(), "t1", CType::int32(), 32)
        .temporary()
        .defined_by(div_id);
    let y = Operand::new(unit.fresh_operand_id(), "y", CType::int32(), 32)
        .defined_by(InstrId(1));
    unit.push_instr(
        BlockId(0),
        Instr::new(InstrKind::Value(ValueOp::Assign), 4)
            .dst(y)
            .src(t1_use),
    )
    .unwrap();

    let path = analyze_path(&unit, &cfg(), vec![BlockId(0)]).unwrap();

    let values: Vec<&str> = path.conditions().iter().map(|c| c.expr.value()).collect();
    assert_eq!(values, ["(y<1> == (x / 4))", "(4 != 0)"]);
}

#[test]
fn fixed_array_subscript_gets_bounds_and_select() {
    // y = p[i] with p of type int[8].
    let mut unit = gametime_core::FunctionUnit::new("subscript");
    unit.add_block(BlockId(0)).unwrap();

    let p = Operand::new(
        unit.fresh_operand_id(),
        "p",
        CType::array_of(CType::int32(), 8),
        32,
    );
    let i = Operand::new(unit.fresh_operand_id(), "i", CType::int32(), 32);
    let t2 = Operand::new(unit.fresh_operand_id(), "t2", CType::int32(), 32).temporary();
    let sub_id = unit
        .push_instr(
            BlockId(0),
            Instr::new(InstrKind::Value(ValueOp::Subscript), 7)
                .dst(t2)
                .src(p)
                .src(i),
        )
        .unwrap();

    let t2_use = Operand::new(unit.fresh_operand_id(), "t2", CType::int32(), 32)
        .temporary()
        .defined_by(sub_id);
    let y = Operand::new(unit.fresh_operand_id(), "y", CType::int32(), 32)
        .defined_by(InstrId(1));
    unit.push_instr(
        BlockId(0),
        Instr::new(InstrKind::Value(ValueOp::Assign), 8)
            .dst(y)
            .src(t2_use),
    )
    .unwrap();

    let path = analyze_path(&unit, &cfg(), vec![BlockId(0)]).unwrap();

    let values: Vec<&str> = path.conditions().iter().map(|c| c.expr.value()).collect();
    assert_eq!(
        values,
        [
            "(y<1> == select(p, __gtINDEX0))",
            "(__gtINDEX0 == i)",
            "((0 <= __gtINDEX0) && (__gtINDEX0 < 8))",
        ]
    );
    assert_eq!(path.array_dimensions()["p"], vec![32, 32]);
    assert_eq!(path.array_accesses().len(), 1);
    assert_eq!(path.array_accesses()[0].1, vec![0]);
    assert_eq!(path.temporary_index_expressions()[&0].value(), "i");
}

#[test]
fn address_taken_assignment_flows_through_the_alias_table() {
    // int x; int *p = &x; *p = 7;
    let mut unit = gametime_core::FunctionUnit::new("addressed");
    unit.add_block(BlockId(0)).unwrap();

    let ptr_ty = CType::pointer_to(CType::int32());
    let addr_x = Operand::new(unit.fresh_operand_id(), "x", ptr_ty.clone(), 32).address_of();
    let p_dst =
        Operand::new(unit.fresh_operand_id(), "p", ptr_ty.clone(), 32).defined_by(InstrId(0));
    unit.push_instr(
        BlockId(0),
        Instr::new(InstrKind::Value(ValueOp::Assign), 2)
            .dst(p_dst)
            .src(addr_x),
    )
    .unwrap();

    let p_use =
        Operand::new(unit.fresh_operand_id(), "p", ptr_ty.clone(), 32).defined_by(InstrId(0));
    let store_dst = Operand::memory(unit.fresh_operand_id(), p_use, 0, CType::int32(), 32)
        .defined_by(InstrId(1));
    let seven = Operand::int_immediate(unit.fresh_operand_id(), 7, CType::int32(), 32);
    unit.push_instr(
        BlockId(0),
        Instr::new(InstrKind::Value(ValueOp::Assign), 3)
            .dst(store_dst)
            .src(seven),
    )
    .unwrap();

    let path = analyze_path(&unit, &cfg(), vec![BlockId(0)]).unwrap();

    // The promotion point asserted *p_tmp = x, and the store through the
    // pointer lowered to a plain versioned assignment, not a pointer write.
    let values: Vec<&str> = path.conditions().iter().map(|c| c.expr.value()).collect();
    assert_eq!(
        values,
        [
            "(select(__gtPTR0, __gtINDEX0) == x)",
            "(x<1> == 7)",
            "(__gtINDEX0 == 0)",
        ]
    );
    let x_leaf = Expr::variable("x", 32);
    assert_eq!(
        path.address_taken().get(&x_leaf).map(|p| p.value()),
        Some("__gtPTR0")
    );
}

fn pair_aggregate() -> CType {
    CType::Aggregate(gametime_core::AggregateDef {
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
    })
}

fn word_access_unit() -> gametime_core::FunctionUnit {
    // y = *(int *)sp where sp points to a two-short pair.
    let mut unit = gametime_core::FunctionUnit::new("word_access");
    unit.add_block(BlockId(0)).unwrap();

    let sp = Operand::new(
        unit.fresh_operand_id(),
        "sp",
        CType::pointer_to(pair_aggregate()),
        32,
    );
    let load = Operand::memory(unit.fresh_operand_id(), sp, 0, CType::int32(), 32);
    let y = Operand::new(unit.fresh_operand_id(), "y", CType::int32(), 32)
        .defined_by(InstrId(0));
    unit.push_instr(
        BlockId(0),
        Instr::new(InstrKind::Value(ValueOp::Assign), 5)
            .dst(y)
            .src(load),
    )
    .unwrap();
    unit
}

#[test]
fn aggregate_word_access_concatenates_little_endian() {
    let unit = word_access_unit();
    let path = analyze_path(&unit, &cfg(), vec![BlockId(0)]).unwrap();

    assert_eq!(
        path.conditions()[0].expr.value(),
        "(y<1> == concat(select(__gtFIELD_b__gtAGG_pair, __gtINDEX0), \
         select(__gtFIELD_a__gtAGG_pair, __gtINDEX1)))"
    );
}

#[test]
fn aggregate_word_access_concatenates_big_endian() {
    let unit = word_access_unit();
    let config = AnalysisConfig {
        endianness: Endianness::Big,
        ..AnalysisConfig::default()
    };
    let path = analyze_path(&unit, &config, vec![BlockId(0)]).unwrap();

    assert_eq!(
        path.conditions()[0].expr.value(),
        "(y<1> == concat(select(__gtFIELD_a__gtAGG_pair, __gtINDEX0), \
         select(__gtFIELD_b__gtAGG_pair, __gtINDEX1)))"
    );
}

fn two_branch_unit() -> gametime_core::FunctionUnit {
    // block 0: if (x < y) goto 1 else 3
    // block 1: if (a == b) goto 4 else 2
    // block 2: join
    let mut unit = gametime_core::FunctionUnit::new("branches");
    for b in 0..5 {
        unit.add_block(BlockId(b)).unwrap();
    }
    for (from, to) in [(0, 1), (0, 3), (1, 4), (1, 2)] {
        unit.add_edge(BlockId(from), BlockId(to)).unwrap();
    }

    let x = Operand::new(unit.fresh_operand_id(), "x", CType::int32(), 32);
    let y = Operand::new(unit.fresh_operand_id(), "y", CType::int32(), 32);
    let t1 = Operand::new(unit.fresh_operand_id(), "t1", CType::int32(), 32).temporary();
    let cmp0 = unit
        .push_instr(
            BlockId(0),
            Instr::new(InstrKind::Compare(CmpKind::Lt), 10)
                .dst(t1)
                .src(x)
                .src(y),
        )
        .unwrap();
    let t1_use = Operand::new(unit.fresh_operand_id(), "t1", CType::int32(), 32)
        .temporary()
        .defined_by(cmp0);
    unit.push_instr(
        BlockId(0),
        Instr::new(
            InstrKind::Branch {
                true_target: BlockId(1),
                false_target: BlockId(3),
            },
            10,
        )
        .src(t1_use),
    )
    .unwrap();

    let a = Operand::new(unit.fresh_operand_id(), "a", CType::int32(), 32);
    let b = Operand::new(unit.fresh_operand_id(), "b", CType::int32(), 32);
    let t2 = Operand::new(unit.fresh_operand_id(), "t2", CType::int32(), 32).temporary();
    let cmp1 = unit
        .push_instr(
            BlockId(1),
            Instr::new(InstrKind::Compare(CmpKind::Eq), 14)
                .dst(t2)
                .src(a)
                .src(b),
        )
        .unwrap();
    let t2_use = Operand::new(unit.fresh_operand_id(), "t2", CType::int32(), 32)
        .temporary()
        .defined_by(cmp1);
    unit.push_instr(
        BlockId(1),
        Instr::new(
            InstrKind::Branch {
                true_target: BlockId(4),
                false_target: BlockId(2),
            },
            14,
        )
        .src(t2_use),
    )
    .unwrap();
    unit
}

#[test]
fn branch_directions_reflect_in_conditions_and_artifacts() {
    let unit = two_branch_unit();
    let path = analyze_path(&unit, &cfg(), vec![BlockId(0), BlockId(1), BlockId(2)]).unwrap();

    let values: Vec<&str> = path.conditions().iter().map(|c| c.expr.value()).collect();
    assert_eq!(values, ["(x < y)", "(! (a == b))"]);
    assert_eq!(path.conditions()[0].block, BlockId(0));
    assert_eq!(path.conditions()[1].block, BlockId(1));

    let dir = tempfile::tempdir().unwrap();
    let edges = dir.path().join("edges.txt");
    artifacts::write_condition_edges(&path, |b| i64::from(b.0), |b| i64::from(b.0), &edges)
        .unwrap();
    assert_eq!(
        std::fs::read_to_string(&edges).unwrap(),
        "0: 0 1\n1: 1 2\n"
    );

    let directions = dir.path().join("directions.txt");
    artifacts::write_branch_directions(&path, &directions).unwrap();
    assert_eq!(
        std::fs::read_to_string(&directions).unwrap(),
        "10: True\n14: False\n"
    );

    let lines = dir.path().join("lines.txt");
    artifacts::write_line_numbers(&path, &lines).unwrap();
    assert_eq!(std::fs::read_to_string(&lines).unwrap(), "10 14\n");
}

#[test]
fn array_store_renames_and_stores() {
    // a[i] = v, via pointer arithmetic and a memory destination.
    let mut unit = gametime_core::FunctionUnit::new("store");
    unit.add_block(BlockId(0)).unwrap();

    let a = Operand::new(
        unit.fresh_operand_id(),
        "a",
        CType::array_of(CType::int32(), 4),
        32,
    );
    let i = Operand::new(unit.fresh_operand_id(), "i", CType::int32(), 32);
    let t5 = Operand::new(
        unit.fresh_operand_id(),
        "t5",
        CType::pointer_to(CType::int32()),
        32,
    )
    .temporary();
    let add_id = unit
        .push_instr(
            BlockId(0),
            Instr::new(InstrKind::Value(ValueOp::Add), 20)
                .dst(t5)
                .src(a)
                .src(i),
        )
        .unwrap();

    let t5_use = Operand::new(
        unit.fresh_operand_id(),
        "t5",
        CType::pointer_to(CType::int32()),
        32,
    )
    .temporary()
    .defined_by(add_id);
    let store_dst = Operand::memory(unit.fresh_operand_id(), t5_use, 0, CType::int32(), 32)
        .defined_by(InstrId(1));
    let v = Operand::new(unit.fresh_operand_id(), "v", CType::int32(), 32);
    unit.push_instr(
        BlockId(0),
        Instr::new(InstrKind::Value(ValueOp::Assign), 21)
            .dst(store_dst)
            .src(v),
    )
    .unwrap();

    let path = analyze_path(&unit, &cfg(), vec![BlockId(0)]).unwrap();

    let values: Vec<&str> = path.conditions().iter().map(|c| c.expr.value()).collect();
    assert_eq!(
        values,
        [
            "(a<1> == store(a, __gtINDEX0, v))",
            "(__gtINDEX0 == i)",
            "((0 <= __gtINDEX0) && (__gtINDEX0 < 4))",
        ]
    );
    assert_eq!(path.array_accesses()[0].1, vec![0]);
}

#[test]
fn phi_selects_the_latest_on_path_definition() {
    // Diamond: the phi picks the arm the path went through.
    let mut unit = gametime_core::FunctionUnit::new("phi");
    for b in 0..4 {
        unit.add_block(BlockId(b)).unwrap();
    }
    for (from, to) in [(0, 1), (0, 2), (1, 3), (2, 3)] {
        unit.add_edge(BlockId(from), BlockId(to)).unwrap();
    }

    let c = Operand::new(unit.fresh_operand_id(), "c", CType::int32(), 32);
    let zero = Operand::int_immediate(unit.fresh_operand_id(), 0, CType::int32(), 32);
    let t0 = Operand::new(unit.fresh_operand_id(), "t0", CType::int32(), 32).temporary();
    let cmp = unit
        .push_instr(
            BlockId(0),
            Instr::new(InstrKind::Compare(CmpKind::Ne), 30)
                .dst(t0)
                .src(c)
                .src(zero),
        )
        .unwrap();
    let t0_use = Operand::new(unit.fresh_operand_id(), "t0", CType::int32(), 32)
        .temporary()
        .defined_by(cmp);
    unit.push_instr(
        BlockId(0),
        Instr::new(
            InstrKind::Branch {
                true_target: BlockId(1),
                false_target: BlockId(2),
            },
            30,
        )
        .src(t0_use),
    )
    .unwrap();

    // Block 1: t1 = 5; block 2: t2 = 9.
    let t1 = Operand::new(unit.fresh_operand_id(), "t1", CType::int32(), 32).temporary();
    let five = Operand::int_immediate(unit.fresh_operand_id(), 5, CType::int32(), 32);
    let t1_def = unit
        .push_instr(
            BlockId(1),
            Instr::new(InstrKind::Value(ValueOp::Assign), 31)
                .dst(t1)
                .src(five),
        )
        .unwrap();
    let t2 = Operand::new(unit.fresh_operand_id(), "t2", CType::int32(), 32).temporary();
    let nine = Operand::int_immediate(unit.fresh_operand_id(), 9, CType::int32(), 32);
    let t2_def = unit
        .push_instr(
            BlockId(2),
            Instr::new(InstrKind::Value(ValueOp::Assign), 32)
                .dst(t2)
                .src(nine),
        )
        .unwrap();

    // Block 3: t3 = phi(t1 from 1, t2 from 2); y = t3.
    let t1_use = Operand::new(unit.fresh_operand_id(), "t1", CType::int32(), 32)
        .temporary()
        .defined_by(t1_def);
    let t2_use = Operand::new(unit.fresh_operand_id(), "t2", CType::int32(), 32)
        .temporary()
        .defined_by(t2_def);
    let t3 = Operand::new(unit.fresh_operand_id(), "t3", CType::int32(), 32).temporary();
    let phi = unit
        .push_instr(
            BlockId(3),
            Instr::new(
                InstrKind::Phi {
                    blocks: vec![BlockId(1), BlockId(2)],
                },
                33,
            )
            .dst(t3)
            .src(t1_use)
            .src(t2_use),
        )
        .unwrap();
    let t3_use = Operand::new(unit.fresh_operand_id(), "t3", CType::int32(), 32)
        .temporary()
        .defined_by(phi);
    let y = Operand::new(unit.fresh_operand_id(), "y", CType::int32(), 32)
        .defined_by(InstrId(5));
    unit.push_instr(
        BlockId(3),
        Instr::new(InstrKind::Value(ValueOp::Assign), 34)
            .dst(y)
            .src(t3_use),
    )
    .unwrap();

    // False arm: the phi resolves to block 2's definition.
    let path = analyze_path(&unit, &cfg(), vec![BlockId(0), BlockId(2), BlockId(3)]).unwrap();
    let values: Vec<&str> = path.conditions().iter().map(|c| c.expr.value()).collect();
    assert_eq!(values, ["(! (c != 0))", "(y<1> == 9)"]);
}

#[test]
fn assume_calls_become_nonzero_conditions() {
    let mut unit = gametime_core::FunctionUnit::new("assumes");
    unit.add_block(BlockId(0)).unwrap();

    let arg = Operand::new(unit.fresh_operand_id(), "x", CType::int32(), 32);
    unit.push_instr(
        BlockId(0),
        Instr::new(
            InstrKind::Call {
                callee: "gt_assume".into(),
            },
            40,
        )
        .src(arg),
    )
    .unwrap();

    let path = analyze_path(&unit, &cfg(), vec![BlockId(0)]).unwrap();
    assert_eq!(path.conditions()[0].expr.value(), "(x != 0)");
}

#[test]
fn external_calls_become_per_site_symbols() {
    // y = rand() at line 12.
    let mut unit = gametime_core::FunctionUnit::new("efc");
    unit.add_block(BlockId(0)).unwrap();

    let t7 = Operand::new(unit.fresh_operand_id(), "t7", CType::int32(), 32).temporary();
    let call = unit
        .push_instr(
            BlockId(0),
            Instr::new(
                InstrKind::Call {
                    callee: "rand".into(),
                },
                12,
            )
            .dst(t7),
        )
        .unwrap();
    let t7_use = Operand::new(unit.fresh_operand_id(), "t7", CType::int32(), 32)
        .temporary()
        .defined_by(call);
    let y = Operand::new(unit.fresh_operand_id(), "y", CType::int32(), 32)
        .defined_by(InstrId(1));
    unit.push_instr(
        BlockId(0),
        Instr::new(InstrKind::Value(ValueOp::Assign), 12)
            .dst(y)
            .src(t7_use),
    )
    .unwrap();

    let path = analyze_path(&unit, &cfg(), vec![BlockId(0)]).unwrap();
    assert_eq!(
        path.conditions()[0].expr.value(),
        "(y<1> == __gtEFC_rand@12)"
    );
}

#[test]
fn narrowing_conversion_extracts_low_bits() {
    // char c = (char) x;
    let mut unit = gametime_core::FunctionUnit::new("convert");
    unit.add_block(BlockId(0)).unwrap();

    let x = Operand::new(unit.fresh_operand_id(), "x", CType::int32(), 32);
    let c = Operand::new(unit.fresh_operand_id(), "c", CType::int8(), 8)
        .defined_by(InstrId(0));
    unit.push_instr(
        BlockId(0),
        Instr::new(InstrKind::Value(ValueOp::Convert), 50)
            .dst(c)
            .src(x),
    )
    .unwrap();

    let path = analyze_path(&unit, &cfg(), vec![BlockId(0)]).unwrap();
    assert_eq!(
        path.conditions()[0].expr.value(),
        "(c<1> == extract(x, 0, 7))"
    );
}

#[test]
fn switch_instructions_are_a_fatal_input_error() {
    let mut unit = gametime_core::FunctionUnit::new("switchy");
    unit.add_block(BlockId(0)).unwrap();
    unit.push_instr(BlockId(0), Instr::new(InstrKind::Switch, 60))
        .unwrap();

    let err = analyze_path(&unit, &cfg(), vec![BlockId(0)]).unwrap_err();
    assert!(matches!(
        err,
        AnalyzeError::SwitchInstruction { line: 60 }
    ));
}

#[test]
fn goto_terminated_blocks_add_no_conditions() {
    // Straight-line transfer: x = 1; goto; y = 2. The jump contributes
    // nothing to the condition list and records no branch direction.
    let mut unit = gametime_core::FunctionUnit::new("straight");
    unit.add_block(BlockId(0)).unwrap();
    unit.add_block(BlockId(1)).unwrap();
    unit.add_edge(BlockId(0), BlockId(1)).unwrap();

    let one = Operand::int_immediate(unit.fresh_operand_id(), 1, CType::int32(), 32);
    let x = Operand::new(unit.fresh_operand_id(), "x", CType::int32(), 32)
        .defined_by(InstrId(0));
    unit.push_instr(
        BlockId(0),
        Instr::new(InstrKind::Value(ValueOp::Assign), 80)
            .dst(x)
            .src(one),
    )
    .unwrap();
    unit.push_instr(
        BlockId(0),
        Instr::new(InstrKind::Goto { target: BlockId(1) }, 80),
    )
    .unwrap();

    let two = Operand::int_immediate(unit.fresh_operand_id(), 2, CType::int32(), 32);
    let y = Operand::new(unit.fresh_operand_id(), "y", CType::int32(), 32)
        .defined_by(InstrId(2));
    unit.push_instr(
        BlockId(1),
        Instr::new(InstrKind::Value(ValueOp::Assign), 81)
            .dst(y)
            .src(two),
    )
    .unwrap();

    let path = analyze_path(&unit, &cfg(), vec![BlockId(0), BlockId(1)]).unwrap();

    let values: Vec<&str> = path.conditions().iter().map(|c| c.expr.value()).collect();
    assert_eq!(values, ["(x<1> == 1)", "(y<1> == 2)"]);
    assert!(path.branch_records().is_empty());
}

#[test]
fn assignment_counters_version_reads_after_writes() {
    // x = x + 1; y = x;  -> x<1> = x + 1, y<1> = x<1>.
    let mut unit = gametime_core::FunctionUnit::new("versions");
    unit.add_block(BlockId(0)).unwrap();

    let x_use = Operand::new(unit.fresh_operand_id(), "x", CType::int32(), 32);
    let one = Operand::int_immediate(unit.fresh_operand_id(), 1, CType::int32(), 32);
    let t1 = Operand::new(unit.fresh_operand_id(), "t1", CType::int32(), 32).temporary();
    let add = unit
        .push_instr(
            BlockId(0),
            Instr::new(InstrKind::Value(ValueOp::Add), 70)
                .dst(t1)
                .src(x_use)
                .src(one),
        )
        .unwrap();
    let t1_use = Operand::new(unit.fresh_operand_id(), "t1", CType::int32(), 32)
        .temporary()
        .defined_by(add);
    let x_dst = Operand::new(unit.fresh_operand_id(), "x", CType::int32(), 32)
        .defined_by(InstrId(1));
    unit.push_instr(
        BlockId(0),
        Instr::new(InstrKind::Value(ValueOp::Assign), 70)
            .dst(x_dst)
            .src(t1_use),
    )
    .unwrap();

    let x_use2 = Operand::new(unit.fresh_operand_id(), "x", CType::int32(), 32);
    let y = Operand::new(unit.fresh_operand_id(), "y", CType::int32(), 32)
        .defined_by(InstrId(2));
    unit.push_instr(
        BlockId(0),
        Instr::new(InstrKind::Value(ValueOp::Assign), 71)
            .dst(y)
            .src(x_use2),
    )
    .unwrap();

    let path = analyze_path(&unit, &cfg(), vec![BlockId(0)]).unwrap();
    let values: Vec<&str> = path.conditions().iter().map(|c| c.expr.value()).collect();
    assert_eq!(values, ["(x<1> == (x + 1))", "(y<1> == x<1>)"]);
}

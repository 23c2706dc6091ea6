//! Function units: basic blocks, instructions, and the flow graph.
//!
//! [`FunctionUnit`] is the single entry point for constructing and querying
//! one function's SSA IR. Blocks and instructions are owned by the unit and
//! exposed through opaque ids and read-only accessors; the flow graph is a
//! private petgraph [`DiGraph`] queried through `successors`/`predecessors`.
//!
//! [`Program`] is the top-level container mapping function names to units.

use std::collections::HashMap;

use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::{BlockId, InstrId, OperandId};
use crate::instr::{Instr, InstrKind, Operand};

/// A basic block: an ordered run of instructions with a single entry and a
/// single exit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BlockId,
    instrs: Vec<InstrId>,
}

impl BasicBlock {
    /// Instruction ids in block order.
    pub fn instr_ids(&self) -> &[InstrId] {
        &self.instrs
    }
}

/// One function's SSA IR with its flow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionUnit {
    name: String,
    blocks: IndexMap<BlockId, BasicBlock>,
    /// Instruction arena; `InstrId` indexes into it.
    instrs: Vec<Instr>,
    /// Flow graph over blocks.
    graph: DiGraph<BlockId, (), u32>,
    nodes: HashMap<BlockId, NodeIndex<u32>>,
    next_operand: u32,
}

impl FunctionUnit {
    pub fn new(name: impl Into<String>) -> Self {
        FunctionUnit {
            name: name.into(),
            blocks: IndexMap::new(),
            instrs: Vec::new(),
            graph: DiGraph::default(),
            nodes: HashMap::new(),
            next_operand: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // -----------------------------------------------------------------------
    // Builder methods (used by the IR producer and by tests)
    // -----------------------------------------------------------------------

    /// Adds an empty block.
    pub fn add_block(&mut self, id: BlockId) -> Result<(), CoreError> {
        if self.blocks.contains_key(&id) {
            return Err(CoreError::DuplicateBlock { id });
        }
        self.blocks.insert(id, BasicBlock { id, instrs: Vec::new() });
        let node = self.graph.add_node(id);
        self.nodes.insert(id, node);
        Ok(())
    }

    /// Adds a flow edge between two existing blocks.
    pub fn add_edge(&mut self, from: BlockId, to: BlockId) -> Result<(), CoreError> {
        let a = *self
            .nodes
            .get(&from)
            .ok_or(CoreError::UnknownBlock { id: from })?;
        let b = *self
            .nodes
            .get(&to)
            .ok_or(CoreError::UnknownBlock { id: to })?;
        self.graph.add_edge(a, b, ());
        Ok(())
    }

    /// Appends an instruction to a block, stamping its parent block id.
    pub fn push_instr(&mut self, block: BlockId, mut instr: Instr) -> Result<InstrId, CoreError> {
        if !self.blocks.contains_key(&block) {
            return Err(CoreError::UnknownBlock { id: block });
        }
        instr.block = block;
        let id = InstrId(self.instrs.len() as u32);
        self.instrs.push(instr);
        self.blocks
            .get_mut(&block)
            .expect("checked above")
            .instrs
            .push(id);
        Ok(id)
    }

    /// Hands out a fresh operand identity.
    pub fn fresh_operand_id(&mut self) -> OperandId {
        let id = OperandId(self.next_operand);
        self.next_operand += 1;
        id
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(&id)
    }

    pub fn contains_block(&self, id: BlockId) -> bool {
        self.blocks.contains_key(&id)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.blocks.values()
    }

    pub fn instr(&self, id: InstrId) -> Option<&Instr> {
        self.instrs.get(id.0 as usize)
    }

    /// Instructions of a block in order. Empty for an unknown block.
    pub fn instrs_of(&self, block: BlockId) -> impl Iterator<Item = &Instr> {
        self.blocks
            .get(&block)
            .into_iter()
            .flat_map(|b| b.instrs.iter())
            .filter_map(|id| self.instr(*id))
    }

    /// The block's final instruction when it transfers control.
    pub fn terminator(&self, block: BlockId) -> Option<&Instr> {
        let last = *self.blocks.get(&block)?.instrs.last()?;
        let instr = self.instr(last)?;
        match instr.kind {
            InstrKind::Goto { .. } | InstrKind::Branch { .. } | InstrKind::Switch => Some(instr),
            _ => None,
        }
    }

    pub fn successors(&self, block: BlockId) -> Vec<BlockId> {
        match self.nodes.get(&block) {
            Some(&node) => self
                .graph
                .neighbors_directed(node, Direction::Outgoing)
                .map(|n| self.graph[n])
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn predecessors(&self, block: BlockId) -> Vec<BlockId> {
        match self.nodes.get(&block) {
            Some(&node) => self
                .graph
                .neighbors_directed(node, Direction::Incoming)
                .map(|n| self.graph[n])
                .collect(),
            None => Vec::new(),
        }
    }

    /// The defining instruction of an operand, through its def link.
    pub fn def_of(&self, operand: &Operand) -> Option<&Instr> {
        operand.def.and_then(|id| self.instr(id))
    }
}

/// Top-level container mapping function names to their units.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    units: IndexMap<String, FunctionUnit>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_unit(&mut self, unit: FunctionUnit) {
        self.units.insert(unit.name().to_string(), unit);
    }

    /// Looks up a unit by function name.
    pub fn unit(&self, name: &str) -> Result<&FunctionUnit, CoreError> {
        self.units.get(name).ok_or_else(|| CoreError::UnitNotFound {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctype::CType;
    use crate::instr::ValueOp;

    fn diamond() -> FunctionUnit {
        // 0 -> {1, 2} -> 3
        let mut unit = FunctionUnit::new("f");
        for b in 0..4 {
            unit.add_block(BlockId(b)).unwrap();
        }
        unit.add_edge(BlockId(0), BlockId(1)).unwrap();
        unit.add_edge(BlockId(0), BlockId(2)).unwrap();
        unit.add_edge(BlockId(1), BlockId(3)).unwrap();
        unit.add_edge(BlockId(2), BlockId(3)).unwrap();
        unit
    }

    #[test]
    fn duplicate_block_is_an_error() {
        let mut unit = FunctionUnit::new("f");
        unit.add_block(BlockId(0)).unwrap();
        assert!(matches!(
            unit.add_block(BlockId(0)),
            Err(CoreError::DuplicateBlock { .. })
        ));
    }

    #[test]
    fn edge_to_unknown_block_is_an_error() {
        let mut unit = FunctionUnit::new("f");
        unit.add_block(BlockId(0)).unwrap();
        assert!(matches!(
            unit.add_edge(BlockId(0), BlockId(9)),
            Err(CoreError::UnknownBlock { .. })
        ));
    }

    #[test]
    fn successors_and_predecessors() {
        let unit = diamond();
        let mut succ = unit.successors(BlockId(0));
        succ.sort();
        assert_eq!(succ, [BlockId(1), BlockId(2)]);

        let mut pred = unit.predecessors(BlockId(3));
        pred.sort();
        assert_eq!(pred, [BlockId(1), BlockId(2)]);
    }

    #[test]
    fn push_instr_stamps_block() {
        let mut unit = diamond();
        let id = unit
            .push_instr(
                BlockId(1),
                Instr::new(InstrKind::Value(ValueOp::Assign), 5),
            )
            .unwrap();
        assert_eq!(unit.instr(id).unwrap().block, BlockId(1));
        assert_eq!(unit.instrs_of(BlockId(1)).count(), 1);
    }

    #[test]
    fn terminator_requires_control_transfer() {
        let mut unit = diamond();
        unit.push_instr(BlockId(0), Instr::new(InstrKind::Value(ValueOp::Assign), 1))
            .unwrap();
        assert!(unit.terminator(BlockId(0)).is_none());

        unit.push_instr(
            BlockId(0),
            Instr::new(
                InstrKind::Branch {
                    true_target: BlockId(1),
                    false_target: BlockId(2),
                },
                1,
            ),
        )
        .unwrap();
        assert!(unit.terminator(BlockId(0)).unwrap().is_branch());

        // An unconditional jump is a terminator too.
        unit.push_instr(
            BlockId(1),
            Instr::new(InstrKind::Goto { target: BlockId(3) }, 2),
        )
        .unwrap();
        assert!(matches!(
            unit.terminator(BlockId(1)).unwrap().kind,
            InstrKind::Goto { .. }
        ));
    }

    #[test]
    fn def_of_follows_the_link() {
        let mut unit = diamond();
        let def = unit
            .push_instr(BlockId(0), Instr::new(InstrKind::Value(ValueOp::Add), 2))
            .unwrap();
        let operand = Operand::new(unit.fresh_operand_id(), "t1", CType::int32(), 32)
            .temporary()
            .defined_by(def);
        assert_eq!(unit.def_of(&operand).unwrap().block, BlockId(0));
    }

    #[test]
    fn program_unit_lookup_failure() {
        let mut program = Program::new();
        program.add_unit(FunctionUnit::new("main"));
        assert!(program.unit("main").is_ok());
        assert!(matches!(
            program.unit("missing"),
            Err(CoreError::UnitNotFound { .. })
        ));
    }
}

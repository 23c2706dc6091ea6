//! SSA IR instructions and operands.
//!
//! The analyzer consumes the producer's IR through this narrow data model:
//! opcode kind and subkind, ordered source/destination operands with
//! identity, line number, parent block, and per-operand metadata (bit-size,
//! source type, temporary / address-of / immediate flags, memory base and
//! field offset). Use operands link to their defining instruction by
//! [`InstrId`]; the analyzer never follows raw pointers into producer
//! structures.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::ctype::CType;
use crate::id::{BlockId, InstrId, OperandId};

/// An immediate operand value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Immediate {
    Int(i128),
    /// Floats are coerced to integers at ingest (with a warning); the
    /// analyzer never emits floating-point terms.
    Float(f64),
}

/// A memory reference: `*p` or `p->f`, as a base operand plus the bit
/// offset of the accessed field within the referent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRef {
    pub base: Box<Operand>,
    pub field_offset_bits: u64,
}

/// An instruction operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operand {
    /// Producer-assigned identity; the executor memoizes on this.
    pub id: OperandId,
    /// SSA name. For source-level variables this is the (possibly mangled)
    /// variable name; for compiler temporaries, the temporary's name.
    pub name: String,
    pub ty: CType,
    pub bits: u32,
    /// Compiler temporary (not a source-level variable).
    pub temporary: bool,
    /// The operand is `&name` rather than `name`.
    pub address_of: bool,
    pub immediate: Option<Immediate>,
    /// Present for memory operands.
    pub memory: Option<MemoryRef>,
    /// Defining instruction, if the producer resolved one.
    pub def: Option<InstrId>,
}

impl Operand {
    pub fn new(id: OperandId, name: impl Into<String>, ty: CType, bits: u32) -> Self {
        Operand {
            id,
            name: name.into(),
            ty,
            bits,
            temporary: false,
            address_of: false,
            immediate: None,
            memory: None,
            def: None,
        }
    }

    pub fn int_immediate(id: OperandId, value: i128, ty: CType, bits: u32) -> Self {
        let mut op = Operand::new(id, value.to_string(), ty, bits);
        op.immediate = Some(Immediate::Int(value));
        op
    }

    pub fn float_immediate(id: OperandId, value: f64, ty: CType, bits: u32) -> Self {
        let mut op = Operand::new(id, value.to_string(), ty, bits);
        op.immediate = Some(Immediate::Float(value));
        op
    }

    /// A memory operand dereferencing `base`, accessing `ty` at
    /// `field_offset_bits` within the referent.
    pub fn memory(
        id: OperandId,
        base: Operand,
        field_offset_bits: u64,
        ty: CType,
        bits: u32,
    ) -> Self {
        let mut op = Operand::new(id, format!("*{}", base.name), ty, bits);
        op.memory = Some(MemoryRef {
            base: Box::new(base),
            field_offset_bits,
        });
        op
    }

    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    pub fn address_of(mut self) -> Self {
        self.address_of = true;
        self
    }

    pub fn defined_by(mut self, instr: InstrId) -> Self {
        self.def = Some(instr);
        self
    }

    pub fn is_immediate(&self) -> bool {
        self.immediate.is_some()
    }

    pub fn is_memory(&self) -> bool {
        self.memory.is_some()
    }
}

/// Subkind of a value instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueOp {
    /// Plain copy `dst = src`.
    Assign,
    Add,
    Sub,
    Mul,
    /// Signed vs unsigned division is chosen from the operand types.
    Div,
    Rem,
    Neg,
    /// Bitwise complement `~x`.
    BitNot,
    /// Logical negation `!x`.
    Not,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    /// Logical vs arithmetic shift is chosen from the first operand's type.
    Shr,
    /// Scalar or pointer conversion (cast).
    Convert,
    /// Array subscript `p[i]`.
    Subscript,
}

/// Comparison subkind. Signedness and float variants are chosen from the
/// operand types when the expression is synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpKind {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Opcode kind of an instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstrKind {
    Value(ValueOp),
    Compare(CmpKind),
    Call { callee: String },
    /// SSA phi. `blocks[i]` is the defining block of `srcs[i]`.
    Phi { blocks: Vec<BlockId> },
    /// Function entry marker; operands defined here are inputs.
    Start,
    /// May-define marker. A chi of the start instruction marks a value
    /// that is live-in to the function.
    Chi,
    Label,
    Goto {
        target: BlockId,
    },
    Branch {
        true_target: BlockId,
        false_target: BlockId,
    },
    /// Switches must be lowered to if-chains upstream; encountering one is
    /// a fatal input error.
    Switch,
}

/// A single IR instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instr {
    pub kind: InstrKind,
    pub dsts: SmallVec<[Operand; 1]>,
    pub srcs: SmallVec<[Operand; 2]>,
    /// Source line number.
    pub line: u32,
    /// Parent basic block; set when the instruction is pushed into a unit.
    pub block: BlockId,
}

impl Instr {
    pub fn new(kind: InstrKind, line: u32) -> Self {
        Instr {
            kind,
            dsts: SmallVec::new(),
            srcs: SmallVec::new(),
            line,
            block: BlockId(0),
        }
    }

    pub fn dst(mut self, operand: Operand) -> Self {
        self.dsts.push(operand);
        self
    }

    pub fn src(mut self, operand: Operand) -> Self {
        self.srcs.push(operand);
        self
    }

    /// The first destination operand, if any.
    pub fn destination(&self) -> Option<&Operand> {
        self.dsts.first()
    }

    pub fn is_branch(&self) -> bool {
        matches!(self.kind, InstrKind::Branch { .. })
    }
}

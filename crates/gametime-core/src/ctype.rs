//! Source-level C type model.
//!
//! The analyzer consumes types through predicates (pointer / unmanaged
//! array / aggregate) and accessors (referent, element, field offset and
//! size). Types are structural values carried on operands and expressions;
//! nesting is by `Box`, so cloning a type clones its spine.
//!
//! Pointer bit-widths are not stored on the type: a pointer is always the
//! machine word wide, which lives in [`AnalysisConfig`](crate::config::AnalysisConfig).

use serde::{Deserialize, Serialize};

/// A source-level C type. Each variant represents a distinct kind of type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CType {
    /// `void` (function results that carry no value).
    Void,

    /// Integer or floating-point scalar.
    Scalar(ScalarType),

    /// Pointer to another type.
    Pointer { referent: Box<CType> },

    /// C array: `T name[N]`. `length` is `None` for arrays of unknown
    /// extent (e.g. a decayed formal parameter `T name[]`).
    UnmanagedArray {
        element: Box<CType>,
        length: Option<u64>,
    },

    /// Struct or union, with explicit per-field bit offsets so unions
    /// (overlapping fields) need no special casing.
    Aggregate(AggregateDef),
}

/// Scalar (primitive) types. Signedness is a property of the type, as in C;
/// the analyzer picks signed vs unsigned operators from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarType {
    pub bits: u32,
    pub signed: bool,
    pub float: bool,
}

/// Struct or union definition with ordered fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateDef {
    pub name: String,
    /// Total size in bits.
    pub bits: u64,
    pub fields: Vec<FieldDef>,
}

/// A single field within an aggregate definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    /// Offset of the field within the aggregate, in bits.
    pub offset_bits: u64,
    pub ty: CType,
}

impl CType {
    // -----------------------------------------------------------------------
    // Convenience constructors
    // -----------------------------------------------------------------------

    pub fn int(bits: u32, signed: bool) -> Self {
        CType::Scalar(ScalarType {
            bits,
            signed,
            float: false,
        })
    }

    pub fn int32() -> Self {
        Self::int(32, true)
    }

    pub fn uint32() -> Self {
        Self::int(32, false)
    }

    pub fn int16() -> Self {
        Self::int(16, true)
    }

    pub fn int8() -> Self {
        Self::int(8, true)
    }

    pub fn float(bits: u32) -> Self {
        CType::Scalar(ScalarType {
            bits,
            signed: true,
            float: true,
        })
    }

    pub fn pointer_to(referent: CType) -> Self {
        CType::Pointer {
            referent: Box::new(referent),
        }
    }

    pub fn array_of(element: CType, length: u64) -> Self {
        CType::UnmanagedArray {
            element: Box::new(element),
            length: Some(length),
        }
    }

    pub fn array_of_unknown(element: CType) -> Self {
        CType::UnmanagedArray {
            element: Box::new(element),
            length: None,
        }
    }

    // -----------------------------------------------------------------------
    // Predicates
    // -----------------------------------------------------------------------

    pub fn is_pointer(&self) -> bool {
        matches!(self, CType::Pointer { .. })
    }

    pub fn is_unmanaged_array(&self) -> bool {
        matches!(self, CType::UnmanagedArray { .. })
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, CType::Aggregate(_))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, CType::Scalar(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, CType::Scalar(s) if s.float)
    }

    /// Signedness used for operator selection. Pointers count as unsigned;
    /// everything non-scalar defaults to signed.
    pub fn is_signed(&self) -> bool {
        match self {
            CType::Scalar(s) => s.signed,
            CType::Pointer { .. } => false,
            _ => true,
        }
    }

    /// `true` for types an index can be applied to (pointer or array).
    pub fn is_indexable(&self) -> bool {
        self.is_pointer() || self.is_unmanaged_array()
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Referent of a pointer type.
    pub fn referent(&self) -> Option<&CType> {
        match self {
            CType::Pointer { referent } => Some(referent),
            _ => None,
        }
    }

    /// Element type of an unmanaged array.
    pub fn element(&self) -> Option<&CType> {
        match self {
            CType::UnmanagedArray { element, .. } => Some(element),
            _ => None,
        }
    }

    /// The type one indexing step reaches: pointer referent or array element.
    pub fn indexed(&self) -> Option<&CType> {
        match self {
            CType::Pointer { referent } => Some(referent),
            CType::UnmanagedArray { element, .. } => Some(element),
            _ => None,
        }
    }

    /// Declared length of a fixed-size array.
    pub fn array_length(&self) -> Option<u64> {
        match self {
            CType::UnmanagedArray { length, .. } => *length,
            _ => None,
        }
    }

    pub fn aggregate(&self) -> Option<&AggregateDef> {
        match self {
            CType::Aggregate(def) => Some(def),
            _ => None,
        }
    }

    /// Size of the type in bits. Pointers are `word_bits` wide; arrays of
    /// unknown extent report the width of a single element.
    pub fn bits(&self, word_bits: u32) -> u64 {
        match self {
            CType::Void => 0,
            CType::Scalar(s) => u64::from(s.bits),
            CType::Pointer { .. } => u64::from(word_bits),
            CType::UnmanagedArray { element, length } => {
                element.bits(word_bits) * length.unwrap_or(1)
            }
            CType::Aggregate(def) => def.bits,
        }
    }
}

impl AggregateDef {
    /// Fields whose bit range overlaps `[offset, offset + access_bits)`.
    pub fn fields_overlapping(&self, offset: u64, access_bits: u64, word_bits: u32) -> Vec<&FieldDef> {
        let end = offset + access_bits;
        self.fields
            .iter()
            .filter(|f| {
                let f_end = f.offset_bits + f.ty.bits(word_bits);
                f.offset_bits < end && offset < f_end
            })
            .collect()
    }
}

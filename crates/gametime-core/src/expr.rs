//! Immutable, typed, bit-accurate symbolic expression trees.
//!
//! An [`Expr`] is a value: `(operator, bit-size, value string, children,
//! optional source type)`. Trees are immutable once constructed; every
//! "mutation" returns a fresh tree. Cloning copies the tree, which keeps
//! sharing from ever leaking mutation.
//!
//! Equality is structural modulo alpha-renaming of [`Op::Function`]
//! formals: two function literals are equal when substituting the left
//! formals by the right formals makes the bodies equal. Hashing is
//! consistent with this equality -- bound formal occurrences hash by
//! binding position, not by name.
//!
//! The canonical rendering (`value`) is recomputed whenever children
//! change, e.g. `(x + y)`, `ite(c, a, b)`, `a[i]`, `(a . o)` for aggregate
//! access, and `(f (x, y) body)` for function literals. For nil-arity
//! leaves the rendering is the leaf's value itself and is authoritative
//! for hashing.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::ctype::CType;
use crate::error::CoreError;
use crate::op::{Arity, Op};

/// An immutable symbolic expression tree node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    op: Op,
    bits: u32,
    value: String,
    children: Vec<Expr>,
    ctype: Option<CType>,
}

impl Expr {
    // -----------------------------------------------------------------------
    // Leaf constructors
    // -----------------------------------------------------------------------

    /// A scalar variable leaf.
    pub fn variable(name: impl Into<String>, bits: u32) -> Self {
        Expr {
            op: Op::Variable,
            bits,
            value: name.into(),
            children: Vec::new(),
            ctype: None,
        }
    }

    /// An array variable leaf. `bits` is the element width.
    pub fn array_variable(name: impl Into<String>, bits: u32) -> Self {
        Expr {
            op: Op::ArrayVariable,
            bits,
            value: name.into(),
            children: Vec::new(),
            ctype: None,
        }
    }

    /// A constant leaf carrying the decimal rendering of `value`.
    pub fn constant(value: i128, bits: u32) -> Self {
        Expr {
            op: Op::Constant,
            bits,
            value: value.to_string(),
            children: Vec::new(),
            ctype: None,
        }
    }

    /// The boolean `true` leaf. Carries the machine word size so boolean
    /// results embed uniformly in bitvector contexts.
    pub fn truth(bits: u32) -> Self {
        Expr {
            op: Op::True,
            bits,
            value: "true".into(),
            children: Vec::new(),
            ctype: None,
        }
    }

    /// The boolean `false` leaf.
    pub fn falsity(bits: u32) -> Self {
        Expr {
            op: Op::False,
            bits,
            value: "false".into(),
            children: Vec::new(),
            ctype: None,
        }
    }

    // -----------------------------------------------------------------------
    // Internal node constructors
    // -----------------------------------------------------------------------

    /// Builds an expression from an operator and a child list, checking the
    /// operator's arity. Bit-size is derived from the children where the
    /// operator determines it; `bits` is used otherwise.
    pub fn new(op: Op, children: Vec<Expr>, bits: u32) -> Result<Self, CoreError> {
        let expected = match op.arity() {
            Arity::Nil => 0,
            Arity::Unary => 1,
            Arity::Binary => 2,
            Arity::Ternary => 3,
            Arity::Polynary => children.len().max(1),
        };
        if children.len() != expected {
            return Err(CoreError::ArityMismatch {
                op,
                expected,
                got: children.len(),
            });
        }
        Ok(Self::build(op, children, bits, None))
    }

    pub fn unary(op: Op, child: Expr) -> Self {
        debug_assert_eq!(op.arity(), Arity::Unary);
        let bits = child.bits;
        Self::build(op, vec![child], bits, None)
    }

    pub fn binary(op: Op, lhs: Expr, rhs: Expr) -> Self {
        debug_assert_eq!(op.arity(), Arity::Binary);
        debug_assert!(
            !(op.is_arithmetic() || op.is_bitwise() || op.is_comparison())
                || lhs.bits == rhs.bits,
            "bit-size mismatch under {op:?}: {} vs {}",
            lhs.bits,
            rhs.bits
        );
        let bits = lhs.bits;
        Self::build(op, vec![lhs, rhs], bits, None)
    }

    /// A comparison node. The result carries the machine word size (not 1)
    /// so boolean results get uniform bitvector treatment.
    pub fn compare(op: Op, lhs: Expr, rhs: Expr, word_bits: u32) -> Self {
        debug_assert!(op.is_comparison());
        Self::build(op, vec![lhs, rhs], word_bits, None)
    }

    pub fn ite(cond: Expr, then: Expr, els: Expr) -> Self {
        let bits = then.bits;
        Self::build(Op::Ite, vec![cond, then, els], bits, None)
    }

    /// `concat(hi, lo)`; the result width is the sum of the children's.
    pub fn concat(hi: Expr, lo: Expr) -> Self {
        Self::build(Op::Concat, vec![hi, lo], 0, None)
    }

    /// Zero-extension of `x` by `count` bits.
    pub fn zero_extend(x: Expr, count: u32) -> Self {
        let k = Expr::constant(i128::from(count), 32);
        Self::build(Op::ZeroExtend, vec![x, k], 0, None)
    }

    /// Sign-extension of `x` by `count` bits.
    pub fn sign_extend(x: Expr, count: u32) -> Self {
        let k = Expr::constant(i128::from(count), 32);
        Self::build(Op::SignExtend, vec![x, k], 0, None)
    }

    /// `extract(x, lo, hi)` yielding `hi - lo + 1` bits.
    pub fn bit_extract(x: Expr, lo: u32, hi: u32) -> Self {
        debug_assert!(hi >= lo, "bit_extract range is [lo, hi]");
        let lo = Expr::constant(i128::from(lo), 32);
        let hi = Expr::constant(i128::from(hi), 32);
        Self::build(Op::BitExtract, vec![x, lo, hi], 0, None)
    }

    /// An array access reference `a[i]`. `element_bits` is the width of the
    /// referenced element.
    pub fn array_access(array: Expr, index: Expr, element_bits: u32) -> Self {
        Self::build(Op::Array, vec![array, index], element_bits, None)
    }

    /// An aggregate/bit offset reference `(base . offset)`.
    pub fn offset(base: Expr, offset: Expr) -> Self {
        let bits = base.bits;
        Self::build(Op::Offset, vec![base, offset], bits, None)
    }

    /// A theory-of-arrays read `select(a, i)`.
    pub fn select(array: Expr, index: Expr, element_bits: u32) -> Self {
        Self::build(Op::Select, vec![array, index], element_bits, None)
    }

    /// A theory-of-arrays write `store(a, i, v)`.
    pub fn store(array: Expr, index: Expr, value: Expr) -> Self {
        let bits = array.bits;
        Self::build(Op::Store, vec![array, index, value], bits, None)
    }

    /// A function literal `(f (formals...) body)`. Formals must be
    /// [`Op::Variable`] leaves.
    pub fn function(formals: Vec<Expr>, body: Expr) -> Self {
        debug_assert!(formals.iter().all(|f| f.op == Op::Variable));
        let bits = body.bits;
        let mut children = formals;
        children.push(body);
        Self::build(Op::Function, children, bits, None)
    }

    /// A function application node `apply(f, args...)`.
    pub fn function_call(func: Expr, args: Vec<Expr>) -> Self {
        let bits = func.bits;
        let mut children = vec![func];
        children.extend(args);
        Self::build(Op::FunctionCall, children, bits, None)
    }

    /// Attaches a source-level type.
    pub fn with_ctype(mut self, ty: CType) -> Self {
        self.ctype = Some(ty);
        self
    }

    /// A copy of a nil-arity leaf under a new name, keeping operator,
    /// bit-size, and source type. Panics on internal nodes.
    pub fn renamed(&self, name: impl Into<String>) -> Expr {
        assert!(self.is_leaf(), "renamed applies to nil-arity leaves only");
        let mut leaf = self.clone();
        leaf.value = name.into();
        leaf
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// The canonical rendering. For nil-arity leaves this is the leaf value
    /// (variable name, decimal constant, `true`/`false`).
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn children(&self) -> &[Expr] {
        &self.children
    }

    pub fn ctype(&self) -> Option<&CType> {
        self.ctype.as_ref()
    }

    pub fn is_leaf(&self) -> bool {
        self.op.arity() == Arity::Nil
    }

    pub fn is_constant(&self) -> bool {
        self.op == Op::Constant
    }

    pub fn is_variable(&self) -> bool {
        self.op == Op::Variable
    }

    pub fn is_array_variable(&self) -> bool {
        self.op == Op::ArrayVariable
    }

    /// Integer value of a constant leaf.
    pub fn const_value(&self) -> Option<i128> {
        if self.op == Op::Constant {
            self.value.parse().ok()
        } else {
            None
        }
    }

    /// Parameter access. Panics on an out-of-range index: an out-of-range
    /// parameter index is a programmer error, not an input error.
    pub fn get_parameter(&self, index: usize) -> &Expr {
        assert!(
            index < self.children.len(),
            "parameter index {index} out of range for {:?} with {} children",
            self.op,
            self.children.len()
        );
        &self.children[index]
    }

    /// Returns a fresh expression with child `index` replaced and the
    /// bit-size and value rendering re-derived.
    pub fn update_parameter(&self, index: usize, child: Expr) -> Expr {
        assert!(
            index < self.children.len(),
            "parameter index {index} out of range for {:?} with {} children",
            self.op,
            self.children.len()
        );
        let mut children = self.children.clone();
        children[index] = child;
        Self::build(self.op, children, self.bits, self.ctype.clone())
    }

    /// Alpha-aware structural substitution: every subterm equal to `needle`
    /// becomes `replacement`. Returns a clone when the expression is a
    /// nil-arity leaf not equal to `needle`.
    pub fn replace(&self, needle: &Expr, replacement: &Expr) -> Expr {
        if self == needle {
            return replacement.clone();
        }
        if self.is_leaf() {
            return self.clone();
        }
        let children = self
            .children
            .iter()
            .map(|c| c.replace(needle, replacement))
            .collect();
        Self::build(self.op, children, self.bits, self.ctype.clone())
    }

    /// Rebuilds the tree with every nil-arity leaf passed through `f`;
    /// leaves for which `f` returns `None` are kept unchanged.
    pub fn map_leaves(&self, f: &mut impl FnMut(&Expr) -> Option<Expr>) -> Expr {
        if self.is_leaf() {
            return f(self).unwrap_or_else(|| self.clone());
        }
        let children = self.children.iter().map(|c| c.map_leaves(f)).collect();
        Self::build(self.op, children, self.bits, self.ctype.clone())
    }

    /// Whether `needle` occurs as a subterm.
    pub fn contains(&self, needle: &Expr) -> bool {
        self == needle || self.children.iter().any(|c| c.contains(needle))
    }

    /// Collects every [`Op::Variable`] and [`Op::ArrayVariable`] leaf, in
    /// left-to-right order. Function formals are not excluded; callers run
    /// this after function literals have been eliminated.
    pub fn leaf_variables(&self, out: &mut Vec<Expr>) {
        match self.op {
            Op::Variable | Op::ArrayVariable => out.push(self.clone()),
            _ => {
                for c in &self.children {
                    c.leaf_variables(out);
                }
            }
        }
    }

    /// Visits every subterm, outermost first.
    pub fn for_each_subterm(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        for c in &self.children {
            c.for_each_subterm(f);
        }
    }

    // -----------------------------------------------------------------------
    // Construction internals
    // -----------------------------------------------------------------------

    /// Derives the final bit-size and value rendering for an internal node.
    fn build(op: Op, children: Vec<Expr>, fallback_bits: u32, ctype: Option<CType>) -> Expr {
        let bits = match op {
            Op::Concat => children.iter().map(|c| c.bits).sum(),
            Op::ZeroExtend | Op::SignExtend => {
                let k = children[1].const_value().unwrap_or(0) as u32;
                children[0].bits + k
            }
            Op::BitExtract => {
                let lo = children[1].const_value().unwrap_or(0) as u32;
                let hi = children[2].const_value().unwrap_or(0) as u32;
                hi - lo + 1
            }
            Op::Ite => children[1].bits,
            Op::Negate | Op::BitComplement | Op::Address | Op::Not => children[0].bits,
            _ if op.is_arithmetic() || op.is_bitwise() => children[0].bits,
            Op::Function => children.last().map(|c| c.bits).unwrap_or(0),
            _ => fallback_bits,
        };
        let value = Self::render(op, &children);
        Expr {
            op,
            bits,
            value,
            children,
            ctype,
        }
    }

    /// The canonical S-expression-like rendering.
    fn render(op: Op, children: &[Expr]) -> String {
        let c = |i: usize| children[i].value.as_str();
        match op {
            Op::Array => format!("{}[{}]", c(0), c(1)),
            Op::Offset => format!("({} . {})", c(0), c(1)),
            Op::Ite => format!("ite({}, {}, {})", c(0), c(1), c(2)),
            Op::Store => format!("store({}, {}, {})", c(0), c(1), c(2)),
            Op::Select => format!("select({}, {})", c(0), c(1)),
            Op::BitExtract => format!("extract({}, {}, {})", c(0), c(1), c(2)),
            Op::ZeroExtend => format!("zext({}, {})", c(0), c(1)),
            Op::SignExtend => format!("sext({}, {})", c(0), c(1)),
            Op::Concat => format!("concat({}, {})", c(0), c(1)),
            Op::Function => {
                let n = children.len() - 1;
                let formals: Vec<&str> = children[..n].iter().map(|f| f.value.as_str()).collect();
                format!("(f ({}) {})", formals.join(", "), c(n))
            }
            Op::FunctionCall => {
                let args: Vec<&str> = children[1..].iter().map(|a| a.value.as_str()).collect();
                format!("apply({}, {})", c(0), args.join(", "))
            }
            _ => match op.arity() {
                Arity::Unary => format!("({} {})", op.symbol(), c(0)),
                Arity::Binary => format!("({} {} {})", c(0), op.symbol(), c(1)),
                _ => unreachable!("nil-arity operators carry their own value"),
            },
        }
    }

    /// Hashing helper that tracks formal bindings so alpha-equal function
    /// literals hash identically. `bound` holds `(name, bits)` of formals
    /// of enclosing function literals, innermost binding last.
    fn hash_bound<H: Hasher>(&self, bound: &mut Vec<(String, u32)>, state: &mut H) {
        self.op.hash(state);
        self.bits.hash(state);
        match self.op.arity() {
            Arity::Nil => {
                if self.op == Op::Variable {
                    if let Some(pos) = bound
                        .iter()
                        .rposition(|(n, b)| *n == self.value && *b == self.bits)
                    {
                        // Bound occurrence: hash by binding position.
                        state.write_u8(1);
                        pos.hash(state);
                        return;
                    }
                }
                state.write_u8(0);
                self.value.hash(state);
            }
            _ if self.op == Op::Function => {
                let n = self.children.len() - 1;
                for formal in &self.children[..n] {
                    bound.push((formal.value.clone(), formal.bits));
                }
                self.children[n].hash_bound(bound, state);
                bound.truncate(bound.len() - n);
            }
            _ => {
                self.children.len().hash(state);
                for c in &self.children {
                    c.hash_bound(bound, state);
                }
            }
        }
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        if self.op != other.op || self.bits != other.bits {
            return false;
        }
        if self.is_leaf() {
            return self.value == other.value;
        }
        if self.op == Op::Function {
            // Alpha-renaming: substitute each left formal with the
            // corresponding right formal, then compare bodies.
            if self.children.len() != other.children.len() {
                return false;
            }
            let n = self.children.len() - 1;
            for i in 0..n {
                if self.children[i].bits != other.children[i].bits {
                    return false;
                }
            }
            let mut body = self.children[n].clone();
            for i in 0..n {
                body = body.replace(&self.children[i], &other.children[i]);
            }
            return body == other.children[n];
        }
        self.children == other.children
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash_bound(&mut Vec::new(), state)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

//! Arithmetic and algebraic simplification.
//!
//! An operator-dispatched rewriter applied structurally, bottom-up:
//! constant folding, identity elimination, distribution of division and
//! remainder over constant-factor multiplications and sums (the rule that
//! undoes pointer arithmetic), `ite` pruning, and folding of equalities
//! between constants. Every rule strictly shrinks the term, so
//! simplification terminates and is idempotent.
//!
//! Double negation is deliberately not folded.

use gametime_core::{Expr, Op};

/// Returns the simplified form of `e`. The input is never mutated.
pub fn simplify(e: &Expr) -> Expr {
    if e.is_leaf() {
        return e.clone();
    }
    let mut node = e.clone();
    for i in 0..e.children().len() {
        node = node.update_parameter(i, simplify(e.get_parameter(i)));
    }
    match rewrite_root(&node) {
        Some(next) => simplify(&next),
        None => node,
    }
}

/// One root-level rewrite step, or `None` when the root is in normal form.
fn rewrite_root(e: &Expr) -> Option<Expr> {
    match e.op() {
        Op::Add => {
            let (a, b) = (e.get_parameter(0), e.get_parameter(1));
            if let (Some(x), Some(y)) = (a.const_value(), b.const_value()) {
                return Some(Expr::constant(x + y, e.bits()));
            }
            if b.const_value() == Some(0) {
                return Some(a.clone());
            }
            if a.const_value() == Some(0) {
                return Some(b.clone());
            }
            None
        }
        Op::Sub => {
            let (a, b) = (e.get_parameter(0), e.get_parameter(1));
            if let (Some(x), Some(y)) = (a.const_value(), b.const_value()) {
                return Some(Expr::constant(x - y, e.bits()));
            }
            if b.const_value() == Some(0) {
                return Some(a.clone());
            }
            None
        }
        Op::Mul => {
            let (a, b) = (e.get_parameter(0), e.get_parameter(1));
            if let (Some(x), Some(y)) = (a.const_value(), b.const_value()) {
                return Some(Expr::constant(x * y, e.bits()));
            }
            if b.const_value() == Some(1) {
                return Some(a.clone());
            }
            if a.const_value() == Some(1) {
                return Some(b.clone());
            }
            if a.const_value() == Some(0) || b.const_value() == Some(0) {
                return Some(Expr::constant(0, e.bits()));
            }
            None
        }
        Op::SDiv | Op::UDiv => {
            let (a, b) = (e.get_parameter(0), e.get_parameter(1));
            let d = b.const_value().filter(|d| *d != 0)?;
            if let Some(x) = a.const_value() {
                // Unsigned folding only when the decimal values are
                // representable as non-negative.
                if e.op() == Op::SDiv || (x >= 0 && d > 0) {
                    return Some(Expr::constant(x / d, e.bits()));
                }
                return None;
            }
            if d == 1 {
                return Some(a.clone());
            }
            distribute_div(a, d, e.bits())
        }
        Op::Rem => {
            let (a, b) = (e.get_parameter(0), e.get_parameter(1));
            let d = b.const_value().filter(|d| *d != 0)?;
            if d == 1 {
                return Some(Expr::constant(0, e.bits()));
            }
            if let Some(x) = a.const_value() {
                return Some(Expr::constant(x % d, e.bits()));
            }
            distribute_rem(a, d, e.bits())
        }
        Op::Ite => match e.get_parameter(0).op() {
            Op::True => Some(e.get_parameter(1).clone()),
            Op::False => Some(e.get_parameter(2).clone()),
            _ => None,
        },
        Op::Eq => {
            let (a, b) = (e.get_parameter(0), e.get_parameter(1));
            if let (Some(x), Some(y)) = (a.const_value(), b.const_value()) {
                return Some(if x == y {
                    Expr::truth(e.bits())
                } else {
                    Expr::falsity(e.bits())
                });
            }
            None
        }
        Op::Negate => e
            .get_parameter(0)
            .const_value()
            .map(|v| Expr::constant(-v, e.bits())),
        _ => None,
    }
}

/// Exact quotient of `t` by the constant `d`, when the division is known
/// to be exact: a constant multiple of `d`, or a multiplication whose
/// constant factor `d` divides.
fn exact_quotient(t: &Expr, d: i128) -> Option<Expr> {
    if let Some(v) = t.const_value() {
        if v % d == 0 {
            return Some(Expr::constant(v / d, t.bits()));
        }
        return None;
    }
    if t.op() == Op::Mul {
        let (a, b) = (t.get_parameter(0), t.get_parameter(1));
        if let Some(k) = a.const_value() {
            if k % d == 0 {
                let q = k / d;
                return Some(if q == 1 {
                    b.clone()
                } else {
                    Expr::binary(Op::Mul, Expr::constant(q, a.bits()), b.clone())
                });
            }
        }
        if let Some(k) = b.const_value() {
            if k % d == 0 {
                let q = k / d;
                return Some(if q == 1 {
                    a.clone()
                } else {
                    Expr::binary(Op::Mul, a.clone(), Expr::constant(q, b.bits()))
                });
            }
        }
    }
    None
}

/// Distributes a division by the constant `d` over a constant-factor
/// multiplication, or over `+`/`-` when both halves divide exactly.
fn distribute_div(a: &Expr, d: i128, _bits: u32) -> Option<Expr> {
    if let Some(q) = exact_quotient(a, d) {
        return Some(q);
    }
    if matches!(a.op(), Op::Add | Op::Sub) {
        let qa = exact_quotient(a.get_parameter(0), d)?;
        let qb = exact_quotient(a.get_parameter(1), d)?;
        return Some(Expr::binary(a.op(), qa, qb));
    }
    None
}

/// Residue of `t` modulo `d`, when it is a known constant.
fn known_residue(t: &Expr, d: i128) -> Option<i128> {
    if let Some(v) = t.const_value() {
        return Some(v % d);
    }
    if t.op() == Op::Mul {
        let factor = t
            .get_parameter(0)
            .const_value()
            .or_else(|| t.get_parameter(1).const_value())?;
        if factor % d == 0 {
            return Some(0);
        }
    }
    None
}

/// Distributes a remainder by the constant `d` over a constant-factor
/// multiplication, or over `+`/`-` when both halves have known residues.
fn distribute_rem(a: &Expr, d: i128, bits: u32) -> Option<Expr> {
    if let Some(r) = known_residue(a, d) {
        return Some(Expr::constant(r, bits));
    }
    if matches!(a.op(), Op::Add | Op::Sub) {
        let ra = known_residue(a.get_parameter(0), d)?;
        let rb = known_residue(a.get_parameter(1), d)?;
        let combined = match a.op() {
            Op::Add => ra + rb,
            _ => ra - rb,
        };
        // Truncated remainder only distributes when the residues combine
        // without wrapping past the divisor.
        if combined >= 0 && combined < d.abs() {
            return Some(Expr::constant(combined, bits));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn x() -> Expr {
        Expr::variable("x", 32)
    }

    fn c(v: i128) -> Expr {
        Expr::constant(v, 32)
    }

    #[test]
    fn additive_identity() {
        let e = Expr::binary(Op::Add, x(), c(0));
        assert_eq!(simplify(&e), x());

        let e = Expr::binary(Op::Sub, x(), c(0));
        assert_eq!(simplify(&e), x());
    }

    #[test]
    fn multiplicative_identity_and_annihilator() {
        assert_eq!(simplify(&Expr::binary(Op::Mul, x(), c(1))), x());

        let zeroed = simplify(&Expr::binary(Op::Mul, x(), c(0)));
        assert_eq!(zeroed, c(0));
        assert_eq!(zeroed.bits(), 32);
    }

    #[test]
    fn constant_folding_with_leading_minus() {
        let e = Expr::binary(Op::Mul, c(-1), c(7));
        assert_eq!(simplify(&e), c(-7));
    }

    #[test]
    fn double_negation_is_not_folded() {
        let e = Expr::unary(Op::Negate, Expr::unary(Op::Negate, x()));
        assert_eq!(simplify(&e), e);
    }

    #[test]
    fn division_undoes_pointer_scaling() {
        // (i * 32) / 32 -> i, and (i * 32) % 32 -> 0: the pair of rewrites
        // that recovers an array index from a bit offset.
        let scaled = Expr::binary(Op::Mul, x(), c(32));
        let q = Expr::binary(Op::SDiv, scaled.clone(), c(32));
        assert_eq!(simplify(&q), x());

        let r = Expr::binary(Op::Rem, scaled, c(32));
        assert_eq!(simplify(&r), c(0));
    }

    #[test]
    fn division_distributes_over_sum_when_exact() {
        // (x*8 + 4) / 4 -> (x*2 + 1)
        let sum = Expr::binary(
            Op::Add,
            Expr::binary(Op::Mul, x(), c(8)),
            c(4),
        );
        let e = Expr::binary(Op::SDiv, sum, c(4));
        let expected = Expr::binary(Op::Add, Expr::binary(Op::Mul, x(), c(2)), c(1));
        assert_eq!(simplify(&e), expected);
    }

    #[test]
    fn inexact_division_is_left_alone() {
        let e = Expr::binary(Op::SDiv, Expr::binary(Op::Mul, x(), c(6)), c(4));
        assert_eq!(simplify(&e), e);
    }

    #[test]
    fn remainder_by_one_is_zero() {
        let e = Expr::binary(Op::Rem, x(), c(1));
        assert_eq!(simplify(&e), c(0));
    }

    #[test]
    fn division_by_zero_is_left_alone() {
        let e = Expr::binary(Op::SDiv, c(4), c(0));
        assert_eq!(simplify(&e), e);
    }

    #[test]
    fn ite_prunes_on_constant_condition() {
        let t = Expr::ite(Expr::truth(32), x(), c(9));
        assert_eq!(simplify(&t), x());

        let f = Expr::ite(Expr::falsity(32), x(), c(9));
        assert_eq!(simplify(&f), c(9));
    }

    #[test]
    fn equality_of_constants_folds_to_truth_value() {
        let eq = Expr::compare(Op::Eq, c(3), c(3), 32);
        assert_eq!(simplify(&eq).op(), Op::True);

        let ne = Expr::compare(Op::Eq, c(3), c(4), 32);
        assert_eq!(simplify(&ne).op(), Op::False);
    }

    #[test]
    fn simplification_reaches_nested_terms() {
        // ite(c, x + 0, y * 1) simplifies both arms.
        let e = Expr::ite(
            Expr::variable("cond", 32),
            Expr::binary(Op::Add, x(), c(0)),
            Expr::binary(Op::Mul, Expr::variable("y", 32), c(1)),
        );
        let s = simplify(&e);
        assert_eq!(s.get_parameter(1), &x());
        assert_eq!(s.get_parameter(2), &Expr::variable("y", 32));
    }

    fn arb_expr() -> impl Strategy<Value = Expr> {
        let leaf = prop_oneof![
            (-8i128..8).prop_map(|v| Expr::constant(v, 32)),
            Just(Expr::variable("x", 32)),
            Just(Expr::variable("y", 32)),
        ];
        leaf.prop_recursive(3, 24, 2, |inner| {
            (
                prop_oneof![
                    Just(Op::Add),
                    Just(Op::Sub),
                    Just(Op::Mul),
                    Just(Op::SDiv),
                    Just(Op::Rem),
                ],
                inner.clone(),
                inner,
            )
                .prop_map(|(op, a, b)| Expr::binary(op, a, b))
        })
    }

    proptest! {
        #[test]
        fn simplify_is_idempotent(e in arb_expr()) {
            let once = simplify(&e);
            let twice = simplify(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn adding_zero_changes_nothing(e in arb_expr()) {
            let plus_zero = Expr::binary(Op::Add, e.clone(), Expr::constant(0, 32));
            prop_assert_eq!(simplify(&plus_zero), simplify(&e));
        }

        #[test]
        fn multiplying_by_zero_collapses(e in arb_expr()) {
            let times_zero = Expr::binary(Op::Mul, e.clone(), Expr::constant(0, 32));
            let s = simplify(&times_zero);
            prop_assert_eq!(s.const_value(), Some(0));
            prop_assert_eq!(s.bits(), e.bits());
        }
    }
}

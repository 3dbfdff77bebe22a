//! Index arithmetic for operators on a composite space.
//!
//! Entries of `1 ⊗ … ⊗ k ⊗ … ⊗ 1` (and of products of two such factors) are
//! computed directly from the mixed-radix digits of a global index; no
//! identity or local operator matrix is ever formed.

use std::ops::Range;
use crate::{
    hilbert::Layout,
    operators::{ Op, OpKind, OpProduct },
};

/// Number of local levels from which `kind` has a defined action on a
/// subsystem of dimension `dim`.
pub fn loop_limit(kind: OpKind, dim: usize) -> usize { kind.loop_limit(dim) }

/// Column level and matrix element for row level `n` of `kind`, or `None`
/// for the algebraic zero.
pub fn val_in_subspace(kind: OpKind, dim: usize, n: usize)
    -> Option<(usize, f64)>
{
    kind.row_action(n, dim)
}

#[inline]
fn step(layout: &Layout, index: usize, op: Op, kind: OpKind)
    -> Option<(usize, f64)>
{
    let p = op.sub.index;
    let n = layout.digit(index, p);
    let (m, v) = kind.ket_action(n, layout.dim(p))?;
    Some((layout.with_digit(index, p, m), v))
}

impl Op {
    /// Column and element of the composite-space row `row`.
    pub fn act_row(&self, layout: &Layout, row: usize) -> Option<(usize, f64)> {
        step(layout, row, *self, self.kind.adjoint())
    }

    /// Destination index and element for the composite-space ket `index`.
    pub fn act_ket(&self, layout: &Layout, index: usize) -> Option<(usize, f64)> {
        step(layout, index, *self, self.kind)
    }
}

impl OpProduct {
    /// Column and element of the composite-space row `row`, or `None` if the
    /// row is empty.
    ///
    /// The row view of `AB` is the ket view of `B†A†`, so `A†` is applied
    /// first.
    pub fn act_row(&self, layout: &Layout, row: usize) -> Option<(usize, f64)> {
        self.factors()
            .try_fold((row, 1.0), |(index, val), op| {
                step(layout, index, op, op.kind.adjoint())
                    .map(|(next, v)| (next, val * v))
            })
    }

    /// Destination index and element for the composite-space ket `index`, or
    /// `None` if the ket is annihilated.
    ///
    /// The right factor acts first.
    pub fn act_ket(&self, layout: &Layout, index: usize) -> Option<(usize, f64)> {
        self.factors().rev()
            .try_fold((index, 1.0), |(index, val), op| {
                step(layout, index, op, op.kind)
                    .map(|(next, v)| (next, val * v))
            })
    }

    /// Diagonal element `⟨i|L†L|i⟩` of the pre-composed `L†L` for `L = self`.
    ///
    /// Every column of `L` holds at most one nonzero element, so `L†L` is
    /// diagonal and its element is the squared ket-action value.
    pub fn norm_sq(&self, layout: &Layout, index: usize) -> f64 {
        self.act_ket(layout, index)
            .map(|(_, v)| v * v)
            .unwrap_or(0.0)
    }
}

/// Iterate over the rows in `range` on which a single-factor operator has a
/// nonzero row, skipping whole blocks of impossible rows.
///
/// The loop runs over `(outer block, valid local level, inner offset)` in the
/// mixed-radix decomposition of the row index.
pub fn valid_rows_in(layout: &Layout, op: Op, range: Range<usize>)
    -> impl Iterator<Item = usize>
{
    let p = op.sub.index;
    let dim = layout.dim(p);
    let stride = layout.stride(p);
    let block = dim * stride;
    let levels = op.kind.valid_rows(dim);
    let Range { start, end } = range;
    let outer = if start >= end {
        0..0
    } else {
        start / block..(end + block - 1) / block
    };
    outer.flat_map(move |o| {
        levels.clone().flat_map(move |n| {
            let base = o * block + n * stride;
            let lo = base.max(start);
            let hi = (base + stride).min(end);
            lo..hi.max(lo)
        })
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use crate::hilbert::Space;

    #[test]
    fn val_in_subspace_lowering() {
        assert_eq!(val_in_subspace(OpKind::Lowering, 3, 0), Some((1, 1.0)));
        assert_eq!(val_in_subspace(OpKind::Lowering, 3, 2), None);
        assert_eq!(loop_limit(OpKind::Lowering, 3), 2);
    }

    #[test]
    fn single_factor_row() {
        let mut space = Space::new();
        let s0 = space.declare(2).unwrap();
        let s1 = space.declare(3).unwrap();
        let layout = space.layout().unwrap();
        // row (1, 0) of 1 ⊗ a reads column (1, 1)
        assert_eq!(s1.lowering().act_row(&layout, 3), Some((4, 1.0)));
        // row (1, 2) of 1 ⊗ a is empty
        assert_eq!(s1.lowering().act_row(&layout, 5), None);
        // row (1, 2) of σ+ ⊗ 1 reads column (0, 2)
        assert_eq!(s0.raising().act_row(&layout, 5), Some((2, 1.0)));
    }

    #[test]
    fn two_factor_hand_computed() {
        // σ+ ⊗ a on dims (2, 3): nonzero at (3, 1) = 1 and (4, 2) = √2
        let mut space = Space::new();
        let s0 = space.declare(2).unwrap();
        let s1 = space.declare(3).unwrap();
        let layout = space.layout().unwrap();
        let prod = OpProduct::Two(s0.raising(), s1.lowering());
        assert_eq!(prod.act_row(&layout, 3), Some((1, 1.0)));
        let (col, val) = prod.act_row(&layout, 4).unwrap();
        assert_eq!(col, 2);
        assert_relative_eq!(val, 2.0_f64.sqrt());
        for row in [0, 1, 2, 5] {
            assert_eq!(prod.act_row(&layout, row), None);
        }
    }

    #[test]
    fn factor_order_irrelevant_on_distinct_subsystems() {
        let mut space = Space::new();
        let s0 = space.declare(3).unwrap();
        let s1 = space.declare(4).unwrap();
        let layout = space.layout().unwrap();
        let pairs = [
            (s0.raising(), s1.lowering()),
            (s0.number(), s1.raising()),
            (s0.lowering(), s1.transition(3, 1).unwrap()),
        ];
        for (a, b) in pairs {
            let ab = OpProduct::Two(a, b);
            let ba = OpProduct::Two(b, a);
            for i in 0..layout.total_dim() {
                assert_eq!(ab.act_row(&layout, i), ba.act_row(&layout, i));
                assert_eq!(ab.act_ket(&layout, i), ba.act_ket(&layout, i));
            }
        }
    }

    #[test]
    fn same_subsystem_products_compose() {
        let mut space = Space::new();
        let a = space.declare(4).unwrap();
        let layout = space.layout().unwrap();
        // a† a = n
        let n = OpProduct::Two(a.raising(), a.lowering());
        for i in 0..4 {
            let expected = (i > 0).then_some((i, i as f64));
            let got = n.act_ket(&layout, i)
                .map(|(j, v)| (j, (v * 1e12).round() / 1e12));
            assert_eq!(got, expected);
        }
        // a a† = n + 1 except on the truncated top level
        let m = OpProduct::Two(a.lowering(), a.raising());
        assert_relative_eq!(m.act_ket(&layout, 2).unwrap().1, 3.0, epsilon = 1e-12);
        assert_eq!(m.act_ket(&layout, 3), None);
    }

    #[test]
    fn norm_sq_is_dagger_product_diagonal() {
        let mut space = Space::new();
        let s0 = space.declare(3).unwrap();
        let s1 = space.declare(2).unwrap();
        let layout = space.layout().unwrap();
        let l = OpProduct::Two(s0.lowering(), s1.raising());
        for i in 0..layout.total_dim() {
            let d = layout.decode(i);
            let expected = d[0] as f64 * if d[1] == 0 { 1.0 } else { 0.0 };
            assert_relative_eq!(l.norm_sq(&layout, i), expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn valid_rows_in_matches_brute_force() {
        let mut space = Space::new();
        let s0 = space.declare(3).unwrap();
        let s1 = space.declare(4).unwrap();
        let s2 = space.declare(2).unwrap();
        let layout = space.layout().unwrap();
        let ops = [
            s0.lowering(), s1.raising(), s2.lowering(),
            s1.number(), s1.projector(2).unwrap(),
        ];
        let ranges = [0..24, 5..17, 0..1, 23..24, 7..7];
        for op in ops {
            for range in ranges.clone() {
                let fast: Vec<usize> = valid_rows_in(&layout, op, range.clone())
                    .collect();
                let slow: Vec<usize> = range.clone()
                    .filter(|&r| op.act_row(&layout, r).is_some())
                    .collect();
                assert_eq!(fast, slow, "{} over {:?}", op, range);
            }
        }
    }
}

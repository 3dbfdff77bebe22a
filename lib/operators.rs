//! Symbolic operator handles and their local action tables.
//!
//! An operator is never stored as a matrix. [`OpKind`] names a fixed local
//! action on one subsystem's basis and [`Op`] binds it to a [`Subsystem`];
//! products of one or two handles are described by [`OpProduct`].
//!
//! Every kind in the catalogue is a real, weighted partial permutation: each
//! local basis state is sent to at most one other basis state. This keeps all
//! index arithmetic to a single candidate column per row.

use std::{ fmt, ops::Range };
use crate::{
    error::{ ConfigError, Result },
    hilbert::{ Layout, Space, Subsystem },
};

/// A fixed, named local action on a single subsystem.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpKind {
    /// `1`
    Identity,
    /// Annihilation operator `a`: `a|n⟩ = √n |n − 1⟩`.
    Lowering,
    /// Creation operator `a†`: `a†|n⟩ = √(n + 1) |n + 1⟩`.
    Raising,
    /// Number operator `a†a`: `n|n⟩ = n |n⟩`.
    Number,
    /// Projector `|k⟩⟨k|` onto a single level.
    Projector(usize),
    /// Level transition `|to⟩⟨from|`.
    Transition { to: usize, from: usize },
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => write!(f, "identity"),
            Self::Lowering => write!(f, "lowering"),
            Self::Raising => write!(f, "raising"),
            Self::Number => write!(f, "number"),
            Self::Projector(k) => write!(f, "projector({})", k),
            Self::Transition { to, from } => {
                write!(f, "transition({} <- {})", to, from)
            },
        }
    }
}

impl OpKind {
    /// Hermitian conjugate.
    pub fn adjoint(self) -> Self {
        match self {
            Self::Lowering => Self::Raising,
            Self::Raising => Self::Lowering,
            Self::Transition { to, from } => Self::Transition { to: from, from: to },
            other => other,
        }
    }

    /// Return `true` if the kind refers only to levels that exist on a
    /// subsystem of dimension `dim`.
    pub fn is_valid_for(self, dim: usize) -> bool {
        match self {
            Self::Projector(k) => k < dim,
            Self::Transition { to, from } => to < dim && from < dim,
            _ => dim > 0,
        }
    }

    /// Action on the ket `|n⟩`: the destination level and the matrix element
    /// `⟨dest|k|n⟩`, or `None` where the action is the algebraic zero.
    #[inline]
    pub fn ket_action(self, n: usize, dim: usize) -> Option<(usize, f64)> {
        if n >= dim { return None; }
        match self {
            Self::Identity => Some((n, 1.0)),
            Self::Lowering => (n > 0).then(|| (n - 1, (n as f64).sqrt())),
            Self::Raising
                => (n + 1 < dim).then(|| (n + 1, ((n + 1) as f64).sqrt())),
            Self::Number => Some((n, n as f64)),
            Self::Projector(k) => (n == k).then_some((k, 1.0)),
            Self::Transition { to, from } => (n == from).then_some((to, 1.0)),
        }
    }

    /// Action read along matrix row `n`: the single column level `m` with
    /// `⟨n|k|m⟩ ≠ 0` and that element, or `None` if the row is empty.
    ///
    /// This is the ket action of the adjoint, since all elements are real.
    #[inline]
    pub fn row_action(self, n: usize, dim: usize) -> Option<(usize, f64)> {
        self.adjoint().ket_action(n, dim)
    }

    /// Levels `n` for which [`Self::ket_action`] is defined.
    pub fn valid_origins(self, dim: usize) -> Range<usize> {
        match self {
            Self::Identity | Self::Number => 0..dim,
            Self::Lowering => 1.min(dim)..dim,
            Self::Raising => 0..dim.saturating_sub(1),
            Self::Projector(k) => k..(k + 1).min(dim).max(k),
            Self::Transition { from, .. } => from..(from + 1).min(dim).max(from),
        }
    }

    /// Matrix rows `n` for which [`Self::row_action`] is defined.
    pub fn valid_rows(self, dim: usize) -> Range<usize> {
        self.adjoint().valid_origins(dim)
    }

    /// Number of local levels with a defined action.
    pub fn loop_limit(self, dim: usize) -> usize { self.valid_origins(dim).len() }
}

/// Symbolic reference to an operator kind acting on one subsystem.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Op {
    pub(crate) sub: Subsystem,
    pub(crate) kind: OpKind,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind, self.sub.index)
    }
}

impl Op {
    /// Return the subsystem acted on.
    pub fn subsystem(&self) -> Subsystem { self.sub }

    /// Return the operator kind.
    pub fn kind(&self) -> OpKind { self.kind }

    /// Hermitian conjugate on the same subsystem.
    pub fn dag(&self) -> Self { Self { sub: self.sub, kind: self.kind.adjoint() } }

    /// Number operator on the same subsystem.
    pub fn number(&self) -> Self { Self { sub: self.sub, kind: OpKind::Number } }

    /// Identity on the same subsystem.
    pub fn identity(&self) -> Self { Self { sub: self.sub, kind: OpKind::Identity } }

    /// Another kind on the same subsystem.
    pub fn with_kind(&self, kind: OpKind) -> Result<Self> { self.sub.op(kind) }

    /// Ket action on a local level.
    pub fn ket_action(&self, n: usize) -> Option<(usize, f64)> {
        self.kind.ket_action(n, self.sub.dim)
    }

    /// Row action on a local level.
    pub fn row_action(&self, n: usize) -> Option<(usize, f64)> {
        self.kind.row_action(n, self.sub.dim)
    }

    /// Check that `self` refers to a subsystem of `space` and that its kind
    /// is defined there.
    pub fn validate(&self, space: &Space) -> Result<()> {
        space.check(&self.sub)?;
        self.validate_kind()
    }

    /// Check that `self` fits a frozen [`Layout`]: its subsystem position
    /// exists there with the same dimension, and its kind is defined.
    pub fn validate_layout(&self, layout: &Layout) -> Result<()> {
        let p = self.sub.index;
        if p >= layout.num_subsystems() || layout.dim(p) != self.sub.dim {
            return Err(ConfigError::ForeignSubsystem { index: p }.into());
        }
        self.validate_kind()
    }

    fn validate_kind(&self) -> Result<()> {
        if !self.kind.is_valid_for(self.sub.dim) {
            return Err(invalid_kind(self.kind, self.sub.dim));
        }
        Ok(())
    }

    /// The same action on the subsystem `by` positions further along, in a
    /// layout that repeats the declared dimensions.
    pub(crate) fn shifted(&self, by: usize) -> Self {
        Self {
            sub: Subsystem { index: self.sub.index + by, ..self.sub },
            kind: self.kind,
        }
    }
}

fn invalid_kind(kind: OpKind, dim: usize) -> crate::error::Error {
    ConfigError::InvalidKind { kind: kind.to_string(), dim }.into()
}

impl Subsystem {
    /// Operator handle of a given kind, if the kind is defined here.
    pub fn op(&self, kind: OpKind) -> Result<Op> {
        if kind.is_valid_for(self.dim) {
            Ok(Op { sub: *self, kind })
        } else {
            Err(invalid_kind(kind, self.dim))
        }
    }

    /// Identity handle.
    pub fn identity(&self) -> Op { Op { sub: *self, kind: OpKind::Identity } }

    /// Lowering (annihilation) handle.
    pub fn lowering(&self) -> Op { Op { sub: *self, kind: OpKind::Lowering } }

    /// Raising (creation) handle.
    pub fn raising(&self) -> Op { Op { sub: *self, kind: OpKind::Raising } }

    /// Number handle.
    pub fn number(&self) -> Op { Op { sub: *self, kind: OpKind::Number } }

    /// Projector onto level `k`.
    pub fn projector(&self, k: usize) -> Result<Op> { self.op(OpKind::Projector(k)) }

    /// Transition `|to⟩⟨from|`.
    pub fn transition(&self, to: usize, from: usize) -> Result<Op> {
        self.op(OpKind::Transition { to, from })
    }
}

impl Space {
    /// Create an operator handle on a subsystem of `self`.
    pub fn op(&self, sub: Subsystem, kind: OpKind) -> Result<Op> {
        self.check(&sub)?;
        sub.op(kind)
    }
}

/// Product of one or two operator handles.
///
/// Factors on different subsystems form a Kronecker product; factors on the
/// same subsystem form an ordinary matrix product in which the right factor
/// acts first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OpProduct {
    One(Op),
    Two(Op, Op),
}

impl From<Op> for OpProduct {
    fn from(op: Op) -> Self { Self::One(op) }
}

impl From<(Op, Op)> for OpProduct {
    fn from(ops: (Op, Op)) -> Self { Self::Two(ops.0, ops.1) }
}

impl fmt::Display for OpProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One(a) => write!(f, "{}", a),
            Self::Two(a, b) => write!(f, "{} {}", a, b),
        }
    }
}

impl OpProduct {
    /// Iterate over factors from left to right.
    pub fn factors(&self) -> impl DoubleEndedIterator<Item = Op> {
        let (a, b) = match *self {
            Self::One(a) => (a, None),
            Self::Two(a, b) => (a, Some(b)),
        };
        std::iter::once(a).chain(b)
    }

    /// Leftmost factor, the first one read along a matrix row.
    pub fn first(&self) -> Op {
        match *self {
            Self::One(a) | Self::Two(a, _) => a,
        }
    }

    /// Rightmost factor, the first one to act on a ket.
    pub fn last(&self) -> Op {
        match *self {
            Self::One(a) | Self::Two(_, a) => a,
        }
    }

    /// Number of factors.
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Two(..) => 2,
        }
    }

    /// Hermitian conjugate, `(AB)† = B†A†`.
    pub fn adjoint(&self) -> Self {
        match *self {
            Self::One(a) => Self::One(a.dag()),
            Self::Two(a, b) => Self::Two(b.dag(), a.dag()),
        }
    }

    /// Validate every factor against `space`.
    pub fn validate(&self, space: &Space) -> Result<()> {
        self.factors().try_for_each(|op| op.validate(space))
    }

    /// Validate every factor against a frozen layout.
    pub fn validate_layout(&self, layout: &Layout) -> Result<()> {
        self.factors().try_for_each(|op| op.validate_layout(layout))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;

    #[test]
    fn ladder_tables() {
        let d = 4;
        assert_eq!(OpKind::Lowering.ket_action(0, d), None);
        assert_eq!(OpKind::Lowering.ket_action(3, d), Some((2, 3.0_f64.sqrt())));
        assert_eq!(OpKind::Raising.ket_action(3, d), None);
        assert_eq!(OpKind::Raising.ket_action(1, d), Some((2, 2.0_f64.sqrt())));
        assert_eq!(OpKind::Number.ket_action(2, d), Some((2, 2.0)));
        assert_eq!(OpKind::Identity.ket_action(3, d), Some((3, 1.0)));
        assert_eq!(OpKind::Identity.ket_action(4, d), None);
    }

    #[test]
    fn row_view_is_adjoint_ket_view() {
        // ⟨0|a|1⟩ = 1, ⟨1|a|2⟩ = √2
        let d = 3;
        assert_eq!(OpKind::Lowering.row_action(0, d), Some((1, 1.0)));
        assert_eq!(OpKind::Lowering.row_action(1, d), Some((2, 2.0_f64.sqrt())));
        assert_eq!(OpKind::Lowering.row_action(2, d), None);
        assert_eq!(OpKind::Raising.row_action(0, d), None);
        let t = OpKind::Transition { to: 2, from: 0 };
        assert_eq!(t.ket_action(0, d), Some((2, 1.0)));
        assert_eq!(t.row_action(2, d), Some((0, 1.0)));
        assert_eq!(t.row_action(0, d), None);
    }

    #[test]
    fn loop_limits() {
        let d = 5;
        assert_eq!(OpKind::Lowering.loop_limit(d), d - 1);
        assert_eq!(OpKind::Raising.loop_limit(d), d - 1);
        assert_eq!(OpKind::Identity.loop_limit(d), d);
        assert_eq!(OpKind::Number.loop_limit(d), d);
        assert_eq!(OpKind::Projector(3).loop_limit(d), 1);
        assert_eq!(OpKind::Lowering.loop_limit(1), 0);
        assert_eq!(OpKind::Lowering.valid_rows(d), 0..4);
        assert_eq!(OpKind::Raising.valid_rows(d), 1..5);
    }

    #[test]
    fn valid_ranges_match_tables() {
        let kinds = [
            OpKind::Identity,
            OpKind::Lowering,
            OpKind::Raising,
            OpKind::Number,
            OpKind::Projector(1),
            OpKind::Transition { to: 0, from: 2 },
        ];
        let d = 3;
        for kind in kinds {
            for n in 0..d {
                assert_eq!(
                    kind.valid_origins(d).contains(&n),
                    kind.ket_action(n, d).is_some(),
                    "{} origin {}", kind, n,
                );
                assert_eq!(
                    kind.valid_rows(d).contains(&n),
                    kind.row_action(n, d).is_some(),
                    "{} row {}", kind, n,
                );
            }
        }
    }

    #[test]
    fn handles() {
        let mut space = Space::new();
        let a = space.declare(4).unwrap();
        let nv = space.declare(2).unwrap();
        assert_eq!(a.lowering().dag(), a.raising());
        assert_eq!(nv.lowering().number(), nv.number());
        assert_eq!(a.raising().identity(), a.identity());
        assert_eq!(a.identity().kind(), OpKind::Identity);
        assert_eq!(
            a.lowering().with_kind(OpKind::Projector(3)).unwrap(),
            a.projector(3).unwrap(),
        );
        assert!(nv.number().with_kind(OpKind::Transition { to: 2, from: 0 }).is_err());
        assert_eq!(a.number().with_kind(OpKind::Raising).unwrap().subsystem(), a);
        assert!(nv.projector(2).is_err());
        assert!(nv.transition(1, 0).is_ok());
        assert!(space.op(a, OpKind::Projector(3)).is_ok());
        let prod = OpProduct::from((a.lowering(), nv.raising()));
        assert_eq!(prod.adjoint(), OpProduct::Two(nv.lowering(), a.raising()));
        assert_eq!(prod.factors().count(), 2);
        assert!(prod.validate(&space).is_ok());
        assert_eq!(prod.first(), a.lowering());
        assert_eq!(prod.last(), nv.raising());
        let other = Space::new();
        assert!(prod.validate(&other).is_err());
    }

    #[test]
    fn layout_validation() {
        let mut space = Space::new();
        let a = space.declare(3).unwrap();
        let b = space.declare(2).unwrap();
        let layout = space.layout().unwrap();
        let prod = OpProduct::Two(a.raising(), b.lowering());
        assert!(prod.validate_layout(&layout).is_ok());
        // subsystem 1 does not exist in a single-subsystem layout
        let short = Layout::from_dims(&[3]).unwrap();
        assert_eq!(
            prod.validate_layout(&short),
            Err(Error::Config(ConfigError::ForeignSubsystem { index: 1 })),
        );
        // same position, different dimension
        let wrong = Layout::from_dims(&[3, 4]).unwrap();
        assert!(b.lowering().validate_layout(&wrong).is_err());
        assert_eq!(b.lowering().shifted(2).subsystem().index(), 3);
    }
}

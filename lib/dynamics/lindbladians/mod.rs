//! Liouvillian assembly in the vectorized density-matrix space.
//!
//! Density matrices are flattened row-major, `vec(ρ)[a N + b] = ρ[a][b]`, so
//! that `vec(A ρ B) = (A ⊗ Bᵀ) vec(ρ)`. The generator assembled here is
//! ```text
//! L = -i (H ⊗ 1 - 1 ⊗ Hᵀ)
//!     + Σ_k γ_k ( L_k ⊗ L_k* - ½ L_k†L_k ⊗ 1 - ½ 1 ⊗ (L_k†L_k)ᵀ )
//! ```
//! using the same per-subsystem index arithmetic as the Hamiltonian, applied
//! once to the ket half `a` and once to the bra half `b` of each row index.

use num_complex::Complex64 as C64;
use tracing::{ debug, trace };
use crate::{
    dynamics::{ Generator, insert },
    error::{ ConfigError, Result },
    hilbert::Layout,
    kron::valid_rows_in,
    matrix::MatrixSink,
    terms::{ DissipatorTerm, HamiltonianTerm, TermRegistry },
};

/// Liouvillian builder for a declared model.
#[derive(Clone, Debug)]
pub struct LBuilder<'a> {
    pub(crate) layout: Layout,
    pub(crate) hamiltonian: &'a [HamiltonianTerm],
    pub(crate) dissipators: &'a [DissipatorTerm],
    pub(crate) skip_zero: bool,
    // the declared dimensions twice over: ket digits, then bra digits
    doubled: Layout,
    fingerprint: u64,
}

impl<'a> LBuilder<'a> {
    /// Create a new `LBuilder`.
    ///
    /// Fails if the registry is empty, if any term refers to a subsystem
    /// that `layout` does not describe, or if `N²` overflows.
    pub fn new(layout: Layout, registry: &'a TermRegistry, skip_zero: bool)
        -> Result<Self>
    {
        if registry.is_empty() {
            return Err(ConfigError::NoTerms("liouvillian").into());
        }
        registry.validate_layout(&layout)?;
        let dims: Vec<usize>
            = layout.dims().iter().chain(layout.dims()).copied().collect();
        let doubled = Layout::from_dims(&dims)?;
        Ok(Self {
            layout,
            hamiltonian: registry.hamiltonian_terms(),
            dissipators: registry.dissipator_terms(),
            skip_zero,
            doubled,
            fingerprint: registry.fingerprint(),
        })
    }

    /// Return a reference to the layout of the underlying Hilbert space.
    pub fn layout(&self) -> &Layout { &self.layout }

    /// Split a Liouville-space index into its ket and bra halves.
    #[inline]
    pub fn split(&self, index: usize) -> (usize, usize) {
        let n = self.layout.total_dim();
        (index / n, index % n)
    }

    /// Join ket and bra halves into a Liouville-space index.
    #[inline]
    pub fn join(&self, ket: usize, bra: usize) -> usize {
        ket * self.layout.total_dim() + bra
    }

    fn bra_offset(&self) -> usize { self.layout.num_subsystems() }

    /// Insert `-i c (P ⊗ 1 - 1 ⊗ Pᵀ)` for one Hamiltonian term.
    fn insert_commutator<M>(&self, term: &HamiltonianTerm, sink: &mut M)
        -> Result<()>
    where M: MatrixSink
    {
        let minus_i = -C64::i();
        let product = &term.product;
        // P ρ: row view on the ket half
        let ket_rows
            = valid_rows_in(&self.doubled, product.first(), sink.ownership());
        for row in ket_rows {
            let (a, b) = self.split(row);
            if let Some((c, v)) = product.act_row(&self.layout, a) {
                insert(sink, row, self.join(c, b), minus_i * term.coeff * v)?;
            }
        }
        // ρ P: transpose, i.e. ket view, on the bra half
        let origin = product.last().dag().shifted(self.bra_offset());
        for row in valid_rows_in(&self.doubled, origin, sink.ownership()) {
            let (a, b) = self.split(row);
            if let Some((e, v)) = product.act_ket(&self.layout, b) {
                insert(sink, row, self.join(a, e), -minus_i * term.coeff * v)?;
            }
        }
        Ok(())
    }

    /// Insert `γ (L ⊗ L* - ½ L†L ⊗ 1 - ½ 1 ⊗ (L†L)ᵀ)` for one dissipator.
    fn insert_dissipator<M>(&self, term: &DissipatorTerm, sink: &mut M)
        -> Result<()>
    where M: MatrixSink
    {
        let gamma = term.rate;
        let l = &term.product;
        // L ρ L†: L on the ket half, the adjoint table on the bra half
        for row in valid_rows_in(&self.doubled, l.first(), sink.ownership()) {
            let (a, b) = self.split(row);
            let ket = l.act_row(&self.layout, a);
            let bra = l.act_row(&self.layout, b);
            if let (Some((c, va)), Some((e, vb))) = (ket, bra) {
                insert(sink, row, self.join(c, e), C64::from(gamma * va * vb))?;
            }
        }
        // -½ {L†L, ρ}: diagonal, once per half; L†L vanishes wherever the
        // rightmost factor annihilates the ket
        let origin = l.last().dag();
        for row in valid_rows_in(&self.doubled, origin, sink.ownership()) {
            let (a, _) = self.split(row);
            let decay = -0.5 * gamma * l.norm_sq(&self.layout, a);
            insert(sink, row, row, C64::from(decay))?;
        }
        let origin = origin.shifted(self.bra_offset());
        for row in valid_rows_in(&self.doubled, origin, sink.ownership()) {
            let (_, b) = self.split(row);
            let decay = -0.5 * gamma * l.norm_sq(&self.layout, b);
            insert(sink, row, row, C64::from(decay))?;
        }
        Ok(())
    }
}

impl<'a> Generator for LBuilder<'a> {
    fn dim(&self) -> Result<usize> { Ok(self.doubled.total_dim()) }

    fn fingerprint(&self) -> u64 { self.fingerprint }

    fn insert_into<M>(&self, sink: &mut M) -> Result<()>
    where M: MatrixSink
    {
        let rows = sink.ownership();
        debug!(
            start = rows.start,
            end = rows.end,
            hamiltonian = self.hamiltonian.len(),
            dissipators = self.dissipators.len(),
            "inserting liouvillian rows",
        );
        for term in self.hamiltonian.iter() {
            if self.skip_zero && term.coeff == 0.0 { continue; }
            self.insert_commutator(term, sink)?;
        }
        for term in self.dissipators.iter() {
            if term.rate == 0.0 {
                trace!(product = %term.product, "skipping zero-rate dissipator");
                continue;
            }
            self.insert_dissipator(term, sink)?;
        }
        Ok(())
    }
}

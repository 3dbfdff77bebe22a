//! Hamiltonian assembly.
//!
//! Each term `c × A` (or `c × A B`) contributes, for every owned row `r`, the
//! single entry `(r, col)` given by the row view of the product; rows where
//! the local action is the algebraic zero receive nothing.

use ndarray as nd;
use num_complex::Complex64 as C64;
use tracing::debug;
use crate::{
    dynamics::{ Generator, insert },
    error::{ ConfigError, Result },
    hilbert::Layout,
    kron::valid_rows_in,
    matrix::MatrixSink,
    terms::{ HamiltonianTerm, TermRegistry },
};

/// Hamiltonian builder for a declared model.
#[derive(Clone, Debug)]
pub struct HBuilder<'a> {
    pub(crate) layout: Layout,
    pub(crate) terms: &'a [HamiltonianTerm],
    pub(crate) skip_zero: bool,
    fingerprint: u64,
}

impl<'a> HBuilder<'a> {
    /// Create a new `HBuilder`.
    ///
    /// Fails if no Hamiltonian terms have been added or if any term refers
    /// to a subsystem that `layout` does not describe.
    pub fn new(layout: Layout, registry: &'a TermRegistry, skip_zero: bool)
        -> Result<Self>
    {
        let terms = registry.hamiltonian_terms();
        if terms.is_empty() {
            return Err(ConfigError::NoTerms("hamiltonian").into());
        }
        registry.validate_layout(&layout)?;
        Ok(Self { layout, terms, skip_zero, fingerprint: registry.fingerprint() })
    }

    /// Return a reference to the layout.
    pub fn layout(&self) -> &Layout { &self.layout }

    fn active_terms(&self) -> impl Iterator<Item = &HamiltonianTerm> + '_ {
        self.terms.iter()
            .filter(move |term| !(self.skip_zero && term.coeff == 0.0))
    }

    /// Compute the full Hamiltonian as a dense array.
    pub fn build_dense(&self) -> nd::Array2<C64> {
        let n = self.layout.total_dim();
        let mut H: nd::Array2<C64> = nd::Array2::zeros((n, n));
        for term in self.active_terms() {
            for row in 0..n {
                if let Some((col, v)) = term.product.act_row(&self.layout, row) {
                    H[[row, col]] += term.coeff * v;
                }
            }
        }
        debug!(dim = n, terms = self.terms.len(), "built dense hamiltonian");
        H
    }
}

impl<'a> Generator for HBuilder<'a> {
    fn dim(&self) -> Result<usize> { Ok(self.layout.total_dim()) }

    fn fingerprint(&self) -> u64 { self.fingerprint }

    fn insert_into<M>(&self, sink: &mut M) -> Result<()>
    where M: MatrixSink
    {
        let rows = sink.ownership();
        debug!(
            start = rows.start,
            end = rows.end,
            terms = self.terms.len(),
            "inserting hamiltonian rows",
        );
        for term in self.active_terms() {
            // a row the leftmost factor cannot read from is empty for the
            // whole product
            let first = term.product.first();
            for row in valid_rows_in(&self.layout, first, rows.clone()) {
                if let Some((col, v)) = term.product.act_row(&self.layout, row) {
                    insert(sink, row, col, C64::from(term.coeff * v))?;
                }
            }
        }
        Ok(())
    }
}

/// Render a dense matrix for human inspection.
pub fn format_dense(a: &nd::Array2<C64>) -> String { format!("{:+.3}", a) }

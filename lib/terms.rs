//! Caller-owned accumulator of Hamiltonian and dissipator terms.

use std::hash::{ Hash, Hasher };
use rustc_hash::FxHasher;
use tracing::trace;
use crate::{
    error::{ ConfigError, Result },
    hilbert::{ Layout, Space },
    operators::{ Op, OpProduct },
};

/// `coeff × product`, one term of the Hamiltonian.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HamiltonianTerm {
    pub coeff: f64,
    pub product: OpProduct,
}

/// Lindblad dissipator `rate × D[product]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DissipatorTerm {
    pub rate: f64,
    pub product: OpProduct,
}

/// Ordered collection of all terms of a model.
///
/// Terms are recorded symbolically and only read at assembly time. Adding a
/// term after an assembly does not affect matrices that were already built;
/// assemble again to include it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TermRegistry {
    hamiltonian: Vec<HamiltonianTerm>,
    dissipators: Vec<DissipatorTerm>,
}

impl TermRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self { Self::default() }

    /// Add `coeff × op` to the Hamiltonian.
    pub fn add_hamiltonian<P>(&mut self, coeff: f64, op: P) -> Result<&mut Self>
    where P: Into<OpProduct>
    {
        if !coeff.is_finite() {
            return Err(ConfigError::InvalidCoefficient(coeff).into());
        }
        let product = op.into();
        trace!(coeff, %product, "hamiltonian term");
        self.hamiltonian.push(HamiltonianTerm { coeff, product });
        Ok(self)
    }

    /// Add `coeff × a b` to the Hamiltonian.
    pub fn add_hamiltonian2(&mut self, coeff: f64, a: Op, b: Op)
        -> Result<&mut Self>
    {
        self.add_hamiltonian(coeff, OpProduct::Two(a, b))
    }

    /// Add a dissipator with collapse operator `op`.
    pub fn add_dissipator<P>(&mut self, rate: f64, op: P) -> Result<&mut Self>
    where P: Into<OpProduct>
    {
        if !rate.is_finite() || rate < 0.0 {
            return Err(ConfigError::InvalidRate(rate).into());
        }
        let product = op.into();
        trace!(rate, %product, "dissipator term");
        self.dissipators.push(DissipatorTerm { rate, product });
        Ok(self)
    }

    /// Add a dissipator with collapse operator `a b`.
    pub fn add_dissipator2(&mut self, rate: f64, a: Op, b: Op)
        -> Result<&mut Self>
    {
        self.add_dissipator(rate, OpProduct::Two(a, b))
    }

    /// All Hamiltonian terms in insertion order.
    pub fn hamiltonian_terms(&self) -> &[HamiltonianTerm] { &self.hamiltonian }

    /// All dissipator terms in insertion order.
    pub fn dissipator_terms(&self) -> &[DissipatorTerm] { &self.dissipators }

    /// Total number of terms.
    pub fn len(&self) -> usize { self.hamiltonian.len() + self.dissipators.len() }

    /// Return `true` if no terms have been added.
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Check every term against `space`.
    pub fn validate(&self, space: &Space) -> Result<()> {
        self.hamiltonian.iter()
            .try_for_each(|term| term.product.validate(space))?;
        self.dissipators.iter()
            .try_for_each(|term| term.product.validate(space))
    }

    /// Check every term against a frozen layout.
    pub fn validate_layout(&self, layout: &Layout) -> Result<()> {
        self.hamiltonian.iter()
            .try_for_each(|term| term.product.validate_layout(layout))?;
        self.dissipators.iter()
            .try_for_each(|term| term.product.validate_layout(layout))
    }

    /// Hash of the term *set*, independent of insertion order.
    ///
    /// Workers that assemble the same model must agree on this value.
    pub fn fingerprint(&self) -> u64 {
        fn hash_one<T: Hash>(tag: u8, scalar: f64, item: &T) -> u64 {
            let mut hasher = FxHasher::default();
            tag.hash(&mut hasher);
            scalar.to_bits().hash(&mut hasher);
            item.hash(&mut hasher);
            hasher.finish()
        }

        let h = self.hamiltonian.iter()
            .map(|t| hash_one(0, t.coeff, &t.product));
        let d = self.dissipators.iter()
            .map(|t| hash_one(1, t.rate, &t.product));
        h.chain(d)
            .fold(self.len() as u64, |acc, x| acc.wrapping_add(x))
    }
}

//! Constructs to assemble the generators of closed and open dynamics.
//!
//! [`Assembler`] ties a [`Space`], a [`TermRegistry`] and a [`Config`]
//! together and hands out builders implementing [`Generator`]:
//! [`HBuilder`] for the Hamiltonian and [`LBuilder`] for the Liouvillian.
//! Assembly is a pure function of those inputs and a [`Partition`].

use ndarray as nd;
use num_complex::Complex64 as C64;
use rayon::iter::{ IntoParallelIterator, ParallelIterator };
use tracing::debug;
use crate::{
    config::Config,
    error::{ ConfigError, Result },
    hilbert::{ Layout, Space },
    matrix::{ DistMatrix, MatrixSink, Partition },
    terms::TermRegistry,
};

pub mod hamiltonians;
pub use hamiltonians::{ HBuilder, format_dense };

pub mod lindbladians;
pub use lindbladians::LBuilder;

/// Basic requirements for anything that fills the owned rows of a
/// [`MatrixSink`].
pub trait Generator: Sync {
    /// Dimension of the generated matrix.
    fn dim(&self) -> Result<usize>;

    /// Fingerprint of the terms the generator reads.
    fn fingerprint(&self) -> u64;

    /// Insert every contribution for the rows owned by `sink`, without
    /// finalizing it.
    fn insert_into<M>(&self, sink: &mut M) -> Result<()>
    where M: MatrixSink;

    /// Build and finalize the rows owned by `partition`.
    fn build(&self, partition: Partition) -> Result<DistMatrix> {
        let mut matrix = DistMatrix::new(self.dim()?, partition);
        self.insert_into(&mut matrix)?;
        matrix.finalize()?;
        matrix.set_fingerprint(self.fingerprint());
        Ok(matrix)
    }

    /// Build the rows of every worker of a `workers`-sized layout
    /// concurrently, in rank order.
    fn build_all(&self, workers: usize) -> Result<Vec<DistMatrix>> {
        if workers == 0 {
            return Err(ConfigError::InvalidWorkers { rank: 0, size: 0 }.into());
        }
        Partition::all(workers)
            .collect::<Vec<Partition>>()
            .into_par_iter()
            .map(|partition| self.build(partition))
            .collect()
    }
}

/// Add `val` at `(row, col)` unless it is exactly zero.
#[inline]
pub(crate) fn insert<M>(sink: &mut M, row: usize, col: usize, val: C64)
    -> Result<()>
where M: MatrixSink
{
    if val.re != 0.0 || val.im != 0.0 {
        sink.add_value(row, col, val)?;
    }
    Ok(())
}

/// Entry point for all assembly.
#[derive(Clone, Debug)]
pub struct Assembler<'a> {
    space: &'a Space,
    terms: &'a TermRegistry,
    config: Config,
}

impl<'a> Assembler<'a> {
    /// Create a new `Assembler` with default settings.
    pub fn new(space: &'a Space, terms: &'a TermRegistry) -> Self {
        Self { space, terms, config: Config::default() }
    }

    /// Use the provided settings.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Return a reference to the settings.
    pub fn config(&self) -> &Config { &self.config }

    fn prepare(&self) -> Result<Layout> {
        let layout = self.space.layout()?;
        self.config.validate()?;
        self.terms.validate(self.space)?;
        Ok(layout)
    }

    /// Validate the model and return a Hamiltonian builder.
    pub fn hamiltonian_builder(&self) -> Result<HBuilder<'a>> {
        let layout = self.prepare()?;
        HBuilder::new(layout, self.terms, self.config.skip_zero_terms)
    }

    /// Validate the model and return a Liouvillian builder.
    pub fn liouvillian_builder(&self) -> Result<LBuilder<'a>> {
        let layout = self.prepare()?;
        LBuilder::new(layout, self.terms, self.config.skip_zero_terms)
    }

    /// Assemble the rows of the Hamiltonian owned by `partition`.
    pub fn hamiltonian(&self, partition: Partition) -> Result<DistMatrix> {
        self.hamiltonian_builder()?.build(partition)
    }

    /// Assemble the rows of the Liouvillian owned by `partition`.
    pub fn liouvillian(&self, partition: Partition) -> Result<DistMatrix> {
        self.liouvillian_builder()?.build(partition)
    }

    /// Assemble the Hamiltonian on every worker of the configured layout.
    pub fn hamiltonian_all(&self) -> Result<Vec<DistMatrix>> {
        let builder = self.hamiltonian_builder()?;
        debug!(workers = self.config.workers, "assembling hamiltonian");
        builder.build_all(self.config.workers)
    }

    /// Assemble the Liouvillian on every worker of the configured layout.
    pub fn liouvillian_all(&self) -> Result<Vec<DistMatrix>> {
        let builder = self.liouvillian_builder()?;
        debug!(workers = self.config.workers, "assembling liouvillian");
        builder.build_all(self.config.workers)
    }

    /// Assemble the Hamiltonian on every worker and gather the result.
    pub fn hamiltonian_gathered(&self) -> Result<DistMatrix> {
        DistMatrix::stitch(self.hamiltonian_all()?)
    }

    /// Assemble the Liouvillian on every worker and gather the result.
    pub fn liouvillian_gathered(&self) -> Result<DistMatrix> {
        DistMatrix::stitch(self.liouvillian_all()?)
    }

    /// Assemble the full Hamiltonian as a dense array, for inspection of
    /// small problems.
    pub fn dense_hamiltonian(&self) -> Result<nd::Array2<C64>> {
        let builder = self.hamiltonian_builder()?;
        let dim = builder.dim()?;
        if dim > self.config.max_dense_dim {
            return Err(ConfigError::DenseTooLarge {
                dim,
                limit: self.config.max_dense_dim,
            }.into());
        }
        Ok(builder.build_dense())
    }
}

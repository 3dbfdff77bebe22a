#![allow(dead_code, non_snake_case, non_upper_case_globals)]

//! Assembly of Hamiltonians and Lindblad Liouvillians for composite quantum
//! systems built from truncated subsystems.
//!
//! Declare subsystems on a [`Space`], record terms built from operator
//! handles in a [`TermRegistry`], then hand both to an [`Assembler`] to get
//! row-partitioned sparse matrices ([`DistMatrix`]) or a dense Hamiltonian.

pub mod error;
pub mod config;
pub mod hilbert;
pub mod operators;
pub mod kron;
pub mod terms;
pub mod matrix;
pub mod dynamics;
pub mod density;

pub use error::{ ConfigError, Error, MatrixError, Result };
pub use config::Config;
pub use hilbert::{ Layout, Space, Subsystem };
pub use operators::{ Op, OpKind, OpProduct };
pub use terms::{ DissipatorTerm, HamiltonianTerm, TermRegistry };
pub use matrix::{ DistMatrix, MatrixSink, Partition };
pub use dynamics::{ Assembler, Generator, HBuilder, LBuilder };
pub use density::InitialPopulations;

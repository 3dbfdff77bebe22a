//! Helpers for density matrices in the row-major vectorized form read and
//! produced by the Liouvillian.

use ndarray as nd;
use num_complex::Complex64 as C64;
use tracing::debug;
use crate::{
    error::{ ConfigError, MatrixError, Result },
    hilbert::{ Layout, Space, Subsystem },
};

/// Flatten `rho` so that `vec(ρ)[a N + b] = ρ[a][b]`.
pub fn vectorize(rho: &nd::Array2<C64>) -> nd::Array1<C64> {
    rho.iter().copied().collect()
}

/// Inverse of [`vectorize`] for an `n × n` matrix.
pub fn unvectorize(rho_vec: &nd::Array1<C64>, n: usize)
    -> Result<nd::Array2<C64>>
{
    if rho_vec.len() != n * n {
        return Err(MatrixError::DimensionMismatch {
            expected: n * n,
            got: rho_vec.len(),
        }.into());
    }
    let rho: nd::Array2<C64>
        = nd::Array2::from_shape_fn((n, n), |(a, b)| rho_vec[a * n + b]);
    Ok(rho)
}

fn check_len(layout: &Layout, rho_vec: &nd::Array1<C64>) -> Result<usize> {
    let n = layout.total_dim();
    let expected = layout.liouville_dim()?;
    if rho_vec.len() != expected {
        return Err(MatrixError::DimensionMismatch {
            expected,
            got: rho_vec.len(),
        }.into());
    }
    Ok(n)
}

/// `Σ_i ρ_ii`.
pub fn trace(layout: &Layout, rho_vec: &nd::Array1<C64>) -> Result<C64> {
    let n = check_len(layout, rho_vec)?;
    Ok((0..n).map(|i| rho_vec[i * n + i]).sum())
}

/// Number of values returned by [`populations`].
pub fn num_populations(layout: &Layout) -> usize { layout.num_subsystems() }

/// Expectation value of each subsystem's number operator, in declaration
/// order.
pub fn populations(layout: &Layout, rho_vec: &nd::Array1<C64>)
    -> Result<Vec<f64>>
{
    let n = check_len(layout, rho_vec)?;
    let mut pops: Vec<f64> = vec![0.0; layout.num_subsystems()];
    for i in 0..n {
        let p_i = rho_vec[i * n + i].re;
        if p_i == 0.0 { continue; }
        pops.iter_mut()
            .enumerate()
            .for_each(|(p, acc)| { *acc += p_i * layout.digit(i, p) as f64; });
    }
    Ok(pops)
}

/// Initial level of every subsystem, defaulting to the ground state.
#[derive(Clone, Debug)]
pub struct InitialPopulations<'a> {
    space: &'a Space,
    layout: Layout,
    levels: Vec<usize>,
}

impl<'a> InitialPopulations<'a> {
    /// Create a new `InitialPopulations` with every subsystem in level 0.
    pub fn new(space: &'a Space) -> Result<Self> {
        let layout = space.layout()?;
        let levels = vec![0; layout.num_subsystems()];
        Ok(Self { space, layout, levels })
    }

    /// Put `sub` in `level`.
    pub fn set(&mut self, sub: Subsystem, level: usize) -> Result<&mut Self> {
        self.space.check(&sub)?;
        if level >= sub.dim() {
            return Err(ConfigError::InvalidPopulation {
                index: sub.index(),
                level,
                dim: sub.dim(),
            }.into());
        }
        self.levels[sub.index()] = level;
        Ok(self)
    }

    /// Levels of all subsystems, in declaration order.
    pub fn levels(&self) -> &[usize] { &self.levels }

    /// Basis index of the product state.
    pub fn basis_index(&self) -> usize {
        self.levels.iter().enumerate()
            .map(|(p, &l)| l * self.layout.stride(p))
            .sum()
    }

    /// `|n⟩⟨n|` as a dense matrix.
    pub fn density(&self) -> nd::Array2<C64> {
        let n = self.layout.total_dim();
        let k = self.basis_index();
        let mut rho: nd::Array2<C64> = nd::Array2::zeros((n, n));
        rho[[k, k]] = C64::from(1.0);
        rho
    }

    /// `|n⟩⟨n|` in vectorized form.
    pub fn density_vec(&self) -> Result<nd::Array1<C64>> {
        let n = self.layout.total_dim();
        let mut rho_vec: nd::Array1<C64>
            = nd::Array1::zeros(self.layout.liouville_dim()?);
        let k = self.basis_index();
        rho_vec[k * n + k] = C64::from(1.0);
        debug!(levels = ?self.levels, index = k, "initial density matrix");
        Ok(rho_vec)
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use crate::{
        dynamics::Assembler,
        error::Error,
        matrix::Partition,
        terms::TermRegistry,
    };
    use super::*;

    #[test]
    fn vectorize_is_row_major() {
        let rho = nd::array![
            [C64::from(1.0), C64::new(0.0, 2.0)],
            [C64::new(0.0, -2.0), C64::from(3.0)],
        ];
        let v = vectorize(&rho);
        assert_eq!(v[1], C64::new(0.0, 2.0));
        assert_eq!(v[2], C64::new(0.0, -2.0));
        assert_eq!(unvectorize(&v, 2).unwrap(), rho);
        assert!(matches!(
            unvectorize(&v, 3),
            Err(Error::Matrix(MatrixError::DimensionMismatch { expected: 9, got: 4 })),
        ));
    }

    #[test]
    fn initial_state_populations() {
        let mut space = Space::new();
        let a = space.declare(5).unwrap();
        let nv = space.declare(2).unwrap();
        let mut init = InitialPopulations::new(&space).unwrap();
        init.set(a, 3).unwrap().set(nv, 1).unwrap();
        assert_eq!(init.basis_index(), 7);
        let layout = space.layout().unwrap();
        let rho = init.density_vec().unwrap();
        assert_eq!(num_populations(&layout), 2);
        assert_eq!(populations(&layout, &rho).unwrap(), vec![3.0, 1.0]);
        assert_eq!(trace(&layout, &rho).unwrap(), C64::from(1.0));
        assert_eq!(vectorize(&init.density()), rho);
    }

    #[test]
    fn invalid_population_rejected() {
        let mut space = Space::new();
        let a = space.declare(3).unwrap();
        let mut other = Space::new();
        let b = other.declare(3).unwrap();
        let mut init = InitialPopulations::new(&space).unwrap();
        assert_eq!(
            init.set(a, 3).err(),
            Some(Error::Config(ConfigError::InvalidPopulation { index: 0, level: 3, dim: 3 })),
        );
        assert!(matches!(
            init.set(b, 1),
            Err(Error::Config(ConfigError::ForeignSubsystem { .. })),
        ));
        assert_eq!(init.levels(), &[0]);
    }

    #[test]
    fn decay_rate_of_excited_population() {
        // d⟨n⟩/dt = -γ⟨n⟩ for a pure decay channel
        let mut space = Space::new();
        let a = space.declare(4).unwrap();
        let mut terms = TermRegistry::new();
        terms.add_dissipator(0.5, a.lowering()).unwrap();
        let L = Assembler::new(&space, &terms)
            .liouvillian(Partition::serial())
            .unwrap();
        let mut init = InitialPopulations::new(&space).unwrap();
        init.set(a, 2).unwrap();
        let rho = init.density_vec().unwrap();
        let drho = L.mul_vec(&rho).unwrap();
        let layout = space.layout().unwrap();
        assert_relative_eq!(trace(&layout, &drho).unwrap().norm(), 0.0);
        assert_relative_eq!(populations(&layout, &drho).unwrap()[0], -1.0);
    }
}

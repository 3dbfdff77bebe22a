//! Definitions to describe composite spaces and the mixed-radix encoding of
//! their basis states.

use std::sync::atomic::{ AtomicUsize, Ordering };
use itertools::Itertools;
use crate::error::{ ConfigError, Result };

static NEXT_SPACE_ID: AtomicUsize = AtomicUsize::new(0);

/// Handle to a single declared degree of freedom.
///
/// The handle records the dimension and the position of the subsystem in its
/// [`Space`]; it is only meaningful together with the space that produced it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Subsystem {
    pub(crate) space: usize,
    pub(crate) index: usize,
    pub(crate) dim: usize,
}

impl Subsystem {
    /// Position of the subsystem in the global ordering.
    pub fn index(&self) -> usize { self.index }

    /// Number of local basis states.
    pub fn dim(&self) -> usize { self.dim }
}

/// Registry of all declared subsystems.
///
/// Declaration order fixes digit significance in the global basis index: the
/// first subsystem is the most significant digit. Subsystems are never
/// removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Space {
    id: usize,
    dims: Vec<usize>,
}

impl Default for Space {
    fn default() -> Self {
        Self { id: NEXT_SPACE_ID.fetch_add(1, Ordering::Relaxed), dims: Vec::new() }
    }
}

impl Space {
    /// Create a new, empty space.
    pub fn new() -> Self { Self::default() }

    /// Declare a new subsystem with `dim` local basis states.
    pub fn declare(&mut self, dim: usize) -> Result<Subsystem> {
        if dim == 0 { return Err(ConfigError::ZeroDimension.into()); }
        let index = self.dims.len();
        self.dims.push(dim);
        Ok(Subsystem { space: self.id, index, dim })
    }

    /// Number of declared subsystems.
    pub fn num_subsystems(&self) -> usize { self.dims.len() }

    /// Return handles to all declared subsystems, in declaration order.
    pub fn subsystems(&self) -> impl Iterator<Item = Subsystem> + '_ {
        self.dims.iter().enumerate()
            .map(|(index, &dim)| Subsystem { space: self.id, index, dim })
    }

    /// Product of all subsystem dimensions.
    pub fn total_dim(&self) -> Result<usize> {
        self.layout().map(|layout| layout.total_dim())
    }

    /// Freeze the current set of subsystems into a [`Layout`].
    pub fn layout(&self) -> Result<Layout> { Layout::from_dims(&self.dims) }

    /// Fail if `sub` was not declared by `self`.
    pub fn check(&self, sub: &Subsystem) -> Result<()> {
        let known = sub.space == self.id
            && self.dims.get(sub.index) == Some(&sub.dim);
        if known {
            Ok(())
        } else {
            Err(ConfigError::ForeignSubsystem { index: sub.index }.into())
        }
    }
}

/// Mixed-radix view of a composite space.
///
/// Global index `i` decodes to one digit per subsystem via
/// `digit_p = (i / stride_p) mod dim_p`, where `stride_p` is the product of
/// the dimensions of all subsystems after `p`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    dims: Vec<usize>,
    strides: Vec<usize>,
    total: usize,
}

impl Layout {
    /// Build a layout from an ordered list of dimensions.
    pub fn from_dims(dims: &[usize]) -> Result<Self> {
        if dims.is_empty() { return Err(ConfigError::NoSubsystems.into()); }
        if dims.contains(&0) { return Err(ConfigError::ZeroDimension.into()); }
        let mut strides = vec![1; dims.len()];
        let mut acc: usize = 1;
        for (stride, dim) in strides.iter_mut().zip(dims).rev() {
            *stride = acc;
            acc = acc.checked_mul(*dim).ok_or(ConfigError::DimensionOverflow)?;
        }
        Ok(Self { dims: dims.to_vec(), strides, total: acc })
    }

    /// Product of all dimensions.
    pub fn total_dim(&self) -> usize { self.total }

    /// Dimension of the Liouville space, `total_dim²`.
    pub fn liouville_dim(&self) -> Result<usize> {
        self.total.checked_mul(self.total)
            .ok_or_else(|| ConfigError::DimensionOverflow.into())
    }

    /// Number of subsystems.
    pub fn num_subsystems(&self) -> usize { self.dims.len() }

    /// All subsystem dimensions.
    pub fn dims(&self) -> &[usize] { &self.dims }

    /// Dimension of the `p`-th subsystem.
    pub fn dim(&self, p: usize) -> usize { self.dims[p] }

    /// Stride of the `p`-th digit.
    pub fn stride(&self, p: usize) -> usize { self.strides[p] }

    /// Local digit of the `p`-th subsystem in global index `index`.
    #[inline]
    pub fn digit(&self, index: usize, p: usize) -> usize {
        (index / self.strides[p]) % self.dims[p]
    }

    /// Replace the `p`-th digit of `index` with `value`, leaving all others
    /// unchanged.
    #[inline]
    pub fn with_digit(&self, index: usize, p: usize, value: usize) -> usize {
        let stride = self.strides[p];
        index - self.digit(index, p) * stride + value * stride
    }

    /// Decode a global index into one digit per subsystem.
    pub fn decode(&self, index: usize) -> Vec<usize> {
        (0..self.dims.len()).map(|p| self.digit(index, p)).collect()
    }

    /// Encode one digit per subsystem into a global index, if every digit is
    /// in range.
    pub fn encode(&self, digits: &[usize]) -> Option<usize> {
        (digits.len() == self.dims.len()
            && digits.iter().zip(&self.dims).all(|(d, n)| d < n))
            .then(|| {
                digits.iter().zip(&self.strides)
                    .map(|(d, s)| d * s)
                    .sum()
            })
    }

    /// Iterate over all digit tuples in global-index order.
    pub fn iter_digits(&self) -> impl Iterator<Item = Vec<usize>> + '_ {
        self.dims.iter()
            .map(|&n| 0..n)
            .multi_cartesian_product()
    }
}

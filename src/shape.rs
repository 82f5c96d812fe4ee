use serde::{Serialize, Deserialize};

use crate::internal::*;


/// The shape of a dense, row-major [Tensor](crate::Tensor).

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
  pub dims: Vec<usize>,
}

impl Shape {
  pub fn new(dims: &[usize]) -> Self {
    Self { dims: dims.to_vec() }
  }

  pub fn size(&self) -> usize {
    self.dims.iter().product()
  }

  pub fn rank(&self) -> usize {
    self.dims.len()
  }

  /// Number of elements in one step along `dim`.

  pub fn stride(&self, dim: usize) -> usize {
    self.dims[dim + 1..].iter().product()
  }

  pub fn unsqueeze(&self, dim: isize) -> Self {
    let d = negative_index(dim, self.rank(), true);
    let mut dims = self.dims.clone();
    dims.insert(d, 1);
    Self { dims }
  }

  /// Remove a single dimension of size one.

  pub fn squeeze_only(&self, dim: isize) -> Self {
    let d = negative_index(dim, self.rank(), false);
    assert_eq!(self.dims[d], 1, "Cannot squeeze dimension {d} of {self}");
    let mut dims = self.dims.clone();
    dims.remove(d);
    Self { dims }
  }

  /// Shape of two tensors joined along `dim`, if they
  /// agree in every other dimension.

  pub fn concat(&self, rhs: &Self, dim: usize) -> Option<Self> {
    if self.rank() != rhs.rank() || dim >= self.rank() { return None }
    let agree = self.dims.iter()
      .zip(&rhs.dims)
      .enumerate()
      .all(|(d, (l, r))| d == dim || l == r );
    if !agree { return None }
    let mut dims = self.dims.clone();
    dims[dim] += rhs.dims[dim];
    Some(Self { dims })
  }

  /// Shape of a matrix product, if both operands are
  /// matrices with matching inner dimension.

  pub fn matmul(&self, rhs: &Self) -> Option<Self> {
    if self.rank() != 2 || rhs.rank() != 2 || self.dims[1] != rhs.dims[0] { return None }
    Some(Self::new(&[self.dims[0], rhs.dims[1]]))
  }
}

impl std::ops::Index<isize> for Shape {
  type Output = usize;

  fn index(&self, i: isize) -> &usize {
    let idx = negative_index(i, self.rank(), false);
    &self.dims[idx]
  }
}

impl std::fmt::Display for Shape {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Shape{:?}", self.dims)
  }
}

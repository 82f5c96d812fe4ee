use std::fmt::Debug;

use rand::Rng;
use serde::{Serialize, Deserialize};

mod cops;
mod lops;

pub use cops::Gemm;

use crate::{
  internal::*,
  shape::Shape,
  scalar::{ Inner, Numeric, Real },
};


/// Dense multidimensional array.
///
/// Tensors own their storage. Cloning a tensor copies its data,
/// so two tensors never alias each other's values.
///
/// Tensors may contain any type that satisfies [Inner], but
/// additional methods are available for [Numeric] and [Real]
/// inner types.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTensor<T>", bound(deserialize = "T: Inner + Deserialize<'de>"))]
pub struct Tensor<T: Inner> {
  shape: Shape,
  data: Vec<T>,
}

// Decoded form, checked before it becomes a tensor
#[derive(Deserialize)]
struct RawTensor<T> {
  shape: Shape,
  data: Vec<T>,
}

impl<T: Inner> TryFrom<RawTensor<T>> for Tensor<T> {
  type Error = String;

  fn try_from(raw: RawTensor<T>) -> Result<Self, Self::Error> {
    let size = raw.shape.dims.iter()
      .try_fold(1usize, |size, &dim| size.checked_mul(dim) )
      .ok_or_else(|| format!("{} is too large", raw.shape) )?;
    if size != raw.data.len() {
      return Err(format!("{} doesn't match data length {}", raw.shape, raw.data.len()))
    }
    Ok(Self { shape: raw.shape, data: raw.data })
  }
}

impl<T: Inner> Tensor<T> {
  pub fn from_shape(shape: Shape, data: Vec<T>) -> Self {
    assert_eq!(shape.size(), data.len(),
      "{} doesn't match data length {}", shape, data.len());
    Self { shape, data }
  }

  pub fn new(shape: &[usize], data: Vec<T>) -> Self {
    Self::from_shape(Shape::new(shape), data)
  }

  pub fn vec(vec: &[T]) -> Self {
    Self::new(&[vec.len()], vec.to_vec())
  }

  pub fn scalar(item: T) -> Self {
    Self::new(&[], vec![item])
  }

  pub fn fill(shape: &[usize], filler: T) -> Self {
    Self::new(shape, vec![filler; shape.iter().product()])
  }

  pub fn shape(&self) -> &Shape {
    &self.shape
  }

  pub fn dims(&self) -> &[usize] {
    &self.shape.dims
  }

  pub fn size(&self) -> usize {
    self.shape.size()
  }

  pub fn rank(&self) -> usize {
    self.shape.rank()
  }

  pub fn raw(&self) -> &[T] {
    &self.data
  }

  pub fn raw_mut(&mut self) -> &mut [T] {
    &mut self.data
  }

  pub fn item(&self) -> T {
    assert!(self.size() == 1,
      "Can't extract item from non-scalar {}", self.shape);
    self.data[0]
  }

  pub fn unsqueeze(&self, dim: isize) -> Self {
    Self { shape: self.shape.unsqueeze(dim), data: self.data.clone() }
  }

  pub fn squeeze_only(&self, dim: isize) -> Self {
    Self { shape: self.shape.squeeze_only(dim), data: self.data.clone() }
  }

  /// Swap the two axes of a matrix.

  pub fn transpose(&self) -> Self {
    assert_eq!(self.rank(), 2, "Only matrices can be transposed, got {}", self.shape);
    let (rows, cols) = (self.shape[0], self.shape[1]);
    let data = (0..cols)
      .flat_map(|j| (0..rows).map(move |i| i * cols + j ) )
      .map(|i| self.data[i] )
      .collect();
    Self::new(&[cols, rows], data)
  }

  /// Join two tensors along `dim`. They must agree in every other dimension.

  pub fn concat(&self, rhs: &Self, dim: isize) -> Self {
    let dim = negative_index(dim, self.rank(), false);
    let shape = self.shape.concat(&rhs.shape, dim)
      .unwrap_or_else(|| panic!("Cannot concat {} & {} tensors along dim {}", self.shape, rhs.shape, dim));
    let chunk_l = self.shape.dims[dim] * self.shape.stride(dim);
    let chunk_r = rhs.shape.dims[dim] * rhs.shape.stride(dim);
    let data = self.data.chunks(chunk_l.max(1))
      .zip(rhs.data.chunks(chunk_r.max(1)))
      .flat_map(|(a, b)| a.iter().chain(b) )
      .copied()
      .collect();
    Self::from_shape(shape, data)
  }

  /// Cut a tensor in two along `dim`, with the first
  /// part containing `at` entries of that dimension.

  pub fn split(&self, dim: isize, at: usize) -> (Self, Self) {
    let dim = negative_index(dim, self.rank(), false);
    let size = self.shape.dims[dim];
    assert!(at <= size, "Cannot split {} at {} along dim {}", self.shape, at, dim);
    let stride = self.shape.stride(dim);
    let chunk = size * stride;
    let (mut left, mut right) = (vec![], vec![]);
    for block in self.data.chunks(chunk.max(1)) {
      let (a, b) = block.split_at(at * stride);
      left.extend_from_slice(a);
      right.extend_from_slice(b);
    }
    let mut dims_l = self.shape.dims.clone();
    let mut dims_r = self.shape.dims.clone();
    dims_l[dim] = at;
    dims_r[dim] = size - at;
    (Self::new(&dims_l, left), Self::new(&dims_r, right))
  }

  pub fn vectorize<O,F>(&self, cb: F) -> Tensor<O>
  where
    O: Inner,
    F: FnMut(T) -> O,
  {
    let data = self.data.iter().copied().map(cb).collect();
    Tensor::from_shape(self.shape.clone(), data)
  }

  /// Combine two tensors element by element. Tensors must have
  /// identical shapes, unless one of them holds a single item,
  /// which then gets broadcast across the other.

  pub fn zip<O,F>(&self, rhs: &Self, mut cb: F) -> Tensor<O>
  where
    O: Inner,
    F: FnMut((T, T)) -> O,
  {
    if self.shape.dims == rhs.shape.dims {
      let data = self.data.iter().copied()
        .zip(rhs.data.iter().copied())
        .map(cb)
        .collect();
      Tensor::from_shape(self.shape.clone(), data)
    } else if rhs.size() == 1 {
      let b = rhs.data[0];
      self.vectorize(|a| cb((a, b)) )
    } else if self.size() == 1 {
      let a = self.data[0];
      rhs.vectorize(|b| cb((a, b)) )
    } else {
      panic!("Could not broadcast {} & {}", self.shape, rhs.shape)
    }
  }
}

impl<T: Numeric> Tensor<T> {
  pub fn ones(shape: &[usize]) -> Self {
    Self::fill(shape, T::one())
  }

  pub fn zeros(shape: &[usize]) -> Self {
    Self::fill(shape, T::zero())
  }

  pub fn arrange(shape: &[usize], start: T, step: T) -> Self {
    Self::new(shape, (0..shape.iter().product())
      .map(|i| T::from(i).unwrap() * step + start )
      .collect())
  }

  /// Reduce all items to a scalar.

  pub fn sum(&self) -> Self {
    Self::scalar(self.data.iter().copied().sum())
  }

  pub fn add(&self, rhs: &Self) -> Self {
    self.zip(rhs, |(a, b)| a + b )
  }

  pub fn sub(&self, rhs: &Self) -> Self {
    self.zip(rhs, |(a, b)| a - b )
  }

  pub fn mul(&self, rhs: &Self) -> Self {
    self.zip(rhs, |(a, b)| a * b )
  }

  pub fn div(&self, rhs: &Self) -> Self {
    self.zip(rhs, |(a, b)| a / b )
  }

  /// Element-wise addition into existing storage.

  pub fn add_assign(&mut self, rhs: &Self) {
    assert_eq!(self.shape, rhs.shape,
      "Could not add {} tensor into {} tensor", rhs.shape, self.shape);
    for (a, &b) in self.data.iter_mut().zip(&rhs.data) {
      *a += b;
    }
  }

  /// Overwrite all items with `filler`, keeping the shape.

  pub fn refill(&mut self, filler: T) {
    for a in self.data.iter_mut() {
      *a = filler;
    }
  }
}

impl<T: Real> Tensor<T> {
  /// Standard normal samples drawn from `rng`.

  pub fn randn<G: Rng>(shape: &[usize], rng: &mut G) -> Self {
    let len = shape.iter().product();
    let mut data = Vec::with_capacity(len + 1);
    while data.len() < len {
      let (r1, r2): (T, T) = randn(rng);
      data.push(r1);
      data.push(r2);
    }
    data.truncate(len);
    Self::new(shape, data)
  }

  /// Normal samples scaled to keep signal variance stable across
  /// a layer, as proposed by Glorot & Bengio. The first dimension
  /// counts as fan-in, the second as fan-out and any further
  /// dimensions as receptive field.

  pub fn glorot_normal<G: Rng>(shape: &[usize], gain: T, rng: &mut G) -> Self {
    assert!(!shape.is_empty(), "Glorot initialization needs at least one dimension");
    let (fan_in, fan_out) = match shape {
      [n] => (1, *n),
      [n1, n2, rest @ ..] => {
        let field: usize = rest.iter().product();
        (n1 * field, n2 * field)
      },
      [] => unreachable!(),
    };
    let scale = gain * (T::from(2.0).unwrap() / T::from(fan_in + fan_out).unwrap()).sqrt();
    Self::randn(shape, rng) * scale
  }

  pub fn sigmoid(&self) -> Self {
    self.vectorize(|a| T::one() / (T::one() + (-a).exp()) )
  }

  pub fn sqr(&self) -> Self {
    self.vectorize(|a| a * a )
  }

  pub fn sqrt(&self) -> Self {
    self.vectorize(|a| a.sqrt() )
  }

  /// Average over all items.

  pub fn mean(&self) -> Self {
    let n = T::from(self.size()).unwrap();
    self.sum() / n
  }
}

impl<T: Inner> std::fmt::Display for Tensor<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Tensor{:?} ", self.shape.dims)?;
    print_chunks(0, &self.shape, &self.data, f)
  }
}

fn print_chunks<T: Debug>(idx: usize, shape: &Shape, vec: &[T], f: &mut std::fmt::Formatter) -> std::fmt::Result {
  let indent = (0..idx * 2).map(|_| " ").collect::<String>();
  if shape.rank() == 0 {
    write!(f, "{indent}{:?}", vec[0])?;
  } else if idx == shape.rank() - 1 {
    writeln!(f, "{indent}{:?}", vec)?;
  } else {
    writeln!(f, "{indent}[")?;
    for chunk in vec.chunks((vec.len() / shape.dims[idx]).max(1)) {
      print_chunks(idx + 1, shape, chunk, f)?;
    }
    writeln!(f, "{indent}]")?;
  }
  Ok(())
}


#[cfg(test)]
mod tests {
  use super::*;
  use rand::{rngs::StdRng, SeedableRng};

  #[test]
  fn transpose() {
    let a = Tensor::arrange(&[2,3], 1, 1).transpose();
    assert_eq!(a, Tensor::new(&[3,2], vec![1, 4, 2, 5, 3, 6]));
  }

  #[test]
  fn concat() {
    let a = Tensor::new(&[2,3], vec![1, 2, 3, 4, 5, 6]);
    let b = Tensor::new(&[2,1], vec![7, 8]);
    assert_eq!(a.concat(&b, 1), Tensor::new(&[2,4], vec![1, 2, 3, 7, 4, 5, 6, 8]));

    let b = Tensor::new(&[1,3], vec![7, 8, 9]);
    assert_eq!(a.concat(&b, 0), Tensor::new(&[3,3], vec![1, 2, 3, 4, 5, 6, 7, 8, 9]));
  }

  #[test]
  #[should_panic]
  fn concat_mismatch() {
    let a = Tensor::new(&[2,3], vec![1, 2, 3, 4, 5, 6]);
    let b = Tensor::new(&[3,1], vec![7, 8, 9]);
    a.concat(&b, 1);
  }

  #[test]
  fn split() {
    let a = Tensor::new(&[2,4], vec![1, 2, 3, 7, 4, 5, 6, 8]);
    assert_eq!(a.split(1, 3), (
      Tensor::new(&[2,3], vec![1, 2, 3, 4, 5, 6]),
      Tensor::new(&[2,1], vec![7, 8]),
    ));
    assert_eq!(a.split(0, 1), (
      Tensor::new(&[1,4], vec![1, 2, 3, 7]),
      Tensor::new(&[1,4], vec![4, 5, 6, 8]),
    ));
  }

  #[test]
  fn unsqueeze_copies() {
    let a = Tensor::vec(&[1.0, 2.0]);
    let mut b = a.unsqueeze(0);
    b.raw_mut()[0] = 5.0;
    assert_eq!(b.dims(), &[1, 2]);
    assert_eq!(a, Tensor::vec(&[1.0, 2.0]));
    assert_eq!(b.squeeze_only(0), Tensor::vec(&[5.0, 2.0]));
  }

  #[test]
  fn broadcast_scalar() {
    let a = Tensor::new(&[2,2], vec![1, 2, 3, 4]);
    assert_eq!(a.add(&Tensor::scalar(1)), Tensor::new(&[2,2], vec![2, 3, 4, 5]));
    assert_eq!(Tensor::scalar(10).sub(&a), Tensor::new(&[2,2], vec![9, 8, 7, 6]));
  }

  #[test]
  fn mean() {
    let a = Tensor::new(&[3,2], vec![1., 2., 3., 4., 5., 6.]);
    assert_eq!(a.mean().item(), 3.5);
  }

  #[test]
  fn sigmoid() {
    let a = Tensor::vec(&[0.0f64]).sigmoid();
    assert_eq!(a.item(), 0.5);
  }

  #[test]
  fn decoding_checks_length() {
    let bytes = postcard::to_allocvec(&(vec![3usize, 5], vec![0.1f64; 2])).unwrap();
    assert!(postcard::from_bytes::<Tensor<f64>>(&bytes).is_err());

    let bytes = postcard::to_allocvec(&(vec![usize::MAX, 2], vec![0.1f64; 2])).unwrap();
    assert!(postcard::from_bytes::<Tensor<f64>>(&bytes).is_err());

    let tensor = Tensor::new(&[2, 1], vec![0.5, 0.25]);
    let bytes = postcard::to_allocvec(&tensor).unwrap();
    assert_eq!(postcard::from_bytes::<Tensor<f64>>(&bytes).unwrap(), tensor);
  }

  #[test]
  fn glorot_is_seeded() {
    let a = Tensor::<f64>::glorot_normal(&[3,5], 1.0, &mut StdRng::seed_from_u64(3));
    let b = Tensor::<f64>::glorot_normal(&[3,5], 1.0, &mut StdRng::seed_from_u64(3));
    assert_eq!(a, b);
    assert_eq!(a.dims(), &[3, 5]);
    assert!(a.raw().iter().any(|&w| w != a.raw()[0] ));
  }

  #[test]
  fn glorot_scale() {
    let mut rng = StdRng::seed_from_u64(11);
    let a = Tensor::<f64>::glorot_normal(&[100, 100], 1.0, &mut rng);
    let variance = a.sqr().mean().item();
    assert!((variance - 0.01).abs() < 0.002);
  }
}

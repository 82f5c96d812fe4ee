use crate::{
  tensor::Tensor,
  scalar::{ Numeric, Real },
};


/// Low-level matrix multiply kernel for row-major storage.
///
/// Multiplies an `m`x`k` matrix with a `k`x`n` matrix.

pub trait Gemm: Numeric {
  fn gemm(m: usize, k: usize, n: usize, lhs: &[Self], rhs: &[Self]) -> Vec<Self>;
}

#[cfg_attr(feature = "unsafe", allow(dead_code))]
fn naive_gemm<T: Numeric>(m: usize, k: usize, n: usize, lhs: &[T], rhs: &[T]) -> Vec<T> {
  let mut data = vec![T::zero(); m * n];
  for i in 0..m {
    for j in 0..n {
      for l in 0..k {
        data[i * n + j] += lhs[i * k + l] * rhs[l * n + j];
      }
    }
  }
  data
}

impl Gemm for f32 {
  #[cfg(feature = "unsafe")]
  fn gemm(m: usize, k: usize, n: usize, lhs: &[f32], rhs: &[f32]) -> Vec<f32> {
    let mut data = vec![0.0; m * n];
    unsafe {
      matrixmultiply::sgemm(
        m, k, n,
        1.0,
        lhs.as_ptr(), k as isize, 1,
        rhs.as_ptr(), n as isize, 1,
        0.0,
        data.as_mut_ptr(), n as isize, 1,
      );
    }
    data
  }

  #[cfg(not(feature = "unsafe"))]
  fn gemm(m: usize, k: usize, n: usize, lhs: &[f32], rhs: &[f32]) -> Vec<f32> {
    naive_gemm(m, k, n, lhs, rhs)
  }
}

impl Gemm for f64 {
  #[cfg(feature = "unsafe")]
  fn gemm(m: usize, k: usize, n: usize, lhs: &[f64], rhs: &[f64]) -> Vec<f64> {
    let mut data = vec![0.0; m * n];
    unsafe {
      matrixmultiply::dgemm(
        m, k, n,
        1.0,
        lhs.as_ptr(), k as isize, 1,
        rhs.as_ptr(), n as isize, 1,
        0.0,
        data.as_mut_ptr(), n as isize, 1,
      );
    }
    data
  }

  #[cfg(not(feature = "unsafe"))]
  fn gemm(m: usize, k: usize, n: usize, lhs: &[f64], rhs: &[f64]) -> Vec<f64> {
    naive_gemm(m, k, n, lhs, rhs)
  }
}

impl<T: Real> Tensor<T> {
  /// Matrix product of two rank 2 tensors.

  pub fn mm(&self, rhs: &Self) -> Self {
    let shape = self.shape.matmul(&rhs.shape)
      .unwrap_or_else(|| panic!("Cannot multiply {} with {}", self.shape, rhs.shape));
    let (m, k, n) = (self.shape[0], self.shape[1], rhs.shape[1]);
    Self::from_shape(shape, T::gemm(m, k, n, &self.data, &rhs.data))
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn matmul() {
    let x = Tensor::new(&[2,3], vec![1., 2., 3., 4., 5., 6.]);
    let y = Tensor::new(&[3,2], vec![1., 2., 3., 4., 5., 6.]);
    assert_eq!(x.mm(&y), Tensor::new(&[2,2], vec![22., 28., 49., 64.]));
  }

  #[test]
  fn matmul_vector() {
    let x = Tensor::new(&[2,3], vec![1.0f32, 2., 3., 4., 5., 6.]);
    let y = Tensor::new(&[3,1], vec![1., 2., 3.]);
    assert_eq!(x.mm(&y), Tensor::new(&[2,1], vec![14., 32.]));
  }

  #[test]
  fn naive_kernel_agrees() {
    let lhs = [1., 2., 3., 4., 5., 6.];
    let rhs = [6., 5., 4., 3., 2., 1.];
    assert_eq!(naive_gemm(2, 3, 2, &lhs, &rhs), f64::gemm(2, 3, 2, &lhs, &rhs));
  }

  #[test]
  #[should_panic]
  fn matmul_mismatch() {
    let x = Tensor::new(&[2,3], vec![1., 2., 3., 4., 5., 6.]);
    x.mm(&x);
  }
}

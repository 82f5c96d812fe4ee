use std::fmt::Debug;

use serde::{Serialize, Deserialize};

use crate::{
  shape::Shape,
  tensor::Tensor,
  scalar::Real,
};


/// Unary computational operation that can also compute its derivative.

pub trait UnaryOp<T: Real>: Debug {
  fn run(&self, lhs: &Tensor<T>) -> Tensor<T>;
  fn derive(&self, lhs: &Tensor<T>, grad: &Tensor<T>) -> Tensor<T>;
}


/// Binary computational operation that can also compute its derivative.

pub trait BinaryOp<T: Real>: Debug {
  fn run(&self, lhs: &Tensor<T>, rhs: &Tensor<T>) -> Tensor<T>;
  fn derive(&self, lhs: &Tensor<T>, rhs: &Tensor<T>, grad: &Tensor<T>) -> (Tensor<T>, Tensor<T>);
}


/// Every operation a graph node may perform.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Op {
  Concat(Concat),
  MatMul(MatMul),
  Sub(Sub),
  Sigmoid(Sigmoid),
  Sqr(Sqr),
  Mean(Mean),
}

impl Op {
  pub fn name(&self) -> &'static str {
    match self {
      Self::Concat(_) => "concat",
      Self::MatMul(_) => "mm",
      Self::Sub(_) => "sub",
      Self::Sigmoid(_) => "sigmoid",
      Self::Sqr(_) => "sqr",
      Self::Mean(_) => "mean",
    }
  }

  pub fn arity(&self) -> usize {
    match self {
      Self::Concat(_) | Self::MatMul(_) | Self::Sub(_) => 2,
      Self::Sigmoid(_) | Self::Sqr(_) | Self::Mean(_) => 1,
    }
  }

  /// Shape of this operation's output, or `None` if the
  /// operands cannot be combined.

  pub(crate) fn infer(&self, shapes: &[&Shape]) -> Option<Shape> {
    match self {
      Self::Concat(op) => shapes[0].concat(shapes[1], op.dim),
      Self::MatMul(_) => shapes[0].matmul(shapes[1]),
      Self::Sub(_) => (shapes[0] == shapes[1]).then(|| shapes[0].clone() ),
      Self::Sigmoid(_) | Self::Sqr(_) => Some(shapes[0].clone()),
      Self::Mean(_) => Some(Shape::new(&[])),
    }
  }

  pub(crate) fn run<T: Real>(&self, inputs: &[&Tensor<T>]) -> Tensor<T> {
    match self {
      Self::Concat(op) => op.run(inputs[0], inputs[1]),
      Self::MatMul(op) => op.run(inputs[0], inputs[1]),
      Self::Sub(op) => op.run(inputs[0], inputs[1]),
      Self::Sigmoid(op) => op.run(inputs[0]),
      Self::Sqr(op) => op.run(inputs[0]),
      Self::Mean(op) => op.run(inputs[0]),
    }
  }

  /// Gradients with respect to each input, given the gradient of the output.

  pub(crate) fn derive<T: Real>(&self, inputs: &[&Tensor<T>], grad: &Tensor<T>) -> Vec<Tensor<T>> {
    let pair = |(l, r)| vec![l, r];
    match self {
      Self::Concat(op) => pair(op.derive(inputs[0], inputs[1], grad)),
      Self::MatMul(op) => pair(op.derive(inputs[0], inputs[1], grad)),
      Self::Sub(op) => pair(op.derive(inputs[0], inputs[1], grad)),
      Self::Sigmoid(op) => vec![op.derive(inputs[0], grad)],
      Self::Sqr(op) => vec![op.derive(inputs[0], grad)],
      Self::Mean(op) => vec![op.derive(inputs[0], grad)],
    }
  }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concat {
  pub dim: usize,
}

impl<T: Real> BinaryOp<T> for Concat {
  fn run(&self, lhs: &Tensor<T>, rhs: &Tensor<T>) -> Tensor<T> {
    lhs.concat(rhs, self.dim as isize)
  }

  fn derive(&self, lhs: &Tensor<T>, _rhs: &Tensor<T>, grad: &Tensor<T>) -> (Tensor<T>, Tensor<T>) {
    grad.split(self.dim as isize, lhs.dims()[self.dim])
  }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatMul;

impl<T: Real> BinaryOp<T> for MatMul {
  fn run(&self, lhs: &Tensor<T>, rhs: &Tensor<T>) -> Tensor<T> {
    lhs.mm(rhs)
  }

  fn derive(&self, lhs: &Tensor<T>, rhs: &Tensor<T>, grad: &Tensor<T>) -> (Tensor<T>, Tensor<T>)
  {(
    grad.mm(&rhs.transpose()),
    lhs.transpose().mm(grad),
  )}
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sub;

impl<T: Real> BinaryOp<T> for Sub {
  fn run(&self, lhs: &Tensor<T>, rhs: &Tensor<T>) -> Tensor<T> {
    lhs - rhs
  }

  fn derive(&self, _lhs: &Tensor<T>, _rhs: &Tensor<T>, grad: &Tensor<T>) -> (Tensor<T>, Tensor<T>)
  {(
    grad.clone(),
    -grad,
  )}
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sigmoid;

impl<T: Real> UnaryOp<T> for Sigmoid {
  fn run(&self, lhs: &Tensor<T>) -> Tensor<T> {
    lhs.sigmoid()
  }

  fn derive(&self, lhs: &Tensor<T>, grad: &Tensor<T>) -> Tensor<T> {
    let slope = lhs.sigmoid().vectorize(|s| s * (T::one() - s) );
    grad * slope
  }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sqr;

impl<T: Real> UnaryOp<T> for Sqr {
  fn run(&self, lhs: &Tensor<T>) -> Tensor<T> {
    lhs.sqr()
  }

  fn derive(&self, lhs: &Tensor<T>, grad: &Tensor<T>) -> Tensor<T> {
    grad * lhs * T::from(2.0).unwrap()
  }
}


/// Average over all items, producing a scalar.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mean;

impl<T: Real> UnaryOp<T> for Mean {
  fn run(&self, lhs: &Tensor<T>) -> Tensor<T> {
    lhs.mean()
  }

  fn derive(&self, lhs: &Tensor<T>, grad: &Tensor<T>) -> Tensor<T> {
    let n = T::from(lhs.size()).unwrap();
    Tensor::fill(lhs.dims(), grad.item() / n)
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  // Compare an operation's derivative against central differences
  fn numeric_gradient(op: &Op, inputs: &[Tensor<f64>], which: usize) -> Tensor<f64> {
    let eps = 1e-6;
    let loss = |inputs: &[Tensor<f64>]| {
      let refs: Vec<_> = inputs.iter().collect();
      op.run(&refs).sum().item()
    };
    let mut grad = Tensor::zeros(inputs[which].dims());
    for i in 0..inputs[which].size() {
      let mut plus = inputs.to_vec();
      let mut minus = inputs.to_vec();
      plus[which].raw_mut()[i] += eps;
      minus[which].raw_mut()[i] -= eps;
      grad.raw_mut()[i] = (loss(&plus) - loss(&minus)) / (2.0 * eps);
    }
    grad
  }

  fn check_gradients(op: Op, inputs: Vec<Tensor<f64>>) {
    let refs: Vec<_> = inputs.iter().collect();
    let output = op.run(&refs);
    let derived = op.derive(&refs, &Tensor::ones(output.dims()));
    assert_eq!(derived.len(), op.arity());
    for (which, grad) in derived.iter().enumerate() {
      let expected = numeric_gradient(&op, &inputs, which);
      assert_eq!(grad.dims(), expected.dims());
      for (a, b) in grad.raw().iter().zip(expected.raw()) {
        assert!((a - b).abs() < 1e-5, "{} input {which}: {a} vs {b}", op.name());
      }
    }
  }

  fn sample(dims: &[usize]) -> Tensor<f64> {
    Tensor::arrange(dims, -0.7, 0.31)
  }

  #[test]
  fn concat_gradient() {
    check_gradients(Op::Concat(Concat { dim: 1 }), vec![sample(&[4,2]), sample(&[4,1])]);
  }

  #[test]
  fn matmul_gradient() {
    check_gradients(Op::MatMul(MatMul), vec![sample(&[4,3]), sample(&[3,5])]);
  }

  #[test]
  fn sub_gradient() {
    check_gradients(Op::Sub(Sub), vec![sample(&[4,1]), sample(&[4,1]) * 0.5]);
  }

  #[test]
  fn sigmoid_gradient() {
    check_gradients(Op::Sigmoid(Sigmoid), vec![sample(&[2,3])]);
  }

  #[test]
  fn sqr_gradient() {
    check_gradients(Op::Sqr(Sqr), vec![sample(&[3,2])]);
  }

  #[test]
  fn mean_gradient() {
    check_gradients(Op::Mean(Mean), vec![sample(&[4,1])]);
  }

  #[test]
  fn infer_shapes() {
    let a = Shape::new(&[4,2]);
    let b = Shape::new(&[4,1]);
    assert_eq!(Op::Concat(Concat { dim: 1 }).infer(&[&a, &b]), Some(Shape::new(&[4,3])));
    assert_eq!(Op::Sub(Sub).infer(&[&a, &b]), None);
    assert_eq!(Op::Mean(Mean).infer(&[&a]), Some(Shape::new(&[])));
  }
}

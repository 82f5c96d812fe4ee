use crate::{
  tensor::Tensor,
  scalar::{ Numeric, Signed },
};


impl<T: Signed> std::ops::Neg for &Tensor<T> {
  type Output = Tensor<T>;

  fn neg(self) -> Self::Output {
    self.vectorize(|a| -a )
  }
}

impl<T: Signed> std::ops::Neg for Tensor<T> {
  type Output = Tensor<T>;

  fn neg(self) -> Self::Output {
    -&self
  }
}

macro_rules! add_operator {
  ($trait:ident, $meth:ident, $symbol:tt) => {
    impl<T: Numeric> std::ops::$trait for &Tensor<T> { // &self * &other
      type Output = Tensor<T>;

      fn $meth(self, rhs: Self) -> Tensor<T> {
        self.$meth(rhs)
      }
    }

    impl<T: Numeric> std::ops::$trait for Tensor<T> { // tensor * other
      type Output = Tensor<T>;

      fn $meth(self, rhs: Self) -> Tensor<T> {
        (&self).$meth(&rhs)
      }
    }

    impl<T: Numeric> std::ops::$trait<Tensor<T>> for &Tensor<T> { // &tensor * other
      type Output = Tensor<T>;

      fn $meth(self, rhs: Tensor<T>) -> Tensor<T> {
        self.$meth(&rhs)
      }
    }

    impl<T: Numeric> std::ops::$trait<&Tensor<T>> for Tensor<T> { // tensor * &other
      type Output = Tensor<T>;

      fn $meth(self, rhs: &Tensor<T>) -> Tensor<T> {
        (&self).$meth(rhs)
      }
    }

    impl<T: Numeric> std::ops::$trait<T> for &Tensor<T> { // &tensor * T
      type Output = Tensor<T>;

      fn $meth(self, rhs: T) -> Tensor<T> {
        self.$meth(&Tensor::scalar(rhs))
      }
    }

    impl<T: Numeric> std::ops::$trait<T> for Tensor<T> { // tensor * T
      type Output = Tensor<T>;

      fn $meth(self, rhs: T) -> Tensor<T> {
        (&self).$meth(&Tensor::scalar(rhs))
      }
    }

    impl std::ops::$trait<&Tensor<f32>> for f32 { // f32 * &tensor
      type Output = Tensor<f32>;

      fn $meth(self, tensor: &Tensor<f32>) -> Tensor<f32> {
        Tensor::scalar(self) $symbol tensor
      }
    }

    impl std::ops::$trait<&Tensor<f64>> for f64 { // f64 * &tensor
      type Output = Tensor<f64>;

      fn $meth(self, tensor: &Tensor<f64>) -> Tensor<f64> {
        Tensor::scalar(self) $symbol tensor
      }
    }
  };
}

add_operator!(Add, add, +);
add_operator!(Sub, sub, -);
add_operator!(Mul, mul, *);
add_operator!(Div, div, /);


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn operators() {
    let a = Tensor::vec(&[1.0, 2.0]);
    let b = Tensor::vec(&[3.0, 5.0]);
    assert_eq!(&a + &b, Tensor::vec(&[4.0, 7.0]));
    assert_eq!(&b - &a, Tensor::vec(&[2.0, 3.0]));
    assert_eq!(&a * 2.0, Tensor::vec(&[2.0, 4.0]));
    assert_eq!(1.0 - &a, Tensor::vec(&[0.0, -1.0]));
    assert_eq!(b / a, Tensor::vec(&[3.0, 2.5]));
  }

  #[test]
  fn negate() {
    let a = Tensor::vec(&[1.0, -2.0]);
    assert_eq!(-&a, Tensor::vec(&[-1.0, 2.0]));
  }
}

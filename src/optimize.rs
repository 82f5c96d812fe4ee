use std::collections::HashMap;

use log::trace;

use crate::{
  scalar::Real,
  tensor::Tensor,
  graph::NodeId,
  machine::ValueGrad,
};


/// An optimization strategy to be used with [Optimizer].
///
/// Returns the change to be added to a parameter's value.

pub trait Strategy<R: Real> {
  fn update(&mut self, id: NodeId, value: &Tensor<R>, grad: &Tensor<R>, rate: R, step: usize) -> Tensor<R>;
}


/// Generic optimizer that allows for several optimization [strategies](Strategy) to be used.

#[derive(Debug, Clone)]
pub struct Optimizer<R: Real, S: Strategy<R>> {
  strategy: S,
  pub learning_rate: R,
  step: usize,
}

impl<R: Real, S: Strategy<R>> Optimizer<R, S> {
  pub fn new(learning_rate: R, strategy: S) -> Self {
    Self { strategy, learning_rate, step: 1 }
  }

  /// Number of the next step, starting at one.

  pub fn steps(&self) -> usize {
    self.step
  }

  /// Update parameters in place, using the gradients they come with.

  pub fn step(&mut self, params: Vec<ValueGrad<R>>) {
    for ValueGrad { id, value, grad } in params {
      let change = self.strategy.update(id, value, grad, self.learning_rate, self.step);
      value.add_assign(&change);
    }
    trace!("Optimizer step {} complete", self.step);
    self.step += 1;
  }
}


/// Stochastic Gradient Descent strategy

#[derive(Debug, Clone, Default)]
pub struct SGD;

impl<R: Real> Strategy<R> for SGD {
  fn update(&mut self, _id: NodeId, _value: &Tensor<R>, grad: &Tensor<R>, rate: R, _step: usize) -> Tensor<R> {
    grad * -rate
  }
}


/// Stochastic Gradient Descent with momentum

#[derive(Debug, Clone)]
pub struct Momentum<R: Real> {
  pub momentum: R,
  v: HashMap<NodeId, Tensor<R>>,
}

impl<R: Real> Momentum<R> {
  pub fn new(momentum: R) -> Self {
    Self {
      momentum,
      v: HashMap::new(),
    }
  }
}

impl<R: Real> Default for Momentum<R> {
  fn default() -> Self {
    Self::new(R::from(0.9).unwrap())
  }
}

impl<R: Real> Strategy<R> for Momentum<R> {
  fn update(&mut self, id: NodeId, value: &Tensor<R>, grad: &Tensor<R>, rate: R, _step: usize) -> Tensor<R> {
    let v = self.v.entry(id).or_insert_with(|| Tensor::zeros(value.dims()) );
    *v = &*v * self.momentum - grad * rate;
    v.clone()
  }
}


/// Stochastic Gradient Descent with Nesterov momentum

#[derive(Debug, Clone)]
pub struct Nesterov<R: Real> {
  pub momentum: R,
  v: HashMap<NodeId, Tensor<R>>,
}

impl<R: Real> Nesterov<R> {
  pub fn new(momentum: R) -> Self {
    Self {
      momentum,
      v: HashMap::new(),
    }
  }
}

impl<R: Real> Default for Nesterov<R> {
  fn default() -> Self {
    Self::new(R::from(0.9).unwrap())
  }
}

impl<R: Real> Strategy<R> for Nesterov<R> {
  fn update(&mut self, id: NodeId, value: &Tensor<R>, grad: &Tensor<R>, rate: R, _step: usize) -> Tensor<R> {
    let v = self.v.entry(id).or_insert_with(|| Tensor::zeros(value.dims()) );
    let v_prev = v.clone();
    *v = &v_prev * self.momentum - grad * rate;
    v_prev * -self.momentum + &*v * (R::one() + self.momentum)
  }
}


/// Adaptive Movement Estimation strategy (ADAM)

#[derive(Debug, Clone)]
pub struct Adam<R: Real> {
  pub beta1: R,
  pub beta2: R,
  pub epsilon: R,
  m: HashMap<NodeId, Tensor<R>>,
  v: HashMap<NodeId, Tensor<R>>,
}

impl<R: Real> Adam<R> {
  pub fn new(beta1: R, beta2: R) -> Self {
    Self {
      beta1,
      beta2,
      epsilon: R::from(1e-8).unwrap(),
      m: HashMap::new(),
      v: HashMap::new(),
    }
  }
}

impl<R: Real> Default for Adam<R> {
  fn default() -> Self {
    Self::new(R::from(0.9).unwrap(), R::from(0.999).unwrap())
  }
}

impl<R: Real> Strategy<R> for Adam<R> {
  fn update(&mut self, id: NodeId, value: &Tensor<R>, grad: &Tensor<R>, rate: R, step: usize) -> Tensor<R> {
    let m = self.m.entry(id).or_insert_with(|| Tensor::zeros(value.dims()) );
    *m = &*m * self.beta1 + grad * (R::one() - self.beta1);
    let v = self.v.entry(id).or_insert_with(|| Tensor::zeros(value.dims()) );
    *v = &*v * self.beta2 + grad.sqr() * (R::one() - self.beta2);
    let step = R::from(step).unwrap();
    let mt = &self.m[&id] / (R::one() - self.beta1.powf(step));
    let vt = &self.v[&id] / (R::one() - self.beta2.powf(step));
    mt * -rate / (vt.sqrt() + self.epsilon)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::{ graph::Graph, machine::TapeMachine };

  // Minimize mean((w - 3)^2) for a single weight
  fn quadratic<S: Strategy<f64>>(strategy: S, rate: f64, steps: usize) -> f64 {
    let mut g = Graph::new();
    let w = g.parameter("w", Tensor::new(&[1, 1], vec![0.0]));
    let target = g.constant(Tensor::new(&[1, 1], vec![3.0]));
    let diff = g.sub(w, target).unwrap();
    let sqr = g.sqr(diff).unwrap();
    let loss = g.mean(sqr).unwrap();
    g.grad(loss, &[w]).unwrap();
    let mut machine = TapeMachine::new(g);
    let mut optimizer = Optimizer::new(rate, strategy);
    for _ in 0..steps {
      machine.reset();
      machine.run_all().unwrap();
      optimizer.step(machine.value_grads(&[w]).unwrap());
    }
    machine.parameter(w).unwrap().item()
  }

  #[test]
  fn sgd() {
    assert!((quadratic(SGD, 0.1, 100) - 3.0).abs() < 1e-3);
  }

  #[test]
  fn momentum() {
    assert!((quadratic(Momentum::default(), 0.05, 200) - 3.0).abs() < 1e-2);
  }

  #[test]
  fn nesterov() {
    assert!((quadratic(Nesterov::default(), 0.05, 200) - 3.0).abs() < 1e-2);
  }

  #[test]
  fn adam() {
    assert!((quadratic(Adam::default(), 0.1, 500) - 3.0).abs() < 1e-2);
  }

  #[test]
  fn adam_first_step_is_rate_sized() {
    let mut g = Graph::<f64>::new();
    let id = g.parameter("w", Tensor::zeros(&[2]));
    let mut adam = Adam::default();
    let change: Tensor<f64> = adam.update(id, &Tensor::zeros(&[2]), &Tensor::vec(&[4.0, -0.5]), 0.05, 1);
    assert!((change.raw()[0] + 0.05).abs() < 1e-6);
    assert!((change.raw()[1] - 0.05).abs() < 1e-6);
  }

  #[test]
  fn counts_steps() {
    let mut optimizer = Optimizer::<f64, _>::new(0.1, SGD);
    assert_eq!(optimizer.steps(), 1);
    optimizer.step(vec![]);
    assert_eq!(optimizer.steps(), 2);
  }
}

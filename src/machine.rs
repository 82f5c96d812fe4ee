use std::collections::BTreeMap;

use log::{ debug, trace };

use crate::{
  error::{ GraphError, Result },
  graph::{ Graph, GradRequest, NodeId, NodeKind, Read },
  scalar::Real,
  tensor::Tensor,
};


/// Value of a parameter, along with its gradient if one was requested.

#[derive(Debug, Clone)]
pub struct Dual<T: Real> {
  pub value: Tensor<T>,
  pub grad: Option<Tensor<T>>,
}


/// A parameter's value, lent out mutably for an optimizer to update,
/// and the gradient computed for it by the last run.

#[derive(Debug)]
pub struct ValueGrad<'a, T: Real> {
  pub id: NodeId,
  pub value: &'a mut Tensor<T>,
  pub grad: &'a Tensor<T>,
}


/// Executes a [Graph] and holds all values it produces.
///
/// The machine takes ownership of the graph it was compiled from,
/// so each graph is executed by exactly one machine. Parameters are
/// stored as dual values, which survive [reset](Self::reset). Everything
/// else a run produced is discarded on reset, and intermediate values
/// that no [Read] handle points to are released as soon as a run ends.

#[derive(Debug)]
pub struct TapeMachine<T: Real> {
  graph: Graph<T>,
  duals: BTreeMap<NodeId, Dual<T>>,
  bindings: Vec<Option<Tensor<T>>>,
  values: Vec<Option<Tensor<T>>>,
  needs_grad: Vec<bool>,
  retained: Vec<bool>,
  runs: usize,
}

impl<T: Real> TapeMachine<T> {
  pub fn new(graph: Graph<T>) -> Self {
    let len = graph.len();
    let request = graph.gradients();
    let trained = |id: &NodeId| request.map_or(false, |r| r.wrt.contains(id) );

    let mut duals = BTreeMap::new();
    let mut needs_grad = vec![false; len];
    for (index, node) in graph.nodes().iter().enumerate() {
      let id = graph.id_of(index);
      let needs = match &node.kind {
        NodeKind::Parameter(init) => {
          duals.insert(id, Dual {
            value: init.clone(),
            grad: trained(&id).then(|| Tensor::zeros(init.dims()) ),
          });
          trained(&id)
        },
        NodeKind::Operation { inputs, .. } => inputs.iter().any(|input| needs_grad[input.index()] ),
        NodeKind::Placeholder | NodeKind::Constant(_) => false,
      };
      needs_grad[index] = needs;
    }

    let mut retained = vec![false; len];
    for read in graph.reads() {
      retained[read.index()] = true;
    }

    debug!("Compiled graph of {} nodes with {} parameters, {} trained",
      len, duals.len(), request.map_or(0, |r| r.wrt.len() ));

    Self {
      graph,
      duals,
      bindings: vec![None; len],
      values: vec![None; len],
      needs_grad,
      retained,
      runs: 0,
    }
  }

  pub fn graph(&self) -> &Graph<T> {
    &self.graph
  }

  /// Number of completed runs.

  pub fn runs(&self) -> usize {
    self.runs
  }

  /// Supply the value of a placeholder for the next run.

  pub fn bind(&mut self, node: NodeId, value: &Tensor<T>) -> Result<()> {
    let target = self.graph.node(node)?;
    if !matches!(target.kind, NodeKind::Placeholder) {
      return Err(GraphError::NotAPlaceholder(node))
    }
    if target.shape != *value.shape() {
      return Err(GraphError::ShapeMismatch {
        target: target.name.clone(),
        expected: target.shape.dims.clone(),
        found: value.dims().to_vec(),
      })
    }
    self.bindings[node.index()] = Some(value.clone());
    Ok(())
  }

  /// Current value of a parameter.

  pub fn parameter(&self, node: NodeId) -> Result<&Tensor<T>> {
    self.graph.node(node)?;
    self.duals.get(&node)
      .map(|dual| &dual.value )
      .ok_or(GraphError::NotTrainable(node))
  }

  /// Overwrite the value of a parameter.

  pub fn set_parameter(&mut self, node: NodeId, value: Tensor<T>) -> Result<()> {
    let name = self.graph.name(node)?.to_string();
    let dual = self.duals.get_mut(&node).ok_or(GraphError::NotTrainable(node))?;
    if dual.value.shape() != value.shape() {
      return Err(GraphError::ShapeMismatch {
        target: name,
        expected: dual.value.dims().to_vec(),
        found: value.dims().to_vec(),
      })
    }
    dual.value = value;
    Ok(())
  }

  /// Forget everything the last run produced, as well as all
  /// placeholder bindings. Parameter values are kept, their
  /// gradients are set to zero.

  pub fn reset(&mut self) {
    self.values.iter_mut().for_each(|value| *value = None );
    self.bindings.iter_mut().for_each(|binding| *binding = None );
    for dual in self.duals.values_mut() {
      if let Some(grad) = &mut dual.grad {
        grad.refill(T::zero());
      }
    }
  }

  /// Execute the whole graph. Computes gradients as well, if
  /// the graph has requested them.

  pub fn run_all(&mut self) -> Result<()> {
    self.forward()?;
    if let Some(request) = self.graph.gradients().cloned() {
      self.backward(&request)?;
    }
    self.release();
    self.runs += 1;
    trace!("Completed run {} over {} nodes", self.runs, self.graph.len());
    Ok(())
  }

  /// Value behind a read handle, if a run has produced it.

  pub fn read(&self, handle: &Read) -> Option<&Tensor<T>> {
    self.graph.node(handle.node()).ok()?;
    self.value_of(handle.node().index())
  }

  /// Gradient of a parameter, as computed by the last run.

  pub fn grad(&self, node: NodeId) -> Result<&Tensor<T>> {
    self.graph.node(node)?;
    self.duals.get(&node)
      .and_then(|dual| dual.grad.as_ref() )
      .ok_or(GraphError::NotTrainable(node))
  }

  /// Lend out value/gradient pairs of trained parameters for an optimizer.

  pub fn value_grads(&mut self, params: &[NodeId]) -> Result<Vec<ValueGrad<'_, T>>> {
    for &param in params {
      self.grad(param)?;
    }
    Ok(self.duals.iter_mut()
      .filter(|(id, _)| params.contains(*id) )
      .filter_map(|(&id, dual)| match dual {
        Dual { value, grad: Some(grad) } => Some(ValueGrad { id, value, grad }),
        _ => None,
      })
      .collect())
  }

  fn value_of(&self, index: usize) -> Option<&Tensor<T>> {
    match &self.graph.nodes()[index].kind {
      NodeKind::Placeholder => self.bindings[index].as_ref(),
      NodeKind::Parameter(_) => self.duals.get(&self.graph.id_of(index)).map(|dual| &dual.value ),
      NodeKind::Constant(value) => Some(value),
      NodeKind::Operation { .. } => self.values[index].as_ref(),
    }
  }

  fn arguments(&self, inputs: &[NodeId]) -> Result<Vec<&Tensor<T>>> {
    inputs.iter()
      .map(|&input| self.value_of(input.index()).ok_or(GraphError::NotComputed(input)) )
      .collect()
  }

  fn forward(&mut self) -> Result<()> {
    for (index, node) in self.graph.nodes().iter().enumerate() {
      match &node.kind {
        NodeKind::Placeholder if self.bindings[index].is_none() => {
          return Err(GraphError::UnboundPlaceholder { name: node.name.clone() })
        },
        NodeKind::Operation { op, inputs } => {
          let value = op.run(&self.arguments(inputs)?);
          self.values[index] = Some(value);
        },
        _ => {},
      }
    }
    Ok(())
  }

  fn backward(&mut self, request: &GradRequest) -> Result<()> {
    let loss = request.loss.index();
    let mut grads: Vec<Option<Tensor<T>>> = vec![None; self.graph.len()];
    let seed = self.value_of(loss).ok_or(GraphError::NotComputed(request.loss))?;
    grads[loss] = Some(Tensor::ones(seed.dims()));

    for (index, node) in self.graph.nodes().iter().enumerate().rev() {
      let NodeKind::Operation { op, inputs } = &node.kind else { continue };
      if !self.needs_grad[index] { continue }
      let Some(grad) = grads[index].take() else { continue };
      let changes = op.derive(&self.arguments(inputs)?, &grad);
      for (input, change) in inputs.iter().zip(changes) {
        if !self.needs_grad[input.index()] { continue }
        let slot = &mut grads[input.index()];
        *slot = Some(match slot.take() {
          Some(acc) => acc + change,
          None => change,
        });
      }
    }

    for param in &request.wrt {
      let grad = grads[param.index()].take();
      if let (Some(grad), Some(dual)) = (grad, self.duals.get_mut(param)) {
        if let Some(acc) = &mut dual.grad {
          acc.add_assign(&grad);
        }
      }
    }
    Ok(())
  }

  fn release(&mut self) {
    for (index, value) in self.values.iter_mut().enumerate() {
      if !self.retained[index] {
        *value = None;
      }
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  struct Fixture {
    machine: TapeMachine<f64>,
    input: NodeId,
    target: NodeId,
    weights: NodeId,
    output: Read,
    loss: Read,
  }

  // Single sigmoid unit with a bias column, trained on mean squared error
  fn fixture() -> Fixture {
    let mut g = Graph::new();
    let input = g.placeholder("input", &[2, 1]);
    let target = g.placeholder("target", &[2, 1]);
    let weights = g.parameter("weights", Tensor::new(&[2, 1], vec![0.5, -0.25]));
    let bias = g.constant(Tensor::ones(&[2, 1]));
    let biased = g.concat(1, input, bias).unwrap();
    let output = g.mm(biased, weights).unwrap();
    let output = g.sigmoid(output).unwrap();
    let diff = g.sub(output, target).unwrap();
    let sqr = g.sqr(diff).unwrap();
    let loss = g.mean(sqr).unwrap();
    let output = g.read(output).unwrap();
    let loss_read = g.read(loss).unwrap();
    g.grad(loss, &[weights]).unwrap();
    Fixture { machine: TapeMachine::new(g), input, target, weights, output, loss: loss_read }
  }

  fn bind_data(f: &mut Fixture) {
    f.machine.bind(f.input, &Tensor::new(&[2, 1], vec![0.0, 1.0])).unwrap();
    f.machine.bind(f.target, &Tensor::new(&[2, 1], vec![1.0, 0.0])).unwrap();
  }

  fn loss_at(weights: &[f64]) -> f64 {
    let mut f = fixture();
    f.machine.set_parameter(f.weights, Tensor::new(&[2, 1], weights.to_vec())).unwrap();
    bind_data(&mut f);
    f.machine.run_all().unwrap();
    f.machine.read(&f.loss).unwrap().item()
  }

  #[test]
  fn reads_are_unavailable_before_run() {
    let f = fixture();
    assert!(f.machine.read(&f.output).is_none());
    assert!(f.machine.read(&f.loss).is_none());
  }

  #[test]
  fn forward_values() {
    let mut f = fixture();
    bind_data(&mut f);
    f.machine.run_all().unwrap();
    let output = f.machine.read(&f.output).unwrap();
    let expected = [-0.25f64, 0.25].map(|x| 1.0 / (1.0 + (-x).exp()) );
    for (a, b) in output.raw().iter().zip(expected) {
      assert!((a - b).abs() < 1e-12);
    }
    assert_eq!(f.machine.runs(), 1);
  }

  #[test]
  fn gradients_match_finite_differences() {
    let mut f = fixture();
    bind_data(&mut f);
    f.machine.run_all().unwrap();
    let grad = f.machine.grad(f.weights).unwrap().clone();
    let eps = 1e-6;
    let w = [0.5, -0.25];
    for i in 0..2 {
      let (mut plus, mut minus) = (w, w);
      plus[i] += eps;
      minus[i] -= eps;
      let numeric = (loss_at(&plus) - loss_at(&minus)) / (2.0 * eps);
      assert!((grad.raw()[i] - numeric).abs() < 1e-6);
    }
  }

  #[test]
  fn reset_clears_run_state() {
    let mut f = fixture();
    bind_data(&mut f);
    f.machine.run_all().unwrap();
    f.machine.reset();
    assert!(f.machine.read(&f.loss).is_none());
    assert!(f.machine.grad(f.weights).unwrap().raw().iter().all(|&g| g == 0.0 ));
    assert_eq!(f.machine.parameter(f.weights).unwrap(), &Tensor::new(&[2, 1], vec![0.5, -0.25]));
    assert!(matches!(f.machine.run_all(), Err(GraphError::UnboundPlaceholder { .. })));
  }

  #[test]
  fn gradients_do_not_accumulate_across_resets() {
    let mut f = fixture();
    bind_data(&mut f);
    f.machine.run_all().unwrap();
    let first = f.machine.grad(f.weights).unwrap().clone();
    f.machine.reset();
    bind_data(&mut f);
    f.machine.run_all().unwrap();
    assert_eq!(f.machine.grad(f.weights).unwrap(), &first);
  }

  #[test]
  fn rejects_wrong_bindings() {
    let mut f = fixture();
    let err = f.machine.bind(f.input, &Tensor::zeros(&[1, 2])).unwrap_err();
    assert!(matches!(err, GraphError::ShapeMismatch { .. }));
    let err = f.machine.bind(f.weights, &Tensor::zeros(&[2, 1])).unwrap_err();
    assert!(matches!(err, GraphError::NotAPlaceholder(_)));
    let err = f.machine.set_parameter(f.weights, Tensor::zeros(&[3, 1])).unwrap_err();
    assert!(matches!(err, GraphError::ShapeMismatch { .. }));
  }

  #[test]
  fn lends_value_grads() {
    let mut f = fixture();
    bind_data(&mut f);
    f.machine.run_all().unwrap();
    let weights = f.weights;
    let mut pairs = f.machine.value_grads(&[weights]).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].id, weights);
    pairs[0].value.refill(0.0);
    drop(pairs);
    assert_eq!(f.machine.parameter(weights).unwrap(), &Tensor::zeros(&[2, 1]));
    assert!(matches!(f.machine.value_grads(&[f.input]), Err(GraphError::NotTrainable(_))));
  }
}

use itertools::Itertools;
use serde::{Serialize, Deserialize};

pub mod ops;

use crate::{
  internal::*,
  error::{ GraphError, Result },
  scalar::Real,
  shape::Shape,
  tensor::Tensor,
};

use ops::{ Op, Concat, MatMul, Sub, Sigmoid, Sqr, Mean };


/// Identity of a node, unique across all graphs of a process.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId {
  graph: usize,
  index: usize,
}

impl NodeId {
  pub fn index(&self) -> usize {
    self.index
  }
}

impl std::fmt::Display for NodeId {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Node #{} of graph {}", self.index, self.graph)
  }
}


/// Handle on a node whose value should stay available
/// after the graph has been run.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Read {
  node: NodeId,
}

impl Read {
  pub fn node(&self) -> NodeId {
    self.node
  }
}


#[derive(Debug, Clone)]
pub(crate) enum NodeKind<T: Real> {
  Placeholder,
  Parameter(Tensor<T>),
  Constant(Tensor<T>),
  Operation { op: Op, inputs: Vec<NodeId> },
}

#[derive(Debug, Clone)]
pub(crate) struct Node<T: Real> {
  pub name: String,
  pub shape: Shape,
  pub kind: NodeKind<T>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GradRequest {
  pub loss: NodeId,
  pub wrt: Vec<NodeId>,
}


/// Symbolic computation graph.
///
/// Nodes get appended as they are created, and may only refer
/// to nodes that already exist. The order of creation is thus a
/// valid order of execution. Shapes are checked when a node gets
/// created, so a graph that could be built will also run, as long
/// as its placeholders receive data of the declared shape.
///
/// Graphs hold no values of their own, besides initial parameter
/// values and constants. Use a [TapeMachine](crate::TapeMachine)
/// to execute them.

#[derive(Debug, Clone)]
pub struct Graph<T: Real> {
  id: usize,
  nodes: Vec<Node<T>>,
  reads: Vec<NodeId>,
  gradients: Option<GradRequest>,
}

impl<T: Real> Default for Graph<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Real> Graph<T> {
  pub fn new() -> Self {
    Self {
      id: make_id(),
      nodes: vec![],
      reads: vec![],
      gradients: None,
    }
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Node whose value gets supplied by the caller before every run.

  pub fn placeholder(&mut self, name: &str, dims: &[usize]) -> NodeId {
    self.push(name.to_string(), Shape::new(dims), NodeKind::Placeholder)
  }

  /// Node holding a value that may be trained. `init` serves as its
  /// value until it gets changed on a machine.

  pub fn parameter(&mut self, name: &str, init: Tensor<T>) -> NodeId {
    let shape = init.shape().clone();
    self.push(name.to_string(), shape, NodeKind::Parameter(init))
  }

  pub fn constant(&mut self, value: Tensor<T>) -> NodeId {
    let shape = value.shape().clone();
    let name = format!("constant{}", self.nodes.len());
    self.push(name, shape, NodeKind::Constant(value))
  }

  /// Join two nodes along dimension `dim`.

  pub fn concat(&mut self, dim: isize, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
    let rank = self.shape(lhs)?.rank();
    let dim = negative_index(dim, rank, false);
    self.operation(Op::Concat(Concat { dim }), &[lhs, rhs])
  }

  pub fn mm(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
    self.operation(Op::MatMul(MatMul), &[lhs, rhs])
  }

  pub fn sub(&mut self, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
    self.operation(Op::Sub(Sub), &[lhs, rhs])
  }

  pub fn sigmoid(&mut self, node: NodeId) -> Result<NodeId> {
    self.operation(Op::Sigmoid(Sigmoid), &[node])
  }

  pub fn sqr(&mut self, node: NodeId) -> Result<NodeId> {
    self.operation(Op::Sqr(Sqr), &[node])
  }

  pub fn mean(&mut self, node: NodeId) -> Result<NodeId> {
    self.operation(Op::Mean(Mean), &[node])
  }

  /// Keep the value of `node` available after every run.

  pub fn read(&mut self, node: NodeId) -> Result<Read> {
    self.node(node)?;
    if !self.reads.contains(&node) {
      self.reads.push(node);
    }
    Ok(Read { node })
  }

  /// Request gradients of the scalar `loss` with respect to
  /// the given parameters. Replaces any earlier request.

  pub fn grad(&mut self, loss: NodeId, wrt: &[NodeId]) -> Result<()> {
    let shape = self.shape(loss)?;
    if shape.size() != 1 {
      return Err(GraphError::NonScalarLoss(shape.dims.clone()))
    }
    for &param in wrt {
      if !matches!(self.node(param)?.kind, NodeKind::Parameter(_)) {
        return Err(GraphError::NotTrainable(param))
      }
    }
    self.gradients = Some(GradRequest {
      loss,
      wrt: wrt.iter().copied().unique().collect(),
    });
    Ok(())
  }

  pub fn shape(&self, node: NodeId) -> Result<&Shape> {
    Ok(&self.node(node)?.shape)
  }

  pub fn name(&self, node: NodeId) -> Result<&str> {
    Ok(&self.node(node)?.name)
  }

  /// All parameter nodes, in order of creation.

  pub fn parameters(&self) -> Vec<NodeId> {
    self.nodes.iter()
      .enumerate()
      .filter(|(_, node)| matches!(node.kind, NodeKind::Parameter(_)) )
      .map(|(index, _)| self.id_of(index) )
      .collect()
  }

  pub(crate) fn node(&self, node: NodeId) -> Result<&Node<T>> {
    if node.graph != self.id {
      return Err(GraphError::ForeignNode(node))
    }
    self.nodes.get(node.index).ok_or(GraphError::ForeignNode(node))
  }

  pub(crate) fn nodes(&self) -> &[Node<T>] {
    &self.nodes
  }

  pub(crate) fn reads(&self) -> &[NodeId] {
    &self.reads
  }

  pub(crate) fn gradients(&self) -> Option<&GradRequest> {
    self.gradients.as_ref()
  }

  pub(crate) fn id_of(&self, index: usize) -> NodeId {
    NodeId { graph: self.id, index }
  }

  fn push(&mut self, name: String, shape: Shape, kind: NodeKind<T>) -> NodeId {
    let id = self.id_of(self.nodes.len());
    self.nodes.push(Node { name, shape, kind });
    id
  }

  fn operation(&mut self, op: Op, inputs: &[NodeId]) -> Result<NodeId> {
    debug_assert_eq!(op.arity(), inputs.len());
    let shapes = inputs.iter()
      .map(|&input| self.shape(input) )
      .collect::<Result<Vec<_>>>()?;
    let shape = op.infer(&shapes).ok_or_else(|| GraphError::IncompatibleShapes {
      op: op.name(),
      lhs: shapes[0].dims.clone(),
      rhs: shapes.get(1).map(|s| s.dims.clone() ).unwrap_or_default(),
    })?;
    let name = format!("{}{}", op.name(), self.nodes.len());
    Ok(self.push(name, shape, NodeKind::Operation { op, inputs: inputs.to_vec() }))
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  fn xor_graph() -> (Graph<f64>, NodeId, NodeId, NodeId) {
    let mut g = Graph::new();
    let input = g.placeholder("input", &[4, 2]);
    let weights = g.parameter("weights", Tensor::ones(&[3, 1]));
    let bias = g.constant(Tensor::ones(&[4, 1]));
    let biased = g.concat(1, input, bias).unwrap();
    let output = g.mm(biased, weights).unwrap();
    let output = g.sigmoid(output).unwrap();
    (g, input, weights, output)
  }

  #[test]
  fn infers_shapes() {
    let (g, _, _, output) = xor_graph();
    assert_eq!(g.shape(output).unwrap(), &Shape::new(&[4, 1]));
    assert_eq!(g.len(), 6);
  }

  #[test]
  fn rejects_incompatible_shapes() {
    let (mut g, input, weights, _) = xor_graph();
    let err = g.mm(input, weights).unwrap_err();
    assert!(matches!(err, GraphError::IncompatibleShapes { op: "mm", .. }));
  }

  #[test]
  fn rejects_foreign_nodes() {
    let (mut g, ..) = xor_graph();
    let (_, other_input, ..) = xor_graph();
    assert!(matches!(g.sigmoid(other_input), Err(GraphError::ForeignNode(_))));
  }

  #[test]
  fn gradient_request() {
    let (mut g, input, weights, output) = xor_graph();
    assert!(matches!(g.grad(output, &[weights]), Err(GraphError::NonScalarLoss(_))));
    let loss = g.mean(output).unwrap();
    assert!(matches!(g.grad(loss, &[input]), Err(GraphError::NotTrainable(_))));
    g.grad(loss, &[weights, weights]).unwrap();
    assert_eq!(g.gradients().unwrap().wrt, vec![weights]);
  }

  #[test]
  fn lists_parameters() {
    let (g, _, weights, _) = xor_graph();
    assert_eq!(g.parameters(), vec![weights]);
  }

  #[test]
  fn reads_are_unique() {
    let (mut g, _, _, output) = xor_graph();
    let a = g.read(output).unwrap();
    let b = g.read(output).unwrap();
    assert_eq!(a, b);
    assert_eq!(g.reads(), &[output]);
  }
}

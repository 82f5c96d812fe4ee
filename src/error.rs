use std::fmt;
use std::io;

use crate::{ graph::NodeId, model::Mode };


pub type Result<T> = std::result::Result<T, GraphError>;


/// Everything that can go wrong while building, running or
/// persisting a graph.

#[derive(Debug)]
pub enum GraphError {
  /// A training operation was invoked on an inference model or vice versa.
  InvalidMode { operation: &'static str, mode: Mode },
  /// A tensor did not have the shape its destination requires.
  ShapeMismatch { target: String, expected: Vec<usize>, found: Vec<usize> },
  /// An operation was given operands that cannot be combined.
  IncompatibleShapes { op: &'static str, lhs: Vec<usize>, rhs: Vec<usize> },
  UnboundPlaceholder { name: String },
  NotAPlaceholder(NodeId),
  NotTrainable(NodeId),
  NonScalarLoss(Vec<usize>),
  ForeignNode(NodeId),
  /// A value was requested before any run produced it.
  NotComputed(NodeId),
  Io(io::Error),
  Serialization(postcard::Error),
  Config(serde_json::Error),
}

impl fmt::Display for GraphError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::InvalidMode { operation, mode } =>
        write!(f, "Cannot {operation} with a network that was created for {mode}"),
      Self::ShapeMismatch { target, expected, found } =>
        write!(f, "Shape mismatch for {target}: expected {expected:?}, found {found:?}"),
      Self::IncompatibleShapes { op, lhs, rhs } =>
        write!(f, "Incompatible shapes for {op}: {lhs:?} and {rhs:?}"),
      Self::UnboundPlaceholder { name } =>
        write!(f, "Placeholder '{name}' has no value bound"),
      Self::NotAPlaceholder(node) => write!(f, "{node} is not a placeholder"),
      Self::NotTrainable(node) => write!(f, "{node} is not a trainable parameter"),
      Self::NonScalarLoss(dims) => write!(f, "Loss must be a scalar, got shape {dims:?}"),
      Self::ForeignNode(node) => write!(f, "{node} belongs to a different graph"),
      Self::NotComputed(node) => write!(f, "{node} has not been computed yet"),
      Self::Io(err) => write!(f, "I/O error: {err}"),
      Self::Serialization(err) => write!(f, "Could not (de)serialize weights: {err}"),
      Self::Config(err) => write!(f, "Invalid configuration: {err}"),
    }
  }
}

impl std::error::Error for GraphError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Io(err) => Some(err),
      Self::Config(err) => Some(err),
      _ => None,
    }
  }
}

impl From<io::Error> for GraphError {
  fn from(err: io::Error) -> Self {
    Self::Io(err)
  }
}

impl From<postcard::Error> for GraphError {
  fn from(err: postcard::Error) -> Self {
    Self::Serialization(err)
  }
}

impl From<serde_json::Error> for GraphError {
  fn from(err: serde_json::Error) -> Self {
    Self::Config(err)
  }
}

//! Small feed-forward networks on a symbolic autodiff graph.
//! Tiny. Few dependencies. CPU only.
//!
//! # Features
//!
//! - **Checked graphs** — Shapes get inferred while a [Graph] is being built.
//! Incompatible operands are reported right away, so a graph that could be
//! built will also run.
//!
//! - **Explicit execution** — A [TapeMachine] owns its graph along with every
//! value computed from it. No global state, no shared tensors.
//!
//! - **Value semantics** — Tensors own their data. Weights move between networks
//! by copy only.
//!
//! - **Optimization** — Includes a range of standard optimizers, such as ADAM and Nesterov.
//!
//! # Examples
//!
//! Training a network on XOR, then predicting with a copy of its weights:
//! ```
//! use tapenet::{ FeedForward, Optimizer, Adam, Tensor };
//!
//! fn main() -> tapenet::Result<()> {
//!   let mut trainer = FeedForward::<f64>::new(true)?;
//!   let mut predictor = FeedForward::<f64>::new(false)?;
//!   let mut optimizer = Optimizer::new(0.05, Adam::default());
//!
//!   let x = Tensor::new(&[4, 2], vec![0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0]);
//!   let y = Tensor::new(&[4, 1], vec![0.0, 1.0, 1.0, 0.0]);
//!
//!   for _ in 0..1000 {
//!     trainer.fit_batch(&x, &y, &mut optimizer)?;
//!   }
//!
//!   trainer.copy_weights_to(&mut predictor)?;
//!   let output = predictor.predict_single(&Tensor::vec(&[0.0, 1.0]))?;
//!   println!("{}", output);
//!   Ok(())
//! }
//! ```
//!
//! Building and running a graph by hand:
//! ```
//! use tapenet::{ Graph, TapeMachine, Tensor };
//!
//! let mut g = Graph::<f32>::new();
//! let x = g.placeholder("x", &[1, 2]);
//! let w = g.parameter("w", Tensor::ones(&[2, 1]));
//! let y = g.mm(x, w).unwrap();
//! let y = g.sigmoid(y).unwrap();
//! let y = g.read(y).unwrap();
//!
//! let mut machine = TapeMachine::new(g);
//! machine.bind(x, &Tensor::new(&[1, 2], vec![0.5, -0.5])).unwrap();
//! machine.run_all().unwrap();
//! assert_eq!(machine.read(&y).unwrap().item(), 0.5);
//! ```
//!
//! ## More examples
//! Check the `/demos` folder for more example code.
//!
//!
//! # Optional features
//!
//! Some features can be toggled in your `Cargo.toml`.
//!
//! - `unsafe` *(default)* — Accelerated matrix math using [matrixmultiply] crate.

mod internal;
mod shape;
mod tensor;
mod error;
mod machine;
mod model;

pub mod scalar;
pub mod graph;
pub mod optimize;
pub mod config;

pub use shape::Shape;
pub use tensor::Tensor;
pub use error::{ GraphError, Result };
pub use graph::{ Graph, NodeId, Read };
pub use machine::{ TapeMachine, Dual, ValueGrad };
pub use model::{ FeedForward, Mode };
pub use optimize::{ Optimizer, Strategy, SGD, Momentum, Nesterov, Adam };
pub use config::{ ModelConfig, TrainConfig, StrategyKind };

use std::fmt;

use log::debug;
use rand::{ SeedableRng, rngs::StdRng };

mod snapshot;

use crate::{
  config::ModelConfig,
  error::{ GraphError, Result },
  graph::{ Graph, NodeId, Read },
  machine::TapeMachine,
  optimize::{ Optimizer, Strategy },
  scalar::Real,
  tensor::Tensor,
};


/// Whether a network was built to be trained or to make predictions.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Training,
  Inference,
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::Training => write!(f, "training"),
      Self::Inference => write!(f, "inference"),
    }
  }
}


#[derive(Debug, Clone, Copy)]
struct TrainingNodes {
  target: NodeId,
  loss: Read,
}


/// Feed-forward network with one hidden layer and sigmoid activations.
///
/// A bias column of ones gets appended to the inputs of both layers,
/// so every weight matrix carries one extra row for the bias. The
/// batch size is fixed when the network gets built.
///
/// Training mode networks have a mean squared error loss attached and
/// may only be fitted. Inference mode networks may only predict. Weights
/// get moved from one to the other with [copy_weights_to](Self::copy_weights_to).
///
/// ```
/// use tapenet::{ FeedForward, Optimizer, Adam, Tensor };
///
/// let mut trainer = FeedForward::<f32>::new(true)?;
/// let mut predictor = FeedForward::<f32>::new(false)?;
/// let mut optimizer = Optimizer::new(0.05, Adam::default());
///
/// let inputs = Tensor::new(&[4, 2], vec![0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0]);
/// let targets = Tensor::new(&[4, 1], vec![0.0, 1.0, 1.0, 0.0]);
/// trainer.fit_batch(&inputs, &targets, &mut optimizer)?;
///
/// trainer.copy_weights_to(&mut predictor)?;
/// let output = predictor.predict_single(&Tensor::vec(&[1.0, 0.0]))?;
/// assert_eq!(output.dims(), &[1]);
/// # Ok::<(), tapenet::GraphError>(())
/// ```

#[derive(Debug)]
pub struct FeedForward<T: Real> {
  config: ModelConfig,
  mode: Mode,
  batch_size: usize,
  machine: TapeMachine<T>,
  input: NodeId,
  hidden_weights: NodeId,
  output_weights: NodeId,
  output: Read,
  training: Option<TrainingNodes>,
}

impl<T: Real> FeedForward<T> {
  /// The 2-5-1 XOR network, with a batch of four samples
  /// for training or a single sample for inference.

  pub fn new(is_training: bool) -> Result<Self> {
    let (mode, batch_size) = if is_training {
      (Mode::Training, 4)
    } else {
      (Mode::Inference, 1)
    };
    Self::build(&ModelConfig::default(), mode, batch_size)
  }

  pub fn build(config: &ModelConfig, mode: Mode, batch_size: usize) -> Result<Self> {
    let mut rng = match config.seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
    };
    let gain = T::from(config.gain).unwrap_or_else(T::one);

    let mut g = Graph::new();
    let input = g.placeholder("input", &[batch_size, config.num_inputs]);
    let hidden_weights = g.parameter("hidden_weights",
      Tensor::glorot_normal(&config.hidden_dims(), gain, &mut rng));
    let output_weights = g.parameter("output_weights",
      Tensor::glorot_normal(&config.output_dims(), gain, &mut rng));
    let bias = g.constant(Tensor::ones(&[batch_size, 1]));

    let hidden = g.concat(1, input, bias)?;
    let hidden = g.mm(hidden, hidden_weights)?;
    let hidden = g.sigmoid(hidden)?;

    let output = g.concat(1, hidden, bias)?;
    let output = g.mm(output, output_weights)?;
    let output = g.sigmoid(output)?;

    let training = match mode {
      Mode::Training => {
        let target = g.placeholder("target", &[batch_size, config.num_outputs]);
        let diff = g.sub(output, target)?;
        let sqr = g.sqr(diff)?;
        let loss = g.mean(sqr)?;
        g.grad(loss, &[hidden_weights, output_weights])?;
        Some(TrainingNodes { target, loss: g.read(loss)? })
      },
      Mode::Inference => None,
    };
    let output = g.read(output)?;

    debug!("Built {}-{}-{} network for {} with batch size {}",
      config.num_inputs, config.num_hidden, config.num_outputs, mode, batch_size);

    Ok(Self {
      config: config.clone(),
      mode,
      batch_size,
      machine: TapeMachine::new(g),
      input,
      hidden_weights,
      output_weights,
      output,
      training,
    })
  }

  pub fn mode(&self) -> Mode {
    self.mode
  }

  pub fn batch_size(&self) -> usize {
    self.batch_size
  }

  pub fn config(&self) -> &ModelConfig {
    &self.config
  }

  pub fn hidden_weights(&self) -> Result<&Tensor<T>> {
    self.machine.parameter(self.hidden_weights)
  }

  pub fn output_weights(&self) -> Result<&Tensor<T>> {
    self.machine.parameter(self.output_weights)
  }

  /// Perform one optimization step on a batch of samples
  /// and return the loss before the step.

  pub fn fit_batch<S>(
    &mut self,
    inputs: &Tensor<T>,
    targets: &Tensor<T>,
    optimizer: &mut Optimizer<T, S>,
  ) -> Result<T>
  where
    S: Strategy<T>,
  {
    let Some(TrainingNodes { target, loss }) = self.training else {
      return Err(GraphError::InvalidMode { operation: "fit a batch", mode: self.mode })
    };

    self.machine.reset();
    self.machine.bind(self.input, inputs)?;
    self.machine.bind(target, targets)?;
    self.machine.run_all()?;

    let loss = self.machine.read(&loss)
      .ok_or(GraphError::NotComputed(loss.node()))?
      .item();

    let params = [self.hidden_weights, self.output_weights];
    optimizer.step(self.machine.value_grads(&params)?);

    Ok(loss)
  }

  /// Network output for a single sample of shape `[num_inputs]`.

  pub fn predict_single(&mut self, input: &Tensor<T>) -> Result<Tensor<T>> {
    if self.training.is_some() {
      return Err(GraphError::InvalidMode { operation: "predict", mode: self.mode })
    }

    let batch = input.unsqueeze(0);
    self.machine.reset();
    self.machine.bind(self.input, &batch)?;
    self.machine.run_all()?;

    let output = self.machine.read(&self.output)
      .ok_or(GraphError::NotComputed(self.output.node()))?;
    Ok(output.squeeze_only(0))
  }

  /// Overwrite the weights of `destination` with a copy of this network's
  /// weights. Nothing gets written unless both weight shapes agree.

  pub fn copy_weights_to(&self, destination: &mut Self) -> Result<()> {
    let hidden = self.hidden_weights()?;
    let output = self.output_weights()?;

    destination.check_weights(destination.hidden_weights, hidden)?;
    destination.check_weights(destination.output_weights, output)?;

    destination.machine.set_parameter(destination.hidden_weights, hidden.clone())?;
    destination.machine.set_parameter(destination.output_weights, output.clone())?;

    debug!("Copied weights from {} network to {} network", self.mode, destination.mode);
    Ok(())
  }

  fn check_weights(&self, node: NodeId, weights: &Tensor<T>) -> Result<()> {
    let current = self.machine.parameter(node)?;
    if current.shape() != weights.shape() {
      return Err(GraphError::ShapeMismatch {
        target: self.machine.graph().name(node)?.to_string(),
        expected: current.dims().to_vec(),
        found: weights.dims().to_vec(),
      })
    }
    Ok(())
  }
}

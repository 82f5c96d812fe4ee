use std::{ fs::File, io::BufReader, path::{ Path, PathBuf } };

use serde::{Serialize, Deserialize};

use crate::error::Result;


/// Layer sizes and initialization of a [FeedForward](crate::FeedForward) network.
///
/// Fields missing from a config file take their default,
/// which is the 2-5-1 network used for XOR.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
  pub num_inputs: usize,
  pub num_hidden: usize,
  pub num_outputs: usize,
  /// Multiplier for the standard deviation of initial weights.
  pub gain: f64,
  /// Seed for weight initialization. Fresh entropy is used when absent.
  pub seed: Option<u64>,
}

impl Default for ModelConfig {
  fn default() -> Self {
    Self {
      num_inputs: 2,
      num_hidden: 5,
      num_outputs: 1,
      gain: 1.0,
      seed: None,
    }
  }
}

impl ModelConfig {
  /// Shape of the weights feeding the hidden layer, bias row included.

  pub fn hidden_dims(&self) -> [usize; 2] {
    [self.num_inputs + 1, self.num_hidden]
  }

  /// Shape of the weights feeding the output layer, bias row included.

  pub fn output_dims(&self) -> [usize; 2] {
    [self.num_hidden + 1, self.num_outputs]
  }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
  Sgd,
  Momentum,
  Nesterov,
  Adam,
}


/// Settings for a training run of the `tapenet` binary.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
  pub epochs: usize,
  pub learning_rate: f64,
  pub strategy: StrategyKind,
  /// Only used by the momentum based strategies.
  pub momentum: f64,
  /// Log the loss every this many epochs. Zero disables logging.
  pub log_every: usize,
  pub model: ModelConfig,
  /// Where to store trained weights, if anywhere.
  pub save_to: Option<PathBuf>,
}

impl Default for TrainConfig {
  fn default() -> Self {
    Self {
      epochs: 1000,
      learning_rate: 0.05,
      strategy: StrategyKind::Adam,
      momentum: 0.9,
      log_every: 100,
      model: ModelConfig::default(),
      save_to: None,
    }
  }
}

impl TrainConfig {
  /// Read a config from a JSON file.

  pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
  }

  pub fn from_json(json: &str) -> Result<Self> {
    Ok(serde_json::from_str(json)?)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::GraphError;

  #[test]
  fn defaults() {
    let config = TrainConfig::default();
    assert_eq!(config.epochs, 1000);
    assert_eq!(config.strategy, StrategyKind::Adam);
    assert_eq!(config.model.hidden_dims(), [3, 5]);
    assert_eq!(config.model.output_dims(), [6, 1]);
  }

  #[test]
  fn partial_json() {
    let config = TrainConfig::from_json(r#"{
      "epochs": 50,
      "strategy": "nesterov",
      "model": { "num_hidden": 8, "seed": 7 }
    }"#).unwrap();
    assert_eq!(config.epochs, 50);
    assert_eq!(config.learning_rate, 0.05);
    assert_eq!(config.strategy, StrategyKind::Nesterov);
    assert_eq!(config.model.num_hidden, 8);
    assert_eq!(config.model.num_inputs, 2);
    assert_eq!(config.model.seed, Some(7));
    assert_eq!(config.save_to, None);
  }

  #[test]
  fn invalid_json() {
    let err = TrainConfig::from_json(r#"{ "strategy": "rmsprop" }"#).unwrap_err();
    assert!(matches!(err, GraphError::Config(_)));
  }

  #[test]
  fn missing_file() {
    let err = TrainConfig::load("/nonexistent/tapenet.json").unwrap_err();
    assert!(matches!(err, GraphError::Io(_)));
  }
}

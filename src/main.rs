use anyhow::{ ensure, Context, Result };
use log::info;

use tapenet::{
  FeedForward, Mode, ModelConfig, Tensor, TrainConfig, StrategyKind,
  Optimizer, Strategy, SGD, Momentum, Nesterov, Adam,
};


fn xor_dataset() -> (Tensor<f64>, Tensor<f64>) {
  (
    Tensor::new(&[4, 2], vec![0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0]),
    Tensor::new(&[4, 1], vec![0.0, 1.0, 1.0, 0.0]),
  )
}

// XOR samples have two inputs and a single target
fn check_fits_dataset(model: &ModelConfig) -> Result<()> {
  ensure!(model.num_inputs == 2 && model.num_outputs == 1,
    "XOR needs 2 inputs and 1 output, config has {} and {}", model.num_inputs, model.num_outputs);
  Ok(())
}

fn train<S: Strategy<f64>>(config: &TrainConfig, strategy: S) -> Result<()> {
  check_fits_dataset(&config.model)?;
  let (x, y) = xor_dataset();

  let mut trainer = FeedForward::build(&config.model, Mode::Training, 4)
    .context("Could not build training network")?;
  let mut predictor = FeedForward::build(&config.model, Mode::Inference, 1)
    .context("Could not build inference network")?;
  let mut optimizer = Optimizer::new(config.learning_rate, strategy);

  let mut loss = f64::NAN;
  for epoch in 0..config.epochs {
    loss = trainer.fit_batch(&x, &y, &mut optimizer)
      .with_context(|| format!("Training failed in epoch {}", epoch) )?;
    if config.log_every > 0 && epoch % config.log_every == 0 {
      info!("Epoch: {}, Loss: {:.3}", epoch, loss);
    }
  }
  info!("Finished {} epochs with loss {:.4}", config.epochs, loss);

  trainer.copy_weights_to(&mut predictor)?;

  for (sample, target) in x.raw().chunks(2).zip(y.raw()) {
    let output = predictor.predict_single(&Tensor::vec(sample))?;
    println!("{:?} -> {:.3?} (expected {})", sample, output.raw(), target);
  }

  if let Some(path) = &config.save_to {
    predictor.save_weights(path)
      .with_context(|| format!("Could not save weights to {}", path.display()) )?;
    info!("Saved weights to {}", path.display());
  }

  Ok(())
}

fn main() -> Result<()> {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  let config = match std::env::args().nth(1) {
    Some(path) => TrainConfig::load(&path)
      .with_context(|| format!("Could not read config from {}", path) )?,
    None => TrainConfig::default(),
  };

  match config.strategy {
    StrategyKind::Sgd => train(&config, SGD),
    StrategyKind::Momentum => train(&config, Momentum::new(config.momentum)),
    StrategyKind::Nesterov => train(&config, Nesterov::new(config.momentum)),
    StrategyKind::Adam => train(&config, Adam::default()),
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_other_layer_sizes() {
    assert!(check_fits_dataset(&ModelConfig::default()).is_ok());
    let wide = ModelConfig { num_outputs: 2, ..ModelConfig::default() };
    assert!(check_fits_dataset(&wide).is_err());
    let deep = ModelConfig { num_inputs: 3, ..ModelConfig::default() };
    assert!(check_fits_dataset(&deep).is_err());
  }

  #[test]
  fn zero_epochs_with_wrong_outputs_fails_cleanly() {
    let config = TrainConfig {
      epochs: 0,
      model: ModelConfig { num_outputs: 2, ..ModelConfig::default() },
      ..TrainConfig::default()
    };
    assert!(train(&config, SGD).is_err());
  }
}

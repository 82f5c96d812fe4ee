use std::{ fs, path::Path };

use log::debug;
use serde::{ Serialize, Deserialize, de::DeserializeOwned };

use crate::{
  error::Result,
  scalar::{ Inner, Real },
  tensor::Tensor,
};

use super::FeedForward;


#[derive(Serialize)]
struct WeightsRef<'a, T: Inner> {
  hidden: &'a Tensor<T>,
  output: &'a Tensor<T>,
}

#[derive(Deserialize)]
struct WeightsDump<T: Inner> {
  hidden: Tensor<T>,
  output: Tensor<T>,
}


impl<T> FeedForward<T>
where
  T: Real + Serialize + DeserializeOwned,
{
  /// Weights of both layers in postcard format.

  pub fn weights_to_bytes(&self) -> Result<Vec<u8>> {
    let dump = WeightsRef {
      hidden: self.hidden_weights()?,
      output: self.output_weights()?,
    };
    Ok(postcard::to_allocvec(&dump)?)
  }

  /// Replace both layers' weights with those found in `bytes`.
  /// Nothing gets written unless both weight shapes agree.

  pub fn weights_from_bytes(&mut self, bytes: &[u8]) -> Result<()> {
    let dump: WeightsDump<T> = postcard::from_bytes(bytes)?;
    self.check_weights(self.hidden_weights, &dump.hidden)?;
    self.check_weights(self.output_weights, &dump.output)?;
    self.machine.set_parameter(self.hidden_weights, dump.hidden)?;
    self.machine.set_parameter(self.output_weights, dump.output)?;
    Ok(())
  }

  pub fn save_weights<P: AsRef<Path>>(&self, path: P) -> Result<()> {
    let bytes = self.weights_to_bytes()?;
    fs::write(path.as_ref(), &bytes)?;
    debug!("Saved {} bytes of weights to {}", bytes.len(), path.as_ref().display());
    Ok(())
  }

  pub fn load_weights<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
    let bytes = fs::read(path.as_ref())?;
    self.weights_from_bytes(&bytes)?;
    debug!("Loaded weights from {}", path.as_ref().display());
    Ok(())
  }
}

// This example wraps the XOR network in two models built from the same
// configuration: one with a batch of four for training and one with a
// batch of one for prediction.

// After training, weights get copied over to the prediction model, which
// is then fed samples one at a time, as they might arrive in real time.

use tapenet::{ FeedForward, Tensor, Optimizer, Adam };

fn main() -> tapenet::Result<()> {
  env_logger::init();

  let x = Tensor::new(&[4, 2], vec![0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0]);
  let y = Tensor::new(&[4, 1], vec![0.0, 1.0, 1.0, 0.0]);

  let mut training_model = FeedForward::<f64>::new(true)?;
  let mut testing_model = FeedForward::<f64>::new(false)?;

  let mut optimizer = Optimizer::new(0.05, Adam::default());

  for epoch in 0..1000 {
    let loss = training_model.fit_batch(&x, &y, &mut optimizer)?;
    println!("Epoch: {}, Loss: {:.3}", epoch, loss);
  }

  training_model.copy_weights_to(&mut testing_model)?;

  let samples = [[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
  for (sample, expected) in samples.iter().zip(y.raw()) {
    let predicted = testing_model.predict_single(&Tensor::vec(sample))?;
    println!("Input: {:?}, Predicted Output: {:.3}, Actual Output: {:.3}",
      sample, predicted.item(), expected);
  }

  Ok(())
}

// This example builds a tiny XOR network directly on a graph and trains
// it with a tape machine, without any model abstraction.

// The whole dataset forms a single batch of four samples, so the very
// same graph can be used for prediction after training. Its target
// placeholder then simply needs to be bound as well.

// The bias column is a parameter that never gets trained, since it is
// left out of the gradient request.

use rand::{ SeedableRng, rngs::StdRng };

use tapenet::{ Graph, TapeMachine, Tensor, Optimizer, Adam };

fn main() -> tapenet::Result<()> {
  env_logger::init();

  let x = Tensor::new(&[4, 2], vec![0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0]);
  let y = Tensor::new(&[4, 1], vec![0.0, 1.0, 1.0, 0.0]);

  let (num_inputs, num_hidden, num_outputs) = (2, 2, 1);
  let dataset_length = 4;
  let mut rng = StdRng::from_entropy();

  // Describe the network
  let mut g = Graph::<f64>::new();
  let input = g.placeholder("input", &[dataset_length, num_inputs]);
  let weights_hidden = g.parameter("weights_hidden",
    Tensor::glorot_normal(&[num_inputs + 1, num_hidden], 1.0, &mut rng));
  let weights_output = g.parameter("weights_output",
    Tensor::glorot_normal(&[num_hidden + 1, num_outputs], 1.0, &mut rng));
  let bias = g.parameter("bias", Tensor::ones(&[dataset_length, 1]));

  let hidden = g.concat(1, input, bias)?;
  let hidden = g.mm(hidden, weights_hidden)?;
  let hidden = g.sigmoid(hidden)?;
  let output = g.concat(1, hidden, bias)?;
  let output = g.mm(output, weights_output)?;
  let output = g.sigmoid(output)?;
  let output_value = g.read(output)?;

  // Attach a mean squared error loss
  let target = g.placeholder("target", &[dataset_length, num_outputs]);
  let diff = g.sub(output, target)?;
  let sqr = g.sqr(diff)?;
  let loss = g.mean(sqr)?;
  let loss_value = g.read(loss)?;
  g.grad(loss, &[weights_hidden, weights_output])?;

  // Train
  let mut machine = TapeMachine::new(g);
  let mut optimizer = Optimizer::new(0.05, Adam::default());

  for epoch in 0..100 {
    machine.reset();
    machine.bind(input, &x)?;
    machine.bind(target, &y)?;
    machine.run_all()?;
    optimizer.step(machine.value_grads(&[weights_hidden, weights_output])?);
    if let Some(loss) = machine.read(&loss_value) {
      println!("Epoch: {}, Loss: {:.3}", epoch, loss.item());
    }
  }

  // Predict
  machine.reset();
  machine.bind(input, &x)?;
  machine.bind(target, &y)?;
  machine.run_all()?;

  println!("\nPredictions:");
  if let Some(predictions) = machine.read(&output_value) {
    for ((sample, expected), predicted) in x.raw().chunks(2).zip(y.raw()).zip(predictions.raw()) {
      println!("X: {:?}, Y: {}, YP: {:.2}", sample, expected, predicted);
    }
  }

  Ok(())
}

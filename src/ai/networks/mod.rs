mod feed_forward;

pub use feed_forward::{NetworkConfig, NeuralNetwork};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use tracing::{debug, warn};

use crate::checkpoint::ModelStore;
use crate::error::{NetworkError, StoreError};

const BLOB_MAGIC: &[u8; 4] = b"HIVN";
const BLOB_VERSION: u32 = 1;

// ─── Config ──────────────────────────────────────────────────────────────────

/// Network shape and training hyperparameters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Widths from input to output. The first must match the encoder.
    pub layer_sizes: Vec<usize>,
    pub learning_rate: f64,
    /// Seed for weight initialization.
    pub seed: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            layer_sizes: vec![1220, 512, 256, 128, 64],
            learning_rate: 0.001,
            seed: 42,
        }
    }
}

// ─── Network ─────────────────────────────────────────────────────────────────

/// Fully connected feed-forward network: ReLU hidden layers, sigmoid output.
///
/// `weights[l][i][j]` connects input `j` of layer `l` to output `i`.
/// `Clone` produces an independent deep copy.
#[derive(Debug, Clone, PartialEq)]
pub struct NeuralNetwork {
    layer_sizes: Vec<usize>,
    weights: Vec<Vec<Vec<f64>>>,
    biases: Vec<Vec<f64>>,
    learning_rate: f64,
}

impl NeuralNetwork {
    /// Build a freshly initialized network from a fixed seed.
    pub fn new(layer_sizes: &[usize], learning_rate: f64, seed: u64) -> Result<Self, NetworkError> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::with_rng(layer_sizes, learning_rate, &mut rng)
    }

    pub fn from_config(config: &NetworkConfig, seed: u64) -> Result<Self, NetworkError> {
        Self::new(&config.layer_sizes, config.learning_rate, seed)
    }

    /// Build a freshly initialized network drawing from `rng`.
    ///
    /// Weights are Gaussian with standard deviation √(2 / fan_in); biases
    /// start at zero.
    pub fn with_rng<R: Rng + ?Sized>(
        layer_sizes: &[usize],
        learning_rate: f64,
        rng: &mut R,
    ) -> Result<Self, NetworkError> {
        validate_layers(layer_sizes)?;
        if !(learning_rate > 0.0 && learning_rate.is_finite()) {
            return Err(NetworkError::InvalidLayers(format!(
                "learning rate must be positive, got {}",
                learning_rate
            )));
        }

        let mut weights = Vec::with_capacity(layer_sizes.len() - 1);
        let mut biases = Vec::with_capacity(layer_sizes.len() - 1);
        for pair in layer_sizes.windows(2) {
            let (fan_in, fan_out) = (pair[0], pair[1]);
            let std = (2.0 / fan_in as f64).sqrt();
            let layer: Vec<Vec<f64>> = (0..fan_out)
                .map(|_| {
                    (0..fan_in)
                        .map(|_| rng.sample::<f64, _>(StandardNormal) * std)
                        .collect()
                })
                .collect();
            weights.push(layer);
            biases.push(vec![0.0; fan_out]);
        }

        Ok(NeuralNetwork {
            layer_sizes: layer_sizes.to_vec(),
            weights,
            biases,
            learning_rate,
        })
    }

    pub fn layer_sizes(&self) -> &[usize] {
        &self.layer_sizes
    }

    pub fn input_width(&self) -> usize {
        self.layer_sizes[0]
    }

    pub fn output_width(&self) -> usize {
        self.layer_sizes[self.layer_sizes.len() - 1]
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn weights(&self) -> &[Vec<Vec<f64>>] {
        &self.weights
    }

    pub fn biases(&self) -> &[Vec<f64>] {
        &self.biases
    }

    /// Total number of weights and biases.
    pub fn parameter_count(&self) -> usize {
        self.layer_sizes
            .windows(2)
            .map(|p| p[0] * p[1] + p[1])
            .sum()
    }

    /// Run one input through the network. Every output lies in [0, 1].
    pub fn forward(&self, input: &[f64]) -> Result<Vec<f64>, NetworkError> {
        self.check_input(input)?;
        let mut activation = input.to_vec();
        for l in 0..self.weights.len() {
            activation = self.layer_output(l, &activation);
        }
        Ok(activation)
    }

    /// One step of plain stochastic gradient descent.
    ///
    /// `output_gradient` is the loss gradient with respect to the network's
    /// output and is pushed back through every layer, masking by the ReLU
    /// derivative on hidden layers. Deltas for the layer below are computed
    /// from the weights before this step's update. Returns the mean squared
    /// error between the pre-update output and `target`.
    pub fn train(
        &mut self,
        input: &[f64],
        target: &[f64],
        output_gradient: &[f64],
    ) -> Result<f64, NetworkError> {
        self.check_input(input)?;
        let out_width = self.output_width();
        for len in [target.len(), output_gradient.len()] {
            if len != out_width {
                return Err(NetworkError::OutputMismatch {
                    expected: out_width,
                    actual: len,
                });
            }
        }

        // activations[0] is the input, activations[l + 1] the output of layer l.
        let mut activations = Vec::with_capacity(self.weights.len() + 1);
        activations.push(input.to_vec());
        for l in 0..self.weights.len() {
            let next = self.layer_output(l, &activations[l]);
            activations.push(next);
        }

        let output = &activations[activations.len() - 1];
        let loss = output
            .iter()
            .zip(target)
            .map(|(o, t)| (o - t) * (o - t))
            .sum::<f64>()
            / out_width as f64;

        let lr = self.learning_rate;
        let mut delta = output_gradient.to_vec();
        for l in (0..self.weights.len()).rev() {
            let prev = &activations[l];

            let below = if l > 0 {
                let mut next_delta = vec![0.0; prev.len()];
                for (i, d) in delta.iter().enumerate() {
                    for (j, w) in self.weights[l][i].iter().enumerate() {
                        next_delta[j] += d * w;
                    }
                }
                for (nd, a) in next_delta.iter_mut().zip(prev) {
                    if *a <= 0.0 {
                        *nd = 0.0;
                    }
                }
                Some(next_delta)
            } else {
                None
            };

            for (i, d) in delta.iter().enumerate() {
                for (w, a) in self.weights[l][i].iter_mut().zip(prev) {
                    *w -= lr * d * a;
                }
                self.biases[l][i] -= lr * d;
            }

            if let Some(next_delta) = below {
                delta = next_delta;
            }
        }

        Ok(loss)
    }

    /// Perturb each weight and bias, independently with probability `rate`,
    /// by Gaussian noise scaled by `strength`.
    pub fn mutate<R: Rng + ?Sized>(&mut self, rate: f64, strength: f64, rng: &mut R) {
        let params = self
            .weights
            .iter_mut()
            .flat_map(|layer| layer.iter_mut().flat_map(|row| row.iter_mut()))
            .chain(self.biases.iter_mut().flat_map(|b| b.iter_mut()));
        for p in params {
            if rng.random::<f64>() < rate {
                *p += rng.sample::<f64, _>(StandardNormal) * strength;
            }
        }
    }

    /// Uniform crossover: every parameter is copied from one parent chosen by
    /// a fair coin flip.
    pub fn crossover<R: Rng + ?Sized>(
        &self,
        other: &NeuralNetwork,
        rng: &mut R,
    ) -> Result<NeuralNetwork, NetworkError> {
        if self.layer_sizes != other.layer_sizes {
            return Err(NetworkError::InvalidLayers(format!(
                "cannot cross {:?} with {:?}",
                self.layer_sizes, other.layer_sizes
            )));
        }

        let mut child = self.clone();
        let theirs = other
            .weights
            .iter()
            .flat_map(|layer| layer.iter().flat_map(|row| row.iter()))
            .chain(other.biases.iter().flat_map(|b| b.iter()));
        let mine = child
            .weights
            .iter_mut()
            .flat_map(|layer| layer.iter_mut().flat_map(|row| row.iter_mut()))
            .chain(child.biases.iter_mut().flat_map(|b| b.iter_mut()));
        for (c, o) in mine.zip(theirs) {
            if rng.random_bool(0.5) {
                *c = *o;
            }
        }
        Ok(child)
    }

    // ─── Persistence ─────────────────────────────────────────────────────────

    /// Serialize to the `HIVN` blob: magic, version, layer count, layer
    /// widths (u32), learning rate, then all weights and biases as
    /// little-endian f64.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + 4 * self.layer_sizes.len() + 8 * self.parameter_count());
        out.extend_from_slice(BLOB_MAGIC);
        out.extend_from_slice(&BLOB_VERSION.to_le_bytes());
        out.extend_from_slice(&(self.layer_sizes.len() as u32).to_le_bytes());
        for &w in &self.layer_sizes {
            out.extend_from_slice(&(w as u32).to_le_bytes());
        }
        out.extend_from_slice(&self.learning_rate.to_le_bytes());
        for layer in &self.weights {
            for row in layer {
                for w in row {
                    out.extend_from_slice(&w.to_le_bytes());
                }
            }
        }
        for layer in &self.biases {
            for b in layer {
                out.extend_from_slice(&b.to_le_bytes());
            }
        }
        out
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, NetworkError> {
        let mut reader = BlobReader { data, cursor: 0 };

        if reader.take(4)? != BLOB_MAGIC {
            return Err(NetworkError::CorruptBlob("bad magic".into()));
        }
        let version = reader.read_u32()?;
        if version != BLOB_VERSION {
            return Err(NetworkError::CorruptBlob(format!(
                "unsupported version: {}",
                version
            )));
        }

        let count = reader.read_u32()? as usize;
        if count < 2 || count > 64 {
            return Err(NetworkError::CorruptBlob(format!(
                "implausible layer count: {}",
                count
            )));
        }
        let mut layer_sizes = Vec::with_capacity(count);
        for _ in 0..count {
            layer_sizes.push(reader.read_u32()? as usize);
        }
        validate_layers(&layer_sizes).map_err(|e| NetworkError::CorruptBlob(e.to_string()))?;
        let learning_rate = reader.read_f64()?;

        let params: usize = layer_sizes.windows(2).map(|p| p[0] * p[1] + p[1]).sum();
        if reader.remaining() != params * 8 {
            return Err(NetworkError::CorruptBlob(format!(
                "size mismatch: {} bytes left, expected {}",
                reader.remaining(),
                params * 8
            )));
        }

        let mut weights = Vec::with_capacity(count - 1);
        for pair in layer_sizes.windows(2) {
            let mut layer = Vec::with_capacity(pair[1]);
            for _ in 0..pair[1] {
                let mut row = Vec::with_capacity(pair[0]);
                for _ in 0..pair[0] {
                    row.push(reader.read_f64()?);
                }
                layer.push(row);
            }
            weights.push(layer);
        }
        let mut biases = Vec::with_capacity(count - 1);
        for &width in &layer_sizes[1..] {
            let mut layer = Vec::with_capacity(width);
            for _ in 0..width {
                layer.push(reader.read_f64()?);
            }
            biases.push(layer);
        }

        Ok(NeuralNetwork {
            layer_sizes,
            weights,
            biases,
            learning_rate,
        })
    }

    /// Restore the network stored under `key`, or build a fresh one.
    ///
    /// A missing, unreadable, corrupt or differently shaped blob is not an
    /// error: it is logged and a freshly initialized network is returned.
    /// Only an invalid `config` fails.
    pub fn load_or_init(
        config: &NetworkConfig,
        store: &dyn ModelStore,
        key: &str,
        seed: u64,
    ) -> Result<Self, NetworkError> {
        let fresh = Self::from_config(config, seed)?;
        match store.read(key) {
            Ok(Some(bytes)) => match Self::from_bytes(&bytes) {
                Ok(net) if net.layer_sizes == config.layer_sizes => {
                    debug!(key, params = net.parameter_count(), "loaded network weights");
                    Ok(net)
                }
                Ok(net) => {
                    warn!(
                        key,
                        stored = ?net.layer_sizes,
                        expected = ?config.layer_sizes,
                        "stored network has a different shape, using random weights"
                    );
                    Ok(fresh)
                }
                Err(e) => {
                    warn!(key, error = %e, "failed to decode network, using random weights");
                    Ok(fresh)
                }
            },
            Ok(None) => {
                warn!(key, "no stored network, using random weights");
                Ok(fresh)
            }
            Err(e) => {
                warn!(key, error = %e, "failed to read network, using random weights");
                Ok(fresh)
            }
        }
    }

    pub fn save(&self, store: &dyn ModelStore, key: &str) -> Result<(), StoreError> {
        store.write(key, &self.to_bytes())
    }

    // ─── Internals ───────────────────────────────────────────────────────────

    fn check_input(&self, input: &[f64]) -> Result<(), NetworkError> {
        if input.len() != self.input_width() {
            return Err(NetworkError::DimensionMismatch {
                expected: self.input_width(),
                actual: input.len(),
            });
        }
        Ok(())
    }

    fn layer_output(&self, l: usize, input: &[f64]) -> Vec<f64> {
        let last = l == self.weights.len() - 1;
        self.weights[l]
            .iter()
            .zip(&self.biases[l])
            .map(|(row, b)| {
                let z = b + row.iter().zip(input).map(|(w, a)| w * a).sum::<f64>();
                if last {
                    sigmoid(z)
                } else {
                    z.max(0.0)
                }
            })
            .collect()
    }
}

fn validate_layers(layer_sizes: &[usize]) -> Result<(), NetworkError> {
    if layer_sizes.len() < 2 {
        return Err(NetworkError::InvalidLayers(format!(
            "need at least an input and an output layer, got {:?}",
            layer_sizes
        )));
    }
    if layer_sizes.iter().any(|&w| w == 0) {
        return Err(NetworkError::InvalidLayers(format!(
            "layer widths must be non-zero, got {:?}",
            layer_sizes
        )));
    }
    Ok(())
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

struct BlobReader<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> BlobReader<'a> {
    fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], NetworkError> {
        if self.remaining() < n {
            return Err(NetworkError::CorruptBlob(format!(
                "unexpected end of data at byte {}",
                self.cursor
            )));
        }
        let slice = &self.data[self.cursor..self.cursor + n];
        self.cursor += n;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32, NetworkError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn read_f64(&mut self) -> Result<f64, NetworkError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(f64::from_le_bytes(buf))
    }
}

//! Digit Classifier Network
//!
//! Two conv/pool stages followed by a two-layer classifier head:
//!
//! ```text
//! [B,1,28,28] -> conv(1->32) -> relu -> pool -> [B,32,14,14]
//!             -> conv(32->64) -> relu -> pool -> [B,64,7,7]
//!             -> flatten [B,3136] -> fc(128) -> relu -> dropout -> fc(10)
//! ```
//!
//! The output is raw logits; softmax is left to the caller.

use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d, Relu};
use burn::prelude::*;

/// Input image side length
pub const IMAGE_SIZE: usize = 28;

/// Number of output classes (digits 0-9)
pub const NUM_CLASSES: usize = 10;

/// Flattened feature length after the second pooling stage (64 x 7 x 7)
pub const FLATTENED_DIM: usize = 64 * 7 * 7;

/// Network configuration
#[derive(Config, Debug)]
pub struct DigitNetConfig {
    /// Output channels of the first convolution
    #[config(default = "32")]
    pub conv1_channels: usize,
    /// Output channels of the second convolution
    #[config(default = "64")]
    pub conv2_channels: usize,
    /// Hidden units of the first fully-connected layer
    #[config(default = "128")]
    pub hidden_dim: usize,
    /// Dropout rate (active only on autodiff backends)
    #[config(default = "0.5")]
    pub dropout: f64,
}

/// Convolutional digit classifier
#[derive(Module, Debug)]
pub struct DigitNet<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    pool: MaxPool2d,
    fc1: Linear<B>,
    fc2: Linear<B>,
    dropout: Dropout,
    activation: Relu,
}

impl DigitNetConfig {
    /// Initialize the network with fresh parameters
    pub fn init<B: Backend>(&self, device: &B::Device) -> DigitNet<B> {
        let conv1 = Conv2dConfig::new([1, self.conv1_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let conv2 = Conv2dConfig::new([self.conv1_channels, self.conv2_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        let flattened = self.conv2_channels * (IMAGE_SIZE / 4) * (IMAGE_SIZE / 4);
        let fc1 = LinearConfig::new(flattened, self.hidden_dim).init(device);
        let fc2 = LinearConfig::new(self.hidden_dim, NUM_CLASSES).init(device);

        DigitNet {
            conv1,
            conv2,
            pool,
            fc1,
            fc2,
            dropout: DropoutConfig::new(self.dropout).init(),
            activation: Relu::new(),
        }
    }
}

impl<B: Backend> DigitNet<B> {
    /// Forward pass: `[batch, 1, 28, 28]` -> `[batch, 10]` logits
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, _, _, _] = images.dims();

        let x = self.conv1.forward(images);
        let x = self.activation.forward(x);
        let x = self.pool.forward(x);

        let x = self.conv2.forward(x);
        let x = self.activation.forward(x);
        let x = self.pool.forward(x);

        let [_, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);

        let x = self.fc1.forward(x);
        let x = self.activation.forward(x);
        let x = self.dropout.forward(x);

        self.fc2.forward(x)
    }

    /// Check every parameter against the fixed topology.
    ///
    /// Returns a message naming the first mismatching parameter.
    pub fn validate_topology(&self) -> std::result::Result<(), String> {
        let expected = DigitNetConfig::new();
        let c1 = expected.conv1_channels;
        let c2 = expected.conv2_channels;
        let hidden = expected.hidden_dim;

        check_shape("conv1.weight", &self.conv1.weight.dims(), &[c1, 1, 3, 3])?;
        check_bias("conv1.bias", self.conv1.bias.as_ref().map(|b| b.dims()), c1)?;
        check_shape("conv2.weight", &self.conv2.weight.dims(), &[c2, c1, 3, 3])?;
        check_bias("conv2.bias", self.conv2.bias.as_ref().map(|b| b.dims()), c2)?;
        // burn stores linear weights as [in, out]
        check_shape("fc1.weight", &self.fc1.weight.dims(), &[FLATTENED_DIM, hidden])?;
        check_bias("fc1.bias", self.fc1.bias.as_ref().map(|b| b.dims()), hidden)?;
        check_shape("fc2.weight", &self.fc2.weight.dims(), &[hidden, NUM_CLASSES])?;
        check_bias("fc2.bias", self.fc2.bias.as_ref().map(|b| b.dims()), NUM_CLASSES)?;

        Ok(())
    }
}

fn check_shape(name: &str, actual: &[usize], expected: &[usize]) -> std::result::Result<(), String> {
    if actual != expected {
        return Err(format!(
            "parameter {name} has shape {actual:?}, expected {expected:?}"
        ));
    }
    Ok(())
}

fn check_bias(
    name: &str,
    actual: Option<[usize; 1]>,
    expected: usize,
) -> std::result::Result<(), String> {
    match actual {
        Some(dims) => check_shape(name, &dims, &[expected]),
        None => Err(format!("parameter {name} is missing")),
    }
}

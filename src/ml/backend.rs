//! Tensor backend and compute device selection.
//!
//! CPU inference runs on the ndarray backend. Building with the `wgpu`
//! feature swaps in the wgpu backend so `gpu` can target an accelerator.

use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "wgpu")]
pub type InferenceBackend = burn::backend::Wgpu;

#[cfg(not(feature = "wgpu"))]
pub type InferenceBackend = burn::backend::NdArray<f32>;

/// Backend used by the training loop (autodiff over the inference backend)
pub type TrainingBackend = burn::backend::Autodiff<InferenceBackend>;

pub type InferenceDevice = <InferenceBackend as Backend>::Device;

/// Binary compute device choice from configuration
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DeviceChoice {
    #[default]
    Cpu,
    Gpu,
}

impl DeviceChoice {
    /// Resolve to a concrete device of the compiled backend
    #[cfg(feature = "wgpu")]
    pub fn device(&self) -> InferenceDevice {
        use burn::backend::wgpu::WgpuDevice;

        match self {
            Self::Cpu => WgpuDevice::Cpu,
            Self::Gpu => WgpuDevice::BestAvailable,
        }
    }

    /// Resolve to a concrete device of the compiled backend
    #[cfg(not(feature = "wgpu"))]
    pub fn device(&self) -> InferenceDevice {
        if *self == Self::Gpu {
            tracing::warn!("built without the `wgpu` feature, falling back to CPU");
        }
        burn::backend::ndarray::NdArrayDevice::Cpu
    }
}

impl fmt::Display for DeviceChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Gpu => write!(f, "gpu"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_choice_parses_lowercase() {
        let choice: DeviceChoice = serde_json::from_str("\"gpu\"").unwrap();
        assert_eq!(choice, DeviceChoice::Gpu);
        assert_eq!(DeviceChoice::default().to_string(), "cpu");
    }
}

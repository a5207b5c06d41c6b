//! Inference engine: forward pass, softmax and top-1 extraction.

use std::sync::Mutex;

use burn::prelude::*;
use burn::tensor::activation::softmax;
use serde::Serialize;
use tracing::debug;

use super::network::{DigitNet, IMAGE_SIZE, NUM_CLASSES};
use crate::error::{RecognizerError, Result};

/// Top-1 prediction with the full class distribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Predicted digit, always the argmax of `probabilities`
    pub digit: usize,
    /// Probability mass on `digit`
    pub confidence: f32,
    /// Softmax distribution over the 10 classes
    pub probabilities: [f32; NUM_CLASSES],
}

impl Prediction {
    /// Build a prediction from a probability distribution.
    ///
    /// Ties resolve to the lowest class index.
    pub fn from_probabilities(probabilities: &[f32]) -> Result<Self> {
        let probabilities: [f32; NUM_CLASSES] = probabilities.try_into().map_err(|_| {
            RecognizerError::Inference(format!(
                "expected {NUM_CLASSES} class probabilities, got {}",
                probabilities.len()
            ))
        })?;
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(RecognizerError::Inference(
                "probabilities contain non-finite values".to_string(),
            ));
        }

        let mut digit = 0;
        for (idx, p) in probabilities.iter().enumerate() {
            if *p > probabilities[digit] {
                digit = idx;
            }
        }

        Ok(Self {
            digit,
            confidence: probabilities[digit],
            probabilities,
        })
    }
}

/// Turn `[batch, classes]` logits into per-row probability distributions.
///
/// burn's softmax subtracts the row max before exponentiating, so large
/// logits do not overflow.
pub fn probabilities_from_logits<B: Backend>(logits: Tensor<B, 2>) -> Tensor<B, 2> {
    softmax(logits, 1)
}

/// Owns a loaded network and runs single-image predictions
pub struct InferenceEngine<B: Backend> {
    // The lock only guards taking a handle; forward passes run on a clone
    // (parameters are shared by reference count, not copied).
    model: Mutex<DigitNet<B>>,
    device: B::Device,
}

impl<B: Backend> InferenceEngine<B> {
    pub fn new(model: DigitNet<B>, device: B::Device) -> Self {
        Self {
            model: Mutex::new(model),
            device,
        }
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    fn model_handle(&self) -> Result<DigitNet<B>> {
        self.model
            .lock()
            .map(|model| model.clone())
            .map_err(|_| RecognizerError::Internal("model handle lock poisoned".to_string()))
    }

    /// Run the network on a canonical `[1, 1, 28, 28]` tensor
    pub fn predict(&self, input: Tensor<B, 4>) -> Result<Prediction> {
        let dims = input.dims();
        if dims != [1, 1, IMAGE_SIZE, IMAGE_SIZE] {
            return Err(RecognizerError::Inference(format!(
                "expected input shape [1, 1, {IMAGE_SIZE}, {IMAGE_SIZE}], got {dims:?}"
            )));
        }

        let model = self.model_handle()?;
        let logits = model.forward(input.to_device(&self.device));
        let probabilities = probabilities_from_logits(logits);

        let values = probabilities
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| RecognizerError::Inference(format!("reading probabilities: {e:?}")))?;

        let prediction = Prediction::from_probabilities(&values)?;
        debug!(
            digit = prediction.digit,
            confidence = prediction.confidence,
            "prediction complete"
        );
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::network::DigitNetConfig;
    use burn::tensor::Distribution;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn engine() -> InferenceEngine<TestBackend> {
        let device = Default::default();
        let model = DigitNetConfig::new().init::<TestBackend>(&device);
        InferenceEngine::new(model, device)
    }

    fn assert_well_formed(prediction: &Prediction) {
        let sum: f32 = prediction.probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4, "sum = {sum}");
        assert!(prediction
            .probabilities
            .iter()
            .all(|p| (0.0..=1.0).contains(p)));
        assert!(prediction.digit < NUM_CLASSES);
        assert_eq!(
            prediction.confidence,
            prediction.probabilities[prediction.digit]
        );
        let max = prediction
            .probabilities
            .iter()
            .cloned()
            .fold(f32::MIN, f32::max);
        assert_eq!(prediction.confidence, max);
    }

    #[test]
    fn test_from_probabilities_picks_argmax() {
        let mut probs = [0.01_f32; NUM_CLASSES];
        probs[2] = 0.91;
        let prediction = Prediction::from_probabilities(&probs).unwrap();
        assert_eq!(prediction.digit, 2);
        assert_eq!(prediction.confidence, 0.91);
    }

    #[test]
    fn test_from_probabilities_rejects_wrong_length() {
        assert!(Prediction::from_probabilities(&[0.5, 0.5]).is_err());
    }

    #[test]
    fn test_ties_resolve_to_lowest_index() {
        let probs = [0.1_f32; NUM_CLASSES];
        let prediction = Prediction::from_probabilities(&probs).unwrap();
        assert_eq!(prediction.digit, 0);
    }

    #[test]
    fn test_random_inputs_yield_distributions() {
        let engine = engine();
        let device = Default::default();

        for _ in 0..5 {
            let input = Tensor::<TestBackend, 4>::random(
                [1, 1, IMAGE_SIZE, IMAGE_SIZE],
                Distribution::Uniform(0.0, 1.0),
                &device,
            );
            let prediction = engine.predict(input).unwrap();
            assert_well_formed(&prediction);
        }
    }

    #[test]
    fn test_blank_input_is_well_formed() {
        let engine = engine();
        let input = Tensor::<TestBackend, 4>::zeros([1, 1, IMAGE_SIZE, IMAGE_SIZE], &Default::default());
        let prediction = engine.predict(input).unwrap();
        assert_well_formed(&prediction);
    }

    #[test]
    fn test_rejects_wrong_shape() {
        let engine = engine();
        let input = Tensor::<TestBackend, 4>::zeros([1, 1, 14, 14], &Default::default());
        assert!(matches!(
            engine.predict(input),
            Err(RecognizerError::Inference(_))
        ));
    }

    #[test]
    fn test_repeated_calls_agree() {
        let engine = engine();
        let input = Tensor::<TestBackend, 4>::ones([1, 1, IMAGE_SIZE, IMAGE_SIZE], &Default::default());
        let a = engine.predict(input.clone()).unwrap();
        let b = engine.predict(input).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_extreme_logits_stay_finite() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_floats(
            [[1000.0, 999.0, -1000.0, 0.0, 500.0, -500.0, 88.0, 89.0, -89.0, 1e4]],
            &device,
        );
        let values = probabilities_from_logits(logits)
            .into_data()
            .to_vec::<f32>()
            .unwrap();

        assert_eq!(values.len(), NUM_CLASSES);
        assert!(values.iter().all(|p| p.is_finite() && (0.0..=1.0).contains(p)));
        let sum: f32 = values.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4, "sum = {sum}");

        let prediction = Prediction::from_probabilities(&values).unwrap();
        assert_eq!(prediction.digit, 9);
    }

    #[test]
    fn test_shared_engine_across_threads() {
        let engine = std::sync::Arc::new(engine());
        let input = Tensor::<TestBackend, 4>::random(
            [1, 1, IMAGE_SIZE, IMAGE_SIZE],
            Distribution::Uniform(0.0, 1.0),
            &Default::default(),
        );
        let expected = engine.predict(input.clone()).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = std::sync::Arc::clone(&engine);
                let input = input.clone();
                std::thread::spawn(move || engine.predict(input).unwrap())
            })
            .collect();

        for handle in handles {
            let prediction = handle.join().unwrap();
            assert_well_formed(&prediction);
            assert_eq!(prediction, expected);
        }
    }
}

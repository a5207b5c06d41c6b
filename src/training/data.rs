use burn::{
    data::{dataloader::batcher::Batcher, dataset::vision::MnistItem},
    prelude::*,
};

use crate::ml::IMAGE_SIZE;

/// Mean and standard deviation of the training set pixel intensities
pub const PIXEL_MEAN: f32 = 0.1307;
pub const PIXEL_STD: f32 = 0.3081;

#[derive(Clone, Debug)]
pub struct DigitBatcher<B: Backend> {
    device: B::Device,
}

#[derive(Clone, Debug)]
pub struct DigitBatch<B: Backend> {
    /// `[batch, 1, 28, 28]`, standardized
    pub images: Tensor<B, 4>,
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> DigitBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<MnistItem, DigitBatch<B>> for DigitBatcher<B> {
    fn batch(&self, items: Vec<MnistItem>) -> DigitBatch<B> {
        let images = items
            .iter()
            .map(|item| TensorData::from(item.image).convert::<B::FloatElem>())
            .map(|data| Tensor::<B, 2>::from_data(data, &self.device))
            .map(|tensor| tensor.reshape([1, 1, IMAGE_SIZE, IMAGE_SIZE]))
            .map(|tensor| ((tensor / 255) - PIXEL_MEAN) / PIXEL_STD)
            .collect();

        let targets = items
            .iter()
            .map(|item| {
                Tensor::<B, 1, Int>::from_data(
                    [(item.label as i64).elem::<B::IntElem>()],
                    &self.device,
                )
            })
            .collect();

        let images = Tensor::cat(images, 0);
        let targets = Tensor::cat(targets, 0);

        DigitBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn item(value: f32, label: u8) -> MnistItem {
        MnistItem {
            image: [[value; IMAGE_SIZE]; IMAGE_SIZE],
            label,
        }
    }

    #[test]
    fn test_batch_shapes_and_labels() {
        let batcher = DigitBatcher::<TestBackend>::new(Default::default());
        let batch = batcher.batch(vec![item(0.0, 3), item(255.0, 7)]);

        assert_eq!(batch.images.dims(), [2, 1, 28, 28]);
        let labels = batch.targets.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert_eq!(labels, vec![3, 7]);
    }

    #[test]
    fn test_pixels_are_standardized() {
        let batcher = DigitBatcher::<TestBackend>::new(Default::default());
        let batch = batcher.batch(vec![item(0.0, 0), item(255.0, 1)]);
        let values = batch.images.into_data().convert::<f32>().to_vec::<f32>().unwrap();

        let background = (0.0 - PIXEL_MEAN) / PIXEL_STD;
        let ink = (1.0 - PIXEL_MEAN) / PIXEL_STD;
        assert!((values[0] - background).abs() < 1e-5);
        assert!((values[values.len() - 1] - ink).abs() < 1e-5);
    }
}

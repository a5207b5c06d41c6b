//! Model-quality check against trained weights.
//!
//! Runs only when `DIGITS_TRAINED_WEIGHTS` points at weights produced by
//! `digit-recognizer train`.

use std::path::PathBuf;

use digit_recognizer::{
    ml::{load_model, DeviceChoice, InferenceBackend, InferenceEngine},
    preprocess::normalize_image,
};
use image::{DynamicImage, GrayImage, Luma};

/// A "7" drawn in black on a white canvas: a top bar and a diagonal stem.
fn render_seven() -> DynamicImage {
    let mut canvas = GrayImage::from_pixel(28, 28, Luma([255]));
    for x in 6..22 {
        for y in 5..8 {
            canvas.put_pixel(x, y, Luma([0]));
        }
    }
    for y in 8..24 {
        // stem runs from (20, 8) down-left to about (12, 23)
        let x = 20 - (y - 8) / 2;
        for dx in 0..3 {
            canvas.put_pixel(x + dx - 1, y, Luma([0]));
        }
    }
    DynamicImage::ImageLuma8(canvas)
}

#[test]
fn trained_model_recognizes_seven() {
    let Some(path) = std::env::var_os("DIGITS_TRAINED_WEIGHTS").map(PathBuf::from) else {
        eprintln!("Skipping model-quality test: DIGITS_TRAINED_WEIGHTS is not set");
        return;
    };

    let device = DeviceChoice::Cpu.device();
    let model = load_model::<InferenceBackend>(&path, &device).expect("failed to load trained weights");
    let engine = InferenceEngine::new(model, device);

    let tensor = normalize_image::<InferenceBackend>(&render_seven(), engine.device());
    let prediction = engine.predict(tensor).expect("prediction failed");

    assert_eq!(prediction.digit, 7, "probabilities: {:?}", prediction.probabilities);
}

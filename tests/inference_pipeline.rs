use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use digit_recognizer::{
    error::ErrorKind,
    ml::{load_model, save_model, DeviceChoice, DigitNetConfig, InferenceBackend, InferenceEngine},
    preprocess::ImageInput,
    services::recognize,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

fn engine_with_fresh_weights(dir: &tempfile::TempDir) -> InferenceEngine<InferenceBackend> {
    let device = DeviceChoice::Cpu.device();
    let path = dir.path().join("net");
    let model = DigitNetConfig::new().init::<InferenceBackend>(&device);
    let written = save_model(&model, &path).expect("failed to write weights");
    assert_eq!(written.extension().and_then(|e| e.to_str()), Some("mpk"));

    // Loading by the extensionless path resolves to the same file.
    let model = load_model::<InferenceBackend>(&path, &device).expect("failed to load weights");
    InferenceEngine::new(model, device)
}

fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("failed to encode image");
    bytes
}

#[test]
fn blank_canvas_yields_well_formed_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with_fresh_weights(&dir);
    let white = DynamicImage::ImageRgb8(RgbImage::from_pixel(280, 280, Rgb([255, 255, 255])));

    let prediction = recognize(&engine, &ImageInput::RawBytesPayload(encode(&white, ImageFormat::Png)))
        .expect("prediction failed");

    assert!(prediction.digit < 10);
    let sum: f32 = prediction.probabilities.iter().sum();
    assert!((sum - 1.0).abs() < 1e-4);
    assert_eq!(prediction.confidence, prediction.probabilities[prediction.digit]);
}

#[test]
fn same_image_in_different_containers_agrees() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with_fresh_weights(&dir);
    let mut canvas = RgbImage::from_pixel(56, 56, Rgb([255, 255, 255]));
    for y in 8..48 {
        canvas.put_pixel(28, y, Rgb([0, 0, 0]));
        canvas.put_pixel(29, y, Rgb([0, 0, 0]));
    }
    let image = DynamicImage::ImageRgb8(canvas);

    let from_png = recognize(&engine, &ImageInput::RawBytesPayload(encode(&image, ImageFormat::Png))).unwrap();
    let from_bmp = recognize(&engine, &ImageInput::RawBytesPayload(encode(&image, ImageFormat::Bmp))).unwrap();
    let from_base64 = recognize(
        &engine,
        &ImageInput::Base64Payload(format!(
            "data:image/png;base64,{}",
            BASE64.encode(encode(&image, ImageFormat::Png))
        )),
    )
    .unwrap();

    assert_eq!(from_png, from_bmp);
    assert_eq!(from_png, from_base64);
}

#[test]
fn undecodable_input_is_classified_as_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with_fresh_weights(&dir);

    let err = recognize(&engine, &ImageInput::RawBytesPayload(vec![0u8; 64])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ImageDecode);

    let err = recognize(&engine, &ImageInput::Base64Payload("!!!".into())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ImageDecode);
}

#[test]
fn missing_weights_are_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let device = DeviceChoice::Cpu.device();
    let err = load_model::<InferenceBackend>(&dir.path().join("absent.mpk"), &device).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModelUnavailable);
}

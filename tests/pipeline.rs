// 该文件是 DermaScan （皮肤镜） 项目的一部分。
// tests/pipeline.rs - 端到端流水线测试
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{io::Cursor, path::Path, sync::Arc, thread};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{Local, TimeZone};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use dermascan::{
  analysis::{NO_FINDING_LABEL, PrimaryCondition},
  catalog::ClassCatalog,
  frame::InputTensor,
  input::ImagePayload,
  model::{
    DEFAULT_CLASSIFICATION_FILE, DEFAULT_DETECTION_FILE, InferenceError, Model, ModelLoadError,
    ModelRegistryBuilder, ModelVariant, RawScores, ScoreModel,
  },
  pipeline::{Pipeline, ReportRequest},
};

/// 按输入图像左上角像素的红色通道决定输出，便于在并发测试中区分请求
struct RedChannelModel;

impl Model for RedChannelModel {
  type Input = InputTensor;
  type Output = RawScores;
  type Error = InferenceError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let red = input.at(0, 0, 0);
    let mut scores = vec![0.1; 5];
    let index = if red > 0.0 { 0 } else { 4 };
    scores[index] = 0.9;
    Ok(RawScores::from(scores))
  }
}

fn loader(
  _path: &Path,
  _variant: ModelVariant,
  _catalog: &ClassCatalog,
) -> Result<Box<ScoreModel>, ModelLoadError> {
  Ok(Box::new(RedChannelModel))
}

fn png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
  let mut buffer = Cursor::new(Vec::new());
  DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    .write_to(&mut buffer, ImageFormat::Png)
    .unwrap();
  buffer.into_inner()
}

fn data_uri(bytes: &[u8]) -> String {
  format!("data:image/png;base64,{}", STANDARD.encode(bytes))
}

fn find(haystack: &[u8], needle: &str) -> Option<usize> {
  haystack
    .windows(needle.len())
    .position(|w| w == needle.as_bytes())
}

fn detection_pipeline() -> (tempfile::TempDir, Pipeline) {
  let dir = tempfile::tempdir().unwrap();
  std::fs::write(dir.path().join(DEFAULT_DETECTION_FILE), b"stub").unwrap();
  let model = ModelRegistryBuilder::new(dir.path())
    .build_with(&loader)
    .unwrap();
  (dir, Pipeline::new(model.into_handle()))
}

#[test]
fn registry_prefers_detection_and_falls_back() {
  let (_dir, pipeline) = detection_pipeline();
  assert_eq!(pipeline.model().variant(), ModelVariant::Detection);
  assert_eq!(pipeline.model_info().model_type, "Detection Model");

  let dir = tempfile::tempdir().unwrap();
  std::fs::write(dir.path().join(DEFAULT_CLASSIFICATION_FILE), b"stub").unwrap();
  let model = ModelRegistryBuilder::new(dir.path())
    .build_with(&loader)
    .unwrap();
  assert_eq!(model.variant(), ModelVariant::Classification);

  let empty = tempfile::tempdir().unwrap();
  assert!(matches!(
    ModelRegistryBuilder::new(empty.path()).build_with(&loader),
    Err(ModelLoadError::NotFound(_))
  ));
}

#[test]
fn classification_variant_softmaxes_scores() {
  let dir = tempfile::tempdir().unwrap();
  std::fs::write(dir.path().join(DEFAULT_CLASSIFICATION_FILE), b"stub").unwrap();
  let model = ModelRegistryBuilder::new(dir.path())
    .build_with(&loader)
    .unwrap();
  let pipeline = Pipeline::new(model.into_handle());

  let result = pipeline
    .classify(&ImagePayload::from(png(16, 16, [255, 0, 0])))
    .unwrap();
  assert!((result.scores().sum() - 1.0).abs() < 1e-4);
  assert_eq!(result.primary(), PrimaryCondition::Catalog(0));
}

#[test]
fn concurrent_requests_share_one_model() {
  let (_dir, pipeline) = detection_pipeline();
  let handle = Arc::clone(pipeline.model());

  let workers: Vec<_> = (0..8)
    .map(|i| {
      let pipeline = pipeline.clone();
      thread::spawn(move || {
        let color = if i % 2 == 0 { [255, 0, 0] } else { [0, 0, 0] };
        let payload = ImagePayload::from(data_uri(&png(20 + i, 10, color)));
        (i, pipeline.classify(&payload).unwrap())
      })
    })
    .collect();

  for worker in workers {
    let (i, result) = worker.join().unwrap();
    let expected = if i % 2 == 0 { "Acne" } else { "Rosacea" };
    assert_eq!(result.primary_label(), expected);
    assert!((result.confidence() - 0.9).abs() < 1e-6);
  }

  assert_eq!(Arc::strong_count(&handle), 2);
}

#[test]
fn detection_without_finding_reports_healthy_skin() {
  struct Quiet;
  impl Model for Quiet {
    type Input = InputTensor;
    type Output = RawScores;
    type Error = InferenceError;
    fn infer(&self, _input: &Self::Input) -> Result<Self::Output, Self::Error> {
      Ok(RawScores::from(vec![0.2, 0.3, 0.1, 0.4, 0.05]))
    }
  }

  let dir = tempfile::tempdir().unwrap();
  std::fs::write(dir.path().join(DEFAULT_DETECTION_FILE), b"stub").unwrap();
  let quiet = |_: &Path, _: ModelVariant, _: &ClassCatalog| -> Result<Box<ScoreModel>, ModelLoadError> {
    Ok(Box::new(Quiet))
  };
  let model = ModelRegistryBuilder::new(dir.path())
    .build_with(&quiet)
    .unwrap();
  let response = Pipeline::new(model.into_handle())
    .classify(&ImagePayload::from(png(8, 8, [1, 2, 3])))
    .unwrap()
    .to_response();

  assert_eq!(response.primary_condition, NO_FINDING_LABEL);
  assert!((response.confidence - 0.6).abs() < 1e-6);
  assert!(!response.class_names.iter().any(|c| c == NO_FINDING_LABEL));
}

fn report_request(image: String, extras: &str) -> ReportRequest {
  serde_json::from_str(&format!(
    r#"{{
      "image": {},
      "patient_name": "Jane Doe",
      "analysis_data": {{
        "predictions": {{"Acne": 0.05, "Actinic Keratosis": 0.72, "Basal Cell Carcinoma": 0.45,
                         "Eczema": 0.1, "Rosacea": 0.02}},
        "primary_condition": "Actinic Keratosis",
        "confidence": 0.72
        {}
      }}
    }}"#,
    serde_json::to_string(&image).unwrap(),
    extras
  ))
  .unwrap()
}

#[test]
fn report_contains_sections_in_order() {
  let (_dir, pipeline) = detection_pipeline();
  let now = Local.with_ymd_and_hms(2026, 5, 20, 8, 15, 42).unwrap();
  let request = report_request(data_uri(&png(800, 600, [200, 120, 90])), "");
  let report = pipeline.generate_report_at(&request, now).unwrap();

  assert_eq!(report.filename, "medical_report_Jane_Doe_20260520_081542.pdf");
  let bytes = &report.bytes;
  let order = [
    "(Inveep Inc) Tj",
    "(MedicImage - DermaScan) Tj",
    "(SKIN ANALYSIS REPORT) Tj",
    "(PATIENT INFORMATION) Tj",
    "(ANALYZED IMAGE) Tj",
    "(ANALYSIS RESULTS) Tj",
    "(RECOMMENDATIONS) Tj",
    "(RECOMMENDED PRODUCTS) Tj",
    "(IMPORTANT DISCLAIMER) Tj",
  ];
  let positions: Vec<usize> = order.iter().map(|s| find(bytes, s).unwrap()).collect();
  assert!(positions.windows(2).all(|w| w[0] < w[1]));

  assert!(find(bytes, "/Width 800 /Height 600").is_some());
  assert!(find(bytes, "(72.0%) Tj").is_some());
  assert!(find(bytes, "(High) Tj").is_some());
  assert!(find(bytes, "(Medium) Tj").is_some());
  assert!(find(bytes, "(Please consult with a dermatologist for personalized").is_some());
  assert!(find(bytes, "(Product recommendations will be available").is_some());
}

#[test]
fn report_caps_products_and_numbers_recommendations() {
  let (_dir, pipeline) = detection_pipeline();
  let products: Vec<String> = (1..=7)
    .map(|i| format!(r#"{{"name": "Item{}", "brand": "B", "rating": 4, "price": "$9"}}"#, i))
    .collect();
  let extras = format!(
    r#", "recommendations": ["Apply sunscreen", "See a dermatologist"], "products": [{}]"#,
    products.join(",")
  );
  let request = report_request(data_uri(&png(30, 60, [0, 0, 0])), &extras);
  let report = pipeline.generate_report(&request).unwrap();
  let bytes = &report.bytes;

  assert!(find(bytes, "(1. Apply sunscreen) Tj").is_some());
  assert!(find(bytes, "(2. See a dermatologist) Tj").is_some());
  assert!(find(bytes, "(Item5) Tj").is_some());
  assert!(find(bytes, "(Item6) Tj").is_none());
  assert!(find(bytes, "(Please consult with a dermatologist").is_none());
}

#[test]
fn corrupt_report_image_degrades_gracefully() {
  let (_dir, pipeline) = detection_pipeline();
  let request = report_request("data:image/png;base64,!!!!".to_string(), "");
  let report = pipeline.generate_report(&request).unwrap();

  assert!(find(&report.bytes, "(Image could not be processed:").is_some());
  assert!(find(&report.bytes, "(ANALYSIS RESULTS) Tj").is_some());
}

// 该文件是 DermaScan （皮肤镜） 项目的一部分。
// src/inference.rs - 推理与分数解释
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

use tracing::{debug, error, info};

use crate::{
  analysis::{AnalysisError, AnalysisResult, PrimaryCondition, ScoreVector},
  catalog::ClassCatalog,
  frame::InputTensor,
  model::{InferenceError, LoadedModel, ModelVariant, RawScores},
};

/// 检测模型的判定阈值，分数必须严格大于该值
pub const DETECTION_THRESHOLD: f32 = 0.5;

/// 前向计算并按模型语义解释分数
pub fn analyze(model: &LoadedModel, input: &InputTensor) -> Result<AnalysisResult, InferenceError> {
  debug!("执行模型推理");
  let raw = model.forward(input)?;
  debug!("模型原始输出: {:?}", raw.as_slice());
  interpret(model.variant(), model.catalog(), &raw)
}

/// 根据模型语义把原始分数转换为分析结果
pub fn interpret(
  variant: ModelVariant,
  catalog: &ClassCatalog,
  raw: &RawScores,
) -> Result<AnalysisResult, InferenceError> {
  if raw.len() != catalog.len() {
    error!(
      "模型输出长度 {} 与类别数 {} 不一致",
      raw.len(),
      catalog.len()
    );
    return Err(InferenceError::ShapeMismatch {
      expected: catalog.len(),
      found: raw.len(),
    });
  }

  if let Some((class, &value)) = catalog
    .iter()
    .zip(raw.as_slice())
    .find(|(_, v)| !v.is_finite())
  {
    return Err(InferenceError::NonFinite {
      class: class.to_string(),
      value,
    });
  }

  let result = match variant {
    ModelVariant::Classification => classify(catalog, raw.as_slice()),
    ModelVariant::Detection => detect(catalog, raw.as_slice()),
  }?;

  info!(
    "推理结果: {} (置信度 {:.4})",
    result.primary_label(),
    result.confidence()
  );
  Ok(result)
}

fn classify(catalog: &ClassCatalog, logits: &[f32]) -> Result<AnalysisResult, InferenceError> {
  let probabilities = softmax(logits);
  let (index, confidence) = argmax(&probabilities);
  let scores = ScoreVector::new(catalog.clone(), probabilities).map_err(out_of_range)?;
  AnalysisResult::new(scores, PrimaryCondition::Catalog(index), confidence).map_err(out_of_range)
}

fn detect(catalog: &ClassCatalog, probabilities: &[f32]) -> Result<AnalysisResult, InferenceError> {
  let scores = ScoreVector::new(catalog.clone(), probabilities.to_vec()).map_err(out_of_range)?;

  let detected = probabilities
    .iter()
    .copied()
    .enumerate()
    .filter(|&(_, p)| p > DETECTION_THRESHOLD)
    .fold(None, |best: Option<(usize, f32)>, (i, p)| match best {
      Some((_, q)) if q >= p => best,
      _ => Some((i, p)),
    });

  let (primary, confidence) = match detected {
    Some((index, p)) => (PrimaryCondition::Catalog(index), p),
    None => {
      debug!("没有类别超过检测阈值 {}", DETECTION_THRESHOLD);
      (PrimaryCondition::NoFinding, 1.0 - scores.max())
    }
  };
  AnalysisResult::new(scores, primary, confidence).map_err(out_of_range)
}

fn out_of_range(err: AnalysisError) -> InferenceError {
  match err {
    AnalysisError::InvalidProbability { class, value } => InferenceError::OutOfRange { class, value },
    AnalysisError::InvalidConfidence(value) => InferenceError::OutOfRange {
      class: "confidence".to_string(),
      value,
    },
    AnalysisError::MissingClass(_)
    | AnalysisError::UnknownClass(_)
    | AnalysisError::ConfidenceMismatch { .. }
    | AnalysisError::FindingAboveThreshold { .. } => {
      InferenceError::Backend(err.to_string())
    }
  }
}

/// 数值稳定的 softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
  let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
  let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
  let sum: f32 = exps.iter().sum();
  exps.into_iter().map(|e| e / sum).collect()
}

/// 最大值及其下标，相同值取第一个
fn argmax(values: &[f32]) -> (usize, f32) {
  values
    .iter()
    .copied()
    .enumerate()
    .fold((0, f32::NEG_INFINITY), |(bi, bv), (i, v)| {
      if v > bv { (i, v) } else { (bi, bv) }
    })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::analysis::NO_FINDING_LABEL;

  fn catalog() -> ClassCatalog {
    ClassCatalog::new(["A", "B", "C", "D", "E"]).unwrap()
  }

  fn run(variant: ModelVariant, raw: &[f32]) -> Result<AnalysisResult, InferenceError> {
    interpret(variant, &catalog(), &RawScores::from(raw.to_vec()))
  }

  #[test]
  fn classification_scores_sum_to_one() {
    for raw in [
      [1.0, 2.0, 3.0, 4.0, 5.0],
      [-30.0, 0.0, 12.5, 80.0, -2.0],
      [0.0; 5],
    ] {
      let result = run(ModelVariant::Classification, &raw).unwrap();
      assert!((result.scores().sum() - 1.0).abs() < 1e-4);
      assert!(result.scores().values().iter().all(|v| (0.0..=1.0).contains(v)));
    }
  }

  #[test]
  fn classification_picks_argmax() {
    let result = run(ModelVariant::Classification, &[0.1, 3.0, 0.2, 2.9, -1.0]).unwrap();
    assert_eq!(result.primary(), PrimaryCondition::Catalog(1));
    assert_eq!(result.primary_label(), "B");
    assert_eq!(result.confidence(), result.scores().get("B").unwrap());
  }

  #[test]
  fn detection_does_not_renormalize() {
    let raw = [0.9, 0.8, 0.7, 0.1, 0.2];
    let result = run(ModelVariant::Detection, &raw).unwrap();
    assert_eq!(result.scores().values(), &raw);
    assert!((result.scores().sum() - 2.7).abs() < 1e-5);
    assert_eq!(result.primary_label(), "A");
    assert_eq!(result.confidence(), 0.9);
  }

  #[test]
  fn detection_without_finding_reports_inverse_confidence() {
    let result = run(ModelVariant::Detection, &[0.2, 0.3, 0.1, 0.4, 0.05]).unwrap();
    assert_eq!(result.primary(), PrimaryCondition::NoFinding);
    assert_eq!(result.primary_label(), NO_FINDING_LABEL);
    assert!((result.confidence() - 0.6).abs() < 1e-6);
  }

  #[test]
  fn detection_threshold_is_exclusive() {
    let result = run(ModelVariant::Detection, &[0.5, 0.5, 0.1, 0.0, 0.0]).unwrap();
    assert_eq!(result.primary(), PrimaryCondition::NoFinding);
    assert!((result.confidence() - 0.5).abs() < 1e-6);
  }

  #[test]
  fn detection_ties_prefer_catalog_order() {
    let result = run(ModelVariant::Detection, &[0.8, 0.8, 0.1, 0.1, 0.1]).unwrap();
    assert_eq!(result.primary(), PrimaryCondition::Catalog(0));

    let result = run(ModelVariant::Detection, &[0.1, 0.6, 0.1, 0.95, 0.95]).unwrap();
    assert_eq!(result.primary_label(), "D");
  }

  #[test]
  fn shape_mismatch_is_fatal() {
    let err = run(ModelVariant::Classification, &[0.1, 0.2, 0.3]).unwrap_err();
    assert!(matches!(
      err,
      InferenceError::ShapeMismatch {
        expected: 5,
        found: 3
      }
    ));
  }

  #[test]
  fn non_finite_and_unbounded_outputs_are_rejected() {
    assert!(matches!(
      run(ModelVariant::Classification, &[0.1, f32::NAN, 0.3, 0.0, 0.0]),
      Err(InferenceError::NonFinite { class, .. }) if class == "B"
    ));
    assert!(matches!(
      run(ModelVariant::Detection, &[0.1, 1.7, 0.3, 0.0, 0.0]),
      Err(InferenceError::OutOfRange { class, .. }) if class == "B"
    ));
  }
}

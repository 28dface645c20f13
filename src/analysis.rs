// 该文件是 DermaScan （皮肤镜） 项目的一部分。
// src/analysis.rs - 分析结果定义
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

use std::collections::HashMap;

use serde::{Deserialize, Serialize, ser::SerializeMap};
use thiserror::Error;

use crate::{catalog::ClassCatalog, inference::DETECTION_THRESHOLD, report::ProductEntry};

/// 没有任何类别超过检测阈值时报告的标签，不属于类别表
pub const NO_FINDING_LABEL: &str = "Healthy Skin";

/// 置信度与对应分数比较时允许的误差
pub const CONFIDENCE_TOLERANCE: f32 = 1e-4;

#[derive(Error, Debug, PartialEq)]
pub enum AnalysisError {
  #[error("缺少类别 '{0}' 的概率")]
  MissingClass(String),
  #[error("未知类别 '{0}'")]
  UnknownClass(String),
  #[error("类别 '{class}' 的概率 {value} 不在 [0, 1] 内")]
  InvalidProbability { class: String, value: f32 },
  #[error("置信度 {0} 不在 [0, 1] 内")]
  InvalidConfidence(f32),
  #[error("主要病症 '{label}' 的置信度应为 {expected}, 实际为 {found}")]
  ConfidenceMismatch {
    label: String,
    expected: f32,
    found: f32,
  },
  #[error("类别 '{class}' 的概率 {value} 超过检测阈值, 不能报告为未检出")]
  FindingAboveThreshold { class: String, value: f32 },
}

fn is_probability(value: f32) -> bool {
  value.is_finite() && (0.0..=1.0).contains(&value)
}

/// 类别名到概率的映射，按类别表顺序存储，每个类别恰好一项
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreVector {
  catalog: ClassCatalog,
  values: Box<[f32]>,
}

impl ScoreVector {
  /// 长度必须与类别表一致，且每个值都在 [0, 1] 内
  pub fn new(catalog: ClassCatalog, values: Vec<f32>) -> Result<Self, AnalysisError> {
    if values.len() < catalog.len() {
      let missing = catalog.name(values.len()).unwrap_or_default();
      return Err(AnalysisError::MissingClass(missing.to_string()));
    }
    if values.len() > catalog.len() {
      return Err(AnalysisError::UnknownClass(format!("#{}", catalog.len())));
    }
    for (class, &value) in catalog.iter().zip(values.iter()) {
      if !is_probability(value) {
        return Err(AnalysisError::InvalidProbability {
          class: class.to_string(),
          value,
        });
      }
    }
    Ok(Self {
      catalog,
      values: values.into_boxed_slice(),
    })
  }

  /// 按类别表顺序重排外部传入的名称映射，多余或缺失的类别都是错误
  pub fn from_map(
    catalog: ClassCatalog,
    predictions: &HashMap<String, f32>,
  ) -> Result<Self, AnalysisError> {
    if let Some(unknown) = predictions.keys().find(|k| catalog.index_of(k).is_none()) {
      return Err(AnalysisError::UnknownClass(unknown.clone()));
    }
    let values = catalog
      .iter()
      .map(|name| {
        predictions
          .get(name)
          .copied()
          .ok_or_else(|| AnalysisError::MissingClass(name.to_string()))
      })
      .collect::<Result<Vec<_>, _>>()?;
    Self::new(catalog, values)
  }

  pub fn catalog(&self) -> &ClassCatalog {
    &self.catalog
  }

  pub fn values(&self) -> &[f32] {
    &self.values
  }

  pub fn get(&self, name: &str) -> Option<f32> {
    self.catalog.index_of(name).map(|i| self.values[i])
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
    self.catalog.iter().zip(self.values.iter().copied())
  }

  pub fn max(&self) -> f32 {
    self.values.iter().copied().fold(0.0, f32::max)
  }

  pub fn sum(&self) -> f32 {
    self.values.iter().sum()
  }
}

impl Serialize for ScoreVector {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.values.len()))?;
    for (name, value) in self.iter() {
      map.serialize_entry(name, &value)?;
    }
    map.end()
  }
}

/// 主要病症：类别表中的某一项，或未检出任何病症
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryCondition {
  Catalog(usize),
  NoFinding,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
  scores: ScoreVector,
  primary: PrimaryCondition,
  confidence: f32,
}

impl AnalysisResult {
  /// 置信度必须等于主要病症的概率；未检出时所有分数都不超过检测阈值，
  /// 置信度等于 `1 - max`
  pub fn new(
    scores: ScoreVector,
    primary: PrimaryCondition,
    confidence: f32,
  ) -> Result<Self, AnalysisError> {
    if !is_probability(confidence) {
      return Err(AnalysisError::InvalidConfidence(confidence));
    }

    let expected = match primary {
      PrimaryCondition::Catalog(index) => *scores
        .values()
        .get(index)
        .ok_or_else(|| AnalysisError::UnknownClass(format!("#{}", index)))?,
      PrimaryCondition::NoFinding => {
        if let Some((class, value)) = scores.iter().find(|&(_, p)| p > DETECTION_THRESHOLD) {
          return Err(AnalysisError::FindingAboveThreshold {
            class: class.to_string(),
            value,
          });
        }
        1.0 - scores.max()
      }
    };

    if (confidence - expected).abs() > CONFIDENCE_TOLERANCE {
      let label = match primary {
        PrimaryCondition::Catalog(index) => scores.catalog().name(index).unwrap_or_default(),
        PrimaryCondition::NoFinding => NO_FINDING_LABEL,
      };
      return Err(AnalysisError::ConfidenceMismatch {
        label: label.to_string(),
        expected,
        found: confidence,
      });
    }

    Ok(Self {
      scores,
      primary,
      confidence,
    })
  }

  pub fn scores(&self) -> &ScoreVector {
    &self.scores
  }

  pub fn primary(&self) -> PrimaryCondition {
    self.primary
  }

  pub fn confidence(&self) -> f32 {
    self.confidence
  }

  pub fn primary_label(&self) -> &str {
    match self.primary {
      PrimaryCondition::Catalog(index) => self.scores.catalog().name(index).unwrap_or_default(),
      PrimaryCondition::NoFinding => NO_FINDING_LABEL,
    }
  }

  pub fn to_response(&self) -> ClassificationResponse {
    ClassificationResponse {
      success: true,
      predictions: self.scores.clone(),
      primary_condition: self.primary_label().to_string(),
      confidence: self.confidence,
      class_names: self.scores.catalog().to_vec(),
    }
  }
}

/// 分类接口返回给外部服务层的结构
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResponse {
  pub success: bool,
  pub predictions: ScoreVector,
  pub primary_condition: String,
  pub confidence: f32,
  pub class_names: Vec<String>,
}

/// 报告接口中外部服务层回传的分析数据，可能附带建议与产品
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisData {
  pub predictions: HashMap<String, f32>,
  pub primary_condition: String,
  pub confidence: f32,
  #[serde(default)]
  pub recommendations: Vec<String>,
  #[serde(default)]
  pub products: Vec<ProductEntry>,
}

impl AnalysisData {
  /// 按类别表校验并转换为强类型的分析结果
  pub fn to_analysis(&self, catalog: &ClassCatalog) -> Result<AnalysisResult, AnalysisError> {
    let scores = ScoreVector::from_map(catalog.clone(), &self.predictions)?;
    let primary = if self.primary_condition == NO_FINDING_LABEL {
      PrimaryCondition::NoFinding
    } else {
      catalog
        .index_of(&self.primary_condition)
        .map(PrimaryCondition::Catalog)
        .ok_or_else(|| AnalysisError::UnknownClass(self.primary_condition.clone()))?
    };
    AnalysisResult::new(scores, primary, self.confidence)
  }
}

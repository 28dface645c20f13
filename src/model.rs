// 该文件是 DermaScan （皮肤镜） 项目的一部分。
// src/model.rs - 模型
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

use std::path::PathBuf;

use thiserror::Error;

use crate::frame::InputTensor;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 骨干网络加分类头，输出每个类别一个原始分数
pub type ScoreModel = dyn Model<Input = InputTensor, Output = RawScores, Error = InferenceError> + Send + Sync;

/// 模型输出语义，加载时确定，进程生命周期内不变
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelVariant {
  /// 互斥单标签，原始分数经 softmax 归一化
  Classification,
  /// 每个类别独立的 [0, 1] 概率（sigmoid 头），不做跨类别归一化
  Detection,
}

impl ModelVariant {
  pub fn model_type(&self) -> &'static str {
    match self {
      ModelVariant::Classification => "Classification Model",
      ModelVariant::Detection => "Detection Model",
    }
  }
}

impl std::fmt::Display for ModelVariant {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.model_type())
  }
}

/// 模型头的原始输出，一个类别一个值
#[derive(Debug, Clone, PartialEq)]
pub struct RawScores(pub Box<[f32]>);

impl From<Vec<f32>> for RawScores {
  fn from(scores: Vec<f32>) -> Self {
    RawScores(scores.into_boxed_slice())
  }
}

impl RawScores {
  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.0
  }
}

#[derive(Error, Debug)]
pub enum ModelLoadError {
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("未找到模型文件, 已检查: {0:?}")]
  NotFound(Vec<PathBuf>),
  #[error("模型加载错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("模型无效: {path}, 错误: {reason}")]
  ModelInvalid { path: PathBuf, reason: String },
  #[error("模型结构不匹配: {path}, 期望输出 {expected} 个类别, 实际输出形状 {found:?}")]
  ArchitectureMismatch {
    path: PathBuf,
    expected: usize,
    found: Vec<usize>,
  },
  #[error("当前构建未启用任何模型后端")]
  NoBackend,
}

#[derive(Error, Debug)]
pub enum InferenceError {
  #[error("模型输出长度不匹配: 期望 {expected}, 实际 {found}")]
  ShapeMismatch { expected: usize, found: usize },
  #[error("模型输出包含非有限值: 类别 {class} = {value}")]
  NonFinite { class: String, value: f32 },
  #[error("检测头输出超出 [0, 1]: 类别 {class} = {value}")]
  OutOfRange { class: String, value: f32 },
  #[error("推理后端错误: {0}")]
  Backend(String),
}

pub mod registry;
pub use self::registry::{
  LoadedModel, ModelHandle, ModelLoader, ModelRegistryBuilder, DEFAULT_CLASSIFICATION_FILE,
  DEFAULT_DETECTION_FILE,
};

#[cfg(feature = "model_onnx")]
mod onnx;
#[cfg(feature = "model_onnx")]
pub use self::onnx::{OnnxLoader, OnnxModel, OnnxModelBuilder};

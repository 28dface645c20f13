// 该文件是 DermaScan （皮肤镜） 项目的一部分。
// src/model/onnx.rs - 基于 tract 的 ONNX 推理后端
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

use std::path::{Path, PathBuf};

use tracing::{debug, error, info};
use tract_onnx::prelude::*;

use crate::{
  catalog::ClassCatalog,
  frame::InputTensor,
  model::{
    InferenceError, Model, ModelLoadError, ModelLoader, ModelVariant, RawScores, ScoreModel,
  },
};

type Plan = TypedRunnableModel<TypedModel>;

pub struct OnnxModel {
  plan: Plan,
  num_classes: usize,
}

pub struct OnnxModelBuilder {
  model_path: PathBuf,
  num_classes: usize,
}

impl OnnxModelBuilder {
  pub fn new<P: Into<PathBuf>>(model_path: P) -> Self {
    Self {
      model_path: model_path.into(),
      num_classes: ClassCatalog::default().len(),
    }
  }

  pub fn num_classes(mut self, num_classes: usize) -> Self {
    self.num_classes = num_classes;
    self
  }

  fn invalid(&self, e: impl std::fmt::Display) -> ModelLoadError {
    ModelLoadError::ModelInvalid {
      path: self.model_path.clone(),
      reason: e.to_string(),
    }
  }

  pub fn build(self) -> Result<OnnxModel, ModelLoadError> {
    info!("加载模型文件: {}", self.model_path.display());
    let size = std::fs::metadata(&self.model_path)?.len();
    debug!("模型文件大小: {:.2} MB", size as f64 / (1024.0 * 1024.0));

    let [n, c, h, w] = InputTensor::default().shape();
    let plan = tract_onnx::onnx()
      .model_for_path(&self.model_path)
      .and_then(|model| {
        model.with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), tvec!(n, c, h, w)))
      })
      .and_then(|model| model.into_optimized())
      .and_then(|model| model.into_runnable())
      .map_err(|e| {
        error!("模型反序列化失败: {}", e);
        self.invalid(e)
      })?;

    debug!("模型输入数量: {}", plan.model().inputs.len());
    debug!("模型输出数量: {}", plan.model().outputs.len());

    let fact = plan.model().output_fact(0).map_err(|e| self.invalid(e))?;
    match fact.shape.as_concrete() {
      Some(shape) => {
        let classes = shape.iter().product::<usize>();
        if shape.last() != Some(&self.num_classes) || classes != self.num_classes {
          error!(
            "预期模型输出 {} 个类别, 实际输出形状为 {:?}",
            self.num_classes, shape
          );
          return Err(ModelLoadError::ArchitectureMismatch {
            path: self.model_path,
            expected: self.num_classes,
            found: shape.to_vec(),
          });
        }
        debug!("模型输出形状: {:?}", shape);
      }
      None => debug!("模型输出形状不固定: {:?}", fact.shape),
    }

    info!("模型加载完成");
    Ok(OnnxModel {
      plan,
      num_classes: self.num_classes,
    })
  }
}

impl OnnxModel {
  pub fn num_classes(&self) -> usize {
    self.num_classes
  }
}

impl Model for OnnxModel {
  type Input = InputTensor;
  type Output = RawScores;
  type Error = InferenceError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let backend = |e: TractError| InferenceError::Backend(e.to_string());

    let tensor = Tensor::from_shape(&input.shape(), input.as_slice()).map_err(backend)?;
    let outputs = self.plan.run(tvec!(tensor.into())).map_err(backend)?;
    let output = outputs
      .first()
      .ok_or_else(|| InferenceError::Backend("模型没有输出".to_string()))?;
    let scores = output
      .to_array_view::<f32>()
      .map_err(backend)?
      .iter()
      .copied()
      .collect::<Vec<f32>>();

    Ok(RawScores::from(scores))
  }
}

/// 用 tract 加载 ONNX 模型文件
#[derive(Debug, Clone, Copy, Default)]
pub struct OnnxLoader;

impl ModelLoader for OnnxLoader {
  fn load(
    &self,
    path: &Path,
    variant: ModelVariant,
    catalog: &ClassCatalog,
  ) -> Result<Box<ScoreModel>, ModelLoadError> {
    debug!("以 {} 语义加载 ONNX 模型", variant);
    let model = OnnxModelBuilder::new(path)
      .num_classes(catalog.len())
      .build()?;
    Ok(Box::new(model))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn corrupt_file_is_reported_as_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.onnx");
    std::fs::write(&path, b"definitely not protobuf").unwrap();

    let err = OnnxModelBuilder::new(&path).build().err().unwrap();
    assert!(matches!(err, ModelLoadError::ModelInvalid { .. }));
  }

  #[test]
  fn missing_file_is_an_io_error() {
    let err = OnnxLoader
      .load(
        Path::new("/nonexistent/model.onnx"),
        ModelVariant::Detection,
        &ClassCatalog::default(),
      )
      .err()
      .unwrap();
    assert!(matches!(err, ModelLoadError::IoError(_)));
  }
}

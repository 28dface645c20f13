// 该文件是 DermaScan （皮肤镜） 项目的一部分。
// src/model/registry.rs - 模型注册表（检测模型优先，分类模型兜底）
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

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use tracing::{error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  analysis::AnalysisResult,
  catalog::ClassCatalog,
  frame::InputTensor,
  model::{InferenceError, Model, ModelLoadError, ModelVariant, RawScores, ScoreModel},
};

pub const DEFAULT_DETECTION_FILE: &str = "disease_detector.onnx";
pub const DEFAULT_CLASSIFICATION_FILE: &str = "disease_classifier.onnx";

/// 将某个模型文件反序列化为可推理的模型，结构不符时返回错误
pub trait ModelLoader {
  fn load(
    &self,
    path: &Path,
    variant: ModelVariant,
    catalog: &ClassCatalog,
  ) -> Result<Box<ScoreModel>, ModelLoadError>;
}

impl<F> ModelLoader for F
where
  F: Fn(&Path, ModelVariant, &ClassCatalog) -> Result<Box<ScoreModel>, ModelLoadError>,
{
  fn load(
    &self,
    path: &Path,
    variant: ModelVariant,
    catalog: &ClassCatalog,
  ) -> Result<Box<ScoreModel>, ModelLoadError> {
    self(path, variant, catalog)
  }
}

/// 已加载的模型及其输出语义。加载后只读，在请求之间通过 [`ModelHandle`] 共享。
pub struct LoadedModel {
  variant: ModelVariant,
  catalog: ClassCatalog,
  source: PathBuf,
  model: Box<ScoreModel>,
}

/// 进程内唯一的模型句柄
pub type ModelHandle = Arc<LoadedModel>;

impl LoadedModel {
  pub fn new(
    variant: ModelVariant,
    catalog: ClassCatalog,
    source: PathBuf,
    model: Box<ScoreModel>,
  ) -> Self {
    Self {
      variant,
      catalog,
      source,
      model,
    }
  }

  pub fn variant(&self) -> ModelVariant {
    self.variant
  }

  pub fn catalog(&self) -> &ClassCatalog {
    &self.catalog
  }

  pub fn source(&self) -> &Path {
    &self.source
  }

  /// 只执行前向计算，返回模型头的原始分数
  pub fn forward(&self, input: &InputTensor) -> Result<RawScores, InferenceError> {
    self.model.infer(input)
  }

  pub fn into_handle(self) -> ModelHandle {
    Arc::new(self)
  }
}

impl std::fmt::Debug for LoadedModel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("LoadedModel")
      .field("variant", &self.variant)
      .field("catalog", &self.catalog)
      .field("source", &self.source)
      .finish_non_exhaustive()
  }
}

impl Model for LoadedModel {
  type Input = InputTensor;
  type Output = AnalysisResult;
  type Error = InferenceError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    crate::inference::analyze(self, input)
  }
}

pub struct ModelRegistryBuilder {
  directory: PathBuf,
  detection_file: String,
  classification_file: String,
  catalog: ClassCatalog,
}

impl FromUrlWithScheme for ModelRegistryBuilder {
  const SCHEME: &'static str = "models";
}

impl FromUrl for ModelRegistryBuilder {
  type Error = ModelLoadError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ModelLoadError::ModelPathError(format!(
        "模型路径必须使用 {} 方案, 实际为 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let mut builder = ModelRegistryBuilder::new(url.path());
    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "detection" => builder.detection_file = v.into_owned(),
        "classification" => builder.classification_file = v.into_owned(),
        other => warn!("忽略未知的模型参数: {}", other),
      }
    }
    Ok(builder)
  }
}

impl ModelRegistryBuilder {
  pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
    Self {
      directory: directory.into(),
      detection_file: DEFAULT_DETECTION_FILE.to_string(),
      classification_file: DEFAULT_CLASSIFICATION_FILE.to_string(),
      catalog: ClassCatalog::default(),
    }
  }

  pub fn catalog(mut self, catalog: ClassCatalog) -> Self {
    self.catalog = catalog;
    self
  }

  pub fn detection_file<S: Into<String>>(mut self, file: S) -> Self {
    self.detection_file = file.into();
    self
  }

  pub fn classification_file<S: Into<String>>(mut self, file: S) -> Self {
    self.classification_file = file.into();
    self
  }

  /// 按优先级排列的候选模型文件
  pub fn candidates(&self) -> [(ModelVariant, PathBuf); 2] {
    [
      (
        ModelVariant::Detection,
        self.directory.join(&self.detection_file),
      ),
      (
        ModelVariant::Classification,
        self.directory.join(&self.classification_file),
      ),
    ]
  }

  /// 使用内置的 ONNX 后端加载模型
  pub fn build(self) -> Result<LoadedModel, ModelLoadError> {
    #[cfg(feature = "model_onnx")]
    {
      self.build_with(&crate::model::OnnxLoader)
    }
    #[cfg(not(feature = "model_onnx"))]
    {
      error!("未启用 model_onnx 特性, 无法加载 {}", self.directory.display());
      Err(ModelLoadError::NoBackend)
    }
  }

  /// 选择第一个存在的候选文件加载。找到的文件若加载失败则直接报错，不会继续回退。
  pub fn build_with<L: ModelLoader + ?Sized>(
    self,
    loader: &L,
  ) -> Result<LoadedModel, ModelLoadError> {
    let candidates = self.candidates();

    for (variant, path) in candidates.iter() {
      if !path.is_file() {
        info!("{} 文件不存在: {}", variant, path.display());
        continue;
      }

      info!("加载{}: {}", variant, path.display());
      let model = loader.load(path, *variant, &self.catalog).map_err(|e| {
        error!("{} 加载失败: {}", variant, e);
        e
      })?;
      info!("模型加载完成, 输出语义: {:?}", variant);

      return Ok(LoadedModel::new(
        *variant,
        self.catalog,
        path.clone(),
        model,
      ));
    }

    error!("未找到任何模型文件");
    Err(ModelLoadError::NotFound(
      candidates.into_iter().map(|(_, path)| path).collect(),
    ))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Constant(Vec<f32>);

  impl Model for Constant {
    type Input = InputTensor;
    type Output = RawScores;
    type Error = InferenceError;

    fn infer(&self, _input: &Self::Input) -> Result<Self::Output, Self::Error> {
      Ok(RawScores::from(self.0.clone()))
    }
  }

  fn stub_loader(
    _path: &Path,
    variant: ModelVariant,
    catalog: &ClassCatalog,
  ) -> Result<Box<ScoreModel>, ModelLoadError> {
    let value = match variant {
      ModelVariant::Detection => 0.9,
      ModelVariant::Classification => 2.0,
    };
    Ok(Box::new(Constant(vec![value; catalog.len()])))
  }

  #[test]
  fn prefers_detection_artifact() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(DEFAULT_DETECTION_FILE), b"d").unwrap();
    std::fs::write(dir.path().join(DEFAULT_CLASSIFICATION_FILE), b"c").unwrap();

    let loaded = ModelRegistryBuilder::new(dir.path())
      .build_with(&stub_loader)
      .unwrap();
    assert_eq!(loaded.variant(), ModelVariant::Detection);
    assert!(loaded.source().ends_with(DEFAULT_DETECTION_FILE));
  }

  #[test]
  fn falls_back_to_classification_artifact() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(DEFAULT_CLASSIFICATION_FILE), b"c").unwrap();

    let loaded = ModelRegistryBuilder::new(dir.path())
      .build_with(&stub_loader)
      .unwrap();
    assert_eq!(loaded.variant(), ModelVariant::Classification);
  }

  #[test]
  fn missing_artifacts_abort_startup() {
    let dir = tempfile::tempdir().unwrap();
    let err = ModelRegistryBuilder::new(dir.path())
      .build_with(&stub_loader)
      .unwrap_err();
    assert!(matches!(err, ModelLoadError::NotFound(paths) if paths.len() == 2));
  }

  #[test]
  fn corrupt_detection_artifact_does_not_fall_back() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(DEFAULT_DETECTION_FILE), b"d").unwrap();
    std::fs::write(dir.path().join(DEFAULT_CLASSIFICATION_FILE), b"c").unwrap();

    let failing = |path: &Path, variant: ModelVariant, catalog: &ClassCatalog| match variant {
      ModelVariant::Detection => Err(ModelLoadError::ModelInvalid {
        path: path.to_path_buf(),
        reason: "truncated".to_string(),
      }),
      ModelVariant::Classification => stub_loader(path, variant, catalog),
    };
    let err = ModelRegistryBuilder::new(dir.path())
      .build_with(&failing)
      .unwrap_err();
    assert!(matches!(err, ModelLoadError::ModelInvalid { .. }));
  }

  #[test]
  fn parses_registry_url() {
    let url = Url::parse("models:///opt/derma?detection=a.onnx&classification=b.onnx").unwrap();
    let builder = ModelRegistryBuilder::from_url(&url).unwrap();
    let [(first, detection), (second, classification)] = builder.candidates();
    assert_eq!(first, ModelVariant::Detection);
    assert_eq!(detection, PathBuf::from("/opt/derma/a.onnx"));
    assert_eq!(second, ModelVariant::Classification);
    assert_eq!(classification, PathBuf::from("/opt/derma/b.onnx"));

    let wrong = Url::parse("onnx:///opt/derma").unwrap();
    assert!(matches!(
      ModelRegistryBuilder::from_url(&wrong),
      Err(ModelLoadError::ModelPathError(_))
    ));
  }
}

// 该文件是 DermaScan （皮肤镜） 项目的一部分。
// src/output/save_analysis_file.rs - 保存分析结果 JSON 文件
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

use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, analysis::AnalysisResult, input::ImagePayload, output::Render,
};

#[derive(Error, Debug)]
pub enum SaveAnalysisFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub struct SaveAnalysisFileOutput {
  path: PathBuf,
}

impl FromUrlWithScheme for SaveAnalysisFileOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for SaveAnalysisFileOutput {
  type Error = SaveAnalysisFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveAnalysisFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(SaveAnalysisFileOutput {
      path: PathBuf::from(uri.path()),
    })
  }
}

impl SaveAnalysisFileOutput {
  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl Render<ImagePayload, AnalysisResult> for SaveAnalysisFileOutput {
  type Error = SaveAnalysisFileError;

  fn render_result(&self, _frame: &ImagePayload, result: &AnalysisResult) -> Result<(), Self::Error> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(&result.to_response())?;
    std::fs::write(&self.path, json)?;
    warn!("保存分析结果到文件: {}", self.path.display());

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    analysis::{PrimaryCondition, ScoreVector},
    catalog::ClassCatalog,
  };

  #[test]
  fn writes_classification_response() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("nested").join("analysis.json");
    let url = Url::parse(&format!("json://{}", target.display())).unwrap();
    let output = SaveAnalysisFileOutput::from_url(&url).unwrap();

    let scores = ScoreVector::new(ClassCatalog::default(), vec![0.1, 0.2, 0.3, 0.35, 0.05]).unwrap();
    let result = AnalysisResult::new(scores, PrimaryCondition::Catalog(3), 0.35).unwrap();
    output
      .render_result(&ImagePayload::from(Vec::new()), &result)
      .unwrap();

    let value: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(value["success"], true);
    assert_eq!(value["primary_condition"], "Eczema");
    assert_eq!(value["class_names"].as_array().unwrap().len(), 5);
  }
}

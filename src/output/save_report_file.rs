// 该文件是 DermaScan （皮肤镜） 项目的一部分。
// src/output/save_report_file.rs - 保存 PDF 报告文件
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

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  analysis::AnalysisResult,
  input::ImagePayload,
  output::Render,
  pipeline::DEFAULT_PATIENT_NAME,
  report::{self, Enrichment, ReportAssemblyError, ReportInput},
};

#[derive(Error, Debug)]
pub enum SaveReportFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("报告生成错误: {0}")]
  ReportError(#[from] ReportAssemblyError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 路径以 `.pdf` 结尾时直接写入该文件，否则视为目录并使用建议的文件名
pub struct SaveReportFileOutput {
  path: PathBuf,
  patient_name: String,
  enrichment: Enrichment,
}

impl FromUrlWithScheme for SaveReportFileOutput {
  const SCHEME: &'static str = "pdf";
}

impl FromUrl for SaveReportFileOutput {
  type Error = SaveReportFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveReportFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let patient_name = uri
      .query_pairs()
      .find(|(k, _)| k == "patient")
      .map(|(_, v)| v.into_owned())
      .unwrap_or_else(|| DEFAULT_PATIENT_NAME.to_string());

    Ok(SaveReportFileOutput {
      path: PathBuf::from(uri.path()),
      patient_name,
      enrichment: Enrichment::default(),
    })
  }
}

impl SaveReportFileOutput {
  pub fn with_enrichment(mut self, enrichment: Enrichment) -> Self {
    self.enrichment = enrichment;
    self
  }

  pub fn patient_name(&self) -> &str {
    &self.patient_name
  }

  /// 报告最终写入的位置
  pub fn destination(&self, now: DateTime<Local>) -> PathBuf {
    let is_file = self
      .path
      .extension()
      .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if is_file {
      self.path.clone()
    } else {
      self
        .path
        .join(report::suggested_filename(&self.patient_name, now))
    }
  }

  fn save_report(&self, destination: &Path, bytes: &[u8]) -> Result<(), SaveReportFileError> {
    if let Some(parent) = destination.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    std::fs::write(destination, bytes)?;
    warn!("保存报告到文件: {}", destination.display());

    Ok(())
  }
}

impl Render<ImagePayload, AnalysisResult> for SaveReportFileOutput {
  type Error = SaveReportFileError;

  fn render_result(&self, frame: &ImagePayload, result: &AnalysisResult) -> Result<(), Self::Error> {
    let now = Local::now();
    let input = ReportInput::new(result.clone(), frame.clone(), self.patient_name.clone())
      .with_enrichment(self.enrichment.clone());
    let document = report::assemble_at(&input, now)?;
    info!("报告共 {} 页", document.pages());
    self.save_report(&self.destination(now), document.as_bytes())
  }
}

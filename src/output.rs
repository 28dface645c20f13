// 该文件是 DermaScan （皮肤镜） 项目的一部分。
// src/output.rs - 输出定义
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

use crate::FromUrl;
#[cfg(any(feature = "save_report_file", feature = "save_analysis_file"))]
use crate::FromUrlWithScheme;
use crate::analysis::AnalysisResult;
use crate::input::ImagePayload;
use crate::report::Enrichment;
use thiserror::Error;
use url::Url;

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

#[cfg(feature = "save_report_file")]
mod save_report_file;
#[cfg(feature = "save_report_file")]
pub use self::save_report_file::{SaveReportFileError, SaveReportFileOutput};

#[cfg(feature = "save_analysis_file")]
mod save_analysis_file;
#[cfg(feature = "save_analysis_file")]
pub use self::save_analysis_file::{SaveAnalysisFileError, SaveAnalysisFileOutput};

#[derive(Error, Debug)]
pub enum OutputError {
  #[cfg(feature = "save_report_file")]
  #[error("保存报告文件错误: {0}")]
  SaveReportFileError(#[from] SaveReportFileError),
  #[cfg(feature = "save_analysis_file")]
  #[error("保存分析文件错误: {0}")]
  SaveAnalysisFileError(#[from] SaveAnalysisFileError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum OutputWrapper {
  #[cfg(feature = "save_report_file")]
  SaveReportFileOutput(SaveReportFileOutput),
  #[cfg(feature = "save_analysis_file")]
  SaveAnalysisFileOutput(SaveAnalysisFileOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      #[cfg(feature = "save_report_file")]
      SaveReportFileOutput::SCHEME => {
        let output = SaveReportFileOutput::from_url(url)?;
        Ok(OutputWrapper::SaveReportFileOutput(output))
      }
      #[cfg(feature = "save_analysis_file")]
      SaveAnalysisFileOutput::SCHEME => {
        let output = SaveAnalysisFileOutput::from_url(url)?;
        Ok(OutputWrapper::SaveAnalysisFileOutput(output))
      }
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl OutputWrapper {
  /// 只对报告输出生效
  pub fn with_enrichment(self, enrichment: Enrichment) -> Self {
    match self {
      #[cfg(feature = "save_report_file")]
      OutputWrapper::SaveReportFileOutput(output) => {
        OutputWrapper::SaveReportFileOutput(output.with_enrichment(enrichment))
      }
      #[allow(unreachable_patterns)]
      other => other,
    }
  }
}

impl Render<ImagePayload, AnalysisResult> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, frame: &ImagePayload, result: &AnalysisResult) -> Result<(), Self::Error> {
    match self {
      #[cfg(feature = "save_report_file")]
      OutputWrapper::SaveReportFileOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      #[cfg(feature = "save_analysis_file")]
      OutputWrapper::SaveAnalysisFileOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
    }
  }
}

// 该文件是 DermaScan （皮肤镜） 项目的一部分。
// src/pipeline.rs - 请求级流水线
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

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  analysis::{AnalysisData, AnalysisError, AnalysisResult, ClassificationResponse},
  input::{DecodeError, ImagePayload},
  model::{InferenceError, Model, ModelHandle},
  preprocess::preprocess,
  report::{self, ReportAssemblyError, ReportInput},
};

pub const DEFAULT_PATIENT_NAME: &str = "Anonymous Patient";
pub const DEVICE: &str = "cpu";

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("图像解码错误: {0}")]
  Decode(#[from] DecodeError),
  #[error("推理错误: {0}")]
  Inference(#[from] InferenceError),
  #[error("报告生成错误: {0}")]
  ReportAssembly(#[from] ReportAssemblyError),
  #[error("分析数据无效: {0}")]
  InvalidAnalysis(#[from] AnalysisError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassificationRequest {
  pub image: String,
}

fn default_patient_name() -> String {
  DEFAULT_PATIENT_NAME.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportRequest {
  pub image: String,
  pub analysis_data: AnalysisData,
  #[serde(default = "default_patient_name")]
  pub patient_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReport {
  pub bytes: Vec<u8>,
  pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
  pub model_type: String,
  pub num_classes: usize,
  pub class_names: Vec<String>,
  pub device: String,
}

/// 持有共享的模型句柄，每个请求独立执行，不需要加锁
#[derive(Debug, Clone)]
pub struct Pipeline {
  model: ModelHandle,
}

impl Pipeline {
  pub fn new(model: ModelHandle) -> Self {
    Self { model }
  }

  pub fn model(&self) -> &ModelHandle {
    &self.model
  }

  /// 解码、预处理并推理
  pub fn classify(&self, payload: &ImagePayload) -> Result<AnalysisResult, PipelineError> {
    let image = payload.decode()?;
    let tensor = preprocess(&image);
    Ok(self.model.infer(&tensor)?)
  }

  pub fn classify_request(
    &self,
    request: &ClassificationRequest,
  ) -> Result<ClassificationResponse, PipelineError> {
    let analysis = self.classify(&ImagePayload::from(request.image.as_str()))?;
    Ok(analysis.to_response())
  }

  pub fn generate_report(&self, request: &ReportRequest) -> Result<GeneratedReport, PipelineError> {
    self.generate_report_at(request, Local::now())
  }

  pub fn generate_report_at(
    &self,
    request: &ReportRequest,
    now: DateTime<Local>,
  ) -> Result<GeneratedReport, PipelineError> {
    let data = &request.analysis_data;
    let analysis = data.to_analysis(self.model.catalog())?;
    debug!("报告分析数据校验通过: {}", analysis.primary_label());

    let input = ReportInput {
      analysis,
      recommendations: data.recommendations.clone(),
      products: data.products.clone(),
      image: ImagePayload::from(request.image.as_str()),
      patient_name: request.patient_name.clone(),
    };
    let document = report::assemble_at(&input, now)?;
    let filename = report::suggested_filename(&request.patient_name, now);
    info!("报告已生成: {}", filename);

    Ok(GeneratedReport {
      bytes: document.into_bytes(),
      filename,
    })
  }

  pub fn model_info(&self) -> ModelInfo {
    ModelInfo {
      model_type: self.model.variant().model_type().to_string(),
      num_classes: self.model.catalog().len(),
      class_names: self.model.catalog().to_vec(),
      device: DEVICE.to_string(),
    }
  }
}

impl Model for Pipeline {
  type Input = ImagePayload;
  type Output = AnalysisResult;
  type Error = PipelineError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.classify(input)
  }
}

// 该文件是 DermaScan （皮肤镜） 项目的一部分。
// src/report.rs - 报告生成
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

use std::path::Path;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::{analysis::AnalysisResult, input::ImagePayload};

mod embed;
mod pdf;
mod section;

pub use self::embed::{EmbedError, EmbeddedImage, IMAGE_BOX_HEIGHT, IMAGE_BOX_WIDTH, fit_within};
pub use self::section::{
  ImageBlock, Listing, ProductRow, ReportOutline, ResultRow, SECTION_COUNT, Section, SectionKind,
  Severity,
};

/// 产品表最多渲染的行数
pub const MAX_PRODUCTS: usize = 5;

#[derive(Error, Debug)]
pub enum ReportAssemblyError {
  #[error("报告写入错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("报告排版错误: {0}")]
  Layout(String),
}

fn not_available() -> String {
  "N/A".to_string()
}

/// 推荐产品，仅用于展示，不做校验
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductEntry {
  #[serde(default = "not_available")]
  pub name: String,
  #[serde(default = "not_available")]
  pub brand: String,
  #[serde(default)]
  pub rating: f32,
  #[serde(default = "not_available")]
  pub price: String,
}

/// 外部服务层附加到报告中的建议与产品
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Enrichment {
  #[serde(default)]
  pub recommendations: Vec<String>,
  #[serde(default)]
  pub products: Vec<ProductEntry>,
}

impl Enrichment {
  pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let enrichment = serde_json::from_str(&text)?;
    debug!("读取报告附加信息: {}", path.as_ref().display());
    Ok(enrichment)
  }
}

#[derive(Debug, Clone)]
pub struct ReportInput {
  pub analysis: AnalysisResult,
  pub recommendations: Vec<String>,
  pub products: Vec<ProductEntry>,
  /// 原始图像载荷，嵌入失败时在报告中给出说明而不是中止
  pub image: ImagePayload,
  pub patient_name: String,
}

impl ReportInput {
  pub fn new(analysis: AnalysisResult, image: ImagePayload, patient_name: impl Into<String>) -> Self {
    Self {
      analysis,
      recommendations: Vec::new(),
      products: Vec::new(),
      image,
      patient_name: patient_name.into(),
    }
  }

  pub fn with_enrichment(mut self, enrichment: Enrichment) -> Self {
    self.recommendations = enrichment.recommendations;
    self.products = enrichment.products;
    self
  }
}

/// 生成完毕的 PDF 文档，只读
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
  bytes: Vec<u8>,
  pages: usize,
}

impl ReportDocument {
  pub fn as_bytes(&self) -> &[u8] {
    &self.bytes
  }

  pub fn into_bytes(self) -> Vec<u8> {
    self.bytes
  }

  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }

  pub fn pages(&self) -> usize {
    self.pages
  }
}

/// 以当前本地时间生成报告
pub fn assemble(input: &ReportInput) -> Result<ReportDocument, ReportAssemblyError> {
  assemble_at(input, Local::now())
}

pub fn assemble_at(
  input: &ReportInput,
  now: DateTime<Local>,
) -> Result<ReportDocument, ReportAssemblyError> {
  let outline = ReportOutline::compose(input, now);
  debug!("报告大纲包含 {} 个章节", outline.sections().len());

  let (bytes, pages) = pdf::render(&outline, now)?;
  info!("报告生成完成: {} 页, {} 字节", pages, bytes.len());
  Ok(ReportDocument { bytes, pages })
}

/// `medical_report_<患者>_<时间戳>.pdf`，患者名中不适合作为文件名的字符替换为 `_`
pub fn suggested_filename(patient_name: &str, now: DateTime<Local>) -> String {
  let patient: String = patient_name
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
        c
      } else {
        '_'
      }
    })
    .collect();
  format!(
    "medical_report_{}_{}.pdf",
    patient,
    now.format("%Y%m%d_%H%M%S")
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    analysis::{PrimaryCondition, ScoreVector},
    catalog::ClassCatalog,
  };
  use chrono::TimeZone;

  fn now() -> DateTime<Local> {
    Local.with_ymd_and_hms(2026, 3, 9, 14, 5, 30).unwrap()
  }

  fn analysis() -> AnalysisResult {
    let scores = ScoreVector::new(ClassCatalog::default(), vec![0.72, 0.4, 0.39, 0.05, 0.0]).unwrap();
    AnalysisResult::new(scores, PrimaryCondition::Catalog(0), 0.72).unwrap()
  }

  #[test]
  fn filename_encodes_patient_and_timestamp() {
    assert_eq!(
      suggested_filename("Jane Doe", now()),
      "medical_report_Jane_Doe_20260309_140530.pdf"
    );
    assert_eq!(
      suggested_filename("../etc/passwd", now()),
      "medical_report____etc_passwd_20260309_140530.pdf"
    );
  }

  #[test]
  fn product_fields_default_when_missing() {
    let product: ProductEntry = serde_json::from_str(r#"{"name": "Gentle Cleanser"}"#).unwrap();
    assert_eq!(product.brand, "N/A");
    assert_eq!(product.price, "N/A");
    assert_eq!(product.rating, 0.0);
  }

  #[test]
  fn assembles_a_pdf_document() {
    let input = ReportInput::new(analysis(), ImagePayload::from("not an image"), "Jane Doe");
    let document = assemble_at(&input, now()).unwrap();
    let bytes = document.as_bytes();

    assert!(bytes.starts_with(b"%PDF-1.4"));
    assert!(bytes.ends_with(b"%%EOF\n"));
    assert!(document.pages() >= 1);
  }

  #[test]
  fn enrichment_replaces_empty_lists() {
    let enrichment: Enrichment = serde_json::from_str(
      r#"{"recommendations": ["Use sunscreen daily"], "products": [{"name": "SPF 50"}]}"#,
    )
    .unwrap();
    let input =
      ReportInput::new(analysis(), ImagePayload::from("x"), "Jane").with_enrichment(enrichment);
    assert_eq!(input.recommendations, vec!["Use sunscreen daily".to_string()]);
    assert_eq!(input.products.len(), 1);
  }
}

// 该文件是 DermaScan （皮肤镜） 项目的一部分。
// src/report/section.rs - 报告章节大纲
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
use tracing::warn;

use crate::report::{EmbeddedImage, MAX_PRODUCTS, ProductEntry, ReportInput};

pub const SECTION_COUNT: usize = 8;

pub(crate) const ORGANIZATION: &str = "Inveep Inc";
pub(crate) const SERVICE: &str = "MedicImage - DermaScan";
pub(crate) const REPORT_TITLE: &str = "SKIN ANALYSIS REPORT";
pub(crate) const ANALYSIS_TYPE: &str = "AI-Powered Skin Condition Classification";
pub(crate) const RECOMMENDATIONS_FALLBACK: &str =
  "Please consult with a dermatologist for personalized recommendations.";
pub(crate) const PRODUCTS_FALLBACK: &str =
  "Product recommendations will be available based on your specific condition.";
pub(crate) const FOOTER: &str = "Generated by MedicImage DermaScan - Inveep Inc";
pub(crate) const DISCLAIMER: [&str; 4] = [
  "This report is generated by an AI-powered skin analysis tool for educational and informational \
   purposes only. The results shown are approximations based on AI analysis and should not be \
   considered as definitive medical diagnoses.",
  "This tool is NOT a substitute for professional medical advice, diagnosis, or treatment. Always \
   consult with a qualified dermatologist or healthcare provider for accurate diagnosis and \
   appropriate treatment.",
  "The confidence percentages indicate the model's certainty in classification, not medical \
   accuracy. Results may vary and should not be used for self-diagnosis or treatment decisions.",
  "If you have concerns about your skin condition, please schedule an appointment with a \
   dermatologist for proper evaluation and treatment.",
];
pub(crate) const RATING_SUFFIX: char = '★';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
  High,
  Medium,
  Low,
}

impl Severity {
  pub fn from_probability(p: f32) -> Self {
    if p >= 0.7 {
      Severity::High
    } else if p >= 0.4 {
      Severity::Medium
    } else {
      Severity::Low
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Severity::High => "High",
      Severity::Medium => "Medium",
      Severity::Low => "Low",
    }
  }
}

impl std::fmt::Display for Severity {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// 一位小数的百分比
pub fn percent(p: f32) -> String {
  format!("{:.1}%", p as f64 * 100.0)
}

/// 有数据时列出数据，否则给出固定的替代说明
#[derive(Debug, Clone, PartialEq)]
pub enum Listing<T> {
  Items(Vec<T>),
  Fallback(&'static str),
}

impl<T> Listing<T> {
  fn from_items(items: Vec<T>, fallback: &'static str) -> Self {
    if items.is_empty() {
      Listing::Fallback(fallback)
    } else {
      Listing::Items(items)
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImageBlock {
  Embedded(EmbeddedImage),
  Unavailable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
  pub condition: String,
  pub probability: String,
  pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
  pub name: String,
  pub brand: String,
  pub rating: String,
  pub price: String,
}

impl From<&ProductEntry> for ProductRow {
  fn from(product: &ProductEntry) -> Self {
    Self {
      name: product.name.clone(),
      brand: product.brand.clone(),
      rating: format!("{:.1} {}", product.rating, RATING_SUFFIX),
      price: product.price.clone(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
  Header,
  Title,
  Patient,
  Image,
  Results,
  Recommendations,
  Products,
  Disclaimer,
}

impl SectionKind {
  pub const ORDER: [SectionKind; SECTION_COUNT] = [
    SectionKind::Header,
    SectionKind::Title,
    SectionKind::Patient,
    SectionKind::Image,
    SectionKind::Results,
    SectionKind::Recommendations,
    SectionKind::Products,
    SectionKind::Disclaimer,
  ];

  /// 章节标题，页眉和报告标题没有
  pub fn heading(&self) -> Option<&'static str> {
    match self {
      SectionKind::Header | SectionKind::Title => None,
      SectionKind::Patient => Some("PATIENT INFORMATION"),
      SectionKind::Image => Some("ANALYZED IMAGE"),
      SectionKind::Results => Some("ANALYSIS RESULTS"),
      SectionKind::Recommendations => Some("RECOMMENDATIONS"),
      SectionKind::Products => Some("RECOMMENDED PRODUCTS"),
      SectionKind::Disclaimer => Some("IMPORTANT DISCLAIMER"),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Section {
  Header {
    organization: &'static str,
    service: &'static str,
    generated_at: String,
  },
  Title(&'static str),
  Patient {
    rows: [(&'static str, String); 4],
  },
  Image(ImageBlock),
  Results {
    primary_condition: String,
    confidence: String,
    rows: Vec<ResultRow>,
  },
  Recommendations(Listing<String>),
  Products(Listing<ProductRow>),
  Disclaimer {
    paragraphs: &'static [&'static str],
    footer: &'static str,
  },
}

impl Section {
  pub fn kind(&self) -> SectionKind {
    match self {
      Section::Header { .. } => SectionKind::Header,
      Section::Title(_) => SectionKind::Title,
      Section::Patient { .. } => SectionKind::Patient,
      Section::Image(_) => SectionKind::Image,
      Section::Results { .. } => SectionKind::Results,
      Section::Recommendations(_) => SectionKind::Recommendations,
      Section::Products(_) => SectionKind::Products,
      Section::Disclaimer { .. } => SectionKind::Disclaimer,
    }
  }
}

/// 报告的章节序列，固定 8 个章节，顺序不变
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOutline {
  sections: [Section; SECTION_COUNT],
}

impl ReportOutline {
  pub fn compose(input: &ReportInput, now: DateTime<Local>) -> Self {
    let analysis = &input.analysis;

    let image = match EmbeddedImage::from_payload(&input.image) {
      Ok(embedded) => ImageBlock::Embedded(embedded),
      Err(e) => {
        warn!("报告图像无法嵌入: {}", e);
        ImageBlock::Unavailable(format!("Image could not be processed: {}", e))
      }
    };

    let rows = analysis
      .scores()
      .iter()
      .map(|(condition, p)| ResultRow {
        condition: condition.to_string(),
        probability: percent(p),
        severity: Severity::from_probability(p),
      })
      .collect();

    let recommendations = input
      .recommendations
      .iter()
      .enumerate()
      .map(|(i, rec)| format!("{}. {}", i + 1, rec))
      .collect();

    let products = input
      .products
      .iter()
      .take(MAX_PRODUCTS)
      .map(ProductRow::from)
      .collect();

    let sections = [
      Section::Header {
        organization: ORGANIZATION,
        service: SERVICE,
        generated_at: format!(
          "Report Generated: {}",
          now.format("%B %d, %Y at %I:%M %p")
        ),
      },
      Section::Title(REPORT_TITLE),
      Section::Patient {
        rows: [
          ("Patient Name:", input.patient_name.clone()),
          ("Report Date:", now.format("%B %d, %Y").to_string()),
          ("Report Time:", now.format("%I:%M %p").to_string()),
          ("Analysis Type:", ANALYSIS_TYPE.to_string()),
        ],
      },
      Section::Image(image),
      Section::Results {
        primary_condition: analysis.primary_label().to_string(),
        confidence: percent(analysis.confidence()),
        rows,
      },
      Section::Recommendations(Listing::from_items(recommendations, RECOMMENDATIONS_FALLBACK)),
      Section::Products(Listing::from_items(products, PRODUCTS_FALLBACK)),
      Section::Disclaimer {
        paragraphs: &DISCLAIMER,
        footer: FOOTER,
      },
    ];

    Self { sections }
  }

  pub fn sections(&self) -> &[Section; SECTION_COUNT] {
    &self.sections
  }

  pub fn kinds(&self) -> [SectionKind; SECTION_COUNT] {
    std::array::from_fn(|i| self.sections[i].kind())
  }
}

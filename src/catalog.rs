// 该文件是 DermaScan （皮肤镜） 项目的一部分。
// src/catalog.rs - 病症类别表
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

use std::{path::Path, sync::Arc};

use thiserror::Error;
use tracing::{debug, info};

use crate::analysis::NO_FINDING_LABEL;

/// 训练时使用的默认类别，顺序即模型输出的索引顺序
pub const DEFAULT_CLASSES: [&str; 5] = [
  "Acne",
  "Actinic Keratosis",
  "Basal Cell Carcinoma",
  "Eczema",
  "Rosacea",
];

#[derive(Error, Debug)]
pub enum CatalogError {
  #[error("类别表为空")]
  Empty,
  #[error("类别名称重复: {0}")]
  Duplicate(String),
  #[error("类别名称不能为空白")]
  BlankName,
  #[error("类别名称 '{0}' 保留给未检出结果")]
  ReservedName(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("类别文件格式错误: {0}")]
  FormatError(#[from] serde_json::Error),
}

/// 有序、不可变的类别表。
///
/// 顺序决定了模型输出下标与类别名称的对应关系，也决定了报告中结果表格的行序。
/// 克隆只增加引用计数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassCatalog {
  names: Arc<[String]>,
}

impl Default for ClassCatalog {
  fn default() -> Self {
    Self {
      names: DEFAULT_CLASSES.iter().map(|s| s.to_string()).collect(),
    }
  }
}

impl ClassCatalog {
  pub fn new<I, S>(names: I) -> Result<Self, CatalogError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let names: Vec<String> = names.into_iter().map(Into::into).collect();
    if names.is_empty() {
      return Err(CatalogError::Empty);
    }
    for (i, name) in names.iter().enumerate() {
      if name.trim().is_empty() {
        return Err(CatalogError::BlankName);
      }
      if name == NO_FINDING_LABEL {
        return Err(CatalogError::ReservedName(name.clone()));
      }
      if names[..i].contains(name) {
        return Err(CatalogError::Duplicate(name.clone()));
      }
    }
    Ok(Self {
      names: names.into(),
    })
  }

  /// 从 JSON 数组文件加载类别表，例如 `["Acne", "Rosacea"]`
  pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
    let path = path.as_ref();
    info!("加载类别文件: {}", path.display());
    let data = std::fs::read(path)?;
    let names: Vec<String> = serde_json::from_slice(&data)?;
    debug!("类别文件包含 {} 个类别", names.len());
    Self::new(names)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn name(&self, index: usize) -> Option<&str> {
    self.names.get(index).map(String::as_str)
  }

  pub fn index_of(&self, name: &str) -> Option<usize> {
    self.names.iter().position(|n| n == name)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.names.iter().map(String::as_str)
  }

  pub fn to_vec(&self) -> Vec<String> {
    self.names.to_vec()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_catalog_keeps_training_order() {
    let catalog = ClassCatalog::default();
    assert_eq!(catalog.len(), 5);
    assert_eq!(catalog.name(0), Some("Acne"));
    assert_eq!(catalog.index_of("Rosacea"), Some(4));
    assert_eq!(catalog.index_of("Healthy Skin"), None);
  }

  #[test]
  fn rejects_empty_and_duplicate_names() {
    assert!(matches!(
      ClassCatalog::new(Vec::<String>::new()),
      Err(CatalogError::Empty)
    ));
    assert!(matches!(
      ClassCatalog::new(["A", "B", "A"]),
      Err(CatalogError::Duplicate(name)) if name == "A"
    ));
    assert!(matches!(
      ClassCatalog::new(["A", "  "]),
      Err(CatalogError::BlankName)
    ));
  }

  #[test]
  fn rejects_no_finding_label_as_class() {
    assert!(matches!(
      ClassCatalog::new(["Acne", NO_FINDING_LABEL, "Rosacea"]),
      Err(CatalogError::ReservedName(name)) if name == NO_FINDING_LABEL
    ));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.json");
    std::fs::write(&path, r#"["Acne", "Healthy Skin"]"#).unwrap();
    assert!(matches!(
      ClassCatalog::from_json_file(&path),
      Err(CatalogError::ReservedName(_))
    ));
  }

  #[test]
  fn loads_custom_length_catalog_from_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("labels.json");
    std::fs::write(&path, r#"["Melanoma", "Nevus", "Psoriasis"]"#).unwrap();

    let catalog = ClassCatalog::from_json_file(&path).unwrap();
    assert_eq!(catalog.len(), 3);
    assert_eq!(
      catalog.iter().collect::<Vec<_>>(),
      vec!["Melanoma", "Nevus", "Psoriasis"]
    );
  }
}

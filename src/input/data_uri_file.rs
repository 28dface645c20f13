// 该文件是 DermaScan （皮肤镜） 项目的一部分。
// src/input/data_uri_file.rs - 数据 URI 文本文件输入
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

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, input::ImagePayload};

#[derive(Error, Debug)]
pub enum DataUriFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
}

/// 读取保存了 `data:image/...;base64,...` 或纯 Base64 文本的文件，
/// 与前端上传的载荷形式一致
pub struct DataUriFileInput {
  payload: Option<ImagePayload>,
}

impl FromUrlWithScheme for DataUriFileInput {
  const SCHEME: &'static str = "datauri";
}

impl FromUrl for DataUriFileInput {
  type Error = DataUriFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(DataUriFileInputError::SchemaMismatch);
    }

    let path = url.path();
    let text = std::fs::read_to_string(path)?;
    debug!("读取数据 URI 文件 {}: {} 字符", path, text.len());

    Ok(DataUriFileInput {
      payload: Some(ImagePayload::Text(text)),
    })
  }
}

impl Iterator for DataUriFileInput {
  type Item = ImagePayload;

  fn next(&mut self) -> Option<Self::Item> {
    self.payload.take()
  }
}

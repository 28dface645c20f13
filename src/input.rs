// 该文件是 DermaScan （皮肤镜） 项目的一部分。
// src/input.rs - 图像输入
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

use crate::FromUrl;
#[cfg(any(feature = "read_image_file", feature = "data_uri_file"))]
use crate::FromUrlWithScheme;

mod decode;
pub use self::decode::{DecodeError, ImagePayload, decode_container};

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

#[cfg(feature = "data_uri_file")]
mod data_uri_file;
#[cfg(feature = "data_uri_file")]
pub use self::data_uri_file::{DataUriFileInput, DataUriFileInputError};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[cfg(feature = "data_uri_file")]
  #[error("Data URI file input error: {0}")]
  DataUriFileInputError(#[from] DataUriFileInputError),
  #[error("URI scheme mismatch")]
  SchemeMismatch,
}

pub enum InputWrapper {
  #[cfg(feature = "read_image_file")]
  ReadImageFile(ImageFileInput),
  #[cfg(feature = "data_uri_file")]
  DataUriFile(DataUriFileInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_image_file")]
    {
      if url.scheme() == ImageFileInput::SCHEME {
        let input = ImageFileInput::from_url(url)?;
        return Ok(InputWrapper::ReadImageFile(input));
      }
    }
    #[cfg(feature = "data_uri_file")]
    {
      if url.scheme() == DataUriFileInput::SCHEME {
        let input = DataUriFileInput::from_url(url)?;
        return Ok(InputWrapper::DataUriFile(input));
      }
    }
    Err(InputError::SchemeMismatch)
  }
}

impl Iterator for InputWrapper {
  type Item = ImagePayload;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(input) => input.next(),
      #[cfg(feature = "data_uri_file")]
      InputWrapper::DataUriFile(input) => input.next(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[cfg(feature = "data_uri_file")]
  #[test]
  fn dispatches_on_scheme() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payload.txt");
    std::fs::write(&path, "data:image/png;base64,AAAA").unwrap();

    let url = url::Url::parse(&format!("datauri://{}", path.display())).unwrap();
    let mut input = InputWrapper::from_url(&url).unwrap();
    assert!(matches!(input.next(), Some(ImagePayload::Text(text)) if text.starts_with("data:")));
    assert!(input.next().is_none());
  }

  #[test]
  fn unknown_scheme_is_rejected() {
    let url = url::Url::parse("rtsp://camera/stream").unwrap();
    assert!(matches!(
      InputWrapper::from_url(&url),
      Err(InputError::SchemeMismatch)
    ));
  }
}

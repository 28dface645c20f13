// 该文件是 DermaScan （皮肤镜） 项目的一部分。
// src/input/decode.rs - 图像载荷解码
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

use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageReader};
use thiserror::Error;
use tracing::debug;

use crate::frame::PixelImage;

const DATA_URI_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64";

#[derive(Error, Debug)]
pub enum DecodeError {
  #[error("数据 URI 格式错误: {0}")]
  MalformedEnvelope(String),
  #[error("Base64 解码错误: {0}")]
  Base64Error(#[from] base64::DecodeError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像解码错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("图像尺寸无效: {width}x{height}")]
  EmptyImage { width: u32, height: u32 },
}

/// 编码后的图像载荷
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
  /// 原始的图像容器字节（PNG、JPEG 等）
  Bytes(Vec<u8>),
  /// 文本封装：`data:image/...;base64,` 数据 URI，或不带前缀的 Base64
  Text(String),
}

impl From<Vec<u8>> for ImagePayload {
  fn from(bytes: Vec<u8>) -> Self {
    ImagePayload::Bytes(bytes)
  }
}

impl From<String> for ImagePayload {
  fn from(text: String) -> Self {
    ImagePayload::Text(text)
  }
}

impl From<&str> for ImagePayload {
  fn from(text: &str) -> Self {
    ImagePayload::Text(text.to_string())
  }
}

impl ImagePayload {
  /// 去掉文本封装，得到图像容器字节
  pub fn container_bytes(&self) -> Result<Vec<u8>, DecodeError> {
    match self {
      ImagePayload::Bytes(bytes) => Ok(bytes.clone()),
      ImagePayload::Text(text) => unwrap_envelope(text),
    }
  }

  pub fn decode(&self) -> Result<PixelImage, DecodeError> {
    decode_container(&self.container_bytes()?)
  }
}

fn unwrap_envelope(text: &str) -> Result<Vec<u8>, DecodeError> {
  let text = text.trim();
  let body = match text.strip_prefix(DATA_URI_PREFIX) {
    Some(rest) => {
      let (header, body) = rest.split_once(',').ok_or_else(|| {
        DecodeError::MalformedEnvelope("缺少 ',' 分隔符".to_string())
      })?;
      if !header.ends_with(BASE64_MARKER) {
        return Err(DecodeError::MalformedEnvelope(format!(
          "仅支持 Base64 编码的数据 URI, 实际头部 '{}'",
          header
        )));
      }
      debug!("数据 URI 头部: {}", header);
      body
    }
    None => text,
  };

  let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
  Ok(STANDARD.decode(compact)?)
}

/// 将图像容器字节解码为 RGB 图像；调色板和灰度图像会被展开为 RGB
pub fn decode_container(bytes: &[u8]) -> Result<PixelImage, DecodeError> {
  let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
  debug!("图像格式推断: {:?}", reader.format());
  into_pixel_image(reader.decode()?)
}

/// 展开为 RGB，拒绝宽或高为零的图像
fn into_pixel_image(image: DynamicImage) -> Result<PixelImage, DecodeError> {
  let image = image.to_rgb8();
  let (width, height) = image.dimensions();
  debug!("图像解码完成: {}x{}", width, height);
  PixelImage::new(image).ok_or(DecodeError::EmptyImage { width, height })
}

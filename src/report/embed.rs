// 该文件是 DermaScan （皮肤镜） 项目的一部分。
// src/report/embed.rs - 报告中嵌入的图像
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

use image::codecs::jpeg::JpegEncoder;
use thiserror::Error;
use tracing::debug;

use crate::input::{DecodeError, ImagePayload};

/// 图像框宽 4 英寸
pub const IMAGE_BOX_WIDTH: f32 = 4.0 * 72.0;
/// 图像框高 3 英寸
pub const IMAGE_BOX_HEIGHT: f32 = 3.0 * 72.0;

const JPEG_QUALITY: u8 = 90;

#[derive(Error, Debug)]
pub enum EmbedError {
  #[error("{0}")]
  Decode(#[from] DecodeError),
  #[error("图像编码失败: {0}")]
  Encode(#[from] image::ImageError),
}

/// 以 JPEG 形式嵌入的图像及其在页面上的尺寸（单位：点）
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage {
  jpeg: Vec<u8>,
  pixel_width: u32,
  pixel_height: u32,
  width: f32,
  height: f32,
}

impl EmbeddedImage {
  pub fn from_payload(payload: &ImagePayload) -> Result<Self, EmbedError> {
    let image = payload.decode()?;
    let (pixel_width, pixel_height) = image.dimensions();

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY).encode_image(image.as_rgb())?;

    let (width, height) = fit_within(pixel_width, pixel_height);
    debug!(
      "嵌入图像: {}x{} 像素 -> {:.1}x{:.1} 点, JPEG {} 字节",
      pixel_width,
      pixel_height,
      width,
      height,
      jpeg.len()
    );

    Ok(Self {
      jpeg,
      pixel_width,
      pixel_height,
      width,
      height,
    })
  }

  pub fn jpeg(&self) -> &[u8] {
    &self.jpeg
  }

  pub fn pixel_size(&self) -> (u32, u32) {
    (self.pixel_width, self.pixel_height)
  }

  pub fn size(&self) -> (f32, f32) {
    (self.width, self.height)
  }
}

/// 按原始宽高比缩放到图像框内，一个像素最多占一个点，不放大
pub fn fit_within(pixel_width: u32, pixel_height: u32) -> (f32, f32) {
  let (w, h) = (pixel_width as f32, pixel_height as f32);
  let scale = (IMAGE_BOX_WIDTH / w).min(IMAGE_BOX_HEIGHT / h).min(1.0);
  (w * scale, h * scale)
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{DynamicImage, ImageFormat, RgbImage};
  use std::io::Cursor;

  fn png(width: u32, height: u32) -> ImagePayload {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
      .write_to(&mut buffer, ImageFormat::Png)
      .unwrap();
    ImagePayload::from(buffer.into_inner())
  }

  #[test]
  fn landscape_is_bounded_by_width() {
    let (w, h) = fit_within(1600, 900);
    assert!((w - IMAGE_BOX_WIDTH).abs() < 1e-3);
    assert!((w / h - 1600.0 / 900.0).abs() < 1e-3);
    assert!(h <= IMAGE_BOX_HEIGHT);
  }

  #[test]
  fn portrait_is_bounded_by_height() {
    let (w, h) = fit_within(600, 1200);
    assert!((h - IMAGE_BOX_HEIGHT).abs() < 1e-3);
    assert!((w / h - 0.5).abs() < 1e-3);
  }

  #[test]
  fn near_square_landscape_still_fits_the_box() {
    let (w, h) = fit_within(1100, 1000);
    assert!(w <= IMAGE_BOX_WIDTH + 1e-3);
    assert!(h <= IMAGE_BOX_HEIGHT + 1e-3);
    assert!((w / h - 1.1).abs() < 1e-3);
  }

  #[test]
  fn small_images_are_not_upscaled() {
    assert_eq!(fit_within(120, 80), (120.0, 80.0));
  }

  #[test]
  fn encodes_payload_as_jpeg() {
    let embedded = EmbeddedImage::from_payload(&png(64, 48)).unwrap();
    assert_eq!(embedded.pixel_size(), (64, 48));
    assert_eq!(embedded.size(), (64.0, 48.0));
    assert!(embedded.jpeg().starts_with(&[0xFF, 0xD8]));
  }

  #[test]
  fn corrupt_payload_is_an_error() {
    assert!(EmbeddedImage::from_payload(&ImagePayload::from(vec![1, 2, 3])).is_err());
  }
}

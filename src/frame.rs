// 该文件是 DermaScan （皮肤镜） 项目的一部分。
// src/frame.rs - 像素图像与 NCHW 张量定义
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

use image::RgbImage;

pub const RGB_CHANNELS: usize = 3;

/// 解码后的 RGB 图像，宽高均不为零
#[derive(Debug, Clone)]
pub struct PixelImage {
  image: RgbImage,
}

impl PixelImage {
  /// 宽或高为零时返回 `None`
  pub fn new(image: RgbImage) -> Option<Self> {
    if image.width() == 0 || image.height() == 0 {
      return None;
    }
    Some(Self { image })
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  pub fn dimensions(&self) -> (u32, u32) {
    self.image.dimensions()
  }

  pub fn as_rgb(&self) -> &RgbImage {
    &self.image
  }

  pub fn into_rgb(self) -> RgbImage {
    self.image
  }
}

/// 批大小为 1 的浮点 NCHW 张量，形状 `[1, 3, H, W]`
#[derive(Debug, Clone)]
pub struct NchwTensor<const W: u32, const H: u32> {
  data: Box<[f32]>,
}

/// 骨干网络的输入张量
pub type InputTensor = NchwTensor<224, 224>;

impl<const W: u32, const H: u32> NchwTensor<W, H> {
  pub const LEN: usize = RGB_CHANNELS * W as usize * H as usize;

  /// 数据长度必须等于 `3 * W * H`
  pub fn from_vec(data: Vec<f32>) -> Option<Self> {
    if data.len() != Self::LEN {
      return None;
    }
    Some(Self {
      data: data.into_boxed_slice(),
    })
  }

  pub fn shape(&self) -> [usize; 4] {
    [1, RGB_CHANNELS, H as usize, W as usize]
  }

  pub fn height(&self) -> usize {
    H as usize
  }

  pub fn width(&self) -> usize {
    W as usize
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  /// 读取 `(c, y, x)` 处的值
  pub fn at(&self, c: usize, y: usize, x: usize) -> f32 {
    self.data[c * (H as usize) * (W as usize) + y * (W as usize) + x]
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }
}

impl<const W: u32, const H: u32> Default for NchwTensor<W, H> {
  fn default() -> Self {
    Self {
      data: vec![0.0f32; Self::LEN].into_boxed_slice(),
    }
  }
}

impl<const W: u32, const H: u32> AsMut<[f32]> for NchwTensor<W, H> {
  fn as_mut(&mut self) -> &mut [f32] {
    &mut self.data
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zero_sized_image_is_rejected() {
    assert!(PixelImage::new(RgbImage::new(0, 10)).is_none());
    assert!(PixelImage::new(RgbImage::new(10, 0)).is_none());
    assert!(PixelImage::new(RgbImage::new(1, 1)).is_some());
  }

  #[test]
  fn tensor_length_must_match_shape() {
    assert!(NchwTensor::<4, 2>::from_vec(vec![0.0; 24]).is_some());
    assert!(NchwTensor::<4, 2>::from_vec(vec![0.0; 23]).is_none());
    assert_eq!(InputTensor::default().shape(), [1, 3, 224, 224]);
  }

  #[test]
  fn indexing_follows_nchw_layout() {
    let data: Vec<f32> = (0..24).map(|v| v as f32).collect();
    let tensor = NchwTensor::<4, 2>::from_vec(data).unwrap();
    assert_eq!(tensor.at(0, 0, 0), 0.0);
    assert_eq!(tensor.at(0, 1, 3), 7.0);
    assert_eq!(tensor.at(2, 1, 0), 20.0);
  }
}

// 该文件是 DermaScan （皮肤镜） 项目的一部分。
// src/preprocess.rs - 图像预处理
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

use image::imageops::{self, FilterType};
use tracing::debug;

use crate::frame::{InputTensor, NchwTensor, PixelImage};

// 与训练时的归一化参数一致
pub const CHANNEL_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const CHANNEL_STD: [f32; 3] = [0.229, 0.224, 0.225];

const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// 缩放到 224x224，缩放到 [0, 1]，按通道标准化，并加上批维度
pub fn preprocess(image: &PixelImage) -> InputTensor {
  InputTensor::from(image)
}

impl<const W: u32, const H: u32> From<&PixelImage> for NchwTensor<W, H> {
  fn from(image: &PixelImage) -> Self {
    debug!(
      "预处理图像: {}x{} -> {}x{}",
      image.width(),
      image.height(),
      W,
      H
    );
    let resized = imageops::resize(image.as_rgb(), W, H, RESIZE_FILTER);

    let mut tensor = NchwTensor::<W, H>::default();
    let plane = (W as usize) * (H as usize);
    let slice = tensor.as_mut();

    for (x, y, pixel) in resized.enumerate_pixels() {
      let idx = (y as usize) * (W as usize) + (x as usize);
      for c in 0..3 {
        let value = pixel[c] as f32 / 255.0;
        slice[c * plane + idx] = (value - CHANNEL_MEAN[c]) / CHANNEL_STD[c];
      }
    }

    tensor
  }
}

// 该文件是 Shanan （山南西风） 项目的一部分。
// src/frame.rs - 宿主相机帧定义
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
use thiserror::Error;

mod convert;

const RGB_CHANNELS: usize = 3;
const RGBA_CHANNELS: usize = 4;

#[derive(Error, Debug)]
pub enum FrameError {
  #[error("帧尺寸无效: {width}x{height}")]
  InvalidDimensions { width: u32, height: u32 },
  #[error("{format:?} 格式需要 {expected} 个平面, 实际为 {actual}")]
  PlaneCount {
    format: PixelFormat,
    expected: usize,
    actual: usize,
  },
  #[error("平面 {plane} 数据长度不足: 期望至少 {expected}, 实际为 {actual}")]
  PlaneTooShort {
    plane: usize,
    expected: usize,
    actual: usize,
  },
  #[error("平面 {plane} 的步长超出可寻址范围: 行步长 {row_stride}, 像素步长 {pixel_stride}")]
  StrideOverflow {
    plane: usize,
    row_stride: usize,
    pixel_stride: usize,
  },
}

/// 相机帧的像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
  /// YUV 4:2:0 三平面（Y、U、V），相机原生输出
  Yuv420,
  /// YUV 4:2:0 双平面（Y、交错的 VU）
  Nv21,
  /// 32 位 RGBA 单平面
  Rgba8888,
  /// 24 位 RGB 单平面
  Rgb888,
}

impl PixelFormat {
  pub fn plane_count(&self) -> usize {
    match self {
      PixelFormat::Yuv420 => 3,
      PixelFormat::Nv21 => 2,
      PixelFormat::Rgba8888 | PixelFormat::Rgb888 => 1,
    }
  }

  pub fn is_yuv(&self) -> bool {
    matches!(self, PixelFormat::Yuv420 | PixelFormat::Nv21)
  }
}

/// 图像平面，`row_stride` 为行间字节距离，`pixel_stride` 为相邻像素的字节距离
#[derive(Debug, Clone)]
pub struct Plane {
  data: Box<[u8]>,
  row_stride: usize,
  pixel_stride: usize,
}

impl Plane {
  pub fn new(data: Vec<u8>, row_stride: usize, pixel_stride: usize) -> Self {
    Self {
      data: data.into_boxed_slice(),
      row_stride,
      pixel_stride,
    }
  }

  pub fn data(&self) -> &[u8] {
    &self.data
  }

  pub fn row_stride(&self) -> usize {
    self.row_stride
  }

  pub fn pixel_stride(&self) -> usize {
    self.pixel_stride
  }
}

#[derive(Debug, Clone)]
pub struct FrameImage {
  width: u32,
  height: u32,
  format: PixelFormat,
  planes: Vec<Plane>,
}

impl FrameImage {
  pub fn new(width: u32, height: u32, format: PixelFormat, planes: Vec<Plane>) -> Self {
    Self {
      width,
      height,
      format,
      planes,
    }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn format(&self) -> PixelFormat {
    self.format
  }

  pub fn planes(&self) -> &[Plane] {
    &self.planes
  }

  /// 转换为检测器需要的 RGB 图像
  pub fn to_rgb_image(&self) -> Result<RgbImage, FrameError> {
    convert::to_rgb_image(self)
  }
}

impl From<RgbImage> for FrameImage {
  fn from(image: RgbImage) -> Self {
    let (width, height) = image.dimensions();
    let row_stride = RGB_CHANNELS * width as usize;
    FrameImage::new(
      width,
      height,
      PixelFormat::Rgb888,
      vec![Plane::new(image.into_raw(), row_stride, RGB_CHANNELS)],
    )
  }
}

/// 宿主交给插件的一帧，图像可能已经不可用
#[derive(Debug, Clone)]
pub struct Frame {
  image: Option<FrameImage>,
  timestamp_ns: i64,
}

impl Frame {
  pub fn new(image: Option<FrameImage>, timestamp_ns: i64) -> Self {
    Self {
      image,
      timestamp_ns,
    }
  }

  pub fn empty(timestamp_ns: i64) -> Self {
    Self::new(None, timestamp_ns)
  }

  pub fn from_rgb_image(image: RgbImage, timestamp_ns: i64) -> Self {
    Self::new(Some(image.into()), timestamp_ns)
  }

  pub fn image(&self) -> Option<&FrameImage> {
    self.image.as_ref()
  }

  pub fn timestamp_ns(&self) -> i64 {
    self.timestamp_ns
  }
}

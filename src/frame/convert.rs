// 该文件是 Shanan （山南西风） 项目的一部分。
// src/frame/convert.rs - 帧像素格式转换
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

use image::{Rgb, RgbImage};
use tracing::{debug, error};

use super::{FrameError, FrameImage, PixelFormat, Plane, RGB_CHANNELS, RGBA_CHANNELS};

pub(super) fn to_rgb_image(frame: &FrameImage) -> Result<RgbImage, FrameError> {
  let (width, height) = (frame.width(), frame.height());
  if width == 0 || height == 0 {
    error!("帧尺寸无效: {}x{}", width, height);
    return Err(FrameError::InvalidDimensions { width, height });
  }

  let format = frame.format();
  let planes = frame.planes();
  if planes.len() != format.plane_count() {
    error!(
      "{:?} 格式需要 {} 个平面, 实际为 {}",
      format,
      format.plane_count(),
      planes.len()
    );
    return Err(FrameError::PlaneCount {
      format,
      expected: format.plane_count(),
      actual: planes.len(),
    });
  }

  debug!(
    "转换 {:?} 帧: {}x{}, YUV: {}",
    format,
    width,
    height,
    format.is_yuv()
  );

  let (w, h) = (width as usize, height as usize);
  // 4:2:0 色度平面宽高各减半，向上取整
  let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));

  let image = match format {
    PixelFormat::Yuv420 => {
      check_plane(0, &planes[0], w, h, 1)?;
      check_plane(1, &planes[1], cw, ch, 1)?;
      check_plane(2, &planes[2], cw, ch, 1)?;
      let (y, u, v) = (&planes[0], &planes[1], &planes[2]);
      RgbImage::from_fn(width, height, |col, row| {
        let (col, row) = (col as usize, row as usize);
        Rgb(yuv_to_rgb(
          sample(y, col, row, 0),
          sample(u, col / 2, row / 2, 0),
          sample(v, col / 2, row / 2, 0),
        ))
      })
    }
    PixelFormat::Nv21 => {
      check_plane(0, &planes[0], w, h, 1)?;
      check_plane(1, &planes[1], cw, ch, 2)?;
      let (y, vu) = (&planes[0], &planes[1]);
      RgbImage::from_fn(width, height, |col, row| {
        let (col, row) = (col as usize, row as usize);
        Rgb(yuv_to_rgb(
          sample(y, col, row, 0),
          sample(vu, col / 2, row / 2, 1),
          sample(vu, col / 2, row / 2, 0),
        ))
      })
    }
    PixelFormat::Rgba8888 => {
      check_plane(0, &planes[0], w, h, RGBA_CHANNELS)?;
      let rgba = &planes[0];
      RgbImage::from_fn(width, height, |col, row| {
        let (col, row) = (col as usize, row as usize);
        Rgb([
          sample(rgba, col, row, 0),
          sample(rgba, col, row, 1),
          sample(rgba, col, row, 2),
        ])
      })
    }
    PixelFormat::Rgb888 => {
      check_plane(0, &planes[0], w, h, RGB_CHANNELS)?;
      let rgb = &planes[0];
      RgbImage::from_fn(width, height, |col, row| {
        let (col, row) = (col as usize, row as usize);
        Rgb([
          sample(rgb, col, row, 0),
          sample(rgb, col, row, 1),
          sample(rgb, col, row, 2),
        ])
      })
    }
  };

  Ok(image)
}

/// 检查平面是否足够容纳 `width`x`height` 个像素，每个像素占 `bytes` 字节
fn check_plane(
  index: usize,
  plane: &Plane,
  width: usize,
  height: usize,
  bytes: usize,
) -> Result<(), FrameError> {
  // 最后一个像素的末尾字节，之后 `sample` 的所有下标都不会超过它
  let expected = (height - 1)
    .checked_mul(plane.row_stride())
    .and_then(|rows| {
      (width - 1)
        .checked_mul(plane.pixel_stride())
        .and_then(|cols| rows.checked_add(cols))
    })
    .and_then(|offset| offset.checked_add(bytes));
  let Some(expected) = expected else {
    error!(
      "平面 {} 步长溢出: 行步长 {}, 像素步长 {}",
      index,
      plane.row_stride(),
      plane.pixel_stride()
    );
    return Err(FrameError::StrideOverflow {
      plane: index,
      row_stride: plane.row_stride(),
      pixel_stride: plane.pixel_stride(),
    });
  };
  let actual = plane.data().len();
  if actual < expected {
    error!(
      "平面 {} 数据长度不足: 期望至少 {}, 实际为 {}",
      index, expected, actual
    );
    return Err(FrameError::PlaneTooShort {
      plane: index,
      expected,
      actual,
    });
  }
  Ok(())
}

#[inline]
fn sample(plane: &Plane, col: usize, row: usize, offset: usize) -> u8 {
  plane.data()[row * plane.row_stride() + col * plane.pixel_stride() + offset]
}

// BT.601 全范围
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
  let y = y as f32;
  let u = u as f32 - 128.0;
  let v = v as f32 - 128.0;

  let r = y + 1.402 * v;
  let g = y - 0.344_136 * u - 0.714_136 * v;
  let b = y + 1.772 * u;

  [clamp_u8(r), clamp_u8(g), clamp_u8(b)]
}

#[inline]
fn clamp_u8(value: f32) -> u8 {
  value.round().clamp(0.0, 255.0) as u8
}

// 该文件是 Shanan （山南西风） 项目的一部分。
// src/detector.rs - 检测器接口
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

//! 外部目标检测库的接口。
//!
//! 插件本身不实现检测器，宿主通过 [`DetectorFactory`] 提供具体实现。

use image::RgbImage;

use crate::plugin::HostContext;

mod options;
pub use self::options::{
  BaseOptions, ObjectDetectorOptions, ObjectDetectorOptionsBuilder, OptionsError, RunningMode,
};

/// 检测类别
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
  pub index: i32,
  pub score: f32,
  pub category_name: String,
  pub display_name: String,
}

impl Category {
  pub fn new(index: i32, score: f32, category_name: impl Into<String>) -> Self {
    Self {
      index,
      score,
      category_name: category_name.into(),
      display_name: String::new(),
    }
  }

  pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
    self.display_name = display_name.into();
    self
  }
}

/// 像素坐标下的边界框
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
  pub left: f32,
  pub top: f32,
  pub right: f32,
  pub bottom: f32,
}

impl BoundingBox {
  pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
    Self {
      left,
      top,
      right,
      bottom,
    }
  }

  pub fn width(&self) -> f32 {
    self.right - self.left
  }

  pub fn height(&self) -> f32 {
    self.bottom - self.top
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  pub categories: Vec<Category>,
  pub bounding_box: BoundingBox,
}

impl Detection {
  pub fn new(categories: Vec<Category>, bounding_box: BoundingBox) -> Self {
    Self {
      categories,
      bounding_box,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectDetectorResult {
  pub detections: Vec<Detection>,
  pub timestamp_ms: i64,
}

pub trait ObjectDetector {
  type Error: std::error::Error + Send + Sync + 'static;

  fn detect(&self, image: &RgbImage) -> Result<ObjectDetectorResult, Self::Error>;
}

/// 按选项创建检测器，对应检测库的 `createFromOptions`
pub trait DetectorFactory {
  type Detector: ObjectDetector;
  type Error: std::error::Error + Send + Sync + 'static;

  fn create_from_options(
    &self,
    context: &HostContext,
    options: &ObjectDetectorOptions,
  ) -> Result<Self::Detector, Self::Error>;
}

impl<F, D, E> DetectorFactory for F
where
  F: Fn(&HostContext, &ObjectDetectorOptions) -> Result<D, E>,
  D: ObjectDetector,
  E: std::error::Error + Send + Sync + 'static,
{
  type Detector = D;
  type Error = E;

  fn create_from_options(
    &self,
    context: &HostContext,
    options: &ObjectDetectorOptions,
  ) -> Result<Self::Detector, Self::Error> {
    self(context, options)
  }
}

// 该文件是 Shanan （山南西风） 项目的一部分。
// src/lib.rs - 库主文件
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

//! 实时目标检测帧处理插件。
//!
//! 宿主相机管线对每一帧调用 `detectObjects` 插件，插件把帧转换为 RGB 图像，
//! 交给外部提供的检测器推理，再把结果整理为宿主可以序列化的键值结构。

pub mod config;
pub mod detector;
pub mod frame;
pub mod plugin;
pub mod record;
pub mod registry;

pub use config::{ConfigError, DetectionConfig, ModelAsset};
pub use detector::{
  BaseOptions, BoundingBox, Category, Detection, DetectorFactory, ObjectDetector,
  ObjectDetectorOptions, ObjectDetectorOptionsBuilder, ObjectDetectorResult, OptionsError,
  RunningMode,
};
pub use frame::{Frame, FrameError, FrameImage, PixelFormat, Plane};
pub use plugin::{FrameProcessorPlugin, HostContext, ObjectDetectionPlugin, PluginError};
pub use record::{DetectionRecord, LabelRecord, records_to_value};
pub use registry::{
  FrameProcessorPluginRegistry, PLUGIN_NAME, RegistryError, register_global, register_plugin,
};

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

// 该文件是 Shanan （山南西风） 项目的一部分。
// src/plugin.rs - 目标检测帧处理插件
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

use std::{
  path::{Path, PathBuf},
  sync::atomic::{AtomicBool, Ordering},
  time::Instant,
};

use once_cell::sync::OnceCell;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
  config::{ConfigError, DetectionConfig},
  detector::{
    BaseOptions, DetectorFactory, ObjectDetector, ObjectDetectorOptions, OptionsError, RunningMode,
  },
  frame::{Frame, FrameError},
  record::{DetectionRecord, records_to_value},
};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum PluginError {
  #[error("配置错误: {0}")]
  Config(#[from] ConfigError),
  #[error("帧转换错误: {0}")]
  Frame(#[from] FrameError),
  #[error("检测器选项错误: {0}")]
  Options(#[from] OptionsError),
  #[error("检测器创建失败: {0}")]
  CreateDetector(#[source] BoxError),
  #[error("检测失败: {0}")]
  Detect(#[source] BoxError),
}

/// 宿主在创建插件时提供的上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContext {
  assets_dir: PathBuf,
}

impl HostContext {
  pub fn new(assets_dir: impl Into<PathBuf>) -> Self {
    Self {
      assets_dir: assets_dir.into(),
    }
  }

  pub fn assets_dir(&self) -> &Path {
    &self.assets_dir
  }
}

/// 宿主调用的帧处理插件
pub trait FrameProcessorPlugin: Send + Sync {
  fn callback(&self, frame: &Frame, arguments: Option<&Map<String, Value>>)
  -> anyhow::Result<Value>;
}

struct CachedDetector<D> {
  config: DetectionConfig,
  detector: D,
}

/// 目标检测插件
///
/// 检测器在第一次处理带图像的帧时按当次配置创建，之后一直复用。
/// 后续调用即使传入不同的配置也不会重建检测器。
pub struct ObjectDetectionPlugin<F: DetectorFactory> {
  context: HostContext,
  factory: F,
  detector: OnceCell<CachedDetector<F::Detector>>,
  mismatch_reported: AtomicBool,
}

impl<F: DetectorFactory> ObjectDetectionPlugin<F> {
  pub fn new(context: HostContext, factory: F) -> Self {
    Self {
      context,
      factory,
      detector: OnceCell::new(),
      mismatch_reported: AtomicBool::new(false),
    }
  }

  pub fn context(&self) -> &HostContext {
    &self.context
  }

  pub fn is_initialized(&self) -> bool {
    self.detector.get().is_some()
  }

  /// 创建检测器时使用的配置
  pub fn active_config(&self) -> Option<&DetectionConfig> {
    self.detector.get().map(|cached| &cached.config)
  }

  /// 获取检测器，不存在时按 `config` 创建
  ///
  /// 并发的首次调用只会创建一个检测器；创建失败时不缓存，下次调用重试。
  pub fn detector_with_config(&self, config: &DetectionConfig) -> Result<&F::Detector, PluginError> {
    let cached = self
      .detector
      .get_or_try_init(|| self.create_detector(config))?;
    self.report_mismatch(&cached.config, config);

    Ok(&cached.detector)
  }

  fn report_mismatch(&self, active: &DetectionConfig, requested: &DetectionConfig) {
    if active == requested {
      return;
    }
    if self.mismatch_reported.swap(true, Ordering::Relaxed) {
      debug!("配置与现有检测器不一致，继续使用现有检测器");
    } else {
      warn!("检测器已按 {:?} 创建，忽略新的配置 {:?}", active, requested);
    }
  }

  /// 检测器已存在时参数只用于提示，解析失败也不影响检测
  fn report_ignored_arguments(
    &self,
    active: &DetectionConfig,
    arguments: Option<&Map<String, Value>>,
  ) {
    match DetectionConfig::from_arguments(arguments) {
      Ok(requested) => self.report_mismatch(active, &requested),
      Err(e) => debug!("检测器已创建，忽略无法解析的参数: {}", e),
    }
  }

  fn create_detector(
    &self,
    config: &DetectionConfig,
  ) -> Result<CachedDetector<F::Detector>, PluginError> {
    let model_path = config.model_file.resolve(&self.context);
    info!("加载模型文件: {}", model_path.display());

    let mut builder = ObjectDetectorOptions::builder()
      .base_options(BaseOptions::new(model_path))
      .running_mode(RunningMode::Image)
      .max_results(config.max_results);
    if let Some(threshold) = config.effective_score_threshold() {
      builder = builder.score_threshold(threshold);
    }
    let options = builder.build()?;
    debug!("检测器选项: {:?}", options);

    let now = Instant::now();
    let detector = self
      .factory
      .create_from_options(&self.context, &options)
      .map_err(|e| {
        error!("检测器创建失败: {}", e);
        PluginError::CreateDetector(Box::new(e))
      })?;
    info!("检测器创建完成，耗时: {:.2?}", now.elapsed());

    Ok(CachedDetector {
      config: config.clone(),
      detector,
    })
  }

  /// 处理一帧，帧内没有图像时返回空列表
  pub fn detect_objects(
    &self,
    frame: &Frame,
    arguments: Option<&Map<String, Value>>,
  ) -> Result<Vec<DetectionRecord>, PluginError> {
    let Some(image) = frame.image() else {
      debug!("帧 {} 没有图像，跳过", frame.timestamp_ns());
      return Ok(Vec::new());
    };

    // 只有在创建检测器时才要求参数有效
    let (rgb, detector) = match self.detector.get() {
      Some(cached) => {
        self.report_ignored_arguments(&cached.config, arguments);
        (image.to_rgb_image()?, &cached.detector)
      }
      None => {
        let config = DetectionConfig::from_arguments(arguments)?;
        let rgb = image.to_rgb_image()?;
        (rgb, self.detector_with_config(&config)?)
      }
    };

    let now = Instant::now();
    let result = detector
      .detect(&rgb)
      .map_err(|e| PluginError::Detect(Box::new(e)))?;
    debug!("推理完成，耗时: {:.2?}", now.elapsed());

    let records: Vec<DetectionRecord> = result
      .detections
      .iter()
      .filter_map(DetectionRecord::from_detection)
      .collect();
    debug!(
      "帧 {}: 检测到 {} 个物体，输出 {} 条记录",
      frame.timestamp_ns(),
      result.detections.len(),
      records.len()
    );

    Ok(records)
  }
}

impl<F> FrameProcessorPlugin for ObjectDetectionPlugin<F>
where
  F: DetectorFactory + Send + Sync,
  F::Detector: Send + Sync,
{
  fn callback(
    &self,
    frame: &Frame,
    arguments: Option<&Map<String, Value>>,
  ) -> anyhow::Result<Value> {
    let records = self.detect_objects(frame, arguments)?;
    Ok(records_to_value(&records)?)
  }
}

// 该文件是 Shanan （山南西风） 项目的一部分。
// src/detector/options.rs - 检测器选项
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

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OptionsError {
  #[error("缺少基础选项")]
  MissingBaseOptions,
  #[error("maxResults 必须大于 0")]
  InvalidMaxResults,
  #[error("scoreThreshold 必须是有限值: {0}")]
  InvalidScoreThreshold(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunningMode {
  /// 单张图像，同步返回
  #[default]
  Image,
  Video,
  LiveStream,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseOptions {
  model_asset_path: PathBuf,
}

impl BaseOptions {
  pub fn new(model_asset_path: impl Into<PathBuf>) -> Self {
    Self {
      model_asset_path: model_asset_path.into(),
    }
  }

  pub fn model_asset_path(&self) -> &Path {
    &self.model_asset_path
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDetectorOptions {
  base_options: BaseOptions,
  running_mode: RunningMode,
  max_results: Option<u32>,
  score_threshold: Option<f32>,
}

impl ObjectDetectorOptions {
  pub fn builder() -> ObjectDetectorOptionsBuilder {
    ObjectDetectorOptionsBuilder::default()
  }

  pub fn base_options(&self) -> &BaseOptions {
    &self.base_options
  }

  pub fn running_mode(&self) -> RunningMode {
    self.running_mode
  }

  /// `None` 表示返回全部结果
  pub fn max_results(&self) -> Option<u32> {
    self.max_results
  }

  /// `None` 表示使用模型元数据中的默认阈值
  pub fn score_threshold(&self) -> Option<f32> {
    self.score_threshold
  }
}

#[derive(Debug, Clone, Default)]
pub struct ObjectDetectorOptionsBuilder {
  base_options: Option<BaseOptions>,
  running_mode: RunningMode,
  max_results: Option<u32>,
  score_threshold: Option<f32>,
}

impl ObjectDetectorOptionsBuilder {
  pub fn base_options(mut self, base_options: BaseOptions) -> Self {
    self.base_options = Some(base_options);
    self
  }

  pub fn running_mode(mut self, running_mode: RunningMode) -> Self {
    self.running_mode = running_mode;
    self
  }

  pub fn max_results(mut self, max_results: Option<u32>) -> Self {
    self.max_results = max_results;
    self
  }

  pub fn score_threshold(mut self, score_threshold: f32) -> Self {
    self.score_threshold = Some(score_threshold);
    self
  }

  pub fn build(self) -> Result<ObjectDetectorOptions, OptionsError> {
    let base_options = self.base_options.ok_or(OptionsError::MissingBaseOptions)?;
    if self.max_results == Some(0) {
      return Err(OptionsError::InvalidMaxResults);
    }
    if let Some(threshold) = self.score_threshold.filter(|t| !t.is_finite()) {
      return Err(OptionsError::InvalidScoreThreshold(threshold));
    }

    Ok(ObjectDetectorOptions {
      base_options,
      running_mode: self.running_mode,
      max_results: self.max_results,
      score_threshold: self.score_threshold,
    })
  }
}

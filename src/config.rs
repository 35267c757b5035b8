// 该文件是 Shanan （山南西风） 项目的一部分。
// src/config.rs - 检测配置
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

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, plugin::HostContext};

pub const MODEL_FILE_KEY: &str = "modelFile";
pub const MAX_RESULTS_KEY: &str = "maxResults";
pub const SCORE_THRESHOLD_KEY: &str = "scoreThreshold";

const FILE_SCHEME: &str = "file";
const ASSET_SCHEME: &str = "asset";

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("缺少配置项 modelFile")]
  MissingModelFile,
  #[error("配置项 {key} 取值无效: {reason}")]
  InvalidValue { key: &'static str, reason: String },
  #[error("不支持的模型地址方案: {0}")]
  UnsupportedScheme(String),
  #[error("模型地址解析错误: {0}")]
  UrlParse(#[from] url::ParseError),
}

impl ConfigError {
  fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
    ConfigError::InvalidValue {
      key,
      reason: reason.into(),
    }
  }
}

/// 模型文件位置
///
/// `modelFile` 可以是宿主资源目录中的资源名（`detect.tflite`、`asset://detect.tflite`），
/// 也可以是文件路径（`/data/models/detect.tflite`、`file:///data/models/detect.tflite`）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelAsset {
  Asset(String),
  File(PathBuf),
}

impl FromUrl for ModelAsset {
  type Error = ConfigError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      FILE_SCHEME => url
        .to_file_path()
        .map(ModelAsset::File)
        .map_err(|_| ConfigError::invalid(MODEL_FILE_KEY, format!("无法转换为文件路径: {}", url))),
      ASSET_SCHEME => {
        let name = format!("{}{}", url.host_str().unwrap_or_default(), url.path());
        let name = name.trim_start_matches('/');
        if name.is_empty() {
          return Err(ConfigError::invalid(MODEL_FILE_KEY, "资源名为空"));
        }
        Ok(ModelAsset::Asset(name.to_string()))
      }
      scheme => {
        error!(
          "URI scheme mismatch: expected '{}' or '{}', found '{}'",
          FILE_SCHEME, ASSET_SCHEME, scheme
        );
        Err(ConfigError::UnsupportedScheme(scheme.to_string()))
      }
    }
  }
}

impl ModelAsset {
  pub fn parse(model_file: &str) -> Result<Self, ConfigError> {
    if model_file.trim().is_empty() {
      return Err(ConfigError::invalid(MODEL_FILE_KEY, "模型路径为空"));
    }

    match Url::parse(model_file) {
      Ok(url) => Self::from_url(&url),
      Err(url::ParseError::RelativeUrlWithoutBase) => {
        let path = Path::new(model_file);
        if path.is_absolute() {
          Ok(ModelAsset::File(path.to_path_buf()))
        } else {
          Ok(ModelAsset::Asset(model_file.to_string()))
        }
      }
      Err(e) => Err(e.into()),
    }
  }

  /// 资源名相对于宿主资源目录解析，文件路径原样返回
  pub fn resolve(&self, context: &HostContext) -> PathBuf {
    match self {
      ModelAsset::Asset(name) => context.assets_dir().join(name),
      ModelAsset::File(path) => path.clone(),
    }
  }
}

/// 单次调用的检测配置
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
  pub model_file: ModelAsset,
  /// `None` 表示由检测库决定（不限制数量）
  pub max_results: Option<u32>,
  pub score_threshold: Option<f32>,
}

impl DetectionConfig {
  pub fn new(model_file: ModelAsset) -> Self {
    Self {
      model_file,
      max_results: None,
      score_threshold: None,
    }
  }

  pub fn with_max_results(mut self, max_results: Option<u32>) -> Self {
    self.max_results = max_results;
    self
  }

  pub fn with_score_threshold(mut self, score_threshold: Option<f32>) -> Self {
    self.score_threshold = score_threshold;
    self
  }

  /// 从宿主传入的参数表构造配置，缺省参数表视为空表
  pub fn from_arguments(arguments: Option<&Map<String, Value>>) -> Result<Self, ConfigError> {
    let empty = Map::new();
    let arguments = arguments.unwrap_or(&empty);

    for key in arguments.keys() {
      if ![MODEL_FILE_KEY, MAX_RESULTS_KEY, SCORE_THRESHOLD_KEY].contains(&key.as_str()) {
        debug!("忽略未知配置项: {}", key);
      }
    }

    let model_file = match arguments.get(MODEL_FILE_KEY) {
      None | Some(Value::Null) => return Err(ConfigError::MissingModelFile),
      Some(Value::String(model_file)) => ModelAsset::parse(model_file)?,
      Some(other) => {
        return Err(ConfigError::invalid(
          MODEL_FILE_KEY,
          format!("期望字符串，实际为 {}", other),
        ));
      }
    };

    Ok(Self {
      model_file,
      max_results: parse_max_results(arguments.get(MAX_RESULTS_KEY))?,
      score_threshold: parse_score_threshold(arguments.get(SCORE_THRESHOLD_KEY))?,
    })
  }

  /// 只有严格大于 0 的阈值才会交给检测器
  pub fn effective_score_threshold(&self) -> Option<f32> {
    self.score_threshold.filter(|threshold| *threshold > 0.0)
  }
}

fn as_number(key: &'static str, value: &Value) -> Result<f64, ConfigError> {
  value
    .as_f64()
    .ok_or_else(|| ConfigError::invalid(key, format!("期望数字，实际为 {}", value)))
}

fn parse_max_results(value: Option<&Value>) -> Result<Option<u32>, ConfigError> {
  let Some(value) = value.filter(|v| !v.is_null()) else {
    return Ok(None);
  };

  // 小数按整数截断；负数沿用检测库 “-1 表示全部” 的约定
  let max_results = as_number(MAX_RESULTS_KEY, value)?.trunc();
  if max_results < 0.0 {
    return Ok(None);
  }
  if max_results == 0.0 {
    return Err(ConfigError::invalid(MAX_RESULTS_KEY, "必须大于 0"));
  }
  Ok(Some(max_results as u32))
}

fn parse_score_threshold(value: Option<&Value>) -> Result<Option<f32>, ConfigError> {
  match value.filter(|v| !v.is_null()) {
    Some(value) => Ok(Some(as_number(SCORE_THRESHOLD_KEY, value)? as f32)),
    None => Ok(None),
  }
}

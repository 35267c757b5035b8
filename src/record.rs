// 该文件是 Shanan （山南西风） 项目的一部分。
// src/record.rs - 检测结果记录
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

use serde::Serialize;
use serde_json::Value;

use crate::detector::{Category, Detection};

/// 返回给宿主的标签
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelRecord {
  pub index: i32,
  pub label: String,
  pub confidence: f64,
}

impl From<&Category> for LabelRecord {
  fn from(category: &Category) -> Self {
    Self {
      index: category.index,
      label: category.category_name.clone(),
      confidence: category.score as f64,
    }
  }
}

/// 返回给宿主的检测记录，边界框为帧像素坐标
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionRecord {
  pub labels: Vec<LabelRecord>,
  pub top: f64,
  pub left: f64,
  pub width: f64,
  pub height: f64,
}

impl DetectionRecord {
  /// 没有类别的检测结果不产生记录
  pub fn from_detection(detection: &Detection) -> Option<Self> {
    if detection.categories.is_empty() {
      return None;
    }

    let bbox = &detection.bounding_box;
    Some(Self {
      labels: detection.categories.iter().map(LabelRecord::from).collect(),
      top: bbox.top as f64,
      left: bbox.left as f64,
      width: bbox.width() as f64,
      height: bbox.height() as f64,
    })
  }
}

/// 转换为宿主桥接层使用的值
pub fn records_to_value(records: &[DetectionRecord]) -> serde_json::Result<Value> {
  serde_json::to_value(records)
}

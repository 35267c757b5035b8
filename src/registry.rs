// 该文件是 Shanan （山南西风） 项目的一部分。
// src/registry.rs - 帧处理插件注册表
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

use std::{collections::HashMap, sync::Arc};

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
  detector::DetectorFactory,
  plugin::{FrameProcessorPlugin, HostContext, ObjectDetectionPlugin},
};

/// 宿主查找本插件使用的名字
pub const PLUGIN_NAME: &str = "detectObjects";

pub type PluginInitializer = Arc<
  dyn Fn(&HostContext, Option<&Map<String, Value>>) -> Box<dyn FrameProcessorPlugin> + Send + Sync,
>;

static GLOBAL_REGISTRY: Lazy<FrameProcessorPluginRegistry> =
  Lazy::new(FrameProcessorPluginRegistry::new);

#[derive(Error, Debug)]
pub enum RegistryError {
  #[error("帧处理插件 {0} 已注册")]
  AlreadyRegistered(String),
  #[error("未找到帧处理插件 {0}")]
  NotFound(String),
}

#[derive(Default)]
pub struct FrameProcessorPluginRegistry {
  plugins: RwLock<HashMap<String, PluginInitializer>>,
}

impl FrameProcessorPluginRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// 进程级注册表
  pub fn global() -> &'static Self {
    &GLOBAL_REGISTRY
  }

  pub fn add_frame_processor_plugin<I>(
    &self,
    name: impl Into<String>,
    initializer: I,
  ) -> Result<(), RegistryError>
  where
    I: Fn(&HostContext, Option<&Map<String, Value>>) -> Box<dyn FrameProcessorPlugin>
      + Send
      + Sync
      + 'static,
  {
    let name = name.into();
    let mut plugins = self.plugins.write();
    if plugins.contains_key(&name) {
      error!("帧处理插件 {} 已注册", name);
      return Err(RegistryError::AlreadyRegistered(name));
    }

    info!("注册帧处理插件: {}", name);
    plugins.insert(name, Arc::new(initializer));
    Ok(())
  }

  /// 按名字创建插件实例
  pub fn get_plugin(
    &self,
    name: &str,
    context: &HostContext,
    options: Option<&Map<String, Value>>,
  ) -> Result<Box<dyn FrameProcessorPlugin>, RegistryError> {
    // 初始化时不持有锁
    let initializer = self
      .plugins
      .read()
      .get(name)
      .cloned()
      .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

    debug!("创建帧处理插件: {}", name);
    Ok(initializer(context, options))
  }

  pub fn contains(&self, name: &str) -> bool {
    self.plugins.read().contains_key(name)
  }

  pub fn names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.plugins.read().keys().cloned().collect();
    names.sort();
    names
  }
}

/// 以 [`PLUGIN_NAME`] 注册目标检测插件
pub fn register_plugin<F>(
  registry: &FrameProcessorPluginRegistry,
  factory: F,
) -> Result<(), RegistryError>
where
  F: DetectorFactory + Clone + Send + Sync + 'static,
  F::Detector: Send + Sync + 'static,
{
  registry.add_frame_processor_plugin(PLUGIN_NAME, move |context, options| {
    if let Some(options) = options.filter(|options| !options.is_empty()) {
      debug!(
        "插件初始化选项不参与检测配置: {:?}",
        options.keys().collect::<Vec<_>>()
      );
    }
    let plugin: Box<dyn FrameProcessorPlugin> =
      Box::new(ObjectDetectionPlugin::new(context.clone(), factory.clone()));
    plugin
  })
}

/// 向进程级注册表注册目标检测插件，重复调用时保留第一次的注册
///
/// 这是插件的加载时注册入口：库本身不会自动注册，宿主需要在启动流程中、
/// 第一次通过 `detectObjects` 查找插件之前调用一次。
pub fn register_global<F>(factory: F) -> Result<(), RegistryError>
where
  F: DetectorFactory + Clone + Send + Sync + 'static,
  F::Detector: Send + Sync + 'static,
{
  match register_plugin(FrameProcessorPluginRegistry::global(), factory) {
    Err(RegistryError::AlreadyRegistered(name)) => {
      debug!("帧处理插件 {} 已在全局注册表中", name);
      Ok(())
    }
    other => other,
  }
}

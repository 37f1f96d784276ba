// 该文件是 Yinji （印记） 项目的一部分。
// src/config.rs - 引擎配置
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

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::model::confidence::DEFAULT_THRESHOLD;

/// 用户配置文件相对 `$HOME` 的位置
pub const USER_CONFIG_PATH: &str = ".yinji/config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("I/O 错误: {path}: {source}")]
  IoError {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("配置解析错误: {path}: {source}")]
  ParseError {
    path: PathBuf,
    source: serde_json::Error,
  },
  #[error("配置结构错误: {0}")]
  SchemaError(serde_json::Error),
  #[error("阈值必须位于 [0, 1]，实际为 {0}")]
  InvalidThreshold(f64),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub compliance: ComplianceConfig,
  pub features: FeatureConfig,
  pub matcher: MatcherConfig,
  pub ransac: RansacConfig,
  pub batch: BatchConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
  pub logo: LogoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogoConfig {
  pub detection_threshold: f64,
  pub default_logo_url: Option<String>,
}

impl Default for LogoConfig {
  fn default() -> Self {
    Self {
      detection_threshold: DEFAULT_THRESHOLD,
      default_logo_url: None,
    }
  }
}

/// SIFT 参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
  pub octave_layers: usize,
  pub contrast_threshold: f32,
  pub edge_threshold: f32,
  pub sigma: f32,
  /// 提取前将图像放大两倍
  pub upsample: bool,
  /// 0 表示不限制
  pub max_features: usize,
}

impl Default for FeatureConfig {
  fn default() -> Self {
    Self {
      octave_layers: 3,
      contrast_threshold: 0.04,
      edge_threshold: 10.0,
      sigma: 1.6,
      upsample: true,
      max_features: 0,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
  pub ratio: f32,
}

impl Default for MatcherConfig {
  fn default() -> Self {
    Self { ratio: 0.6 }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacConfig {
  pub max_iters: usize,
  /// 重投影误差阈值（像素）
  pub reprojection_threshold: f64,
  pub confidence: f64,
  pub seed: u64,
}

impl Default for RansacConfig {
  fn default() -> Self {
    Self {
      max_iters: 2000,
      reprojection_threshold: 5.0,
      confidence: 0.995,
      seed: 0,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
  pub parallel: bool,
}

impl Default for BatchConfig {
  fn default() -> Self {
    Self { parallel: true }
  }
}

impl EngineConfig {
  /// 依次叠加：内置默认值 → `$HOME/.yinji/config.json` → `extra`
  pub fn load(extra: Option<&Path>) -> Result<Self, ConfigError> {
    let mut layers = Vec::new();
    if let Some(home) = std::env::var_os("HOME") {
      let user = PathBuf::from(home).join(USER_CONFIG_PATH);
      if user.is_file() {
        layers.push(user);
      }
    }
    if let Some(extra) = extra {
      layers.push(extra.to_path_buf());
    }
    Self::from_layers(&layers)
  }

  pub fn from_layers(paths: &[PathBuf]) -> Result<Self, ConfigError> {
    let mut merged = serde_json::to_value(EngineConfig::default()).map_err(ConfigError::SchemaError)?;
    for path in paths {
      let text = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
        path: path.clone(),
        source,
      })?;
      let layer: Value = serde_json::from_str(&text).map_err(|source| ConfigError::ParseError {
        path: path.clone(),
        source,
      })?;
      deep_merge(&mut merged, layer);
      info!("加载配置文件: {}", path.display());
    }
    let config: EngineConfig = serde_json::from_value(merged).map_err(ConfigError::SchemaError)?;
    config.validate()?;
    debug!("引擎配置: {:?}", config);
    Ok(config)
  }

  pub fn with_threshold(mut self, threshold: f64) -> Result<Self, ConfigError> {
    self.compliance.logo.detection_threshold = threshold;
    self.validate()?;
    Ok(self)
  }

  pub fn with_seed(mut self, seed: u64) -> Self {
    self.ransac.seed = seed;
    self
  }

  pub fn threshold(&self) -> f64 {
    self.compliance.logo.detection_threshold
  }

  fn validate(&self) -> Result<(), ConfigError> {
    let t = self.threshold();
    if !(0.0..=1.0).contains(&t) {
      return Err(ConfigError::InvalidThreshold(t));
    }
    Ok(())
  }
}

/// 对象逐键合并，其他值直接覆盖
pub fn deep_merge(base: &mut Value, layer: Value) {
  match (base, layer) {
    (Value::Object(base), Value::Object(layer)) => {
      for (key, value) in layer {
        match base.get_mut(&key) {
          Some(existing) if existing.is_object() && value.is_object() => deep_merge(existing, value),
          _ => {
            base.insert(key, value);
          }
        }
      }
    }
    (base, layer) => *base = layer,
  }
}

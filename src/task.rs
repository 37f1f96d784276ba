// 该文件是 Yinji （印记） 项目的一部分。
// src/task.rs - 批量检测任务
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

use rayon::prelude::*;
use tracing::{error, info};

use crate::{
  config::BatchConfig,
  input::{GlobInputError, resolve_candidates},
  model::{DetectionError, MatchResult, SingleImageDetector},
};

pub type BatchEntry = (PathBuf, Result<MatchResult, DetectionError>);

/// 按路径解析顺序排列的检测结果，失败项与成功项并存
#[derive(Debug, Default)]
pub struct BatchResult {
  entries: Vec<BatchEntry>,
}

impl BatchResult {
  pub fn new(entries: Vec<BatchEntry>) -> Self {
    Self { entries }
  }

  pub fn entries(&self) -> &[BatchEntry] {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn get(&self, path: &Path) -> Option<&Result<MatchResult, DetectionError>> {
    self
      .entries
      .iter()
      .find(|(p, _)| p == path)
      .map(|(_, result)| result)
  }

  pub fn with_logo(&self) -> impl Iterator<Item = (&Path, &MatchResult)> {
    self.successes().filter(|(_, r)| r.found)
  }

  pub fn without_logo(&self) -> impl Iterator<Item = (&Path, &MatchResult)> {
    self.successes().filter(|(_, r)| !r.found)
  }

  pub fn errors(&self) -> impl Iterator<Item = (&Path, &DetectionError)> {
    self.entries.iter().filter_map(|(path, result)| match result {
      Err(e) => Some((path.as_path(), e)),
      Ok(_) => None,
    })
  }

  fn successes(&self) -> impl Iterator<Item = (&Path, &MatchResult)> {
    self.entries.iter().filter_map(|(path, result)| match result {
      Ok(r) => Some((path.as_path(), r)),
      Err(_) => None,
    })
  }
}

pub struct BatchDetector {
  detector: SingleImageDetector,
  parallel: bool,
}

impl BatchDetector {
  pub fn new(detector: SingleImageDetector, config: &BatchConfig) -> Self {
    Self {
      detector,
      parallel: config.parallel,
    }
  }

  pub fn detector(&self) -> &SingleImageDetector {
    &self.detector
  }

  /// 模式本身无效时返回错误；单张图像的失败记录在结果中
  pub fn detect_all(&self, pattern: &str) -> Result<BatchResult, GlobInputError> {
    let paths = resolve_candidates(pattern)?;
    info!("模式 {} 匹配到 {} 张图像", pattern, paths.len());
    Ok(self.detect_paths(&paths))
  }

  pub fn detect_paths(&self, paths: &[PathBuf]) -> BatchResult {
    let now = std::time::Instant::now();
    let entries: Vec<BatchEntry> = if self.parallel {
      paths
        .par_iter()
        .map(|path| (path.clone(), self.detect_one(path)))
        .collect()
    } else {
      paths
        .iter()
        .map(|path| (path.clone(), self.detect_one(path)))
        .collect()
    };
    let result = BatchResult::new(entries);
    info!(
      "批量检测完成，耗时 {:.2?}: {} 张发现标志, {} 张未发现, {} 张失败",
      now.elapsed(),
      result.with_logo().count(),
      result.without_logo().count(),
      result.errors().count()
    );
    result
  }

  fn detect_one(&self, path: &Path) -> Result<MatchResult, DetectionError> {
    self.detector.detect(path).inspect_err(|e| {
      error!("检查图像 {} 失败 [{}]: {}", path.display(), e.kind(), e);
    })
  }
}

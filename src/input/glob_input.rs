// 该文件是 Yinji （印记） 项目的一部分。
// src/input/glob_input.rs - 候选图像路径解析
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
use tracing::{debug, warn};

pub const RASTER_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "tiff"];

#[derive(Error, Debug)]
pub enum GlobInputError {
  #[error("无效的 glob 模式: {0}")]
  PatternError(#[from] glob::PatternError),
}

/// 扩展名不区分大小写
pub fn is_raster_path(path: &Path) -> bool {
  path
    .extension()
    .and_then(|e| e.to_str())
    .map(|e| RASTER_EXTENSIONS.iter().any(|known| e.eq_ignore_ascii_case(known)))
    .unwrap_or(false)
}

/// `**` 作为完整路径段时递归匹配，否则只匹配单层目录。
/// 结果按 glob 遍历顺序返回，只保留已知栅格扩展名的普通文件。
pub fn resolve_candidates(pattern: &str) -> Result<Vec<PathBuf>, GlobInputError> {
  let mut paths = Vec::new();
  for entry in glob::glob(pattern)? {
    match entry {
      Ok(path) if path.is_file() && is_raster_path(&path) => paths.push(path),
      Ok(path) => debug!("跳过非图像路径: {}", path.display()),
      Err(e) => warn!("无法访问路径 {}: {}", e.path().display(), e.error()),
    }
  }
  debug!("模式 {} 解析出 {} 个候选图像", pattern, paths.len());
  Ok(paths)
}

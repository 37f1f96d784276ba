// 该文件是 Yinji （印记） 项目的一部分。
// src/model.rs - 检测模型
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

use image::RgbImage;
use thiserror::Error;

use crate::input::{ImageDecodeError, MarkLoadError};

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

#[derive(Error, Debug)]
pub enum DetectionError {
  #[error("参考标志加载错误: {0}")]
  MarkLoad(#[from] MarkLoadError),
  #[error("候选图像解码错误: {0}")]
  ImageDecode(#[from] ImageDecodeError),
  #[error("检测错误: {0}")]
  Detection(String),
}

/// 错误分类，批处理日志与报告使用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectionErrorKind {
  MarkLoad,
  ImageDecode,
  Detection,
}

impl DetectionError {
  pub fn kind(&self) -> DetectionErrorKind {
    match self {
      DetectionError::MarkLoad(_) => DetectionErrorKind::MarkLoad,
      DetectionError::ImageDecode(_) => DetectionErrorKind::ImageDecode,
      DetectionError::Detection(_) => DetectionErrorKind::Detection,
    }
  }
}

impl std::fmt::Display for DetectionErrorKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      DetectionErrorKind::MarkLoad => "MarkLoadError",
      DetectionErrorKind::ImageDecode => "ImageDecodeError",
      DetectionErrorKind::Detection => "DetectionError",
    };
    f.write_str(name)
  }
}

/// 单张图像的检测结论
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
  pub found: bool,
  /// [0, 100]
  pub confidence: f64,
  /// 通过比值检验的匹配数
  pub match_count: usize,
  pub reference_keypoint_count: usize,
  /// 仅在估计出单应性时存在
  pub inlier_count: Option<usize>,
  /// 参考矩形投影到候选图像中的四个角点
  pub outline: Option<[[f64; 2]; 4]>,
  pub annotated_image: Option<RgbImage>,
}

impl MatchResult {
  pub fn empty(reference_keypoint_count: usize) -> Self {
    Self {
      found: false,
      confidence: 0.0,
      match_count: 0,
      reference_keypoint_count,
      inlier_count: None,
      outline: None,
      annotated_image: None,
    }
  }

  /// `X/Y` 形式的匹配统计
  pub fn match_summary(&self) -> String {
    format!("{}/{}", self.match_count, self.reference_keypoint_count)
  }
}

pub mod confidence;
pub mod feature;
pub mod homography;
pub mod matcher;
pub mod scale_space;

mod detector;
pub use self::detector::SingleImageDetector;

// 该文件是 Yinji （印记） 项目的一部分。
// src/frame.rs - 参考标志与候选图像
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

use image::{DynamicImage, GrayImage, RgbImage};

use crate::model::feature::{Descriptor, FeatureExtractor, FeatureSet, Keypoint};

/// 参考标志：灰度栅格及其特征，加载后不可变，可在批处理中只读共享
#[derive(Debug, Clone)]
pub struct ReferenceMark {
  gray: GrayImage,
  features: FeatureSet,
  source: String,
}

impl ReferenceMark {
  pub fn new(gray: GrayImage, extractor: &FeatureExtractor, source: impl Into<String>) -> Self {
    let features = extractor.extract(&gray);
    Self {
      gray,
      features,
      source: source.into(),
    }
  }

  pub fn gray(&self) -> &GrayImage {
    &self.gray
  }

  pub fn width(&self) -> u32 {
    self.gray.width()
  }

  pub fn height(&self) -> u32 {
    self.gray.height()
  }

  pub fn keypoints(&self) -> &[Keypoint] {
    self.features.keypoints()
  }

  pub fn descriptors(&self) -> &[Descriptor] {
    self.features.descriptors()
  }

  /// 标志来源的可读描述
  pub fn source(&self) -> &str {
    &self.source
  }
}

/// 候选图像，只在一次检测调用内存在
#[derive(Debug, Clone)]
pub struct CandidateImage {
  color: RgbImage,
  gray: GrayImage,
  features: FeatureSet,
}

impl CandidateImage {
  pub fn new(image: &DynamicImage, extractor: &FeatureExtractor) -> Self {
    let gray = image.to_luma8();
    let features = extractor.extract(&gray);
    Self {
      color: image.to_rgb8(),
      gray,
      features,
    }
  }

  pub fn color(&self) -> &RgbImage {
    &self.color
  }

  pub fn gray(&self) -> &GrayImage {
    &self.gray
  }

  pub fn keypoints(&self) -> &[Keypoint] {
    self.features.keypoints()
  }

  pub fn descriptors(&self) -> &[Descriptor] {
    self.features.descriptors()
  }
}

// 该文件是 Yinji （印记） 项目的一部分。
// src/model/detector.rs - 单张图像标志检测
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

use std::path::Path;

use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::{
  config::EngineConfig,
  frame::{CandidateImage, ReferenceMark},
  input::read_image_file,
  model::{
    DetectionError, MatchResult, Model,
    confidence::{ConfidenceScorer, Evidence},
    feature::FeatureExtractor,
    homography::GeometricVerifier,
    matcher::CandidateMatcher,
  },
  output::draw::Draw,
};

/// 低于该置信度且未判定存在时不生成标注图像
const ANNOTATION_MIN_CONFIDENCE: f64 = 30.0;

/// 组合特征提取、匹配、几何验证与评分
pub struct SingleImageDetector {
  reference: ReferenceMark,
  extractor: FeatureExtractor,
  matcher: CandidateMatcher,
  verifier: GeometricVerifier,
  scorer: ConfidenceScorer,
  draw: Draw,
  annotate: bool,
}

impl SingleImageDetector {
  pub fn new(reference: ReferenceMark, config: &EngineConfig) -> Self {
    Self {
      reference,
      extractor: FeatureExtractor::new(config.features.clone()),
      matcher: CandidateMatcher::new(config.matcher.clone()),
      verifier: GeometricVerifier::new(config.ransac.clone()),
      scorer: ConfidenceScorer::new(config.threshold()),
      draw: Draw::default(),
      annotate: true,
    }
  }

  /// 关闭后不再生成标注图像
  pub fn with_annotation(mut self, annotate: bool) -> Self {
    self.annotate = annotate;
    self
  }

  pub fn reference(&self) -> &ReferenceMark {
    &self.reference
  }

  pub fn threshold(&self) -> f64 {
    self.scorer.threshold()
  }

  /// 解码失败返回 `ImageDecode` 错误
  pub fn detect(&self, path: &Path) -> Result<MatchResult, DetectionError> {
    let image = read_image_file(path)?;
    let result = self.infer(&image)?;
    info!(
      "检查图像 {}: {} (matches: {}, 置信度 {:.2})",
      path.display(),
      if result.found { "发现标志" } else { "未发现标志" },
      result.match_summary(),
      result.confidence
    );
    Ok(result)
  }

  pub fn detect_image(&self, image: &DynamicImage) -> Result<MatchResult, DetectionError> {
    if image.width() == 0 || image.height() == 0 {
      return Err(DetectionError::Detection(format!(
        "候选图像尺寸无效: {}x{}",
        image.width(),
        image.height()
      )));
    }

    let candidate = CandidateImage::new(image, &self.extractor);
    let reference = &self.reference;
    let reference_keypoints = reference.keypoints().len();

    if reference_keypoints == 0 || candidate.keypoints().is_empty() {
      warn!(
        "参考标志或候选图像没有关键点: {} / {}",
        reference_keypoints,
        candidate.keypoints().len()
      );
      return Ok(MatchResult::empty(reference_keypoints));
    }

    let pairs = self
      .matcher
      .match_descriptors(reference.descriptors(), candidate.descriptors());
    let homography = self
      .verifier
      .verify(&pairs, reference.keypoints(), candidate.keypoints());

    let evidence = match &homography {
      Some(h) => Evidence::Geometric {
        inlier_ratio: h.inlier_ratio(),
      },
      None => Evidence::LowMatch,
    };
    let verdict = self.scorer.score(evidence, &pairs, reference_keypoints);
    let outline = homography
      .as_ref()
      .map(|h| h.project_outline(reference.width(), reference.height()));
    debug!(
      "评分: {:?}, 匹配 {}, 置信度 {:.2}",
      evidence,
      pairs.len(),
      verdict.confidence
    );

    let annotated_image = (self.annotate
      && (verdict.found || verdict.confidence > ANNOTATION_MIN_CONFIDENCE))
      .then(|| {
        self.draw.draw_matches(
          reference.gray(),
          candidate.color(),
          &pairs,
          reference.keypoints(),
          candidate.keypoints(),
          outline.as_ref(),
        )
      });

    Ok(MatchResult {
      found: verdict.found,
      confidence: verdict.confidence,
      match_count: pairs.len(),
      reference_keypoint_count: reference_keypoints,
      inlier_count: homography.as_ref().map(|h| h.inlier_count()),
      outline,
      annotated_image,
    })
  }
}

impl Model for SingleImageDetector {
  type Input = DynamicImage;
  type Output = MatchResult;
  type Error = DetectionError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.detect_image(input)
  }
}

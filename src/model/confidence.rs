// 该文件是 Yinji （印记） 项目的一部分。
// src/model/confidence.rs - 置信度评分
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

use crate::model::matcher::MatchPair;

// 经验标定常量，调整前应在带标注的验证集上重新评估
const GEOMETRIC_MATCH_WEIGHT: f64 = 20.0;
const GEOMETRIC_INLIER_WEIGHT: f64 = 60.0;
const GEOMETRIC_DISTANCE_WEIGHT: f64 = 0.2;
const DISTANCE_SCALE: f64 = 0.1;
const LOW_MATCH_WEIGHT: f64 = 30.0;

/// 单应性分支判定所需的最少匹配数
pub const GEOMETRIC_MIN_MATCHES: usize = 10;
/// 低匹配分支判定所需的最少匹配数
pub const LOW_MATCH_MIN_MATCHES: usize = 5;

pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// 评分所依据的分支
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evidence {
  /// 任一图像没有特征
  NoFeatures,
  /// 已估计单应性
  Geometric { inlier_ratio: f64 },
  /// 匹配不足 4 对或单应性估计失败
  LowMatch,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
  pub found: bool,
  pub confidence: f64,
}

impl Verdict {
  pub const NONE: Verdict = Verdict {
    found: false,
    confidence: 0.0,
  };
}

#[derive(Debug, Clone, Copy)]
pub struct ConfidenceScorer {
  threshold: f64,
}

impl Default for ConfidenceScorer {
  fn default() -> Self {
    Self {
      threshold: DEFAULT_THRESHOLD,
    }
  }
}

impl ConfidenceScorer {
  pub fn new(threshold: f64) -> Self {
    Self {
      threshold: threshold.clamp(0.0, 1.0),
    }
  }

  pub fn threshold(&self) -> f64 {
    self.threshold
  }

  pub fn score(&self, evidence: Evidence, pairs: &[MatchPair], reference_keypoints: usize) -> Verdict {
    let count = pairs.len();
    let match_ratio = count as f64 / reference_keypoints.max(1) as f64;

    let (confidence, min_required) = match evidence {
      Evidence::NoFeatures => return Verdict::NONE,
      Evidence::Geometric { inlier_ratio } => {
        let avg_distance = if count > 0 {
          pairs.iter().map(|m| m.distance as f64).sum::<f64>() / count as f64
        } else {
          0.0
        };
        let distance_score = (100.0 - avg_distance * DISTANCE_SCALE).max(0.0);
        let raw = ((match_ratio * GEOMETRIC_MATCH_WEIGHT
          + inlier_ratio * GEOMETRIC_INLIER_WEIGHT
          + distance_score * GEOMETRIC_DISTANCE_WEIGHT)
          * 100.0)
          .min(100.0);
        let confidence = if count < GEOMETRIC_MIN_MATCHES {
          raw * (count as f64 / GEOMETRIC_MIN_MATCHES as f64)
        } else {
          raw
        };
        (confidence, GEOMETRIC_MIN_MATCHES)
      }
      Evidence::LowMatch => {
        let raw = (match_ratio * LOW_MATCH_WEIGHT * 100.0).min(100.0);
        let confidence = raw * (count as f64 / LOW_MATCH_MIN_MATCHES as f64);
        (confidence, LOW_MATCH_MIN_MATCHES)
      }
    };

    let confidence = if confidence.is_finite() {
      confidence.clamp(0.0, 100.0)
    } else {
      0.0
    };
    let found = confidence >= self.threshold * 100.0 && count >= min_required;
    Verdict { found, confidence }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_relative_eq;

  fn pairs(count: usize, distance: f32) -> Vec<MatchPair> {
    (0..count)
      .map(|i| MatchPair {
        reference_index: i,
        candidate_index: i,
        distance,
      })
      .collect()
  }

  #[test]
  fn no_features_is_zero() {
    let verdict = ConfidenceScorer::default().score(Evidence::NoFeatures, &pairs(20, 1.0), 20);
    assert_eq!(verdict, Verdict::NONE);
  }

  #[test]
  fn geometric_branch_saturates() {
    let verdict = ConfidenceScorer::default().score(
      Evidence::Geometric { inlier_ratio: 0.9 },
      &pairs(40, 50.0),
      100,
    );
    assert!(verdict.found);
    assert_relative_eq!(verdict.confidence, 100.0);
  }

  #[test]
  fn geometric_branch_scales_down_thin_evidence() {
    // 6 个匹配：原始分数封顶 100，再乘 6/10
    let verdict = ConfidenceScorer::default().score(
      Evidence::Geometric { inlier_ratio: 1.0 },
      &pairs(6, 10.0),
      50,
    );
    assert_relative_eq!(verdict.confidence, 60.0, epsilon = 1e-9);
    assert!(!verdict.found, "需要至少 10 个匹配");
  }

  #[test]
  fn geometric_branch_unsaturated_value() {
    // 平均距离 1000 使距离分为 0，内点率 0：10/2000 * 20 = 0.1 → 10
    let verdict = ConfidenceScorer::default().score(
      Evidence::Geometric { inlier_ratio: 0.0 },
      &pairs(10, 1000.0),
      2000,
    );
    assert_relative_eq!(verdict.confidence, 10.0, epsilon = 1e-9);
    assert!(!verdict.found);
  }

  #[test]
  fn low_match_branch_formula() {
    // 3/100 * 30 * 100 = 90，再乘 3/5
    let verdict = ConfidenceScorer::default().score(Evidence::LowMatch, &pairs(3, 10.0), 100);
    assert_relative_eq!(verdict.confidence, 54.0, epsilon = 1e-9);
    assert!(!verdict.found);
  }

  #[test]
  fn low_match_branch_clamps_to_hundred() {
    // 估计失败时匹配数可能大于 5，系数大于 1
    let verdict = ConfidenceScorer::default().score(Evidence::LowMatch, &pairs(12, 10.0), 20);
    assert_relative_eq!(verdict.confidence, 100.0);
    assert!(verdict.found);
  }

  #[test]
  fn found_requires_both_conditions() {
    let scorer = ConfidenceScorer::new(0.95);
    for count in 0..30 {
      for evidence in [Evidence::Geometric { inlier_ratio: 0.5 }, Evidence::LowMatch] {
        let v = scorer.score(evidence, &pairs(count, 100.0), 40);
        assert!((0.0..=100.0).contains(&v.confidence));
        let min_required = match evidence {
          Evidence::Geometric { .. } => GEOMETRIC_MIN_MATCHES,
          _ => LOW_MATCH_MIN_MATCHES,
        };
        assert_eq!(v.found, v.confidence >= 95.0 && count >= min_required);
      }
    }
  }

  #[test]
  fn score_exactly_at_cutoff_is_found() {
    // 5/250 * 30 * 100 = 60，恰好等于默认阈值
    let scorer = ConfidenceScorer::default();
    let verdict = scorer.score(Evidence::LowMatch, &pairs(5, 10.0), 250);
    assert_relative_eq!(verdict.confidence, 60.0, epsilon = 1e-9);
    assert_eq!(verdict.confidence >= 60.0, verdict.found);
    assert_eq!(verdict.found, verdict.confidence >= scorer.threshold() * 100.0);
    assert!(verdict.found);
  }

  #[test]
  fn default_cutoff_is_exact() {
    assert_eq!(ConfidenceScorer::default().threshold() * 100.0, 60.0);
    assert_eq!(ConfidenceScorer::new(0.6).threshold() * 100.0, 60.0);
  }

  #[test]
  fn threshold_is_clamped() {
    assert_eq!(ConfidenceScorer::new(1.7).threshold(), 1.0);
    assert_eq!(ConfidenceScorer::new(-0.2).threshold(), 0.0);
  }
}

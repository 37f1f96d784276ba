// 该文件是 Yinji （印记） 项目的一部分。
// src/model/homography.rs - 单应性估计与几何验证
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

use nalgebra::{Matrix3, SMatrix, SVector};
use rand::{SeedableRng, rngs::StdRng};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::RansacConfig;
use crate::model::feature::Keypoint;
use crate::model::matcher::MatchPair;

/// 估计单应性所需的最少匹配数
pub const MIN_HOMOGRAPHY_PAIRS: usize = 4;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HomographyError {
  #[error("点数不足: 需要 {needed}, 实际 {got}")]
  TooFewPoints { needed: usize, got: usize },
  #[error("数值计算失败: {0}")]
  NumericalFailure(String),
  #[error("没有找到非退化的模型")]
  NoModel,
}

/// 参考图像坐标到候选图像坐标的投影变换，以及与匹配列表一一对应的内点掩码
#[derive(Debug, Clone)]
pub struct Homography {
  pub matrix: Matrix3<f64>,
  pub inlier_mask: Vec<bool>,
}

impl Homography {
  pub fn inlier_count(&self) -> usize {
    self.inlier_mask.iter().filter(|&&m| m).count()
  }

  pub fn inlier_ratio(&self) -> f64 {
    self.inlier_count() as f64 / self.inlier_mask.len().max(1) as f64
  }

  pub fn project(&self, x: f64, y: f64) -> [f64; 2] {
    project(&self.matrix, x, y)
  }

  /// 参考图像矩形 `(0,0)-(w-1,h-1)` 投影到候选图像后的四个角点
  pub fn project_outline(&self, width: u32, height: u32) -> [[f64; 2]; 4] {
    let (w, h) = ((width.max(1) - 1) as f64, (height.max(1) - 1) as f64);
    [
      self.project(0.0, 0.0),
      self.project(0.0, h),
      self.project(w, h),
      self.project(w, 0.0),
    ]
  }
}

/// 齐次坐标投影，`w` 接近 0 时返回 NaN
pub fn project(h: &Matrix3<f64>, x: f64, y: f64) -> [f64; 2] {
  let w = h[(2, 0)] * x + h[(2, 1)] * y + h[(2, 2)];
  if w.abs() < 1e-15 {
    return [f64::NAN, f64::NAN];
  }
  [
    (h[(0, 0)] * x + h[(0, 1)] * y + h[(0, 2)]) / w,
    (h[(1, 0)] * x + h[(1, 1)] * y + h[(1, 2)]) / w,
  ]
}

pub fn reprojection_error(h: &Matrix3<f64>, from: &[f64; 2], to: &[f64; 2]) -> f64 {
  let [u, v] = project(h, from[0], from[1]);
  (u - to[0]).hypot(v - to[1])
}

/// 相似变换：质心移到原点，平均半径缩放为 sqrt(2)
struct Conditioning {
  center: [f64; 2],
  scale: f64,
}

impl Conditioning {
  fn fit(points: &[[f64; 2]]) -> Self {
    let n = points.len().max(1) as f64;
    let (sx, sy) = points
      .iter()
      .fold((0.0, 0.0), |(sx, sy), p| (sx + p[0], sy + p[1]));
    let center = [sx / n, sy / n];
    let radius = points
      .iter()
      .map(|p| (p[0] - center[0]).hypot(p[1] - center[1]))
      .sum::<f64>()
      / n;
    let scale = if radius > 1e-15 {
      std::f64::consts::SQRT_2 / radius
    } else {
      1.0
    };
    Self { center, scale }
  }

  fn apply(&self, p: &[f64; 2]) -> [f64; 2] {
    [
      (p[0] - self.center[0]) * self.scale,
      (p[1] - self.center[1]) * self.scale,
    ]
  }

  fn forward(&self) -> Matrix3<f64> {
    let s = self.scale;
    Matrix3::new(
      s, 0.0, -s * self.center[0],
      0.0, s, -s * self.center[1],
      0.0, 0.0, 1.0,
    )
  }

  fn backward(&self) -> Matrix3<f64> {
    let r = 1.0 / self.scale;
    Matrix3::new(
      r, 0.0, self.center[0],
      0.0, r, self.center[1],
      0.0, 0.0, 1.0,
    )
  }
}

/// 直接线性变换求解 `to ~ H · from`，至少需要 4 对点
///
/// 两组点先各自归一化，累加 AᵀA 后取最小奇异值对应的右奇异向量，
/// 最后撤销归一化并令 `H[2][2] = 1`。
pub fn solve_dlt(from: &[[f64; 2]], to: &[[f64; 2]]) -> Result<Matrix3<f64>, HomographyError> {
  let got = from.len().min(to.len());
  if got < MIN_HOMOGRAPHY_PAIRS {
    return Err(HomographyError::TooFewPoints {
      needed: MIN_HOMOGRAPHY_PAIRS,
      got,
    });
  }
  if from.len() != to.len() {
    return Err(HomographyError::NumericalFailure(format!(
      "点对数量不一致: {} 与 {}",
      from.len(),
      to.len()
    )));
  }

  let cond_from = Conditioning::fit(from);
  let cond_to = Conditioning::fit(to);

  // 每对点贡献两行约束
  let mut normal = SMatrix::<f64, 9, 9>::zeros();
  for (p, q) in from.iter().zip(to) {
    let [x, y] = cond_from.apply(p);
    let [u, v] = cond_to.apply(q);
    let rows = [
      SVector::<f64, 9>::from([x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y, -u]),
      SVector::<f64, 9>::from([0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y, -v]),
    ];
    for row in &rows {
      normal += row * row.transpose();
    }
  }

  let svd = normal.svd(false, true);
  let v_t = svd
    .v_t
    .ok_or_else(|| HomographyError::NumericalFailure("SVD 未返回右奇异向量".into()))?;
  let null = v_t.row(svd.singular_values.imin());
  let conditioned = Matrix3::from_fn(|r, c| null[3 * r + c]);

  let h = cond_to.backward() * conditioned * cond_from.forward();
  if h.iter().any(|v| !v.is_finite()) {
    return Err(HomographyError::NumericalFailure("结果包含非有限值".into()));
  }
  let w = h[(2, 2)];
  Ok(if w.abs() < 1e-15 { h } else { h / w })
}

fn collinear(a: &[f64; 2], b: &[f64; 2], c: &[f64; 2]) -> bool {
  let cross = (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0]);
  let scale = ((b[0] - a[0]).abs() + (b[1] - a[1]).abs()) * ((c[0] - a[0]).abs() + (c[1] - a[1]).abs());
  cross.abs() <= f64::EPSILON * 1e3 * scale.max(1.0)
}

/// 任意三点共线（含重复点）的样本无法确定单应性
fn is_degenerate(pts: &[[f64; 2]; 4]) -> bool {
  for i in 0..4 {
    for j in (i + 1)..4 {
      for k in (j + 1)..4 {
        if collinear(&pts[i], &pts[j], &pts[k]) {
          return true;
        }
      }
    }
  }
  false
}

/// 根据当前内点率更新所需迭代次数
fn adaptive_iterations(confidence: f64, inlier_ratio: f64, max_iters: usize) -> usize {
  let outlier = 1.0 - inlier_ratio;
  if outlier <= 0.0 {
    return 0;
  }
  let num = (1.0 - confidence).max(f64::MIN_POSITIVE).ln();
  let denom = (1.0 - inlier_ratio.powi(MIN_HOMOGRAPHY_PAIRS as i32)).ln();
  if denom >= 0.0 || !denom.is_finite() {
    return max_iters;
  }
  let iters = (num / denom).ceil();
  if iters.is_finite() && iters >= 0.0 {
    (iters as usize).min(max_iters)
  } else {
    max_iters
  }
}

/// 按匹配顺序取出两侧关键点坐标
fn matched_points(
  pairs: &[MatchPair],
  reference: &[Keypoint],
  candidate: &[Keypoint],
) -> (Vec<[f64; 2]>, Vec<[f64; 2]>) {
  pairs
    .iter()
    .map(|m| {
      let (r, c) = (&reference[m.reference_index], &candidate[m.candidate_index]);
      ([r.x as f64, r.y as f64], [c.x as f64, c.y as f64])
    })
    .unzip()
}

/// 几何验证器：匹配数不足时跳过，否则用 RANSAC 分离内点与外点
#[derive(Debug, Clone, Default)]
pub struct GeometricVerifier {
  config: RansacConfig,
}

impl GeometricVerifier {
  pub fn new(config: RansacConfig) -> Self {
    Self { config }
  }

  /// 返回 `None` 表示走低匹配分支（匹配不足 4 对或估计失败）
  pub fn verify(
    &self,
    pairs: &[MatchPair],
    reference: &[Keypoint],
    candidate: &[Keypoint],
  ) -> Option<Homography> {
    if pairs.len() < MIN_HOMOGRAPHY_PAIRS {
      return None;
    }
    let (from, to) = matched_points(pairs, reference, candidate);
    match self.estimate(&from, &to) {
      Ok(homography) => Some(homography),
      Err(e) => {
        warn!("单应性估计失败，按低匹配处理: {}", e);
        None
      }
    }
  }

  /// RANSAC 拟合，每次调用都以 `seed` 重新初始化随机数
  pub fn estimate(&self, from: &[[f64; 2]], to: &[[f64; 2]]) -> Result<Homography, HomographyError> {
    let n = from.len().min(to.len());
    if n < MIN_HOMOGRAPHY_PAIRS {
      return Err(HomographyError::TooFewPoints {
        needed: MIN_HOMOGRAPHY_PAIRS,
        got: n,
      });
    }

    let config = &self.config;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best: Option<(Matrix3<f64>, Vec<bool>, usize)> = None;
    let mut budget = config.max_iters;
    let mut iter = 0;

    while iter < budget {
      iter += 1;

      let mut sample_from = [[0.0; 2]; 4];
      let mut sample_to = [[0.0; 2]; 4];
      for (k, i) in rand::seq::index::sample(&mut rng, n, MIN_HOMOGRAPHY_PAIRS)
        .iter()
        .enumerate()
      {
        sample_from[k] = from[i];
        sample_to[k] = to[i];
      }
      if is_degenerate(&sample_from) || is_degenerate(&sample_to) {
        continue;
      }
      let Ok(h) = solve_dlt(&sample_from, &sample_to) else {
        continue;
      };

      let (mask, count) = self.inliers(&h, from, to);
      if best.as_ref().is_none_or(|(_, _, c)| count > *c) {
        budget = budget.min(adaptive_iterations(
          config.confidence,
          count as f64 / n as f64,
          config.max_iters,
        ));
        best = Some((h, mask, count));
      }
    }

    let Some((sampled, sampled_mask, sampled_count)) = best else {
      return Err(HomographyError::NoModel);
    };
    debug!("RANSAC: {} 次迭代, {}/{} 个内点", iter, sampled_count, n);

    // 用全部内点重新拟合，变差时保留采样模型
    let (inlier_from, inlier_to): (Vec<[f64; 2]>, Vec<[f64; 2]>) = from
      .iter()
      .zip(to)
      .zip(&sampled_mask)
      .filter(|(_, keep)| **keep)
      .map(|((p, q), _)| (*p, *q))
      .unzip();
    let refit = solve_dlt(&inlier_from, &inlier_to)
      .ok()
      .map(|h| {
        let (mask, count) = self.inliers(&h, from, to);
        (h, mask, count)
      })
      .filter(|(_, _, count)| *count >= sampled_count);

    let (matrix, inlier_mask) = match refit {
      Some((h, mask, _)) => (h, mask),
      None => (sampled, sampled_mask),
    };
    Ok(Homography {
      matrix,
      inlier_mask,
    })
  }

  fn inliers(&self, h: &Matrix3<f64>, from: &[[f64; 2]], to: &[[f64; 2]]) -> (Vec<bool>, usize) {
    let mask: Vec<bool> = from
      .iter()
      .zip(to)
      .map(|(p, q)| reprojection_error(h, p, q) < self.config.reprojection_threshold)
      .collect();
    let count = mask.iter().filter(|&&m| m).count();
    (mask, count)
  }
}

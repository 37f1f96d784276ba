// 该文件是 Yinji （印记） 项目的一部分。
// src/model/feature.rs - 尺度/旋转不变局部特征（SIFT）
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

use std::f32::consts::{PI, SQRT_2};

use image::GrayImage;
use nalgebra::{Matrix3, Vector3};
use tracing::debug;

use crate::config::FeatureConfig;
use crate::model::scale_space::{Octave, Plane, ScaleSpace};

pub const DESCRIPTOR_LEN: usize = DESCR_WIDTH * DESCR_WIDTH * DESCR_BINS;

// 检测常量
const IMG_BORDER: usize = 5;
const MAX_INTERP_STEPS: usize = 5;

// 主方向常量
const ORI_HIST_BINS: usize = 36;
const ORI_SIG_FCTR: f32 = 1.5;
const ORI_RADIUS: f32 = 3.0 * ORI_SIG_FCTR;
const ORI_PEAK_RATIO: f32 = 0.8;

// 描述子常量
const DESCR_WIDTH: usize = 4;
const DESCR_BINS: usize = 8;
const DESCR_SCL_FCTR: f32 = 3.0;
const DESCR_MAG_THR: f32 = 0.2;
const DESCR_INT_FCTR: f32 = 512.0;

/// 关键点，坐标位于源图像像素空间
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
  pub x: f32,
  pub y: f32,
  /// 邻域直径（像素）
  pub size: f32,
  /// 主方向（弧度，[0, 2π)）
  pub angle: f32,
  pub response: f32,
  pub octave: usize,
}

/// 128 维描述子，分量范围 [0, 255]
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor(pub [f32; DESCRIPTOR_LEN]);

impl Descriptor {
  pub fn distance_squared(&self, other: &Descriptor) -> f32 {
    self
      .0
      .iter()
      .zip(other.0.iter())
      .map(|(a, b)| (a - b) * (a - b))
      .sum()
  }

  /// 欧氏距离
  pub fn distance(&self, other: &Descriptor) -> f32 {
    self.distance_squared(other).sqrt()
  }
}

/// 关键点与描述子一一对应
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
  keypoints: Vec<Keypoint>,
  descriptors: Vec<Descriptor>,
}

impl FeatureSet {
  pub fn from_pairs(pairs: Vec<(Keypoint, Descriptor)>) -> Self {
    let (keypoints, descriptors) = pairs.into_iter().unzip();
    Self {
      keypoints,
      descriptors,
    }
  }

  pub fn keypoints(&self) -> &[Keypoint] {
    &self.keypoints
  }

  pub fn descriptors(&self) -> &[Descriptor] {
    &self.descriptors
  }

  pub fn len(&self) -> usize {
    self.keypoints.len()
  }

  pub fn is_empty(&self) -> bool {
    self.keypoints.is_empty()
  }
}

/// 特征提取器，无内部可变状态，可并发调用
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
  config: FeatureConfig,
}

impl FeatureExtractor {
  pub fn new(config: FeatureConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &FeatureConfig {
    &self.config
  }

  /// 在灰度图像上提取关键点与描述子；无纹理图像返回空集合
  pub fn extract(&self, image: &GrayImage) -> FeatureSet {
    if image.width() == 0 || image.height() == 0 {
      return FeatureSet::default();
    }

    let layers = self.config.octave_layers.max(1);
    let space = ScaleSpace::build(
      image,
      layers,
      self.config.sigma,
      self.config.upsample,
      2 * IMG_BORDER + 3,
    );

    let mut pairs = Vec::new();
    for (o, octave) in space.octaves.iter().enumerate() {
      let to_image = 2f32.powi(o as i32) / space.base_scale;
      self.detect_in_octave(octave, o, to_image, &mut pairs);
    }

    if self.config.max_features > 0 && pairs.len() > self.config.max_features {
      pairs.sort_by(|a, b| b.0.response.total_cmp(&a.0.response));
      pairs.truncate(self.config.max_features);
    }

    debug!(
      "提取特征: {}x{} 图像, {} 个八度, {} 个关键点",
      image.width(),
      image.height(),
      space.octaves.len(),
      pairs.len()
    );

    FeatureSet::from_pairs(pairs)
  }

  fn detect_in_octave(
    &self,
    octave: &Octave,
    index: usize,
    to_image: f32,
    out: &mut Vec<(Keypoint, Descriptor)>,
  ) {
    let layers = self.config.octave_layers.max(1);
    let dogs = &octave.dogs;
    let (w, h) = (dogs[0].width(), dogs[0].height());
    if w <= 2 * IMG_BORDER || h <= 2 * IMG_BORDER {
      return;
    }
    let prelim = 0.5 * self.config.contrast_threshold / layers as f32;

    for layer in 1..=layers {
      let (prev, cur, next) = (&dogs[layer - 1], &dogs[layer], &dogs[layer + 1]);
      for y in IMG_BORDER..h - IMG_BORDER {
        for x in IMG_BORDER..w - IMG_BORDER {
          let v = cur.at(x, y);
          if v.abs() <= prelim || !is_extremum(prev, cur, next, x, y, v) {
            continue;
          }
          let Some(extremum) = self.refine(dogs, x, y, layer) else {
            continue;
          };

          let gauss = &octave.gaussians[extremum.layer];
          let keypoint = Keypoint {
            x: extremum.x * to_image,
            y: extremum.y * to_image,
            size: extremum.sigma * to_image * 2.0,
            angle: 0.0,
            response: extremum.contrast.abs(),
            octave: index,
          };

          let (cx, cy) = (extremum.x.round() as isize, extremum.y.round() as isize);
          for angle in dominant_orientations(gauss, cx, cy, extremum.sigma) {
            if let Some(descriptor) = describe(gauss, cx, cy, angle, extremum.sigma) {
              out.push((Keypoint { angle, ..keypoint }, descriptor));
            }
          }
        }
      }
    }
  }

  /// 亚像素定位极值点，并剔除低对比度与边缘响应
  fn refine(&self, dogs: &[Plane], x: usize, y: usize, layer: usize) -> Option<Extremum> {
    let layers = self.config.octave_layers.max(1) as isize;
    let (w, h) = (dogs[0].width() as isize, dogs[0].height() as isize);
    let border = IMG_BORDER as isize;
    let (mut x, mut y, mut layer) = (x as isize, y as isize, layer as isize);

    let mut converged = false;
    let mut offset = Vector3::zeros();
    let mut gradient = Vector3::zeros();
    let mut hessian = Matrix3::zeros();

    for _ in 0..MAX_INTERP_STEPS {
      let (prev, img, next) = (
        &dogs[layer as usize - 1],
        &dogs[layer as usize],
        &dogs[layer as usize + 1],
      );
      let (ux, uy) = (x as usize, y as usize);
      let v2 = img.at(ux, uy) * 2.0;

      gradient = Vector3::new(
        (img.at(ux + 1, uy) - img.at(ux - 1, uy)) * 0.5,
        (img.at(ux, uy + 1) - img.at(ux, uy - 1)) * 0.5,
        (next.at(ux, uy) - prev.at(ux, uy)) * 0.5,
      );

      let dxx = img.at(ux + 1, uy) + img.at(ux - 1, uy) - v2;
      let dyy = img.at(ux, uy + 1) + img.at(ux, uy - 1) - v2;
      let dss = next.at(ux, uy) + prev.at(ux, uy) - v2;
      let dxy = (img.at(ux + 1, uy + 1) - img.at(ux - 1, uy + 1) - img.at(ux + 1, uy - 1)
        + img.at(ux - 1, uy - 1))
        * 0.25;
      let dxs = (next.at(ux + 1, uy) - next.at(ux - 1, uy) - prev.at(ux + 1, uy)
        + prev.at(ux - 1, uy))
        * 0.25;
      let dys = (next.at(ux, uy + 1) - next.at(ux, uy - 1) - prev.at(ux, uy + 1)
        + prev.at(ux, uy - 1))
        * 0.25;
      hessian = Matrix3::new(dxx, dxy, dxs, dxy, dyy, dys, dxs, dys, dss);

      offset = -hessian.lu().solve(&gradient)?;
      if offset.iter().all(|v| v.abs() < 0.5) {
        converged = true;
        break;
      }
      if offset.iter().any(|v| !v.is_finite() || v.abs() > (i32::MAX / 3) as f32) {
        return None;
      }

      x += offset[0].round() as isize;
      y += offset[1].round() as isize;
      layer += offset[2].round() as isize;
      if layer < 1 || layer > layers || x < border || x >= w - border || y < border || y >= h - border
      {
        return None;
      }
    }
    if !converged {
      return None;
    }

    let contrast = dogs[layer as usize].at(x as usize, y as usize) + 0.5 * gradient.dot(&offset);
    if contrast.abs() < self.config.contrast_threshold / layers as f32 {
      return None;
    }

    // 主曲率比值检验
    let (dxx, dyy, dxy) = (hessian[(0, 0)], hessian[(1, 1)], hessian[(0, 1)]);
    let trace = dxx + dyy;
    let det = dxx * dyy - dxy * dxy;
    let edge = self.config.edge_threshold;
    if det <= 0.0 || trace * trace * edge >= (edge + 1.0) * (edge + 1.0) * det {
      return None;
    }

    let scale_layer = layer as f32 + offset[2];
    Some(Extremum {
      x: x as f32 + offset[0],
      y: y as f32 + offset[1],
      layer: layer as usize,
      sigma: self.config.sigma * 2f32.powf(scale_layer / layers as f32),
      contrast,
    })
  }
}

/// 八度坐标系中的精确极值
struct Extremum {
  x: f32,
  y: f32,
  layer: usize,
  sigma: f32,
  contrast: f32,
}

fn is_extremum(prev: &Plane, cur: &Plane, next: &Plane, x: usize, y: usize, v: f32) -> bool {
  let mut is_max = true;
  let mut is_min = true;
  for plane in [prev, cur, next] {
    for ny in y - 1..=y + 1 {
      for nx in x - 1..=x + 1 {
        let n = plane.at(nx, ny);
        if n > v {
          is_max = false;
        }
        if n < v {
          is_min = false;
        }
      }
    }
    if !is_max && !is_min {
      return false;
    }
  }
  if v > 0.0 { is_max } else { is_min }
}

#[inline]
fn gradient_at(plane: &Plane, x: usize, y: usize) -> (f32, f32) {
  (
    plane.at(x + 1, y) - plane.at(x - 1, y),
    plane.at(x, y + 1) - plane.at(x, y - 1),
  )
}

#[inline]
fn wrap_angle(angle: f32) -> f32 {
  let a = angle.rem_euclid(2.0 * PI);
  if a >= 2.0 * PI { 0.0 } else { a }
}

/// 梯度方向直方图的所有主峰
fn dominant_orientations(plane: &Plane, cx: isize, cy: isize, sigma: f32) -> Vec<f32> {
  let (w, h) = (plane.width() as isize, plane.height() as isize);
  let radius = (ORI_RADIUS * sigma).round() as isize;
  let weight_sigma = ORI_SIG_FCTR * sigma;
  let exp_scale = -1.0 / (2.0 * weight_sigma * weight_sigma);

  let mut raw = [0f32; ORI_HIST_BINS];
  for dy in -radius..=radius {
    let y = cy + dy;
    if y <= 0 || y >= h - 1 {
      continue;
    }
    for dx in -radius..=radius {
      let x = cx + dx;
      if x <= 0 || x >= w - 1 {
        continue;
      }
      let (gx, gy) = gradient_at(plane, x as usize, y as usize);
      let magnitude = (gx * gx + gy * gy).sqrt();
      if magnitude == 0.0 {
        continue;
      }
      let weight = (((dx * dx + dy * dy) as f32) * exp_scale).exp();
      let bin = (wrap_angle(gy.atan2(gx)) * ORI_HIST_BINS as f32 / (2.0 * PI)).round() as usize
        % ORI_HIST_BINS;
      raw[bin] += weight * magnitude;
    }
  }

  let n = ORI_HIST_BINS;
  let mut hist = [0f32; ORI_HIST_BINS];
  for i in 0..n {
    hist[i] = (raw[(i + n - 2) % n] + raw[(i + 2) % n]) * (1.0 / 16.0)
      + (raw[(i + n - 1) % n] + raw[(i + 1) % n]) * (4.0 / 16.0)
      + raw[i] * (6.0 / 16.0);
  }

  let max = hist.iter().copied().fold(0.0f32, f32::max);
  if max <= 0.0 {
    return Vec::new();
  }
  let threshold = max * ORI_PEAK_RATIO;

  let mut angles = Vec::new();
  for i in 0..n {
    let (l, r) = (hist[(i + n - 1) % n], hist[(i + 1) % n]);
    let c = hist[i];
    if c > l && c > r && c >= threshold {
      let denom = l - 2.0 * c + r;
      let shift = if denom != 0.0 { 0.5 * (l - r) / denom } else { 0.0 };
      let bin = (i as f32 + shift).rem_euclid(n as f32);
      angles.push(wrap_angle(bin * 2.0 * PI / n as f32));
    }
  }
  angles
}

/// 以主方向为参考计算 4x4x8 梯度直方图描述子
fn describe(plane: &Plane, cx: isize, cy: isize, angle: f32, sigma: f32) -> Option<Descriptor> {
  let d = DESCR_WIDTH as f32;
  let (w, h) = (plane.width() as isize, plane.height() as isize);
  let hist_width = DESCR_SCL_FCTR * sigma;
  let diagonal = ((w * w + h * h) as f32).sqrt();
  let radius = (hist_width * SQRT_2 * (d + 1.0) * 0.5).round().min(diagonal) as isize;

  let cos_t = angle.cos() / hist_width;
  let sin_t = angle.sin() / hist_width;
  let bins_per_rad = DESCR_BINS as f32 / (2.0 * PI);
  let exp_scale = -1.0 / (d * d * 0.5);

  let mut hist = [0f32; DESCRIPTOR_LEN];
  for i in -radius..=radius {
    for j in -radius..=radius {
      let c_rot = j as f32 * cos_t + i as f32 * sin_t;
      let r_rot = i as f32 * cos_t - j as f32 * sin_t;
      let rbin = r_rot + d / 2.0 - 0.5;
      let cbin = c_rot + d / 2.0 - 0.5;
      if rbin <= -1.0 || rbin >= d || cbin <= -1.0 || cbin >= d {
        continue;
      }
      let (x, y) = (cx + j, cy + i);
      if x <= 0 || x >= w - 1 || y <= 0 || y >= h - 1 {
        continue;
      }

      let (gx, gy) = gradient_at(plane, x as usize, y as usize);
      let magnitude = (gx * gx + gy * gy).sqrt();
      if magnitude == 0.0 {
        continue;
      }
      let weight = ((c_rot * c_rot + r_rot * r_rot) * exp_scale).exp();
      let obin = wrap_angle(gy.atan2(gx) - angle) * bins_per_rad;
      accumulate(&mut hist, rbin, cbin, obin, magnitude * weight);
    }
  }

  let norm = hist.iter().map(|v| v * v).sum::<f32>().sqrt();
  if norm <= f32::EPSILON {
    return None;
  }
  let clip = norm * DESCR_MAG_THR;
  hist.iter_mut().for_each(|v| *v = v.min(clip));
  let norm = hist.iter().map(|v| v * v).sum::<f32>().sqrt().max(f32::EPSILON);
  let scale = DESCR_INT_FCTR / norm;
  hist.iter_mut().for_each(|v| *v = (*v * scale).min(255.0));

  Some(Descriptor(hist))
}

/// 三线性插值累加到（行、列、方向）直方图
fn accumulate(hist: &mut [f32; DESCRIPTOR_LEN], rbin: f32, cbin: f32, obin: f32, value: f32) {
  let (r0, c0, o0) = (rbin.floor(), cbin.floor(), obin.floor());
  let (rb, cb, ob) = (rbin - r0, cbin - c0, obin - o0);
  let (r0, c0, o0) = (r0 as isize, c0 as isize, o0 as isize);
  let d = DESCR_WIDTH as isize;
  let n = DESCR_BINS as isize;

  for (dr, wr) in [(0, 1.0 - rb), (1, rb)] {
    let r = r0 + dr;
    if r < 0 || r >= d {
      continue;
    }
    for (dc, wc) in [(0, 1.0 - cb), (1, cb)] {
      let c = c0 + dc;
      if c < 0 || c >= d {
        continue;
      }
      for (dob, wo) in [(0, 1.0 - ob), (1, ob)] {
        let o = (o0 + dob).rem_euclid(n);
        let index = ((r * d + c) * n + o) as usize;
        hist[index] += value * wr * wc * wo;
      }
    }
  }
}

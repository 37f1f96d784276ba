// 该文件是 Yinji （印记） 项目的一部分。
// src/output/draw.rs - 匹配结果可视化
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

use image::{GrayImage, Rgb, RgbImage, imageops};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};

use crate::model::{feature::Keypoint, matcher::MatchPair};

const OUTLINE_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const OUTLINE_THICKNESS: i32 = 3;
const KEYPOINT_RADIUS: i32 = 4;

// 匹配连线轮流使用的颜色
const MATCH_PALETTE: [[u8; 3]; 6] = [
  [255, 64, 64],
  [64, 160, 255],
  [255, 200, 0],
  [200, 64, 255],
  [0, 220, 220],
  [255, 128, 0],
];

pub struct Draw {
  outline_color: [u8; 3],
  outline_thickness: i32,
  keypoint_radius: i32,
  palette: &'static [[u8; 3]],
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      outline_color: OUTLINE_COLOR,
      outline_thickness: OUTLINE_THICKNESS,
      keypoint_radius: KEYPOINT_RADIUS,
      palette: &MATCH_PALETTE,
    }
  }
}

impl Draw {
  /// 左侧为参考标志，右侧为候选图像；画出每对匹配的连线，
  /// 若有外框则先在候选图像上画出投影四边形
  pub fn draw_matches(
    &self,
    reference: &GrayImage,
    candidate: &RgbImage,
    pairs: &[MatchPair],
    reference_keypoints: &[Keypoint],
    candidate_keypoints: &[Keypoint],
    outline: Option<&[[f64; 2]; 4]>,
  ) -> RgbImage {
    let offset = reference.width();
    let width = offset + candidate.width();
    let height = reference.height().max(candidate.height());
    let mut canvas = RgbImage::new(width, height);

    let reference_rgb = RgbImage::from_fn(reference.width(), reference.height(), |x, y| {
      let v = reference.get_pixel(x, y)[0];
      Rgb([v, v, v])
    });
    imageops::replace(&mut canvas, &reference_rgb, 0, 0);

    let mut scene = candidate.clone();
    if let Some(outline) = outline {
      self.draw_outline(&mut scene, outline);
    }
    imageops::replace(&mut canvas, &scene, offset as i64, 0);

    for (i, pair) in pairs.iter().enumerate() {
      let color = Rgb(self.palette[i % self.palette.len()]);
      let a = &reference_keypoints[pair.reference_index];
      let b = &candidate_keypoints[pair.candidate_index];
      let start = (a.x, a.y);
      let end = (b.x + offset as f32, b.y);
      draw_hollow_circle_mut(&mut canvas, to_pixel(start), self.keypoint_radius, color);
      draw_hollow_circle_mut(&mut canvas, to_pixel(end), self.keypoint_radius, color);
      draw_line_segment_mut(&mut canvas, start, end, color);
    }

    canvas
  }

  // 通过平移细线叠出粗线；各边先裁剪到图像范围内
  fn draw_outline(&self, image: &mut RgbImage, outline: &[[f64; 2]; 4]) {
    if outline.iter().flatten().any(|v| !v.is_finite()) {
      return;
    }
    let color = Rgb(self.outline_color);
    let half = self.outline_thickness / 2;
    let margin = (half + 1) as f64;
    let bounds = [
      -margin,
      -margin,
      image.width() as f64 - 1.0 + margin,
      image.height() as f64 - 1.0 + margin,
    ];
    for i in 0..outline.len() {
      let Some((a, b)) = clip_segment(outline[i], outline[(i + 1) % outline.len()], bounds) else {
        continue;
      };
      for dy in -half..=half {
        for dx in -half..=half {
          draw_line_segment_mut(
            image,
            (a[0] as f32 + dx as f32, a[1] as f32 + dy as f32),
            (b[0] as f32 + dx as f32, b[1] as f32 + dy as f32),
            color,
          );
        }
      }
    }
  }
}

/// Liang-Barsky 裁剪，`bounds` 为 `[x_min, y_min, x_max, y_max]`；
/// 线段完全在范围外时返回 `None`
fn clip_segment(a: [f64; 2], b: [f64; 2], bounds: [f64; 4]) -> Option<([f64; 2], [f64; 2])> {
  let [x_min, y_min, x_max, y_max] = bounds;
  let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
  let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
  for (p, q) in [
    (-dx, a[0] - x_min),
    (dx, x_max - a[0]),
    (-dy, a[1] - y_min),
    (dy, y_max - a[1]),
  ] {
    if p == 0.0 {
      if q < 0.0 {
        return None;
      }
      continue;
    }
    let t = q / p;
    if p < 0.0 {
      t0 = t0.max(t);
    } else {
      t1 = t1.min(t);
    }
    if t0 > t1 {
      return None;
    }
  }
  Some((
    [a[0] + t0 * dx, a[1] + t0 * dy],
    [a[0] + t1 * dx, a[1] + t1 * dy],
  ))
}

fn to_pixel(point: (f32, f32)) -> (i32, i32) {
  (point.0.round() as i32, point.1.round() as i32)
}

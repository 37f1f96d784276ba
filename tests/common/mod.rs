// 该文件是 Yinji （印记） 项目的一部分。
// tests/common/mod.rs - 集成测试用的合成图像
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

#![allow(dead_code)]

use std::path::Path;

use image::{DynamicImage, GrayImage, Luma, imageops};
use imageproc::drawing::draw_filled_circle_mut;
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use rand::{Rng, SeedableRng, rngs::StdRng};

use yinji::{
  config::EngineConfig,
  frame::ReferenceMark,
  model::{SingleImageDetector, feature::FeatureExtractor},
};

pub const WHITE: Luma<u8> = Luma([255]);
pub const CANVAS_WIDTH: u32 = 800;
pub const CANVAS_HEIGHT: u32 = 600;
/// 粘贴位置取 64 的倍数，使金字塔各层的采样网格与参考图像对齐
pub const PASTE_AT: (i64, i64) = (256, 192);

/// 白边包围的棋盘格，深浅格交替，但每格灰度随机，避免重复纹理
pub fn checker_mark(size: u32, cell: u32, margin: u32, seed: u64) -> GrayImage {
  let mut rng = StdRng::seed_from_u64(seed);
  let inner = size - 2 * margin;
  let cells = inner.div_ceil(cell);
  let levels: Vec<u8> = (0..cells * cells)
    .map(|i| {
      let (cx, cy) = (i % cells, i / cells);
      if (cx + cy) % 2 == 0 {
        rng.gen_range(0..=90)
      } else {
        rng.gen_range(150..=230)
      }
    })
    .collect();
  GrayImage::from_fn(size, size, |x, y| {
    if x < margin || y < margin || x >= size - margin || y >= size - margin {
      return WHITE;
    }
    let (cx, cy) = ((x - margin) / cell, (y - margin) / cell);
    Luma([levels[(cy * cells + cx) as usize]])
  })
}

/// 64×64 的默认参考标志
pub fn reference_mark() -> GrayImage {
  checker_mark(64, 6, 8, 42)
}

pub fn white_canvas() -> GrayImage {
  GrayImage::from_pixel(CANVAS_WIDTH, CANVAS_HEIGHT, WHITE)
}

pub fn paste(canvas: &mut GrayImage, patch: &GrayImage, at: (i64, i64)) {
  imageops::replace(canvas, patch, at.0, at.1);
}

/// 参考标志原样粘贴到白色画布上
pub fn composite(mark: &GrayImage) -> GrayImage {
  let mut canvas = white_canvas();
  paste(&mut canvas, mark, PASTE_AT);
  canvas
}

/// 与参考标志无关的画面：平缓渐变加几个相同的圆
pub fn unrelated_photo() -> GrayImage {
  let mut image = GrayImage::from_fn(CANVAS_WIDTH, CANVAS_HEIGHT, |_, y| {
    Luma([(120 + y * 60 / CANVAS_HEIGHT) as u8])
  });
  for center in [(150, 150), (400, 300), (650, 150), (650, 450)] {
    draw_filled_circle_mut(&mut image, center, 50, Luma([30]));
  }
  image
}

/// 先缩放再绕中心旋转，四周以白色填充
pub fn rotated_scaled(mark: &GrayImage, degrees: f32, scale: f32) -> GrayImage {
  let w = (mark.width() as f32 * scale).round() as u32;
  let h = (mark.height() as f32 * scale).round() as u32;
  let scaled = imageops::resize(mark, w, h, imageops::FilterType::Triangle);
  let side = w.max(h) * 2;
  let mut padded = GrayImage::from_pixel(side, side, WHITE);
  paste(
    &mut padded,
    &scaled,
    (((side - w) / 2) as i64, ((side - h) / 2) as i64),
  );
  rotate_about_center(
    &padded,
    degrees.to_radians(),
    Interpolation::Bilinear,
    WHITE,
  )
}

/// 重度模糊后只保留左上四分之一
pub fn degraded(mark: &GrayImage) -> GrayImage {
  let blurred = imageops::blur(mark, 6.0);
  imageops::crop_imm(&blurred, 0, 0, mark.width() / 2, mark.height() / 2).to_image()
}

pub fn detector_for(mark: GrayImage, config: &EngineConfig) -> SingleImageDetector {
  let extractor = FeatureExtractor::new(config.features.clone());
  let reference = ReferenceMark::new(mark, &extractor, "synthetic");
  SingleImageDetector::new(reference, config)
}

pub fn dynamic(image: GrayImage) -> DynamicImage {
  DynamicImage::ImageLuma8(image)
}

pub fn save_png(image: &GrayImage, path: &Path) {
  image.save(path).unwrap();
}

// 该文件是 Yinji （印记） 项目的一部分。
// src/model/scale_space.rs - 高斯尺度空间
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

use image::GrayImage;

/// 输入图像假定的初始模糊
const INIT_SIGMA: f32 = 0.5;

/// 单通道浮点图像平面，取值范围 [0, 1]
#[derive(Debug, Clone)]
pub struct Plane {
  width: usize,
  height: usize,
  data: Vec<f32>,
}

impl Plane {
  pub fn new(width: usize, height: usize) -> Self {
    Self {
      width,
      height,
      data: vec![0.0; width * height],
    }
  }

  pub fn from_gray(image: &GrayImage) -> Self {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let data = image.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
    Self {
      width,
      height,
      data,
    }
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn height(&self) -> usize {
    self.height
  }

  #[inline]
  pub fn at(&self, x: usize, y: usize) -> f32 {
    self.data[y * self.width + x]
  }

  #[inline]
  fn at_clamped(&self, x: isize, y: isize) -> f32 {
    let x = x.clamp(0, self.width as isize - 1) as usize;
    let y = y.clamp(0, self.height as isize - 1) as usize;
    self.at(x, y)
  }

  /// 双线性插值放大两倍（像素中心对齐）
  pub fn upsample2x(&self) -> Plane {
    let mut out = Plane::new(self.width * 2, self.height * 2);
    for dy in 0..out.height {
      let sy = ((dy as f32 + 0.5) * 0.5 - 0.5).max(0.0);
      let y0 = sy.floor() as usize;
      let y1 = (y0 + 1).min(self.height - 1);
      let fy = sy - y0 as f32;
      for dx in 0..out.width {
        let sx = ((dx as f32 + 0.5) * 0.5 - 0.5).max(0.0);
        let x0 = sx.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let fx = sx - x0 as f32;
        let top = self.at(x0, y0) * (1.0 - fx) + self.at(x1, y0) * fx;
        let bottom = self.at(x0, y1) * (1.0 - fx) + self.at(x1, y1) * fx;
        out.data[dy * out.width + dx] = top * (1.0 - fy) + bottom * fy;
      }
    }
    out
  }

  /// 隔点采样缩小两倍
  pub fn downsample2x(&self) -> Plane {
    let mut out = Plane::new((self.width / 2).max(1), (self.height / 2).max(1));
    for y in 0..out.height {
      for x in 0..out.width {
        out.data[y * out.width + x] = self.at_clamped(2 * x as isize, 2 * y as isize);
      }
    }
    out
  }

  /// 可分离高斯模糊，边界按复制处理
  pub fn blur(&self, sigma: f32) -> Plane {
    if sigma <= 0.0 {
      return self.clone();
    }
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;

    let mut tmp = Plane::new(self.width, self.height);
    for y in 0..self.height {
      for x in 0..self.width {
        let mut acc = 0.0;
        for (k, w) in kernel.iter().enumerate() {
          acc += w * self.at_clamped(x as isize + k as isize - radius, y as isize);
        }
        tmp.data[y * self.width + x] = acc;
      }
    }

    let mut out = Plane::new(self.width, self.height);
    for y in 0..self.height {
      for x in 0..self.width {
        let mut acc = 0.0;
        for (k, w) in kernel.iter().enumerate() {
          acc += w * tmp.at_clamped(x as isize, y as isize + k as isize - radius);
        }
        out.data[y * self.width + x] = acc;
      }
    }
    out
  }

  /// 逐像素差 self - other
  pub fn difference(&self, other: &Plane) -> Plane {
    let data = self
      .data
      .iter()
      .zip(other.data.iter())
      .map(|(a, b)| a - b)
      .collect();
    Plane {
      width: self.width,
      height: self.height,
      data,
    }
  }
}

fn gaussian_kernel(sigma: f32) -> Vec<f32> {
  let radius = ((4.0 * sigma).ceil() as usize).max(1);
  let denom = 2.0 * sigma * sigma;
  let mut kernel: Vec<f32> = (0..=2 * radius)
    .map(|i| {
      let d = i as f32 - radius as f32;
      (-d * d / denom).exp()
    })
    .collect();
  let sum: f32 = kernel.iter().sum();
  kernel.iter_mut().for_each(|w| *w /= sum);
  kernel
}

/// 一个八度：`layers + 3` 张高斯图像与 `layers + 2` 张差分图像
#[derive(Debug, Clone)]
pub struct Octave {
  pub gaussians: Vec<Plane>,
  pub dogs: Vec<Plane>,
}

#[derive(Debug, Clone)]
pub struct ScaleSpace {
  pub octaves: Vec<Octave>,
  /// 第 0 个八度相对原图的像素比例（放大时为 2）
  pub base_scale: f32,
}

impl ScaleSpace {
  /// 构建尺度空间；`min_size` 为八度图像允许的最小边长
  pub fn build(image: &GrayImage, layers: usize, sigma: f32, upsample: bool, min_size: usize) -> Self {
    let plane = Plane::from_gray(image);
    let (base, base_scale) = if upsample {
      let diff = (sigma * sigma - 4.0 * INIT_SIGMA * INIT_SIGMA).max(0.01).sqrt();
      (plane.upsample2x().blur(diff), 2.0)
    } else {
      let diff = (sigma * sigma - INIT_SIGMA * INIT_SIGMA).max(0.01).sqrt();
      (plane.blur(diff), 1.0)
    };

    let shortest = base.width().min(base.height()).max(1) as f32;
    let octave_count = ((shortest.log2().round() as i32) - 1).max(1) as usize;

    // 相邻层之间的增量模糊
    let k = 2f32.powf(1.0 / layers as f32);
    let mut increments = vec![sigma; layers + 3];
    for (i, inc) in increments.iter_mut().enumerate().skip(1) {
      let prev = sigma * k.powi(i as i32 - 1);
      let total = prev * k;
      *inc = (total * total - prev * prev).sqrt();
    }

    let mut octaves: Vec<Octave> = Vec::with_capacity(octave_count);
    for o in 0..octave_count {
      let first = match octaves.last() {
        None => base.clone(),
        Some(prev) => prev.gaussians[layers].downsample2x(),
      };
      if o > 0 && first.width().min(first.height()) < min_size {
        break;
      }

      let mut gaussians = Vec::with_capacity(layers + 3);
      gaussians.push(first);
      for inc in increments.iter().skip(1) {
        let next = gaussians[gaussians.len() - 1].blur(*inc);
        gaussians.push(next);
      }

      let dogs = gaussians
        .windows(2)
        .map(|pair| pair[1].difference(&pair[0]))
        .collect();

      octaves.push(Octave { gaussians, dogs });
    }

    Self {
      octaves,
      base_scale,
    }
  }
}

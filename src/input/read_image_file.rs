// 该文件是 Yinji （印记） 项目的一部分。
// src/input/read_image_file.rs - 图像文件解码
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

use image::{DynamicImage, ImageReader};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ImageDecodeError {
  #[error("I/O 错误: {origin}: {source}")]
  IoError {
    origin: String,
    source: std::io::Error,
  },
  #[error("图像解码错误: {origin}: {source}")]
  ImageLoadError {
    origin: String,
    source: image::ImageError,
  },
}

/// 按内容探测格式，扩展名与内容不符时以内容为准
pub fn read_image_file(path: &Path) -> Result<DynamicImage, ImageDecodeError> {
  let origin = path.display().to_string();
  let reader = ImageReader::open(path)
    .and_then(|r| r.with_guessed_format())
    .map_err(|source| ImageDecodeError::IoError {
      origin: origin.clone(),
      source,
    })?;
  let image = reader
    .decode()
    .map_err(|source| ImageDecodeError::ImageLoadError { origin, source })?;
  debug!(
    "读取图像 {}: {}x{}",
    path.display(),
    image.width(),
    image.height()
  );
  Ok(image)
}

pub fn decode_image_bytes(bytes: &[u8], origin: &str) -> Result<DynamicImage, ImageDecodeError> {
  image::load_from_memory(bytes).map_err(|source| ImageDecodeError::ImageLoadError {
    origin: origin.to_string(),
    source,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  #[test]
  fn reads_png_with_misleading_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("image.jpg");
    let image = RgbImage::from_pixel(8, 6, Rgb([1, 2, 3]));
    image
      .save_with_format(&path, image::ImageFormat::Png)
      .unwrap();
    let decoded = read_image_file(&path).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (8, 6));
  }

  #[test]
  fn garbage_is_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.png");
    std::fs::write(&path, b"definitely not an image").unwrap();
    assert!(matches!(
      read_image_file(&path),
      Err(ImageDecodeError::ImageLoadError { .. })
    ));
    assert!(decode_image_bytes(b"nope", "memory").is_err());
  }

  #[test]
  fn missing_file_is_io_error() {
    assert!(matches!(
      read_image_file(Path::new("/nonexistent/yinji.png")),
      Err(ImageDecodeError::IoError { .. })
    ));
  }
}

// 该文件是 Yinji （印记） 项目的一部分。
// src/output/save_image_file.rs - 保存标注图像
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

use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::MatchResult,
  output::{OutputError, Render},
};

const MARKED_PREFIX: &str = "marked_";

/// 将标注图像以 `marked_<原文件名>` 写入目录
pub struct SaveImageFileOutput {
  directory: PathBuf,
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "file";
}

impl FromUrl for SaveImageFileOutput {
  type Error = OutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }
    let directory = uri
      .to_file_path()
      .map_err(|_| OutputError::SchemeMismatch(uri.to_string()))?;
    Ok(Self::new(directory))
  }
}

impl SaveImageFileOutput {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
    }
  }

  pub fn marked_path(&self, source: &Path) -> Result<PathBuf, OutputError> {
    let name = source
      .file_name()
      .ok_or_else(|| OutputError::InvalidFileName(source.to_path_buf()))?;
    let mut marked = std::ffi::OsString::from(MARKED_PREFIX);
    marked.push(name);
    Ok(self.directory.join(marked))
  }

  /// 返回写入的文件路径
  pub fn save_image(&self, source: &Path, image: &RgbImage) -> Result<PathBuf, OutputError> {
    std::fs::create_dir_all(&self.directory).map_err(|source| OutputError::IoError {
      path: self.directory.clone(),
      source,
    })?;
    let path = self.marked_path(source)?;
    image.save(&path).map_err(|source| OutputError::ImageError {
      path: path.clone(),
      source,
    })?;
    info!("保存标注图像到文件: {}", path.display());
    Ok(path)
  }
}

impl Render<Path, MatchResult> for SaveImageFileOutput {
  type Error = OutputError;

  fn render_result(&self, frame: &Path, result: &MatchResult) -> Result<(), Self::Error> {
    match &result.annotated_image {
      Some(image) => self.save_image(frame, image).map(|_| ()),
      None => {
        debug!("{} 没有标注图像，跳过保存", frame.display());
        Ok(())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  fn result(annotated: Option<RgbImage>) -> MatchResult {
    MatchResult {
      annotated_image: annotated,
      ..MatchResult::empty(10)
    }
  }

  #[test]
  fn marked_name_keeps_original_file_name() {
    let output = SaveImageFileOutput::new("/out");
    assert_eq!(
      output.marked_path(Path::new("/assets/banner.png")).unwrap(),
      PathBuf::from("/out/marked_banner.png")
    );
    assert!(output.marked_path(Path::new("/")).is_err());
  }

  #[test]
  fn writes_into_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let output = SaveImageFileOutput::new(dir.path().join("marked"));
    let image = RgbImage::from_pixel(4, 4, Rgb([0, 255, 0]));
    output
      .render_result(Path::new("assets/hero.png"), &result(Some(image)))
      .unwrap();
    let written = dir.path().join("marked/marked_hero.png");
    assert!(written.is_file());
    assert_eq!(image::open(&written).unwrap().width(), 4);
  }

  #[test]
  fn nothing_written_without_annotation() {
    let dir = tempfile::tempdir().unwrap();
    let output = SaveImageFileOutput::new(dir.path().join("marked"));
    output
      .render_result(Path::new("hero.png"), &result(None))
      .unwrap();
    assert!(!dir.path().join("marked").exists());
  }

  #[test]
  fn from_file_url() {
    let url = Url::parse("file:///tmp/marked").unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();
    assert_eq!(
      output.marked_path(Path::new("x.jpg")).unwrap(),
      PathBuf::from("/tmp/marked/marked_x.jpg")
    );
    assert!(SaveImageFileOutput::from_url(&Url::parse("s3://bucket/x").unwrap()).is_err());
  }
}

// 该文件是 Yinji （印记） 项目的一部分。
// tests/batch.rs - 批量检测与报告
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

mod common;

use std::path::PathBuf;

use common::*;
use image::{GrayImage, Luma};
use yinji::{
  config::{BatchConfig, EngineConfig},
  model::DetectionErrorKind,
  output::ReportGenerator,
  task::BatchDetector,
};

fn batch_detector(parallel: bool) -> BatchDetector {
  let config = EngineConfig::default();
  let detector = detector_for(reference_mark(), &config).with_annotation(false);
  BatchDetector::new(detector, &BatchConfig { parallel })
}

/// 2 张无关图像加 1 张含标志图像
fn write_assets(dir: &std::path::Path) {
  save_png(&unrelated_photo(), &dir.join("a_photo.png"));
  save_png(&composite(&reference_mark()), &dir.join("b_with_logo.png"));
  save_png(
    &GrayImage::from_fn(CANVAS_WIDTH, CANVAS_HEIGHT, |x, _| Luma([(x / 4) as u8])),
    &dir.join("c_gradient.png"),
  );
}

#[test]
fn report_counts_one_logo_out_of_three() -> anyhow::Result<()> {
  let dir = tempfile::TempDir::new()?;
  write_assets(dir.path());
  std::fs::write(dir.path().join("notes.txt"), "not an image")?;

  let batch = batch_detector(true).detect_all(&format!("{}/*", dir.path().display()))?;
  assert_eq!(batch.len(), 3);
  assert_eq!(batch.errors().count(), 0);

  let report = ReportGenerator.render(&batch);
  assert!(report.contains("Images with Logo: 1"), "{report}");
  assert!(report.contains("Images without Logo: 2"), "{report}");
  let logo_line = format!("- {} (matches: ", dir.path().join("b_with_logo.png").display());
  let with_section = report.split("Images With Logo:").nth(1).unwrap_or_default();
  assert!(with_section.contains(&logo_line));
  Ok(())
}

#[test]
fn broken_file_does_not_abort_batch() -> anyhow::Result<()> {
  let dir = tempfile::TempDir::new()?;
  write_assets(dir.path());
  std::fs::write(dir.path().join("d_corrupt.png"), b"\x89PNG but truncated")?;

  let detector = batch_detector(true);
  let batch = detector.detect_all(&format!("{}/*.png", dir.path().display()))?;

  assert_eq!(batch.len(), 4);
  let errors: Vec<_> = batch.errors().collect();
  assert_eq!(errors.len(), 1);
  assert_eq!(errors[0].0, dir.path().join("d_corrupt.png"));
  assert_eq!(errors[0].1.kind(), DetectionErrorKind::ImageDecode);
  assert_eq!(batch.with_logo().count(), 1);

  // 其他条目不受影响
  let alone = detector.detect_paths(&[dir.path().join("b_with_logo.png")]);
  let (_, expected) = &alone.entries()[0];
  let actual = batch.get(&dir.path().join("b_with_logo.png")).unwrap();
  assert_eq!(
    actual.as_ref().map(|r| r.confidence).ok(),
    expected.as_ref().map(|r| r.confidence).ok()
  );

  let report = ReportGenerator.render(&batch);
  assert!(report.contains("Images without Logo: 3"));
  assert!(report.contains(&format!(
    "- {} (matches: N/A)",
    dir.path().join("d_corrupt.png").display()
  )));
  Ok(())
}

#[test]
fn missing_path_is_an_error_entry() {
  let dir = tempfile::TempDir::new().unwrap();
  save_png(&composite(&reference_mark()), &dir.path().join("logo.png"));
  let paths = vec![
    dir.path().join("logo.png"),
    PathBuf::from("/definitely/missing/asset.png"),
  ];
  let batch = batch_detector(false).detect_paths(&paths);
  assert_eq!(batch.len(), 2);
  assert_eq!(batch.with_logo().count(), 1);
  assert_eq!(batch.errors().count(), 1);
}

#[test]
fn counts_add_up_and_order_is_preserved() -> anyhow::Result<()> {
  let dir = tempfile::TempDir::new()?;
  write_assets(dir.path());
  std::fs::create_dir_all(dir.path().join("nested"))?;
  save_png(&unrelated_photo(), &dir.path().join("nested/e_photo.jpg"));
  std::fs::write(dir.path().join("nested/f_broken.bmp"), b"garbage")?;

  let pattern = format!("{}/**/*", dir.path().display());
  let resolved = yinji::input::resolve_candidates(&pattern)?;
  let parallel = batch_detector(true).detect_all(&pattern)?;
  let sequential = batch_detector(false).detect_all(&pattern)?;

  assert_eq!(resolved.len(), 5);
  for batch in [&parallel, &sequential] {
    assert_eq!(
      batch.with_logo().count() + batch.without_logo().count() + batch.errors().count(),
      resolved.len()
    );
    let order: Vec<PathBuf> = batch.entries().iter().map(|(p, _)| p.clone()).collect();
    assert_eq!(order, resolved);
  }
  assert_eq!(
    ReportGenerator.render(&parallel),
    ReportGenerator.render(&sequential)
  );
  Ok(())
}

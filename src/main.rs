// 该文件是 Yinji （印记） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use yinji::{
  FromUrl,
  config::EngineConfig,
  input::{ReferenceMarkLoader, ReferenceMarkSource},
  model::{SingleImageDetector, feature::FeatureExtractor},
  output::{Render, ReportFileOutput, ReportGenerator, SaveImageFileOutput},
  task::{BatchDetector, BatchResult},
};

const NO_LOGO_MESSAGE: &str = "Failed to load any logo. Please provide a valid logo path, URL, campaign file, or ensure a default logo is configured.";

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  let mut config = EngineConfig::load(args.config.as_deref())?;
  if let Some(threshold) = args.threshold {
    config = config.with_threshold(threshold)?;
  }
  if let Some(seed) = args.seed {
    config = config.with_seed(seed);
  }
  info!("判定阈值: {}", config.threshold());

  let mut loader = ReferenceMarkLoader::new(FeatureExtractor::new(config.features.clone()));
  if let Some(path) = args.logo_path.clone() {
    loader = loader.with_source(ReferenceMarkSource::LocalPath(path));
  }
  if let Some(url) = args.logo_url.clone() {
    loader = loader.with_source(ReferenceMarkSource::Url(url));
  }
  if let Some(campaign) = args.campaign_file.clone() {
    loader = loader.with_source(ReferenceMarkSource::CampaignRef(campaign));
  }
  if let Some(url) = &args.logo {
    loader = loader.with_source(ReferenceMarkSource::from_url(url)?);
  }
  if let Some(default) = &config.compliance.logo.default_logo_url {
    match ReferenceMarkSource::configured_default(default) {
      Ok(source) => loader = loader.with_source(source),
      Err(e) => warn!("忽略配置中的默认标志: {}", e),
    }
  }

  let mark = loader.load().context(NO_LOGO_MESSAGE)?;
  println!("Using logo from {}", mark.source());

  let asset = Path::new(&args.asset_path);
  let batch = if asset.is_file() {
    info!("检查单张图像: {}", asset.display());
    let detector =
      SingleImageDetector::new(mark, &config).with_annotation(args.save_marked.is_some());
    let result = detector.detect(asset)?;
    if let Some(dir) = &args.save_marked
      && result.annotated_image.is_some()
    {
      let output = SaveImageFileOutput::new(dir);
      output.render_result(asset, &result)?;
      println!("Saved marked image to {}", output.marked_path(asset)?.display());
    }
    BatchResult::new(vec![(asset.to_path_buf(), Ok(result))])
  } else {
    info!("按模式检查多张图像: {}", args.asset_path);
    let detector = SingleImageDetector::new(mark, &config).with_annotation(false);
    let batch = BatchDetector::new(detector, &config.batch).detect_all(&args.asset_path)?;
    if args.save_marked.is_some() {
      println!("Note: --save-marked is ignored when checking multiple images");
    }
    batch
  };

  let report = ReportGenerator.render(&batch);
  if let Some(path) = &args.output
    && let Err(e) = ReportFileOutput::new(path).render_result(&batch, report.as_str())
  {
    error!("保存报告失败: {}", e);
  }
  println!("{}", report);

  Ok(())
}
